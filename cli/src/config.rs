use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable that points the planner at a different database file.
pub const DB_PATH_ENV: &str = "WTW_DB";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(DB_PATH_ENV).filter(|p| !p.is_empty()) {
            return Ok(Config {
                db_path: PathBuf::from(path),
            });
        }

        let proj_dirs =
            ProjectDirs::from("", "", "wtw").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("wtw.db"),
        })
    }
}

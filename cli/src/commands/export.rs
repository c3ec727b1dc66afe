use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use wtw_core::ics::ICS_MIME_TYPE;
use wtw_core::kv::KeyValueStore;
use wtw_core::service::Planner;

/// Where the calendar file goes: a given file, a given directory, or the working directory.
fn target_path(output: Option<&Path>, filename: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(filename),
    }
}

pub(crate) fn cmd_export<S: KeyValueStore>(
    planner: &Planner<S>,
    output: Option<&Path>,
    stdout: bool,
    json: bool,
) -> Result<()> {
    let ics = planner.export_ics();

    if stdout {
        print!("{ics}");
        return Ok(());
    }

    let path = target_path(output, &planner.ics_filename());
    std::fs::write(&path, &ics)
        .with_context(|| format!("Failed to write calendar file: {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = ics.len(), "wrote calendar export");

    let events = ics.matches("BEGIN:VEVENT").count();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "mime_type": ICS_MIME_TYPE,
                "events": events,
                "week": planner.week_key(),
            })
        );
    } else {
        let range = planner.week_range();
        println!("Exported {events} event(s) for {range} to {}", path.display());
    }
    Ok(())
}

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    BlockOptions, cmd_add, cmd_delete, cmd_duplicate, cmd_edit, cmd_export, cmd_groceries,
    cmd_move, cmd_nutrition, cmd_show, cmd_templates, parse_day,
};
use crate::config::Config;
use wtw_core::db::Database;
use wtw_core::models::Day;
use wtw_core::service::Planner;

#[derive(Parser)]
#[command(
    name = "wtw",
    version,
    about = "Win the week: plan tasks and meals on a weekly grid"
)]
struct Cli {
    /// Week to work on, relative to this one (-1 = last week, 1 = next week)
    #[arg(long, global = true, default_value_t = 0, allow_negative_numbers = true)]
    week: i64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the week's blocks, day by day
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a block to a day
    Add {
        /// Day of the week (e.g. "monday" or "mon")
        #[arg(value_parser = parse_day)]
        day: Day,
        /// What the block is
        label: String,
        #[command(flatten)]
        options: BlockOptions,
        /// Repeat this block every week on the same day
        #[arg(short, long)]
        recurring: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an existing block
    Edit {
        /// Tile ID (e.g. "tile-3")
        id: String,
        /// New label
        #[arg(short, long)]
        label: Option<String>,
        #[command(flatten)]
        options: BlockOptions,
        /// Turn a meal back into a plain task
        #[arg(long)]
        task: bool,
        /// Repeat this block every week
        #[arg(long, conflicts_with = "no_recurring")]
        recurring: bool,
        /// Stop repeating this block
        #[arg(long)]
        no_recurring: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a block (and its weekly template, if it repeats)
    Delete {
        /// Tile ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a block to another day or position
    Move {
        /// Tile ID
        id: String,
        /// Target day
        #[arg(value_parser = parse_day)]
        day: Day,
        /// 1-based position within the target day (default: last)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        position: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy a block onto a day as a one-off
    Duplicate {
        /// Tile ID
        id: String,
        /// Target day
        #[arg(value_parser = parse_day)]
        day: Day,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the week as an iCalendar (.ics) file
    Export {
        /// File or directory to write to (default: ./week-<monday>.ics)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Print the calendar instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the week's grocery list built from meal ingredients
    Groceries {
        /// Ingredients already bought (repeatable)
        #[arg(short, long = "checked", value_name = "INGREDIENT")]
        checked: Vec<String>,
        /// Print a plain "- item" list for pasting
        #[arg(long)]
        copy: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show planned calories and macros per day
    Nutrition {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the recurring blocks that seed new weeks
    Templates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config.db_path)?;
    tracing::debug!(db = %config.db_path.display(), "opened planner database");

    let mut planner = Planner::new(db);
    if cli.week != 0 {
        planner.navigate(cli.week);
    }

    match cli.command {
        Commands::Show { json } => cmd_show(&planner, json),
        Commands::Add {
            day,
            label,
            options,
            recurring,
            json,
        } => cmd_add(&mut planner, day, &label, &options, recurring, json),
        Commands::Edit {
            id,
            label,
            options,
            task,
            recurring,
            no_recurring,
            json,
        } => {
            let recurring = match (recurring, no_recurring) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            cmd_edit(
                &mut planner,
                &id,
                label.as_deref(),
                &options,
                recurring,
                task,
                json,
            )
        }
        Commands::Delete { id, json } => cmd_delete(&mut planner, &id, json),
        Commands::Move {
            id,
            day,
            position,
            json,
        } => {
            let position = position.map(usize::try_from).transpose()?;
            cmd_move(&mut planner, &id, day, position, json)
        }
        Commands::Duplicate { id, day, json } => cmd_duplicate(&mut planner, &id, day, json),
        Commands::Export {
            output,
            stdout,
            json,
        } => cmd_export(&planner, output.as_deref(), stdout, json),
        Commands::Groceries {
            checked,
            copy,
            json,
        } => cmd_groceries(&planner, &checked, copy, json),
        Commands::Nutrition { json } => cmd_nutrition(&planner, json),
        Commands::Templates { json } => cmd_templates(&planner, json),
    }
}

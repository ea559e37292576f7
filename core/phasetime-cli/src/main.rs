//! phasetime: diagnostics and replay tool for session phase statistics.
//!
//! ## Subcommands
//!
//! - `stats`: Print all-time and current-month averages
//! - `rows`: List every persisted phase row
//! - `record`: Drive a session from trigger names on stdin, commit at EOF
//! - `init`: Write a config file selecting the storage backend

mod logging;
mod record;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use phasetime_core::{
    load_config, open_store, save_config, AggregateStats, PeriodStats, PhaseKind,
    PhasetimeConfig, SessionController, StorageConfig, StoreBackend,
};

#[derive(Parser)]
#[command(name = "phasetime")]
#[command(about = "Session phase timing statistics")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to ~/.phasetime)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print aggregate statistics
    Stats {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List persisted phase rows
    Rows,

    /// Read triggers (started, lobby, arena, destroyed) from stdin, one per line
    Record,

    /// Write a config file
    Init {
        /// Persistence backend: json or sqlite
        #[arg(long, default_value = "json")]
        backend: StoreBackend,
    },
}

fn main() {
    let cli = Cli::parse();
    let storage = cli
        .root
        .map(StorageConfig::with_root)
        .unwrap_or_default();
    let _logging_guard = logging::init(&storage.logs_dir());

    let result = match cli.command {
        Commands::Stats { json } => run_stats(&storage, json),
        Commands::Rows => run_rows(&storage),
        Commands::Record => run_record(&storage),
        Commands::Init { backend } => run_init(&storage, backend),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "phasetime failed");
        std::process::exit(1);
    }
}

fn controller_for(storage: &StorageConfig) -> SessionController {
    SessionController::new(open_store(storage, &load_config(storage)))
}

fn run_stats(storage: &StorageConfig, json: bool) -> Result<(), String> {
    let stats = controller_for(storage).get_statistics()?;

    if json {
        let rendered = serde_json::to_string_pretty(&stats)
            .map_err(|err| format!("Failed to serialize stats: {}", err))?;
        println!("{}", rendered);
    } else {
        print!("{}", render_stats(&stats));
    }
    Ok(())
}

fn run_rows(storage: &StorageConfig) -> Result<(), String> {
    let controller = controller_for(storage);
    let rows = controller.store().load_all()?;

    println!("{:>6}  {:>15}  {:>10}  PHASE", "ID", "DATE", "DURATION");
    for row in &rows {
        println!(
            "{:>6}  {:>15}  {:>10}  {}",
            row.id, row.date, row.duration, row.phase_kind
        );
    }
    tracing::debug!(count = rows.len(), path = %controller.store().location().display(), "Listed rows");
    Ok(())
}

fn run_record(storage: &StorageConfig) -> Result<(), String> {
    let mut controller = controller_for(storage);
    let stdin = std::io::stdin();
    let summary = record::replay(stdin.lock(), &mut controller)?;

    let committed = controller.shutdown()?;
    println!(
        "applied {} trigger(s), skipped {}, committed {} record(s)",
        summary.applied, summary.skipped, committed
    );
    Ok(())
}

fn run_init(storage: &StorageConfig, backend: StoreBackend) -> Result<(), String> {
    let config = PhasetimeConfig {
        backend,
        ..load_config(storage)
    };
    save_config(storage, &config)?;
    tracing::info!(path = %storage.config_file().display(), backend = ?backend, "Wrote config");
    println!("{}", storage.config_file().display());
    Ok(())
}

fn render_stats(stats: &AggregateStats) -> String {
    let mut out = String::new();
    render_period(&mut out, "All time", &stats.all_time);
    render_period(&mut out, "This month", &stats.current_month);
    out
}

fn render_period(out: &mut String, title: &str, period: &PeriodStats) {
    out.push_str(&format!(
        "{}: {} phase(s), average {:.0} ms\n",
        title, period.overall.count, period.overall.average_ms
    ));
    for kind in PhaseKind::TRACKED {
        out.push_str(&format!(
            "  {:<16}{:>6}  {:>12.0} ms\n",
            kind.label(),
            period.count_for(kind),
            period.average_for(kind)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_stats_lists_every_kind() {
        let rendered = render_stats(&AggregateStats::default());
        assert!(rendered.starts_with("All time: 0 phase(s), average 0 ms"));
        for kind in PhaseKind::TRACKED {
            assert_eq!(rendered.matches(kind.label()).count(), 2);
        }
    }

    #[test]
    fn test_cli_parses_global_root_after_subcommand() {
        let cli = Cli::try_parse_from(["phasetime", "stats", "--json", "--root", "/tmp/pt"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/pt")));
        assert!(matches!(cli.command, Commands::Stats { json: true }));
    }

    #[test]
    fn test_cli_parses_backend() {
        let cli = Cli::try_parse_from(["phasetime", "init", "--backend", "sqlite"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Init {
                backend: StoreBackend::Sqlite
            }
        ));
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use takeoff_core::{
    export_cost_items_csv, export_measurements_csv, format_quantity, load_session,
    save_session, Action, CsvExportConfig, QuantityUnit, TakeoffConfig, TakeoffSession,
};

#[derive(Debug, Parser)]
#[command(name = "takeoff-cli")]
#[command(about = "Plan takeoff CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a JSON script of actions and print one outcome per line.
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
        /// Engine configuration file (defaults to TAKEOFF_* variables).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Start from a saved session instead of an empty one.
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Write the resulting session here.
        #[arg(long)]
        save: Option<PathBuf>,
        /// Report failed actions and continue.
        #[arg(long)]
        keep_going: bool,
        /// Write the row changes for an external store here, one JSON op per line.
        #[arg(long)]
        store_ops: Option<PathBuf>,
    },
    /// Print quantity and estimate totals of a saved session.
    Totals {
        #[arg(value_name = "SESSION")]
        session: PathBuf,
    },
    /// Write measurements (and optionally cost items) of a saved session as CSV.
    Export {
        #[arg(value_name = "SESSION")]
        session: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        cost_items: Option<PathBuf>,
        /// Only export these 0-based pages.
        #[arg(long = "page")]
        pages: Vec<usize>,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct TotalsOutput {
    calibrated_pages: Vec<usize>,
    estimate: EstimateOutput,
    measurements: usize,
    page_count: usize,
    quantities: BTreeMap<String, String>,
    zones: Vec<ZoneOutput>,
}

#[derive(Debug, Serialize)]
struct ZoneOutput {
    deductions: String,
    gross: String,
    net: String,
    unit: String,
    zone: Option<String>,
}

#[derive(Debug, Serialize)]
struct EstimateOutput {
    items: usize,
    labor_hours: String,
    subtotal: String,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Replay {
            script,
            config,
            resume,
            save,
            keep_going,
            store_ops,
        } => run_replay(
            &script,
            config.as_deref(),
            resume.as_deref(),
            save.as_deref(),
            store_ops.as_deref(),
            keep_going,
        ),
        Commands::Totals { session } => run_totals(&session),
        Commands::Export {
            session,
            output,
            cost_items,
            pages,
            delimiter,
        } => run_export(&session, &output, cost_items.as_deref(), pages, delimiter),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TakeoffConfig> {
    match path {
        Some(path) => TakeoffConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => TakeoffConfig::from_env().context("invalid TAKEOFF_* environment"),
    }
}

fn open_session(path: &Path, config: TakeoffConfig) -> Result<TakeoffSession> {
    ensure_file_exists(path)?;
    let snapshot =
        load_session(path).with_context(|| format!("failed to load session {}", path.display()))?;
    Ok(TakeoffSession::from_snapshot(config, snapshot)?)
}

fn run_replay(
    script: &Path,
    config: Option<&Path>,
    resume: Option<&Path>,
    save: Option<&Path>,
    store_ops: Option<&Path>,
    keep_going: bool,
) -> Result<()> {
    ensure_file_exists(script)?;
    let config = load_config(config)?;

    let raw = fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let actions: Vec<Action> = serde_json::from_str(&raw).context("failed to parse script")?;

    let mut session = match resume {
        Some(path) => open_session(path, config)?,
        None => TakeoffSession::new(config)?,
    };

    for (step, action) in actions.into_iter().enumerate() {
        match session.dispatch(action) {
            Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
            Err(error) if keep_going => {
                log::warn!("action {step} failed: {error}");
                let line = serde_json::json!({
                    "outcome": "error",
                    "step": step,
                    "message": error.to_string(),
                });
                println!("{line}");
            }
            Err(error) => {
                return Err(error).with_context(|| format!("action {step} failed"));
            }
        }
    }

    if let Some(path) = store_ops {
        let ops = session.take_store_ops();
        log::info!("replay produced {} store operations", ops.len());
        let mut file = create_output(path)?;
        for op in &ops {
            serde_json::to_writer(&mut file, op)?;
            writeln!(file)?;
        }
        file.flush()
            .with_context(|| format!("failed to write store ops to {}", path.display()))?;
    }

    if let Some(path) = save {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        save_session(path, &session.snapshot())
            .with_context(|| format!("failed to write session to {}", path.display()))?;
    }

    Ok(())
}

fn run_totals(path: &Path) -> Result<()> {
    let session = open_session(path, TakeoffConfig::default())?;
    let document = session.document();

    let quantities = session
        .quantity_totals()
        .into_iter()
        .map(|(unit, value)| (unit.label().to_owned(), format_quantity(value, unit)))
        .collect();

    let zones = document
        .net_by_zone()
        .into_iter()
        .map(|((zone, unit), quantity)| ZoneOutput {
            deductions: format_value(quantity.deductions, unit),
            gross: format_value(quantity.gross, unit),
            net: format_value(quantity.net(), unit),
            unit: unit.label().to_owned(),
            zone,
        })
        .collect();

    let totals = session.estimate_totals();
    let payload = TotalsOutput {
        calibrated_pages: session.calibrations().iter().map(|(page, _)| page).collect(),
        estimate: EstimateOutput {
            items: totals.items,
            labor_hours: format!("{:.2}", totals.labor_hours),
            subtotal: format!("{:.2}", totals.subtotal),
        },
        measurements: document.len(),
        page_count: session.viewport().page_count(),
        quantities,
        zones,
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_export(
    session: &Path,
    output: &Path,
    cost_items: Option<&Path>,
    pages: Vec<usize>,
    delimiter: char,
) -> Result<()> {
    if !delimiter.is_ascii() {
        anyhow::bail!("--delimiter must be a single ASCII character");
    }
    let session = open_session(session, TakeoffConfig::default())?;
    let config = CsvExportConfig {
        delimiter: delimiter as u8,
        page_filter: (!pages.is_empty()).then_some(pages),
        ..CsvExportConfig::default()
    };

    let file = create_output(output)?;
    export_measurements_csv(file, session.document().measurements(), &config)
        .with_context(|| format!("failed to write CSV to {}", output.display()))?;
    println!("{}", output.display());

    if let Some(path) = cost_items {
        let file = create_output(path)?;
        export_cost_items_csv(file, session.cost_book().items(), &config)
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        println!("{}", path.display());
    }

    Ok(())
}

fn create_output(path: &Path) -> Result<BufWriter<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn format_value(value: f64, unit: QuantityUnit) -> String {
    format!("{:.*}", unit.display_precision(), value)
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

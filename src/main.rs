#[macro_use]
extern crate log;

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;

use cykel_forecast::calendar::EventFilter;
use cykel_forecast::commands::{self, ExportOptions, DEFAULT_CYCLES_AHEAD, MAX_CYCLES_AHEAD};
use cykel_forecast::models::{ProfileDefaults, TrackerData};
use cykel_forecast::storage;
use cykel_forecast::symptoms::DEFAULT_TOP_SYMPTOMS;

#[derive(Parser)]
#[command(version, about = "Cycle and fertility predictions with calendar export")]
pub struct CykelCli {
    /// Tracker data file (JSON)
    #[arg(env = "CYKEL_DATA", long)]
    pub data: Option<PathBuf>,
    /// Date to treat as today, YYYY-MM-DD
    #[arg(env = "CYKEL_TODAY", long)]
    pub today: Option<NaiveDate>,
    #[clap(subcommand)]
    pub subcommand: CykelCommand,
}

#[derive(Subcommand)]
pub enum CykelCommand {
    ///
    /// Create a data file with the given profile
    ///
    Setup {
        #[arg(long)]
        cycle_length: Option<u32>,
        #[arg(long)]
        period_length: Option<u32>,
        #[arg(long)]
        last_period: Option<NaiveDate>,
        /// Overwrite an existing data file
        #[arg(long)]
        force: bool,
    },
    ///
    /// Predict next period, ovulation and fertile window
    ///
    Predict,
    ///
    /// Print cycle statistics
    ///
    Stats,
    ///
    /// Export projected cycles as an iCalendar file
    ///
    Export {
        #[arg(long, default_value = "cycle-events.ics")]
        out: PathBuf,
        #[command(flatten)]
        projection: ProjectionArgs,
    },
    ///
    /// Print a Google Calendar link for one projected event
    ///
    Link {
        #[arg(long, default_value_t = 0)]
        index: usize,
        #[command(flatten)]
        projection: ProjectionArgs,
    },
    ///
    /// Look for an ovulation temperature shift in BBT readings
    ///
    Bbt,
    ///
    /// Most frequent logged symptoms
    ///
    Symptoms {
        #[arg(long, default_value_t = DEFAULT_TOP_SYMPTOMS)]
        limit: usize,
    },
}

#[derive(Args)]
pub struct ProjectionArgs {
    /// Number of cycles to project
    #[arg(
        long,
        default_value_t = DEFAULT_CYCLES_AHEAD,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_CYCLES_AHEAD))
    )]
    months: u32,
    #[arg(long)]
    no_period: bool,
    #[arg(long)]
    no_fertile: bool,
    #[arg(long)]
    no_ovulation: bool,
    /// Include the predicted next period as its own event
    #[arg(long)]
    with_prediction: bool,
}

impl From<&ProjectionArgs> for ExportOptions {
    fn from(args: &ProjectionArgs) -> Self {
        ExportOptions {
            cycles_ahead: args.months,
            filter: EventFilter {
                period: !args.no_period,
                fertile: !args.no_fertile,
                ovulation: !args.no_ovulation,
                prediction: true,
            },
            include_prediction: args.with_prediction,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let dotenv_result = dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = dotenv_result {
        debug!("no .env loaded: {}", error);
    }

    let cli = CykelCli::parse();
    let path = match cli.data {
        Some(path) => path,
        None => storage::default_data_path()?,
    };
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());

    match cli.subcommand {
        CykelCommand::Setup {
            cycle_length,
            period_length,
            last_period,
            force,
        } => {
            let profile = ProfileDefaults {
                average_cycle_length: cycle_length,
                average_period_length: period_length,
                last_period_date: last_period,
            };
            commands::setup(&path, profile, force)?;
            info!("tracker data created at {}", path.display());
            Ok(())
        }
        CykelCommand::Predict => {
            let data = load(&path)?;
            print_json(&commands::get_predictions(&data, today))
        }
        CykelCommand::Stats => {
            let data = load(&path)?;
            print_json(&commands::get_stats(&data))
        }
        CykelCommand::Export { out, projection } => {
            let data = load(&path)?;
            let options = ExportOptions::from(&projection);
            let summary = commands::export_calendar(&data, &options, &out, Utc::now())?;
            if summary.events == 0 {
                warn!("no events exported; set a last period date first");
            }
            print_json(&summary)
        }
        CykelCommand::Link { index, projection } => {
            let data = load(&path)?;
            let options = ExportOptions::from(&projection);
            println!("{}", commands::calendar_link(&data, &options, index)?);
            Ok(())
        }
        CykelCommand::Bbt => {
            let data = load(&path)?;
            print_json(&commands::bbt_report(&data))
        }
        CykelCommand::Symptoms { limit } => {
            let data = load(&path)?;
            print_json(&commands::symptom_summary(&data, limit))
        }
    }
}

fn load(path: &std::path::Path) -> anyhow::Result<TrackerData> {
    if !storage::data_exists(path) {
        bail!("no tracker data at {}, run `setup` first", path.display());
    }
    storage::load(path).with_context(|| format!("reading tracker data from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

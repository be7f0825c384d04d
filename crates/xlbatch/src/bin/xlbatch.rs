use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser};
use xlbatch::SpecJob;

/// Generate a batch of Excel workbooks from a JSON job file.
#[derive(Debug, Parser)]
#[command(name = "xlbatch", version)]
struct Cli {
    /// JSON job file.
    job: PathBuf,

    /// Date stamped into names, as YYYYMMDD. Defaults to today.
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Output root; overrides the job's `dir_out`.
    #[arg(long)]
    dir_out: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|err| format!("expected YYYYMMDD, got {value:?}: {err}"))
}

fn init_logger(n_verbose: u8) {
    let level_filter = match n_verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level_filter)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let today = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let result = SpecJob::load(&cli.job).and_then(|job| job.run(today, cli.dir_out.as_deref()));
    match result {
        Ok(Some(report)) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("[BATCH] nothing to do: no split column or split values.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

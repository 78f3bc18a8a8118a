//! hourbook CLI - Worked-Hours Report Compiler
//!
//! Command-line interface for compiling and rendering hours reports from a
//! JSON dataset.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hourbook_core::{Dataset, Granularity, MemoryRecordSource, Task, User};
use hourbook_render::{ExcelRenderer, JsonRenderer, Renderer, TextRenderer};
use hourbook_report::{RangeInput, Report, ReportRequest};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, GroupBy, OutputFormat};

#[derive(Parser)]
#[command(name = "hourbook")]
#[command(author, version, about = "Worked-hours report compiler", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ./hourbook.toml if present)
    #[arg(short, long, env = "HOURBOOK_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and render a report from a dataset
    Report(ReportArgs),

    /// List the available granularities
    Granularities,
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Dataset file (JSON with tasks, users and records)
    #[arg(value_name = "DATASET")]
    dataset: PathBuf,

    /// First day of the report
    #[arg(long, value_name = "DATE")]
    from: Option<String>,

    /// Last day of the report
    #[arg(long, value_name = "DATE")]
    to: Option<String>,

    /// First ISO week of the report (YYYY_WW)
    #[arg(long, value_name = "WEEK")]
    from_week: Option<String>,

    /// Last ISO week of the report (YYYY_WW)
    #[arg(long, value_name = "WEEK")]
    to_week: Option<String>,

    /// First month of the report (YYYY_MM)
    #[arg(long, value_name = "MONTH")]
    from_month: Option<String>,

    /// Last month of the report (YYYY_MM)
    #[arg(long, value_name = "MONTH")]
    to_month: Option<String>,

    /// Column granularity (totals, tax-year, year, quarter, month, week)
    #[arg(short, long)]
    granularity: Option<Granularity>,

    /// Task to include (repeatable; all tasks if omitted)
    #[arg(short, long = "task", value_name = "ID")]
    tasks: Vec<String>,

    /// User to include and break hours down by (repeatable)
    #[arg(short, long = "user", value_name = "ID")]
    users: Vec<String>,

    /// Break hours down by every user in the dataset
    #[arg(long, conflicts_with = "users")]
    all_users: bool,

    /// How rows are grouped into sections
    #[arg(long, value_enum)]
    group_by: Option<GroupBy>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (stdout if not specified; required for xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decimal places for hour figures
    #[arg(long)]
    precision: Option<usize>,

    /// Hide per-user lines
    #[arg(long)]
    no_users: bool,

    /// Year the default range starts in when the dataset has no records
    #[arg(long)]
    first_year: Option<i32>,

    /// Date to treat as today
    #[arg(long, value_name = "DATE")]
    today: Option<NaiveDate>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let config = Config::discover(cli.config.as_deref(), &cwd)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Some(Commands::Report(args)) => cmd_report(&args, &config),
        Some(Commands::Granularities) => {
            cmd_granularities();
            Ok(())
        }
        None => {
            println!("hourbook - Worked-hours report compiler");
            println!("Run with --help for usage information");
            Ok(())
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `-v`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn cmd_granularities() {
    for granularity in Granularity::ALL {
        println!(
            "{:>2}  {:<9} {}",
            granularity.index(),
            granularity.short_name(),
            granularity.label()
        );
    }
}

fn cmd_report(args: &ReportArgs, config: &Config) -> Result<()> {
    let dataset = load_dataset(&args.dataset)?;
    info!(
        tasks = dataset.tasks.len(),
        users = dataset.users.len(),
        records = dataset.records.len(),
        "dataset loaded"
    );

    let tasks = select_tasks(&dataset, &args.tasks)?;
    let users = if args.all_users {
        dataset.users.clone()
    } else {
        select_users(&dataset, &args.users)?
    };

    let granularity = args.granularity.unwrap_or(config.report.granularity);
    let mut request = ReportRequest::new(granularity)
        .range(RangeInput {
            start: args.from.clone(),
            end: args.to.clone(),
            week_start: args.from_week.clone(),
            week_end: args.to_week.clone(),
            month_start: args.from_month.clone(),
            month_end: args.to_month.clone(),
        })
        .tasks(tasks)
        .users(users)
        .first_year(args.first_year.unwrap_or(config.report.first_year));
    if let Some(today) = args.today {
        request = request.today(today);
    }

    let source = MemoryRecordSource::from_dataset(&dataset);
    let group_by = args.group_by.unwrap_or(config.report.group_by);
    let report = Report::compile_request(request, &source, group_by.rule())
        .context("failed to compile report")?;
    info!(
        columns = report.column_count(),
        sections = report.sections.len(),
        total = report.totals.total(),
        "report compiled"
    );

    let format = args.format.unwrap_or(config.render.format);
    let precision = args.precision.unwrap_or(config.render.precision);
    let show_users = config.render.show_users && !args.no_users;

    match format {
        OutputFormat::Text => {
            let text = TextRenderer::new()
                .precision(precision)
                .show_users(show_users)
                .render(&report)?;
            write_output(args.output.as_deref(), text.as_bytes())
        }
        OutputFormat::Json => {
            let mut json = JsonRenderer::new().pretty(true).render(&report)?;
            json.push('\n');
            write_output(args.output.as_deref(), json.as_bytes())
        }
        OutputFormat::Xlsx => {
            let Some(path) = args.output.as_deref() else {
                bail!("xlsx output needs --output <FILE>");
            };
            let bytes = ExcelRenderer::new()
                .precision(precision)
                .show_users(show_users)
                .render(&report)?;
            write_output(Some(path), &bytes)
        }
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid dataset {}", path.display()))
}

/// The named tasks, or every task when none are named
fn select_tasks(dataset: &Dataset, ids: &[String]) -> Result<Vec<Task>> {
    if ids.is_empty() {
        return Ok(dataset.tasks.clone());
    }
    ids.iter()
        .map(|id| {
            dataset
                .get_task(id)
                .cloned()
                .with_context(|| format!("unknown task '{id}'"))
        })
        .collect()
}

fn select_users(dataset: &Dataset, ids: &[String]) -> Result<Vec<User>> {
    ids.iter()
        .map(|id| {
            dataset
                .get_user(id)
                .cloned()
                .with_context(|| format!("unknown user '{id}'"))
        })
        .collect()
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "report written");
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("failed to write to stdout")?;
            stdout.flush().context("failed to write to stdout")?;
        }
    }
    Ok(())
}

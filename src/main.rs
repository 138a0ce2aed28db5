use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use civictrack::commands;
use civictrack::config::{self, DEFAULT_LOG_FILTER};
use civictrack::db::Database;
use civictrack::models::{Category, Coordinates, IssueId, ReporterId, Status};
use civictrack::query::{FilterSpec, GeoBound, Selection};
use civictrack::validate::RawSubmission;

#[derive(Parser)]
#[command(name = "civictrack")]
#[command(about = "Report and track neighbourhood issues")]
#[command(version)]
struct Cli {
    /// Database file (defaults to .civictrack/issues.db in this or a parent directory)
    #[arg(long, global = true, env = "CIVICTRACK_DB")]
    db: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize civictrack in the current directory
    Init,

    /// Report a new issue
    Report {
        /// Short title
        title: String,
        /// What is wrong
        #[arg(short, long)]
        description: String,
        /// Category (Potholes, Streetlights, Garbage, Water, Traffic, Other)
        #[arg(short, long)]
        category: String,
        /// Street address or landmark
        #[arg(short, long)]
        address: Option<String>,
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Photo URL or root-relative path
        #[arg(short, long)]
        image: Option<String>,
        /// Who is reporting
        #[arg(long, env = "CIVICTRACK_REPORTER")]
        reporter: Option<String>,
    },

    /// List issues
    List {
        /// Case-insensitive text in title or description
        #[arg(short, long)]
        query: Option<String>,
        /// Filter by category, or "all"
        #[arg(short, long, default_value = "all")]
        category: Selection<Category>,
        /// Filter by status, or "all"
        #[arg(short, long, default_value = "all")]
        status: Selection<Status>,
        /// Only issues within --radius km of LAT,LON
        #[arg(long, value_parser = commands::report::parse_lat_lon, allow_hyphen_values = true)]
        near: Option<(f64, f64)>,
        /// Radius for --near, in kilometres
        #[arg(long, default_value = "5", value_parser = commands::list::parse_radius)]
        radius: f64,
        /// Only issues reported by --reporter
        #[arg(long)]
        mine: bool,
        /// Identity used by --mine
        #[arg(long, env = "CIVICTRACK_REPORTER")]
        reporter: Option<String>,
        /// Show at most this many issues
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show issue details and timeline
    Show {
        /// Issue ID
        id: IssueId,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark an issue as in progress
    Start {
        /// Issue ID
        id: IssueId,
        /// Timeline note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Mark an in-progress issue as resolved
    Resolve {
        /// Issue ID
        id: IssueId,
        /// Timeline note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Add a timeline entry without changing status
    Note {
        /// Issue ID
        id: IssueId,
        /// Short action, e.g. "Assigned to municipal worker"
        action: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Export all issues with their timelines
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Markdown,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("CIVICTRACK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn get_db(explicit: Option<&PathBuf>) -> Result<Database> {
    let cwd = env::current_dir()?;
    let db_path = config::resolve_db_path(explicit.map(PathBuf::as_path), &cwd)?;
    Database::open(&db_path).context("Failed to open database")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let db_override = cli.db.as_ref();

    match cli.command {
        Commands::Init => {
            let cwd = env::current_dir()?;
            commands::init::run(&cwd)
        }

        Commands::Report {
            title,
            description,
            category,
            address,
            lat,
            lon,
            image,
            reporter,
        } => {
            let db = get_db(db_override)?;
            let raw = RawSubmission {
                title,
                description,
                category,
                latitude: lat,
                longitude: lon,
                address,
                image_url: image,
                reporter,
            };
            commands::report::run(&db, raw).map(|_| ())
        }

        Commands::List {
            query,
            category,
            status,
            near,
            radius,
            mine,
            reporter,
            limit,
            json,
        } => {
            let reporter = if mine {
                match reporter.as_deref().and_then(ReporterId::new) {
                    Some(r) => Some(r),
                    None => bail!("--mine needs --reporter or CIVICTRACK_REPORTER"),
                }
            } else {
                None
            };
            let geo = near
                .map(|(latitude, longitude)| {
                    GeoBound::new(
                        Coordinates {
                            latitude,
                            longitude,
                        },
                        radius,
                    )
                })
                .transpose()?;
            let filter = FilterSpec {
                text: query,
                category,
                status,
                geo,
                reporter,
            };
            let db = get_db(db_override)?;
            commands::list::run(&db, &filter, limit, json)
        }

        Commands::Show { id, json } => {
            let db = get_db(db_override)?;
            commands::show::run(&db, id, json)
        }

        Commands::Start { id, note } => {
            let db = get_db(db_override)?;
            commands::status::start(&db, id, note.as_deref())
        }

        Commands::Resolve { id, note } => {
            let db = get_db(db_override)?;
            commands::status::resolve(&db, id, note.as_deref())
        }

        Commands::Note {
            id,
            action,
            description,
        } => {
            let db = get_db(db_override)?;
            commands::note::run(&db, id, &action, description.as_deref())
        }

        Commands::Export { output, format } => {
            let db = get_db(db_override)?;
            match format {
                ExportFormat::Json => commands::export::run_json(&db, output.as_deref()),
                ExportFormat::Markdown => commands::export::run_markdown(&db, output.as_deref()),
            }
        }
    }
}

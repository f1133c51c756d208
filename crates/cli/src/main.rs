// Marketboard CLI - headless market registry tracker

mod board;
mod context;
mod exit_codes;
mod registry;
mod render;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marketboard_core::StoreError;
use marketboard_protocol::DecodeError;
use marketboard_recon::{EngineError, ReconError};

use context::GlobalArgs;
use exit_codes::{
    EXIT_CONFIG, EXIT_DECODE, EXIT_ERROR, EXIT_SOURCE, EXIT_STORAGE, EXIT_SUCCESS, EXIT_USAGE,
};
use registry::RegistryCommands;

#[derive(Parser)]
#[command(name = "mboard")]
#[command(about = "Track a fixed roster of market venues against a noisy lookup feed")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation cycle against the lookup feed
    #[command(after_help = "\
Examples:
  mboard refresh --feed results.json
  mboard refresh --if-due
  mboard refresh --lat 41.6168 --lng 41.6367 --json")]
    Refresh {
        /// JSON feed of live lookup results (default: settings \"source.feed\")
        #[arg(long)]
        feed: Option<PathBuf>,

        /// Latitude passed to the lookup (requires --lng)
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude passed to the lookup (requires --lat)
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,

        /// Only refresh when the daily refresh hour has passed since the last update
        #[arg(long)]
        if_due: bool,

        /// Output JSON instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Show the registry table
    #[command(after_help = "\
Examples:
  mboard show
  mboard show --search royal
  mboard show --sort rating --asc
  mboard show --report 'https://board.example/#rpt=JTdCJTIy...'")]
    Show {
        /// Case-insensitive name filter
        #[arg(long, short = 's', default_value = "")]
        search: String,

        /// Sort key: name, rating, ratingCount (volume), locationLabel, externalId, mapLink
        #[arg(long)]
        sort: Option<String>,

        /// Sort ascending (default: descending)
        #[arg(long)]
        asc: bool,

        /// Show a shared report link instead of local state
        #[arg(long, value_name = "URL|FRAGMENT")]
        report: Option<String>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List recorded history snapshots, newest last
    History {
        /// Only the most recent N snapshots
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a shareable snapshot link for the current registry
    Share {
        /// Link base (default: settings \"share.baseUrl\")
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Decode a shared report link or fragment
    Decode {
        /// Full URL, `#rpt=...` / `#report=...` fragment, or bare payload
        link: String,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the display theme
    Theme {
        /// New theme; omit to print the current one
        value: Option<ThemeArg>,
    },

    /// Storage, freshness and roster summary
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tracked roster
    Roster {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Registry config commands
    #[command(subcommand)]
    Config(RegistryCommands),
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
    Toggle,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  marketboard-recon ", env!("CARGO_PKG_VERSION"),
        "\nreport:  #rpt= (compact v1), #report= (legacy, read-only)",
    )
}

/// Diagnostics go to stderr so `--json` stdout stays clean.
fn init_logging() {
    let filter = EnvFilter::try_from_env("MBOARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let global = cli.global;
    let result = match cli.command {
        Commands::Refresh { feed, lat, lng, if_due, json } => {
            board::cmd_refresh(&global, feed, lat.zip(lng), if_due, json)
        }
        Commands::Show { search, sort, asc, report, json } => {
            board::cmd_show(&global, &search, sort.as_deref(), asc, report.as_deref(), json)
        }
        Commands::History { limit, json } => board::cmd_history(&global, limit, json),
        Commands::Status { json } => board::cmd_status(&global, json),
        Commands::Roster { json } => board::cmd_roster(&global, json),
        Commands::Share { base_url } => report::cmd_share(&global, base_url),
        Commands::Decode { link, json } => report::cmd_decode(&link, json),
        Commands::Theme { value } => report::cmd_theme(&global, value.map(|v| match v {
            ThemeArg::Dark => report::ThemeChange::Set(marketboard_core::Theme::Dark),
            ThemeArg::Light => report::ThemeChange::Set(marketboard_core::Theme::Light),
            ThemeArg::Toggle => report::ThemeChange::Toggle,
        })),
        Commands::Config(cmd) => registry::cmd_config(&global, cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(err: ReconError) -> Self {
        Self { code: EXIT_CONFIG, message: err.to_string(), hint: None }
    }

    pub fn storage(err: StoreError) -> Self {
        Self {
            code: EXIT_STORAGE,
            message: err.to_string(),
            hint: Some("check permissions on the data directory (--data-dir)".to_string()),
        }
    }

    pub fn decode(err: DecodeError) -> Self {
        Self { code: EXIT_DECODE, message: err.to_string(), hint: None }
    }

    /// Map an engine failure to its exit code. Source failures are retryable.
    pub fn engine(err: EngineError) -> Self {
        match err {
            EngineError::Source(e) => Self {
                code: EXIT_SOURCE,
                message: e.to_string(),
                hint: Some("nothing was changed; retry once the feed is available".to_string()),
            },
            EngineError::Store(e) => Self::storage(e),
            EngineError::Encode(e) => Self::general(format!("cannot serialize state: {e}")),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Print a value as JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("cannot serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}

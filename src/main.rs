//! # Bedrock CLI (`bedrock`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bedrock metrics SOURCE_DIR BUILD_DIR OUTPUT_FILE` | Survey the browser layer and write one JSON record |
//! | `bedrock bisect BOT_NAME BUILD_NUMBER` | Bisect a new captured-sites failure locally |
//!
//! ## Examples
//!
//! ```bash
//! # Record today's metrics
//! bedrock metrics ~/chromium/src out/Default /tmp/bedrock.json
//!
//! # Show what would be bisected for autofill build 4521
//! bedrock bisect autofill 4521 -p
//!
//! # Bisect a specific password scenario
//! bedrock bisect password 1177 -s sign_in_pass_example_site
//! ```
//!
//! Diagnostics go to stderr; `RUST_LOG=debug` shows per-metric detail.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bedrock_tools::config::{self, Config};
use bedrock_tools::error::BedrockError;
use bedrock_tools::locate::{self, LocateRequest};
use bedrock_tools::oracle_git::GitOracle;
use bedrock_tools::oracle_gn::GnOracle;
use bedrock_tools::oracle_luci::LuciOracle;
use bedrock_tools::runner::CapturedSitesRunner;
use bedrock_tools::survey::{self, SurveyRequest};

/// Bedrock refactor tooling: measure the browser layer and bisect
/// captured-sites regressions.
#[derive(Parser)]
#[command(name = "bedrock", version)]
struct Cli {
    /// Path to a TOML configuration file. The built-in catalog is used
    /// when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Survey the source tree and write a JSON metrics record.
    Metrics {
        /// Root of the checkout.
        source_dir: PathBuf,
        /// Build output directory, relative to SOURCE_DIR.
        build_dir: PathBuf,
        /// Where to write the record. Overwritten.
        output_file: PathBuf,
    },

    /// Find the site that newly fails in a CI build and bisect it locally.
    ///
    /// Compares BUILD_NUMBER with the build before it. Must be run from
    /// inside the checkout.
    Bisect {
        /// `autofill` or `password`.
        bot_name: String,

        /// The failing build.
        #[arg(allow_hyphen_values = true)]
        build_number: String,

        /// Bisect this site instead of the first new failure.
        #[arg(short = 's', long = "site_name")]
        site_name: Option<String>,

        /// Print the plan without bisecting.
        #[arg(short = 'p', long = "print_only")]
        print_only: bool,

        /// Start even if the working tree has uncommitted changes.
        #[arg(long)]
        allow_dirty: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Metrics {
            source_dir,
            build_dir,
            output_file,
        } => run_metrics(&cfg, &source_dir, &build_dir, &output_file),
        Commands::Bisect {
            bot_name,
            build_number,
            site_name,
            print_only,
            allow_dirty,
        } => {
            let request = LocateRequest {
                bot: locate::parse_bot(&bot_name)?,
                bad_build_number: locate::parse_build_number(&build_number)?,
                site_override: site_name,
                print_only,
                allow_dirty,
                project: cfg.locator.project.clone(),
                bucket: cfg.locator.bucket.clone(),
            };
            run_bisect(&cfg, &request)
        }
    }
}

fn run_metrics(cfg: &Config, source_dir: &Path, build_dir: &Path, output_file: &Path) -> Result<()> {
    if !source_dir.is_dir() {
        return Err(BedrockError::user_input(format!(
            "source directory does not exist: {}",
            source_dir.display()
        ))
        .into());
    }

    let root = source_dir.join(&cfg.survey.subtree);
    let vco = GitOracle::new(source_dir);
    let build_graph = GnOracle::new(source_dir);

    let record = survey::survey(
        SurveyRequest {
            root: &root,
            build_dir,
            catalog: &cfg.survey,
        },
        &vco,
        &build_graph,
    )?;
    survey::write_record(&record, output_file)?;

    println!("metrics {}", record.commit_hash);
    println!("  timestamp: {}", record.timestamp);
    println!("  keys: {}", record.keys().len());
    println!("  written: {}", output_file.display());
    println!("ok");
    Ok(())
}

fn run_bisect(cfg: &Config, request: &LocateRequest) -> Result<()> {
    let vco = GitOracle::new(".");
    let ci = LuciOracle::new(&cfg.locator)?;
    let runner = CapturedSitesRunner::new(cfg.locator.control_script.clone());

    let outcome = locate::locate(request, &vco, &ci, &runner, &runner)?;
    if outcome.bisected {
        println!("bisect finished for {}", outcome.selection.site);
    } else {
        println!("print-only: no bisection started");
    }
    Ok(())
}

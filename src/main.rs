/*!
 * Fieldtrack CLI - Command Line Interface
 *
 * Runs the tracking pipeline on a host: the interval scheduler plays the
 * platform's background task service, the configured source supplies
 * positions and samples are posted to the telemetry backend.
 */

use clap::{Parser, Subcommand};
use console::style;
use fieldtrack::{
    commands::init::run_init_wizard,
    config::TrackerConfig,
    error::{FieldtrackError, Result, EXIT_FATAL, EXIT_NOT_TRACKING, EXIT_SUCCESS},
    logging,
    system::{self, permissions::static_for_mode, ConsoleIndicator, PromptPermissions},
    BackgroundCaptureTask, CaptureStats, HttpReporter, InterfaceProbe, ObserverSet,
    ReachabilityProbe, SampleReporter, StartOutcome, StopOutcome, TracingObserver,
    TrackingLifecycleController,
};
use fieldtrack_core_interface::{LocationSample, PermissionPort};
use fieldtrack_scheduler::IntervalScheduler;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fieldtrack")]
#[command(version, about = "Background location telemetry for field devices", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.fieldtrack/fieldtrack.toml if present)
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a configuration (interactive setup wizard)
    Init,

    /// Start background tracking and run until Ctrl-C
    Track,

    /// Show whether this host currently looks online
    Probe,

    /// Send a single location sample now
    Report {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,

        /// Horizontal accuracy in meters
        #[arg(long)]
        accuracy: f64,

        /// Speed in meters per second
        #[arg(long, default_value = "0")]
        speed: f64,
    },

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => Ok(match run_init_wizard() {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                eprintln!("{} {}", style("Error:").red().bold(), e);
                EXIT_FATAL
            }
        }),
        Commands::Status => {
            let config = load_config(&cli.config, cli.verbose)?;
            print_status(&config, cli.config)?;
            Ok(EXIT_SUCCESS)
        }
        Commands::Probe => Ok(probe()),
        Commands::Report {
            latitude,
            longitude,
            accuracy,
            speed,
        } => {
            let config = load_config(&cli.config, cli.verbose)?;
            logging::init_logging(&config)?;
            let sample = LocationSample::new(latitude, longitude, accuracy).with_speed(speed);
            report_once(&config, &sample).await?;
            Ok(EXIT_SUCCESS)
        }
        Commands::Track => {
            let config = load_config(&cli.config, cli.verbose)?;
            logging::init_logging(&config)?;
            track(&config).await
        }
    }
}

fn load_config(path: &Option<PathBuf>, verbose: bool) -> Result<TrackerConfig> {
    let mut config = TrackerConfig::load(path.as_deref())?;
    if verbose {
        config.verbose = true;
    }
    config.validate()?;
    Ok(config)
}

async fn track(config: &TrackerConfig) -> Result<i32> {
    let provider = system::provider::from_config(&config.source)?;
    let scheduler = Arc::new(
        IntervalScheduler::new(provider).with_indicator(Arc::new(ConsoleIndicator::new())),
    );

    let stats = Arc::new(CaptureStats::new());
    let observer = ObserverSet::new()
        .with(Arc::new(TracingObserver))
        .with(stats.clone());
    let task = BackgroundCaptureTask::new(
        Arc::new(InterfaceProbe::new()),
        Arc::new(HttpReporter::from_config(config)?),
    )
    .with_observer(Arc::new(observer));

    let permissions: Arc<dyn PermissionPort> = match static_for_mode(config.permissions) {
        Some(fixed) => Arc::new(fixed),
        None => Arc::new(PromptPermissions::new()),
    };

    let controller = TrackingLifecycleController::new(
        permissions,
        scheduler.clone(),
        Arc::new(task),
        config.task_name.clone(),
        config.task_options(),
    );

    match controller.start().await {
        StartOutcome::Registered | StartOutcome::AlreadyRegistered => {}
        StartOutcome::PermissionDenied(scope) => {
            eprintln!(
                "{} {} location permission not granted; tracking not started",
                style("✗").red().bold(),
                scope
            );
            return Ok(EXIT_NOT_TRACKING);
        }
        StartOutcome::SchedulerUnavailable => {
            eprintln!(
                "{} Background scheduler unavailable; tracking not started",
                style("✗").red().bold()
            );
            return Ok(EXIT_NOT_TRACKING);
        }
    }

    println!(
        "Reporting to {} every {} ms. Press Ctrl-C to stop.",
        style(config.telemetry_url()?).cyan(),
        config.min_interval_ms
    );

    tokio::signal::ctrl_c().await?;
    println!();

    if let StopOutcome::SchedulerUnavailable = controller.stop().await {
        eprintln!(
            "{} Could not deregister the capture task cleanly",
            style("Warning:").yellow()
        );
    }
    scheduler.shutdown().await;

    println!("{}", style("Session Summary").bold());
    println!("  {}", stats.snapshot().summary());
    Ok(EXIT_SUCCESS)
}

fn probe() -> i32 {
    if InterfaceProbe::new().is_connected() {
        println!("{} online", style("●").green().bold());
        EXIT_SUCCESS
    } else {
        println!("{} offline", style("○").dim());
        EXIT_NOT_TRACKING
    }
}

async fn report_once(config: &TrackerConfig, sample: &LocationSample) -> Result<()> {
    let reporter = HttpReporter::from_config(config)?;
    reporter
        .report(sample)
        .await
        .map_err(FieldtrackError::Report)?;

    println!(
        "{} Sample delivered to {}",
        style("✓").green().bold(),
        style(reporter.url()).cyan()
    );
    Ok(())
}

fn print_status(config: &TrackerConfig, explicit: Option<PathBuf>) -> Result<()> {
    let source = match explicit {
        Some(path) => path.display().to_string(),
        None => {
            let default = TrackerConfig::default_path()?;
            if default.exists() {
                default.display().to_string()
            } else {
                "built-in defaults".to_string()
            }
        }
    };

    let mut shown = config.clone();
    if shown.auth_token.is_some() {
        shown.auth_token = Some("********".to_string());
    }

    println!("{} {}", style("Configuration:").bold(), style(source).cyan());
    println!("{} {}", style("Endpoint:").bold(), config.telemetry_url()?);
    println!();
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

use anyhow::Context;
use check_multiple::{
    config::{Settings, read_config_file},
    error::{Error, Result},
    report::{Report, local_hostname},
};
use clap::{ArgAction, Parser, error::ErrorKind};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::{error, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Run a monitoring plugin once per parameter and report the aggregate status
#[derive(Debug, Clone, Parser)]
#[command(version)]
struct Args {
    /// Config file (JSON)
    #[arg(short, long)]
    file: Option<String>,

    /// Seconds each check may run before it is killed
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Shell used to run the command lines
    #[arg(long)]
    shell: Option<String>,

    /// Maximum number of checks running at the same time
    #[arg(short = 'j', long, value_name = "N")]
    max_parallelism: Option<usize>,

    /// Print an NSCA submission line for this service instead of plugin output
    #[arg(long, value_name = "SERVICE")]
    passive: Option<String>,

    /// Host name used for passive output (defaults to the local host name)
    #[arg(long)]
    hostname: Option<String>,

    /// Log to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Base command, e.g. "check_rabbitmq_queue --vhost=events --queue"
    #[arg(allow_hyphen_values = true)]
    command: String,

    /// Values appended to the base command, one check each
    #[arg(allow_hyphen_values = true)]
    parameters: Vec<String>,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            timeout: self.timeout,
            shell: self.shell.clone(),
            max_parallelism: self.max_parallelism,
            passive: self.passive.clone(),
            hostname: self.hostname.clone(),
        }
    }
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_target("check_multiple", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            let reason = e.to_string();
            let reason = reason.lines().next().unwrap_or_default().trim_start_matches("error: ");
            Report::error(&Error::InvalidConfig(format!("invalid arguments: {reason}"))).exit()
        }
    };

    init(args.verbose);
    dotenv::dotenv().ok();
    trace!("started with args: {args:?}");

    // Listen before any check is spawned so a signal never hits the default action.
    let signals = match ShutdownSignals::install() {
        Ok(signals) => Some(signals),
        Err(e) => {
            error!("{e:#}");
            None
        }
    };

    let report = match execute(&args, signals).await {
        Ok(report) => report,
        Err(e) => {
            error!("{e}");
            Report::error(&e)
        }
    };

    report.exit()
}

async fn execute(args: &Args, signals: Option<ShutdownSignals>) -> Result<Report> {
    let mut settings = Settings::from_env()?;
    if let Some(file) = &args.file {
        settings = settings.merge(read_config_file(file)?);
    }
    let config = settings.merge(args.settings()).resolve()?;
    trace!("resolved config: {config:?}");

    let aggregate =
        check_multiple::run(&args.command, &args.parameters, &config, shutdown_signal(signals)).await?;

    let report = Report::plugin(&aggregate);
    Ok(match &config.passive {
        Some(passive) => {
            let hostname = passive.hostname.clone().unwrap_or_else(local_hostname);
            report.passive(&hostname, &passive.service)
        }
        None => report,
    })
}

/// SIGINT and SIGTERM listeners
struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    fn install() -> anyhow::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?,
        })
    }
}

/// Resolves on SIGINT or SIGTERM, never without listeners
async fn shutdown_signal(signals: Option<ShutdownSignals>) {
    let Some(mut signals) = signals else {
        return std::future::pending().await;
    };

    tokio::select! {
        _ = signals.interrupt.recv() => {}
        _ = signals.terminate.recv() => {}
    }
}

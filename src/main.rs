use azure_nic_replace::azure::{check_az_cli, AzCli};
use azure_nic_replace::config::{self, Settings, Timings};
use azure_nic_replace::workflow::PollPolicy;
use clap::{Parser, Subcommand};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "Replace Azure VM NICs while keeping their private IP")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Seconds between power state checks
    #[arg(long, env = "NIC_CHECK_INTERVAL_SECS", default_value_t = config::DEFAULT_CHECK_INTERVAL_SECS, global = true)]
    check_interval_secs: u64,

    /// Give up waiting for deallocate/start after this many minutes
    #[arg(long, env = "NIC_MAX_WAIT_MINUTES", default_value_t = config::DEFAULT_MAX_WAIT_MINUTES, global = true)]
    max_wait_minutes: u64,

    /// Pause before moving the new NIC to its target IP
    #[arg(long, env = "NIC_IP_SETTLE_SECS", default_value_t = config::DEFAULT_IP_SETTLE_SECS, global = true)]
    ip_settle_secs: u64,

    /// Pause after deleting a leftover NIC
    #[arg(long, env = "NIC_NAME_RELEASE_SECS", default_value_t = config::DEFAULT_NAME_RELEASE_SECS, global = true)]
    name_release_secs: u64,

    /// Directory for the CSV result report
    #[arg(long, env = "NIC_REPORT_DIR", default_value = ".", global = true)]
    report_dir: PathBuf,

    /// Timezone for the report timestamp, e.g. Pacific/Auckland
    #[arg(long, env = "NIC_REPORT_TZ", default_value = "UTC", global = true)]
    report_tz: String,

    /// log4rs configuration file
    #[arg(long, env = "NIC_LOG_CONFIG", default_value = "log4rs.yml", global = true)]
    log_config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the NIC of every VM listed in the CSV
    Replace {
        #[arg(short, long)]
        input: PathBuf,
        /// Do not re-read the new NICs after the run
        #[arg(long)]
        skip_verify: bool,
    },
    /// Set accelerated networking on the first NIC of every VM listed in the CSV
    Accel {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Check each VM's NIC against the target IP without changing anything
    Verify {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn init_logging(log_config: &Path) {
    if log4rs::init_file(log_config, Default::default()).is_ok() {
        return;
    }
    // No config file, log to the console only.
    let stdout = ConsoleAppender::builder().build();
    if let Ok(config) = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(log::LevelFilter::Info))
    {
        let _ = log4rs::init_config(config);
    }
    log::warn!("{} not usable, logging to console", log_config.display());
}

fn settings(cli: &Cli) -> Result<Settings, Box<dyn Error>> {
    Ok(Settings {
        timings: Timings {
            poll: PollPolicy::new(cli.check_interval_secs, cli.max_wait_minutes),
            ip_settle: Duration::from_secs(cli.ip_settle_secs),
            name_release: Duration::from_secs(cli.name_release_secs),
        },
        report_dir: cli.report_dir.clone(),
        report_tz: config::parse_tz(&cli.report_tz)?,
    })
}

fn run(cli: Cli) -> Result<bool, Box<dyn Error>> {
    let settings = settings(&cli)?;
    check_az_cli().map_err(|e| format!("azure-cli is not installed or not working: {e}"))?;
    let client = AzCli::new();

    // Ok(true) when everything succeeded
    match &cli.command {
        Command::Replace { input, skip_verify } => {
            let summary =
                azure_nic_replace::replace_from_file(&client, input, &settings, !skip_verify)?;
            Ok(!summary.has_failures())
        }
        Command::Accel { input } => {
            let summary = azure_nic_replace::accel_from_file(&client, input)?;
            Ok(!summary.has_failures())
        }
        Command::Verify { input } => {
            let verifications = azure_nic_replace::verify_from_file(&client, input)?;
            Ok(verifications.iter().all(|v| v.passed))
        }
    }
}

fn main() -> ExitCode {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_config);
    log::info!("#Start main()");

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

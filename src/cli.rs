//! Command-line surface of the `bucket-sync` binary.

use anyhow::{Context, Result};
use bridge_local::DirectoryObjectStore;
use bridge_traits::AccessPolicy;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_runtime::SyncConfig;
use core_sync::{SyncOutcome, SyncSession};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Every object copied.
pub const EXIT_SUCCESS: u8 = 0;
/// Some objects were rejected or never copied.
pub const EXIT_PARTIAL_FAILURE: u8 = 1;
/// The sync could not run: bad arguments, bad configuration or a failed listing.
pub const EXIT_FATAL: u8 = 2;

pub fn command() -> Command {
    Command::new("bucket-sync")
        .about("Copy every object of one container into another")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("source")
                .long("source")
                .value_name("CONTAINER")
                .help("Container to copy from")
                .required(true),
        )
        .arg(
            Arg::new("dest")
                .long("dest")
                .value_name("CONTAINER")
                .help("Container to copy into")
                .required(true),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .help("Directory holding one sub-directory per container")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("parallelism")
                .long("parallelism")
                .short('p')
                .value_name("N")
                .help("Concurrent copies [default: available CPUs]")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-rounds")
                .long("max-rounds")
                .value_name("N")
                .help("Give up after N copy rounds [default: until retries stop shrinking]")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("access-policy")
                .long("access-policy")
                .value_name("POLICY")
                .help("Access policy for written objects")
                .value_parser(["private", "public-read", "public-read-write", "authenticated-read"])
                .default_value("public-read"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("trace, debug, info, warn or error")
                .default_value("warn"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("pretty, json or compact"),
        )
        .arg(
            Arg::new("create-dest")
                .long("create-dest")
                .help("Create the destination container if it does not exist")
                .action(ArgAction::SetTrue),
        )
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub source: String,
    pub dest: String,
    pub root: PathBuf,
    pub parallelism: Option<usize>,
    pub max_rounds: Option<u32>,
    pub access_policy: AccessPolicy,
    pub log_level: LogLevel,
    pub log_format: Option<LogFormat>,
    pub create_dest: bool,
}

impl CliArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let string = |name: &str| matches.get_one::<String>(name).cloned();

        let access_policy = string("access-policy")
            .unwrap_or_default()
            .parse::<AccessPolicy>()?;
        let log_level = string("log-level")
            .unwrap_or_default()
            .parse::<LogLevel>()?;
        let log_format = string("log-format")
            .map(|format| format.parse::<LogFormat>())
            .transpose()?;

        Ok(Self {
            source: string("source").context("--source is required")?,
            dest: string("dest").context("--dest is required")?,
            root: matches
                .get_one::<PathBuf>("root")
                .cloned()
                .context("--root is required")?,
            parallelism: matches.get_one::<usize>("parallelism").copied(),
            max_rounds: matches.get_one::<u32>("max-rounds").copied(),
            access_policy,
            log_level,
            log_format,
            create_dest: matches.get_flag("create-dest"),
        })
    }

    pub fn sync_config(&self) -> Result<SyncConfig> {
        let mut builder = SyncConfig::builder()
            .source_container(&self.source)
            .dest_container(&self.dest)
            .access_policy(self.access_policy);
        if let Some(parallelism) = self.parallelism {
            builder = builder.parallelism(parallelism);
        }
        if let Some(rounds) = self.max_rounds {
            builder = builder.max_rounds(rounds);
        }
        builder.build().context("invalid sync configuration")
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::default().with_level(self.log_level);
        match self.log_format {
            Some(format) => config.with_format(format),
            None => config,
        }
    }
}

/// Parse `args`, run the sync and map the result to a process exit code.
pub async fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = match command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_FATAL } else { EXIT_SUCCESS });
        }
    };

    let args = match CliArgs::from_matches(&matches) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    if let Err(e) = init_logging(args.logging_config()) {
        eprintln!("error: {}", e);
        return ExitCode::from(EXIT_FATAL);
    }

    match execute(&args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "bucket-sync failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn execute(args: &CliArgs) -> Result<u8> {
    let config = args.sync_config()?;
    let store = DirectoryObjectStore::new(&args.root);
    if args.create_dest {
        store
            .create_container(&args.dest)
            .await
            .with_context(|| format!("failed to create container {}", args.dest))?;
    }

    info!(root = ?args.root, source = %args.source, dest = %args.dest, "Starting bucket-sync");

    let report = SyncSession::new(config, Arc::new(store))?.run().await?;
    println!("{}", report);

    Ok(match report.outcome() {
        SyncOutcome::Success => EXIT_SUCCESS,
        SyncOutcome::PartialFailure => EXIT_PARTIAL_FAILURE,
    })
}

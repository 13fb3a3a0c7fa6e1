// src/main.rs
use anyhow::Context;
use clap::Parser;
use flickr_history::{
    ApiKeyPool, CommandLineInput, FlickrClient, HarvestConfig, Harvester, JsonCoverageFile,
    SqliteStore,
};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::sync::Arc;

/// Sets up logging: warnings (or everything, with `--verbose`) to stderr,
/// debug output to a log file in the temp dir.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("flickr_history.log");

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)
        .with_context(|| format!("cannot open log file {}", log_file_path.display()))?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("console", Box::new(console_appender)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(LevelFilter::Debug),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Wires the collaborators together and harvests until terminated.
async fn harvest(config: HarvestConfig) -> anyhow::Result<()> {
    let keys = Arc::new(ApiKeyPool::new(
        config.api_keys.clone(),
        config.requests_per_hour,
    )?);
    let client = Arc::new(FlickrClient::new(keys)?);
    let store = Arc::new(
        SqliteStore::open(&config.database)
            .with_context(|| format!("cannot open database {}", config.database.display()))?,
    );
    let coverage = Arc::new(JsonCoverageFile::new(&config.coverage_file));

    log::info!(
        "Storing into {}, tracking coverage in {}",
        config.database.display(),
        config.coverage_file.display()
    );

    let harvester = Harvester::new(&config, client, store, coverage);
    let summary = harvester.run(termination_signal()).await?;

    println!("{}", summary);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    let config = HarvestConfig::resolve(cli)?;

    setup_logging(config.verbose)?;

    harvest(config).await
}

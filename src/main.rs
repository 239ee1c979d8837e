use shelfwright::audible::AudibleClient;
use shelfwright::config::Config;
use shelfwright::importer::{AudiobookImporter, PathMapper};
use shelfwright::metadata::probe::FfprobeTagReader;
use shelfwright::notifications::Notifications;
use shelfwright::qbit::QbitClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise fall back to the config file
    // level (loaded below), defaulting to info
    let env_filter = std::env::var("RUST_LOG").ok();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            // Logging may not be up yet
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    let log_filter = env_filter.unwrap_or_else(|| {
        if config.logging.level.is_empty() {
            "info".to_string()
        } else {
            config.logging.level.clone()
        }
    });
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let gateway = Arc::new(QbitClient::new(&config.qbit));
    let catalog = Arc::new(AudibleClient::new());
    let tag_reader = Arc::new(FfprobeTagReader);
    let notifications = Arc::new(Notifications::new(config.notifications.notifiers.clone()));
    let paths = PathMapper::new(
        config.qbit.download_path.clone(),
        config.qbit.local_download_path.clone(),
    );

    let importer = match AudiobookImporter::new(
        gateway,
        catalog,
        tag_reader,
        notifications,
        paths,
        config.importers.clone(),
    ) {
        Ok(importer) => importer,
        Err(err) => {
            error!(error = %err, "Invalid importer configuration");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            signal_token.cancel();
        }
    });

    let interval = Duration::from_secs(config.importers.sweep_interval_secs);

    // Sweeps are strictly serialized: the next one only starts after the
    // previous one finished
    loop {
        if let Err(err) = importer.run_once(&cancel).await {
            error!(error = %err, "Import sweep failed");
        }

        if interval.is_zero() || cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunedrop::Config;
use tunedrop::api::{ApiServer, ApiServerConfig, AppState};
use tunedrop::pipeline::{
    BeetsImporter, DownloadPipeline, HttpRescanNotifier, OdesliResolver, YtDlpConfig, YtDlpFetcher,
};
use tunedrop::queue::{EvictionConfig, JobQueue, QueueConfig};

/// How long shutdown waits for workers to notice the stop flag.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunedrop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tokio::fs::create_dir_all(&config.staging_dir).await?;
    tokio::fs::create_dir_all(&config.library_dir).await?;

    // Wire the download pipeline and its collaborators.
    let resolver = Arc::new(OdesliResolver::new(
        &config.odesli_api_url,
        config.request_timeout,
    )?);
    let fetcher = Arc::new(YtDlpFetcher::with_config(YtDlpConfig {
        audio_codec: config.audio_codec.clone(),
        audio_quality: config.audio_quality.clone(),
        ..Default::default()
    }));

    let mut pipeline = DownloadPipeline::new(
        resolver,
        fetcher,
        config.staging_dir.clone(),
        config.library_dir.clone(),
    );
    if config.use_beets {
        pipeline = pipeline.with_importer(Arc::new(BeetsImporter::new(config.beets_args.clone())));
    }
    for url in &config.rescan_urls {
        match HttpRescanNotifier::new(url, config.request_timeout) {
            Ok(notifier) => pipeline = pipeline.with_notifier(Arc::new(notifier)),
            Err(e) => tracing::warn!("Skipping rescan target {}: {}", url, e),
        }
    }

    let queue = JobQueue::start(
        QueueConfig::new()
            .with_worker_count(config.worker_count)
            .with_poll_interval_ms(config.dequeue_poll.as_millis() as u64)
            .with_eviction(
                EvictionConfig::new()
                    .with_interval_secs(config.evict_interval.as_secs())
                    .with_max_age_secs(config.evict_max_age.as_secs()),
            ),
        Arc::new(pipeline),
    );

    let server = ApiServer::new(
        ApiServerConfig {
            bind_address: config.bind_address.clone(),
            port: config.port,
            enable_cors: true,
        },
        AppState::new(queue.clone(), config.library_dir.clone()),
    );

    // ctrl-c stops the HTTP server, then the queue drains.
    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received ctrl-c");
            cancel_token.cancel();
        }
    });

    server.run().await?;
    queue.shutdown(SHUTDOWN_TIMEOUT).await;

    tracing::info!("tunedrop stopped");
    Ok(())
}

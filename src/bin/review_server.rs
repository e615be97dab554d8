use std::sync::Arc;

use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use restaurant_reviews::{
    review_service, Config, InMemoryRankingStore, InMemoryRecordStore, RankingStore, ReviewPipeline,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    start(Config::load()).await;
}

#[cfg(feature = "redis")]
async fn start(config: Config) {
    let Some(url) = config.redis_url.clone() else {
        return run(config, Arc::new(InMemoryRankingStore::new())).await;
    };
    match restaurant_reviews::RedisRankingStore::open(&url, config.store_timeout()) {
        Ok(ranking) => {
            info!("Using redis ranking store");
            run(config, Arc::new(ranking)).await;
        }
        Err(e) => {
            error!("Failed to open redis ranking store: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn start(config: Config) {
    if config.redis_url.is_some() {
        warn!("REVIEWS_REDIS_URL is set but the redis feature is disabled, using in-memory rankings");
    }
    run(config, Arc::new(InMemoryRankingStore::new())).await;
}

async fn run<K: RankingStore + 'static>(config: Config, ranking: Arc<K>) {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = ReviewPipeline::new(store, ranking, config.pipeline());
    let worker = pipeline.spawn_worker();
    let service = Arc::new(review_service(pipeline));

    if let Err(e) = restaurant_reviews::commands::serve(service, &config.addr(), shutdown_signal()).await {
        error!("Server error: {e}");
    }

    let stats = worker.stop();
    info!(
        polls = stats.polls,
        events_applied = stats.events_applied,
        failures = stats.failures,
        "Server shutting down"
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use freed_api::AppStateInner;
use freed_core::mailer::{Links, SmtpNotifier};
use freed_core::{
    FeedLifecycle, HttpFetcher, LifecycleConfig, LogNotifier, Notifier, Scheduler, Signer,
};
use freed_db::{FeedStore, KvStore, MemoryStore, RedisStore};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freed=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let kv: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            warn!("FREED_REDIS_URL not set; feeds are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    let store = FeedStore::new(kv);

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp, Links::new(&config.public_url))?),
        None => {
            warn!("FREED_SMTP_HOST not set; notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    let signer = Signer::with_length(config.secret_key.as_bytes(), config.sig_length);
    info!("Signing action links with {}-character tokens", signer.token_length());

    let lifecycle = Arc::new(FeedLifecycle::new(
        store,
        signer,
        Arc::new(HttpFetcher::new(config.fetch_timeout)?),
        notifier,
        LifecycleConfig {
            unverified: config.unverified,
            fetch_timeout: config.fetch_timeout,
            ..LifecycleConfig::default()
        },
    ));

    // One polling task per feed, reconciled with the index on an interval
    let scheduler = Arc::new(Scheduler::new(lifecycle.clone(), config.rescan));
    tokio::spawn(scheduler.clone().run());

    let app = freed_api::router(Arc::new(AppStateInner { lifecycle }))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("freed listening on {} (public url {})", addr, config.public_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Could not install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

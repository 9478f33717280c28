use farm_monitor::{
    api::{self, AppState},
    config::Config,
    events::EventSink,
    ingest::Ingestor,
    mailer::{AlertMailer, SmtpMailer},
    mqtt,
    rate_limiter::EmailRateLimiter,
    store::{self, SensorStore},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting farm-monitor");

    let cfg_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".into());
    let cfg = Config::load(&cfg_path)?;
    info!("Configuration loaded from: {}", cfg_path);

    let pool = store::connect(&cfg.database).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Connected to database");

    let sensor_store: Arc<dyn SensorStore> = Arc::new(store::PgStore::new(pool));
    let events = EventSink::new(100);
    let mailer: Arc<dyn AlertMailer> = Arc::new(SmtpMailer::new(&cfg.smtp)?);
    let rate_limiter = Arc::new(EmailRateLimiter::new());
    let ingestor = Ingestor::new(
        sensor_store.clone(),
        mailer,
        rate_limiter,
        events.clone(),
    );

    // Dashboard server: health, alert-settings API, WebSocket event feed.
    let router = api::create_router(AppState {
        store: sensor_store,
        events,
    });
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;
    info!("Dashboard server listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "dashboard server error");
        }
    });

    let opts = mqtt::build_options(&cfg.mqtt)?;
    let (client, mut eventloop) = mqtt::new_client(opts);
    client
        .subscribe(cfg.mqtt.topic.clone(), mqtt::qos(cfg.mqtt.qos))
        .await?;
    info!(topic = %cfg.mqtt.topic, "subscribed to sensor topic");

    let sig = tokio::signal::ctrl_c();
    tokio::pin!(sig);
    loop {
        tokio::select! {
            biased;
            _ = &mut sig => {
                info!("shutdown requested");
                break;
            }
            res = mqtt::next_publish(&mut eventloop) => {
                match res {
                    Ok(Some(publish)) => {
                        let topic = match std::str::from_utf8(&publish.topic) {
                            Ok(s) => s.to_string(),
                            Err(_) => {
                                warn!("non-utf8 topic; skipping message");
                                continue;
                            }
                        };
                        if let Err(e) = ingestor.handle_message(&topic, publish.payload.as_ref()).await {
                            warn!(topic = %topic, error = %e, "processing failed for incoming message");
                        }
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("mqtt error: {e}; reconnecting after short delay");
                        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    }
                }
            }
        }
    }

    info!("Application shutdown complete");
    Ok(())
}

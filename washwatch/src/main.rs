use std::sync::Arc;

use tracing::{debug, info, warn};

use rooms_status::provider::{
    CyclingProvider, FallbackChain, StatusProvider, client_with_timeout, default_chain,
};
use washwatch::notifier::{LogNotifier, Notifier, WebhookNotifier};
use washwatch::scheduler::{NotificationScheduler, TokioWakeScheduler};
use washwatch::store::{MachineStore, MemoryStore, NewPendingNotification};
use washwatch::{RoomRefresher, WatcherConfig, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them.
    dotenvy::dotenv().ok();

    let config = WatcherConfig::from_env()?;
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;

    info!(
        rooms = ?config.rooms,
        refresh_interval_secs = config.refresh_interval_secs,
        use_synthetic = config.use_synthetic,
        "washwatch starting"
    );
    if config.rooms.is_empty() {
        warn!("no rooms configured; set WASHWATCH_ROOMS to start watching");
    }

    let source: Arc<dyn StatusProvider> = if config.use_synthetic {
        Arc::new(FallbackChain::new(vec![Arc::new(CyclingProvider::new())]))
    } else {
        let client = client_with_timeout(config.request_timeout());
        Arc::new(default_chain(
            &config.cloud_base_url,
            &config.esuds_base_url,
            client,
        ))
    };

    let store = Arc::new(MemoryStore::new());
    for watch in &config.watches {
        let created = store
            .insert_pending(NewPendingNotification {
                machine: watch.machine,
                desired_status: watch.desired_status,
            })
            .await?;
        info!(
            room_id = created.machine.room_id,
            number = created.machine.number,
            desired = %created.desired_status,
            "watching machine"
        );
    }

    let refresher = Arc::new(RoomRefresher::new(source, store.clone()));
    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    };
    let (wake, mut wake_fired) = TokioWakeScheduler::new();
    let scheduler = Arc::new(NotificationScheduler::new(
        refresher.clone(),
        store,
        notifier,
        wake,
        config.estimates.clone(),
    ));

    // Mirror refresh completions into the log.
    let mut refresh_events = refresher.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = refresh_events.recv().await {
            debug!(
                room_id = event.room_id,
                success = event.success,
                "room refreshed"
            );
        }
    });

    let mut ticker = tokio::time::interval(config.refresh_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            _ = ticker.tick() => {
                if !config.rooms.is_empty() {
                    if let Err(error) = refresher.refresh_many(&config.rooms).await {
                        warn!(%error, "periodic refresh failed");
                    }
                }
                if let Err(error) = scheduler.run_sweep().await {
                    warn!(%error, "notification sweep failed");
                }
            }
            Some(token) = wake_fired.recv() => {
                debug!(token, "wake fired");
                if let Err(error) = scheduler.run_sweep().await {
                    warn!(%error, "notification sweep failed");
                }
            }
        }
    }

    Ok(())
}

use dome_core::calendar::{Clock, SystemClock};
use dome_core::config::CoreConfig;
use dome_core::events::EventBus;
use env_logger::Env;
use log::{error, info};
use runtime::AutomationEngine;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use store::Store;

#[tokio::main]
async fn main() {
    color_eyre::install().unwrap();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = CoreConfig::default();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let boot_nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1);
    let owner_token = boot_nonce;

    let store = Arc::new(Store::new(boot_nonce));
    let bus = Arc::new(EventBus::default());

    bootstrap(&store, clock.as_ref());

    let mut engine = AutomationEngine::new(
        store.clone(),
        bus.clone(),
        clock.clone(),
        config.clone(),
        owner_token,
    );

    // Reattach to anything that was live when the process last stopped.
    if let Err(e) = engine.recover() {
        error!("live match recovery failed: {}", e);
    }

    info!("timing automation online, tick every 60s");

    let mut leader_ticks = tokio::time::interval(Duration::from_secs(60));
    let mut live_ticks = tokio::time::interval(Duration::from_secs(1) / config.tick_rate_hz);

    loop {
        tokio::select! {
            _ = leader_ticks.tick() => {
                engine.tick();
            }
            _ = live_ticks.tick() => {
                engine.pump_live(clock.now());
            }
        }
    }
}

/// First boot: open season 1 anchored on today.
fn bootstrap(store: &Arc<Store>, clock: &dyn Clock) {
    let now = clock.now();

    let missing = store.read(|world| world.current_season().is_none());
    if !missing {
        return;
    }

    store
        .with_tx(now, |tx| {
            tx.create_season(1, now);
            Ok(())
        })
        .expect("season bootstrap cannot fail on an empty world");

    info!("bootstrapped season 1 starting {}", now);
}

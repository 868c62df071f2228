//! Process entry point. Boots logging, loads `config.json` and the
//! content catalog, builds the single `WorldState`, then runs the
//! tick scheduler and the TCP accept loop side by side until
//! `Ctrl-C` -- one process, a handful of cooperating tasks.

mod bus;
mod dispatch;
mod session;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mud_config::Config;
use mud_player::PlayerStore;
use mud_world::WorldState;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Shared server handle passed to every spawned task: the single
/// game-state lock plus the process-wide config (already `'static` via
/// `mud_config`'s `OnceLock`).
pub struct AppState {
    pub world: Mutex<WorldState>,
    pub cfg: &'static Config,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("logger already initialized");

    let data_dir = PathBuf::from(env_or("MUD_DATA_DIR", "data"));
    let player_dir = PathBuf::from(env_or("MUD_PLAYER_DIR", "data/players"));
    let listen_addr = env_or("MUD_LISTEN_ADDR", "0.0.0.0:4000");

    let cfg = mud_config::load(&data_dir).unwrap_or_else(|e| {
        log::error!("failed to load config: {e}");
        std::process::exit(1);
    });
    let loaded = mud_data::load(&data_dir).unwrap_or_else(|e| {
        log::error!("failed to load world content: {e}");
        std::process::exit(1);
    });
    log::info!(
        "loaded {} locations, {} items, {} enemies, {} npcs, {} quests, {} shops, {} recipes, {} materials",
        loaded.catalog.locations.len(),
        loaded.catalog.items.len(),
        loaded.catalog.enemies.len(),
        loaded.catalog.npcs.len(),
        loaded.catalog.quests.len(),
        loaded.catalog.shops.len(),
        loaded.catalog.recipes.len(),
        loaded.catalog.materials.len(),
    );

    let store = PlayerStore::new(player_dir);
    let world = WorldState::new(loaded, store);

    let app = Arc::new(AppState {
        world: Mutex::new(world),
        cfg,
    });

    let listener = TcpListener::bind(&listen_addr).await.unwrap_or_else(|e| {
        log::error!("failed to bind {listen_addr}: {e}");
        std::process::exit(1);
    });
    log::info!("listening on {listen_addr}");

    let tick_app = app.clone();
    let tick_handle = tokio::spawn(async move { run_tick_loop(tick_app).await });

    tokio::select! {
        () = accept_loop(listener, app.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutdown signal received");
        }
    }

    tick_handle.abort();
    persist_all(&app).await;
}

async fn accept_loop(listener: TcpListener, app: Arc<AppState>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let app = app.clone();
                tokio::spawn(async move {
                    session::handle_connection(app, stream, addr).await;
                });
            }
            Err(e) => {
                log::error!("failed to accept connection: {e}");
            }
        }
    }
}

/// Drives the Tick Scheduler on a fixed interval for the life
/// of the process, delivering whatever emissions each tick produces
/// through the Message Bus.
async fn run_tick_loop(app: Arc<AppState>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(app.cfg.tick_interval_ms));
    let mut rng = rand::thread_rng();
    loop {
        ticker.tick().await;
        let mut world = app.world.lock().await;
        let emissions = mud_world::tick::run_tick(&mut world, app.cfg, &mut rng);
        bus::deliver(&world, emissions);
    }
}

/// Saves every currently attached player on graceful shutdown.
async fn persist_all(app: &AppState) {
    let world = app.world.lock().await;
    for player in world.players.values() {
        if let Err(e) = world.store.save(player) {
            log::error!("failed to persist {} on shutdown: {e}", player.username.as_str());
        }
    }
    log::info!("persisted {} player(s), exiting", world.players.len());
}

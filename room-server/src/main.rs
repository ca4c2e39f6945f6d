use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use room_core::WordBank;
use room_persistence::{SqlRoomStore, connection::connect_and_migrate};
use room_server::{
    auth::AuthService,
    config::Config,
    create_routes,
    lookup::{HttpWordLookup, NoopLookup, WordLookup},
    room_manager::RoomManager,
    sweeps::spawn_sweeps,
    websocket::ConnectionManager,
};
use room_types::RoomSettings;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting wordmoney server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());

    info!("Loading words from directory: {}", config.words_directory);
    let word_bank = match WordBank::load_directory(&config.words_directory) {
        Ok(bank) => {
            info!("Loaded {} words", bank.len());
            bank
        }
        Err(e) => {
            warn!(
                "Failed to load words from '{}': {}. Using the built-in list.",
                config.words_directory, e
            );
            WordBank::builtin()
        }
    };

    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    let lookup: Arc<dyn WordLookup> = if config.lookup_enabled() {
        match HttpWordLookup::new(
            &config.lookup_base_url,
            &config.dictionary_base_url,
            Duration::from_millis(config.lookup_timeout_ms),
        ) {
            Ok(lookup) => Arc::new(lookup),
            Err(e) => {
                warn!("Failed to build lookup client, hints disabled: {}", e);
                Arc::new(NoopLookup)
            }
        }
    } else {
        info!("External word lookups disabled");
        Arc::new(NoopLookup)
    };

    let auth_service = if config.auth_dev_mode {
        info!("Starting in development authentication mode - token signatures not checked");
        Arc::new(AuthService::new_dev_mode())
    } else {
        match &config.auth_jwt_secret {
            Some(secret) => Arc::new(AuthService::new(secret)),
            None => {
                error!("AUTH_JWT_SECRET must be set unless AUTH_DEV_MODE=true");
                std::process::exit(1);
            }
        }
    };

    let room_manager = Arc::new(
        RoomManager::new(
            Arc::new(SqlRoomStore::new(db)),
            connection_manager.clone(),
            lookup,
            Arc::new(word_bank),
        )
        .with_max_retries(config.max_cas_retries)
        .with_default_settings(RoomSettings {
            ghost_cooldown_seconds: config.ghost_cooldown_seconds,
            ..RoomSettings::default()
        }),
    );

    spawn_sweeps(room_manager.clone(), &config);

    let routes = create_routes(connection_manager.clone(), room_manager, auth_service);

    let registry = connection_manager.clone();
    let idle_limit = Duration::from_secs(config.connection_timeout_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            ticker.tick().await;
            let dropped = registry.drop_idle(idle_limit).await;
            if dropped > 0 {
                let open = registry.count().await;
                info!(dropped, open, "Idle sockets dropped");
            }
        }
    });

    let ip = match config.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };
    info!("Server starting on {}:{}", ip, config.port);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((ip, config.port), async {
        shutdown_signal().await;
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (mut sigint, mut sigterm) = match (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            _ => {
                warn!("Failed to install signal handlers, falling back to Ctrl+C");
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully...");
                }
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }
}

use std::net::IpAddr;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use arena_persistence::WordRepository;
use arena_persistence::connection::connect_and_migrate;
use arena_server::{
    config::Config,
    create_routes,
    jobs::{Job, run_job},
    matchmaking::pair_waiting_players,
    state::{AppState, seed_and_load_words},
};
use arena_types::ServerMessage;

const PAIRING_INTERVAL: Duration = Duration::from_secs(2);
const TIMEOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const INVITE_SWEEP_INTERVAL: Duration = Duration::from_secs(15);
const STANDINGS_INTERVAL: Duration = Duration::from_secs(60 * 60);
const SEASON_AWARD_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Vocab Arena server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    info!("Loading words (seed file: {})", config.words_file);
    let word_bank = match seed_and_load_words(&WordRepository::new(db.clone()), &config.words_file)
        .await
    {
        Ok(bank) => bank,
        Err(e) => {
            error!("Failed to load words: {:#}", e);
            std::process::exit(1);
        }
    };

    let host: IpAddr = match config.host.parse() {
        Ok(host) => host,
        Err(e) => {
            error!("HOST '{}' is not an IP address: {}", config.host, e);
            std::process::exit(1);
        }
    };
    let port = config.port;

    let state = match AppState::new(config, db, word_bank) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to build application state: {:#}", e);
            std::process::exit(1);
        }
    };

    // Live battles do not survive a restart
    match state.battles.close_stale_matches(Utc::now()).await {
        Ok(0) => {}
        Ok(closed) => warn!("Closed {} battles left open by a previous run", closed),
        Err(e) => error!("Failed to close stale battles: {:#}", e),
    }

    spawn_background_tasks(&state);

    let routes = create_routes(state);
    info!("Server starting on {}:{}", host, port);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((host, port), async {
        shutdown_signal().await;
    });

    info!("Server started successfully on {}. Press Ctrl+C to stop.", addr);
    server.await;
    info!("Server shutdown complete.");
}

fn spawn_background_tasks(state: &AppState) {
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let timeout = Duration::from_secs(cleanup_state.config.connection_timeout_seconds);
        let mut interval = tokio::time::interval(Duration::from_secs(
            cleanup_state.config.cleanup_interval_seconds,
        ));
        loop {
            interval.tick().await;
            let dropped = cleanup_state
                .connections
                .cleanup_inactive_connections(timeout)
                .await;
            for user_id in dropped {
                cleanup_state.ranked_queue.remove_player(user_id).await;
            }
            for user_id in cleanup_state
                .ranked_queue
                .cleanup_expired_players(Instant::now())
                .await
            {
                cleanup_state
                    .connections
                    .notify_user(user_id, ServerMessage::QueueLeft)
                    .await;
            }
        }
    });

    let pairing_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PAIRING_INTERVAL);
        loop {
            interval.tick().await;
            // Windows widen with wait time, so pairs can appear without new joins
            pair_waiting_players(
                &pairing_state.ranked_queue,
                &pairing_state.battles,
                &pairing_state.connections,
            )
            .await;
        }
    });

    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TIMEOUT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweep_state.battles.sweep_timeouts(Utc::now()).await;
        }
    });

    spawn_job(state, Job::ExpireInvites, INVITE_SWEEP_INTERVAL);
    spawn_job(state, Job::UpdateChallengeStats, STANDINGS_INTERVAL);
    spawn_job(state, Job::AwardSeasonRewards, SEASON_AWARD_INTERVAL);
}

fn spawn_job(state: &AppState, job: Job, period: Duration) {
    let state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = run_job(job, &state, Utc::now(), None).await {
                error!("Scheduled job {} failed: {:#}", job, e);
            }
        }
    });
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate());
        match sigterm {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = signal::ctrl_c().await {
        // Without a signal source the server runs until killed
        error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down gracefully...");
}

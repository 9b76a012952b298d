mod backend;
mod config;
mod error;
mod handlers;
mod messages;
mod metrics;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use lingo_dispatch::{
	BatchAccumulator, BatchConfig, DispatchGateway, DispatchStats, EngineRegistry, GatewayConfig, ModelLockRegistry, ModelTier, PoolConfig, ResultStore,
	TranslationCache, WaitBridge, WaitConfig, WorkerPool,
};
use lingo_transport::{InMemTransport, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use backend::LexiconEngine;
use config::Config;
use handlers::{AppState, EventTransport};
use messages::InMemoryMessageStore;
use metrics::TranslatorMetrics;

const TRANSPORT_BUFFER: usize = 256;
const SHUTDOWN_GRACE_PERIOD_MS: u64 = 200;

#[tokio::main]
async fn main() -> Result<()> {
	// Load environment variables
	dotenvy::dotenv().ok();

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	// Parse CLI arguments
	let config = Config::parse();
	config.validate().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

	info!(service = %config.service_name, bind = %config.bind_addr, "🎯 Starting translation dispatch service");

	let cancellation_token = CancellationToken::new();
	let state = build_state(&config, cancellation_token.clone())?;

	let app = Router::new()
		.route("/v1/translate", post(handlers::translate))
		.route("/v1/translations/:request_id/:language", get(handlers::get_translation))
		.route("/healthz", get(handlers::healthz))
		.route("/metrics", get(handlers::metrics))
		.layer(TraceLayer::new_for_http())
		.with_state(state);

	let listener = TcpListener::bind(&config.bind_addr).await?;
	info!(addr = %listener.local_addr()?, "🎧 Listening for translation requests");

	// Spawn signal handler task with proper shutdown coordination
	let signal_token = cancellation_token.clone();
	tokio::spawn(async move {
		wait_for_shutdown_signal().await;
		info!("🛑 Shutdown signal received (SIGTERM/SIGINT)");
		signal_token.cancel();
	});

	let server_token = cancellation_token.clone();
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			server_token.cancelled().await;
		})
		.await?;

	// Give workers and sweepers a moment to notice cancellation
	tokio::time::sleep(Duration::from_millis(SHUTDOWN_GRACE_PERIOD_MS)).await;
	info!("✅ Server stopped");

	Ok(())
}

fn build_state(config: &Config, cancellation_token: CancellationToken) -> Result<AppState> {
	let stats = DispatchStats::new();
	let store = ResultStore::new(Duration::from_secs(config.result_retention_secs));
	let _sweeper = store.spawn_sweeper(Duration::from_secs(config.sweep_interval_secs), cancellation_token.clone());

	let cache = Arc::new(TranslationCache::new(Duration::from_secs(config.cache_ttl_secs), config.cache_capacity));
	let locks = ModelLockRegistry::new();
	let transport: EventTransport = InMemTransport::new(TRANSPORT_BUFFER);
	spawn_event_relay(&transport, cancellation_token.clone());

	// One long-lived engine per tier; workers share them behind the locks
	let mut registry = EngineRegistry::new();
	for tier in [ModelTier::Basic, ModelTier::Medium, ModelTier::Premium] {
		registry = registry.with_engine(tier, Arc::new(LexiconEngine::new(tier)));
	}
	info!(tiers = ?registry.loaded_tiers(), "🧠 Translation models loaded");

	let pool = WorkerPool::start(
		PoolConfig {
			queue_capacity: config.queue_capacity,
			initial_workers: config.workers_default,
			min_workers: config.workers_min,
			max_workers: config.workers_max,
			scale_up_depth: config.scale_up_depth,
			scale_down_depth: config.scale_down_depth,
			scaling_interval: Duration::from_secs(config.scaling_interval_secs),
		},
		Arc::new(registry),
		locks,
		store.clone(),
		cache.clone(),
		transport.clone(),
		stats.clone(),
		cancellation_token.clone(),
	);

	let batcher = BatchAccumulator::new(
		BatchConfig {
			window: Duration::from_millis(config.batch_window_ms),
			max_size: config.batch_max_size,
			..BatchConfig::default()
		},
		pool.clone(),
		stats.clone(),
	);

	let gateway = DispatchGateway::new(GatewayConfig::default(), batcher, pool, cache, stats.clone());

	let bridge = WaitBridge::new(
		WaitConfig {
			timeout: Duration::from_secs(config.wait_timeout_secs),
			poll_interval: Duration::from_millis(config.poll_interval_ms),
		},
		store.clone(),
		stats.clone(),
	);

	Ok(AppState {
		gateway: Arc::new(gateway),
		bridge: Arc::new(bridge),
		store,
		messages: Arc::new(InMemoryMessageStore::new()),
		stats,
		metrics: Arc::new(TranslatorMetrics::new()?),
		shutdown: cancellation_token,
	})
}

/// Logs completion traffic so an operator can follow the pipeline without
/// scraping metrics.
fn spawn_event_relay(transport: &EventTransport, cancellation_token: CancellationToken) {
	let mut subscription = transport.subscribe();
	tokio::spawn(async move {
		loop {
			tokio::select! {
				() = cancellation_token.cancelled() => {
					info!("🛑 Event relay shutting down");
					break;
				}
				event = subscription.recv() => match event {
					Ok(event) => debug!(subject = event.subject(), request_id = %event.request_id(), "📨 {event}"),
					Err(TransportError::Overflowed(n)) => warn!(dropped = n, "⚠️ Event relay lagged"),
					Err(TransportError::Closed) => break,
					Err(err) => {
						error!(error = %err, "Event relay receive failed");
						break;
					}
				}
			}
		}
	});
}

async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install SIGTERM handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}

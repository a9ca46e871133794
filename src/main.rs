//! Homeport Billing service binary.
//!
//! Wires the PostgreSQL adapters, the payment gateway client, the REST
//! surface, and the billing scheduler together, then serves until a
//! shutdown signal arrives.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use homeport_billing::adapters::clock::SystemClock;
use homeport_billing::adapters::gateway::{self, HttpPaymentGateway};
use homeport_billing::adapters::http::{billing_router, BillingAppState};
use homeport_billing::adapters::postgres::{
    PostgresHistoryLogger, PostgresLeaseStore, PostgresPremiumStore,
    PostgresSubscriptionRepository,
};
use homeport_billing::application::handlers::billing::{
    EndFreeTrialHandler, ExpireGracePeriodHandler,
};
use homeport_billing::config::AppConfig;
use homeport_billing::ports::{
    Clock, HistoryLogger, LeaseStore, PaymentGateway, PremiumStateStore, SubscriptionRepository,
};
use homeport_billing::scheduler::{
    GraceSweepJob, RenewalJob, RetryJob, Scheduler, SchedulerConfig, TrialSweepJob,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        environment = ?config.server.environment,
        "Starting Homeport Billing"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database pool created");

    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    // Ports wired to their production adapters.
    let repository: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let premium_store: Arc<dyn PremiumStateStore> =
        Arc::new(PostgresPremiumStore::new(pool.clone()));
    let history: Arc<dyn HistoryLogger> = Arc::new(PostgresHistoryLogger::new(pool.clone()));
    let leases: Arc<dyn LeaseStore> = Arc::new(PostgresLeaseStore::new(pool.clone()));
    let payment_gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
        gateway::GatewayConfig::new(
            config.gateway.secret_key.clone(),
            config.gateway.api_base_url.clone(),
        ),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = BillingAppState {
        repository: repository.clone(),
        gateway: payment_gateway,
        premium_store: premium_store.clone(),
        history: history.clone(),
        pricing: config.billing.pricing_policy(),
        clock: clock.clone(),
    };

    // Scheduler jobs share the HTTP surface's handlers.
    let charge = state.charge_handler();
    let expire = Arc::new(ExpireGracePeriodHandler::new(
        repository.clone(),
        premium_store.clone(),
        history.clone(),
        clock.clone(),
    ));
    let end_trial = Arc::new(EndFreeTrialHandler::new(
        repository.clone(),
        premium_store.clone(),
        history.clone(),
        clock.clone(),
    ));

    let scheduler = Arc::new(
        Scheduler::new(
            clock,
            leases,
            SchedulerConfig {
                lease_ttl: config.billing.lease_ttl(),
                ..SchedulerConfig::default()
            },
        )
        .register(
            Arc::new(RenewalJob::new(repository.clone(), charge.clone())),
            config.billing.renewal_interval(),
        )
        .register(
            Arc::new(RetryJob::new(repository.clone(), charge)),
            config.billing.retry_interval(),
        )
        .register(
            Arc::new(GraceSweepJob::new(repository, expire)),
            config.billing.grace_sweep_interval(),
        )
        .register(
            Arc::new(TrialSweepJob::new(premium_store, end_trial)),
            config.billing.trial_sweep_interval(),
        ),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job_handles = scheduler.spawn(shutdown_rx);
    tracing::info!(jobs = job_handles.len(), "Scheduler started");

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let app = Router::new()
        .merge(billing_router())
        .layer(middleware)
        .route("/health", get(|| async { "ok" }))
        .with_state(state);

    let addr = config.server.socket_addr()?;
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the scheduler after the server drains.
    let _ = shutdown_tx.send(true);
    for handle in job_handles {
        let _ = handle.await;
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

use std::{net::SocketAddr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::{response::IntoResponse, Router};
use darsy_billing::config::Config;
use darsy_billing::db::{
    notification_repository::NotificationRepository, payment_repository::PaymentRepository,
    postgres_notification_repository::PostgresNotificationRepository,
    postgres_payment_repository::PostgresPaymentRepository,
    postgres_subscription_repository::PostgresSubscriptionRepository,
    subscription_repository::SubscriptionRepository,
};
use darsy_billing::responses::JsonResponse;
use darsy_billing::routes::{dashboard_routes, webhook_routes};
use darsy_billing::services::payments::{
    activation::PaymentActivationService, fawry::FawryAdapter, paymob::PaymobAdapter,
};
use darsy_billing::AppState;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    if config.fawry.secure_key.is_none() {
        warn!("FAWRY_SECURE_KEY is not set; Fawry callbacks will be refused");
    }
    if config.paymob.hmac_secret.is_none() {
        warn!("PAYMOB_HMAC_SECRET is not set; PayMob callbacks will be refused");
    }

    let pg_pool = establish_connection(&config.database_url).await?;
    sqlx::migrate!()
        .run(&pg_pool)
        .await
        .context("failed to run database migrations")?;

    let payments = Arc::new(PostgresPaymentRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn PaymentRepository>;
    let subscriptions = Arc::new(PostgresSubscriptionRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn SubscriptionRepository>;
    let notifications = Arc::new(PostgresNotificationRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn NotificationRepository>;

    let activation = Arc::new(PaymentActivationService::new(
        payments.clone(),
        notifications.clone(),
        config.retry,
    ));

    let state = AppState {
        payments,
        subscriptions,
        notifications,
        activation,
        fawry: Arc::new(FawryAdapter::new(&config.fawry)),
        paymob: Arc::new(PaymobAdapter::new(&config.paymob)),
    };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit.per_millisecond)
            .burst_size(config.rate_limit.burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .ok_or_else(|| anyhow!("invalid rate limiter settings"))?,
    );

    // Drop idle client entries from the limiter map.
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    let dashboard = dashboard_routes()
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors);

    let app = Router::new()
        .nest("/api/webhooks", webhook_routes())
        .nest("/api", dashboard)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "billing service listening");
    axum::serve(listener, make_service).await?;
    Ok(())
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("connected to the database");
    Ok(pool)
}

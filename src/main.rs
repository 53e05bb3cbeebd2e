use std::sync::{Arc, Mutex};

use axum::routing::{get, patch};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dentalbot::config::AppConfig;
use dentalbot::db;
use dentalbot::handlers;
use dentalbot::services::messaging::whatsapp::WhatsAppProvider;
use dentalbot::state::{AppState, UserLocks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let messaging = WhatsAppProvider::new(
        config.whatsapp_token.clone(),
        config.whatsapp_phone_number_id.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        messaging: Box::new(messaging),
        user_locks: UserLocks::default(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/webhook/whatsapp",
            get(handlers::webhook::verify).post(handlers::webhook::receive),
        )
        .route(
            "/api/admin/appointments",
            get(handlers::admin::get_appointments),
        )
        .route(
            "/api/admin/appointments/range",
            get(handlers::admin::get_appointments_range),
        )
        .route(
            "/api/admin/appointments/:id",
            get(handlers::admin::get_appointment).delete(handlers::admin::delete_appointment),
        )
        .route(
            "/api/admin/appointments/:id/status",
            patch(handlers::admin::update_appointment_status),
        )
        .route("/api/admin/users", get(handlers::admin::get_users))
        .route(
            "/api/admin/users/:id/appointments",
            get(handlers::admin::get_user_appointments),
        )
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

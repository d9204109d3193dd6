use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use kx_db::AppState;
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod build_worker;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Database connection
    let db_config = kx_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = kx_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    kx_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    // Upload storage for theme archives, thumbnails and build logs
    let storage = kx_build::ThemeStorage::from_env();
    storage
        .ensure_dirs()
        .await
        .expect("failed to create upload directories");
    tracing::info!(uploads = %storage.base().display(), "upload storage ready");

    let state = Arc::new(AppState { db, storage });

    // Theme routes carry multipart archive uploads; raise the body limit.
    let theme_routes = Router::new()
        .route(
            "/themes",
            get(api::themes::list_themes).post(api::themes::upload_theme),
        )
        .route("/themes/apply", post(api::themes::apply_theme))
        .route(
            "/themes/{slug}",
            get(api::themes::get_theme)
                .put(api::themes::update_theme)
                .delete(api::themes::delete_theme),
        )
        .route("/themes/{slug}/logs", get(api::themes::get_theme_logs))
        .route(
            "/themes/{slug}/preview/{*path}",
            get(api::themes::preview_theme),
        )
        .layer(DefaultBodyLimit::max(200 * 1024 * 1024)); // 200 MB for theme archives

    let api_routes = Router::new()
        .merge(theme_routes)
        .route(
            "/stores",
            get(api::stores::list_stores).post(api::stores::create_store),
        )
        .route(
            "/stores/{slug}",
            get(api::stores::get_store)
                .put(api::stores::update_store)
                .delete(api::stores::delete_store),
        )
        .route(
            "/users",
            get(api::users::list_users).post(api::users::create_user),
        )
        .route(
            "/users/{id}",
            axum::routing::put(api::users::update_user).delete(api::users::delete_user),
        )
        .route(
            "/plans",
            get(api::plans::list_plans).post(api::plans::create_plan),
        )
        .route(
            "/plans/{id}",
            axum::routing::put(api::plans::update_plan).delete(api::plans::delete_plan),
        )
        .route(
            "/subscriptions",
            get(api::subscriptions::list_subscriptions).post(api::subscriptions::create_subscription),
        )
        .route(
            "/subscriptions/{id}",
            axum::routing::put(api::subscriptions::update_subscription)
                .delete(api::subscriptions::delete_subscription),
        );

    // CORS configuration — restrict to configured origins
    let cors = {
        let allowed_origins_str = std::env::var("CORS_ORIGINS").unwrap_or_default();
        if allowed_origins_str.is_empty() {
            tracing::warn!(
                "CORS_ORIGINS not set; allowing only the local dashboard origin. \
                 Set CORS_ORIGINS=https://admin.example.com in production."
            );
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(HeaderValue::from_static(
                    "http://localhost:3000",
                )))
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(tower_http::cors::Any)
        } else {
            let origins: Vec<HeaderValue> = allowed_origins_str
                .split(',')
                .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
                .collect();
            tracing::info!("CORS allowed origins: {:?}", origins);
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(tower_http::cors::Any)
        }
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api_routes)
        // Uploaded theme assets (thumbnails, archives)
        .route("/uploads/{*path}", get(api::themes::serve_upload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    tracing::info!(%addr, "server started");

    axum::serve(
        tokio::net::TcpListener::bind(addr).await.unwrap(),
        app.into_make_service(),
    )
    .await
    .unwrap();
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

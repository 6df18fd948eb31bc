use axum::{
    routing::{get, patch, post},
    Router,
};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod clients;
mod config;
mod errors;
mod middleware;
mod models;
mod routes;
mod schema;
mod services;
mod types;

use clients::email::EmailClient;
use clients::images::ImageClient;
use clients::redis::RedisClient;
use config::AppConfig;
use services::token_service::TokenService;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub redis: RedisClient,
    pub email: EmailClient,
    pub images: ImageClient,
    pub tokens: TokenService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    middleware::init_tracing("contacts_api");

    let config = AppConfig::load()?;
    let port = config.port;

    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let db = Pool::builder().max_size(10).build(manager)?;

    let redis = RedisClient::connect(&config.redis_url).await?;
    let email = EmailClient::new(&config.resend_api_key, &config.from_email, "Contacts");
    let images = ImageClient::new(&config.image_host_url, &config.image_host_api_key);
    let tokens = TokenService::new(&config);

    let state = Arc::new(AppState { db, config, redis, email, images, tokens });

    let auth_routes = Router::new()
        .route("/signup", post(routes::signup::signup))
        .route("/login", post(routes::login::login))
        .route("/refresh_token", get(routes::refresh::refresh_token))
        .route("/confirmed_email/:token", get(routes::confirm_email::confirmed_email))
        .route("/request_email", post(routes::request_email::request_email));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users).post(routes::users::create_user))
        .route("/user_name", get(routes::users::find_user_by_name))
        .route("/user_last_name", get(routes::users::find_user_by_last_name))
        .route("/user_email", get(routes::users::find_user_by_email))
        .route("/next_7_days_birthdays", get(routes::users::next_7_days_birthdays))
        .route("/avatar", patch(routes::users::update_avatar))
        .route(
            "/:user_id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::remove_user),
        );

    let contact_routes = Router::new()
        .route("/", get(routes::contacts::list_contacts).post(routes::contacts::create_contact))
        .route(
            "/:contact_id",
            get(routes::contacts::get_contact)
                .put(routes::contacts::update_contact)
                .delete(routes::contacts::remove_contact),
        );

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/contacts", contact_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "contacts-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

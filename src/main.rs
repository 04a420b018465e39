use actix_web::{App, HttpServer, middleware, web};
use std::sync::Arc;

use worklane::auth::TokenVerifier;
use worklane::config::Config;
use worklane::events::EventBus;
use worklane::scheduling::video::DailyClient;
use worklane::state::AppState;
use worklane::store::PgStore;
use worklane::{db, handlers, notifications};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {e}");
        std::io::Error::other(e)
    })?;

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| {
            log::error!("Failed to connect to database: {e}");
            std::io::Error::other(e)
        })?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;

    let video = DailyClient::new(&config.video).map_err(|e| std::io::Error::other(e.to_string()))?;
    let store = Arc::new(PgStore::new(pool.clone()));

    let (events, rx) = EventBus::channel();
    notifications::spawn_notifier(rx, store.clone());

    let state = web::Data::new(AppState::new(
        store,
        Arc::new(video),
        events,
        config.webhook_secret.clone(),
        config.realtime.clone(),
    ));
    let verifier = web::Data::new(TokenVerifier::new(config.jwt_secret.as_bytes()));
    let pool = web::Data::new(pool);

    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(verifier.clone())
            .app_data(pool.clone())
            .service(web::scope("/api/v1").configure(handlers::api_v1::configure))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}

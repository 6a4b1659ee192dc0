mod config;
mod db;
mod error;
mod identity;
mod masking;
mod models;
mod routes;
mod sessions;
mod slots;
mod state;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};

use crate::config::AppConfig;
use crate::sessions::SessionStore;
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config).await?;
    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool).await?;

    let state = AppState {
        db: pool,
        sessions: Arc::new(SessionStore::new()),
        config: config.clone(),
    };

    let address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting Studio Agenda on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .configure(routes::public::configure)
            .configure(routes::auth::configure)
            .configure(routes::admin::configure)
            // Registered last so the API paths above take precedence.
            .service(Files::new("/", "./public").index_file("index.html"))
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}

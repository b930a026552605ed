// Web Server - main.rs
mod api;
mod middleware;
mod state;
mod static_files;

use actix_web::middleware::{Compress, Condition};
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();

    // Save what the workers need before config goes out of scope
    let server_addr = config.web_server_addr.clone();
    let static_config = config.static_files.clone();
    let enable_compression = config.enable_compression;

    // Derive the signing key once; fails closed when the bot token is missing
    let state = web::Data::new(AppState::from_config(&config));

    tracing::info!("Starting Mini App server on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Condition::new(enable_compression, Compress::default()))
            // API routes first so the static catch-all never shadows them
            .configure(api::configure)
            .configure(|cfg| static_files::configure(cfg, &static_config))
    })
    .bind(&server_addr)?
    .run()
    .await
}

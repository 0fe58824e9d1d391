//! Main entry point for the Tally stock-counting server.
//!
//! Wires the standalone in-memory stack, installs logging, and runs
//! the HTTP server until a shutdown signal arrives.

use actix_web::{App, HttpServer, web};
use tracing::{error, info};

use tally_server::api::route;
use tally_server::model::Configuration;
use tally_server::model::common::AppState;
use tally_server::startup;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new();
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let address = configuration.server_address();
    let port = configuration.server_port();
    let context_path = configuration.context_path();

    info!(
        rack_lock_ttl_secs = configuration.rack_lock_ttl().as_secs(),
        session_lock_ttl_secs = configuration.session_lock_ttl().as_secs(),
        "lease configuration loaded"
    );

    let app_state = web::Data::new(AppState::standalone(configuration));

    info!("Starting Tally server on {}:{}", address, port);
    let server = HttpServer::new({
        let app_state = app_state.clone();
        let context_path = context_path.clone();
        move || {
            App::new()
                .app_data(app_state.clone())
                .service(web::scope(&context_path).service(route::tally_routes()))
        }
    })
    .bind((address.as_str(), port))?
    .run();

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = startup::shutdown_signal() => {
            info!("Tally server shutting down gracefully");
        }
    }

    info!("Tally server shutdown complete");
    Ok(())
}

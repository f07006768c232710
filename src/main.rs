use log::{error, info};
use std::io;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};

use netrelay::{AppConfig, AppState, RelayController, api_scope, backend, logging};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("NETRELAY_CONFIG").ok())
        .unwrap_or_else(|| "config/settings.yaml".to_string());
    let config = match AppConfig::load_from_file(&config_path) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load config {config_path}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let controller = backend::open_sink(&config.gpio)
        .and_then(|sink| RelayController::new(config.relays.pins.clone(), sink))
        .map(Arc::new)
        .map_err(|e| {
            error!("Failed to initialise relays: {e}");
            io::Error::other(e)
        })?;
    info!(
        "{} relays ready on {:?} backend",
        controller.pin_map().len(),
        config.gpio.backend
    );

    let app_state = AppState::new(controller.clone(), config.clone());
    let bind_addr = (config.api.host.clone(), config.api.port);
    info!("Starting server on {}:{}...", bind_addr.0, bind_addr.1);

    // one worker: relay state is written without coordination between requests
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .service(api_scope())
    })
    .workers(1);
    let result = match server.bind(bind_addr) {
        Ok(server) => server.run().await,
        Err(e) => Err(e),
    };

    info!("Shutting down...");
    if let Err(e) = controller.cleanup() {
        error!("{e}");
    }

    result
}

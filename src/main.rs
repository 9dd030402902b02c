use colabri_rooms::{
    config::Config,
    db::DbColab,
    routes::create_app,
    state::AppState,
    stores::Stores,
};
use std::panic;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "colabri_rooms=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    if let Err(e) = config.ensure_jwt_secret() {
        error!("Refusing to start: {}", e);
        std::process::exit(1);
    }

    // Pick the store backend
    let stores = match &config.db_url {
        Some(db_url) => match DbColab::new(db_url).await {
            Ok(db) => {
                info!("Database initialized successfully");
                Stores::postgres(db)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("No database URL configured - using in-memory stores, nothing survives a restart");
            Stores::in_memory()
        }
    };

    let address = config.server_address();
    let state = AppState::new(config, stores);
    let app_routes = create_app(state);

    // Start the HTTP/WebSocket server
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app_routes).await {
        error!("Server error: {}", e);
    }
}

use dotenvy::dotenv;

mod infrastructure;
mod presentation;

use infrastructure::{config::ServerConfig, logging::init_logging, shutdown::wait_for_signal};
use presentation::http_handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    init_logging()?;

    let config = ServerConfig::from_env()?;
    let addr = config.bind_addr();

    tracing::info!("Starting RealWorld server...");

    let server = actix_web::HttpServer::new(|| {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .configure(http_handlers::configure)
    })
    .disable_signals()
    .bind(&addr)?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!("{} signal received: closing HTTP server.", signal);
        handle.stop(true).await;
    });

    tracing::info!("Server is running on port {}", config.port);

    server.await?;

    tracing::info!("HTTP server closed");
    Ok(())
}

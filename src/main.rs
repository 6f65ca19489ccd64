use lserve::config::{Args, ServerConfig};
use lserve::logging;
use lserve::server::Server;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    let args = Args::from_env();
    let config = ServerConfig::from_args(&args).inspect_err(|e| error!("{e}"))?;
    let server = Server::bind(&config).await.inspect_err(|e| error!("{e}"))?;
    info!(
        "lserve running at http://localhost:{}",
        server.local_addr().port()
    );

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

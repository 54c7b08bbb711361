use solaredge_exporter::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Create a channel for shutdown signaling
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
        }
        if let Err(err) = shutdown_tx.send(()) {
            error!("Failed to send shutdown signal: {}", err);
        }
    });

    // Run until the poller and the metrics server have stopped
    if let Err(err) = solaredge_exporter::app(shutdown_rx).await {
        error!("{:?}", err);
        return Err(err);
    }

    Ok(())
}

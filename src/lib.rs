pub mod config;
pub mod error;
pub mod metrics;
pub mod options;
pub mod poller;
pub mod prelude;
pub mod server;
pub mod sunspec;
pub mod transport;

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::poller::Poller;
use crate::server::Server;
use crate::transport::ModbusTcpSource;

fn init_logging(filter: &str, debug: bool) {
    let mut builder = if debug {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters("debug");
        builder
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
    };

    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();
}

pub async fn app(shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let options = Options::new();

    // logging is configured from the file, so it is read first
    let config = Config::new(options.config_file.clone())?;

    init_logging(config.loglevel(), options.debug);

    info!("solaredge-exporter {} starting with config file {}", CARGO_PKG_VERSION, options.config_file);
    config.log_summary();

    run(config, shutdown_rx).await
}

/// Starts the metrics server and the poller and waits for both to stop.
pub async fn run(config: Config, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let metrics = MetricsRegistry::new()?;

    let server = Server::new(config.exporter().clone(), metrics.clone(), shutdown_rx.resubscribe());
    let mut server_handle = tokio::spawn(server.start());

    let solaredge = config.solaredge();
    let source = ModbusTcpSource::new(
        solaredge.inverter_address(),
        solaredge.inverter_port(),
        solaredge.unit_id(),
        solaredge.read_timeout(),
    );
    let poller = Poller::new(source, metrics, &config);
    let mut poller_handle = tokio::spawn(poller.run(shutdown_rx));

    tokio::select! {
        result = &mut server_handle => {
            poller_handle.abort();
            result?.context("metrics server failed")?;
        }
        result = &mut poller_handle => {
            if let Err(err) = result? {
                error!("poller failed: {:?}", err);
            }
            server_handle.await?.context("metrics server failed")?;
        }
    }

    info!("shutdown complete");
    Ok(())
}

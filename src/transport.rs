use crate::prelude::*;
use crate::error::TransportError;
use crate::sunspec::RegisterBuffer;

use {
    async_trait::async_trait,
    std::net::SocketAddr,
    std::time::Duration,
    tokio::time::timeout,
    tokio_modbus::client::{tcp, Context, Reader},
    tokio_modbus::Slave,
};

/// Request/response access to a device's holding registers.
///
/// Implementations are driven by a single poller and never shared, so the
/// methods take `&mut self`.
#[async_trait]
pub trait RegisterSource: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn close(&mut self);

    fn is_connected(&self) -> bool;

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<RegisterBuffer, TransportError>;
}

pub struct ModbusTcpSource {
    host: String,
    port: u16,
    unit_id: u8,
    read_timeout: Duration,
    ctx: Option<Context>,
}

impl ModbusTcpSource {
    pub fn new(host: &str, port: u16, unit_id: u8, read_timeout: Duration) -> Self {
        Self {
            host: host.to_owned(),
            port,
            unit_id,
            read_timeout,
            ctx: None,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    // `Context` is not `Sync`, so the returned future must not borrow `self`
    // across an await for `connect` to stay `Send`.
    fn socket_addr(&self) -> impl std::future::Future<Output = Result<SocketAddr, TransportError>> + Send + 'static {
        let host = self.host.clone();
        let port = self.port;
        let endpoint = self.endpoint();

        async move {
            let mut addrs = tokio::net::lookup_host((host.as_str(), port))
                .await
                .map_err(|source| TransportError::Connect {
                    addr: endpoint.clone(),
                    source,
                })?;

            addrs.next().ok_or_else(|| TransportError::Address(endpoint))
        }
    }
}

#[async_trait]
impl RegisterSource for ModbusTcpSource {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.close().await;

        let addr = self.socket_addr().await?;
        debug!("connecting to {} unit {}", addr, self.unit_id);

        let ctx = match timeout(self.read_timeout, tcp::connect_slave(addr, Slave(self.unit_id))).await {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(source)) => {
                return Err(TransportError::Connect {
                    addr: self.endpoint(),
                    source,
                })
            }
            Err(_) => return Err(TransportError::Timeout(self.read_timeout.as_secs())),
        };

        info!("connected to {}", self.endpoint());
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn close(&mut self) {
        // dropping the context shuts the socket
        if self.ctx.take().is_some() {
            info!("closed connection to {}", self.endpoint());
        }
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<RegisterBuffer, TransportError> {
        let read_timeout = self.read_timeout;
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;

        let words = match timeout(read_timeout, ctx.read_holding_registers(address, count)).await {
            Ok(Ok(Ok(words))) => words,
            Ok(Ok(Err(code))) => {
                return Err(TransportError::Exception {
                    address,
                    count,
                    code: format!("{:?}", code),
                })
            }
            Ok(Err(err)) => {
                return Err(TransportError::Read {
                    address,
                    count,
                    reason: err.to_string(),
                })
            }
            Err(_) => return Err(TransportError::Timeout(read_timeout.as_secs())),
        };

        trace!("read {} registers at {}", words.len(), address);
        Ok(RegisterBuffer::from_words(address, &words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_without_connection_fails() {
        let mut source = ModbusTcpSource::new("127.0.0.1", 1502, 1, Duration::from_secs(1));

        assert!(!source.is_connected());
        assert!(matches!(
            source.read_holding_registers(40000, 70).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connect_refused_is_an_error() {
        // bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut source = ModbusTcpSource::new("127.0.0.1", port, 1, Duration::from_secs(2));
        assert!(source.connect().await.is_err());
        assert!(!source.is_connected());
    }
}

use thiserror::Error;

/// Structural problems found while walking a register block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("register offset {offset} (+{count}) out of range for {len} register block")]
    OutOfRange { offset: usize, count: usize, len: usize },

    #[error("short buffer: need {required} registers, got {actual}")]
    ShortBuffer { required: usize, actual: usize },

    #[error("{block} declares length {declared}, layout expects {expected}")]
    LengthMismatch {
        block: &'static str,
        declared: u16,
        expected: u16,
    },

    #[error("missing SunSpec marker, found {0:#010x}")]
    NotSunSpec(u32),
}

/// Field-bus failures; all of these are recovered by reconnecting.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid address {0}")]
    Address(String),

    #[error("read of {count} registers at {address} failed: {reason}")]
    Read {
        address: u16,
        count: u16,
        reason: String,
    },

    #[error("device answered {address}+{count} with exception {code}")]
    Exception { address: u16, count: u16, code: String },

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("not connected")]
    NotConnected,
}

impl TransportError {
    /// The device replied with a Modbus exception; the session itself is fine.
    pub fn is_exception(&self) -> bool {
        matches!(self, TransportError::Exception { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_device_exceptions_keep_the_session() {
        let exception = TransportError::Exception {
            address: 40362,
            count: 105,
            code: "IllegalDataAddress".to_string(),
        };
        assert!(exception.is_exception());
        assert!(!TransportError::Timeout(10).is_exception());
        assert!(!TransportError::NotConnected.is_exception());
    }
}

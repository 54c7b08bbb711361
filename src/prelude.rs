pub use anyhow::{anyhow, bail, Context as _, Result};
pub use log::{debug, error, info, trace, warn};
pub use std::io::Write;
pub use tokio::sync::broadcast;

pub use crate::config::{self, Config};
pub use crate::error::{DecodeError, TransportError};
pub use crate::metrics::MetricsRegistry;
pub use crate::options::Options;
pub use crate::sunspec;

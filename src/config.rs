use crate::prelude::*;
use crate::sunspec::AbsentPolicy;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::time::Duration;

/// Top level of the YAML config file.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub solaredge: SolarEdge,

    #[serde(default)]
    pub exporter: Exporter,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// SolarEdge {{{
/// Where the inverter is and how to talk to it.
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct SolarEdge {
    pub inverter_address: String,

    #[serde(default = "Config::default_inverter_port")]
    pub inverter_port: u16,

    #[serde(default = "Config::default_unit_id")]
    pub unit_id: u8,

    #[serde(default)]
    pub num_meters: u8,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_read_timeout")]
    pub read_timeout: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_reconnect_delay")]
    pub reconnect_delay: Duration,
}
impl SolarEdge {
    /// Host name or IP of the inverter's Modbus TCP interface
    pub fn inverter_address(&self) -> &str {
        &self.inverter_address
    }

    pub fn inverter_port(&self) -> u16 {
        self.inverter_port
    }

    /// Modbus unit (slave) id, 1 unless changed on the inverter
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Meters on the inverter's RS485 bus, 0 to 2
    pub fn num_meters(&self) -> u8 {
        self.num_meters
    }

    /// Applies to connecting and to every register read
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Pause between dropping a failed session and reconnecting
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }
} // }}}

// Exporter {{{
/// The HTTP side: where `/metrics` is served and how often it is refreshed.
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Exporter {
    #[serde(default = "Config::default_listen_address")]
    pub listen_address: String,

    #[serde(default = "Config::default_listen_port")]
    pub listen_port: u16,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_interval")]
    pub interval: Duration,

    #[serde(default)]
    pub absent_values: AbsentPolicy,
}
impl Default for Exporter {
    fn default() -> Self {
        Self {
            listen_address: Config::default_listen_address(),
            listen_port: Config::default_listen_port(),
            interval: Config::default_interval(),
            absent_values: AbsentPolicy::default(),
        }
    }
}
impl Exporter {
    pub fn listen_address(&self) -> &str {
        &self.listen_address
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// Sleep between the end of one poll pass and the start of the next
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// What to publish for registers the device reports as not implemented
    pub fn absent_values(&self) -> AbsentPolicy {
        self.absent_values
    }
} // }}}

impl Config {
    /// Reads and validates the config file.
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file).map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        Self::from_yaml(&content).with_context(|| format!("loading {}", file))
    }

    /// Logs the effective settings, defaults included. Call once logging is up.
    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Inverter: {}:{}", self.solaredge.inverter_address, self.solaredge.inverter_port);
        info!("    Unit ID: {}", self.solaredge.unit_id);
        info!("    Meters: {}", self.solaredge.num_meters);
        info!("    Read Timeout: {}s", self.solaredge.read_timeout.as_secs());
        info!("    Reconnect Delay: {}s", self.solaredge.reconnect_delay.as_secs());
        info!("  Exporter: {}:{}", self.exporter.listen_address, self.exporter.listen_port);
        info!("    Interval: {}s", self.exporter.interval.as_secs());
        info!("    Absent Values: {:?}", self.exporter.absent_values);
        info!("  Log Level: {}", self.loglevel);
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn solaredge(&self) -> &SolarEdge {
        &self.solaredge
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    fn validate(&self) -> Result<()> {
        // Validate inverter connection
        if self.solaredge.inverter_address.is_empty() {
            bail!("solaredge.inverter_address cannot be empty");
        }
        if self.solaredge.inverter_port == 0 {
            bail!("solaredge.inverter_port must be between 1 and 65535");
        }
        if self.solaredge.num_meters > 2 {
            bail!("solaredge.num_meters must be 0, 1 or 2, got {}", self.solaredge.num_meters);
        }
        if self.solaredge.read_timeout.is_zero() {
            bail!("solaredge.read_timeout cannot be 0");
        }

        // Validate metrics endpoint
        if self.exporter.listen_port == 0 {
            bail!("exporter.listen_port must be between 1 and 65535");
        }
        if self.exporter.interval.is_zero() {
            bail!("exporter.interval cannot be 0");
        }

        Ok(())
    }

    fn default_inverter_port() -> u16 {
        502
    }

    fn default_unit_id() -> u8 {
        1
    }

    fn default_read_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn default_reconnect_delay() -> Duration {
        Duration::from_secs(7)
    }

    fn default_listen_address() -> String {
        "0.0.0.0".to_string()
    }

    fn default_listen_port() -> u16 {
        2112
    }

    fn default_interval() -> Duration {
        Duration::from_secs(5)
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}

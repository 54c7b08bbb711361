use clap::Parser;

/// Prometheus exporter for SolarEdge inverters and meters over SunSpec Modbus TCP
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Log at debug level regardless of config and RUST_LOG
    #[clap(short = 'd', long = "debug")]
    pub debug: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::parse_from(["solaredge-exporter"]);
        assert_eq!(options.config_file, "config.yaml");
        assert!(!options.debug);
    }

    #[test]
    fn flags() {
        let options = Options::parse_from(["solaredge-exporter", "-c", "/etc/solaredge.yaml", "--debug"]);
        assert_eq!(options.config_file, "/etc/solaredge.yaml");
        assert!(options.debug);
    }
}

//! Prometheus gauges published by the poller and served over HTTP.

pub mod fields;

use crate::prelude::*;

pub use fields::{publish, Field, Source, INVERTER_FIELDS, METER_FIELDS};

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;

/// Label names every gauge carries, in `with_label_values` order.
pub const LABEL_NAMES: [&str; 3] = ["serial", "model", "version"];

/// Metric name prefix of each meter slot.
pub const METER_PREFIXES: [&str; 2] = ["M_", "M2_"];

/// Identity of the device the gauges are published under. Taken from the
/// inverter common block, meters included.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceLabels {
    pub serial: String,
    pub model: String,
    pub version: String,
}

impl DeviceLabels {
    pub fn new(serial: &str, model: &str, version: &str) -> Self {
        Self {
            serial: serial.to_owned(),
            model: model.to_owned(),
            version: version.to_owned(),
        }
    }

    fn values(&self) -> [&str; 3] {
        [&self.serial, &self.model, &self.version]
    }
}

impl From<&sunspec::CommonModel> for DeviceLabels {
    fn from(common: &sunspec::CommonModel) -> Self {
        Self::new(&common.serial_number, &common.model, &common.version)
    }
}

/// Every gauge the exporter can publish, registered once at startup.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    gauges: Arc<HashMap<String, GaugeVec>>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let mut gauges = HashMap::new();

        let inverter = INVERTER_FIELDS.iter().map(|f| (f.name.to_owned(), f.help));
        let meters = METER_PREFIXES.iter().flat_map(|prefix| {
            METER_FIELDS
                .iter()
                .map(move |f| (format!("{}{}", prefix, f.name), f.help))
        });

        for (name, help) in inverter.chain(meters) {
            let gauge = GaugeVec::new(Opts::new(name.as_str(), help), &LABEL_NAMES)
                .with_context(|| format!("creating gauge {}", name))?;
            registry
                .register(Box::new(gauge.clone()))
                .with_context(|| format!("registering gauge {}", name))?;

            if gauges.insert(name.clone(), gauge).is_some() {
                bail!("duplicate gauge {}", name);
            }
        }

        debug!("registered {} gauges", gauges.len());

        Ok(Self {
            registry: Arc::new(registry),
            gauges: Arc::new(gauges),
        })
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gauges.contains_key(name)
    }

    pub fn set_gauge(&self, name: &str, labels: &DeviceLabels, value: f64) -> Result<()> {
        let gauge = self
            .gauges
            .get(name)
            .ok_or_else(|| anyhow!("unknown gauge {}", name))?;

        gauge.get_metric_with_label_values(&labels.values())?.set(value);
        trace!("{}{{serial={}}} = {}", name, labels.serial, value);

        Ok(())
    }

    /// Drops the series of `name` for `labels` so it is no longer exposed.
    /// A series that was never set is not an error.
    pub fn remove_gauge(&self, name: &str, labels: &DeviceLabels) -> Result<()> {
        let gauge = self
            .gauges
            .get(name)
            .ok_or_else(|| anyhow!("unknown gauge {}", name))?;

        if gauge.remove_label_values(&labels.values()).is_ok() {
            trace!("{}{{serial={}}} removed", name, labels.serial);
        }

        Ok(())
    }

    /// Current value of a gauge, `None` if it was never set for `labels`.
    /// Reads through a gather so it never creates the series.
    pub fn value(&self, name: &str, labels: &DeviceLabels) -> Option<f64> {
        let wanted = labels.values();

        let family = self
            .registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?;

        let metric = family.get_metric().iter().find(|metric| {
            LABEL_NAMES.iter().zip(wanted.iter()).all(|(label, value)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *label && pair.get_value() == *value)
            })
        })?;

        Some(metric.get_gauge().get_value())
    }

    pub fn format_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Prometheus text exposition of everything published so far.
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

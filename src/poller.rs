use crate::prelude::*;

use crate::metrics::{self, DeviceLabels, INVERTER_FIELDS, METER_FIELDS};
use crate::sunspec::registers::{self, Block};
use crate::sunspec::{AbsentPolicy, CommonModel, InverterModel, MeterModel, RegisterBuffer};
use crate::transport::RegisterSource;

use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Polling,
    Reconnecting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubDevice {
    Inverter,
    Meter1,
    Meter2,
}

impl SubDevice {
    /// Sub-devices polled each cycle, in polling order.
    pub fn enabled(num_meters: u8) -> Vec<SubDevice> {
        let mut devices = vec![SubDevice::Inverter];
        if num_meters >= 1 {
            devices.push(SubDevice::Meter1);
        }
        if num_meters >= 2 {
            devices.push(SubDevice::Meter2);
        }
        devices
    }

    pub fn common_block(self) -> Block {
        match self {
            SubDevice::Inverter => registers::INVERTER_COMMON,
            SubDevice::Meter1 => registers::METER_1_COMMON,
            SubDevice::Meter2 => registers::METER_2_COMMON,
        }
    }

    pub fn model_block(self) -> Block {
        match self {
            SubDevice::Inverter => registers::INVERTER_MODEL,
            SubDevice::Meter1 => registers::METER_1_MODEL,
            SubDevice::Meter2 => registers::METER_2_MODEL,
        }
    }

    /// Gauge name prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            SubDevice::Inverter => "",
            SubDevice::Meter1 => metrics::METER_PREFIXES[0],
            SubDevice::Meter2 => metrics::METER_PREFIXES[1],
        }
    }

    fn is_meter(self) -> bool {
        !matches!(self, SubDevice::Inverter)
    }
}

impl std::fmt::Display for SubDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubDevice::Inverter => write!(f, "inverter"),
            SubDevice::Meter1 => write!(f, "meter 1"),
            SubDevice::Meter2 => write!(f, "meter 2"),
        }
    }
}

/// Owns the register source and drives the fetch/decode/publish cycle.
pub struct Poller<S> {
    source: S,
    metrics: MetricsRegistry,

    num_meters: u8,
    interval: Duration,
    reconnect_delay: Duration,
    policy: AbsentPolicy,

    state: ConnectionState,
    labels: Option<DeviceLabels>,
    meters: HashMap<SubDevice, CommonModel>,
    last_did: HashMap<SubDevice, u16>,
    unknown_did_warnings: usize,
}

impl<S: RegisterSource> Poller<S> {
    pub fn new(source: S, metrics: MetricsRegistry, config: &Config) -> Self {
        Self {
            source,
            metrics,
            num_meters: config.solaredge().num_meters(),
            interval: config.exporter().interval(),
            reconnect_delay: config.solaredge().reconnect_delay(),
            policy: config.exporter().absent_values(),
            state: ConnectionState::Disconnected,
            labels: None,
            meters: HashMap::new(),
            last_did: HashMap::new(),
            unknown_did_warnings: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Inverter identity the gauges are labelled with, once known.
    pub fn labels(&self) -> Option<&DeviceLabels> {
        self.labels.as_ref()
    }

    pub fn meter_identity(&self, device: SubDevice) -> Option<&CommonModel> {
        self.meters.get(&device)
    }

    /// How many times an unrecognised DID has been warned about.
    pub fn unknown_did_warnings(&self) -> usize {
        self.unknown_did_warnings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.start().await;

        loop {
            if let Err(err) = self.poll_cycle().await {
                debug!("cycle aborted: {}", err);
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("poller shutting down");
                    self.source.close().await;
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Connects and reads the identity blocks. Failures are logged only; the
    /// cycle picks up whatever is still missing.
    pub async fn start(&mut self) {
        if let Err(err) = self.connect().await {
            error!("connecting to inverter: {}", err);
            return;
        }

        if let Err(err) = self.identify().await {
            error!("reading identity blocks: {}", err);
            self.recover().await;
        }
    }

    /// One full pass over the enabled sub-devices. A transport failure
    /// aborts the rest of the pass after one reconnect attempt and is
    /// returned to the caller. Modbus exception replies only skip the
    /// sub-device that raised them.
    pub async fn poll_cycle(&mut self) -> Result<(), TransportError> {
        if !self.source.is_connected() {
            if let Err(err) = self.connect().await {
                error!("connecting to inverter: {}", err);
                return Err(err);
            }
        }

        if let Err(err) = self.poll_devices().await {
            error!("transport failure: {}", err);
            self.recover().await;
            return Err(err);
        }

        Ok(())
    }

    async fn poll_devices(&mut self) -> Result<(), TransportError> {
        if self.labels.is_none() {
            self.identify_inverter().await?;
        }
        if self.meters.len() < usize::from(self.num_meters) {
            self.identify_meters().await?;
        }
        let labels = match &self.labels {
            Some(labels) => labels.clone(),
            None => {
                warn!("inverter identity unknown, skipping cycle");
                return Ok(());
            }
        };

        self.state = ConnectionState::Polling;

        for device in SubDevice::enabled(self.num_meters) {
            let block = device.model_block();
            let buf = match self.read_block(block).await {
                Ok(buf) => buf,
                // an exception reply is an answer, the session stays up
                Err(err) if err.is_exception() => {
                    warn!("{} at {}: skipping publish: {}", device, block.start, err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            if let Err(err) = self.publish(device, &buf, &labels) {
                warn!("{} at {}: skipping publish: {:#}", device, block.start, err);
            }
        }

        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn publish(&mut self, device: SubDevice, buf: &RegisterBuffer, labels: &DeviceLabels) -> Result<()> {
        let prefix = device.prefix();

        if device.is_meter() {
            let model = MeterModel::decode(buf)?;
            self.note_did(device, model.did, model.kind().is_some());
            debug!(
                "{}: power {} W, exported {} Wh, imported {} Wh",
                device,
                model.power(),
                model.exported(),
                model.imported()
            );
            metrics::publish(&self.metrics, prefix, METER_FIELDS, &model, labels, self.policy)
        } else {
            let model = InverterModel::decode(buf)?;
            self.note_did(device, model.did, model.kind().is_some());
            debug!(
                "{}: ac {} W, dc {} W, lifetime {} Wh, status {}",
                device,
                model.ac_power(),
                model.dc_power(),
                model.ac_energy_wh(),
                model.status
            );
            metrics::publish(&self.metrics, prefix, INVERTER_FIELDS, &model, labels, self.policy)
        }
    }

    // warns once each time an unrecognised DID shows up
    fn note_did(&mut self, device: SubDevice, did: u16, known: bool) {
        if self.last_did.insert(device, did) != Some(did) && !known {
            warn!("{}: unrecognised SunSpec DID {}, publishing anyway", device, did);
            self.unknown_did_warnings += 1;
        }
    }

    async fn identify(&mut self) -> Result<(), TransportError> {
        self.identify_inverter().await?;
        self.identify_meters().await
    }

    async fn identify_inverter(&mut self) -> Result<(), TransportError> {
        let buf = match self.read_identity(SubDevice::Inverter).await? {
            Some(buf) => buf,
            None => return Ok(()),
        };

        match CommonModel::decode(&buf) {
            Ok(common) => {
                info!(
                    "inverter: {} {} serial {} version {}",
                    common.manufacturer, common.model, common.serial_number, common.version
                );
                self.labels = Some(DeviceLabels::from(&common));
            }
            Err(err) => warn!("inverter identity at {}: {}", buf.start(), err),
        }

        Ok(())
    }

    /// Reads the common block of every enabled meter not yet identified.
    async fn identify_meters(&mut self) -> Result<(), TransportError> {
        for device in SubDevice::enabled(self.num_meters) {
            if !device.is_meter() || self.meters.contains_key(&device) {
                continue;
            }

            let buf = match self.read_identity(device).await? {
                Some(buf) => buf,
                None => continue,
            };
            match CommonModel::decode_meter(&buf) {
                Ok(common) => {
                    info!(
                        "{}: {} {} option {} serial {} version {}",
                        device,
                        common.manufacturer,
                        common.model,
                        common.option.as_deref().unwrap_or(""),
                        common.serial_number,
                        common.version
                    );
                    self.meters.insert(device, common);
                }
                Err(err) => warn!("{} identity at {}: {}", device, buf.start(), err),
            }
        }

        Ok(())
    }

    // common block of `device`, None when the device answered with an exception
    async fn read_identity(&mut self, device: SubDevice) -> Result<Option<RegisterBuffer>, TransportError> {
        let block = device.common_block();
        match self.read_block(block).await {
            Ok(buf) => Ok(Some(buf)),
            Err(err) if err.is_exception() => {
                warn!("{} identity at {}: {}", device, block.start, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn read_block(&mut self, block: Block) -> Result<RegisterBuffer, TransportError> {
        trace!("reading {} registers at {}", block.count, block.start);
        self.source.read_holding_registers(block.start, block.count).await
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        match self.source.connect().await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Drops the session after a transport failure, waits `reconnect_delay`
    /// and makes a single reconnect attempt. A failed attempt leaves the
    /// state `Disconnected` and the next cycle starts by connecting again.
    async fn recover(&mut self) {
        self.state = ConnectionState::Reconnecting;

        // the old session may be half open, never reuse it
        self.source.close().await;

        info!("reconnecting in {}s", self.reconnect_delay.as_secs());
        tokio::time::sleep(self.reconnect_delay).await;

        match self.connect().await {
            Ok(()) => info!("reconnected"),
            Err(err) => error!("reconnect failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_sub_devices() {
        assert_eq!(SubDevice::enabled(0), vec![SubDevice::Inverter]);
        assert_eq!(SubDevice::enabled(1), vec![SubDevice::Inverter, SubDevice::Meter1]);
        assert_eq!(
            SubDevice::enabled(2),
            vec![SubDevice::Inverter, SubDevice::Meter1, SubDevice::Meter2]
        );
    }

    #[test]
    fn meter_blocks_and_prefixes() {
        assert_eq!(SubDevice::Meter1.common_block().start, 40121);
        assert_eq!(SubDevice::Meter1.model_block().start, 40188);
        assert_eq!(SubDevice::Meter2.common_block().start, 40295);
        assert_eq!(SubDevice::Meter2.model_block().start, 40362);
        assert_eq!(SubDevice::Inverter.prefix(), "");
        assert_eq!(SubDevice::Meter2.prefix(), "M2_");
    }
}

#![allow(dead_code)]

use solaredge_exporter::metrics::DeviceLabels;
use solaredge_exporter::prelude::*;
use solaredge_exporter::sunspec::registers;
use solaredge_exporter::sunspec::RegisterBuffer;
use solaredge_exporter::transport::RegisterSource;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

pub const SERIAL: &str = "7E123456";
pub const MODEL: &str = "SE5000H-RW000BNN4";
pub const VERSION: &str = "0004.0010";

/// Packs `text` into `count` registers, NUL padded and truncated at the
/// field width.
pub fn pack_string(text: &str, count: usize) -> Vec<u16> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(count * 2, 0);
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

pub struct Factory();
impl Factory {
    pub fn labels() -> DeviceLabels {
        DeviceLabels::new(SERIAL, MODEL, VERSION)
    }

    pub fn config(num_meters: u8) -> Config {
        Config::from_yaml(&format!(
            "solaredge:\n  inverter_address: 127.0.0.1\n  num_meters: {}\n  reconnect_delay: 0\nexporter:\n  interval: 1\n",
            num_meters
        ))
        .unwrap()
    }

    pub fn inverter_common() -> Vec<u16> {
        let mut words = vec![0x5375, 0x6e53, 1, 65];
        words.extend(pack_string("SolarEdge", 16));
        words.extend(pack_string(MODEL, 16));
        words.extend(pack_string("", 8));
        words.extend(pack_string(VERSION, 8));
        words.extend(pack_string(SERIAL, 16));
        words.push(1);
        // block is fetched 70 wide
        words.push(0xffff);
        words
    }

    pub fn meter_common(serial: &str) -> Vec<u16> {
        let mut words = vec![1, 65];
        words.extend(pack_string("WattNode", 16));
        words.extend(pack_string("WNC-3Y-400-MB", 16));
        words.extend(pack_string("Export+Import", 8));
        words.extend(pack_string("0027", 8));
        words.extend(pack_string(serial, 16));
        words.push(2);
        words
    }

    /// Three phase inverter: 10.0 A, 4250 W, 50.01 Hz, 12345678 Wh, 35.0 C.
    pub fn inverter_model() -> Vec<u16> {
        let mut w = vec![0u16; 40];
        w[0] = 103;
        w[1] = 50;
        w[2] = 100;
        w[3] = 34;
        w[4] = 33;
        w[5] = 33;
        w[6] = (-1i16) as u16;
        w[7] = 4012;
        w[10] = 2315;
        w[13] = (-1i16) as u16;
        w[14] = 4250;
        w[15] = 0;
        w[16] = 5001;
        w[17] = (-2i16) as u16;
        w[18] = 4300;
        w[20] = (-150i16) as u16;
        w[22] = 9900;
        w[23] = (-2i16) as u16;
        w[24] = 0x00bc;
        w[25] = 0x614e;
        w[26] = 0;
        w[27] = 1200;
        w[28] = (-2i16) as u16;
        w[29] = 7500;
        w[30] = (-1i16) as u16;
        w[31] = 4400;
        w[32] = 0;
        w[33] = 0x8000;
        w[34] = 3500;
        w[35] = 0x8000;
        w[36] = 0x8000;
        w[37] = (-2i16) as u16;
        w[38] = 4;
        w[39] = 0;
        w
    }

    /// Wye meter: 5.0 A, exporting 1200 W, 5000000 Wh exported.
    pub fn meter_model() -> Vec<u16> {
        let mut w = vec![0u16; 105];
        w[0] = 203;
        w[1] = 105;
        w[2] = 50;
        w[6] = (-1i16) as u16;
        w[7] = 2301;
        w[15] = (-1i16) as u16;
        w[16] = 5000;
        w[17] = (-2i16) as u16;
        w[18] = (-1200i16) as u16;
        w[22] = 0;
        // exported 500000
        w[38] = 0x0007;
        w[39] = 0xa120;
        // imported 1500
        w[46] = 0;
        w[47] = 1500;
        w[54] = 1;
        w[71] = 0x8000;
        w[104] = 0x8000;
        w
    }

    /// A source serving every block the exporter knows about.
    pub fn source() -> MockSource {
        let mut source = MockSource::default();
        source.insert(registers::INVERTER_COMMON.start, Self::inverter_common());
        source.insert(registers::INVERTER_MODEL.start, Self::inverter_model());
        source.insert(registers::METER_1_COMMON.start, Self::meter_common("M1-0001"));
        source.insert(registers::METER_1_MODEL.start, Self::meter_model());
        source.insert(registers::METER_2_COMMON.start, Self::meter_common("M2-0002"));
        source.insert(registers::METER_2_MODEL.start, Self::meter_model());
        source
    }
}

/// In-memory register source recording every request it gets.
#[derive(Default)]
pub struct MockSource {
    blocks: HashMap<u16, Vec<u16>>,
    pub requests: Vec<(u16, u16)>,
    pub connects: usize,
    pub connected: bool,
    pub refuse_connect: bool,
    pub fail_reads: HashSet<u16>,
}

impl MockSource {
    pub fn insert(&mut self, address: u16, words: Vec<u16>) {
        self.blocks.insert(address, words);
    }

    /// Later reads of `address` get an IllegalDataAddress exception.
    pub fn remove(&mut self, address: u16) {
        self.blocks.remove(&address);
    }

    pub fn requested(&self, address: u16) -> bool {
        self.requests.iter().any(|(start, _)| *start == address)
    }
}

#[async_trait]
impl RegisterSource for MockSource {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connects += 1;
        if self.refuse_connect {
            return Err(TransportError::Timeout(0));
        }
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<RegisterBuffer, TransportError> {
        self.requests.push((address, count));

        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.fail_reads.contains(&address) {
            return Err(TransportError::Read {
                address,
                count,
                reason: "connection reset by peer".to_string(),
            });
        }

        match self.blocks.get(&address) {
            Some(words) => {
                let end = words.len().min(usize::from(count));
                Ok(RegisterBuffer::from_words(address, &words[..end]))
            }
            None => Err(TransportError::Exception {
                address,
                count,
                code: "IllegalDataAddress".to_string(),
            }),
        }
    }
}

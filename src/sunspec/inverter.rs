use super::buffer::RegisterBuffer;
use super::scale::{resolve, Reading};
use crate::error::DecodeError;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Length inverter models 101..103 declare after their DID/length header.
pub const INVERTER_LENGTH: u16 = 50;

/// Registers of the model that are fetched and decoded.
pub const INVERTER_REGISTERS: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum InverterType {
    SinglePhase = 101,
    SplitPhase = 102,
    ThreePhase = 103,
}

/// Raw inverter telemetry. Values are unscaled; every scaled field has its
/// scale factor register next to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InverterModel {
    pub did: u16,
    pub length: u16,

    pub ac_current: u16,
    pub ac_current_a: u16,
    pub ac_current_b: u16,
    pub ac_current_c: u16,
    pub ac_current_sf: i16,

    pub ac_voltage_ab: u16,
    pub ac_voltage_bc: u16,
    pub ac_voltage_ca: u16,
    pub ac_voltage_an: u16,
    pub ac_voltage_bn: u16,
    pub ac_voltage_cn: u16,
    pub ac_voltage_sf: i16,

    pub ac_power: i16,
    pub ac_power_sf: i16,
    pub ac_frequency: u16,
    pub ac_frequency_sf: i16,
    pub ac_va: i16,
    pub ac_va_sf: i16,
    pub ac_var: i16,
    pub ac_var_sf: i16,
    pub ac_pf: i16,
    pub ac_pf_sf: i16,
    pub ac_energy_wh: u32,
    pub ac_energy_wh_sf: i16,

    pub dc_current: u16,
    pub dc_current_sf: i16,
    pub dc_voltage: u16,
    pub dc_voltage_sf: i16,
    pub dc_power: i16,
    pub dc_power_sf: i16,

    pub temp_sink: i16,
    pub temp_sf: i16,

    /// Not scaled.
    pub status: u16,
    /// Vendor status/error code, not scaled.
    pub status_vendor: u16,
}

impl InverterModel {
    pub fn decode(buf: &RegisterBuffer) -> Result<Self, DecodeError> {
        buf.ensure_len(INVERTER_REGISTERS)?;

        let did = buf.read_u16(0)?;
        let length = buf.read_u16(1)?;
        if length != INVERTER_LENGTH {
            return Err(DecodeError::LengthMismatch {
                block: "inverter model",
                declared: length,
                expected: INVERTER_LENGTH,
            });
        }

        Ok(Self {
            did,
            length,

            ac_current: buf.read_u16(2)?,
            ac_current_a: buf.read_u16(3)?,
            ac_current_b: buf.read_u16(4)?,
            ac_current_c: buf.read_u16(5)?,
            ac_current_sf: buf.read_i16(6)?,

            ac_voltage_ab: buf.read_u16(7)?,
            ac_voltage_bc: buf.read_u16(8)?,
            ac_voltage_ca: buf.read_u16(9)?,
            ac_voltage_an: buf.read_u16(10)?,
            ac_voltage_bn: buf.read_u16(11)?,
            ac_voltage_cn: buf.read_u16(12)?,
            ac_voltage_sf: buf.read_i16(13)?,

            ac_power: buf.read_i16(14)?,
            ac_power_sf: buf.read_i16(15)?,
            ac_frequency: buf.read_u16(16)?,
            ac_frequency_sf: buf.read_i16(17)?,
            ac_va: buf.read_i16(18)?,
            ac_va_sf: buf.read_i16(19)?,
            ac_var: buf.read_i16(20)?,
            ac_var_sf: buf.read_i16(21)?,
            ac_pf: buf.read_i16(22)?,
            ac_pf_sf: buf.read_i16(23)?,
            ac_energy_wh: buf.read_u32(24)?,
            ac_energy_wh_sf: buf.read_i16(26)?,

            dc_current: buf.read_u16(27)?,
            dc_current_sf: buf.read_i16(28)?,
            dc_voltage: buf.read_u16(29)?,
            dc_voltage_sf: buf.read_i16(30)?,
            dc_power: buf.read_i16(31)?,
            dc_power_sf: buf.read_i16(32)?,

            // 33 cabinet, 35 transformer and 36 other temperature are unused by SolarEdge
            temp_sink: buf.read_i16(34)?,
            temp_sf: buf.read_i16(37)?,

            status: buf.read_u16(38)?,
            status_vendor: buf.read_u16(39)?,
        })
    }

    /// Known phase layout, `None` for a DID outside 101..=103.
    pub fn kind(&self) -> Option<InverterType> {
        InverterType::try_from(self.did).ok()
    }

    pub fn ac_current(&self) -> Reading {
        resolve(self.ac_current, self.ac_current_sf)
    }

    pub fn ac_power(&self) -> Reading {
        resolve(self.ac_power, self.ac_power_sf)
    }

    pub fn ac_energy_wh(&self) -> Reading {
        resolve(self.ac_energy_wh, self.ac_energy_wh_sf)
    }

    pub fn dc_power(&self) -> Reading {
        resolve(self.dc_power, self.dc_power_sf)
    }
}

use super::buffer::RegisterBuffer;
use super::scale::{resolve, Reading};
use crate::error::DecodeError;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Length meter models 201..204 declare after their DID/length header.
pub const METER_LENGTH: u16 = 105;

/// Registers of the model that are fetched and decoded.
pub const METER_REGISTERS: usize = 105;

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum MeterType {
    SinglePhase = 201,
    SplitPhase = 202,
    WyeThreePhase = 203,
    DeltaThreePhase = 204,
}

/// A total and its three per-phase values, stored in that register order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Phases<T> {
    pub total: T,
    pub a: T,
    pub b: T,
    pub c: T,
}

impl Phases<i16> {
    fn read(buf: &RegisterBuffer, offset: usize) -> Result<Self, DecodeError> {
        Ok(Self {
            total: buf.read_i16(offset)?,
            a: buf.read_i16(offset + 1)?,
            b: buf.read_i16(offset + 2)?,
            c: buf.read_i16(offset + 3)?,
        })
    }
}

impl Phases<u32> {
    fn read(buf: &RegisterBuffer, offset: usize) -> Result<Self, DecodeError> {
        Ok(Self {
            total: buf.read_u32(offset)?,
            a: buf.read_u32(offset + 2)?,
            b: buf.read_u32(offset + 4)?,
            c: buf.read_u32(offset + 6)?,
        })
    }
}

/// Raw revenue meter telemetry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeterModel {
    pub did: u16,
    pub length: u16,

    pub current: Phases<i16>,
    pub current_sf: i16,

    /// `total` is the line to neutral average.
    pub voltage_ln: Phases<i16>,
    /// `total` is the line to line average, phases are AB, BC and CA.
    pub voltage_ll: Phases<i16>,
    pub voltage_sf: i16,

    pub frequency: i16,
    pub frequency_sf: i16,

    pub power: Phases<i16>,
    pub power_sf: i16,
    pub va: Phases<i16>,
    pub va_sf: i16,
    pub var: Phases<i16>,
    pub var_sf: i16,
    pub pf: Phases<i16>,
    pub pf_sf: i16,

    pub exported: Phases<u32>,
    pub imported: Phases<u32>,
    pub energy_w_sf: i16,

    pub exported_va: Phases<u32>,
    pub imported_va: Phases<u32>,
    pub energy_va_sf: i16,

    pub import_varh_q1: Phases<u32>,
    pub import_varh_q2: Phases<u32>,
    pub export_varh_q3: Phases<u32>,
    pub export_varh_q4: Phases<u32>,
    pub energy_var_sf: i16,
}

impl MeterModel {
    pub fn decode(buf: &RegisterBuffer) -> Result<Self, DecodeError> {
        buf.ensure_len(METER_REGISTERS)?;

        let did = buf.read_u16(0)?;
        let length = buf.read_u16(1)?;
        if length != METER_LENGTH {
            return Err(DecodeError::LengthMismatch {
                block: "meter model",
                declared: length,
                expected: METER_LENGTH,
            });
        }

        let voltage_ln = Phases::<i16>::read(buf, 7)?;
        let voltage_ll = Phases::<i16>::read(buf, 11)?;

        Ok(Self {
            did,
            length,

            current: Phases::<i16>::read(buf, 2)?,
            current_sf: buf.read_i16(6)?,

            voltage_ln,
            voltage_ll,
            voltage_sf: buf.read_i16(15)?,

            frequency: buf.read_i16(16)?,
            frequency_sf: buf.read_i16(17)?,

            power: Phases::<i16>::read(buf, 18)?,
            power_sf: buf.read_i16(22)?,
            va: Phases::<i16>::read(buf, 23)?,
            va_sf: buf.read_i16(27)?,
            var: Phases::<i16>::read(buf, 28)?,
            var_sf: buf.read_i16(32)?,
            pf: Phases::<i16>::read(buf, 33)?,
            pf_sf: buf.read_i16(37)?,

            exported: Phases::<u32>::read(buf, 38)?,
            imported: Phases::<u32>::read(buf, 46)?,
            energy_w_sf: buf.read_i16(54)?,

            exported_va: Phases::<u32>::read(buf, 55)?,
            imported_va: Phases::<u32>::read(buf, 63)?,
            energy_va_sf: buf.read_i16(71)?,

            import_varh_q1: Phases::<u32>::read(buf, 72)?,
            import_varh_q2: Phases::<u32>::read(buf, 80)?,
            export_varh_q3: Phases::<u32>::read(buf, 88)?,
            export_varh_q4: Phases::<u32>::read(buf, 96)?,
            energy_var_sf: buf.read_i16(104)?,
        })
    }

    pub fn kind(&self) -> Option<MeterType> {
        MeterType::try_from(self.did).ok()
    }

    pub fn current(&self) -> Reading {
        resolve(self.current.total, self.current_sf)
    }

    pub fn power(&self) -> Reading {
        resolve(self.power.total, self.power_sf)
    }

    pub fn exported(&self) -> Reading {
        resolve(self.exported.total, self.energy_w_sf)
    }

    pub fn imported(&self) -> Reading {
        resolve(self.imported.total, self.energy_w_sf)
    }
}

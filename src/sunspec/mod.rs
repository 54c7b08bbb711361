//! SunSpec register decoding for SolarEdge inverters and their meters.

pub mod buffer;
pub mod common;
pub mod inverter;
pub mod meter;
pub mod registers;
pub mod scale;

pub use buffer::RegisterBuffer;
pub use common::CommonModel;
pub use inverter::{InverterModel, InverterType};
pub use meter::{MeterModel, MeterType, Phases};
pub use scale::{resolve, AbsentPolicy, RawValue, Reading};

use super::buffer::RegisterBuffer;
use super::registers::SUNSPEC_MARKER;
use crate::error::DecodeError;

/// Length the common model declares after its DID/length header.
pub const COMMON_LENGTH: u16 = 65;

const MANUFACTURER_LEN: usize = 16;
const MODEL_LEN: usize = 16;
const OPTION_LEN: usize = 8;
const VERSION_LEN: usize = 8;
const SERIAL_LEN: usize = 16;

/// Identity block shared by the inverter and every meter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommonModel {
    pub did: u16,
    pub length: u16,
    pub manufacturer: String,
    pub model: String,
    /// Only surfaced for meters.
    pub option: Option<String>,
    pub version: String,
    pub serial_number: String,
    pub device_address: u16,
}

#[derive(Clone, Copy)]
enum Variant {
    Inverter,
    Meter,
}

impl Variant {
    // inverter block starts with the two register "SunS" marker
    fn header(self) -> usize {
        match self {
            Variant::Inverter => 2,
            Variant::Meter => 0,
        }
    }

    fn required(self) -> usize {
        self.header() + 2 + COMMON_LENGTH as usize
    }
}

impl CommonModel {
    /// Decodes the inverter common block (starts with the SunSpec marker).
    pub fn decode(buf: &RegisterBuffer) -> Result<Self, DecodeError> {
        Self::decode_variant(buf, Variant::Inverter)
    }

    /// Decodes a meter common block (no marker, option string surfaced).
    pub fn decode_meter(buf: &RegisterBuffer) -> Result<Self, DecodeError> {
        Self::decode_variant(buf, Variant::Meter)
    }

    fn decode_variant(buf: &RegisterBuffer, variant: Variant) -> Result<Self, DecodeError> {
        buf.ensure_len(variant.required())?;

        if let Variant::Inverter = variant {
            let marker = buf.read_u32(0)?;
            if marker != SUNSPEC_MARKER {
                return Err(DecodeError::NotSunSpec(marker));
            }
        }

        let base = variant.header();
        let did = buf.read_u16(base)?;
        let length = buf.read_u16(base + 1)?;
        if length != COMMON_LENGTH {
            return Err(DecodeError::LengthMismatch {
                block: "common model",
                declared: length,
                expected: COMMON_LENGTH,
            });
        }

        let mut offset = base + 2;
        let mut field = |len: usize| {
            let start = offset;
            offset += len;
            buf.read_string(start, len)
        };

        let manufacturer = field(MANUFACTURER_LEN)?;
        let model = field(MODEL_LEN)?;
        let option = field(OPTION_LEN)?;
        let version = field(VERSION_LEN)?;
        let serial_number = field(SERIAL_LEN)?;
        let device_address = buf.read_u16(offset)?;

        Ok(Self {
            did,
            length,
            manufacturer,
            model,
            option: match variant {
                Variant::Inverter => None,
                Variant::Meter => Some(option),
            },
            version,
            serial_number,
            device_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sunspec::buffer::pack_string;

    fn words(marker: bool, length: u16) -> Vec<u16> {
        let mut w = Vec::new();
        if marker {
            w.extend([0x5375, 0x6e53]);
        }
        w.extend([1, length]);
        w.extend(pack_string("SolarEdge", 16));
        w.extend(pack_string("SE7K-RWS48BNN4", 16));
        w.extend(pack_string("EXPORT+IMPORT", 8));
        w.extend(pack_string("0004.0013", 8));
        w.extend(pack_string("7E123456", 16));
        w.push(1);
        w
    }

    #[test]
    fn decodes_inverter_identity() {
        let mut w = words(true, 65);
        w.push(101); // first register of the inverter model, part of the 70 register read
        let cm = CommonModel::decode(&RegisterBuffer::from_words(40000, &w)).unwrap();

        assert_eq!(cm.did, 1);
        assert_eq!(cm.manufacturer, "SolarEdge");
        assert_eq!(cm.model, "SE7K-RWS48BNN4");
        assert_eq!(cm.option, None);
        assert_eq!(cm.version, "0004.0013");
        assert_eq!(cm.serial_number, "7E123456");
        assert_eq!(cm.device_address, 1);
    }

    #[test]
    fn decodes_meter_identity() {
        let cm = CommonModel::decode_meter(&RegisterBuffer::from_words(40121, &words(false, 65))).unwrap();

        assert_eq!(cm.option.as_deref(), Some("EXPORT+IMPORT"));
        assert_eq!(cm.serial_number, "7E123456");
    }

    #[test]
    fn rejects_missing_marker() {
        let mut w = words(true, 65);
        w[0] = 0;
        assert!(matches!(
            CommonModel::decode(&RegisterBuffer::from_words(40000, &w)),
            Err(DecodeError::NotSunSpec(_))
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        let err = CommonModel::decode_meter(&RegisterBuffer::from_words(40121, &words(false, 66))).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch {
                block: "common model",
                declared: 66,
                expected: 65
            }
        );
    }

    #[test]
    fn short_meter_block() {
        let w = words(false, 65);
        let err = CommonModel::decode_meter(&RegisterBuffer::from_words(40121, &w[..65])).unwrap_err();
        assert_eq!(err, DecodeError::ShortBuffer { required: 67, actual: 65 });
    }
}

use serde::Deserialize;

/// Scale factor register value meaning "not implemented".
pub const SF_NOT_IMPLEMENTED: i16 = i16::MIN;

/// A raw register value with its declared width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawValue {
    I16(i16),
    U16(u16),
    U32(u32),
}

impl RawValue {
    /// True when the register holds the width's "not implemented" marker.
    pub fn is_sentinel(&self) -> bool {
        match self {
            RawValue::I16(v) => *v == i16::MIN,
            RawValue::U16(v) => *v == u16::MAX,
            RawValue::U32(v) => *v == u32::MAX,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            RawValue::I16(v) => f64::from(*v),
            RawValue::U16(v) => f64::from(*v),
            RawValue::U32(v) => f64::from(*v),
        }
    }
}

impl From<i16> for RawValue {
    fn from(v: i16) -> Self {
        RawValue::I16(v)
    }
}

impl From<u16> for RawValue {
    fn from(v: u16) -> Self {
        RawValue::U16(v)
    }
}

impl From<u32> for RawValue {
    fn from(v: u32) -> Self {
        RawValue::U32(v)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reading {
    Value(f64),
    Absent,
}

impl Reading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Reading::Absent)
    }

    /// What to hand the metrics sink for this reading, `None` meaning leave
    /// the gauge alone.
    pub fn or_policy(&self, policy: AbsentPolicy) -> Option<f64> {
        match (self, policy) {
            (Reading::Value(v), _) => Some(*v),
            (Reading::Absent, AbsentPolicy::Omit) => None,
            (Reading::Absent, AbsentPolicy::Zero) => Some(0.0),
            (Reading::Absent, AbsentPolicy::Nan) => Some(f64::NAN),
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Value(v) => write!(f, "{}", v),
            Reading::Absent => write!(f, "n/a"),
        }
    }
}

/// How "not implemented" readings are published.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsentPolicy {
    #[default]
    Omit,
    Zero,
    Nan,
}

/// `raw * 10^exponent`, or `Absent` when either register is unimplemented.
pub fn resolve(raw: impl Into<RawValue>, exponent: i16) -> Reading {
    let raw = raw.into();
    if raw.is_sentinel() || exponent == SF_NOT_IMPLEMENTED {
        return Reading::Absent;
    }

    Reading::Value(raw.as_f64() * 10f64.powi(i32::from(exponent)))
}

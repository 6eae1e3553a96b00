//! Numeric encodings and basic protocol types of the Stiebel Eltron ISG Modbus interface.
//!
//! Every register of the ISG carries a 16-bit raw word. How that word maps to an
//! engineering value is fixed by the register's data type:
//!
//! | type | value range          | read   | write | signed |
//! |------|----------------------|--------|-------|--------|
//! | 2    | -3276.8 to 3276.7    | × 0.1  | × 10  | yes    |
//! | 6    | 0 to 65535           | × 1    | × 1   | no     |
//! | 7    | -327.68 to 327.67    | × 0.01 | × 100 | yes    |
//! | 8    | 0 to 255             | × 1    | × 1   | no     |

use std::fmt;
use std::ops::Deref;

/// Errors raised while converting between engineering values and raw register words.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The Modbus unit identifier is outside of `UnitId::MIN..=UnitId::MAX`.
    #[error("The unit id {0} is outside the valid range of {min} to {max}", min = UnitId::MIN, max = UnitId::MAX)]
    UnitIdOutOfRange(u8),

    /// The numeric data type code is not one of 2, 6, 7 or 8.
    #[error("Unknown register data type {0}")]
    UnknownEncodingType(u8),

    /// The value cannot be represented by the register's data type.
    #[error("The value {value} does not fit into a register of type {encoding}")]
    ValueOutOfRange { value: f64, encoding: EncodingType },

    /// The operating mode name is not part of the controller's mode table.
    #[error("Unknown operating mode '{0}'")]
    UnknownOperatingMode(String),
}

/// Modbus unit (slave) identifier of the ISG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(u8);

impl UnitId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 247;
}

impl Default for UnitId {
    fn default() -> Self {
        Self(1)
    }
}

impl Deref for UnitId {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u8> for UnitId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::UnitIdOutOfRange(value))
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// The fixed numeric interpretation of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum EncodingType {
    /// Temperature-like values in tenths, two's complement.
    Signed16Tenths = 2,
    /// Counters, enumerations and bit masks.
    Unsigned16 = 6,
    /// Pressure-like values in hundredths, two's complement.
    Signed16Hundredths = 7,
    /// Small enumerations and stages.
    Unsigned8 = 8,
}

impl EncodingType {
    /// The data type number as used by the controller documentation.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Divisor applied when reading, multiplier applied when writing.
    pub fn scale(&self) -> f64 {
        match self {
            Self::Signed16Tenths => 10.0,
            Self::Signed16Hundredths => 100.0,
            Self::Unsigned16 | Self::Unsigned8 => 1.0,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed16Tenths | Self::Signed16Hundredths)
    }

    /// Decodes a raw register word.
    ///
    /// Signed types reinterpret the word as a 16-bit two's complement integer,
    /// scale it and round to two decimal places. Unsigned types are passed
    /// through unchanged.
    pub fn decode(&self, raw: u16) -> Value {
        if self.is_signed() {
            Value::Scaled(round_hundredths(f64::from(raw as i16) / self.scale()))
        } else {
            Value::Unsigned(raw)
        }
    }

    /// Encodes an engineering value into a raw register word, rounding to the
    /// nearest step of the type. Exact half steps go to the even neighbour,
    /// e.g. 21.25 °C is written as 212.
    pub fn encode(&self, value: f64) -> Result<u16, Error> {
        let scaled = (value * self.scale()).round_ties_even();
        let (min, max) = match self {
            Self::Signed16Tenths | Self::Signed16Hundredths => {
                (f64::from(i16::MIN), f64::from(i16::MAX))
            }
            Self::Unsigned16 => (0.0, f64::from(u16::MAX)),
            Self::Unsigned8 => (0.0, f64::from(u8::MAX)),
        };
        // NaN fails the range check as well
        if !(min..=max).contains(&scaled) {
            return Err(Error::ValueOutOfRange {
                value,
                encoding: *self,
            });
        }
        if self.is_signed() {
            Ok(scaled as i16 as u16)
        } else {
            Ok(scaled as u16)
        }
    }
}

impl TryFrom<u8> for EncodingType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Signed16Tenths),
            6 => Ok(Self::Unsigned16),
            7 => Ok(Self::Signed16Hundredths),
            8 => Ok(Self::Unsigned8),
            other => Err(Error::UnknownEncodingType(other)),
        }
    }
}

impl From<EncodingType> for u8 {
    fn from(value: EncodingType) -> Self {
        value.code()
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

pub(crate) fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A decoded register value.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Result of a signed, scaled data type (2 or 7).
    Scaled(f64),
    /// Result of an unsigned pass-through data type (6 or 8).
    Unsigned(u16),
}

impl Value {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Scaled(value) => value,
            Self::Unsigned(value) => f64::from(value),
        }
    }

    /// Returns the unsigned raw value, `None` for scaled values.
    pub fn as_unsigned(&self) -> Option<u16> {
        match *self {
            Self::Scaled(_) => None,
            Self::Unsigned(value) => Some(value),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scaled(value) => write!(f, "{value:.2}"),
            Self::Unsigned(value) => write!(f, "{value}"),
        }
    }
}

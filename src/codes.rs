//! Symbolic code tables of the ISG registers.
//!
//! These tables give names to the raw values of the enumeration and bit mask
//! registers (operating mode, reset, restart, fault and bus status, operating
//! status). The numbering differs between the legacy controllers and the WPM3(i).

use crate::catalog::Variant;
use crate::protocol as proto;
use bitflags::bitflags;

/// Name reported for an operating mode code that has no entry in the mode table.
pub const UNKNOWN_OPERATING_MODE: &str = "UNKNOWN";

/// Operating modes of the legacy controllers (register `OPERATING_MODE`).
pub const LEGACY_OPERATING_MODES: &[(&str, u16)] = &[
    ("AUTOMATIC", 11),
    ("STANDBY", 1),
    ("DAY MODE", 3),
    ("SETBACK MODE", 4),
    ("DHW", 5),
    ("MANUAL MODE", 14),
    ("EMERGENCY OPERATION", 0),
];

/// Operating modes of the WPM3(i) (register `OPERATING_MODE`).
pub const WPM3I_OPERATING_MODES: &[(&str, u16)] = &[
    ("STANDBY_MODE", 1),
    ("PROGRAMMED_OPERATION", 2),
    ("COMFORT_MODE", 3),
    ("ECO_MODE", 4),
    ("DHW_MODE", 5),
    ("EMERGENCY_OPERATION", 0),
];

/// Values of the legacy `RESET` register.
pub const LEGACY_RESET: &[(&str, u16)] = &[("OFF", 0), ("ON", 1)];

/// Values of the WPM3(i) `RESET` register.
pub const WPM3I_RESET: &[(&str, u16)] = &[
    ("SYSTEM_RESET", 1),
    ("FAULT_LIST_RESET", 2),
    ("HEAT_PUMP_RESET", 3),
];

/// Values of the legacy `RESTART_ISG` register.
pub const LEGACY_RESTART_ISG: &[(&str, u16)] = &[("OFF", 0), ("RESET", 1), ("MENU", 2)];

/// Values of the WPM3(i) `RESTART_ISG` register.
pub const WPM3I_RESTART_ISG: &[(&str, u16)] = &[("OFF", 0), ("RESTART", 1), ("SERVICE_KEY", 2)];

/// Values of the `FAULT_STATUS` register, identical on both controller families.
pub const FAULT_STATUS: &[(&str, u16)] = &[("NO_FAULT", 0), ("FAULT", 1)];

/// Raw readings the vendor documents as sensor failures.
///
/// They are decoded like any other reading and never mapped to an error.
pub mod sensor {
    /// Sensor lead is missing or disconnected.
    pub const NOT_AVAILABLE: i16 = -60;
    /// Short circuit of the sensor lead.
    pub const SHORT_CIRCUIT: i16 = -50;
    /// Object unavailable.
    pub const OBJECT_UNAVAILABLE: u16 = 0x8000;
}

/// Looks up the code of `name` in a code table.
pub fn code_of(table: &[(&str, u16)], name: &str) -> Option<u16> {
    table
        .iter()
        .find(|(entry, _)| *entry == name)
        .map(|&(_, code)| code)
}

/// Looks up the name of `code` in a code table.
pub fn name_of(table: &[(&'static str, u16)], code: u16) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, entry)| *entry == code)
        .map(|&(name, _)| name)
}

impl Variant {
    pub fn operating_modes(&self) -> &'static [(&'static str, u16)] {
        match self {
            Variant::Legacy => LEGACY_OPERATING_MODES,
            Variant::Wpm3i => WPM3I_OPERATING_MODES,
        }
    }

    pub fn reset_codes(&self) -> &'static [(&'static str, u16)] {
        match self {
            Variant::Legacy => LEGACY_RESET,
            Variant::Wpm3i => WPM3I_RESET,
        }
    }

    pub fn restart_isg_codes(&self) -> &'static [(&'static str, u16)] {
        match self {
            Variant::Legacy => LEGACY_RESTART_ISG,
            Variant::Wpm3i => WPM3I_RESTART_ISG,
        }
    }

    /// Maps an operating mode name to the code written to `OPERATING_MODE`.
    pub fn operating_mode_code(&self, name: &str) -> Result<u16, proto::Error> {
        code_of(self.operating_modes(), name)
            .ok_or_else(|| proto::Error::UnknownOperatingMode(name.to_string()))
    }

    /// Maps an `OPERATING_MODE` value to its name, [`UNKNOWN_OPERATING_MODE`] if unmapped.
    pub fn operating_mode_name(&self, code: u16) -> &'static str {
        name_of(self.operating_modes(), code).unwrap_or(UNKNOWN_OPERATING_MODE)
    }
}

/// Content of the `BUS_STATUS` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusStatus {
    StatusOk,
    StatusError,
    ErrorPassive,
    BusOff,
    PhysicalError,
    /// A value outside of the documented range, kept as signed raw value.
    Unknown(i16),
}

impl BusStatus {
    /// Interprets the raw register word as a signed status code.
    pub fn decode(raw: u16) -> Self {
        match raw as i16 {
            0 => Self::StatusOk,
            -1 => Self::StatusError,
            -2 => Self::ErrorPassive,
            -3 => Self::BusOff,
            -4 => Self::PhysicalError,
            other => Self::Unknown(other),
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Self::StatusOk
    }
}

impl std::fmt::Display for BusStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusOk => f.write_str("STATUS_OK"),
            Self::StatusError => f.write_str("STATUS_ERROR"),
            Self::ErrorPassive => f.write_str("ERROR_PASSIVE"),
            Self::BusOff => f.write_str("BUS_OFF"),
            Self::PhysicalError => f.write_str("PHYSICAL_ERROR"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

bitflags! {
    /// Bits of the legacy `OPERATING_STATUS` register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperatingStatus: u16 {
        const SWITCHING_PROGRAM_ENABLED = 1 << 0;
        const COMPRESSOR = 1 << 1;
        const HEATING = 1 << 2;
        const COOLING = 1 << 3;
        const DHW = 1 << 4;
        const ELECTRIC_REHEATING = 1 << 5;
        const SERVICE = 1 << 6;
        const POWER_OFF = 1 << 7;
        const FILTER = 1 << 8;
        const VENTILATION = 1 << 9;
        const HEATING_CIRCUIT_PUMP = 1 << 10;
        const EVAPORATOR_DEFROST = 1 << 11;
        const FILTER_EXTRACT_AIR = 1 << 12;
        const FILTER_VENTILATION_AIR = 1 << 13;
        const HEAT_UP_PROGRAM = 1 << 14;

        /// Any of the filter alarms.
        const ANY_FILTER = Self::FILTER.bits()
            | Self::FILTER_EXTRACT_AIR.bits()
            | Self::FILTER_VENTILATION_AIR.bits();
    }
}

bitflags! {
    /// Bits of the WPM3(i) `OPERATING_STATUS_A` register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Wpm3iOperatingStatus: u16 {
        const HC_1_PUMP = 1 << 0;
        const HC_2_PUMP = 1 << 1;
        const HEAT_UP_PROGRAM = 1 << 2;
        const NHZ_STAGES_RUNNING = 1 << 3;
        const HP_IN_HEATING_MODE = 1 << 4;
        const HP_IN_DHW_MODE = 1 << 5;
        const COMPRESSOR_RUNNING = 1 << 6;
        const SUMMER_MODE_ACTIVE = 1 << 7;
        const COOLING_MODE_ACTIVE = 1 << 8;
        const MIN_ONE_IWS_IN_DEFROST_MODE = 1 << 9;
        const SILENT_MODE_1_ACTIVE = 1 << 10;
        /// Silent mode 2, the heat pump is off.
        const SILENT_MODE_2_ACTIVE = 1 << 11;
    }
}

bitflags! {
    /// Bits of the WPM3(i) `POWER-OFF` register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Wpm3iPowerOff: u16 {
        const POWER_OFF = 1 << 0;
    }
}

bitflags! {
    /// Bits of the WPM3(i) `OPERATING_STATUS_B` register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Wpm3iComponentStatus: u16 {
        const COMPRESSOR_1 = 1 << 0;
        const COMPRESSOR_2 = 1 << 1;
        const COMPRESSOR_3 = 1 << 2;
        const COMPRESSOR_4 = 1 << 3;
        const COMPRESSOR_5 = 1 << 4;
        const COMPRESSOR_6 = 1 << 5;
        const BUFFER_CHARGING_PUMP_1 = 1 << 6;
        const BUFFER_CHARGING_PUMP_2 = 1 << 7;
        const BUFFER_CHARGING_PUMP_3 = 1 << 8;
        const BUFFER_CHARGING_PUMP_4 = 1 << 9;
        const BUFFER_CHARGING_PUMP_5 = 1 << 10;
        const BUFFER_CHARGING_PUMP_6 = 1 << 11;
        const NHZ_1 = 1 << 12;
        const NHZ_2 = 1 << 13;
    }
}

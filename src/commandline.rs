use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::PathBuf;
use std::time::Duration;
use stiebel_eltron_lib::{catalog::Variant, protocol as proto};

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn parse_unit(s: &str) -> Result<proto::UnitId, String> {
    let unit = clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid unit id format: {e}"))?;
    proto::UnitId::try_from(unit).map_err(|e| e.to_string())
}

fn parse_baud_rate(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(0) => Err(String::from("The baud rate must not be 0")),
        Ok(rate) => Ok(rate),
        Err(e) => Err(format!("Invalid baud rate number format: {e}")),
    }
}

fn parse_degree_celsius(s: &str) -> Result<f64, String> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Invalid temperature value format: {e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("Invalid temperature value {value}"))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliConnection {
    /// Connect to the ISG via Modbus TCP.
    Tcp {
        /// Host and port of the ISG.
        /// Example: "192.168.1.20:502".
        #[clap(verbatim_doc_comment)]
        address: String,

        /// The Modbus unit id of the ISG (1 to 247).
        #[arg(short, long, default_value_t = proto::UnitId::default(), value_parser = parse_unit)]
        unit: proto::UnitId,

        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect to the heat pump via Modbus RTU (Serial).
    Rtu {
        /// Serial port device name.
        /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
        #[arg(short, long, default_value_t = default_device_name(), verbatim_doc_comment)]
        device: String,

        /// Baud rate for serial communication.
        #[arg(long, default_value_t = 9600, value_parser = parse_baud_rate)]
        baud_rate: u32,

        /// The Modbus unit id (1 to 247).
        /// Can be specified in decimal or hexadecimal (e.g., "0x01").
        #[arg(short, long, default_value_t = proto::UnitId::default(), value_parser = parse_unit, verbatim_doc_comment)]
        unit: proto::UnitId,

        #[command(subcommand)]
        command: CliCommands,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Read all registers once and print the most important values.
    Read,

    /// Print registers by name, e.g. "get OUTSIDE_TEMPERATURE FLOW_RATE".
    Get {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print every register of the register map with its decoded value.
    Dump,

    /// Print operating mode, status flags, fault and bus status.
    Status,

    /// List the operating modes accepted by "set-mode".
    Modes,

    /// Run in daemon mode: poll the heat pump and print a summary on every update.
    Daemon {
        /// Interval between updates (e.g., "30s", "1m")
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "30s")]
        poll_interval: Duration,
    },

    /// Set the day room temperature of heating circuit 1.
    SetTemperature {
        /// Temperature in degrees Celsius, in steps of 0.1 °C.
        #[arg(value_parser = parse_degree_celsius, allow_hyphen_values = true)]
        value: f64,
    },

    /// Set the operating mode, see "modes" for the accepted names.
    SetMode {
        /// Name of the operating mode, e.g. "AUTOMATIC" or "COMFORT_MODE".
        mode: String,
    },
}

const fn about_text() -> &'static str {
    "Stiebel Eltron ISG CLI - Read and control Stiebel Eltron heat pumps via Modbus TCP/RTU."
}

#[derive(Parser, Debug)]
#[command(name="isgctl", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    pub connection: CliConnection,

    /// Modbus I/O timeout for read/write operations.
    /// Examples: "1s", "500ms".
    #[arg(global = true, long, default_value = "1s", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// Controller family of the heat pump: "legacy" or "wpm3i".
    #[arg(global = true, long, default_value_t = Variant::default())]
    pub variant: Variant,

    /// Load the register map from a YAML file instead of the built-in map of --variant.
    #[arg(global = true, long, conflicts_with = "variant")]
    pub register_map: Option<PathBuf>,
}

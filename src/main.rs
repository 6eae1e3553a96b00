//! Stiebel Eltron ISG CLI
//!
//! A command-line interface (CLI) application for reading and controlling
//! Stiebel Eltron heat pumps through the ISG Modbus interface, using Modbus
//! TCP or Modbus RTU (serial).
//!
//! This tool allows users to:
//! - Read a summary of temperatures, pressures and energy counters.
//! - Read single registers by name or dump the whole register map.
//! - Show operating mode, status flags, fault and bus status.
//! - Set the room target temperature and the operating mode.
//! - Run in a continuous daemon mode that polls the heat pump.
//!
//! The CLI leverages the `stiebel_eltron_lib` crate for the register maps and
//! the controller client.

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::panic;
use std::sync::Arc;
use stiebel_eltron_lib::{
    catalog::{Catalog, Variant},
    client::StiebelEltron,
    codes::{self, FAULT_STATUS},
    transport::Transport,
};

mod commandline;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Formats the named accessors of a heat pump, skipping the ones its
/// controller family does not support. Reads the cache only.
fn summary<T: Transport>(heat_pump: &mut StiebelEltron<T>) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();
    macro_rules! push {
        ($label:expr, $value:expr, $unit:expr) => {
            if let Some(value) = $value {
                lines.push(($label, format!("{value} {}", $unit).trim_end().to_string()));
            }
        };
    }
    push!("Operating mode", heat_pump.operation_mode(), "");
    push!("Room temperature", heat_pump.current_temperature(), "°C");
    push!("Room target temperature", heat_pump.target_temperature(), "°C");
    push!("Room humidity", heat_pump.current_humidity(), "%");
    push!("Outside temperature", heat_pump.outside_temperature(), "°C");
    push!("HC1 temperature", heat_pump.actual_hk1_temperature(), "°C");
    push!("HC1 target temperature", heat_pump.target_hk1_temperature(), "°C");
    push!("Flow temperature HP", heat_pump.actual_wp_flow_temperature(), "°C");
    push!("Flow temperature NHZ", heat_pump.actual_nhz_flow_temperature(), "°C");
    push!("Return temperature", heat_pump.actual_return_temperature(), "°C");
    push!("Heating pressure", heat_pump.heating_pressure(), "bar");
    push!("Flow rate", heat_pump.heating_or_dhw_flow_rate(), "l/min");
    push!("DHW temperature", heat_pump.actual_dhw_temperature(), "°C");
    push!("DHW target temperature", heat_pump.target_dhw_temperature(), "°C");
    push!("Source temperature", heat_pump.source_temperature(), "°C");
    push!("Source pressure", heat_pump.source_pressure(), "bar");
    push!("Heating energy today", heat_pump.vd_heating_day_kwh(), "kWh");
    push!("Heating energy total", heat_pump.vd_heating_total_kwh(), "kWh");
    lines
}

fn print_summary<T: Transport>(heat_pump: &mut StiebelEltron<T>) {
    for (label, value) in summary(heat_pump) {
        println!("{label:<26}{value}");
    }
}

fn print_status<T: Transport>(heat_pump: &mut StiebelEltron<T>) {
    macro_rules! print_flag {
        ($label:expr, $value:expr) => {
            if let Some(value) = $value {
                println!("{:<26}{}", $label, if value { "yes" } else { "no" });
            }
        };
    }
    if let Some(mode) = heat_pump.operation_mode() {
        println!("{:<26}{mode}", "Operating mode");
    }
    print_flag!("Heating", heat_pump.is_heating());
    print_flag!("Cooling", heat_pump.is_cooling());
    print_flag!("Hot water", heat_pump.is_dhw_active());
    print_flag!("Compressor running", heat_pump.is_compressor_running());
    print_flag!("Defrosting", heat_pump.is_defrosting());
    print_flag!("Power off", heat_pump.is_powered_off());
    print_flag!("Filter alarm", heat_pump.filter_alarm());
    if let Some(raw) = heat_pump.raw_value("FAULT_STATUS") {
        let fault = codes::name_of(FAULT_STATUS, raw).unwrap_or("UNKNOWN");
        println!("{:<26}{fault}", "Fault status");
    }
    if let Some(bus) = heat_pump.bus_status() {
        println!("{:<26}{bus}", "Bus status");
    }
    if let Some(status) = heat_pump.operating_status() {
        println!("{:<26}{status:?}", "Operating status");
    }
    if let Some(status) = heat_pump.wpm3i_operating_status() {
        println!("{:<26}{status:?}", "Operating status");
    }
    if let Some(status) = heat_pump.wpm3i_component_status() {
        println!("{:<26}{status:?}", "Components");
    }
}

fn load_catalog(args: &commandline::CliArgs) -> Result<Arc<Catalog>> {
    match &args.register_map {
        Some(path) => {
            let catalog = Catalog::from_yaml_file(path)
                .with_context(|| format!("Cannot load register map {}", path.display()))?;
            info!(
                "Loaded register map {} for {} controllers with {} registers",
                path.display(),
                catalog.variant(),
                catalog.len()
            );
            Ok(Arc::new(catalog))
        }
        None => Ok(Catalog::builtin(args.variant)),
    }
}

/// Creates a new controller client based on the provided command-line arguments.
fn create_client(
    args: &commandline::CliArgs,
) -> Result<(
    StiebelEltron<tokio_modbus::client::sync::Context>,
    &commandline::CliCommands,
)> {
    let catalog = load_catalog(args)?;
    let (mut ctx, unit, command) = match &args.connection {
        commandline::CliConnection::Tcp {
            address,
            unit,
            command,
        } => {
            let socket_addr = address
                .parse()
                .with_context(|| format!("Invalid TCP address format: '{address}'"))?;
            info!("Attempting to connect via TCP to {socket_addr}...");
            let ctx = tokio_modbus::client::sync::tcp::connect(socket_addr).with_context(|| {
                format!("Failed to connect to Modbus TCP device at {socket_addr}")
            })?;
            (ctx, *unit, command)
        }
        commandline::CliConnection::Rtu {
            device,
            baud_rate,
            unit,
            command,
        } => {
            info!("Attempting to connect via RTU to device {device} (Unit: {unit}, Baud: {baud_rate})...");
            let ctx = tokio_modbus::client::sync::rtu::connect(
                &stiebel_eltron_lib::tokio_sync::serial_port_builder(device, *baud_rate),
            )
            .with_context(|| format!("Cannot open serial port {device}"))?;
            (ctx, *unit, command)
        }
    };
    ctx.set_timeout(args.timeout);
    Ok((
        StiebelEltron::with_catalog(ctx, unit, false, catalog),
        command,
    ))
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "ISG CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    if let commandline::CliConnection::Tcp {
        command: commandline::CliCommands::Modes,
        ..
    }
    | commandline::CliConnection::Rtu {
        command: commandline::CliCommands::Modes,
        ..
    } = &args.connection
    {
        let variant: Variant = load_catalog(&args)?.variant();
        println!("Operating modes of {variant} controllers:");
        for (name, code) in variant.operating_modes() {
            println!("  {name:<24}{code}");
        }
        return Ok(());
    }

    let (mut heat_pump, command) = create_client(&args)?;

    match command {
        commandline::CliCommands::Read => {
            info!("Executing: Read");
            heat_pump
                .try_update()
                .with_context(|| "Cannot read registers")?;
            print_summary(&mut heat_pump);
        }
        commandline::CliCommands::Get { names } => {
            info!("Executing: Get {names:?}");
            heat_pump
                .try_update()
                .with_context(|| "Cannot read registers")?;
            for name in names {
                let value = heat_pump.resolve_and_decode(name).with_context(|| {
                    format!(
                        "Register {name} is not available on {} controllers",
                        heat_pump.variant()
                    )
                })?;
                println!("{name}: {value}");
            }
        }
        commandline::CliCommands::Dump => {
            info!("Executing: Dump");
            heat_pump
                .try_update()
                .with_context(|| "Cannot read registers")?;
            for (field, value) in heat_pump.values() {
                println!("{:>5} {:<40}{value}", field.address(), field.name());
            }
        }
        commandline::CliCommands::Status => {
            info!("Executing: Status");
            heat_pump
                .try_update()
                .with_context(|| "Cannot read registers")?;
            print_status(&mut heat_pump);
        }
        commandline::CliCommands::Modes => {}
        commandline::CliCommands::Daemon { poll_interval } => {
            info!("Starting daemon mode: interval={poll_interval:?}");
            loop {
                debug!("Daemon: Updating registers...");
                if heat_pump.update() {
                    print_summary(&mut heat_pump);
                    println!();
                }
                std::thread::sleep(*poll_interval);
            }
        }
        commandline::CliCommands::SetTemperature { value } => {
            info!("Executing: Set target temperature to {value} °C");
            heat_pump
                .set_target_temperature(*value)
                .with_context(|| format!("Failed to set target temperature to {value} °C"))?;
            println!("Target temperature set to {value} °C successfully.");
        }
        commandline::CliCommands::SetMode { mode } => {
            info!("Executing: Set operating mode to {mode}");
            heat_pump
                .set_operation_mode(mode)
                .with_context(|| format!("Failed to set operating mode to {mode}"))?;
            println!("Operating mode set to {mode} successfully.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stiebel_eltron_lib::{protocol::UnitId, transport::TransportError};

    /// Serves the same word for every register.
    struct ConstTransport(u16);

    impl Transport for ConstTransport {
        fn read_input_registers(
            &mut self,
            _unit: UnitId,
            _address: u16,
            count: u16,
        ) -> std::result::Result<Vec<u16>, TransportError> {
            Ok(vec![self.0; usize::from(count)])
        }

        fn read_holding_registers(
            &mut self,
            unit: UnitId,
            address: u16,
            count: u16,
        ) -> std::result::Result<Vec<u16>, TransportError> {
            self.read_input_registers(unit, address, count)
        }

        fn write_register(
            &mut self,
            _unit: UnitId,
            _address: u16,
            _value: u16,
        ) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    fn labels(lines: &[(&'static str, String)]) -> Vec<&'static str> {
        lines.iter().map(|(label, _)| *label).collect()
    }

    #[test]
    fn legacy_summary() {
        let mut heat_pump =
            StiebelEltron::new(ConstTransport(215), UnitId::default(), false, Variant::Legacy);
        assert!(heat_pump.update());
        let lines = summary(&mut heat_pump);
        assert_eq!(lines[0], ("Operating mode", String::from("UNKNOWN")));
        assert!(lines.contains(&("Outside temperature", String::from("21.5 °C"))));
        assert!(lines.contains(&("Flow rate", String::from("2.15 l/min"))));
        assert!(!labels(&lines).contains(&"Source pressure"));
        assert!(!labels(&lines).contains(&"Heating energy total"));
    }

    #[test]
    fn wpm3i_summary() {
        let mut heat_pump =
            StiebelEltron::new(ConstTransport(2), UnitId::default(), false, Variant::Wpm3i);
        assert!(heat_pump.update());
        let lines = summary(&mut heat_pump);
        assert_eq!(lines[0], ("Operating mode", String::from("PROGRAMMED_OPERATION")));
        assert!(lines.contains(&("Heating energy total", String::from("2002 kWh"))));
        assert!(lines.contains(&("Source pressure", String::from("0.02 bar"))));
        assert!(!labels(&lines).contains(&"Room humidity"));
    }
}

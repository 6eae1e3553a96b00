//! Synchronous `tokio-modbus` transport for the ISG.
//!
//! Implements [`Transport`] for `tokio_modbus::client::sync::Context`, so a
//! connected Modbus RTU or TCP context can be handed straight to
//! [`StiebelEltron`](crate::client::StiebelEltron).
//!
//! # Examples
//!
//! ## TCP Client Example
//!
//! ```no_run
//! use stiebel_eltron_lib::{catalog::Variant, client::StiebelEltron, protocol::UnitId};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut ctx = tokio_modbus::client::sync::tcp::connect("192.168.1.20:502".parse()?)?;
//!     ctx.set_timeout(Duration::from_secs(2));
//!
//!     let mut heat_pump = StiebelEltron::new(ctx, UnitId::default(), false, Variant::Wpm3i);
//!     if heat_pump.update() {
//!         println!("Outside temperature: {:?}", heat_pump.outside_temperature());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## RTU Client Example
//!
//! ```no_run
//! use stiebel_eltron_lib::{catalog::Variant, client::StiebelEltron, protocol::UnitId};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = stiebel_eltron_lib::tokio_sync::serial_port_builder("/dev/ttyUSB0", 9600);
//!     let ctx = tokio_modbus::client::sync::rtu::connect(&builder)?;
//!
//!     let mut heat_pump = StiebelEltron::new(ctx, UnitId::default(), true, Variant::Legacy);
//!     println!("Operating mode: {:?}", heat_pump.operation_mode());
//!     Ok(())
//! }
//! ```

use crate::protocol::UnitId;
use crate::transport::{Transport, TransportError};
use tokio_modbus::client::sync::Context;
use tokio_modbus::prelude::{SyncReader, SyncWriter};
use tokio_modbus::slave::SlaveContext;
use tokio_modbus::Slave;

/// The parity used for serial communication.
#[cfg(feature = "tokio-rtu-sync")]
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
#[cfg(feature = "tokio-rtu-sync")]
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::One;
/// The number of data bits used for serial communication.
#[cfg(feature = "tokio-rtu-sync")]
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;

/// Creates a `tokio_serial::SerialPortBuilder` with the serial settings of the ISG.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
/// * `baud_rate` - The baud rate for the serial communication.
#[cfg(feature = "tokio-rtu-sync")]
pub fn serial_port_builder(device: &str, baud_rate: u32) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, baud_rate)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
}

/// Helper function to map tokio result to our result.
fn map_tokio_result<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
    match result {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.into()), // Modbus exception
        Err(err) => Err(err.into()),     // IO error
    }
}

impl Transport for Context {
    fn read_input_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        self.set_slave(Slave(*unit));
        map_tokio_result(SyncReader::read_input_registers(self, address, count))
    }

    fn read_holding_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        self.set_slave(Slave(*unit));
        map_tokio_result(SyncReader::read_holding_registers(self, address, count))
    }

    fn write_register(
        &mut self,
        unit: UnitId,
        address: u16,
        value: u16,
    ) -> Result<(), TransportError> {
        self.set_slave(Slave(*unit));
        map_tokio_result(self.write_single_register(address, value))
    }
}

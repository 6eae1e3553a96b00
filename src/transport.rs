//! The register access contract the controller client is built on.
//!
//! Framing, connection handling, timeouts and retries are the business of the
//! [`Transport`] implementation. With the `tokio-rtu-sync` or `tokio-tcp-sync`
//! features enabled, a `tokio_modbus::client::sync::Context` implements it
//! (see [`crate::tokio_sync`]).

use crate::protocol::UnitId;

/// A failed register request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Wraps `tokio_modbus::Error`.
    #[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
    #[error("Modbus error: {0}")]
    Modbus(#[from] tokio_modbus::Error),

    /// Wraps `tokio_modbus::ExceptionCode`.
    #[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
    #[error("Modbus exception: {0}")]
    Exception(#[from] tokio_modbus::ExceptionCode),

    /// The response did not carry the requested number of registers.
    #[error("Expected {expected} registers from address {address}, got {actual}")]
    UnexpectedLength {
        address: u16,
        expected: u16,
        actual: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Register level access to a Modbus device.
///
/// Read calls return exactly `count` raw register words starting at `address`.
pub trait Transport {
    fn read_input_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    fn read_holding_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    fn write_register(
        &mut self,
        unit: UnitId,
        address: u16,
        value: u16,
    ) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_input_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_input_registers(unit, address, count)
    }

    fn read_holding_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_holding_registers(unit, address, count)
    }

    fn write_register(
        &mut self,
        unit: UnitId,
        address: u16,
        value: u16,
    ) -> Result<(), TransportError> {
        (**self).write_register(unit, address, value)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_input_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_input_registers(unit, address, count)
    }

    fn read_holding_registers(
        &mut self,
        unit: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_holding_registers(unit, address, count)
    }

    fn write_register(
        &mut self,
        unit: UnitId,
        address: u16,
        value: u16,
    ) -> Result<(), TransportError> {
        (**self).write_register(unit, address, value)
    }
}

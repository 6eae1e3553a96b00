//! A library for reading and controlling Stiebel Eltron heat pumps through
//! the ISG (Internet Service Gateway) Modbus interface.
//!
//! The ISG exposes the heat pump as plain 16-bit registers. This crate turns
//! them into named, typed values:
//!
//! 1.  **Register catalogs** ([`catalog`]): the named register layout of the
//!     legacy controllers and the WPM3(i), grouped into blocks that are read
//!     with one request each.
//! 2.  **Controller client** ([`client::StiebelEltron`]): reads all blocks in
//!     one update, caches the raw words and offers named accessors, status
//!     flags and the writes for target temperature and operating mode.
//!     [`safe_client::SafeClient`] shares a client between threads.
//! 3.  **Encodings and code tables** ([`protocol`], [`codes`]): the register
//!     data types 2, 6, 7 and 8 and the symbolic names of mode and status
//!     registers.
//!
//! The client is generic over [`transport::Transport`]. With the
//! `tokio-rtu-sync` or `tokio-tcp-sync` features a synchronous `tokio-modbus`
//! context is a transport, see [`tokio_sync`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use stiebel_eltron_lib::{catalog::Variant, client::StiebelEltron, protocol::UnitId};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = tokio_modbus::client::sync::tcp::connect("192.168.1.20:502".parse()?)?;
//!     let mut heat_pump = StiebelEltron::new(ctx, UnitId::default(), false, Variant::Wpm3i);
//!
//!     heat_pump.try_update()?;
//!     println!("Outside temperature: {:?} °C", heat_pump.outside_temperature());
//!     println!("Operating mode: {:?}", heat_pump.operation_mode());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod client;
pub mod codes;
pub mod error;
pub mod protocol;
pub mod transport;

#[cfg_attr(docsrs, doc(cfg(feature = "safe-client-sync")))]
#[cfg(feature = "safe-client-sync")]
pub mod safe_client;

#[cfg_attr(
    docsrs,
    doc(cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync")))
)]
#[cfg(any(feature = "tokio-rtu-sync", feature = "tokio-tcp-sync"))]
pub mod tokio_sync;

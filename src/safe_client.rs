//! Thread-safe wrapper around the controller client.
//!
//! [`SafeClient`] shares one [`StiebelEltron`] behind an `Arc<Mutex<_>>`, so a
//! poller thread and a control thread can use the same connection. Every
//! method holds the lock for the whole call; a `snapshot` closure reads
//! several values of the same update without another thread refreshing the
//! cache in between.
//!
//! ## Example
//!
//! ```no_run
//! use stiebel_eltron_lib::{
//!     catalog::Variant, client::StiebelEltron, protocol::UnitId, safe_client::SafeClient,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = tokio_modbus::client::sync::tcp::connect("192.168.1.20:502".parse()?)?;
//!     let client = SafeClient::new(StiebelEltron::new(ctx, UnitId::default(), false, Variant::Wpm3i));
//!
//!     let mut poller = client.clone();
//!     std::thread::spawn(move || poller.update());
//!
//!     let (outside, mode) = client.snapshot(|heat_pump| {
//!         (heat_pump.outside_temperature(), heat_pump.operation_mode())
//!     });
//!     println!("{outside:?} °C, {mode:?}");
//!     Ok(())
//! }
//! ```

use crate::client::StiebelEltron;
use crate::error::Result;
use crate::protocol::Value;
use crate::transport::{Transport, TransportError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, thread-safe handle to a [`StiebelEltron`] client.
#[derive(Debug)]
pub struct SafeClient<T> {
    client: Arc<Mutex<StiebelEltron<T>>>,
}

impl<T> Clone for SafeClient<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<T: Transport> SafeClient<T> {
    pub fn new(client: StiebelEltron<T>) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
        }
    }

    /// Creates a new `SafeClient` from an already shared client.
    pub fn from_shared(client: Arc<Mutex<StiebelEltron<T>>>) -> Self {
        Self { client }
    }

    /// Clones the shared client.
    pub fn clone_shared(&self) -> Arc<Mutex<StiebelEltron<T>>> {
        self.client.clone()
    }

    // A panicking reader leaves the cache consistent, the poison flag is ignored.
    fn lock(&self) -> MutexGuard<'_, StiebelEltron<T>> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the client.
    pub fn snapshot<R>(&self, f: impl FnOnce(&mut StiebelEltron<T>) -> R) -> R {
        f(&mut self.lock())
    }

    /// See [`StiebelEltron::update`].
    pub fn update(&mut self) -> bool {
        self.lock().update()
    }

    /// See [`StiebelEltron::try_update`].
    pub fn try_update(&mut self) -> std::result::Result<(), TransportError> {
        self.lock().try_update()
    }

    pub fn resolve_and_decode(&self, name: &str) -> Option<Value> {
        self.lock().resolve_and_decode(name)
    }

    pub fn read(&mut self, name: &str) -> Option<Value> {
        self.lock().read(name)
    }

    pub fn set_target_temperature(&mut self, celsius: f64) -> Result<()> {
        self.lock().set_target_temperature(celsius)
    }

    pub fn set_operation_mode(&mut self, mode: &str) -> Result<()> {
        self.lock().set_operation_mode(mode)
    }

    pub fn write_field(&mut self, name: &str, value: f64) -> Result<()> {
        self.lock().write_field(name, value)
    }
}

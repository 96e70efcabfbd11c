//! Connection
//!
//! A [`Connection`] owns at most one native connection handle.
//!
//! ```text
//!                connect (ok)
//! Disconnected ───────────────▶ Connected
//!      ▲                           │
//!      │ disconnect                │ is_valid reports stale
//!      │                           ▼
//!      └──────────────────────── Failed
//! ```
//!
//! A failed `connect` leaves the connection `Disconnected`. `disconnect`
//! always gives up the handle, even when the native close fails. Dropping
//! a connection disconnects it and only logs a failure.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::attributes::Attributes;
use crate::config::ConnectionParameters;
use crate::error::{SapError, SapResult};
use crate::ffi::{ConnectionHandle, NativeRfc, RfcInterop};
use crate::function::Function;
use crate::metadata::{self, DescriptorCache, FunctionDescriptor};
use crate::value::Structure;

/// Lifecycle state of a [`Connection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handle
    Disconnected,
    /// Handle owned and presumed valid
    Connected,
    /// Handle still owned but reported invalid; disconnect to release it
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection to an SAP system.
///
/// `Send` but not `Sync`: one native session serves one call at a time.
/// Use one connection per thread for parallel calls.
pub struct Connection {
    interop: Arc<dyn RfcInterop>,
    parameters: ConnectionParameters,
    handle: Option<ConnectionHandle>,
    state: Cell<ConnectionState>,
    descriptors: DescriptorCache,
}

impl Connection {
    /// A disconnected connection over `interop`
    pub fn new(interop: Arc<dyn RfcInterop>, parameters: ConnectionParameters) -> Self {
        Self {
            interop,
            parameters,
            handle: None,
            state: Cell::new(ConnectionState::Disconnected),
            descriptors: DescriptorCache::default(),
        }
    }

    /// A disconnected connection over the process-wide SDK library
    pub fn native(parameters: ConnectionParameters) -> SapResult<Self> {
        let interop: Arc<dyn RfcInterop> = NativeRfc::shared()?;
        Ok(Self::new(interop, parameters))
    }

    /// Create and connect in one step
    pub fn open(interop: Arc<dyn RfcInterop>, parameters: ConnectionParameters) -> SapResult<Self> {
        let mut connection = Self::new(interop, parameters);
        connection.connect()?;
        Ok(connection)
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Open the native connection.
    ///
    /// Only legal while `Disconnected`; a failed connection must be
    /// disconnected first.
    pub fn connect(&mut self) -> SapResult<()> {
        let state = self.state.get();
        if state != ConnectionState::Disconnected {
            return Err(SapError::InvalidState {
                operation: "connect",
                state: state.as_str(),
            });
        }

        debug!(parameters = ?self.parameters, "opening connection");
        let handle = self.interop.open_connection(&self.parameters.to_native())?;
        self.handle = Some(handle);
        self.state.set(ConnectionState::Connected);
        debug!("connection open");
        Ok(())
    }

    /// Close the native connection; a no-op when there is none.
    ///
    /// The handle is released even if the close fails.
    pub fn disconnect(&mut self) -> SapResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.state.set(ConnectionState::Disconnected);
        debug!("closing connection");
        self.interop.close_connection(handle)?;
        Ok(())
    }

    /// Whether the native handle is still usable.
    ///
    /// False without a handle, when the library reports the handle stale,
    /// or when the check itself fails. A connected connection that fails
    /// the check moves to `Failed`.
    pub fn is_valid(&self) -> bool {
        let Some(handle) = self.handle else {
            return false;
        };
        let valid = matches!(self.interop.is_connection_handle_valid(handle), Ok(true));
        if !valid && self.state.get() == ConnectionState::Connected {
            debug!("connection handle reported invalid");
            self.state.set(ConnectionState::Failed);
        }
        valid
    }

    /// Round trip to the server. Never fails: any error is `false`.
    pub fn ping(&self) -> bool {
        match self.handle {
            Some(handle) => self.interop.ping(handle).is_ok(),
            None => false,
        }
    }

    /// Snapshot of the connection's attributes
    pub fn get_attributes(&self) -> SapResult<Attributes> {
        let raw = self.interop.get_connection_attributes(self.handle)?;
        Ok(Attributes::from(raw))
    }

    /// Descriptor for `name`, looked up once and cached
    ///
    /// Function module names are upper case on the server, so `name` is
    /// upper-cased before both the cache lookup and the native lookup.
    pub fn describe(&self, name: &str) -> SapResult<Arc<FunctionDescriptor>> {
        let name = name.trim().to_ascii_uppercase();
        if let Some(cached) = self.descriptors.get(&name) {
            return Ok(cached);
        }
        let handle = self.handle()?;
        let descriptor = metadata::discover(self.interop.as_ref(), handle, &name)?;
        debug!(
            function = %descriptor.name,
            parameters = descriptor.parameters.len(),
            cached = self.descriptors.len() + 1,
            "function described"
        );
        Ok(self.descriptors.insert(descriptor))
    }

    /// Prepare a call of `name`
    pub fn create_function(&self, name: &str) -> SapResult<Function<'_>> {
        self.handle()?;
        let descriptor = self.describe(name)?;
        let function = self.interop.create_function(descriptor.handle())?;
        Ok(Function::new(self, descriptor, function))
    }

    /// Shorthand for `create_function(name)?.invoke(inputs)`
    pub fn call(&self, name: &str, inputs: &Structure) -> SapResult<Structure> {
        self.create_function(name)?.invoke(inputs)
    }

    pub(crate) fn handle(&self) -> SapResult<ConnectionHandle> {
        self.handle.ok_or(SapError::NotConnected)
    }

    pub(crate) fn interop(&self) -> &dyn RfcInterop {
        self.interop.as_ref()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("parameters", &self.parameters)
            .field("state", &self.state.get())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!(error = %e, "failed to close connection during drop");
        }
    }
}

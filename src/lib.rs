//! sapnwrfc - Safe bindings for the SAP NetWeaver RFC SDK
//!
//! Connects to SAP systems through the NW RFC SDK shared library, discovers
//! function module metadata at runtime and marshals typed values in and out
//! of remote function calls.
//!
//! # Features
//!
//! - **Owned handles**: a [`Connection`] owns its native handle and closes it on drop
//! - **Scoped calls**: a [`Function`] borrows its connection and destroys its call object when done
//! - **Checked marshaling**: inputs are validated against the remote schema before any native write
//! - **Exact decimals**: BCD and DECFLOAT fields use arbitrary-precision `dashu` decimals, never `f64`
//! - **Structured errors**: every native failure keeps its `RFC_RC` code and error record
//! - **Testable**: all native calls go through the [`RfcInterop`](ffi::RfcInterop) trait
//!
//! # Example
//!
//! ```no_run
//! use sapnwrfc::{Connection, ConnectionParameters, Structure, Value};
//!
//! let parameters = ConnectionParameters::new()
//!     .app_server_host("my-server.com")
//!     .system_number("00")
//!     .client("100")
//!     .user("RFC_USER")
//!     .password("secret")
//!     .language("EN");
//!
//! let mut connection = Connection::native(parameters)?;
//! connection.connect()?;
//!
//! let result = connection.call(
//!     "STFC_CONNECTION",
//!     &Structure::new().with("REQUTEXT", "Hello SAP"),
//! )?;
//! assert_eq!(result.get("ECHOTEXT").and_then(Value::as_str), Some("Hello SAP"));
//! # Ok::<(), sapnwrfc::SapError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Connection    │  Owns the handle, caches descriptors
//! └────────┬────────┘
//!          │ create_function
//!          ▼
//! ┌─────────────────┐
//! │    Function     │  check ─▶ write ─▶ invoke ─▶ read
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   RfcInterop    │  NativeRfc (SDK) or FakeRfc (tests)
//! └─────────────────┘
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod attributes;
pub mod config;
pub mod connection;
pub mod decimal;
pub mod error;
pub mod ffi;
pub mod function;
pub mod marshal;
pub mod metadata;
pub mod value;

pub use attributes::Attributes;
pub use config::{ConfigError, ConnectionParameters, RfcConfig};
pub use connection::{Connection, ConnectionState};
pub use error::{translate, ErrorGroup, ErrorInfo, ResultCode, SapError, SapResult};
pub use function::Function;
pub use metadata::{
    Direction, FieldDescriptor, FunctionDescriptor, IntWidth, ParameterDescriptor,
    TypeDescriptor, ValueKind,
};
pub use value::{Structure, Table, Value};

// Re-export the date and decimal types used in `Value`
pub use chrono::{NaiveDate, NaiveTime};
pub use dashu::Decimal;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

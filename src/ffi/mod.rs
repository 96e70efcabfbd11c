//! FFI Module
//!
//! The native call surface: every SAP NetWeaver RFC SDK entry point the rest
//! of the crate depends on, behind the [`RfcInterop`] trait.
//!
//! # Architecture
//!
//! ```text
//! Connection / Function
//!       │
//!       ▼
//! RfcInterop (trait)
//!       │
//!   ┌───┴─────────┐
//!   ▼             ▼
//! NativeRfc     FakeRfc
//! (libloading)  (in-memory, tests)
//!   │
//!   ▼
//! sapnwrfc shared library
//! ```
//!
//! Every call is synchronous and returns an [`RfcResult`], bundling the
//! value with the native error record so a failure cannot go unnoticed.
//! Handles are opaque, non-null and `Copy`; ownership is tracked by the
//! types that hold them ([`Connection`](crate::Connection),
//! [`Function`](crate::Function)), never here.

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
mod loader;
mod native;
mod types;

pub use loader::{library_filename, remediation_message, LibraryLoader, SDK_HOME_VAR};
pub use native::NativeRfc;
pub use types::{
    from_sap_uc, sap_uc_len, to_fixed, to_sap_uc, to_sap_uc_cstr, RfcAttributes, RfcDate,
    RfcDirection, RfcFieldDesc, RfcParameterDesc, RfcTime, RfcType, SapUc,
};

use std::num::NonZeroUsize;

use crate::error::ErrorInfo;

/// Outcome of a native call: the value, or the error record the SDK filled in
pub type RfcResult<T> = Result<T, ErrorInfo>;

macro_rules! native_handle {
    ($($(#[$meta:meta])* $name:ident,)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(NonZeroUsize);

            impl $name {
                /// Wrap a raw native address; `None` for a null handle
                pub fn from_raw(raw: usize) -> Option<Self> {
                    NonZeroUsize::new(raw).map(Self)
                }

                pub fn as_raw(self) -> usize {
                    self.0.get()
                }
            }
        )+
    };
}

native_handle! {
    /// `RFC_CONNECTION_HANDLE`
    ConnectionHandle,
    /// `RFC_FUNCTION_DESC_HANDLE`, owned by the SDK's metadata cache
    FunctionDescHandle,
    /// `RFC_TYPE_DESC_HANDLE`, owned by the SDK's metadata cache
    TypeDescHandle,
    /// `RFC_FUNCTION_HANDLE`
    FunctionHandle,
    /// `DATA_CONTAINER_HANDLE`: a function call object or a structure
    DataHandle,
    /// `RFC_TABLE_HANDLE`
    TableHandle,
}

impl From<FunctionHandle> for DataHandle {
    fn from(handle: FunctionHandle) -> Self {
        DataHandle(handle.0)
    }
}

/// The RFC SDK entry points used by this crate.
///
/// Implemented by [`NativeRfc`] for the real library and by test doubles.
/// Field names are passed as Rust strings; field values cross as SAP_UC
/// units, bytes or fixed-width numbers, exactly as the SDK stores them.
#[cfg_attr(test, mockall::automock)]
pub trait RfcInterop: Send + Sync {
    // Connections
    fn open_connection(&self, parameters: &[(String, String)]) -> RfcResult<ConnectionHandle>;
    fn close_connection(&self, connection: ConnectionHandle) -> RfcResult<()>;
    fn is_connection_handle_valid(&self, connection: ConnectionHandle) -> RfcResult<bool>;
    fn ping(&self, connection: ConnectionHandle) -> RfcResult<()>;
    fn get_connection_attributes(
        &self,
        connection: Option<ConnectionHandle>,
    ) -> RfcResult<RfcAttributes>;

    // Metadata
    fn get_function_desc(
        &self,
        connection: ConnectionHandle,
        name: &str,
    ) -> RfcResult<FunctionDescHandle>;
    fn get_parameter_count(&self, desc: FunctionDescHandle) -> RfcResult<u32>;
    fn get_parameter_desc_by_index(
        &self,
        desc: FunctionDescHandle,
        index: u32,
    ) -> RfcResult<RfcParameterDesc>;
    fn get_field_count(&self, type_desc: TypeDescHandle) -> RfcResult<u32>;
    fn get_field_desc_by_index(
        &self,
        type_desc: TypeDescHandle,
        index: u32,
    ) -> RfcResult<RfcFieldDesc>;

    // Call objects
    fn create_function(&self, desc: FunctionDescHandle) -> RfcResult<FunctionHandle>;
    fn destroy_function(&self, function: FunctionHandle) -> RfcResult<()>;
    fn invoke(&self, connection: ConnectionHandle, function: FunctionHandle) -> RfcResult<()>;

    // Scalar fields
    fn set_int(&self, container: DataHandle, name: &str, value: i32) -> RfcResult<()>;
    fn get_int(&self, container: DataHandle, name: &str) -> RfcResult<i32>;
    fn set_int8(&self, container: DataHandle, name: &str, value: i64) -> RfcResult<()>;
    fn get_int8(&self, container: DataHandle, name: &str) -> RfcResult<i64>;
    fn set_float(&self, container: DataHandle, name: &str, value: f64) -> RfcResult<()>;
    fn get_float(&self, container: DataHandle, name: &str) -> RfcResult<f64>;
    fn set_string(&self, container: DataHandle, name: &str, value: &[SapUc]) -> RfcResult<()>;
    fn get_string(&self, container: DataHandle, name: &str) -> RfcResult<Vec<SapUc>>;
    fn set_bytes(&self, container: DataHandle, name: &str, value: &[u8]) -> RfcResult<()>;
    fn get_bytes(&self, container: DataHandle, name: &str, length: usize) -> RfcResult<Vec<u8>>;
    fn set_xstring(&self, container: DataHandle, name: &str, value: &[u8]) -> RfcResult<()>;
    fn get_xstring(&self, container: DataHandle, name: &str) -> RfcResult<Vec<u8>>;
    fn set_date(&self, container: DataHandle, name: &str, value: &RfcDate) -> RfcResult<()>;
    fn get_date(&self, container: DataHandle, name: &str) -> RfcResult<RfcDate>;
    fn set_time(&self, container: DataHandle, name: &str, value: &RfcTime) -> RfcResult<()>;
    fn get_time(&self, container: DataHandle, name: &str) -> RfcResult<RfcTime>;

    // Structures and tables
    fn get_structure(&self, container: DataHandle, name: &str) -> RfcResult<DataHandle>;
    fn get_table(&self, container: DataHandle, name: &str) -> RfcResult<TableHandle>;
    fn append_new_row(&self, table: TableHandle) -> RfcResult<DataHandle>;
    fn get_row_count(&self, table: TableHandle) -> RfcResult<u32>;
    fn move_to(&self, table: TableHandle, index: u32) -> RfcResult<()>;
    fn get_current_row(&self, table: TableHandle) -> RfcResult<DataHandle>;
}

#[cfg(test)]
mod tests;

//! Native RFC Library
//!
//! [`RfcInterop`] over the real SDK, resolved at runtime with libloading.

use std::os::raw::{c_int, c_uint, c_void};
use std::sync::Arc;

use libloading::Library;
use once_cell::sync::OnceCell;

use super::loader::{remediation_message, LibraryLoader};
use super::types::{
    to_sap_uc_cstr, RfcAttributesRaw, RfcConnectionParameterRaw, RfcErrorInfoRaw,
    RfcFieldDescRaw, RfcParameterDescRaw, Zeroed,
};
use super::{
    from_sap_uc, ConnectionHandle, DataHandle, FunctionDescHandle, FunctionHandle, RfcAttributes,
    RfcDate, RfcDirection, RfcFieldDesc, RfcInterop, RfcParameterDesc, RfcResult, RfcTime,
    RfcType, SapUc, TableHandle, TypeDescHandle,
};
use crate::error::{ErrorInfo, ResultCode, SapError};

type Rc = c_int;
type Handle = *mut c_void;
type ErrorOut = *mut RfcErrorInfoRaw;
type Name = *const SapUc;

macro_rules! rfc_api {
    ($($field:ident = $symbol:literal: fn($($arg:ty),*) -> $ret:ty;)+) => {
        /// Entry points resolved from the SDK
        struct RfcApi {
            $($field: unsafe extern "C" fn($($arg),*) -> $ret,)+
        }

        impl RfcApi {
            /// # Safety
            ///
            /// The declared signatures must match the SDK's exports.
            unsafe fn resolve(library: &Library) -> Result<Self, libloading::Error> {
                Ok(Self {
                    $($field: *library.get::<unsafe extern "C" fn($($arg),*) -> $ret>(
                        concat!($symbol, "\0").as_bytes(),
                    )?,)+
                })
            }
        }
    };
}

rfc_api! {
    open_connection = "RfcOpenConnection": fn(*const RfcConnectionParameterRaw, c_uint, ErrorOut) -> Handle;
    close_connection = "RfcCloseConnection": fn(Handle, ErrorOut) -> Rc;
    is_connection_handle_valid = "RfcIsConnectionHandleValid": fn(Handle, *mut c_int, ErrorOut) -> Rc;
    ping = "RfcPing": fn(Handle, ErrorOut) -> Rc;
    get_connection_attributes = "RfcGetConnectionAttributes": fn(Handle, *mut RfcAttributesRaw, ErrorOut) -> Rc;
    get_function_desc = "RfcGetFunctionDesc": fn(Handle, Name, ErrorOut) -> Handle;
    get_parameter_count = "RfcGetParameterCount": fn(Handle, *mut c_uint, ErrorOut) -> Rc;
    get_parameter_desc_by_index = "RfcGetParameterDescByIndex": fn(Handle, c_uint, *mut RfcParameterDescRaw, ErrorOut) -> Rc;
    get_field_count = "RfcGetFieldCount": fn(Handle, *mut c_uint, ErrorOut) -> Rc;
    get_field_desc_by_index = "RfcGetFieldDescByIndex": fn(Handle, c_uint, *mut RfcFieldDescRaw, ErrorOut) -> Rc;
    create_function = "RfcCreateFunction": fn(Handle, ErrorOut) -> Handle;
    destroy_function = "RfcDestroyFunction": fn(Handle, ErrorOut) -> Rc;
    invoke = "RfcInvoke": fn(Handle, Handle, ErrorOut) -> Rc;
    set_int = "RfcSetInt": fn(Handle, Name, c_int, ErrorOut) -> Rc;
    get_int = "RfcGetInt": fn(Handle, Name, *mut c_int, ErrorOut) -> Rc;
    set_int8 = "RfcSetInt8": fn(Handle, Name, i64, ErrorOut) -> Rc;
    get_int8 = "RfcGetInt8": fn(Handle, Name, *mut i64, ErrorOut) -> Rc;
    set_float = "RfcSetFloat": fn(Handle, Name, f64, ErrorOut) -> Rc;
    get_float = "RfcGetFloat": fn(Handle, Name, *mut f64, ErrorOut) -> Rc;
    set_string = "RfcSetString": fn(Handle, Name, *const SapUc, c_uint, ErrorOut) -> Rc;
    get_string_length = "RfcGetStringLength": fn(Handle, Name, *mut c_uint, ErrorOut) -> Rc;
    get_string = "RfcGetString": fn(Handle, Name, *mut SapUc, c_uint, *mut c_uint, ErrorOut) -> Rc;
    set_bytes = "RfcSetBytes": fn(Handle, Name, *const u8, c_uint, ErrorOut) -> Rc;
    get_bytes = "RfcGetBytes": fn(Handle, Name, *mut u8, c_uint, ErrorOut) -> Rc;
    set_xstring = "RfcSetXString": fn(Handle, Name, *const u8, c_uint, ErrorOut) -> Rc;
    get_xstring = "RfcGetXString": fn(Handle, Name, *mut u8, c_uint, *mut c_uint, ErrorOut) -> Rc;
    set_date = "RfcSetDate": fn(Handle, Name, *const SapUc, ErrorOut) -> Rc;
    get_date = "RfcGetDate": fn(Handle, Name, *mut SapUc, ErrorOut) -> Rc;
    set_time = "RfcSetTime": fn(Handle, Name, *const SapUc, ErrorOut) -> Rc;
    get_time = "RfcGetTime": fn(Handle, Name, *mut SapUc, ErrorOut) -> Rc;
    get_structure = "RfcGetStructure": fn(Handle, Name, *mut Handle, ErrorOut) -> Rc;
    get_table = "RfcGetTable": fn(Handle, Name, *mut Handle, ErrorOut) -> Rc;
    append_new_row = "RfcAppendNewRow": fn(Handle, ErrorOut) -> Handle;
    get_row_count = "RfcGetRowCount": fn(Handle, *mut c_uint, ErrorOut) -> Rc;
    move_to = "RfcMoveTo": fn(Handle, c_uint, ErrorOut) -> Rc;
    get_current_row = "RfcGetCurrentRow": fn(Handle, ErrorOut) -> Handle;
}

/// The SAP NW RFC SDK, loaded from disk.
pub struct NativeRfc {
    api: RfcApi,
    /// Keeps the resolved entry points mapped
    _library: Library,
}

static SHARED: OnceCell<Arc<NativeRfc>> = OnceCell::new();

impl NativeRfc {
    /// Load the SDK through `loader` and resolve every entry point
    pub fn load(loader: &LibraryLoader) -> Result<Self, SapError> {
        let library = loader.load()?;
        // Safety: signatures follow sapnwrfc.h of the 7.50 SDK
        let api = unsafe { RfcApi::resolve(&library) }.map_err(|source| {
            SapError::LibraryNotFound {
                message: remediation_message(),
                source,
            }
        })?;
        Ok(Self {
            api,
            _library: library,
        })
    }

    /// Process-wide instance, loaded with the default search paths on first use
    pub fn shared() -> Result<Arc<NativeRfc>, SapError> {
        SHARED
            .get_or_try_init(|| NativeRfc::load(&LibraryLoader::new()).map(Arc::new))
            .cloned()
    }
}

fn raw<H: Into<usize>>(handle: H) -> Handle {
    handle.into() as Handle
}

macro_rules! impl_into_usize {
    ($($name:ident),+) => {
        $(impl From<$name> for usize {
            fn from(handle: $name) -> usize {
                handle.as_raw()
            }
        })+
    };
}

impl_into_usize!(
    ConnectionHandle,
    FunctionDescHandle,
    TypeDescHandle,
    FunctionHandle,
    DataHandle,
    TableHandle
);

/// Run one native call with a fresh error record and check its result code
fn call(f: impl FnOnce(ErrorOut) -> Rc) -> RfcResult<()> {
    let mut error = RfcErrorInfoRaw::zeroed();
    let rc = f(&mut error as ErrorOut);
    if rc == 0 {
        return Ok(());
    }
    let mut info = error.to_error_info();
    info.code = ResultCode::from_raw(rc);
    Err(info)
}

/// Run one native call that returns a handle; null or a failed record is an error
fn call_handle<H>(
    make: fn(usize) -> Option<H>,
    f: impl FnOnce(ErrorOut) -> Handle,
) -> RfcResult<H> {
    let mut error = RfcErrorInfoRaw::zeroed();
    let handle = f(&mut error as ErrorOut);
    if error.code != 0 {
        return Err(error.to_error_info());
    }
    make(handle as usize)
        .ok_or_else(|| ErrorInfo::new(ResultCode::InvalidHandle, "SDK returned a null handle"))
}

fn parameter_desc(raw: &RfcParameterDescRaw) -> RfcResult<RfcParameterDesc> {
    let direction = RfcDirection::from_raw(raw.direction).ok_or_else(|| {
        ErrorInfo::new(
            ResultCode::InvalidParameter,
            format!("unknown parameter direction {}", raw.direction),
        )
    })?;
    Ok(RfcParameterDesc {
        name: from_sap_uc(&raw.name),
        rfc_type: RfcType::from_raw(raw.rfc_type),
        direction,
        nuc_length: raw.nuc_length,
        uc_length: raw.uc_length,
        decimals: raw.decimals,
        type_desc: TypeDescHandle::from_raw(raw.type_desc_handle as usize),
        default_value: from_sap_uc(&raw.default_value),
        description: from_sap_uc(&raw.parameter_text),
        optional: raw.optional != 0,
    })
}

fn field_desc(raw: &RfcFieldDescRaw) -> RfcFieldDesc {
    RfcFieldDesc {
        name: from_sap_uc(&raw.name),
        rfc_type: RfcType::from_raw(raw.rfc_type),
        nuc_length: raw.nuc_length,
        nuc_offset: raw.nuc_offset,
        uc_length: raw.uc_length,
        uc_offset: raw.uc_offset,
        decimals: raw.decimals,
        type_desc: TypeDescHandle::from_raw(raw.type_desc_handle as usize),
    }
}

/// Buffer length as the SDK's `unsigned` size; longer buffers are refused
pub(super) fn buffer_len(n: usize) -> RfcResult<c_uint> {
    c_uint::try_from(n).map_err(|_| {
        ErrorInfo::new(
            ResultCode::InvalidParameter,
            format!("buffer of {} units exceeds the SDK length limit", n),
        )
    })
}

// Safety (all methods below): handles originate from this SDK instance and
// every buffer passed outlives the call it is passed to.
impl RfcInterop for NativeRfc {
    fn open_connection(&self, parameters: &[(String, String)]) -> RfcResult<ConnectionHandle> {
        let encoded: Vec<(Vec<SapUc>, Vec<SapUc>)> = parameters
            .iter()
            .map(|(name, value)| (to_sap_uc_cstr(name), to_sap_uc_cstr(value)))
            .collect();
        let raw_params: Vec<RfcConnectionParameterRaw> = encoded
            .iter()
            .map(|(name, value)| RfcConnectionParameterRaw {
                name: name.as_ptr(),
                value: value.as_ptr(),
            })
            .collect();
        let count = buffer_len(raw_params.len())?;
        call_handle(ConnectionHandle::from_raw, |err| unsafe {
            (self.api.open_connection)(raw_params.as_ptr(), count, err)
        })
    }

    fn close_connection(&self, connection: ConnectionHandle) -> RfcResult<()> {
        call(|err| unsafe { (self.api.close_connection)(raw(connection), err) })
    }

    fn is_connection_handle_valid(&self, connection: ConnectionHandle) -> RfcResult<bool> {
        let mut valid: c_int = 0;
        call(|err| unsafe {
            (self.api.is_connection_handle_valid)(raw(connection), &mut valid, err)
        })?;
        Ok(valid != 0)
    }

    fn ping(&self, connection: ConnectionHandle) -> RfcResult<()> {
        call(|err| unsafe { (self.api.ping)(raw(connection), err) })
    }

    fn get_connection_attributes(
        &self,
        connection: Option<ConnectionHandle>,
    ) -> RfcResult<RfcAttributes> {
        let mut attributes = RfcAttributesRaw::zeroed();
        let handle = connection.map(raw).unwrap_or(std::ptr::null_mut());
        call(|err| unsafe { (self.api.get_connection_attributes)(handle, &mut attributes, err) })?;
        Ok(attributes.to_attributes())
    }

    fn get_function_desc(
        &self,
        connection: ConnectionHandle,
        name: &str,
    ) -> RfcResult<FunctionDescHandle> {
        let name = to_sap_uc_cstr(name);
        call_handle(FunctionDescHandle::from_raw, |err| unsafe {
            (self.api.get_function_desc)(raw(connection), name.as_ptr(), err)
        })
    }

    fn get_parameter_count(&self, desc: FunctionDescHandle) -> RfcResult<u32> {
        let mut count: c_uint = 0;
        call(|err| unsafe { (self.api.get_parameter_count)(raw(desc), &mut count, err) })?;
        Ok(count)
    }

    fn get_parameter_desc_by_index(
        &self,
        desc: FunctionDescHandle,
        index: u32,
    ) -> RfcResult<RfcParameterDesc> {
        let mut out = RfcParameterDescRaw::zeroed();
        call(|err| unsafe { (self.api.get_parameter_desc_by_index)(raw(desc), index, &mut out, err) })?;
        parameter_desc(&out)
    }

    fn get_field_count(&self, type_desc: TypeDescHandle) -> RfcResult<u32> {
        let mut count: c_uint = 0;
        call(|err| unsafe { (self.api.get_field_count)(raw(type_desc), &mut count, err) })?;
        Ok(count)
    }

    fn get_field_desc_by_index(
        &self,
        type_desc: TypeDescHandle,
        index: u32,
    ) -> RfcResult<RfcFieldDesc> {
        let mut out = RfcFieldDescRaw::zeroed();
        call(|err| unsafe {
            (self.api.get_field_desc_by_index)(raw(type_desc), index, &mut out, err)
        })?;
        Ok(field_desc(&out))
    }

    fn create_function(&self, desc: FunctionDescHandle) -> RfcResult<FunctionHandle> {
        call_handle(FunctionHandle::from_raw, |err| unsafe {
            (self.api.create_function)(raw(desc), err)
        })
    }

    fn destroy_function(&self, function: FunctionHandle) -> RfcResult<()> {
        call(|err| unsafe { (self.api.destroy_function)(raw(function), err) })
    }

    fn invoke(&self, connection: ConnectionHandle, function: FunctionHandle) -> RfcResult<()> {
        call(|err| unsafe { (self.api.invoke)(raw(connection), raw(function), err) })
    }

    fn set_int(&self, container: DataHandle, name: &str, value: i32) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        call(|err| unsafe { (self.api.set_int)(raw(container), name.as_ptr(), value, err) })
    }

    fn get_int(&self, container: DataHandle, name: &str) -> RfcResult<i32> {
        let name = to_sap_uc_cstr(name);
        let mut value: c_int = 0;
        call(|err| unsafe { (self.api.get_int)(raw(container), name.as_ptr(), &mut value, err) })?;
        Ok(value)
    }

    fn set_int8(&self, container: DataHandle, name: &str, value: i64) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        call(|err| unsafe { (self.api.set_int8)(raw(container), name.as_ptr(), value, err) })
    }

    fn get_int8(&self, container: DataHandle, name: &str) -> RfcResult<i64> {
        let name = to_sap_uc_cstr(name);
        let mut value: i64 = 0;
        call(|err| unsafe { (self.api.get_int8)(raw(container), name.as_ptr(), &mut value, err) })?;
        Ok(value)
    }

    fn set_float(&self, container: DataHandle, name: &str, value: f64) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        call(|err| unsafe { (self.api.set_float)(raw(container), name.as_ptr(), value, err) })
    }

    fn get_float(&self, container: DataHandle, name: &str) -> RfcResult<f64> {
        let name = to_sap_uc_cstr(name);
        let mut value: f64 = 0.0;
        call(|err| unsafe { (self.api.get_float)(raw(container), name.as_ptr(), &mut value, err) })?;
        Ok(value)
    }

    fn set_string(&self, container: DataHandle, name: &str, value: &[SapUc]) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        let size = buffer_len(value.len())?;
        call(|err| unsafe {
            (self.api.set_string)(
                raw(container),
                name.as_ptr(),
                value.as_ptr(),
                size,
                err,
            )
        })
    }

    fn get_string(&self, container: DataHandle, name: &str) -> RfcResult<Vec<SapUc>> {
        let name = to_sap_uc_cstr(name);
        let mut length: c_uint = 0;
        call(|err| unsafe {
            (self.api.get_string_length)(raw(container), name.as_ptr(), &mut length, err)
        })?;

        // One extra unit for the terminator the SDK writes
        let mut buffer: Vec<SapUc> = vec![0; length as usize + 1];
        let mut written: c_uint = 0;
        let capacity = buffer_len(buffer.len())?;
        call(|err| unsafe {
            (self.api.get_string)(
                raw(container),
                name.as_ptr(),
                buffer.as_mut_ptr(),
                capacity,
                &mut written,
                err,
            )
        })?;
        buffer.truncate(written as usize);
        Ok(buffer)
    }

    fn set_bytes(&self, container: DataHandle, name: &str, value: &[u8]) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        let size = buffer_len(value.len())?;
        call(|err| unsafe {
            (self.api.set_bytes)(
                raw(container),
                name.as_ptr(),
                value.as_ptr(),
                size,
                err,
            )
        })
    }

    fn get_bytes(&self, container: DataHandle, name: &str, length: usize) -> RfcResult<Vec<u8>> {
        let name = to_sap_uc_cstr(name);
        let mut buffer = vec![0u8; length];
        let capacity = buffer_len(buffer.len())?;
        call(|err| unsafe {
            (self.api.get_bytes)(
                raw(container),
                name.as_ptr(),
                buffer.as_mut_ptr(),
                capacity,
                err,
            )
        })?;
        Ok(buffer)
    }

    fn set_xstring(&self, container: DataHandle, name: &str, value: &[u8]) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        let size = buffer_len(value.len())?;
        call(|err| unsafe {
            (self.api.set_xstring)(
                raw(container),
                name.as_ptr(),
                value.as_ptr(),
                size,
                err,
            )
        })
    }

    fn get_xstring(&self, container: DataHandle, name: &str) -> RfcResult<Vec<u8>> {
        let name = to_sap_uc_cstr(name);
        let mut length: c_uint = 0;
        call(|err| unsafe {
            (self.api.get_string_length)(raw(container), name.as_ptr(), &mut length, err)
        })?;

        let mut buffer = vec![0u8; length as usize];
        let mut written: c_uint = 0;
        let capacity = buffer_len(buffer.len())?;
        call(|err| unsafe {
            (self.api.get_xstring)(
                raw(container),
                name.as_ptr(),
                buffer.as_mut_ptr(),
                capacity,
                &mut written,
                err,
            )
        })?;
        buffer.truncate(written as usize);
        Ok(buffer)
    }

    fn set_date(&self, container: DataHandle, name: &str, value: &RfcDate) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        call(|err| unsafe { (self.api.set_date)(raw(container), name.as_ptr(), value.as_ptr(), err) })
    }

    fn get_date(&self, container: DataHandle, name: &str) -> RfcResult<RfcDate> {
        let name = to_sap_uc_cstr(name);
        let mut value: RfcDate = [0; 8];
        call(|err| unsafe {
            (self.api.get_date)(raw(container), name.as_ptr(), value.as_mut_ptr(), err)
        })?;
        Ok(value)
    }

    fn set_time(&self, container: DataHandle, name: &str, value: &RfcTime) -> RfcResult<()> {
        let name = to_sap_uc_cstr(name);
        call(|err| unsafe { (self.api.set_time)(raw(container), name.as_ptr(), value.as_ptr(), err) })
    }

    fn get_time(&self, container: DataHandle, name: &str) -> RfcResult<RfcTime> {
        let name = to_sap_uc_cstr(name);
        let mut value: RfcTime = [0; 6];
        call(|err| unsafe {
            (self.api.get_time)(raw(container), name.as_ptr(), value.as_mut_ptr(), err)
        })?;
        Ok(value)
    }

    fn get_structure(&self, container: DataHandle, name: &str) -> RfcResult<DataHandle> {
        let name = to_sap_uc_cstr(name);
        let mut out: Handle = std::ptr::null_mut();
        call(|err| unsafe {
            (self.api.get_structure)(raw(container), name.as_ptr(), &mut out, err)
        })?;
        DataHandle::from_raw(out as usize)
            .ok_or_else(|| ErrorInfo::new(ResultCode::InvalidHandle, "SDK returned a null handle"))
    }

    fn get_table(&self, container: DataHandle, name: &str) -> RfcResult<TableHandle> {
        let name = to_sap_uc_cstr(name);
        let mut out: Handle = std::ptr::null_mut();
        call(|err| unsafe { (self.api.get_table)(raw(container), name.as_ptr(), &mut out, err) })?;
        TableHandle::from_raw(out as usize)
            .ok_or_else(|| ErrorInfo::new(ResultCode::InvalidHandle, "SDK returned a null handle"))
    }

    fn append_new_row(&self, table: TableHandle) -> RfcResult<DataHandle> {
        call_handle(DataHandle::from_raw, |err| unsafe {
            (self.api.append_new_row)(raw(table), err)
        })
    }

    fn get_row_count(&self, table: TableHandle) -> RfcResult<u32> {
        let mut count: c_uint = 0;
        call(|err| unsafe { (self.api.get_row_count)(raw(table), &mut count, err) })?;
        Ok(count)
    }

    fn move_to(&self, table: TableHandle, index: u32) -> RfcResult<()> {
        call(|err| unsafe { (self.api.move_to)(raw(table), index, err) })
    }

    fn get_current_row(&self, table: TableHandle) -> RfcResult<DataHandle> {
        call_handle(DataHandle::from_raw, |err| unsafe {
            (self.api.get_current_row)(raw(table), err)
        })
    }
}

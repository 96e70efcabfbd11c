//! Error Model
//!
//! Result codes and error records reported by the RFC library, and the
//! translation of those records into [`SapError`].

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ffi::RfcType;

/// Result type for SAP operations.
pub type SapResult<T> = Result<T, SapError>;

macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $raw:literal => $symbol:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A value this crate does not know about
            Unknown(i32),
        }

        impl $name {
            /// Every known value, in native order
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Map a raw native value
            pub fn from_raw(raw: i32) -> Self {
                match raw {
                    $($raw => $name::$variant,)+
                    other => $name::Unknown(other),
                }
            }

            /// Raw native value
            pub fn as_raw(self) -> i32 {
                match self {
                    $($name::$variant => $raw,)+
                    $name::Unknown(raw) => raw,
                }
            }

            /// Symbolic name as spelled by the SDK headers
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $symbol,)+
                    $name::Unknown(_) => "UNKNOWN",
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $name::Unknown(raw) => write!(f, "{}({})", self.name(), raw),
                    _ => f.write_str(self.name()),
                }
            }
        }
    };
}

native_enum! {
    /// Outcome of a native RFC call (`RFC_RC`)
    pub enum ResultCode {
        Ok = 0 => "RFC_OK",
        CommunicationFailure = 1 => "RFC_COMMUNICATION_FAILURE",
        LogonFailure = 2 => "RFC_LOGON_FAILURE",
        AbapRuntimeFailure = 3 => "RFC_ABAP_RUNTIME_FAILURE",
        AbapMessage = 4 => "RFC_ABAP_MESSAGE",
        AbapException = 5 => "RFC_ABAP_EXCEPTION",
        Closed = 6 => "RFC_CLOSED",
        Canceled = 7 => "RFC_CANCELED",
        Timeout = 8 => "RFC_TIMEOUT",
        MemoryInsufficient = 9 => "RFC_MEMORY_INSUFFICIENT",
        VersionMismatch = 10 => "RFC_VERSION_MISMATCH",
        InvalidProtocol = 11 => "RFC_INVALID_PROTOCOL",
        SerializationFailure = 12 => "RFC_SERIALIZATION_FAILURE",
        InvalidHandle = 13 => "RFC_INVALID_HANDLE",
        Retry = 14 => "RFC_RETRY",
        ExternalFailure = 15 => "RFC_EXTERNAL_FAILURE",
        Executed = 16 => "RFC_EXECUTED",
        NotFound = 17 => "RFC_NOT_FOUND",
        NotSupported = 18 => "RFC_NOT_SUPPORTED",
        IllegalState = 19 => "RFC_ILLEGAL_STATE",
        InvalidParameter = 20 => "RFC_INVALID_PARAMETER",
        CodepageConversionFailure = 21 => "RFC_CODEPAGE_CONVERSION_FAILURE",
        ConversionFailure = 22 => "RFC_CONVERSION_FAILURE",
        BufferTooSmall = 23 => "RFC_BUFFER_TOO_SMALL",
        TableMoveBof = 24 => "RFC_TABLE_MOVE_BOF",
        TableMoveEof = 25 => "RFC_TABLE_MOVE_EOF",
        StartSapGuiFailure = 26 => "RFC_START_SAPGUI_FAILURE",
        AbapClassException = 27 => "RFC_ABAP_CLASS_EXCEPTION",
        UnknownError = 28 => "RFC_UNKNOWN_ERROR",
        AuthorizationFailure = 29 => "RFC_AUTHORIZATION_FAILURE",
        AuthenticationFailure = 30 => "RFC_AUTHENTICATION_FAILURE",
        CryptolibFailure = 31 => "RFC_CRYPTOLIB_FAILURE",
        IoFailure = 32 => "RFC_IO_FAILURE",
        LockingFailure = 33 => "RFC_LOCKING_FAILURE",
    }
}

native_enum! {
    /// Error category reported alongside a result code (`RFC_ERROR_GROUP`)
    pub enum ErrorGroup {
        Ok = 0 => "OK",
        AbapApplicationFailure = 1 => "ABAP_APPLICATION_FAILURE",
        AbapRuntimeFailure = 2 => "ABAP_RUNTIME_FAILURE",
        LogonFailure = 3 => "LOGON_FAILURE",
        CommunicationFailure = 4 => "COMMUNICATION_FAILURE",
        ExternalRuntimeFailure = 5 => "EXTERNAL_RUNTIME_FAILURE",
        ExternalApplicationFailure = 6 => "EXTERNAL_APPLICATION_FAILURE",
        ExternalAuthorizationFailure = 7 => "EXTERNAL_AUTHORIZATION_FAILURE",
        ExternalAuthenticationFailure = 8 => "EXTERNAL_AUTHENTICATION_FAILURE",
        CryptolibFailure = 9 => "CRYPTOLIB_FAILURE",
        LockingFailure = 10 => "LOCKING_FAILURE",
    }
}

impl ResultCode {
    /// Whether this code reports success
    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }
}

impl Default for ErrorGroup {
    fn default() -> Self {
        ErrorGroup::Ok
    }
}

/// Error record filled in by the RFC library (`RFC_ERROR_INFO`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: ResultCode,
    pub group: ErrorGroup,
    pub key: String,
    pub message: String,
    pub abap_msg_class: String,
    pub abap_msg_type: String,
    pub abap_msg_number: String,
    pub abap_msg_v1: String,
    pub abap_msg_v2: String,
    pub abap_msg_v3: String,
    pub abap_msg_v4: String,
}

impl ErrorInfo {
    /// An error record with just a code and message
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            group: ErrorGroup::Ok,
            key: String::new(),
            message: message.into(),
            abap_msg_class: String::new(),
            abap_msg_type: String::new(),
            abap_msg_number: String::new(),
            abap_msg_v1: String::new(),
            abap_msg_v2: String::new(),
            abap_msg_v3: String::new(),
            abap_msg_v4: String::new(),
        }
    }

    pub fn with_group(mut self, group: ErrorGroup) -> Self {
        self.group = group;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

impl From<ResultCode> for ErrorInfo {
    fn from(code: ResultCode) -> Self {
        ErrorInfo::new(code, "")
    }
}

fn rfc_message(code: &dyn fmt::Display, info: &ErrorInfo) -> String {
    if info.message.is_empty() {
        format!("SAP RFC Error: {}", code)
    } else {
        format!("SAP RFC Error: {} with message: {}", code, info.message)
    }
}

/// Errors surfaced by connections, metadata lookup and invocations.
#[derive(Debug, Error)]
pub enum SapError {
    /// A native call failed with a known result code
    #[error("{}", rfc_message(.code, .info))]
    Rfc { code: ResultCode, info: Box<ErrorInfo> },

    /// A native call failed with a code outside the known set
    #[error("{}", rfc_message(&format!("native error {}", .raw_code), .info))]
    Native { raw_code: i32, info: Box<ErrorInfo> },

    /// The SDK shared libraries could not be loaded
    #[error("{message}")]
    LibraryNotFound {
        message: String,
        #[source]
        source: libloading::Error,
    },

    #[error("Connection is not open")]
    NotConnected,

    #[error("Cannot {operation} while the connection is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Function '{function}' has no parameter '{parameter}'")]
    UnknownParameter { function: String, parameter: String },

    #[error("'{path}' has no field '{field}'")]
    UnknownField { path: String, field: String },

    #[error("Parameter '{parameter}' is an export parameter and cannot be supplied")]
    NotAnInput { parameter: String },

    #[error("'{path}' expects {expected}, got {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error("'{path}' holds at most {max} units, got {actual}")]
    ValueTooLong {
        path: String,
        max: usize,
        actual: usize,
    },

    #[error("'{path}' value out of range: {detail}")]
    ValueOutOfRange { path: String, detail: String },

    #[error("'{path}' has unsupported type {rfc_type}")]
    UnsupportedType { path: String, rfc_type: RfcType },

    #[error("'{path}' returned an unreadable value: {detail}")]
    InvalidNativeValue { path: String, detail: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SapError {
    /// The native result code behind this error, if it came from the library
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            SapError::Rfc { code, .. } => Some(*code),
            SapError::Native { raw_code, .. } => Some(ResultCode::Unknown(*raw_code)),
            _ => None,
        }
    }

    /// The native error record, if any
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        match self {
            SapError::Rfc { info, .. } | SapError::Native { info, .. } => Some(info),
            _ => None,
        }
    }
}

/// Translate a native outcome into a domain error.
///
/// `RFC_OK` yields `None`; every other code yields an error carrying the
/// code and the native record. Codes outside the known set keep their raw
/// value in [`SapError::Native`].
pub fn translate(code: ResultCode, info: ErrorInfo) -> Option<SapError> {
    match code {
        ResultCode::Ok => None,
        ResultCode::Unknown(raw_code) => Some(SapError::Native {
            raw_code,
            info: Box::new(info),
        }),
        code => Some(SapError::Rfc {
            code,
            info: Box::new(info),
        }),
    }
}

impl From<ErrorInfo> for SapError {
    fn from(info: ErrorInfo) -> Self {
        let code = info.code;
        // An interop that reports failure with RFC_OK still produced a failure
        translate(code, info.clone()).unwrap_or(SapError::Rfc {
            code,
            info: Box::new(info),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_translates_to_nothing() {
        assert!(translate(ResultCode::Ok, ErrorInfo::from(ResultCode::Ok)).is_none());
    }

    #[test]
    fn test_every_failure_code_keeps_its_name() {
        for &code in ResultCode::ALL.iter().filter(|c| !c.is_ok()) {
            let err = translate(code, ErrorInfo::from(code)).expect("failure must translate");
            assert_eq!(err.result_code(), Some(code));
            assert_eq!(err.to_string(), format!("SAP RFC Error: {}", code.name()));
            assert_eq!(ResultCode::from_raw(code.as_raw()), code);
        }
    }

    #[test]
    fn test_message_is_appended() {
        let info = ErrorInfo::new(ResultCode::LogonFailure, "Name or password is incorrect");
        let err = SapError::from(info);
        assert_eq!(
            err.to_string(),
            "SAP RFC Error: RFC_LOGON_FAILURE with message: Name or password is incorrect"
        );
    }

    #[test]
    fn test_unknown_code_preserves_raw_value() {
        let code = ResultCode::from_raw(99);
        assert_eq!(code, ResultCode::Unknown(99));
        let err = translate(code, ErrorInfo::from(code)).unwrap();
        match &err {
            SapError::Native { raw_code, .. } => assert_eq!(*raw_code, 99),
            other => panic!("expected native error, got {other:?}"),
        }
        assert!(err.to_string().contains("99"));
        assert_eq!(err.result_code(), Some(ResultCode::Unknown(99)));
    }

    #[test]
    fn test_error_info_is_kept() {
        let info = ErrorInfo::new(ResultCode::AbapException, "boom")
            .with_group(ErrorGroup::AbapApplicationFailure)
            .with_key("NOT_FOUND");
        let err = SapError::from(info.clone());
        assert_eq!(err.error_info(), Some(&info));
    }

    #[test]
    fn test_domain_errors_have_no_code() {
        assert_eq!(SapError::NotConnected.result_code(), None);
    }

    #[test]
    fn test_group_mapping() {
        assert_eq!(ErrorGroup::from_raw(4), ErrorGroup::CommunicationFailure);
        assert_eq!(ErrorGroup::from_raw(42), ErrorGroup::Unknown(42));
        assert_eq!(ErrorGroup::LogonFailure.to_string(), "LOGON_FAILURE");
    }
}

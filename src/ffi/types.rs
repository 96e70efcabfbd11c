//! RFC Type System
//!
//! Native type codes, `#[repr(C)]` records exchanged with the SDK, and the
//! conversion between Rust strings and the SDK's UTF-16 `SAP_UC` text.

use std::fmt;
use std::os::raw::{c_int, c_uint, c_void};

use crate::error::{ErrorGroup, ErrorInfo, ResultCode};

/// One UTF-16 code unit, the SDK's character type
pub type SapUc = u16;

/// `RFC_DATE`: `YYYYMMDD`
pub type RfcDate = [SapUc; 8];

/// `RFC_TIME`: `HHMMSS`
pub type RfcTime = [SapUc; 6];

/// Field and parameter types (`RFCTYPE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RfcType {
    Char,
    Date,
    Bcd,
    Time,
    Byte,
    Table,
    Num,
    Float,
    Int,
    Int2,
    Int1,
    Null,
    AbapObject,
    Structure,
    Decf16,
    Decf34,
    XmlData,
    String,
    XString,
    Int8,
    UtcLong,
    UtcSecond,
    UtcMinute,
    DtDay,
    DtWeek,
    DtMonth,
    TSecond,
    TMinute,
    CDay,
    Box,
    GenericBox,
    /// Type code this crate does not know about
    Other(i32),
}

impl RfcType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => RfcType::Char,
            1 => RfcType::Date,
            2 => RfcType::Bcd,
            3 => RfcType::Time,
            4 => RfcType::Byte,
            5 => RfcType::Table,
            6 => RfcType::Num,
            7 => RfcType::Float,
            8 => RfcType::Int,
            9 => RfcType::Int2,
            10 => RfcType::Int1,
            14 => RfcType::Null,
            16 => RfcType::AbapObject,
            17 => RfcType::Structure,
            23 => RfcType::Decf16,
            24 => RfcType::Decf34,
            28 => RfcType::XmlData,
            29 => RfcType::String,
            30 => RfcType::XString,
            31 => RfcType::Int8,
            32 => RfcType::UtcLong,
            33 => RfcType::UtcSecond,
            34 => RfcType::UtcMinute,
            35 => RfcType::DtDay,
            36 => RfcType::DtWeek,
            37 => RfcType::DtMonth,
            38 => RfcType::TSecond,
            39 => RfcType::TMinute,
            40 => RfcType::CDay,
            41 => RfcType::Box,
            42 => RfcType::GenericBox,
            other => RfcType::Other(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            RfcType::Char => 0,
            RfcType::Date => 1,
            RfcType::Bcd => 2,
            RfcType::Time => 3,
            RfcType::Byte => 4,
            RfcType::Table => 5,
            RfcType::Num => 6,
            RfcType::Float => 7,
            RfcType::Int => 8,
            RfcType::Int2 => 9,
            RfcType::Int1 => 10,
            RfcType::Null => 14,
            RfcType::AbapObject => 16,
            RfcType::Structure => 17,
            RfcType::Decf16 => 23,
            RfcType::Decf34 => 24,
            RfcType::XmlData => 28,
            RfcType::String => 29,
            RfcType::XString => 30,
            RfcType::Int8 => 31,
            RfcType::UtcLong => 32,
            RfcType::UtcSecond => 33,
            RfcType::UtcMinute => 34,
            RfcType::DtDay => 35,
            RfcType::DtWeek => 36,
            RfcType::DtMonth => 37,
            RfcType::TSecond => 38,
            RfcType::TMinute => 39,
            RfcType::CDay => 40,
            RfcType::Box => 41,
            RfcType::GenericBox => 42,
            RfcType::Other(raw) => raw,
        }
    }

    /// Whether values of this type carry a nested type description
    pub fn is_complex(self) -> bool {
        matches!(self, RfcType::Structure | RfcType::Table)
    }
}

impl fmt::Display for RfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RfcType::Other(raw) => write!(f, "RFCTYPE({})", raw),
            other => write!(f, "RFCTYPE_{}", format!("{:?}", other).to_uppercase()),
        }
    }
}

/// Parameter direction (`RFC_DIRECTION`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RfcDirection {
    Import,
    Export,
    Changing,
    Tables,
}

impl RfcDirection {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0x01 => Some(RfcDirection::Import),
            0x02 => Some(RfcDirection::Export),
            0x03 => Some(RfcDirection::Changing),
            0x07 => Some(RfcDirection::Tables),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            RfcDirection::Import => 0x01,
            RfcDirection::Export => 0x02,
            RfcDirection::Changing => 0x03,
            RfcDirection::Tables => 0x07,
        }
    }
}

// =============================================================================
// Native-shaped records
// =============================================================================

/// Copied-out `RFC_PARAMETER_DESC`
#[derive(Debug, Clone, PartialEq)]
pub struct RfcParameterDesc {
    pub name: String,
    pub rfc_type: RfcType,
    pub direction: RfcDirection,
    pub nuc_length: u32,
    pub uc_length: u32,
    pub decimals: u32,
    pub type_desc: Option<super::TypeDescHandle>,
    pub default_value: String,
    pub description: String,
    pub optional: bool,
}

/// Copied-out `RFC_FIELD_DESC`
#[derive(Debug, Clone, PartialEq)]
pub struct RfcFieldDesc {
    pub name: String,
    pub rfc_type: RfcType,
    pub nuc_length: u32,
    pub nuc_offset: u32,
    pub uc_length: u32,
    pub uc_offset: u32,
    pub decimals: u32,
    pub type_desc: Option<super::TypeDescHandle>,
}

/// Copied-out `RFC_ATTRIBUTES`, without the trailing reserved block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RfcAttributes {
    pub dest: String,
    pub host: String,
    pub partner_host: String,
    pub sys_number: String,
    pub sys_id: String,
    pub client: String,
    pub user: String,
    pub language: String,
    pub trace: String,
    pub iso_language: String,
    pub codepage: String,
    pub partner_codepage: String,
    pub rfc_role: String,
    pub kind: String,
    pub partner_type: String,
    pub rel: String,
    pub partner_rel: String,
    pub kernel_rel: String,
    pub cpic_conv_id: String,
    pub prog_name: String,
    pub partner_bytes_per_char: String,
    pub partner_system_codepage: String,
    pub partner_ip: String,
    pub partner_ipv6: String,
}

// =============================================================================
// C layouts
// =============================================================================

#[repr(C)]
pub(crate) struct RfcConnectionParameterRaw {
    pub name: *const SapUc,
    pub value: *const SapUc,
}

#[repr(C)]
pub(crate) struct RfcErrorInfoRaw {
    pub code: c_int,
    pub group: c_int,
    pub key: [SapUc; 128],
    pub message: [SapUc; 512],
    pub abap_msg_class: [SapUc; 21],
    pub abap_msg_type: [SapUc; 2],
    pub abap_msg_number: [SapUc; 4],
    pub abap_msg_v1: [SapUc; 51],
    pub abap_msg_v2: [SapUc; 51],
    pub abap_msg_v3: [SapUc; 51],
    pub abap_msg_v4: [SapUc; 51],
}

#[repr(C)]
pub(crate) struct RfcParameterDescRaw {
    pub name: [SapUc; 31],
    pub rfc_type: c_int,
    pub direction: c_int,
    pub nuc_length: c_uint,
    pub uc_length: c_uint,
    pub decimals: c_uint,
    pub type_desc_handle: *mut c_void,
    pub default_value: [SapUc; 31],
    pub parameter_text: [SapUc; 80],
    pub optional: u8,
    pub extended_description: *mut c_void,
}

#[repr(C)]
pub(crate) struct RfcFieldDescRaw {
    pub name: [SapUc; 31],
    pub rfc_type: c_int,
    pub nuc_length: c_uint,
    pub nuc_offset: c_uint,
    pub uc_length: c_uint,
    pub uc_offset: c_uint,
    pub decimals: c_uint,
    pub type_desc_handle: *mut c_void,
    pub extended_description: *mut c_void,
}

#[repr(C)]
pub(crate) struct RfcAttributesRaw {
    pub dest: [SapUc; 65],
    pub host: [SapUc; 101],
    pub partner_host: [SapUc; 101],
    pub sys_number: [SapUc; 3],
    pub sys_id: [SapUc; 9],
    pub client: [SapUc; 4],
    pub user: [SapUc; 13],
    pub language: [SapUc; 3],
    pub trace: [SapUc; 2],
    pub iso_language: [SapUc; 3],
    pub codepage: [SapUc; 5],
    pub partner_codepage: [SapUc; 5],
    pub rfc_role: [SapUc; 2],
    pub kind: [SapUc; 2],
    pub partner_type: [SapUc; 2],
    pub rel: [SapUc; 5],
    pub partner_rel: [SapUc; 5],
    pub kernel_rel: [SapUc; 5],
    pub cpic_conv_id: [SapUc; 9],
    pub prog_name: [SapUc; 129],
    pub partner_bytes_per_char: [SapUc; 2],
    pub partner_system_codepage: [SapUc; 5],
    pub partner_ip: [SapUc; 16],
    pub partner_ipv6: [SapUc; 46],
    pub reserved: [SapUc; 17],
}

/// Records the SDK fills in; all-zero is a valid initial state for each.
pub(crate) unsafe trait Zeroed: Sized {
    fn zeroed() -> Self {
        // Safety: implementors are plain integers, arrays and raw pointers
        unsafe { std::mem::zeroed() }
    }
}

unsafe impl Zeroed for RfcErrorInfoRaw {}
unsafe impl Zeroed for RfcParameterDescRaw {}
unsafe impl Zeroed for RfcFieldDescRaw {}
unsafe impl Zeroed for RfcAttributesRaw {}

impl RfcErrorInfoRaw {
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: ResultCode::from_raw(self.code),
            group: ErrorGroup::from_raw(self.group),
            key: from_sap_uc(&self.key),
            message: from_sap_uc(&self.message),
            abap_msg_class: from_sap_uc(&self.abap_msg_class),
            abap_msg_type: from_sap_uc(&self.abap_msg_type),
            abap_msg_number: from_sap_uc(&self.abap_msg_number),
            abap_msg_v1: from_sap_uc(&self.abap_msg_v1),
            abap_msg_v2: from_sap_uc(&self.abap_msg_v2),
            abap_msg_v3: from_sap_uc(&self.abap_msg_v3),
            abap_msg_v4: from_sap_uc(&self.abap_msg_v4),
        }
    }
}

impl RfcAttributesRaw {
    pub fn to_attributes(&self) -> RfcAttributes {
        RfcAttributes {
            dest: from_sap_uc(&self.dest),
            host: from_sap_uc(&self.host),
            partner_host: from_sap_uc(&self.partner_host),
            sys_number: from_sap_uc(&self.sys_number),
            sys_id: from_sap_uc(&self.sys_id),
            client: from_sap_uc(&self.client),
            user: from_sap_uc(&self.user),
            language: from_sap_uc(&self.language),
            trace: from_sap_uc(&self.trace),
            iso_language: from_sap_uc(&self.iso_language),
            codepage: from_sap_uc(&self.codepage),
            partner_codepage: from_sap_uc(&self.partner_codepage),
            rfc_role: from_sap_uc(&self.rfc_role),
            kind: from_sap_uc(&self.kind),
            partner_type: from_sap_uc(&self.partner_type),
            rel: from_sap_uc(&self.rel),
            partner_rel: from_sap_uc(&self.partner_rel),
            kernel_rel: from_sap_uc(&self.kernel_rel),
            cpic_conv_id: from_sap_uc(&self.cpic_conv_id),
            prog_name: from_sap_uc(&self.prog_name),
            partner_bytes_per_char: from_sap_uc(&self.partner_bytes_per_char),
            partner_system_codepage: from_sap_uc(&self.partner_system_codepage),
            partner_ip: from_sap_uc(&self.partner_ip),
            partner_ipv6: from_sap_uc(&self.partner_ipv6),
        }
    }
}

// =============================================================================
// SAP_UC text
// =============================================================================

/// Encode text as SAP_UC units, without a terminator
pub fn to_sap_uc(s: &str) -> Vec<SapUc> {
    s.encode_utf16().collect()
}

/// Encode text as a NUL-terminated SAP_UC string for name arguments
pub fn to_sap_uc_cstr(s: &str) -> Vec<SapUc> {
    let mut units: Vec<SapUc> = s.encode_utf16().collect();
    units.push(0);
    units
}

/// Decode SAP_UC units up to the first NUL; unpaired surrogates become U+FFFD
pub fn from_sap_uc(units: &[SapUc]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

/// Number of SAP_UC units `s` occupies in a fixed-width field
pub fn sap_uc_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Fill a fixed-width SAP_UC array from ASCII digits, e.g. a date or time
pub fn to_fixed<const N: usize>(s: &str) -> Option<[SapUc; N]> {
    let units = to_sap_uc(s);
    if units.len() != N {
        return None;
    }
    let mut out = [0; N];
    out.copy_from_slice(&units);
    Some(out)
}

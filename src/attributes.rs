//! Connection Attributes
//!
//! A copied-out snapshot of `RFC_ATTRIBUTES`. Fields the library leaves
//! blank are `None` rather than an empty string.

use serde::Serialize;

use crate::ffi::RfcAttributes;

/// Attributes of a connection at the time they were requested
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Attributes {
    /// RFC destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Own host name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// SAP one-letter language key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_codepage: Option<String>,
    /// `C` client, `S` server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfc_role: Option<String>,
    /// `E` external program, `3` ABAP system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_type: Option<String>,
    /// Own RFC library release
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpic_conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_bytes_per_char: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_system_codepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_ipv6: Option<String>,
}

fn present(value: String) -> Option<String> {
    let trimmed = value.trim_end();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

impl From<RfcAttributes> for Attributes {
    fn from(raw: RfcAttributes) -> Self {
        Attributes {
            destination: present(raw.dest),
            host: present(raw.host),
            partner_host: present(raw.partner_host),
            system_number: present(raw.sys_number),
            system_id: present(raw.sys_id),
            client: present(raw.client),
            user: present(raw.user),
            language: present(raw.language),
            trace: present(raw.trace),
            iso_language: present(raw.iso_language),
            codepage: present(raw.codepage),
            partner_codepage: present(raw.partner_codepage),
            rfc_role: present(raw.rfc_role),
            kind: present(raw.kind),
            partner_type: present(raw.partner_type),
            release: present(raw.rel),
            partner_release: present(raw.partner_rel),
            kernel_release: present(raw.kernel_rel),
            cpic_conversation_id: present(raw.cpic_conv_id),
            program_name: present(raw.prog_name),
            partner_bytes_per_char: present(raw.partner_bytes_per_char),
            partner_system_codepage: present(raw.partner_system_codepage),
            partner_ip: present(raw.partner_ip),
            partner_ipv6: present(raw.partner_ipv6),
        }
    }
}

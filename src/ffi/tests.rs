//! FFI Module Tests

use super::fake::{field, parameter, FakeRecord, FakeRfc, FakeValue};
use super::loader::{linux_message, macos_message, windows_message};
use super::*;
use crate::error::{ErrorInfo, ResultCode};

#[test]
fn test_sap_uc_round_trip() {
    let units = to_sap_uc("Grüße €");
    assert_eq!(units.len(), 7);
    assert_eq!(from_sap_uc(&units), "Grüße €");
    assert_eq!(sap_uc_len("😀"), 2);
}

#[test]
fn test_sap_uc_stops_at_nul() {
    let mut units = to_sap_uc_cstr("ABC");
    assert_eq!(units.last(), Some(&0));
    units.extend(to_sap_uc("garbage"));
    assert_eq!(from_sap_uc(&units), "ABC");
}

#[test]
fn test_fixed_width_fields() {
    let date: Option<RfcDate> = to_fixed("20240131");
    assert_eq!(from_sap_uc(&date.unwrap()), "20240131");
    assert!(to_fixed::<8>("2024013").is_none());
    assert!(to_fixed::<6>("1234567").is_none());
}

#[test]
fn test_rfc_type_codes() {
    assert_eq!(RfcType::from_raw(0), RfcType::Char);
    assert_eq!(RfcType::from_raw(5), RfcType::Table);
    assert_eq!(RfcType::from_raw(17), RfcType::Structure);
    assert_eq!(RfcType::from_raw(31), RfcType::Int8);
    assert_eq!(RfcType::from_raw(99), RfcType::Other(99));
    for raw in 0..45 {
        assert_eq!(RfcType::from_raw(raw).as_raw(), raw);
    }
    assert!(RfcType::Table.is_complex());
    assert!(!RfcType::String.is_complex());
    assert_eq!(RfcType::XString.to_string(), "RFCTYPE_XSTRING");
}

#[test]
fn test_direction_codes() {
    assert_eq!(RfcDirection::from_raw(1), Some(RfcDirection::Import));
    assert_eq!(RfcDirection::from_raw(7), Some(RfcDirection::Tables));
    assert_eq!(RfcDirection::from_raw(4), None);
    assert_eq!(RfcDirection::Changing.as_raw(), 3);
}

#[test]
fn test_null_handles_rejected() {
    assert!(ConnectionHandle::from_raw(0).is_none());
    let func = FunctionHandle::from_raw(0x40).unwrap();
    assert_eq!(DataHandle::from(func).as_raw(), 0x40);
}

#[test]
fn test_library_filename() {
    let name = library_filename();
    assert!(name.contains("sapnwrfc"));
}

#[test]
fn test_remediation_messages() {
    let windows = windows_message();
    assert!(windows.contains("PATH environment variable"));
    assert!(windows.contains("sapnwrfc.dll"));
    assert!(windows.contains("Visual C++ 2013"));
    assert!(windows.contains("Required files for Windows:"));
    assert!(!windows.contains("LD_LIBRARY_PATH"));

    let macos = macos_message();
    assert!(macos.contains("DYLD_LIBRARY_PATH"));
    assert!(macos.contains("libsapnwrfc.dylib"));
    assert!(macos.contains("libicudata.XX.dylib"));
    assert!(!macos.contains("Visual C++"));

    let linux = linux_message();
    assert!(linux.contains("LD_LIBRARY_PATH"));
    assert!(linux.contains("libsapnwrfc.so"));
    assert!(linux.contains("libicuuc.so.XX"));

    assert!(remediation_message().contains(library_filename()));
}

#[test]
fn test_loader_search_paths() {
    let mut loader = LibraryLoader::empty();
    assert!(loader.find_library().is_none());
    loader.add_search_path("/opt/a");
    loader.add_search_path("/opt/b");
    assert_eq!(loader.search_paths()[0], std::path::PathBuf::from("/opt/b"));
}

#[test]
fn test_loader_finds_library_in_search_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(library_filename()), b"").unwrap();
    let mut loader = LibraryLoader::empty();
    loader.add_search_path(dir.path());
    assert_eq!(
        loader.find_library(),
        Some(dir.path().join(library_filename()))
    );
}

#[test]
fn test_fake_connection_lifecycle() {
    let fake = FakeRfc::new();
    let conn = fake.open_connection(&[]).unwrap();
    assert!(fake.is_connection_handle_valid(conn).unwrap());
    assert!(fake.ping(conn).is_ok());

    fake.invalidate_connections();
    assert!(!fake.is_connection_handle_valid(conn).unwrap());
    assert_eq!(
        fake.ping(conn).unwrap_err().code,
        ResultCode::CommunicationFailure
    );

    fake.close_connection(conn).unwrap();
    assert_eq!(fake.open_connections(), 0);
    assert_eq!(fake.calls("ping"), 2);
}

#[test]
fn test_fake_failure_injection() {
    let fake = FakeRfc::new();
    fake.fail("open_connection", ErrorInfo::new(ResultCode::Timeout, "slow"));
    let err = fake.open_connection(&[]).unwrap_err();
    assert_eq!(err.code, ResultCode::Timeout);
    assert_eq!(err.message, "slow");
    fake.clear_failures();
    assert!(fake.open_connection(&[]).is_ok());
}

#[test]
fn test_fake_invoke_runs_handler() {
    let fake = FakeRfc::new();
    let row = fake.define_type(vec![field("ID", RfcType::Int, 4)]);
    fake.define_function(
        "Z_ECHO",
        vec![
            parameter("IN", RfcType::Char, RfcDirection::Import, 10),
            parameter("OUT", RfcType::Char, RfcDirection::Export, 10),
            RfcParameterDesc {
                type_desc: Some(row),
                ..parameter("ROWS", RfcType::Table, RfcDirection::Tables, 4)
            },
        ],
        |frame: &mut FakeRecord| {
            let input = frame["IN"].clone();
            frame.insert("OUT".into(), input);
            let mut record = FakeRecord::new();
            record.insert("ID".into(), FakeValue::Int(7));
            frame.insert("ROWS".into(), FakeValue::Table(vec![record]));
            Ok(())
        },
    );

    let conn = fake.open_connection(&[]).unwrap();
    assert!(fake.get_function_desc(conn, "z_echo").is_err());
    let desc = fake.get_function_desc(conn, "Z_ECHO").unwrap();
    assert_eq!(fake.get_parameter_count(desc).unwrap(), 3);
    let func = fake.create_function(desc).unwrap();
    let data = DataHandle::from(func);

    fake.set_string(data, "IN", &to_sap_uc("hello")).unwrap();
    fake.invoke(conn, func).unwrap();

    assert_eq!(from_sap_uc(&fake.get_string(data, "OUT").unwrap()), "hello");
    let table = fake.get_table(data, "ROWS").unwrap();
    assert_eq!(fake.get_row_count(table).unwrap(), 1);
    fake.move_to(table, 0).unwrap();
    let current = fake.get_current_row(table).unwrap();
    assert_eq!(fake.get_int(current, "ID").unwrap(), 7);
    assert_eq!(
        fake.move_to(table, 1).unwrap_err().code,
        ResultCode::TableMoveEof
    );

    fake.destroy_function(func).unwrap();
    assert_eq!(fake.live_functions(), 0);
}

#[test]
fn test_fake_unknown_function() {
    let fake = FakeRfc::new();
    let conn = fake.open_connection(&[]).unwrap();
    let err = fake.get_function_desc(conn, "NOPE").unwrap_err();
    assert_eq!(err.code, ResultCode::NotFound);
    assert_eq!(err.key, "FU_NOT_FOUND");
}

#[test]
fn test_buffer_len_refuses_oversized_buffers() {
    assert_eq!(super::native::buffer_len(255).unwrap(), 255);
    let limit = std::os::raw::c_uint::MAX as usize;
    assert_eq!(super::native::buffer_len(limit).unwrap(), std::os::raw::c_uint::MAX);
    if let Some(over) = limit.checked_add(1) {
        let err = super::native::buffer_len(over).unwrap_err();
        assert_eq!(err.code, ResultCode::InvalidParameter);
    }
}

//! Parameter Marshaling
//!
//! Moves [`Value`]s into and out of native data containers.
//!
//! Writing is split in two: [`check`] validates a value against its declared
//! [`ValueKind`] without touching the library, and [`to_native`] performs
//! the writes. A call checks every input before its first write so a bad
//! value never leaves a half-filled call object behind.
//!
//! Text crosses as UTF-16 `SAP_UC` units and widths are counted in those
//! units. Decimals cross in their text form so no binary rounding occurs.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use dashu::Decimal;

use crate::decimal::{self, Digits};
use crate::error::{SapError, SapResult};
use crate::ffi::{
    from_sap_uc, sap_uc_len, to_fixed, to_sap_uc, DataHandle, RfcDate, RfcInterop, RfcTime,
    TableHandle,
};
use crate::metadata::{IntWidth, TypeDescriptor, ValueKind};
use crate::value::{Structure, Value};

const INITIAL_DATE: &str = "00000000";

fn mismatch(path: &str, kind: &ValueKind, value: &Value) -> SapError {
    SapError::TypeMismatch {
        path: path.to_string(),
        expected: kind.to_string(),
        found: value.kind_name(),
    }
}

fn out_of_range(path: &str, detail: impl Into<String>) -> SapError {
    SapError::ValueOutOfRange {
        path: path.to_string(),
        detail: detail.into(),
    }
}

fn unreadable(path: &str, detail: impl Into<String>) -> SapError {
    SapError::InvalidNativeValue {
        path: path.to_string(),
        detail: detail.into(),
    }
}

fn field_path(parent: &str, field: &str) -> String {
    format!("{}-{}", parent, field)
}

fn row_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

// =============================================================================
// Validation
// =============================================================================

/// Check `value` against `kind` without any native call
pub fn check(kind: &ValueKind, value: &Value, path: &str) -> SapResult<()> {
    match (kind, value) {
        (ValueKind::Text { max_chars, .. }, Value::Text(s)) => {
            let units = sap_uc_len(s);
            match max_chars {
                Some(max) if units > *max => Err(SapError::ValueTooLong {
                    path: path.to_string(),
                    max: *max,
                    actual: units,
                }),
                _ => Ok(()),
            }
        }

        (ValueKind::Numeric { digits }, Value::Text(s)) => {
            if !s.chars().all(|c| c.is_ascii_digit()) {
                return Err(out_of_range(path, "NUM fields hold digits only"));
            }
            if s.len() > *digits {
                return Err(SapError::ValueTooLong {
                    path: path.to_string(),
                    max: *digits,
                    actual: s.len(),
                });
            }
            Ok(())
        }
        (ValueKind::Numeric { digits }, Value::Int(i)) => {
            if *i < 0 {
                return Err(out_of_range(path, "NUM fields cannot be negative"));
            }
            let len = i.to_string().len();
            if len > *digits {
                return Err(SapError::ValueTooLong {
                    path: path.to_string(),
                    max: *digits,
                    actual: len,
                });
            }
            Ok(())
        }

        (ValueKind::Integer(width), Value::Int(i)) => {
            let (min, max) = width.range();
            if *i < min || *i > max {
                return Err(out_of_range(
                    path,
                    format!("{} is outside {}..={}", i, min, max),
                ));
            }
            Ok(())
        }

        (ValueKind::Float, Value::Float(_)) => Ok(()),

        (ValueKind::Decimal { max_digits, scale }, Value::Decimal(d)) => {
            check_decimal(d, *max_digits, *scale, path)
        }
        (ValueKind::Decimal { max_digits, scale }, Value::Int(i)) => {
            check_decimal(&decimal::from_int(*i), *max_digits, *scale, path)
        }

        (ValueKind::Bytes { length }, Value::Bytes(b)) => match length {
            Some(max) if b.len() > *max => Err(SapError::ValueTooLong {
                path: path.to_string(),
                max: *max,
                actual: b.len(),
            }),
            _ => Ok(()),
        },

        (ValueKind::Date, Value::Date(date)) => match date {
            Some(d) if !(1..=9999).contains(&d.year()) => {
                Err(out_of_range(path, format!("year {} has no DATE form", d.year())))
            }
            _ => Ok(()),
        },

        (ValueKind::Time, Value::Time(t)) if t.nanosecond() != 0 => Err(out_of_range(
            path,
            format!("{} has fractional seconds, TIME holds HHMMSS", t),
        )),
        (ValueKind::Time, Value::Time(_)) => Ok(()),

        (ValueKind::Structure(ty), Value::Structure(s)) => check_structure(ty, s, path),

        (ValueKind::Table(ty), Value::Table(rows)) => {
            for (index, row) in rows.iter().enumerate() {
                check_structure(ty, row, &row_path(path, index))?;
            }
            Ok(())
        }

        (ValueKind::Unsupported(rfc_type), _) => Err(SapError::UnsupportedType {
            path: path.to_string(),
            rfc_type: *rfc_type,
        }),

        (kind, value) => Err(mismatch(path, kind, value)),
    }
}

fn check_structure(ty: &TypeDescriptor, value: &Structure, path: &str) -> SapResult<()> {
    for (name, field_value) in value.iter() {
        let field = ty.field(name).ok_or_else(|| SapError::UnknownField {
            path: path.to_string(),
            field: name.to_string(),
        })?;
        check(&field.kind, field_value, &field_path(path, &field.name))?;
    }
    Ok(())
}

fn check_decimal(
    d: &Decimal,
    max_digits: u32,
    scale: Option<u32>,
    path: &str,
) -> SapResult<()> {
    let digits = Digits::of(d);
    let max_digits = max_digits as usize;
    match scale {
        Some(scale) => {
            let scale = scale as usize;
            if digits.scale() > scale {
                return Err(out_of_range(
                    path,
                    format!("{} has more than {} decimal places", decimal::to_text(d), scale),
                ));
            }
            if digits.integer_digits() + scale > max_digits {
                return Err(out_of_range(
                    path,
                    format!(
                        "{} exceeds {} digits with {} decimals",
                        decimal::to_text(d),
                        max_digits,
                        scale
                    ),
                ));
            }
        }
        None => {
            if digits.precision() > max_digits {
                return Err(out_of_range(
                    path,
                    format!(
                        "{} exceeds {} significant digits",
                        decimal::to_text(d),
                        max_digits
                    ),
                ));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Writing
// =============================================================================

/// Write `value` into field `name` of `container`.
///
/// `value` must already have passed [`check`].
pub fn to_native(
    interop: &dyn RfcInterop,
    container: DataHandle,
    name: &str,
    kind: &ValueKind,
    value: &Value,
    path: &str,
) -> SapResult<()> {
    match (kind, value) {
        (ValueKind::Text { .. }, Value::Text(s)) | (ValueKind::Numeric { .. }, Value::Text(s)) => {
            interop.set_string(container, name, &to_sap_uc(s))?
        }
        (ValueKind::Numeric { .. }, Value::Int(i)) => {
            interop.set_string(container, name, &to_sap_uc(&i.to_string()))?
        }

        (ValueKind::Integer(IntWidth::Int8), Value::Int(i)) => {
            interop.set_int8(container, name, *i)?
        }
        (ValueKind::Integer(_), Value::Int(i)) => {
            let narrow = i32::try_from(*i).map_err(|_| out_of_range(path, i.to_string()))?;
            interop.set_int(container, name, narrow)?
        }

        (ValueKind::Float, Value::Float(f)) => interop.set_float(container, name, *f)?,

        (ValueKind::Decimal { .. }, Value::Decimal(d)) => {
            interop.set_string(container, name, &to_sap_uc(&decimal::to_text(d)))?
        }
        (ValueKind::Decimal { .. }, Value::Int(i)) => {
            interop.set_string(container, name, &to_sap_uc(&i.to_string()))?
        }

        (ValueKind::Bytes { length: Some(_) }, Value::Bytes(b)) => {
            interop.set_bytes(container, name, b)?
        }
        (ValueKind::Bytes { length: None }, Value::Bytes(b)) => {
            interop.set_xstring(container, name, b)?
        }

        (ValueKind::Date, Value::Date(date)) => {
            interop.set_date(container, name, &encode_date(*date, path)?)?
        }
        (ValueKind::Time, Value::Time(time)) => {
            interop.set_time(container, name, &encode_time(*time, path)?)?
        }

        (ValueKind::Structure(ty), Value::Structure(s)) => {
            let child = interop.get_structure(container, name)?;
            write_structure(interop, child, ty, s, path)?
        }

        (ValueKind::Table(ty), Value::Table(rows)) => {
            let table = interop.get_table(container, name)?;
            for (index, row) in rows.iter().enumerate() {
                let handle = interop.append_new_row(table)?;
                write_structure(interop, handle, ty, row, &row_path(path, index))?;
            }
        }

        (ValueKind::Unsupported(rfc_type), _) => {
            return Err(SapError::UnsupportedType {
                path: path.to_string(),
                rfc_type: *rfc_type,
            })
        }

        (kind, value) => return Err(mismatch(path, kind, value)),
    }
    Ok(())
}

fn write_structure(
    interop: &dyn RfcInterop,
    container: DataHandle,
    ty: &TypeDescriptor,
    value: &Structure,
    path: &str,
) -> SapResult<()> {
    for (name, field_value) in value.iter() {
        let field = ty.field(name).ok_or_else(|| SapError::UnknownField {
            path: path.to_string(),
            field: name.to_string(),
        })?;
        to_native(
            interop,
            container,
            &field.name,
            &field.kind,
            field_value,
            &field_path(path, &field.name),
        )?;
    }
    Ok(())
}

fn encode_date(date: Option<NaiveDate>, path: &str) -> SapResult<RfcDate> {
    let text = match date {
        Some(d) => d.format("%Y%m%d").to_string(),
        None => INITIAL_DATE.to_string(),
    };
    to_fixed(&text).ok_or_else(|| out_of_range(path, format!("'{}' is not YYYYMMDD", text)))
}

fn encode_time(time: NaiveTime, path: &str) -> SapResult<RfcTime> {
    let text = time.format("%H%M%S").to_string();
    to_fixed(&text).ok_or_else(|| out_of_range(path, format!("'{}' is not HHMMSS", text)))
}

// =============================================================================
// Reading
// =============================================================================

/// Read field `name` of `container` as `kind`
pub fn from_native(
    interop: &dyn RfcInterop,
    container: DataHandle,
    name: &str,
    kind: &ValueKind,
    path: &str,
) -> SapResult<Value> {
    let value = match kind {
        ValueKind::Text { fixed, .. } => {
            let text = from_sap_uc(&interop.get_string(container, name)?);
            if *fixed {
                Value::Text(text.trim_end_matches(' ').to_string())
            } else {
                Value::Text(text)
            }
        }
        ValueKind::Numeric { .. } => Value::Text(from_sap_uc(&interop.get_string(container, name)?)),

        ValueKind::Integer(IntWidth::Int8) => {
            Value::Int(interop.get_int8(container, name)?)
        }
        ValueKind::Integer(_) => Value::Int(interop.get_int(container, name)? as i64),

        ValueKind::Float => Value::Float(interop.get_float(container, name)?),

        ValueKind::Decimal { .. } => {
            let text = from_sap_uc(&interop.get_string(container, name)?);
            Value::Decimal(parse_decimal(&text, path)?)
        }

        ValueKind::Bytes { length: Some(length) } => {
            Value::Bytes(interop.get_bytes(container, name, *length)?)
        }
        ValueKind::Bytes { length: None } => Value::Bytes(interop.get_xstring(container, name)?),

        ValueKind::Date => Value::Date(decode_date(&interop.get_date(container, name)?, path)?),
        ValueKind::Time => Value::Time(decode_time(&interop.get_time(container, name)?, path)?),

        ValueKind::Structure(ty) => {
            let child = interop.get_structure(container, name)?;
            Value::Structure(read_structure(interop, child, ty, path)?)
        }

        ValueKind::Table(ty) => {
            let table = interop.get_table(container, name)?;
            Value::Table(read_table(interop, table, ty, path)?)
        }

        ValueKind::Unsupported(rfc_type) => {
            return Err(SapError::UnsupportedType {
                path: path.to_string(),
                rfc_type: *rfc_type,
            })
        }
    };
    Ok(value)
}

fn read_structure(
    interop: &dyn RfcInterop,
    container: DataHandle,
    ty: &TypeDescriptor,
    path: &str,
) -> SapResult<Structure> {
    let mut out = Structure::new();
    for field in &ty.fields {
        let value = from_native(
            interop,
            container,
            &field.name,
            &field.kind,
            &field_path(path, &field.name),
        )?;
        out.insert(&field.name, value);
    }
    Ok(out)
}

fn read_table(
    interop: &dyn RfcInterop,
    table: TableHandle,
    ty: &TypeDescriptor,
    path: &str,
) -> SapResult<Vec<Structure>> {
    let count = interop.get_row_count(table)?;
    let mut rows = Vec::with_capacity(count as usize);
    for index in 0..count {
        interop.move_to(table, index)?;
        let row = interop.get_current_row(table)?;
        rows.push(read_structure(interop, row, ty, &row_path(path, index as usize))?);
    }
    Ok(rows)
}

fn parse_decimal(text: &str, path: &str) -> SapResult<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(decimal::from_int(0));
    }
    decimal::parse(text).ok_or_else(|| unreadable(path, format!("'{}' is not a decimal", text)))
}

fn decode_date(raw: &RfcDate, path: &str) -> SapResult<Option<NaiveDate>> {
    let text = from_sap_uc(raw);
    let text = text.trim();
    if text.is_empty() || text == INITIAL_DATE {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, "%Y%m%d")
        .map(Some)
        .map_err(|e| unreadable(path, format!("'{}': {}", text, e)))
}

fn decode_time(raw: &RfcTime, path: &str) -> SapResult<NaiveTime> {
    let text = from_sap_uc(raw);
    let text = text.trim();
    if text.is_empty() {
        return Ok(NaiveTime::MIN);
    }
    NaiveTime::parse_from_str(text, "%H%M%S")
        .map_err(|e| unreadable(path, format!("'{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::fake::{field, parameter, FakeRfc};
    use crate::ffi::{FunctionHandle, RfcDirection, RfcParameterDesc, RfcType};
    use crate::metadata::FieldDescriptor;
    use std::sync::Arc;

    fn text(max: usize) -> ValueKind {
        ValueKind::Text {
            max_chars: Some(max),
            fixed: true,
        }
    }

    fn dec(s: &str) -> Decimal {
        decimal::parse(s).unwrap()
    }

    fn row_type() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            fields: vec![
                FieldDescriptor {
                    name: "NAME".into(),
                    rfc_type: RfcType::Char,
                    kind: text(4),
                    nuc_length: 4,
                    decimals: 0,
                },
                FieldDescriptor {
                    name: "QTY".into(),
                    rfc_type: RfcType::Int,
                    kind: ValueKind::Integer(IntWidth::Int4),
                    nuc_length: 4,
                    decimals: 0,
                },
            ],
        })
    }

    /// One call object with every parameter as an import
    fn container(fake: &FakeRfc, params: Vec<RfcParameterDesc>) -> DataHandle {
        fake.define_function("Z_MARSHAL", params, |_| Ok(()));
        let conn = fake.open_connection(&[]).unwrap();
        let desc = fake.get_function_desc(conn, "Z_MARSHAL").unwrap();
        let func: FunctionHandle = fake.create_function(desc).unwrap();
        func.into()
    }

    #[test]
    fn test_text_width_counts_utf16_units() {
        assert!(check(&text(2), &Value::Text("😀".into()), "P").is_ok());
        let err = check(&text(2), &Value::Text("😀!".into()), "P").unwrap_err();
        assert!(matches!(
            err,
            SapError::ValueTooLong { max: 2, actual: 3, .. }
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let err = check(&text(4), &Value::Int(1), "P_NAME").unwrap_err();
        match err {
            SapError::TypeMismatch { path, found, .. } => {
                assert_eq!(path, "P_NAME");
                assert_eq!(found, "integer");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_integer_ranges() {
        let int1 = ValueKind::Integer(IntWidth::Int1);
        assert!(check(&int1, &Value::Int(255), "X").is_ok());
        assert!(check(&int1, &Value::Int(-1), "X").is_err());
        let int2 = ValueKind::Integer(IntWidth::Int2);
        assert!(check(&int2, &Value::Int(40_000), "X").is_err());
        let int8 = ValueKind::Integer(IntWidth::Int8);
        assert!(check(&int8, &Value::Int(i64::MIN), "X").is_ok());
    }

    #[test]
    fn test_numeric_text() {
        let num = ValueKind::Numeric { digits: 4 };
        assert!(check(&num, &Value::Text("0042".into()), "N").is_ok());
        assert!(check(&num, &Value::Int(9999), "N").is_ok());
        assert!(check(&num, &Value::Text("4a".into()), "N").is_err());
        assert!(check(&num, &Value::Int(10_000), "N").is_err());
        assert!(check(&num, &Value::Int(-1), "N").is_err());
    }

    #[test]
    fn test_packed_decimal_limits() {
        // P(7) DECIMALS 2: 13 digits, 11 before the point
        let packed = ValueKind::Decimal {
            max_digits: 13,
            scale: Some(2),
        };
        assert!(check(&packed, &Value::Decimal(dec("12345678901.25")), "A").is_ok());
        assert!(check(&packed, &Value::Decimal(dec("1.250")), "A").is_ok());
        assert!(check(&packed, &Value::Decimal(dec("1.255")), "A").is_err());
        assert!(check(&packed, &Value::Decimal(dec("123456789012")), "A").is_err());
        assert!(check(&packed, &Value::Int(-5), "A").is_ok());
    }

    #[test]
    fn test_decfloat_significant_digits() {
        let decf16 = ValueKind::Decimal {
            max_digits: 16,
            scale: None,
        };
        assert!(check(&decf16, &Value::Decimal(dec("0.1234567890123456")), "D").is_ok());
        assert!(check(&decf16, &Value::Decimal(dec("1.2345678901234567")), "D").is_err());
    }

    #[test]
    fn test_decimal_checks_beyond_28_digits() {
        // P(16) DECIMALS 0: 31 digits
        let packed = ValueKind::Decimal {
            max_digits: 31,
            scale: Some(0),
        };
        let widest = "9999999999999999999999999999999";
        assert!(check(&packed, &Value::Decimal(dec(widest)), "P").is_ok());
        let too_wide = format!("{}9", widest);
        assert!(check(&packed, &Value::Decimal(dec(&too_wide)), "P").is_err());

        let decf34 = ValueKind::Decimal {
            max_digits: 34,
            scale: None,
        };
        let full = "0.1234567890123456789012345678901234";
        assert!(check(&decf34, &Value::Decimal(dec(full)), "D").is_ok());
        let over = format!("{}5", full);
        assert!(check(&decf34, &Value::Decimal(dec(&over)), "D").is_err());
    }

    #[test]
    fn test_time_with_fractional_seconds_rejected() {
        let noon = NaiveTime::from_hms_milli_opt(12, 0, 0, 750).unwrap();
        match check(&ValueKind::Time, &Value::Time(noon), "T").unwrap_err() {
            SapError::ValueOutOfRange { path, .. } => assert_eq!(path, "T"),
            other => panic!("unexpected {:?}", other),
        }
        let whole = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert!(check(&ValueKind::Time, &Value::Time(whole), "T").is_ok());
    }

    #[test]
    fn test_structure_rejects_unknown_field() {
        let kind = ValueKind::Structure(row_type());
        let value = Value::Structure(Structure::new().with("NAME", "ab").with("COLOR", "red"));
        match check(&kind, &value, "HEADER").unwrap_err() {
            SapError::UnknownField { path, field } => {
                assert_eq!(path, "HEADER");
                assert_eq!(field, "COLOR");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_table_errors_name_the_row() {
        let kind = ValueKind::Table(row_type());
        let rows = vec![
            Structure::new().with("NAME", "ok"),
            Structure::new().with("NAME", "too long"),
        ];
        match check(&kind, &Value::Table(rows), "ITEMS").unwrap_err() {
            SapError::ValueTooLong { path, .. } => assert_eq!(path, "ITEMS[1]-NAME"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_type() {
        let kind = ValueKind::Unsupported(RfcType::XmlData);
        let err = check(&kind, &Value::Text(String::new()), "X").unwrap_err();
        assert!(matches!(
            err,
            SapError::UnsupportedType {
                rfc_type: RfcType::XmlData,
                ..
            }
        ));
    }

    #[test]
    fn test_scalars_through_native_fields() {
        let fake = FakeRfc::new();
        let data = container(
            &fake,
            vec![
                parameter("C", RfcType::Char, RfcDirection::Import, 10),
                parameter("I8", RfcType::Int8, RfcDirection::Import, 8),
                parameter("P", RfcType::Bcd, RfcDirection::Import, 7),
                parameter("D", RfcType::Date, RfcDirection::Import, 8),
                parameter("T", RfcType::Time, RfcDirection::Import, 6),
                parameter("X", RfcType::XString, RfcDirection::Import, 0),
            ],
        );

        let cases = [
            ("C", text(10), Value::Text("abc".into())),
            ("I8", ValueKind::Integer(IntWidth::Int8), Value::Int(1 << 40)),
            (
                "P",
                ValueKind::Decimal {
                    max_digits: 13,
                    scale: Some(2),
                },
                Value::Decimal(dec("-0.1")),
            ),
            (
                "D",
                ValueKind::Date,
                Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31)),
            ),
            (
                "T",
                ValueKind::Time,
                Value::Time(NaiveTime::from_hms_opt(23, 59, 1).unwrap()),
            ),
            ("X", ValueKind::Bytes { length: None }, Value::Bytes(vec![1, 2, 3])),
        ];
        for (name, kind, value) in &cases {
            to_native(&fake, data, name, kind, value, name).unwrap();
            assert_eq!(&from_native(&fake, data, name, kind, name).unwrap(), value);
        }
        assert_eq!(fake.calls("set_int8"), 1);
        assert_eq!(fake.calls("set_int"), 0);
    }

    #[test]
    fn test_char_fields_trim_trailing_blanks() {
        let fake = FakeRfc::new();
        let data = container(&fake, vec![parameter("C", RfcType::Char, RfcDirection::Import, 10)]);
        fake.set_string(data, "C", &to_sap_uc("  padded  ")).unwrap();
        let value = from_native(&fake, data, "C", &text(10), "C").unwrap();
        assert_eq!(value, Value::Text("  padded".into()));
    }

    #[test]
    fn test_initial_date_reads_as_none() {
        let fake = FakeRfc::new();
        let data = container(&fake, vec![parameter("D", RfcType::Date, RfcDirection::Import, 8)]);
        assert_eq!(
            from_native(&fake, data, "D", &ValueKind::Date, "D").unwrap(),
            Value::Date(None)
        );
        to_native(&fake, data, "D", &ValueKind::Date, &Value::Date(None), "D").unwrap();
        assert_eq!(
            from_sap_uc(&fake.get_date(data, "D").unwrap()),
            INITIAL_DATE
        );
    }

    #[test]
    fn test_bad_native_decimal() {
        let fake = FakeRfc::new();
        let data = container(&fake, vec![parameter("P", RfcType::Bcd, RfcDirection::Import, 4)]);
        fake.set_string(data, "P", &to_sap_uc("12,5")).unwrap();
        let kind = ValueKind::Decimal {
            max_digits: 7,
            scale: Some(1),
        };
        let err = from_native(&fake, data, "P", &kind, "P").unwrap_err();
        assert!(matches!(err, SapError::InvalidNativeValue { .. }));
    }

    #[test]
    fn test_wide_decimals_read_exactly() {
        let fake = FakeRfc::new();
        let data = container(
            &fake,
            vec![
                parameter("P", RfcType::Bcd, RfcDirection::Import, 16),
                parameter("D", RfcType::Decf34, RfcDirection::Import, 16),
            ],
        );
        let packed = ValueKind::Decimal {
            max_digits: 31,
            scale: Some(0),
        };
        let decf34 = ValueKind::Decimal {
            max_digits: 34,
            scale: None,
        };

        let cases = [
            ("P", &packed, "9999999999999999999999999999999", "9999999999999999999999999999999"),
            ("P", &packed, "-1234567890123456789012345678901", "-1234567890123456789012345678901"),
            ("D", &decf34, "0.1234567890123456789012345678901234", "0.1234567890123456789012345678901234"),
            ("D", &decf34, "1234567890123456789012345678901234", "1234567890123456789012345678901234"),
            ("D", &decf34, "1E+40", "10000000000000000000000000000000000000000"),
        ];
        for (name, kind, native, expected) in cases {
            fake.set_string(data, name, &to_sap_uc(native)).unwrap();
            let value = from_native(&fake, data, name, kind, name).unwrap();
            assert_eq!(value.to_string(), expected, "reading {}", native);
        }
    }

    #[test]
    fn test_wide_decimal_written_as_plain_text() {
        let fake = FakeRfc::new();
        let data = container(&fake, vec![parameter("P", RfcType::Bcd, RfcDirection::Import, 16)]);
        let kind = ValueKind::Decimal {
            max_digits: 31,
            scale: Some(2),
        };
        let value = Value::Decimal(dec("12345678901234567890123456789.05"));
        check(&kind, &value, "P").unwrap();
        to_native(&fake, data, "P", &kind, &value, "P").unwrap();
        assert_eq!(
            from_sap_uc(&fake.get_string(data, "P").unwrap()),
            "12345678901234567890123456789.05"
        );
    }

    #[test]
    fn test_fixed_bytes_padded_to_length() {
        let fake = FakeRfc::new();
        let data = container(&fake, vec![parameter("B", RfcType::Byte, RfcDirection::Import, 4)]);
        let kind = ValueKind::Bytes { length: Some(4) };
        to_native(&fake, data, "B", &kind, &Value::Bytes(vec![0xAB]), "B").unwrap();
        assert_eq!(
            from_native(&fake, data, "B", &kind, "B").unwrap(),
            Value::Bytes(vec![0xAB, 0, 0, 0])
        );
    }

    #[test]
    fn test_table_rows_keep_order() {
        let fake = FakeRfc::new();
        let row = fake.define_type(vec![
            field("NAME", RfcType::Char, 4),
            field("QTY", RfcType::Int, 4),
        ]);
        let data = container(
            &fake,
            vec![RfcParameterDesc {
                type_desc: Some(row),
                ..parameter("ITEMS", RfcType::Table, RfcDirection::Tables, 8)
            }],
        );

        let kind = ValueKind::Table(row_type());
        let rows: Vec<Structure> = (0..3)
            .map(|i| Structure::new().with("NAME", format!("R{}", i)).with("QTY", i))
            .collect();
        to_native(&fake, data, "ITEMS", &kind, &Value::Table(rows.clone()), "ITEMS").unwrap();
        assert_eq!(fake.calls("append_new_row"), 3);

        let back = from_native(&fake, data, "ITEMS", &kind, "ITEMS").unwrap();
        assert_eq!(back, Value::Table(rows));
    }

    #[test]
    fn test_structure_fields_written_individually() {
        let fake = FakeRfc::new();
        let ty = fake.define_type(vec![
            field("NAME", RfcType::Char, 4),
            field("QTY", RfcType::Int, 4),
        ]);
        let data = container(
            &fake,
            vec![RfcParameterDesc {
                type_desc: Some(ty),
                ..parameter("HEADER", RfcType::Structure, RfcDirection::Import, 8)
            }],
        );

        let kind = ValueKind::Structure(row_type());
        let value = Value::Structure(Structure::new().with("qty", 12));
        to_native(&fake, data, "HEADER", &kind, &value, "HEADER").unwrap();

        let back = from_native(&fake, data, "HEADER", &kind, "HEADER").unwrap();
        let back = back.as_structure().unwrap();
        assert_eq!(back.get("QTY"), Some(&Value::Int(12)));
        assert_eq!(back.get("NAME"), Some(&Value::Text(String::new())));
    }
}

//! Value Model
//!
//! Typed values exchanged with remote function modules. A [`Structure`] is
//! an ordered field map and also serves as the parameter map of a call; a
//! [`Table`] is an ordered list of structures.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;
use dashu::Decimal;

use crate::decimal;

/// A value of a parameter or field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// INT1, INT2, INT4, INT8 and NUM (when supplied as a number)
    Int(i64),
    /// Binary floating point (FLOAT)
    Float(f64),
    /// Packed and decimal floating point (BCD, DECF16, DECF34), exact at any width
    Decimal(Decimal),
    /// CHAR, NUM, STRING
    Text(String),
    /// BYTE, XSTRING
    Bytes(Vec<u8>),
    /// DATE; `None` is the initial date `00000000`
    Date(Option<NaiveDate>),
    Time(NaiveTime),
    Structure(Structure),
    Table(Table),
}

/// Rows of a table parameter
pub type Table = Vec<Structure>;

impl Value {
    /// Short name of the variant, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Structure(_) => "structure",
            Value::Table(_) => "table",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The date, or `None` for a non-date or the initial date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => *d,
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Value::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&[Structure]> {
        match self {
            Value::Table(rows) => Some(rows),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) => f.write_str(&decimal::to_text(d)),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Date(None) => write!(f, "0000-00-00"),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::Structure(s) => write!(f, "{{{} fields}}", s.len()),
            Value::Table(rows) => write!(f, "[{} rows]", rows.len()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr;)+) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

value_from! {
    u8 => |v| Value::Int(v as i64);
    i16 => |v| Value::Int(v as i64);
    i32 => |v| Value::Int(v as i64);
    i64 => |v| Value::Int(v);
    f64 => |v| Value::Float(v);
    Decimal => |v| Value::Decimal(v);
    String => |v| Value::Text(v);
    &str => |v| Value::Text(v.to_string());
    Vec<u8> => |v| Value::Bytes(v);
    &[u8] => |v| Value::Bytes(v.to_vec());
    NaiveDate => |v| Value::Date(Some(v));
    NaiveTime => |v| Value::Time(v);
    Structure => |v| Value::Structure(v);
    Table => |v| Value::Table(v);
}

/// Ordered field map with ASCII case-insensitive names.
///
/// Names are stored upper-cased, the way the remote system reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    fields: IndexMap<String, Value>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value in place
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.to_ascii_uppercase(), value.into())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(&name.to_ascii_uppercase())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(&name.to_ascii_uppercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Structure {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut structure = Structure::new();
        for (name, value) in iter {
            structure.insert(name.as_ref(), value);
        }
        structure
    }
}

impl IntoIterator for Structure {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_names_are_case_insensitive() {
        let mut s = Structure::new().with("bukrs", "1000");
        assert_eq!(s.get("BUKRS"), Some(&Value::Text("1000".into())));
        assert!(s.contains("Bukrs"));

        s.insert("BUKRS", "2000");
        assert_eq!(s.len(), 1);
        assert_eq!(s.get("bukrs").and_then(Value::as_str), Some("2000"));
    }

    #[test]
    fn test_structure_keeps_insertion_order() {
        let s: Structure = [("Z", 1), ("A", 2), ("M", 3)].into_iter().collect();
        assert_eq!(s.names().collect::<Vec<_>>(), vec!["Z", "A", "M"]);

        let mut s = s;
        s.remove("a");
        assert_eq!(s.names().collect::<Vec<_>>(), vec!["Z", "M"]);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(7i32), Value::Int(7));
        assert_eq!(Value::from(255u8).as_int(), Some(255));
        let d = decimal::parse("12.50").unwrap();
        assert_eq!(Value::from(d.clone()).as_decimal(), Some(&d));
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::from(date).as_date(), Some(date));
        assert_eq!(Value::Date(None).as_date(), None);
        assert_eq!(Value::from(vec![Structure::new()]).as_table().map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Bytes(vec![0xDE, 0xAD]).to_string(), "DEAD");
        assert_eq!(Value::Date(None).to_string(), "0000-00-00");
        let wide = "-1234567890123456789012345678901.5";
        assert_eq!(Value::Decimal(decimal::parse(wide).unwrap()).to_string(), wide);
        let t = NaiveTime::from_hms_opt(13, 5, 9).unwrap();
        assert_eq!(Value::Time(t).to_string(), "13:05:09");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Text(String::new()).kind_name(), "text");
        assert_eq!(Value::Table(Vec::new()).kind_name(), "table");
    }
}

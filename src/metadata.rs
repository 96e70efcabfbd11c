//! Function Metadata
//!
//! Descriptors for remote function modules, discovered from the RFC library
//! at runtime and cached per connection by function name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{SapError, SapResult};
use crate::ffi::{
    ConnectionHandle, FunctionDescHandle, RfcDirection, RfcFieldDesc, RfcInterop,
    RfcParameterDesc, RfcType, TypeDescHandle,
};

/// Parameter direction, seen from the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Import,
    Export,
    Changing,
    Tables,
}

impl Direction {
    /// Whether a caller may supply a value
    pub fn is_input(self) -> bool {
        !matches!(self, Direction::Export)
    }

    /// Whether the value is read back after the call
    pub fn is_output(self) -> bool {
        !matches!(self, Direction::Import)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Import => "import",
            Direction::Export => "export",
            Direction::Changing => "changing",
            Direction::Tables => "tables",
        }
    }
}

impl From<RfcDirection> for Direction {
    fn from(direction: RfcDirection) -> Self {
        match direction {
            RfcDirection::Import => Direction::Import,
            RfcDirection::Export => Direction::Export,
            RfcDirection::Changing => Direction::Changing,
            RfcDirection::Tables => Direction::Tables,
        }
    }
}

/// Integer field widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// INT1, unsigned
    Int1,
    Int2,
    Int4,
    Int8,
}

impl IntWidth {
    /// Inclusive bounds
    pub fn range(self) -> (i64, i64) {
        match self {
            IntWidth::Int1 => (0, u8::MAX as i64),
            IntWidth::Int2 => (i16::MIN as i64, i16::MAX as i64),
            IntWidth::Int4 => (i32::MIN as i64, i32::MAX as i64),
            IntWidth::Int8 => (i64::MIN, i64::MAX),
        }
    }
}

/// What a parameter or field accepts, derived from its native type
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// CHAR (`fixed`, trailing blanks trimmed on read), STRING, UTCLONG
    Text { max_chars: Option<usize>, fixed: bool },
    /// NUM: digits only
    Numeric { digits: usize },
    Integer(IntWidth),
    Float,
    /// BCD has a fixed scale; DECF16/DECF34 have `scale: None`
    Decimal { max_digits: u32, scale: Option<u32> },
    /// BYTE has a length; XSTRING is unbounded
    Bytes { length: Option<usize> },
    Date,
    Time,
    Structure(Arc<TypeDescriptor>),
    Table(Arc<TypeDescriptor>),
    Unsupported(RfcType),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Text {
                max_chars: Some(n), ..
            } => write!(f, "text({})", n),
            ValueKind::Text { max_chars: None, .. } => write!(f, "text"),
            ValueKind::Numeric { digits } => write!(f, "numeric text({})", digits),
            ValueKind::Integer(width) => write!(f, "integer ({:?})", width),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Decimal {
                max_digits,
                scale: Some(s),
            } => write!(f, "decimal({},{})", max_digits, s),
            ValueKind::Decimal {
                max_digits,
                scale: None,
            } => write!(f, "decimal({})", max_digits),
            ValueKind::Bytes { length: Some(n) } => write!(f, "bytes({})", n),
            ValueKind::Bytes { length: None } => write!(f, "bytes"),
            ValueKind::Date => write!(f, "date"),
            ValueKind::Time => write!(f, "time"),
            ValueKind::Structure(_) => write!(f, "structure"),
            ValueKind::Table(_) => write!(f, "table"),
            ValueKind::Unsupported(t) => write!(f, "{}", t),
        }
    }
}

/// A field of a structure or table row
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub rfc_type: RfcType,
    pub kind: ValueKind,
    pub nuc_length: u32,
    pub decimals: u32,
}

/// Shape of a structure or table row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDescriptor {
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// A parameter of a function module
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub rfc_type: RfcType,
    pub direction: Direction,
    pub kind: ValueKind,
    pub nuc_length: u32,
    pub decimals: u32,
    pub optional: bool,
    pub default_value: String,
    pub description: String,
}

/// Parameter list of a function module
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    handle: FunctionDescHandle,
}

impl FunctionDescriptor {
    /// Native description handle, owned by the RFC library's metadata cache
    pub fn handle(&self) -> FunctionDescHandle {
        self.handle
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn inputs(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| p.direction.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| p.direction.is_output())
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Look up `name` and resolve its parameters and nested types
pub(crate) fn discover(
    interop: &dyn RfcInterop,
    connection: ConnectionHandle,
    name: &str,
) -> SapResult<FunctionDescriptor> {
    let name = name.to_ascii_uppercase();
    let handle = interop.get_function_desc(connection, &name)?;
    let mut resolver = TypeResolver {
        interop,
        resolved: HashMap::new(),
    };

    let count = interop.get_parameter_count(handle)?;
    let mut parameters = Vec::with_capacity(count as usize);
    for index in 0..count {
        let desc = interop.get_parameter_desc_by_index(handle, index)?;
        parameters.push(resolver.parameter(desc)?);
    }

    Ok(FunctionDescriptor {
        name,
        parameters,
        handle,
    })
}

/// Resolves type descriptions once per handle within one discovery
struct TypeResolver<'a> {
    interop: &'a dyn RfcInterop,
    resolved: HashMap<TypeDescHandle, Arc<TypeDescriptor>>,
}

impl TypeResolver<'_> {
    fn parameter(&mut self, desc: RfcParameterDesc) -> SapResult<ParameterDescriptor> {
        let kind = self.kind(
            &desc.name,
            desc.rfc_type,
            desc.nuc_length,
            desc.decimals,
            desc.type_desc,
        )?;
        Ok(ParameterDescriptor {
            name: desc.name,
            rfc_type: desc.rfc_type,
            direction: desc.direction.into(),
            kind,
            nuc_length: desc.nuc_length,
            decimals: desc.decimals,
            optional: desc.optional,
            default_value: desc.default_value,
            description: desc.description,
        })
    }

    fn field(&mut self, desc: RfcFieldDesc) -> SapResult<FieldDescriptor> {
        let kind = self.kind(
            &desc.name,
            desc.rfc_type,
            desc.nuc_length,
            desc.decimals,
            desc.type_desc,
        )?;
        Ok(FieldDescriptor {
            name: desc.name,
            rfc_type: desc.rfc_type,
            kind,
            nuc_length: desc.nuc_length,
            decimals: desc.decimals,
        })
    }

    fn kind(
        &mut self,
        name: &str,
        rfc_type: RfcType,
        nuc_length: u32,
        decimals: u32,
        type_desc: Option<TypeDescHandle>,
    ) -> SapResult<ValueKind> {
        let kind = match rfc_type {
            RfcType::Char => ValueKind::Text {
                max_chars: Some(nuc_length as usize),
                fixed: true,
            },
            RfcType::String | RfcType::UtcLong => ValueKind::Text {
                max_chars: None,
                fixed: false,
            },
            RfcType::Num => ValueKind::Numeric {
                digits: nuc_length as usize,
            },
            RfcType::Int1 => ValueKind::Integer(IntWidth::Int1),
            RfcType::Int2 => ValueKind::Integer(IntWidth::Int2),
            RfcType::Int => ValueKind::Integer(IntWidth::Int4),
            RfcType::Int8 => ValueKind::Integer(IntWidth::Int8),
            // Integer-based timestamps, dates and durations
            RfcType::UtcSecond | RfcType::UtcMinute => ValueKind::Integer(IntWidth::Int8),
            RfcType::DtDay | RfcType::DtWeek | RfcType::DtMonth | RfcType::TSecond => {
                ValueKind::Integer(IntWidth::Int4)
            }
            RfcType::TMinute | RfcType::CDay => ValueKind::Integer(IntWidth::Int2),
            RfcType::Float => ValueKind::Float,
            RfcType::Bcd => ValueKind::Decimal {
                max_digits: (2 * nuc_length).saturating_sub(1),
                scale: Some(decimals),
            },
            RfcType::Decf16 => ValueKind::Decimal {
                max_digits: 16,
                scale: None,
            },
            RfcType::Decf34 => ValueKind::Decimal {
                max_digits: 34,
                scale: None,
            },
            RfcType::Byte => ValueKind::Bytes {
                length: Some(nuc_length as usize),
            },
            RfcType::XString => ValueKind::Bytes { length: None },
            RfcType::Date => ValueKind::Date,
            RfcType::Time => ValueKind::Time,
            RfcType::Structure | RfcType::Table => {
                let handle = type_desc.ok_or_else(|| SapError::InvalidNativeValue {
                    path: name.to_string(),
                    detail: format!("{} without a type description", rfc_type),
                })?;
                let nested = self.resolve(handle)?;
                if rfc_type == RfcType::Structure {
                    ValueKind::Structure(nested)
                } else {
                    ValueKind::Table(nested)
                }
            }
            other => ValueKind::Unsupported(other),
        };
        Ok(kind)
    }

    fn resolve(&mut self, handle: TypeDescHandle) -> SapResult<Arc<TypeDescriptor>> {
        if let Some(known) = self.resolved.get(&handle) {
            return Ok(Arc::clone(known));
        }
        let count = self.interop.get_field_count(handle)?;
        let mut fields = Vec::with_capacity(count as usize);
        for index in 0..count {
            let desc = self.interop.get_field_desc_by_index(handle, index)?;
            fields.push(self.field(desc)?);
        }
        let resolved = Arc::new(TypeDescriptor { fields });
        self.resolved.insert(handle, Arc::clone(&resolved));
        Ok(resolved)
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Descriptors by upper-cased function name; filled once per name
#[derive(Debug, Clone, Default)]
pub(crate) struct DescriptorCache {
    entries: Arc<RwLock<HashMap<String, Arc<FunctionDescriptor>>>>,
}

impl DescriptorCache {
    pub fn get(&self, name: &str) -> Option<Arc<FunctionDescriptor>> {
        self.entries.read().get(&name.to_ascii_uppercase()).cloned()
    }

    /// Insert unless another caller got there first; returns the cached entry
    pub fn insert(&self, descriptor: FunctionDescriptor) -> Arc<FunctionDescriptor> {
        let mut entries = self.entries.write();
        Arc::clone(
            entries
                .entry(descriptor.name.clone())
                .or_insert_with(|| Arc::new(descriptor)),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;
    use crate::ffi::fake::{field, parameter, FakeRfc};

    fn connect(fake: &FakeRfc) -> ConnectionHandle {
        fake.open_connection(&[]).unwrap()
    }

    #[test]
    fn test_direction_inputs_and_outputs() {
        assert!(Direction::Import.is_input() && !Direction::Import.is_output());
        assert!(!Direction::Export.is_input() && Direction::Export.is_output());
        assert!(Direction::Changing.is_input() && Direction::Changing.is_output());
        assert!(Direction::Tables.is_input() && Direction::Tables.is_output());
    }

    #[test]
    fn test_int_width_ranges() {
        assert_eq!(IntWidth::Int1.range(), (0, 255));
        assert_eq!(IntWidth::Int2.range(), (-32768, 32767));
        assert_eq!(IntWidth::Int4.range().1, i32::MAX as i64);
    }

    #[test]
    fn test_discover_scalar_kinds() {
        let fake = FakeRfc::new();
        fake.define_function(
            "Z_KINDS",
            vec![
                parameter("C", RfcType::Char, RfcDirection::Import, 10),
                parameter("N", RfcType::Num, RfcDirection::Import, 6),
                RfcParameterDesc {
                    decimals: 2,
                    ..parameter("P", RfcType::Bcd, RfcDirection::Import, 7)
                },
                parameter("D", RfcType::Decf34, RfcDirection::Export, 16),
                parameter("B", RfcType::Byte, RfcDirection::Import, 16),
                parameter("X", RfcType::XString, RfcDirection::Export, 8),
                parameter("I1", RfcType::Int1, RfcDirection::Import, 1),
                parameter("O", RfcType::AbapObject, RfcDirection::Export, 8),
            ],
            |_| Ok(()),
        );
        let conn = connect(&fake);
        let desc = discover(&fake, conn, "z_kinds").unwrap();

        assert_eq!(desc.name, "Z_KINDS");
        let kind = |name: &str| desc.parameter(name).unwrap().kind.clone();
        assert_eq!(
            kind("C"),
            ValueKind::Text {
                max_chars: Some(10),
                fixed: true
            }
        );
        assert_eq!(kind("N"), ValueKind::Numeric { digits: 6 });
        assert_eq!(
            kind("P"),
            ValueKind::Decimal {
                max_digits: 13,
                scale: Some(2)
            }
        );
        assert_eq!(
            kind("D"),
            ValueKind::Decimal {
                max_digits: 34,
                scale: None
            }
        );
        assert_eq!(kind("B"), ValueKind::Bytes { length: Some(16) });
        assert_eq!(kind("X"), ValueKind::Bytes { length: None });
        assert_eq!(kind("i1"), ValueKind::Integer(IntWidth::Int1));
        assert_eq!(kind("O"), ValueKind::Unsupported(RfcType::AbapObject));

        assert_eq!(desc.inputs().count(), 5);
        assert_eq!(desc.outputs().count(), 3);
    }

    #[test]
    fn test_discover_integer_based_time_types() {
        let fake = FakeRfc::new();
        fake.define_function(
            "Z_CLOCK",
            vec![
                parameter("STAMP", RfcType::UtcSecond, RfcDirection::Export, 8),
                parameter("MINUTES", RfcType::UtcMinute, RfcDirection::Export, 8),
                parameter("DAY", RfcType::DtDay, RfcDirection::Export, 4),
                parameter("SECONDS", RfcType::TSecond, RfcDirection::Export, 4),
                parameter("TMIN", RfcType::TMinute, RfcDirection::Export, 2),
                parameter("CAL", RfcType::CDay, RfcDirection::Export, 2),
            ],
            |_| Ok(()),
        );
        let conn = connect(&fake);
        let desc = discover(&fake, conn, "Z_CLOCK").unwrap();
        let kind = |name: &str| desc.parameter(name).unwrap().kind.clone();

        assert_eq!(kind("STAMP"), ValueKind::Integer(IntWidth::Int8));
        assert_eq!(kind("MINUTES"), ValueKind::Integer(IntWidth::Int8));
        assert_eq!(kind("DAY"), ValueKind::Integer(IntWidth::Int4));
        assert_eq!(kind("SECONDS"), ValueKind::Integer(IntWidth::Int4));
        assert_eq!(kind("TMIN"), ValueKind::Integer(IntWidth::Int2));
        assert_eq!(kind("CAL"), ValueKind::Integer(IntWidth::Int2));
    }

    #[test]
    fn test_discover_nested_types_once() {
        let fake = FakeRfc::new();
        let row = fake.define_type(vec![
            field("MATNR", RfcType::Char, 18),
            field("MENGE", RfcType::Bcd, 7),
        ]);
        fake.define_function(
            "Z_NESTED",
            vec![
                RfcParameterDesc {
                    type_desc: Some(row),
                    ..parameter("HEADER", RfcType::Structure, RfcDirection::Import, 25)
                },
                RfcParameterDesc {
                    type_desc: Some(row),
                    ..parameter("ITEMS", RfcType::Table, RfcDirection::Tables, 25)
                },
            ],
            |_| Ok(()),
        );
        let conn = connect(&fake);
        let desc = discover(&fake, conn, "Z_NESTED").unwrap();

        match (&desc.parameters[0].kind, &desc.parameters[1].kind) {
            (ValueKind::Structure(a), ValueKind::Table(b)) => {
                assert!(Arc::ptr_eq(a, b));
                assert_eq!(a.fields.len(), 2);
                assert!(a.field("matnr").is_some());
            }
            other => panic!("unexpected kinds {:?}", other),
        }
        assert_eq!(fake.calls("get_field_count"), 1);
    }

    #[test]
    fn test_discover_missing_type_description() {
        let fake = FakeRfc::new();
        fake.define_function(
            "Z_BROKEN",
            vec![parameter("S", RfcType::Structure, RfcDirection::Import, 4)],
            |_| Ok(()),
        );
        let conn = connect(&fake);
        let err = discover(&fake, conn, "Z_BROKEN").unwrap_err();
        assert!(matches!(err, SapError::InvalidNativeValue { .. }));
    }

    #[test]
    fn test_discover_unknown_function() {
        let fake = FakeRfc::new();
        let conn = connect(&fake);
        let err = discover(&fake, conn, "Z_MISSING").unwrap_err();
        assert_eq!(err.result_code(), Some(ResultCode::NotFound));
    }

    #[test]
    fn test_cache_keeps_first_entry() {
        let fake = FakeRfc::new();
        fake.define_function("Z_A", Vec::new(), |_| Ok(()));
        let conn = connect(&fake);
        let cache = DescriptorCache::default();

        let first = cache.insert(discover(&fake, conn, "Z_A").unwrap());
        let second = cache.insert(discover(&fake, conn, "z_a").unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.get("z_A").is_some());
        assert_eq!(cache.len(), 1);
    }
}

//! In-memory RFC Library
//!
//! A stateful [`RfcInterop`] that needs no SDK: functions are registered with
//! their parameter list and a handler closure, call objects and tables live
//! in memory, and every entry point is logged so tests can count calls.
//!
//! # Example
//!
//! ```ignore
//! let fake = FakeRfc::new();
//! fake.define_function(
//!     "STFC_CONNECTION",
//!     vec![
//!         parameter("REQUTEXT", RfcType::Char, RfcDirection::Import, 255),
//!         parameter("ECHOTEXT", RfcType::Char, RfcDirection::Export, 255),
//!     ],
//!     |frame| {
//!         let text = frame["REQUTEXT"].clone();
//!         frame.insert("ECHOTEXT".into(), text);
//!         Ok(())
//!     },
//! );
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{
    from_sap_uc, to_fixed, to_sap_uc, ConnectionHandle, DataHandle, FunctionDescHandle,
    FunctionHandle, RfcAttributes, RfcDate, RfcDirection, RfcFieldDesc, RfcInterop,
    RfcParameterDesc, RfcResult, RfcTime, RfcType, SapUc, TableHandle, TypeDescHandle,
};
use crate::error::{ErrorGroup, ErrorInfo, ResultCode};

/// A field value as a registered handler sees it
#[derive(Debug, Clone, PartialEq)]
pub enum FakeValue {
    Int(i64),
    Float(f64),
    /// CHAR, NUM, STRING and decimal fields, in their text form
    Text(String),
    Bytes(Vec<u8>),
    /// `YYYYMMDD`
    Date(String),
    /// `HHMMSS`
    Time(String),
    Structure(FakeRecord),
    Table(Vec<FakeRecord>),
}

/// Field name to value, in declaration order
pub type FakeRecord = IndexMap<String, FakeValue>;

type Handler = Arc<dyn Fn(&mut FakeRecord) -> Result<(), ErrorInfo> + Send + Sync>;

/// Build a parameter description
pub fn parameter(
    name: &str,
    rfc_type: RfcType,
    direction: RfcDirection,
    nuc_length: u32,
) -> RfcParameterDesc {
    RfcParameterDesc {
        name: name.to_string(),
        rfc_type,
        direction,
        nuc_length,
        uc_length: nuc_length * 2,
        decimals: 0,
        type_desc: None,
        default_value: String::new(),
        description: String::new(),
        optional: false,
    }
}

/// Build a field description
pub fn field(name: &str, rfc_type: RfcType, nuc_length: u32) -> RfcFieldDesc {
    RfcFieldDesc {
        name: name.to_string(),
        rfc_type,
        nuc_length,
        nuc_offset: 0,
        uc_length: nuc_length * 2,
        uc_offset: 0,
        decimals: 0,
        type_desc: None,
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    rfc_type: RfcType,
    nuc_length: u32,
    type_desc: Option<TypeDescHandle>,
}

impl From<&RfcParameterDesc> for Slot {
    fn from(p: &RfcParameterDesc) -> Self {
        Slot {
            name: p.name.clone(),
            rfc_type: p.rfc_type,
            nuc_length: p.nuc_length,
            type_desc: p.type_desc,
        }
    }
}

impl From<&RfcFieldDesc> for Slot {
    fn from(f: &RfcFieldDesc) -> Self {
        Slot {
            name: f.name.clone(),
            rfc_type: f.rfc_type,
            nuc_length: f.nuc_length,
            type_desc: f.type_desc,
        }
    }
}

#[derive(Debug, Clone)]
enum Field {
    Int(i64),
    Float(f64),
    Text(Vec<SapUc>),
    Bytes(Vec<u8>),
    Date(RfcDate),
    Time(RfcTime),
    Structure(usize),
    Table(usize),
}

#[derive(Debug, Default)]
struct Container {
    schema: Vec<Slot>,
    fields: HashMap<String, Field>,
}

#[derive(Debug)]
struct Table {
    row_type: Option<TypeDescHandle>,
    rows: Vec<usize>,
    cursor: Option<usize>,
}

struct FakeFunction {
    parameters: Vec<RfcParameterDesc>,
    handler: Handler,
    desc: usize,
}

#[derive(Default)]
struct FakeState {
    next_handle: usize,
    connections: HashMap<usize, bool>,
    functions: HashMap<String, FakeFunction>,
    descs: HashMap<usize, String>,
    type_descs: HashMap<usize, Vec<RfcFieldDesc>>,
    containers: HashMap<usize, Container>,
    tables: HashMap<usize, Table>,
    live_functions: HashMap<usize, String>,
    calls: Vec<&'static str>,
    failures: HashMap<&'static str, ErrorInfo>,
    attributes: RfcAttributes,
}

fn not_found(what: &str) -> ErrorInfo {
    ErrorInfo::new(ResultCode::InvalidHandle, format!("{} not found", what))
}

fn no_field(name: &str) -> ErrorInfo {
    ErrorInfo::new(
        ResultCode::InvalidParameter,
        format!("field '{}' not found", name),
    )
}

impl FakeState {
    fn alloc(&mut self) -> usize {
        self.next_handle += 1;
        // Spread handles out so different kinds never collide by accident
        self.next_handle * 16
    }

    fn schema_of(&self, type_desc: Option<TypeDescHandle>) -> Vec<Slot> {
        type_desc
            .and_then(|td| self.type_descs.get(&td.as_raw()))
            .map(|fields| fields.iter().map(Slot::from).collect())
            .unwrap_or_default()
    }

    fn new_container(&mut self, schema: Vec<Slot>) -> usize {
        let handle = self.alloc();
        self.containers.insert(
            handle,
            Container {
                schema,
                fields: HashMap::new(),
            },
        );
        handle
    }

    fn slot(&self, container: usize, name: &str) -> RfcResult<Slot> {
        let c = self
            .containers
            .get(&container)
            .ok_or_else(|| not_found("container"))?;
        c.schema
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| no_field(name))
    }

    fn field(&self, container: usize, name: &str) -> RfcResult<(Slot, Option<Field>)> {
        let slot = self.slot(container, name)?;
        let value = self
            .containers
            .get(&container)
            .and_then(|c| c.fields.get(&slot.name))
            .cloned();
        Ok((slot, value))
    }

    fn store(&mut self, container: usize, name: &str, value: Field) -> RfcResult<()> {
        let slot = self.slot(container, name)?;
        if let Some(c) = self.containers.get_mut(&container) {
            c.fields.insert(slot.name, value);
        }
        Ok(())
    }

    fn structure(&mut self, container: usize, name: &str) -> RfcResult<usize> {
        let (slot, value) = self.field(container, name)?;
        if slot.rfc_type != RfcType::Structure {
            return Err(ErrorInfo::new(
                ResultCode::InvalidParameter,
                format!("field '{}' is not a structure", name),
            ));
        }
        if let Some(Field::Structure(handle)) = value {
            return Ok(handle);
        }
        let schema = self.schema_of(slot.type_desc);
        let handle = self.new_container(schema);
        self.store(container, name, Field::Structure(handle))?;
        Ok(handle)
    }

    fn table(&mut self, container: usize, name: &str) -> RfcResult<usize> {
        let (slot, value) = self.field(container, name)?;
        if slot.rfc_type != RfcType::Table {
            return Err(ErrorInfo::new(
                ResultCode::InvalidParameter,
                format!("field '{}' is not a table", name),
            ));
        }
        if let Some(Field::Table(handle)) = value {
            return Ok(handle);
        }
        let handle = self.alloc();
        self.tables.insert(
            handle,
            Table {
                row_type: slot.type_desc,
                rows: Vec::new(),
                cursor: None,
            },
        );
        self.store(container, name, Field::Table(handle))?;
        Ok(handle)
    }

    fn append_row(&mut self, table: usize) -> RfcResult<usize> {
        let row_type = self
            .tables
            .get(&table)
            .ok_or_else(|| not_found("table"))?
            .row_type;
        let schema = self.schema_of(row_type);
        let row = self.new_container(schema);
        if let Some(t) = self.tables.get_mut(&table) {
            t.rows.push(row);
            t.cursor = Some(t.rows.len() - 1);
        }
        Ok(row)
    }

    fn snapshot(&mut self, container: usize) -> RfcResult<FakeRecord> {
        let schema = self
            .containers
            .get(&container)
            .ok_or_else(|| not_found("container"))?
            .schema
            .clone();
        let mut record = FakeRecord::new();
        for slot in schema {
            let (_, stored) = self.field(container, &slot.name)?;
            let value = match slot.rfc_type {
                RfcType::Structure => {
                    let child = self.structure(container, &slot.name)?;
                    FakeValue::Structure(self.snapshot(child)?)
                }
                RfcType::Table => {
                    let table = self.table(container, &slot.name)?;
                    let rows = self.tables.get(&table).map(|t| t.rows.clone()).unwrap_or_default();
                    let mut out = Vec::with_capacity(rows.len());
                    for row in rows {
                        out.push(self.snapshot(row)?);
                    }
                    FakeValue::Table(out)
                }
                RfcType::Int
                | RfcType::Int1
                | RfcType::Int2
                | RfcType::Int8
                | RfcType::UtcSecond
                | RfcType::UtcMinute
                | RfcType::DtDay
                | RfcType::DtWeek
                | RfcType::DtMonth
                | RfcType::TSecond
                | RfcType::TMinute
                | RfcType::CDay => FakeValue::Int(int_of(stored.as_ref())),
                RfcType::Float => FakeValue::Float(match stored {
                    Some(Field::Float(f)) => f,
                    _ => 0.0,
                }),
                RfcType::Byte | RfcType::XString => {
                    FakeValue::Bytes(bytes_of(stored.as_ref(), &slot))
                }
                RfcType::Date => FakeValue::Date(from_sap_uc(&date_of(stored.as_ref()))),
                RfcType::Time => FakeValue::Time(from_sap_uc(&time_of(stored.as_ref()))),
                _ => FakeValue::Text(from_sap_uc(&text_of(stored.as_ref()))),
            };
            record.insert(slot.name.clone(), value);
        }
        Ok(record)
    }

    fn restore(&mut self, container: usize, record: &FakeRecord) -> RfcResult<()> {
        for (name, value) in record {
            match value {
                FakeValue::Structure(fields) => {
                    let child = self.structure(container, name)?;
                    self.restore(child, fields)?;
                }
                FakeValue::Table(rows) => {
                    let table = self.table(container, name)?;
                    if let Some(t) = self.tables.get_mut(&table) {
                        t.rows.clear();
                        t.cursor = None;
                    }
                    for row in rows {
                        let handle = self.append_row(table)?;
                        self.restore(handle, row)?;
                    }
                }
                FakeValue::Int(i) => self.store(container, name, Field::Int(*i))?,
                FakeValue::Float(f) => self.store(container, name, Field::Float(*f))?,
                FakeValue::Text(s) => self.store(container, name, Field::Text(to_sap_uc(s)))?,
                FakeValue::Bytes(b) => self.store(container, name, Field::Bytes(b.clone()))?,
                FakeValue::Date(s) => {
                    let date = to_fixed::<8>(s).unwrap_or(initial_date());
                    self.store(container, name, Field::Date(date))?
                }
                FakeValue::Time(s) => {
                    let time = to_fixed::<6>(s).unwrap_or(initial_time());
                    self.store(container, name, Field::Time(time))?
                }
            }
        }
        Ok(())
    }
}

fn initial_date() -> RfcDate {
    [b'0' as SapUc; 8]
}

fn initial_time() -> RfcTime {
    [b'0' as SapUc; 6]
}

fn int_of(field: Option<&Field>) -> i64 {
    match field {
        Some(Field::Int(i)) => *i,
        Some(Field::Text(t)) => from_sap_uc(t).trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn text_of(field: Option<&Field>) -> Vec<SapUc> {
    match field {
        Some(Field::Text(t)) => t.clone(),
        Some(Field::Int(i)) => to_sap_uc(&i.to_string()),
        Some(Field::Float(f)) => to_sap_uc(&f.to_string()),
        Some(Field::Date(d)) => d.to_vec(),
        Some(Field::Time(t)) => t.to_vec(),
        _ => Vec::new(),
    }
}

fn bytes_of(field: Option<&Field>, slot: &Slot) -> Vec<u8> {
    match (field, slot.rfc_type) {
        (Some(Field::Bytes(b)), RfcType::Byte) => {
            let mut out = b.clone();
            out.resize(slot.nuc_length as usize, 0);
            out
        }
        (Some(Field::Bytes(b)), _) => b.clone(),
        (_, RfcType::Byte) => vec![0; slot.nuc_length as usize],
        _ => Vec::new(),
    }
}

fn date_of(field: Option<&Field>) -> RfcDate {
    match field {
        Some(Field::Date(d)) => *d,
        Some(Field::Text(t)) if t.len() == 8 => {
            let mut d = [0; 8];
            d.copy_from_slice(t);
            d
        }
        _ => initial_date(),
    }
}

fn time_of(field: Option<&Field>) -> RfcTime {
    match field {
        Some(Field::Time(t)) => *t,
        Some(Field::Text(t)) if t.len() == 6 => {
            let mut out = [0; 6];
            out.copy_from_slice(t);
            out
        }
        _ => initial_time(),
    }
}

/// In-memory RFC library for tests
pub struct FakeRfc {
    state: Mutex<FakeState>,
}

impl FakeRfc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Register a structure/table row type
    pub fn define_type(&self, fields: Vec<RfcFieldDesc>) -> TypeDescHandle {
        let mut state = self.state.lock();
        let handle = state.alloc();
        state.type_descs.insert(handle, fields);
        TypeDescHandle::from_raw(handle).expect("fake handles are non-zero")
    }

    /// Register a remote function and the code that runs when it is invoked
    pub fn define_function<F>(&self, name: &str, parameters: Vec<RfcParameterDesc>, handler: F)
    where
        F: Fn(&mut FakeRecord) -> Result<(), ErrorInfo> + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        let desc = state.alloc();
        let key = name.to_ascii_uppercase();
        state.descs.insert(desc, key.clone());
        state.functions.insert(
            key,
            FakeFunction {
                parameters,
                handler: Arc::new(handler),
                desc,
            },
        );
    }

    /// Make every later call to `operation` (a trait method name) fail with `info`
    pub fn fail(&self, operation: &'static str, info: ErrorInfo) {
        self.state.lock().failures.insert(operation, info);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn set_attributes(&self, attributes: RfcAttributes) {
        self.state.lock().attributes = attributes;
    }

    /// Mark every open connection as broken, as after a network drop
    pub fn invalidate_connections(&self) {
        for valid in self.state.lock().connections.values_mut() {
            *valid = false;
        }
    }

    /// How many times `operation` was called
    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| **c == operation)
            .count()
    }

    /// Every call in order
    pub fn call_log(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Call objects created and not yet destroyed
    pub fn live_functions(&self) -> usize {
        self.state.lock().live_functions.len()
    }

    fn enter(&self, operation: &'static str) -> RfcResult<parking_lot::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock();
        state.calls.push(operation);
        match state.failures.get(operation) {
            Some(info) => Err(info.clone()),
            None => Ok(state),
        }
    }
}

impl Default for FakeRfc {
    fn default() -> Self {
        Self::new()
    }
}

fn handle<H>(make: fn(usize) -> Option<H>, raw: usize) -> RfcResult<H> {
    make(raw).ok_or_else(|| not_found("handle"))
}

impl RfcInterop for FakeRfc {
    fn open_connection(&self, _parameters: &[(String, String)]) -> RfcResult<ConnectionHandle> {
        let mut state = self.enter("open_connection")?;
        let conn = state.alloc();
        state.connections.insert(conn, true);
        handle(ConnectionHandle::from_raw, conn)
    }

    fn close_connection(&self, connection: ConnectionHandle) -> RfcResult<()> {
        let mut state = self.enter("close_connection")?;
        state
            .connections
            .remove(&connection.as_raw())
            .map(|_| ())
            .ok_or_else(|| not_found("connection"))
    }

    fn is_connection_handle_valid(&self, connection: ConnectionHandle) -> RfcResult<bool> {
        let state = self.enter("is_connection_handle_valid")?;
        Ok(state
            .connections
            .get(&connection.as_raw())
            .copied()
            .unwrap_or(false))
    }

    fn ping(&self, connection: ConnectionHandle) -> RfcResult<()> {
        let state = self.enter("ping")?;
        match state.connections.get(&connection.as_raw()) {
            Some(true) => Ok(()),
            Some(false) => Err(ErrorInfo::new(ResultCode::CommunicationFailure, "connection lost")
                .with_group(ErrorGroup::CommunicationFailure)),
            None => Err(not_found("connection")),
        }
    }

    fn get_connection_attributes(
        &self,
        _connection: Option<ConnectionHandle>,
    ) -> RfcResult<RfcAttributes> {
        let state = self.enter("get_connection_attributes")?;
        Ok(state.attributes.clone())
    }

    fn get_function_desc(
        &self,
        connection: ConnectionHandle,
        name: &str,
    ) -> RfcResult<FunctionDescHandle> {
        let state = self.enter("get_function_desc")?;
        if !state.connections.contains_key(&connection.as_raw()) {
            return Err(not_found("connection"));
        }
        // Exact match, like the server: callers pass upper-case names
        let function = state.functions.get(name).ok_or_else(|| {
            ErrorInfo::new(ResultCode::NotFound, format!("ID:FL:046 Function {} not found", name))
                .with_group(ErrorGroup::AbapApplicationFailure)
                .with_key("FU_NOT_FOUND")
        })?;
        handle(FunctionDescHandle::from_raw, function.desc)
    }

    fn get_parameter_count(&self, desc: FunctionDescHandle) -> RfcResult<u32> {
        let state = self.enter("get_parameter_count")?;
        let name = state
            .descs
            .get(&desc.as_raw())
            .ok_or_else(|| not_found("function description"))?;
        Ok(state.functions[name].parameters.len() as u32)
    }

    fn get_parameter_desc_by_index(
        &self,
        desc: FunctionDescHandle,
        index: u32,
    ) -> RfcResult<RfcParameterDesc> {
        let state = self.enter("get_parameter_desc_by_index")?;
        let name = state
            .descs
            .get(&desc.as_raw())
            .ok_or_else(|| not_found("function description"))?;
        state.functions[name]
            .parameters
            .get(index as usize)
            .cloned()
            .ok_or_else(|| ErrorInfo::new(ResultCode::InvalidParameter, "index out of range"))
    }

    fn get_field_count(&self, type_desc: TypeDescHandle) -> RfcResult<u32> {
        let state = self.enter("get_field_count")?;
        state
            .type_descs
            .get(&type_desc.as_raw())
            .map(|fields| fields.len() as u32)
            .ok_or_else(|| not_found("type description"))
    }

    fn get_field_desc_by_index(
        &self,
        type_desc: TypeDescHandle,
        index: u32,
    ) -> RfcResult<RfcFieldDesc> {
        let state = self.enter("get_field_desc_by_index")?;
        state
            .type_descs
            .get(&type_desc.as_raw())
            .ok_or_else(|| not_found("type description"))?
            .get(index as usize)
            .cloned()
            .ok_or_else(|| ErrorInfo::new(ResultCode::InvalidParameter, "index out of range"))
    }

    fn create_function(&self, desc: FunctionDescHandle) -> RfcResult<FunctionHandle> {
        let mut state = self.enter("create_function")?;
        let name = state
            .descs
            .get(&desc.as_raw())
            .cloned()
            .ok_or_else(|| not_found("function description"))?;
        let schema = state.functions[&name]
            .parameters
            .iter()
            .map(Slot::from)
            .collect();
        let func = state.new_container(schema);
        state.live_functions.insert(func, name);
        handle(FunctionHandle::from_raw, func)
    }

    fn destroy_function(&self, function: FunctionHandle) -> RfcResult<()> {
        let mut state = self.enter("destroy_function")?;
        state
            .live_functions
            .remove(&function.as_raw())
            .ok_or_else(|| not_found("function"))?;
        state.containers.remove(&function.as_raw());
        Ok(())
    }

    fn invoke(&self, connection: ConnectionHandle, function: FunctionHandle) -> RfcResult<()> {
        let (handler, mut frame) = {
            let mut state = self.enter("invoke")?;
            match state.connections.get(&connection.as_raw()) {
                Some(true) => {}
                Some(false) => {
                    return Err(ErrorInfo::new(ResultCode::CommunicationFailure, "connection lost")
                        .with_group(ErrorGroup::CommunicationFailure))
                }
                None => return Err(not_found("connection")),
            }
            let name = state
                .live_functions
                .get(&function.as_raw())
                .cloned()
                .ok_or_else(|| not_found("function"))?;
            let handler = Arc::clone(&state.functions[&name].handler);
            (handler, state.snapshot(function.as_raw())?)
        };

        handler(&mut frame)?;

        self.state.lock().restore(function.as_raw(), &frame)
    }

    fn set_int(&self, container: DataHandle, name: &str, value: i32) -> RfcResult<()> {
        let mut state = self.enter("set_int")?;
        state.store(container.as_raw(), name, Field::Int(value as i64))
    }

    fn get_int(&self, container: DataHandle, name: &str) -> RfcResult<i32> {
        let state = self.enter("get_int")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        i32::try_from(int_of(value.as_ref()))
            .map_err(|_| ErrorInfo::new(ResultCode::ConversionFailure, "value exceeds RFC_INT"))
    }

    fn set_int8(&self, container: DataHandle, name: &str, value: i64) -> RfcResult<()> {
        let mut state = self.enter("set_int8")?;
        state.store(container.as_raw(), name, Field::Int(value))
    }

    fn get_int8(&self, container: DataHandle, name: &str) -> RfcResult<i64> {
        let state = self.enter("get_int8")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        Ok(int_of(value.as_ref()))
    }

    fn set_float(&self, container: DataHandle, name: &str, value: f64) -> RfcResult<()> {
        let mut state = self.enter("set_float")?;
        state.store(container.as_raw(), name, Field::Float(value))
    }

    fn get_float(&self, container: DataHandle, name: &str) -> RfcResult<f64> {
        let state = self.enter("get_float")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        Ok(match value {
            Some(Field::Float(f)) => f,
            Some(Field::Int(i)) => i as f64,
            _ => 0.0,
        })
    }

    fn set_string(&self, container: DataHandle, name: &str, value: &[SapUc]) -> RfcResult<()> {
        let mut state = self.enter("set_string")?;
        state.store(container.as_raw(), name, Field::Text(value.to_vec()))
    }

    fn get_string(&self, container: DataHandle, name: &str) -> RfcResult<Vec<SapUc>> {
        let state = self.enter("get_string")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        Ok(text_of(value.as_ref()))
    }

    fn set_bytes(&self, container: DataHandle, name: &str, value: &[u8]) -> RfcResult<()> {
        let mut state = self.enter("set_bytes")?;
        state.store(container.as_raw(), name, Field::Bytes(value.to_vec()))
    }

    fn get_bytes(&self, container: DataHandle, name: &str, length: usize) -> RfcResult<Vec<u8>> {
        let state = self.enter("get_bytes")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        let mut bytes = match value {
            Some(Field::Bytes(b)) => b,
            _ => Vec::new(),
        };
        bytes.resize(length, 0);
        Ok(bytes)
    }

    fn set_xstring(&self, container: DataHandle, name: &str, value: &[u8]) -> RfcResult<()> {
        let mut state = self.enter("set_xstring")?;
        state.store(container.as_raw(), name, Field::Bytes(value.to_vec()))
    }

    fn get_xstring(&self, container: DataHandle, name: &str) -> RfcResult<Vec<u8>> {
        let state = self.enter("get_xstring")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        Ok(match value {
            Some(Field::Bytes(b)) => b,
            _ => Vec::new(),
        })
    }

    fn set_date(&self, container: DataHandle, name: &str, value: &RfcDate) -> RfcResult<()> {
        let mut state = self.enter("set_date")?;
        state.store(container.as_raw(), name, Field::Date(*value))
    }

    fn get_date(&self, container: DataHandle, name: &str) -> RfcResult<RfcDate> {
        let state = self.enter("get_date")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        Ok(date_of(value.as_ref()))
    }

    fn set_time(&self, container: DataHandle, name: &str, value: &RfcTime) -> RfcResult<()> {
        let mut state = self.enter("set_time")?;
        state.store(container.as_raw(), name, Field::Time(*value))
    }

    fn get_time(&self, container: DataHandle, name: &str) -> RfcResult<RfcTime> {
        let state = self.enter("get_time")?;
        let (_, value) = state.field(container.as_raw(), name)?;
        Ok(time_of(value.as_ref()))
    }

    fn get_structure(&self, container: DataHandle, name: &str) -> RfcResult<DataHandle> {
        let mut state = self.enter("get_structure")?;
        let child = state.structure(container.as_raw(), name)?;
        handle(DataHandle::from_raw, child)
    }

    fn get_table(&self, container: DataHandle, name: &str) -> RfcResult<TableHandle> {
        let mut state = self.enter("get_table")?;
        let table = state.table(container.as_raw(), name)?;
        handle(TableHandle::from_raw, table)
    }

    fn append_new_row(&self, table: TableHandle) -> RfcResult<DataHandle> {
        let mut state = self.enter("append_new_row")?;
        let row = state.append_row(table.as_raw())?;
        handle(DataHandle::from_raw, row)
    }

    fn get_row_count(&self, table: TableHandle) -> RfcResult<u32> {
        let state = self.enter("get_row_count")?;
        state
            .tables
            .get(&table.as_raw())
            .map(|t| t.rows.len() as u32)
            .ok_or_else(|| not_found("table"))
    }

    fn move_to(&self, table: TableHandle, index: u32) -> RfcResult<()> {
        let mut state = self.enter("move_to")?;
        let t = state
            .tables
            .get_mut(&table.as_raw())
            .ok_or_else(|| not_found("table"))?;
        if index as usize >= t.rows.len() {
            return Err(ErrorInfo::new(ResultCode::TableMoveEof, "index past last row"));
        }
        t.cursor = Some(index as usize);
        Ok(())
    }

    fn get_current_row(&self, table: TableHandle) -> RfcResult<DataHandle> {
        let state = self.enter("get_current_row")?;
        let t = state
            .tables
            .get(&table.as_raw())
            .ok_or_else(|| not_found("table"))?;
        let row = t
            .cursor
            .and_then(|i| t.rows.get(i).copied())
            .ok_or_else(|| ErrorInfo::new(ResultCode::TableMoveEof, "no current row"))?;
        handle(DataHandle::from_raw, row)
    }
}

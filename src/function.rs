//! Function Invocation
//!
//! A [`Function`] is one call of a remote function module: a native call
//! object created from a cached descriptor, borrowed from its
//! [`Connection`]. It is consumed by [`Function::invoke`] and the call
//! object is destroyed when it drops, whether or not the call succeeded.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{SapError, SapResult};
use crate::ffi::{DataHandle, FunctionHandle};
use crate::marshal;
use crate::metadata::{FunctionDescriptor, ParameterDescriptor};
use crate::value::{Structure, Value};

/// One pending call of a remote function module
pub struct Function<'conn> {
    connection: &'conn Connection,
    descriptor: Arc<FunctionDescriptor>,
    handle: FunctionHandle,
}

impl<'conn> Function<'conn> {
    pub(crate) fn new(
        connection: &'conn Connection,
        descriptor: Arc<FunctionDescriptor>,
        handle: FunctionHandle,
    ) -> Self {
        Self {
            connection,
            descriptor,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Run the function with `inputs` (parameter name to value).
    ///
    /// Every input is checked against the descriptor before anything is
    /// written. On success the result holds every export, changing and
    /// tables parameter in declaration order. A failed call returns no
    /// partial result.
    pub fn invoke(self, inputs: &Structure) -> SapResult<Structure> {
        let mut assigned: Vec<(&ParameterDescriptor, &Value)> = Vec::with_capacity(inputs.len());
        for (name, value) in inputs.iter() {
            let parameter =
                self.descriptor
                    .parameter(name)
                    .ok_or_else(|| SapError::UnknownParameter {
                        function: self.descriptor.name.clone(),
                        parameter: name.to_string(),
                    })?;
            if !parameter.direction.is_input() {
                return Err(SapError::NotAnInput {
                    parameter: parameter.name.clone(),
                });
            }
            marshal::check(&parameter.kind, value, &parameter.name)?;
            assigned.push((parameter, value));
        }

        let connection = self.connection.handle()?;
        let interop = self.connection.interop();
        let data = DataHandle::from(self.handle);

        for (parameter, value) in assigned {
            marshal::to_native(
                interop,
                data,
                &parameter.name,
                &parameter.kind,
                value,
                &parameter.name,
            )?;
        }

        debug!(function = %self.descriptor.name, inputs = inputs.len(), "invoking");
        interop.invoke(connection, self.handle)?;

        let mut outputs = Structure::new();
        for parameter in self.descriptor.outputs() {
            let value =
                marshal::from_native(interop, data, &parameter.name, &parameter.kind, &parameter.name)?;
            outputs.insert(&parameter.name, value);
        }
        debug!(function = %self.descriptor.name, outputs = outputs.len(), "invocation finished");
        Ok(outputs)
    }
}

impl Drop for Function<'_> {
    fn drop(&mut self) {
        if let Err(info) = self.connection.interop().destroy_function(self.handle) {
            warn!(
                function = %self.descriptor.name,
                error = %SapError::from(info),
                "failed to release function call object"
            );
        }
    }
}

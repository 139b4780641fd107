//! JSON Schema generation for registered operations
//!
//! Each operation registered on a gateway carries a descriptor: its wire
//! name, its ordered parameter names with the schema of each parameter type,
//! and the schema of its result. Descriptors back the per-store catalog.

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::{Arguments, ParamNames};

/// Descriptor of a single parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Declared name, absent when the operation declares no usable names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// JSON schema of the parameter type
    pub schema: Value,
}

/// Descriptor of a registered operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Wire name of the operation
    pub name: String,
    /// Parameters in signature order
    pub parameters: Vec<ParameterDescriptor>,
    /// JSON schema of the result
    pub returns: Value,
}

impl OperationDescriptor {
    /// Describe an operation from its argument tuple and output type
    pub fn new<Args, O>(name: &str, names: &ParamNames) -> Self
    where
        Args: Arguments,
        O: JsonSchema,
    {
        let declared = names
            .resolve(name, Args::ARITY)
            .ok()
            .map(|names| names.to_vec());

        let parameters = Args::schemas()
            .into_iter()
            .enumerate()
            .map(|(i, schema)| ParameterDescriptor {
                name: declared
                    .as_ref()
                    .and_then(|names| names.get(i))
                    .map(|name| name.to_string()),
                schema,
            })
            .collect();

        Self {
            name: name.to_string(),
            parameters,
            returns: serde_json::to_value(schema_for!(O)).unwrap_or(Value::Null),
        }
    }

    /// Parameter names in order, skipping undeclared ones
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter_map(|param| param.name.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(JsonSchema, Deserialize, Default)]
    struct TestRecord {
        guid: Option<String>,
        #[serde(default)]
        active: bool,
    }

    #[test]
    fn test_describe_operation() {
        let names = ParamNames::from(["guid", "record"]);
        let descriptor = OperationDescriptor::new::<(String, TestRecord), bool>("update", &names);

        assert_eq!(descriptor.name, "update");
        assert_eq!(descriptor.parameter_names(), vec!["guid", "record"]);
        assert!(descriptor.parameters[1].schema.is_object());
        assert!(descriptor.returns.is_object());
    }

    #[test]
    fn test_describe_operation_without_usable_names() {
        let names = ParamNames::from(["guid"]);
        let descriptor = OperationDescriptor::new::<(String, TestRecord), bool>("update", &names);

        assert_eq!(descriptor.parameters.len(), 2);
        assert!(descriptor.parameter_names().is_empty());
    }
}

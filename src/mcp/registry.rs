//! Tool registry
//!
//! Descriptors are collected once through [`ToolRegistryBuilder`] at startup. The
//! built [`ToolRegistry`] has no mutating methods and is shared by `Arc`.

use std::collections::HashSet;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{ConfigError, McpError, Result};

/// JSON type of a schema property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
    Boolean,
}

impl PropertyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Integer => value.is_i64() || value.is_u64(),
            PropertyType::Boolean => value.is_boolean(),
        }
    }
}

/// One property of a tool's input schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProperty {
    pub name: String,
    pub property_type: PropertyType,
    pub description: String,
    pub required: bool,
}

/// Input schema, kept in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSchema {
    properties: Vec<SchemaProperty>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required property
    pub fn required(self, name: &str, property_type: PropertyType, description: &str) -> Self {
        self.property(name, property_type, description, true)
    }

    /// Add an optional property
    pub fn optional(self, name: &str, property_type: PropertyType, description: &str) -> Self {
        self.property(name, property_type, description, false)
    }

    fn property(
        mut self,
        name: &str,
        property_type: PropertyType,
        description: &str,
        required: bool,
    ) -> Self {
        self.properties.push(SchemaProperty {
            name: name.to_string(),
            property_type,
            description: description.to_string(),
            required,
        });
        self
    }

    pub fn properties(&self) -> &[SchemaProperty] {
        &self.properties
    }

    /// Check call arguments against the schema.
    ///
    /// Required properties must be present and non-null; any declared property
    /// that is present must have the declared type. Undeclared keys are ignored.
    pub fn validate(&self, arguments: &Map<String, Value>) -> std::result::Result<(), McpError> {
        for property in &self.properties {
            match arguments.get(&property.name) {
                None | Some(Value::Null) if property.required => {
                    return Err(McpError::MissingArgument {
                        name: property.name.clone(),
                    });
                }
                None | Some(Value::Null) => {}
                Some(value) if !property.property_type.matches(value) => {
                    return Err(McpError::InvalidArgument {
                        name: property.name.clone(),
                        expected: property.property_type.as_str().to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for property in &self.properties {
            properties.insert(
                property.name.clone(),
                json!({
                    "type": property.property_type.as_str(),
                    "description": property.description,
                }),
            );
        }

        let required: Vec<&str> = self
            .properties
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Static metadata for a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, input_schema: InputSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

impl Serialize for ToolDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Tool", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("inputSchema", &self.input_schema.to_json_schema())?;
        state.end()
    }
}

/// Collects descriptors before the server starts
#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, descriptor: ToolDescriptor) -> Self {
        self.tools.push(descriptor);
        self
    }

    /// Freeze the registry; duplicate names are a startup error
    pub fn build(self) -> Result<ToolRegistry> {
        let mut seen = HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name.as_str()) {
                return Err(ConfigError::InvalidConfig {
                    message: format!("tool '{}' registered twice", tool.name),
                }
                .into());
            }
        }
        tracing::debug!(count = self.tools.len(), "Tool registry built");
        Ok(ToolRegistry { tools: self.tools })
    }
}

/// Immutable set of tool descriptors
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Descriptors in registration order
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> std::result::Result<&ToolDescriptor, McpError> {
        self.tools
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| McpError::UnknownTool {
                name: name.to_string(),
            })
    }
}

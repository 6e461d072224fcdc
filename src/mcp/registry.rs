//! Tool descriptors and argument validation
//!
//! Each adapter declares its tools once, at startup. The registry answers
//! `tools/list` and checks every invocation's arguments before a handler (and
//! therefore any provider call) is reached.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::{AdapterError, McpError, Result};
use crate::mcp::types::Tool;

/// Argument value types accepted by tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    StringArray,
}

impl FieldType {
    fn schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::StringArray => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Integer => "an integer",
            FieldType::Boolean => "a boolean",
            FieldType::StringArray => "an array of strings",
        }
    }
}

/// One named argument
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Argument name
    pub name: &'static str,

    /// Expected type
    pub field_type: FieldType,

    /// Whether the argument must be present and non-null
    pub required: bool,

    /// Human readable description
    pub description: &'static str,

    /// Allowed values for string arguments
    pub allowed: Option<&'static [&'static str]>,
}

/// A tool the adapter exposes
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: &'static str,

    /// Description shown to the agent
    pub description: &'static str,

    /// Arguments in declaration order
    pub fields: Vec<FieldSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            fields: Vec::new(),
        }
    }

    /// Add a required argument
    pub fn required(
        mut self,
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        self.fields.push(FieldSpec {
            name,
            field_type,
            required: true,
            description,
            allowed: None,
        });
        self
    }

    /// Add an optional argument
    pub fn optional(
        mut self,
        name: &'static str,
        field_type: FieldType,
        description: &'static str,
    ) -> Self {
        self.fields.push(FieldSpec {
            name,
            field_type,
            required: false,
            description,
            allowed: None,
        });
        self
    }

    /// Restrict the most recently added argument to a fixed set of values
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.allowed = Some(allowed);
        }
        self
    }

    /// JSON Schema advertised in `tools/list`
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut schema = field.field_type.schema();
            schema["description"] = json!(field.description);
            if let Some(allowed) = field.allowed {
                schema["enum"] = json!(allowed);
            }
            properties.insert(field.name.to_string(), schema);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            input_schema: self.input_schema(),
        }
    }

    /// Check `arguments` against the declared fields.
    ///
    /// `null` counts as an empty object. Unknown extra fields are ignored.
    /// Returns the arguments as an object ready for deserialization.
    pub fn validate(&self, arguments: Value) -> Result<Value> {
        let object = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(self.invalid(format!(
                    "arguments must be an object, got {}",
                    json_type(&other)
                )))
            }
        };

        for field in &self.fields {
            match object.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(self.invalid(format!("missing required field `{}`", field.name)));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    if !field.field_type.matches(value) {
                        return Err(self.invalid(format!(
                            "field `{}` must be {}",
                            field.name,
                            field.field_type.name()
                        )));
                    }
                    if let (Some(allowed), Some(s)) = (field.allowed, value.as_str()) {
                        if !allowed.contains(&s) {
                            return Err(self.invalid(format!(
                                "field `{}` must be one of: {}",
                                field.name,
                                allowed.join(", ")
                            )));
                        }
                    }
                }
            }
        }

        Ok(Value::Object(object))
    }

    fn invalid(&self, message: String) -> AdapterError {
        AdapterError::invalid_arguments(self.name, message)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The fixed set of tools one adapter serves
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    /// Tool definitions in declaration order
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDescriptor::to_tool).collect()
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor> {
        self.tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| {
                AdapterError::Mcp(McpError::UnknownTool {
                    name: name.to_string(),
                })
            })
    }
}

/// Resolve an optional page size against its default and the provider cap
pub fn page_size(tool: &str, field: &str, value: Option<i64>, default: i64, max: i64) -> Result<u32> {
    let value = value.unwrap_or(default);
    if value < 1 {
        return Err(AdapterError::invalid_arguments(
            tool,
            format!("`{}` must be at least 1", field),
        ));
    }
    Ok(value.min(max) as u32)
}

/// Deserialize validated arguments into a handler's argument struct
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| AdapterError::invalid_arguments(tool, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn send_tool() -> ToolDescriptor {
        ToolDescriptor::new("gmail_send", "Send an email")
            .required("to", FieldType::String, "Recipient")
            .required("subject", FieldType::String, "Subject")
            .optional("cc", FieldType::String, "Cc")
            .optional("max_results", FieldType::Integer, "Limit")
    }

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = send_tool().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["to", "subject"]));
        assert_eq!(schema["properties"]["max_results"]["type"], "integer");
    }

    #[test]
    fn test_missing_required_field() {
        let err = send_tool()
            .validate(json!({"to": "a@example.com"}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgumentsError);
        assert!(err.to_string().contains("subject"));

        let err = send_tool()
            .validate(json!({"to": "a@example.com", "subject": null}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgumentsError);
    }

    #[test]
    fn test_type_mismatch_and_extras() {
        let err = send_tool()
            .validate(json!({"to": "a", "subject": "s", "max_results": "3"}))
            .unwrap_err();
        assert!(err.to_string().contains("max_results"));

        let ok = send_tool()
            .validate(json!({"to": "a", "subject": "s", "unexpected": 1}))
            .unwrap();
        assert_eq!(ok["unexpected"], 1);
    }

    #[test]
    fn test_null_arguments_are_empty() {
        let tool = ToolDescriptor::new("gmail_list_labels", "List labels");
        assert_eq!(tool.validate(Value::Null).unwrap(), json!({}));
        assert!(tool.validate(json!([1])).is_err());
    }

    #[test]
    fn test_enum_values() {
        let tool = ToolDescriptor::new("gdrive_share_file", "Share")
            .optional("role", FieldType::String, "Role")
            .one_of(&["reader", "writer"]);
        assert!(tool.validate(json!({"role": "writer"})).is_ok());
        assert!(tool.validate(json!({"role": "owner"})).is_err());
        assert_eq!(tool.input_schema()["properties"]["role"]["enum"], json!(["reader", "writer"]));
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(page_size("t", "max_results", None, 10, 500).unwrap(), 10);
        assert_eq!(page_size("t", "max_results", Some(9999), 10, 500).unwrap(), 500);
        assert_eq!(
            page_size("t", "max_results", Some(0), 10, 500)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidArgumentsError
        );
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let registry = ToolRegistry::new(vec![send_tool()]);
        assert!(registry.resolve("gmail_send").is_ok());
        assert_eq!(
            registry.resolve("gmail_nope").unwrap_err().kind(),
            ErrorKind::UnknownToolError
        );
        assert_eq!(registry.list_tools()[0].name, "gmail_send");
    }
}

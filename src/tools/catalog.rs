//! Conversion from host tool descriptors to the provider's function schema.

use serde_json::Value;

use crate::mcp::ToolDescriptor;
use crate::provider::ToolDefinition;

/// Map host descriptors to provider tool definitions, in host order.
///
/// Absent descriptions become `""` and absent schemas become `{}`; names are
/// carried through untouched since they route calls back to the host.
pub fn to_model_schema(descriptors: &[ToolDescriptor]) -> Vec<ToolDefinition> {
    descriptors.iter().map(to_definition).collect()
}

fn to_definition(descriptor: &ToolDescriptor) -> ToolDefinition {
    let parameters = match &descriptor.input_schema {
        Some(Value::Null) | None => Value::Object(Default::default()),
        Some(schema) => schema.clone(),
    };
    ToolDefinition {
        name: descriptor.name.clone(),
        description: descriptor.description.clone().unwrap_or_default(),
        parameters,
    }
}

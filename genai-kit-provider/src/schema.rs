//! JSON Schema validation for structured outputs.

use crate::error::{ErrorKind, GenAiError};
use serde_json::Value;

/// Validates a generated value against a caller-supplied JSON Schema.
///
/// Compilation failures are reported as invalid requests (the schema came
/// from the caller); validation failures mean the model produced a value
/// that does not conform.
pub fn validate_against_schema(schema: &Value, value: &Value) -> Result<(), GenAiError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        GenAiError::new(
            ErrorKind::InvalidRequest,
            format!("invalid output schema: {e}"),
        )
    })?;
    if let Err(error) = validator.validate(value) {
        return Err(GenAiError::new(
            ErrorKind::Internal,
            format!("generated object does not match schema: {error}"),
        ));
    }
    Ok(())
}

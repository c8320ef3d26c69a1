//! Typed structured-output helpers over the provider contract.

use genai_kit_provider::error::{ErrorKind, GenAiError};
use genai_kit_provider::provider::Provider;
use genai_kit_provider::request::Request;
use genai_kit_provider::response::ObjectResult;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The JSON Schema derived for a type, as sent to providers.
pub fn schema_for<T: JsonSchema>() -> Result<Value, GenAiError> {
    let root = schemars::schema_for!(T);
    serde_json::to_value(root.schema).map_err(|e| {
        GenAiError::new(
            ErrorKind::InvalidRequest,
            format!("failed to build schema: {e}"),
        )
    })
}

/// Generates an object of type `T`, deriving the schema from the type.
///
/// The provider validates the generated value against the schema; this
/// wrapper then deserializes it into `T`.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct City {
///     name: String,
///     population: u64,
/// }
///
/// let result = generate_object_as::<City>(
///     provider.as_ref(),
///     Request::from_text("Describe Tokyo as JSON."),
/// )
/// .await?;
/// println!("{} has {} people", result.value.name, result.value.population);
/// ```
pub async fn generate_object_as<T>(
    provider: &dyn Provider,
    request: Request,
) -> Result<ObjectResult<T>, GenAiError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = schema_for::<T>()?;
    let result = provider.generate_object(request, schema).await?;
    result.deserialize_into()
}

//! Request serialization into the chat-completion wire format.

use crate::settings::OpenAiCompatibleSettings;
use genai_kit_provider::error::{ErrorKind, GenAiError};
use genai_kit_provider::message::{ImageDetail, Message, Part, Role};
use genai_kit_provider::request::{Request, ToolChoice};
use serde_json::{Value, json};

/// Advisory `provider_options` keys this adapter consumes; everything else
/// is ignored silently.
const ADVISORY_KEYS: &[&str] = &[
    "top_p",
    "seed",
    "stop",
    "frequency_penalty",
    "presence_penalty",
    "parallel_tool_calls",
    "user",
];

/// Builds the JSON body for a chat-completion call.
///
/// Returns the body and the resolved model id.
pub(crate) fn build_body(
    settings: &OpenAiCompatibleSettings,
    request: &Request,
    stream: bool,
    response_format: Option<Value>,
) -> Result<(Value, String), GenAiError> {
    let model = request
        .model
        .clone()
        .or_else(|| settings.default_model.clone())
        .ok_or_else(|| {
            GenAiError::new(ErrorKind::InvalidRequest, "no model specified")
                .with_provider(&settings.provider)
        })?;

    let mut body = json!({
        "model": model,
        "messages": convert_messages(&request.messages),
    });

    // Zero or unset temperature means "provider default"; positive values
    // pass through clamped to the supported range.
    if let Some(temperature) = request.temperature {
        if temperature > 0.0 {
            body["temperature"] = json!(temperature.clamp(0.0, 2.0));
        }
    }
    if let Some(max_tokens) = request.max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.input_schema(),
                    }
                })
            })
            .collect();
        body["tools"] = json!(tools);
        body["tool_choice"] = convert_tool_choice(&request.tool_choice);
    }

    if let Some(format) = response_format {
        body["response_format"] = format;
    }

    if let Some(options) = request.options_for(&settings.provider) {
        for key in ADVISORY_KEYS {
            if let Some(value) = options.get(*key) {
                body[*key] = value.clone();
            }
        }
    }

    if stream {
        body["stream"] = json!(true);
        body["stream_options"] = json!({"include_usage": true});
    }

    Ok((body, model))
}

fn convert_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Tool { name } => json!({
            "type": "function",
            "function": {"name": name}
        }),
    }
}

fn convert_messages(messages: &[Message]) -> Vec<Value> {
    messages.iter().map(convert_message).collect()
}

fn convert_message(message: &Message) -> Value {
    match message.role {
        Role::System => {
            let mut wire = json!({"role": "system", "content": message.text()});
            if let Some(name) = &message.name {
                wire["name"] = json!(name);
            }
            wire
        }
        Role::User => {
            let mut wire = json!({"role": "user", "content": convert_user_content(message)});
            if let Some(name) = &message.name {
                wire["name"] = json!(name);
            }
            wire
        }
        Role::Assistant => {
            let text = message.text();
            let mut wire = json!({
                "role": "assistant",
                "content": if text.is_empty() { Value::Null } else { json!(text) },
            });
            if !message.tool_calls.is_empty() {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.input.to_string(),
                            }
                        })
                    })
                    .collect();
                wire["tool_calls"] = json!(calls);
            }
            wire
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.text(),
        }),
    }
}

/// A single text part collapses to a plain string; anything else becomes a
/// typed part array. Parts this wire format cannot express are skipped.
fn convert_user_content(message: &Message) -> Value {
    if let [Part::Text { text }] = message.parts.as_slice() {
        return json!(text);
    }

    let parts: Vec<Value> = message
        .parts
        .iter()
        .filter_map(convert_user_part)
        .collect();
    json!(parts)
}

fn convert_user_part(part: &Part) -> Option<Value> {
    match part {
        Part::Text { text } => Some(json!({"type": "text", "text": text})),
        Part::ImageUrl { url, detail } => Some(json!({
            "type": "image_url",
            "image_url": {"url": url, "detail": detail_str(*detail)},
        })),
        Part::File { source, media_type } if media_type.starts_with("image/") => {
            match source.to_url() {
                Some(url) => Some(json!({
                    "type": "image_url",
                    "image_url": {"url": url, "detail": "auto"},
                })),
                None => {
                    log::warn!("skipping image file part without a URL form");
                    None
                }
            }
        }
        Part::File { media_type, .. } => {
            log::warn!("skipping unsupported file part ({media_type})");
            None
        }
        Part::Audio { .. } => {
            log::warn!("skipping audio part: not supported by the chat wire format");
            None
        }
        Part::Video { .. } => {
            log::warn!("skipping video part: not supported by the chat wire format");
            None
        }
    }
}

fn detail_str(detail: ImageDetail) -> &'static str {
    match detail {
        ImageDetail::Auto => "auto",
        ImageDetail::Low => "low",
        ImageDetail::High => "high",
    }
}

use chrono::Utc;
use minijinja::{Environment, Error, ErrorKind};

/// Installs the built-in helper set on a template environment.
///
/// `indent`, `join`, `upper`, `lower`, `title`, `trim`, `first`, `last`,
/// and `default` ship with the engine; this adds `json`, `json_indent`,
/// `now`, and `date` on top.
pub fn install(env: &mut Environment<'static>) {
    env.add_filter("json", json);
    env.add_filter("json_indent", json_indent);
    env.add_function("now", now);
    env.add_function("date", date);
}

/// Serializes a value as compact JSON.
fn json(value: minijinja::value::Value) -> Result<String, Error> {
    serde_json::to_string(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Serializes a value as pretty-printed JSON.
fn json_indent(value: minijinja::value::Value) -> Result<String, Error> {
    serde_json::to_string_pretty(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// The current time in RFC 3339 form.
fn now() -> String {
    Utc::now().to_rfc3339()
}

/// The current time formatted with a strftime pattern.
fn date(format: String) -> String {
    Utc::now().format(&format).to_string()
}

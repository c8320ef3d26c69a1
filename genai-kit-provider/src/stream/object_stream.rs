use super::event::Event;
use super::text_stream::TextStream;
use crate::error::{ErrorKind, GenAiError};
use crate::schema::validate_against_schema;
use serde_json::Value;
use tokio::sync::Mutex;

struct ObjectStreamState {
    stream: TextStream,
    accumulated: String,
    outcome: Option<Result<Value, GenAiError>>,
}

/// A streaming structured-output call.
///
/// Mirrors text streaming while accumulating every text delta into a buffer;
/// [`ObjectStream::final_value`] parses the buffer as JSON once the stream
/// terminates and optionally validates it against the caller's schema. It is
/// idempotent and safe under concurrent callers.
pub struct ObjectStream {
    state: Mutex<ObjectStreamState>,
    schema: Option<Value>,
}

impl ObjectStream {
    /// Wraps a text stream, validating the final value against `schema`
    /// when one is provided.
    pub fn new(stream: TextStream, schema: Option<Value>) -> Self {
        Self {
            state: Mutex::new(ObjectStreamState {
                stream,
                accumulated: String::new(),
                outcome: None,
            }),
            schema,
        }
    }

    /// Receives the next event, accumulating text deltas along the way.
    pub async fn next(&self) -> Option<Event> {
        let mut state = self.state.lock().await;
        let event = state.stream.next().await;
        if let Some(Event::TextDelta { text_delta }) = &event {
            state.accumulated.push_str(text_delta);
        }
        event
    }

    /// Blocks until stream termination and returns the parsed final value.
    ///
    /// The outcome is computed once and cached; concurrent and repeated
    /// callers observe the same result.
    pub async fn final_value(&self) -> Result<Value, GenAiError> {
        let mut state = self.state.lock().await;
        if let Some(outcome) = &state.outcome {
            return outcome.clone();
        }

        let mut failure: Option<GenAiError> = None;
        while let Some(event) = state.stream.next().await {
            match event {
                Event::TextDelta { text_delta } => state.accumulated.push_str(&text_delta),
                Event::Error { error } => {
                    failure = Some(error);
                    break;
                }
                _ => {}
            }
        }

        let outcome = match failure {
            Some(error) => Err(error),
            None => self.parse(&state.accumulated),
        };
        state.outcome = Some(outcome.clone());
        outcome
    }

    /// Closes the underlying stream.
    pub async fn close(&self) {
        self.state.lock().await.stream.close();
    }

    fn parse(&self, accumulated: &str) -> Result<Value, GenAiError> {
        let value: Value = serde_json::from_str(accumulated.trim()).map_err(|e| {
            GenAiError::new(
                ErrorKind::Internal,
                format!("streamed output is not valid JSON: {e}"),
            )
        })?;
        if let Some(schema) = &self.schema {
            validate_against_schema(schema, &value)?;
        }
        Ok(value)
    }
}

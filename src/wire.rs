use serde::Deserialize;

/// Error body shapes a backend may return alongside a failure status.
///
/// Accepts `{"message": "..."}`, `{"error": "..."}` and
/// `{"error": {"message": "..."}}`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorField {
    Text(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

impl ErrorBody {
    /// The backend-supplied message, preferring the top-level field.
    pub fn into_message(self) -> Option<String> {
        let nested = match self.error {
            Some(ErrorField::Text(text)) => Some(text),
            Some(ErrorField::Object { message }) => message,
            None => None,
        };
        self.message
            .into_iter()
            .chain(nested)
            .find(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorBody;

    fn message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .expect("must parse")
            .into_message()
    }

    #[test]
    fn top_level_message_wins() {
        assert_eq!(
            message(r#"{"message": "not found", "error": "nope"}"#).as_deref(),
            Some("not found")
        );
    }

    #[test]
    fn error_string_and_object_fallbacks() {
        assert_eq!(message(r#"{"error": "boom"}"#).as_deref(), Some("boom"));
        assert_eq!(
            message(r#"{"error": {"message": "rate limited"}}"#).as_deref(),
            Some("rate limited")
        );
        assert_eq!(message(r#"{"message": "  "}"#), None);
        assert_eq!(message("{}"), None);
    }
}

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    // Ответ от сервера не получен
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Сервер ответил статусом ошибки
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    // Проверка на клиенте, до сети не доходит
    #[error("{0}")]
    Validation(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Build an `Api` error from a non-success response body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        Self::Api {
            status,
            message: api_error_message(status, body),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Pick the most useful human-readable message out of an error body.
///
/// Accepts `{"message": "..."}` as well as the RealWorld shape
/// `{"errors": {"email": ["is invalid"]}}`, falling back to the status code.
pub fn api_error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();

    if let Some(message) = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
    {
        return message.to_string();
    }

    if let Some(errors) = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .and_then(Value::as_object)
    {
        let parts: Vec<String> = errors
            .iter()
            .map(|(field, detail)| match detail {
                Value::Array(items) => {
                    let items: Vec<String> = items.iter().map(value_text).collect();
                    format!("{} {}", field, items.join(", "))
                }
                other => format!("{} {}", field, value_text(other)),
            })
            .collect();

        if !parts.is_empty() {
            return parts.join("; ");
        }
    }

    format!("Request failed with status {}", status.as_u16())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nbsync_core::SyncError;
use serde::{Deserialize, Serialize};

pub type AppResult<T> = Result<T, AppError>;

/// JSON error body shared by every route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    #[serde(with = "serde_status_code")]
    pub status: StatusCode,
    pub detail: Option<String>,
}

impl AppError {
    /// Create a new [`AppError`].
    pub fn new(status_code: StatusCode, message: Option<impl ToString>) -> AppError {
        Self {
            status: status_code,
            detail: message.map(|m| m.to_string()),
        }
    }

    pub fn internal(message: impl ToString) -> AppError {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, Some(message))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let json = Json(self.clone());
        (self.status, json).into_response()
    }
}

impl From<SyncError> for AppError {
    fn from(value: SyncError) -> Self {
        let status = match value {
            SyncError::Decode(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, Some(format!("Sync failed: {value}")))
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        Self::new(value.status(), Some(value.body_text()))
    }
}

/// Serialize/Deserializer for status codes.
///
/// Status codes travel as strings (`"400"`), not numbers.
pub mod serde_status_code {
    use axum::http::StatusCode;
    use serde::{de::Unexpected, Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize [StatusCode]s.
    pub fn serialize<S: Serializer>(status: &StatusCode, ser: S) -> Result<S::Ok, S::Error> {
        String::serialize(&status.as_u16().to_string(), ser)
    }

    /// Deserialize [StatusCode]s.
    pub fn deserialize<'de, D>(de: D) -> Result<StatusCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let str = String::deserialize(de)?;
        StatusCode::from_bytes(str.as_bytes()).map_err(|_| {
            serde::de::Error::invalid_value(
                Unexpected::Str(str.as_str()),
                &"A valid http status code",
            )
        })
    }
}

//! Wire DTOs for the auth API.
//!
//! DESIGN
//! ======
//! Every endpoint answers with the same `{success, data, error}` envelope.
//! `ApiResponse` folds that shape into a two-variant enum at decode time, so
//! callers match on the outcome instead of checking a flag beside nullable
//! fields.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An authenticated account as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user identifier.
    pub id: String,
    pub email: String,
    /// Display name.
    pub name: String,
    /// Creation timestamp (RFC 3339); empty when the server has none.
    #[serde(default)]
    pub created_at: String,
    /// Last-update timestamp (RFC 3339); empty when the server has none.
    #[serde(default)]
    pub updated_at: String,
}

/// Success payload of login, register, and current-user calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: User,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// Application-level failure carried by a `success: false` envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable message, suitable for showing to the user.
    pub message: String,
    /// Machine-readable code (e.g. `"AUTH_INVALID_CREDENTIALS"`).
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self { message: message.into(), code: code.into(), details: None }
    }
}

/// Decoded response envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure(ApiError),
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Unwrap the envelope into its payload or its application error.
    ///
    /// # Errors
    ///
    /// Returns the envelope's [`ApiError`] for a failure envelope.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(error) => Err(error),
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<ApiError>,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ApiResponse<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::deserialize(deserializer)?;
        if raw.success {
            serde_json::from_value(raw.data)
                .map(Self::Success)
                .map_err(D::Error::custom)
        } else {
            raw.error
                .map(Self::Failure)
                .ok_or_else(|| D::Error::custom("failure envelope is missing `error`"))
        }
    }
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_struct("ApiResponse", 3)?;
        match self {
            Self::Success(data) => {
                envelope.serialize_field("success", &true)?;
                envelope.serialize_field("data", data)?;
                envelope.serialize_field("error", &Option::<ApiError>::None)?;
            }
            Self::Failure(error) => {
                envelope.serialize_field("success", &false)?;
                envelope.serialize_field("data", &serde_json::Value::Null)?;
                envelope.serialize_field("error", error)?;
            }
        }
        envelope.end()
    }
}

//! Response body to typed object conversion.

use serde::de::DeserializeOwned;

use crate::error::ParsingError;

/// Turns a response body into a typed object.
///
/// Implementations must report malformed input as a [`ParsingError`].
pub trait ResponseMapper: Send + Sync {
    /// Maps `body` to a value of type `T`.
    fn map_response_to_object<T>(&self, body: &[u8]) -> Result<T, ParsingError>
    where
        T: DeserializeOwned;
}

/// JSON mapper backed by `serde_json`. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMapper;

impl ResponseMapper for JsonMapper {
    fn map_response_to_object<T>(&self, body: &[u8]) -> Result<T, ParsingError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(body).map_err(ParsingError::new::<T>)
    }
}

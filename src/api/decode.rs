use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, FetchError, TransportError};

/// Whether a payload has the shape of an API error (`code` and `message`)
fn is_error_payload(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| object.contains_key("code") && object.contains_key("message"))
}

/// Decode a list payload, splitting domain errors from successful lists
///
/// The API reports domain errors with a successful status and an error-shaped
/// body, so the shape is inspected before the payload is read as a list.
pub fn decode_list<T: DeserializeOwned>(url: &str, value: Value) -> Result<Vec<T>, FetchError> {
    let decode_failed = |source| {
        FetchError::Transport(TransportError::Decode {
            url: url.to_string(),
            source,
        })
    };

    if is_error_payload(&value) {
        let error: ApiError = serde_json::from_value(value).map_err(decode_failed)?;
        return Err(FetchError::Api(error));
    }

    serde_json::from_value(value).map_err(decode_failed)
}

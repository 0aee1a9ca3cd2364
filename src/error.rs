// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Deserialize;
use thiserror::Error;

/// Boxed error returned by [`crate::http::HttpClient`] implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while exchanging a request with the API
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Not authenticated: an API key is required")]
    MissingCredential,

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error payload returned by the API with a successful HTTP status
#[derive(Error, Debug, Clone, PartialEq, Deserialize)]
#[error("API error {code}: {message} ({reason})")]
pub struct ApiError {
    pub code: serde_json::Value,
    pub message: String,
    #[serde(default)]
    pub reason: String,
}

/// Outcome of a failed list fetch, stored in place of the list
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FetchError {
    /// Whether the request was refused locally because no credential was set
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::Transport(TransportError::MissingCredential))
    }
}

/// Errors that can occur when writing to the clipboard
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard is unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write to clipboard: {0}")]
    WriteFailed(String),
}

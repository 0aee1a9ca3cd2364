// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde_json::Value;
use tracing::{debug, warn};

use crate::credential::Credential;
use crate::error::{FetchError, TransportError};
use crate::http::{HttpClient, HttpRequest};

use super::decode::decode_list;
use super::model::{Episode, Podcast, PodcastId};

/// Base endpoint of the Podigee REST API
pub const DEFAULT_BASE_URL: &str = "https://app.podigee.com/api/v1";

/// Header carrying the API token
const TOKEN_HEADER: &str = "Token";

/// Authenticated access to the Podigee API
#[derive(Clone)]
pub struct ApiClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> ApiClient<C> {
    /// Create a client talking to the default Podigee endpoint
    pub fn new(http: C) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    /// Create a client talking to a custom endpoint
    pub fn with_base_url(http: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Perform an authenticated GET of `path` and decode the body as JSON
    ///
    /// Fails with [`TransportError::MissingCredential`] without touching the
    /// network when no credential is given. The decoded value is returned
    /// as-is; telling lists from error payloads is left to the caller.
    pub async fn request(
        &self,
        path: &str,
        credential: Option<&Credential>,
    ) -> Result<Value, TransportError> {
        let credential = credential.ok_or(TransportError::MissingCredential)?;
        let url = self.url(path);

        let request = HttpRequest::get(&url)
            .header("Content-Type", "application/json")
            .header(TOKEN_HEADER, credential.expose());

        debug!(%url, "requesting");
        let body = self.http.get_bytes(&request).await.map_err(|source| {
            warn!(%url, error = %source, "request failed");
            TransportError::Network {
                url: url.clone(),
                source,
            }
        })?;

        serde_json::from_slice(&body).map_err(|source| TransportError::Decode { url, source })
    }

    /// Fetch all podcasts of the authenticated account
    pub async fn list_podcasts(&self, credential: &Credential) -> Result<Vec<Podcast>, FetchError> {
        let path = "/podcasts";
        let value = self.request(path, Some(credential)).await?;
        decode_list(&self.url(path), value)
    }

    /// Fetch all episodes of one podcast
    pub async fn list_episodes(
        &self,
        credential: &Credential,
        podcast_id: PodcastId,
    ) -> Result<Vec<Episode>, FetchError> {
        let path = format!("/episodes?podcast_id={podcast_id}");
        let value = self.request(&path, Some(credential)).await?;
        decode_list(&self.url(&path), value)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

/// Number of leading characters shown by [`Credential::masked`]
const VISIBLE_PREFIX: usize = 4;

/// An API token used to authenticate against the Podigee API
///
/// The token only lives in memory. `Debug` is redacted so the value never
/// ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Create a credential from user input, trimming surrounding whitespace
    ///
    /// Returns `None` for empty or blank input.
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    /// The raw token, for building request headers
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First few characters followed by an ellipsis, safe to display
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(VISIBLE_PREFIX).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

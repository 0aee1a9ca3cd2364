use serde::Deserialize;

/// Server-assigned podcast identifier
pub type PodcastId = u64;

/// Episode identifier, unique within a podcast
pub type EpisodeId = u64;

/// A podcast belonging to the authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Podcast {
    pub id: PodcastId,
    pub title: String,
}

/// An episode of a podcast
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    /// Opaque unique identifier, copied verbatim to the clipboard
    pub guid: String,
    pub title: String,
}

mod client;
mod decode;
mod model;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use decode::decode_list;
pub use model::{Episode, EpisodeId, Podcast, PodcastId};

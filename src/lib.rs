pub mod api;
pub mod clipboard;
pub mod credential;
pub mod error;
pub mod http;
pub mod notification;
pub mod selection;
pub mod session;

// Re-export main types for convenience
pub use api::{ApiClient, DEFAULT_BASE_URL, Episode, EpisodeId, Podcast, PodcastId};
pub use clipboard::{Clipboard, SystemClipboard};
pub use credential::Credential;
pub use error::{ApiError, ClipboardError, FetchError, TransportError};
pub use http::{HttpClient, HttpRequest, ReqwestClient};
pub use notification::{NOTIFICATION_DURATION, Notification, NotificationSlot};
pub use selection::{Effect, Event, Fetch, SelectionMachine, SelectionState};
pub use session::{Message, Session, SessionOptions};

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::api::{ApiClient, EpisodeId};
use crate::clipboard::Clipboard;
use crate::error::ClipboardError;
use crate::http::HttpClient;
use crate::notification::{NOTIFICATION_DURATION, Notification, NotificationSlot, Ticket};
use crate::selection::{Effect, Event, SelectionMachine, SelectionState};

/// Shown after a GUID was written to the clipboard
pub const COPIED_MESSAGE: &str = "Copied to clipboard";

/// Shown when the clipboard refused the write
pub const COPY_FAILED_MESSAGE: &str = "Could not copy to clipboard";

/// Options for a browsing session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long notifications stay visible
    pub notification_duration: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            notification_duration: NOTIFICATION_DURATION,
        }
    }
}

/// Completion of background work, fed back into the session
#[derive(Debug)]
pub enum Message {
    Selection(Event),
    Copied {
        guid: String,
        result: Result<(), ClipboardError>,
    },
    NotificationExpired(Ticket),
}

/// One browsing session: selection state, notification and the work in flight
///
/// All state changes happen on the owner's task through [`Session::dispatch`],
/// [`Session::copy_guid`] and [`Session::apply`]. Fetches, clipboard writes and
/// the dismissal timer run as spawned tasks that report back with a [`Message`],
/// in whatever order they finish.
pub struct Session<C, K> {
    api: Arc<ApiClient<C>>,
    clipboard: Arc<K>,
    machine: SelectionMachine,
    notifications: NotificationSlot,
    dismissal: Option<JoinHandle<()>>,
    sender: UnboundedSender<Message>,
    receiver: UnboundedReceiver<Message>,
}

impl<C, K> Session<C, K>
where
    C: HttpClient + 'static,
    K: Clipboard + 'static,
{
    pub fn new(api: ApiClient<C>, clipboard: K, options: SessionOptions) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            api: Arc::new(api),
            clipboard: Arc::new(clipboard),
            machine: SelectionMachine::new(),
            notifications: NotificationSlot::new(options.notification_duration),
            dismissal: None,
            sender,
            receiver,
        }
    }

    pub fn state(&self) -> &SelectionState {
        self.machine.state()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    /// Apply a user intent (or a completion) and start the fetch it requires
    pub fn dispatch(&mut self, event: Event) {
        if let Some(effect) = self.machine.handle(event) {
            self.spawn_effect(effect);
        }
    }

    /// Copy the GUID of a loaded episode to the clipboard
    ///
    /// Returns `false` when no episode with that id is currently listed.
    pub fn copy_guid(&mut self, episode_id: EpisodeId) -> bool {
        let Some(episode) = self.machine.state().episode(episode_id) else {
            debug!(episode_id, "no such episode to copy");
            return false;
        };

        let guid = episode.guid.clone();
        let clipboard = Arc::clone(&self.clipboard);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = clipboard.write_text(&guid).await;
            let _ = sender.send(Message::Copied { guid, result });
        });
        true
    }

    /// Show a notification, cancelling the pending dismissal of the previous one
    pub fn notify(&mut self, text: impl Into<String>) {
        let (ticket, deadline) = self.notifications.notify(text, Instant::now());

        if let Some(previous) = self.dismissal.take() {
            previous.abort();
        }

        let sender = self.sender.clone();
        self.dismissal = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = sender.send(Message::NotificationExpired(ticket));
        }));
    }

    /// Wait for the next completion of background work
    pub async fn next_message(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Fold a completion into the session
    pub fn apply(&mut self, message: Message) {
        match message {
            Message::Selection(event) => self.dispatch(event),
            Message::Copied { guid, result } => match result {
                Ok(()) => {
                    debug!(%guid, "copied to clipboard");
                    self.notify(COPIED_MESSAGE);
                }
                Err(e) => {
                    warn!(error = %e, "clipboard write failed");
                    self.notify(COPY_FAILED_MESSAGE);
                }
            },
            Message::NotificationExpired(ticket) => {
                if self.notifications.expire(ticket) {
                    self.dismissal = None;
                }
            }
        }
    }

    fn spawn_effect(&self, effect: Effect) {
        let api = Arc::clone(&self.api);
        let sender = self.sender.clone();

        match effect {
            Effect::FetchPodcasts {
                request,
                credential,
            } => {
                tokio::spawn(async move {
                    let result = api.list_podcasts(&credential).await;
                    let _ = sender.send(Message::Selection(Event::PodcastsLoaded {
                        request,
                        result,
                    }));
                });
            }
            Effect::FetchEpisodes {
                request,
                credential,
                podcast_id,
            } => {
                tokio::spawn(async move {
                    let result = api.list_episodes(&credential, podcast_id).await;
                    let _ = sender.send(Message::Selection(Event::EpisodesLoaded {
                        request,
                        podcast_id,
                        result,
                    }));
                });
            }
        }
    }
}

impl<C, K> Drop for Session<C, K> {
    fn drop(&mut self) {
        if let Some(timer) = self.dismissal.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::error::{BoxError, FetchError};
    use crate::http::HttpRequest;
    use crate::selection::Fetch;

    const BASE: &str = "https://api.test";

    #[derive(Default)]
    struct MockHttpClient {
        /// Response body and latency per URL
        responses: HashMap<String, (Duration, String)>,
        requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl MockHttpClient {
        fn respond(mut self, path: &str, delay_ms: u64, body: &str) -> Self {
            self.responses.insert(
                format!("{BASE}{path}"),
                (Duration::from_millis(delay_ms), body.to_string()),
            );
            self
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, request: &HttpRequest) -> Result<Bytes, BoxError> {
            self.requests.lock().unwrap().push(request.clone());
            match self.responses.get(&request.url) {
                Some((delay, body)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(Bytes::from(body.clone()))
                }
                None => Err(std::io::Error::other("connection refused").into()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        writes: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Clipboard for RecordingClipboard {
        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("no display".to_string()));
            }
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    type TestSession = Session<MockHttpClient, RecordingClipboard>;

    const PODCASTS: &str = r#"[{"id": 1, "title": "Slow Show"}, {"id": 2, "title": "Fast Show"}]"#;

    fn default_http() -> MockHttpClient {
        MockHttpClient::default()
            .respond("/podcasts", 10, PODCASTS)
            .respond(
                "/episodes?podcast_id=1",
                500,
                r#"[{"id": 10, "guid": "slow-guid", "title": "Slow Episode"}]"#,
            )
            .respond(
                "/episodes?podcast_id=2",
                50,
                r#"[{"id": 20, "guid": "fast-guid", "title": "Fast Episode"},
                    {"id": 21, "guid": "urn:uuid:6F9619FF-8B86 é", "title": "Odd Guid"}]"#,
            )
    }

    fn session_with(
        http: MockHttpClient,
        clipboard: RecordingClipboard,
    ) -> (
        TestSession,
        Arc<Mutex<Vec<HttpRequest>>>,
        Arc<Mutex<Vec<String>>>,
    ) {
        let requests = Arc::clone(&http.requests);
        let writes = Arc::clone(&clipboard.writes);
        let api = ApiClient::with_base_url(http, BASE);
        let session = Session::new(api, clipboard, SessionOptions::default());
        (session, requests, writes)
    }

    /// Apply every completion that arrives before `deadline`
    async fn settle_until(session: &mut TestSession, deadline: Instant) {
        loop {
            tokio::select! {
                biased;
                _ = sleep_until(deadline) => break,
                Some(message) = session.next_message() => session.apply(message),
            }
        }
    }

    async fn settle_for(session: &mut TestSession, duration: Duration) {
        settle_until(session, Instant::now() + duration).await;
    }

    fn podcast_requests(requests: &Mutex<Vec<HttpRequest>>) -> Vec<HttpRequest> {
        requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with("/podcasts"))
            .cloned()
            .collect()
    }

    async fn with_episodes_of_fast_show(session: &mut TestSession) {
        session.dispatch(Event::SubmitCredential("token-123".to_string()));
        settle_for(session, Duration::from_millis(100)).await;
        session.dispatch(Event::SelectPodcast(2));
        settle_for(session, Duration::from_millis(100)).await;
        assert!(session.state().episodes().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn submitting_credential_issues_one_podcast_fetch() {
        let (mut session, requests, _) = session_with(default_http(), RecordingClipboard::default());

        session.dispatch(Event::SubmitCredential("token-123".to_string()));
        assert!(session.state().is_loading());
        settle_for(&mut session, Duration::from_millis(100)).await;

        let podcast_requests = podcast_requests(&requests);
        assert_eq!(podcast_requests.len(), 1);
        assert_eq!(podcast_requests[0].header_value("Token"), Some("token-123"));
        match session.state() {
            SelectionState::Authenticated {
                podcasts: Fetch::Ready(podcasts),
                ..
            } => assert_eq!(podcasts.len(), 2),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn error_payload_is_shown_as_error() {
        let http = MockHttpClient::default().respond(
            "/podcasts",
            0,
            r#"{"code":401,"message":"Unauthorized","reason":"bad token"}"#,
        );
        let (mut session, _, _) = session_with(http, RecordingClipboard::default());

        session.dispatch(Event::SubmitCredential("bad".to_string()));
        settle_for(&mut session, Duration::from_millis(10)).await;

        match session.state() {
            SelectionState::Authenticated {
                podcasts: Fetch::Failed(FetchError::Api(error)),
                ..
            } => {
                assert_eq!(error.code, serde_json::json!(401));
                assert_eq!(error.message, "Unauthorized");
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_is_stored_and_retryable() {
        let (mut session, requests, _) =
            session_with(MockHttpClient::default(), RecordingClipboard::default());

        session.dispatch(Event::SubmitCredential("token".to_string()));
        settle_for(&mut session, Duration::from_millis(10)).await;

        assert!(matches!(
            session.state(),
            SelectionState::Authenticated {
                podcasts: Fetch::Failed(FetchError::Transport(_)),
                ..
            }
        ));

        session.dispatch(Event::Reload);
        settle_for(&mut session, Duration::from_millis(10)).await;
        assert_eq!(podcast_requests(&requests).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_podcast_does_not_refetch_podcasts() {
        let (mut session, requests, _) = session_with(default_http(), RecordingClipboard::default());
        with_episodes_of_fast_show(&mut session).await;

        session.dispatch(Event::ResetPodcast);
        settle_for(&mut session, Duration::from_millis(100)).await;

        assert_eq!(podcast_requests(&requests).len(), 1);
        assert!(matches!(
            session.state(),
            SelectionState::Authenticated {
                podcasts: Fetch::Ready(_),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_credential_clears_all_data() {
        let (mut session, _, _) = session_with(default_http(), RecordingClipboard::default());
        with_episodes_of_fast_show(&mut session).await;

        session.dispatch(Event::ResetCredential);

        assert!(matches!(session.state(), SelectionState::Unauthenticated));
        assert!(session.state().credential().is_none());
        assert!(session.state().selected_podcast().is_none());
        assert!(session.state().episodes().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_response_for_previous_podcast_is_discarded() {
        let (mut session, _, _) = session_with(default_http(), RecordingClipboard::default());
        session.dispatch(Event::SubmitCredential("token".to_string()));
        settle_for(&mut session, Duration::from_millis(100)).await;

        session.dispatch(Event::SelectPodcast(1));
        session.dispatch(Event::SelectPodcast(2));

        settle_for(&mut session, Duration::from_millis(100)).await;
        assert_eq!(session.state().episodes().unwrap()[0].guid, "fast-guid");

        // the 500ms response for podcast 1 lands here
        settle_for(&mut session, Duration::from_millis(1000)).await;

        assert_eq!(session.state().selected_podcast().unwrap().id, 2);
        let episodes = session.state().episodes().unwrap();
        assert_eq!(episodes.len(), 2);
        assert!(episodes.iter().all(|e| e.guid != "slow-guid"));
    }

    #[tokio::test(start_paused = true)]
    async fn copy_writes_guid_verbatim_then_notifies() {
        let (mut session, _, writes) = session_with(default_http(), RecordingClipboard::default());
        with_episodes_of_fast_show(&mut session).await;

        assert!(session.copy_guid(21));
        settle_for(&mut session, Duration::from_millis(10)).await;

        assert_eq!(
            writes.lock().unwrap().as_slice(),
            ["urn:uuid:6F9619FF-8B86 é".to_string()]
        );
        assert_eq!(session.notification().unwrap().text, COPIED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn copy_of_unknown_episode_is_refused() {
        let (mut session, _, writes) = session_with(default_http(), RecordingClipboard::default());
        with_episodes_of_fast_show(&mut session).await;

        assert!(!session.copy_guid(999));
        settle_for(&mut session, Duration::from_millis(10)).await;

        assert!(writes.lock().unwrap().is_empty());
        assert!(session.notification().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clipboard_failure_is_reported() {
        let clipboard = RecordingClipboard {
            fail: true,
            ..Default::default()
        };
        let (mut session, _, _) = session_with(default_http(), clipboard);
        with_episodes_of_fast_show(&mut session).await;

        session.copy_guid(20);
        settle_for(&mut session, Duration::from_millis(10)).await;

        assert_eq!(session.notification().unwrap().text, COPY_FAILED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn notification_disappears_after_duration() {
        let (mut session, _, _) = session_with(default_http(), RecordingClipboard::default());
        let start = Instant::now();

        session.notify(COPIED_MESSAGE);

        settle_until(&mut session, start + Duration::from_millis(2990)).await;
        assert!(session.notification().is_some());

        settle_until(&mut session, start + Duration::from_millis(3010)).await;
        assert!(session.notification().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn second_notification_restarts_countdown() {
        let (mut session, _, _) = session_with(default_http(), RecordingClipboard::default());
        let start = Instant::now();

        session.notify(COPIED_MESSAGE);
        settle_until(&mut session, start + Duration::from_millis(1000)).await;
        session.notify(COPIED_MESSAGE);

        settle_until(&mut session, start + Duration::from_millis(3010)).await;
        assert!(session.notification().is_some());

        settle_until(&mut session, start + Duration::from_millis(4010)).await;
        assert!(session.notification().is_none());
    }
}

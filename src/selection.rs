// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::debug;

use crate::api::{Episode, EpisodeId, Podcast, PodcastId};
use crate::credential::Credential;
use crate::error::FetchError;

/// Identifies one issued fetch; every fetch gets a fresh id
pub type RequestId = u64;

/// Data loaded by a fetch, or the reason it could not be loaded
#[derive(Debug)]
pub enum Fetch<T> {
    /// Waiting for the response to `request`
    Pending { request: RequestId },
    Ready(T),
    Failed(FetchError),
}

impl<T> Fetch<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    fn awaits(&self, request: RequestId) -> bool {
        matches!(self, Self::Pending { request: pending } if *pending == request)
    }

    fn resolve(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(error) => Self::Failed(error),
        }
    }
}

/// Where the user is in the credential → podcast → episode flow
#[derive(Debug, Default)]
pub enum SelectionState {
    #[default]
    Unauthenticated,
    Authenticated {
        credential: Credential,
        podcasts: Fetch<Vec<Podcast>>,
    },
    PodcastSelected {
        credential: Credential,
        /// Podcast list of the same credential, kept for going back
        podcasts: Vec<Podcast>,
        podcast: Podcast,
        episodes: Fetch<Vec<Episode>>,
    },
}

impl SelectionState {
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticated { credential, .. } | Self::PodcastSelected { credential, .. } => {
                Some(credential)
            }
        }
    }

    pub fn selected_podcast(&self) -> Option<&Podcast> {
        match self {
            Self::PodcastSelected { podcast, .. } => Some(podcast),
            _ => None,
        }
    }

    /// Loaded episodes of the selected podcast
    pub fn episodes(&self) -> Option<&[Episode]> {
        match self {
            Self::PodcastSelected { episodes, .. } => episodes.ready().map(Vec::as_slice),
            _ => None,
        }
    }

    pub fn episode(&self, id: EpisodeId) -> Option<&Episode> {
        self.episodes()?.iter().find(|episode| episode.id == id)
    }

    /// Whether a fetch for the current stage is still outstanding
    pub fn is_loading(&self) -> bool {
        match self {
            Self::Unauthenticated => false,
            Self::Authenticated { podcasts, .. } => podcasts.is_pending(),
            Self::PodcastSelected { episodes, .. } => episodes.is_pending(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated { .. } => "authenticated",
            Self::PodcastSelected { .. } => "podcast-selected",
        }
    }
}

/// Inputs to the state machine: user intents and fetch completions
#[derive(Debug)]
pub enum Event {
    SubmitCredential(String),
    PodcastsLoaded {
        request: RequestId,
        result: Result<Vec<Podcast>, FetchError>,
    },
    SelectPodcast(PodcastId),
    EpisodesLoaded {
        request: RequestId,
        podcast_id: PodcastId,
        result: Result<Vec<Episode>, FetchError>,
    },
    ResetPodcast,
    ResetCredential,
    /// Re-issue the fetch of the current stage
    Reload,
}

/// Fetch to issue as a consequence of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchPodcasts {
        request: RequestId,
        credential: Credential,
    },
    FetchEpisodes {
        request: RequestId,
        credential: Credential,
        podcast_id: PodcastId,
    },
}

/// Allocates request ids, strictly increasing
#[derive(Debug, Default)]
pub struct RequestIds {
    next: RequestId,
}

impl RequestIds {
    pub fn allocate(&mut self) -> RequestId {
        self.next += 1;
        self.next
    }
}

/// Result of applying one event
#[derive(Debug)]
pub struct Transition {
    pub state: SelectionState,
    pub effect: Option<Effect>,
}

impl Transition {
    fn stay(state: SelectionState) -> Self {
        Self {
            state,
            effect: None,
        }
    }
}

fn fetch_podcasts(credential: Credential, ids: &mut RequestIds) -> Transition {
    let request = ids.allocate();
    Transition {
        effect: Some(Effect::FetchPodcasts {
            request,
            credential: credential.clone(),
        }),
        state: SelectionState::Authenticated {
            credential,
            podcasts: Fetch::Pending { request },
        },
    }
}

fn fetch_episodes(
    credential: Credential,
    podcasts: Vec<Podcast>,
    podcast: Podcast,
    ids: &mut RequestIds,
) -> Transition {
    let request = ids.allocate();
    Transition {
        effect: Some(Effect::FetchEpisodes {
            request,
            credential: credential.clone(),
            podcast_id: podcast.id,
        }),
        state: SelectionState::PodcastSelected {
            credential,
            podcasts,
            podcast,
            episodes: Fetch::Pending { request },
        },
    }
}

/// Compute the next state and the fetch it requires
///
/// Completions are only applied when the current state is waiting for
/// exactly that request; anything else is a stale response and is dropped.
pub fn transition(state: SelectionState, event: Event, ids: &mut RequestIds) -> Transition {
    use SelectionState::*;

    match (state, event) {
        (_, Event::SubmitCredential(token)) => match Credential::new(&token) {
            Some(credential) => fetch_podcasts(credential, ids),
            None => {
                debug!("blank credential submitted");
                Transition::stay(Unauthenticated)
            }
        },

        (_, Event::ResetCredential) => Transition::stay(Unauthenticated),

        (Authenticated { credential, podcasts }, Event::PodcastsLoaded { request, result })
            if podcasts.awaits(request) =>
        {
            if let Err(ref error) = result
                && error.is_missing_credential()
            {
                return Transition::stay(Unauthenticated);
            }
            Transition::stay(Authenticated {
                credential,
                podcasts: Fetch::resolve(result),
            })
        }

        (
            PodcastSelected {
                credential,
                podcasts,
                podcast,
                episodes,
            },
            Event::EpisodesLoaded {
                request,
                podcast_id,
                result,
            },
        ) if episodes.awaits(request) && podcast.id == podcast_id => {
            if let Err(ref error) = result
                && error.is_missing_credential()
            {
                return Transition::stay(Unauthenticated);
            }
            Transition::stay(PodcastSelected {
                credential,
                podcasts,
                podcast,
                episodes: Fetch::resolve(result),
            })
        }

        (
            Authenticated {
                credential,
                podcasts: Fetch::Ready(podcasts),
            },
            Event::SelectPodcast(id),
        ) => match podcasts.iter().find(|p| p.id == id).cloned() {
            Some(podcast) => fetch_episodes(credential, podcasts, podcast, ids),
            None => {
                debug!(podcast_id = id, "selected podcast is not in the list");
                Transition::stay(Authenticated {
                    credential,
                    podcasts: Fetch::Ready(podcasts),
                })
            }
        },

        (
            PodcastSelected {
                credential,
                podcasts,
                podcast,
                episodes,
            },
            Event::SelectPodcast(id),
        ) => match podcasts.iter().find(|p| p.id == id).cloned() {
            Some(selected) => fetch_episodes(credential, podcasts, selected, ids),
            None => {
                debug!(podcast_id = id, "selected podcast is not in the list");
                Transition::stay(PodcastSelected {
                    credential,
                    podcasts,
                    podcast,
                    episodes,
                })
            }
        },

        (
            PodcastSelected {
                credential,
                podcasts,
                ..
            },
            Event::ResetPodcast,
        ) => Transition::stay(Authenticated {
            credential,
            podcasts: Fetch::Ready(podcasts),
        }),

        (Authenticated { credential, .. }, Event::Reload) => fetch_podcasts(credential, ids),

        (
            PodcastSelected {
                credential,
                podcasts,
                podcast,
                ..
            },
            Event::Reload,
        ) => fetch_episodes(credential, podcasts, podcast, ids),

        (state, event @ (Event::PodcastsLoaded { .. } | Event::EpisodesLoaded { .. })) => {
            debug!(state = state.name(), ?event, "discarding stale response");
            Transition::stay(state)
        }

        (state, event) => {
            debug!(state = state.name(), ?event, "event ignored in current state");
            Transition::stay(state)
        }
    }
}

/// Owns the selection state and applies events to it
#[derive(Debug, Default)]
pub struct SelectionMachine {
    state: SelectionState,
    ids: RequestIds,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Apply an event, returning the fetch the caller must issue, if any
    pub fn handle(&mut self, event: Event) -> Option<Effect> {
        let state = std::mem::take(&mut self.state);
        let from = state.name();
        let Transition { state, effect } = transition(state, event, &mut self.ids);
        debug!(from, to = state.name(), ?effect, "transition");
        self.state = state;
        effect
    }
}

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{Condition, EventCatalog, MusicEventEntry, TrackId};
use crate::clock::Clock;
use crate::drift::{DriftHandle, FocusSignal, spawn_drift_watcher};
use crate::history::PlayHistory;
use crate::net::{SyncMessage, WireError};
use crate::save::{self, WorldTag};

/// Where this session sits in the authority model. The authoritative role is
/// the non-interactive source of truth for play history; participants fetch
/// history on join and run the drift watcher while a track is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Non-interactive host: enablement is always treated as true, no drift
    /// watcher runs, sync requests are answered.
    Authoritative,
    /// Interactive peer (including a single-player session): enablement is
    /// honored, the drift watcher guards active tracks, sync responses are
    /// adopted.
    Participant,
}

impl Role {
    pub fn is_authoritative(self) -> bool {
        matches!(self, Role::Authoritative)
    }
}

/// Audio output consumed by the audio collaborator. Calls are fire-and-forget
/// and the last play call in a tick wins.
pub trait AudioSink {
    fn play_track(&mut self, track: TrackId);
    fn play_silence(&mut self);
    fn set_fade(&mut self, track: TrackId, level: f32);
}

/// Coarse view of the scheduler timeline, mostly for inspection and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    IntroSilence,
    Playing,
    OutroSilence,
}

struct AlwaysRendering;

impl FocusSignal for AlwaysRendering {
    fn is_rendering(&self) -> bool {
        true
    }
}

const DEFAULT_DRIFT_POLL: Duration = Duration::from_millis(10);

/// One world session's music-event state: the play history, the active-track
/// timeline, and the drift watcher handle. Constructed on world load,
/// discarded (or `unload_world`ed) on world unload.
pub struct MusicEventSession<S> {
    catalog: Arc<EventCatalog<S>>,
    role: Role,
    clock: Arc<dyn Clock>,
    focus: Arc<dyn FocusSignal>,
    drift_poll: Duration,
    suppress_when: Option<Box<dyn Condition<S>>>,

    history: PlayHistory,
    current: Option<usize>,
    intro_deadline: Option<Duration>,
    track_end: Option<Duration>,
    pending_outro: Option<Duration>,
    last_played: Option<TrackId>,
    no_fade: bool,
    fresh_session: bool,
    drift: Option<DriftHandle>,
}

impl<S> MusicEventSession<S> {
    pub fn new(catalog: Arc<EventCatalog<S>>, role: Role, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            role,
            clock,
            focus: Arc::new(AlwaysRendering),
            drift_poll: DEFAULT_DRIFT_POLL,
            suppress_when: None,
            history: PlayHistory::new(),
            current: None,
            intro_deadline: None,
            track_end: None,
            pending_outro: None,
            last_played: None,
            no_fade: false,
            fresh_session: true,
            drift: None,
        }
    }

    /// Rendering-activity signal the drift watcher polls. Participants should
    /// always supply one; the default claims the process is never suspended.
    pub fn with_focus_signal(mut self, focus: Arc<dyn FocusSignal>) -> Self {
        self.focus = focus;
        self
    }

    /// Global suppression condition (e.g. a special game mode). While it
    /// holds, would-be events are marked played without ever starting.
    pub fn suppress_while(mut self, condition: impl Condition<S> + 'static) -> Self {
        self.suppress_when = Some(Box::new(condition));
        self
    }

    pub fn with_drift_poll_interval(mut self, interval: Duration) -> Self {
        self.drift_poll = interval;
        self
    }

    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    pub fn current_event(&self) -> Option<&MusicEventEntry<S>> {
        self.catalog.get(self.current?)
    }

    pub fn last_played(&self) -> Option<TrackId> {
        self.last_played
    }

    pub fn phase(&self) -> Phase {
        if self.track_end.is_some() {
            return Phase::OutroSilence;
        }
        match (self.current, self.intro_deadline) {
            (Some(_), Some(deadline)) if self.clock.now() < deadline => Phase::IntroSilence,
            (Some(_), Some(_)) => Phase::Playing,
            _ => Phase::Idle,
        }
    }

    /// Advances the state machine by one simulation tick. Runs on the game's
    /// cooperative update loop; never blocks, never re-enters.
    pub fn tick(&mut self, state: &S, sink: &mut dyn AudioSink) {
        let catalog = Arc::clone(&self.catalog);
        self.apply_drift_corrections();
        let now = self.clock.now();

        // Suppressed game mode: consume every would-be event and stay idle.
        let suppressed = self
            .suppress_when
            .as_ref()
            .is_some_and(|condition| condition.holds(state));
        if suppressed {
            for entry in catalog.entries() {
                if entry.should_play(state) {
                    self.history.insert(entry.id.clone());
                }
            }
            self.reset_playback();
            return;
        }

        // First evaluation of a session: conditions satisfied before we were
        // watching don't get to queue a backlog of tracks. Mark them played
        // and resume normal selection next tick.
        if self.fresh_session {
            let mut marked = 0usize;
            for entry in catalog.entries() {
                if entry.should_play(state) && self.history.insert(entry.id.clone()) {
                    marked += 1;
                }
            }
            self.fresh_session = false;
            if marked > 0 {
                tracing::info!(marked, "marked pre-satisfied music events as played");
            }
            return;
        }

        // Outro: hold silence for the full padding before anything new may
        // be considered, then fall through in the same tick.
        if let Some(end) = self.track_end {
            let outro = self.pending_outro.unwrap_or_default();
            if now.saturating_sub(end) < outro {
                sink.play_silence();
                return;
            }
            self.track_end = None;
            self.pending_outro = None;
            self.last_played = None;
        }

        // Selection: first unplayed entry whose trigger holds, one per tick.
        // The entry is counted as played even when it is disabled, so it can
        // never surprise the player later.
        if self.current.is_none()
            && let Some(index) = catalog
                .entries()
                .iter()
                .position(|e| !self.history.contains(&e.id) && e.should_play(state))
        {
            let entry = &catalog.entries()[index];
            self.history.insert(entry.id.clone());

            if self.role.is_authoritative() || entry.enabled(state) {
                self.current = Some(index);
                self.intro_deadline = Some(now + entry.intro_silence);
                tracing::info!(event = %entry.id, track = entry.track.0, "music event activated");

                if !self.role.is_authoritative() {
                    self.start_drift_watcher();
                }
            } else {
                tracing::info!(event = %entry.id, "music event consumed while disabled");
            }
        }

        if let (Some(index), Some(deadline)) = (self.current, self.intro_deadline) {
            let Some(entry) = catalog.get(index) else {
                return;
            };

            if now < deadline {
                sink.play_silence();
                self.no_fade = true;
            } else {
                sink.play_track(entry.track);

                // Coming out of intro silence the track should land at full
                // volume, not fade in from under the silence.
                if self.no_fade {
                    sink.set_fade(entry.track, 1.0);
                    self.no_fade = false;
                }

                if now.saturating_sub(deadline) >= entry.length {
                    sink.play_silence();
                    sink.set_fade(entry.track, 0.0);

                    self.track_end = Some(now);
                    self.last_played = Some(entry.track);
                    self.pending_outro = Some(entry.outro_silence);
                    self.current = None;
                    self.intro_deadline = None;
                    if let Some(drift) = &self.drift {
                        drift.stop();
                    }
                    tracing::info!(event = %entry.id, "music event finished");
                }
            }
        }
    }

    /// Loads persisted history. The retroactive-progress guard stays armed;
    /// the first tick after this completes it.
    pub fn load_world(&mut self, tag: &dyn WorldTag) {
        self.history = save::load_history(tag);
        tracing::info!(played = self.history.len(), "loaded music event history");
    }

    pub fn save_world(&self, tag: &mut dyn WorldTag) {
        save::save_history(&self.history, tag);
    }

    /// Clears all session state and re-arms the retroactive-progress guard.
    pub fn unload_world(&mut self) {
        self.reset_playback();
        self.history.clear();
        self.fresh_session = true;
    }

    /// Encoded sync request to hand to the transport, exactly once when a
    /// non-authoritative participant enters a world. The authoritative host
    /// has nothing to request.
    pub fn join_request(&self) -> Option<Vec<u8>> {
        if self.role.is_authoritative() {
            return None;
        }
        Some(SyncMessage::Request.encode())
    }

    /// Handles an incoming sync packet. Returns response bytes to send back
    /// to the requester, if any. Messages that don't apply to this role are
    /// ignored.
    pub fn handle_packet(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, WireError> {
        match SyncMessage::decode(data)? {
            SyncMessage::Request => {
                if !self.role.is_authoritative() {
                    tracing::debug!("ignoring sync request: not the authoritative host");
                    return Ok(None);
                }
                let played = self.history.iter().map(str::to_string).collect();
                Ok(Some(SyncMessage::Response { played }.encode()))
            }
            SyncMessage::Response { played } => {
                if self.role.is_authoritative() {
                    tracing::debug!("ignoring sync response addressed to the host");
                    return Ok(None);
                }
                tracing::info!(played = played.len(), "adopted host music event history");
                self.history.replace(played);
                Ok(None)
            }
        }
    }

    fn apply_drift_corrections(&mut self) {
        let Some(drift) = &self.drift else {
            return;
        };
        for lost in drift.corrections.try_iter() {
            // Corrections for a track that already ended are stale; drop them.
            if let Some(deadline) = &mut self.intro_deadline {
                *deadline += lost;
                tracing::debug!(lost_ms = lost.as_millis() as u64, "shifted event timeline");
            }
        }
    }

    /// A previous watcher must have observably exited before a new one may
    /// start, so two watchers can never correct deadlines concurrently.
    fn start_drift_watcher(&mut self) {
        if let Some(previous) = self.drift.take() {
            previous.reap();
        }
        self.drift = Some(spawn_drift_watcher(
            Arc::clone(&self.clock),
            Arc::clone(&self.focus),
            self.drift_poll,
        ));
    }

    fn reset_playback(&mut self) {
        self.current = None;
        self.intro_deadline = None;
        self.track_end = None;
        self.pending_outro = None;
        self.last_played = None;
        self.no_fade = false;
        if let Some(drift) = self.drift.take() {
            drift.reap();
        }
    }
}

impl<S> Drop for MusicEventSession<S> {
    fn drop(&mut self) {
        if let Some(drift) = self.drift.take() {
            drift.reap();
        }
    }
}

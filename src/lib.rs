//! Event-music scheduling for a tick-driven game: decides when a special
//! track interrupts normal ambient music, plays it for exactly its nominal
//! length even across process suspensions, remembers what has already fired
//! for the lifetime of a world, and keeps that memory consistent between an
//! authoritative host and joining peers.
//!
//! Audio output, rendering-activity detection, world-tag encoding and network
//! transport are all seams (`AudioSink`, `FocusSignal`, `WorldTag`, byte-vec
//! packets) owned by the surrounding game.

pub mod catalog;
pub mod clock;
pub mod drift;
pub mod history;
pub mod net;
pub mod save;
pub mod session;

pub use catalog::{Condition, EventCatalog, MusicEventEntry, TrackId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use drift::{DriftWatcher, FocusSignal};
pub use history::PlayHistory;
pub use net::{SyncMessage, WireError};
pub use save::{SaveError, TagStore, WorldTag, load_history, save_history};
pub use session::{AudioSink, MusicEventSession, Phase, Role};

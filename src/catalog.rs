use std::time::Duration;

/// A predicate over an explicit game-state snapshot. Conditions must be cheap
/// and free of side effects visible to the scheduler; they may be evaluated
/// many times per entry.
pub trait Condition<S>: Send + Sync {
    fn holds(&self, state: &S) -> bool;
}

impl<S, F> Condition<S> for F
where
    F: Fn(&S) -> bool + Send + Sync,
{
    fn holds(&self, state: &S) -> bool {
        self(state)
    }
}

/// Reference to a registered audio track slot. Slot registration itself lives
/// with the audio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub usize);

/// One registered music event: a track with trigger/enable conditions, a
/// nominal length, and silence padding on either side. Immutable after
/// registration.
pub struct MusicEventEntry<S> {
    pub id: String,
    pub track: TrackId,
    pub length: Duration,
    pub intro_silence: Duration,
    pub outro_silence: Duration,
    should_play: Box<dyn Condition<S>>,
    enabled: Box<dyn Condition<S>>,
}

impl<S> MusicEventEntry<S> {
    pub fn new(
        id: impl Into<String>,
        track: TrackId,
        length: Duration,
        should_play: impl Condition<S> + 'static,
        enabled: impl Condition<S> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            track,
            length,
            intro_silence: Duration::ZERO,
            outro_silence: Duration::ZERO,
            should_play: Box::new(should_play),
            enabled: Box::new(enabled),
        }
    }

    pub fn with_intro_silence(mut self, silence: Duration) -> Self {
        self.intro_silence = silence;
        self
    }

    pub fn with_outro_silence(mut self, silence: Duration) -> Self {
        self.outro_silence = silence;
        self
    }

    pub fn should_play(&self, state: &S) -> bool {
        self.should_play.holds(state)
    }

    pub fn enabled(&self, state: &S) -> bool {
        self.enabled.holds(state)
    }
}

/// Ordered collection of event entries. Registration order is the only
/// priority: the scheduler scans front to back and takes the first match.
pub struct EventCatalog<S> {
    entries: Vec<MusicEventEntry<S>>,
}

impl<S> EventCatalog<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an entry. A duplicate identifier is rejected, keeping the first
    /// registration.
    pub fn register(&mut self, entry: MusicEventEntry<S>) {
        if self.entries.iter().any(|e| e.id == entry.id) {
            tracing::warn!(event = %entry.id, "duplicate music event registration ignored");
            return;
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[MusicEventEntry<S>] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&MusicEventEntry<S>> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Default for EventCatalog<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flags {
        hardmode: bool,
    }

    fn entry(id: &str, track: usize) -> MusicEventEntry<Flags> {
        MusicEventEntry::new(
            id,
            TrackId(track),
            Duration::from_secs(10),
            |f: &Flags| f.hardmode,
            |_: &Flags| true,
        )
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut catalog = EventCatalog::new();
        catalog.register(entry("a", 1));
        catalog.register(entry("b", 2));
        let ids: Vec<_> = catalog.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn duplicate_id_keeps_first_registration() {
        let mut catalog = EventCatalog::new();
        catalog.register(entry("a", 1));
        catalog.register(entry("a", 2));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).unwrap().track, TrackId(1));
    }

    #[test]
    fn conditions_see_the_snapshot() {
        let e = entry("a", 1).with_intro_silence(Duration::from_secs(1));
        assert!(e.should_play(&Flags { hardmode: true }));
        assert!(!e.should_play(&Flags { hardmode: false }));
        assert_eq!(e.intro_silence, Duration::from_secs(1));
        assert_eq!(e.outro_silence, Duration::ZERO);
    }
}

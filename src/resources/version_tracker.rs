/// Version observer - detects changes of an externally owned version counter
///
/// Producers bump a `u64` with `wrapping_add(1)` whenever their content
/// changes; consumers keep one observer per producer and ask whether the
/// version moved since the last look.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionObserver {
    last_seen: Option<u64>,
}

impl VersionObserver {
    #[must_use]
    pub fn new() -> Self {
        Self { last_seen: None }
    }

    /// Records `version`; returns `true` on the first observation or when it
    /// differs from the previous one.
    pub fn observe(&mut self, version: u64) -> bool {
        let changed = self.last_seen != Some(version);
        self.last_seen = Some(version);
        changed
    }

    /// Forgets the last version so the next observation reports a change.
    pub fn reset(&mut self) {
        self.last_seen = None;
    }

    #[must_use]
    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}

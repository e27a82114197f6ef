//! Ping-Pong Buffer
//!
//! Two resources that alternate between the *current* role (read by shading
//! and by captures) and the *pending* role (written by the diffuse filter).
//! A single [`PingPong::swap`] exchanges the roles, so a pass can never read
//! the slot it is writing as long as it writes only through `pending()`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingPong<T> {
    slots: [T; 2],
    current: usize,
    swaps: u64,
}

impl<T> PingPong<T> {
    #[must_use]
    pub fn new(current: T, pending: T) -> Self {
        Self {
            slots: [current, pending],
            current: 0,
            swaps: 0,
        }
    }

    /// Slot read by shading and by probe captures.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    /// Slot receiving filter writes.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &T {
        &self.slots[self.current ^ 1]
    }

    #[inline]
    pub fn pending_mut(&mut self) -> &mut T {
        &mut self.slots[self.current ^ 1]
    }

    /// Exchanges the current and pending roles.
    #[inline]
    pub fn swap(&mut self) {
        self.current ^= 1;
        self.swaps = self.swaps.wrapping_add(1);
    }

    /// Number of swaps since creation.
    #[inline]
    #[must_use]
    pub fn swap_count(&self) -> u64 {
        self.swaps
    }

    /// Both slots, in allocation order.
    #[must_use]
    pub fn slots(&self) -> &[T; 2] {
        &self.slots
    }

    pub fn into_slots(self) -> [T; 2] {
        self.slots
    }
}

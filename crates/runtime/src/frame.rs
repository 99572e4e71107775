use std::collections::BTreeSet;

/// Identifier the host hands out for one scheduled animation frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameRequestId(pub u64);

/// Host animation-frame primitive.
///
/// In a browser this wraps `requestAnimationFrame`/`cancelAnimationFrame`; a
/// native host can back it with its redraw tick. The host calls back into the
/// owner with the id once the frame fires.
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameRequestId;
    fn cancel_frame(&mut self, id: FrameRequestId);
}

/// Coalesces per-key redraw work into a single host frame.
///
/// Key properties:
/// - At most one frame request is outstanding at any time.
/// - Scheduling always cancels the outstanding request before issuing a new one.
/// - Marking the same key many times before the frame fires yields it once.
/// - A fired id that is not the outstanding one is stale and yields nothing.
/// - Keys are handed back in ascending order.
#[derive(Debug)]
pub struct FrameCoalescer<K> {
    pending: Option<FrameRequestId>,
    dirty: BTreeSet<K>,
}

impl<K: Ord> Default for FrameCoalescer<K> {
    fn default() -> Self {
        Self {
            pending: None,
            dirty: BTreeSet::new(),
        }
    }
}

impl<K: Ord> FrameCoalescer<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameRequestId> {
        self.pending
    }

    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_dirty(&self, key: &K) -> bool {
        self.dirty.contains(key)
    }

    /// Marks `keys` dirty and (re)schedules one host frame.
    pub fn schedule<H, I>(&mut self, host: &mut H, keys: I) -> FrameRequestId
    where
        H: FrameHost + ?Sized,
        I: IntoIterator<Item = K>,
    {
        self.dirty.extend(keys);
        if let Some(prev) = self.pending.take() {
            host.cancel_frame(prev);
        }
        let id = host.request_frame();
        self.pending = Some(id);
        id
    }

    /// Consumes the dirty set when the host fires `id`.
    ///
    /// Returns `None` for a stale or unknown id.
    pub fn take_due(&mut self, id: FrameRequestId) -> Option<Vec<K>> {
        if self.pending != Some(id) {
            return None;
        }
        self.pending = None;
        Some(std::mem::take(&mut self.dirty).into_iter().collect())
    }

    /// Drops a key that no longer exists. The outstanding frame is kept.
    pub fn forget(&mut self, key: &K) -> bool {
        self.dirty.remove(key)
    }

    /// Cancels the outstanding frame (if any) and clears all dirty keys.
    ///
    /// Returns `true` if a host request was canceled.
    pub fn cancel<H>(&mut self, host: &mut H) -> bool
    where
        H: FrameHost + ?Sized,
    {
        self.dirty.clear();
        match self.pending.take() {
            Some(id) => {
                host.cancel_frame(id);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameCoalescer, FrameHost, FrameRequestId};

    #[derive(Default)]
    struct CountingHost {
        next: u64,
        requested: Vec<FrameRequestId>,
        canceled: Vec<FrameRequestId>,
    }

    impl FrameHost for CountingHost {
        fn request_frame(&mut self) -> FrameRequestId {
            let id = FrameRequestId(self.next);
            self.next += 1;
            self.requested.push(id);
            id
        }

        fn cancel_frame(&mut self, id: FrameRequestId) {
            self.canceled.push(id);
        }
    }

    #[test]
    fn reschedule_cancels_previous_request() {
        let mut host = CountingHost::default();
        let mut q = FrameCoalescer::new();

        let first = q.schedule(&mut host, ["a"]);
        let second = q.schedule(&mut host, ["b"]);

        assert_ne!(first, second);
        assert_eq!(host.canceled, vec![first]);
        assert_eq!(q.pending(), Some(second));
    }

    #[test]
    fn repeated_marks_coalesce_into_one_pass() {
        let mut host = CountingHost::default();
        let mut q = FrameCoalescer::new();

        q.schedule(&mut host, ["b", "a"]);
        q.schedule(&mut host, ["a"]);
        let id = q.schedule(&mut host, ["b"]);

        assert_eq!(q.take_due(id), Some(vec!["a", "b"]));
        assert_eq!(q.dirty_len(), 0);
        assert_eq!(q.pending(), None);
    }

    #[test]
    fn stale_frame_yields_nothing() {
        let mut host = CountingHost::default();
        let mut q = FrameCoalescer::new();

        let stale = q.schedule(&mut host, [1u32]);
        let live = q.schedule(&mut host, [2u32]);

        assert_eq!(q.take_due(stale), None);
        assert_eq!(q.take_due(live), Some(vec![1, 2]));
        assert_eq!(q.take_due(live), None);
    }

    #[test]
    fn cancel_clears_dirty_and_outstanding_request() {
        let mut host = CountingHost::default();
        let mut q = FrameCoalescer::new();

        let id = q.schedule(&mut host, [1u32, 2]);
        assert!(q.forget(&1));
        assert!(q.cancel(&mut host));

        assert_eq!(host.canceled, vec![id]);
        assert_eq!(q.dirty_len(), 0);
        assert_eq!(q.take_due(id), None);
        assert!(!q.cancel(&mut host));
    }
}

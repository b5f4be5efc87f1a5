// Display-refresh scheduling: "call me back on the next frame" plus cancel.
// The host fires whatever is due once per refresh; the pipeline keeps at most
// one handle alive so two render loops can never race for the window.

/// Identifies one scheduled callback. Handles are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// The two primitives the pipeline needs from the host.
pub trait RefreshScheduler {
    /// Ask for a callback on the next display refresh.
    fn schedule(&mut self) -> TickHandle;

    /// Drop a pending callback. Cancelling a handle that already fired is a no-op.
    fn cancel(&mut self, handle: TickHandle);
}

/// Plain queue of pending handles, drained once per refresh by the host loop.
#[derive(Debug, Default)]
pub struct RefreshQueue {
    next_id: u64,
    pending: Vec<TickHandle>,
}

impl RefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles waiting for the next refresh, oldest first.
    pub fn pending(&self) -> &[TickHandle] {
        &self.pending
    }

    /// Everything scheduled before this refresh. Callbacks scheduled while
    /// handling these land in the *next* refresh.
    pub fn take_due(&mut self) -> Vec<TickHandle> {
        std::mem::take(&mut self.pending)
    }
}

impl RefreshScheduler for RefreshQueue {
    fn schedule(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.pending.retain(|h| *h != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique() {
        let mut q = RefreshQueue::new();
        let a = q.schedule();
        let b = q.schedule();
        assert_ne!(a, b);
        assert_eq!(q.pending(), &[a, b]);
    }

    #[test]
    fn cancel_removes_only_that_handle() {
        let mut q = RefreshQueue::new();
        let a = q.schedule();
        let b = q.schedule();
        q.cancel(a);
        assert_eq!(q.pending(), &[b]);
        q.cancel(a);
        assert_eq!(q.pending(), &[b]);
    }

    #[test]
    fn take_due_empties_the_queue() {
        let mut q = RefreshQueue::new();
        let a = q.schedule();
        assert_eq!(q.take_due(), vec![a]);
        assert!(q.pending().is_empty());
        let b = q.schedule();
        assert!(b.id() > a.id());
    }
}

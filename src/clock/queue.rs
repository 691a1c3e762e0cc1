// Timer queue - Pending one-shot deadlines keyed by handle

use super::TimerHandle;

/// Armed deadlines, generic over the deadline type (seconds or `Instant`)
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    pending: Vec<(TimerHandle, T)>,
    next_id: u64,
}

impl<T: PartialOrd + Copy> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 1,
        }
    }

    /// Arm a deadline and return its handle
    pub fn arm(&mut self, due: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push((handle, due));
        handle
    }

    /// Disarm a handle; returns false if it was not pending
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(h, _)| *h != handle);
        self.pending.len() < before
    }

    /// Remove every deadline at or before `now`, earliest first
    pub fn take_due(&mut self, now: T) -> Vec<TimerHandle> {
        let mut due: Vec<(TimerHandle, T)> = self
            .pending
            .iter()
            .copied()
            .filter(|(_, at)| *at <= now)
            .collect();
        if due.is_empty() {
            return Vec::new();
        }
        self.pending.retain(|(_, at)| *at > now);
        due.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.0.cmp(&b.0.0))
        });
        due.into_iter().map(|(handle, _)| handle).collect()
    }

    /// Earliest pending deadline
    pub fn next_due(&self) -> Option<T> {
        self.pending
            .iter()
            .map(|(_, at)| *at)
            .fold(None, |earliest, at| match earliest {
                Some(e) if e <= at => Some(e),
                _ => Some(at),
            })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T: PartialOrd + Copy> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Time-ordered scheduler driving a scenario's event loop.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::location::Location;

/// Kinds of event a scenario processes, in tie-break order at equal time:
/// `NewFire`/`Save` before `FireSpread`, `FireSpread` before
/// `EndSimulation`: `Save` precedes `FireSpread` at equal times, and
/// `EndSimulation` always comes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum EventKind {
    NewFire = 0,
    Save = 1,
    FireSpread = 2,
    EndSimulation = 3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    NewFire { time: f64, cell: Location },
    FireSpread { time: f64 },
    Save { time: f64 },
    EndSimulation { time: f64 },
}

impl Event {
    #[must_use]
    pub fn time(&self) -> f64 {
        match self {
            Event::NewFire { time, .. } | Event::FireSpread { time } | Event::Save { time } | Event::EndSimulation { time } => *time,
        }
    }

    fn kind(&self) -> EventKind {
        match self {
            Event::NewFire { .. } => EventKind::NewFire,
            Event::Save { .. } => EventKind::Save,
            Event::FireSpread { .. } => EventKind::FireSpread,
            Event::EndSimulation { .. } => EventKind::EndSimulation,
        }
    }
}

/// Wrapper giving `Event` the ordering the scheduler needs: earliest time
/// first, then by [`EventKind`]. `Ord` is reversed relative to that so a
/// std `BinaryHeap` (a max-heap) pops the earliest event.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scheduled(Event);

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .time()
            .partial_cmp(&self.0.time())
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.0.kind().cmp(&self.0.kind()))
    }
}

/// A time-ordered set of pending events, kept as a sorted set. Popping
/// always returns the earliest event, with ties
/// broken per [`EventKind`].
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Scheduled>,
    last_popped_time: Option<f64>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Scheduler { heap: BinaryHeap::new(), last_popped_time: None }
    }

    pub fn push(&mut self, event: Event) {
        self.heap.push(Scheduled(event));
    }

    /// Pop the earliest event, checking strict time monotonicity against
    /// the last popped event: the currently processed time must never
    /// decrease.
    ///
    /// # Errors
    /// Returns [`crate::error::FatalError::NonMonotoneEventTime`] if the
    /// next event's time is earlier than the last one processed.
    pub fn pop(&mut self) -> Result<Option<Event>, crate::error::FatalError> {
        let Some(Scheduled(event)) = self.heap.pop() else {
            return Ok(None);
        };
        if let Some(previous) = self.last_popped_time {
            if event.time() < previous {
                return Err(crate::error::FatalError::NonMonotoneEventTime {
                    previous,
                    attempted: event.time(),
                });
            }
        }
        self.last_popped_time = Some(event.time());
        Ok(Some(event))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Discard every pending event. `EndSimulation` replaces the scheduler
    /// with an empty set.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Reset for a fresh `reset()` realisation. Scenarios are one-shot, so
    /// this also forgets the last-popped time so a new run
    /// doesn't compare against the previous one's).
    pub fn reset(&mut self) {
        self.heap.clear();
        self.last_popped_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_earliest_time_first() {
        let mut s = Scheduler::new();
        s.push(Event::FireSpread { time: 5.0 });
        s.push(Event::FireSpread { time: 2.0 });
        s.push(Event::FireSpread { time: 8.0 });
        assert_eq!(s.pop().unwrap().unwrap().time(), 2.0);
        assert_eq!(s.pop().unwrap().unwrap().time(), 5.0);
        assert_eq!(s.pop().unwrap().unwrap().time(), 8.0);
    }

    #[test]
    fn save_precedes_fire_spread_at_same_time() {
        let mut s = Scheduler::new();
        s.push(Event::FireSpread { time: 10.0 });
        s.push(Event::Save { time: 10.0 });
        let first = s.pop().unwrap().unwrap();
        assert!(matches!(first, Event::Save { .. }));
    }

    #[test]
    fn end_simulation_comes_last_at_same_time() {
        let mut s = Scheduler::new();
        s.push(Event::EndSimulation { time: 10.0 });
        s.push(Event::FireSpread { time: 10.0 });
        s.push(Event::Save { time: 10.0 });
        let order: Vec<_> = std::iter::from_fn(|| s.pop().unwrap()).collect();
        assert!(matches!(order[0], Event::Save { .. }));
        assert!(matches!(order[1], Event::FireSpread { .. }));
        assert!(matches!(order[2], Event::EndSimulation { .. }));
    }

    #[test]
    fn non_monotone_time_is_rejected() {
        let mut s = Scheduler::new();
        s.push(Event::FireSpread { time: 5.0 });
        assert!(s.pop().unwrap().is_some());
        s.push(Event::FireSpread { time: 3.0 });
        assert!(s.pop().is_err());
    }

    #[test]
    fn reset_clears_monotonicity_history() {
        let mut s = Scheduler::new();
        s.push(Event::FireSpread { time: 5.0 });
        s.pop().unwrap();
        s.reset();
        s.push(Event::FireSpread { time: 1.0 });
        assert!(s.pop().unwrap().is_some());
    }
}

//! Action scheduler
//!
//! Ordered sequence of actions: the front is active (receives ticks and is
//! drawn), the tail is dormant until promoted. The orchestrator is the
//! fallback policy: whenever a tick drains the queue it must install a new
//! front before the next tick, so tick and draw never observe an empty
//! sequence in steady state.
//!
//! The scheduler holds one arena reference per queued entry. Pushing an id
//! transfers the caller's reference; popped or cleared entries are
//! released.

use coinsign_display::{Coords, RenderTarget};
use heapless::Deque;

use crate::action::{ActionArena, ActionId, SequenceTag};
use crate::fmt::warn;

/// Maximum queued actions (front included)
pub const MAX_QUEUE: usize = 8;

/// Outcome of a scheduler tick that needs the orchestrator's attention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerEvent {
    /// The front finished and nothing is left; install a fallback before
    /// the next tick
    QueueDrained,
    /// A tagged sequence completed all its repeats
    ///
    /// The handler is expected to install follow-up content itself, so a
    /// simultaneous drain is not reported separately.
    SequenceFinished(SequenceTag),
}

/// Ordered action sequence, front = active
#[derive(Default)]
pub struct ActionScheduler {
    queue: Deque<ActionId, MAX_QUEUE>,
}

impl ActionScheduler {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Insert at the front; becomes immediately active, interrupting the
    /// previous front
    ///
    /// A mid-flight transition at the front is silently abandoned. When
    /// the queue is full the rearmost entry is dropped to make room, on
    /// the grounds that interrupts outrank pending content.
    pub fn prepend(&mut self, arena: &mut ActionArena, id: ActionId) {
        if self.queue.is_full() {
            warn!("scheduler full, dropping rearmost entry");
            if let Some(last) = self.queue.pop_back() {
                arena.release(last);
            }
        }
        // capacity guaranteed above
        let _ = self.queue.push_front(id);
    }

    /// Insert at the tail; plays after everything ahead of it
    pub fn append(&mut self, arena: &mut ActionArena, id: ActionId) {
        if self.queue.push_back(id).is_err() {
            warn!("scheduler full, dropping appended entry");
            arena.release(id);
        }
    }

    /// Clear everything and install `id` as the sole active action
    pub fn replace(&mut self, arena: &mut ActionArena, id: ActionId) {
        while let Some(entry) = self.queue.pop_front() {
            arena.release(entry);
        }
        let _ = self.queue.push_front(id);
    }

    /// Pop the front unconditionally, finished or not
    pub fn remove_top(&mut self, arena: &mut ActionArena) {
        if let Some(front) = self.queue.pop_front() {
            arena.release(front);
        }
    }

    /// Clear the tail without disturbing the active front
    pub fn clean_queue(&mut self, arena: &mut ActionArena) {
        while self.queue.len() > 1 {
            if let Some(entry) = self.queue.pop_back() {
                arena.release(entry);
            }
        }
    }

    /// Peek the active action
    pub fn top(&self) -> Option<ActionId> {
        self.queue.front().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Advance the front by `elapsed_ms`, popping it once finished
    ///
    /// Dormant entries receive no time. Returns the event the
    /// orchestrator must act on, if any.
    pub fn tick(&mut self, arena: &mut ActionArena, elapsed_ms: u32) -> Option<SchedulerEvent> {
        let front = self.top()?;

        let tag = arena.tick(front, elapsed_ms);

        if arena.is_finished(front) {
            self.remove_top(arena);
        }
        if let Some(tag) = tag {
            return Some(SchedulerEvent::SequenceFinished(tag));
        }
        if self.queue.is_empty() {
            return Some(SchedulerEvent::QueueDrained);
        }
        None
    }

    /// Draw the active action at the origin
    pub fn draw<T: RenderTarget>(&self, arena: &mut ActionArena, target: &mut T) {
        if let Some(front) = self.top() {
            arena.draw(front, target, Coords::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, DURATION_INFINITE};
    use coinsign_display::CaptureTarget;

    fn fixture() -> (ActionArena, ActionScheduler) {
        (ActionArena::new(), ActionScheduler::new())
    }

    #[test]
    fn test_front_never_empty_after_any_insert() {
        let (mut arena, mut sched) = fixture();

        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        sched.append(&mut arena, a);
        assert!(sched.top().is_some());

        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        sched.prepend(&mut arena, b);
        assert_eq!(sched.top(), Some(b));

        let c = arena.alloc(Action::static_text("C", 1_000)).unwrap();
        sched.replace(&mut arena, c);
        assert_eq!(sched.top(), Some(c));
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn test_only_front_receives_time() {
        let (mut arena, mut sched) = fixture();
        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        sched.append(&mut arena, a);
        sched.append(&mut arena, b);

        sched.tick(&mut arena, 600);
        assert_eq!(arena.get(a).unwrap().elapsed_ms(), 600);
        assert_eq!(arena.get(b).unwrap().elapsed_ms(), 0);
    }

    #[test]
    fn test_remove_top_promotes_without_dormant_ticks() {
        let (mut arena, mut sched) = fixture();
        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        arena.retain(b);
        sched.append(&mut arena, a);
        sched.append(&mut arena, b);

        sched.tick(&mut arena, 500); // A mid-flight
        sched.remove_top(&mut arena);

        assert_eq!(sched.top(), Some(b));
        assert_eq!(arena.get(b).unwrap().elapsed_ms(), 0);
        arena.release(b);
    }

    #[test]
    fn test_finished_front_pops_and_promotes() {
        let (mut arena, mut sched) = fixture();
        let a = arena.alloc(Action::static_text("A", 500)).unwrap();
        let b = arena.alloc(Action::static_text("B", 500)).unwrap();
        sched.append(&mut arena, a);
        sched.append(&mut arena, b);

        assert_eq!(sched.tick(&mut arena, 500), None);
        assert_eq!(sched.top(), Some(b));
        assert!(arena.get(a).is_none()); // popped entry released
    }

    #[test]
    fn test_drain_reported_once_queue_empties() {
        let (mut arena, mut sched) = fixture();
        let a = arena.alloc(Action::static_text("A", 500)).unwrap();
        sched.append(&mut arena, a);

        assert_eq!(sched.tick(&mut arena, 499), None);
        assert_eq!(sched.tick(&mut arena, 1), Some(SchedulerEvent::QueueDrained));
        assert!(sched.is_empty());
    }

    #[test]
    fn test_tagged_sequence_completion_surfaces_tag() {
        let (mut arena, mut sched) = fixture();
        let a = arena.alloc(Action::static_text("A", 100)).unwrap();
        let seq = arena.alloc(Action::sequence(&[a], 1, Some(4))).unwrap();
        sched.append(&mut arena, seq);

        assert_eq!(
            sched.tick(&mut arena, 100),
            Some(SchedulerEvent::SequenceFinished(4))
        );
        assert!(sched.is_empty());
    }

    #[test]
    fn test_clean_queue_keeps_front() {
        let (mut arena, mut sched) = fixture();
        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        let c = arena.alloc(Action::static_text("C", 1_000)).unwrap();
        sched.append(&mut arena, a);
        sched.append(&mut arena, b);
        sched.append(&mut arena, c);

        sched.clean_queue(&mut arena);
        assert_eq!(sched.len(), 1);
        assert_eq!(sched.top(), Some(a));
        assert!(arena.get(b).is_none());
    }

    #[test]
    fn test_prepend_abandons_midflight_transition() {
        let (mut arena, mut sched) = fixture();
        let price = arena.alloc(Action::value(10)).unwrap();
        arena.retain(price);
        let slide = arena
            .alloc(Action::slide(Some(price), None, 1_000, Coords::new(-1, 0)))
            .unwrap();
        sched.append(&mut arena, slide);
        sched.tick(&mut arena, 400);

        let banner = arena.alloc(Action::static_text("!", DURATION_INFINITE)).unwrap();
        sched.prepend(&mut arena, banner);
        sched.remove_top(&mut arena); // drop the banner again
        sched.remove_top(&mut arena); // drop the abandoned transition

        // The retained price action outlives the abandoned transition
        assert!(arena.get(price).is_some());
        assert_eq!(arena.live_count(), 1);
        arena.release(price);
    }

    #[test]
    fn test_draw_renders_front_only() {
        let (mut arena, mut sched) = fixture();
        let mut target = CaptureTarget::new(32, 8);
        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        sched.append(&mut arena, a);
        sched.append(&mut arena, b);

        sched.draw(&mut arena, &mut target);
        assert!(target.contains_text("A"));
        assert!(!target.contains_text("B"));
    }

    #[test]
    fn test_replace_releases_previous_entries() {
        let (mut arena, mut sched) = fixture();
        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        sched.append(&mut arena, a);
        sched.append(&mut arena, b);

        let c = arena.alloc(Action::static_text("C", 1_000)).unwrap();
        sched.replace(&mut arena, c);
        assert_eq!(arena.live_count(), 1);
    }
}

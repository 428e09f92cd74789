//! Action storage
//!
//! Fixed-capacity, reference-counted slot arena. Composites hold their
//! children by [`ActionId`]; passing an id into a composite (or any other
//! holder) transfers the caller's reference, and [`ActionArena::retain`]
//! takes an extra one. Releasing the last reference frees the slot and
//! releases the action's children.

use coinsign_display::{Coords, RenderTarget};

use crate::fmt::warn;

use super::{Action, ActionKind, SequenceTag};

/// Arena capacity
pub const MAX_ACTIONS: usize = 24;

/// Stable handle to an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionId(u8);

#[derive(Debug)]
struct Slot {
    refs: u8,
    action: Action,
}

/// Fixed-capacity action storage
pub struct ActionArena {
    slots: [Option<Slot>; MAX_ACTIONS],
}

impl Default for ActionArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionArena {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Store an action, returning its id with one reference held by the
    /// caller
    ///
    /// Returns `None` when the arena is full; the action is dropped.
    pub fn alloc(&mut self, action: Action) -> Option<ActionId> {
        let free = self.slots.iter().position(|slot| slot.is_none());
        match free {
            Some(index) => {
                self.slots[index] = Some(Slot { refs: 1, action });
                Some(ActionId(index as u8))
            }
            None => {
                warn!("action arena full, dropping action");
                None
            }
        }
    }

    /// Take an additional reference
    pub fn retain(&mut self, id: ActionId) {
        if let Some(slot) = &mut self.slots[id.0 as usize] {
            slot.refs = slot.refs.saturating_add(1);
        }
    }

    /// Drop one reference; the last release frees the slot and releases
    /// the action's children
    pub fn release(&mut self, id: ActionId) {
        let index = id.0 as usize;
        let freed = match &mut self.slots[index] {
            Some(slot) => {
                slot.refs -= 1;
                slot.refs == 0
            }
            None => false,
        };
        if !freed {
            return;
        }
        // take() first so child releases cannot observe the dead parent
        if let Some(slot) = self.slots[index].take() {
            match slot.action.kind {
                ActionKind::Sequence { children, .. } => {
                    for child in children {
                        self.release(child);
                    }
                }
                ActionKind::Transition { from, to, .. } => {
                    if let Some(from) = from {
                        self.release(from);
                    }
                    if let Some(to) = to {
                        self.release(to);
                    }
                }
                _ => {}
            }
        }
    }

    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.slots[id.0 as usize].as_ref().map(|slot| &slot.action)
    }

    pub fn get_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.slots[id.0 as usize]
            .as_mut()
            .map(|slot| &mut slot.action)
    }

    /// Whether the action exists and has completed
    pub fn is_finished(&self, id: ActionId) -> bool {
        self.get(id).map(Action::is_finished).unwrap_or(true)
    }

    /// Force completion
    pub fn set_finished(&mut self, id: ActionId) {
        if let Some(action) = self.get_mut(id) {
            action.set_finished();
        }
    }

    /// Number of live slots
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Rewind an action (and its children) so it plays again from the
    /// start
    ///
    /// Animation state tied to elapsed time restarts; content state
    /// (current value, clock time) is kept.
    pub fn reset(&mut self, id: ActionId) {
        let Some(action) = self.get_mut(id) else {
            return;
        };
        action.elapsed_ms = 0;
        action.finished = false;
        match &mut action.kind {
            ActionKind::Sequence {
                children,
                index,
                cycles_done,
                ..
            } => {
                *index = 0;
                *cycles_done = 0;
                let children: heapless::Vec<ActionId, { super::MAX_SEQUENCE_LEN }> =
                    children.clone();
                for child in children {
                    self.reset(child);
                }
            }
            ActionKind::Transition { from, to, .. } => {
                let (from, to) = (*from, *to);
                if let Some(from) = from {
                    self.reset(from);
                }
                if let Some(to) = to {
                    self.reset(to);
                }
            }
            _ => {}
        }
    }

    /// Advance an action by `elapsed_ms`
    ///
    /// Composites recurse: a transition ticks both sides every tick, a
    /// sequence ticks only its current child and advances past finished
    /// children. Returns the tag of a sequence that completed its final
    /// cycle during this tick.
    pub fn tick(&mut self, id: ActionId, elapsed_ms: u32) -> Option<SequenceTag> {
        let Some(action) = self.get_mut(id) else {
            return None;
        };
        if action.finished {
            return None;
        }

        match &action.kind {
            ActionKind::Transition { from, to, .. } => {
                let (from, to) = (*from, *to);
                let action = self.get_mut(id)?;
                action.advance(elapsed_ms);
                let mut tag = None;
                if let Some(from) = from {
                    tag = tag.or(self.tick(from, elapsed_ms));
                }
                if let Some(to) = to {
                    tag = tag.or(self.tick(to, elapsed_ms));
                }
                tag
            }
            ActionKind::Sequence { .. } => self.tick_sequence(id, elapsed_ms),
            _ => {
                action.advance(elapsed_ms);
                None
            }
        }
    }

    fn tick_sequence(&mut self, id: ActionId, elapsed_ms: u32) -> Option<SequenceTag> {
        let (current, tag) = {
            let Some(Action {
                kind: ActionKind::Sequence {
                    children, index, tag, ..
                },
                ..
            }) = self.get_mut(id)
            else {
                return None;
            };
            if children.is_empty() {
                let tag = *tag;
                self.set_finished(id);
                return tag;
            }
            (children[*index as usize], *tag)
        };

        let inner_tag = self.tick(current, elapsed_ms);
        if !self.is_finished(current) {
            return inner_tag;
        }

        // Advance past the finished child
        let restart = {
            let Some(Action {
                finished,
                kind:
                    ActionKind::Sequence {
                        children,
                        index,
                        repeat,
                        cycles_done,
                        ..
                    },
                ..
            }) = self.get_mut(id)
            else {
                return inner_tag;
            };
            *index += 1;
            if (*index as usize) < children.len() {
                false
            } else {
                *cycles_done = cycles_done.saturating_add(1);
                if *repeat != 0 && *cycles_done >= *repeat {
                    *finished = true;
                    return inner_tag.or(tag);
                }
                *index = 0;
                true
            }
        };

        if restart {
            let children: heapless::Vec<ActionId, { super::MAX_SEQUENCE_LEN }> = {
                match self.get(id) {
                    Some(Action {
                        kind: ActionKind::Sequence { children, .. },
                        ..
                    }) => children.clone(),
                    _ => return inner_tag,
                }
            };
            for child in children {
                self.reset(child);
            }
        }
        inner_tag
    }

    /// Draw an action at `coords`
    ///
    /// A sequence draws its current child; a transition composites both
    /// sides offset along its axis in proportion to elapsed time, with a
    /// `None` side left blank.
    pub fn draw<T: RenderTarget>(&mut self, id: ActionId, target: &mut T, coords: Coords) {
        let Some(action) = self.get_mut(id) else {
            return;
        };
        let origin = action.origin;

        match &action.kind {
            ActionKind::Sequence {
                children, index, ..
            } => {
                let current = children.get(*index as usize).copied();
                if let Some(current) = current {
                    self.draw(current, target, coords + origin);
                }
            }
            ActionKind::Transition { from, to, axis } => {
                let (from, to, axis) = (*from, *to, *axis);
                let duration = action.duration_ms;
                let elapsed = action.elapsed_ms;

                let extent = if axis.y != 0 {
                    target.height()
                } else {
                    target.width()
                };
                let offset = if duration > 0 {
                    let raw = (elapsed as i64 * extent as i64 + duration as i64 / 2)
                        / duration as i64;
                    (raw as i32).clamp(0, extent)
                } else {
                    0
                };

                let at = coords + origin;
                if let Some(from) = from {
                    self.draw(from, target, at + axis * offset);
                }
                if let Some(to) = to {
                    self.draw(to, target, at + axis * (offset - extent));
                }
            }
            _ => action.draw_leaf(target, coords),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DURATION_INFINITE;
    use coinsign_display::CaptureTarget;

    fn arena() -> ActionArena {
        ActionArena::new()
    }

    #[test]
    fn test_alloc_release_frees_slot() {
        let mut arena = arena();
        let id = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        assert_eq!(arena.live_count(), 1);

        arena.release(id);
        assert_eq!(arena.live_count(), 0);
        assert!(arena.get(id).is_none());
    }

    #[test]
    fn test_alloc_fails_when_full() {
        let mut arena = arena();
        for _ in 0..MAX_ACTIONS {
            assert!(arena.alloc(Action::static_text("A", 1_000)).is_some());
        }
        assert!(arena.alloc(Action::static_text("B", 1_000)).is_none());
    }

    #[test]
    fn test_release_composite_releases_children() {
        let mut arena = arena();
        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        let seq = arena.alloc(Action::sequence(&[a, b], 1, None)).unwrap();
        assert_eq!(arena.live_count(), 3);

        arena.release(seq);
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_retain_keeps_child_past_composite_release() {
        let mut arena = arena();
        let a = arena.alloc(Action::value(10)).unwrap();
        arena.retain(a);
        let slide = arena
            .alloc(Action::slide(Some(a), None, 500, Coords::new(-1, 0)))
            .unwrap();

        arena.release(slide);
        assert_eq!(arena.live_count(), 1);
        assert!(arena.get(a).is_some());

        arena.release(a);
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_sequence_plays_children_in_order() {
        let mut arena = arena();
        let mut target = CaptureTarget::new(32, 8);
        let a = arena.alloc(Action::static_text("A", 1_000)).unwrap();
        let b = arena.alloc(Action::static_text("B", 1_000)).unwrap();
        let seq = arena.alloc(Action::sequence(&[a, b], 1, Some(7))).unwrap();

        arena.draw(seq, &mut target, Coords::ZERO);
        assert!(target.contains_text("A"));

        assert_eq!(arena.tick(seq, 1_000), None);
        target.reset();
        arena.draw(seq, &mut target, Coords::ZERO);
        assert!(target.contains_text("B"));

        // Last child finishing ends the single cycle and reports the tag
        assert_eq!(arena.tick(seq, 1_000), Some(7));
        assert!(arena.is_finished(seq));
    }

    #[test]
    fn test_sequence_repeats_forever_with_zero() {
        let mut arena = arena();
        let a = arena.alloc(Action::static_text("A", 100)).unwrap();
        let b = arena.alloc(Action::static_text("B", 100)).unwrap();
        let seq = arena.alloc(Action::sequence(&[a, b], 0, Some(9))).unwrap();

        for _ in 0..20 {
            assert_eq!(arena.tick(seq, 100), None);
        }
        assert!(!arena.is_finished(seq));
    }

    #[test]
    fn test_sequence_restart_resets_children() {
        let mut arena = arena();
        let mut target = CaptureTarget::new(32, 8);
        let a = arena.alloc(Action::static_text("A", 100)).unwrap();
        let seq = arena.alloc(Action::sequence(&[a], 0, None)).unwrap();

        arena.tick(seq, 100); // child finishes, cycle restarts
        assert!(!arena.is_finished(a));
        arena.draw(seq, &mut target, Coords::ZERO);
        assert!(target.contains_text("A"));
    }

    #[test]
    fn test_empty_sequence_finishes_immediately() {
        let mut arena = arena();
        let seq = arena.alloc(Action::sequence(&[], 1, Some(3))).unwrap();
        assert_eq!(arena.tick(seq, 10), Some(3));
        assert!(arena.is_finished(seq));
    }

    #[test]
    fn test_transition_outlasts_its_duration_by_one_tick() {
        let mut arena = arena();
        let a = arena.alloc(Action::static_text("A", DURATION_INFINITE)).unwrap();
        let b = arena.alloc(Action::static_text("B", DURATION_INFINITE)).unwrap();
        let slide = arena
            .alloc(Action::slide(Some(a), Some(b), 500, Coords::new(-1, 0)))
            .unwrap();

        arena.tick(slide, 500);
        assert!(!arena.is_finished(slide)); // full offset is still drawn
        arena.tick(slide, 1);
        assert!(arena.is_finished(slide));
    }

    #[test]
    fn test_transition_composites_both_sides() {
        let mut arena = arena();
        let mut target = CaptureTarget::new(32, 8);
        let a = arena.alloc(Action::static_text("A", DURATION_INFINITE)).unwrap();
        let b = arena.alloc(Action::static_text("B", DURATION_INFINITE)).unwrap();
        let slide = arena
            .alloc(Action::slide(Some(a), Some(b), 1_000, Coords::new(-1, 0)))
            .unwrap();

        // Start: outgoing in place, incoming one screen off to the right
        arena.draw(slide, &mut target, Coords::ZERO);
        assert_eq!(target.text_at("A"), Some(Coords::ZERO));
        assert_eq!(target.text_at("B"), Some(Coords::new(32, 0)));

        // Halfway: both halfway across
        arena.tick(slide, 500);
        target.reset();
        arena.draw(slide, &mut target, Coords::ZERO);
        assert_eq!(target.text_at("A"), Some(Coords::new(-16, 0)));
        assert_eq!(target.text_at("B"), Some(Coords::new(16, 0)));

        // End: incoming in place, outgoing gone off the left edge
        arena.tick(slide, 500);
        target.reset();
        arena.draw(slide, &mut target, Coords::ZERO);
        assert_eq!(target.text_at("A"), Some(Coords::new(-32, 0)));
        assert_eq!(target.text_at("B"), Some(Coords::ZERO));
    }

    #[test]
    fn test_transition_blank_side_draws_nothing() {
        let mut arena = arena();
        let mut target = CaptureTarget::new(32, 8);
        let b = arena.alloc(Action::static_text("B", DURATION_INFINITE)).unwrap();
        let slide = arena
            .alloc(Action::slide(None, Some(b), 1_000, Coords::new(0, 1)))
            .unwrap();

        arena.tick(slide, 500);
        arena.draw(slide, &mut target, Coords::ZERO);
        // Vertical axis uses the panel height as extent
        assert_eq!(target.text_at("B"), Some(Coords::new(0, -4)));
        assert_eq!(target.ops().len(), 1);
    }

    #[test]
    fn test_transition_keeps_children_animating() {
        let mut arena = arena();
        let a = arena.alloc(Action::value(10)).unwrap();
        arena.get_mut(a).unwrap().update_value("100");
        arena.retain(a);
        let slide = arena
            .alloc(Action::slide(None, Some(a), 1_000, Coords::new(-1, 0)))
            .unwrap();

        arena.tick(slide, 1_000);
        let value = arena.get(a).unwrap().current_value().unwrap();
        assert_eq!(value.mantissa, 100); // roll progressed inside the slide
        arena.release(slide);
        arena.release(a);
    }

    #[test]
    fn test_reset_replays_sequence() {
        let mut arena = arena();
        let a = arena.alloc(Action::static_text("A", 100)).unwrap();
        let seq = arena.alloc(Action::sequence(&[a], 1, None)).unwrap();

        arena.tick(seq, 100);
        assert!(arena.is_finished(seq));

        arena.reset(seq);
        assert!(!arena.is_finished(seq));
        assert!(!arena.is_finished(a));
    }
}

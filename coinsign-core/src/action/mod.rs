//! Display actions
//!
//! An action is a time-bounded, tickable and drawable unit of display
//! content. The set of variants is closed ([`ActionKind`]) and dispatched
//! through one capability surface: tick, draw, is-finished, set-finished.
//! A negative duration means infinite: the action persists until finished
//! externally.
//!
//! Actions live in the reference-counted [`ActionArena`], addressed by
//! stable [`ActionId`]s, so composites (sequences, slide transitions) and
//! the scheduler can share children: a value display can keep animating
//! while it is simultaneously the incoming side of a transition.

mod arena;
mod number;

pub use arena::{ActionArena, ActionId, MAX_ACTIONS};
pub use number::{digit_count, format_scaled, Number};

use coinsign_display::{Coords, Font, RenderTarget};
use heapless::{String, Vec};

/// Duration value meaning "runs until finished externally"
pub const DURATION_INFINITE: i32 = -1;

/// Maximum text length held by a text action
pub const MAX_TEXT_LEN: usize = 96;

/// Maximum children per sequence
pub const MAX_SEQUENCE_LEN: usize = 8;

/// Maximum length of a clock time string
pub const MAX_TIME_LEN: usize = 16;

/// Maximum length of a menu line
pub const MAX_MENU_LINE: usize = 32;

/// Opaque tag attached to a sequence, reported by the scheduler when the
/// sequence (all repeats) completes
pub type SequenceTag = u8;

/// A display action
///
/// Constructed by the orchestrating layer, then moved into the arena via
/// [`ActionArena::alloc`].
#[derive(Debug, Clone)]
pub struct Action {
    pub(crate) duration_ms: i32,
    pub(crate) elapsed_ms: u32,
    pub(crate) finished: bool,
    pub(crate) origin: Coords,
    pub(crate) font: Option<Font>,
    pub(crate) kind: ActionKind,
}

/// Closed set of action variants
#[derive(Debug, Clone)]
pub enum ActionKind {
    /// Fixed text shown for the whole duration
    StaticText { text: String<MAX_TEXT_LEN> },
    /// Text scrolling continuously leftward
    ScrollingText {
        text: String<MAX_TEXT_LEN>,
        /// Scroll speed in pixels per second
        speed_px_s: i32,
        /// Finish after one full pass instead of looping
        once: bool,
        /// Cached loop length (text width + screen width), measured on
        /// first draw
        loop_px: Option<i32>,
    },
    /// Live numeric value with digit-roll animation
    Value(ValueState),
    /// Wall-clock time, updated externally
    Clock {
        time: String<MAX_TIME_LEN>,
        /// Pinned by the orchestrator instead of time-sliced
        always_on: bool,
        /// No drawing until the first time update arrives
        time_set: bool,
    },
    /// Fixed-duration 1-bit bitmap
    Bitmap {
        data: &'static [u8],
        width: i32,
        height: i32,
    },
    /// Children played back-to-back, optionally repeated
    Sequence {
        children: Vec<ActionId, MAX_SEQUENCE_LEN>,
        index: u8,
        /// Repeat count; 0 repeats forever
        repeat: u8,
        cycles_done: u8,
        tag: Option<SequenceTag>,
    },
    /// Adapter slot for the settings menu; the controller refreshes the
    /// line and force-finishes it when the menu ends
    MenuView { line: String<MAX_MENU_LINE> },
    /// Directional hand-off between two actions (either side may be the
    /// blank sentinel `None`)
    Transition {
        from: Option<ActionId>,
        to: Option<ActionId>,
        /// Unit direction vector; offset advances along it
        axis: Coords,
    },
}

/// Animation state of the numeric value display
#[derive(Debug, Clone)]
pub struct ValueState {
    /// Currently rendered mantissa (scaled to `decimals`)
    shown: i64,
    /// Roll destination
    target: i64,
    decimals: u8,
    has_value: bool,
    /// Roll interpolation start
    roll_from: i64,
    roll_elapsed_ms: u32,
    roll_total_ms: u32,
    /// Roll speed in digits per second
    speed_digits_s: u32,
    /// All-time-high record; at or above it the ATH marker is drawn
    ath: Option<Number>,
    since_update_ms: u32,
    /// Staleness threshold; exceeded means placeholder rendering
    timeout_ms: Option<u32>,
}

impl Action {
    fn new(duration_ms: i32, kind: ActionKind) -> Self {
        Self {
            duration_ms,
            elapsed_ms: 0,
            finished: false,
            origin: Coords::ZERO,
            font: None,
            kind,
        }
    }

    /// Fixed text for `duration_ms` (negative = until finished externally)
    pub fn static_text(text: &str, duration_ms: i32) -> Self {
        Self::new(
            duration_ms,
            ActionKind::StaticText {
                text: copy_str(text),
            },
        )
    }

    /// Looping leftward scroll
    pub fn scrolling_text(text: &str, speed_px_s: i32, duration_ms: i32) -> Self {
        Self::new(
            duration_ms,
            ActionKind::ScrollingText {
                text: copy_str(text),
                speed_px_s,
                once: false,
                loop_px: None,
            },
        )
    }

    /// Single full scroll pass, then finished
    pub fn scrolling_once(text: &str, speed_px_s: i32) -> Self {
        Self::new(
            DURATION_INFINITE,
            ActionKind::ScrollingText {
                text: copy_str(text),
                speed_px_s,
                once: true,
                loop_px: None,
            },
        )
    }

    /// Live numeric value display (infinite duration)
    pub fn value(speed_digits_s: u32) -> Self {
        Self::new(
            DURATION_INFINITE,
            ActionKind::Value(ValueState {
                shown: 0,
                target: 0,
                decimals: 0,
                has_value: false,
                roll_from: 0,
                roll_elapsed_ms: 0,
                roll_total_ms: 0,
                speed_digits_s: speed_digits_s.max(1),
                ath: None,
                since_update_ms: 0,
                timeout_ms: None,
            }),
        )
    }

    /// Clock display shown for `duration_ms` per appearance
    pub fn clock(duration_ms: i32) -> Self {
        Self::new(
            duration_ms,
            ActionKind::Clock {
                time: String::new(),
                always_on: false,
                time_set: false,
            },
        )
    }

    /// Fixed-duration bitmap
    pub fn bitmap(data: &'static [u8], width: i32, height: i32, duration_ms: i32) -> Self {
        Self::new(
            duration_ms,
            ActionKind::Bitmap {
                data,
                width,
                height,
            },
        )
    }

    /// Children played back-to-back; `repeat` cycles (0 = forever)
    ///
    /// Passing a child id transfers the caller's arena reference to the
    /// sequence; `retain` first to also keep it.
    pub fn sequence(
        children: &[ActionId],
        repeat: u8,
        tag: Option<SequenceTag>,
    ) -> Self {
        let mut vec = Vec::new();
        for &id in children.iter().take(MAX_SEQUENCE_LEN) {
            let _ = vec.push(id);
        }
        Self::new(
            DURATION_INFINITE,
            ActionKind::Sequence {
                children: vec,
                index: 0,
                repeat,
                cycles_done: 0,
                tag,
            },
        )
    }

    /// Menu adapter slot (infinite; the controller finishes it)
    pub fn menu_view() -> Self {
        let mut action = Self::new(DURATION_INFINITE, ActionKind::MenuView { line: String::new() });
        action.font = Some(Font::TINY);
        action
    }

    /// Directional hand-off from `from` to `to` along `axis`
    ///
    /// Child ids transfer their reference like [`Action::sequence`].
    /// `None` is the blank sentinel (slide in from / out to blank).
    pub fn slide(
        from: Option<ActionId>,
        to: Option<ActionId>,
        duration_ms: i32,
        axis: Coords,
    ) -> Self {
        Self::new(duration_ms, ActionKind::Transition { from, to, axis })
    }

    /// Move the action's own origin offset
    pub fn with_origin(mut self, origin: Coords) -> Self {
        self.origin = origin;
        self
    }

    /// Use a specific font instead of the backend default
    pub fn with_font(mut self, font: Font) -> Self {
        self.font = Some(font);
        self
    }

    /// Whether the action has completed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Force completion (externally-driven, e.g. menu exit)
    pub fn set_finished(&mut self) {
        self.finished = true;
    }

    /// Total time this action has been ticked, in milliseconds
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    /// Configured duration (negative = infinite)
    pub fn duration_ms(&self) -> i32 {
        self.duration_ms
    }

    /// Feed a new value into a value display; starts a digit roll
    ///
    /// No-op for other variants or unparseable text.
    pub fn update_value(&mut self, text: &str) {
        let ActionKind::Value(state) = &mut self.kind else {
            return;
        };
        let Some(number) = Number::parse(text) else {
            return;
        };

        // Rescale previous state if the feed changed precision
        if number.decimals != state.decimals {
            let old = Number {
                mantissa: state.shown,
                decimals: state.decimals,
            };
            state.shown = old.scaled_to(number.decimals);
            state.decimals = number.decimals;
        }

        state.roll_from = if state.has_value { state.shown } else { 0 };
        state.target = number.mantissa;
        state.roll_elapsed_ms = 0;
        let distance = state.target.saturating_sub(state.roll_from);
        state.roll_total_ms = if distance == 0 {
            0
        } else {
            digit_count(distance) * 1000 / state.speed_digits_s
        };
        state.has_value = true;
        state.since_update_ms = 0;
    }

    /// Record the all-time-high threshold
    pub fn set_ath(&mut self, text: &str) {
        if let ActionKind::Value(state) = &mut self.kind {
            state.ath = Number::parse(text);
        }
    }

    /// Change the staleness threshold (0 disables)
    ///
    /// The seconds field comes off the wire unbounded; saturate rather
    /// than trust it.
    pub fn set_value_timeout(&mut self, secs: u32) {
        if let ActionKind::Value(state) = &mut self.kind {
            state.timeout_ms = if secs == 0 {
                None
            } else {
                Some(secs.saturating_mul(1_000))
            };
        }
    }

    /// Forget the current value (shown again only after a fresh update)
    pub fn reset_value(&mut self) {
        if let ActionKind::Value(state) = &mut self.kind {
            state.has_value = false;
            state.shown = 0;
            state.target = 0;
            state.roll_total_ms = 0;
            state.ath = None;
        }
    }

    /// Currently rendered value, for display-state inspection
    pub fn current_value(&self) -> Option<Number> {
        match &self.kind {
            ActionKind::Value(state) if state.has_value => Some(Number {
                mantissa: state.shown,
                decimals: state.decimals,
            }),
            _ => None,
        }
    }

    /// Update the clock text (marks time as set)
    pub fn update_time(&mut self, text: &str) {
        if let ActionKind::Clock { time, time_set, .. } = &mut self.kind {
            time.clear();
            for c in text.chars() {
                if time.push(c).is_err() {
                    break;
                }
            }
            *time_set = true;
        }
    }

    /// Pin or unpin the clock
    pub fn set_always_on(&mut self, on: bool) {
        if let ActionKind::Clock { always_on, .. } = &mut self.kind {
            *always_on = on;
        }
    }

    /// Whether the clock is pinned
    pub fn is_always_on(&self) -> bool {
        matches!(self.kind, ActionKind::Clock { always_on: true, .. })
    }

    /// Whether the clock received its first time update
    pub fn is_time_set(&self) -> bool {
        matches!(self.kind, ActionKind::Clock { time_set: true, .. })
    }

    /// Refresh the menu adapter line
    pub fn set_menu_line(&mut self, text: &str) {
        if let ActionKind::MenuView { line } = &mut self.kind {
            line.clear();
            for c in text.chars().take(MAX_MENU_LINE) {
                let _ = line.push(c);
            }
        }
    }

    /// Advance non-composite animation state; composite recursion is the
    /// arena's job
    pub(crate) fn advance(&mut self, elapsed_ms: u32) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);

        match &mut self.kind {
            ActionKind::Value(state) => {
                state.since_update_ms = state.since_update_ms.saturating_add(elapsed_ms);
                if state.roll_total_ms > 0 {
                    state.roll_elapsed_ms =
                        state.roll_elapsed_ms.saturating_add(elapsed_ms);
                }
                state.shown = if state.roll_total_ms == 0
                    || state.roll_elapsed_ms >= state.roll_total_ms
                {
                    state.target
                } else {
                    let span = state.target.saturating_sub(state.roll_from);
                    state.roll_from.saturating_add(
                        span.saturating_mul(state.roll_elapsed_ms as i64)
                            / state.roll_total_ms as i64,
                    )
                };
            }
            ActionKind::ScrollingText {
                speed_px_s,
                once: true,
                loop_px: Some(loop_px),
                ..
            } => {
                let scrolled = self.elapsed_ms as i64 * *speed_px_s as i64 / 1000;
                if scrolled >= *loop_px as i64 {
                    self.finished = true;
                }
            }
            _ => {}
        }

        if self.duration_ms >= 0 {
            let done = match self.kind {
                // A transition completes strictly after its duration
                ActionKind::Transition { .. } => {
                    self.elapsed_ms > self.duration_ms as u32
                }
                // A pinned clock ignores its dwell duration
                ActionKind::Clock { always_on: true, .. } => false,
                _ => self.elapsed_ms >= self.duration_ms as u32,
            };
            if done {
                self.finished = true;
            }
        }
    }

    /// Draw a non-composite action; composites are rendered by the arena
    pub(crate) fn draw_leaf<T: RenderTarget>(&mut self, target: &mut T, coords: Coords) {
        let at = coords + self.origin;
        match &mut self.kind {
            ActionKind::StaticText { text } => {
                target.draw_text(at, text, self.font);
            }
            ActionKind::ScrollingText {
                text,
                speed_px_s,
                loop_px,
                ..
            } => {
                let total = *loop_px.get_or_insert_with(|| {
                    target.text_width(text, self.font) + target.width()
                });
                if total > 0 {
                    let offset =
                        (self.elapsed_ms as i64 * *speed_px_s as i64 / 1000 % total as i64) as i32;
                    let x = target.width() - offset;
                    target.draw_text(at + Coords::new(x, 0), text, self.font);
                }
            }
            ActionKind::Value(state) => {
                let stale = matches!(
                    state.timeout_ms,
                    Some(limit) if state.since_update_ms > limit
                );
                if !state.has_value || stale {
                    target.draw_text(at, "----", self.font);
                    return;
                }
                let text = format_scaled(state.shown, state.decimals);
                target.draw_text(at, &text, self.font);

                let shown = Number {
                    mantissa: state.shown,
                    decimals: state.decimals,
                };
                if matches!(&state.ath, Some(ath) if shown.at_least(ath)) {
                    let after = target.text_width(&text, self.font) + 2;
                    target.draw_glyph(at + Coords::new(after, 0), '^', self.font);
                }
            }
            ActionKind::Clock { time, time_set, .. } => {
                if *time_set {
                    target.draw_text(at, time, self.font);
                }
            }
            ActionKind::Bitmap {
                data,
                width,
                height,
            } => {
                target.draw_bitmap(at, *width, *height, data);
            }
            ActionKind::MenuView { line } => {
                target.draw_text(at, line, self.font);
            }
            // Handled by ActionArena::draw
            ActionKind::Sequence { .. } | ActionKind::Transition { .. } => {}
        }
    }
}

fn copy_str(text: &str) -> String<MAX_TEXT_LEN> {
    let mut out = String::new();
    for c in text.chars().take(MAX_TEXT_LEN) {
        let _ = out.push(c);
    }
    out
}

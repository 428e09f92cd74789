//! Display controller
//!
//! The orchestrating layer tying scheduler, menu and channel together:
//! display modes, announcement sequencing, clock/price interleave, the
//! OTP display flow, the boot logo, button handling and parameter side
//! effects. Constructed once and driven from the platform's fixed-cadence
//! loop.
//!
//! Platform-level effects (restart, persistence, portal, firmware update)
//! are emitted as [`Command`]s, never performed here.

use coinsign_display::{Coords, Font, RenderTarget};
use heapless::{Deque, String};

use crate::action::{Action, ActionArena, ActionId, SequenceTag, DURATION_INFINITE};
use crate::channel::ChannelEvent;
use crate::config::ParameterStore;
use crate::fmt::{debug, info, warn};
use crate::menu::{Menu, MenuEvent};
use crate::scheduler::{ActionScheduler, SchedulerEvent};
use crate::time::Instant;

/// Digit-roll speed of the price display
pub const PRICE_ROLL_DIGITS_PER_S: u32 = 10;

/// Clock dwell time per interleave appearance
pub const CLOCK_DWELL_MS: i32 = 3_000;

/// Slide transition duration
pub const SLIDE_MS: i32 = 500;

/// Scroll speed of one-shot announcement text
pub const ANNOUNCEMENT_SCROLL_PX_S: i32 = 20;

/// OTP display given up after this long without an ack
pub const OTP_TIMEOUT_MS: u32 = 180_000;

const TAG_ANNOUNCEMENT: SequenceTag = 1;

/// Boot logo, 32x8 1-bit frames
const LOGO_COIN: [u8; 32] = [
    0x3c, 0x42, 0x99, 0xbd, 0xbd, 0x99, 0x42, 0x3c, 0x00, 0x18, 0x3c, 0x3c, 0x18, 0x00, 0x00,
    0x00, 0x3c, 0x42, 0x99, 0xbd, 0xbd, 0x99, 0x42, 0x3c, 0x00, 0x18, 0x3c, 0x3c, 0x18, 0x00,
    0x00, 0x00,
];
const LOGO_WORDMARK: [u8; 32] = [
    0xff, 0x81, 0xbd, 0xa5, 0xa5, 0xbd, 0x81, 0xff, 0xff, 0x81, 0xbd, 0xa5, 0xa5, 0xbd, 0x81,
    0xff, 0xff, 0x81, 0xbd, 0xa5, 0xa5, 0xbd, 0x81, 0xff, 0xff, 0x81, 0xbd, 0xa5, 0xa5, 0xbd,
    0x81, 0xff,
];

/// What the display is currently dedicated to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Ticker,
    Menu,
    Announcement,
    Otp,
    Portal,
    Update,
}

/// Debounced button gesture, supplied by the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    Short,
    Long,
    SuperLong,
}

/// Platform-level effect requested by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Restart the device
    Restart,
    /// Persist the parameter store
    PersistConfig,
    /// Download and flash a firmware image, then restart
    FirmwareUpdate,
    /// Wipe settings and restart
    FactoryReset,
    /// Start the on-demand provisioning portal
    StartConfigPortal,
    /// Ask the channel to request a one-time passcode
    RequestOtp,
}

#[derive(Debug, Clone)]
struct PendingAnnouncement {
    message: String<96>,
    static_display: bool,
    display_secs: u32,
}

/// Orchestration layer over scheduler, menu and channel events
pub struct Controller {
    arena: ActionArena,
    scheduler: ActionScheduler,
    menu: Menu,
    mode: Mode,
    prev_mode: Mode,
    price: ActionId,
    clock: ActionId,
    menu_view: Option<ActionId>,
    pending: Option<PendingAnnouncement>,
    reset_price_on_next_update: bool,
    last_clock_at: Instant,
    otp_started_at: Option<Instant>,
    device_info: String<96>,
    commands: Deque<Command, 8>,
}

impl Controller {
    /// Build the controller and queue the boot logo sequence
    ///
    /// `device_info` is the version/uuid banner shown by the menu's Info
    /// item.
    pub fn new(store: &ParameterStore, device_info: &str, now: Instant) -> Self {
        let mut arena = ActionArena::new();
        let mut scheduler = ActionScheduler::new();

        // the controller keeps a permanent reference to both
        let price = arena
            .alloc(Action::value(PRICE_ROLL_DIGITS_PER_S))
            .unwrap_or_else(|| unreachable!("empty arena"));
        let clock = arena
            .alloc(Action::clock(CLOCK_DWELL_MS))
            .unwrap_or_else(|| unreachable!("empty arena"));
        if store.get_int("clock_mode") == Some(2) {
            if let Some(action) = arena.get_mut(clock) {
                action.set_always_on(true);
            }
        }

        boot_logo(&mut arena, &mut scheduler);

        arena.retain(price);
        scheduler.append(&mut arena, price);

        let mut info = String::new();
        for c in device_info.chars() {
            if info.push(c).is_err() {
                break;
            }
        }

        Self {
            arena,
            scheduler,
            menu: Menu::new(),
            mode: Mode::Ticker,
            prev_mode: Mode::Ticker,
            price,
            clock,
            menu_view: None,
            pending: None,
            reset_price_on_next_update: false,
            last_clock_at: now,
            otp_started_at: None,
            device_info: info,
            commands: Deque::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Pop the next platform command
    pub fn next_command(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    fn push_command(&mut self, command: Command) {
        if self.commands.push_back(command).is_err() {
            warn!("command queue full");
        }
    }

    /// Feed the wall-clock time (platform NTP collaborator)
    pub fn set_time(&mut self, formatted: &str) {
        if let Some(clock) = self.arena.get_mut(self.clock) {
            clock.update_time(formatted);
        }
    }

    /// Outcome of a previously requested OTP send
    pub fn notify_otp_request_result(&mut self, sent: bool) {
        let banner = Action::static_text(if sent { "-OK-" } else { "Failed" }, 2_000);
        if let Some(id) = self.arena.alloc(banner) {
            self.scheduler.prepend(&mut self.arena, id);
        }
    }

    /// React to channel activity
    pub fn handle_channel_event(&mut self, event: ChannelEvent, now: Instant) {
        match event {
            ChannelEvent::PriceUpdate(value) => {
                let reset = core::mem::take(&mut self.reset_price_on_next_update);
                if let Some(price) = self.arena.get_mut(self.price) {
                    if reset {
                        price.reset_value();
                    }
                    price.update_value(&value);
                }
            }
            ChannelEvent::AllTimeHigh(value) => {
                if let Some(price) = self.arena.get_mut(self.price) {
                    price.set_ath(&value);
                }
            }
            ChannelEvent::DataTimeout(secs) => {
                if let Some(price) = self.arena.get_mut(self.price) {
                    price.set_value_timeout(secs);
                }
            }
            ChannelEvent::Announcement {
                message,
                static_display,
                display_secs,
            } => {
                // latch one at a time; the rest is dropped
                if self.pending.is_none() {
                    self.pending = Some(PendingAnnouncement {
                        message,
                        static_display,
                        display_secs,
                    });
                }
            }
            ChannelEvent::UpdateRequested => {
                info!("firmware update requested");
                self.mode = Mode::Update;
                self.prepend_scroll_banner("UPDATING... ");
                self.push_command(Command::FirmwareUpdate);
            }
            ChannelEvent::RestartRequested => self.push_command(Command::Restart),
            ChannelEvent::ParamChanged => {} // picked up via dirty flags
            ChannelEvent::Otp(code) => self.start_otp_display(&code, now),
            ChannelEvent::OtpAck => {
                if self.mode == Mode::Otp {
                    self.force_ticker_mode();
                }
            }
            ChannelEvent::NewSettingsLoaded => {
                self.reset_price_on_next_update = true;
            }
            ChannelEvent::SendQueueFull => warn!("channel dropped outbound messages"),
        }
    }

    /// React to a button gesture
    pub fn handle_button(&mut self, event: ButtonEvent, store: &mut ParameterStore) {
        match self.mode {
            Mode::Menu => self.handle_menu_button(event, store),
            Mode::Otp => {
                if event == ButtonEvent::Short {
                    self.force_ticker_mode();
                }
            }
            Mode::Portal | Mode::Update => {}
            Mode::Ticker | Mode::Announcement => match event {
                ButtonEvent::Short => self.enter_menu(store),
                ButtonEvent::Long => {
                    self.mode = Mode::Portal;
                    self.prepend_scroll_banner("CONFIG... ");
                    self.push_command(Command::StartConfigPortal);
                }
                ButtonEvent::SuperLong => self.start_factory_reset(),
            },
        }
    }

    fn handle_menu_button(&mut self, event: ButtonEvent, store: &mut ParameterStore) {
        let outcome = match event {
            ButtonEvent::Short => self.menu.short_press(),
            ButtonEvent::Long | ButtonEvent::SuperLong => self.menu.long_press(store),
        };
        match outcome {
            Some(MenuEvent::Exited) => self.exit_menu(),
            Some(MenuEvent::ValueCommitted) => {} // dirty flags persist via apply_config
            Some(MenuEvent::TriggerOtp) => {
                self.menu.end();
                self.exit_menu();
                self.push_command(Command::RequestOtp);
            }
            Some(MenuEvent::ShowDeviceInfo) => {
                let mut message = String::new();
                let _ = message.push_str(&self.device_info);
                self.pending = Some(PendingAnnouncement {
                    message,
                    static_display: false,
                    display_secs: 0,
                });
                self.menu.end();
                self.exit_menu();
            }
            Some(MenuEvent::FactoryReset) => {
                self.menu.end();
                self.exit_menu();
                self.start_factory_reset();
            }
            None => {}
        }
    }

    fn start_factory_reset(&mut self) {
        self.prepend_scroll_banner("RESET... ");
        self.push_command(Command::FactoryReset);
    }

    fn prepend_scroll_banner(&mut self, text: &str) {
        let banner = Action::scrolling_text(text, ANNOUNCEMENT_SCROLL_PX_S, DURATION_INFINITE);
        if let Some(id) = self.arena.alloc(banner) {
            self.scheduler.prepend(&mut self.arena, id);
        }
    }

    fn enter_menu(&mut self, store: &ParameterStore) {
        if self.mode == Mode::Menu {
            return;
        }
        self.prev_mode = self.mode;
        self.mode = Mode::Menu;
        self.menu.start(store);

        if let Some(id) = self.arena.alloc(Action::menu_view()) {
            self.arena.retain(id); // keep a handle for line refresh
            self.scheduler.prepend(&mut self.arena, id);
            self.menu_view = Some(id);
        }
    }

    fn exit_menu(&mut self) {
        if let Some(id) = self.menu_view.take() {
            self.arena.set_finished(id);
            self.arena.release(id);
        }
        self.mode = self.prev_mode;
        if self.clock_always_on() {
            self.show_clock();
        }
    }

    fn clock_always_on(&self) -> bool {
        self.arena
            .get(self.clock)
            .map(Action::is_always_on)
            .unwrap_or(false)
    }

    /// Pin the clock as sole content
    fn show_clock(&mut self) {
        if self.scheduler.top() == Some(self.clock) {
            return;
        }
        self.scheduler.clean_queue(&mut self.arena);
        self.arena.reset(self.clock);
        self.arena.retain(self.clock);
        self.scheduler.prepend(&mut self.arena, self.clock);
    }

    /// Drop everything interrupting the ticker and reinstall it
    fn force_ticker_mode(&mut self) {
        if self.mode == Mode::Otp {
            // the repeating OTP sequence would otherwise linger in the queue
            self.scheduler.remove_top(&mut self.arena);
            self.otp_started_at = None;
        }
        self.mode = Mode::Ticker;
        self.scheduler.clean_queue(&mut self.arena);
        if self.clock_always_on() {
            self.show_clock();
        } else if self.scheduler.top() != Some(self.price) {
            self.arena.retain(self.price);
            self.scheduler.prepend(&mut self.arena, self.price);
        }
    }

    /// Repeating OTP slide sequence, dismissed by ack, button or timeout
    fn start_otp_display(&mut self, code: &str, now: Instant) {
        let Some(label) = self.arena.alloc(Action::static_text("OTP:", 800)) else {
            return;
        };
        let Some(code) = self.arena.alloc(Action::static_text(code, 5_000)) else {
            self.arena.release(label);
            return;
        };
        // label and code each appear standalone and in two slides
        self.arena.retain(label);
        self.arena.retain(label);
        self.arena.retain(code);
        self.arena.retain(code);

        let axis = Coords::new(-1, 0);
        let to_code = Action::slide(Some(label), Some(code), SLIDE_MS, axis);
        let to_label = Action::slide(Some(code), Some(label), SLIDE_MS, axis);
        let Some(to_code) = self.arena.alloc(to_code) else {
            return;
        };
        let Some(to_label) = self.arena.alloc(to_label) else {
            return;
        };

        let seq = Action::sequence(&[label, to_code, code, to_label], 0, None);
        let Some(seq) = self.arena.alloc(seq) else {
            return;
        };
        self.scheduler.prepend(&mut self.arena, seq);
        self.mode = Mode::Otp;
        self.otp_started_at = Some(now);
    }

    /// Slide the current content out, show the announcement, slide back
    fn start_announcement(&mut self, pending: PendingAnnouncement) {
        self.mode = Mode::Announcement;
        let current = self.scheduler.top();
        let axis = Coords::new(-1, 0);

        let body = announcement_body(&pending);
        let Some(body) = self.arena.alloc(body) else {
            return;
        };

        if let Some(current) = current {
            self.arena.retain(current);
            self.arena.retain(current);
        }
        let Some(out) = self.arena.alloc(Action::slide(current, None, SLIDE_MS, axis)) else {
            return;
        };
        let Some(back) = self.arena.alloc(Action::slide(None, current, SLIDE_MS, axis)) else {
            return;
        };

        let seq = Action::sequence(&[out, body, back], 1, Some(TAG_ANNOUNCEMENT));
        let Some(seq) = self.arena.alloc(seq) else {
            return;
        };
        self.scheduler.prepend(&mut self.arena, seq);
    }

    /// Swap the playing announcement for a new static one
    fn replace_announcement(&mut self, pending: PendingAnnouncement) {
        self.scheduler.remove_top(&mut self.arena);
        let current = self.scheduler.top();

        let body = announcement_body(&pending);
        let Some(body) = self.arena.alloc(body) else {
            return;
        };
        if let Some(current) = current {
            self.arena.retain(current);
        }
        let axis = Coords::new(-1, 0);
        let Some(back) = self.arena.alloc(Action::slide(None, current, SLIDE_MS, axis)) else {
            return;
        };
        let seq = Action::sequence(&[body, back], 1, Some(TAG_ANNOUNCEMENT));
        let Some(seq) = self.arena.alloc(seq) else {
            return;
        };
        self.scheduler.prepend(&mut self.arena, seq);
    }

    /// Interleave the clock into the ticker, or keep it pinned
    fn clock_moment(&mut self, store: &ParameterStore) {
        match store.get_int("clock_mode").unwrap_or(0) {
            0 => return,
            2 => {
                self.show_clock();
                return;
            }
            _ => {}
        }
        let time_set = self
            .arena
            .get(self.clock)
            .map(Action::is_time_set)
            .unwrap_or(false);
        if !time_set {
            return;
        }

        debug!("interleaving clock");
        self.arena.reset(self.clock);

        // price is referenced by both slides, the clock by both slides
        // plus its standalone dwell entry
        self.arena.retain(self.price);
        self.arena.retain(self.price);
        self.arena.retain(self.clock);
        self.arena.retain(self.clock);
        self.arena.retain(self.clock);

        let Some(slide_back) = self.arena.alloc(Action::slide(
            Some(self.clock),
            Some(self.price),
            SLIDE_MS,
            Coords::new(0, 1),
        )) else {
            return;
        };
        let Some(slide_out) = self.arena.alloc(Action::slide(
            Some(self.price),
            Some(self.clock),
            SLIDE_MS,
            Coords::new(0, -1),
        )) else {
            return;
        };

        self.scheduler.prepend(&mut self.arena, slide_back);
        self.scheduler.prepend(&mut self.arena, self.clock);
        self.scheduler.prepend(&mut self.arena, slide_out);
    }

    /// One drive cycle: mode housekeeping, then the scheduler tick
    pub fn tick(&mut self, store: &ParameterStore, elapsed_ms: u32, now: Instant) {
        // OTP display gives up after its timeout
        if self.mode == Mode::Otp {
            if let Some(started) = self.otp_started_at {
                if now.ms_since(started) >= OTP_TIMEOUT_MS {
                    debug!("otp display timed out");
                    self.force_ticker_mode();
                }
            }
        }

        // latched announcement waits for the ticker (or replaces a
        // playing one when static)
        match self.mode {
            Mode::Ticker => {
                if let Some(pending) = self.pending.take() {
                    self.start_announcement(pending);
                }
            }
            Mode::Announcement => {
                if let Some(pending) = self.pending.take() {
                    if pending.static_display {
                        self.replace_announcement(pending);
                    }
                    // non-static arrivals are dropped mid-announcement
                }
            }
            _ => {}
        }

        // clock interleave on its configured cadence
        if self.mode == Mode::Ticker {
            let interval_ms =
                (store.get_int("clock_interval").unwrap_or(30).max(5) as u32) * 1_000;
            if now.ms_since(self.last_clock_at) >= interval_ms {
                self.last_clock_at = now;
                self.clock_moment(store);
            }
        }

        // menu line mirrors the menu state
        if let Some(view) = self.menu_view {
            let line = self.menu.current_line();
            if let Some(action) = self.arena.get_mut(view) {
                action.set_menu_line(&line);
            }
        }

        match self.scheduler.tick(&mut self.arena, elapsed_ms) {
            Some(SchedulerEvent::SequenceFinished(TAG_ANNOUNCEMENT)) => {
                if self.mode == Mode::Announcement {
                    self.mode = Mode::Ticker;
                }
            }
            Some(SchedulerEvent::SequenceFinished(_)) | Some(SchedulerEvent::QueueDrained)
            | None => {}
        }

        // fallback policy: the sequence must never stay empty
        if self.scheduler.is_empty() {
            if self.clock_always_on() {
                self.show_clock();
            } else {
                self.arena.retain(self.price);
                self.scheduler.append(&mut self.arena, self.price);
            }
        }
    }

    /// Render the active content
    pub fn draw<T: RenderTarget>(&mut self, target: &mut T) {
        target.clear();
        self.scheduler.draw(&mut self.arena, target);
    }

    /// Apply side effects of changed parameters and request persistence
    ///
    /// Values are clamped in place the way the firmware has always done,
    /// so out-of-range remote writes end up stored sanitized.
    pub fn apply_config<T: RenderTarget>(
        &mut self,
        store: &mut ParameterStore,
        target: &mut T,
    ) {
        let mut changed: heapless::Vec<&'static str, { crate::config::MAX_PARAMS }> =
            heapless::Vec::new();
        while let Some(name) = store.take_dirty() {
            let _ = changed.push(name);
        }
        if changed.is_empty() {
            return;
        }
        for name in &changed {
            self.apply_one(name, store, target);
        }
        // clamp write-backs re-flag items; persistence covers them
        while store.take_dirty().is_some() {}
        self.push_command(Command::PersistConfig);
    }

    /// Apply every parameter's side effect (boot-time initialization)
    pub fn init_config<T: RenderTarget>(&mut self, store: &mut ParameterStore, target: &mut T) {
        for name in [
            "brightness",
            "font",
            "rotate_display",
            "clock_mode",
            "clock_interval",
            "timezone",
        ] {
            self.apply_one(name, store, target);
        }
        while store.take_dirty().is_some() {}
    }

    fn apply_one<T: RenderTarget>(
        &mut self,
        name: &str,
        store: &mut ParameterStore,
        target: &mut T,
    ) {
        match name {
            "brightness" => {
                let level = store.get_int("brightness").unwrap_or(3).clamp(1, 5);
                store.set_int("brightness", level);
                target.set_brightness(brightness_level(level));
            }
            "font" => {
                let font = store.get_int("font").unwrap_or(0).clamp(0, 2);
                store.set_int("font", font);
                target.set_font(Font(font as u8));
            }
            "rotate_display" => {
                let rotate = store.get_int("rotate_display").unwrap_or(0).clamp(0, 1);
                store.set_int("rotate_display", rotate);
                target.set_rotation(rotate == 1);
            }
            "clock_mode" => {
                let mode = store.get_int("clock_mode").unwrap_or(1).clamp(0, 2);
                store.set_int("clock_mode", mode);
                if let Some(clock) = self.arena.get_mut(self.clock) {
                    clock.set_always_on(mode == 2);
                }
                if mode == 2 && self.mode == Mode::Ticker {
                    self.show_clock();
                }
            }
            "clock_interval" => {
                let interval = store.get_int("clock_interval").unwrap_or(30).max(5);
                store.set_int("clock_interval", interval);
            }
            "timezone" => {
                let tz = store.get_int("timezone").unwrap_or(1).clamp(-11, 13);
                store.set_int("timezone", tz);
            }
            "ticker_url" => {
                // feed changed under us; the shown value is stale
                if let Some(price) = self.arena.get_mut(self.price) {
                    price.reset_value();
                }
                self.pending = None;
            }
            _ => {}
        }
    }
}

/// Hardware brightness for the 1-5 user scale
fn brightness_level(level: i32) -> u8 {
    match level {
        1 => 0,
        2 => 16,
        3 => 32,
        4 => 64,
        _ => 128,
    }
}

fn announcement_body(pending: &PendingAnnouncement) -> Action {
    if pending.static_display {
        // display_secs comes off the wire unbounded
        let duration_ms = pending
            .display_secs
            .saturating_mul(1_000)
            .min(i32::MAX as u32) as i32;
        Action::static_text(&pending.message, duration_ms)
    } else {
        Action::scrolling_once(&pending.message, ANNOUNCEMENT_SCROLL_PX_S)
    }
}

/// Two logo frames joined by an upward slide
fn boot_logo(arena: &mut ActionArena, scheduler: &mut ActionScheduler) {
    let Some(coin) = arena.alloc(Action::bitmap(&LOGO_COIN, 32, 8, 1_500)) else {
        return;
    };
    let Some(wordmark) = arena.alloc(Action::bitmap(&LOGO_WORDMARK, 32, 8, 3_500)) else {
        return;
    };
    arena.retain(coin);
    arena.retain(wordmark);

    let slide = Action::slide(Some(coin), Some(wordmark), SLIDE_MS, Coords::new(0, -1));
    scheduler.append(arena, coin);
    if let Some(slide) = arena.alloc(slide) {
        scheduler.append(arena, slide);
    }
    scheduler.append(arena, wordmark);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelEvent;
    use coinsign_display::{CaptureTarget, DrawOp};

    const STEP_MS: u32 = 100;

    struct Harness {
        controller: Controller,
        store: ParameterStore,
        target: CaptureTarget,
        now: u32,
    }

    impl Harness {
        fn new() -> Self {
            let store = ParameterStore::with_defaults();
            let controller = Controller::new(&store, "v2.0.1 uuid abc123", Instant::from_ms(0));
            Self {
                controller,
                store,
                target: CaptureTarget::new(32, 8),
                now: 0,
            }
        }

        /// One drive cycle: tick then draw, like the platform loop
        fn step(&mut self) {
            self.now += STEP_MS;
            self.controller
                .tick(&self.store, STEP_MS, Instant::from_ms(self.now));
            self.target.reset();
            self.controller.draw(&mut self.target);
        }

        fn step_for(&mut self, ms: u32) {
            for _ in 0..(ms / STEP_MS) {
                self.step();
            }
        }

        fn skip_boot_logo(&mut self) {
            self.step_for(6_000);
        }

        fn event(&mut self, event: ChannelEvent) {
            self.controller
                .handle_channel_event(event, Instant::from_ms(self.now));
        }

        fn text_event(&mut self, message: &str, static_display: bool, display_secs: u32) {
            let mut m = String::new();
            let _ = m.push_str(message);
            self.event(ChannelEvent::Announcement {
                message: m,
                static_display,
                display_secs,
            });
        }
    }

    fn owned<const N: usize>(text: &str) -> String<N> {
        let mut out = String::new();
        let _ = out.push_str(text);
        out
    }

    #[test]
    fn test_boot_logo_then_price_placeholder() {
        let mut h = Harness::new();
        h.step();
        assert!(h
            .target
            .ops()
            .iter()
            .any(|op| matches!(op, DrawOp::Bitmap { .. })));

        h.skip_boot_logo();
        assert!(h.target.contains_text("----"));
    }

    #[test]
    fn test_price_update_reaches_display() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.event(ChannelEvent::PriceUpdate(owned("250")));
        h.step_for(2_000); // roll completes
        assert!(h.target.contains_text("250"));
    }

    #[test]
    fn test_announcement_cycle_returns_to_ticker() {
        let mut h = Harness::new();
        h.skip_boot_logo();
        h.event(ChannelEvent::PriceUpdate(owned("99")));

        h.text_event("Hello", true, 1);
        h.step();
        assert_eq!(h.controller.mode(), Mode::Announcement);

        // slide out + 1s static + slide back, with slack
        let mut shown = false;
        for _ in 0..40 {
            h.step();
            shown |= h.target.contains_text("Hello");
            if h.controller.mode() == Mode::Ticker {
                break;
            }
        }
        assert!(shown);
        assert_eq!(h.controller.mode(), Mode::Ticker);

        h.step_for(1_000);
        assert!(h.target.contains_text("99")); // price survived underneath
    }

    #[test]
    fn test_second_announcement_latched_until_ticker() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.text_event("first", true, 1);
        h.step();
        assert_eq!(h.controller.mode(), Mode::Announcement);

        // non-static arrival during playback is dropped
        h.text_event("second", false, 0);
        for _ in 0..40 {
            h.step();
            assert!(!h.target.contains_text("second"));
            if h.controller.mode() == Mode::Ticker {
                break;
            }
        }
        assert_eq!(h.controller.mode(), Mode::Ticker);
    }

    #[test]
    fn test_static_announcement_replaces_playing_one() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.text_event("first", true, 30);
        h.step_for(1_000); // past the slide, body playing
        assert!(h.target.contains_text("first"));

        h.text_event("second", true, 1);
        h.step();
        h.step();
        assert!(h.target.contains_text("second"));
    }

    #[test]
    fn test_static_announcement_with_huge_duration() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.text_event("forever", true, 3_000_000);
        h.step_for(2_000);
        assert_eq!(h.controller.mode(), Mode::Announcement);
        assert!(h.target.contains_text("forever"));
    }

    #[test]
    fn test_menu_entry_and_walkout() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.controller
            .handle_button(ButtonEvent::Short, &mut h.store);
        assert_eq!(h.controller.mode(), Mode::Menu);
        h.step();
        assert!(h.target.contains_text("OTP")); // first menu item

        // walk past every item
        for _ in 0..crate::menu::MAX_ITEMS {
            h.controller
                .handle_button(ButtonEvent::Short, &mut h.store);
        }
        assert_eq!(h.controller.mode(), Mode::Ticker);
        h.step_for(500);
        assert!(h.target.contains_text("----"));
    }

    #[test]
    fn test_menu_commit_requests_persist() {
        let mut h = Harness::new();
        h.skip_boot_logo();
        h.controller
            .handle_button(ButtonEvent::Short, &mut h.store);
        for _ in 0..3 {
            h.controller
                .handle_button(ButtonEvent::Short, &mut h.store);
        }
        h.controller.handle_button(ButtonEvent::Long, &mut h.store); // engage
        h.controller
            .handle_button(ButtonEvent::Short, &mut h.store); // 3 -> 4
        h.controller.handle_button(ButtonEvent::Long, &mut h.store); // commit

        let mut target = CaptureTarget::new(32, 8);
        h.controller.apply_config(&mut h.store, &mut target);
        assert_eq!(target.brightness(), 64);
        assert_eq!(h.controller.next_command(), Some(Command::PersistConfig));
    }

    #[test]
    fn test_clock_interleave() {
        let mut h = Harness::new();
        h.skip_boot_logo();
        h.controller.set_time("12:34");

        // somewhere in the first interleave window the clock must show
        let mut clock_seen = false;
        for _ in 0..350 {
            h.step();
            clock_seen |= h.target.contains_text("12:34");
        }
        assert!(clock_seen);

        // and the ticker comes back between appearances
        assert!(h.target.contains_text("----"));
    }

    #[test]
    fn test_clock_skipped_until_time_set() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.step_for(35_000);
        assert!(h.target.contains_text("----")); // still the price
    }

    #[test]
    fn test_always_on_clock_pins_after_config() {
        let mut h = Harness::new();
        h.skip_boot_logo();
        h.controller.set_time("07:00");

        h.store.set_if_exists("clock_mode", "2");
        let mut target = CaptureTarget::new(32, 8);
        h.controller.apply_config(&mut h.store, &mut target);

        h.step();
        assert!(h.target.contains_text("07:00"));
        h.step_for(10_000);
        assert!(h.target.contains_text("07:00")); // never times out
    }

    #[test]
    fn test_otp_flow_ack_dismisses() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.event(ChannelEvent::Otp(owned("4271")));
        assert_eq!(h.controller.mode(), Mode::Otp);

        let mut code_seen = false;
        for _ in 0..30 {
            h.step();
            code_seen |= h.target.contains_text("4271");
        }
        assert!(code_seen);

        h.event(ChannelEvent::OtpAck);
        assert_eq!(h.controller.mode(), Mode::Ticker);
        h.step();
        assert!(!h.target.contains_text("4271"));
    }

    #[test]
    fn test_otp_times_out() {
        let mut h = Harness::new();
        h.skip_boot_logo();
        h.event(ChannelEvent::Otp(owned("9999")));

        h.step_for(OTP_TIMEOUT_MS + 1_000);
        assert_eq!(h.controller.mode(), Mode::Ticker);
    }

    #[test]
    fn test_update_request_banners_and_commands() {
        let mut h = Harness::new();
        h.skip_boot_logo();

        h.event(ChannelEvent::UpdateRequested);
        assert_eq!(h.controller.mode(), Mode::Update);
        assert_eq!(h.controller.next_command(), Some(Command::FirmwareUpdate));
        h.step();
        assert!(h.target.contains_text("UPDATING... "));
    }

    #[test]
    fn test_restart_event_becomes_command() {
        let mut h = Harness::new();
        h.event(ChannelEvent::RestartRequested);
        assert_eq!(h.controller.next_command(), Some(Command::Restart));
    }

    #[test]
    fn test_new_settings_resets_price_on_next_update() {
        let mut h = Harness::new();
        h.skip_boot_logo();
        h.event(ChannelEvent::PriceUpdate(owned("100")));
        h.event(ChannelEvent::AllTimeHigh(owned("90")));
        h.step_for(2_000);

        h.event(ChannelEvent::NewSettingsLoaded);
        h.event(ChannelEvent::PriceUpdate(owned("5")));
        h.step_for(2_000);

        // ath marker cleared by the reset; rolls from zero, not from 100
        assert!(h.target.contains_text("5"));
        assert!(!h
            .target
            .ops()
            .iter()
            .any(|op| matches!(op, DrawOp::Glyph { glyph: '^', .. })));
    }

    #[test]
    fn test_brightness_clamped_and_mapped() {
        let mut h = Harness::new();
        h.store.set_if_exists("brightness", "9");
        let mut target = CaptureTarget::new(32, 8);
        h.controller.apply_config(&mut h.store, &mut target);

        assert_eq!(h.store.get("brightness"), Some("5"));
        assert_eq!(target.brightness(), 128);
    }

    #[test]
    fn test_long_press_starts_portal() {
        let mut h = Harness::new();
        h.skip_boot_logo();
        h.controller.handle_button(ButtonEvent::Long, &mut h.store);

        assert_eq!(h.controller.mode(), Mode::Portal);
        assert_eq!(h.controller.next_command(), Some(Command::StartConfigPortal));
    }
}

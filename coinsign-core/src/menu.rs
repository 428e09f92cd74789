//! On-device settings menu
//!
//! Driven by a single button: short press moves to the next item (or
//! adjusts an engaged item), long press engages an item (or commits it,
//! or fires it when the item is a trigger). Walking past the last item
//! ends the menu. Values load from and commit to the parameter store;
//! every commit asks the controller to persist.
//!
//! Rendering goes through the menu-view display action: the controller
//! copies [`Menu::current_line`] into it each cycle.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::ParameterStore;

/// Maximum menu items
pub const MAX_ITEMS: usize = 8;

/// One rendered menu line
pub type MenuLine = String<32>;

/// Menu outcome needing the controller's attention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuEvent {
    /// The menu ended; restore the previous display mode
    Exited,
    /// An engaged item was committed to the store; persist
    ValueCommitted,
    /// Request a one-time passcode from the peer
    TriggerOtp,
    /// Show the device-info announcement
    ShowDeviceInfo,
    /// Wipe settings and restart
    FactoryReset,
}

/// Trigger items fire one of these on long press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Otp,
    DeviceInfo,
    FactoryReset,
}

#[derive(Debug, Clone)]
enum ItemKind {
    /// Fires immediately on long press
    Action(Trigger),
    /// Integer cycling through `min..=max`
    Range { min: i32, max: i32, current: i32 },
    /// Index cycling through fixed labels
    Labeled {
        labels: &'static [&'static str],
        current: usize,
    },
}

#[derive(Debug, Clone)]
struct MenuItem {
    /// Store parameter name; `__`-prefixed items have no backing value
    name: &'static str,
    label: &'static str,
    /// Short prefix shown while engaged
    short: &'static str,
    kind: ItemKind,
}

impl MenuItem {
    fn value_text(&self) -> Option<MenuLine> {
        let mut out = MenuLine::new();
        match &self.kind {
            ItemKind::Action(_) => return None,
            ItemKind::Range { current, .. } => {
                let _ = write!(out, "{current}");
            }
            ItemKind::Labeled { current, .. } => {
                let _ = write!(out, "{current}");
            }
        }
        Some(out)
    }
}

/// The settings menu
pub struct Menu {
    items: Vec<MenuItem, MAX_ITEMS>,
    index: usize,
    engaged: bool,
    active: bool,
}

impl Menu {
    /// Menu with the firmware's item set
    pub fn new() -> Self {
        let mut items: Vec<MenuItem, MAX_ITEMS> = Vec::new();
        let _ = items.push(MenuItem {
            name: "__otp",
            label: "OTP",
            short: "OTP",
            kind: ItemKind::Action(Trigger::Otp),
        });
        let _ = items.push(MenuItem {
            name: "__info",
            label: "Info",
            short: "Info",
            kind: ItemKind::Action(Trigger::DeviceInfo),
        });
        let _ = items.push(MenuItem {
            name: "font",
            label: "Font",
            short: "Font",
            kind: ItemKind::Range {
                min: 0,
                max: 2,
                current: 0,
            },
        });
        let _ = items.push(MenuItem {
            name: "brightness",
            label: "Bright",
            short: "Bri",
            kind: ItemKind::Range {
                min: 1,
                max: 5,
                current: 3,
            },
        });
        let _ = items.push(MenuItem {
            name: "rotate_display",
            label: "Rotate",
            short: "R",
            kind: ItemKind::Labeled {
                labels: &["Off", "On"],
                current: 0,
            },
        });
        let _ = items.push(MenuItem {
            name: "clock_mode",
            label: "Clock",
            short: "C",
            kind: ItemKind::Labeled {
                labels: &["Off", "On", "Only"],
                current: 1,
            },
        });
        let _ = items.push(MenuItem {
            name: "timezone",
            label: "Tzone",
            short: "Tz",
            kind: ItemKind::Range {
                min: -11,
                max: 13,
                current: 1,
            },
        });
        let _ = items.push(MenuItem {
            name: "__erase",
            label: "ERASE",
            short: "ERASE",
            kind: ItemKind::Action(Trigger::FactoryReset),
        });
        Self {
            items,
            index: 0,
            engaged: false,
            active: false,
        }
    }

    /// Enter the menu, loading current values from the store
    pub fn start(&mut self, store: &ParameterStore) {
        self.index = 0;
        self.engaged = false;
        self.active = true;
        for item in &mut self.items {
            let Some(value) = store.get_int(item.name) else {
                continue;
            };
            match &mut item.kind {
                ItemKind::Range { current, .. } => *current = value,
                ItemKind::Labeled { labels, current } => {
                    *current = (value.max(0) as usize).min(labels.len() - 1)
                }
                ItemKind::Action(_) => {}
            }
        }
    }

    /// Leave the menu without walking to the end
    pub fn end(&mut self) {
        self.active = false;
        self.engaged = false;
        self.index = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Short press: advance to the next item, or adjust an engaged one
    pub fn short_press(&mut self) -> Option<MenuEvent> {
        if !self.active {
            return None;
        }
        if self.engaged {
            match &mut self.items[self.index].kind {
                ItemKind::Range { min, max, current } => {
                    *current += 1;
                    if *current > *max {
                        *current = *min;
                    }
                }
                ItemKind::Labeled { labels, current } => {
                    *current = (*current + 1) % labels.len();
                }
                ItemKind::Action(_) => {}
            }
            return None;
        }
        self.index += 1;
        if self.index >= self.items.len() {
            self.end();
            return Some(MenuEvent::Exited);
        }
        None
    }

    /// Long press: engage, commit, or fire the current item
    pub fn long_press(&mut self, store: &mut ParameterStore) -> Option<MenuEvent> {
        if !self.active {
            return None;
        }
        let item = &self.items[self.index];

        if let ItemKind::Action(trigger) = &item.kind {
            return Some(match trigger {
                Trigger::Otp => MenuEvent::TriggerOtp,
                Trigger::DeviceInfo => MenuEvent::ShowDeviceInfo,
                Trigger::FactoryReset => MenuEvent::FactoryReset,
            });
        }

        if !self.engaged {
            self.engaged = true;
            return None;
        }
        self.engaged = false;
        if let Some(value) = item.value_text() {
            store.set_if_exists(item.name, &value);
        }
        Some(MenuEvent::ValueCommitted)
    }

    /// Line to render for the current item
    pub fn current_line(&self) -> MenuLine {
        let mut out = MenuLine::new();
        if !self.active {
            return out;
        }
        let item = &self.items[self.index];
        if !self.engaged {
            let _ = out.push_str(item.label);
            return out;
        }
        let _ = out.push_str(item.short);
        match &item.kind {
            ItemKind::Range { current, .. } => {
                let _ = write!(out, " {current}");
            }
            ItemKind::Labeled { labels, current } => {
                let _ = write!(out, " {}", labels[*current]);
            }
            ItemKind::Action(_) => {}
        }
        out
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

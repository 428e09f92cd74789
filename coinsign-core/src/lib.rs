//! Board-agnostic core logic for the Coinsign ticker firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Display actions (text, scrolling text, price, clock, bitmap,
//!   sequences, slide transitions) and the arena they live in
//! - The action scheduler driving the active display content
//! - The data channel state machine (connection lifecycle, reconnect
//!   policy, heartbeat, rate-limited outbound queue, inbound directives)
//! - The parameter store shared by menu, remote directives and persistence
//! - The on-device settings menu
//! - The controller tying the pieces together
//!
//! Hardware concerns (panel driving, WiFi provisioning, flash storage,
//! button debouncing, firmware flashing, the transport socket) are
//! external collaborators behind traits.

#![no_std]
#![deny(unsafe_code)]

mod fmt;

pub mod action;
pub mod channel;
pub mod config;
pub mod controller;
pub mod menu;
pub mod scheduler;
pub mod time;

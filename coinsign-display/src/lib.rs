//! Render capability surface for the Coinsign firmware
//!
//! The application core draws through the [`RenderTarget`] trait and never
//! touches hardware directly. Board crates implement the trait for their
//! panel (OLED matrix, 7-segment, LED strip); host tests use
//! [`CaptureTarget`], which records draw calls instead of rendering them.

#![no_std]
#![deny(unsafe_code)]

mod backend;
mod capture;

pub use backend::{Coords, Font, RenderTarget};
pub use capture::{CaptureTarget, DrawOp, MAX_CAPTURED_OPS};

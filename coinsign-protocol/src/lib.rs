//! Ticker feed text protocol
//!
//! One logical message per transport frame, no extra framing. A frame is
//! either:
//!
//! - a **directive**, prefixed with `;` (e.g. `;PARAM brightness 4`),
//! - a **bare value update** (starts with a digit, or `-` followed by a
//!   digit, e.g. `123.45`),
//! - or anything else, which is ignored after logging.
//!
//! Canonical outbound formats:
//!
//! - handshake: `;HELLO <model> <uuid> <version> <checksum>`
//! - parameter push: `;PARAM <name> <value>` (first space after the name is
//!   the only separator)
//! - heartbeat: `;HB` (peer-echoed)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod inbound;
pub mod outbound;

pub use inbound::{classify, Directive, Inbound};
pub use outbound::{diag, heartbeat, hello, otp_request, param, Message, MAX_MESSAGE_LEN};

/// Leading delimiter that marks a frame as a directive
pub const DIRECTIVE_PREFIX: char = ';';

//! Outbound message builders
//!
//! Builders return bounded strings; anything that would overflow
//! [`MAX_MESSAGE_LEN`] is truncated rather than split across frames.

use core::fmt::Write;

use heapless::String;

/// Maximum outbound message length in bytes
///
/// Sized for `;HELLO` carrying a 36-char UUID and an MD5 checksum.
pub const MAX_MESSAGE_LEN: usize = 160;

/// A bounded outbound text message
pub type Message = String<MAX_MESSAGE_LEN>;

/// Handshake: `;HELLO <model> <uuid> <version> <checksum>`
pub fn hello(model: &str, uuid: &str, version: &str, checksum: &str) -> Message {
    let mut msg = Message::new();
    let _ = write!(msg, ";HELLO {model} {uuid} {version} {checksum}");
    msg
}

/// Parameter push: `;PARAM <name> <value>`
pub fn param(name: &str, value: &str) -> Message {
    let mut msg = Message::new();
    let _ = write!(msg, ";PARAM {name} {value}");
    msg
}

/// Diagnostic info: `;DIAG <key> <value>`
pub fn diag(key: &str, value: &str) -> Message {
    let mut msg = Message::new();
    let _ = write!(msg, ";DIAG {key} {value}");
    msg
}

/// Heartbeat: `;HB`
pub fn heartbeat() -> Message {
    let mut msg = Message::new();
    let _ = msg.push_str(";HB");
    msg
}

/// One-time-passcode request: `;OTP_REQ`
pub fn otp_request() -> Message {
    let mut msg = Message::new();
    let _ = msg.push_str(";OTP_REQ");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::{classify, Directive, Inbound};

    #[test]
    fn test_hello_format() {
        let msg = hello(
            "3",
            "bb1f2679-c2e4-4a41-9312-4a5b6e3a1f0e",
            "1.2.0",
            "d41d8cd98f00b204e9800998ecf8427e",
        );
        assert_eq!(
            msg.as_str(),
            ";HELLO 3 bb1f2679-c2e4-4a41-9312-4a5b6e3a1f0e 1.2.0 d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_param_roundtrips_through_parser() {
        let msg = param("brightness", "4");
        assert_eq!(
            classify(&msg),
            Inbound::Directive(Directive::Param {
                name: "brightness",
                value: "4"
            })
        );
    }

    #[test]
    fn test_heartbeat_matches_peer_echo() {
        let msg = heartbeat();
        assert_eq!(classify(&msg), Inbound::Directive(Directive::Heartbeat));
    }

    #[test]
    fn test_diag_format() {
        assert_eq!(
            diag("last_reset_reason", "power-on").as_str(),
            ";DIAG last_reset_reason power-on"
        );
    }
}

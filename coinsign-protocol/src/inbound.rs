//! Inbound frame classification and directive parsing
//!
//! Parsing is zero-copy: directives borrow their fields from the frame.
//! Malformed directives (missing separator, non-numeric field) degrade to
//! [`Directive::Unknown`], which callers log and drop.

/// A classified inbound text frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Inbound<'a> {
    /// Control message (`;`-prefixed)
    Directive(Directive<'a>),
    /// Bare numeric value update
    Value(&'a str),
    /// Empty or unclassifiable text; log and drop
    Ignored(&'a str),
}

/// A parsed directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Directive<'a> {
    /// Firmware update requested by the peer
    Update,
    /// Immediate device restart
    Reset,
    /// All-time-high notification with the record value
    AllTimeHigh(&'a str),
    /// Announcement to interleave into the display
    Announcement {
        message: &'a str,
        /// Static text rather than a scrolling one-shot
        static_display: bool,
        /// Display time in seconds (static announcements only)
        display_secs: u32,
    },
    /// Remote parameter change
    Param { name: &'a str, value: &'a str },
    /// One-time passcode delivery
    Otp(&'a str),
    /// Peer confirmed the one-time passcode
    OtpAck,
    /// New staleness threshold for the displayed value, in seconds
    DataTimeout(u32),
    /// Peer asks for a full configuration dump
    GetParams,
    /// Peer finished loading a new settings profile
    NewSettingsLoaded,
    /// Heartbeat echo
    Heartbeat,
    /// Server welcome banner
    Welcome,
    /// Unrecognized or malformed directive; log and drop
    Unknown(&'a str),
}

/// Classify a text frame
pub fn classify(text: &str) -> Inbound<'_> {
    if text.is_empty() {
        return Inbound::Ignored(text);
    }
    if text.starts_with(';') {
        return Inbound::Directive(parse_directive(text));
    }
    if is_value(text) {
        Inbound::Value(text)
    } else {
        Inbound::Ignored(text)
    }
}

/// Value updates start with a digit, or `-` followed by a digit
fn is_value(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') => matches!(chars.next(), Some(c) if c.is_ascii_digit()),
        _ => false,
    }
}

fn parse_directive(text: &str) -> Directive<'_> {
    if text == ";UPDATE" {
        Directive::Update
    } else if text.starts_with(";RESET") {
        Directive::Reset
    } else if let Some(value) = text.strip_prefix(";ATH=") {
        Directive::AllTimeHigh(value)
    } else if let Some(message) = strip_either(text, ";MSG ", ";MSG=") {
        Directive::Announcement {
            message,
            static_display: false,
            display_secs: 0,
        }
    } else if let Some(rest) = strip_either(text, ";MSGSTATIC ", ";STATICMSG ") {
        parse_static_announcement(text, rest)
    } else if let Some(pair) = text.strip_prefix(";PARAM ") {
        // First space after the name is the only separator
        match pair.split_once(' ') {
            Some((name, value)) => Directive::Param { name, value },
            None => Directive::Unknown(text),
        }
    } else if text.starts_with(";OTP_ACK") {
        Directive::OtpAck
    } else if let Some(code) = strip_either(text, ";OTP ", ";OTP=") {
        Directive::Otp(code)
    } else if let Some(rest) = text.strip_prefix(";DATA_TIMEOUT") {
        match rest
            .strip_prefix('=')
            .or_else(|| rest.strip_prefix(' '))
            .and_then(|secs| secs.parse::<u32>().ok())
        {
            Some(secs) => Directive::DataTimeout(secs),
            None => Directive::Unknown(text),
        }
    } else if text.starts_with(";GET_PARAMS") {
        Directive::GetParams
    } else if text.starts_with(";NEW_SETTINGS_LOADED") {
        Directive::NewSettingsLoaded
    } else if text.starts_with(";HB") {
        Directive::Heartbeat
    } else if text.starts_with("; Welcome") {
        Directive::Welcome
    } else {
        Directive::Unknown(text)
    }
}

/// `;MSGSTATIC <secs> <message>` - display time field precedes the body
fn parse_static_announcement<'a>(full: &'a str, rest: &'a str) -> Directive<'a> {
    match rest.split_once(' ') {
        Some((secs, message)) => Directive::Announcement {
            message,
            static_display: true,
            display_secs: secs.parse().unwrap_or(0),
        },
        None => Directive::Unknown(full),
    }
}

fn strip_either<'a>(text: &'a str, a: &str, b: &str) -> Option<&'a str> {
    text.strip_prefix(a).or_else(|| text.strip_prefix(b))
}

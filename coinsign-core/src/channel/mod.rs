//! Data channel
//!
//! Owns the feed connection: lifecycle and reconnect policy, heartbeat,
//! the rate-limited outbound queue, and inbound directive dispatch. The
//! transport itself (websocket, plain or TLS) is a collaborator behind
//! the [`Transport`] trait; its events come in through
//! [`DataChannel::handle_event`] and effects on the rest of the system go
//! out as [`ChannelEvent`] values for the controller.
//!
//! Restarting the device is likewise only ever requested via
//! [`ChannelEvent::RestartRequested`], never performed here.

pub mod url;

use coinsign_protocol::inbound::{classify, Directive, Inbound};
use coinsign_protocol::outbound::{self, Message};
use heapless::{Deque, String};

use crate::config::ParameterStore;
use crate::fmt::{debug, trace, warn};
use crate::time::Instant;

/// Interval between outbound heartbeats
pub const HEARTBEAT_INTERVAL_MS: u32 = 30_000;

/// Silence on an open connection tolerated before forcing a reconnect
pub const NO_DATA_TIMEOUT_MS: u32 = 90_000;

/// Disconnected time tolerated before requesting a device restart
pub const FORCE_RECONNECT_TIMEOUT_MS: u32 = 300_000;

/// Minimum spacing between outbound sends
pub const MIN_SEND_SPACING_MS: u32 = 150;

/// Outbound queue depth; sized for a full configuration dump plus slack
pub const SEND_QUEUE_DEPTH: usize = 32;

/// Transport capability consumed by the channel
///
/// Implementations are event sources as well: connection state changes
/// and received frames are fed back via [`DataChannel::handle_event`].
pub trait Transport {
    fn connect(&mut self, host: &str, port: u16, path: &str, tls: bool);
    fn disconnect(&mut self);
    fn send_text(&mut self, text: &str);
}

/// Transport-level event, forwarded verbatim by the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    Connected,
    Disconnected,
    Text(&'a str),
    Binary(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Static device identity sent in the handshake
#[derive(Debug, Clone)]
pub struct Identity {
    pub model: &'static str,
    pub version: &'static str,
    /// Firmware image checksum, computed by the platform layer at boot
    pub checksum: String<40>,
    /// Cause of the last reset, reported as diagnostics
    pub reset_reason: &'static str,
    /// Detailed reset description (exception frame, boot flags), reported
    /// alongside the reason
    pub reset_info: String<64>,
}

/// Effect of channel activity on the rest of the system
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelEvent {
    /// Fresh value from the feed
    PriceUpdate(String<32>),
    /// All-time-high record notification
    AllTimeHigh(String<32>),
    /// Announcement to interleave into the display
    Announcement {
        message: String<96>,
        static_display: bool,
        display_secs: u32,
    },
    /// Peer requested a firmware update; the transport is already closed
    UpdateRequested,
    /// Device restart required (remote `;RESET` or reconnect give-up)
    RestartRequested,
    /// A parameter changed via remote directive; apply side effects and
    /// persist
    ParamChanged,
    /// One-time passcode to display
    Otp(String<16>),
    /// Peer confirmed the one-time passcode
    OtpAck,
    /// New staleness threshold for the displayed value, in seconds
    DataTimeout(u32),
    /// Peer finished loading a settings profile; reset displayed state
    NewSettingsLoaded,
    /// Outbound messages were dropped because the queue was full
    SendQueueFull,
}

/// Feed connection state machine
pub struct DataChannel {
    identity: Identity,
    state: ConnectionState,
    hello_sent: bool,
    restart_reported: bool,
    send_dropped: bool,
    last_connected_at: Instant,
    last_data_at: Instant,
    last_heartbeat_at: Instant,
    last_send_at: Instant,
    send_queue: Deque<Message, SEND_QUEUE_DEPTH>,
}

impl DataChannel {
    pub fn new(identity: Identity, now: Instant) -> Self {
        Self {
            identity,
            state: ConnectionState::Disconnected,
            hello_sent: false,
            restart_reported: false,
            send_dropped: false,
            last_connected_at: now,
            last_data_at: now,
            last_heartbeat_at: now,
            last_send_at: now,
            send_queue: Deque::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Messages waiting in the outbound queue
    pub fn queued(&self) -> usize {
        self.send_queue.len()
    }

    /// Open the transport toward the configured feed destination
    ///
    /// The device uuid is appended to the path as a query parameter. An
    /// unparseable URL leaves the channel disconnected; the reconnect
    /// policy will eventually escalate to a restart.
    pub fn connect<T: Transport>(&mut self, store: &ParameterStore, transport: &mut T) {
        let Some(dest) = store.get("ticker_url").and_then(url::parse) else {
            warn!("ticker url missing or malformed, cannot connect");
            return;
        };
        let uuid = store.get("__device_uuid").unwrap_or("");
        let mut path = String::<160>::new();
        let _ = path.push_str(dest.path);
        let _ = path.push_str("?uuid=");
        let _ = path.push_str(uuid);

        debug!("connecting to feed");
        transport.connect(dest.host, dest.port, &path, dest.tls);
    }

    /// Tear down and rebuild the connection, restamping the silence timers
    pub fn reconnect<T: Transport>(
        &mut self,
        store: &ParameterStore,
        transport: &mut T,
        now: Instant,
    ) {
        self.last_connected_at = now;
        self.last_data_at = now;
        transport.disconnect();
        self.connect(store, transport);
    }

    /// Queue `;OTP_REQ`; reports whether the channel could take it
    pub fn send_otp_request(&mut self) -> bool {
        if self.is_connected() {
            self.queue_text(outbound::otp_request());
            true
        } else {
            false
        }
    }

    /// Process one transport event
    pub fn handle_event<T: Transport>(
        &mut self,
        event: TransportEvent<'_>,
        now: Instant,
        store: &mut ParameterStore,
        transport: &mut T,
    ) -> Option<ChannelEvent> {
        match event {
            TransportEvent::Connected => {
                debug!("feed connected");
                self.state = ConnectionState::Connected;
                self.last_connected_at = now;
                self.last_data_at = now;
                self.hello_sent = false;
                self.restart_reported = false;
                None
            }
            TransportEvent::Disconnected => {
                debug!("feed disconnected");
                if self.state == ConnectionState::Connected {
                    self.last_connected_at = now;
                    self.last_data_at = now;
                    self.state = ConnectionState::Disconnected;
                }
                None
            }
            TransportEvent::Binary(data) => {
                // accepted for liveness accounting, never interpreted
                self.last_data_at = now;
                debug!("ignoring binary frame of {} bytes", data.len());
                None
            }
            TransportEvent::Text(text) => {
                self.last_data_at = now;
                self.state = ConnectionState::Connected;
                if !self.hello_sent {
                    self.hello_sent = true;
                    self.queue_handshake(store);
                }
                self.dispatch(text, now, store, transport)
            }
        }
    }

    /// Handshake: hello, configuration dump, diagnostics, in that order
    fn queue_handshake(&mut self, store: &ParameterStore) {
        let uuid = store.get("__device_uuid").unwrap_or("");
        self.queue_text(outbound::hello(
            self.identity.model,
            uuid,
            self.identity.version,
            &self.identity.checksum,
        ));
        self.queue_all_params(store);
        self.queue_text(outbound::diag(
            "last_reset_reason",
            self.identity.reset_reason,
        ));
        self.queue_text(outbound::diag("last_reset_info", &self.identity.reset_info));
    }

    fn queue_all_params(&mut self, store: &ParameterStore) {
        // collect first: queue_text needs &mut self
        let mut dump: heapless::Vec<Message, { crate::config::MAX_PARAMS }> = heapless::Vec::new();
        for item in store.iter().filter(|item| item.is_dumpable()) {
            let _ = dump.push(outbound::param(item.name(), item.value()));
        }
        for msg in dump {
            self.queue_text(msg);
        }
    }

    fn dispatch<T: Transport>(
        &mut self,
        text: &str,
        now: Instant,
        store: &mut ParameterStore,
        transport: &mut T,
    ) -> Option<ChannelEvent> {
        match classify(text) {
            Inbound::Value(value) => Some(ChannelEvent::PriceUpdate(copy(value))),
            Inbound::Ignored(_) => {
                debug!("dropping unclassifiable frame");
                None
            }
            Inbound::Directive(directive) => match directive {
                Directive::Update => {
                    transport.disconnect();
                    Some(ChannelEvent::UpdateRequested)
                }
                Directive::Reset => Some(ChannelEvent::RestartRequested),
                Directive::AllTimeHigh(value) => Some(ChannelEvent::AllTimeHigh(copy(value))),
                Directive::Announcement {
                    message,
                    static_display,
                    display_secs,
                } => Some(ChannelEvent::Announcement {
                    message: copy(message),
                    static_display,
                    display_secs,
                }),
                Directive::Param { name, value } => {
                    self.apply_param(name, value, now, store, transport)
                }
                Directive::Otp(code) => Some(ChannelEvent::Otp(copy(code))),
                Directive::OtpAck => Some(ChannelEvent::OtpAck),
                Directive::DataTimeout(secs) => Some(ChannelEvent::DataTimeout(secs)),
                Directive::GetParams => {
                    debug!("configuration dump requested");
                    self.queue_all_params(store);
                    None
                }
                Directive::NewSettingsLoaded => Some(ChannelEvent::NewSettingsLoaded),
                Directive::Heartbeat => {
                    trace!("heartbeat echo");
                    None
                }
                Directive::Welcome => {
                    debug!("welcome banner");
                    None
                }
                Directive::Unknown(_) => {
                    warn!("dropping unknown directive");
                    None
                }
            },
        }
    }

    /// Apply a remote parameter change
    ///
    /// Internal names are never remote-writable. The legacy path-only
    /// name is translated into a path rewrite of the full ticker URL; a
    /// changed ticker URL reconnects immediately.
    fn apply_param<T: Transport>(
        &mut self,
        name: &str,
        value: &str,
        now: Instant,
        store: &mut ParameterStore,
        transport: &mut T,
    ) -> Option<ChannelEvent> {
        if name.is_empty() || name.starts_with('_') {
            debug!("refusing remote write to internal parameter");
            return None;
        }

        let changed = if name == "ticker_path" {
            let rewritten = store
                .get("ticker_url")
                .and_then(|current| url::change_path(current, value));
            match rewritten {
                Some(full) => store.set_if_exists("ticker_url", &full),
                None => {
                    warn!("cannot rewrite ticker url path");
                    false
                }
            }
        } else {
            store.set_if_exists(name, value)
        };

        if !changed {
            return None;
        }
        if name == "ticker_path" || name == "ticker_url" {
            self.reconnect(store, transport, now);
        }
        Some(ChannelEvent::ParamChanged)
    }

    /// Evaluate the reconnect policy and drain at most one queued send
    ///
    /// Called once per drive cycle.
    pub fn poll<T: Transport>(
        &mut self,
        now: Instant,
        store: &ParameterStore,
        transport: &mut T,
    ) -> Option<ChannelEvent> {
        match self.state {
            ConnectionState::Disconnected => {
                if now.ms_since(self.last_connected_at) >= FORCE_RECONNECT_TIMEOUT_MS
                    && !self.restart_reported
                {
                    warn!("disconnected past the give-up threshold, requesting restart");
                    self.restart_reported = true;
                    return Some(ChannelEvent::RestartRequested);
                }
            }
            ConnectionState::Connected => {
                if now.ms_since(self.last_data_at) > NO_DATA_TIMEOUT_MS {
                    warn!("no inbound traffic, forcing reconnect");
                    self.reconnect(store, transport, now);
                }
                if now.ms_since(self.last_heartbeat_at) > HEARTBEAT_INTERVAL_MS {
                    self.queue_text(outbound::heartbeat());
                    self.last_heartbeat_at = now;
                }
                if !self.send_queue.is_empty()
                    && now.ms_since(self.last_send_at) >= MIN_SEND_SPACING_MS
                {
                    if let Some(msg) = self.send_queue.pop_front() {
                        transport.send_text(&msg);
                        self.last_send_at = now;
                    }
                }
            }
        }

        if self.send_dropped {
            self.send_dropped = false;
            return Some(ChannelEvent::SendQueueFull);
        }
        None
    }

    fn queue_text(&mut self, msg: Message) {
        if self.send_queue.push_back(msg).is_err() {
            warn!("outbound queue full, dropping message");
            self.send_dropped = true;
        }
    }
}

fn copy<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

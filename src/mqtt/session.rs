//! The MQTT session engine.
//!
//! A [`Session`] owns exactly one transport connection, the two in-flight
//! registries, the fixed read/write buffers and the subscription handler
//! table. It is cooperative and single-threaded: all network I/O happens
//! inside [`Session::yield_ms`], bounded by the caller's timeout, and every
//! operation takes `&mut self`, so concurrent use of one session is ruled
//! out at compile time. A multi-threaded caller serializes access with its
//! platform's mutex, as the SDK contract requires.
//!
//! One yield tick, in order: drain and dispatch inbound packets, expire
//! unacknowledged operations, send a keep-alive ping when due, detect an
//! overdue ping as a network failure, and run the reconnect policy.

use heapless::{String, Vec};

use super::error::Error;
use super::packet::{self, Packet, QoS};
use super::registry::{
    AckRegistry, PublishEntry, SubscribeEntry, SubscribeIntent,
};
use super::topic;
use super::{
    MAX_COMMAND_TIMEOUT_MS, MAX_KEEP_ALIVE_SECS, MAX_MESSAGE_HANDLERS, MAX_PUB_WAIT,
    MAX_RECONNECT_WAIT_MS, MAX_SUB_WAIT, MIN_COMMAND_TIMEOUT_MS, MIN_RECONNECT_WAIT_MS,
    RX_BUF_LEN, TOPIC_MAX, TX_BUF_LEN,
};
use crate::device::CLIENT_ID_MAX;
use crate::network::{
    Close, Connection, Dial, Endpoint, Error as NetError, Read, TransportSecurity, Write,
};
use crate::time::{Clock, Countdown, Timestamp};

/// Connection state of a session.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionState {
    /// No connection has been established, or the device disconnected
    /// manually.
    NotConnected,
    /// The broker accepted the connection.
    Connected,
    /// The connection dropped; recoverable through the reconnect policy.
    Disconnected,
    /// A reconnect attempt is in progress.
    Reconnecting,
}

/// Asynchronous operation outcomes delivered through the event callback.
///
/// Acknowledged operations (QoS 1 publish, subscribe, unsubscribe) return a
/// packet identifier immediately; the matching event arrives from a later
/// yield tick. The callback must not block, and calling back into the
/// session from inside it is not supported.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
    /// Placeholder for an undefined event.
    Undefined,
    /// The connection was lost.
    Disconnect,
    /// The reconnect policy re-established the connection.
    Reconnect,
    /// A SUBSCRIBE (or UNSUBSCRIBE) was acknowledged.
    SubscribeSuccess(u16),
    /// A SUBSCRIBE (or UNSUBSCRIBE) outlived the command timeout.
    SubscribeTimeout(u16),
    /// The broker rejected a SUBSCRIBE.
    SubscribeNack(u16),
    /// A QoS 1 PUBLISH was acknowledged.
    PublishSuccess(u16),
    /// A QoS 1 PUBLISH outlived the command timeout.
    PublishTimeout(u16),
    /// The broker rejected a PUBLISH. Reserved: MQTT 3.1.1 brokers signal
    /// rejection by dropping the connection, so this is never emitted here.
    PublishNack(u16),
}

#[cfg(feature = "defmt")]
impl defmt::Format for Event {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Event::Undefined => defmt::write!(f, "Undefined"),
            Event::Disconnect => defmt::write!(f, "Disconnect"),
            Event::Reconnect => defmt::write!(f, "Reconnect"),
            Event::SubscribeSuccess(id) => defmt::write!(f, "SubscribeSuccess({})", id),
            Event::SubscribeTimeout(id) => defmt::write!(f, "SubscribeTimeout({})", id),
            Event::SubscribeNack(id) => defmt::write!(f, "SubscribeNack({})", id),
            Event::PublishSuccess(id) => defmt::write!(f, "PublishSuccess({})", id),
            Event::PublishTimeout(id) => defmt::write!(f, "PublishTimeout({})", id),
            Event::PublishNack(id) => defmt::write!(f, "PublishNack({})", id),
        }
    }
}

/// An inbound application message, borrowed from the read buffer for the
/// duration of the handler call.
#[derive(Debug, Clone)]
pub struct IncomingPublish<'a> {
    /// Topic the message was published to.
    pub topic: &'a str,
    /// Message payload.
    pub payload: &'a [u8],
    /// Delivery guarantee the broker used.
    pub qos: QoS,
    /// Broker retain flag.
    pub retain: bool,
    /// Packet identifier for QoS 1 messages.
    pub packet_id: Option<u16>,
}

/// Per-subscription message callback.
pub type MessageHandler<U> = fn(&mut U, &IncomingPublish<'_>);

/// Session event callback.
pub type EventHandler<U> = fn(&mut U, Event);

/// Parameters for a publish operation.
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    /// Delivery guarantee.
    pub qos: QoS,
    /// Ask the broker to retain the message.
    pub retain: bool,
    /// Message payload.
    pub payload: &'a [u8],
}

/// Parameters for a subscribe operation.
pub struct SubscribeRequest<U> {
    /// Maximum QoS requested for the filter.
    pub qos: QoS,
    /// Callback invoked for each matching inbound message.
    pub handler: MessageHandler<U>,
}

impl<U> core::fmt::Debug for SubscribeRequest<U> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscribeRequest")
            .field("qos", &self.qos)
            .finish_non_exhaustive()
    }
}

/// Static configuration of a session, assembled by the client facade.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broker endpoint.
    pub endpoint: Endpoint,
    /// Transport security parameters for the device's auth mode.
    pub security: TransportSecurity,
    /// MQTT client identifier.
    pub client_id: String<CLIENT_ID_MAX>,
    /// Keep-alive interval in seconds (clamped on construction).
    pub keep_alive_secs: u16,
    /// Whether to request a clean broker session.
    pub clean_session: bool,
    /// Whether the session reconnects on its own after a network failure.
    pub auto_reconnect: bool,
    /// Per-operation timeout in milliseconds (clamped on construction).
    pub command_timeout_ms: u32,
}

struct HandlerSlot<U> {
    filter: String<TOPIC_MAX>,
    qos: QoS,
    handler: MessageHandler<U>,
}

/// The transport half of a session: the single connection handle and the
/// write buffer. Kept as its own struct so frame processing can borrow the
/// read buffer and the transport independently.
struct Link<C: Connection> {
    conn: Option<C>,
    tx: [u8; TX_BUF_LEN],
}

enum Recv {
    Data(usize),
    Idle,
    Lost,
}

impl<C: Connection> Link<C> {
    fn new() -> Self {
        Self {
            conn: None,
            tx: [0; TX_BUF_LEN],
        }
    }

    /// Write `tx[..len]` fully and flush.
    fn send(&mut self, len: usize) -> Result<(), Error> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Error::NotConnected);
        };
        let mut written = 0;
        while written < len {
            match conn.write(&self.tx[written..len]) {
                Ok(0) => return Err(Error::Io),
                Ok(n) => written += n,
                Err(_) => return Err(Error::Io),
            }
        }
        conn.flush().map_err(|_| Error::Io)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Recv {
        let Some(conn) = self.conn.as_mut() else {
            return Recv::Lost;
        };
        if buf.is_empty() {
            // Read buffer full with no decodable frame; treated as loss so
            // the session resynchronizes instead of stalling.
            return Recv::Lost;
        }
        match conn.read(buf) {
            Ok(0) => Recv::Lost,
            Ok(n) => Recv::Data(n),
            Err(e) => match e.into() {
                NetError::Timeout => Recv::Idle,
                _ => Recv::Lost,
            },
        }
    }

    fn teardown(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.close();
        }
    }
}

enum FrameStatus {
    Ready(usize),
    Incomplete,
    Malformed,
}

/// The MQTT session engine.
///
/// Generic over the connection opener `D`, the clock `K` and a user context
/// `U` that is handed to every callback.
pub struct Session<D: Dial, K: Clock, U> {
    dial: D,
    clock: K,
    cfg: SessionConfig,
    state: SessionState,
    link: Link<D::Connection>,
    rx: [u8; RX_BUF_LEN],
    rx_len: usize,
    next_packet_id: u16,
    ping_outstanding: bool,
    ping_sent_at: Timestamp,
    ping_timer: Countdown,
    reconnect_timer: Countdown,
    reconnect_wait_ms: u64,
    manually_disconnected: bool,
    network_disconnects: u32,
    pub_wait: AckRegistry<PublishEntry, MAX_PUB_WAIT>,
    sub_wait: AckRegistry<SubscribeEntry, MAX_SUB_WAIT>,
    handlers: Vec<HandlerSlot<U>, MAX_MESSAGE_HANDLERS>,
    on_event: Option<EventHandler<U>>,
    user: U,
}

impl<D: Dial, K: Clock, U> core::fmt::Debug for Session<D, K, U> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("pending_publishes", &self.pub_wait.len())
            .field("pending_subscribes", &self.sub_wait.len())
            .field("network_disconnects", &self.network_disconnects)
            .finish_non_exhaustive()
    }
}

impl<D: Dial, K: Clock, U> Session<D, K, U> {
    /// Create a session in the `NotConnected` state.
    ///
    /// The keep-alive interval and command timeout are clamped into their
    /// permitted ranges here. The packet-identifier counter starts at a
    /// clock-derived value in `1..=65535`.
    pub fn new(
        dial: D,
        clock: K,
        mut cfg: SessionConfig,
        on_event: Option<EventHandler<U>>,
        user: U,
    ) -> Self {
        cfg.keep_alive_secs = cfg.keep_alive_secs.min(MAX_KEEP_ALIVE_SECS);
        cfg.command_timeout_ms = cfg
            .command_timeout_ms
            .clamp(MIN_COMMAND_TIMEOUT_MS, MAX_COMMAND_TIMEOUT_MS);
        let seed = (clock.now_ms() % 65_535) as u16 + 1;
        Self {
            dial,
            clock,
            cfg,
            state: SessionState::NotConnected,
            link: Link::new(),
            rx: [0; RX_BUF_LEN],
            rx_len: 0,
            next_packet_id: seed,
            ping_outstanding: false,
            ping_sent_at: 0,
            ping_timer: Countdown::default(),
            reconnect_timer: Countdown::default(),
            reconnect_wait_ms: MIN_RECONNECT_WAIT_MS,
            manually_disconnected: false,
            network_disconnects: 0,
            pub_wait: AckRegistry::new(),
            sub_wait: AckRegistry::new(),
            handlers: Vec::new(),
            on_event,
            user,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// How many times the session lost its network connection.
    pub fn network_disconnect_count(&self) -> u32 {
        self.network_disconnects
    }

    /// Reset the network-disconnect counter.
    pub fn reset_network_disconnect_count(&mut self) {
        self.network_disconnects = 0;
    }

    /// Number of QoS 1 publishes awaiting acknowledgment.
    pub fn pending_publish_count(&self) -> usize {
        self.pub_wait.len()
    }

    /// Number of subscribe/unsubscribe operations awaiting acknowledgment.
    pub fn pending_subscribe_count(&self) -> usize {
        self.sub_wait.len()
    }

    /// Number of installed subscription handler slots.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// The QoS a handler slot was installed with, if `filter` has one.
    pub fn subscription_qos(&self, filter: &str) -> Option<QoS> {
        self.handlers
            .iter()
            .find(|slot| slot.filter.as_str() == filter)
            .map(|slot| slot.qos)
    }

    /// Borrow the user context.
    pub fn user(&self) -> &U {
        &self.user
    }

    /// Mutably borrow the user context.
    pub fn user_mut(&mut self) -> &mut U {
        &mut self.user
    }

    fn emit(&mut self, event: Event) {
        if let Some(callback) = self.on_event {
            callback(&mut self.user, event);
        }
    }

    /// Advance the packet-identifier counter: wraps 65535 -> 1, never 0.
    fn next_packet_id(&mut self) -> u16 {
        self.next_packet_id = if self.next_packet_id >= u16::MAX {
            1
        } else {
            self.next_packet_id + 1
        };
        self.next_packet_id
    }

    fn consume_rx(&mut self, used: usize) {
        self.rx.copy_within(used..self.rx_len, 0);
        self.rx_len -= used;
    }

    /// Open the transport and perform the CONNECT/CONNACK handshake.
    ///
    /// On any failure the transport is closed again and the state is left
    /// untouched (`NotConnected` for a first connect), so a failed attempt
    /// holds no resources.
    pub fn connect(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Connected {
            return Ok(());
        }
        let conn = self
            .dial
            .dial(&self.cfg.endpoint, &self.cfg.security)
            .map_err(|_| Error::ConnectFailure)?;
        self.link.conn = Some(conn);
        self.rx_len = 0;

        let connect = packet::Connect {
            client_id: self.cfg.client_id.as_str(),
            keep_alive: self.cfg.keep_alive_secs,
            clean_session: self.cfg.clean_session,
        };
        let frame_len = connect.encode(&mut self.link.tx)?;
        if self.link.send(frame_len).is_err() {
            self.link.teardown();
            return Err(Error::ConnectFailure);
        }

        let now = self.clock.now_ms();
        let deadline = Countdown::start(now, self.cfg.command_timeout_ms as u64);
        loop {
            let status = match packet::decode(&self.rx[..self.rx_len]) {
                Ok(Some((Packet::ConnAck(ack), used))) => Some((ack, used)),
                Ok(Some(_)) | Err(_) => {
                    // Anything but a CONNACK before the handshake completes
                    // is a protocol violation.
                    self.link.teardown();
                    self.rx_len = 0;
                    return Err(Error::ConnectFailure);
                }
                Ok(None) => None,
            };

            if let Some((ack, used)) = status {
                self.consume_rx(used);
                if ack.return_code != 0 {
                    self.link.teardown();
                    self.rx_len = 0;
                    return Err(Error::ConnectionRefused(ack.return_code));
                }
                let now = self.clock.now_ms();
                self.state = SessionState::Connected;
                self.manually_disconnected = false;
                self.ping_outstanding = false;
                self.ping_timer =
                    Countdown::start(now, self.cfg.keep_alive_secs as u64 * 1_000);
                self.reconnect_wait_ms = MIN_RECONNECT_WAIT_MS;
                return Ok(());
            }

            if deadline.expired(self.clock.now_ms()) {
                self.link.teardown();
                self.rx_len = 0;
                return Err(Error::Timeout);
            }
            match self.link.recv(&mut self.rx[self.rx_len..]) {
                Recv::Data(n) => self.rx_len += n,
                Recv::Idle => {}
                Recv::Lost => {
                    self.link.teardown();
                    self.rx_len = 0;
                    return Err(Error::ConnectFailure);
                }
            }
        }
    }

    /// Publish `payload` to `topic_name`.
    ///
    /// Returns the assigned packet identifier. QoS 0 is fire-and-forget; a
    /// QoS 1 publish is tracked in the publish registry (with an owned copy
    /// of the serialized frame, since the write buffer is reused) and its
    /// outcome arrives later as a [`Event::PublishSuccess`] or
    /// [`Event::PublishTimeout`].
    pub fn publish(&mut self, topic_name: &str, request: &PublishRequest<'_>) -> Result<u16, Error> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        if topic_name.len() > TOPIC_MAX || !topic::valid_topic(topic_name) {
            return Err(Error::InvalidParam);
        }
        let tracked = request.qos == QoS::AtLeastOnce;
        if tracked && self.pub_wait.is_full() {
            return Err(Error::NoFreeSlot);
        }
        let packet_id = self.next_packet_id();
        if tracked && self.pub_wait.contains(packet_id) {
            return Err(Error::DuplicateId);
        }

        let publish = packet::Publish {
            topic: topic_name,
            payload: request.payload,
            qos: request.qos,
            retain: request.retain,
            packet_id: tracked.then_some(packet_id),
        };
        let frame_len = publish.encode(&mut self.link.tx)?;
        if self.link.send(frame_len).is_err() {
            self.on_network_failure();
            return Err(Error::Io);
        }

        if tracked {
            let frame = Vec::from_slice(&self.link.tx[..frame_len])
                .map_err(|_| Error::EncodeOverflow)?;
            self.pub_wait.enqueue(PublishEntry {
                packet_id,
                qos: request.qos,
                sent_at: self.clock.now_ms(),
                retry_count: 0,
                frame,
            })?;
        }
        Ok(packet_id)
    }

    /// Subscribe to `filter`, installing a handler slot for dispatch.
    ///
    /// Returns the assigned packet identifier; the broker's verdict arrives
    /// later as a [`Event::SubscribeSuccess`], [`Event::SubscribeNack`] or
    /// [`Event::SubscribeTimeout`]. Subscribing again to an already-handled
    /// filter replaces the slot instead of occupying a new one.
    pub fn subscribe(&mut self, filter: &str, request: SubscribeRequest<U>) -> Result<u16, Error> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        if filter.len() > TOPIC_MAX || !topic::valid_filter(filter) {
            return Err(Error::InvalidParam);
        }
        let existing = self
            .handlers
            .iter()
            .position(|slot| slot.filter.as_str() == filter);
        if existing.is_none() && self.handlers.is_full() {
            return Err(Error::NoFreeSlot);
        }
        if self.sub_wait.is_full() {
            return Err(Error::NoFreeSlot);
        }
        let packet_id = self.next_packet_id();
        if self.sub_wait.contains(packet_id) {
            return Err(Error::DuplicateId);
        }

        let subscribe = packet::Subscribe {
            packet_id,
            filter,
            qos: request.qos,
        };
        let frame_len = subscribe.encode(&mut self.link.tx)?;
        if self.link.send(frame_len).is_err() {
            self.on_network_failure();
            return Err(Error::Io);
        }

        let owned_filter = String::try_from(filter).map_err(|_| Error::InvalidParam)?;
        self.sub_wait.enqueue(SubscribeEntry {
            packet_id,
            sent_at: self.clock.now_ms(),
            intent: SubscribeIntent::Subscribe,
            filter: owned_filter.clone(),
        })?;

        let slot = HandlerSlot {
            filter: owned_filter,
            qos: request.qos,
            handler: request.handler,
        };
        match existing {
            Some(index) => self.handlers[index] = slot,
            // Capacity was checked above.
            None => {
                let _ = self.handlers.push(slot);
            }
        }
        Ok(packet_id)
    }

    /// Unsubscribe from `filter`, removing its handler slot.
    ///
    /// Returns the assigned packet identifier. Completion is reported with
    /// [`Event::SubscribeSuccess`] (or [`Event::SubscribeTimeout`]) carrying
    /// this identifier; the event set has no unsubscribe-specific variants.
    pub fn unsubscribe(&mut self, filter: &str) -> Result<u16, Error> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        if filter.is_empty() || filter.len() > TOPIC_MAX {
            return Err(Error::InvalidParam);
        }
        if self.sub_wait.is_full() {
            return Err(Error::NoFreeSlot);
        }
        let packet_id = self.next_packet_id();
        if self.sub_wait.contains(packet_id) {
            return Err(Error::DuplicateId);
        }

        let unsubscribe = packet::Unsubscribe { packet_id, filter };
        let frame_len = unsubscribe.encode(&mut self.link.tx)?;
        if self.link.send(frame_len).is_err() {
            self.on_network_failure();
            return Err(Error::Io);
        }

        self.sub_wait.enqueue(SubscribeEntry {
            packet_id,
            sent_at: self.clock.now_ms(),
            intent: SubscribeIntent::Unsubscribe,
            filter: String::try_from(filter).map_err(|_| Error::InvalidParam)?,
        })?;

        if let Some(index) = self
            .handlers
            .iter()
            .position(|slot| slot.filter.as_str() == filter)
        {
            self.handlers.swap_remove(index);
        }
        Ok(packet_id)
    }

    /// Drive the session for up to `timeout_ms` milliseconds.
    ///
    /// Reads and dispatches inbound packets, expires timed-out in-flight
    /// operations, maintains the keep-alive ping and runs the reconnect
    /// policy. Returns `Err` for a fault observed during this tick (the
    /// state transition has already happened); the caller keeps calling
    /// `yield_ms` and recovery proceeds through the reconnect policy.
    pub fn yield_ms(&mut self, timeout_ms: u32) -> Result<(), Error> {
        if self.manually_disconnected || self.state == SessionState::NotConnected {
            return Err(Error::NotConnected);
        }
        let deadline = Countdown::start(self.clock.now_ms(), timeout_ms as u64);
        let mut tick_error = None;

        // (a) inbound packets; stops early once the transport has nothing
        // more to deliver within its read window
        while self.state == SessionState::Connected {
            match self.pump_one() {
                Ok(true) => {}
                Ok(false) => break,
                Err(error) => {
                    if error == Error::Io {
                        self.on_network_failure();
                    }
                    tick_error = Some(error);
                    break;
                }
            }
            if deadline.expired(self.clock.now_ms()) {
                break;
            }
        }

        // (b) in-flight expiry
        self.sweep_registries();

        // (c) + (d) keep-alive
        if self.state == SessionState::Connected {
            if let Err(error) = self.keep_alive() {
                self.on_network_failure();
                tick_error.get_or_insert(error);
            }
        }

        // (e) reconnect policy
        if self.state == SessionState::Disconnected
            && self.cfg.auto_reconnect
            && self.reconnect_timer.expired(self.clock.now_ms())
        {
            self.attempt_reconnect();
        }

        match tick_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Send DISCONNECT and close the transport. The session will not
    /// reconnect until [`Session::connect`] is called again.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        if self.state != SessionState::Connected {
            return Err(Error::NotConnected);
        }
        let frame_len = packet::encode_disconnect(&mut self.link.tx)?;
        let sent = self.link.send(frame_len);
        self.link.teardown();
        self.rx_len = 0;
        self.ping_outstanding = false;
        self.state = SessionState::NotConnected;
        self.manually_disconnected = true;
        sent
    }

    /// Drain both registries and clear the handler table, releasing every
    /// owned frame copy. Used by the facade's teardown.
    pub(crate) fn drain_for_teardown(&mut self) -> (usize, usize) {
        let publishes = self.pub_wait.drain().len();
        let subscribes = self.sub_wait.drain().len();
        self.handlers.clear();
        (publishes, subscribes)
    }

    /// Read at most one frame's worth of progress: decode a buffered frame,
    /// discard a malformed one, or pull more bytes from the transport.
    fn pump_one(&mut self) -> Result<bool, Error> {
        let status = match packet::decode(&self.rx[..self.rx_len]) {
            Ok(Some((_, used))) => FrameStatus::Ready(used),
            Ok(None) => FrameStatus::Incomplete,
            Err(_) => FrameStatus::Malformed,
        };

        match status {
            FrameStatus::Ready(used) => {
                self.process_frame(used)?;
                Ok(true)
            }
            FrameStatus::Malformed => {
                // Discard the offending frame (or everything buffered if its
                // length is unknowable) and resynchronize. Never fatal.
                let drop_len = packet::frame_len(&self.rx[..self.rx_len])
                    .map(|len| len.min(self.rx_len))
                    .unwrap_or(self.rx_len);
                self.consume_rx(drop_len);
                Ok(true)
            }
            FrameStatus::Incomplete => match self.link.recv(&mut self.rx[self.rx_len..]) {
                Recv::Data(n) => {
                    self.rx_len += n;
                    Ok(true)
                }
                Recv::Idle => Ok(false),
                Recv::Lost => Err(Error::Io),
            },
        }
    }

    /// Dispatch one complete, validated frame sitting at `rx[..used]`.
    fn process_frame(&mut self, used: usize) -> Result<(), Error> {
        let Ok(Some((pkt, _))) = packet::decode(&self.rx[..used]) else {
            self.consume_rx(used);
            return Ok(());
        };

        // PUBACK to send after the frame is consumed.
        let mut ack_reply = None;

        match pkt {
            Packet::Publish(publish) => {
                if publish.qos == QoS::AtLeastOnce {
                    ack_reply = publish.packet_id;
                }
                let message = IncomingPublish {
                    topic: publish.topic,
                    payload: publish.payload,
                    qos: publish.qos,
                    retain: publish.retain,
                    packet_id: publish.packet_id,
                };
                // Every matching slot receives the message; an inbound topic
                // with no matching handler is a no-op, not an error.
                for slot in self.handlers.iter() {
                    if topic::matches(&slot.filter, message.topic) {
                        (slot.handler)(&mut self.user, &message);
                    }
                }
            }
            Packet::PubAck { packet_id } => match self.pub_wait.acknowledge(packet_id) {
                Ok(_entry) => {
                    if let Some(callback) = self.on_event {
                        callback(&mut self.user, Event::PublishSuccess(packet_id));
                    }
                }
                Err(_) => {
                    // Late or duplicate PUBACK after timeout eviction.
                }
            },
            Packet::SubAck(ack) => match self.sub_wait.acknowledge(ack.packet_id) {
                Ok(entry) => {
                    let rejected = ack.return_code == packet::SUBACK_FAILURE;
                    if rejected {
                        if let Some(index) = self
                            .handlers
                            .iter()
                            .position(|slot| slot.filter.as_str() == entry.filter.as_str())
                        {
                            self.handlers.swap_remove(index);
                        }
                    }
                    let event = if rejected {
                        Event::SubscribeNack(ack.packet_id)
                    } else {
                        Event::SubscribeSuccess(ack.packet_id)
                    };
                    if let Some(callback) = self.on_event {
                        callback(&mut self.user, event);
                    }
                }
                Err(_) => {}
            },
            Packet::UnsubAck { packet_id } => match self.sub_wait.acknowledge(packet_id) {
                Ok(_entry) => {
                    if let Some(callback) = self.on_event {
                        callback(&mut self.user, Event::SubscribeSuccess(packet_id));
                    }
                }
                Err(_) => {}
            },
            Packet::PingResp => {
                self.ping_outstanding = false;
            }
            // The broker does not send these to a client; drop them.
            _ => {}
        }

        self.consume_rx(used);

        if let Some(packet_id) = ack_reply {
            let frame_len = packet::encode_puback(packet_id, &mut self.link.tx)?;
            self.link.send(frame_len)?;
        }
        Ok(())
    }

    /// Expire in-flight entries older than the command timeout, notifying
    /// the application per entry. Notification only: nothing is resent.
    fn sweep_registries(&mut self) {
        let now = self.clock.now_ms();
        let timeout_ms = self.cfg.command_timeout_ms;

        for entry in self.pub_wait.sweep(now, timeout_ms) {
            self.emit(Event::PublishTimeout(entry.packet_id));
        }
        for entry in self.sub_wait.sweep(now, timeout_ms) {
            // A subscribe that never completed must not leave a live slot.
            if entry.intent == SubscribeIntent::Subscribe {
                if let Some(index) = self
                    .handlers
                    .iter()
                    .position(|slot| slot.filter.as_str() == entry.filter.as_str())
                {
                    self.handlers.swap_remove(index);
                }
            }
            self.emit(Event::SubscribeTimeout(entry.packet_id));
        }
    }

    /// Send PINGREQ when the keep-alive interval elapsed; report a network
    /// failure when an outstanding ping outlived the command timeout.
    fn keep_alive(&mut self) -> Result<(), Error> {
        if self.cfg.keep_alive_secs == 0 {
            return Ok(());
        }
        let now = self.clock.now_ms();
        if self.ping_outstanding {
            if now.saturating_sub(self.ping_sent_at) >= self.cfg.command_timeout_ms as u64 {
                return Err(Error::Io);
            }
            return Ok(());
        }
        if self.ping_timer.expired(now) {
            let frame_len = packet::encode_pingreq(&mut self.link.tx)?;
            self.link.send(frame_len)?;
            self.ping_outstanding = true;
            self.ping_sent_at = now;
            self.ping_timer = Countdown::start(now, self.cfg.keep_alive_secs as u64 * 1_000);
        }
        Ok(())
    }

    /// Transition to `Disconnected` after a transport fault: close the
    /// handle, bump the disconnect counter, arm the reconnect delay and
    /// notify the application.
    fn on_network_failure(&mut self) {
        self.link.teardown();
        self.rx_len = 0;
        self.ping_outstanding = false;
        let was_connected = self.state == SessionState::Connected;
        self.state = SessionState::Disconnected;
        if was_connected {
            self.network_disconnects = self.network_disconnects.saturating_add(1);
            self.reconnect_wait_ms = MIN_RECONNECT_WAIT_MS;
            self.reconnect_timer =
                Countdown::start(self.clock.now_ms(), self.reconnect_wait_ms);
            self.emit(Event::Disconnect);
        }
    }

    /// One reconnect attempt; on failure the delay doubles up to the cap.
    fn attempt_reconnect(&mut self) {
        self.state = SessionState::Reconnecting;
        match self.connect() {
            Ok(()) => {
                self.emit(Event::Reconnect);
            }
            Err(_) => {
                self.state = SessionState::Disconnected;
                self.reconnect_wait_ms =
                    (self.reconnect_wait_ms * 2).min(MAX_RECONNECT_WAIT_MS);
                self.reconnect_timer =
                    Countdown::start(self.clock.now_ms(), self.reconnect_wait_ms);
            }
        }
    }
}

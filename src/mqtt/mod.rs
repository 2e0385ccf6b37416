//! MQTT 3.1.1 client for embedded systems.
//!
//! This module implements the device side of an MQTT hub connection: a
//! packet codec, in-flight acknowledgment registries, a cooperative session
//! engine and the public [`Client`] facade. It targets `no_std` environments
//! and uses fixed-size buffers throughout; nothing here allocates.
//!
//! # Protocol Overview
//!
//! MQTT is a lightweight publish-subscribe protocol designed for
//! low-bandwidth, high-latency or unreliable networks. The client publishes
//! messages to topics and subscribes to topic filters; a broker routes
//! messages between clients. QoS 0 (at most once) and QoS 1 (at least once)
//! are supported; QoS 2 is out of scope for hub communication.
//!
//! # Operating model
//!
//! The engine is cooperative and single-threaded: after construction the
//! device calls [`Client::yield_ms`] periodically. One yield tick reads and
//! dispatches inbound packets, expires unacknowledged operations, keeps the
//! connection alive with pings, and runs the bounded-backoff reconnect
//! policy. There are no background threads; nothing happens between ticks.
//!
//! Publish and subscribe calls return immediately with the assigned packet
//! identifier. For acknowledged operations the eventual outcome (success,
//! timeout or rejection) is reported later through the session's event
//! callback, not through the call's return value.
//!
//! ```rust,ignore
//! let mut client = Client::construct(dial, clock, &mut store, params, Some(on_event), ())?;
//! client.subscribe("commands/+", SubscribeRequest { qos: QoS::AtLeastOnce, handler: on_command })?;
//! loop {
//!     client.yield_ms(200)?;
//! }
//! ```

/// Error types for MQTT operations.
pub mod error;

/// MQTT 3.1.1 control-packet codec.
pub mod packet;

/// In-flight acknowledgment registries.
pub mod registry;

/// The session engine: state machine, keep-alive and reconnect policy.
pub mod session;

/// The public client facade.
pub mod client;

/// Topic-filter matching.
pub mod topic;

pub use client::{Client, ClientParams};
pub use error::Error;
pub use packet::QoS;
pub use session::{
    Event, EventHandler, IncomingPublish, MessageHandler, PublishRequest, SessionState,
    SubscribeRequest,
};

/// Capacity of the session's write buffer; no outbound packet may exceed it.
pub const TX_BUF_LEN: usize = 2048;
/// Capacity of the session's read buffer; inbound frames accumulate here.
pub const RX_BUF_LEN: usize = 2048;
/// Number of subscription handler slots per session.
pub const MAX_MESSAGE_HANDLERS: usize = 10;
/// Maximum unacknowledged QoS 1 publishes in flight.
pub const MAX_PUB_WAIT: usize = 10;
/// Maximum unacknowledged subscribe/unsubscribe operations in flight.
pub const MAX_SUB_WAIT: usize = 10;
/// Maximum length of a topic name or topic filter.
pub const TOPIC_MAX: usize = 128;
/// Lower clamp for the per-operation command timeout.
pub const MIN_COMMAND_TIMEOUT_MS: u32 = 500;
/// Upper clamp for the per-operation command timeout.
pub const MAX_COMMAND_TIMEOUT_MS: u32 = 20_000;
/// Upper clamp for the keep-alive interval, in seconds.
pub const MAX_KEEP_ALIVE_SECS: u16 = 690;
/// Initial reconnect delay.
pub const MIN_RECONNECT_WAIT_MS: u64 = 1_000;
/// Reconnect delay ceiling; the delay doubles after each failed attempt
/// until it reaches this bound.
pub const MAX_RECONNECT_WAIT_MS: u64 = 60_000;

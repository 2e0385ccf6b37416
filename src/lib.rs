//! # iotlink - Rust IoT device SDK
//!
//! A Rust SDK that connects IoT devices to a cloud MQTT hub. It bundles an
//! MQTT 3.1.1 session engine with provisioned-credential management and a
//! small set of hardware-abstraction traits (transport, storage, time), and
//! is designed for embedded systems and `no_std` environments.
//!
//! ## Features
//!
//! ### MQTT session engine
//! - Connection establishment with authentication-mode-dependent transport
//!   setup (certificate TLS, pre-shared-key TLS, or plaintext)
//! - Publish/subscribe with in-flight acknowledgment tracking for QoS 1
//! - Keep-alive scheduling and bounded-backoff automatic reconnect
//! - Cooperative single-threaded operation: all I/O happens inside a
//!   bounded `yield_ms` call, no background threads
//!
//! ### Device identity & credentials
//! - Device identity derived from product ID and device name
//! - Credential store abstraction with a flash/EEPROM-backed implementation
//! - One-shot provisioning seam for dynamic device registration
//!
//! ### Hardware abstraction
//! - Byte-stream transport traits, security-parameter aware dialing
//! - Storage traits for credential persistence
//! - Clock abstraction usable from bare-metal timers or the host clock
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! iotlink = "0.1.0"
//! ```
//!
//! The entry point is [`mqtt::Client`], constructed from a [`network::Dial`]
//! implementation, a [`time::Clock`], a [`device::CredentialStore`] and the
//! client parameters. After construction the device drives the connection by
//! calling [`mqtt::Client::yield_ms`] periodically; publish and subscribe
//! outcomes for acknowledged operations arrive through the event callback.
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support, including a host system clock
//!   (default: disabled)
//! - `defmt`: Enable defmt formatting of errors and events for embedded
//!   debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Network abstraction layer: byte-stream transport traits and the
/// security-parameter aware connection opener used by the MQTT engine.
pub mod network;

/// MQTT 3.1.1 client: packet codec, in-flight registries, session engine
/// and the public client facade.
pub mod mqtt;

/// Device identity, authentication credentials and credential persistence.
pub mod device;

/// Storage abstraction used for credential persistence.
pub mod storage;

/// Time abstraction: monotonic clock trait and countdown timers.
pub mod time;

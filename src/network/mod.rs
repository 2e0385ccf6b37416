//! A network abstraction layer for embedded systems
//!
//! This module provides the traits the MQTT engine uses to talk to the
//! outside world. A platform supplies a [`Dial`] implementation that can open
//! a byte-stream connection to a host/port, optionally secured according to
//! the [`TransportSecurity`] parameters derived from the device's
//! authentication mode. The opened [`Connection`] is then driven exclusively
//! by the session engine.

#![allow(missing_docs)]
#![deny(unsafe_code)]

use heapless::{String, Vec};

/// Common error types for network operations
pub mod error;

pub use error::Error;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connection, Dial, Read, Write};
}

/// Maximum length of a broker host name.
pub const HOST_MAX: usize = 64;
/// Maximum length of a certificate or key file path.
pub const CERT_PATH_MAX: usize = 128;
/// Maximum length of a decoded pre-shared key, in bytes.
pub const PSK_MAX: usize = 48;
/// Maximum length of a PSK identity (the device client ID).
pub const PSK_IDENTITY_MAX: usize = 80;
/// Default TLS handshake timeout handed to transports.
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT_MS: u32 = 5_000;

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: Into<Error> + core::fmt::Debug;
    /// Read data from the connection.
    ///
    /// `Ok(0)` means the peer closed the stream. A transport with nothing to
    /// deliver within its read window reports an error converting to
    /// [`Error::Timeout`].
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: Into<Error> + core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: Into<Error> + core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A connection opener.
///
/// The engine owns one `Dial` per session and re-invokes it when the
/// reconnect policy decides to re-establish a dropped connection.
pub trait Dial {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: Into<Error> + core::fmt::Debug;
    /// Open a connection to `endpoint`, secured according to `security`.
    fn dial(
        &mut self,
        endpoint: &Endpoint,
        security: &TransportSecurity,
    ) -> Result<Self::Connection, Self::Error>;
}

/// A broker endpoint: host name and TCP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String<HOST_MAX>,
    pub port: u16,
}

impl core::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Transport security parameters, produced by the device's authentication
/// credentials and consumed by [`Dial`] implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSecurity {
    /// No transport security; the plaintext port carries the MQTT stream.
    None,
    /// Mutual TLS with a client certificate and private key.
    Tls(TlsConfig),
    /// TLS with a pre-shared key.
    TlsPsk(PskConfig),
}

/// Certificate-mode TLS parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// PEM-encoded trust anchor, supplied by the integrator.
    pub ca_pem: Option<&'static str>,
    /// Path to the client certificate file.
    pub cert_path: String<CERT_PATH_MAX>,
    /// Path to the client private key file.
    pub key_path: String<CERT_PATH_MAX>,
    /// Handshake timeout in milliseconds.
    pub handshake_timeout_ms: u32,
}

/// PSK-mode TLS parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskConfig {
    /// PEM-encoded trust anchor, supplied by the integrator.
    pub ca_pem: Option<&'static str>,
    /// PSK identity presented to the broker (the device client ID).
    pub identity: String<PSK_IDENTITY_MAX>,
    /// Raw pre-shared key bytes.
    pub key: Vec<u8, PSK_MAX>,
    /// Handshake timeout in milliseconds.
    pub handshake_timeout_ms: u32,
}

//! Error types for the MQTT client.

/// Errors surfaced by MQTT client operations.
///
/// The variants fall into a few families with different blast radii:
///
/// - Caller-input problems (`InvalidParam`) are fatal to the call, never to
///   the session.
/// - Protocol-level problems (`EncodeOverflow`, `MalformedPacket`) discard
///   the offending frame and leave the session running.
/// - Registry anomalies (`DuplicateId`, `UnknownId`) are logged and
///   non-fatal; a late acknowledgment after a timeout is expected traffic.
/// - Transport problems (`Io`, `ConnectFailure`, `ConnectionRefused`,
///   `Timeout`) drive the session state machine toward `Disconnected` and
///   are recoverable through the reconnect policy.
/// - Resource/misconfiguration problems (`InitFailure`, `NoFreeSlot`,
///   `StorageUnavailable`) are fatal to the operation and surfaced as-is.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A caller-supplied parameter was invalid.
    InvalidParam,
    /// A packet would not fit the session's write buffer.
    EncodeOverflow,
    /// An inbound frame violated the MQTT framing rules.
    MalformedPacket,
    /// A packet identifier was already tracked by a registry.
    DuplicateId,
    /// An acknowledgment referenced a packet identifier no registry tracks.
    UnknownId,
    /// A transport read or write failed.
    Io,
    /// The transport could not be opened, or the broker handshake failed
    /// before a CONNACK was evaluated.
    ConnectFailure,
    /// The broker refused the connection; the code is the CONNACK return
    /// code (1..=5 in MQTT 3.1.1).
    ConnectionRefused(u8),
    /// An operation did not complete within its time bound.
    Timeout,
    /// The session could not be initialized.
    InitFailure,
    /// The subscription handler table is full.
    NoFreeSlot,
    /// The credential store could not supply the device credentials.
    StorageUnavailable,
    /// The operation requires a connected session.
    NotConnected,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InvalidParam => defmt::write!(f, "InvalidParam"),
            Error::EncodeOverflow => defmt::write!(f, "EncodeOverflow"),
            Error::MalformedPacket => defmt::write!(f, "MalformedPacket"),
            Error::DuplicateId => defmt::write!(f, "DuplicateId"),
            Error::UnknownId => defmt::write!(f, "UnknownId"),
            Error::Io => defmt::write!(f, "Io"),
            Error::ConnectFailure => defmt::write!(f, "ConnectFailure"),
            Error::ConnectionRefused(code) => defmt::write!(f, "ConnectionRefused({})", code),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::InitFailure => defmt::write!(f, "InitFailure"),
            Error::NoFreeSlot => defmt::write!(f, "NoFreeSlot"),
            Error::StorageUnavailable => defmt::write!(f, "StorageUnavailable"),
            Error::NotConnected => defmt::write!(f, "NotConnected"),
        }
    }
}

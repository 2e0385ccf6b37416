//! The public MQTT client facade.
//!
//! [`Client::construct`] composes the full bring-up: load the provisioned
//! credentials, validate and derive the endpoint, configure transport
//! security for the device's auth mode, and perform the MQTT handshake. Any
//! failure along the way tears down whatever was built and returns an
//! error; a `Client` value in hand is always a fully initialized, connected
//! session. [`Client::close`] consumes the handle, so no operation can
//! follow teardown.

use core::fmt::Write as _;

use heapless::String;

use super::error::Error;
use super::session::{
    EventHandler, PublishRequest, Session, SessionConfig, SessionState, SubscribeRequest,
};
use crate::device::{CredentialStore, StoreError};
use crate::network::{Dial, Endpoint, HOST_MAX};
use crate::time::Clock;

/// Client construction parameters.
///
/// Identity and authentication material come from the credential store;
/// these parameters carry the behavior knobs.
#[derive(Debug, Clone)]
pub struct ClientParams<'a> {
    /// Hub domain; the broker host is `{product_id}.{domain}`.
    pub domain: &'a str,
    /// Per-operation timeout in milliseconds (clamped into the permitted
    /// range on construction).
    pub command_timeout_ms: u32,
    /// Keep-alive interval in milliseconds (clamped to the protocol bound).
    pub keep_alive_interval_ms: u32,
    /// Whether to request a clean broker session.
    pub clean_session: bool,
    /// Whether the session reconnects on its own after a network failure.
    pub auto_reconnect: bool,
    /// PEM-encoded trust anchor for the TLS auth modes.
    pub ca_pem: Option<&'static str>,
}

impl<'a> ClientParams<'a> {
    /// Parameters with the default timeouts: 5 s command timeout, 240 s
    /// keep-alive, clean session, auto-reconnect on.
    pub fn new(domain: &'a str) -> Self {
        Self {
            domain,
            command_timeout_ms: 5_000,
            keep_alive_interval_ms: 240_000,
            clean_session: true,
            auto_reconnect: true,
            ca_pem: None,
        }
    }
}

/// A connected MQTT client.
///
/// All operations take `&mut self`; the session is single-threaded and
/// cooperative. Call [`Client::yield_ms`] periodically to drive I/O,
/// acknowledgments, keep-alive and reconnection.
pub struct Client<D: Dial, K: Clock, U> {
    session: Session<D, K, U>,
}

impl<D: Dial, K: Clock, U> core::fmt::Debug for Client<D, K, U> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client").field("session", &self.session).finish()
    }
}

impl<D: Dial, K: Clock, U> Client<D, K, U> {
    /// Build and connect a client.
    ///
    /// Loads the device credentials from `store`, derives the broker host
    /// from the product ID and `params.domain`, configures transport
    /// security for the stored auth mode and performs the CONNECT/CONNACK
    /// handshake. On failure every partially acquired resource is released
    /// before returning; no half-built client escapes.
    pub fn construct<S: CredentialStore>(
        dial: D,
        clock: K,
        store: &mut S,
        params: &ClientParams<'_>,
        on_event: Option<EventHandler<U>>,
        user: U,
    ) -> Result<Self, Error> {
        let credentials = store.load().map_err(|error| match error {
            StoreError::Unavailable => Error::StorageUnavailable,
            StoreError::Corrupt | StoreError::Encoding => Error::InitFailure,
        })?;

        if params.domain.is_empty() {
            return Err(Error::InvalidParam);
        }
        let mut host: String<HOST_MAX> = String::new();
        write!(
            host,
            "{}.{}",
            credentials.identity.product_id(),
            params.domain
        )
        .map_err(|_| Error::InvalidParam)?;

        let security = credentials
            .auth
            .configure_transport(credentials.identity.client_id(), params.ca_pem)
            .map_err(|_| Error::InvalidParam)?;

        let client_id =
            String::try_from(credentials.identity.client_id()).map_err(|_| Error::InvalidParam)?;

        let config = SessionConfig {
            endpoint: Endpoint {
                host,
                port: credentials.auth.port(),
            },
            security,
            client_id,
            keep_alive_secs: (params.keep_alive_interval_ms / 1_000).min(u16::MAX as u32) as u16,
            clean_session: params.clean_session,
            auto_reconnect: params.auto_reconnect,
            command_timeout_ms: params.command_timeout_ms,
        };

        let mut session = Session::new(dial, clock, config, on_event, user);
        // A connect failure drops the session here, releasing the transport
        // and every registry entry with it.
        session.connect()?;
        Ok(Self { session })
    }

    /// Publish `payload` to `topic`; see [`Session::publish`].
    pub fn publish(&mut self, topic: &str, request: &PublishRequest<'_>) -> Result<u16, Error> {
        self.session.publish(topic, request)
    }

    /// Subscribe to `filter`; see [`Session::subscribe`].
    pub fn subscribe(&mut self, filter: &str, request: SubscribeRequest<U>) -> Result<u16, Error> {
        self.session.subscribe(filter, request)
    }

    /// Unsubscribe from `filter`; see [`Session::unsubscribe`].
    pub fn unsubscribe(&mut self, filter: &str) -> Result<u16, Error> {
        self.session.unsubscribe(filter)
    }

    /// Drive the session for up to `timeout_ms`; see [`Session::yield_ms`].
    pub fn yield_ms(&mut self, timeout_ms: u32) -> Result<(), Error> {
        self.session.yield_ms(timeout_ms)
    }

    /// Whether the session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// How many times the session lost its network connection.
    pub fn network_disconnect_count(&self) -> u32 {
        self.session.network_disconnect_count()
    }

    /// Reset the network-disconnect counter.
    pub fn reset_network_disconnect_count(&mut self) {
        self.session.reset_network_disconnect_count()
    }

    /// Number of QoS 1 publishes awaiting acknowledgment.
    pub fn pending_publish_count(&self) -> usize {
        self.session.pending_publish_count()
    }

    /// Borrow the user context.
    pub fn user(&self) -> &U {
        self.session.user()
    }

    /// Mutably borrow the user context.
    pub fn user_mut(&mut self) -> &mut U {
        self.session.user_mut()
    }

    /// Tear the client down.
    ///
    /// Sends DISCONNECT if the session is connected, closes the transport,
    /// and drains both in-flight registries so every owned frame copy is
    /// released. Consuming `self` makes use-after-destroy unrepresentable.
    pub fn close(mut self) -> Result<(), Error> {
        let result = if self.session.is_connected() {
            self.session.disconnect()
        } else {
            Ok(())
        };
        let _ = self.session.drain_for_teardown();
        result
    }
}

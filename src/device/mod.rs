//! Device identity and credential management.
//!
//! Every device is identified by a product ID and a device name assigned at
//! registration time; the MQTT client ID is derived from the two. How the
//! device authenticates to the hub is governed by its [`AuthMode`]:
//! certificate TLS, pre-shared-key TLS, or plaintext with a shared secret.
//!
//! Credentials live behind the [`CredentialStore`] trait so they can be
//! loaded from flash, EEPROM, a host file or a test fixture. Devices that
//! ship without a secret obtain one once through a [`Provisioner`] and
//! persist it before the first MQTT connection.

use heapless::String;

/// Authentication credential variants and transport-security derivation.
pub mod credentials;

/// Storage-backed credential persistence.
pub mod flash;

pub use credentials::AuthCredentials;
pub use flash::FlashCredentialStore;

/// Maximum length of a product ID.
pub const PRODUCT_ID_MAX: usize = 16;
/// Maximum length of a device name.
pub const DEVICE_NAME_MAX: usize = 48;
/// Maximum length of a client ID (product ID + device name).
pub const CLIENT_ID_MAX: usize = 80;
/// Maximum length of a base64-encoded device secret.
pub const SECRET_B64_MAX: usize = 64;

/// The device's configured authentication scheme.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AuthMode {
    /// Mutual TLS with a client certificate and private key.
    CertTls,
    /// TLS secured with a pre-shared key derived from the device secret.
    PskTls,
    /// No transport security; the shared secret authenticates the device.
    Plaintext,
}

impl AuthMode {
    /// Stable wire/storage tag for this mode.
    pub fn as_u8(self) -> u8 {
        match self {
            AuthMode::CertTls => 0,
            AuthMode::PskTls => 1,
            AuthMode::Plaintext => 2,
        }
    }

    /// Parse a stored tag back into a mode.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AuthMode::CertTls),
            1 => Some(AuthMode::PskTls),
            2 => Some(AuthMode::Plaintext),
            _ => None,
        }
    }
}

/// Errors produced while validating identity fields.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IdentityError {
    /// The product ID or device name was empty.
    Empty,
    /// A field exceeded its maximum length.
    TooLong,
}

/// Errors produced by a [`CredentialStore`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StoreError {
    /// The backing storage could not be used, or holds no record.
    Unavailable,
    /// A record was found but failed integrity or format checks.
    Corrupt,
    /// The credentials could not be encoded for storage.
    Encoding,
}

#[cfg(feature = "defmt")]
impl defmt::Format for StoreError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            StoreError::Unavailable => defmt::write!(f, "Unavailable"),
            StoreError::Corrupt => defmt::write!(f, "Corrupt"),
            StoreError::Encoding => defmt::write!(f, "Encoding"),
        }
    }
}

/// A device identity: product ID, device name, and the client ID derived
/// from them.
///
/// The client ID is always `product_id` followed by `device_name`. The only
/// way to build or change an identity is through [`DeviceIdentity::new`],
/// which re-derives the client ID, so the three fields cannot drift apart.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DeviceIdentity {
    product_id: String<PRODUCT_ID_MAX>,
    device_name: String<DEVICE_NAME_MAX>,
    client_id: String<CLIENT_ID_MAX>,
}

impl DeviceIdentity {
    /// Build an identity, validating field lengths and deriving the client ID.
    pub fn new(product_id: &str, device_name: &str) -> Result<Self, IdentityError> {
        if product_id.is_empty() || device_name.is_empty() {
            return Err(IdentityError::Empty);
        }
        let product_id: String<PRODUCT_ID_MAX> =
            String::try_from(product_id).map_err(|_| IdentityError::TooLong)?;
        let device_name: String<DEVICE_NAME_MAX> =
            String::try_from(device_name).map_err(|_| IdentityError::TooLong)?;

        let mut client_id: String<CLIENT_ID_MAX> = String::new();
        client_id
            .push_str(&product_id)
            .map_err(|_| IdentityError::TooLong)?;
        client_id
            .push_str(&device_name)
            .map_err(|_| IdentityError::TooLong)?;

        Ok(Self {
            product_id,
            device_name,
            client_id,
        })
    }

    /// The product ID.
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// The device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// The derived MQTT client ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// A device identity together with its authentication material.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DeviceCredentials {
    /// The device identity.
    pub identity: DeviceIdentity,
    /// The authentication material for the configured mode.
    pub auth: AuthCredentials,
}

/// Source of provisioned device credentials.
pub trait CredentialStore {
    /// Load the device credentials.
    fn load(&mut self) -> Result<DeviceCredentials, StoreError>;

    /// Persist the device credentials.
    fn store(&mut self, credentials: &DeviceCredentials) -> Result<(), StoreError>;
}

/// One-shot dynamic registration seam.
///
/// Implementations perform the registration exchange with the hub (typically
/// an HTTP request signed with the product secret) and return the per-device
/// secret to persist. The SDK invokes this at most once, before the first
/// MQTT connection, when the credential store holds no secret.
pub trait Provisioner {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Register `device_name` under `product_id` and return the base64
    /// device secret issued by the hub.
    fn register(
        &mut self,
        product_id: &str,
        device_name: &str,
    ) -> Result<String<SECRET_B64_MAX>, Self::Error>;
}

//! Authentication credentials and transport-security derivation.
//!
//! Each [`AuthMode`](super::AuthMode) has a credential variant carrying the
//! material that mode needs. The variant knows how to turn itself into the
//! [`TransportSecurity`] parameters handed to the transport opener, and which
//! broker port its mode uses, so the rest of the SDK never branches on the
//! mode directly.

use base64ct::{Base64, Encoding};
use heapless::{String, Vec};

use super::{AuthMode, SECRET_B64_MAX};
use crate::network::{
    CERT_PATH_MAX, DEFAULT_TLS_HANDSHAKE_TIMEOUT_MS, PSK_MAX, PskConfig, TlsConfig,
    TransportSecurity,
};

/// MQTT broker port for TLS transports (certificate or PSK).
pub const TLS_PORT: u16 = 8883;
/// MQTT broker port for plaintext transports.
pub const PLAINTEXT_PORT: u16 = 1883;

/// Errors produced while deriving transport security from credentials.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CredentialError {
    /// Certificate mode without a certificate file path.
    MissingCertPath,
    /// Certificate mode without a private key file path.
    MissingKeyPath,
    /// The device secret was empty, not valid base64, or decoded to more
    /// bytes than a pre-shared key may hold.
    BadSecret,
    /// The PSK identity (client ID) was empty or too long.
    BadIdentity,
}

#[cfg(feature = "defmt")]
impl defmt::Format for CredentialError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            CredentialError::MissingCertPath => defmt::write!(f, "MissingCertPath"),
            CredentialError::MissingKeyPath => defmt::write!(f, "MissingKeyPath"),
            CredentialError::BadSecret => defmt::write!(f, "BadSecret"),
            CredentialError::BadIdentity => defmt::write!(f, "BadIdentity"),
        }
    }
}

/// Authentication material for one [`AuthMode`](super::AuthMode).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AuthCredentials {
    /// Certificate mode: paths to the client certificate and private key.
    CertTls {
        /// Path to the client certificate file.
        cert_path: String<CERT_PATH_MAX>,
        /// Path to the client private key file.
        key_path: String<CERT_PATH_MAX>,
    },
    /// PSK mode: the base64 device secret issued at registration.
    PskTls {
        /// Base64-encoded device secret.
        secret: String<SECRET_B64_MAX>,
    },
    /// Plaintext mode: the shared secret authenticates at the protocol
    /// level, the transport carries no security.
    Plaintext {
        /// Base64-encoded device secret.
        secret: String<SECRET_B64_MAX>,
    },
}

impl AuthCredentials {
    /// The mode this material belongs to.
    pub fn mode(&self) -> AuthMode {
        match self {
            AuthCredentials::CertTls { .. } => AuthMode::CertTls,
            AuthCredentials::PskTls { .. } => AuthMode::PskTls,
            AuthCredentials::Plaintext { .. } => AuthMode::Plaintext,
        }
    }

    /// The broker port this mode connects to.
    pub fn port(&self) -> u16 {
        match self {
            AuthCredentials::Plaintext { .. } => PLAINTEXT_PORT,
            _ => TLS_PORT,
        }
    }

    /// Derive the transport-security parameters for this mode.
    ///
    /// `client_id` becomes the PSK identity in PSK mode; `ca_pem` is the
    /// integrator-supplied trust anchor for the TLS modes.
    pub fn configure_transport(
        &self,
        client_id: &str,
        ca_pem: Option<&'static str>,
    ) -> Result<TransportSecurity, CredentialError> {
        match self {
            AuthCredentials::CertTls {
                cert_path,
                key_path,
            } => {
                if cert_path.is_empty() {
                    return Err(CredentialError::MissingCertPath);
                }
                if key_path.is_empty() {
                    return Err(CredentialError::MissingKeyPath);
                }
                Ok(TransportSecurity::Tls(TlsConfig {
                    ca_pem,
                    cert_path: cert_path.clone(),
                    key_path: key_path.clone(),
                    handshake_timeout_ms: DEFAULT_TLS_HANDSHAKE_TIMEOUT_MS,
                }))
            }
            AuthCredentials::PskTls { secret } => {
                let key = decode_psk(secret)?;
                if client_id.is_empty() {
                    return Err(CredentialError::BadIdentity);
                }
                let identity =
                    String::try_from(client_id).map_err(|_| CredentialError::BadIdentity)?;
                Ok(TransportSecurity::TlsPsk(PskConfig {
                    ca_pem,
                    identity,
                    key,
                    handshake_timeout_ms: DEFAULT_TLS_HANDSHAKE_TIMEOUT_MS,
                }))
            }
            AuthCredentials::Plaintext { .. } => Ok(TransportSecurity::None),
        }
    }

    /// The base64 device secret, if this mode carries one.
    pub fn secret(&self) -> Option<&str> {
        match self {
            AuthCredentials::CertTls { .. } => None,
            AuthCredentials::PskTls { secret } | AuthCredentials::Plaintext { secret } => {
                Some(secret)
            }
        }
    }
}

/// Decode a base64 device secret into raw pre-shared-key bytes.
pub(crate) fn decode_psk(secret: &str) -> Result<Vec<u8, PSK_MAX>, CredentialError> {
    if secret.is_empty() {
        return Err(CredentialError::BadSecret);
    }
    let mut raw = [0u8; PSK_MAX];
    let decoded = Base64::decode(secret.as_bytes(), &mut raw)
        .map_err(|_| CredentialError::BadSecret)?;
    Vec::from_slice(decoded).map_err(|_| CredentialError::BadSecret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> String<CERT_PATH_MAX> {
        String::try_from(s).unwrap()
    }

    #[test]
    fn cert_mode_requires_both_paths() {
        let creds = AuthCredentials::CertTls {
            cert_path: path("/certs/dev.crt"),
            key_path: path(""),
        };
        assert_eq!(
            creds.configure_transport("PRDdev", None),
            Err(CredentialError::MissingKeyPath)
        );

        let creds = AuthCredentials::CertTls {
            cert_path: path(""),
            key_path: path("/certs/dev.key"),
        };
        assert_eq!(
            creds.configure_transport("PRDdev", None),
            Err(CredentialError::MissingCertPath)
        );
    }

    #[test]
    fn psk_mode_decodes_secret_and_uses_client_id_identity() {
        // "secret-bytes-01" base64-encoded
        let creds = AuthCredentials::PskTls {
            secret: String::try_from("c2VjcmV0LWJ5dGVzLTAx").unwrap(),
        };
        match creds.configure_transport("PRDdev", None).unwrap() {
            TransportSecurity::TlsPsk(cfg) => {
                assert_eq!(cfg.identity.as_str(), "PRDdev");
                assert_eq!(&cfg.key[..], b"secret-bytes-01");
            }
            other => panic!("unexpected security: {other:?}"),
        }
    }

    #[test]
    fn psk_mode_rejects_invalid_base64() {
        let creds = AuthCredentials::PskTls {
            secret: String::try_from("!!not-base64!!").unwrap(),
        };
        assert_eq!(
            creds.configure_transport("PRDdev", None),
            Err(CredentialError::BadSecret)
        );
    }

    #[test]
    fn plaintext_mode_has_no_transport_security() {
        let creds = AuthCredentials::Plaintext {
            secret: String::try_from("c2VjcmV0").unwrap(),
        };
        assert_eq!(
            creds.configure_transport("PRDdev", None),
            Ok(TransportSecurity::None)
        );
        assert_eq!(creds.port(), PLAINTEXT_PORT);
    }

    #[test]
    fn tls_modes_use_the_tls_port() {
        let creds = AuthCredentials::CertTls {
            cert_path: path("/c"),
            key_path: path("/k"),
        };
        assert_eq!(creds.port(), TLS_PORT);
    }
}

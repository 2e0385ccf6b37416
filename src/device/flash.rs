//! Storage-backed credential persistence.
//!
//! A [`FlashCredentialStore`] keeps the device record on any
//! [`Storage`](crate::storage::Storage) implementation as a small framed
//! blob: a magic tag, the record length, a CRC-32 of the record, then the
//! record itself as JSON. The framing lets the store tell "never
//! provisioned" (no magic, typically erased flash) apart from "provisioned
//! but damaged" (bad CRC or unparseable record).

use serde::{Deserialize, Serialize};

use super::credentials::AuthCredentials;
use super::{AuthMode, CredentialStore, DeviceCredentials, DeviceIdentity, StoreError};
use crate::storage::Storage;
use heapless::String;

/// Magic tag marking a valid record frame.
const RECORD_MAGIC: [u8; 4] = *b"IOTC";
/// Frame header: magic + length (u16 BE) + CRC-32 (u32 BE).
const HEADER_LEN: usize = 10;
/// Maximum serialized record size.
const RECORD_MAX: usize = 384;

/// The on-storage shape of the device record.
///
/// Fields borrow from the read buffer during load; unused fields for a mode
/// are stored as empty strings.
#[derive(Serialize, Deserialize)]
struct CredentialRecord<'a> {
    product_id: &'a str,
    device_name: &'a str,
    auth_mode: u8,
    secret: &'a str,
    cert_path: &'a str,
    key_path: &'a str,
}

/// A [`CredentialStore`] over a raw [`Storage`] device.
#[derive(Debug)]
pub struct FlashCredentialStore<S: Storage> {
    storage: S,
    offset: u32,
}

impl<S: Storage> FlashCredentialStore<S> {
    /// Create a store persisting its record at `offset` within `storage`.
    pub fn new(storage: S, offset: u32) -> Self {
        Self { storage, offset }
    }

    /// Release the underlying storage device.
    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: Storage> CredentialStore for FlashCredentialStore<S> {
    fn load(&mut self) -> Result<DeviceCredentials, StoreError> {
        let mut header = [0u8; HEADER_LEN];
        self.storage
            .read(self.offset, &mut header)
            .map_err(|_| StoreError::Unavailable)?;

        if header[..4] != RECORD_MAGIC {
            return Err(StoreError::Unavailable);
        }
        let len = u16::from_be_bytes([header[4], header[5]]) as usize;
        let crc = u32::from_be_bytes([header[6], header[7], header[8], header[9]]);
        if len == 0 || len > RECORD_MAX {
            return Err(StoreError::Corrupt);
        }

        let mut body = [0u8; RECORD_MAX];
        self.storage
            .read(self.offset + HEADER_LEN as u32, &mut body[..len])
            .map_err(|_| StoreError::Unavailable)?;
        if crc32fast::hash(&body[..len]) != crc {
            return Err(StoreError::Corrupt);
        }

        let (record, _) = serde_json_core::de::from_slice::<CredentialRecord>(&body[..len])
            .map_err(|_| StoreError::Corrupt)?;

        let identity = DeviceIdentity::new(record.product_id, record.device_name)
            .map_err(|_| StoreError::Corrupt)?;
        let auth = match AuthMode::from_u8(record.auth_mode) {
            Some(AuthMode::CertTls) => AuthCredentials::CertTls {
                cert_path: String::try_from(record.cert_path).map_err(|_| StoreError::Corrupt)?,
                key_path: String::try_from(record.key_path).map_err(|_| StoreError::Corrupt)?,
            },
            Some(AuthMode::PskTls) => AuthCredentials::PskTls {
                secret: String::try_from(record.secret).map_err(|_| StoreError::Corrupt)?,
            },
            Some(AuthMode::Plaintext) => AuthCredentials::Plaintext {
                secret: String::try_from(record.secret).map_err(|_| StoreError::Corrupt)?,
            },
            None => return Err(StoreError::Corrupt),
        };

        Ok(DeviceCredentials { identity, auth })
    }

    fn store(&mut self, credentials: &DeviceCredentials) -> Result<(), StoreError> {
        let (cert_path, key_path) = match &credentials.auth {
            AuthCredentials::CertTls {
                cert_path,
                key_path,
            } => (cert_path.as_str(), key_path.as_str()),
            _ => ("", ""),
        };
        let record = CredentialRecord {
            product_id: credentials.identity.product_id(),
            device_name: credentials.identity.device_name(),
            auth_mode: credentials.auth.mode().as_u8(),
            secret: credentials.auth.secret().unwrap_or(""),
            cert_path,
            key_path,
        };

        let mut body = [0u8; RECORD_MAX];
        let len =
            serde_json_core::ser::to_slice(&record, &mut body).map_err(|_| StoreError::Encoding)?;

        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(&RECORD_MAGIC);
        header[4..6].copy_from_slice(&(len as u16).to_be_bytes());
        header[6..10].copy_from_slice(&crc32fast::hash(&body[..len]).to_be_bytes());

        self.storage
            .write(self.offset, &header)
            .map_err(|_| StoreError::Unavailable)?;
        self.storage
            .write(self.offset + HEADER_LEN as u32, &body[..len])
            .map_err(|_| StoreError::Unavailable)?;
        Ok(())
    }
}

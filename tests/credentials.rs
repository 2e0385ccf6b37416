//! Credential store, identity and client bring-up tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use iotlink::device::credentials::AuthCredentials;
use iotlink::device::{
    CredentialStore, DeviceCredentials, DeviceIdentity, FlashCredentialStore, Provisioner,
    StoreError, SECRET_B64_MAX,
};
use iotlink::mqtt::packet::ConnAck;
use iotlink::mqtt::{Client, ClientParams, Error, PublishRequest, QoS};
use iotlink::network::{
    Close, Connection, Dial, Endpoint, Error as NetError, Read, TransportSecurity, Write,
};
use iotlink::storage::{ReadStorage, Storage};
use iotlink::time::ManualClock;

// ---- storage fixture -------------------------------------------------------

const FLASH_CAPACITY: usize = 1024;

struct MockFlash {
    memory: [u8; FLASH_CAPACITY],
}

impl MockFlash {
    fn new() -> Self {
        Self {
            memory: [0xFF; FLASH_CAPACITY],
        }
    }
}

impl ReadStorage for MockFlash {
    type Error = iotlink::storage::error::Error;
    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        if offset + bytes.len() > self.memory.len() {
            return Err(iotlink::storage::error::Error::OutOfBounds);
        }
        bytes.copy_from_slice(&self.memory[offset..offset + bytes.len()]);
        Ok(())
    }
    fn capacity(&self) -> usize {
        FLASH_CAPACITY
    }
}

impl Storage for MockFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        if offset + bytes.len() > self.memory.len() {
            return Err(iotlink::storage::error::Error::OutOfBounds);
        }
        self.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

// ---- network fixture -------------------------------------------------------

#[derive(Default)]
struct Wire {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
    dial_count: usize,
}

struct MockConnection {
    wire: Rc<RefCell<Wire>>,
}

impl Read for MockConnection {
    type Error = NetError;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        match wire.inbound.pop_front() {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => Err(NetError::Timeout),
        }
    }
}

impl Write for MockConnection {
    type Error = NetError;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.wire.borrow_mut().outbound.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = NetError;
    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for MockConnection {}

struct MockDial {
    wire: Rc<RefCell<Wire>>,
}

impl Dial for MockDial {
    type Connection = MockConnection;
    type Error = NetError;
    fn dial(
        &mut self,
        _endpoint: &Endpoint,
        _security: &TransportSecurity,
    ) -> Result<Self::Connection, Self::Error> {
        self.wire.borrow_mut().dial_count += 1;
        Ok(MockConnection {
            wire: self.wire.clone(),
        })
    }
}

/// A store backed by a fixed credentials value, or empty.
struct MemStore {
    credentials: Option<DeviceCredentials>,
}

impl CredentialStore for MemStore {
    fn load(&mut self) -> Result<DeviceCredentials, StoreError> {
        self.credentials.clone().ok_or(StoreError::Unavailable)
    }
    fn store(&mut self, credentials: &DeviceCredentials) -> Result<(), StoreError> {
        self.credentials = Some(credentials.clone());
        Ok(())
    }
}

fn plaintext_credentials() -> DeviceCredentials {
    DeviceCredentials {
        identity: DeviceIdentity::new("PRD01", "device-07").unwrap(),
        auth: AuthCredentials::Plaintext {
            secret: heapless::String::try_from("c2VjcmV0").unwrap(),
        },
    }
}

fn cert_credentials(cert_path: &str, key_path: &str) -> DeviceCredentials {
    DeviceCredentials {
        identity: DeviceIdentity::new("PRD01", "device-07").unwrap(),
        auth: AuthCredentials::CertTls {
            cert_path: heapless::String::try_from(cert_path).unwrap(),
            key_path: heapless::String::try_from(key_path).unwrap(),
        },
    }
}

fn connack_frame() -> Vec<u8> {
    let mut buf = [0u8; 8];
    let n = ConnAck {
        session_present: false,
        return_code: 0,
    }
    .encode(&mut buf)
    .unwrap();
    buf[..n].to_vec()
}

// ---- flash credential store ------------------------------------------------

#[test]
fn flash_store_round_trips_every_auth_mode() {
    let cases = [
        plaintext_credentials(),
        cert_credentials("/certs/dev.crt", "/certs/dev.key"),
        DeviceCredentials {
            identity: DeviceIdentity::new("PRD01", "device-07").unwrap(),
            auth: AuthCredentials::PskTls {
                secret: heapless::String::try_from("c2VjcmV0LWJ5dGVzLTAx").unwrap(),
            },
        },
    ];
    for credentials in cases {
        let mut store = FlashCredentialStore::new(MockFlash::new(), 0);
        store.store(&credentials).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, credentials);
        assert_eq!(loaded.identity.client_id(), "PRD01device-07");
    }
}

#[test]
fn erased_flash_reads_as_unprovisioned() {
    let mut store = FlashCredentialStore::new(MockFlash::new(), 0);
    assert_eq!(store.load().unwrap_err(), StoreError::Unavailable);
}

#[test]
fn corrupted_record_is_detected() {
    let mut store = FlashCredentialStore::new(MockFlash::new(), 0);
    store.store(&plaintext_credentials()).unwrap();

    // Flip a byte inside the JSON body; the CRC must catch it.
    let mut flash = store.into_inner();
    flash.memory[24] ^= 0x01;
    let mut store = FlashCredentialStore::new(flash, 0);
    assert_eq!(store.load().unwrap_err(), StoreError::Corrupt);
}

#[test]
fn provisioning_fills_an_empty_store() {
    // A provisioner that hands out a fixed secret, the way a registration
    // endpoint would.
    struct FixedProvisioner;
    impl Provisioner for FixedProvisioner {
        type Error = ();
        fn register(
            &mut self,
            _product_id: &str,
            _device_name: &str,
        ) -> Result<heapless::String<SECRET_B64_MAX>, Self::Error> {
            Ok(heapless::String::try_from("c2VjcmV0LWJ5dGVzLTAx").unwrap())
        }
    }

    let mut store = FlashCredentialStore::new(MockFlash::new(), 0);
    assert_eq!(store.load().unwrap_err(), StoreError::Unavailable);

    let secret = FixedProvisioner.register("PRD01", "device-07").unwrap();
    let credentials = DeviceCredentials {
        identity: DeviceIdentity::new("PRD01", "device-07").unwrap(),
        auth: AuthCredentials::PskTls { secret },
    };
    store.store(&credentials).unwrap();
    assert_eq!(store.load().unwrap(), credentials);
}

#[test]
fn record_survives_at_a_nonzero_offset() {
    let mut store = FlashCredentialStore::new(MockFlash::new(), 256);
    store.store(&plaintext_credentials()).unwrap();
    assert_eq!(store.load().unwrap(), plaintext_credentials());
}

// ---- client bring-up -------------------------------------------------------

fn params() -> ClientParams<'static> {
    ClientParams::new("hub.example.com")
}

#[test]
fn cert_mode_with_missing_key_path_creates_no_session() {
    let wire = Rc::new(RefCell::new(Wire::default()));
    let clock = ManualClock::new(0);
    let mut store = MemStore {
        credentials: Some(cert_credentials("/certs/dev.crt", "")),
    };

    let result: Result<Client<_, _, ()>, _> = Client::construct(
        MockDial { wire: wire.clone() },
        &clock,
        &mut store,
        &params(),
        None,
        (),
    );

    assert_eq!(result.unwrap_err(), Error::InvalidParam);
    // Validation failed before any transport was opened.
    assert_eq!(wire.borrow().dial_count, 0);
}

#[test]
fn missing_credentials_surface_as_storage_unavailable() {
    let wire = Rc::new(RefCell::new(Wire::default()));
    let clock = ManualClock::new(0);
    let mut store = MemStore { credentials: None };

    let result: Result<Client<_, _, ()>, _> =
        Client::construct(MockDial { wire }, &clock, &mut store, &params(), None, ());
    assert_eq!(result.unwrap_err(), Error::StorageUnavailable);
}

#[test]
fn oversized_host_is_rejected() {
    let wire = Rc::new(RefCell::new(Wire::default()));
    let clock = ManualClock::new(0);
    let mut store = MemStore {
        credentials: Some(plaintext_credentials()),
    };
    let long_domain = "d".repeat(80);
    let params = ClientParams::new(&long_domain);

    let result: Result<Client<_, _, ()>, _> =
        Client::construct(MockDial { wire }, &clock, &mut store, &params, None, ());
    assert_eq!(result.unwrap_err(), Error::InvalidParam);
}

#[test]
fn construct_connects_and_close_drains_pending_work() {
    let wire = Rc::new(RefCell::new(Wire::default()));
    wire.borrow_mut().inbound.push_back(connack_frame());
    let clock = ManualClock::new(0);
    let mut store = MemStore {
        credentials: Some(plaintext_credentials()),
    };

    let mut client: Client<_, _, ()> = Client::construct(
        MockDial { wire: wire.clone() },
        &clock,
        &mut store,
        &params(),
        None,
        (),
    )
    .unwrap();
    assert!(client.is_connected());

    // Leave three QoS 1 publishes unacknowledged.
    for _ in 0..3 {
        client
            .publish(
                "sensors/data",
                &PublishRequest {
                    qos: QoS::AtLeastOnce,
                    retain: false,
                    payload: b"reading",
                },
            )
            .unwrap();
    }
    assert_eq!(client.pending_publish_count(), 3);

    wire.borrow_mut().outbound.clear();
    client.close().unwrap();
    // Teardown sent DISCONNECT before closing the transport.
    assert_eq!(wire.borrow().outbound, vec![0xE0, 0x00]);
}

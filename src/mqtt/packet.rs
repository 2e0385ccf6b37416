//! MQTT 3.1.1 control-packet codec.
//!
//! Packets are encoded into a caller-provided slice (the session's write
//! buffer) with every write bounds-checked; a packet that does not fit
//! fails with [`Error::EncodeOverflow`] instead of growing or panicking.
//! Decoding works incrementally over the session's read buffer:
//! [`decode`] returns `Ok(None)` while the buffer holds only a partial
//! frame, and [`Error::MalformedPacket`] once a complete frame turns out to
//! violate the framing rules. Packet identifiers are big-endian `u16` on the
//! wire and never zero.

use super::error::Error;

// MQTT Control Packet types - fixed header packet type values
const CONNECT: u8 = 0x10;
const CONNACK: u8 = 0x20;
const PUBLISH: u8 = 0x30;
const PUBACK: u8 = 0x40;
const SUBSCRIBE: u8 = 0x82;
const SUBACK: u8 = 0x90;
const UNSUBSCRIBE: u8 = 0xA2;
const UNSUBACK: u8 = 0xB0;
const PINGREQ: u8 = 0xC0;
const PINGRESP: u8 = 0xD0;
const DISCONNECT: u8 = 0xE0;

// Protocol constants defined by the MQTT 3.1.1 specification
const PROTOCOL_NAME: &[u8] = b"MQTT";
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

/// SUBACK return code signalling a rejected subscription.
pub const SUBACK_FAILURE: u8 = 0x80;

/// Quality of Service levels for MQTT messages.
///
/// QoS 0 messages are fire-and-forget; QoS 1 messages are retransmittable
/// and acknowledged with PUBACK. QoS 2 is not supported.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum QoS {
    /// At most once delivery.
    AtMostOnce = 0,
    /// At least once delivery.
    AtLeastOnce = 1,
}

/// A parsed MQTT control packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Packet<'a> {
    /// Client connection request.
    Connect(Connect<'a>),
    /// Broker connection acknowledgment.
    ConnAck(ConnAck),
    /// Application message, in either direction.
    Publish(Publish<'a>),
    /// QoS 1 publish acknowledgment.
    PubAck {
        /// Identifier of the acknowledged PUBLISH.
        packet_id: u16,
    },
    /// Subscription request.
    Subscribe(Subscribe<'a>),
    /// Subscription acknowledgment.
    SubAck(SubAck),
    /// Unsubscription request.
    Unsubscribe(Unsubscribe<'a>),
    /// Unsubscription acknowledgment.
    UnsubAck {
        /// Identifier of the acknowledged UNSUBSCRIBE.
        packet_id: u16,
    },
    /// Keep-alive probe.
    PingReq,
    /// Keep-alive reply.
    PingResp,
    /// Clean connection teardown.
    Disconnect,
}

/// CONNECT: client identity, session mode and keep-alive.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Connect<'a> {
    /// The client identifier.
    pub client_id: &'a str,
    /// Keep-alive interval in seconds; zero disables keep-alive.
    pub keep_alive: u16,
    /// Whether the broker should discard previous session state.
    pub clean_session: bool,
}

/// CONNACK: broker's verdict on a CONNECT.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ConnAck {
    /// Whether the broker resumed stored session state.
    pub session_present: bool,
    /// Return code; zero is success, 1..=5 are refusal reasons.
    pub return_code: u8,
}

/// PUBLISH: an application message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Publish<'a> {
    /// Topic the message is published to.
    pub topic: &'a str,
    /// Message payload.
    pub payload: &'a [u8],
    /// Delivery guarantee.
    pub qos: QoS,
    /// Broker retain flag.
    pub retain: bool,
    /// Packet identifier; present exactly when `qos` is above zero.
    pub packet_id: Option<u16>,
}

/// SUBSCRIBE: a single topic-filter subscription request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Subscribe<'a> {
    /// Packet identifier.
    pub packet_id: u16,
    /// Requested topic filter.
    pub filter: &'a str,
    /// Maximum QoS the client wants on this filter.
    pub qos: QoS,
}

/// SUBACK: broker's verdict on a SUBSCRIBE.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SubAck {
    /// Packet identifier of the SUBSCRIBE being acknowledged.
    pub packet_id: u16,
    /// Granted QoS, or [`SUBACK_FAILURE`] on rejection.
    pub return_code: u8,
}

/// UNSUBSCRIBE: a single topic-filter removal request.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Unsubscribe<'a> {
    /// Packet identifier.
    pub packet_id: u16,
    /// Topic filter to remove.
    pub filter: &'a str,
}

/// Bounds-checked writer over the session's write buffer.
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_u8(&mut self, value: u8) -> Result<(), Error> {
        if self.pos >= self.buf.len() {
            return Err(Error::EncodeOverflow);
        }
        self.buf[self.pos] = value;
        self.pos += 1;
        Ok(())
    }

    fn put_u16(&mut self, value: u16) -> Result<(), Error> {
        self.put_slice(&value.to_be_bytes())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.pos + bytes.len() > self.buf.len() {
            return Err(Error::EncodeOverflow);
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Length-prefixed UTF-8 string.
    fn put_str(&mut self, value: &str) -> Result<(), Error> {
        if value.len() > u16::MAX as usize {
            return Err(Error::EncodeOverflow);
        }
        self.put_u16(value.len() as u16)?;
        self.put_slice(value.as_bytes())
    }

    /// Variable-byte remaining-length field (one to four bytes).
    fn put_remaining_len(&mut self, mut len: usize) -> Result<(), Error> {
        if len > 0x0FFF_FFFF {
            return Err(Error::EncodeOverflow);
        }
        loop {
            let mut byte = (len % 128) as u8;
            len /= 128;
            if len > 0 {
                byte |= 0x80;
            }
            self.put_u8(byte)?;
            if len == 0 {
                return Ok(());
            }
        }
    }
}

/// Bounds-checked reader over one complete inbound frame.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take_u8(&mut self) -> Result<u8, Error> {
        if self.pos >= self.buf.len() {
            return Err(Error::MalformedPacket);
        }
        let value = self.buf[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn take_u16(&mut self) -> Result<u16, Error> {
        let hi = self.take_u8()?;
        let lo = self.take_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::MalformedPacket);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_str(&mut self) -> Result<&'a str, Error> {
        let len = self.take_u16()? as usize;
        let bytes = self.take_slice(len)?;
        core::str::from_utf8(bytes).map_err(|_| Error::MalformedPacket)
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

impl<'a> Connect<'a> {
    /// Serialize into `buf`, returning the encoded length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let remaining = 2 + PROTOCOL_NAME.len() + 4 + 2 + self.client_id.len();
        let mut w = Writer::new(buf);
        w.put_u8(CONNECT)?;
        w.put_remaining_len(remaining)?;
        w.put_u16(PROTOCOL_NAME.len() as u16)?;
        w.put_slice(PROTOCOL_NAME)?;
        w.put_u8(PROTOCOL_LEVEL)?;
        let mut flags = 0;
        if self.clean_session {
            flags |= 0x02;
        }
        w.put_u8(flags)?;
        w.put_u16(self.keep_alive)?;
        w.put_str(self.client_id)?;
        Ok(w.pos)
    }
}

impl ConnAck {
    /// Serialize into `buf`, returning the encoded length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buf);
        w.put_u8(CONNACK)?;
        w.put_remaining_len(2)?;
        w.put_u8(if self.session_present { 0x01 } else { 0x00 })?;
        w.put_u8(self.return_code)?;
        Ok(w.pos)
    }
}

impl<'a> Publish<'a> {
    /// Serialize into `buf`, returning the encoded length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let id_len = if self.qos == QoS::AtMostOnce { 0 } else { 2 };
        let remaining = 2 + self.topic.len() + id_len + self.payload.len();

        let mut flags = PUBLISH | ((self.qos as u8) << 1);
        if self.retain {
            flags |= 0x01;
        }

        let mut w = Writer::new(buf);
        w.put_u8(flags)?;
        w.put_remaining_len(remaining)?;
        w.put_str(self.topic)?;
        if self.qos != QoS::AtMostOnce {
            match self.packet_id {
                Some(id) => w.put_u16(id)?,
                None => return Err(Error::InvalidParam),
            }
        }
        w.put_slice(self.payload)?;
        Ok(w.pos)
    }
}

impl<'a> Subscribe<'a> {
    /// Serialize into `buf`, returning the encoded length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let remaining = 2 + 2 + self.filter.len() + 1;
        let mut w = Writer::new(buf);
        w.put_u8(SUBSCRIBE)?;
        w.put_remaining_len(remaining)?;
        w.put_u16(self.packet_id)?;
        w.put_str(self.filter)?;
        w.put_u8(self.qos as u8)?;
        Ok(w.pos)
    }
}

impl<'a> Unsubscribe<'a> {
    /// Serialize into `buf`, returning the encoded length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let remaining = 2 + 2 + self.filter.len();
        let mut w = Writer::new(buf);
        w.put_u8(UNSUBSCRIBE)?;
        w.put_remaining_len(remaining)?;
        w.put_u16(self.packet_id)?;
        w.put_str(self.filter)?;
        Ok(w.pos)
    }
}

/// Encode a PUBACK for `packet_id`.
pub fn encode_puback(packet_id: u16, buf: &mut [u8]) -> Result<usize, Error> {
    let mut w = Writer::new(buf);
    w.put_u8(PUBACK)?;
    w.put_remaining_len(2)?;
    w.put_u16(packet_id)?;
    Ok(w.pos)
}

/// Encode a SUBACK for `packet_id` with a single return code.
pub fn encode_suback(packet_id: u16, return_code: u8, buf: &mut [u8]) -> Result<usize, Error> {
    let mut w = Writer::new(buf);
    w.put_u8(SUBACK)?;
    w.put_remaining_len(3)?;
    w.put_u16(packet_id)?;
    w.put_u8(return_code)?;
    Ok(w.pos)
}

/// Encode an UNSUBACK for `packet_id`.
pub fn encode_unsuback(packet_id: u16, buf: &mut [u8]) -> Result<usize, Error> {
    let mut w = Writer::new(buf);
    w.put_u8(UNSUBACK)?;
    w.put_remaining_len(2)?;
    w.put_u16(packet_id)?;
    Ok(w.pos)
}

/// Encode a zero-length packet (PINGREQ, PINGRESP or DISCONNECT).
fn encode_empty(type_byte: u8, buf: &mut [u8]) -> Result<usize, Error> {
    let mut w = Writer::new(buf);
    w.put_u8(type_byte)?;
    w.put_remaining_len(0)?;
    Ok(w.pos)
}

/// Encode a PINGREQ.
pub fn encode_pingreq(buf: &mut [u8]) -> Result<usize, Error> {
    encode_empty(PINGREQ, buf)
}

/// Encode a PINGRESP.
pub fn encode_pingresp(buf: &mut [u8]) -> Result<usize, Error> {
    encode_empty(PINGRESP, buf)
}

/// Encode a DISCONNECT.
pub fn encode_disconnect(buf: &mut [u8]) -> Result<usize, Error> {
    encode_empty(DISCONNECT, buf)
}

/// Parse the fixed header: `Ok(Some((type_byte, remaining_len, header_len)))`
/// once enough bytes are present, `Ok(None)` while the header itself is
/// still incomplete.
fn fixed_header(buf: &[u8]) -> Result<Option<(u8, usize, usize)>, Error> {
    if buf.is_empty() {
        return Ok(None);
    }
    let type_byte = buf[0];
    let mut remaining = 0usize;
    for i in 0..4 {
        let Some(&byte) = buf.get(1 + i) else {
            return Ok(None);
        };
        remaining |= ((byte & 0x7F) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((type_byte, remaining, 2 + i)));
        }
    }
    // Continuation bit set on the fourth length byte.
    Err(Error::MalformedPacket)
}

/// Total frame length of the packet at the head of `buf`, if the fixed
/// header parses. Used to discard a malformed frame and resynchronize.
pub(crate) fn frame_len(buf: &[u8]) -> Option<usize> {
    match fixed_header(buf) {
        Ok(Some((_, remaining, header_len))) => Some(header_len + remaining),
        _ => None,
    }
}

/// Decode the packet at the head of `buf`.
///
/// Returns `Ok(Some((packet, consumed)))` for a complete, valid frame;
/// `Ok(None)` when more bytes are required (not yet an error); and
/// [`Error::MalformedPacket`] for a frame that can never become valid.
pub fn decode(buf: &[u8]) -> Result<Option<(Packet<'_>, usize)>, Error> {
    let Some((type_byte, remaining, header_len)) = fixed_header(buf)? else {
        return Ok(None);
    };
    let total = header_len + remaining;
    if buf.len() < total {
        return Ok(None);
    }

    let flags = type_byte & 0x0F;
    let mut r = Reader::new(&buf[header_len..total]);

    let packet = match type_byte & 0xF0 {
        0x10 => {
            if flags != 0 {
                return Err(Error::MalformedPacket);
            }
            if r.take_u16()? as usize != PROTOCOL_NAME.len()
                || r.take_slice(PROTOCOL_NAME.len())? != PROTOCOL_NAME
                || r.take_u8()? != PROTOCOL_LEVEL
            {
                return Err(Error::MalformedPacket);
            }
            let connect_flags = r.take_u8()?;
            let keep_alive = r.take_u16()?;
            let client_id = r.take_str()?;
            Packet::Connect(Connect {
                client_id,
                keep_alive,
                clean_session: connect_flags & 0x02 != 0,
            })
        }
        0x20 => {
            if flags != 0 || remaining != 2 {
                return Err(Error::MalformedPacket);
            }
            let ack_flags = r.take_u8()?;
            let return_code = r.take_u8()?;
            Packet::ConnAck(ConnAck {
                session_present: ack_flags & 0x01 != 0,
                return_code,
            })
        }
        0x30 => {
            let qos = match (flags >> 1) & 0x03 {
                0 => QoS::AtMostOnce,
                1 => QoS::AtLeastOnce,
                // QoS 2 is not negotiated by this client; a broker sending it
                // is off-contract.
                _ => return Err(Error::MalformedPacket),
            };
            let topic = r.take_str()?;
            let packet_id = if qos != QoS::AtMostOnce {
                let id = r.take_u16()?;
                if id == 0 {
                    return Err(Error::MalformedPacket);
                }
                Some(id)
            } else {
                None
            };
            Packet::Publish(Publish {
                topic,
                payload: r.rest(),
                qos,
                retain: flags & 0x01 != 0,
                packet_id,
            })
        }
        0x40 => {
            if flags != 0 || remaining != 2 {
                return Err(Error::MalformedPacket);
            }
            Packet::PubAck {
                packet_id: r.take_u16()?,
            }
        }
        0x80 => {
            if flags != 0x02 {
                return Err(Error::MalformedPacket);
            }
            let packet_id = r.take_u16()?;
            let filter = r.take_str()?;
            let qos = match r.take_u8()? {
                0 => QoS::AtMostOnce,
                1 => QoS::AtLeastOnce,
                _ => return Err(Error::MalformedPacket),
            };
            if r.remaining() != 0 {
                return Err(Error::MalformedPacket);
            }
            Packet::Subscribe(Subscribe {
                packet_id,
                filter,
                qos,
            })
        }
        0x90 => {
            if flags != 0 || remaining < 3 {
                return Err(Error::MalformedPacket);
            }
            let packet_id = r.take_u16()?;
            let return_code = r.take_u8()?;
            Packet::SubAck(SubAck {
                packet_id,
                return_code,
            })
        }
        0xA0 => {
            if flags != 0x02 {
                return Err(Error::MalformedPacket);
            }
            let packet_id = r.take_u16()?;
            let filter = r.take_str()?;
            if r.remaining() != 0 {
                return Err(Error::MalformedPacket);
            }
            Packet::Unsubscribe(Unsubscribe { packet_id, filter })
        }
        0xB0 => {
            if flags != 0 || remaining != 2 {
                return Err(Error::MalformedPacket);
            }
            Packet::UnsubAck {
                packet_id: r.take_u16()?,
            }
        }
        0xC0 => {
            if flags != 0 || remaining != 0 {
                return Err(Error::MalformedPacket);
            }
            Packet::PingReq
        }
        0xD0 => {
            if flags != 0 || remaining != 0 {
                return Err(Error::MalformedPacket);
            }
            Packet::PingResp
        }
        0xE0 => {
            if flags != 0 || remaining != 0 {
                return Err(Error::MalformedPacket);
            }
            Packet::Disconnect
        }
        _ => return Err(Error::MalformedPacket),
    };

    Ok(Some((packet, total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(encoded_len: usize, buf: &[u8]) -> (Packet<'_>, usize) {
        let (packet, consumed) = decode(&buf[..encoded_len]).unwrap().unwrap();
        assert_eq!(consumed, encoded_len);
        (packet, consumed)
    }

    #[test]
    fn connect_round_trip() {
        let mut buf = [0u8; 128];
        let connect = Connect {
            client_id: "PRD01sensor",
            keep_alive: 120,
            clean_session: true,
        };
        let n = connect.encode(&mut buf).unwrap();
        let (packet, _) = round_trip(n, &buf);
        assert_eq!(packet, Packet::Connect(connect));
    }

    #[test]
    fn publish_qos1_round_trip() {
        let mut buf = [0u8; 128];
        let publish = Publish {
            topic: "devices/PRD01sensor/data",
            payload: b"{\"t\":23.5}",
            qos: QoS::AtLeastOnce,
            retain: false,
            packet_id: Some(0x1234),
        };
        let n = publish.encode(&mut buf).unwrap();
        let (packet, _) = round_trip(n, &buf);
        assert_eq!(packet, Packet::Publish(publish));
    }

    #[test]
    fn publish_qos0_has_no_packet_id() {
        let mut buf = [0u8; 64];
        let publish = Publish {
            topic: "t",
            payload: b"x",
            qos: QoS::AtMostOnce,
            retain: true,
            packet_id: None,
        };
        let n = publish.encode(&mut buf).unwrap();
        match decode(&buf[..n]).unwrap().unwrap().0 {
            Packet::Publish(p) => {
                assert_eq!(p.packet_id, None);
                assert!(p.retain);
            }
            other => panic!("unexpected packet: {other:?}"),
        }
    }

    #[test]
    fn subscribe_and_unsubscribe_round_trip() {
        let mut buf = [0u8; 64];
        let subscribe = Subscribe {
            packet_id: 7,
            filter: "commands/+",
            qos: QoS::AtLeastOnce,
        };
        let n = subscribe.encode(&mut buf).unwrap();
        assert_eq!(round_trip(n, &buf).0, Packet::Subscribe(subscribe));

        let unsubscribe = Unsubscribe {
            packet_id: 8,
            filter: "commands/+",
        };
        let n = unsubscribe.encode(&mut buf).unwrap();
        assert_eq!(round_trip(n, &buf).0, Packet::Unsubscribe(unsubscribe));
    }

    #[test]
    fn acks_and_empty_packets_round_trip() {
        let mut buf = [0u8; 8];

        let n = encode_puback(42, &mut buf).unwrap();
        assert_eq!(round_trip(n, &buf).0, Packet::PubAck { packet_id: 42 });

        let n = encode_suback(43, 1, &mut buf).unwrap();
        assert_eq!(
            round_trip(n, &buf).0,
            Packet::SubAck(SubAck {
                packet_id: 43,
                return_code: 1
            })
        );

        let n = encode_unsuback(44, &mut buf).unwrap();
        assert_eq!(round_trip(n, &buf).0, Packet::UnsubAck { packet_id: 44 });

        let n = encode_pingreq(&mut buf).unwrap();
        assert_eq!(round_trip(n, &buf).0, Packet::PingReq);

        let n = encode_pingresp(&mut buf).unwrap();
        assert_eq!(round_trip(n, &buf).0, Packet::PingResp);

        let n = encode_disconnect(&mut buf).unwrap();
        assert_eq!(round_trip(n, &buf).0, Packet::Disconnect);

        let n = ConnAck {
            session_present: true,
            return_code: 0,
        }
        .encode(&mut buf)
        .unwrap();
        assert_eq!(
            round_trip(n, &buf).0,
            Packet::ConnAck(ConnAck {
                session_present: true,
                return_code: 0
            })
        );
    }

    #[test]
    fn remaining_length_boundaries() {
        // 127-byte remaining length fits in one length byte, 128 needs two.
        let mut buf = [0u8; 256];
        let payload = [0xABu8; 119];
        let publish = Publish {
            topic: "abc",
            payload: &payload[..],
            qos: QoS::AtMostOnce,
            retain: false,
            packet_id: None,
        };
        // remaining = 2 + 3 + 119 = 124 -> single length byte
        let n = publish.encode(&mut buf).unwrap();
        assert_eq!(n, 2 + 124);

        let payload = [0xABu8; 124];
        let publish = Publish {
            topic: "abc",
            payload: &payload[..],
            qos: QoS::AtMostOnce,
            retain: false,
            packet_id: None,
        };
        // remaining = 129 -> two length bytes
        let n = publish.encode(&mut buf).unwrap();
        assert_eq!(n, 3 + 129);
        assert!(decode(&buf[..n]).unwrap().is_some());
    }

    #[test]
    fn incomplete_frames_need_more_bytes() {
        let mut buf = [0u8; 64];
        let publish = Publish {
            topic: "sensors/a",
            payload: b"payload",
            qos: QoS::AtMostOnce,
            retain: false,
            packet_id: None,
        };
        let n = publish.encode(&mut buf).unwrap();
        for cut in 0..n {
            assert_eq!(decode(&buf[..cut]).unwrap(), None, "cut at {cut}");
        }
    }

    #[test]
    fn malformed_frames_are_rejected() {
        // Unknown packet type.
        assert_eq!(decode(&[0x00, 0x00]), Err(Error::MalformedPacket));
        // Five-byte remaining length.
        assert_eq!(
            decode(&[0x30, 0x80, 0x80, 0x80, 0x80, 0x01]),
            Err(Error::MalformedPacket)
        );
        // PUBLISH claiming QoS 2.
        assert_eq!(
            decode(&[0x34, 0x05, 0x00, 0x01, b't', 0x00, 0x01]),
            Err(Error::MalformedPacket)
        );
        // CONNACK with the wrong remaining length.
        assert_eq!(decode(&[0x20, 0x03, 0, 0, 0]), Err(Error::MalformedPacket));
        // PUBLISH with a topic length overrunning the frame.
        assert_eq!(decode(&[0x30, 0x02, 0x00, 0x09]), Err(Error::MalformedPacket));
        // Non-UTF-8 topic.
        assert_eq!(
            decode(&[0x30, 0x04, 0x00, 0x02, 0xFF, 0xFE]),
            Err(Error::MalformedPacket)
        );
    }

    #[test]
    fn encode_overflow_is_reported() {
        let mut buf = [0u8; 16];
        let publish = Publish {
            topic: "some/topic",
            payload: &[0u8; 64],
            qos: QoS::AtMostOnce,
            retain: false,
            packet_id: None,
        };
        assert_eq!(publish.encode(&mut buf), Err(Error::EncodeOverflow));
    }

    #[test]
    fn qos1_publish_without_id_is_invalid() {
        let mut buf = [0u8; 32];
        let publish = Publish {
            topic: "t",
            payload: b"",
            qos: QoS::AtLeastOnce,
            retain: false,
            packet_id: None,
        };
        assert_eq!(publish.encode(&mut buf), Err(Error::InvalidParam));
    }
}

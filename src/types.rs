//! Wire-level record types shared by the reader and writer.

use core::fmt;

use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::buffer::Buf;

/// The content type byte leading every record.
///
/// Unknown values are carried through so the layer above decides how to
/// treat them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// change_cipher_spec (20)
    ChangeCipherSpec,
    /// alert (21)
    Alert,
    /// handshake (22)
    Handshake,
    /// application_data (23)
    ApplicationData,
    /// heartbeat (24)
    Heartbeat,
    /// Any other value, passed through opaquely.
    Unknown(u8),
}

impl ContentType {
    /// Map a wire byte to a content type.
    pub fn from_u8(value: u8) -> Self {
        match value {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            24 => ContentType::Heartbeat,
            _ => ContentType::Unknown(value),
        }
    }

    /// The wire byte for this content type.
    pub fn as_u8(&self) -> u8 {
        match self {
            ContentType::ChangeCipherSpec => 20,
            ContentType::Alert => 21,
            ContentType::Handshake => 22,
            ContentType::ApplicationData => 23,
            ContentType::Heartbeat => 24,
            ContentType::Unknown(value) => *value,
        }
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], ContentType> {
        let (input, byte) = be_u8(input)?;
        Ok((input, Self::from_u8(byte)))
    }
}

/// A protocol version as it appears on the wire.
///
/// The record layer carries the version opaquely; the only judgement it
/// makes is [`is_datagram`][ProtocolVersion::is_datagram], which separates
/// the TLS and DTLS framing rules. Version acceptance policy belongs to
/// the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    major: u8,
    minor: u8,
}

impl ProtocolVersion {
    /// TLS 1.0 (3, 1)
    pub const TLS_V10: ProtocolVersion = ProtocolVersion { major: 3, minor: 1 };
    /// TLS 1.1 (3, 2)
    pub const TLS_V11: ProtocolVersion = ProtocolVersion { major: 3, minor: 2 };
    /// TLS 1.2 (3, 3)
    pub const TLS_V12: ProtocolVersion = ProtocolVersion { major: 3, minor: 3 };
    /// DTLS 1.0 (254, 255). DTLS uses the inverted-minor convention.
    pub const DTLS_V10: ProtocolVersion = ProtocolVersion { major: 254, minor: 255 };
    /// DTLS 1.2 (254, 253)
    pub const DTLS_V12: ProtocolVersion = ProtocolVersion { major: 254, minor: 253 };

    /// Construct from raw major/minor bytes.
    pub fn new(major: u8, minor: u8) -> Self {
        ProtocolVersion { major, minor }
    }

    /// The major version byte.
    pub fn major(&self) -> u8 {
        self.major
    }

    /// The minor version byte.
    pub fn minor(&self) -> u8 {
        self.minor
    }

    /// True exactly when this is a DTLS version.
    pub fn is_datagram(&self) -> bool {
        self.major == 254
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, value) = be_u16(input)?;
        let version = ProtocolVersion {
            major: (value >> 8) as u8,
            minor: value as u8,
        };
        Ok((input, version))
    }

    pub(crate) fn serialize(&self, out: &mut Buf) {
        out.push(self.major);
        out.push(self.minor);
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.major, self.minor) {
            (3, 1) => write!(f, "TLS 1.0"),
            (3, 2) => write!(f, "TLS 1.1"),
            (3, 3) => write!(f, "TLS 1.2"),
            (254, 255) => write!(f, "DTLS 1.0"),
            (254, 253) => write!(f, "DTLS 1.2"),
            (major, minor) => write!(f, "version {}.{}", major, minor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_byte_mapping() {
        for value in [20u8, 21, 22, 23, 24, 0, 99, 255] {
            assert_eq!(ContentType::from_u8(value).as_u8(), value);
        }
        assert_eq!(ContentType::from_u8(22), ContentType::Handshake);
        assert_eq!(ContentType::from_u8(25), ContentType::Unknown(25));
    }

    #[test]
    fn datagram_predicate() {
        assert!(ProtocolVersion::DTLS_V10.is_datagram());
        assert!(ProtocolVersion::DTLS_V12.is_datagram());
        assert!(!ProtocolVersion::TLS_V10.is_datagram());
        assert!(!ProtocolVersion::TLS_V12.is_datagram());
        // Unknown versions still classify by major byte only.
        assert!(ProtocolVersion::new(254, 7).is_datagram());
        assert!(!ProtocolVersion::new(3, 9).is_datagram());
    }

    #[test]
    fn parse_serialize_roundtrip() {
        let mut out = Buf::new();
        ProtocolVersion::DTLS_V12.serialize(&mut out);
        assert_eq!(&out[..], &[0xFE, 0xFD]);

        let (rest, version) = ProtocolVersion::parse(&out).unwrap();
        assert!(rest.is_empty());
        assert_eq!(version, ProtocolVersion::DTLS_V12);
    }
}

//! recl — TLS/DTLS 1.2 record layer (Sans-IO)
//!
//! recl implements the record layer of TLS 1.0–1.2 and DTLS 1.0/1.2: the
//! subsystem that frames, encrypts, decrypts and authenticates the byte
//! stream two peers exchange. Everything above it (handshake, certificate
//! policy, alert dispatch, key derivation) and everything below it
//! (sockets, timers) is the embedding application's business. You feed
//! bytes from your transport in and poll decoded records out.
//!
//! # Goals
//! - **The record layer only**: framing, AEAD protection, per-direction
//!   sequence discipline, DTLS replay defense, epoch-scoped cipher states.
//! - **Safety**: `forbid(unsafe_code)`; every buffer that can hold
//!   plaintext or key material is zeroized on drop.
//! - **Minimal Rust-only deps**: small, well-maintained parsing and crypto
//!   crates.
//!
//! ## Non-goals
//! - **TLS 1.3 / QUIC** record formats
//! - **The handshake state machine** (it hands finished [`CipherState`]s
//!   to this crate at key-change time)
//! - **Transport I/O** (the crate never touches a socket)
//!
//! # Integration model
//!
//! Writing: [`write_record`] encodes one record into a caller-provided
//! buffer, encrypting it when a [`CipherState`] is supplied.
//!
//! Reading: a [`RecordReader`] is fed transport bytes through a
//! [`RawInput`] cursor and yields a [`ReadOutcome`] per call: a decoded
//! [`Record`], a request for more bytes (stream mode), or a silent discard
//! (datagram mode, where malformed or replayed input must not tear the
//! connection down).
//!
//! ```rust
//! use recl::{write_record, ContentType, ProtocolVersion, RecordReader};
//! use recl::{Buf, NoCipherStates, RawInput, ReadOutcome};
//! use rand::rngs::OsRng;
//!
//! # fn main() -> Result<(), recl::Error> {
//! // Initial handshake records travel unencrypted (no cipher state).
//! let mut wire = Buf::new();
//! write_record(&mut wire, ContentType::Handshake, &[1, 2, 3, 4],
//!              ProtocolVersion::TLS_V12, 0, None, &mut OsRng)?;
//!
//! let mut reader = RecordReader::new();
//! let mut input = RawInput::stream(&wire);
//! match reader.read_record(&mut input, None, &NoCipherStates)? {
//!     ReadOutcome::Record(rec) => assert_eq!(&rec.data[..], &[1, 2, 3, 4]),
//!     _ => unreachable!("a whole record was supplied"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### MSRV
//! Rust 1.81.0

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::len_without_is_empty)]
#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod aead;
pub use aead::{Aead, AesGcm, ChaCha20Poly1305, AEAD_NONCE_LEN, TAG_LEN};

pub mod buffer;
pub use buffer::Buf;

mod cipher;
pub use cipher::{format_ad, CipherState, CipherStateLookup, NoCipherStates};
pub use cipher::{Nonce, NonceFormat, MAX_NONCE_LEN};

mod error;
pub use error::{AlertDescription, Error};

mod reader;
pub use reader::{RawInput, ReadOutcome, Record, RecordReader};

mod rng;
pub use rng::RandomSource;

mod seq;
pub use seq::{DatagramSequences, SequenceNumbers, StreamSequences};

mod types;
pub use types::{ContentType, ProtocolVersion};

mod util;

mod writer;
pub use writer::write_record;

/// Number of bytes in a TLS record header.
pub const TLS_HEADER_SIZE: usize = 5;

/// Number of bytes in a DTLS record header.
pub const DTLS_HEADER_SIZE: usize = 13;

/// Largest plaintext fragment the protocol permits in one record.
pub const MAX_PLAINTEXT_SIZE: usize = 16 * 1024;

/// Largest record body we accept on the wire.
///
/// Plaintext limit plus the worst-case expansion for compression, MAC,
/// padding and explicit nonces.
pub const MAX_CIPHERTEXT_SIZE: usize = 16 * 1024 + 2048;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_constants() {
        assert_eq!(TLS_HEADER_SIZE, 5);
        assert_eq!(DTLS_HEADER_SIZE, 13);
        assert_eq!(MAX_CIPHERTEXT_SIZE, 18432);
        assert!(MAX_PLAINTEXT_SIZE < MAX_CIPHERTEXT_SIZE);
    }

    #[test]
    fn reader_is_send() {
        fn is_send<T: Send>(_t: T) {}
        is_send(RecordReader::new());
        is_send(StreamSequences::new());
        is_send(DatagramSequences::new());
    }
}

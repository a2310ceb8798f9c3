//! Epoch-scoped cipher state: nonce derivation and associated data.

use std::collections::BTreeMap;

use arrayvec::ArrayVec;

use crate::aead::{Aead, AEAD_NONCE_LEN};
use crate::buffer::Buf;
use crate::rng::RandomSource;
use crate::types::{ContentType, ProtocolVersion};
use crate::Error;

/// Largest nonce the record layer produces (a CBC block IV).
pub const MAX_NONCE_LEN: usize = 16;

/// A derived per-record nonce: 12 bytes for AEAD, up to a block for CBC.
pub type Nonce = ArrayVec<u8, MAX_NONCE_LEN>;

/// How the per-record nonce is constructed for a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceFormat {
    /// Legacy CBC+HMAC: a random explicit IV per record. The handshake IV
    /// is spent on the very first record (TLS 1.0 implicit-IV compat).
    CbcMode,
    /// 12 implicit bytes XORed with the zero-padded sequence number
    /// (ChaCha20-Poly1305 and newer GCM layouts).
    AeadXor12,
    /// 4 implicit bytes followed by 8 explicit bytes carried in the
    /// record (classic GCM, CCM).
    AeadImplicit4,
}

/// Key material and nonce policy for one direction within one epoch.
///
/// Built by the handshake at key-change time from the negotiated suite's
/// nonce format, the handshake-derived implicit nonce, and a keyed
/// [`Aead`] engine. The nonce length relations are checked here once so
/// the reader and writer can rely on them unconditionally.
pub struct CipherState {
    format: NonceFormat,
    implicit_nonce: Buf,
    record_nonce_len: usize,
    aead: Box<dyn Aead>,
}

impl CipherState {
    /// Build a cipher state from handshake-derived material.
    ///
    /// `record_nonce_len` is the number of nonce bytes carried in each
    /// record. For the AEAD formats `implicit_nonce.len() +
    /// record_nonce_len` must equal 12; for CBC the explicit IV is one
    /// cipher block (or absent in the TLS 1.0 layout).
    pub fn new(
        format: NonceFormat,
        implicit_nonce: &[u8],
        record_nonce_len: usize,
        aead: Box<dyn Aead>,
    ) -> Result<CipherState, Error> {
        match format {
            NonceFormat::AeadXor12 => {
                if implicit_nonce.len() != AEAD_NONCE_LEN || record_nonce_len != 0 {
                    return Err(Error::Internal(
                        "XOR nonces take all 12 bytes from the handshake",
                    ));
                }
            }
            NonceFormat::AeadImplicit4 => {
                if implicit_nonce.len() != 4 || record_nonce_len != AEAD_NONCE_LEN - 4 {
                    return Err(Error::Internal(
                        "implicit-4 nonces take 4 handshake and 8 record bytes",
                    ));
                }
            }
            NonceFormat::CbcMode => {
                if implicit_nonce.len() > MAX_NONCE_LEN || record_nonce_len > MAX_NONCE_LEN {
                    return Err(Error::Internal("CBC IV exceeds the largest block size"));
                }
            }
        }

        let mut implicit = Buf::new();
        implicit.extend_from_slice(implicit_nonce);

        Ok(CipherState {
            format,
            implicit_nonce: implicit,
            record_nonce_len,
            aead,
        })
    }

    /// The nonce construction this state uses.
    pub fn nonce_format(&self) -> NonceFormat {
        self.format
    }

    /// Number of nonce bytes carried in each record.
    pub fn record_nonce_len(&self) -> usize {
        self.record_nonce_len
    }

    /// The keyed engine for this direction.
    pub fn aead(&self) -> &dyn Aead {
        &*self.aead
    }

    /// Derive the nonce for an outbound record.
    ///
    /// `rng` is drawn from only for explicit CBC IVs.
    pub fn write_nonce(&mut self, seq: u64, rng: &mut dyn RandomSource) -> Nonce {
        match self.format {
            NonceFormat::CbcMode => {
                if !self.implicit_nonce.is_empty() {
                    // The handshake-provided IV, spent here and never again.
                    let mut nonce = Nonce::new();
                    nonce.try_extend_from_slice(&self.implicit_nonce).unwrap();
                    self.implicit_nonce.wipe();
                    nonce
                } else {
                    let mut nonce = Nonce::new();
                    for _ in 0..self.record_nonce_len {
                        nonce.push(0);
                    }
                    rng.randomize(&mut nonce);
                    nonce
                }
            }
            NonceFormat::AeadXor12 => xor12(&self.implicit_nonce, seq),
            NonceFormat::AeadImplicit4 => {
                let mut nonce = Nonce::new();
                nonce.try_extend_from_slice(&self.implicit_nonce).unwrap();
                nonce.try_extend_from_slice(&seq.to_be_bytes()).unwrap();
                nonce
            }
        }
    }

    /// Derive the nonce for an inbound record body.
    ///
    /// Fails with a decode error when the record is shorter than its
    /// explicit nonce portion.
    pub fn read_nonce(&self, record: &[u8], seq: u64) -> Result<Nonce, Error> {
        match self.format {
            NonceFormat::CbcMode => {
                if record.len() < self.record_nonce_len {
                    return Err(Error::Decode("record too short for a CBC IV"));
                }
                let mut nonce = Nonce::new();
                nonce
                    .try_extend_from_slice(&record[..self.record_nonce_len])
                    .unwrap();
                Ok(nonce)
            }
            NonceFormat::AeadXor12 => Ok(xor12(&self.implicit_nonce, seq)),
            NonceFormat::AeadImplicit4 => {
                if record.len() < self.record_nonce_len {
                    return Err(Error::Decode("record too short for an explicit nonce"));
                }
                let mut nonce = Nonce::new();
                nonce.try_extend_from_slice(&self.implicit_nonce).unwrap();
                nonce
                    .try_extend_from_slice(&record[..self.record_nonce_len])
                    .unwrap();
                Ok(nonce)
            }
        }
    }
}

// Lengths are enforced by CipherState::new, so the ArrayVec unwraps above
// and below cannot fail.
fn xor12(implicit: &[u8], seq: u64) -> Nonce {
    let mut nonce = Nonce::new();
    nonce.try_extend_from_slice(&[0; 4]).unwrap();
    nonce.try_extend_from_slice(&seq.to_be_bytes()).unwrap();
    for (n, i) in nonce.iter_mut().zip(implicit) {
        *n ^= i;
    }
    nonce
}

/// The 13-byte associated-data block bound into every protected record:
/// `seq(8) || type(1) || version(2) || plaintext_len(2)`.
///
/// In DTLS the 64-bit `seq` already carries the epoch in its high 16
/// bits, so the same layout serves both protocols.
pub fn format_ad(
    seq: u64,
    content_type: ContentType,
    version: ProtocolVersion,
    plaintext_len: u16,
) -> [u8; 13] {
    let mut ad = [0u8; 13];
    ad[..8].copy_from_slice(&seq.to_be_bytes());
    ad[8] = content_type.as_u8();
    ad[9] = version.major();
    ad[10] = version.minor();
    ad[11..].copy_from_slice(&plaintext_len.to_be_bytes());
    ad
}

/// Resolves the cipher state for a read epoch.
///
/// The handshake layer owns the epoch-to-keys mapping and must keep old
/// states alive until in-flight records for that epoch have drained; the
/// reader only borrows through this trait. Epoch 0 is never looked up.
pub trait CipherStateLookup {
    /// The cipher state for `epoch`, if one has been installed.
    fn cipher_state(&self, epoch: u16) -> Option<&CipherState>;
}

impl CipherStateLookup for BTreeMap<u16, CipherState> {
    fn cipher_state(&self, epoch: u16) -> Option<&CipherState> {
        self.get(&epoch)
    }
}

/// Lookup for the initial plaintext exchange, before any keys exist.
pub struct NoCipherStates;

impl CipherStateLookup for NoCipherStates {
    fn cipher_state(&self, _epoch: u16) -> Option<&CipherState> {
        None
    }
}

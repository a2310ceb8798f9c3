//! AEAD engines for record protection.
//!
//! The reader and writer drive an engine through length queries plus
//! in-place sealing/opening at a byte offset into the record buffer, so no
//! intermediate plaintext copies are made. The crate ships the engines
//! TLS 1.2 AEAD suites use; a legacy CBC+HMAC composite is an external
//! primitive but fits the same trait.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};

use crate::buffer::{Buf, Tail};
use crate::Error;

/// Length of the GCM/Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

/// Length of the full per-record AEAD nonce.
pub const AEAD_NONCE_LEN: usize = 12;

/// One direction's authenticated encryption engine.
///
/// Implementations are keyed at construction time. Sealing appends the
/// authentication tag in place; opening verifies and removes it. Every
/// integrity failure surfaces as the single [`Error::BadRecordMac`] kind.
pub trait Aead: Send {
    /// Ciphertext length produced by sealing `plaintext_len` bytes.
    fn ciphertext_len(&self, plaintext_len: usize) -> usize;

    /// Plaintext length recovered by opening `ciphertext_len` bytes.
    ///
    /// Callers must check [`min_ciphertext_len`][Aead::min_ciphertext_len]
    /// first.
    fn plaintext_len(&self, ciphertext_len: usize) -> usize;

    /// The smallest ciphertext this engine can produce (the bare tag).
    fn min_ciphertext_len(&self) -> usize;

    /// Encrypt `buf[offset..]` in place, appending the tag.
    fn seal_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        buf: &mut Buf,
        offset: usize,
    ) -> Result<(), Error>;

    /// Decrypt `buf[offset..]` in place, verifying and removing the tag.
    fn open_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        buf: &mut Buf,
        offset: usize,
    ) -> Result<(), Error>;
}

fn check_nonce_len(nonce: &[u8]) -> Result<(), Error> {
    if nonce.len() != AEAD_NONCE_LEN {
        return Err(Error::Internal("AEAD nonce must be 12 bytes"));
    }
    Ok(())
}

/// AES-GCM in the two key sizes TLS 1.2 cipher suites use.
pub enum AesGcm {
    /// AES-128-GCM
    Aes128(Aes128Gcm),
    /// AES-256-GCM
    Aes256(Aes256Gcm),
}

impl AesGcm {
    /// Create an engine from a 16 or 32 byte key.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        match key.len() {
            16 => {
                let cipher = Aes128Gcm::new_from_slice(key)
                    .map_err(|_| Error::Internal("AES-128-GCM rejected its key"))?;
                Ok(AesGcm::Aes128(cipher))
            }
            32 => {
                let cipher = Aes256Gcm::new_from_slice(key)
                    .map_err(|_| Error::Internal("AES-256-GCM rejected its key"))?;
                Ok(AesGcm::Aes256(cipher))
            }
            _ => Err(Error::Internal("AES-GCM keys are 16 or 32 bytes")),
        }
    }
}

impl Aead for AesGcm {
    fn ciphertext_len(&self, plaintext_len: usize) -> usize {
        plaintext_len + TAG_LEN
    }

    fn plaintext_len(&self, ciphertext_len: usize) -> usize {
        ciphertext_len.saturating_sub(TAG_LEN)
    }

    fn min_ciphertext_len(&self) -> usize {
        TAG_LEN
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        buf: &mut Buf,
        offset: usize,
    ) -> Result<(), Error> {
        check_nonce_len(nonce)?;
        let mut tail = Tail::new(buf, offset);
        let nonce = aes_gcm::Nonce::from_slice(nonce);

        match self {
            AesGcm::Aes128(cipher) => cipher.encrypt_in_place(nonce, ad, &mut tail),
            AesGcm::Aes256(cipher) => cipher.encrypt_in_place(nonce, ad, &mut tail),
        }
        .map_err(|_| Error::Internal("AES-GCM sealing failed"))
    }

    fn open_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        buf: &mut Buf,
        offset: usize,
    ) -> Result<(), Error> {
        check_nonce_len(nonce)?;
        let mut tail = Tail::new(buf, offset);
        let nonce = aes_gcm::Nonce::from_slice(nonce);

        match self {
            AesGcm::Aes128(cipher) => cipher.decrypt_in_place(nonce, ad, &mut tail),
            AesGcm::Aes256(cipher) => cipher.decrypt_in_place(nonce, ad, &mut tail),
        }
        .map_err(|_| Error::BadRecordMac)
    }
}

/// ChaCha20-Poly1305.
pub struct ChaCha20Poly1305 {
    inner: chacha20poly1305::ChaCha20Poly1305,
}

impl ChaCha20Poly1305 {
    /// Create an engine from a 32 byte key.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let inner = chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| Error::Internal("ChaCha20-Poly1305 keys are 32 bytes"))?;
        Ok(ChaCha20Poly1305 { inner })
    }
}

impl Aead for ChaCha20Poly1305 {
    fn ciphertext_len(&self, plaintext_len: usize) -> usize {
        plaintext_len + TAG_LEN
    }

    fn plaintext_len(&self, ciphertext_len: usize) -> usize {
        ciphertext_len.saturating_sub(TAG_LEN)
    }

    fn min_ciphertext_len(&self) -> usize {
        TAG_LEN
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        buf: &mut Buf,
        offset: usize,
    ) -> Result<(), Error> {
        check_nonce_len(nonce)?;
        let mut tail = Tail::new(buf, offset);
        let nonce = chacha20poly1305::Nonce::from_slice(nonce);

        self.inner
            .encrypt_in_place(nonce, ad, &mut tail)
            .map_err(|_| Error::Internal("ChaCha20-Poly1305 sealing failed"))
    }

    fn open_in_place(
        &self,
        nonce: &[u8],
        ad: &[u8],
        buf: &mut Buf,
        offset: usize,
    ) -> Result<(), Error> {
        check_nonce_len(nonce)?;
        let mut tail = Tail::new(buf, offset);
        let nonce = chacha20poly1305::Nonce::from_slice(nonce);

        self.inner
            .decrypt_in_place(nonce, ad, &mut tail)
            .map_err(|_| Error::BadRecordMac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONCE: [u8; 12] = [9; 12];
    const AD: [u8; 13] = [1; 13];

    fn roundtrip(engine: &dyn Aead) {
        let mut buf = Buf::new();
        buf.extend_from_slice(b"header");
        buf.extend_from_slice(b"attack at dawn");

        engine.seal_in_place(&NONCE, &AD, &mut buf, 6).unwrap();
        assert_eq!(&buf[..6], b"header");
        assert_eq!(buf.len(), 6 + engine.ciphertext_len(14));
        assert_ne!(&buf[6..20], b"attack at dawn");

        engine.open_in_place(&NONCE, &AD, &mut buf, 6).unwrap();
        assert_eq!(&buf[..], b"headerattack at dawn");
    }

    #[test]
    fn aes_gcm_roundtrip_both_key_sizes() {
        roundtrip(&AesGcm::new(&[0x11; 16]).unwrap());
        roundtrip(&AesGcm::new(&[0x22; 32]).unwrap());
    }

    #[test]
    fn chacha20_poly1305_roundtrip() {
        roundtrip(&ChaCha20Poly1305::new(&[0x33; 32]).unwrap());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let engine = AesGcm::new(&[0x11; 16]).unwrap();
        let mut buf = Buf::new();
        buf.extend_from_slice(b"attack at dawn");
        engine.seal_in_place(&NONCE, &AD, &mut buf, 0).unwrap();

        buf[0] ^= 0x80;
        let err = engine.open_in_place(&NONCE, &AD, &mut buf, 0).unwrap_err();
        assert_eq!(err, Error::BadRecordMac);
    }

    #[test]
    fn wrong_ad_is_rejected() {
        let engine = AesGcm::new(&[0x11; 16]).unwrap();
        let mut buf = Buf::new();
        buf.extend_from_slice(b"attack at dawn");
        engine.seal_in_place(&NONCE, &AD, &mut buf, 0).unwrap();

        let err = engine
            .open_in_place(&NONCE, &[2; 13], &mut buf, 0)
            .unwrap_err();
        assert_eq!(err, Error::BadRecordMac);
    }

    #[test]
    fn length_helpers() {
        let engine = AesGcm::new(&[0x11; 16]).unwrap();
        assert_eq!(engine.ciphertext_len(0), TAG_LEN);
        assert_eq!(engine.ciphertext_len(100), 100 + TAG_LEN);
        assert_eq!(engine.plaintext_len(TAG_LEN), 0);
        assert_eq!(engine.plaintext_len(100 + TAG_LEN), 100);
        assert_eq!(engine.min_ciphertext_len(), TAG_LEN);
    }

    #[test]
    fn bad_key_and_nonce_lengths() {
        assert!(AesGcm::new(&[0; 15]).is_err());
        assert!(ChaCha20Poly1305::new(&[0; 16]).is_err());

        let engine = AesGcm::new(&[0x11; 16]).unwrap();
        let mut buf = Buf::new();
        buf.extend_from_slice(b"x");
        let err = engine.seal_in_place(&[0; 8], &AD, &mut buf, 0).unwrap_err();
        assert_eq!(err, Error::Internal("AEAD nonce must be 12 bytes"));
    }
}

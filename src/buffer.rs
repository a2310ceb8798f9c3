//! Byte buffers that scrub themselves.
//!
//! Record plaintext and handshake-derived nonce material pass through these
//! buffers, so their contents are zeroized when they are dropped.

use std::fmt;
use std::ops::{Deref, DerefMut};

use aes_gcm::aead;
use zeroize::Zeroize;

/// A growable byte buffer whose contents are zeroized on drop.
#[derive(Default)]
pub struct Buf(Vec<u8>);

impl Buf {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all contents. The underlying allocation is kept.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Append the given bytes.
    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.0.extend_from_slice(other);
    }

    /// Append a single byte.
    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    /// Shorten the buffer to `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Zeroize the contents, then clear.
    pub fn wipe(&mut self) {
        self.0.zeroize();
        self.0.clear();
    }
}

impl Drop for Buf {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Deref for Buf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Buf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for Buf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Buf {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl fmt::Debug for Buf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buf").field("len", &self.0.len()).finish()
    }
}

/// Mutable view of the tail of a [`Buf`], starting at a fixed offset.
///
/// Lets an AEAD engine run in place over a record body while the header
/// bytes in front of it stay untouched. Appended tag bytes land in the
/// underlying buffer.
pub(crate) struct Tail<'a> {
    buf: &'a mut Buf,
    start: usize,
}

impl<'a> Tail<'a> {
    pub(crate) fn new(buf: &'a mut Buf, start: usize) -> Tail<'a> {
        debug_assert!(start <= buf.len());
        Tail { buf, start }
    }
}

impl AsRef<[u8]> for Tail<'_> {
    fn as_ref(&self) -> &[u8] {
        &self.buf[self.start..]
    }
}

impl AsMut<[u8]> for Tail<'_> {
    fn as_mut(&mut self) -> &mut [u8] {
        let start = self.start;
        &mut self.buf[start..]
    }
}

impl aead::Buffer for Tail<'_> {
    fn extend_from_slice(&mut self, other: &[u8]) -> aead::Result<()> {
        self.buf.extend_from_slice(other);
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        self.buf.truncate(self.start + len);
    }
}

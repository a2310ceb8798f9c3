//! Record encoding and encryption.

use crate::buffer::Buf;
use crate::cipher::{format_ad, CipherState, NonceFormat};
use crate::rng::RandomSource;
use crate::types::{ContentType, ProtocolVersion};
use crate::{Error, MAX_CIPHERTEXT_SIZE};

/// Encode one record into `output`, encrypting when a cipher state is
/// supplied.
///
/// `output` is cleared first. `seq` is the record sequence number; for a
/// DTLS `version` it carries the epoch in its high 16 bits and is written
/// into the header. `rng` is drawn from only for explicit CBC IVs.
///
/// Well-formed input cannot fail; every error out of here is an internal
/// invariant violation, never something a peer can trigger.
pub fn write_record(
    output: &mut Buf,
    content_type: ContentType,
    payload: &[u8],
    version: ProtocolVersion,
    seq: u64,
    cipher_state: Option<&mut CipherState>,
    rng: &mut dyn RandomSource,
) -> Result<(), Error> {
    output.clear();
    output.push(content_type.as_u8());
    version.serialize(output);

    if version.is_datagram() {
        output.extend_from_slice(&seq.to_be_bytes());
    }

    let Some(cs) = cipher_state else {
        // Initial unencrypted records.
        push_u16_len(output, payload.len())?;
        output.extend_from_slice(payload);
        return Ok(());
    };

    let plaintext_len = u16::try_from(payload.len())
        .map_err(|_| Error::Internal("plaintext exceeds the record length field"))?;
    let ad = format_ad(seq, content_type, version, plaintext_len);

    let record_len = cs.aead().ciphertext_len(payload.len()) + cs.record_nonce_len();
    push_u16_len(output, record_len)?;

    let nonce = cs.write_nonce(seq, rng);

    if cs.record_nonce_len() > 0 {
        match cs.nonce_format() {
            // CBC sends the whole IV; AEAD sends the portion after the
            // implicit prefix.
            NonceFormat::CbcMode => output.extend_from_slice(&nonce),
            _ => output.extend_from_slice(&nonce[nonce.len() - cs.record_nonce_len()..]),
        }
    }

    let body_offset = output.len();
    output.extend_from_slice(payload);
    cs.aead().seal_in_place(&nonce, &ad, output, body_offset)?;

    if output.len() >= MAX_CIPHERTEXT_SIZE {
        return Err(Error::Internal("produced a record larger than the protocol allows"));
    }

    Ok(())
}

fn push_u16_len(output: &mut Buf, len: usize) -> Result<(), Error> {
    let len16 =
        u16::try_from(len).map_err(|_| Error::Internal("record length field overflow"))?;
    output.extend_from_slice(&len16.to_be_bytes());
    Ok(())
}

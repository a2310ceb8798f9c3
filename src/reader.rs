//! Incremental record reading: transport bytes in, plaintext records out.

use nom::number::complete::be_u16;
use nom::IResult;

use crate::buffer::Buf;
use crate::cipher::{format_ad, CipherState, CipherStateLookup};
use crate::seq::SequenceNumbers;
use crate::types::{ContentType, ProtocolVersion};
use crate::util::be_u48;
use crate::{Error, DTLS_HEADER_SIZE, MAX_CIPHERTEXT_SIZE, TLS_HEADER_SIZE};

/// A decoded record, ready for the layer above.
#[derive(Debug)]
pub struct Record {
    /// Declared content type. Unknown values pass through; policing them
    /// is the upper layer's job.
    pub content_type: ContentType,
    /// Protocol version from the record header, carried opaquely.
    pub version: ProtocolVersion,
    /// The 64-bit record sequence. In DTLS the high 16 bits are the epoch.
    pub sequence: u64,
    /// Decrypted payload. Zeroized on drop.
    pub data: Buf,
}

/// Result of one [`RecordReader::read_record`] call.
#[derive(Debug)]
pub enum ReadOutcome {
    /// At least this many more input bytes are needed (stream mode only).
    NeedMore(usize),
    /// One complete record was decoded.
    Record(Record),
    /// The datagram was silently discarded (datagram mode only).
    Discarded,
}

/// Cursor over bytes received from the transport.
///
/// Stream inputs may carry partial records across calls; a datagram input
/// wraps exactly one received datagram, which may hold several records.
pub struct RawInput<'a> {
    data: &'a [u8],
    consumed: usize,
    datagram: bool,
}

impl<'a> RawInput<'a> {
    /// Wrap bytes read from a stream transport (TLS).
    pub fn stream(data: &'a [u8]) -> RawInput<'a> {
        RawInput {
            data,
            consumed: 0,
            datagram: false,
        }
    }

    /// Wrap one received datagram (DTLS).
    pub fn datagram(data: &'a [u8]) -> RawInput<'a> {
        RawInput {
            data,
            consumed: 0,
            datagram: true,
        }
    }

    /// The unconsumed bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[self.consumed..]
    }

    /// Number of unconsumed bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.consumed
    }

    /// Mark `n` bytes as consumed.
    pub fn advance(&mut self, n: usize) {
        self.consumed = (self.consumed + n).min(self.data.len());
    }

    /// Total bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Whether this input is datagram-oriented.
    pub fn is_datagram(&self) -> bool {
        self.datagram
    }
}

/// Header fields shared by both framings. For streams `sequence` is zero;
/// the counter is supplied by [`SequenceNumbers`] instead.
#[derive(Clone, Copy)]
struct RecordHeader {
    content_type: ContentType,
    version: ProtocolVersion,
    sequence: u64,
    body_len: usize,
}

fn parse_stream_header(input: &[u8]) -> IResult<&[u8], RecordHeader> {
    let (input, content_type) = ContentType::parse(input)?;
    let (input, version) = ProtocolVersion::parse(input)?;
    let (input, body_len) = be_u16(input)?;
    Ok((
        input,
        RecordHeader {
            content_type,
            version,
            sequence: 0,
            body_len: body_len as usize,
        },
    ))
}

fn parse_datagram_header(input: &[u8]) -> IResult<&[u8], RecordHeader> {
    let (input, content_type) = ContentType::parse(input)?;
    let (input, version) = ProtocolVersion::parse(input)?;
    let (input, epoch) = be_u16(input)?;
    let (input, seq48) = be_u48(input)?;
    let (input, body_len) = be_u16(input)?;
    Ok((
        input,
        RecordHeader {
            content_type,
            version,
            sequence: (u64::from(epoch) << 48) | seq48,
            body_len: body_len as usize,
        },
    ))
}

/// Incremental parser turning transport bytes into records.
///
/// The reader owns a persistent buffer holding at most one partial record
/// (header plus partial body), so it never buffers beyond
/// `DTLS_HEADER_SIZE + MAX_CIPHERTEXT_SIZE` bytes. It is driven
/// synchronously by the caller and never blocks: each call consumes what
/// it can from the input cursor and reports how it went.
#[derive(Debug, Default)]
pub struct RecordReader {
    readbuf: Buf,
}

impl RecordReader {
    /// Create a reader waiting for the start of a record.
    pub fn new() -> RecordReader {
        RecordReader::default()
    }

    /// Consume bytes from `input` and try to produce one record.
    ///
    /// In stream mode the reader returns [`ReadOutcome::NeedMore`] until a
    /// full record has arrived, and surfaces every protocol violation as a
    /// fatal [`Error`] (the connection must send the corresponding alert
    /// and close). In datagram mode it never asks for more bytes and never
    /// fails on peer input: truncated, malformed, replayed or
    /// undecryptable datagrams come back as [`ReadOutcome::Discarded`].
    ///
    /// `sequences` may be `None` only for the very first unencrypted
    /// record on the server side. `cipher_states` must resolve every
    /// epoch ≥ 1 the handshake has installed keys for.
    pub fn read_record(
        &mut self,
        input: &mut RawInput<'_>,
        sequences: Option<&mut dyn SequenceNumbers>,
        cipher_states: &dyn CipherStateLookup,
    ) -> Result<ReadOutcome, Error> {
        if input.is_datagram() {
            Ok(self.read_datagram_record(input, sequences, cipher_states))
        } else {
            self.read_stream_record(input, sequences, cipher_states)
        }
    }

    /// Move bytes from `input` into the read buffer until it holds
    /// `desired` bytes. Returns the shortfall (zero when satisfied).
    fn fill_to(&mut self, input: &mut RawInput<'_>, desired: usize) -> usize {
        if self.readbuf.len() >= desired {
            return 0;
        }
        let take = input.remaining().min(desired - self.readbuf.len());
        self.readbuf.extend_from_slice(&input.data()[..take]);
        input.advance(take);
        desired - self.readbuf.len()
    }

    fn read_stream_record(
        &mut self,
        input: &mut RawInput<'_>,
        mut sequences: Option<&mut dyn SequenceNumbers>,
        cipher_states: &dyn CipherStateLookup,
    ) -> Result<ReadOutcome, Error> {
        let shortfall = self.fill_to(input, TLS_HEADER_SIZE);
        if shortfall > 0 {
            return Ok(ReadOutcome::NeedMore(shortfall));
        }

        let (_, header) = parse_stream_header(&self.readbuf)?;

        if header.version.is_datagram() {
            return Err(Error::ProtocolVersion(
                "expected a stream record, got a DTLS version",
            ));
        }
        if header.body_len > MAX_CIPHERTEXT_SIZE {
            return Err(Error::RecordOverflow(header.body_len));
        }
        if header.body_len == 0 {
            return Err(Error::Decode("zero-length record"));
        }

        let shortfall = self.fill_to(input, TLS_HEADER_SIZE + header.body_len);
        if shortfall > 0 {
            return Ok(ReadOutcome::NeedMore(shortfall));
        }

        let (sequence, epoch) = match sequences.as_deref() {
            Some(s) => {
                let seq = s
                    .next_read_sequence()
                    .ok_or(Error::Internal("stream reads need stream sequence numbers"))?;
                (seq, s.current_read_epoch())
            }
            // Server side, first unencrypted record: no counters yet.
            None => (0, 0),
        };
        if sequence == u64::MAX {
            return Err(Error::Internal("read sequence space exhausted"));
        }

        let body = &self.readbuf[TLS_HEADER_SIZE..TLS_HEADER_SIZE + header.body_len];
        let mut data = Buf::new();

        if epoch == 0 {
            data.extend_from_slice(body);
        } else {
            let cs = cipher_states
                .cipher_state(epoch)
                .ok_or(Error::Internal("no cipher state for the current epoch"))?;
            decrypt_record(&mut data, body, sequence, header, cs)?;
        }

        if let Some(s) = sequences.as_deref_mut() {
            s.read_accept(sequence);
        }
        self.readbuf.clear();

        trace!(
            "{} record: {:?}, {} payload bytes, seq {}",
            header.version,
            header.content_type,
            data.len(),
            sequence
        );

        Ok(ReadOutcome::Record(Record {
            content_type: header.content_type,
            version: header.version,
            sequence,
            data,
        }))
    }

    fn read_datagram_record(
        &mut self,
        input: &mut RawInput<'_>,
        mut sequences: Option<&mut dyn SequenceNumbers>,
        cipher_states: &dyn CipherStateLookup,
    ) -> ReadOutcome {
        if self.fill_to(input, DTLS_HEADER_SIZE) > 0 {
            debug!("dropping datagram: truncated record header");
            return self.discard();
        }

        // A full header is buffered, so this parse cannot fail; treat a
        // failure as a drop all the same.
        let parsed = parse_datagram_header(&self.readbuf).ok().map(|(_, h)| h);
        let Some(header) = parsed else {
            return self.discard();
        };

        if !header.version.is_datagram() {
            debug!("dropping record with stream version {}", header.version);
            return self.discard();
        }
        if header.body_len > MAX_CIPHERTEXT_SIZE {
            debug!("dropping oversized record: {} byte body", header.body_len);
            return self.discard();
        }
        if header.body_len == 0 {
            debug!("dropping zero-length record");
            return self.discard();
        }
        if self.fill_to(input, DTLS_HEADER_SIZE + header.body_len) > 0 {
            debug!("dropping datagram: truncated record body");
            return self.discard();
        }

        let sequence = header.sequence;
        let epoch = (sequence >> 48) as u16;

        if let Some(s) = sequences.as_deref() {
            if s.already_seen(sequence) {
                debug!("dropping replayed or out-of-window record, seq {}", sequence);
                return self.discard();
            }
        }

        let body = &self.readbuf[DTLS_HEADER_SIZE..DTLS_HEADER_SIZE + header.body_len];
        let mut data = Buf::new();

        if epoch == 0 {
            data.extend_from_slice(body);
        } else {
            // The handshake keeps cipher states alive while old-epoch
            // records may still be in flight. An epoch we hold no keys
            // for is unprocessable, not fatal: erroring here would let an
            // attacker tear the connection down with one forged datagram.
            let Some(cs) = cipher_states.cipher_state(epoch) else {
                debug!("dropping record for unknown epoch {}", epoch);
                return self.discard();
            };
            if let Err(e) = decrypt_record(&mut data, body, sequence, header, cs) {
                debug!("dropping undecryptable record, seq {}: {}", sequence, e);
                return self.discard();
            }
        }

        if let Some(s) = sequences.as_deref_mut() {
            s.read_accept(sequence);
        }
        self.readbuf.clear();

        ReadOutcome::Record(Record {
            content_type: header.content_type,
            version: header.version,
            sequence,
            data,
        })
    }

    fn discard(&mut self) -> ReadOutcome {
        self.readbuf.clear();
        ReadOutcome::Discarded
    }
}

/// Decrypt one protected record body into `data`.
fn decrypt_record(
    data: &mut Buf,
    body: &[u8],
    sequence: u64,
    header: RecordHeader,
    cs: &CipherState,
) -> Result<(), Error> {
    let nonce = cs.read_nonce(body, sequence)?;

    // read_nonce verified the body covers the explicit nonce portion.
    let msg = &body[cs.record_nonce_len()..];

    // Rejecting short ciphertexts uses only the public record length, so
    // this leaks nothing. The alert matches what a MAC failure produces,
    // keeping AEAD and CBC suites indistinguishable to padding-oracle
    // probes.
    if msg.len() < cs.aead().min_ciphertext_len() {
        return Err(Error::BadRecordMac);
    }

    let plaintext_len = cs.aead().plaintext_len(msg.len());
    let ad = format_ad(
        sequence,
        header.content_type,
        header.version,
        plaintext_len as u16,
    );

    let offset = data.len();
    data.extend_from_slice(msg);
    cs.aead().open_in_place(&nonce, &ad, data, offset)
}

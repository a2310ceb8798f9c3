#![no_main]

//! Fuzz target for the record reader.
//!
//! Feeds arbitrary bytes to both the stream and the datagram reader, with
//! and without an installed cipher state. The reader must never panic:
//! stream mode surfaces errors, datagram mode silently drops.

use libfuzzer_sys::fuzz_target;

use recl::{
    AesGcm, CipherState, DatagramSequences, NoCipherStates, NonceFormat, RawInput, ReadOutcome,
    RecordReader, SequenceNumbers, StreamSequences,
};

fuzz_target!(|data: &[u8]| {
    // Stream mode, plaintext phase.
    let mut reader = RecordReader::new();
    let mut seqs = StreamSequences::new();
    let mut input = RawInput::stream(data);
    while input.remaining() > 0 {
        match reader.read_record(&mut input, Some(&mut seqs), &NoCipherStates) {
            Ok(ReadOutcome::Record(_)) | Ok(ReadOutcome::Discarded) => {}
            Ok(ReadOutcome::NeedMore(_)) => break,
            Err(_) => break,
        }
    }

    // Datagram mode with keys installed for epoch 1; every input must be
    // consumed without an error or a panic.
    let cs = CipherState::new(
        NonceFormat::AeadImplicit4,
        &[0; 4],
        8,
        Box::new(AesGcm::new(&[0; 16]).expect("key")),
    )
    .expect("cipher state");
    let mut states = std::collections::BTreeMap::new();
    states.insert(1u16, cs);

    let mut reader = RecordReader::new();
    let mut seqs = DatagramSequences::new();
    seqs.new_read_cipher_state();
    let mut input = RawInput::datagram(data);
    while input.remaining() > 0 {
        let outcome = reader
            .read_record(&mut input, Some(&mut seqs), &states)
            .expect("datagram reads never fail");
        if matches!(outcome, ReadOutcome::NeedMore(_)) {
            break;
        }
    }
});

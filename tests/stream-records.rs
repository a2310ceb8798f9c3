//! Stream (TLS) record layer tests: roundtrips, incremental delivery,
//! sequence discipline.


use recl::{
    write_record, Buf, ContentType, Error, NoCipherStates, ProtocolVersion, RawInput,
    ReadOutcome, Record, RecordReader, SequenceNumbers, StreamSequences,
};
use record_common::*;

/// Feed all of `bytes` and expect one complete record back.
fn read_one(
    reader: &mut RecordReader,
    bytes: &[u8],
    seqs: &mut StreamSequences,
    states: &std::collections::BTreeMap<u16, recl::CipherState>,
) -> Record {
    let mut input = RawInput::stream(bytes);
    match reader.read_record(&mut input, Some(seqs), states).expect("read") {
        ReadOutcome::Record(rec) => rec,
        ReadOutcome::NeedMore(n) => panic!("reader wants {} more bytes", n),
        ReadOutcome::Discarded => panic!("stream reader discarded"),
    }
}

#[test]
fn gcm_roundtrip_advances_sequences() {
    let _ = env_logger::try_init();

    let (mut wcs, rcs) = gcm_pair();
    let mut wseq = StreamSequences::new();
    wseq.new_write_cipher_state();
    let mut rseq = StreamSequences::new();
    rseq.new_read_cipher_state();
    let states = epoch_states(1, rcs);

    let mut rng = test_rng();
    let mut reader = RecordReader::new();

    let payloads: [&[u8]; 3] = [b"hello", b"", b"a somewhat longer record payload"];
    for (i, payload) in payloads.iter().enumerate() {
        let seq = wseq.next_write_sequence(wseq.current_write_epoch());
        assert_eq!(seq, i as u64);

        let mut wire = Buf::new();
        write_record(
            &mut wire,
            ContentType::ApplicationData,
            payload,
            ProtocolVersion::TLS_V12,
            seq,
            Some(&mut wcs),
            &mut rng,
        )
        .expect("write");

        let rec = read_one(&mut reader, &wire, &mut rseq, &states);
        assert_eq!(rec.content_type, ContentType::ApplicationData);
        assert_eq!(rec.version, ProtocolVersion::TLS_V12);
        assert_eq!(rec.sequence, i as u64);
        assert_eq!(&rec.data[..], *payload);
    }
}

#[test]
fn chacha_roundtrip() {
    let (mut wcs, rcs) = chacha_pair();
    let mut wseq = StreamSequences::new();
    wseq.new_write_cipher_state();
    let mut rseq = StreamSequences::new();
    rseq.new_read_cipher_state();
    let states = epoch_states(1, rcs);

    let mut rng = test_rng();
    let mut reader = RecordReader::new();

    let seq = wseq.next_write_sequence(1);
    let mut wire = Buf::new();
    write_record(
        &mut wire,
        ContentType::Alert,
        &[1, 0],
        ProtocolVersion::TLS_V12,
        seq,
        Some(&mut wcs),
        &mut rng,
    )
    .expect("write");

    let rec = read_one(&mut reader, &wire, &mut rseq, &states);
    assert_eq!(rec.content_type, ContentType::Alert);
    assert_eq!(&rec.data[..], &[1, 0]);
}

#[test]
fn any_split_produces_the_same_record() {
    let (mut wcs, _) = gcm_pair();
    let mut rng = test_rng();

    let mut wire = Buf::new();
    write_record(
        &mut wire,
        ContentType::ApplicationData,
        b"split me anywhere",
        ProtocolVersion::TLS_V12,
        0,
        Some(&mut wcs),
        &mut rng,
    )
    .expect("write");

    for split in 1..wire.len() {
        let (_, rcs) = gcm_pair();
        let states = epoch_states(1, rcs);
        let mut rseq = StreamSequences::new();
        rseq.new_read_cipher_state();
        let mut reader = RecordReader::new();

        let mut first = RawInput::stream(&wire[..split]);
        match reader
            .read_record(&mut first, Some(&mut rseq), &states)
            .expect("read")
        {
            ReadOutcome::NeedMore(n) => assert_eq!(n, wire.len() - split),
            _ => panic!("partial input must ask for more"),
        }
        assert_eq!(first.remaining(), 0);

        let rec = read_one(&mut reader, &wire[split..], &mut rseq, &states);
        assert_eq!(rec.sequence, 0);
        assert_eq!(&rec.data[..], b"split me anywhere");
    }
}

#[test]
fn several_records_in_one_segment() {
    let mut rng = test_rng();

    let mut segment = Vec::new();
    for payload in [&b"first"[..], &b"second"[..]] {
        let mut wire = Buf::new();
        write_record(
            &mut wire,
            ContentType::Handshake,
            payload,
            ProtocolVersion::TLS_V12,
            0,
            None,
            &mut rng,
        )
        .expect("write");
        segment.extend_from_slice(&wire);
    }

    let mut reader = RecordReader::new();
    let mut seqs = StreamSequences::new();
    let mut input = RawInput::stream(&segment);

    for (i, expected) in [&b"first"[..], &b"second"[..]].iter().enumerate() {
        match reader
            .read_record(&mut input, Some(&mut seqs), &NoCipherStates)
            .expect("read")
        {
            ReadOutcome::Record(rec) => {
                assert_eq!(rec.sequence, i as u64);
                assert_eq!(&rec.data[..], *expected);
            }
            _ => panic!("expected a record"),
        }
    }
    assert_eq!(input.remaining(), 0);
}

#[test]
fn tampered_record_is_a_bad_mac() {
    let (mut wcs, rcs) = gcm_pair();
    let states = epoch_states(1, rcs);
    let mut rng = test_rng();

    let mut wire = Buf::new();
    write_record(
        &mut wire,
        ContentType::ApplicationData,
        b"payload",
        ProtocolVersion::TLS_V12,
        0,
        Some(&mut wcs),
        &mut rng,
    )
    .expect("write");

    let last = wire.len() - 1;
    wire[last] ^= 0x01;

    let mut rseq = StreamSequences::new();
    rseq.new_read_cipher_state();
    let mut reader = RecordReader::new();
    let mut input = RawInput::stream(&wire);
    let err = reader
        .read_record(&mut input, Some(&mut rseq), &states)
        .unwrap_err();
    assert_eq!(err, Error::BadRecordMac);
    assert_eq!(err.alert().as_u8(), 20);
}

#[test]
fn missing_cipher_state_is_an_internal_error() {
    let (mut wcs, _) = gcm_pair();
    let mut rng = test_rng();

    let mut wire = Buf::new();
    write_record(
        &mut wire,
        ContentType::ApplicationData,
        b"payload",
        ProtocolVersion::TLS_V12,
        0,
        Some(&mut wcs),
        &mut rng,
    )
    .expect("write");

    let mut rseq = StreamSequences::new();
    rseq.new_read_cipher_state();
    let mut reader = RecordReader::new();
    let mut input = RawInput::stream(&wire);
    let err = reader
        .read_record(&mut input, Some(&mut rseq), &NoCipherStates)
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
}

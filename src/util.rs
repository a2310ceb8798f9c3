use nom::error::{make_error, ErrorKind};
use nom::{Err, IResult};

/// Big-endian 48-bit integer, as used by the DTLS sequence number field.
pub(crate) fn be_u48(input: &[u8]) -> IResult<&[u8], u64> {
    const BOUND: usize = 6;

    if input.len() < BOUND {
        return Err(Err::Error(make_error(input, ErrorKind::Eof)));
    }

    let mut value = 0u64;
    for byte in &input[..BOUND] {
        value = (value << 8) | u64::from(*byte);
    }

    Ok((&input[BOUND..], value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_u48_reads_six_bytes() {
        let bytes = [0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0xFF];
        let (rest, value) = be_u48(&bytes).unwrap();
        assert_eq!(value, 0x0102);
        assert_eq!(rest, &[0xFF]);

        assert!(be_u48(&bytes[..5]).is_err());
    }
}

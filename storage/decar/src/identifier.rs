use std::io::Cursor;

use ipld_core::cid::Cid;
use multihash_codetable::{Code, MultihashDigest};

use crate::{multicodec::IDENTITY_CODE, Error};

/// Parse a [`Cid`] from the start of `bytes`.
///
/// Returns the [`Cid`] along with the number of bytes it takes,
/// anything after it is left untouched.
///
/// Both CIDv0 (a bare SHA-256 multihash) and CIDv1 are supported.
pub fn parse_cid(bytes: &[u8]) -> Result<(Cid, usize), Error> {
    read_cid(bytes, 0)
}

/// Same as [`parse_cid`], `offset` is only used for error reporting.
pub(crate) fn read_cid(bytes: &[u8], offset: u64) -> Result<(Cid, usize), Error> {
    // Cid::read_bytes needs `Read`, a Cursor gives us the consumed length for free
    let mut cursor = Cursor::new(bytes);
    let cid = Cid::read_bytes(&mut cursor).map_err(|err| Error::MalformedIdentifierError {
        offset,
        reason: err.to_string(),
    })?;
    Ok((cid, cursor.position() as usize))
}

/// Check whether `bytes` hash to the digest declared in `cid`.
///
/// Identity multihashes embed the data in the digest, so they're compared directly.
/// Truncated digests are supported, only the declared digest length is compared.
///
/// This is an integrity check, the comparison is not constant-time.
pub fn verify(cid: &Cid, bytes: &[u8]) -> Result<bool, Error> {
    let multihash = cid.hash();
    if multihash.code() == IDENTITY_CODE {
        return Ok(multihash.digest() == bytes);
    }

    let code = Code::try_from(multihash.code()).map_err(|_| Error::UnsupportedMultihashError {
        cid: *cid,
        code: multihash.code(),
    })?;

    let declared = multihash.digest();
    if declared.is_empty() {
        return Ok(false);
    }
    let computed = code.digest(bytes);
    Ok(computed.digest().get(..declared.len()) == Some(declared))
}

#[cfg(test)]
mod tests {
    use ipld_core::cid::{multihash::Multihash, Cid};
    use multihash_codetable::{Code, MultihashDigest};
    use sha2::{Sha256, Sha512};

    use super::{parse_cid, verify};
    use crate::{
        multicodec::{generate_multihash, DAG_PB_CODE, IDENTITY_CODE, RAW_CODE},
        Error,
    };

    #[test]
    fn parse_v1_with_trailing_data() {
        let cid = Cid::new_v1(RAW_CODE, generate_multihash::<Sha256, _>(b"hello"));
        let mut bytes = cid.to_bytes();
        let cid_length = bytes.len();
        bytes.extend_from_slice(b"trailing payload");

        let (parsed, consumed) = parse_cid(&bytes).unwrap();
        assert_eq!(parsed, cid);
        assert_eq!(consumed, cid_length);
        assert_eq!(&bytes[consumed..], b"trailing payload");
    }

    #[test]
    fn parse_v0() {
        let cid = Cid::new_v0(generate_multihash::<Sha256, _>(b"hello")).unwrap();
        let (parsed, consumed) = parse_cid(&cid.to_bytes()).unwrap();
        assert_eq!(parsed, cid);
        assert_eq!(parsed.codec(), DAG_PB_CODE);
        assert_eq!(consumed, 34);
    }

    #[test]
    fn parse_truncated() {
        let cid = Cid::new_v1(RAW_CODE, generate_multihash::<Sha256, _>(b"hello"));
        let bytes = cid.to_bytes();
        let result = parse_cid(&bytes[..bytes.len() - 4]);
        assert!(matches!(
            result,
            Err(Error::MalformedIdentifierError { offset: 0, .. })
        ));
    }

    #[test]
    fn parse_unknown_version() {
        // version 3, raw codec, followed by a sha2-256 multihash prefix
        let bytes = [0x03, 0x55, 0x12, 0x20];
        assert!(matches!(
            parse_cid(&bytes),
            Err(Error::MalformedIdentifierError { .. })
        ));
    }

    #[test]
    fn verify_sha2() {
        let cid = Cid::new_v1(RAW_CODE, generate_multihash::<Sha256, _>(b"hello"));
        assert!(verify(&cid, b"hello").unwrap());
        assert!(!verify(&cid, b"hellO").unwrap());

        let cid = Cid::new_v1(RAW_CODE, generate_multihash::<Sha512, _>(b"hello"));
        assert!(verify(&cid, b"hello").unwrap());
        assert!(!verify(&cid, b"").unwrap());
    }

    #[test]
    fn verify_blake3() {
        let cid = Cid::new_v1(RAW_CODE, Code::Blake3_256.digest(b"hello"));
        assert!(verify(&cid, b"hello").unwrap());
        assert!(!verify(&cid, b"world").unwrap());
    }

    #[test]
    fn verify_truncated_digest() {
        let full = generate_multihash::<Sha256, _>(b"hello");
        let truncated = Multihash::<64>::wrap(full.code(), &full.digest()[..20]).unwrap();
        let cid = Cid::new_v1(RAW_CODE, truncated);
        assert!(verify(&cid, b"hello").unwrap());
        assert!(!verify(&cid, b"hello!").unwrap());
    }

    #[test]
    fn verify_identity() {
        let cid = Cid::new_v1(RAW_CODE, Multihash::wrap(IDENTITY_CODE, b"inline").unwrap());
        assert!(verify(&cid, b"inline").unwrap());
        assert!(!verify(&cid, b"inlined").unwrap());
    }

    #[test]
    fn verify_unsupported_multihash() {
        let cid = Cid::new_v1(RAW_CODE, Multihash::wrap(0x300001, &[0u8; 32]).unwrap());
        assert!(matches!(
            verify(&cid, b"hello"),
            Err(Error::UnsupportedMultihashError { code: 0x300001, .. })
        ));
    }
}

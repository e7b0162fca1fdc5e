use rand::Rng;
use uuid::Uuid;

/// Alphabet of the original invite codes: base-36 digits, uppercased.
const CODE_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const CODE_LEN: usize = 6;

/// Fresh entity id. Ids are opaque strings on the wire; older documents
/// carry timestamp-derived ids and must keep round-tripping.
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Source of invite codes. Pluggable so club creation can retry on a store
/// collision and tests can issue a fixed sequence.
pub trait CodeIssuer {
    fn issue(&self) -> String;
}

/// 6-character uppercase alphanumeric codes, the original's format.
pub struct RandomCodes;

impl CodeIssuer for RandomCodes {
    fn issue(&self) -> String {
        let mut rng = rand::rng();
        (0..CODE_LEN)
            .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_keep_the_external_format() {
        let code = RandomCodes.issue();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
    }

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(fresh_id(), fresh_id());
    }
}

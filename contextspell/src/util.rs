/// Serializes a `Duration` as whole milliseconds.
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Converts a count to the signed form stores and deltas use, saturating at
/// `i64::MAX` instead of wrapping.
pub(crate) fn saturating_signed(count: crate::types::Count) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_saturate() {
        assert_eq!(saturating_signed(0), 0);
        assert_eq!(saturating_signed(42), 42);
        assert_eq!(saturating_signed(i64::MAX as u64), i64::MAX);
        assert_eq!(saturating_signed(i64::MAX as u64 + 1), i64::MAX);
        assert_eq!(saturating_signed(u64::MAX), i64::MAX);
    }
}

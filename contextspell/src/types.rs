/// Occurrence count of a key in a frequency table.
pub type Count = u64;
/// Signed change of a key's count between two snapshots.
pub type Delta = i64;
/// Raw value held by a frequency store. Signed, since deltas are applied blindly.
pub type StoreValue = i64;
/// Log-probability score of a candidate.
pub type Score = f64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NgramKind {
    Unigrams,
    Bigrams,
}

impl NgramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NgramKind::Unigrams => "unigrams",
            NgramKind::Bigrams => "bigrams",
        }
    }
}

impl std::fmt::Display for NgramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NgramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<NgramKind, String> {
        match s {
            "unigrams" => Ok(NgramKind::Unigrams),
            "bigrams" => Ok(NgramKind::Bigrams),
            other => Err(format!(
                "wrong type {:?}: please specify 'unigrams' or 'bigrams'",
                other
            )),
        }
    }
}

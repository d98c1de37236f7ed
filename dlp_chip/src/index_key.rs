use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookup key of the index barcode pair registered for a chip position.
/// The i7 index follows the column and the i5 index follows the row,
/// both zero-padded to two digits: `i7_10-i5_05` for row 5, column 10.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[serde(transparent)]
pub struct IndexKey(String);

impl IndexKey {
    pub fn new(prefix: &str, row: u32, column: u32) -> Self {
        IndexKey(format!("{prefix}i7_{column:02}-i5_{row:02}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IndexKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Random identifiers for model elements and relationships.
//!
//! Ids are drawn fresh for every model build. They are unique within one
//! build but carry no meaning across builds: cross-build identity is
//! established by structural keys during layout reconciliation (see
//! [`crate::layout`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of an element or relationship within one model build.
///
/// Rendered and serialized as a lowercase base36 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Id(u64);

impl Id {
    /// Draws a fresh random id.
    ///
    /// Uniqueness within a build is enforced by the registry, which re-rolls
    /// on the (vanishingly rare) collision.
    pub fn random() -> Self {
        Id(rand::random::<u64>())
    }

    /// Builds an id from its raw value. Mostly useful in tests.
    pub fn from_raw(raw: u64) -> Self {
        Id(raw)
    }
}

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 13];
        let mut i = buf.len();
        let mut x = self.0;
        loop {
            i -= 1;
            buf[i] = ALPHABET[(x % 36) as usize];
            x /= 36;
            if x == 0 {
                break;
            }
        }
        // buf[i..] is ASCII by construction.
        f.write_str(std::str::from_utf8(&buf[i..]).expect("base36 is ASCII"))
    }
}

impl FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 36).map(Id)
    }
}

impl From<Id> for String {
    fn from(id: Id) -> String {
        id.to_string()
    }
}

impl TryFrom<String> for Id {
    type Error = std::num::ParseIntError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

pub mod message;
pub mod source;
pub mod ticket;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub use self::{
    message::Message,
    source::{DataUnavailable, HttpSource, Source, StaticSource},
    ticket::{Cache, Collection, Snapshot, Ticket},
};

/// Ticket identifier in its normalized string form.
///
/// Source data carries the same number as `1,234`, `1234` or `1234.0`, so
/// identifiers are never compared as numbers. Leading zeros are significant.
#[derive(
    Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct RequestNum(String);

impl RequestNum {
    pub fn new(raw: &str) -> Self {
        let mut id = raw
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect::<String>();

        if let Some((int, frac)) = id.split_once('.') {
            if !int.is_empty()
                && int.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b == b'0')
            {
                id.truncate(int.len());
            }
        }

        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RequestNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestNum {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<'de> Deserialize<'de> for RequestNum {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        String::deserialize(d).map(|raw| Self::new(&raw))
    }
}

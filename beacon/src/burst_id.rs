use std::{fmt, hash};
use uuid::Uuid;

/// Identifies one dispatch burst.
///
/// Every item routed during a burst and the burst's completion marker carry
/// the same `BurstId`, so observers can correlate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, hash::Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BurstId(u128);

impl BurstId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    pub fn value(&self) -> u128 {
        self.0
    }
}

impl From<u128> for BurstId {
    fn from(value: u128) -> Self {
        BurstId(value)
    }
}

impl From<BurstId> for u128 {
    fn from(value: BurstId) -> Self {
        value.0
    }
}

impl fmt::Display for BurstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_u128(self.0))
    }
}

impl Default for BurstId {
    fn default() -> Self {
        BurstId::new()
    }
}

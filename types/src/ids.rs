use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Number of a scenario on the remote endpoint, always in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ScenarioId(u8);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scenario id must be between 1 and {max} (got {got})", max = ScenarioId::MAX)]
pub struct ScenarioIdError {
    pub got: u64,
}

impl ScenarioId {
    pub const MAX: u8 = 10;

    pub fn new(id: u64) -> Result<Self, ScenarioIdError> {
        match u8::try_from(id) {
            Ok(n) if (1..=Self::MAX).contains(&n) => Ok(Self(n)),
            _ => Err(ScenarioIdError { got: id }),
        }
    }

    /// Every scenario id in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=Self::MAX).map(Self)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = ScenarioIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().parse::<u64>().map_err(|_| ScenarioIdError { got: 0 })?;
        Self::new(raw)
    }
}

use std::{fmt, ops::Add, time::Duration};

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A point in simulated time, counted in whole ticks since the start.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[display(fmt = "{}t", _0)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    pub const SIM_START: Tick = Tick(0);

    #[must_use]
    pub const fn from_sim_start(ticks: u64) -> Tick {
        Tick(ticks)
    }

    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Tick {
        Tick(self.0 + 1)
    }
}

impl Add<u64> for Tick {
    type Output = Tick;

    fn add(self, rhs: u64) -> Self::Output {
        Tick(self.0 + rhs)
    }
}

/// How many ticks the external clock should drive per wall-clock second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TickRate(u32);

impl TickRate {
    pub const MIN: TickRate = TickRate(1);
    pub const MAX: TickRate = TickRate(32);
    pub const DEFAULT: TickRate = TickRate(4);

    pub fn new(ticks_per_second: u32) -> Result<TickRate, ConfigError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&ticks_per_second) {
            Ok(TickRate(ticks_per_second))
        } else {
            Err(ConfigError::InvalidTickRate {
                value: ticks_per_second,
                min: Self::MIN.0,
                max: Self::MAX.0,
            })
        }
    }

    #[must_use]
    pub const fn ticks_per_second(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn period(self) -> Duration {
        Duration::from_secs(1) / self.0
    }

    /// Twice as fast, or `None` if that would exceed [`TickRate::MAX`].
    #[must_use]
    pub fn doubled(self) -> Option<TickRate> {
        TickRate::new(self.0.checked_mul(2)?).ok()
    }

    /// Half as fast, or `None` if that would drop below [`TickRate::MIN`].
    #[must_use]
    pub fn halved(self) -> Option<TickRate> {
        TickRate::new(self.0 / 2).ok()
    }
}

impl Default for TickRate {
    fn default() -> Self {
        TickRate::DEFAULT
    }
}

impl TryFrom<u32> for TickRate {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        TickRate::new(value)
    }
}

impl From<TickRate> for u32 {
    fn from(value: TickRate) -> Self {
        value.0
    }
}

impl fmt::Display for TickRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps", self.0)
    }
}

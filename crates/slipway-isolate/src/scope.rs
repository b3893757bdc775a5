//! Resolution scopes and their visibility lattice.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Dependency-resolution scope requested for an isolation context.
///
/// Scopes widen monotonically: `compile` resources are visible to every
/// scope, `runtime` adds runtime-only resources, and `test` sees all three.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionScope {
    /// Compile-time dependency set.
    Compile,
    /// Compile plus runtime-only dependencies.
    Runtime,
    /// Everything, including test-only dependencies.
    #[default]
    Test,
}

impl ResolutionScope {
    /// Lenient parse for configuration values: unknown or empty input falls
    /// back to [`ResolutionScope::Test`].
    #[must_use]
    pub fn from_config_value(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }

    /// Whether a resource tagged `tag` is visible to this requested scope.
    #[must_use]
    pub const fn sees(self, tag: Self) -> bool {
        self.rank() >= tag.rank()
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Compile => 0,
            Self::Runtime => 1,
            Self::Test => 2,
        }
    }
}

//! Errors raised while turning a topology description into a [`crate::Network`].
//!
//! Collisions are not errors: they travel through the simulation as collision
//! packets and are settled by the backoff protocol. Broken scheduling
//! invariants are programming errors and panic instead.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A link names a component that was never declared
    #[error("trying to connect component `{referenced_by}` to nonexisting component `{name}`")]
    UnknownComponent { name: String, referenced_by: String },

    /// Two stations or segments share a name
    #[error("component name `{0}` is declared more than once")]
    DuplicateComponent(String),

    /// The same pair of components is linked twice
    #[error("components `{0}` and `{1}` are linked more than once")]
    DuplicateLink(String, String),

    /// A component linked to itself
    #[error("component `{0}` cannot be linked to itself")]
    SelfLink(String),

    /// Two stations linked directly, bypassing the shared medium
    #[error("stations `{0}` and `{1}` can only be connected through a segment")]
    StationLink(String, String),

    /// Linking the two components would close a loop in the collision domain
    #[error("linking `{0}` and `{1}` closes a loop in the collision domain")]
    Cycle(String, String),

    #[error("tick rate {value} is outside of the supported range {min}..={max}")]
    InvalidTickRate { value: u32, min: u32, max: u32 },
}

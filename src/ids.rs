//! Identifiers used to key effect data, techniques and radio parts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a receiver, transmitter or sensor.
///
/// Per-type effect data is keyed by `Option<SystemTypeId>`; `None` is the
/// wildcard entry that applies to every type without its own override.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemTypeId(String);

impl SystemTypeId {
    /// Creates a type id from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SystemTypeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Identifier of a technique within an attack or protect context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechniqueId(String);

impl TechniqueId {
    /// Creates a technique id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the technique name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TechniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TechniqueId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Simulation-unique id of a transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XmtrId(pub u32);

impl fmt::Display for XmtrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xmtr#{}", self.0)
    }
}

/// Simulation-unique id of a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RcvrId(pub u32);

impl fmt::Display for RcvrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcvr#{}", self.0)
    }
}

/// Location of an effect inside a context: owning technique plus position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EffectKey {
    /// Owning technique.
    pub technique: TechniqueId,
    /// Index into the technique's effect list.
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_names() {
        assert_eq!(SystemTypeId::from("SPS-48").to_string(), "SPS-48");
        assert_eq!(TechniqueId::from("barrage").as_str(), "barrage");
        assert_eq!(XmtrId(7).to_string(), "xmtr#7");
        assert_eq!(RcvrId(3).to_string(), "rcvr#3");
    }

    #[test]
    fn system_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&SystemTypeId::new("EW_RADAR")).unwrap();
        assert_eq!(json, "\"EW_RADAR\"");
    }
}

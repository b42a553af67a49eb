//! Per-system-type configuration with a wildcard fallback.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::SystemTypeId;

/// Effect data keyed by system type.
///
/// The wildcard entry always exists. Reads for a type without its own entry
/// see the wildcard; the first write for a type clones the wildcard into a
/// new entry and mutates that copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectDataMap<D> {
    wildcard: D,
    typed: HashMap<SystemTypeId, D>,
}

impl<D> EffectDataMap<D> {
    /// Creates a map holding only `wildcard`.
    pub fn new(wildcard: D) -> Self {
        Self {
            wildcard,
            typed: HashMap::new(),
        }
    }

    /// Data for `key`, falling back to the wildcard.
    pub fn get(&self, key: Option<&SystemTypeId>) -> &D {
        key.and_then(|k| self.typed.get(k)).unwrap_or(&self.wildcard)
    }

    /// The wildcard entry.
    pub fn wildcard(&self) -> &D {
        &self.wildcard
    }

    /// Mutable wildcard entry.
    pub fn wildcard_mut(&mut self) -> &mut D {
        &mut self.wildcard
    }

    /// True if `key` has its own entry.
    pub fn contains(&self, key: &SystemTypeId) -> bool {
        self.typed.contains_key(key)
    }

    /// Every entry, wildcard first as `None`.
    pub fn entries(&self) -> impl Iterator<Item = (Option<&SystemTypeId>, &D)> {
        std::iter::once((None, &self.wildcard)).chain(self.typed.iter().map(|(k, v)| (Some(k), v)))
    }

    /// Every entry, mutably.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = (Option<&SystemTypeId>, &mut D)> {
        std::iter::once((None, &mut self.wildcard)).chain(self.typed.iter_mut().map(|(k, v)| (Some(k), v)))
    }
}

impl<D: Clone> EffectDataMap<D> {
    /// Mutable data for `key`, cloning the wildcard on first write.
    pub fn get_mut(&mut self, key: Option<&SystemTypeId>) -> &mut D {
        match key {
            None => &mut self.wildcard,
            Some(k) => {
                let wildcard = &self.wildcard;
                self.typed.entry(k.clone()).or_insert_with(|| wildcard.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Gain {
        value: f64,
    }

    #[test]
    fn missing_type_falls_back_to_wildcard() {
        let map = EffectDataMap::new(Gain { value: 2.0 });
        let key = SystemTypeId::new("SPS-48");
        assert_eq!(map.get(Some(&key)).value, 2.0);
        assert_eq!(map.get(None).value, 2.0);
        assert!(!map.contains(&key));
    }

    #[test]
    fn first_write_clones_wildcard() {
        let mut map = EffectDataMap::new(Gain { value: 2.0 });
        let key = SystemTypeId::new("SPS-48");
        assert_eq!(map.get_mut(Some(&key)).value, 2.0);
        map.get_mut(Some(&key)).value = 5.0;
        assert_eq!(map.get(Some(&key)).value, 5.0);
        assert_eq!(map.wildcard().value, 2.0);

        map.wildcard_mut().value = 3.0;
        assert_eq!(map.get(Some(&key)).value, 5.0);
        assert_eq!(map.entries().count(), 2);
    }

    proptest! {
        #[test]
        fn unrelated_writes_leave_fallback_untouched(
            wildcard in -1.0e6f64..1.0e6,
            writes in proptest::collection::vec(("[a-d]", -1.0e6f64..1.0e6), 0..12),
        ) {
            let mut map = EffectDataMap::new(Gain { value: wildcard });
            for (name, value) in &writes {
                map.get_mut(Some(&SystemTypeId::new(name.as_str()))).value = *value;
            }
            let unset = SystemTypeId::new("unset-type");
            prop_assert_eq!(map.get(Some(&unset)).value, wildcard);
        }
    }
}

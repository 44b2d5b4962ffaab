use crate::error::SimError;
use crate::scale_map::ScaleMap;
use std::collections::BTreeMap;

/// Resolves a named angle/direction configuration to its scale table.
pub trait AngleMapSource {
    fn resolve_angle_map(&self, identifier: &str) -> Result<ScaleMap, SimError>;
}

/// In-process registry of named scale tables.
#[derive(Debug, Clone, Default)]
pub struct AngleMapRegistry {
    maps: BTreeMap<String, ScaleMap>,
}

impl AngleMapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `map` under `identifier`, returning the table it replaced.
    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        map: ScaleMap,
    ) -> Result<Option<ScaleMap>, SimError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(SimError::invalid("angle map identifier must not be empty"));
        }
        Ok(self.maps.insert(identifier, map))
    }

    pub fn get(&self, identifier: &str) -> Option<&ScaleMap> {
        self.maps.get(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

impl AngleMapSource for AngleMapRegistry {
    fn resolve_angle_map(&self, identifier: &str) -> Result<ScaleMap, SimError> {
        self.maps
            .get(identifier)
            .cloned()
            .ok_or_else(|| SimError::UnknownIdentifier(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_map() {
        let mut registry = AngleMapRegistry::new();
        let map = ScaleMap::from_pairs(&[(0.0, 0.0), (1.0, 1.0)]).unwrap();
        assert!(registry.register("flaps", map.clone()).unwrap().is_none());

        assert_eq!(registry.resolve_angle_map("flaps").unwrap(), map);
        assert_eq!(registry.identifiers().collect::<Vec<_>>(), vec!["flaps"]);
    }

    #[test]
    fn unknown_identifier_is_reported() {
        let registry = AngleMapRegistry::new();
        assert_eq!(
            registry.resolve_angle_map("vsi"),
            Err(SimError::UnknownIdentifier("vsi".to_string()))
        );
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let mut registry = AngleMapRegistry::new();
        let map = ScaleMap::from_pairs(&[(0.0, 0.0)]).unwrap();
        assert!(registry.register("", map).is_err());
        assert!(registry.is_empty());
    }
}

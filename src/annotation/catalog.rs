//! Entity catalog types
//!
//! The catalog is a plain slice of [`EntityDefinition`]s passed into every
//! engine call. Nothing here caches it.

use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// Category of a catalogued story entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Character,
    Location,
    Item,
    Faction,
    Event,
    Concept,
    #[default]
    #[serde(other)]
    Other,
}

/// Entity definition as supplied by the host catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EntityDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Primary name followed by aliases, in catalog order.
    ///
    /// The flag is `true` for aliases.
    pub fn search_names(&self) -> impl Iterator<Item = (&str, bool)> {
        std::iter::once((self.name.as_str(), false))
            .chain(self.aliases.iter().map(|alias| (alias.as_str(), true)))
    }
}

/// Look an entity up by id
pub fn find_entity<'a>(catalog: &'a [EntityDefinition], id: &str) -> Option<&'a EntityDefinition> {
    catalog.iter().find(|entity| entity.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_json() {
        let entity: EntityDefinition = serde_json::from_str(
            r#"{"id":"e1","name":"Holmes","kind":"CHARACTER","aliases":["Sherlock"]}"#,
        )
        .unwrap();
        assert_eq!(entity.kind, EntityKind::Character);
        assert_eq!(entity.aliases, vec!["Sherlock"]);

        let json = serde_json::to_string(&entity).unwrap();
        assert!(json.contains(r#""kind":"CHARACTER""#));
    }

    #[test]
    fn test_unknown_kind_falls_back_to_other() {
        let entity: EntityDefinition =
            serde_json::from_str(r#"{"id":"e1","name":"Rain","kind":"WEATHER"}"#).unwrap();
        assert_eq!(entity.kind, EntityKind::Other);
        assert!(entity.aliases.is_empty());
    }

    #[test]
    fn test_search_names_lists_name_then_aliases() {
        let entity = EntityDefinition::new("e1", "Aragorn", EntityKind::Character)
            .with_aliases(["Strider", "Elessar"]);
        let names: Vec<_> = entity.search_names().collect();
        assert_eq!(
            names,
            vec![("Aragorn", false), ("Strider", true), ("Elessar", true)]
        );
    }

    #[test]
    fn test_missing_kind_defaults_to_other() {
        let entity: EntityDefinition = serde_json::from_str(r#"{"id":"e1","name":"Том"}"#).unwrap();
        assert_eq!(entity.kind, EntityKind::Other);
        assert_eq!(EntityKind::default(), EntityKind::Other);
    }

    #[test]
    fn test_find_entity() {
        let catalog = vec![
            EntityDefinition::new("e1", "Frodo", EntityKind::Character),
            EntityDefinition::new("e2", "Shire", EntityKind::Location),
        ];
        assert_eq!(find_entity(&catalog, "e2").map(|e| e.name.as_str()), Some("Shire"));
        assert!(find_entity(&catalog, "missing").is_none());
    }
}

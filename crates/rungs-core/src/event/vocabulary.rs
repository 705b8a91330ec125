use super::types::{EventDefinition, UnknownEventType};
use std::collections::BTreeMap;

/// Closed set of event types plus an alias table mapping legacy or shorthand
/// names onto canonical keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventVocabulary {
    entries: Vec<EventDefinition>,
    aliases: BTreeMap<String, String>,
}

impl EventVocabulary {
    #[must_use]
    pub const fn new(entries: Vec<EventDefinition>, aliases: BTreeMap<String, String>) -> Self {
        Self { entries, aliases }
    }

    /// Map an alias onto its canonical key. Anything that is not an alias is
    /// returned unchanged, known or not.
    #[must_use]
    pub fn canonical<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map_or(raw, String::as_str)
    }

    /// Look up a canonical key directly, without alias resolution.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&EventDefinition> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Resolve a raw event type through the alias table to its definition.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownEventType`] when the resolved key is not in the
    /// vocabulary.
    pub fn resolve(&self, raw: &str) -> Result<&EventDefinition, UnknownEventType> {
        self.get(self.canonical(raw)).ok_or_else(|| UnknownEventType {
            raw: raw.to_string(),
        })
    }

    #[must_use]
    pub fn entries(&self) -> &[EventDefinition] {
        &self.entries
    }

    #[must_use]
    pub const fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }
}

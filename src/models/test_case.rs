//! Test case and trait models
//!
//! A test case is the unit handed out by discovery and handed back to
//! execution. Traits are key/multi-value tags used by filtering.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key/multi-value trait mapping
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TraitMap(BTreeMap<String, Vec<String>>);

impl TraitMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under `name`, keeping earlier values for the same key
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let values = self.0.entry(name.into()).or_default();
        let value = value.into();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    #[cfg(test)]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str, value: &str) -> bool {
        self.0
            .get(name)
            .map(|values| values.iter().any(|v| v == value))
            .unwrap_or(false)
    }

    /// True if any key/value pair of `other` is also present here
    pub fn intersects(&self, other: &TraitMap) -> bool {
        other
            .iter()
            .any(|(name, value)| self.contains(name, value))
    }

    /// Iterate over every (key, value) pair
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }
}

impl<'de> Deserialize<'de> for TraitMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
        let mut traits = TraitMap::new();
        for (name, values) in raw {
            match values {
                OneOrMany::One(v) => traits.add(name, v),
                OneOrMany::Many(vs) => {
                    for v in vs {
                        traits.add(name.clone(), v);
                    }
                }
            }
        }
        Ok(traits)
    }
}

/// A discovered test case
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestCase {
    pub display_name: String,
    pub class_name: String,
    pub method_name: String,
    pub collection: String,
    pub traits: TraitMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(skip)]
    pub command: Option<String>,
}

impl TestCase {
    /// A test whose display name is its fully-qualified name and whose
    /// collection is its class
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let method_name = method_name.into();
        Self {
            display_name: format!("{class_name}.{method_name}"),
            collection: class_name.clone(),
            class_name,
            method_name,
            traits: TraitMap::new(),
            skip_reason: None,
            command: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_trait(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.traits.add(name, value);
        self
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }

    /// `Namespace.Class.Method`
    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

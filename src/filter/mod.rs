//! Test case filtering
//!
//! Included traits act as an OR, excluded traits as an AND (any match
//! excludes), and the name/class/method lists form a single OR group.

use std::collections::BTreeSet;

use crate::models::{TestCase, TraitMap};

/// Include/exclude criteria shared by every assembly of a project
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub included_traits: TraitMap,
    pub excluded_traits: TraitMap,
    pub included_names: BTreeSet<String>,
    pub included_classes: BTreeSet<String>,
    pub included_methods: BTreeSet<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_trait(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.included_traits.add(name, value);
        self
    }

    pub fn exclude_trait(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.excluded_traits.add(name, value);
        self
    }

    pub fn include_name(mut self, name: impl Into<String>) -> Self {
        self.included_names.insert(name.into());
        self
    }

    pub fn include_class(mut self, class: impl Into<String>) -> Self {
        self.included_classes.insert(class.into());
        self
    }

    pub fn include_method(mut self, method: impl Into<String>) -> Self {
        self.included_methods.insert(method.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.included_traits.is_empty()
            && self.excluded_traits.is_empty()
            && !self.has_name_constraints()
    }

    fn has_name_constraints(&self) -> bool {
        !self.included_names.is_empty()
            || !self.included_classes.is_empty()
            || !self.included_methods.is_empty()
    }

    /// Whether `test` should run
    pub fn matches(&self, test: &TestCase) -> bool {
        self.matches_names(test) && self.matches_included_traits(test) && !self.excluded(test)
    }

    fn matches_names(&self, test: &TestCase) -> bool {
        if !self.has_name_constraints() {
            return true;
        }

        self.included_names.contains(&test.display_name)
            || self.included_classes.contains(&test.class_name)
            || self.included_methods.contains(&test.fully_qualified_name())
    }

    fn matches_included_traits(&self, test: &TestCase) -> bool {
        self.included_traits.is_empty() || test.traits.intersects(&self.included_traits)
    }

    fn excluded(&self, test: &TestCase) -> bool {
        test.traits.intersects(&self.excluded_traits)
    }

    /// Keep the matching tests, preserving discovery order
    pub fn apply(&self, tests: Vec<TestCase>) -> Vec<TestCase> {
        if self.is_empty() {
            return tests;
        }
        tests.into_iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(class: &str, method: &str) -> TestCase {
        TestCase::new(class, method)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = FilterSet::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&case("A", "b")));
        assert!(filter.matches(&case("A", "c").with_trait("x", "y")));
    }

    #[test]
    fn test_included_traits_are_or() {
        let filter = FilterSet::new().include_trait("A", "1").include_trait("A", "2");

        assert!(filter.matches(&case("C", "m").with_trait("A", "1")));
        assert!(filter.matches(&case("C", "m").with_trait("A", "2")));
        assert!(!filter.matches(&case("C", "m").with_trait("A", "3")));
        assert!(!filter.matches(&case("C", "m").with_trait("B", "1")));
        assert!(!filter.matches(&case("C", "m")));
    }

    #[test]
    fn test_excluded_trait_wins_over_includes() {
        let filter = FilterSet::new()
            .include_trait("category", "fast")
            .include_class("C")
            .exclude_trait("B", "x");

        let test = case("C", "m")
            .with_trait("category", "fast")
            .with_trait("B", "x");
        assert!(!filter.matches(&test));

        let test = case("C", "m")
            .with_trait("category", "fast")
            .with_trait("B", "y");
        assert!(filter.matches(&test));
    }

    #[test]
    fn test_any_excluded_trait_excludes() {
        let filter = FilterSet::new()
            .exclude_trait("B", "x")
            .exclude_trait("C", "z");

        assert!(!filter.matches(&case("K", "m").with_trait("C", "z")));
        assert!(!filter.matches(&case("K", "m").with_trait("B", "x")));
        assert!(filter.matches(&case("K", "m").with_trait("B", "z")));
    }

    #[test]
    fn test_multi_valued_trait_matches_any_value() {
        let filter = FilterSet::new().include_trait("category", "slow");
        let test = case("K", "m")
            .with_trait("category", "db")
            .with_trait("category", "slow");
        assert!(filter.matches(&test));
    }

    #[test]
    fn test_trait_comparison_is_case_sensitive() {
        let filter = FilterSet::new().include_trait("category", "slow");
        assert!(!filter.matches(&case("K", "m").with_trait("Category", "slow")));
        assert!(!filter.matches(&case("K", "m").with_trait("category", "Slow")));
    }

    #[test]
    fn test_name_class_method_are_or() {
        let filter = FilterSet::new()
            .include_class("Ns.First")
            .include_method("Ns.Second.Only")
            .include_name("Pretty name");

        assert!(filter.matches(&case("Ns.First", "anything")));
        assert!(filter.matches(&case("Ns.Second", "Only")));
        assert!(!filter.matches(&case("Ns.Second", "Other")));
        assert!(filter.matches(&case("Ns.Third", "x").with_display_name("Pretty name")));
    }

    #[test]
    fn test_names_and_traits_combine_with_and() {
        let filter = FilterSet::new()
            .include_class("Ns.First")
            .include_trait("category", "slow");

        assert!(!filter.matches(&case("Ns.First", "a")));
        assert!(filter.matches(&case("Ns.First", "a").with_trait("category", "slow")));
        assert!(!filter.matches(&case("Ns.Other", "a").with_trait("category", "slow")));
    }

    #[test]
    fn test_apply_keeps_order() {
        let tests: Vec<_> = (0..10)
            .map(|i| {
                let t = case("A", &format!("t{i}"));
                if i % 5 == 0 {
                    t.with_trait("category", "slow")
                } else {
                    t
                }
            })
            .collect();

        let filtered = FilterSet::new().include_trait("category", "slow").apply(tests);
        let names: Vec<_> = filtered.iter().map(|t| t.method_name.as_str()).collect();
        assert_eq!(names, vec!["t0", "t5"]);
    }
}

//! Group resolution with a shared memoization cache

use crate::config::SortOptions;
use crate::groups;
use crate::item::{Item, Modifier, Selector, UNKNOWN_GROUP};
use itertools::Itertools;
use log::trace;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Cache from a tag combination to its predefined group names
///
/// Entries are pure functions of their key, so the cache may be cleared or
/// disabled at any time without changing results.
#[derive(Debug)]
pub struct GroupCache {
    entries: Mutex<HashMap<String, Arc<Vec<String>>>>,
    enabled: bool,
}

impl GroupCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            enabled: true,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            enabled: false,
        }
    }

    pub fn get_or_insert_with<F>(&self, key: &str, compute: F) -> Arc<Vec<String>>
    where
        F: FnOnce() -> Vec<String>,
    {
        if !self.enabled {
            return Arc::new(compute());
        }
        if let Some(hit) = self.entries.lock().get(key) {
            trace!("group cache hit for {key}");
            return Arc::clone(hit);
        }
        let value = Arc::new(compute());
        self.entries
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::clone(&value));
        value
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GroupCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Predefined group names for a tag set, most specific first
///
/// For each selector: every permutation of every modifier combination,
/// longest combinations first, then the bare selector.
pub fn generate_predefined_groups(selectors: &[Selector], modifiers: &[Modifier]) -> Vec<String> {
    let mut names = Vec::new();
    for selector in selectors {
        for size in (1..=modifiers.len()).rev() {
            for combination in modifiers.iter().combinations(size) {
                for permutation in combination.iter().permutations(size) {
                    let prefix = permutation.iter().map(|m| m.as_str()).join("-");
                    names.push(format!("{prefix}-{selector}"));
                }
            }
        }
        names.push(selector.to_string());
    }
    names
}

fn cache_key(selectors: &[Selector], modifiers: &[Modifier]) -> String {
    format!(
        "{}|{}",
        selectors.iter().map(Selector::as_str).join(","),
        modifiers.iter().map(Modifier::as_str).join(",")
    )
}

/// Selectors and modifiers a rule may use in group names
#[derive(Debug, Clone, Copy)]
pub struct Vocabulary {
    pub selectors: &'static [Selector],
    pub modifiers: &'static [Modifier],
}

impl Vocabulary {
    /// True for `selector` or `modifier-...-selector` built from this vocabulary
    pub fn is_predefined_group(&self, name: &str) -> bool {
        self.selectors.iter().any(|selector| {
            let selector = selector.as_str();
            if name == selector {
                return true;
            }
            name.strip_suffix(selector)
                .and_then(|rest| rest.strip_suffix('-'))
                .is_some_and(|prefix| self.is_modifier_chain(prefix, &mut Vec::new()))
        })
    }

    fn is_modifier_chain(&self, text: &str, used: &mut Vec<Modifier>) -> bool {
        self.modifiers.iter().any(|modifier| {
            if used.contains(modifier) {
                return false;
            }
            let Some(rest) = text.strip_prefix(modifier.as_str()) else {
                return false;
            };
            if rest.is_empty() {
                return true;
            }
            let Some(rest) = rest.strip_prefix('-') else {
                return false;
            };
            used.push(*modifier);
            let found = self.is_modifier_chain(rest, used);
            used.pop();
            found
        })
    }
}

/// Resolves item groups against one option set
pub struct GroupResolver<'a> {
    options: &'a SortOptions,
    cache: &'a GroupCache,
    declared: HashSet<&'a str>,
}

impl<'a> GroupResolver<'a> {
    pub fn new(options: &'a SortOptions, cache: &'a GroupCache) -> Self {
        Self {
            options,
            cache,
            declared: groups::group_names(&options.groups).into_iter().collect(),
        }
    }

    /// Custom groups first, then predefined names, then `unknown`
    pub fn resolve(&self, item: &Item) -> String {
        if let Some(custom) = self
            .options
            .custom_groups
            .iter()
            .find(|c| self.declared.contains(c.group_name.as_str()) && c.matches(item))
        {
            trace!("{} -> custom group {}", item.name, custom.group_name);
            return custom.group_name.clone();
        }

        let modifiers = item.tags.prioritized_modifiers();
        let key = cache_key(&item.tags.selectors, &modifiers);
        let predefined = self
            .cache
            .get_or_insert_with(&key, || generate_predefined_groups(&item.tags.selectors, &modifiers));

        match predefined.iter().find(|name| self.declared.contains(name.as_str())) {
            Some(name) => {
                trace!("{} -> {}", item.name, name);
                name.clone()
            }
            None => {
                trace!("{} -> {}", item.name, UNKNOWN_GROUP);
                UNKNOWN_GROUP.to_string()
            }
        }
    }

    /// Assign a group to every item
    pub fn resolve_all(&self, items: &mut [Item]) {
        for item in items.iter_mut() {
            item.group = Some(self.resolve(item));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{CustomGroup, ElementMatcher, GroupSlot};
    use crate::item::{Tags, TextRange};

    fn tagged(name: &str, selectors: Vec<Selector>, modifiers: Vec<Modifier>) -> Item {
        Item::new(0, name, TextRange::new(0, name.len())).with_tags(Tags::new(selectors, modifiers))
    }

    #[test]
    fn test_predefined_group_order() {
        let names = generate_predefined_groups(
            &[Selector::External, Selector::Import],
            &[Modifier::Type, Modifier::Named],
        );
        assert_eq!(
            names,
            vec![
                "type-named-external",
                "named-type-external",
                "type-external",
                "named-external",
                "external",
                "type-named-import",
                "named-type-import",
                "type-import",
                "named-import",
                "import",
            ]
        );
    }

    #[test]
    fn test_three_modifier_permutations_come_first() {
        let names = generate_predefined_groups(
            &[Selector::Import],
            &[Modifier::Type, Modifier::Default, Modifier::Named],
        );
        assert_eq!(names.len(), 6 + 6 + 3 + 1);
        assert_eq!(names[0], "type-default-named-import");
        assert_eq!(names[6], "type-default-import");
        assert_eq!(names.last().map(String::as_str), Some("import"));
    }

    #[test]
    fn test_resolve_prefers_specific_group() {
        let options = SortOptions::new().with_groups(vec![
            GroupSlot::name("external"),
            GroupSlot::name("type-external"),
        ]);
        let cache = GroupCache::new();
        let resolver = GroupResolver::new(&options, &cache);
        let item = tagged("react", vec![Selector::External], vec![Modifier::Type]);
        assert_eq!(resolver.resolve(&item), "type-external");

        let unmatched = tagged("./x", vec![Selector::Sibling], vec![Modifier::Value]);
        assert_eq!(resolver.resolve(&unmatched), UNKNOWN_GROUP);
    }

    #[test]
    fn test_custom_group_wins_only_when_declared() {
        let custom = CustomGroup::new(
            "react",
            ElementMatcher {
                element_name_pattern: Some(
                    crate::config::RegexOption::new("^react").expect("Failed to compile pattern"),
                ),
                ..ElementMatcher::default()
            },
        );
        let item = tagged("react", vec![Selector::External], vec![Modifier::Value]);
        let cache = GroupCache::new();

        let declared = SortOptions::new()
            .with_groups(vec![GroupSlot::name("react"), GroupSlot::name("external")])
            .with_custom_groups(vec![custom.clone()]);
        assert_eq!(GroupResolver::new(&declared, &cache).resolve(&item), "react");

        let undeclared = SortOptions::new()
            .with_groups(vec![GroupSlot::name("external")])
            .with_custom_groups(vec![custom]);
        assert_eq!(GroupResolver::new(&undeclared, &cache).resolve(&item), "external");
    }

    #[test]
    fn test_cache_is_optional() {
        let options = SortOptions::new().with_groups(vec![GroupSlot::name("value-external")]);
        let item = tagged("react", vec![Selector::External], vec![Modifier::Value]);

        let cache = GroupCache::new();
        let cached = GroupResolver::new(&options, &cache).resolve(&item);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());

        let disabled = GroupCache::disabled();
        assert_eq!(GroupResolver::new(&options, &disabled).resolve(&item), cached);
        assert!(disabled.is_empty());
    }

    #[test]
    fn test_vocabulary_group_names() {
        let vocabulary = Vocabulary {
            selectors: &[Selector::SideEffectStyle, Selector::Style, Selector::External],
            modifiers: &[Modifier::Type, Modifier::Value, Modifier::SideEffect],
        };
        assert!(vocabulary.is_predefined_group("external"));
        assert!(vocabulary.is_predefined_group("type-external"));
        assert!(vocabulary.is_predefined_group("value-side-effect-external"));
        assert!(vocabulary.is_predefined_group("side-effect-style"));
        assert!(!vocabulary.is_predefined_group("type-type-external"));
        assert!(!vocabulary.is_predefined_group("builtin"));
        assert!(!vocabulary.is_predefined_group("-external"));
    }
}

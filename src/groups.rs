//! Group declarations: slots, custom group matchers and list helpers

use crate::config::{check_keys, NewlinesOption, RegexOption, SortOverrides};
use crate::error::{SortError, SortResult};
use crate::item::{Item, Modifier, Selector, UNKNOWN_GROUP};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Per-group settings carried by an object slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupOverrides {
    /// One name, or several forming a subgroup
    pub names: Vec<String>,
    pub sort: SortOverrides,
    pub newlines_inside: Option<NewlinesOption>,
    /// Comment required above the first item of the group
    pub comment_above: Option<String>,
}

/// One entry of the declared group list
#[derive(Debug, Clone, PartialEq)]
pub enum GroupSlot {
    Name(String),
    /// Several groups sharing one slot, ordered among themselves by position
    Subgroup(Vec<String>),
    Overrides(GroupOverrides),
    /// Spacing directive between the surrounding groups
    NewlinesBetween(NewlinesOption),
}

impl GroupSlot {
    pub fn name(name: impl Into<String>) -> Self {
        GroupSlot::Name(name.into())
    }

    pub fn subgroup<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GroupSlot::Subgroup(names.into_iter().map(Into::into).collect())
    }

    /// Group names declared by this slot, empty for markers
    pub fn names(&self) -> &[String] {
        match self {
            GroupSlot::Name(name) => std::slice::from_ref(name),
            GroupSlot::Subgroup(names) => names,
            GroupSlot::Overrides(overrides) => &overrides.names,
            GroupSlot::NewlinesBetween(_) => &[],
        }
    }

    pub fn contains(&self, group: &str) -> bool {
        self.names().iter().any(|name| name == group)
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, GroupSlot::NewlinesBetween(_))
    }

    pub fn overrides(&self) -> Option<&GroupOverrides> {
        match self {
            GroupSlot::Overrides(overrides) => Some(overrides),
            _ => None,
        }
    }

    /// Position of `group` inside a multi-name slot
    pub fn subgroup_position(&self, group: &str) -> Option<usize> {
        let names = self.names();
        if names.len() < 2 {
            return None;
        }
        names.iter().position(|name| name == group)
    }
}

/// Slot index of `group`; undeclared groups land after every slot
pub fn group_index(slots: &[GroupSlot], group: &str) -> usize {
    slots
        .iter()
        .position(|slot| slot.contains(group))
        .unwrap_or(slots.len())
}

/// Every declared group name, in declaration order
pub fn group_names(slots: &[GroupSlot]) -> Vec<&str> {
    slots
        .iter()
        .flat_map(|slot| slot.names().iter().map(String::as_str))
        .collect()
}

/// Spacing between two different slots, honoring markers declared between them
pub fn newlines_between(
    slots: &[GroupSlot],
    left: usize,
    right: usize,
    default: NewlinesOption,
) -> NewlinesOption {
    let (low, high) = if left <= right { (left, right) } else { (right, left) };
    let high = high.min(slots.len());
    if low >= high {
        return default;
    }

    let markers: Vec<NewlinesOption> = slots[low..high]
        .iter()
        .filter_map(|slot| match slot {
            GroupSlot::NewlinesBetween(value) => Some(*value),
            _ => None,
        })
        .collect();

    if markers.is_empty() {
        return default;
    }
    markers
        .iter()
        .filter_map(|value| match value {
            NewlinesOption::Count(n) => Some(*n),
            NewlinesOption::Ignore => None,
        })
        .max()
        .map(NewlinesOption::Count)
        .unwrap_or(NewlinesOption::Ignore)
}

/// Comment required above the group declared at `slot_index`
pub fn comment_above(slots: &[GroupSlot], slot_index: usize) -> Option<&str> {
    slots
        .get(slot_index)
        .and_then(GroupSlot::overrides)
        .and_then(|o| o.comment_above.as_deref())
}

/// Drop empty subgroups and collapse one-name subgroups into plain names
pub fn clean_groups(slots: Vec<GroupSlot>) -> Vec<GroupSlot> {
    slots
        .into_iter()
        .filter_map(|slot| match slot {
            GroupSlot::Subgroup(names) if names.is_empty() => None,
            GroupSlot::Subgroup(mut names) if names.len() == 1 => names.pop().map(GroupSlot::Name),
            other => Some(other),
        })
        .collect()
}

/// Structural checks: duplicates, consecutive markers, empty object slots
pub fn validate_groups(slots: &[GroupSlot]) -> SortResult<()> {
    if slots
        .iter()
        .tuple_windows()
        .any(|(left, right)| left.is_marker() && right.is_marker())
    {
        return Err(SortError::ConsecutiveNewlinesMarkers);
    }

    if slots
        .iter()
        .any(|slot| matches!(slot, GroupSlot::Overrides(o) if o.names.is_empty()))
    {
        return Err(SortError::invalid_option(
            "groups",
            "group objects must name at least one group",
        ));
    }

    let duplicates: Vec<&str> = group_names(slots).into_iter().duplicates().collect();
    if !duplicates.is_empty() {
        return Err(SortError::duplicated_groups(duplicates));
    }

    Ok(())
}

/// Reject names that are neither predefined, custom, nor `unknown`
pub fn validate_group_names<F>(
    slots: &[GroupSlot],
    custom_groups: &[CustomGroup],
    is_predefined: F,
) -> SortResult<()>
where
    F: Fn(&str) -> bool,
{
    let invalid: Vec<&str> = group_names(slots)
        .into_iter()
        .filter(|name| {
            *name != UNKNOWN_GROUP
                && !is_predefined(name)
                && !custom_groups.iter().any(|c| c.group_name == *name)
        })
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(SortError::invalid_groups(invalid))
    }
}

/// Conditions an item must meet to join a custom group
#[derive(Debug, Clone, Default)]
pub struct ElementMatcher {
    pub selector: Option<Selector>,
    /// All of these must be present
    pub modifiers: Vec<Modifier>,
    pub element_name_pattern: Option<RegexOption>,
}

impl ElementMatcher {
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(selector) = self.selector {
            if !item.tags.has_selector(selector) {
                return false;
            }
        }
        if !self
            .modifiers
            .iter()
            .all(|modifier| item.tags.has_modifier(*modifier))
        {
            return false;
        }
        self.element_name_pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(&item.name))
    }

    fn from_map(map: &Map<String, Value>) -> SortResult<Self> {
        let selector = map
            .get("selector")
            .map(|value| parse_tag::<Selector>(value, "selector"))
            .transpose()?;
        let modifiers = match map.get("modifiers") {
            None => Vec::new(),
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| parse_tag::<Modifier>(value, "modifiers"))
                .collect::<SortResult<_>>()?,
            Some(_) => {
                return Err(SortError::invalid_option("modifiers", "must be an array"));
            }
        };
        let element_name_pattern = map
            .get("elementNamePattern")
            .map(RegexOption::from_json)
            .transpose()?;
        Ok(Self {
            selector,
            modifiers,
            element_name_pattern,
        })
    }
}

fn parse_tag<T>(value: &Value, option: &str) -> SortResult<T>
where
    T: FromStr<Err = SortError>,
{
    value
        .as_str()
        .ok_or_else(|| SortError::invalid_option(option, "must be a string"))?
        .parse()
}

#[derive(Debug, Clone)]
pub enum GroupMatcher {
    Element(ElementMatcher),
    AnyOf(Vec<ElementMatcher>),
}

impl GroupMatcher {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            GroupMatcher::Element(matcher) => matcher.matches(item),
            GroupMatcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(item)),
        }
    }
}

/// User-declared group, tested before predefined groups
#[derive(Debug, Clone)]
pub struct CustomGroup {
    pub group_name: String,
    pub matcher: GroupMatcher,
    pub sort: SortOverrides,
    pub newlines_inside: Option<NewlinesOption>,
}

impl CustomGroup {
    pub fn new(group_name: impl Into<String>, matcher: ElementMatcher) -> Self {
        Self {
            group_name: group_name.into(),
            matcher: GroupMatcher::Element(matcher),
            sort: SortOverrides::default(),
            newlines_inside: None,
        }
    }

    pub fn any_of(group_name: impl Into<String>, matchers: Vec<ElementMatcher>) -> Self {
        Self {
            group_name: group_name.into(),
            matcher: GroupMatcher::AnyOf(matchers),
            sort: SortOverrides::default(),
            newlines_inside: None,
        }
    }

    pub fn with_sort(mut self, sort: SortOverrides) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.matcher.matches(item)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawGroupSlot {
    Name(String),
    Subgroup(Vec<String>),
    Object(Map<String, Value>),
}

impl RawGroupSlot {
    pub fn into_slot(self) -> SortResult<GroupSlot> {
        match self {
            RawGroupSlot::Name(name) => Ok(GroupSlot::Name(name)),
            RawGroupSlot::Subgroup(names) => Ok(GroupSlot::Subgroup(names)),
            RawGroupSlot::Object(map) => {
                if let Some(value) = map.get("newlinesBetween") {
                    check_keys(&map, &["newlinesBetween"], "groups")?;
                    return Ok(GroupSlot::NewlinesBetween(serde_json::from_value(
                        value.clone(),
                    )?));
                }
                check_keys(
                    &map,
                    &[
                        "group",
                        "commentAbove",
                        "newlinesInside",
                        "type",
                        "order",
                        "fallbackSort",
                    ],
                    "groups",
                )?;
                let names = match map.get("group") {
                    Some(Value::String(name)) => vec![name.clone()],
                    Some(Value::Array(values)) => values
                        .iter()
                        .map(|value| {
                            value.as_str().map(str::to_string).ok_or_else(|| {
                                SortError::invalid_option("groups.group", "must contain strings")
                            })
                        })
                        .collect::<SortResult<_>>()?,
                    _ => {
                        return Err(SortError::invalid_option(
                            "groups.group",
                            "must be a string or an array of strings",
                        ))
                    }
                };
                let comment_above = match map.get("commentAbove") {
                    None => None,
                    Some(Value::String(text)) => Some(text.clone()),
                    Some(_) => {
                        return Err(SortError::invalid_option(
                            "groups.commentAbove",
                            "must be a string",
                        ))
                    }
                };
                let newlines_inside = map
                    .get("newlinesInside")
                    .map(|value| serde_json::from_value(value.clone()))
                    .transpose()?;
                Ok(GroupSlot::Overrides(GroupOverrides {
                    names,
                    sort: SortOverrides::from_map(&map)?,
                    newlines_inside,
                    comment_above,
                }))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct RawCustomGroup(pub Map<String, Value>);

impl RawCustomGroup {
    pub fn into_custom_group(self) -> SortResult<CustomGroup> {
        let map = self.0;
        check_keys(
            &map,
            &[
                "groupName",
                "selector",
                "modifiers",
                "elementNamePattern",
                "anyOf",
                "type",
                "order",
                "fallbackSort",
                "newlinesInside",
            ],
            "customGroups",
        )?;

        let group_name = map
            .get("groupName")
            .and_then(Value::as_str)
            .ok_or_else(|| SortError::invalid_option("customGroups.groupName", "must be a string"))?
            .to_string();

        let matcher = match map.get("anyOf") {
            Some(Value::Array(entries)) => {
                if ["selector", "modifiers", "elementNamePattern"]
                    .iter()
                    .any(|key| map.contains_key(*key))
                {
                    return Err(SortError::invalid_option(
                        "customGroups.anyOf",
                        "cannot be combined with selector, modifiers or elementNamePattern",
                    ));
                }
                let matchers = entries
                    .iter()
                    .map(|entry| {
                        let entry = entry.as_object().ok_or_else(|| {
                            SortError::invalid_option("customGroups.anyOf", "entries must be objects")
                        })?;
                        check_keys(
                            entry,
                            &["selector", "modifiers", "elementNamePattern"],
                            "customGroups.anyOf",
                        )?;
                        ElementMatcher::from_map(entry)
                    })
                    .collect::<SortResult<_>>()?;
                GroupMatcher::AnyOf(matchers)
            }
            Some(_) => {
                return Err(SortError::invalid_option(
                    "customGroups.anyOf",
                    "must be an array",
                ))
            }
            None => GroupMatcher::Element(ElementMatcher::from_map(&map)?),
        };

        let newlines_inside = map
            .get("newlinesInside")
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()?;

        Ok(CustomGroup {
            group_name,
            matcher,
            sort: SortOverrides::from_map(&map)?,
            newlines_inside,
        })
    }
}

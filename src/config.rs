//! Configuration management for sort operations

use crate::error::{SortError, SortResult};
use crate::groups::{self, CustomGroup, GroupSlot, RawCustomGroup, RawGroupSlot};
use crate::item::{Comment, CommentKind};
use regex::{Regex, RegexBuilder};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Comparator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortType {
    /// Locale-aware comparison of formatted names
    Alphabetical,
    /// Like alphabetical, but numeric runs compare by value
    Natural,
    /// Compare item sizes
    LineLength,
    /// Position inside a user alphabet
    Custom,
    /// Keep the source order
    Unsorted,
    /// Position of the item's group inside its declared subgroup
    SubgroupOrder,
    /// Type-only items before value items
    TypeImportFirst,
}

/// Sort order enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// How non-letter characters are treated before comparing names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialCharacters {
    #[default]
    Keep,
    Trim,
    Remove,
}

/// Blank-line policy between two items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewlinesOption {
    /// Leave the existing separator untouched
    #[default]
    Ignore,
    /// Force exactly this many blank lines
    Count(u32),
}

/// Partition ordering inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderBy {
    #[default]
    Source,
    TypeFirst,
}

/// Name an import declaration sorts by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportsOrderBy {
    /// Module source path
    #[default]
    Path,
    /// First local binding
    Alias,
    /// First imported name, falling back to the local binding
    Specifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStability {
    #[default]
    Stable,
    Unstable,
}

/// Naming conventions recognized by the casing-priority pre-sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum CasingKind {
    #[serde(rename = "camelCase")]
    CamelCase,
    #[serde(rename = "PascalCase")]
    PascalCase,
    #[serde(rename = "UPPER_CASE")]
    UpperCase,
    #[serde(rename = "snake_case")]
    SnakeCase,
    #[serde(rename = "kebab-case")]
    KebabCase,
}

/// Comparator applied when the primary comparator reports a tie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackSort {
    pub sort_type: SortType,
    /// Defaults to the primary order
    pub order: Option<SortOrder>,
}

impl Default for FallbackSort {
    fn default() -> Self {
        Self {
            sort_type: SortType::Unsorted,
            order: None,
        }
    }
}

/// One or more regular expressions; matches when any of them matches
#[derive(Debug, Clone)]
pub struct RegexOption {
    patterns: Vec<Regex>,
}

impl RegexOption {
    pub fn new(pattern: &str) -> SortResult<Self> {
        Self::with_flags(pattern, "")
    }

    /// Compile a pattern with JavaScript-style flags
    pub fn with_flags(pattern: &str, flags: &str) -> SortResult<Self> {
        Ok(Self {
            patterns: vec![compile_pattern(pattern, flags)?],
        })
    }

    /// Parse a string, a `{ pattern, flags }` object, or an array of those
    pub fn from_json(value: &Value) -> SortResult<Self> {
        match value {
            Value::Array(entries) => {
                let mut patterns = Vec::with_capacity(entries.len());
                for entry in entries {
                    patterns.push(parse_single_pattern(entry)?);
                }
                Ok(Self { patterns })
            }
            other => Ok(Self {
                patterns: vec![parse_single_pattern(other)?],
            }),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(text))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|regex| regex.as_str())
    }
}

fn parse_single_pattern(value: &Value) -> SortResult<Regex> {
    match value {
        Value::String(pattern) => compile_pattern(pattern, ""),
        Value::Object(map) => {
            check_keys(map, &["pattern", "flags"], "regex option")?;
            let pattern = match map.get("pattern") {
                Some(Value::String(pattern)) => pattern,
                _ => return Err(SortError::RegexNotString),
            };
            let flags = match map.get("flags") {
                None => "",
                Some(Value::String(flags)) => flags.as_str(),
                Some(_) => return Err(SortError::invalid_option("flags", "must be a string")),
            };
            compile_pattern(pattern, flags)
        }
        _ => Err(SortError::RegexNotString),
    }
}

fn compile_pattern(pattern: &str, flags: &str) -> SortResult<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'g' | 'u' | 'v' | 'y' | 'd' => {}
            other => {
                return Err(SortError::invalid_regex(
                    pattern,
                    &format!("unsupported flag `{other}`"),
                ))
            }
        }
    }
    builder
        .build()
        .map_err(|e| SortError::invalid_regex(pattern, &e.to_string()))
}

/// Which comments of one kind start a new partition
#[derive(Debug, Clone, Default)]
pub enum CommentMatcher {
    #[default]
    Off,
    Any,
    Pattern(RegexOption),
}

impl CommentMatcher {
    fn from_json(value: &Value) -> SortResult<Self> {
        match value {
            Value::Bool(true) => Ok(CommentMatcher::Any),
            Value::Bool(false) => Ok(CommentMatcher::Off),
            other => Ok(CommentMatcher::Pattern(RegexOption::from_json(other)?)),
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            CommentMatcher::Off => false,
            CommentMatcher::Any => true,
            CommentMatcher::Pattern(regex) => regex.is_match(text),
        }
    }

    fn is_enabled(&self) -> bool {
        !matches!(self, CommentMatcher::Off)
    }
}

/// Partition-by-comment configuration, split by comment kind
#[derive(Debug, Clone, Default)]
pub struct PartitionByComment {
    pub block: CommentMatcher,
    pub line: CommentMatcher,
}

impl PartitionByComment {
    pub fn any() -> Self {
        Self {
            block: CommentMatcher::Any,
            line: CommentMatcher::Any,
        }
    }

    pub fn pattern(regex: RegexOption) -> Self {
        Self {
            block: CommentMatcher::Pattern(regex.clone()),
            line: CommentMatcher::Pattern(regex),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.block.is_enabled() || self.line.is_enabled()
    }

    /// Test a comment's trimmed content
    pub fn matches(&self, comment: &Comment) -> bool {
        let text = comment.text.trim();
        match comment.kind {
            CommentKind::Block => self.block.matches(text),
            CommentKind::Line => self.line.matches(text),
        }
    }

    /// Parse `true`, a regex option, or a `{ block, line }` object
    pub fn from_json(value: &Value) -> SortResult<Self> {
        match value {
            Value::Bool(true) => Ok(Self::any()),
            Value::Bool(false) => Ok(Self::default()),
            Value::Object(map) if !map.contains_key("pattern") => {
                check_keys(map, &["block", "line"], "partitionByComment")?;
                if map.is_empty() {
                    return Err(SortError::EmptyCommentPattern);
                }
                let block = match map.get("block") {
                    Some(value) => CommentMatcher::from_json(value)?,
                    None => CommentMatcher::Off,
                };
                let line = match map.get("line") {
                    Some(value) => CommentMatcher::from_json(value)?,
                    None => CommentMatcher::Off,
                };
                Ok(Self { block, line })
            }
            other => Ok(Self::pattern(RegexOption::from_json(other)?)),
        }
    }
}

/// Boundary signals and partition ordering
#[derive(Debug, Clone, Default)]
pub struct PartitionSettings {
    pub split_by_comments: PartitionByComment,
    pub split_by_newlines: bool,
    /// Chunk size cap; `None` disables chunking
    pub max_items: Option<usize>,
    pub order_by: OrderBy,
    pub order_stability: OrderStability,
}

/// Partition configuration
#[derive(Debug, Clone)]
pub enum PartitionPolicy {
    /// The whole scope is one partition
    Merge,
    Split(PartitionSettings),
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        PartitionPolicy::Split(PartitionSettings::default())
    }
}

impl PartitionPolicy {
    pub fn split_by_newlines(&self) -> bool {
        matches!(self, PartitionPolicy::Split(settings) if settings.split_by_newlines)
    }

    pub fn split_by_comments(&self) -> Option<&PartitionByComment> {
        match self {
            PartitionPolicy::Split(settings) if settings.split_by_comments.is_enabled() => {
                Some(&settings.split_by_comments)
            }
            _ => None,
        }
    }

    fn from_json(value: &Value) -> SortResult<Self> {
        match value {
            Value::String(keyword) if keyword == "merge" => Ok(PartitionPolicy::Merge),
            Value::Object(map) => {
                check_keys(
                    map,
                    &["splitBy", "maxItems", "maxImports", "orderBy", "orderStability"],
                    "partitions",
                )?;
                let mut settings = PartitionSettings::default();
                if let Some(split_by) = map.get("splitBy") {
                    let split_by = split_by.as_object().ok_or_else(|| {
                        SortError::invalid_option("partitions.splitBy", "must be an object")
                    })?;
                    check_keys(split_by, &["comments", "newlines"], "partitions.splitBy")?;
                    if let Some(comments) = split_by.get("comments") {
                        settings.split_by_comments = PartitionByComment::from_json(comments)?;
                    }
                    if let Some(newlines) = split_by.get("newlines") {
                        settings.split_by_newlines = newlines.as_bool().ok_or_else(|| {
                            SortError::invalid_option("partitions.splitBy.newlines", "must be a boolean")
                        })?;
                    }
                }
                if let Some(max) = map.get("maxItems").or_else(|| map.get("maxImports")) {
                    settings.max_items = parse_max_items(max)?;
                }
                if let Some(order_by) = map.get("orderBy") {
                    settings.order_by = serde_json::from_value(order_by.clone())?;
                }
                if let Some(stability) = map.get("orderStability") {
                    settings.order_stability = serde_json::from_value(stability.clone())?;
                }
                Ok(PartitionPolicy::Split(settings))
            }
            _ => Err(SortError::invalid_option(
                "partitions",
                "expected \"merge\" or an object",
            )),
        }
    }
}

fn parse_max_items(value: &Value) -> SortResult<Option<usize>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => match number.as_u64() {
            Some(n) if n > 0 => Ok(Some(n as usize)),
            _ => Err(SortError::invalid_option(
                "partitions.maxItems",
                "must be a positive integer",
            )),
        },
        _ => Err(SortError::invalid_option(
            "partitions.maxItems",
            "must be a positive integer or null",
        )),
    }
}

/// Comparator configuration shared by the whole scope and overridable per group
#[derive(Debug, Clone, PartialEq)]
pub struct SortSettings {
    pub sort_type: SortType,
    pub order: SortOrder,
    pub ignore_case: bool,
    pub special_characters: SpecialCharacters,
    pub locales: Vec<String>,
    pub alphabet: String,
    pub fallback_sort: FallbackSort,
    pub casing_priority: Vec<CasingKind>,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            sort_type: SortType::Alphabetical,
            order: SortOrder::Asc,
            ignore_case: true,
            special_characters: SpecialCharacters::Keep,
            locales: vec!["en-US".to_string()],
            alphabet: String::new(),
            fallback_sort: FallbackSort::default(),
            casing_priority: Vec::new(),
        }
    }
}

impl SortSettings {
    /// Settings for the fallback comparator
    pub fn for_fallback(&self) -> SortSettings {
        SortSettings {
            sort_type: self.fallback_sort.sort_type,
            order: self.fallback_sort.order.unwrap_or(self.order),
            fallback_sort: FallbackSort::default(),
            casing_priority: Vec::new(),
            ..self.clone()
        }
    }

    fn uses_custom_alphabet(&self) -> bool {
        self.sort_type == SortType::Custom || self.fallback_sort.sort_type == SortType::Custom
    }
}

/// Comparator fields a group or custom group may override
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortOverrides {
    pub sort_type: Option<SortType>,
    pub order: Option<SortOrder>,
    pub fallback_sort: Option<FallbackSort>,
}

impl SortOverrides {
    pub fn is_empty(&self) -> bool {
        self.sort_type.is_none() && self.order.is_none() && self.fallback_sort.is_none()
    }

    pub fn apply(&self, base: &SortSettings) -> SortSettings {
        let mut settings = base.clone();
        if let Some(sort_type) = self.sort_type {
            settings.sort_type = sort_type;
        }
        if let Some(order) = self.order {
            settings.order = order;
        }
        if let Some(fallback) = self.fallback_sort {
            settings.fallback_sort = fallback;
        }
        settings
    }

    pub(crate) fn from_map(map: &Map<String, Value>) -> SortResult<Self> {
        Ok(Self {
            sort_type: map
                .get("type")
                .map(|v| serde_json::from_value(v.clone()))
                .transpose()?,
            order: map
                .get("order")
                .map(|v| serde_json::from_value(v.clone()))
                .transpose()?,
            fallback_sort: map
                .get("fallbackSort")
                .map(|v| serde_json::from_value::<RawFallbackSort>(v.clone()))
                .transpose()?
                .map(RawFallbackSort::into_fallback)
                .transpose()?,
        })
    }
}

/// Main configuration structure for sort operations
#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    /// Comparator configuration
    pub sort: SortSettings,
    /// Declared group slots, in precedence order
    pub groups: Vec<GroupSlot>,
    /// Custom group matchers, evaluated before predefined groups
    pub custom_groups: Vec<CustomGroup>,
    pub partitions: PartitionPolicy,
    pub newlines_between: NewlinesOption,
    pub newlines_inside: NewlinesOption,
}

impl SortOptions {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, sort_type: SortType) -> Self {
        self.sort.sort_type = sort_type;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.sort.order = order;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.sort.ignore_case = ignore_case;
        self
    }

    pub fn with_special_characters(mut self, special_characters: SpecialCharacters) -> Self {
        self.sort.special_characters = special_characters;
        self
    }

    pub fn with_locales<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort.locales = locales.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alphabet(mut self, alphabet: impl Into<String>) -> Self {
        self.sort.alphabet = alphabet.into();
        self
    }

    pub fn with_fallback_sort(mut self, fallback_sort: FallbackSort) -> Self {
        self.sort.fallback_sort = fallback_sort;
        self
    }

    pub fn with_casing_priority(mut self, casing_priority: Vec<CasingKind>) -> Self {
        self.sort.casing_priority = casing_priority;
        self
    }

    pub fn with_groups(mut self, groups: Vec<GroupSlot>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_custom_groups(mut self, custom_groups: Vec<CustomGroup>) -> Self {
        self.custom_groups = custom_groups;
        self
    }

    pub fn with_partitions(mut self, partitions: PartitionPolicy) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_newlines_between(mut self, newlines: NewlinesOption) -> Self {
        self.newlines_between = newlines;
        self
    }

    pub fn with_newlines_inside(mut self, newlines: NewlinesOption) -> Self {
        self.newlines_inside = newlines;
        self
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> SortResult<()> {
        let uses_custom = self.sort.uses_custom_alphabet()
            || self.groups.iter().any(|slot| {
                slot.overrides().is_some_and(|o| {
                    o.sort.sort_type == Some(SortType::Custom)
                        || o.sort.fallback_sort.is_some_and(|f| f.sort_type == SortType::Custom)
                })
            })
            || self
                .custom_groups
                .iter()
                .any(|group| group.sort.sort_type == Some(SortType::Custom));
        if uses_custom && self.sort.alphabet.is_empty() {
            return Err(SortError::empty_alphabet());
        }

        groups::validate_groups(&self.groups)?;

        for custom_group in &self.custom_groups {
            if custom_group.group_name.is_empty() {
                return Err(SortError::invalid_option(
                    "customGroups.groupName",
                    "must not be empty",
                ));
            }
        }

        Ok(())
    }

    /// Drop empty subgroups and collapse single-name subgroups
    pub fn normalize(&mut self) {
        self.groups = groups::clean_groups(std::mem::take(&mut self.groups));
    }

    /// Comparator settings for items resolved to `group` in the slot at `slot_index`
    pub fn settings_for(&self, slot_index: usize, group: &str) -> SortSettings {
        let mut settings = self.sort.clone();
        if let Some(custom) = self.custom_groups.iter().find(|c| c.group_name == group) {
            settings = custom.sort.apply(&settings);
        }
        if let Some(overrides) = self.groups.get(slot_index).and_then(GroupSlot::overrides) {
            settings = overrides.sort.apply(&settings);
        }
        settings
    }

    /// Blank lines required between two items of the same group
    pub fn newlines_inside_for(&self, group: &str) -> NewlinesOption {
        let slot_index = groups::group_index(&self.groups, group);
        if let Some(value) = self
            .groups
            .get(slot_index)
            .and_then(GroupSlot::overrides)
            .and_then(|o| o.newlines_inside)
        {
            return value;
        }
        self.custom_groups
            .iter()
            .find(|c| c.group_name == group)
            .and_then(|c| c.newlines_inside)
            .unwrap_or(self.newlines_inside)
    }

    /// Blank lines required between items of two different group slots
    pub fn newlines_between_for(&self, left_slot: usize, right_slot: usize) -> NewlinesOption {
        groups::newlines_between(&self.groups, left_slot, right_slot, self.newlines_between)
    }
}

impl FromStr for SortType {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alphabetical" => Ok(SortType::Alphabetical),
            "natural" => Ok(SortType::Natural),
            "line-length" => Ok(SortType::LineLength),
            "custom" => Ok(SortType::Custom),
            "unsorted" => Ok(SortType::Unsorted),
            "subgroup-order" => Ok(SortType::SubgroupOrder),
            "type-import-first" => Ok(SortType::TypeImportFirst),
            _ => Err(SortError::parse_error(&format!("unknown sort type: {s}"))),
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortType::Alphabetical => "alphabetical",
            SortType::Natural => "natural",
            SortType::LineLength => "line-length",
            SortType::Custom => "custom",
            SortType::Unsorted => "unsorted",
            SortType::SubgroupOrder => "subgroup-order",
            SortType::TypeImportFirst => "type-import-first",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SortOrder {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(SortError::parse_error(&format!("unknown sort order: {s}"))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SpecialCharacters {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(SpecialCharacters::Keep),
            "trim" => Ok(SpecialCharacters::Trim),
            "remove" => Ok(SpecialCharacters::Remove),
            _ => Err(SortError::parse_error(&format!(
                "unknown specialCharacters value: {s}"
            ))),
        }
    }
}

impl fmt::Display for SpecialCharacters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecialCharacters::Keep => write!(f, "keep"),
            SpecialCharacters::Trim => write!(f, "trim"),
            SpecialCharacters::Remove => write!(f, "remove"),
        }
    }
}

impl FromStr for NewlinesOption {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ignore" {
            return Ok(NewlinesOption::Ignore);
        }
        s.parse::<u32>()
            .map(NewlinesOption::Count)
            .map_err(|_| SortError::parse_error(&format!("invalid newlines value: {s}")))
    }
}

impl fmt::Display for NewlinesOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewlinesOption::Ignore => write!(f, "ignore"),
            NewlinesOption::Count(n) => write!(f, "{n}"),
        }
    }
}

impl<'de> Deserialize<'de> for NewlinesOption {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NewlinesVisitor;

        impl<'de> Visitor<'de> for NewlinesVisitor {
            type Value = NewlinesOption;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"ignore\" or a non-negative integer")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                match value {
                    "ignore" => Ok(NewlinesOption::Ignore),
                    _ => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
                }
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                u32::try_from(value)
                    .map(NewlinesOption::Count)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u32::try_from(value)
                    .map(NewlinesOption::Count)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
            }
        }

        deserializer.deserialize_any(NewlinesVisitor)
    }
}

impl FromStr for CasingKind {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camelCase" => Ok(CasingKind::CamelCase),
            "PascalCase" => Ok(CasingKind::PascalCase),
            "UPPER_CASE" => Ok(CasingKind::UpperCase),
            "snake_case" => Ok(CasingKind::SnakeCase),
            "kebab-case" => Ok(CasingKind::KebabCase),
            _ => Err(SortError::parse_error(&format!("unknown casing: {s}"))),
        }
    }
}

impl fmt::Display for CasingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CasingKind::CamelCase => "camelCase",
            CasingKind::PascalCase => "PascalCase",
            CasingKind::UpperCase => "UPPER_CASE",
            CasingKind::SnakeCase => "snake_case",
            CasingKind::KebabCase => "kebab-case",
        };
        write!(f, "{name}")
    }
}

impl FromStr for OrderBy {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(OrderBy::Source),
            "type-first" => Ok(OrderBy::TypeFirst),
            _ => Err(SortError::parse_error(&format!("unknown partition order: {s}"))),
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderBy::Source => write!(f, "source"),
            OrderBy::TypeFirst => write!(f, "type-first"),
        }
    }
}

impl FromStr for ImportsOrderBy {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(ImportsOrderBy::Path),
            "alias" => Ok(ImportsOrderBy::Alias),
            "specifier" => Ok(ImportsOrderBy::Specifier),
            _ => Err(SortError::parse_error(&format!("unknown imports order: {s}"))),
        }
    }
}

impl fmt::Display for ImportsOrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportsOrderBy::Path => write!(f, "path"),
            ImportsOrderBy::Alias => write!(f, "alias"),
            ImportsOrderBy::Specifier => write!(f, "specifier"),
        }
    }
}

impl FromStr for OrderStability {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(OrderStability::Stable),
            "unstable" => Ok(OrderStability::Unstable),
            _ => Err(SortError::parse_error(&format!("unknown order stability: {s}"))),
        }
    }
}

impl fmt::Display for OrderStability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStability::Stable => write!(f, "stable"),
            OrderStability::Unstable => write!(f, "unstable"),
        }
    }
}

/// Reject keys outside the allowed list
pub(crate) fn check_keys(map: &Map<String, Value>, allowed: &[&str], scope: &str) -> SortResult<()> {
    let unknown: Vec<&String> = map
        .keys()
        .filter(|key| !allowed.contains(&key.as_str()))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(SortError::unknown_option(scope, unknown.into_iter().cloned()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawLocales {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct RawFallbackSort {
    #[serde(rename = "type")]
    pub sort_type: SortType,
    pub order: Option<SortOrder>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

impl RawFallbackSort {
    fn into_fallback(self) -> SortResult<FallbackSort> {
        if !self.unknown.is_empty() {
            return Err(SortError::unknown_option("fallbackSort", self.unknown.into_keys()));
        }
        Ok(FallbackSort {
            sort_type: self.sort_type,
            order: self.order,
        })
    }
}

/// Options as they appear in JSON, before merging over defaults
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSortOptions {
    #[serde(rename = "type")]
    pub sort_type: Option<SortType>,
    pub order: Option<SortOrder>,
    pub ignore_case: Option<bool>,
    pub special_characters: Option<SpecialCharacters>,
    pub locales: Option<RawLocales>,
    pub alphabet: Option<String>,
    pub fallback_sort: Option<RawFallbackSort>,
    pub casing_priority: Option<Vec<CasingKind>>,
    pub groups: Option<Vec<RawGroupSlot>>,
    pub custom_groups: Option<Vec<RawCustomGroup>>,
    pub partitions: Option<Value>,
    pub newlines_between: Option<NewlinesOption>,
    pub newlines_inside: Option<NewlinesOption>,
    pub partition_by_comment: Option<Value>,
    pub partition_by_new_line: Option<bool>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

/// Keys accepted in the shared settings block
const SETTINGS_KEYS: &[&str] = &[
    "type",
    "order",
    "ignoreCase",
    "specialCharacters",
    "locales",
    "alphabet",
    "fallbackSort",
    "newlinesBetween",
    "newlinesInside",
    "partitionByComment",
    "partitionByNewLine",
];

impl RawSortOptions {
    /// Parse the shared settings block, which accepts a subset of keys
    pub fn settings_from_json(value: &Value) -> SortResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SortError::invalid_option("settings", "must be an object"))?;
        check_keys(map, SETTINGS_KEYS, "settings")?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Merge these options over `target`
    pub fn apply(self, target: &mut SortOptions, scope: &str) -> SortResult<()> {
        if !self.unknown.is_empty() {
            return Err(SortError::unknown_option(scope, self.unknown.into_keys()));
        }

        if let Some(sort_type) = self.sort_type {
            target.sort.sort_type = sort_type;
        }
        if let Some(order) = self.order {
            target.sort.order = order;
        }
        if let Some(ignore_case) = self.ignore_case {
            target.sort.ignore_case = ignore_case;
        }
        if let Some(special_characters) = self.special_characters {
            target.sort.special_characters = special_characters;
        }
        if let Some(locales) = self.locales {
            target.sort.locales = match locales {
                RawLocales::One(locale) => vec![locale],
                RawLocales::Many(locales) => locales,
            };
        }
        if let Some(alphabet) = self.alphabet {
            target.sort.alphabet = alphabet;
        }
        if let Some(fallback) = self.fallback_sort {
            target.sort.fallback_sort = fallback.into_fallback()?;
        }
        if let Some(casing_priority) = self.casing_priority {
            target.sort.casing_priority = casing_priority;
        }
        if let Some(slots) = self.groups {
            target.groups = slots
                .into_iter()
                .map(RawGroupSlot::into_slot)
                .collect::<SortResult<_>>()?;
        }
        if let Some(custom_groups) = self.custom_groups {
            target.custom_groups = custom_groups
                .into_iter()
                .map(RawCustomGroup::into_custom_group)
                .collect::<SortResult<_>>()?;
        }
        if let Some(partitions) = self.partitions {
            target.partitions = PartitionPolicy::from_json(&partitions)?;
        }
        if let Some(newlines) = self.newlines_between {
            target.newlines_between = newlines;
        }
        if let Some(newlines) = self.newlines_inside {
            target.newlines_inside = newlines;
        }
        if let Some(comment) = self.partition_by_comment {
            let split_by_comments = PartitionByComment::from_json(&comment)?;
            if let PartitionPolicy::Split(settings) = &mut target.partitions {
                settings.split_by_comments = split_by_comments;
            }
        }
        if let Some(newline) = self.partition_by_new_line {
            if let PartitionPolicy::Split(settings) = &mut target.partitions {
                settings.split_by_newlines = newline;
            }
        }
        Ok(())
    }
}

/// Builder pattern for creating configurations
pub struct SortOptionsBuilder {
    options: SortOptions,
}

impl SortOptionsBuilder {
    /// Start building from the engine defaults
    pub fn new() -> Self {
        Self {
            options: SortOptions::default(),
        }
    }

    /// Start building from existing options, e.g. a rule's defaults
    pub fn from_options(options: SortOptions) -> Self {
        Self { options }
    }

    pub fn sort_type(mut self, sort_type: SortType) -> Self {
        self.options.sort.sort_type = sort_type;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.options.sort.order = order;
        self
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.options.sort.ignore_case = ignore_case;
        self
    }

    pub fn alphabet(mut self, alphabet: &str) -> Self {
        self.options.sort.alphabet = alphabet.to_string();
        self
    }

    pub fn group(mut self, slot: GroupSlot) -> Self {
        self.options.groups.push(slot);
        self
    }

    pub fn custom_group(mut self, custom_group: CustomGroup) -> Self {
        self.options.custom_groups.push(custom_group);
        self
    }

    pub fn partitions(mut self, partitions: PartitionPolicy) -> Self {
        self.options.partitions = partitions;
        self
    }

    pub fn newlines_between(mut self, newlines: NewlinesOption) -> Self {
        self.options.newlines_between = newlines;
        self
    }

    pub fn newlines_inside(mut self, newlines: NewlinesOption) -> Self {
        self.options.newlines_inside = newlines;
        self
    }

    /// Merge a settings block, then an options object, both JSON
    pub fn merge_json(self, settings: Option<&Value>, options: Option<&Value>) -> SortResult<Self> {
        self.merge_scoped_json(settings, options, "options")
    }

    /// Like `merge_json`, naming `scope` when an options key is rejected
    pub fn merge_scoped_json(
        mut self,
        settings: Option<&Value>,
        options: Option<&Value>,
        scope: &str,
    ) -> SortResult<Self> {
        if let Some(settings) = settings {
            RawSortOptions::settings_from_json(settings)?.apply(&mut self.options, "settings")?;
        }
        if let Some(options) = options {
            let raw: RawSortOptions = serde_json::from_value(options.clone())?;
            raw.apply(&mut self.options, scope)?;
        }
        Ok(self)
    }

    /// Normalize and validate the final configuration
    pub fn build(mut self) -> SortResult<SortOptions> {
        self.options.normalize();
        self.options.validate()?;
        Ok(self.options)
    }
}

impl Default for SortOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Preset configurations for common use cases
pub mod presets {
    use super::*;

    /// Case-insensitive alphabetical order
    pub fn recommended_alphabetical() -> SortOptions {
        SortOptions::new().with_type(SortType::Alphabetical)
    }

    /// Natural order, so `item2` precedes `item10`
    pub fn recommended_natural() -> SortOptions {
        SortOptions::new().with_type(SortType::Natural)
    }

    /// Longest first
    pub fn recommended_line_length() -> SortOptions {
        SortOptions::new()
            .with_type(SortType::LineLength)
            .with_order(SortOrder::Desc)
    }

    /// Order by position in a user alphabet
    pub fn recommended_custom(alphabet: &str) -> SortOptions {
        SortOptions::new()
            .with_type(SortType::Custom)
            .with_alphabet(alphabet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::TextRange;
    use serde_json::json;

    #[test]
    fn test_default_options() {
        let options = SortOptions::default();
        assert_eq!(options.sort.sort_type, SortType::Alphabetical);
        assert_eq!(options.sort.order, SortOrder::Asc);
        assert!(options.sort.ignore_case);
        assert_eq!(options.newlines_between, NewlinesOption::Ignore);
        assert!(matches!(options.partitions, PartitionPolicy::Split(_)));
    }

    #[test]
    fn test_options_builder() {
        let options = SortOptionsBuilder::new()
            .sort_type(SortType::Natural)
            .order(SortOrder::Desc)
            .ignore_case(false)
            .build()
            .expect("Failed to build test options");

        assert_eq!(options.sort.sort_type, SortType::Natural);
        assert_eq!(options.sort.order, SortOrder::Desc);
        assert!(!options.sort.ignore_case);
    }

    #[test]
    fn test_custom_type_requires_alphabet() {
        let result = SortOptionsBuilder::new().sort_type(SortType::Custom).build();
        assert!(matches!(result, Err(SortError::EmptyAlphabet)));

        let options = SortOptionsBuilder::new()
            .sort_type(SortType::Custom)
            .alphabet("cba")
            .build()
            .expect("Failed to build custom options");
        assert_eq!(options.sort.alphabet, "cba");
    }

    #[test]
    fn test_custom_fallback_requires_alphabet() {
        let options = SortOptions::new().with_fallback_sort(FallbackSort {
            sort_type: SortType::Custom,
            order: None,
        });
        assert!(matches!(options.validate(), Err(SortError::EmptyAlphabet)));
    }

    #[test]
    fn test_sort_type_from_str() {
        assert_eq!(
            "line-length"
                .parse::<SortType>()
                .expect("Failed to parse line-length"),
            SortType::LineLength
        );
        assert!("random".parse::<SortType>().is_err());
        assert_eq!(SortType::SubgroupOrder.to_string(), "subgroup-order");
    }

    #[test]
    fn test_newlines_option_parsing() {
        assert_eq!(
            "ignore".parse::<NewlinesOption>().expect("Failed to parse ignore"),
            NewlinesOption::Ignore
        );
        assert_eq!(
            "2".parse::<NewlinesOption>().expect("Failed to parse count"),
            NewlinesOption::Count(2)
        );
        assert!("-1".parse::<NewlinesOption>().is_err());

        let parsed: NewlinesOption = serde_json::from_value(json!(1)).expect("Failed to deserialize count");
        assert_eq!(parsed, NewlinesOption::Count(1));
        assert!(serde_json::from_value::<NewlinesOption>(json!("always")).is_err());
    }

    #[test]
    fn test_regex_option_flags() {
        let regex = RegexOption::from_json(&json!({ "pattern": "^foo$", "flags": "i" }))
            .expect("Failed to compile regex option");
        assert!(regex.is_match("FOO"));

        let regex = RegexOption::from_json(&json!(["bar", { "pattern": "^foo$", "flags": "i" }]))
            .expect("Failed to compile regex array");
        assert!(regex.is_match("FOO"));
        assert!(regex.is_match("xbarx"));
        assert!(!regex.is_match("baz"));
    }

    #[test]
    fn test_regex_option_rejects_non_strings() {
        assert!(matches!(
            RegexOption::from_json(&json!(42)),
            Err(SortError::RegexNotString)
        ));
        assert!(matches!(
            RegexOption::from_json(&json!({ "pattern": true })),
            Err(SortError::RegexNotString)
        ));
        assert!(matches!(
            RegexOption::from_json(&json!("(")),
            Err(SortError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_partition_by_comment_parsing() {
        let any = PartitionByComment::from_json(&json!(true)).expect("Failed to parse true");
        let comment = Comment::new(TextRange::new(0, 10), CommentKind::Line, " Part 1");
        assert!(any.matches(&comment));

        let line_only = PartitionByComment::from_json(&json!({ "line": "^Part" }))
            .expect("Failed to parse line pattern");
        assert!(line_only.matches(&comment));
        let block = Comment::new(TextRange::new(0, 10), CommentKind::Block, " Part 2 ");
        assert!(!line_only.matches(&block));

        assert!(matches!(
            PartitionByComment::from_json(&json!({})),
            Err(SortError::EmptyCommentPattern)
        ));
    }

    #[test]
    fn test_partitions_from_json() {
        let policy = PartitionPolicy::from_json(&json!("merge")).expect("Failed to parse merge");
        assert!(matches!(policy, PartitionPolicy::Merge));

        let policy = PartitionPolicy::from_json(&json!({
            "splitBy": { "comments": true, "newlines": true },
            "maxImports": 3,
            "orderBy": "type-first",
            "orderStability": "unstable"
        }))
        .expect("Failed to parse split partitions");
        match policy {
            PartitionPolicy::Split(settings) => {
                assert!(settings.split_by_newlines);
                assert!(settings.split_by_comments.is_enabled());
                assert_eq!(settings.max_items, Some(3));
                assert_eq!(settings.order_by, OrderBy::TypeFirst);
                assert_eq!(settings.order_stability, OrderStability::Unstable);
            }
            PartitionPolicy::Merge => panic!("expected split partitions"),
        }

        assert!(PartitionPolicy::from_json(&json!({ "maxItems": 0 })).is_err());
    }

    #[test]
    fn test_unknown_option_keys() {
        let result = SortOptionsBuilder::new().merge_json(None, Some(&json!({ "sortBy": "name" })));
        match result {
            Err(SortError::UnknownOption { keys, .. }) => assert_eq!(keys, vec!["sortBy".to_string()]),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_settings_reject_group_keys() {
        let settings = json!({ "groups": ["a"] });
        let result = SortOptionsBuilder::new().merge_json(Some(&settings), None);
        assert!(matches!(result, Err(SortError::UnknownOption { .. })));
    }

    #[test]
    fn test_options_override_settings() {
        let settings = json!({ "order": "desc", "ignoreCase": false });
        let options = json!({ "order": "asc", "newlinesBetween": 1 });
        let built = SortOptionsBuilder::new()
            .merge_json(Some(&settings), Some(&options))
            .expect("Failed to merge json")
            .build()
            .expect("Failed to build merged options");
        assert_eq!(built.sort.order, SortOrder::Asc);
        assert!(!built.sort.ignore_case);
        assert_eq!(built.newlines_between, NewlinesOption::Count(1));
    }

    #[test]
    fn test_fallback_settings() {
        let settings = SortSettings {
            order: SortOrder::Desc,
            fallback_sort: FallbackSort {
                sort_type: SortType::Natural,
                order: None,
            },
            ..SortSettings::default()
        };
        let fallback = settings.for_fallback();
        assert_eq!(fallback.sort_type, SortType::Natural);
        assert_eq!(fallback.order, SortOrder::Desc);
        assert_eq!(fallback.fallback_sort.sort_type, SortType::Unsorted);
    }

    #[test]
    fn test_presets() {
        assert_eq!(presets::recommended_natural().sort.sort_type, SortType::Natural);
        assert_eq!(presets::recommended_line_length().sort.order, SortOrder::Desc);
        assert!(presets::recommended_custom("abc").validate().is_ok());
    }
}

//! Sortable items and the tags attached to them by rule adapters

use crate::error::SortError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Group assigned to items that match no declared group
pub const UNKNOWN_GROUP: &str = "unknown";

/// Stable identity of an item inside one sort request
pub type ItemId = usize;

/// Half-open byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn contains_range(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest range covering both
    pub fn cover(&self, other: &TextRange) -> TextRange {
        TextRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Slice the source text, empty when the range is out of bounds
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

macro_rules! tag_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Every variant, in priority order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = SortError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(SortError::invalid_option($kind, &format!("unknown {}: {s}", $kind))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tag_enum!(
    /// Syntactic role of an item, used to build predefined group names
    Selector, "selector" {
        SideEffectStyle => "side-effect-style",
        SideEffect => "side-effect",
        Style => "style",
        Builtin => "builtin",
        External => "external",
        Internal => "internal",
        Subpath => "subpath",
        Parent => "parent",
        Sibling => "sibling",
        Index => "index",
        Type => "type",
        Import => "import",
        Export => "export",
    }
);

tag_enum!(
    /// Qualifier of an item; declaration order is the permutation priority
    Modifier, "modifier" {
        Type => "type",
        SideEffect => "side-effect",
        Value => "value",
        TsEquals => "ts-equals",
        Default => "default",
        Wildcard => "wildcard",
        Named => "named",
        Singleline => "singleline",
        Multiline => "multiline",
    }
);

/// Selector and modifier tags resolved once when the item is built
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tags {
    /// Most specific selector first
    pub selectors: Vec<Selector>,
    pub modifiers: Vec<Modifier>,
}

impl Tags {
    pub fn new(selectors: Vec<Selector>, modifiers: Vec<Modifier>) -> Self {
        Self {
            selectors,
            modifiers,
        }
    }

    pub fn has_selector(&self, selector: Selector) -> bool {
        self.selectors.contains(&selector)
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Modifiers in priority order, without duplicates
    pub fn prioritized_modifiers(&self) -> Vec<Modifier> {
        let mut modifiers = self.modifiers.clone();
        modifiers.sort();
        modifiers.dedup();
        modifiers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// A comment found in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub range: TextRange,
    pub kind: CommentKind,
    /// Content without the `//` or `/* */` delimiters
    pub text: String,
}

impl Comment {
    pub fn new(range: TextRange, kind: CommentKind, text: impl Into<String>) -> Self {
        Self {
            range,
            kind,
            text: text.into(),
        }
    }

    /// Build a comment from its raw source text
    pub fn from_source(range: TextRange, raw: &str) -> Option<Self> {
        if let Some(body) = raw.strip_prefix("//") {
            Some(Self::new(range, CommentKind::Line, body))
        } else {
            raw.strip_prefix("/*")
                .and_then(|rest| rest.strip_suffix("*/"))
                .map(|body| Self::new(range, CommentKind::Block, body))
        }
    }
}

/// Clause a specifier occupies inside its declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    Default,
    Namespace,
    Named,
}

/// Link from a specifier item back to the declaration it was taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierInfo {
    /// Index into the request's declaration list
    pub declaration: usize,
    pub kind: SpecifierKind,
    /// Source text of the specifier, e.g. `type Foo` or `a as b`
    pub text: String,
}

/// Declaration template used when specifiers of one declaration are split apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Full range including attached comments
    pub range: TextRange,
    /// Leading keyword text, e.g. `import` or `import type`
    pub keyword: String,
    /// Quoted module source, e.g. `'./a'`
    pub source: String,
    /// Trailing attributes clause including the leading space, e.g. ` with { type: 'json' }`
    pub attributes: String,
    /// Text of attached leading comments, kept on the first emitted piece
    pub leading_text: String,
    pub has_semicolon: bool,
}

impl Declaration {
    /// Render a declaration holding only the given specifiers
    pub fn render(&self, specifiers: &[&SpecifierInfo]) -> String {
        let default = specifiers
            .iter()
            .find(|s| s.kind == SpecifierKind::Default)
            .map(|s| s.text.clone());
        let namespace = specifiers
            .iter()
            .find(|s| s.kind == SpecifierKind::Namespace)
            .map(|s| s.text.clone());
        let named: Vec<&str> = specifiers
            .iter()
            .filter(|s| s.kind == SpecifierKind::Named)
            .map(|s| s.text.as_str())
            .collect();

        let mut clauses = Vec::new();
        clauses.extend(default);
        clauses.extend(namespace);
        if !named.is_empty() {
            clauses.push(format!("{{ {} }}", named.join(", ")));
        }

        let semicolon = if self.has_semicolon { ";" } else { "" };
        format!(
            "{} {} from {}{}{}",
            self.keyword,
            clauses.join(", "),
            self.source,
            self.attributes,
            semicolon
        )
    }
}

/// The unit being sorted
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    /// Sort key
    pub name: String,
    /// Span length used by the line-length comparator
    pub size: usize,
    /// Resolved group; `None` until group resolution runs
    pub group: Option<String>,
    pub partition_id: usize,
    pub is_lint_disabled: bool,
    pub is_ignored: bool,
    pub is_type_only: bool,
    /// Names this item exposes
    pub dependency_names: Vec<String>,
    /// Names this item depends on
    pub dependencies: Vec<String>,
    pub tags: Tags,
    /// Text moved with the item: attached comments, the element, its inline trailing comment
    pub range: TextRange,
    /// The element alone
    pub node_range: TextRange,
    pub leading_comments: Vec<Comment>,
    pub add_safety_semicolon: bool,
    pub specifier: Option<SpecifierInfo>,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, range: TextRange) -> Self {
        Self {
            id,
            name: name.into(),
            size: range.len(),
            group: None,
            partition_id: 0,
            is_lint_disabled: false,
            is_ignored: false,
            is_type_only: false,
            dependency_names: Vec::new(),
            dependencies: Vec::new(),
            tags: Tags::default(),
            range,
            node_range: range,
            leading_comments: Vec::new(),
            add_safety_semicolon: false,
            specifier: None,
        }
    }

    /// Resolved group, `unknown` before resolution
    pub fn group_name(&self) -> &str {
        self.group.as_deref().unwrap_or(UNKNOWN_GROUP)
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_dependency_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_node_range(mut self, node_range: TextRange) -> Self {
        self.node_range = node_range;
        self
    }

    pub fn with_leading_comments(mut self, comments: Vec<Comment>) -> Self {
        self.leading_comments = comments;
        self
    }

    pub fn with_specifier(mut self, specifier: SpecifierInfo) -> Self {
        self.specifier = Some(specifier);
        self
    }

    pub fn ignored(mut self, ignored: bool) -> Self {
        self.is_ignored = ignored;
        self
    }

    pub fn lint_disabled(mut self, disabled: bool) -> Self {
        self.is_lint_disabled = disabled;
        self
    }

    pub fn type_only(mut self, type_only: bool) -> Self {
        self.is_type_only = type_only;
        self
    }

    pub fn safety_semicolon(mut self, enabled: bool) -> Self {
        self.add_safety_semicolon = enabled;
        self
    }

    /// True when `other` lists one of the names this item exposes
    pub fn is_dependency_of(&self, other: &Item) -> bool {
        self.id != other.id
            && self
                .dependency_names
                .iter()
                .any(|name| other.dependencies.contains(name))
    }

    /// Declaration this item was split from, if any
    pub fn parent_declaration(&self) -> Option<usize> {
        self.specifier.as_ref().map(|s| s.declaration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_range_helpers() {
        let a = TextRange::new(2, 6);
        let b = TextRange::new(5, 9);
        assert_eq!(a.len(), 4);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&TextRange::new(6, 8)));
        assert_eq!(a.cover(&b), TextRange::new(2, 9));
        assert_eq!(TextRange::new(0, 3).slice("import"), "imp");
        assert_eq!(TextRange::new(4, 30).slice("import"), "");
    }

    #[test]
    fn test_tag_names_round_trip_through_from_str() {
        for selector in Selector::ALL {
            let parsed: Selector = selector.as_str().parse().expect("Failed to parse selector");
            assert_eq!(parsed, *selector);
        }
        assert!("tsconfig".parse::<Selector>().is_err());
        assert_eq!(
            "ts-equals".parse::<Modifier>().expect("Failed to parse modifier"),
            Modifier::TsEquals
        );
    }

    #[test]
    fn test_prioritized_modifiers() {
        let tags = Tags::new(
            vec![Selector::External],
            vec![Modifier::Named, Modifier::Type, Modifier::Named],
        );
        assert_eq!(
            tags.prioritized_modifiers(),
            vec![Modifier::Type, Modifier::Named]
        );
    }

    #[test]
    fn test_comment_from_source() {
        let line = Comment::from_source(TextRange::new(0, 8), "// hello").expect("Failed to parse line comment");
        assert_eq!(line.kind, CommentKind::Line);
        assert_eq!(line.text, " hello");

        let block = Comment::from_source(TextRange::new(0, 7), "/* x */").expect("Failed to parse block comment");
        assert_eq!(block.kind, CommentKind::Block);
        assert_eq!(block.text, " x ");

        assert!(Comment::from_source(TextRange::new(0, 3), "abc").is_none());
    }

    #[test]
    fn test_is_dependency_of() {
        let a = Item::new(0, "a", TextRange::new(0, 1)).with_dependency_names(["a"]);
        let b = Item::new(1, "b", TextRange::new(2, 3)).with_dependencies(["a"]);
        assert!(a.is_dependency_of(&b));
        assert!(!b.is_dependency_of(&a));
    }

    #[test]
    fn test_declaration_render() {
        let declaration = Declaration {
            range: TextRange::new(0, 40),
            keyword: "import".to_string(),
            source: "'./x'".to_string(),
            attributes: String::new(),
            leading_text: String::new(),
            has_semicolon: true,
        };
        let default = SpecifierInfo {
            declaration: 0,
            kind: SpecifierKind::Default,
            text: "X".to_string(),
        };
        let named = SpecifierInfo {
            declaration: 0,
            kind: SpecifierKind::Named,
            text: "type Foo".to_string(),
        };
        assert_eq!(
            declaration.render(&[&named, &default]),
            "import X, { type Foo } from './x';"
        );
        assert_eq!(declaration.render(&[&named]), "import { type Foo } from './x';");
    }
}

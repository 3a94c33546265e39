//! `sort-imports`: orders whole import declarations of a module

use super::scanner::{ImportDeclaration, ImportKind, ModuleReference, ScannedModule};
use super::{RuleName, RuleOutput};
use crate::config::{check_keys, ImportsOrderBy, NewlinesOption, RegexOption, SortOptions, SortOptionsBuilder, SortType};
use crate::core_sort::{CoreSort, SortRequest};
use crate::error::{SortError, SortResult};
use crate::groups::{self, GroupOverrides, GroupSlot};
use crate::item::{Declaration, Item, Modifier, Selector, SpecifierInfo, SpecifierKind, Tags, TextRange};
use crate::resolve::{GroupCache, GroupResolver, Vocabulary};
use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const RULE: &str = "sort-imports";

pub const VOCABULARY: Vocabulary = Vocabulary {
    selectors: &[
        Selector::SideEffectStyle,
        Selector::SideEffect,
        Selector::Style,
        Selector::Builtin,
        Selector::External,
        Selector::Internal,
        Selector::Subpath,
        Selector::Parent,
        Selector::Sibling,
        Selector::Index,
        Selector::Type,
        Selector::Import,
    ],
    modifiers: Modifier::ALL,
};

const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "inspector/promises",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

const STYLE_EXTENSIONS: &[&str] = &[".less", ".scss", ".sass", ".styl", ".pcss", ".css", ".sss"];

const INDEX_PATHS: &[&str] = &[
    "./index.d.js",
    "./index.d.ts",
    "./index.js",
    "./index.ts",
    "./index",
    "./",
    ".",
];

/// Runtime whose builtin modules get the `builtin` selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Node,
    Bun,
}

impl FromStr for Environment {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Environment::Node),
            "bun" => Ok(Environment::Bun),
            _ => Err(SortError::parse_error(&format!("unknown environment: {s}"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Node => write!(f, "node"),
            Environment::Bun => write!(f, "bun"),
        }
    }
}

/// The `imports` options block
#[derive(Debug, Clone, Default)]
pub struct ImportsOptions {
    pub order_by: ImportsOrderBy,
    /// Let specifiers of one declaration land in different places
    pub split_declarations: bool,
    pub sort_side_effects: bool,
    pub max_line_length: Option<usize>,
}

impl ImportsOptions {
    fn from_json(value: &Value) -> SortResult<(Self, Option<Value>)> {
        let map = value
            .as_object()
            .ok_or_else(|| SortError::invalid_option("imports", "must be an object"))?;
        check_keys(
            map,
            &[
                "orderBy",
                "splitDeclarations",
                "sortSideEffects",
                "maxLineLength",
                "casingPriority",
            ],
            "imports",
        )?;
        let flag = |key: &str| -> SortResult<bool> {
            match map.get(key) {
                None => Ok(false),
                Some(value) => value
                    .as_bool()
                    .ok_or_else(|| SortError::invalid_option(&format!("imports.{key}"), "must be a boolean")),
            }
        };
        let max_line_length = match map.get("maxLineLength") {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_u64() {
                Some(n) if n > 0 => Some(n as usize),
                _ => {
                    return Err(SortError::invalid_option(
                        "imports.maxLineLength",
                        "must be a positive integer or null",
                    ))
                }
            },
        };
        let options = Self {
            order_by: map
                .get("orderBy")
                .map(|value| serde_json::from_value(value.clone()))
                .transpose()?
                .unwrap_or_default(),
            split_declarations: flag("splitDeclarations")?,
            sort_side_effects: flag("sortSideEffects")?,
            max_line_length,
        };
        Ok((options, map.get("casingPriority").cloned()))
    }
}

#[derive(Debug, Clone)]
pub struct SortImportsOptions {
    pub sort: SortOptions,
    pub internal_pattern: RegexOption,
    pub environment: Environment,
    pub imports: ImportsOptions,
}

impl SortImportsOptions {
    /// The recommended configuration
    pub fn recommended() -> SortResult<Self> {
        let sort = SortOptionsBuilder::new()
            .group(GroupSlot::name("type-import"))
            .group(GroupSlot::subgroup(["value-builtin", "value-external"]))
            .group(GroupSlot::name("type-internal"))
            .group(GroupSlot::name("value-internal"))
            .group(GroupSlot::subgroup(["type-parent", "type-sibling", "type-index"]))
            .group(GroupSlot::subgroup(["value-parent", "value-sibling", "value-index"]))
            .group(GroupSlot::name("ts-equals-import"))
            .group(GroupSlot::name("unknown"))
            .newlines_between(NewlinesOption::Count(1))
            .newlines_inside(NewlinesOption::Count(0))
            .build()?;
        Ok(Self {
            sort,
            internal_pattern: RegexOption::from_json(&json!(["^~/.+", "^@/.+"]))?,
            environment: Environment::default(),
            imports: ImportsOptions::default(),
        })
    }

    /// Merge `options` over `settings` over the recommended configuration
    pub fn from_json(settings: Option<&Value>, options: Option<&Value>) -> SortResult<Self> {
        let mut map = match options {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(SortError::invalid_option(RULE, "options must be an object")),
        };
        let defaults = Self::recommended()?;

        let internal_pattern = match map.remove("internalPattern") {
            Some(value) => RegexOption::from_json(&value)?,
            None => defaults.internal_pattern,
        };
        let environment = match map.remove("environment") {
            Some(value) => serde_json::from_value(value)?,
            None => defaults.environment,
        };
        let imports = match map.remove("imports") {
            Some(value) => {
                let (imports, casing_priority) = ImportsOptions::from_json(&value)?;
                if let Some(casing_priority) = casing_priority {
                    map.insert("casingPriority".to_string(), casing_priority);
                }
                imports
            }
            None => defaults.imports,
        };

        let sort = SortOptionsBuilder::from_options(defaults.sort)
            .merge_scoped_json(settings, Some(&Value::Object(map)), RULE)?
            .build()?;
        let options = Self {
            sort,
            internal_pattern,
            environment,
            imports,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> SortResult<()> {
        groups::validate_group_names(&self.sort.groups, &self.sort.custom_groups, |name| {
            VOCABULARY.is_predefined_group(name)
        })?;
        if !self.imports.sort_side_effects {
            let mixed = self.sort.groups.iter().any(|slot| {
                let names = slot.names();
                let side_effects = names.iter().filter(|name| is_side_effect_group(name)).count();
                side_effects > 0 && side_effects < names.len()
            });
            if mixed {
                return Err(SortError::invalid_option(
                    "groups",
                    "side effect groups cannot be nested with non side effect groups when `sortSideEffects` is false",
                ));
            }
        }
        self.sort.validate()
    }

    /// Engine options: side-effect-only slots keep their source order unless side effects are sorted
    pub fn engine_options(&self) -> SortOptions {
        let mut options = self.sort.clone();
        if !self.imports.sort_side_effects {
            options.groups = options
                .groups
                .into_iter()
                .map(|slot| if is_side_effect_only(&slot) { unsorted(slot) } else { slot })
                .collect();
        }
        options
    }

    fn declares(&self, group: &str) -> bool {
        groups::group_names(&self.sort.groups).contains(&group)
    }
}

fn is_side_effect_group(name: &str) -> bool {
    name == "side-effect" || name == "side-effect-style"
}

fn is_side_effect_only(slot: &GroupSlot) -> bool {
    let names = slot.names();
    !names.is_empty() && names.iter().all(|name| is_side_effect_group(name))
}

fn unsorted(slot: GroupSlot) -> GroupSlot {
    let mut overrides = match slot {
        GroupSlot::Overrides(overrides) => overrides,
        other => GroupOverrides {
            names: other.names().to_vec(),
            ..GroupOverrides::default()
        },
    };
    overrides.sort.sort_type = Some(SortType::Unsorted);
    GroupSlot::Overrides(overrides)
}

pub fn is_builtin(name: &str, environment: Environment) -> bool {
    if name.starts_with("node:") {
        return true;
    }
    if environment == Environment::Bun && (name == "bun" || name.starts_with("bun:")) {
        return true;
    }
    NODE_BUILTINS.contains(&name)
}

/// Path before any `?query` ends in a stylesheet extension
pub fn is_style(name: &str) -> bool {
    let path = name.split_once('?').map_or(name, |(path, _)| path);
    STYLE_EXTENSIONS.iter().any(|extension| path.ends_with(extension))
}

/// Location selector of a module source
pub fn common_selector(name: &str, internal_pattern: &RegexOption, environment: Environment) -> Selector {
    if INDEX_PATHS.contains(&name) {
        Selector::Index
    } else if name.starts_with("./") {
        Selector::Sibling
    } else if name.starts_with("..") {
        Selector::Parent
    } else if name.starts_with('#') {
        Selector::Subpath
    } else if internal_pattern.is_match(name) {
        Selector::Internal
    } else if is_builtin(name, environment) {
        Selector::Builtin
    } else {
        Selector::External
    }
}

/// Module path a declaration is grouped by
fn module_name(declaration: &ImportDeclaration) -> &str {
    match &declaration.kind {
        ImportKind::TsEquals(ModuleReference::External(path)) => path,
        ImportKind::TsEquals(ModuleReference::Qualified(reference)) => reference,
        _ => &declaration.source,
    }
}

fn tags_for(declaration: &ImportDeclaration, name: &str, source: &str, options: &SortImportsOptions) -> Tags {
    let mut selectors = Vec::new();
    let mut modifiers = Vec::new();

    if declaration.is_type {
        selectors.push(Selector::Type);
        modifiers.push(Modifier::Type);
    } else {
        modifiers.push(Modifier::Value);
    }

    let qualified = matches!(declaration.kind, ImportKind::TsEquals(ModuleReference::Qualified(_)));
    if !qualified {
        let style = is_style(name);
        if declaration.kind == ImportKind::SideEffect {
            modifiers.push(Modifier::SideEffect);
            if style {
                selectors.push(Selector::SideEffectStyle);
            }
            selectors.push(Selector::SideEffect);
        }
        if style {
            selectors.push(Selector::Style);
        }
        selectors.push(common_selector(name, &options.internal_pattern, options.environment));
    }
    selectors.push(Selector::Import);

    match declaration.kind {
        ImportKind::TsEquals(_) => modifiers.push(Modifier::TsEquals),
        ImportKind::Declaration => {
            let has = |kind: SpecifierKind| declaration.bindings.iter().any(|b| b.kind == kind);
            if has(SpecifierKind::Default) {
                modifiers.push(Modifier::Default);
            }
            if has(SpecifierKind::Namespace) {
                modifiers.push(Modifier::Wildcard);
            }
            if has(SpecifierKind::Named) {
                modifiers.push(Modifier::Named);
            }
        }
        ImportKind::SideEffect => {}
    }
    modifiers.push(if declaration.is_multiline(source) {
        Modifier::Multiline
    } else {
        Modifier::Singleline
    });

    Tags::new(selectors, modifiers)
}

/// Sort value of a whole declaration
fn declaration_value(declaration: &ImportDeclaration, path: &str, order_by: ImportsOrderBy) -> String {
    let first = declaration.bindings.first();
    match order_by {
        ImportsOrderBy::Path => path.to_string(),
        ImportsOrderBy::Alias => first.map(|b| b.local.clone()).unwrap_or_default(),
        ImportsOrderBy::Specifier => first.map(|b| b.imported.clone()).unwrap_or_default(),
    }
}

fn template(source: &str, declaration: &ImportDeclaration, literal: TextRange) -> Declaration {
    let full = declaration.full_range();
    let attributes_end = declaration.attribute_braces.map_or(literal.end, |braces| braces.end);
    Declaration {
        range: full,
        keyword: declaration.keyword().to_string(),
        source: literal.slice(source).to_string(),
        attributes: TextRange::new(literal.end, attributes_end).slice(source).to_string(),
        leading_text: TextRange::new(full.start, declaration.range.start).slice(source).to_string(),
        has_semicolon: declaration.has_semicolon,
    }
}

/// Items and split templates for one run of imports
fn build_items(
    source: &str,
    module: &ScannedModule,
    run: &[usize],
    options: &SortImportsOptions,
    engine: &SortOptions,
    cache: &GroupCache,
) -> (Vec<Item>, Vec<Declaration>) {
    let resolver = GroupResolver::new(engine, cache);
    let regroup_side_effects = options.declares("side-effect");
    let regroup_styles = options.declares("side-effect-style");
    let order_by = options.imports.order_by;
    let split = options.imports.split_declarations && order_by != ImportsOrderBy::Path;

    let mut items: Vec<Item> = Vec::new();
    let mut declarations = Vec::new();
    for index in run {
        let declaration = &module.imports[*index];
        let path = module_name(declaration);
        let tags = tags_for(declaration, path, source, options);
        let ignored = !options.imports.sort_side_effects
            && tags.has_selector(Selector::SideEffect)
            && !regroup_side_effects
            && (!tags.has_selector(Selector::SideEffectStyle) || !regroup_styles);
        let dependencies: Vec<&str> = match &declaration.kind {
            ImportKind::TsEquals(ModuleReference::Qualified(reference)) => {
                reference.split('.').next().map(str::trim).into_iter().collect()
            }
            _ => Vec::new(),
        };

        let mut base = Item::new(items.len(), path, declaration.full_range())
            .with_node_range(declaration.range)
            .with_size(declaration.range.len())
            .with_tags(tags)
            .with_dependency_names(declaration.local_names())
            .with_dependencies(dependencies)
            .with_leading_comments(declaration.leading_comments.clone())
            .ignored(ignored)
            .type_only(declaration.is_type)
            .safety_semicolon(true);
        let group = resolver.resolve(&base);
        base.group = Some(group);

        let literal = declaration.source_range.filter(|_| declaration.kind == ImportKind::Declaration);
        match literal {
            Some(literal) if split && declaration.bindings.len() > 1 => {
                let parent = declarations.len();
                declarations.push(template(source, declaration, literal));
                for binding in &declaration.bindings {
                    let text = binding.range.slice(source).to_string();
                    let mut item = base.clone();
                    item.id = items.len();
                    item.name = match order_by {
                        ImportsOrderBy::Alias => binding.local.clone(),
                        _ => binding.imported.clone(),
                    };
                    item.size = text.len();
                    item.dependency_names = vec![binding.local.clone()];
                    item.specifier = Some(SpecifierInfo {
                        declaration: parent,
                        kind: binding.kind,
                        text,
                    });
                    items.push(item);
                }
            }
            _ => {
                base.name = declaration_value(declaration, path, order_by);
                if declaration.bindings.len() > 1
                    && options.imports.max_line_length.is_some_and(|max| base.size > max)
                {
                    base.size = base.name.len() + 10;
                }
                items.push(base);
            }
        }
    }

    anchor_ignored(&mut items);
    (items, declarations)
}

/// Ignored side-effect imports share the bucket of their nearest sortable neighbor
fn anchor_ignored(items: &mut [Item]) {
    for index in 0..items.len() {
        if !items[index].is_ignored {
            continue;
        }
        let neighbor = items[..index]
            .iter()
            .rev()
            .chain(items[index + 1..].iter())
            .find(|item| !item.is_ignored)
            .and_then(|item| item.group.clone());
        if let Some(group) = neighbor {
            items[index].group = Some(group);
        }
    }
}

/// Sort every run of imports in `module`
pub fn run(
    source: &str,
    module: &ScannedModule,
    options: &SortImportsOptions,
    cache: &Arc<GroupCache>,
) -> SortResult<RuleOutput> {
    let sorter = CoreSort::with_cache(options.engine_options(), Arc::clone(cache))?;
    let mut output = RuleOutput::new(RuleName::SortImports);
    for run in &module.runs {
        let (items, declarations) = build_items(source, module, run, options, sorter.options(), sorter.cache());
        if items.is_empty() {
            continue;
        }
        let outcome = sorter.run(
            SortRequest::new(source, items)
                .with_declarations(declarations)
                .with_disabled(module.disabled.clone()),
        )?;
        output.edits.extend(outcome.edits);
        output.diagnostics.extend(outcome.diagnostics);
    }
    debug!(
        "{}: {} run(s), {} edit(s)",
        RULE,
        module.runs.len(),
        output.edits.len()
    );
    Ok(output)
}

//! `sort-named-imports`: orders the specifiers between one declaration's braces

use super::scanner::{self, ImportDeclaration, ScannedModule};
use super::{RuleName, RuleOutput};
use crate::config::{SortOptions, SortOptionsBuilder};
use crate::core_sort::{CoreSort, SortRequest};
use crate::error::{SortError, SortResult};
use crate::groups;
use crate::item::{Item, Modifier, Selector, Tags, TextRange};
use crate::resolve::{GroupCache, Vocabulary};
use serde_json::{Map, Value};
use std::sync::Arc;

const RULE: &str = "sort-named-imports";

pub const VOCABULARY: Vocabulary = Vocabulary {
    selectors: &[Selector::Import],
    modifiers: &[Modifier::Type, Modifier::Value],
};

#[derive(Debug, Clone, Default)]
pub struct SortNamedImportsOptions {
    pub sort: SortOptions,
    /// Sort by the imported name instead of the local alias
    pub ignore_alias: bool,
}

impl SortNamedImportsOptions {
    pub fn from_json(settings: Option<&Value>, options: Option<&Value>) -> SortResult<Self> {
        let mut map = match options {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(SortError::invalid_option(RULE, "options must be an object")),
        };
        let ignore_alias = match map.remove("ignoreAlias") {
            None => false,
            Some(value) => value
                .as_bool()
                .ok_or_else(|| SortError::invalid_option("ignoreAlias", "must be a boolean"))?,
        };
        let sort = SortOptionsBuilder::new()
            .merge_scoped_json(settings, Some(&Value::Object(map)), RULE)?
            .build()?;
        groups::validate_group_names(&sort.groups, &sort.custom_groups, |name| {
            VOCABULARY.is_predefined_group(name)
        })?;
        Ok(Self { sort, ignore_alias })
    }
}

fn build_items(source: &str, module: &ScannedModule, declaration: &ImportDeclaration, ignore_alias: bool) -> Vec<Item> {
    let Some(braces) = declaration.named_braces else {
        return Vec::new();
    };
    let mut items = Vec::new();
    let mut previous_end = braces.start + 1;
    for binding in declaration.named_bindings() {
        let leading = scanner::attached_comments(source, &module.comments, previous_end, binding.range.start);
        let start = leading.first().map_or(binding.range.start, |c| c.range.start);
        let is_type = declaration.is_type || binding.is_type;
        let name = if ignore_alias { &binding.imported } else { &binding.local };
        let modifier = if is_type { Modifier::Type } else { Modifier::Value };
        items.push(
            Item::new(items.len(), name.as_str(), TextRange::new(start, binding.range.end))
                .with_node_range(binding.range)
                .with_size(binding.range.len())
                .with_tags(Tags::new(vec![Selector::Import], vec![modifier]))
                .with_dependency_names([binding.local.as_str()])
                .with_leading_comments(leading)
                .type_only(is_type),
        );
        previous_end = binding.range.end;
    }
    items
}

/// Sort the named specifiers of every declaration in `module`
pub fn run(
    source: &str,
    module: &ScannedModule,
    options: &SortNamedImportsOptions,
    cache: &Arc<GroupCache>,
) -> SortResult<RuleOutput> {
    let sorter = CoreSort::with_cache(options.sort.clone(), Arc::clone(cache))?;
    let mut output = RuleOutput::new(RuleName::SortNamedImports);
    for declaration in &module.imports {
        let items = build_items(source, module, declaration, options.ignore_alias);
        if items.len() < 2 {
            continue;
        }
        let outcome = sorter.run(SortRequest::new(source, items).with_disabled(module.disabled.clone()))?;
        output.edits.extend(outcome.edits);
        output.diagnostics.extend(outcome.diagnostics);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::apply_edits;
    use serde_json::json;

    fn fix_with(source: &str, options: Value) -> String {
        let options = SortNamedImportsOptions::from_json(None, Some(&options)).expect("Failed to parse options");
        let module = scanner::scan(source);
        let output = run(source, &module, &options, &Arc::new(GroupCache::new())).expect("Failed to sort");
        apply_edits(source, &output.edits).expect("Failed to apply edits")
    }

    #[test]
    fn test_sorts_by_local_name() {
        assert_eq!(
            fix_with("import { c, b as a, type B } from 'x'\n", json!({})),
            "import { b as a, type B, c } from 'x'\n"
        );
    }

    #[test]
    fn test_ignore_alias() {
        let source = "import { a as z, b } from 'x'\n";
        assert_eq!(fix_with(source, json!({})), "import { b, a as z } from 'x'\n");
        assert_eq!(fix_with(source, json!({ "ignoreAlias": true })), source);
    }

    #[test]
    fn test_multiline_list_keeps_layout() {
        let source = "import {\n  c,\n  // about a\n  a,\n} from 'x'\n";
        assert_eq!(
            fix_with(source, json!({})),
            "import {\n  // about a\n  a,\n  c,\n} from 'x'\n"
        );
    }

    #[test]
    fn test_type_group_first() {
        let source = "import { a, type B } from 'x'\n";
        assert_eq!(
            fix_with(source, json!({ "groups": ["type-import", "value-import"] })),
            "import { type B, a } from 'x'\n"
        );
    }

    #[test]
    fn test_rejects_unknown_group() {
        let err = SortNamedImportsOptions::from_json(None, Some(&json!({ "groups": ["external"] })))
            .expect_err("Failed to reject group");
        assert!(matches!(err, SortError::InvalidGroups { .. }));
    }

    #[test]
    fn test_default_and_namespace_are_not_items() {
        let source = "import z, { b, a } from 'x'\n";
        assert_eq!(fix_with(source, json!({})), "import z, { a, b } from 'x'\n");
    }
}

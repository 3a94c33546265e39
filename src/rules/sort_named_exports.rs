//! `sort-named-exports`: orders the specifiers of one `export { ... }` list

use super::scanner::{self, ExportDeclaration, ScannedModule};
use super::{RuleName, RuleOutput};
use crate::config::{SortOptions, SortOptionsBuilder};
use crate::core_sort::{CoreSort, SortRequest};
use crate::error::{SortError, SortResult};
use crate::groups;
use crate::item::{Item, Modifier, Selector, Tags, TextRange};
use crate::resolve::{GroupCache, Vocabulary};
use serde_json::{Map, Value};
use std::sync::Arc;

const RULE: &str = "sort-named-exports";

pub const VOCABULARY: Vocabulary = Vocabulary {
    selectors: &[Selector::Export],
    modifiers: &[Modifier::Type, Modifier::Value],
};

#[derive(Debug, Clone, Default)]
pub struct SortNamedExportsOptions {
    pub sort: SortOptions,
    /// Sort by the local name instead of the exported one
    pub ignore_alias: bool,
}

impl SortNamedExportsOptions {
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

fn build_items(source: &str, module: &ScannedModule, export: &ExportDeclaration, ignore_alias: bool) -> Vec<Item> {
    let Some(braces) = export.named_braces else {
        return Vec::new();
    };
    let mut items = Vec::new();
    let mut previous_end = braces.start + 1;
    for specifier in &export.specifiers {
        let leading = scanner::attached_comments(source, &module.comments, previous_end, specifier.range.start);
        let start = leading.first().map_or(specifier.range.start, |c| c.range.start);
        let is_type = export.is_type || specifier.is_type;
        let name = if ignore_alias { &specifier.local } else { &specifier.exported };
        let modifier = if is_type { Modifier::Type } else { Modifier::Value };
        items.push(
            Item::new(items.len(), name.as_str(), TextRange::new(start, specifier.range.end))
                .with_node_range(specifier.range)
                .with_size(specifier.range.len())
                .with_tags(Tags::new(vec![Selector::Export], vec![modifier]))
                .with_leading_comments(leading)
                .type_only(is_type),
        );
        previous_end = specifier.range.end;
    }
    items
}

/// Sort the specifiers of every export list in `module`
pub fn run(
    source: &str,
    module: &ScannedModule,
    options: &SortNamedExportsOptions,
    cache: &Arc<GroupCache>,
) -> SortResult<RuleOutput> {
    let sorter = CoreSort::with_cache(options.sort.clone(), Arc::clone(cache))?;
    let mut output = RuleOutput::new(RuleName::SortNamedExports);
    for export in &module.exports {
        let items = build_items(source, module, export, options.ignore_alias);
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
    use crate::diagnostics::MessageId;
    use crate::edits::apply_edits;
    use serde_json::json;

    fn fix_with(source: &str, options: Value) -> String {
        let options = SortNamedExportsOptions::from_json(None, Some(&options)).expect("Failed to parse options");
        let module = scanner::scan(source);
        let output = run(source, &module, &options, &Arc::new(GroupCache::new())).expect("Failed to sort");
        apply_edits(source, &output.edits).expect("Failed to apply edits")
    }

    #[test]
    fn test_sorts_by_exported_name() {
        assert_eq!(
            fix_with("export { c, z as a, type B } from './x'\n", json!({})),
            "export { z as a, type B, c } from './x'\n"
        );
    }

    #[test]
    fn test_ignore_alias_uses_local_name() {
        let source = "export { a as z, b }\n";
        assert_eq!(fix_with(source, json!({})), "export { b, a as z }\n");
        assert_eq!(fix_with(source, json!({ "ignoreAlias": true })), source);
    }

    #[test]
    fn test_multiline_list_keeps_layout() {
        let source = "export {\n  c,\n  // about a\n  a,\n}\n";
        assert_eq!(fix_with(source, json!({})), "export {\n  // about a\n  a,\n  c,\n}\n");
    }

    #[test]
    fn test_type_exports_first() {
        let source = "export { a, type B } from './x'\n";
        assert_eq!(
            fix_with(source, json!({ "groups": ["type-export", "value-export"] })),
            "export { type B, a } from './x'\n"
        );
    }

    #[test]
    fn test_reports_order_and_skips_other_exports() {
        let source = "export const b = 1\nexport { y, x }\nexport * from './all'\n";
        let options = SortNamedExportsOptions::default();
        let output = run(source, &scanner::scan(source), &options, &Arc::new(GroupCache::new()))
            .expect("Failed to sort");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].message_id, MessageId::UnexpectedOrder);
    }

    #[test]
    fn test_rejects_import_groups() {
        let err = SortNamedExportsOptions::from_json(None, Some(&json!({ "groups": ["type-import"] })))
            .expect_err("Failed to reject group");
        assert!(matches!(err, SortError::InvalidGroups { .. }));
    }
}

//! `sort-export-attributes`: orders the keys of a re-export's `with { ... }` clause

use super::scanner::ScannedModule;
use super::{RuleName, RuleOutput};
use crate::config::{SortOptions, SortOptionsBuilder};
use crate::core_sort::{CoreSort, SortRequest};
use crate::error::{SortError, SortResult};
use crate::groups;
use crate::item::Item;
use crate::resolve::GroupCache;
use serde_json::Value;
use std::sync::Arc;

const RULE: &str = "sort-export-attributes";

#[derive(Debug, Clone, Default)]
pub struct SortExportAttributesOptions {
    pub sort: SortOptions,
}

impl SortExportAttributesOptions {
    pub fn from_json(settings: Option<&Value>, options: Option<&Value>) -> SortResult<Self> {
        if options.is_some_and(|value| !value.is_object()) {
            return Err(SortError::invalid_option(RULE, "options must be an object"));
        }
        let sort = SortOptionsBuilder::new()
            .merge_scoped_json(settings, options, RULE)?
            .build()?;
        groups::validate_group_names(&sort.groups, &sort.custom_groups, |_| false)?;
        Ok(Self { sort })
    }
}

pub fn run(
    source: &str,
    module: &ScannedModule,
    options: &SortExportAttributesOptions,
    cache: &Arc<GroupCache>,
) -> SortResult<RuleOutput> {
    let sorter = CoreSort::with_cache(options.sort.clone(), Arc::clone(cache))?;
    let mut output = RuleOutput::new(RuleName::SortExportAttributes);
    for export in module.exports.iter().filter(|e| e.attributes.len() > 1) {
        let items: Vec<Item> = export
            .attributes
            .iter()
            .enumerate()
            .map(|(id, attribute)| Item::new(id, attribute.key.as_str(), attribute.range))
            .collect();
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
    use crate::rules::scanner::scan;
    use serde_json::json;

    fn fix_with(source: &str, options: Value) -> String {
        let options =
            SortExportAttributesOptions::from_json(None, Some(&options)).expect("Failed to parse options");
        let output = run(source, &scan(source), &options, &Arc::new(GroupCache::new())).expect("Failed to sort");
        apply_edits(source, &output.edits).expect("Failed to apply edits")
    }

    #[test]
    fn test_sorts_keys() {
        let source = "export { d } from './d.json' with { type: 'json', mode: 'x' };\n";
        assert_eq!(
            fix_with(source, json!({})),
            "export { d } from './d.json' with { mode: 'x', type: 'json' };\n"
        );
    }

    #[test]
    fn test_star_reexport_and_desc_order() {
        let source = "export * from './d' with { a: '1', b: '2' }\n";
        assert_eq!(
            fix_with(source, json!({ "order": "desc" })),
            "export * from './d' with { b: '2', a: '1' }\n"
        );
    }

    #[test]
    fn test_import_attributes_untouched() {
        let source = "import d from './d' with { b: '1', a: '2' }\n";
        assert_eq!(fix_with(source, json!({})), source);
    }
}

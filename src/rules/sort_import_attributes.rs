//! `sort-import-attributes`: orders the keys of a `with { ... }` clause

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

const RULE: &str = "sort-import-attributes";

#[derive(Debug, Clone, Default)]
pub struct SortImportAttributesOptions {
    pub sort: SortOptions,
}

impl SortImportAttributesOptions {
    pub fn from_json(settings: Option<&Value>, options: Option<&Value>) -> SortResult<Self> {
        if options.is_some_and(|value| !value.is_object()) {
            return Err(SortError::invalid_option(RULE, "options must be an object"));
        }
        let sort = SortOptionsBuilder::new()
            .merge_scoped_json(settings, options, RULE)?
            .build()?;
        // attributes carry no selectors, only custom groups can be declared
        groups::validate_group_names(&sort.groups, &sort.custom_groups, |_| false)?;
        Ok(Self { sort })
    }
}

pub fn run(
    source: &str,
    module: &ScannedModule,
    options: &SortImportAttributesOptions,
    cache: &Arc<GroupCache>,
) -> SortResult<RuleOutput> {
    let sorter = CoreSort::with_cache(options.sort.clone(), Arc::clone(cache))?;
    let mut output = RuleOutput::new(RuleName::SortImportAttributes);
    for declaration in module.imports.iter().filter(|d| d.attributes.len() > 1) {
        let items: Vec<Item> = declaration
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
    use crate::diagnostics::MessageId;
    use crate::edits::apply_edits;
    use crate::rules::scanner::scan;
    use serde_json::json;

    fn fix_with(source: &str, options: Value) -> String {
        let options =
            SortImportAttributesOptions::from_json(None, Some(&options)).expect("Failed to parse options");
        let output = run(source, &scan(source), &options, &Arc::new(GroupCache::new())).expect("Failed to sort");
        apply_edits(source, &output.edits).expect("Failed to apply edits")
    }

    #[test]
    fn test_sorts_keys() {
        let source = "import d from './d.json' with { type: 'json', mode: 'x' };\n";
        assert_eq!(
            fix_with(source, json!({})),
            "import d from './d.json' with { mode: 'x', type: 'json' };\n"
        );
    }

    #[test]
    fn test_custom_group_first() {
        let source = "import d from './d' with { a: '1', type: 'json' }\n";
        let options = json!({
            "groups": ["type-key", "unknown"],
            "customGroups": [{ "groupName": "type-key", "elementNamePattern": "^type$" }]
        });
        assert_eq!(
            fix_with(source, options),
            "import d from './d' with { type: 'json', a: '1' }\n"
        );
    }

    #[test]
    fn test_reports_order() {
        let source = "import d from './d' assert { b: '1', a: '2' }\n";
        let options = SortImportAttributesOptions::default();
        let output = run(source, &scan(source), &options, &Arc::new(GroupCache::new())).expect("Failed to sort");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].message_id, MessageId::UnexpectedOrder);
    }

    #[test]
    fn test_predefined_names_rejected() {
        let err = SortImportAttributesOptions::from_json(None, Some(&json!({ "groups": ["import"] })))
            .expect_err("Failed to reject group");
        assert!(matches!(err, SortError::InvalidGroups { .. }));
    }
}

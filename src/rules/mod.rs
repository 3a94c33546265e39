//! Rule adapters: turn scanned imports and exports into engine requests

pub mod scanner;
pub mod sort_export_attributes;
pub mod sort_import_attributes;
pub mod sort_imports;
pub mod sort_named_exports;
pub mod sort_named_imports;

use crate::config::check_keys;
use crate::diagnostics::Diagnostic;
use crate::edits::{apply_edits, Edit};
use crate::error::{SortContext, SortError, SortResult};
use crate::resolve::GroupCache;
use log::{debug, warn};
use serde_json::{Map, Value};
use sort_export_attributes::SortExportAttributesOptions;
use sort_import_attributes::SortImportAttributesOptions;
use sort_imports::SortImportsOptions;
use sort_named_exports::SortNamedExportsOptions;
use sort_named_imports::SortNamedImportsOptions;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Upper bound on fix passes over one file
pub const MAX_FIX_PASSES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleName {
    SortImports,
    SortNamedImports,
    SortImportAttributes,
    SortNamedExports,
    SortExportAttributes,
}

impl RuleName {
    /// Every rule, in the order fixes are applied
    pub const ALL: [RuleName; 5] = [
        RuleName::SortImports,
        RuleName::SortNamedImports,
        RuleName::SortImportAttributes,
        RuleName::SortNamedExports,
        RuleName::SortExportAttributes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleName::SortImports => "sort-imports",
            RuleName::SortNamedImports => "sort-named-imports",
            RuleName::SortImportAttributes => "sort-import-attributes",
            RuleName::SortNamedExports => "sort-named-exports",
            RuleName::SortExportAttributes => "sort-export-attributes",
        }
    }
}

impl FromStr for RuleName {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleName::ALL
            .into_iter()
            .find(|rule| rule.as_str() == s)
            .ok_or_else(|| SortError::parse_error(&format!("unknown rule: {s}")))
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edits and diagnostics one rule produced for one source text
#[derive(Debug, Clone)]
pub struct RuleOutput {
    pub rule: RuleName,
    pub edits: Vec<Edit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RuleOutput {
    pub fn new(rule: RuleName) -> Self {
        Self {
            rule,
            edits: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.edits.is_empty() && self.diagnostics.is_empty()
    }
}

/// JSON configuration: a shared `settings` block plus one object per rule
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub settings: Option<Value>,
    pub rules: BTreeMap<RuleName, Value>,
}

impl ConfigFile {
    pub fn from_json(text: &str) -> SortResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let map = value
            .as_object()
            .ok_or_else(|| SortError::invalid_option("config", "must be an object"))?;
        let mut allowed = vec!["settings"];
        allowed.extend(RuleName::ALL.iter().map(|rule| rule.as_str()));
        check_keys(map, &allowed, "config")?;

        let mut config = ConfigFile {
            settings: map.get("settings").cloned(),
            rules: BTreeMap::new(),
        };
        for rule in RuleName::ALL {
            if let Some(options) = map.get(rule.as_str()) {
                config.rules.insert(rule, options.clone());
            }
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> SortResult<Self> {
        let text = fs::read_to_string(path).with_file_context(&path.display().to_string())?;
        Self::from_json(&text)
    }

    /// Options object of `rule`, created empty when absent
    pub fn rule_options_mut(&mut self, rule: RuleName) -> SortResult<&mut Map<String, Value>> {
        self.rules
            .entry(rule)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| SortError::invalid_option(rule.as_str(), "options must be an object"))
    }
}

/// Validated options for every enabled rule
#[derive(Debug, Clone)]
pub struct RuleSet {
    imports: Option<SortImportsOptions>,
    named_imports: Option<SortNamedImportsOptions>,
    import_attributes: Option<SortImportAttributesOptions>,
    named_exports: Option<SortNamedExportsOptions>,
    export_attributes: Option<SortExportAttributesOptions>,
    cache: Arc<GroupCache>,
}

impl RuleSet {
    pub fn new(config: &ConfigFile, enabled: &[RuleName], cache: Arc<GroupCache>) -> SortResult<Self> {
        let settings = config.settings.as_ref();
        let options_for = |rule: RuleName| enabled.contains(&rule).then(|| config.rules.get(&rule));
        Ok(Self {
            imports: options_for(RuleName::SortImports)
                .map(|options| SortImportsOptions::from_json(settings, options))
                .transpose()?,
            named_imports: options_for(RuleName::SortNamedImports)
                .map(|options| SortNamedImportsOptions::from_json(settings, options))
                .transpose()?,
            import_attributes: options_for(RuleName::SortImportAttributes)
                .map(|options| SortImportAttributesOptions::from_json(settings, options))
                .transpose()?,
            named_exports: options_for(RuleName::SortNamedExports)
                .map(|options| SortNamedExportsOptions::from_json(settings, options))
                .transpose()?,
            export_attributes: options_for(RuleName::SortExportAttributes)
                .map(|options| SortExportAttributesOptions::from_json(settings, options))
                .transpose()?,
            cache,
        })
    }

    pub fn enabled(&self) -> Vec<RuleName> {
        let mut rules = Vec::new();
        if self.imports.is_some() {
            rules.push(RuleName::SortImports);
        }
        if self.named_imports.is_some() {
            rules.push(RuleName::SortNamedImports);
        }
        if self.import_attributes.is_some() {
            rules.push(RuleName::SortImportAttributes);
        }
        if self.named_exports.is_some() {
            rules.push(RuleName::SortNamedExports);
        }
        if self.export_attributes.is_some() {
            rules.push(RuleName::SortExportAttributes);
        }
        rules
    }

    fn run_rule(&self, rule: RuleName, source: &str, module: &scanner::ScannedModule) -> SortResult<Option<RuleOutput>> {
        let output = match rule {
            RuleName::SortImports => self
                .imports
                .as_ref()
                .map(|options| sort_imports::run(source, module, options, &self.cache)),
            RuleName::SortNamedImports => self
                .named_imports
                .as_ref()
                .map(|options| sort_named_imports::run(source, module, options, &self.cache)),
            RuleName::SortImportAttributes => self
                .import_attributes
                .as_ref()
                .map(|options| sort_import_attributes::run(source, module, options, &self.cache)),
            RuleName::SortNamedExports => self
                .named_exports
                .as_ref()
                .map(|options| sort_named_exports::run(source, module, options, &self.cache)),
            RuleName::SortExportAttributes => self
                .export_attributes
                .as_ref()
                .map(|options| sort_export_attributes::run(source, module, options, &self.cache)),
        };
        output.transpose()
    }

    /// Run every enabled rule against the unmodified source
    pub fn check(&self, source: &str) -> SortResult<Vec<RuleOutput>> {
        let module = scanner::scan(source);
        let mut outputs = Vec::new();
        for rule in self.enabled() {
            outputs.extend(self.run_rule(rule, source, &module)?);
        }
        Ok(outputs)
    }

    /// Apply rules one at a time, rescanning after each, until nothing changes
    pub fn fix(&self, source: &str) -> SortResult<String> {
        let mut current = source.to_string();
        for pass in 1..=MAX_FIX_PASSES {
            let mut changed = false;
            for rule in self.enabled() {
                let module = scanner::scan(&current);
                let Some(output) = self.run_rule(rule, &current, &module)? else {
                    continue;
                };
                if !output.edits.is_empty() {
                    debug!("{}: applying {} edit(s) in pass {}", rule, output.edits.len(), pass);
                    current = apply_edits(&current, &output.edits)?;
                    changed = true;
                }
            }
            if !changed {
                return Ok(current);
            }
        }
        warn!("fixes did not settle after {} passes", MAX_FIX_PASSES);
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_set(config: &str) -> RuleSet {
        let config = ConfigFile::from_json(config).expect("Failed to parse config");
        RuleSet::new(&config, &RuleName::ALL, Arc::new(GroupCache::new())).expect("Failed to build rules")
    }

    #[test]
    fn test_rule_name_round_trip() {
        for rule in RuleName::ALL {
            assert_eq!(rule.as_str().parse::<RuleName>().expect("Failed to parse rule"), rule);
        }
        assert!("sort-exports".parse::<RuleName>().is_err());
    }

    #[test]
    fn test_config_rejects_unknown_sections() {
        let err = ConfigFile::from_json(r#"{ "sort-exports": {} }"#).expect_err("Failed to reject key");
        assert_eq!(err.to_string(), "Invalid config: sort-exports");
    }

    #[test]
    fn test_settings_apply_to_every_rule() {
        let rules = rule_set(r#"{ "settings": { "order": "desc" } }"#);
        let fixed = rules
            .fix("import { a, b } from 'a'\nimport { c, d } from 'b'\n")
            .expect("Failed to fix");
        assert_eq!(fixed, "import { d, c } from 'b'\nimport { b, a } from 'a'\n");
    }

    #[test]
    fn test_fix_runs_all_rules_and_settles() {
        let rules = rule_set("{}");
        let source = "import z from './z'\nimport { d, c } from 'react' with { type: 'x', mode: 'y' }\n";
        let fixed = rules.fix(source).expect("Failed to fix");
        assert_eq!(
            fixed,
            "import { c, d } from 'react' with { mode: 'y', type: 'x' }\n\nimport z from './z'\n"
        );
        assert!(rules
            .check(&fixed)
            .expect("Failed to check")
            .iter()
            .all(RuleOutput::is_clean));
    }

    #[test]
    fn test_fix_sorts_export_lists() {
        let rules = rule_set(r#"{ "sort-named-exports": { "ignoreAlias": true } }"#);
        let source = "import { b, a } from 'a'\nexport { y as b, x } from './x' with { type: 't', mode: 'm' }\n";
        let fixed = rules.fix(source).expect("Failed to fix");
        assert_eq!(
            fixed,
            "import { a, b } from 'a'\nexport { x, y as b } from './x' with { mode: 'm', type: 't' }\n"
        );
        assert!(rules
            .check(&fixed)
            .expect("Failed to check")
            .iter()
            .all(RuleOutput::is_clean));
    }

    #[test]
    fn test_only_enabled_rules_run() {
        let config = ConfigFile::default();
        let rules = RuleSet::new(&config, &[RuleName::SortNamedImports], Arc::new(GroupCache::new()))
            .expect("Failed to build rules");
        assert_eq!(rules.enabled(), vec![RuleName::SortNamedImports]);
        let source = "import b from 'b'\nimport { y, x } from 'a'\n";
        assert_eq!(
            rules.fix(source).expect("Failed to fix"),
            "import b from 'b'\nimport { x, y } from 'a'\n"
        );
    }

    #[test]
    fn test_rule_options_mut() {
        let mut config = ConfigFile::default();
        config
            .rule_options_mut(RuleName::SortImports)
            .expect("Failed to get options")
            .insert("order".to_string(), Value::from("desc"));
        let rules = RuleSet::new(&config, &[RuleName::SortImports], Arc::new(GroupCache::new()))
            .expect("Failed to build rules");
        assert_eq!(
            rules.fix("import a from 'a'\nimport b from 'b'\n").expect("Failed to fix"),
            "import b from 'b'\nimport a from 'a'\n"
        );
    }
}

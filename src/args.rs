use crate::config::{NewlinesOption, SortOrder, SortType};
use crate::error::SortResult;
use crate::rules::{ConfigFile, RuleName};
use serde_json::Value;
use std::path::Path;

/// Command line arguments for the import sorter
#[derive(Debug, Clone, Default)]
pub struct SortArgs {
    pub files: Vec<String>,
    /// Report instead of rewriting
    pub check: bool,
    pub config: Option<String>,
    /// Rules to run; empty means all
    pub rules: Vec<RuleName>,
    pub sort_type: Option<SortType>,
    pub order: Option<SortOrder>,
    pub ignore_case: Option<bool>,
    pub newlines_between: Option<NewlinesOption>,
    /// Worker threads; defaults to the number of CPUs
    pub jobs: Option<usize>,
    pub verbose: u8,
}

impl SortArgs {
    pub fn reads_stdin(&self) -> bool {
        self.files.is_empty() || (self.files.len() == 1 && self.files[0] == "-")
    }

    pub fn enabled_rules(&self) -> Vec<RuleName> {
        if self.rules.is_empty() {
            RuleName::ALL.to_vec()
        } else {
            self.rules.clone()
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs.filter(|jobs| *jobs > 0).unwrap_or_else(num_cpus::get)
    }

    /// Config file, if any, with command line overrides written into `sort-imports`
    pub fn load_config(&self) -> SortResult<ConfigFile> {
        let mut config = match &self.config {
            Some(path) => ConfigFile::load(Path::new(path))?,
            None => ConfigFile::default(),
        };

        let mut overrides: Vec<(&str, Value)> = Vec::new();
        if let Some(sort_type) = self.sort_type {
            overrides.push(("type", Value::from(sort_type.to_string())));
        }
        if let Some(order) = self.order {
            overrides.push(("order", Value::from(order.to_string())));
        }
        if let Some(ignore_case) = self.ignore_case {
            overrides.push(("ignoreCase", Value::from(ignore_case)));
        }
        if let Some(newlines) = self.newlines_between {
            let value = match newlines {
                NewlinesOption::Ignore => Value::from("ignore"),
                NewlinesOption::Count(count) => Value::from(count),
            };
            overrides.push(("newlinesBetween", value));
        }

        if !overrides.is_empty() {
            let options = config.rule_options_mut(RuleName::SortImports)?;
            for (key, value) in overrides {
                options.insert(key.to_string(), value);
            }
        }
        Ok(config)
    }
}

//! Import declaration sorting in Rust
//!
//! This crate scans JavaScript and TypeScript modules for import declarations and
//! reorders them by configurable groups, partitions and comparators. The engine
//! produces minimal text edits plus diagnostics, and the command line tool applies
//! or reports them across many files in parallel.

#![warn(clippy::all)]

pub mod error;
pub mod config;

// Sorting engine
pub mod item;
pub mod groups;
pub mod resolve;
pub mod locale;
pub mod compare;
pub mod partition;
pub mod dependency;
pub mod core_sort;

// Text handling and output
pub mod text;
pub mod edits;
pub mod diagnostics;

pub mod rules;
pub mod args;

// Re-export commonly used types
pub use args::SortArgs;
pub use config::{SortOptions, SortOptionsBuilder, SortOrder, SortType};
pub use core_sort::{CoreSort, SortOutcome, SortRequest};
pub use diagnostics::{Diagnostic, MessageId};
pub use edits::Edit;
pub use error::{SortError, SortResult};
pub use resolve::GroupCache;
pub use rules::{ConfigFile, RuleName, RuleSet};

use error::SortContext;
use log::{debug, info};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Exit codes
pub const EXIT_SUCCESS: i32 = 0;
/// Check mode found unsorted input
pub const EXIT_FAILURE: i32 = 1;
/// Bad options, configuration or input files
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_INTERNAL: i32 = 3;

const STDIN_NAME: &str = "<stdin>";

/// Result of processing one file
#[derive(Debug, Default)]
struct FileReport {
    /// Check mode: `path:line:column: message [rule]` lines
    messages: Vec<String>,
    changed: bool,
}

fn report_outputs(path: &str, source: &str, outputs: &[rules::RuleOutput]) -> FileReport {
    let mut report = FileReport::default();
    for output in outputs {
        report.changed |= !output.edits.is_empty();
        for diagnostic in &output.diagnostics {
            let (line, column) = text::line_column(source, diagnostic.range.start);
            report
                .messages
                .push(format!("{}:{}:{}: {} [{}]", path, line, column, diagnostic, output.rule));
        }
    }
    report.changed |= !report.messages.is_empty();
    report
}

fn process_file(rules: &RuleSet, path: &str, check: bool) -> SortResult<FileReport> {
    let source = fs::read_to_string(path).with_file_context(path)?;
    if check {
        let outputs = rules.check(&source)?;
        return Ok(report_outputs(path, &source, &outputs));
    }

    let fixed = rules.fix(&source)?;
    if fixed == source {
        debug!("{}: already sorted", path);
        return Ok(FileReport::default());
    }
    fs::write(path, &fixed).with_file_context(path)?;
    info!("{}: rewritten", path);
    Ok(FileReport {
        messages: Vec::new(),
        changed: true,
    })
}

fn process_stdin(rules: &RuleSet, check: bool) -> SortResult<i32> {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source)?;

    if check {
        let report = report_outputs(STDIN_NAME, &source, &rules.check(&source)?);
        for message in &report.messages {
            println!("{}", message);
        }
        return Ok(if report.changed { EXIT_FAILURE } else { EXIT_SUCCESS });
    }

    let fixed = rules.fix(&source)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(fixed.as_bytes())?;
    stdout.flush()?;
    Ok(EXIT_SUCCESS)
}

/// Main entry point: sort or check every input according to `args`
pub fn process(args: &SortArgs) -> SortResult<i32> {
    let config = args.load_config()?;
    let cache = Arc::new(GroupCache::new());
    let rules = RuleSet::new(&config, &args.enabled_rules(), cache)?;
    debug!("enabled rules: {:?}", rules.enabled());

    if args.reads_stdin() {
        return process_stdin(&rules, args.check);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs())
        .build()
        .map_err(|e| SortError::thread_pool_error(&e.to_string()))?;

    let results: Vec<(&String, SortResult<FileReport>)> = pool.install(|| {
        args.files
            .par_iter()
            .map(|path| (path, process_file(&rules, path, args.check)))
            .collect()
    });

    let mut exit_code = EXIT_SUCCESS;
    let mut changed = 0usize;
    for (path, result) in results {
        match result {
            Ok(report) => {
                for message in &report.messages {
                    println!("{}", message);
                }
                if report.changed {
                    changed += 1;
                    if args.check {
                        exit_code = exit_code.max(EXIT_FAILURE);
                    }
                }
            }
            Err(e) => {
                eprintln!("import-sort: {}: {}", path, e);
                exit_code = exit_code.max(e.exit_code());
            }
        }
    }

    info!(
        "{} of {} file(s) {}",
        changed,
        args.files.len(),
        if args.check { "need sorting" } else { "rewritten" }
    );
    Ok(exit_code)
}

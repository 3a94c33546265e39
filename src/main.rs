//! Import sorter command line tool
//!
//! Rewrites or checks the import declarations of JavaScript and TypeScript
//! files according to a JSON configuration.

use clap::{Arg, ArgAction, Command};
use log::LevelFilter;
use std::process;

use import_sort::{
    args::SortArgs,
    config::{NewlinesOption, SortOrder, SortType},
    error::{SortError, SortResult},
    process as sort_inputs,
    rules::RuleName,
};

fn main() {
    let result = run();
    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("import-sort: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run() -> SortResult<i32> {
    let matches = build_cli().get_matches();
    let args = parse_args_from_matches(&matches)?;
    init_logging(args.verbose);
    sort_inputs(&args)
}

/// `-v` raises the level once per occurrence; `RUST_LOG` still wins
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

fn build_cli() -> Command {
    Command::new("import-sort")
        .version(env!("CARGO_PKG_VERSION"))
        .override_usage("import-sort [OPTION]... [FILE]...")
        .about("Sort import declarations")
        .long_about("Sort the import declarations of JavaScript and TypeScript files by groups, partitions and dependencies.\n\nWith no FILE, or when FILE is -, read standard input and write the sorted text to standard output.")

        .arg(Arg::new("files")
            .help("Files to sort (use '-' or omit for stdin)")
            .num_args(0..)
            .value_name("FILE"))

        // Mode
        .arg(Arg::new("check")
            .short('c')
            .long("check")
            .help("Report unsorted imports instead of rewriting; exit 1 if any")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("write")
            .short('w')
            .long("write")
            .help("Rewrite files in place (default)")
            .action(ArgAction::SetTrue)
            .conflicts_with("check"))

        // Configuration
        .arg(Arg::new("config")
            .long("config")
            .help("JSON configuration file")
            .value_name("FILE"))
        .arg(Arg::new("rule")
            .short('r')
            .long("rule")
            .help("Run only this rule (may be repeated)")
            .value_name("RULE")
            .value_parser([
                "sort-imports",
                "sort-named-imports",
                "sort-import-attributes",
                "sort-named-exports",
                "sort-export-attributes",
            ])
            .action(ArgAction::Append))
        .arg(Arg::new("type")
            .short('t')
            .long("type")
            .help("Comparator for sort-imports")
            .value_name("TYPE")
            .value_parser(["alphabetical", "natural", "line-length", "custom", "unsorted"]))
        .arg(Arg::new("order")
            .long("order")
            .help("Sort direction for sort-imports")
            .value_name("ORDER")
            .value_parser(["asc", "desc"]))
        .arg(Arg::new("ignore-case")
            .long("ignore-case")
            .help("Compare names case-insensitively in sort-imports")
            .value_name("BOOL")
            .value_parser(clap::value_parser!(bool)))
        .arg(Arg::new("newlines-between")
            .long("newlines-between")
            .help("Blank lines between groups in sort-imports: a number or 'ignore'")
            .value_name("N"))

        // Performance
        .arg(Arg::new("jobs")
            .short('j')
            .long("jobs")
            .help("Number of files processed in parallel")
            .value_name("N")
            .value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Increase logging output (repeat for more)")
            .action(ArgAction::Count))
}

fn parse_args_from_matches(matches: &clap::ArgMatches) -> SortResult<SortArgs> {
    let files: Vec<String> = matches
        .get_many::<String>("files")
        .unwrap_or_default()
        .cloned()
        .collect();

    let rules = matches
        .get_many::<String>("rule")
        .unwrap_or_default()
        .map(|name| name.parse::<RuleName>())
        .collect::<SortResult<Vec<_>>>()?;

    let sort_type = matches
        .get_one::<String>("type")
        .map(|value| value.parse::<SortType>())
        .transpose()?;
    let order = matches
        .get_one::<String>("order")
        .map(|value| value.parse::<SortOrder>())
        .transpose()?;
    let newlines_between = matches
        .get_one::<String>("newlines-between")
        .map(|value| value.parse::<NewlinesOption>())
        .transpose()?;

    if let Some(0) = matches.get_one::<usize>("jobs") {
        return Err(SortError::parse_error("invalid number of jobs: 0"));
    }

    Ok(SortArgs {
        files,
        check: matches.get_flag("check"),
        config: matches.get_one::<String>("config").cloned(),
        rules,
        sort_type,
        order,
        ignore_case: matches.get_one::<bool>("ignore-case").copied(),
        newlines_between,
        jobs: matches.get_one::<usize>("jobs").copied(),
        verbose: matches.get_count("verbose"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_args() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from(["import-sort", "--check", "a.ts", "b.ts"])
            .expect("Failed to parse test arguments");

        let args = parse_args_from_matches(&matches).expect("Failed to parse test args");

        assert!(args.check);
        assert_eq!(args.files, vec!["a.ts".to_string(), "b.ts".to_string()]);
        assert_eq!(args.enabled_rules(), RuleName::ALL.to_vec());
        assert!(!args.reads_stdin());
    }

    #[test]
    fn test_parse_sort_overrides() {
        let app = build_cli();
        let matches = app
            .try_get_matches_from([
                "import-sort",
                "-t", "natural",
                "--order", "desc",
                "--ignore-case", "false",
                "--newlines-between", "0",
                "-r", "sort-imports",
                "-r", "sort-named-imports",
                "-r", "sort-export-attributes",
                "-j", "4",
                "-vv",
            ])
            .expect("Failed to parse test arguments");

        let args = parse_args_from_matches(&matches).expect("Failed to parse test args");

        assert_eq!(args.sort_type, Some(SortType::Natural));
        assert_eq!(args.order, Some(SortOrder::Desc));
        assert_eq!(args.ignore_case, Some(false));
        assert_eq!(args.newlines_between, Some(NewlinesOption::Count(0)));
        assert_eq!(
            args.rules,
            vec![RuleName::SortImports, RuleName::SortNamedImports, RuleName::SortExportAttributes]
        );
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.verbose, 2);
        assert!(args.reads_stdin());
    }

    #[test]
    fn test_conflicting_modes() {
        let app = build_cli();
        let result = app.try_get_matches_from(["import-sort", "--check", "--write"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values() {
        let matches = build_cli()
            .try_get_matches_from(["import-sort", "--newlines-between", "many"])
            .expect("Failed to parse test arguments");
        assert!(parse_args_from_matches(&matches).is_err());

        let matches = build_cli()
            .try_get_matches_from(["import-sort", "-j", "0"])
            .expect("Failed to parse test arguments");
        assert!(parse_args_from_matches(&matches).is_err());

        assert!(build_cli()
            .try_get_matches_from(["import-sort", "--type", "random"])
            .is_err());
    }
}

//! Error handling for the sorting engine and the command line tool

use std::io;
use thiserror::Error;

/// Guidance shown when a regex option is given in a non-string form
pub const REGEX_AS_STRING_HINT: &str = "Invalid configuration: please enter your RegExp expressions as strings.\nFor example, write \".*foo\" instead of /.*foo/";

/// Custom error type for sort operations
#[derive(Error, Debug)]
pub enum SortError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No such file or directory: {file}")]
    FileNotFound { file: String },

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`alphabet` option must not be empty")]
    EmptyAlphabet,

    #[error("Duplicated group(s): {}", groups.join(", "))]
    DuplicatedGroups { groups: Vec<String> },

    #[error("Invalid group(s): {}", groups.join(", "))]
    InvalidGroups { groups: Vec<String> },

    #[error("Consecutive `newlinesBetween` objects are not allowed")]
    ConsecutiveNewlinesMarkers,

    #[error("Invalid {scope}: {}", keys.join(", "))]
    UnknownOption { scope: String, keys: Vec<String> },

    #[error("Partition comment pattern must define `block` or `line`")]
    EmptyCommentPattern,

    #[error("{}", REGEX_AS_STRING_HINT)]
    RegexNotString,

    #[error("Invalid regular expression `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Invalid value for `{option}`: {message}")]
    InvalidOption { option: String, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Thread pool error: {message}")]
    ThreadPoolError { message: String },

    #[error("Unreachable state: {context}")]
    Unreachable { context: String },
}

impl SortError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SortError::Unreachable { .. } | SortError::ThreadPoolError { .. } => crate::EXIT_INTERNAL,
            _ => crate::EXIT_CONFIG,
        }
    }

    /// True for errors raised while checking options, before any item is touched
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SortError::EmptyAlphabet
                | SortError::DuplicatedGroups { .. }
                | SortError::InvalidGroups { .. }
                | SortError::ConsecutiveNewlinesMarkers
                | SortError::UnknownOption { .. }
                | SortError::EmptyCommentPattern
                | SortError::RegexNotString
                | SortError::InvalidRegex { .. }
                | SortError::InvalidOption { .. }
                | SortError::Json(_)
        )
    }

    /// Create a file not found error
    pub fn file_not_found(file: &str) -> Self {
        SortError::FileNotFound {
            file: file.to_string(),
        }
    }

    /// Create an empty alphabet error
    pub fn empty_alphabet() -> Self {
        SortError::EmptyAlphabet
    }

    /// Create a duplicated groups error
    pub fn duplicated_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SortError::DuplicatedGroups {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid groups error
    pub fn invalid_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SortError::InvalidGroups {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an unknown option error for the given scope ("options", "settings")
    pub fn unknown_option<I, S>(scope: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SortError::UnknownOption {
            scope: scope.to_string(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid regex error
    pub fn invalid_regex(pattern: &str, message: &str) -> Self {
        SortError::InvalidRegex {
            pattern: pattern.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an invalid option value error
    pub fn invalid_option(option: &str, message: &str) -> Self {
        SortError::InvalidOption {
            option: option.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse_error(message: &str) -> Self {
        SortError::ParseError {
            message: message.to_string(),
        }
    }

    /// Create a thread pool error
    pub fn thread_pool_error(message: &str) -> Self {
        SortError::ThreadPoolError {
            message: message.to_string(),
        }
    }

    /// Create an unreachable state error
    pub fn unreachable(context: &str) -> Self {
        SortError::Unreachable {
            context: context.to_string(),
        }
    }
}

/// Result type for sort operations
pub type SortResult<T> = Result<T, SortError>;

/// Context trait for adding file names to I/O errors
pub trait SortContext<T> {
    fn with_file_context(self, filename: &str) -> SortResult<T>;
}

impl<T> SortContext<T> for Result<T, io::Error> {
    fn with_file_context(self, filename: &str) -> SortResult<T> {
        self.map_err(|io_err| match io_err.kind() {
            io::ErrorKind::NotFound => SortError::file_not_found(filename),
            _ => SortError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", filename, io_err),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicated_groups_message() {
        let err = SortError::duplicated_groups(["group1", "group2"]);
        assert_eq!(err.to_string(), "Duplicated group(s): group1, group2");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_regex_hint_message() {
        let err = SortError::RegexNotString;
        assert!(err.to_string().starts_with("Invalid configuration"));
        assert!(err.to_string().contains("\".*foo\""));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SortError::empty_alphabet().exit_code(), crate::EXIT_CONFIG);
        assert_eq!(
            SortError::unreachable("selector").exit_code(),
            crate::EXIT_INTERNAL
        );
        assert!(!SortError::unreachable("selector").is_configuration());
    }

    #[test]
    fn test_file_context() {
        let result: Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        match result.with_file_context("a.ts") {
            Err(SortError::FileNotFound { file }) => assert_eq!(file, "a.ts"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

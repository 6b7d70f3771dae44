//! Validation issues and their categories.

use serde::Serialize;
use thiserror::Error;

use crate::model::GroupLevel;
use crate::placeholder::PlaceholderError;

/// Coarse classification shown to users and used for exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    MalformedInput,
    MissingRequiredColumn,
    UnknownPlaceholder,
    InvalidPlaceholder,
    SecurityViolation,
    LimitExceeded,
    MissingResultColumn,
}

impl IssueCategory {
    /// Fatal categories make a result invalid; the rest are advisory.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IssueCategory::MissingResultColumn)
    }
}

/// A single problem found in System SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("SQL query cannot be empty")]
    EmptySql,

    #[error("SQL must start with SELECT or WITH")]
    NotAQuery,

    #[error("SQL must contain a FROM clause")]
    MissingFrom,

    #[error(
        "Result column name '{name}' must start with a letter and contain only letters, digits and underscores"
    )]
    InvalidResultColumnName { name: String },

    #[error("SQL could not be parsed: {message}")]
    ParseFailed { message: String },

    #[error("{level}-level calculations must select {qualified} (missing required column '{column}')")]
    MissingRequiredColumn {
        column: &'static str,
        qualified: &'static str,
        level: GroupLevel,
    },

    #[error("Result column '{name}' was not found in the SELECT list")]
    MissingResultColumn { name: String },

    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    #[error("Blocked keyword '{keyword}' is not allowed in calculation SQL")]
    BlockedKeyword { keyword: String },

    #[error("Multiple SQL statements are not allowed: found ';' followed by another statement")]
    MultipleStatements,

    #[error("SQL is {length} characters long; the maximum is {max}")]
    SqlTooLong { length: usize, max: usize },

    #[error("SQL contains {count} placeholders; the maximum is {max}")]
    TooManyPlaceholders { count: usize, max: usize },
}

impl ValidationIssue {
    pub fn category(&self) -> IssueCategory {
        match self {
            ValidationIssue::EmptySql
            | ValidationIssue::NotAQuery
            | ValidationIssue::MissingFrom
            | ValidationIssue::InvalidResultColumnName { .. }
            | ValidationIssue::ParseFailed { .. } => IssueCategory::MalformedInput,
            ValidationIssue::MissingRequiredColumn { .. } => IssueCategory::MissingRequiredColumn,
            ValidationIssue::MissingResultColumn { .. } => IssueCategory::MissingResultColumn,
            ValidationIssue::Placeholder(PlaceholderError::Unknown { .. }) => {
                IssueCategory::UnknownPlaceholder
            }
            ValidationIssue::Placeholder(_) => IssueCategory::InvalidPlaceholder,
            ValidationIssue::BlockedKeyword { .. } | ValidationIssue::MultipleStatements => {
                IssueCategory::SecurityViolation
            }
            ValidationIssue::SqlTooLong { .. } | ValidationIssue::TooManyPlaceholders { .. } => {
                IssueCategory::LimitExceeded
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }
}

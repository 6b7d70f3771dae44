//! Placeholder grammar for System SQL.
//!
//! Administrators write `{name}` tokens that are replaced with concrete
//! values when a calculation runs. The vocabulary is fixed and versioned
//! with the schema catalog:
//!
//! | Token                          | Category        | Replaced with                     |
//! |--------------------------------|-----------------|-----------------------------------|
//! | `current_cycle`                | period          | anchor cycle code                 |
//! | `previous_cycle`               | period          | anchor minus one month            |
//! | `cycle_minus_2`..`cycle_minus_12` | period       | anchor minus N months             |
//! | `deal_filter`                  | filter          | `deal.dl_nbr IN (...)`            |
//! | `deal_tranche_filter`          | filter          | per-deal tranche predicate        |
//! | `deal_numbers`                 | identifier list | `(n1, n2, ...)`                   |
//!
//! Anything else between braces is an error, as are nested braces, empty
//! tokens and names containing whitespace. Braces inside SQL comments are
//! ignored.

mod substitute;

use std::collections::HashSet;
use std::ops::Range;

use serde::Serialize;
use thiserror::Error;

use crate::sql::lexer::mask_comments;

pub use substitute::{substitute, CycleCode, DealSelection, ExecutionParams, SubstitutionError};

/// Version of the placeholder vocabulary.
pub const GRAMMAR_VERSION: u32 = 1;

/// Largest `N` accepted in `cycle_minus_N`.
pub const MAX_CYCLE_OFFSET: u32 = 12;

/// How a placeholder is substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderCategory {
    /// An integer cycle code relative to the anchor cycle.
    Period,
    /// A boolean predicate built from the deal/tranche selection.
    Filter,
    /// A parenthesized literal list.
    IdentifierList,
}

impl std::fmt::Display for PlaceholderCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PlaceholderCategory::Period => "period",
            PlaceholderCategory::Filter => "filter",
            PlaceholderCategory::IdentifierList => "identifier-list",
        })
    }
}

/// A recognized placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    CurrentCycle,
    PreviousCycle,
    /// `cycle_minus_N`, `2 <= N <= 12`.
    CycleMinus(u32),
    DealFilter,
    DealTrancheFilter,
    DealNumbers,
}

impl Placeholder {
    /// Parse a token name (without braces). Names are case-sensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "current_cycle" => Some(Placeholder::CurrentCycle),
            "previous_cycle" => Some(Placeholder::PreviousCycle),
            "deal_filter" => Some(Placeholder::DealFilter),
            "deal_tranche_filter" => Some(Placeholder::DealTrancheFilter),
            "deal_numbers" => Some(Placeholder::DealNumbers),
            _ => {
                let digits = name.strip_prefix("cycle_minus_")?;
                // reject signs and leading zeros so each offset has one spelling
                if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let n: u32 = digits.parse().ok()?;
                (2..=MAX_CYCLE_OFFSET)
                    .contains(&n)
                    .then_some(Placeholder::CycleMinus(n))
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            Placeholder::CurrentCycle => "current_cycle".into(),
            Placeholder::PreviousCycle => "previous_cycle".into(),
            Placeholder::CycleMinus(n) => format!("cycle_minus_{}", n),
            Placeholder::DealFilter => "deal_filter".into(),
            Placeholder::DealTrancheFilter => "deal_tranche_filter".into(),
            Placeholder::DealNumbers => "deal_numbers".into(),
        }
    }

    pub fn category(&self) -> PlaceholderCategory {
        match self {
            Placeholder::CurrentCycle | Placeholder::PreviousCycle | Placeholder::CycleMinus(_) => {
                PlaceholderCategory::Period
            }
            Placeholder::DealFilter | Placeholder::DealTrancheFilter => PlaceholderCategory::Filter,
            Placeholder::DealNumbers => PlaceholderCategory::IdentifierList,
        }
    }

    /// Months back from the anchor, for period tokens.
    pub fn cycle_offset(&self) -> Option<u32> {
        match self {
            Placeholder::CurrentCycle => Some(0),
            Placeholder::PreviousCycle => Some(1),
            Placeholder::CycleMinus(n) => Some(*n),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Placeholder::CurrentCycle => "Cycle code of the reporting period being run".into(),
            Placeholder::PreviousCycle => "Cycle code one month before the current cycle".into(),
            Placeholder::CycleMinus(n) => {
                format!("Cycle code {} months before the current cycle", n)
            }
            Placeholder::DealFilter => "Predicate restricting deal.dl_nbr to the selected deals".into(),
            Placeholder::DealTrancheFilter => {
                "Predicate restricting each selected deal to its selected tranches".into()
            }
            Placeholder::DealNumbers => "Parenthesized list of the selected deal numbers".into(),
        }
    }

    pub fn token(&self) -> PlaceholderToken {
        PlaceholderToken {
            name: self.name(),
            category: self.category(),
            description: self.description(),
        }
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// A vocabulary entry, as shown in UI help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderToken {
    pub name: String,
    pub category: PlaceholderCategory,
    pub description: String,
}

/// Every recognized placeholder, in display order.
pub fn vocabulary() -> Vec<PlaceholderToken> {
    let mut tokens = vec![
        Placeholder::CurrentCycle.token(),
        Placeholder::PreviousCycle.token(),
    ];
    tokens.extend((2..=MAX_CYCLE_OFFSET).map(|n| Placeholder::CycleMinus(n).token()));
    tokens.push(Placeholder::DealFilter.token());
    tokens.push(Placeholder::DealTrancheFilter.token());
    tokens.push(Placeholder::DealNumbers.token());
    tokens
}

/// Grammar errors found while scanning. Offsets are byte offsets into the SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    #[error("Unknown placeholder '{name}'")]
    Unknown { name: String, offset: usize },

    #[error("Nested braces in placeholder starting at offset {offset}")]
    Nested { offset: usize },

    #[error("Empty placeholder '{{}}' at offset {offset}")]
    Empty { offset: usize },

    #[error("Placeholder '{name}' must not contain whitespace")]
    Whitespace { name: String, offset: usize },

    #[error("Placeholder '{name}' may only contain letters, digits and underscores")]
    IllegalCharacter { name: String, offset: usize },

    #[error("Unclosed '{{' at offset {offset}")]
    Unclosed { offset: usize },

    #[error("Unmatched '}}' at offset {offset}")]
    UnmatchedClose { offset: usize },
}

impl PlaceholderError {
    pub fn offset(&self) -> usize {
        match self {
            PlaceholderError::Unknown { offset, .. }
            | PlaceholderError::Nested { offset }
            | PlaceholderError::Empty { offset }
            | PlaceholderError::Whitespace { offset, .. }
            | PlaceholderError::IllegalCharacter { offset, .. }
            | PlaceholderError::Unclosed { offset }
            | PlaceholderError::UnmatchedClose { offset } => *offset,
        }
    }
}

/// One well-formed placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub placeholder: Placeholder,
    /// Byte range of `{name}`, braces included.
    pub span: Range<usize>,
}

/// Result of scanning SQL for placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderScan {
    /// Distinct recognized placeholders in order of first appearance.
    pub placeholders: Vec<Placeholder>,
    /// Every recognized occurrence, in text order.
    pub occurrences: Vec<Occurrence>,
    /// Number of brace groups seen, well-formed or not.
    pub token_count: usize,
    pub errors: Vec<PlaceholderError>,
}

impl PlaceholderScan {
    pub fn names(&self) -> Vec<String> {
        self.placeholders.iter().map(Placeholder::name).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Scan `sql` for `{name}` tokens.
pub fn scan(sql: &str) -> PlaceholderScan {
    let text = mask_comments(sql);
    let mut result = PlaceholderScan::default();
    let mut seen = HashSet::new();

    let mut open: Option<usize> = None;
    let mut depth = 0usize;
    let mut nested = false;

    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    open = Some(i);
                    nested = false;
                    result.token_count += 1;
                } else if !nested {
                    nested = true;
                    result.errors.push(PlaceholderError::Nested {
                        offset: open.unwrap_or(i),
                    });
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    result.errors.push(PlaceholderError::UnmatchedClose { offset: i });
                    continue;
                }
                depth -= 1;
                if depth > 0 || nested {
                    continue;
                }
                let Some(start) = open.take() else { continue };
                let content = &text[start + 1..i];
                match classify(content, start) {
                    Ok(placeholder) => {
                        if seen.insert(placeholder) {
                            result.placeholders.push(placeholder);
                        }
                        result.occurrences.push(Occurrence {
                            placeholder,
                            span: start..i + 1,
                        });
                    }
                    Err(err) => result.errors.push(err),
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        if let Some(start) = open {
            result.errors.push(PlaceholderError::Unclosed { offset: start });
        }
    }

    result
}

fn classify(content: &str, offset: usize) -> Result<Placeholder, PlaceholderError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PlaceholderError::Empty { offset });
    }
    if content.chars().any(char::is_whitespace) {
        return Err(PlaceholderError::Whitespace {
            name: trimmed.to_string(),
            offset,
        });
    }
    if !content.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PlaceholderError::IllegalCharacter {
            name: content.to_string(),
            offset,
        });
    }
    Placeholder::parse(content).ok_or_else(|| PlaceholderError::Unknown {
        name: content.to_string(),
        offset,
    })
}

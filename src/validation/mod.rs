//! Structural validation of System SQL.
//!
//! The validator is lexical: it masks comments (and, for most checks,
//! string literal contents), tokenizes what is left and runs a fixed
//! sequence of checks. Every check appends to the same issue list so the
//! author sees all problems at once:
//!
//! 1. resource guards (length, placeholder count)
//! 2. entry conditions (starts with SELECT or WITH, has FROM)
//! 3. required grouping columns in the top-level SELECT list
//! 4. result column name shape and presence
//! 5. placeholder grammar
//! 6. security deny-list and multi-statement detection
//! 7. optional strict parse through sqlparser
//!
//! The security gate runs on SQL with comments removed but string literals
//! intact, so a blocked keyword quoted inside a literal is still rejected.
//! Comments are located both lexically and by each dialect's tokenizer, and
//! a keyword visible in any of those readings is rejected. Those are known
//! false positives; a false negative is never acceptable.

mod definition;
mod error;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::model::GroupLevel;
use crate::placeholder::{self, Placeholder, PlaceholderCategory};
use crate::sql::lexer::{mask_comments, mask_literals, tokenize, tokenize_unquoted, Lexeme};
use crate::sql::parse::{check_syntax, strip_comments};
use crate::sql::Dialect;

pub use definition::{check_definition, DefinitionError};
pub use error::{IssueCategory, ValidationIssue};

static RESULT_COLUMN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// Keywords rejected anywhere outside comments.
pub const BLOCKED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "TRUNCATE", "CREATE", "MERGE", "GRANT",
    "REVOKE", "EXEC", "EXECUTE",
];

pub const DEFAULT_MAX_SQL_LENGTH: usize = 50_000;
pub const DEFAULT_MAX_PLACEHOLDERS: usize = 100;

/// Whether `name` can be used verbatim as a result column identifier.
pub fn is_valid_result_column_name(name: &str) -> bool {
    RESULT_COLUMN_PATTERN.is_match(name)
}

/// Validator limits and switches.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorOptions {
    /// Longer SQL is rejected before any scanning.
    pub max_sql_length: usize,
    /// More placeholder tokens than this skips placeholder name checks.
    pub max_placeholders: usize,
    /// Parse with sqlparser once the lexical checks pass.
    pub strict_parse: bool,
    /// Parser dialect for the strict pass.
    pub dialect: Dialect,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            max_sql_length: DEFAULT_MAX_SQL_LENGTH,
            max_placeholders: DEFAULT_MAX_PLACEHOLDERS,
            strict_parse: false,
            dialect: Dialect::default(),
        }
    }
}

/// Outcome of one validation call.
///
/// Serialized in the camelCase shape the UI consumes; the typed issues are
/// kept alongside for callers that branch on categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub placeholders_used: Vec<String>,
    pub has_ctes: bool,
    pub has_subqueries: bool,
    pub used_tables: Vec<String>,
    #[serde(skip)]
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn new(issues: Vec<ValidationIssue>, placeholders_used: Vec<String>, shape: Shape) -> Self {
        let (fatal, advisory): (Vec<_>, Vec<_>) = issues.iter().partition(|i| i.is_fatal());
        let errors: Vec<String> = fatal.into_iter().map(ToString::to_string).collect();
        let warnings = advisory.into_iter().map(ToString::to_string).collect();

        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            placeholders_used,
            has_ctes: shape.has_ctes,
            has_subqueries: shape.has_subqueries,
            used_tables: shape.used_tables,
            issues,
        }
    }

    fn rejected(issue: ValidationIssue) -> Self {
        Self::new(vec![issue], Vec::new(), Shape::default())
    }

    /// Drives the "complex query" badge.
    pub fn is_complex(&self) -> bool {
        self.has_ctes || self.has_subqueries || self.used_tables.len() > 1
    }

    pub fn has_category(&self, category: IssueCategory) -> bool {
        self.issues.iter().any(|i| i.category() == category)
    }
}

/// Validate System SQL with default options.
pub fn validate(sql: &str, group_level: GroupLevel, result_column: &str) -> ValidationResult {
    Validator::default().validate(sql, group_level, result_column)
}

/// Validate System SQL with explicit options.
pub fn validate_with_options(
    sql: &str,
    group_level: GroupLevel,
    result_column: &str,
    options: &ValidatorOptions,
) -> ValidationResult {
    Validator::new(options.clone()).validate(sql, group_level, result_column)
}

/// Stateless validator carrying its options.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    pub fn validate(
        &self,
        sql: &str,
        group_level: GroupLevel,
        result_column: &str,
    ) -> ValidationResult {
        let length = sql.chars().count();
        if length > self.options.max_sql_length {
            tracing::warn!(length, max = self.options.max_sql_length, "SQL rejected by length guard");
            return ValidationResult::rejected(ValidationIssue::SqlTooLong {
                length,
                max: self.options.max_sql_length,
            });
        }
        if sql.trim().is_empty() {
            return ValidationResult::rejected(ValidationIssue::EmptySql);
        }

        let mut issues = Vec::new();

        let structural = mask_literals(sql);
        let lexemes = tokenize(&structural);
        let select_list = top_level_select_list(&lexemes);

        check_entry(&lexemes, &mut issues);
        check_required_columns(&select_list, group_level, &mut issues);
        check_result_column(&select_list, result_column, &mut issues);
        let placeholders_used = self.check_placeholders(sql, &mut issues);
        check_security(sql, &mut issues);

        if self.options.strict_parse && !issues.iter().any(ValidationIssue::is_fatal) {
            if let Err(message) = check_syntax(&neutralize_placeholders(sql), self.options.dialect) {
                issues.push(ValidationIssue::ParseFailed { message });
            }
        }

        let result = ValidationResult::new(issues, placeholders_used, detect_shape(&lexemes));
        tracing::debug!(
            valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            placeholders = result.placeholders_used.len(),
            "validated system sql"
        );
        result
    }

    fn check_placeholders(&self, sql: &str, issues: &mut Vec<ValidationIssue>) -> Vec<String> {
        let scan = placeholder::scan(sql);
        if scan.token_count > self.options.max_placeholders {
            issues.push(ValidationIssue::TooManyPlaceholders {
                count: scan.token_count,
                max: self.options.max_placeholders,
            });
            return Vec::new();
        }
        let names = scan.names();
        issues.extend(scan.errors.into_iter().map(ValidationIssue::from));
        names
    }
}

fn check_entry(lexemes: &[Lexeme<'_>], issues: &mut Vec<ValidationIssue>) {
    let starts_with_query = lexemes
        .first()
        .is_some_and(|l| l.is_keyword("SELECT") || l.is_keyword("WITH"));
    if !starts_with_query {
        issues.push(ValidationIssue::NotAQuery);
    }

    let has_from = lexemes
        .iter()
        .enumerate()
        .any(|(i, l)| l.is_keyword("FROM") && is_query_from(lexemes, i));
    if !has_from {
        issues.push(ValidationIssue::MissingFrom);
    }
}

fn required_columns(level: GroupLevel) -> &'static [(&'static str, &'static str)] {
    match level {
        GroupLevel::Deal => &[("dl_nbr", "deal.dl_nbr")],
        GroupLevel::Tranche => &[("dl_nbr", "deal.dl_nbr"), ("tr_id", "tranche.tr_id")],
    }
}

fn check_required_columns(
    items: &[&[Lexeme<'_>]],
    level: GroupLevel,
    issues: &mut Vec<ValidationIssue>,
) {
    if items.iter().any(|item| is_star(item)) {
        return;
    }
    for &(column, qualified) in required_columns(level) {
        let present = items.iter().any(|item| selects_column(item, column));
        if !present {
            issues.push(ValidationIssue::MissingRequiredColumn {
                column,
                qualified,
                level,
            });
        }
    }
}

fn check_result_column(
    items: &[&[Lexeme<'_>]],
    result_column: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    if !is_valid_result_column_name(result_column) {
        issues.push(ValidationIssue::InvalidResultColumnName {
            name: result_column.to_string(),
        });
        return;
    }

    let found = items.iter().any(|item| {
        is_star(item) || output_name(item).is_some_and(|n| n.eq_ignore_ascii_case(result_column))
    });
    if !found {
        issues.push(ValidationIssue::MissingResultColumn {
            name: result_column.to_string(),
        });
    }
}

/// Readings of `sql` with comments removed: the lexical mask plus each
/// supported dialect's tokenizer. Input a dialect cannot tokenize is kept
/// whole, comments included.
fn code_views(sql: &str) -> Vec<String> {
    let mut views = vec![mask_comments(sql)];
    for dialect in Dialect::ALL {
        match strip_comments(sql, dialect) {
            Ok(code) => views.push(code),
            Err(message) => {
                tracing::debug!(dialect = ?dialect, %message, "tokenizer failed, scanning raw sql");
                views.push(sql.to_string());
            }
        }
    }
    views
}

/// A keyword counts as soon as any reading exposes it as code.
fn check_security(sql: &str, issues: &mut Vec<ValidationIssue>) {
    let mut reported = HashSet::new();
    let mut multiple = false;

    for code in code_views(sql) {
        for lexeme in tokenize_unquoted(&code) {
            if lexeme.is_punct(';') {
                let rest = &code[lexeme.offset + 1..];
                if !multiple && !rest.trim().is_empty() {
                    multiple = true;
                    issues.push(ValidationIssue::MultipleStatements);
                }
                continue;
            }

            let Some(word) = lexeme.word() else { continue };
            if let Some(keyword) = BLOCKED_KEYWORDS
                .iter()
                .find(|k| k.eq_ignore_ascii_case(word))
            {
                if reported.insert(*keyword) {
                    tracing::warn!(keyword, "blocked keyword in calculation SQL");
                    issues.push(ValidationIssue::BlockedKeyword {
                        keyword: keyword.to_string(),
                    });
                }
            }
        }
    }
}

/// Items of the first depth-0 SELECT, split on depth-0 commas and ending at
/// its depth-0 FROM.
fn top_level_select_list<'l, 'a>(lexemes: &'l [Lexeme<'a>]) -> Vec<&'l [Lexeme<'a>]> {
    let Some(select) = lexemes
        .iter()
        .position(|l| l.depth == 0 && l.is_keyword("SELECT"))
    else {
        return Vec::new();
    };

    let mut start = select + 1;
    while lexemes
        .get(start)
        .is_some_and(|l| l.is_keyword("DISTINCT") || l.is_keyword("ALL"))
    {
        start += 1;
    }
    // T-SQL TOP n
    if lexemes.get(start).is_some_and(|l| l.is_keyword("TOP")) {
        start += 2;
    }

    let end = lexemes[start.min(lexemes.len())..]
        .iter()
        .position(|l| l.depth == 0 && (l.is_keyword("FROM") || l.is_punct(';')))
        .map(|p| p + start)
        .unwrap_or(lexemes.len());

    if start >= end {
        return Vec::new();
    }

    lexemes[start..end]
        .split(|l| l.depth == 0 && l.is_punct(','))
        .filter(|item| !item.is_empty())
        .collect()
}

fn is_star(item: &[Lexeme<'_>]) -> bool {
    match item {
        [only] => only.is_punct('*'),
        [_, dot, star] => dot.is_punct('.') && star.is_punct('*'),
        _ => false,
    }
}

/// `column`, `t.column` or `s.t.column` as the whole item, optionally
/// aliased. Expressions that merely mention the column do not count.
fn selects_column(item: &[Lexeme<'_>], column: &str) -> bool {
    let mut at = 0;
    while item.get(at).and_then(Lexeme::word).is_some()
        && item.get(at + 1).is_some_and(|l| l.is_punct('.'))
    {
        at += 2;
    }

    let Some(name) = item.get(at).and_then(Lexeme::word) else {
        return false;
    };
    if !name.eq_ignore_ascii_case(column) {
        return false;
    }

    match &item[at + 1..] {
        [] => true,
        [alias] => alias.word().is_some(),
        [keyword, alias] => keyword.is_keyword("AS") && alias.word().is_some(),
        _ => false,
    }
}

/// Alias or trailing column name of a select item.
fn output_name<'a>(item: &[Lexeme<'a>]) -> Option<&'a str> {
    item.last().and_then(Lexeme::word)
}

#[derive(Debug, Default)]
struct Shape {
    has_ctes: bool,
    has_subqueries: bool,
    used_tables: Vec<String>,
}

fn detect_shape(lexemes: &[Lexeme<'_>]) -> Shape {
    let has_ctes = lexemes.first().is_some_and(|l| l.is_keyword("WITH"));

    let has_subqueries = lexemes.windows(2).enumerate().any(|(i, pair)| {
        let opens_select = pair[0].is_punct('(') && pair[1].is_keyword("SELECT");
        let cte_body = i > 0
            && (lexemes[i - 1].is_keyword("AS") || lexemes[i - 1].is_keyword("MATERIALIZED"));
        opens_select && !cte_body
    });

    let mut used_tables: Vec<String> = Vec::new();
    for (i, lexeme) in lexemes.iter().enumerate() {
        if !(lexeme.is_keyword("FROM") || lexeme.is_keyword("JOIN")) {
            continue;
        }
        if lexeme.is_keyword("FROM") && !is_query_from(lexemes, i) {
            continue;
        }
        let Some(name) = table_name_at(lexemes, i + 1) else { continue };
        if !used_tables.iter().any(|t| t.eq_ignore_ascii_case(&name)) {
            used_tables.push(name);
        }
    }

    Shape {
        has_ctes,
        has_subqueries,
        used_tables,
    }
}

/// FROM of a query rather than `EXTRACT(x FROM y)` or `IS DISTINCT FROM`.
fn is_query_from(lexemes: &[Lexeme<'_>], at: usize) -> bool {
    if at > 0 && lexemes[at - 1].is_keyword("DISTINCT") {
        return false;
    }
    let depth = lexemes[at].depth;
    if depth == 0 {
        return true;
    }
    let open = lexemes[..at]
        .iter()
        .rposition(|l| l.is_punct('(') && l.depth == depth - 1);
    match open {
        Some(p) => lexemes.get(p + 1).is_some_and(|l| l.is_keyword("SELECT")),
        None => true,
    }
}

/// `schema.table` style name starting at `at`, if one is there.
fn table_name_at(lexemes: &[Lexeme<'_>], at: usize) -> Option<String> {
    let first = lexemes.get(at)?.word()?;
    if first.eq_ignore_ascii_case("LATERAL") || first.eq_ignore_ascii_case("SELECT") {
        return None;
    }
    let mut name = first.to_string();
    let mut i = at + 1;
    while let (Some(dot), Some(part)) = (lexemes.get(i), lexemes.get(i + 1)) {
        match (dot.is_punct('.'), part.word()) {
            (true, Some(word)) => {
                name.push('.');
                name.push_str(word);
                i += 2;
            }
            _ => break,
        }
    }
    Some(name)
}

/// Replace placeholders with parseable stand-ins for the strict pass.
fn neutralize_placeholders(sql: &str) -> String {
    let scan = placeholder::scan(sql);
    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    for occurrence in &scan.occurrences {
        out.push_str(&sql[cursor..occurrence.span.start]);
        out.push_str(stand_in(occurrence.placeholder));
        cursor = occurrence.span.end;
    }
    out.push_str(&sql[cursor..]);
    out
}

fn stand_in(placeholder: Placeholder) -> &'static str {
    match placeholder.category() {
        PlaceholderCategory::Period => "0",
        PlaceholderCategory::Filter => "1 = 1",
        PlaceholderCategory::IdentifierList => "(0)",
    }
}

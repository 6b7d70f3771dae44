//! Execution-time placeholder substitution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{scan, Placeholder, PlaceholderError};
use crate::sql::{lit_int, lit_str, table_col, value_list_tokens, Dialect, Expr, ExprExt};

/// Errors raised while substituting placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionError {
    #[error("Invalid cycle code {0}: expected YYYYMM")]
    InvalidCycle(i64),

    #[error("Invalid cycle code '{0}': expected YYYYMM")]
    UnparsableCycle(String),

    #[error("Cycle {anchor} minus {months} months is before year 1")]
    CycleUnderflow { anchor: i64, months: u32 },

    #[error("Placeholder '{placeholder}' needs at least one selected deal")]
    EmptyDealSelection { placeholder: String },

    #[error("SQL contains invalid placeholders: {}", join_errors(.0))]
    Grammar(Vec<PlaceholderError>),
}

fn join_errors(errors: &[PlaceholderError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A reporting cycle, written as a `YYYYMM` integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct CycleCode {
    year: i64,
    month: u32,
}

impl CycleCode {
    pub fn new(year: i64, month: u32) -> Result<Self, SubstitutionError> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            let code = year.saturating_mul(100).saturating_add(month as i64);
            return Err(SubstitutionError::InvalidCycle(code));
        }
        Ok(Self { year, month })
    }

    pub fn from_code(code: i64) -> Result<Self, SubstitutionError> {
        if code < 0 {
            return Err(SubstitutionError::InvalidCycle(code));
        }
        let month = (code % 100) as u32;
        Self::new(code / 100, month).map_err(|_| SubstitutionError::InvalidCycle(code))
    }

    pub fn code(&self) -> i64 {
        self.year * 100 + self.month as i64
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Step back whole months: `202401 - 1 = 202312`.
    pub fn minus_months(&self, months: u32) -> Result<Self, SubstitutionError> {
        let index = self.year * 12 + (self.month as i64 - 1) - months as i64;
        let year = index.div_euclid(12);
        if year < 1 {
            return Err(SubstitutionError::CycleUnderflow {
                anchor: self.code(),
                months,
            });
        }
        Ok(Self {
            year,
            month: index.rem_euclid(12) as u32 + 1,
        })
    }
}

impl TryFrom<i64> for CycleCode {
    type Error = SubstitutionError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<CycleCode> for i64 {
    fn from(cycle: CycleCode) -> Self {
        cycle.code()
    }
}

impl std::fmt::Display for CycleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for CycleCode {
    type Err = SubstitutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: i64 = s
            .trim()
            .parse()
            .map_err(|_| SubstitutionError::UnparsableCycle(s.to_string()))?;
        Self::from_code(code)
    }
}

/// A selected deal and, optionally, the tranches selected within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealSelection {
    pub deal_number: i64,
    /// `None` or empty selects every tranche of the deal.
    #[serde(default)]
    pub tranche_ids: Option<Vec<String>>,
}

impl DealSelection {
    pub fn deal(deal_number: i64) -> Self {
        Self {
            deal_number,
            tranche_ids: None,
        }
    }

    pub fn with_tranches<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tranche_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    fn tranches(&self) -> &[String] {
        self.tranche_ids.as_deref().unwrap_or(&[])
    }
}

/// Runtime values placeholders are resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub anchor_cycle: CycleCode,
    #[serde(default)]
    pub deals: Vec<DealSelection>,
}

/// Replace every placeholder in `sql` with its runtime value.
///
/// Placeholders inside comments are left alone. The SQL must scan cleanly;
/// grammar errors are returned together rather than substituted partially.
pub fn substitute(
    sql: &str,
    params: &ExecutionParams,
    dialect: Dialect,
) -> Result<String, SubstitutionError> {
    let scan = scan(sql);
    if !scan.is_clean() {
        return Err(SubstitutionError::Grammar(scan.errors));
    }

    let mut rendered: HashMap<Placeholder, String> = HashMap::new();
    for placeholder in &scan.placeholders {
        rendered.insert(*placeholder, render(*placeholder, params, dialect)?);
    }

    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    for occurrence in &scan.occurrences {
        out.push_str(&sql[cursor..occurrence.span.start]);
        if let Some(value) = rendered.get(&occurrence.placeholder) {
            out.push_str(value);
        }
        cursor = occurrence.span.end;
    }
    out.push_str(&sql[cursor..]);

    tracing::debug!(
        placeholders = scan.placeholders.len(),
        occurrences = scan.occurrences.len(),
        anchor = %params.anchor_cycle,
        "substituted placeholders"
    );

    Ok(out)
}

fn render(
    placeholder: Placeholder,
    params: &ExecutionParams,
    dialect: Dialect,
) -> Result<String, SubstitutionError> {
    let cycle = |months: u32| -> Result<String, SubstitutionError> {
        Ok(params.anchor_cycle.minus_months(months)?.to_string())
    };
    let deal_numbers = || -> Result<Vec<Expr>, SubstitutionError> {
        if params.deals.is_empty() {
            return Err(SubstitutionError::EmptyDealSelection {
                placeholder: placeholder.name(),
            });
        }
        Ok(params.deals.iter().map(|d| lit_int(d.deal_number)).collect())
    };

    match placeholder {
        Placeholder::CurrentCycle => cycle(0),
        Placeholder::PreviousCycle => cycle(1),
        Placeholder::CycleMinus(months) => cycle(months),
        Placeholder::DealFilter => Ok(table_col("deal", "dl_nbr")
            .in_list(deal_numbers()?)
            .to_sql(dialect)),
        Placeholder::DealNumbers => {
            Ok(value_list_tokens(&deal_numbers()?, dialect).serialize(dialect))
        }
        Placeholder::DealTrancheFilter => {
            deal_numbers()?;
            Ok(deal_tranche_predicate(&params.deals).to_sql(dialect))
        }
    }
}

/// `((deal = 1 AND tranche IN (...)) OR (deal = 2))`
fn deal_tranche_predicate(deals: &[DealSelection]) -> Expr {
    let mut terms = deals.iter().map(|selection| {
        let deal = table_col("deal", "dl_nbr").eq(lit_int(selection.deal_number));
        let term = match selection.tranches() {
            [] => deal,
            ids => deal.and(
                table_col("tranche", "tr_id").in_list(ids.iter().map(|id| lit_str(id)).collect()),
            ),
        };
        term.paren()
    });

    let first = terms.next().unwrap_or_else(|| table_col("deal", "dl_nbr").in_list(Vec::new()));
    terms.fold(first, |acc, term| acc.or(term)).paren()
}

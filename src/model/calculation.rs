//! Calculation definitions.
//!
//! A definition is a value object built by the UI while the analyst fills in
//! a form. Inputs that may still be missing are `Option`s, and blank strings
//! are treated the same as missing so previews never have to fail.

use serde::{Deserialize, Serialize};

use super::types::{AggregationFunction, GroupLevel, SourceModel};

/// A calculation, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationDefinition {
    UserAggregation(UserAggregation),
    SystemField(SystemField),
    SystemSql(SystemSql),
}

/// A declarative aggregation of one source field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAggregation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_model: SourceModel,
    #[serde(default)]
    pub source_field: Option<String>,
    #[serde(default)]
    pub aggregation_function: Option<AggregationFunction>,
    /// Required iff `aggregation_function` is `WEIGHTED_AVG`.
    #[serde(default)]
    pub weight_field: Option<String>,
    pub group_level: GroupLevel,
}

/// A raw column exposed without aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemField {
    pub name: String,
    pub source_model: SourceModel,
    #[serde(default)]
    pub source_field: Option<String>,
    pub group_level: GroupLevel,
}

/// Administrator-authored SQL with placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSql {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub raw_sql: String,
    pub result_column_name: String,
    pub group_level: GroupLevel,
}

impl CalculationDefinition {
    pub fn name(&self) -> &str {
        match self {
            CalculationDefinition::UserAggregation(d) => &d.name,
            CalculationDefinition::SystemField(d) => &d.name,
            CalculationDefinition::SystemSql(d) => &d.name,
        }
    }

    pub fn group_level(&self) -> GroupLevel {
        match self {
            CalculationDefinition::UserAggregation(d) => d.group_level,
            CalculationDefinition::SystemField(d) => d.group_level,
            CalculationDefinition::SystemSql(d) => d.group_level,
        }
    }

    /// Source model, when the definition is declarative.
    pub fn source_model(&self) -> Option<SourceModel> {
        match self {
            CalculationDefinition::UserAggregation(d) => Some(d.source_model),
            CalculationDefinition::SystemField(d) => Some(d.source_model),
            CalculationDefinition::SystemSql(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CalculationDefinition::UserAggregation(_) => "user_aggregation",
            CalculationDefinition::SystemField(_) => "system_field",
            CalculationDefinition::SystemSql(_) => "system_sql",
        }
    }
}

impl UserAggregation {
    pub fn field(&self) -> Option<&str> {
        non_blank(self.source_field.as_deref())
    }

    pub fn weight(&self) -> Option<&str> {
        non_blank(self.weight_field.as_deref())
    }
}

impl SystemField {
    pub fn field(&self) -> Option<&str> {
        non_blank(self.source_field.as_deref())
    }
}

impl From<UserAggregation> for CalculationDefinition {
    fn from(def: UserAggregation) -> Self {
        CalculationDefinition::UserAggregation(def)
    }
}

impl From<SystemField> for CalculationDefinition {
    fn from(def: SystemField) -> Self {
        CalculationDefinition::SystemField(def)
    }
}

impl From<SystemSql> for CalculationDefinition {
    fn from(def: SystemSql) -> Self {
        CalculationDefinition::SystemSql(def)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

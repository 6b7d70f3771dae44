//! Primitive schema types shared by the catalog and calculation definitions.

use serde::{Deserialize, Serialize};

/// One of the three base entities a calculation reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceModel {
    Deal,
    Tranche,
    TrancheBal,
}

impl SourceModel {
    pub const ALL: [SourceModel; 3] = [SourceModel::Deal, SourceModel::Tranche, SourceModel::TrancheBal];

    /// Model name as shown in formulas (`TrancheBal`).
    pub fn name(&self) -> &'static str {
        match self {
            SourceModel::Deal => "Deal",
            SourceModel::Tranche => "Tranche",
            SourceModel::TrancheBal => "TrancheBal",
        }
    }

    /// Physical table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            SourceModel::Deal => "deal",
            SourceModel::Tranche => "tranche",
            SourceModel::TrancheBal => "tranchebal",
        }
    }

    /// Whether a row of this model is finer than one row per deal.
    pub fn is_tranche_scoped(&self) -> bool {
        !matches!(self, SourceModel::Deal)
    }
}

impl std::fmt::Display for SourceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SourceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceModel::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s) || m.table_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source model '{}'", s))
    }
}

/// Granularity at which a calculation's result rows are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupLevel {
    Deal,
    Tranche,
}

impl GroupLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupLevel::Deal => "deal",
            GroupLevel::Tranche => "tranche",
        }
    }
}

impl std::fmt::Display for GroupLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GroupLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deal" => Ok(GroupLevel::Deal),
            "tranche" => Ok(GroupLevel::Tranche),
            other => Err(format!("unknown group level '{}'", other)),
        }
    }
}

/// Aggregation applied by a user-defined calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationFunction {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    WeightedAvg,
}

impl AggregationFunction {
    /// Catalog / wire name (`WEIGHTED_AVG`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationFunction::Sum => "SUM",
            AggregationFunction::Avg => "AVG",
            AggregationFunction::Count => "COUNT",
            AggregationFunction::Min => "MIN",
            AggregationFunction::Max => "MAX",
            AggregationFunction::WeightedAvg => "WEIGHTED_AVG",
        }
    }

    pub fn requires_weight(&self) -> bool {
        matches!(self, AggregationFunction::WeightedAvg)
    }
}

impl std::fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type of a catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Integer,
    Decimal,
    Currency,
    Percentage,
    Date,
    Boolean,
}

impl SemanticType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SemanticType::Integer
                | SemanticType::Decimal
                | SemanticType::Currency
                | SemanticType::Percentage
        )
    }
}

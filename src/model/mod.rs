//! Calculation model: schema catalog types and calculation definitions.

pub mod calculation;
pub mod catalog;
pub mod types;

pub use calculation::{CalculationDefinition, SystemField, SystemSql, UserAggregation};
pub use catalog::{
    AggregationFunctionInfo, CatalogError, FieldInfo, GroupLevelInfo, SchemaCatalog,
    SourceModelInfo,
};
pub use types::{AggregationFunction, GroupLevel, SemanticType, SourceModel};

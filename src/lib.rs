//! # calcsql
//!
//! Compiles reporting calculations over the Deal / Tranche / TrancheBal
//! schema into SQL and validates administrator-written System SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Schema Catalog (fields, functions, levels)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │               CalculationDefinition                      │
//! │  UserAggregation | SystemField | SystemSql               │
//! └─────────────────────────────────────────────────────────┘
//!          │                    │                    │
//!          ▼ [generator]        ▼ [validation]       ▼ [advisor]
//! ┌────────────────┐  ┌──────────────────────┐  ┌───────────────┐
//! │ formula text   │  │ ValidationResult      │  │ notice text   │
//! │ preview SQL    │  │ (+ placeholder scan)  │  │               │
//! └────────────────┘  └──────────────────────┘  └───────────────┘
//!                              │
//!                              ▼ [placeholder::substitute]
//!                       executable SQL
//! ```
//!
//! Every component is a pure function over immutable inputs; the catalog is
//! passed in explicitly.

pub mod advisor;
pub mod compile;
pub mod config;
pub mod generator;
pub mod model;
pub mod placeholder;
pub mod sql;
pub mod validation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::advisor::advise;
    pub use crate::compile::{CalculationPreview, CompileError, Compiler};
    pub use crate::config::Settings;
    pub use crate::generator::{generate_formula, generate_full_query, PreviewOptions};
    pub use crate::model::{
        AggregationFunction, CalculationDefinition, GroupLevel, SchemaCatalog, SourceModel,
        SystemField, SystemSql, UserAggregation,
    };
    pub use crate::placeholder::{
        substitute, vocabulary, CycleCode, DealSelection, ExecutionParams, Placeholder,
    };
    pub use crate::sql::Dialect;
    pub use crate::validation::{
        check_definition, validate, validate_with_options, ValidationResult, ValidatorOptions,
    };
}

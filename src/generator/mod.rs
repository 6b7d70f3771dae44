//! Preview generation for calculation definitions.
//!
//! - [`formula`]: the short human-readable formula shown beside a calculation
//! - [`full_query`]: the complete preview SELECT with inferred joins and grouping

pub mod formula;
pub mod full_query;

pub use formula::{generate_formula, INCOMPLETE_FORMULA};
pub use full_query::{
    aggregate_expr, build_preview_query, generate_full_query, result_alias, JoinPlan,
    PreviewOptions, DEFAULT_RESULT_ALIAS, INCOMPLETE_QUERY, PREVIEW_COMMENT,
};

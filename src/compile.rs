//! High-level API over the generators, validator and advisor.
//!
//! ```text
//! CalculationDefinition ─┬─ generate_formula ──→ formula text
//!                        ├─ generate_full_query → preview SQL
//!                        ├─ validate ──────────→ ValidationResult (System SQL)
//!                        ├─ advise ────────────→ optional notice
//!                        └─ check_definition ──→ catalog errors
//! ```
//!
//! A [`Compiler`] bundles the schema catalog and settings so callers do not
//! have to thread them through every call. All methods are pure.
//!
//! # Example
//!
//! ```ignore
//! use calcsql::compile::Compiler;
//! use calcsql::model::{AggregationFunction, GroupLevel, SourceModel, UserAggregation};
//!
//! let compiler = Compiler::default();
//! let def = UserAggregation {
//!     name: "Total Ending Balance".into(),
//!     description: String::new(),
//!     source_model: SourceModel::TrancheBal,
//!     source_field: Some("tr_end_bal_amt".into()),
//!     aggregation_function: Some(AggregationFunction::Sum),
//!     weight_field: None,
//!     group_level: GroupLevel::Deal,
//! }
//! .into();
//!
//! let preview = compiler.preview(&def);
//! println!("{}\n{}", preview.formula, preview.sql);
//! ```

use serde::Serialize;

use crate::advisor;
use crate::config::{Settings, SettingsError};
use crate::generator::{self, PreviewOptions};
use crate::model::{CalculationDefinition, CatalogError, GroupLevel, SchemaCatalog};
use crate::placeholder::{self, ExecutionParams, SubstitutionError};
use crate::validation::{self, DefinitionError, ValidationResult, Validator};

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while building a compiler.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Result Types
// ============================================================================

/// Everything the calculation form shows for a definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationPreview {
    pub formula: String,

    /// Preview SQL, or System SQL as written.
    pub sql: String,

    pub advice: Option<String>,

    /// Present for System SQL only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

// ============================================================================
// Compiler
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    catalog: SchemaCatalog,
    preview: PreviewOptions,
    validator: Validator,
}

impl Compiler {
    pub fn new(catalog: SchemaCatalog, settings: &Settings) -> Self {
        Self {
            catalog,
            preview: settings.preview_options(),
            validator: Validator::new(settings.validator_options()),
        }
    }

    /// Build from settings, loading the configured catalog or falling back
    /// to the built-in one.
    pub fn from_settings(settings: &Settings) -> CompileResult<Self> {
        let catalog = match settings.catalog.resolved_path()? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading schema catalog");
                SchemaCatalog::load(&path)?
            }
            None => {
                tracing::debug!("no catalog configured, using built-in catalog");
                SchemaCatalog::builtin()
            }
        };
        Ok(Self::new(catalog, settings))
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn preview_options(&self) -> &PreviewOptions {
        &self.preview
    }

    pub fn generate_formula(&self, def: &CalculationDefinition) -> String {
        generator::generate_formula(def)
    }

    pub fn generate_full_query(&self, def: &CalculationDefinition) -> String {
        generator::generate_full_query(def, &self.preview)
    }

    pub fn validate(
        &self,
        sql: &str,
        group_level: GroupLevel,
        result_column: &str,
    ) -> ValidationResult {
        self.validator.validate(sql, group_level, result_column)
    }

    pub fn advise(&self, def: &CalculationDefinition) -> Option<String> {
        advisor::advise(def)
    }

    pub fn check_definition(&self, def: &CalculationDefinition) -> Result<(), Vec<DefinitionError>> {
        validation::check_definition(def, &self.catalog)
    }

    /// Substitute placeholders for execution, in the preview dialect.
    pub fn substitute(&self, sql: &str, params: &ExecutionParams) -> Result<String, SubstitutionError> {
        placeholder::substitute(sql, params, self.preview.dialect)
    }

    /// Formula, SQL, advice and (for System SQL) validation in one call.
    pub fn preview(&self, def: &CalculationDefinition) -> CalculationPreview {
        let validation = match def {
            CalculationDefinition::SystemSql(sql) => Some(self.validate(
                &sql.raw_sql,
                sql.group_level,
                sql.result_column_name.trim(),
            )),
            _ => None,
        };

        CalculationPreview {
            formula: self.generate_formula(def),
            sql: self.generate_full_query(def),
            advice: self.advise(def),
            validation,
        }
    }
}

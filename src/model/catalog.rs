//! Schema Catalog - the read-only field, aggregation and group-level
//! metadata that calculations are defined against.
//!
//! The catalog is supplied by the surrounding application and passed
//! explicitly to the checks that need it. A CDI-style built-in catalog is
//! provided for tests and the CLI; deployments load their own from TOML:
//!
//! ```toml
//! [[source_models]]
//! model = "Deal"
//! display_label = "Deal"
//!
//! [[source_models.fields]]
//! name = "dl_nbr"
//! display_label = "Deal Number"
//! semantic_type = "integer"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::types::{AggregationFunction, GroupLevel, SemanticType, SourceModel};

/// Error type for catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Source model '{0}' is defined more than once")]
    DuplicateModel(SourceModel),

    #[error("Field '{field}' is defined more than once on {model}")]
    DuplicateField { model: SourceModel, field: String },
}

/// A column exposed by a source model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub display_label: String,
    pub semantic_type: SemanticType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nullable: bool,
}

/// A source model and its ordered field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceModelInfo {
    pub model: SourceModel,
    pub display_label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
}

/// Display metadata for an aggregation function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationFunctionInfo {
    pub function: AggregationFunction,
    pub display_label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_weight: bool,
    #[serde(default)]
    pub numeric_only: bool,
}

/// Display metadata for a group level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLevelInfo {
    pub level: GroupLevel,
    pub display_label: String,
    #[serde(default)]
    pub description: String,
}

/// The full catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub source_models: Vec<SourceModelInfo>,
    pub aggregation_functions: Vec<AggregationFunctionInfo>,
    pub group_levels: Vec<GroupLevelInfo>,
}

impl SchemaCatalog {
    /// Parse a catalog from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: SchemaCatalog = toml::from_str(content)?;
        catalog.check_unique()?;
        Ok(catalog)
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn check_unique(&self) -> Result<(), CatalogError> {
        let mut models = HashSet::new();
        for info in &self.source_models {
            if !models.insert(info.model) {
                return Err(CatalogError::DuplicateModel(info.model));
            }
            let mut fields = HashSet::new();
            for field in &info.fields {
                if !fields.insert(field.name.as_str()) {
                    return Err(CatalogError::DuplicateField {
                        model: info.model,
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn model(&self, model: SourceModel) -> Option<&SourceModelInfo> {
        self.source_models.iter().find(|m| m.model == model)
    }

    /// Ordered fields of `model`; empty when the model is not catalogued.
    pub fn fields_for(&self, model: SourceModel) -> &[FieldInfo] {
        self.model(model).map(|m| m.fields.as_slice()).unwrap_or(&[])
    }

    pub fn field(&self, model: SourceModel, name: &str) -> Option<&FieldInfo> {
        self.fields_for(model).iter().find(|f| f.name == name)
    }

    pub fn aggregation(&self, function: AggregationFunction) -> Option<&AggregationFunctionInfo> {
        self.aggregation_functions
            .iter()
            .find(|a| a.function == function)
    }

    pub fn has_group_level(&self, level: GroupLevel) -> bool {
        self.group_levels.iter().any(|g| g.level == level)
    }

    /// The built-in CDI reporting catalog.
    pub fn builtin() -> Self {
        use SemanticType::*;

        let deal = SourceModelInfo {
            model: SourceModel::Deal,
            display_label: "Deal".into(),
            description: "One row per securitization deal".into(),
            fields: vec![
                field("dl_nbr", "Deal Number", Integer, false),
                field("issr_cde", "Issuer Code", String, false),
                field("cdi_file_nme", "CDI File Name", String, true),
                field("CDB_cdi_file_nme", "CDB CDI File Name", String, true),
                field("dl_closing_dte", "Closing Date", Date, true),
            ],
        };

        let tranche = SourceModelInfo {
            model: SourceModel::Tranche,
            display_label: "Tranche".into(),
            description: "One row per tranche of a deal".into(),
            fields: vec![
                field("dl_nbr", "Deal Number", Integer, false),
                field("tr_id", "Tranche ID", String, false),
                field("tr_cusip_id", "CUSIP", String, true),
                field("tr_orig_bal_amt", "Original Balance", Currency, true),
                field("tr_stated_mat_dte", "Stated Maturity", Date, true),
            ],
        };

        let tranche_bal = SourceModelInfo {
            model: SourceModel::TrancheBal,
            display_label: "Tranche Balance".into(),
            description: "One row per tranche per reporting cycle".into(),
            fields: vec![
                field("dl_nbr", "Deal Number", Integer, false),
                field("tr_id", "Tranche ID", String, false),
                field("cycle_cde", "Cycle Code", Integer, false),
                field("tr_end_bal_amt", "Ending Balance", Currency, true),
                field("tr_prin_rel_ls_amt", "Principal Release Loss", Currency, true),
                field("tr_pass_thru_rte", "Pass Through Rate", Percentage, true),
                field("tr_accrl_days", "Accrual Days", Integer, true),
                field("tr_int_dstrb_amt", "Interest Distribution", Currency, true),
                field("tr_prin_dstrb_amt", "Principal Distribution", Currency, true),
                field("tr_int_accrl_amt", "Interest Accrual", Currency, true),
                field("tr_int_shtfl_amt", "Interest Shortfall", Currency, true),
            ],
        };

        let aggregation_functions = vec![
            aggregation(AggregationFunction::Sum, "Sum", "Total of all values", true),
            aggregation(AggregationFunction::Avg, "Average", "Arithmetic mean", true),
            aggregation(AggregationFunction::Count, "Count", "Number of non-null values", false),
            aggregation(AggregationFunction::Min, "Minimum", "Smallest value", false),
            aggregation(AggregationFunction::Max, "Maximum", "Largest value", false),
            AggregationFunctionInfo {
                function: AggregationFunction::WeightedAvg,
                display_label: "Weighted Average".into(),
                description: "SUM(value * weight) / SUM(weight), NULL when weights sum to zero"
                    .into(),
                requires_weight: true,
                numeric_only: true,
            },
        ];

        let group_levels = vec![
            GroupLevelInfo {
                level: GroupLevel::Deal,
                display_label: "Deal Level".into(),
                description: "One result row per deal".into(),
            },
            GroupLevelInfo {
                level: GroupLevel::Tranche,
                display_label: "Tranche Level".into(),
                description: "One result row per deal and tranche".into(),
            },
        ];

        SchemaCatalog {
            source_models: vec![deal, tranche, tranche_bal],
            aggregation_functions,
            group_levels,
        }
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn field(name: &str, label: &str, semantic_type: SemanticType, nullable: bool) -> FieldInfo {
    FieldInfo {
        name: name.into(),
        display_label: label.into(),
        semantic_type,
        description: None,
        nullable,
    }
}

fn aggregation(
    function: AggregationFunction,
    label: &str,
    description: &str,
    numeric_only: bool,
) -> AggregationFunctionInfo {
    AggregationFunctionInfo {
        function,
        display_label: label.into(),
        description: description.into(),
        requires_weight: false,
        numeric_only,
    }
}

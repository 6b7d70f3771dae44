//! Definition checks against the schema catalog.
//!
//! These run before a calculation is submitted for persistence. Unlike the
//! preview generators they are strict: every missing input is reported.

use thiserror::Error;

use super::{is_valid_result_column_name, validate, ValidationIssue};
use crate::model::{
    AggregationFunction, CalculationDefinition, GroupLevel, SchemaCatalog, SourceModel,
    SystemField, SystemSql, UserAggregation,
};

/// A problem with a calculation definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Calculation name is required")]
    MissingName,

    #[error("Source model {0} is not in the catalog")]
    UnknownSourceModel(SourceModel),

    #[error("Field '{field}' does not exist on {model}")]
    UnknownField { model: SourceModel, field: String },

    #[error("A source field is required")]
    MissingField,

    #[error("An aggregation function is required")]
    MissingAggregationFunction,

    #[error("WEIGHTED_AVG requires a weight field")]
    MissingWeightField,

    #[error("A weight field is only used with WEIGHTED_AVG, not {0}")]
    UnexpectedWeightField(AggregationFunction),

    #[error("{function} requires a numeric field, but {model}.{field} is not numeric")]
    NonNumericField {
        function: AggregationFunction,
        model: SourceModel,
        field: String,
    },

    #[error("Group level '{0}' is not in the catalog")]
    UnknownGroupLevel(GroupLevel),

    #[error(
        "Result column name '{0}' must start with a letter and contain only letters, digits and underscores"
    )]
    InvalidResultColumnName(String),

    #[error("SQL failed validation: {}", .0.join("; "))]
    InvalidSql(Vec<String>),
}

/// Check a definition against `catalog`, collecting every problem.
pub fn check_definition(
    def: &CalculationDefinition,
    catalog: &SchemaCatalog,
) -> Result<(), Vec<DefinitionError>> {
    let mut errors = Vec::new();

    if def.name().trim().is_empty() {
        errors.push(DefinitionError::MissingName);
    }
    if !catalog.has_group_level(def.group_level()) {
        errors.push(DefinitionError::UnknownGroupLevel(def.group_level()));
    }

    match def {
        CalculationDefinition::UserAggregation(agg) => check_aggregation(agg, catalog, &mut errors),
        CalculationDefinition::SystemField(field) => check_system_field(field, catalog, &mut errors),
        CalculationDefinition::SystemSql(sql) => check_system_sql(sql, &mut errors),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(name = def.name(), errors = errors.len(), "definition rejected");
        Err(errors)
    }
}

fn check_aggregation(
    agg: &UserAggregation,
    catalog: &SchemaCatalog,
    errors: &mut Vec<DefinitionError>,
) {
    if catalog.model(agg.source_model).is_none() {
        errors.push(DefinitionError::UnknownSourceModel(agg.source_model));
        return;
    }

    let function = agg.aggregation_function;
    if function.is_none() {
        errors.push(DefinitionError::MissingAggregationFunction);
    }

    let numeric_only = function
        .and_then(|f| catalog.aggregation(f))
        .is_some_and(|info| info.numeric_only);

    match agg.field() {
        None => errors.push(DefinitionError::MissingField),
        Some(name) => match catalog.field(agg.source_model, name) {
            None => errors.push(DefinitionError::UnknownField {
                model: agg.source_model,
                field: name.to_string(),
            }),
            Some(info) => {
                if let (true, Some(function)) = (numeric_only, function) {
                    if !info.semantic_type.is_numeric() {
                        errors.push(DefinitionError::NonNumericField {
                            function,
                            model: agg.source_model,
                            field: name.to_string(),
                        });
                    }
                }
            }
        },
    }

    match (function, agg.weight()) {
        (Some(AggregationFunction::WeightedAvg), None) => {
            errors.push(DefinitionError::MissingWeightField)
        }
        (Some(AggregationFunction::WeightedAvg), Some(weight)) => {
            match catalog.field(agg.source_model, weight) {
                None => errors.push(DefinitionError::UnknownField {
                    model: agg.source_model,
                    field: weight.to_string(),
                }),
                Some(info) if !info.semantic_type.is_numeric() => {
                    errors.push(DefinitionError::NonNumericField {
                        function: AggregationFunction::WeightedAvg,
                        model: agg.source_model,
                        field: weight.to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        (Some(other), Some(_)) => errors.push(DefinitionError::UnexpectedWeightField(other)),
        _ => {}
    }
}

fn check_system_field(
    field: &SystemField,
    catalog: &SchemaCatalog,
    errors: &mut Vec<DefinitionError>,
) {
    if catalog.model(field.source_model).is_none() {
        errors.push(DefinitionError::UnknownSourceModel(field.source_model));
        return;
    }
    match field.field() {
        None => errors.push(DefinitionError::MissingField),
        Some(name) if catalog.field(field.source_model, name).is_none() => {
            errors.push(DefinitionError::UnknownField {
                model: field.source_model,
                field: name.to_string(),
            })
        }
        Some(_) => {}
    }
}

fn check_system_sql(sql: &SystemSql, errors: &mut Vec<DefinitionError>) {
    let column = sql.result_column_name.trim();
    if !is_valid_result_column_name(column) {
        errors.push(DefinitionError::InvalidResultColumnName(column.to_string()));
    }

    let result = validate(&sql.raw_sql, sql.group_level, column);
    if !result.is_valid {
        // the result column problem is already reported above
        let messages: Vec<String> = result
            .issues
            .iter()
            .filter(|i| {
                i.is_fatal()
                    && !matches!(i, ValidationIssue::InvalidResultColumnName { .. })
            })
            .map(ToString::to_string)
            .collect();
        if !messages.is_empty() {
            errors.push(DefinitionError::InvalidSql(messages));
        }
    }
}

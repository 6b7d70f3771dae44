//! Human-readable formula strings for the calculation form preview.

use crate::model::{AggregationFunction, CalculationDefinition, SourceModel};

/// Returned whenever a definition is still missing its function or field.
pub const INCOMPLETE_FORMULA: &str = "Not enough information to generate formula";

/// Render the short formula shown next to a calculation.
///
/// Never fails: incomplete definitions produce [`INCOMPLETE_FORMULA`].
pub fn generate_formula(def: &CalculationDefinition) -> String {
    match def {
        CalculationDefinition::SystemField(field) => match field.field() {
            Some(name) => qualified(field.source_model, name),
            None => INCOMPLETE_FORMULA.to_string(),
        },

        CalculationDefinition::SystemSql(sql) => {
            let column = sql.result_column_name.trim();
            if column.is_empty() {
                "Custom SQL calculation".to_string()
            } else {
                format!("Custom SQL returning {}", column)
            }
        }

        CalculationDefinition::UserAggregation(agg) => {
            let (Some(function), Some(field)) = (agg.aggregation_function, agg.field()) else {
                return INCOMPLETE_FORMULA.to_string();
            };
            let value = qualified(agg.source_model, field);

            match function {
                AggregationFunction::WeightedAvg => match agg.weight() {
                    Some(weight) => {
                        let weight = qualified(agg.source_model, weight);
                        format!(
                            "SUM({} * {}) / NULLIF(SUM({}), 0)",
                            value, weight, weight
                        )
                    }
                    None => INCOMPLETE_FORMULA.to_string(),
                },
                other => format!("{}({})", other.as_str(), value),
            }
        }
    }
}

fn qualified(model: SourceModel, field: &str) -> String {
    format!("{}.{}", model.name(), field)
}

//! Compatibility notes for group-level and source-model combinations.
//!
//! Advice never blocks saving a calculation. `None` means there is nothing
//! to say, not that the definition failed a check.

use crate::model::{CalculationDefinition, GroupLevel, SourceModel};

/// Return a warning or recommendation for `def`, if any rule matches.
pub fn advise(def: &CalculationDefinition) -> Option<String> {
    let advice = match def {
        CalculationDefinition::SystemField(field) => {
            match (field.source_model, field.group_level) {
                (model, GroupLevel::Deal) if model.is_tranche_scoped() => Some(format!(
                    "{model} fields have multiple rows per deal. Showing {}.{} in a deal-level \
                     report will repeat deal rows once per {}; consider a tranche-level report \
                     or an aggregation instead.",
                    model,
                    field.field().unwrap_or("this field"),
                    row_unit(model),
                )),
                _ => None,
            }
        }

        CalculationDefinition::SystemSql(sql) => Some(match sql.group_level {
            GroupLevel::Deal => "Deal-level SQL must return one row per deal. Aggregate any \
                                 tranche or balance columns and GROUP BY deal.dl_nbr."
                .to_string(),
            GroupLevel::Tranche => "Tranche-level SQL must return one row per deal and \
                                    tranche. Join tranche on dl_nbr and GROUP BY deal.dl_nbr, \
                                    tranche.tr_id when aggregating balances."
                .to_string(),
        }),

        CalculationDefinition::UserAggregation(agg) => {
            match (agg.source_model, agg.group_level) {
                (SourceModel::Tranche, GroupLevel::Tranche) => Some(
                    "Tranche-level calculations over Tranche fields can only be used in \
                     tranche-level reports. Use deal level if this value is also needed in \
                     deal reports."
                        .to_string(),
                ),
                (model, GroupLevel::Deal) if model.is_tranche_scoped() => Some(format!(
                    "{model} values will be aggregated across all tranches of each deal{}.",
                    if model == SourceModel::TrancheBal {
                        " for the reporting cycle"
                    } else {
                        ""
                    }
                )),
                (SourceModel::Deal, GroupLevel::Tranche) => Some(
                    "Deal fields have one value per deal; at tranche level the same value \
                     repeats for every tranche of the deal."
                        .to_string(),
                ),
                _ => None,
            }
        }
    };

    if let Some(text) = &advice {
        tracing::debug!(kind = def.kind(), advice = %text, "compatibility advice");
    }
    advice
}

fn row_unit(model: SourceModel) -> &'static str {
    match model {
        SourceModel::TrancheBal => "tranche and cycle",
        _ => "tranche",
    }
}

//! Compatibility advice rule table.

use calcsql::advisor::advise;
use calcsql::model::{
    AggregationFunction, CalculationDefinition, GroupLevel, SourceModel, SystemField, SystemSql,
    UserAggregation,
};

fn aggregation(model: SourceModel, level: GroupLevel) -> CalculationDefinition {
    UserAggregation {
        name: "Total".into(),
        description: String::new(),
        source_model: model,
        source_field: Some("tr_end_bal_amt".into()),
        aggregation_function: Some(AggregationFunction::Sum),
        weight_field: None,
        group_level: level,
    }
    .into()
}

fn system_field(model: SourceModel, field: &str, level: GroupLevel) -> CalculationDefinition {
    SystemField {
        name: "Field".into(),
        source_model: model,
        source_field: Some(field.into()),
        group_level: level,
    }
    .into()
}

fn system_sql(level: GroupLevel) -> CalculationDefinition {
    SystemSql {
        name: "Custom".into(),
        description: String::new(),
        raw_sql: "SELECT deal.dl_nbr, 1 AS x FROM deal".into(),
        result_column_name: "x".into(),
        group_level: level,
    }
    .into()
}

#[test]
fn test_tranche_bal_aggregation_at_deal_level_is_advised() {
    let advice = advise(&aggregation(SourceModel::TrancheBal, GroupLevel::Deal));
    let matched = advise(&aggregation(SourceModel::Deal, GroupLevel::Deal));

    let text = advice.expect("tranche balance at deal level should be advised");
    assert!(text.contains("TrancheBal"));
    assert!(text.contains("for the reporting cycle"));
    assert_eq!(matched, None);
}

#[test]
fn test_tranche_aggregation_at_tranche_level_notes_reuse() {
    let text = advise(&aggregation(SourceModel::Tranche, GroupLevel::Tranche)).unwrap();
    assert!(text.contains("tranche-level reports"));
}

#[test]
fn test_deal_aggregation_at_tranche_level_repeats() {
    let text = advise(&aggregation(SourceModel::Deal, GroupLevel::Tranche)).unwrap();
    assert!(text.contains("repeats for every tranche"));
}

#[test]
fn test_well_matched_aggregations_have_no_advice() {
    assert_eq!(advise(&aggregation(SourceModel::TrancheBal, GroupLevel::Tranche)), None);
}

#[test]
fn test_system_field_row_multiplication() {
    let text = advise(&system_field(SourceModel::TrancheBal, "tr_end_bal_amt", GroupLevel::Deal))
        .unwrap();
    assert!(text.starts_with("TrancheBal fields have multiple rows per deal"));
    assert!(text.contains("TrancheBal.tr_end_bal_amt"));
    assert!(text.contains("once per tranche and cycle"));

    let tranche = advise(&system_field(SourceModel::Tranche, "tr_cusip_id", GroupLevel::Deal))
        .unwrap();
    assert!(tranche.contains("once per tranche;"));

    assert_eq!(
        advise(&system_field(SourceModel::Tranche, "tr_cusip_id", GroupLevel::Tranche)),
        None
    );
    assert_eq!(
        advise(&system_field(SourceModel::Deal, "issr_cde", GroupLevel::Deal)),
        None
    );
}

#[test]
fn test_system_sql_always_gets_level_specific_reminder() {
    let deal = advise(&system_sql(GroupLevel::Deal)).unwrap();
    let tranche = advise(&system_sql(GroupLevel::Tranche)).unwrap();

    assert!(deal.contains("one row per deal"));
    assert!(tranche.contains("tranche.tr_id"));
    assert_ne!(deal, tranche);
}

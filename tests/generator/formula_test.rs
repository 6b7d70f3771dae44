//! Formula text for every definition kind.

use calcsql::generator::{generate_formula, INCOMPLETE_FORMULA};
use calcsql::model::{
    AggregationFunction, CalculationDefinition, GroupLevel, SourceModel, SystemField, SystemSql,
    UserAggregation,
};

fn aggregation(
    model: SourceModel,
    function: Option<AggregationFunction>,
    field: Option<&str>,
    weight: Option<&str>,
) -> CalculationDefinition {
    UserAggregation {
        name: "Calc".into(),
        description: String::new(),
        source_model: model,
        source_field: field.map(String::from),
        aggregation_function: function,
        weight_field: weight.map(String::from),
        group_level: GroupLevel::Deal,
    }
    .into()
}

#[test]
fn test_simple_aggregations() {
    let cases = [
        (AggregationFunction::Sum, "SUM(TrancheBal.tr_end_bal_amt)"),
        (AggregationFunction::Avg, "AVG(TrancheBal.tr_end_bal_amt)"),
        (AggregationFunction::Count, "COUNT(TrancheBal.tr_end_bal_amt)"),
        (AggregationFunction::Min, "MIN(TrancheBal.tr_end_bal_amt)"),
        (AggregationFunction::Max, "MAX(TrancheBal.tr_end_bal_amt)"),
    ];

    for (function, expected) in cases {
        let def = aggregation(
            SourceModel::TrancheBal,
            Some(function),
            Some("tr_end_bal_amt"),
            None,
        );
        assert_eq!(generate_formula(&def), expected);
    }
}

#[test]
fn test_weighted_average_formula() {
    let def = aggregation(
        SourceModel::TrancheBal,
        Some(AggregationFunction::WeightedAvg),
        Some("tr_pass_thru_rte"),
        Some("tr_end_bal_amt"),
    );
    assert_eq!(
        generate_formula(&def),
        "SUM(TrancheBal.tr_pass_thru_rte * TrancheBal.tr_end_bal_amt) / NULLIF(SUM(TrancheBal.tr_end_bal_amt), 0)"
    );
}

#[test]
fn test_incomplete_aggregations() {
    let missing_field = aggregation(SourceModel::Tranche, Some(AggregationFunction::Sum), None, None);
    let blank_field = aggregation(
        SourceModel::Tranche,
        Some(AggregationFunction::Sum),
        Some("  "),
        None,
    );
    let missing_weight = aggregation(
        SourceModel::TrancheBal,
        Some(AggregationFunction::WeightedAvg),
        Some("tr_pass_thru_rte"),
        Some(""),
    );

    assert_eq!(generate_formula(&missing_field), INCOMPLETE_FORMULA);
    assert_eq!(generate_formula(&blank_field), INCOMPLETE_FORMULA);
    assert_eq!(generate_formula(&missing_weight), INCOMPLETE_FORMULA);
}

#[test]
fn test_system_field_formula() {
    let def: CalculationDefinition = SystemField {
        name: "CUSIP".into(),
        source_model: SourceModel::Tranche,
        source_field: Some("tr_cusip_id".into()),
        group_level: GroupLevel::Tranche,
    }
    .into();
    assert_eq!(generate_formula(&def), "Tranche.tr_cusip_id");

    let empty: CalculationDefinition = SystemField {
        name: "CUSIP".into(),
        source_model: SourceModel::Tranche,
        source_field: None,
        group_level: GroupLevel::Tranche,
    }
    .into();
    assert_eq!(generate_formula(&empty), INCOMPLETE_FORMULA);
}

#[test]
fn test_system_sql_formula() {
    let def: CalculationDefinition = SystemSql {
        name: "Balance Change".into(),
        description: String::new(),
        raw_sql: "SELECT 1".into(),
        result_column_name: "bal_change".into(),
        group_level: GroupLevel::Tranche,
    }
    .into();
    assert_eq!(generate_formula(&def), "Custom SQL returning bal_change");
}

#[test]
fn test_formula_from_json_definition() {
    let def: CalculationDefinition = serde_json::from_str(
        r#"{
            "kind": "user_aggregation",
            "name": "Max Accrual Days",
            "source_model": "TrancheBal",
            "source_field": "tr_accrl_days",
            "aggregation_function": "MAX",
            "group_level": "tranche"
        }"#,
    )
    .unwrap();
    assert_eq!(generate_formula(&def), "MAX(TrancheBal.tr_accrl_days)");
}

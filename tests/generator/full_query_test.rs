//! Preview SQL synthesis: join inference, grouping and dialect rendering.

use calcsql::generator::{
    build_preview_query, generate_full_query, PreviewOptions, INCOMPLETE_QUERY, PREVIEW_COMMENT,
};
use calcsql::model::{
    AggregationFunction, CalculationDefinition, GroupLevel, SourceModel, SystemField, SystemSql,
    UserAggregation,
};
use calcsql::sql::parse::check_syntax;
use calcsql::sql::Dialect;
use insta::assert_snapshot;

fn aggregation(
    name: &str,
    model: SourceModel,
    field: &str,
    function: AggregationFunction,
    level: GroupLevel,
) -> UserAggregation {
    UserAggregation {
        name: name.into(),
        description: String::new(),
        source_model: model,
        source_field: Some(field.into()),
        aggregation_function: Some(function),
        weight_field: None,
        group_level: level,
    }
}

fn system_field(name: &str, model: SourceModel, field: &str, level: GroupLevel) -> CalculationDefinition {
    SystemField {
        name: name.into(),
        source_model: model,
        source_field: Some(field.into()),
        group_level: level,
    }
    .into()
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_sum_tranche_bal_at_deal_level() {
    let def = aggregation(
        "Total Ending Balance",
        SourceModel::TrancheBal,
        "tr_end_bal_amt",
        AggregationFunction::Sum,
        GroupLevel::Deal,
    )
    .into();

    let sql = generate_full_query(&def, &PreviewOptions::default());
    assert_snapshot!(sql);
}

#[test]
fn test_weighted_average_tsql() {
    let mut agg = aggregation(
        "Weighted Pass Through Rate",
        SourceModel::TrancheBal,
        "tr_pass_thru_rte",
        AggregationFunction::WeightedAvg,
        GroupLevel::Tranche,
    );
    agg.weight_field = Some("tr_end_bal_amt".into());

    let options = PreviewOptions::default().with_dialect(Dialect::TSql);
    let sql = generate_full_query(&agg.into(), &options);
    assert_snapshot!(sql);
}

#[test]
fn test_system_field_deal_only() {
    let def = system_field("Issuer Code", SourceModel::Deal, "issr_cde", GroupLevel::Deal);
    let sql = generate_full_query(&def, &PreviewOptions::default());
    assert_snapshot!(sql);
}

// ============================================================================
// Join and grouping rules
// ============================================================================

#[test]
fn test_deal_source_at_deal_level_has_no_joins() {
    let def = aggregation(
        "Deal Count",
        SourceModel::Deal,
        "dl_nbr",
        AggregationFunction::Count,
        GroupLevel::Deal,
    )
    .into();
    let sql = generate_full_query(&def, &PreviewOptions::default());

    assert!(!sql.contains("JOIN"));
    assert!(!sql.contains("tr_id"));
    assert!(sql.ends_with("GROUP BY \"deal\".\"dl_nbr\""));
}

#[test]
fn test_tranche_level_joins_tranche_only() {
    let def = aggregation(
        "Original Balance",
        SourceModel::Tranche,
        "tr_orig_bal_amt",
        AggregationFunction::Sum,
        GroupLevel::Tranche,
    )
    .into();
    let sql = generate_full_query(&def, &PreviewOptions::default());

    assert!(sql.contains("INNER JOIN \"tranche\" ON \"deal\".\"dl_nbr\" = \"tranche\".\"dl_nbr\""));
    assert!(!sql.contains("tranchebal"));
    assert!(sql.contains("\"tranche\".\"tr_id\" IN ('A', 'B')"));
    assert!(sql.ends_with("GROUP BY \"deal\".\"dl_nbr\", \"tranche\".\"tr_id\""));
}

#[test]
fn test_deal_field_at_tranche_level_still_joins_tranche() {
    let def = system_field("Issuer", SourceModel::Deal, "issr_cde", GroupLevel::Tranche);
    let sql = generate_full_query(&def, &PreviewOptions::default());

    assert!(sql.contains("INNER JOIN \"tranche\""));
    assert!(sql.contains("  \"tranche\".\"tr_id\",\n"));
    assert!(!sql.contains("GROUP BY"));
}

#[test]
fn test_preview_always_starts_with_comment() {
    let def = system_field("Issuer", SourceModel::Deal, "issr_cde", GroupLevel::Deal);
    let sql = generate_full_query(&def, &PreviewOptions::default());
    assert!(sql.starts_with(&format!("-- {}\nSELECT", PREVIEW_COMMENT)));
}

#[test]
fn test_empty_samples_drop_filters() {
    let options = PreviewOptions {
        sample_deal_numbers: Vec::new(),
        sample_tranche_ids: Vec::new(),
        sample_cycle: None,
        ..PreviewOptions::default()
    };
    let def = aggregation(
        "Total Ending Balance",
        SourceModel::TrancheBal,
        "tr_end_bal_amt",
        AggregationFunction::Sum,
        GroupLevel::Deal,
    )
    .into();

    let sql = generate_full_query(&def, &options);
    assert!(!sql.contains("WHERE"));
    assert!(sql.contains("GROUP BY"));
}

// ============================================================================
// Incomplete input and System SQL
// ============================================================================

#[test]
fn test_incomplete_definition() {
    let mut agg = aggregation(
        "Total",
        SourceModel::TrancheBal,
        "tr_end_bal_amt",
        AggregationFunction::Sum,
        GroupLevel::Deal,
    );
    agg.aggregation_function = None;
    let def = agg.into();

    assert_eq!(generate_full_query(&def, &PreviewOptions::default()), INCOMPLETE_QUERY);
    assert!(build_preview_query(&def, &PreviewOptions::default()).is_none());
}

#[test]
fn test_system_sql_passes_through() {
    let raw = "SELECT deal.dl_nbr, COUNT(*) AS tranche_count\nFROM deal JOIN tranche ON tranche.dl_nbr = deal.dl_nbr\nWHERE {deal_filter}\nGROUP BY deal.dl_nbr";
    let def: CalculationDefinition = SystemSql {
        name: "Tranche Count".into(),
        description: String::new(),
        raw_sql: format!("\n  {}\n", raw),
        result_column_name: "tranche_count".into(),
        group_level: GroupLevel::Deal,
    }
    .into();

    assert_eq!(generate_full_query(&def, &PreviewOptions::default()), raw);

    let blank: CalculationDefinition = SystemSql {
        name: "Blank".into(),
        description: String::new(),
        raw_sql: "   ".into(),
        result_column_name: "x".into(),
        group_level: GroupLevel::Deal,
    }
    .into();
    assert_eq!(generate_full_query(&blank, &PreviewOptions::default()), INCOMPLETE_QUERY);
}

// ============================================================================
// Determinism and syntax
// ============================================================================

#[test]
fn test_output_is_deterministic() {
    let def: CalculationDefinition = aggregation(
        "Interest Shortfall",
        SourceModel::TrancheBal,
        "tr_int_shtfl_amt",
        AggregationFunction::Max,
        GroupLevel::Tranche,
    )
    .into();
    let options = PreviewOptions::default();
    assert_eq!(
        generate_full_query(&def, &options),
        generate_full_query(&def, &options)
    );
}

#[test]
fn test_previews_parse_in_every_dialect() {
    let mut weighted = aggregation(
        "Weighted Rate",
        SourceModel::TrancheBal,
        "tr_pass_thru_rte",
        AggregationFunction::WeightedAvg,
        GroupLevel::Deal,
    );
    weighted.weight_field = Some("tr_end_bal_amt".into());

    let definitions: Vec<CalculationDefinition> = vec![
        weighted.into(),
        aggregation(
            "Avg Original Balance",
            SourceModel::Tranche,
            "tr_orig_bal_amt",
            AggregationFunction::Avg,
            GroupLevel::Deal,
        )
        .into(),
        system_field("Closing Date", SourceModel::Deal, "dl_closing_dte", GroupLevel::Tranche),
        system_field("Ending Balance", SourceModel::TrancheBal, "tr_end_bal_amt", GroupLevel::Tranche),
    ];

    for dialect in [Dialect::Postgres, Dialect::DuckDb, Dialect::TSql] {
        let options = PreviewOptions::default().with_dialect(dialect);
        for def in &definitions {
            let sql = generate_full_query(def, &options);
            if let Err(e) = check_syntax(&sql, dialect) {
                panic!("{:?} preview for '{}' failed to parse: {}\n{}", dialect, def.name(), e, sql);
            }
        }
    }
}

//! Catalog checks run before a definition is persisted.

use calcsql::model::{
    AggregationFunction, CalculationDefinition, GroupLevel, SchemaCatalog, SourceModel,
    SystemField, SystemSql, UserAggregation,
};
use calcsql::validation::{check_definition, DefinitionError};

fn aggregation(
    function: Option<AggregationFunction>,
    field: Option<&str>,
    weight: Option<&str>,
) -> CalculationDefinition {
    UserAggregation {
        name: "Weighted Rate".into(),
        description: String::new(),
        source_model: SourceModel::TrancheBal,
        source_field: field.map(String::from),
        aggregation_function: function,
        weight_field: weight.map(String::from),
        group_level: GroupLevel::Deal,
    }
    .into()
}

fn check(def: &CalculationDefinition) -> Result<(), Vec<DefinitionError>> {
    check_definition(def, &SchemaCatalog::builtin())
}

#[test]
fn test_complete_aggregation_passes() {
    let def = aggregation(
        Some(AggregationFunction::WeightedAvg),
        Some("tr_pass_thru_rte"),
        Some("tr_end_bal_amt"),
    );
    assert_eq!(check(&def), Ok(()));
}

#[test]
fn test_collects_every_problem() {
    let mut def = UserAggregation {
        name: "  ".into(),
        description: String::new(),
        source_model: SourceModel::TrancheBal,
        source_field: None,
        aggregation_function: None,
        weight_field: None,
        group_level: GroupLevel::Deal,
    };
    let errors = check(&def.clone().into()).unwrap_err();
    assert_eq!(
        errors,
        vec![
            DefinitionError::MissingName,
            DefinitionError::MissingAggregationFunction,
            DefinitionError::MissingField,
        ]
    );

    def.name = "Named".into();
    def.source_field = Some("tr_bogus".into());
    def.aggregation_function = Some(AggregationFunction::Sum);
    let errors = check(&def.into()).unwrap_err();
    assert_eq!(
        errors,
        vec![DefinitionError::UnknownField {
            model: SourceModel::TrancheBal,
            field: "tr_bogus".into(),
        }]
    );
}

#[test]
fn test_weight_rules() {
    let missing = aggregation(
        Some(AggregationFunction::WeightedAvg),
        Some("tr_pass_thru_rte"),
        None,
    );
    assert_eq!(check(&missing), Err(vec![DefinitionError::MissingWeightField]));

    let unexpected = aggregation(
        Some(AggregationFunction::Max),
        Some("tr_pass_thru_rte"),
        Some("tr_end_bal_amt"),
    );
    assert_eq!(
        check(&unexpected),
        Err(vec![DefinitionError::UnexpectedWeightField(
            AggregationFunction::Max
        )])
    );
}

#[test]
fn test_numeric_functions_need_numeric_fields() {
    let def = aggregation(Some(AggregationFunction::Sum), Some("tr_id"), None);
    assert_eq!(
        check(&def),
        Err(vec![DefinitionError::NonNumericField {
            function: AggregationFunction::Sum,
            model: SourceModel::TrancheBal,
            field: "tr_id".into(),
        }])
    );

    // COUNT and MAX work on any field
    let count = aggregation(Some(AggregationFunction::Count), Some("tr_id"), None);
    assert_eq!(check(&count), Ok(()));
}

#[test]
fn test_system_field_must_exist() {
    let def: CalculationDefinition = SystemField {
        name: "CUSIP".into(),
        source_model: SourceModel::Deal,
        source_field: Some("tr_cusip_id".into()),
        group_level: GroupLevel::Deal,
    }
    .into();
    assert_eq!(
        check(&def),
        Err(vec![DefinitionError::UnknownField {
            model: SourceModel::Deal,
            field: "tr_cusip_id".into(),
        }])
    );
}

#[test]
fn test_system_sql_runs_validator() {
    let def: CalculationDefinition = SystemSql {
        name: "Balance Change".into(),
        description: String::new(),
        raw_sql: "SELECT deal.dl_nbr, 1 AS bal_change FROM deal WHERE {oops}".into(),
        result_column_name: "bal_change".into(),
        group_level: GroupLevel::Tranche,
    }
    .into();

    let errors = check(&def).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        DefinitionError::InvalidSql(messages) => {
            assert_eq!(messages.len(), 2);
            assert!(messages[0].contains("tr_id"));
            assert_eq!(messages[1], "Unknown placeholder 'oops'");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_system_sql_bad_result_column_reported_once() {
    let def: CalculationDefinition = SystemSql {
        name: "Bad Column".into(),
        description: String::new(),
        raw_sql: "SELECT deal.dl_nbr, 1 AS x FROM deal".into(),
        result_column_name: "bad column".into(),
        group_level: GroupLevel::Deal,
    }
    .into();
    assert_eq!(
        check(&def),
        Err(vec![DefinitionError::InvalidResultColumnName(
            "bad column".into()
        )])
    );
}

#[test]
fn test_custom_catalog_without_tranche_level() {
    let catalog = SchemaCatalog::from_toml_str(
        r#"
aggregation_functions = []

[[source_models]]
model = "Deal"
display_label = "Deal"

[[source_models.fields]]
name = "dl_nbr"
display_label = "Deal Number"
semantic_type = "integer"

[[group_levels]]
level = "deal"
display_label = "Deal Level"
"#,
    )
    .unwrap();

    let def: CalculationDefinition = SystemField {
        name: "Deal".into(),
        source_model: SourceModel::Tranche,
        source_field: Some("tr_id".into()),
        group_level: GroupLevel::Tranche,
    }
    .into();

    assert_eq!(
        check_definition(&def, &catalog),
        Err(vec![
            DefinitionError::UnknownGroupLevel(GroupLevel::Tranche),
            DefinitionError::UnknownSourceModel(SourceModel::Tranche),
        ])
    );
}

//! Runtime substitution of placeholders into executable SQL.

use calcsql::placeholder::{
    scan, substitute, CycleCode, DealSelection, ExecutionParams, PlaceholderError,
    SubstitutionError,
};
use calcsql::sql::parse::check_syntax;
use calcsql::sql::Dialect;

fn params(anchor: i64, deals: Vec<DealSelection>) -> ExecutionParams {
    ExecutionParams {
        anchor_cycle: CycleCode::from_code(anchor).unwrap(),
        deals,
    }
}

// ============================================================================
// Period tokens
// ============================================================================

#[test]
fn test_period_tokens_cross_year_boundary() {
    let sql = "{current_cycle} {previous_cycle} {cycle_minus_2} {cycle_minus_12}";
    let out = substitute(sql, &params(202401, Vec::new()), Dialect::Postgres).unwrap();
    assert_eq!(out, "202401 202312 202311 202301");
}

#[test]
fn test_cycle_arithmetic() {
    let cycle = CycleCode::from_code(202403).unwrap();
    assert_eq!(cycle.year(), 2024);
    assert_eq!(cycle.month(), 3);
    assert_eq!(cycle.minus_months(3).unwrap().code(), 202312);
    assert_eq!(cycle.minus_months(0).unwrap(), cycle);
    assert_eq!("202404".parse::<CycleCode>().unwrap().code(), 202404);
}

#[test]
fn test_invalid_cycle_codes() {
    assert_eq!(
        CycleCode::from_code(202413),
        Err(SubstitutionError::InvalidCycle(202413))
    );
    assert_eq!(
        CycleCode::from_code(202400),
        Err(SubstitutionError::InvalidCycle(202400))
    );
    assert!(matches!(
        "2024-04".parse::<CycleCode>(),
        Err(SubstitutionError::UnparsableCycle(_))
    ));
}

#[test]
fn test_cycle_underflow() {
    let err = substitute("{previous_cycle}", &params(101, Vec::new()), Dialect::Postgres).unwrap_err();
    assert_eq!(
        err,
        SubstitutionError::CycleUnderflow {
            anchor: 101,
            months: 1,
        }
    );
}

// ============================================================================
// Deal tokens
// ============================================================================

#[test]
fn test_deal_filter_per_dialect() {
    let p = params(202404, vec![DealSelection::deal(101), DealSelection::deal(102)]);

    let postgres = substitute("WHERE {deal_filter}", &p, Dialect::Postgres).unwrap();
    assert_eq!(postgres, "WHERE \"deal\".\"dl_nbr\" IN (101, 102)");

    let tsql = substitute("WHERE {deal_filter}", &p, Dialect::TSql).unwrap();
    assert_eq!(tsql, "WHERE [deal].[dl_nbr] IN (101, 102)");
}

#[test]
fn test_deal_numbers_list() {
    let p = params(202404, vec![DealSelection::deal(7), DealSelection::deal(9)]);
    let out = substitute("dl_nbr IN {deal_numbers}", &p, Dialect::DuckDb).unwrap();
    assert_eq!(out, "dl_nbr IN (7, 9)");
}

#[test]
fn test_deal_tranche_filter() {
    let p = params(
        202404,
        vec![
            DealSelection::deal(101).with_tranches(["A", "B"]),
            DealSelection::deal(102),
        ],
    );
    let out = substitute("{deal_tranche_filter}", &p, Dialect::Postgres).unwrap();
    assert_eq!(
        out,
        "((\"deal\".\"dl_nbr\" = 101 AND \"tranche\".\"tr_id\" IN ('A', 'B')) OR (\"deal\".\"dl_nbr\" = 102))"
    );
}

#[test]
fn test_empty_tranche_list_selects_whole_deal() {
    let p = params(
        202404,
        vec![DealSelection::deal(5).with_tranches(Vec::<String>::new())],
    );
    let out = substitute("{deal_tranche_filter}", &p, Dialect::Postgres).unwrap();
    assert_eq!(out, "((\"deal\".\"dl_nbr\" = 5))");
}

#[test]
fn test_tranche_ids_are_quoted() {
    let p = params(202404, vec![DealSelection::deal(1).with_tranches(["O'B"])]);
    let out = substitute("{deal_tranche_filter}", &p, Dialect::Postgres).unwrap();
    assert!(out.contains("IN ('O''B')"));
}

#[test]
fn test_deal_tokens_need_a_selection() {
    for token in ["deal_filter", "deal_tranche_filter", "deal_numbers"] {
        let sql = format!("WHERE {{{}}}", token);
        let err = substitute(&sql, &params(202404, Vec::new()), Dialect::Postgres).unwrap_err();
        assert_eq!(
            err,
            SubstitutionError::EmptyDealSelection {
                placeholder: token.to_string(),
            }
        );
    }
}

#[test]
fn test_period_only_sql_needs_no_deals() {
    let out = substitute("cycle_cde = {current_cycle}", &params(202404, Vec::new()), Dialect::TSql)
        .unwrap();
    assert_eq!(out, "cycle_cde = 202404");
}

// ============================================================================
// Whole statements
// ============================================================================

#[test]
fn test_comments_are_left_untouched() {
    let sql = "SELECT 1 -- as of {current_cycle}\nFROM deal WHERE c = {current_cycle}";
    let out = substitute(sql, &params(202404, Vec::new()), Dialect::Postgres).unwrap();
    assert_eq!(out, "SELECT 1 -- as of {current_cycle}\nFROM deal WHERE c = 202404");
}

#[test]
fn test_grammar_errors_block_substitution() {
    let err = substitute("WHERE {deal_filter} AND {nope}", &params(202404, Vec::new()), Dialect::Postgres)
        .unwrap_err();
    assert_eq!(
        err,
        SubstitutionError::Grammar(vec![PlaceholderError::Unknown {
            name: "nope".into(),
            offset: 24,
        }])
    );
    assert!(err.to_string().contains("Unknown placeholder 'nope'"));
}

#[test]
fn test_substituted_statement_is_executable() {
    let sql = "SELECT deal.dl_nbr, tranche.tr_id,\n\
               SUM(cur.tr_end_bal_amt) - SUM(prev.tr_end_bal_amt) AS bal_change\n\
               FROM deal\n\
               JOIN tranche ON tranche.dl_nbr = deal.dl_nbr\n\
               JOIN tranchebal cur ON cur.dl_nbr = tranche.dl_nbr AND cur.tr_id = tranche.tr_id AND cur.cycle_cde = {current_cycle}\n\
               JOIN tranchebal prev ON prev.dl_nbr = tranche.dl_nbr AND prev.tr_id = tranche.tr_id AND prev.cycle_cde = {previous_cycle}\n\
               WHERE {deal_tranche_filter}\n\
               GROUP BY deal.dl_nbr, tranche.tr_id";
    let p = params(
        202401,
        vec![DealSelection::deal(101).with_tranches(["A"]), DealSelection::deal(102)],
    );

    let out = substitute(sql, &p, Dialect::Postgres).unwrap();
    assert!(out.contains("cur.cycle_cde = 202401"));
    assert!(out.contains("prev.cycle_cde = 202312"));
    assert_eq!(scan(&out).token_count, 0);
    check_syntax(&out, Dialect::Postgres).unwrap();
}

#[test]
fn test_params_from_json() {
    let p: ExecutionParams = serde_json::from_str(
        r#"{"anchor_cycle": 202404, "deals": [{"deal_number": 101, "tranche_ids": ["A"]}, {"deal_number": 102}]}"#,
    )
    .unwrap();
    assert_eq!(p.anchor_cycle.code(), 202404);
    assert_eq!(p.deals[1], DealSelection::deal(102));

    let bad = serde_json::from_str::<ExecutionParams>(r#"{"anchor_cycle": 202499}"#);
    assert!(bad.is_err());
}

//! Full-query synthesis: turns a declarative definition into the complete
//! SELECT that previews it, inferring joins and GROUP BY from the source
//! model and group level.
//!
//! ```text
//! source model + group level → JoinPlan → SELECT keys + measure
//!                                        → FROM deal [JOIN tranche [JOIN tranchebal]]
//!                                        → WHERE sample filters
//!                                        → GROUP BY keys (aggregations only)
//! ```
//!
//! The WHERE clause uses fixed sample values and is marked with a leading
//! comment. Production runs use System SQL placeholders instead.

use inflector::Inflector;

use crate::model::{
    AggregationFunction, CalculationDefinition, GroupLevel, SourceModel, UserAggregation,
};
use crate::sql::{
    avg, count, lit_int, lit_str, max, min, nullif, sum, table_col, Dialect, Expr, ExprExt, Query,
    SelectExpr, TableRef,
};

/// Returned whenever a definition does not have enough inputs to render SQL.
pub const INCOMPLETE_QUERY: &str = "-- Not enough information to generate SQL";

/// First line of every generated preview.
pub const PREVIEW_COMMENT: &str =
    "Preview query: sample filters, not the production execution path";

/// Alias used when the calculation name has no usable characters.
pub const DEFAULT_RESULT_ALIAS: &str = "calculation_result";

/// Rendering options for previews.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOptions {
    pub dialect: Dialect,
    /// Sample deals for the illustrative WHERE clause. Empty omits the predicate.
    pub sample_deal_numbers: Vec<i64>,
    /// Sample tranche ids, applied when tranche is joined. Empty omits the predicate.
    pub sample_tranche_ids: Vec<String>,
    /// Sample cycle code, applied when tranchebal is joined.
    pub sample_cycle: Option<i64>,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            sample_deal_numbers: vec![101, 102, 103],
            sample_tranche_ids: vec!["A".into(), "B".into()],
            sample_cycle: Some(202404),
        }
    }
}

impl PreviewOptions {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

/// The minimal set of tables a definition needs. Deal is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPlan {
    pub tranche: bool,
    pub tranche_bal: bool,
}

impl JoinPlan {
    pub fn for_source(model: SourceModel, level: GroupLevel) -> Self {
        let tranche_bal = model == SourceModel::TrancheBal;
        let tranche = tranche_bal || model == SourceModel::Tranche || level == GroupLevel::Tranche;
        Self {
            tranche,
            tranche_bal,
        }
    }

    /// Tables in join order: Deal → Tranche → TrancheBal.
    pub fn tables(&self) -> Vec<SourceModel> {
        let mut tables = vec![SourceModel::Deal];
        if self.tranche {
            tables.push(SourceModel::Tranche);
        }
        if self.tranche_bal {
            tables.push(SourceModel::TrancheBal);
        }
        tables
    }

    /// Grouping keys projected ahead of the measure.
    pub fn grouping_keys(&self, level: GroupLevel) -> Vec<Expr> {
        let mut keys = vec![table_col(SourceModel::Deal.table_name(), "dl_nbr")];
        if level == GroupLevel::Tranche {
            keys.push(table_col(SourceModel::Tranche.table_name(), "tr_id"));
        }
        if self.tranche_bal {
            keys.push(table_col(SourceModel::TrancheBal.table_name(), "cycle_cde"));
        }
        keys
    }
}

/// Render the full preview SQL for a definition.
///
/// Deterministic: identical input yields byte-identical text. Never fails;
/// incomplete definitions produce [`INCOMPLETE_QUERY`]. System SQL is
/// returned as written, placeholders intact.
pub fn generate_full_query(def: &CalculationDefinition, options: &PreviewOptions) -> String {
    if let CalculationDefinition::SystemSql(sql) = def {
        let body = sql.raw_sql.trim();
        return if body.is_empty() {
            INCOMPLETE_QUERY.to_string()
        } else {
            body.to_string()
        };
    }

    match build_preview_query(def, options) {
        Some(query) => {
            let sql = query.to_sql(options.dialect);
            tracing::debug!(
                kind = def.kind(),
                dialect = ?options.dialect,
                bytes = sql.len(),
                "generated preview query"
            );
            sql
        }
        None => INCOMPLETE_QUERY.to_string(),
    }
}

/// Build the preview query AST. `None` for System SQL and incomplete input.
pub fn build_preview_query(def: &CalculationDefinition, options: &PreviewOptions) -> Option<Query> {
    let (model, level, measure, aggregating) = match def {
        CalculationDefinition::SystemSql(_) => return None,
        CalculationDefinition::SystemField(field) => {
            let column = table_col(field.source_model.table_name(), field.field()?);
            (field.source_model, field.group_level, column, false)
        }
        CalculationDefinition::UserAggregation(agg) => {
            (agg.source_model, agg.group_level, aggregate_expr(agg)?, true)
        }
    };

    let plan = JoinPlan::for_source(model, level);
    let keys = plan.grouping_keys(level);

    let mut select: Vec<SelectExpr> = keys.iter().cloned().map(SelectExpr::new).collect();
    select.push(SelectExpr::new(measure).with_alias(&result_alias(def.name())));

    let mut query = Query::new()
        .comment(PREVIEW_COMMENT)
        .select(select)
        .from(TableRef::new(SourceModel::Deal.table_name()));

    let deal = SourceModel::Deal.table_name();
    let tranche = SourceModel::Tranche.table_name();
    let tranche_bal = SourceModel::TrancheBal.table_name();

    if plan.tranche {
        query = query.inner_join(
            TableRef::new(tranche),
            table_col(deal, "dl_nbr").eq(table_col(tranche, "dl_nbr")),
        );
    }
    if plan.tranche_bal {
        query = query.inner_join(
            TableRef::new(tranche_bal),
            table_col(tranche, "dl_nbr")
                .eq(table_col(tranche_bal, "dl_nbr"))
                .and(table_col(tranche, "tr_id").eq(table_col(tranche_bal, "tr_id"))),
        );
    }

    if !options.sample_deal_numbers.is_empty() {
        let deals = options.sample_deal_numbers.iter().map(|n| lit_int(*n)).collect();
        query = query.filter(table_col(deal, "dl_nbr").in_list(deals));
    }
    if plan.tranche && !options.sample_tranche_ids.is_empty() {
        let ids = options.sample_tranche_ids.iter().map(|id| lit_str(id)).collect();
        query = query.filter(table_col(tranche, "tr_id").in_list(ids));
    }
    if let (true, Some(cycle)) = (plan.tranche_bal, options.sample_cycle) {
        query = query.filter(table_col(tranche_bal, "cycle_cde").eq(lit_int(cycle)));
    }

    if aggregating {
        query = query.group_by(keys);
    }

    Some(query)
}

/// Aggregate expression for a user aggregation, `None` while incomplete.
///
/// Weighted averages always divide by `NULLIF(SUM(weight), 0)`.
pub fn aggregate_expr(agg: &UserAggregation) -> Option<Expr> {
    let table = agg.source_model.table_name();
    let value = table_col(table, agg.field()?);

    let expr = match agg.aggregation_function? {
        AggregationFunction::Sum => sum(value),
        AggregationFunction::Avg => avg(value),
        AggregationFunction::Count => count(value),
        AggregationFunction::Min => min(value),
        AggregationFunction::Max => max(value),
        AggregationFunction::WeightedAvg => {
            let weight = table_col(table, agg.weight()?);
            sum(value.mul(weight.clone())).div(nullif(sum(weight), lit_int(0)))
        }
    };
    Some(expr)
}

/// Stable result alias derived from the calculation name.
///
/// `Total Ending Balance` → `total_ending_balance`.
pub fn result_alias(name: &str) -> String {
    let snake: String = name
        .to_snake_case()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let snake = snake.trim_matches('_');

    match snake.chars().next() {
        None => DEFAULT_RESULT_ALIAS.to_string(),
        Some(c) if c.is_ascii_digit() => format!("calc_{}", snake),
        Some(_) => snake.to_string(),
    }
}

//! Fixed sales aggregation units
//!
//! Source tables: `agent(agent_id, name, branch)`, `sale(agent_id, product, amount)`
//! (see `sql/source.sql`). Destination tables: `sql/destination.sql`.
//!
//! Units run in the order returned by [`sales_units`].

use super::types::{AggregationUnit, ColumnMapping};

/// Number of agent/branch teams kept in `best_sales_teams`
pub const TOP_TEAMS_LIMIT: u32 = 5;

/// Per-branch product total that must be strictly exceeded to be reported
pub const PRODUCT_SALES_TARGET: i64 = 1000;

pub const BEST_SALES_TEAMS: &str = "best_sales_teams";
pub const TOP_SELLING_PRODUCTS: &str = "top_selling_products";
pub const BRANCH_SALES_PERFORMANCE: &str = "branch_sales_performance";

/// Best performing teams, grouped by agent and branch
///
/// `agent_name` is selected but not part of the destination schema.
pub fn best_sales_teams() -> AggregationUnit {
    let query = format!(
        r#"
        SELECT a.branch, COUNT(*) AS total_sales, SUM(s.amount) AS total_revenue, a.name AS agent_name
        FROM sale s
        JOIN agent a ON s.agent_id = a.agent_id
        GROUP BY a.name, a.branch
        ORDER BY total_revenue DESC
        LIMIT {}
        "#,
        TOP_TEAMS_LIMIT
    );

    AggregationUnit::new(BEST_SALES_TEAMS, &query, BEST_SALES_TEAMS)
        .with_column(ColumnMapping::keep("branch"))
        .with_column(ColumnMapping::keep("total_sales"))
        .with_column(ColumnMapping::keep("total_revenue"))
        .with_column(ColumnMapping::dropped("agent_name"))
}

/// Products whose per-branch total is strictly above the sales target
pub fn top_selling_products() -> AggregationUnit {
    let query = format!(
        r#"
        SELECT s.product AS product_name, SUM(s.amount) AS total_sales, a.branch AS branch
        FROM sale s
        JOIN agent a ON s.agent_id = a.agent_id
        GROUP BY a.branch, s.product
        HAVING SUM(s.amount) > {}
        ORDER BY total_sales DESC
        "#,
        PRODUCT_SALES_TARGET
    );

    AggregationUnit::new(TOP_SELLING_PRODUCTS, &query, TOP_SELLING_PRODUCTS)
        .with_column(ColumnMapping::keep("product_name"))
        .with_column(ColumnMapping::keep("total_sales"))
        .with_column(ColumnMapping::keep("branch"))
}

/// Total sales per branch
pub fn branch_sales_performance() -> AggregationUnit {
    let query = r#"
        SELECT a.branch, SUM(s.amount) AS total_sales
        FROM sale s
        JOIN agent a ON s.agent_id = a.agent_id
        GROUP BY a.branch
        ORDER BY total_sales DESC
        "#;

    AggregationUnit::new(BRANCH_SALES_PERFORMANCE, query, BRANCH_SALES_PERFORMANCE)
        .with_column(ColumnMapping::keep("branch"))
        .with_column(ColumnMapping::keep("total_sales"))
}

/// All sales units in execution order
pub fn sales_units() -> Vec<AggregationUnit> {
    vec![
        best_sales_teams(),
        top_selling_products(),
        branch_sales_performance(),
    ]
}

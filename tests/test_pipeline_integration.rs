//! Integration tests: full aggregation runs against on-disk SQLite stores
//!
//! Every test builds a fresh source (`sql/source.sql`) and destination
//! (`sql/destination.sql`) in a temp directory and drives the public
//! `AggregationPipeline` API.

#[cfg(test)]
mod pipeline_integration_tests {
    use rusqlite::{params, Connection};
    use salesflow::pipeline::{
        trigger, AggregationPipeline, PipelineConfig, RunResult, SourceIsolation,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Stores {
        _dir: TempDir,
        source: String,
        destination: String,
    }

    impl Stores {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let source = dir.path().join("source.db");
            let destination = dir.path().join("warehouse.db");

            Connection::open(&source)
                .unwrap()
                .execute_batch(include_str!("../sql/source.sql"))
                .unwrap();
            Connection::open(&destination)
                .unwrap()
                .execute_batch(include_str!("../sql/destination.sql"))
                .unwrap();

            Self {
                source: source.to_str().unwrap().to_string(),
                destination: destination.to_str().unwrap().to_string(),
                _dir: dir,
            }
        }

        fn config(&self) -> PipelineConfig {
            PipelineConfig::new(&self.source, &self.destination)
                .with_busy_timeout(Duration::from_millis(200))
        }

        fn pipeline(&self) -> AggregationPipeline {
            AggregationPipeline::new(self.config())
        }

        fn source_conn(&self) -> Connection {
            Connection::open(&self.source).unwrap()
        }

        fn destination_conn(&self) -> Connection {
            Connection::open(&self.destination).unwrap()
        }

        fn add_agent(&self, agent_id: i64, name: &str, branch: &str) {
            self.source_conn()
                .execute(
                    "INSERT INTO agent (agent_id, name, branch) VALUES (?1, ?2, ?3)",
                    params![agent_id, name, branch],
                )
                .unwrap();
        }

        fn add_sale(&self, agent_id: i64, product: &str, amount: f64) {
            self.source_conn()
                .execute(
                    "INSERT INTO sale (agent_id, product, amount) VALUES (?1, ?2, ?3)",
                    params![agent_id, product, amount],
                )
                .unwrap();
        }

        /// North: 500 + 300 + 700 = 1500, South: 200
        fn seed_two_branches(&self) {
            self.add_agent(1, "Alice", "North");
            self.add_agent(2, "Bob", "North");
            self.add_agent(3, "Cara", "South");
            self.add_sale(1, "Widget", 500.0);
            self.add_sale(2, "Gadget", 300.0);
            self.add_sale(1, "Widget", 700.0);
            self.add_sale(3, "Widget", 200.0);
        }

        fn branch_totals(&self) -> Vec<(String, f64)> {
            let conn = self.destination_conn();
            let mut stmt = conn
                .prepare("SELECT branch, total_sales FROM branch_sales_performance ORDER BY rowid")
                .unwrap();
            let rows = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            rows
        }

        fn products(&self) -> Vec<(String, String, f64)> {
            let conn = self.destination_conn();
            let mut stmt = conn
                .prepare(
                    "SELECT branch, product_name, total_sales FROM top_selling_products ORDER BY rowid",
                )
                .unwrap();
            let rows = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            rows
        }

        fn teams(&self) -> Vec<(String, i64, f64)> {
            let conn = self.destination_conn();
            let mut stmt = conn
                .prepare(
                    "SELECT branch, total_sales, total_revenue FROM best_sales_teams ORDER BY rowid",
                )
                .unwrap();
            let rows = stmt
                .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            rows
        }

        /// Stale rows that a successful run must remove
        fn seed_stale_destination(&self) {
            self.destination_conn()
                .execute_batch(
                    "INSERT INTO best_sales_teams VALUES ('Atlantis', 99, 99999);
                     INSERT INTO top_selling_products VALUES ('Atlantis', 'Trident', 5000);
                     INSERT INTO branch_sales_performance VALUES ('Atlantis', 99999);",
                )
                .unwrap();
        }
    }

    #[test]
    fn test_branch_sales_scenario() {
        let stores = Stores::new();
        stores.seed_two_branches();

        assert_eq!(stores.pipeline().run(), RunResult::Success);

        assert_eq!(
            stores.branch_totals(),
            vec![("North".to_string(), 1500.0), ("South".to_string(), 200.0)]
        );
    }

    #[test]
    fn test_mapping_fidelity() {
        let stores = Stores::new();
        stores.seed_two_branches();
        stores.add_sale(2, "Gadget", 900.0);

        assert!(stores.pipeline().run().is_success());

        // Alice 1200 (2 sales), Bob 1200 (2 sales), Cara 200; tie order is engine-defined
        let mut teams = stores.teams();
        assert_eq!(teams.len(), 3);
        assert_eq!(teams.pop().unwrap(), ("South".to_string(), 1, 200.0));
        assert!(teams
            .iter()
            .all(|(branch, count, revenue)| branch == "North" && *count == 2 && *revenue == 1200.0));

        let mut products = stores.products();
        products.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            products,
            vec![
                ("North".to_string(), "Gadget".to_string(), 1200.0),
                ("North".to_string(), "Widget".to_string(), 1200.0),
            ]
        );
    }

    #[test]
    fn test_product_exactly_at_target_is_excluded() {
        let stores = Stores::new();
        stores.add_agent(1, "Alice", "North");
        stores.add_sale(1, "Exact", 600.0);
        stores.add_sale(1, "Exact", 400.0);
        stores.add_sale(1, "Above", 1000.5);

        assert!(stores.pipeline().run().is_success());

        assert_eq!(
            stores.products(),
            vec![("North".to_string(), "Above".to_string(), 1000.5)]
        );
    }

    #[test]
    fn test_replace_not_merge() {
        let stores = Stores::new();
        stores.seed_two_branches();
        stores.seed_stale_destination();

        assert!(stores.pipeline().run().is_success());

        assert!(stores.branch_totals().iter().all(|(b, _)| b != "Atlantis"));
        assert!(stores.teams().iter().all(|(b, _, _)| b != "Atlantis"));
        assert_eq!(
            stores.products(),
            vec![("North".to_string(), "Widget".to_string(), 1200.0)]
        );
    }

    #[test]
    fn test_idempotent_runs() {
        let stores = Stores::new();
        stores.seed_two_branches();
        let pipeline = stores.pipeline();

        assert!(pipeline.run().is_success());
        let first = (stores.teams(), stores.products(), stores.branch_totals());

        assert!(pipeline.run().is_success());
        let second = (stores.teams(), stores.products(), stores.branch_totals());

        assert_eq!(first, second);
    }

    #[test]
    fn test_source_changes_are_picked_up() {
        let stores = Stores::new();
        stores.seed_two_branches();
        let pipeline = stores.pipeline();

        assert!(pipeline.run().is_success());
        stores.add_agent(4, "Dan", "East");
        stores.add_sale(4, "Widget", 5000.0);
        assert!(pipeline.run().is_success());

        assert_eq!(
            stores.branch_totals(),
            vec![
                ("East".to_string(), 5000.0),
                ("North".to_string(), 1500.0),
                ("South".to_string(), 200.0),
            ]
        );
    }

    #[test]
    fn test_failure_before_third_unit_rolls_back_everything() {
        let stores = Stores::new();
        stores.seed_two_branches();
        stores.seed_stale_destination();

        // Simulates the destination going away mid-run
        stores
            .destination_conn()
            .execute_batch(
                "CREATE TRIGGER sever_connection BEFORE INSERT ON branch_sales_performance
                 BEGIN SELECT RAISE(ABORT, 'connection to destination lost'); END;",
            )
            .unwrap();

        let before = (stores.teams(), stores.products(), stores.branch_totals());

        match stores.pipeline().run() {
            RunResult::Failure(cause) => assert!(cause.contains("connection to destination lost")),
            RunResult::Success => panic!("run should fail"),
        }

        let after = (stores.teams(), stores.products(), stores.branch_totals());
        assert_eq!(before, after);
    }

    #[test]
    fn test_constraint_violation_rolls_back_earlier_units() {
        let stores = Stores::new();
        stores.seed_two_branches();
        stores.seed_stale_destination();

        stores
            .destination_conn()
            .execute_batch(
                "CREATE TRIGGER reject_products BEFORE INSERT ON top_selling_products
                 BEGIN SELECT RAISE(ABORT, 'NOT NULL constraint failed'); END;",
            )
            .unwrap();
        stores.add_sale(1, "Widget", 1.0); // Widget/North = 1201 > target

        let result = stores.pipeline().run();
        assert!(!result.is_success());

        // best_sales_teams ran first; it must still hold the pre-run rows
        assert_eq!(stores.teams(), vec![("Atlantis".to_string(), 99, 99999.0)]);
    }

    #[test]
    fn test_unreachable_destination_reports_failure() {
        let stores = Stores::new();
        stores.seed_two_branches();

        let config = PipelineConfig::new(&stores.source, "/nonexistent/dir/warehouse.db");
        let result = AggregationPipeline::new(config).run();

        match result {
            RunResult::Failure(cause) => assert!(cause.starts_with("Connection error")),
            RunResult::Success => panic!("run should fail"),
        }
    }

    #[test]
    fn test_missing_source_schema_reports_query_failure() {
        let stores = Stores::new();
        stores.seed_stale_destination();
        stores.source_conn().execute_batch("DROP TABLE sale").unwrap();

        match stores.pipeline().run() {
            RunResult::Failure(cause) => assert!(cause.starts_with("Query error")),
            RunResult::Success => panic!("run should fail"),
        }
        assert_eq!(stores.branch_totals(), vec![("Atlantis".to_string(), 99999.0)]);
    }

    #[test]
    fn test_empty_source_empties_destination() {
        let stores = Stores::new();
        stores.seed_stale_destination();

        assert!(stores.pipeline().run().is_success());

        assert!(stores.teams().is_empty());
        assert!(stores.products().is_empty());
        assert!(stores.branch_totals().is_empty());
    }

    #[test]
    fn test_snapshot_isolation_produces_same_tables() {
        let stores = Stores::new();
        stores.seed_two_branches();

        let pipeline =
            AggregationPipeline::new(stores.config().with_isolation(SourceIsolation::Snapshot));
        assert!(pipeline.run().is_success());

        assert_eq!(
            stores.branch_totals(),
            vec![("North".to_string(), 1500.0), ("South".to_string(), 200.0)]
        );
    }

    #[test]
    fn test_concurrent_run_waits_on_destination_lock() {
        let stores = Stores::new();
        stores.seed_two_branches();

        // Another process holding the destination write lock
        let holder = stores.destination_conn();
        holder.execute_batch("BEGIN IMMEDIATE").unwrap();

        let result = stores.pipeline().run();
        assert!(!result.is_success());

        holder.execute_batch("ROLLBACK").unwrap();
        assert!(stores.pipeline().run().is_success());
    }

    #[tokio::test]
    async fn test_async_trigger() {
        let stores = Stores::new();
        stores.seed_two_branches();
        let pipeline = Arc::new(stores.pipeline());

        let result = trigger(pipeline.clone()).await;

        assert_eq!(result, RunResult::Success);
        assert!(!pipeline.is_running());
        assert_eq!(stores.branch_totals().len(), 2);
    }
}

//! Run orchestration
//!
//! For every configured table: load the source and history schemas, decide
//! whether the history table must be created or synchronised, render the DDL
//! and the audit triggers, and append the block to the output. Tables are
//! processed one after another and share no state.

use crate::catalog::Catalog;
use crate::ddl::DdlGenerator;
use crate::diff::{self, ColumnDiff};
use crate::error::{not_found_error, AppResult};
use crate::schema::{history_table_name, Field, ReservedColumns, Table};
use crate::trigger::TriggerGenerator;
use std::io::Write;
use tracing::{debug, info, warn};

/// What has to happen to the history table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPlan<'a> {
    /// History table is absent; create it with these source columns
    Create { columns: Vec<&'a Field> },
    /// History table exists; apply these column changes
    Sync(ColumnDiff<'a>),
}

/// Everything needed to render one table's output
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub suffix: &'a str,
    pub reserved: ReservedColumns,
    pub source: &'a Table,
    pub history: Option<&'a Table>,
    pub plan: HistoryPlan<'a>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(suffix: &'a str, source: &'a Table, history: Option<&'a Table>) -> Self {
        let reserved = ReservedColumns::new(suffix);
        let plan = match history {
            None => HistoryPlan::Create {
                columns: diff::added(Some(source), None),
            },
            Some(history) => HistoryPlan::Sync(ColumnDiff::between(source, history, &reserved)),
        };

        Self {
            suffix,
            reserved,
            source,
            history,
            plan,
        }
    }

    pub fn history_name(&self) -> String {
        history_table_name(&self.source.name, self.suffix)
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tables: usize,
    pub created: usize,
    pub synced: usize,
    pub triggers_replaced: usize,
}

/// Drives catalog lookups and SQL rendering for a list of tables
pub struct Generator<C> {
    catalog: C,
    database: String,
    suffix: String,
}

impl<C: Catalog> Generator<C> {
    pub fn new(catalog: C, database: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            catalog,
            database: database.into(),
            suffix: suffix.into(),
        }
    }

    /// Render the complete block for one table, starting with its `-- name` line
    pub async fn render_table(&self, table: &str, summary: &mut RunSummary) -> AppResult<String> {
        let source = self
            .catalog
            .columns(table, &self.database)
            .await?
            .ok_or_else(|| {
                not_found_error(format!(
                    "source table `{}` does not exist in `{}`",
                    table, self.database
                ))
            })?;

        let history_name = history_table_name(table, &self.suffix);
        let history = self.catalog.columns(&history_name, &self.database).await?;

        let ctx = GenerationContext::new(&self.suffix, &source, history.as_ref());
        self.check_reserved(&ctx);

        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!("-- {}\n", table));

        match &ctx.plan {
            HistoryPlan::Create { columns } => {
                info!("{}: creating {} with {} columns", table, history_name, columns.len());
                summary.created += 1;
            }
            HistoryPlan::Sync(diff) => {
                info!(
                    "{}: syncing {} ({} modified, {} dropped, {} added)",
                    table,
                    history_name,
                    diff.modified.len(),
                    diff.removed.len(),
                    diff.added.len()
                );
                if diff.is_empty() {
                    debug!("{} is up to date", history_name);
                }
                for (change, field) in diff.changes() {
                    debug!("{}: {:?} column {} {}", history_name, change, field.name, field.data_type);
                }
                summary.synced += 1;
            }
        }
        DdlGenerator::render(&ctx, &mut out)?;

        let existing = self.catalog.trigger_names(&self.database, table).await?;
        summary.triggers_replaced += TriggerGenerator::stale_triggers(table, &existing).len();
        TriggerGenerator::render(&ctx, &existing, &mut out)?;

        summary.tables += 1;
        Ok(out)
    }

    /// Process `tables` in order, writing each finished block to `out`.
    ///
    /// Stops at the first error; blocks already written stay written.
    pub async fn run<W: Write>(&self, tables: &[String], out: &mut W) -> AppResult<RunSummary> {
        let mut summary = RunSummary::default();

        for table in tables {
            let block = self.render_table(table, &mut summary).await?;
            out.write_all(block.as_bytes())?;
        }
        out.flush()?;

        info!(
            "Generated SQL for {} tables ({} created, {} synced, {} triggers replaced)",
            summary.tables, summary.created, summary.synced, summary.triggers_replaced
        );
        Ok(summary)
    }

    fn check_reserved(&self, ctx: &GenerationContext<'_>) {
        if let Some(history) = ctx.history {
            for name in ctx.reserved.missing_from(history) {
                warn!("{} has no reserved column `{}`", history.name, name);
            }
        }
        for field in &ctx.source.fields {
            if ctx.reserved.is_reserved(&field.name) {
                warn!(
                    "{}: column `{}` collides with a reserved history column",
                    ctx.source.name, field.name
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalog;
    use crate::error::AppError;
    use pretty_assertions::assert_eq;

    const DB: &str = "shop";

    fn source_t() -> Table {
        Table::new(
            "t",
            vec![
                Field::new("id", "int").with_key("PRI"),
                Field::new("name", "varchar(50)"),
            ],
        )
    }

    fn history_t(extra: &[Field]) -> Table {
        let mut fields = vec![
            Field::new("his_id", "bigint(20)").with_key("PRI"),
            Field::new("his_type", "varchar(255)"),
            Field::new("his_date", "timestamp"),
            Field::new("id", "int"),
            Field::new("name", "varchar(50)"),
        ];
        fields.extend_from_slice(extra);
        Table::new("t_his", fields)
    }

    fn run(catalog: MemoryCatalog, tables: &[&str]) -> AppResult<(String, RunSummary)> {
        let generator = Generator::new(catalog, DB, "his");
        let tables: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
        let mut out = Vec::new();
        let summary = tokio_test::block_on(generator.run(&tables, &mut out))?;
        Ok((String::from_utf8(out).unwrap(), summary))
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_context_plan_create() {
        let source = source_t();
        let ctx = GenerationContext::new("his", &source, None);
        assert_eq!(ctx.history_name(), "t_his");
        match ctx.plan {
            HistoryPlan::Create { columns } => assert_eq!(columns.len(), 2),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_scenario_a_creates_history_table() {
        let catalog = MemoryCatalog::new().with_table(DB, source_t());
        let (out, summary) = run(catalog, &["t"]).unwrap();

        let expected_create = "
CREATE TABLE t_his (
  `his_id` bigint(20) NOT NULL AUTO_INCREMENT,
  `his_type` varchar(255) DEFAULT NULL,
  `his_date` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP,
  `id` int,
  `name` varchar(50),
  PRIMARY KEY (`his_id`)
) ENGINE=InnoDB AUTO_INCREMENT=1 DEFAULT CHARSET=utf8mb4;
";
        assert!(out.starts_with("\n-- t\n"));
        assert_eq!(count(&out, expected_create), 1);
        assert_eq!(count(&out, "ALTER TABLE"), 0);
        assert_eq!(count(&out, "DROP TRIGGER"), 0);
        assert_eq!(count(&out, "CREATE TRIGGER"), 3);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.synced, 0);
    }

    #[test]
    fn test_scenario_b_adds_new_column() {
        let mut source = source_t();
        source.fields.push(Field::new("email", "varchar(100)"));
        let catalog = MemoryCatalog::new()
            .with_table(DB, source)
            .with_table(DB, history_t(&[]));
        let (out, _) = run(catalog, &["t"]).unwrap();

        assert_eq!(count(&out, "ALTER TABLE t_his ADD COLUMN `email` varchar(100);"), 1);
        assert_eq!(count(&out, "ADD COLUMN"), 1);
        assert_eq!(count(&out, "MODIFY COLUMN"), 0);
        assert_eq!(count(&out, "DROP COLUMN"), 0);
        assert_eq!(count(&out, "CREATE TABLE"), 0);
    }

    #[test]
    fn test_scenario_c_modifies_changed_type() {
        let mut source = source_t();
        source.fields[1].data_type = "varchar(100)".to_string();
        let catalog = MemoryCatalog::new()
            .with_table(DB, source)
            .with_table(DB, history_t(&[]));
        let (out, _) = run(catalog, &["t"]).unwrap();

        assert_eq!(count(&out, "ALTER TABLE t_his MODIFY COLUMN `name` varchar(100);"), 1);
        assert_eq!(count(&out, "MODIFY COLUMN"), 1);
        assert_eq!(count(&out, "ADD COLUMN"), 0);
        assert_eq!(count(&out, "DROP COLUMN"), 0);
    }

    #[test]
    fn test_scenario_d_drops_stale_column_but_not_reserved() {
        let catalog = MemoryCatalog::new()
            .with_table(DB, source_t())
            .with_table(DB, history_t(&[Field::new("legacy_flag", "tinyint(1)")]));
        let (out, _) = run(catalog, &["t"]).unwrap();

        assert_eq!(count(&out, "ALTER TABLE t_his DROP COLUMN `legacy_flag`;"), 1);
        assert_eq!(count(&out, "DROP COLUMN"), 1);
        for reserved in ["his_id", "his_type", "his_date"] {
            assert_eq!(count(&out, &format!("DROP COLUMN `{}`", reserved)), 0);
        }
    }

    #[test]
    fn test_scenario_e_replaces_existing_triggers() {
        let catalog = MemoryCatalog::new()
            .with_table(DB, source_t())
            .with_table(DB, history_t(&[]))
            .with_triggers(DB, "t", &["t_insert_tk", "t_update_tk", "t_delete_tk", "t_other"]);
        let (out, summary) = run(catalog, &["t"]).unwrap();

        assert_eq!(count(&out, "DROP TRIGGER"), 3);
        assert_eq!(count(&out, "DROP TRIGGER t_other"), 0);
        assert_eq!(count(&out, "CREATE TRIGGER"), 3);

        let last_drop = out.rfind("DROP TRIGGER").unwrap();
        let first_create = out.find("CREATE TRIGGER").unwrap();
        assert!(last_drop < first_create);

        for event in ["insert", "update", "delete"] {
            let name = format!("t_{}_tk", event);
            let drop = out.find(&format!("DROP TRIGGER {};", name)).unwrap();
            let create = out.find(&format!("CREATE TRIGGER {} ", name)).unwrap();
            assert!(drop < create);
        }
        assert_eq!(summary.triggers_replaced, 3);
    }

    #[test]
    fn test_unchanged_schema_only_reinstalls_triggers() {
        let catalog = MemoryCatalog::new()
            .with_table(DB, source_t())
            .with_table(DB, history_t(&[]))
            .with_triggers(DB, "t", &["t_insert_tk", "t_update_tk", "t_delete_tk"]);
        let (first, _) = run(catalog, &["t"]).unwrap();

        let catalog = MemoryCatalog::new()
            .with_table(DB, source_t())
            .with_table(DB, history_t(&[]))
            .with_triggers(DB, "t", &["t_insert_tk", "t_update_tk", "t_delete_tk"]);
        let (second, _) = run(catalog, &["t"]).unwrap();

        assert_eq!(first, second);
        assert_eq!(count(&first, "ALTER TABLE"), 0);
        assert_eq!(count(&first, "CREATE TABLE"), 0);
        assert_eq!(count(&first, "DROP TRIGGER"), 3);
        assert_eq!(count(&first, "CREATE TRIGGER"), 3);
    }

    #[test]
    fn test_reserved_never_dropped_even_if_in_source() {
        let mut source = source_t();
        source.fields.push(Field::new("his_type", "varchar(255)"));
        let history = Table::new("t_his", vec![Field::new("id", "int"), Field::new("name", "varchar(50)")]);
        let catalog = MemoryCatalog::new().with_table(DB, source).with_table(DB, history);
        let (out, _) = run(catalog, &["t"]).unwrap();

        assert_eq!(count(&out, "DROP COLUMN"), 0);
        assert_eq!(count(&out, "ALTER TABLE t_his ADD COLUMN `his_type` varchar(255);"), 1);
    }

    #[test]
    fn test_tables_processed_in_order() {
        let other = Table::new("u", vec![Field::new("code", "char(3)")]);
        let catalog = MemoryCatalog::new()
            .with_table(DB, source_t())
            .with_table(DB, other);
        let (out, summary) = run(catalog, &["u", "t"]).unwrap();

        let u = out.find("-- u\n").unwrap();
        let t = out.find("-- t\n").unwrap();
        assert!(u < t);
        assert_eq!(summary.tables, 2);
        assert_eq!(summary.created, 2);
    }

    #[test]
    fn test_missing_source_table_aborts_run() {
        let catalog = MemoryCatalog::new().with_table(DB, source_t());
        let generator = Generator::new(catalog, DB, "his");
        let tables = vec!["t".to_string(), "ghost".to_string(), "t".to_string()];
        let mut out = Vec::new();

        let result = tokio_test::block_on(generator.run(&tables, &mut out));
        assert!(matches!(result, Err(AppError::NotFound(_))));

        // The block for the first table was complete before the failure
        let written = String::from_utf8(out).unwrap();
        assert_eq!(count(&written, "-- t\n"), 1);
        assert_eq!(count(&written, "-- ghost"), 0);
    }

    fn failing_run(catalog: MemoryCatalog, tables: &[&str]) -> (AppResult<RunSummary>, String) {
        let generator = Generator::new(catalog, DB, "his");
        let tables: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
        let mut out = Vec::new();
        let result = tokio_test::block_on(generator.run(&tables, &mut out));
        (result, String::from_utf8(out).unwrap())
    }

    fn three_tables() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table(DB, source_t())
            .with_table(DB, Table::new("u", vec![Field::new("code", "char(3)")]))
            .with_table(DB, Table::new("v", vec![Field::new("ok", "tinyint(1)")]))
    }

    #[test]
    fn test_source_lookup_failure_aborts_run() {
        let (result, written) = failing_run(three_tables().failing_columns_of("u"), &["t", "u", "v"]);

        assert!(matches!(result, Err(AppError::Catalog(_))));
        assert_eq!(count(&written, "-- t\n"), 1);
        assert_eq!(count(&written, "-- u"), 0);
        assert_eq!(count(&written, "-- v"), 0);
    }

    #[test]
    fn test_history_lookup_failure_aborts_run() {
        let (result, written) = failing_run(three_tables().failing_columns_of("u_his"), &["t", "u", "v"]);

        assert!(matches!(result, Err(AppError::Catalog(_))));
        assert_eq!(count(&written, "-- t\n"), 1);
        assert_eq!(count(&written, "-- u"), 0);
        assert_eq!(count(&written, "-- v"), 0);
    }

    #[test]
    fn test_trigger_lookup_failure_writes_no_partial_block() {
        let (result, written) = failing_run(three_tables().failing_triggers_of("t"), &["t", "u"]);

        // DDL for `t` was already rendered, but nothing of its block is written
        assert!(matches!(result, Err(AppError::Catalog(_))));
        assert_eq!(written, "");
    }
}

//! History table DDL generator
//!
//! Renders MySQL DDL that creates a history table or brings an existing one
//! in line with its source table. Columns are only ever dropped when they
//! disappeared from the source, never when they are reserved.

use crate::generator::{GenerationContext, HistoryPlan};
use crate::render::{column_definition, quote_ident};
use crate::schema::{Field, ReservedColumns};
use std::fmt::{self, Write};

pub struct DdlGenerator;

impl DdlGenerator {
    /// Render the DDL block for one table into `out`
    pub fn render(ctx: &GenerationContext<'_>, out: &mut String) -> fmt::Result {
        let history = ctx.history_name();
        match &ctx.plan {
            HistoryPlan::Create { columns } => {
                Self::create_table(out, &history, &ctx.reserved, columns)
            }
            HistoryPlan::Sync(diff) => {
                // modify -> drop -> add
                Self::modify_columns(out, &history, &diff.modified)?;
                Self::drop_columns(out, &history, &diff.removed)?;
                Self::add_columns(out, &history, &diff.added)
            }
        }
    }

    /// `CREATE TABLE` for a history table that does not exist yet
    pub fn create_table(
        out: &mut String,
        history: &str,
        reserved: &ReservedColumns,
        columns: &[&Field],
    ) -> fmt::Result {
        let id = quote_ident(reserved.id());

        writeln!(out)?;
        writeln!(out, "CREATE TABLE {} (", history)?;
        writeln!(out, "  {} bigint(20) NOT NULL AUTO_INCREMENT,", id)?;
        writeln!(out, "  {} varchar(255) DEFAULT NULL,", quote_ident(reserved.kind()))?;
        writeln!(
            out,
            "  {} timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP,",
            quote_ident(reserved.date())
        )?;
        for column in columns {
            writeln!(out, "  {},", column_definition(column))?;
        }
        writeln!(out, "  PRIMARY KEY ({})", id)?;
        writeln!(out, ") ENGINE=InnoDB AUTO_INCREMENT=1 DEFAULT CHARSET=utf8mb4;")
    }

    pub fn modify_columns(out: &mut String, history: &str, fields: &[&Field]) -> fmt::Result {
        for field in fields {
            writeln!(
                out,
                "ALTER TABLE {} MODIFY COLUMN {};",
                history,
                column_definition(field)
            )?;
        }
        Ok(())
    }

    pub fn drop_columns(out: &mut String, history: &str, fields: &[&Field]) -> fmt::Result {
        for field in fields {
            writeln!(
                out,
                "ALTER TABLE {} DROP COLUMN {};",
                history,
                quote_ident(&field.name)
            )?;
        }
        Ok(())
    }

    pub fn add_columns(out: &mut String, history: &str, fields: &[&Field]) -> fmt::Result {
        for field in fields {
            writeln!(
                out,
                "ALTER TABLE {} ADD COLUMN {};",
                history,
                column_definition(field)
            )?;
        }
        Ok(())
    }
}

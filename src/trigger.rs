//! Audit trigger generator
//!
//! Each source table gets three row-level triggers that copy the affected
//! row into the history table. MySQL has no `CREATE OR REPLACE TRIGGER`, so
//! triggers of the same name that already exist are dropped first.

use crate::generator::GenerationContext;
use crate::render::{column_list, quote_ident};
use std::fmt::{self, Write};

/// DML event an audit trigger fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    /// Emission order of the generated triggers
    pub const ALL: [TriggerEvent; 3] = [
        TriggerEvent::Insert,
        TriggerEvent::Update,
        TriggerEvent::Delete,
    ];

    /// Tag written to the history row's type column
    pub fn tag(self) -> &'static str {
        match self {
            TriggerEvent::Insert => "insert",
            TriggerEvent::Update => "update",
            TriggerEvent::Delete => "delete",
        }
    }

    /// Deletes are captured before the row is gone
    pub fn timing(self) -> &'static str {
        match self {
            TriggerEvent::Insert | TriggerEvent::Update => "AFTER",
            TriggerEvent::Delete => "BEFORE",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }

    /// Row reference the values are read from
    pub fn row_ref(self) -> &'static str {
        match self {
            TriggerEvent::Insert | TriggerEvent::Update => "NEW.",
            TriggerEvent::Delete => "OLD.",
        }
    }

    pub fn trigger_name(self, table: &str) -> String {
        format!("{}_{}_tk", table, self.tag())
    }
}

pub struct TriggerGenerator;

impl TriggerGenerator {
    /// Names from `existing` that belong to this generator for `table`
    pub fn stale_triggers<'a>(table: &str, existing: &'a [String]) -> Vec<&'a str> {
        let ours: Vec<String> = TriggerEvent::ALL
            .iter()
            .map(|event| event.trigger_name(table))
            .collect();

        existing
            .iter()
            .filter(|name| ours.contains(*name))
            .map(String::as_str)
            .collect()
    }

    /// `DROP TRIGGER` for every existing trigger that is about to be recreated
    pub fn drop_triggers(out: &mut String, table: &str, existing: &[String]) -> fmt::Result {
        for name in Self::stale_triggers(table, existing) {
            writeln!(out, "DROP TRIGGER {};", name)?;
        }
        Ok(())
    }

    pub fn create_trigger(
        out: &mut String,
        ctx: &GenerationContext<'_>,
        event: TriggerEvent,
    ) -> fmt::Result {
        let table = &ctx.source.name;
        let fields = &ctx.source.fields;

        writeln!(out)?;
        writeln!(
            out,
            "CREATE TRIGGER {} {} {}",
            event.trigger_name(table),
            event.timing(),
            event.keyword()
        )?;
        writeln!(out, "ON {} FOR EACH ROW", table)?;
        writeln!(out, "BEGIN")?;

        let mut targets = quote_ident(ctx.reserved.kind());
        let mut values = format!("'{}'", event.tag());
        if !fields.is_empty() {
            targets = format!("{}, {}", targets, column_list("", fields));
            values = format!("{}, {}", values, column_list(event.row_ref(), fields));
        }
        writeln!(
            out,
            "    INSERT INTO {}({}) VALUES ({});",
            ctx.history_name(),
            targets,
            values
        )?;
        writeln!(out, "END;")
    }

    /// Drop statements followed by the three `CREATE TRIGGER` statements
    pub fn render(ctx: &GenerationContext<'_>, existing: &[String], out: &mut String) -> fmt::Result {
        Self::drop_triggers(out, &ctx.source.name, existing)?;
        for event in TriggerEvent::ALL {
            Self::create_trigger(out, ctx, event)?;
        }
        Ok(())
    }
}

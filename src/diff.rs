//! Schema Diff Engine
//!
//! Column-level comparison between a source table and its history table.
//! Either side may be absent. Results borrow from the tables they were
//! computed from and keep the field order of the first argument.

use crate::schema::{Field, ReservedColumns, Table};

/// Type of column change detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

/// Fields of `src` whose name does not appear in `reference`.
///
/// With no reference table every field of `src` counts as added.
pub fn added<'a>(src: Option<&'a Table>, reference: Option<&Table>) -> Vec<&'a Field> {
    let Some(src) = src else {
        return Vec::new();
    };
    match reference {
        None => src.fields.iter().collect(),
        Some(reference) => src
            .fields
            .iter()
            .filter(|f| !reference.has_field(&f.name))
            .collect(),
    }
}

/// Fields of `src` missing from `reference`; the mirror image of [`added`].
///
/// Reserved history columns are not special-cased here, see [`ColumnDiff`].
pub fn removed<'a>(src: Option<&'a Table>, reference: Option<&Table>) -> Vec<&'a Field> {
    added(src, reference)
}

/// Fields of `src` whose same-named field in `reference` has another type.
pub fn modified<'a>(src: Option<&'a Table>, reference: Option<&Table>) -> Vec<&'a Field> {
    let Some(src) = src else {
        return Vec::new();
    };
    match reference {
        None => src.fields.iter().collect(),
        Some(reference) => src
            .fields
            .iter()
            .filter(|f| {
                reference
                    .field(&f.name)
                    .is_some_and(|other| other.data_type != f.data_type)
            })
            .collect(),
    }
}

/// Changes needed to bring an existing history table in line with its source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDiff<'a> {
    /// Source columns whose type changed (rendered with the source type)
    pub modified: Vec<&'a Field>,
    /// History columns no longer in the source, reserved columns excluded
    pub removed: Vec<&'a Field>,
    /// Source columns the history table does not have yet
    pub added: Vec<&'a Field>,
}

impl<'a> ColumnDiff<'a> {
    /// Compare a source table with its existing history table
    pub fn between(source: &'a Table, history: &'a Table, reserved: &ReservedColumns) -> Self {
        let modified = modified(Some(source), Some(history));

        let removed = removed(Some(history), Some(source))
            .into_iter()
            .filter(|f| !reserved.is_reserved(&f.name))
            .collect();

        let added = added(Some(source), Some(history));

        Self {
            modified,
            removed,
            added,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.removed.is_empty() && self.added.is_empty()
    }

    /// All changes in emission order: modify, then remove, then add
    pub fn changes(&self) -> impl Iterator<Item = (ChangeType, &'a Field)> + '_ {
        let modified = self.modified.iter().map(|f| (ChangeType::Modified, *f));
        let removed = self.removed.iter().map(|f| (ChangeType::Removed, *f));
        let added = self.added.iter().map(|f| (ChangeType::Added, *f));
        modified.chain(removed).chain(added)
    }
}

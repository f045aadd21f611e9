//! Schema Model
//!
//! Plain value types describing a live table as reported by the catalog.
//! A table that does not exist is represented as `None` wherever an
//! `Option<Table>` appears; a `Table` value always describes a real table.

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Key classification (`PRI`, `UNI`, `MUL` or empty). Informational only.
    pub key: String,
    /// Declared column type, e.g. `varchar(50)`. Compared byte for byte.
    pub data_type: String,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: String::new(),
            data_type: data_type.into(),
        }
    }

    /// Builder-style setter for the key classification
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// Table representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    /// Columns in catalog (ordinal) order, unique by name
    pub fields: Vec<Field>,
}

impl Table {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a column by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        contains(&self.fields, name)
    }
}

/// Returns true if `fields` holds a column called `name`
pub fn contains(fields: &[Field], name: &str) -> bool {
    fields.iter().any(|f| f.name == name)
}

/// Name of the history table paired with `table`
pub fn history_table_name(table: &str, suffix: &str) -> String {
    format!("{}_{}", table, suffix)
}

/// The three bookkeeping columns every history table carries.
///
/// These are never proposed for removal, whatever the source table looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedColumns {
    id: String,
    kind: String,
    date: String,
}

impl ReservedColumns {
    pub fn new(suffix: &str) -> Self {
        Self {
            id: format!("{}_id", suffix),
            kind: format!("{}_type", suffix),
            date: format!("{}_date", suffix),
        }
    }

    /// Auto-increment primary key of the history row
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Event tag column (`insert`, `update`, `delete`)
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Capture timestamp column
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn names(&self) -> [&str; 3] {
        [&self.id, &self.kind, &self.date]
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    /// Reserved columns that are not present in `table`
    pub fn missing_from<'a>(&'a self, table: &Table) -> Vec<&'a str> {
        self.names()
            .into_iter()
            .filter(|name| !table.has_field(name))
            .collect()
    }
}

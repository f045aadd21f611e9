//! Rendering helpers shared by the DDL and trigger generators

use crate::schema::Field;

/// Quote a MySQL identifier with backticks
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Comma-separated quoted column names, each preceded by `prefix`.
///
/// `prefix` is `""` for an INSERT target list and `NEW.` / `OLD.` for row values.
pub fn column_list(prefix: &str, fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| format!("{}{}", prefix, quote_ident(&f.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One `` `name` type`` column definition
pub fn column_definition(field: &Field) -> String {
    format!("{} {}", quote_ident(&field.name), field.data_type)
}

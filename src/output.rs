//! Output sink for the generated SQL

use crate::error::AppResult;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Open the destination: the given file (created or truncated) or stdout
pub fn open(path: Option<&Path>) -> AppResult<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            debug!("Writing SQL to {}", path.display());
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

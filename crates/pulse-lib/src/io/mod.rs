pub mod table;
pub mod text;

use anyhow::Result;
use std::path::Path;

/// Load samples from `path`: a named column of a CSV/TSV file when `column` is given,
/// otherwise newline-delimited values.
pub fn load_samples(path: &Path, column: Option<&str>) -> Result<Vec<f64>> {
    match column {
        Some(col) => {
            let delimiter = match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
                _ => b',',
            };
            table::read_column(path, col, delimiter)
        }
        None => text::read_f64_series(path),
    }
}

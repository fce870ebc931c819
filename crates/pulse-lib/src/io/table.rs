use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::{fs::File, path::Path};

/// Read one numeric column from a delimited file with a header row.
pub fn read_column(path: &Path, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_column_from(file, column, delimiter)
        .with_context(|| format!("reading column {} from {}", column, path.display()))
}

pub fn read_column_from<R: std::io::Read>(
    reader: R,
    column: &str,
    delimiter: u8,
) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let idx = locate_column(&headers, column)?;

    let mut out = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let raw = record
            .get(idx)
            .ok_or_else(|| anyhow!("row {} has no {} field", row + 1, column))?;
        let value = raw
            .parse::<f64>()
            .with_context(|| format!("row {} is not f64: {}", row + 1, raw))?;
        out.push(value);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow!("missing column {}", requested))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_column_case_insensitively() {
        let text = "time,PPG\n0.00, 510\n0.01, 512.5\n0.02, 509\n";
        let samples = read_column_from(text.as_bytes(), "ppg", b',').unwrap();
        assert_eq!(samples, vec![510.0, 512.5, 509.0]);
    }

    #[test]
    fn reads_tab_separated() {
        let text = "ppg\tresp\n1.5\t0.1\n2.5\t0.2\n";
        let samples = read_column_from(text.as_bytes(), "ppg", b'\t').unwrap();
        assert_eq!(samples, vec![1.5, 2.5]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = read_column_from("a,b\n1,2\n".as_bytes(), "ppg", b',').unwrap_err();
        assert!(err.to_string().contains("missing column ppg"));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.csv");
        std::fs::write(&path, "hr\n1\n2\n3\n").unwrap();
        assert_eq!(read_column(&path, "hr", b',').unwrap(), vec![1.0, 2.0, 3.0]);
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Columnar table of raw string cells. The last column is the label/target;
/// every other column is a numeric feature.
///
/// Format accepted by [`Dataset::parse_csv`]:
/// - comma-separated, newline-delimited UTF-8
/// - cells are trimmed; blank lines are skipped
/// - double-quoted fields may contain commas and `""` escapes
/// - every row must have the same number of cells
///
/// Deserialization goes through [`Dataset::from_columns`]; the stored counts
/// are recomputed from `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDataset")]
pub struct Dataset {
    rows_count: usize,
    columns_count: usize,
    columns: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawDataset {
    columns: Vec<Vec<String>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = Error;

    fn try_from(raw: RawDataset) -> Result<Dataset> {
        Dataset::from_columns(raw.columns)
    }
}

impl Dataset {
    pub fn parse_csv(text: &str) -> Result<Dataset> {
        let mut rows = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            rows.push(parse_csv_row(line));
        }
        Dataset::from_rows(rows)
    }

    /// Builds the table from row-major cells.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Result<Dataset>
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<Vec<String>> = Vec::new();

        for (row_idx, row) in rows.into_iter().enumerate() {
            let cells: Vec<String> = row.into_iter().map(|c| c.into().trim().to_owned()).collect();
            if row_idx == 0 {
                columns = vec![Vec::new(); cells.len()];
            } else if cells.len() != columns.len() {
                return Err(Error::InvalidData(format!(
                    "row {}: expected {} columns, got {}",
                    row_idx + 1,
                    columns.len(),
                    cells.len()
                )));
            }
            for (column, cell) in columns.iter_mut().zip(cells) {
                column.push(cell);
            }
        }

        Dataset::from_columns(columns)
    }

    /// Builds the table from column-major cells.
    pub fn from_columns(columns: Vec<Vec<String>>) -> Result<Dataset> {
        if columns.len() < 2 {
            return Err(Error::InvalidData(format!(
                "expected at least 2 columns (features + label), got {}",
                columns.len()
            )));
        }
        let rows_count = columns[0].len();
        if rows_count == 0 {
            return Err(Error::InvalidData("dataset contains no rows".into()));
        }
        if let Some((idx, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != rows_count) {
            return Err(Error::InvalidData(format!(
                "column {} has {} rows, expected {}",
                idx,
                col.len(),
                rows_count
            )));
        }

        Ok(Dataset { rows_count, columns_count: columns.len(), columns })
    }

    pub fn rows_count(&self) -> usize {
        self.rows_count
    }

    pub fn columns_count(&self) -> usize {
        self.columns_count
    }

    /// Number of feature columns (all but the label column).
    pub fn feature_count(&self) -> usize {
        self.columns_count - 1
    }

    pub fn column(&self, index: usize) -> Option<&[String]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    pub fn label_column(&self) -> &[String] {
        &self.columns[self.columns_count - 1]
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&str> {
        self.columns.get(column)?.get(row).map(String::as_str)
    }

    pub fn label(&self, row: usize) -> Option<&str> {
        self.cell(self.columns_count - 1, row)
    }

    /// Raw feature cells of `row`.
    pub fn row(&self, row: usize) -> Option<Vec<&str>> {
        if row >= self.rows_count {
            return None;
        }
        Some(self.columns[..self.columns_count - 1].iter().map(|c| c[row].as_str()).collect())
    }

    /// Feature cells of `row` parsed as numbers.
    pub fn features(&self, row: usize) -> Result<Vec<f64>> {
        let cells = self.row(row).ok_or_else(|| {
            Error::InvalidData(format!("row {} out of range ({} rows)", row, self.rows_count))
        })?;
        parse_numbers(&cells, row)
    }
}

/// Parses raw cells as `f64`, reporting the first offending cell.
pub(crate) fn parse_numbers<S: AsRef<str>>(cells: &[S], row: usize) -> Result<Vec<f64>> {
    cells.iter().map(|c| parse_number(c.as_ref(), row)).collect()
}

fn parse_number(cell: &str, row: usize) -> Result<f64> {
    cell.trim().parse::<f64>().map_err(|_| {
        Error::InvalidData(format!("row {}: '{}' is not a valid number", row + 1, cell))
    })
}

/// Splits a single CSV line, honouring double-quoted fields.
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_builds_columns() {
        let ds = Dataset::parse_csv("1.0, 2.0, a\n3.0,4.0,b\n\n5,6, a\n").unwrap();
        assert_eq!(ds.rows_count(), 3);
        assert_eq!(ds.columns_count(), 3);
        assert_eq!(ds.feature_count(), 2);
        assert_eq!(ds.column(0).unwrap(), &["1.0", "3.0", "5"]);
        assert_eq!(ds.label_column(), &["a", "b", "a"]);
        assert_eq!(ds.features(1).unwrap(), vec![3.0, 4.0]);
        assert_eq!(ds.label(2), Some("a"));
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let ds = Dataset::parse_csv("1,\"red, dark\"\n2,\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(ds.label(0), Some("red, dark"));
        assert_eq!(ds.label(1), Some("say \"hi\""));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Dataset::parse_csv("1,2,0\n3,1\n").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn single_column_or_empty_is_rejected() {
        assert!(Dataset::parse_csv("1\n2\n").is_err());
        assert!(Dataset::parse_csv("\n\n").is_err());
    }

    #[test]
    fn non_numeric_feature_reports_row() {
        let ds = Dataset::parse_csv("1,0\nx,1\n").unwrap();
        match ds.features(1) {
            Err(Error::InvalidData(msg)) => assert!(msg.contains("row 2")),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn deserialized_counts_come_from_columns() {
        let json = r#"{"rowsCount":3,"columnsCount":2,"columns":[["1"],["0"]]}"#;
        let ds: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(ds.rows_count(), 1);
        assert_eq!(ds.columns_count(), 2);
        assert_eq!(ds.row(2), None);
        assert_eq!(ds.row(0), Some(vec!["1"]));
    }

    #[test]
    fn deserialization_rejects_malformed_tables() {
        assert!(serde_json::from_str::<Dataset>(r#"{"columns":[["1","2"],["0"]]}"#).is_err());
        assert!(serde_json::from_str::<Dataset>(r#"{"columns":[["1"]]}"#).is_err());
        assert!(serde_json::from_str::<Dataset>(r#"{"columns":[[],[]]}"#).is_err());
    }

    #[test]
    fn serialized_dataset_reads_back() {
        let ds = Dataset::parse_csv("1,2,a\n3,4,b\n").unwrap();
        let json = serde_json::to_string(&ds).unwrap();
        assert_eq!(serde_json::from_str::<Dataset>(&json).unwrap(), ds);
    }
}

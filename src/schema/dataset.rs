//! Dataset container and CSV ingestion.
//!
//! A [`Dataset`] holds the sample rows the search fits against: a matrix
//! of input values, one target vector, and the column labels used to
//! render formulas and prediction files.

use std::path::Path;

/// Errors raised while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no sample rows")]
    Empty,
    #[error("column index {index} out of range for {columns} columns")]
    ColumnOutOfRange { index: usize, columns: usize },
    #[error("row {row}, column {column}: not a number: {value:?}")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },
}

/// In-memory dataset: input matrix plus target vector.
#[derive(Debug, Clone)]
pub struct Dataset {
    input_labels: Vec<String>,
    target_label: String,
    inputs: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl Dataset {
    /// Build a dataset directly from memory.
    pub fn new(
        input_labels: Vec<String>,
        target_label: String,
        inputs: Vec<Vec<f64>>,
        targets: Vec<f64>,
    ) -> Self {
        Self {
            input_labels,
            target_label,
            inputs,
            targets,
        }
    }

    /// Load from a CSV file with a header row.
    ///
    /// `target_column` selects the target; `input_columns` defaults to
    /// every other column, in file order.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        target_column: usize,
        input_columns: Option<&[usize]>,
    ) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let columns = headers.len();
        if target_column >= columns {
            return Err(DatasetError::ColumnOutOfRange {
                index: target_column,
                columns,
            });
        }

        let selected: Vec<usize> = match input_columns {
            Some(indices) => {
                for &index in indices {
                    if index >= columns {
                        return Err(DatasetError::ColumnOutOfRange { index, columns });
                    }
                }
                indices.to_vec()
            }
            None => (0..columns).filter(|&c| c != target_column).collect(),
        };

        let input_labels: Vec<String> = selected.iter().map(|&c| headers[c].clone()).collect();
        let target_label = headers[target_column].clone();

        let mut inputs = Vec::new();
        let mut targets = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let parse = |column: usize| -> Result<f64, DatasetError> {
                let raw = record.get(column).unwrap_or("");
                raw.parse().map_err(|_| DatasetError::BadNumber {
                    // 1-based, counting the header row
                    row: line + 2,
                    column: headers[column].clone(),
                    value: raw.to_string(),
                })
            };

            inputs.push(
                selected
                    .iter()
                    .map(|&c| parse(c))
                    .collect::<Result<Vec<_>, _>>()?,
            );
            targets.push(parse(target_column)?);
        }

        if targets.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            input_labels,
            target_label,
            inputs,
            targets,
        })
    }

    /// Labels of the input columns, in input order.
    pub fn input_labels(&self) -> &[String] {
        &self.input_labels
    }

    /// Label of the target column.
    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    /// Input rows, one `Vec<f64>` per sample.
    pub fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    /// Target values, one per sample.
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Number of sample rows.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when the dataset holds no rows.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

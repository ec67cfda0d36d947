//! CSV loading and saving for [`DenseDesignMatrix`].
//!
//! Every record is one example. An optional label column is split off into
//! the dataset's targets.

use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::DenseDesignMatrix;
use crate::preprocessing::error::PreprocessingError;

/// Options for reading a CSV file into a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Skip the first record.
    pub has_header: bool,
    pub delimiter: u8,
    /// Column holding the target value, removed from the features.
    pub label_column: Option<usize>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            delimiter: b',',
            label_column: None,
        }
    }
}

impl CsvOptions {
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_label_column(mut self, column: usize) -> Self {
        self.label_column = Some(column);
        self
    }
}

impl DenseDesignMatrix {
    /// Read a design matrix from a CSV file.
    ///
    /// The result has no view converter; attach one with
    /// [`DenseDesignMatrix::with_view_converter`] to get topological access.
    ///
    /// # Errors
    /// - [`PreprocessingError::Csv`] for unreadable files or ragged records
    /// - [`PreprocessingError::Serialization`] when a field is not a number
    /// - [`PreprocessingError::EmptyData`] when the file holds no records
    pub fn from_csv<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Self, PreprocessingError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(options.has_header)
            .delimiter(options.delimiter)
            .from_path(path.as_ref())?;

        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut n_cols = None;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let mut values = record
                .iter()
                .enumerate()
                .map(|(col, field)| {
                    field.trim().parse::<f64>().map_err(|e| {
                        PreprocessingError::Serialization(format!(
                            "row {}, column {}: cannot parse '{}': {}",
                            row, col, field, e
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(label_col) = options.label_column {
                if label_col >= values.len() {
                    return Err(PreprocessingError::InvalidParameter(format!(
                        "label column {} out of range for {} columns",
                        label_col,
                        values.len()
                    )));
                }
                labels.push(values.remove(label_col));
            }

            match n_cols {
                None => n_cols = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(PreprocessingError::shape_mismatch(
                        format!("{} columns", n),
                        format!("{} columns on row {}", values.len(), row),
                    ))
                }
                Some(_) => {}
            }
            features.extend(values);
        }

        let n_cols = n_cols.ok_or_else(|| {
            PreprocessingError::EmptyData(format!("{} has no records", path.as_ref().display()))
        })?;
        let n_rows = features.len() / n_cols.max(1);
        let x = Array2::from_shape_vec((n_rows, n_cols), features)
            .map_err(|e| PreprocessingError::shape_mismatch((n_rows, n_cols), e.to_string()))?;

        let dataset = DenseDesignMatrix::new(x);
        if options.label_column.is_some() {
            let y = Array2::from_shape_vec((n_rows, 1), labels)
                .map_err(|e| PreprocessingError::shape_mismatch((n_rows, 1), e.to_string()))?;
            dataset.with_targets(y)
        } else {
            Ok(dataset)
        }
    }

    /// Write the design matrix as headerless CSV, one example per record.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), PreprocessingError> {
        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path.as_ref())?;
        for row in self.design_matrix().rows() {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_from_csv_plain() {
        let file = write_file("1,2,3\n4,5,6\n");
        let dataset = DenseDesignMatrix::from_csv(file.path(), &CsvOptions::default()).unwrap();
        assert_eq!(dataset.design_matrix().dim(), (2, 3));
        assert_eq!(dataset.design_matrix()[[1, 2]], 6.0);
        assert!(dataset.targets().is_none());
    }

    #[test]
    fn test_from_csv_header_and_label() {
        let file = write_file("a,label,b\n1.5,0,2.5\n3.5,1,4.5\n");
        let options = CsvOptions::default().with_header(true).with_label_column(1);
        let dataset = DenseDesignMatrix::from_csv(file.path(), &options).unwrap();

        assert_eq!(dataset.design_matrix().dim(), (2, 2));
        assert_eq!(dataset.design_matrix()[[1, 1]], 4.5);
        assert_eq!(dataset.targets().unwrap()[[1, 0]], 1.0);
    }

    #[test]
    fn test_from_csv_bad_number() {
        let file = write_file("1,x\n");
        let result = DenseDesignMatrix::from_csv(file.path(), &CsvOptions::default());
        assert!(matches!(result, Err(PreprocessingError::Serialization(_))));
    }

    #[test]
    fn test_from_csv_empty() {
        let file = write_file("");
        let result = DenseDesignMatrix::from_csv(file.path(), &CsvOptions::default());
        assert!(matches!(result, Err(PreprocessingError::EmptyData(_))));
    }

    #[test]
    fn test_csv_round_trip() {
        let dataset = DenseDesignMatrix::new(ndarray::array![[0.25, -1.0], [3.0, 1e-3]]);
        let file = tempfile::NamedTempFile::new().unwrap();
        dataset.to_csv(file.path()).unwrap();

        let loaded = DenseDesignMatrix::from_csv(file.path(), &CsvOptions::default()).unwrap();
        assert_eq!(loaded.design_matrix(), dataset.design_matrix());
    }
}

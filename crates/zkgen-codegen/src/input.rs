//! JSON input files for generated circuits.
//!
//! halo2-scaffold reads circuit inputs from `data/<name>.in`. The JSON shape
//! mirrors the generated `CircuitInput` struct: one array per column.

use serde::{Deserialize, Serialize};
use zkgen_core::{CircuitConfig, Error, Result};

/// Column-major database contents for one proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitInput {
    /// One vector of row values per column.
    pub db: Vec<Vec<u64>>,
}

impl CircuitInput {
    /// An input with `rows` zero rows in every column.
    pub fn zeroed(config: &CircuitConfig, rows: usize) -> Self {
        Self {
            db: vec![vec![0; rows]; config.num_cols()],
        }
    }

    /// Parse an input file's JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Pretty-printed JSON, as written to `data/<name>.in`.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Number of rows; zero when there are no columns.
    pub fn num_rows(&self) -> usize {
        self.db.first().map_or(0, Vec::len)
    }

    /// Check the input fits the circuit generated for `config`.
    pub fn validate(&self, config: &CircuitConfig) -> Result<()> {
        if self.db.len() != config.num_cols() {
            return Err(Error::InvalidInput(format!(
                "expected {} columns, got {}",
                config.num_cols(),
                self.db.len()
            )));
        }

        let rows = self.num_rows();
        let max = config.max_value();
        for (index, column) in self.db.iter().enumerate() {
            let name = config
                .column_name(index)
                .unwrap_or_else(|| format!("c{}", index));
            if column.len() != rows {
                return Err(Error::InvalidInput(format!(
                    "column {} has {} rows, expected {}",
                    name,
                    column.len(),
                    rows
                )));
            }
            if let Some(row) = column.iter().position(|&v| v > max) {
                return Err(Error::InvalidInput(format!(
                    "column {} row {} holds {}, above the maximum {}",
                    name, row, column[row], max
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_shape() {
        let config = CircuitConfig::new(3);
        let input = CircuitInput::zeroed(&config, 4);

        assert_eq!(input.db.len(), 3);
        assert_eq!(input.num_rows(), 4);
        assert!(input.validate(&config).is_ok());
    }

    #[test]
    fn test_json_shape() {
        let input = CircuitInput {
            db: vec![vec![1, 2], vec![3, 4]],
        };
        let json = input.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value, serde_json::json!({ "db": [[1, 2], [3, 4]] }));
        assert_eq!(CircuitInput::from_json(&json).unwrap(), input);
    }

    #[test]
    fn test_from_json_rejects_negative() {
        let err = CircuitInput::from_json(r#"{"db": [[-1]]}"#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_validate_errors() {
        let config = CircuitConfig::new(2).with_column_names(["price", "qty"]);

        let wrong_cols = CircuitInput { db: vec![vec![1]] };
        assert!(matches!(
            wrong_cols.validate(&config),
            Err(Error::InvalidInput(_))
        ));

        let ragged = CircuitInput {
            db: vec![vec![1, 2], vec![3]],
        };
        let err = ragged.validate(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid circuit input: column qty has 1 rows, expected 2"
        );

        let too_big = CircuitInput {
            db: vec![vec![1, 2], vec![3, 1024]],
        };
        let err = too_big.validate(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid circuit input: column qty row 1 holds 1024, above the maximum 1023"
        );
    }

    #[test]
    fn test_empty_database() {
        let config = CircuitConfig::new(0);
        let input = CircuitInput::zeroed(&config, 5);
        assert_eq!(input.num_rows(), 0);
        assert!(input.validate(&config).is_ok());
    }
}

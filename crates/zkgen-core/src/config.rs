//! Circuit configuration.
//!
//! A [`CircuitConfig`] fixes the shape of the database a generated circuit
//! accepts: how many columns it has, what they are called, and how many bits
//! each value occupies. It is built once, validated at the boundary, and read
//! by the planner and the code generators afterwards.

use std::path::Path;

use serde::Deserialize;

use crate::query::lexer::is_keyword;
use crate::{Error, Result};

/// Default circuit function name.
pub const DEFAULT_NAME: &str = "select_query";
/// Default table name queries select from.
pub const DEFAULT_TABLE: &str = "db";
/// Default bit bound for values and constants.
pub const DEFAULT_VALUE_BITS: usize = 10;
/// Largest accepted bit bound. Values are `u64` and comparisons need one spare bit.
pub const MAX_VALUE_BITS: usize = 63;

/// Shape of the columnar database a circuit is generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitConfig {
    num_cols: usize,
    name: String,
    table: String,
    column_names: Vec<String>,
    value_bits: usize,
    hash_database: bool,
}

impl CircuitConfig {
    /// Create a config with `num_cols` columns and default settings.
    pub fn new(num_cols: usize) -> Self {
        Self {
            num_cols,
            name: DEFAULT_NAME.to_string(),
            table: DEFAULT_TABLE.to_string(),
            column_names: Vec::new(),
            value_bits: DEFAULT_VALUE_BITS,
            hash_database: true,
        }
    }

    /// Create a config from a signed column count, rejecting negative values.
    pub fn try_new(num_cols: i64) -> Result<Self> {
        if num_cols < 0 {
            return Err(Error::InvalidConfiguration(format!(
                "num_cols must be non-negative, got {}",
                num_cols
            )));
        }
        let num_cols = usize::try_from(num_cols).map_err(|_| {
            Error::InvalidConfiguration(format!("num_cols {} does not fit in usize", num_cols))
        })?;
        Ok(Self::new(num_cols))
    }

    /// Set the circuit function name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Set the table name queries must select from
    pub fn with_table<S: Into<String>>(mut self, table: S) -> Self {
        self.table = table.into();
        self
    }

    /// Name the columns in order
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the bit bound for values and comparison constants
    pub fn with_value_bits(mut self, bits: usize) -> Self {
        self.value_bits = bits;
        self
    }

    /// Commit to the database with a public Poseidon hash (on by default)
    pub fn with_database_hash(mut self, enabled: bool) -> Self {
        self.hash_database = enabled;
        self
    }

    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Circuit function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Bit bound for values.
    pub fn value_bits(&self) -> usize {
        self.value_bits
    }

    /// Whether generated circuits publish a Poseidon hash of every column.
    pub fn hashes_database(&self) -> bool {
        self.hash_database
    }

    /// Largest value a column or constant may hold.
    pub fn max_value(&self) -> u64 {
        (1u64 << self.value_bits.min(MAX_VALUE_BITS)) - 1
    }

    /// Name of column `index`, or `None` when out of range.
    pub fn column_name(&self, index: usize) -> Option<String> {
        if index >= self.num_cols {
            return None;
        }
        match self.column_names.get(index) {
            Some(name) => Some(name.clone()),
            None => Some(format!("c{}", index)),
        }
    }

    /// All column names in order, defaulting to `c0 .. c{n-1}`.
    pub fn column_names(&self) -> Vec<String> {
        (0..self.num_cols).filter_map(|i| self.column_name(i)).collect()
    }

    /// Resolve a column name to its index.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        if self.column_names.is_empty() {
            let index: usize = name.strip_prefix('c')?.parse().ok()?;
            // reject forms like "c01" so every column has exactly one name
            if index < self.num_cols && format!("c{}", index) == name {
                return Some(index);
            }
            return None;
        }
        self.column_names.iter().position(|n| n == name)
    }

    /// Check every field; called by loaders and by the generator facade.
    pub fn validate(&self) -> Result<()> {
        check_identifier("name", &self.name)?;
        check_identifier("table", &self.table)?;

        if !self.column_names.is_empty() {
            if self.column_names.len() != self.num_cols {
                return Err(Error::InvalidConfiguration(format!(
                    "expected {} column names, got {}",
                    self.num_cols,
                    self.column_names.len()
                )));
            }
            for (i, name) in self.column_names.iter().enumerate() {
                check_identifier("column name", name)?;
                if is_keyword(name) {
                    return Err(Error::InvalidConfiguration(format!(
                        "column name '{}' is a reserved query keyword",
                        name
                    )));
                }
                if self.column_names[..i].contains(name) {
                    return Err(Error::InvalidConfiguration(format!(
                        "duplicate column name '{}'",
                        name
                    )));
                }
            }
        }

        if self.value_bits == 0 || self.value_bits > MAX_VALUE_BITS {
            return Err(Error::InvalidConfiguration(format!(
                "value_bits must be between 1 and {}, got {}",
                MAX_VALUE_BITS, self.value_bits
            )));
        }

        Ok(())
    }

    /// Parse and validate a TOML config.
    ///
    /// ```toml
    /// num_cols = 2
    /// name = "select_indices"
    /// columns = ["price", "qty"]
    /// value_bits = 10
    /// hash_database = true
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut config = Self::try_new(file.num_cols)?.with_column_names(file.columns);
        if let Some(name) = file.name {
            config = config.with_name(name);
        }
        if let Some(table) = file.table {
            config = config.with_table(table);
        }
        if let Some(bits) = file.value_bits {
            config = config.with_value_bits(bits);
        }
        if let Some(enabled) = file.hash_database {
            config = config.with_database_hash(enabled);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl TryFrom<i64> for CircuitConfig {
    type Error = Error;

    fn try_from(num_cols: i64) -> Result<Self> {
        Self::try_new(num_cols)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    num_cols: i64,
    name: Option<String>,
    table: Option<String>,
    #[serde(default)]
    columns: Vec<String>,
    value_bits: Option<usize>,
    hash_database: Option<bool>,
}

fn check_identifier(what: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid && value != "_" {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "{} '{}' is not a valid identifier",
            what, value
        )))
    }
}

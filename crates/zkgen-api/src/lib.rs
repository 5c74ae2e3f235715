//! # zkgen
//!
//! Generate halo2 zero-knowledge circuits from SELECT queries over a
//! columnar database of `u64` values.
//!
//! ## Quick Start
//!
//! ```rust
//! use zkgen::{CircuitConfig, Generator};
//!
//! let generator = Generator::new(CircuitConfig::new(2).with_name("select_indices"))?;
//!
//! // The NUM_COLS constant and CircuitInput declaration
//! let fragment = generator.input_struct();
//! assert_eq!(fragment[0], "const NUM_COLS: usize = 2;");
//!
//! // A complete halo2-scaffold circuit
//! let circuit = generator.render("SELECT * FROM db WHERE c0 < 25 AND c1 = 3")?;
//! assert!(circuit.text().contains("fn select_indices<F: ScalarField>("));
//! # Ok::<(), zkgen::Error>(())
//! ```
//!
//! ## Query language
//!
//! `SELECT * | col, ... FROM table [WHERE condition]` where conditions
//! combine `=`, `!=`, `<`, `<=`, `>`, `>=` and `BETWEEN` comparisons of
//! columns and unsigned integers with `AND`, `OR` and `NOT`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::fs;
use std::path::Path;

use tracing::{debug, info};

// Re-export core types
pub use zkgen_core::query::{
    parse_query, CircuitPlan, LexerError, ParseError, PlanError, Planner, Query,
};
pub use zkgen_core::{CircuitConfig, Error, Result};

// Code generation
pub use zkgen_codegen::{generate_circuit, render_circuit, CircuitInput};

pub mod logging;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generated circuit source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCircuit {
    /// Circuit function name, also the conventional file stem
    pub name: String,
    /// Source lines without trailing newlines
    pub lines: Vec<String>,
}

impl GeneratedCircuit {
    /// The source as one string, ending in a newline.
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Circuit generator bound to a validated configuration.
///
/// # Examples
///
/// ```rust
/// use zkgen::{CircuitConfig, Generator};
///
/// let generator = Generator::new(CircuitConfig::new(3))?;
/// let plan = generator.prepare("SELECT c2 FROM db WHERE c0 BETWEEN 1 AND 5")?;
/// assert_eq!(plan.projection, vec![2]);
/// # Ok::<(), zkgen::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Generator {
    config: CircuitConfig,
}

impl Generator {
    /// Validate `config` and create a generator for it.
    pub fn new(config: CircuitConfig) -> Result<Self> {
        config.validate()?;
        info!(
            name = config.name(),
            num_cols = config.num_cols(),
            value_bits = config.value_bits(),
            "circuit generator ready"
        );
        Ok(Self { config })
    }

    /// Load a TOML config file and create a generator for it.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading circuit config");
        Self::new(CircuitConfig::load(path)?)
    }

    /// The configuration this generator was built with.
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// The `NUM_COLS` constant and `CircuitInput` declaration lines.
    pub fn input_struct(&self) -> Vec<String> {
        generate_circuit(&self.config)
    }

    /// Parse and plan a query without rendering it.
    pub fn prepare(&self, sql: &str) -> Result<CircuitPlan> {
        let query = parse_query(sql)?;
        let plan = Planner::new(&self.config).plan(&query)?;
        Ok(plan)
    }

    /// Render the circuit for `sql`.
    pub fn render(&self, sql: &str) -> Result<GeneratedCircuit> {
        let plan = self.prepare(sql)?;
        let lines = render_circuit(&self.config, &plan);
        info!(
            name = self.config.name(),
            lines = lines.len(),
            "rendered circuit"
        );
        Ok(GeneratedCircuit {
            name: self.config.name().to_string(),
            lines,
        })
    }

    /// Render the circuit for `sql` and write it to `path`, creating parent
    /// directories as needed.
    pub fn write<P: AsRef<Path>>(&self, sql: &str, path: P) -> Result<GeneratedCircuit> {
        let circuit = self.render(sql)?;
        write_file(path.as_ref(), &circuit.text())?;
        Ok(circuit)
    }

    /// A zero-filled input with `rows` rows.
    pub fn sample_input(&self, rows: usize) -> CircuitInput {
        CircuitInput::zeroed(&self.config, rows)
    }

    /// Write a zero-filled JSON input file with `rows` rows to `path`.
    pub fn write_sample_input<P: AsRef<Path>>(&self, rows: usize, path: P) -> Result<()> {
        let json = self.sample_input(rows).to_json_pretty()?;
        write_file(path.as_ref(), &json)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

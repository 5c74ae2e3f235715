//! Input-struct fragment.

use zkgen_core::CircuitConfig;

/// Lines after the `NUM_COLS` declaration; independent of the configuration.
pub const FIXED_LINES: [&str; 4] = [
    "#[derive(Clone, Debug, Serialize, Deserialize)]",
    "pub struct CircuitInput {",
    "\tpub db: [Vec<u64>; NUM_COLS],",
    "{}",
];

/// Generate the `NUM_COLS` constant and `CircuitInput` declaration lines.
///
/// Always five lines; only the first depends on `config`.
///
/// ```
/// use zkgen_codegen::generate_circuit;
/// use zkgen_core::CircuitConfig;
///
/// let lines = generate_circuit(&CircuitConfig::new(4));
/// assert_eq!(lines[0], "const NUM_COLS: usize = 4;");
/// assert_eq!(lines.len(), 5);
/// ```
pub fn generate_circuit(config: &CircuitConfig) -> Vec<String> {
    let mut lines = Vec::with_capacity(1 + FIXED_LINES.len());
    lines.push(format!("const NUM_COLS: usize = {};", config.num_cols()));
    lines.extend(FIXED_LINES.iter().map(|line| line.to_string()));
    lines
}

//! # zkgen codegen
//!
//! Source generation for halo2 circuits: the `CircuitInput` fragment, full
//! circuit files rendered from a query plan, and JSON input files.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod circuit;
pub mod fragment;
pub mod input;
pub mod writer;

pub use circuit::render_circuit;
pub use fragment::generate_circuit;
pub use input::CircuitInput;
pub use writer::CodeWriter;

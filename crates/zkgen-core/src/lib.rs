//! # zkgen core
//!
//! Configuration, error types and the query front end for zkgen.
//!
//! ```
//! use zkgen_core::query::{parse_query, Planner};
//! use zkgen_core::CircuitConfig;
//!
//! let config = CircuitConfig::new(2);
//! let query = parse_query("SELECT * FROM db WHERE c0 < 25 AND c1 = 3")?;
//! let plan = Planner::new(&config).plan(&query)?;
//! assert_eq!(plan.projection, vec![0, 1]);
//! # Ok::<(), zkgen_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod query;

pub use config::CircuitConfig;
pub use error::{Error, Result};

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use heck::ToSnakeCase;
use tracing::debug;

use zkgen::logging::LogConfig;
use zkgen::{parse_query, CircuitConfig, Error, Generator, Result};

#[derive(Parser)]
#[command(
    name = "zkgen",
    version,
    about = "Generate halo2 circuits from SELECT queries over columnar data."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the NUM_COLS constant and CircuitInput declaration
    Fragment {
        /// Number of database columns
        #[arg(short, long, allow_negative_numbers = true)]
        num_cols: i64,
    },
    /// Parse a query and print it in normalized form
    Parse {
        /// Query text, e.g. "SELECT * FROM db WHERE c0 < 25"
        query: String,
    },
    /// Print the circuit plan for a query
    Plan {
        #[command(flatten)]
        target: TargetArgs,

        /// Query text
        query: String,
    },
    /// Generate a complete halo2-scaffold circuit
    Circuit {
        #[command(flatten)]
        target: TargetArgs,

        /// Query text
        query: String,

        /// Write the circuit here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a zero-filled JSON input file here
        #[arg(long)]
        input: Option<PathBuf>,

        /// Rows in the generated input file
        #[arg(long, default_value_t = 4, requires = "input")]
        rows: usize,
    },
}

/// Where the circuit configuration comes from; flags override the file.
#[derive(Args)]
struct TargetArgs {
    /// TOML circuit config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of database columns
    #[arg(short, long, allow_negative_numbers = true)]
    num_cols: Option<i64>,

    /// Circuit function name
    #[arg(long)]
    name: Option<String>,

    /// Comma-separated column names
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Bit bound for values and constants
    #[arg(long)]
    value_bits: Option<usize>,

    /// Skip the public Poseidon hash of the database
    #[arg(long)]
    no_hash: bool,
}

impl TargetArgs {
    fn generator(&self) -> Result<Generator> {
        let mut config = match (&self.config, self.num_cols) {
            (Some(path), None) => CircuitConfig::load(path)?,
            (None, Some(num_cols)) => CircuitConfig::try_new(num_cols)?,
            (Some(_), Some(_)) => {
                return Err(Error::InvalidConfiguration(
                    "--config and --num-cols are mutually exclusive".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::InvalidConfiguration(
                    "either --config or --num-cols is required".to_string(),
                ))
            }
        };

        if let Some(ref name) = self.name {
            config = config.with_name(name.to_snake_case());
        }
        if !self.columns.is_empty() {
            config = config.with_column_names(self.columns.iter().map(|c| c.trim()));
        }
        if let Some(bits) = self.value_bits {
            config = config.with_value_bits(bits);
        }
        if self.no_hash {
            config = config.with_database_hash(false);
        }

        Generator::new(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_level(&cli.log_level);
    if let Some(ref path) = cli.log_file {
        log_config = log_config.with_both(path);
    }
    let _guard = match log_config.init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Fragment { num_cols } => {
            let config = CircuitConfig::try_new(num_cols)?;
            for line in Generator::new(config)?.input_struct() {
                println!("{}", line);
            }
        }
        Command::Parse { query } => {
            println!("{}", parse_query(&query)?);
        }
        Command::Plan { target, query } => {
            let plan = target.generator()?.prepare(&query)?;
            println!("{}", plan);
        }
        Command::Circuit {
            target,
            query,
            output,
            input,
            rows,
        } => {
            let generator = target.generator()?;
            match output {
                Some(path) => {
                    let circuit = generator.write(&query, &path)?;
                    debug!(name = %circuit.name, path = %path.display(), "circuit written");
                }
                None => print!("{}", generator.render(&query)?.text()),
            }
            if let Some(path) = input {
                generator.write_sample_input(rows, &path)?;
            }
        }
    }
    Ok(())
}

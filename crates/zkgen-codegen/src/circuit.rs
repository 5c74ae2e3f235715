//! halo2-scaffold circuit renderer.
//!
//! Turns a [`CircuitPlan`] into a complete source file for the
//! `halo2-scaffold` examples directory. Every plan register becomes one
//! `Vec<AssignedValue<F>>` holding a 0/1 indicator per database row:
//!
//! - `lt(a, b)` becomes `range.is_less_than(ctx, a, b, VALUE_BITS)`
//! - `eq(a, b)` becomes `gate.is_equal(ctx, a, b)`
//! - `and`, `or`, `not` map onto the matching gate calls
//!
//! The final selector is made public first, followed by each projected
//! column multiplied by the selector so unselected rows read as zero. When
//! the config asks for it, a Poseidon hash of every column comes last, tying
//! the proof to one database.

use zkgen_core::query::{CircuitPlan, Op, Operand};
use zkgen_core::CircuitConfig;

use crate::writer::CodeWriter;

/// Render a complete circuit source file, one entry per line.
pub fn render_circuit(config: &CircuitConfig, plan: &CircuitPlan) -> Vec<String> {
    let renderer = Renderer { config, plan };
    let mut w = CodeWriter::new();

    renderer.imports(&mut w);
    w.blank();
    renderer.declarations(&mut w);
    w.blank();
    renderer.circuit_fn(&mut w);
    w.blank();
    renderer.main_fn(&mut w);

    w.into_lines()
}

struct Renderer<'a> {
    config: &'a CircuitConfig,
    plan: &'a CircuitPlan,
}

impl Renderer<'_> {
    fn has_filter(&self) -> bool {
        !self.plan.instructions.is_empty()
    }

    fn needs_gate(&self) -> bool {
        self.has_filter() || self.config.hashes_database()
    }

    fn imports(&self, w: &mut CodeWriter) {
        w.line("// Generated by zkgen. Do not edit by hand.");
        w.line("use clap::Parser;");
        if self.needs_gate() {
            w.line("use halo2_base::gates::{GateChip, GateInstructions};");
        }
        if self.plan.uses_range_check() {
            w.line("use halo2_base::safe_types::{RangeChip, RangeInstructions};");
        }
        w.line("use halo2_base::utils::ScalarField;");
        w.line("use halo2_base::AssignedValue;");
        w.line("#[allow(unused_imports)]");
        w.block("use halo2_base::{", "};", |w| {
            w.line("Context,");
            w.line("QuantumCell::{Constant, Existing, Witness},");
        });
        w.line("use halo2_scaffold::scaffold::cmd::Cli;");
        w.line("use halo2_scaffold::scaffold::run;");
        if self.config.hashes_database() {
            w.line("use poseidon::PoseidonChip;");
        }
        w.line("use serde::{Deserialize, Serialize};");
        if self.plan.uses_range_check() {
            w.line("use std::env::var;");
        }
    }

    fn declarations(&self, w: &mut CodeWriter) {
        w.line(format!("// {}", self.plan.source));
        w.line(format!("// columns: {}", self.config.column_names().join(", ")));
        w.line(format!("const NUM_COLS: usize = {};", self.plan.num_cols));
        if self.config.hashes_database() {
            for (name, value) in POSEIDON_PARAMS {
                w.line(format!("const {}: usize = {};", name, value));
            }
        }
        w.blank();
        w.line("#[derive(Clone, Debug, Serialize, Deserialize)]");
        w.block("pub struct CircuitInput {", "}", |w| {
            w.line("pub db: [Vec<u64>; NUM_COLS],");
        });
    }

    fn circuit_fn(&self, w: &mut CodeWriter) {
        w.line(format!("fn {}<F: ScalarField>(", self.config.name()));
        w.indented(|w| {
            w.line("ctx: &mut Context<F>,");
            w.line("input: CircuitInput,");
            w.line("make_public: &mut Vec<AssignedValue<F>>,");
        });
        w.block(") {", "}", |w| {
            self.load_columns(w);
            if self.needs_gate() {
                w.blank();
                self.load_chips(w);
                self.load_constants(w);
            }
            if self.has_filter() {
                w.blank();
                self.instructions(w);
            }
            if self.config.hashes_database() {
                w.blank();
                self.commitment(w);
            }
            w.blank();
            self.outputs(w);
        });
    }

    fn load_columns(&self, w: &mut CodeWriter) {
        w.line("let db: Vec<Vec<AssignedValue<F>>> = input");
        w.indented(|w| {
            w.line(".db");
            w.line(".into_iter()");
            w.line(".map(|col| ctx.assign_witnesses(col.into_iter().map(F::from)))");
            w.line(".collect();");
        });
        w.line("let num_rows = db[0].len();");
        w.block("for col in &db {", "}", |w| {
            w.line("assert_eq!(col.len(), num_rows, \"columns must have equal length\");");
        });
    }

    fn load_chips(&self, w: &mut CodeWriter) {
        if self.plan.uses_range_check() {
            w.line("let lookup_bits =");
            w.line("    var(\"LOOKUP_BITS\").unwrap_or_else(|_| panic!(\"LOOKUP_BITS not set\")).parse().unwrap();");
            w.line("let range = RangeChip::default(lookup_bits);");
            w.line("let gate = range.gate();");
        } else {
            w.line("let gate = GateChip::<F>::default();");
        }
    }

    fn load_constants(&self, w: &mut CodeWriter) {
        for value in self.plan.constants() {
            w.line(format!(
                "let {} = ctx.load_constant(F::from({}));",
                constant_var(value),
                value
            ));
        }
    }

    fn instructions(&self, w: &mut CodeWriter) {
        for instruction in &self.plan.instructions {
            let call = match instruction.op {
                Op::LessThan(a, b) => format!(
                    "range.is_less_than(ctx, {}, {}, {})",
                    row_operand(a),
                    row_operand(b),
                    self.plan.value_bits
                ),
                Op::IsEqual(a, b) => {
                    format!("gate.is_equal(ctx, {}, {})", row_operand(a), row_operand(b))
                }
                Op::And(a, b) => format!("gate.and(ctx, {}[i], {}[i])", a, b),
                Op::Or(a, b) => format!("gate.or(ctx, {}[i], {}[i])", a, b),
                Op::Not(a) => format!("gate.not(ctx, {}[i])", a),
            };
            w.line(format!("// {}", self.describe(instruction.op)));
            w.line(format!(
                "let {}: Vec<AssignedValue<F>> = (0..num_rows).map(|i| {}).collect();",
                instruction.dst, call
            ));
        }
    }

    fn commitment(&self, w: &mut CodeWriter) {
        // range.gate() is already a reference
        let gate = if self.plan.uses_range_check() {
            "gate"
        } else {
            "&gate"
        };
        w.line("let mut poseidon = PoseidonChip::<F, T, RATE>::new(ctx, R_F, R_P).unwrap();");
        w.block("for col in &db {", "}", |w| {
            w.line("poseidon.update(col);");
        });
        w.line(format!("let hash = poseidon.squeeze(ctx, {}).unwrap();", gate));
    }

    fn outputs(&self, w: &mut CodeWriter) {
        match self.plan.selector {
            Some(selector) => {
                w.line(format!("make_public.extend(&{});", selector));
                for (n, &column) in self.plan.projection.iter().enumerate() {
                    w.line(format!(
                        "let out{}: Vec<AssignedValue<F>> = (0..num_rows).map(|i| gate.mul(ctx, db[{}][i], {}[i])).collect();",
                        n, column, selector
                    ));
                    w.line(format!("make_public.extend(&out{});", n));
                }
                self.publish_hash(w);
                w.blank();
                w.line(print_values("selected", &selector.to_string()));
                for (n, &column) in self.plan.projection.iter().enumerate() {
                    w.line(print_values(&self.column_label(column), &format!("out{}", n)));
                }
                self.print_hash(w);
            }
            None => {
                for &column in &self.plan.projection {
                    w.line(format!("make_public.extend(&db[{}]);", column));
                }
                self.publish_hash(w);
                w.blank();
                for &column in &self.plan.projection {
                    w.line(print_values(
                        &self.column_label(column),
                        &format!("db[{}]", column),
                    ));
                }
                self.print_hash(w);
            }
        }
    }

    fn publish_hash(&self, w: &mut CodeWriter) {
        if self.config.hashes_database() {
            w.line("make_public.push(hash);");
        }
    }

    fn print_hash(&self, w: &mut CodeWriter) {
        if self.config.hashes_database() {
            w.line("println!(\"hash: {:?}\", hash.value());");
        }
    }

    fn main_fn(&self, w: &mut CodeWriter) {
        w.block("fn main() {", "}", |w| {
            w.line("env_logger::init();");
            w.blank();
            w.line("let args = Cli::parse();");
            w.line(format!("run({}, args);", self.config.name()));
        });
    }

    fn column_label(&self, column: usize) -> String {
        self.config
            .column_name(column)
            .unwrap_or_else(|| format!("c{}", column))
    }

    fn operand_label(&self, operand: Operand) -> String {
        match operand {
            Operand::Column(column) => self.column_label(column),
            Operand::Constant(value) => value.to_string(),
        }
    }

    fn describe(&self, op: Op) -> String {
        match op {
            Op::LessThan(a, b) => {
                format!("{} < {}", self.operand_label(a), self.operand_label(b))
            }
            Op::IsEqual(a, b) => {
                format!("{} = {}", self.operand_label(a), self.operand_label(b))
            }
            Op::And(a, b) => format!("{} AND {}", a, b),
            Op::Or(a, b) => format!("{} OR {}", a, b),
            Op::Not(a) => format!("NOT {}", a),
        }
    }
}

/// Poseidon width, rate and full/partial round counts for a t = 3 sponge.
const POSEIDON_PARAMS: [(&str, usize); 4] = [("T", 3), ("RATE", 2), ("R_F", 8), ("R_P", 57)];

fn constant_var(value: u64) -> String {
    format!("k{}", value)
}

fn row_operand(operand: Operand) -> String {
    match operand {
        Operand::Column(column) => format!("db[{}][i]", column),
        Operand::Constant(value) => constant_var(value),
    }
}

fn print_values(label: &str, var: &str) -> String {
    format!(
        "println!(\"{}: {{:?}}\", {}.iter().map(|x| *x.value()).collect::<Vec<F>>());",
        label, var
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkgen_core::query::{parse_query, Planner};

    fn render(config: &CircuitConfig, sql: &str) -> Vec<String> {
        let query = parse_query(sql).unwrap();
        let plan = Planner::new(config).plan(&query).unwrap();
        render_circuit(config, &plan)
    }

    #[test]
    fn test_equality_filter_full_output() {
        let config = CircuitConfig::new(2).with_name("pick");
        let lines = render(&config, "SELECT c1 FROM db WHERE c0 = 3");

        let expected = r##"// Generated by zkgen. Do not edit by hand.
use clap::Parser;
use halo2_base::gates::{GateChip, GateInstructions};
use halo2_base::utils::ScalarField;
use halo2_base::AssignedValue;
#[allow(unused_imports)]
use halo2_base::{
    Context,
    QuantumCell::{Constant, Existing, Witness},
};
use halo2_scaffold::scaffold::cmd::Cli;
use halo2_scaffold::scaffold::run;
use poseidon::PoseidonChip;
use serde::{Deserialize, Serialize};

// SELECT c1 FROM db WHERE (c0 = 3)
// columns: c0, c1
const NUM_COLS: usize = 2;
const T: usize = 3;
const RATE: usize = 2;
const R_F: usize = 8;
const R_P: usize = 57;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CircuitInput {
    pub db: [Vec<u64>; NUM_COLS],
}

fn pick<F: ScalarField>(
    ctx: &mut Context<F>,
    input: CircuitInput,
    make_public: &mut Vec<AssignedValue<F>>,
) {
    let db: Vec<Vec<AssignedValue<F>>> = input
        .db
        .into_iter()
        .map(|col| ctx.assign_witnesses(col.into_iter().map(F::from)))
        .collect();
    let num_rows = db[0].len();
    for col in &db {
        assert_eq!(col.len(), num_rows, "columns must have equal length");
    }

    let gate = GateChip::<F>::default();
    let k3 = ctx.load_constant(F::from(3));

    // c0 = 3
    let ind0: Vec<AssignedValue<F>> = (0..num_rows).map(|i| gate.is_equal(ctx, db[0][i], k3)).collect();

    let mut poseidon = PoseidonChip::<F, T, RATE>::new(ctx, R_F, R_P).unwrap();
    for col in &db {
        poseidon.update(col);
    }
    let hash = poseidon.squeeze(ctx, &gate).unwrap();

    make_public.extend(&ind0);
    let out0: Vec<AssignedValue<F>> = (0..num_rows).map(|i| gate.mul(ctx, db[1][i], ind0[i])).collect();
    make_public.extend(&out0);
    make_public.push(hash);

    println!("selected: {:?}", ind0.iter().map(|x| *x.value()).collect::<Vec<F>>());
    println!("c1: {:?}", out0.iter().map(|x| *x.value()).collect::<Vec<F>>());
    println!("hash: {:?}", hash.value());
}

fn main() {
    env_logger::init();

    let args = Cli::parse();
    run(pick, args);
}"##;

        assert_eq!(lines.join("\n"), expected);
    }

    #[test]
    fn test_range_filter_uses_lookup_bits() {
        let config = CircuitConfig::new(2).with_name("select_indices");
        let lines = render(&config, "SELECT * FROM db WHERE c0 < 25 AND c1 = 3");

        assert!(lines.contains(&"use std::env::var;".to_string()));
        assert!(lines.contains(&"    let range = RangeChip::default(lookup_bits);".to_string()));
        assert!(lines.contains(&"    let gate = range.gate();".to_string()));
        assert!(lines.contains(&"    let k3 = ctx.load_constant(F::from(3));".to_string()));
        assert!(lines.contains(&"    let k25 = ctx.load_constant(F::from(25));".to_string()));
        assert!(lines.contains(
            &"    let ind0: Vec<AssignedValue<F>> = (0..num_rows).map(|i| range.is_less_than(ctx, db[0][i], k25, 10)).collect();"
                .to_string()
        ));
        assert!(lines.contains(
            &"    let ind2: Vec<AssignedValue<F>> = (0..num_rows).map(|i| gate.and(ctx, ind0[i], ind1[i])).collect();"
                .to_string()
        ));
        assert!(lines.contains(&"    make_public.extend(&ind2);".to_string()));
        assert!(lines.contains(&"    make_public.extend(&out1);".to_string()));
        assert!(lines.contains(&"    run(select_indices, args);".to_string()));
    }

    #[test]
    fn test_value_bits_reach_comparisons() {
        let config = CircuitConfig::new(1).with_value_bits(32);
        let lines = render(&config, "SELECT * FROM db WHERE c0 > 70000");

        assert!(lines.iter().any(|l| l.contains("range.is_less_than(ctx, k70000, db[0][i], 32)")));
    }

    #[test]
    fn test_no_filter_outputs_columns() {
        let config = CircuitConfig::new(3)
            .with_column_names(["a", "b", "c"])
            .with_database_hash(false);
        let lines = render(&config, "SELECT c, a FROM db");

        assert!(!lines.iter().any(|l| l.contains("GateChip") || l.contains("RangeChip")));
        assert!(!lines.iter().any(|l| l.contains("LOOKUP_BITS")));
        assert!(lines.contains(&"// columns: a, b, c".to_string()));
        assert!(lines.contains(&"    make_public.extend(&db[2]);".to_string()));
        assert!(lines.contains(&"    make_public.extend(&db[0]);".to_string()));
        assert!(!lines.iter().any(|l| l.contains("poseidon") || l.contains("hash")));
    }

    #[test]
    fn test_database_hash_without_filter() {
        let config = CircuitConfig::new(2);
        let lines = render(&config, "SELECT * FROM db");

        assert!(lines.contains(&"use halo2_base::gates::{GateChip, GateInstructions};".to_string()));
        assert!(lines.contains(&"use poseidon::PoseidonChip;".to_string()));
        assert!(lines.contains(&"const R_P: usize = 57;".to_string()));
        assert!(lines.contains(&"    let gate = GateChip::<F>::default();".to_string()));
        assert!(lines.contains(&"        poseidon.update(col);".to_string()));
        assert!(lines.contains(&"    let hash = poseidon.squeeze(ctx, &gate).unwrap();".to_string()));

        // the hash is the last public output
        let pushes: Vec<&String> = lines.iter().filter(|l| l.contains("make_public.")).collect();
        assert_eq!(pushes.last().unwrap().as_str(), "    make_public.push(hash);");
        assert_eq!(pushes.len(), 3);
    }

    #[test]
    fn test_database_hash_with_range_chip() {
        let config = CircuitConfig::new(1);
        let lines = render(&config, "SELECT * FROM db WHERE c0 < 9");

        assert!(lines.contains(&"    let hash = poseidon.squeeze(ctx, gate).unwrap();".to_string()));
        let hash_at = lines.iter().position(|l| l.contains("let hash")).unwrap();
        let ind_at = lines.iter().position(|l| l.contains("let ind0")).unwrap();
        assert!(ind_at < hash_at);
    }

    #[test]
    fn test_instruction_comments_use_column_names() {
        let config = CircuitConfig::new(2).with_column_names(["price", "qty"]);
        let lines = render(&config, "SELECT * FROM db WHERE NOT price = qty OR qty < 4");

        assert!(lines.contains(&"    // price = qty".to_string()));
        assert!(lines.contains(&"    // NOT ind0".to_string()));
        assert!(lines.contains(&"    // qty < 4".to_string()));
        assert!(lines.contains(&"    // ind1 OR ind2".to_string()));
    }

    #[test]
    fn test_braces_balance() {
        let config = CircuitConfig::new(4);
        let lines = render(
            &config,
            "SELECT c3, c1 FROM db WHERE c0 BETWEEN 1 AND 9 OR (c2 != c1 AND NOT c3 >= 2)",
        );
        let text = lines.join("\n");
        assert_eq!(text.matches('{').count(), text.matches('}').count());
        assert_eq!(text.matches('(').count(), text.matches(')').count());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let config = CircuitConfig::new(2);
        let sql = "SELECT * FROM db WHERE c0 < 5 OR c1 < 5";
        assert_eq!(render(&config, sql), render(&config, sql));
    }
}

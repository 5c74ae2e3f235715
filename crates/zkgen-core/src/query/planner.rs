/// Query planner
///
/// Lowers a parsed query into a straight-line list of row-indicator
/// instructions. Every register holds one 0/1 value per database row, so the
/// code generator can emit each instruction as a single map over rows.
use super::ast::*;
use crate::config::CircuitConfig;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// Most columns a generated circuit can hold: its `CircuitInput` stores them in
/// a `[Vec<u64>; NUM_COLS]` array, and serde derives only cover arrays of up
/// to 32 elements.
pub const MAX_COLUMNS: usize = 32;

/// A per-row indicator vector produced by one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(pub usize);

/// Input to a comparison: a database column or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Column(usize),
    Constant(u64),
}

/// Operation computed for every row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// left < right, both within the configured bit bound
    LessThan(Operand, Operand),
    /// left == right
    IsEqual(Operand, Operand),
    And(Register, Register),
    Or(Register, Register),
    Not(Register),
}

/// One step of the plan, writing `dst`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub dst: Register,
    pub op: Op,
}

/// Lowered query, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitPlan {
    pub num_cols: usize,
    pub value_bits: usize,
    pub instructions: Vec<Instruction>,
    /// Register holding the final WHERE indicator; `None` selects every row.
    pub selector: Option<Register>,
    /// Selected column indices, in SELECT order.
    pub projection: Vec<usize>,
    /// Normalized query text.
    pub source: String,
}

impl CircuitPlan {
    /// Distinct constants referenced by the plan, ascending.
    pub fn constants(&self) -> Vec<u64> {
        let mut constants = BTreeSet::new();
        for instruction in &self.instructions {
            if let Op::LessThan(a, b) | Op::IsEqual(a, b) = instruction.op {
                for operand in [a, b] {
                    if let Operand::Constant(value) = operand {
                        constants.insert(value);
                    }
                }
            }
        }
        constants.into_iter().collect()
    }

    /// Whether any instruction needs the range chip's lookup table.
    pub fn uses_range_check(&self) -> bool {
        self.instructions
            .iter()
            .any(|i| matches!(i.op, Op::LessThan(..)))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(index) => write!(f, "col[{}]", index),
            Operand::Constant(value) => write!(f, "{}", value),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ind{}", self.0)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::LessThan(a, b) => write!(f, "lt({}, {})", a, b),
            Op::IsEqual(a, b) => write!(f, "eq({}, {})", a, b),
            Op::And(a, b) => write!(f, "and({}, {})", a, b),
            Op::Or(a, b) => write!(f, "or({}, {})", a, b),
            Op::Not(a) => write!(f, "not({})", a),
        }
    }
}

impl fmt::Display for CircuitPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- {}", self.source)?;
        writeln!(f, "columns: {}, value bits: {}", self.num_cols, self.value_bits)?;
        for instruction in &self.instructions {
            writeln!(f, "{} = {}", instruction.dst, instruction.op)?;
        }
        match self.selector {
            Some(selector) => writeln!(f, "select rows where {}", selector)?,
            None => writeln!(f, "select all rows")?,
        }
        let projection: Vec<String> = self
            .projection
            .iter()
            .map(|i| format!("col[{}]", i))
            .collect();
        write!(f, "output {}", projection.join(", "))
    }
}

/// Query planner bound to one circuit configuration
pub struct Planner<'a> {
    config: &'a CircuitConfig,
}

impl<'a> Planner<'a> {
    /// Create a planner for `config`
    pub fn new(config: &'a CircuitConfig) -> Self {
        Self { config }
    }

    /// Plan a query
    pub fn plan(&self, query: &Query) -> Result<CircuitPlan, PlanError> {
        if self.config.num_cols() == 0 {
            return Err(PlanError::NoColumns);
        }
        if self.config.num_cols() > MAX_COLUMNS {
            return Err(PlanError::TooManyColumns {
                num_cols: self.config.num_cols(),
                max: MAX_COLUMNS,
            });
        }

        if query.from.table != self.config.table() {
            return Err(PlanError::UnknownTable {
                expected: self.config.table().to_string(),
                found: query.from.table.clone(),
            });
        }

        let projection = self.plan_projection(&query.select)?;

        let mut lowering = Lowering::new(self.config);
        let selector = match query.where_clause {
            Some(ref where_clause) => Some(lowering.lower(&where_clause.condition)?),
            None => None,
        };

        let (instructions, selector) = prune(lowering.instructions, selector);

        let plan = CircuitPlan {
            num_cols: self.config.num_cols(),
            value_bits: self.config.value_bits(),
            instructions,
            selector,
            projection,
            source: query.to_string(),
        };

        debug!(
            query = %plan.source,
            instructions = plan.instructions.len(),
            outputs = plan.projection.len(),
            "planned query"
        );

        Ok(plan)
    }

    fn plan_projection(&self, select: &SelectClause) -> Result<Vec<usize>, PlanError> {
        let mut projection = Vec::new();
        for column in &select.columns {
            match column {
                SelectColumn::Wildcard => projection.extend(0..self.config.num_cols()),
                SelectColumn::Column(name) => projection.push(self.resolve(name)?),
            }
        }
        Ok(projection)
    }

    fn resolve(&self, name: &str) -> Result<usize, PlanError> {
        self.config
            .column_index(name)
            .ok_or_else(|| PlanError::UnknownColumn(name.to_string()))
    }
}

/// Expression lowering state; register `n` is always `instructions[n]`.
struct Lowering<'a> {
    config: &'a CircuitConfig,
    instructions: Vec<Instruction>,
    memo: HashMap<Op, Register>,
}

impl<'a> Lowering<'a> {
    fn new(config: &'a CircuitConfig) -> Self {
        Self {
            config,
            instructions: Vec::new(),
            memo: HashMap::new(),
        }
    }

    fn lower(&mut self, expr: &Expression) -> Result<Register, PlanError> {
        match expr {
            Expression::Column(_) | Expression::Literal(_) => {
                Err(PlanError::NotABoolean(expr.to_string()))
            }
            Expression::BinaryOp { left, op, right } => {
                let (a, b) = self.operands(expr, left, right)?;
                Ok(self.compare(a, *op, b))
            }
            Expression::LogicalOp { left, op, right } => {
                let a = self.lower(left)?;
                let b = self.lower(right)?;
                Ok(match op {
                    LogicalOperator::And => self.emit(Op::And(a, b)),
                    LogicalOperator::Or => self.emit(Op::Or(a, b)),
                })
            }
            Expression::Not(inner) => {
                let a = self.lower(inner)?;
                Ok(self.negate(a))
            }
            Expression::Between {
                expr: value,
                min,
                max,
            } => {
                // both bounds are compared against the value, so each pair needs a column
                let (x, lo) = self.operands(expr, value, min)?;
                let (_, hi) = self.operands(expr, value, max)?;
                let above_min = self.compare(x, BinaryOperator::Ge, lo);
                let below_max = self.compare(x, BinaryOperator::Le, hi);
                Ok(self.emit(Op::And(above_min, below_max)))
            }
        }
    }

    fn operands(
        &self,
        whole: &Expression,
        left: &Expression,
        right: &Expression,
    ) -> Result<(Operand, Operand), PlanError> {
        let a = self.operand(left)?;
        let b = self.operand(right)?;
        if matches!((a, b), (Operand::Constant(_), Operand::Constant(_))) {
            return Err(PlanError::ConstantComparison(whole.to_string()));
        }
        Ok((a, b))
    }

    fn operand(&self, expr: &Expression) -> Result<Operand, PlanError> {
        match expr {
            Expression::Column(name) => self
                .config
                .column_index(name)
                .map(Operand::Column)
                .ok_or_else(|| PlanError::UnknownColumn(name.clone())),
            Expression::Literal(value) => {
                let max = self.config.max_value();
                if *value > max {
                    return Err(PlanError::ConstantOutOfRange { value: *value, max });
                }
                Ok(Operand::Constant(*value))
            }
            other => Err(PlanError::NotAValue(other.to_string())),
        }
    }

    fn compare(&mut self, a: Operand, op: BinaryOperator, b: Operand) -> Register {
        match op {
            BinaryOperator::Lt => self.emit(Op::LessThan(a, b)),
            BinaryOperator::Gt => self.emit(Op::LessThan(b, a)),
            BinaryOperator::Le => {
                let gt = self.emit(Op::LessThan(b, a));
                self.negate(gt)
            }
            BinaryOperator::Ge => {
                let lt = self.emit(Op::LessThan(a, b));
                self.negate(lt)
            }
            BinaryOperator::Eq => self.emit(Op::IsEqual(a, b)),
            BinaryOperator::Ne => {
                let eq = self.emit(Op::IsEqual(a, b));
                self.negate(eq)
            }
        }
    }

    fn negate(&mut self, register: Register) -> Register {
        if let Op::Not(inner) = self.instructions[register.0].op {
            return inner;
        }
        self.emit(Op::Not(register))
    }

    fn emit(&mut self, op: Op) -> Register {
        if let Some(&register) = self.memo.get(&op) {
            return register;
        }
        let dst = Register(self.instructions.len());
        self.instructions.push(Instruction { dst, op });
        self.memo.insert(op, dst);
        dst
    }
}

/// Drop instructions the selector does not depend on and renumber the rest.
fn prune(
    instructions: Vec<Instruction>,
    selector: Option<Register>,
) -> (Vec<Instruction>, Option<Register>) {
    let mut live = vec![false; instructions.len()];
    if let Some(selector) = selector {
        live[selector.0] = true;
    }
    // operands always point at earlier registers
    for instruction in instructions.iter().rev() {
        if !live[instruction.dst.0] {
            continue;
        }
        match instruction.op {
            Op::And(a, b) | Op::Or(a, b) => {
                live[a.0] = true;
                live[b.0] = true;
            }
            Op::Not(a) => live[a.0] = true,
            Op::LessThan(..) | Op::IsEqual(..) => {}
        }
    }

    let mut renumbered = HashMap::new();
    let mut kept = Vec::new();
    for instruction in instructions {
        if !live[instruction.dst.0] {
            continue;
        }
        let map = |r: Register| renumbered[&r];
        let op = match instruction.op {
            Op::And(a, b) => Op::And(map(a), map(b)),
            Op::Or(a, b) => Op::Or(map(a), map(b)),
            Op::Not(a) => Op::Not(map(a)),
            op => op,
        };
        let dst = Register(kept.len());
        renumbered.insert(instruction.dst, dst);
        kept.push(Instruction { dst, op });
    }

    (kept, selector.map(|s| renumbered[&s]))
}

/// Planning errors
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    NoColumns,
    TooManyColumns { num_cols: usize, max: usize },
    UnknownTable { expected: String, found: String },
    UnknownColumn(String),
    ConstantComparison(String),
    NotABoolean(String),
    NotAValue(String),
    ConstantOutOfRange { value: u64, max: u64 },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::NoColumns => write!(f, "Cannot plan a query over a database with no columns"),
            PlanError::TooManyColumns { num_cols, max } => write!(
                f,
                "Cannot generate a circuit for {} columns, at most {} are supported",
                num_cols, max
            ),
            PlanError::UnknownTable { expected, found } => {
                write!(f, "Unknown table '{}' (expected '{}')", found, expected)
            }
            PlanError::UnknownColumn(name) => write!(f, "Unknown column '{}'", name),
            PlanError::ConstantComparison(expr) => {
                write!(f, "Comparison {} does not reference a column", expr)
            }
            PlanError::NotABoolean(expr) => {
                write!(f, "Expression {} is a value, expected a condition", expr)
            }
            PlanError::NotAValue(expr) => {
                write!(f, "Expression {} is a condition, expected a column or integer", expr)
            }
            PlanError::ConstantOutOfRange { value, max } => {
                write!(f, "Constant {} exceeds the maximum value {}", value, max)
            }
        }
    }
}

impl std::error::Error for PlanError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;

    fn plan(config: &CircuitConfig, sql: &str) -> Result<CircuitPlan, PlanError> {
        Planner::new(config).plan(&parse_query(sql).unwrap())
    }

    #[test]
    fn test_select_all_without_where() {
        let config = CircuitConfig::new(3);
        let plan = plan(&config, "SELECT * FROM db").unwrap();

        assert!(plan.instructions.is_empty());
        assert_eq!(plan.selector, None);
        assert_eq!(plan.projection, vec![0, 1, 2]);
        assert!(!plan.uses_range_check());
    }

    #[test]
    fn test_lt_and_eq() {
        let config = CircuitConfig::new(2);
        let plan = plan(&config, "SELECT * FROM db WHERE c0 < 25 AND c1 = 3").unwrap();

        assert_eq!(
            plan.instructions,
            vec![
                Instruction {
                    dst: Register(0),
                    op: Op::LessThan(Operand::Column(0), Operand::Constant(25)),
                },
                Instruction {
                    dst: Register(1),
                    op: Op::IsEqual(Operand::Column(1), Operand::Constant(3)),
                },
                Instruction {
                    dst: Register(2),
                    op: Op::And(Register(0), Register(1)),
                },
            ]
        );
        assert_eq!(plan.selector, Some(Register(2)));
        assert_eq!(plan.constants(), vec![3, 25]);
        assert!(plan.uses_range_check());
    }

    #[test]
    fn test_comparison_lowering() {
        let config = CircuitConfig::new(1);

        let gt = plan(&config, "SELECT * FROM db WHERE c0 > 7").unwrap();
        assert_eq!(
            gt.instructions[0].op,
            Op::LessThan(Operand::Constant(7), Operand::Column(0))
        );

        let le = plan(&config, "SELECT * FROM db WHERE c0 <= 7").unwrap();
        assert_eq!(
            le.instructions[0].op,
            Op::LessThan(Operand::Constant(7), Operand::Column(0))
        );
        assert_eq!(le.instructions[1].op, Op::Not(Register(0)));

        let ne = plan(&config, "SELECT * FROM db WHERE c0 != 7").unwrap();
        assert_eq!(
            ne.instructions[0].op,
            Op::IsEqual(Operand::Column(0), Operand::Constant(7))
        );
        assert_eq!(ne.selector, Some(Register(1)));
    }

    #[test]
    fn test_double_negation_folds() {
        let config = CircuitConfig::new(1);
        let plan = plan(&config, "SELECT * FROM db WHERE NOT c0 >= 4").unwrap();

        assert_eq!(
            plan.instructions,
            vec![Instruction {
                dst: Register(0),
                op: Op::LessThan(Operand::Column(0), Operand::Constant(4)),
            }]
        );
        assert_eq!(plan.selector, Some(Register(0)));
    }

    #[test]
    fn test_common_subexpressions_reused() {
        let config = CircuitConfig::new(2);
        let plan = plan(
            &config,
            "SELECT * FROM db WHERE (c0 < 5 AND c1 = 1) OR (c0 < 5 AND c1 = 2)",
        )
        .unwrap();

        let less_thans = plan
            .instructions
            .iter()
            .filter(|i| matches!(i.op, Op::LessThan(..)))
            .count();
        assert_eq!(less_thans, 1);
    }

    #[test]
    fn test_between() {
        let config = CircuitConfig::new(1);
        let plan = plan(&config, "SELECT * FROM db WHERE c0 BETWEEN 2 AND 9").unwrap();

        assert_eq!(
            plan.instructions,
            vec![
                Instruction {
                    dst: Register(0),
                    op: Op::LessThan(Operand::Column(0), Operand::Constant(2)),
                },
                Instruction {
                    dst: Register(1),
                    op: Op::Not(Register(0)),
                },
                Instruction {
                    dst: Register(2),
                    op: Op::LessThan(Operand::Constant(9), Operand::Column(0)),
                },
                Instruction {
                    dst: Register(3),
                    op: Op::Not(Register(2)),
                },
                Instruction {
                    dst: Register(4),
                    op: Op::And(Register(1), Register(3)),
                },
            ]
        );
    }

    #[test]
    fn test_between_bounds_need_a_column() {
        let config = CircuitConfig::new(1);

        assert!(matches!(
            plan(&config, "SELECT * FROM db WHERE 5 BETWEEN c0 AND 3"),
            Err(PlanError::ConstantComparison(_))
        ));
        assert!(matches!(
            plan(&config, "SELECT * FROM db WHERE 5 BETWEEN 3 AND c0"),
            Err(PlanError::ConstantComparison(_))
        ));

        let plan = plan(&config, "SELECT * FROM db WHERE 5 BETWEEN c0 AND c0").unwrap();
        assert!(plan.constants().contains(&5));
        assert!(plan.instructions.iter().all(|i| !matches!(
            i.op,
            Op::LessThan(Operand::Constant(_), Operand::Constant(_))
        )));
    }

    #[test]
    fn test_column_limit() {
        let sql = "SELECT c0 FROM db WHERE c31 < 3";
        assert!(plan(&CircuitConfig::new(MAX_COLUMNS), sql).is_ok());
        assert_eq!(
            plan(&CircuitConfig::new(MAX_COLUMNS + 1), sql),
            Err(PlanError::TooManyColumns {
                num_cols: 33,
                max: 32
            })
        );
    }

    #[test]
    fn test_named_columns_and_projection_order() {
        let config = CircuitConfig::new(2).with_column_names(["price", "qty"]);
        let plan = plan(&config, "SELECT qty, price FROM db WHERE price < qty").unwrap();

        assert_eq!(plan.projection, vec![1, 0]);
        assert_eq!(
            plan.instructions[0].op,
            Op::LessThan(Operand::Column(0), Operand::Column(1))
        );
        assert!(plan.constants().is_empty());
    }

    #[test]
    fn test_errors() {
        let config = CircuitConfig::new(2);

        assert_eq!(
            plan(&config, "SELECT * FROM users"),
            Err(PlanError::UnknownTable {
                expected: "db".to_string(),
                found: "users".to_string()
            })
        );
        assert_eq!(
            plan(&config, "SELECT c5 FROM db"),
            Err(PlanError::UnknownColumn("c5".to_string()))
        );
        assert_eq!(
            plan(&config, "SELECT * FROM db WHERE c0 = c9"),
            Err(PlanError::UnknownColumn("c9".to_string()))
        );
        assert!(matches!(
            plan(&config, "SELECT * FROM db WHERE 1 = 1"),
            Err(PlanError::ConstantComparison(_))
        ));
        assert!(matches!(
            plan(&config, "SELECT * FROM db WHERE c0"),
            Err(PlanError::NotABoolean(_))
        ));
        assert!(matches!(
            plan(&config, "SELECT * FROM db WHERE (c0 < 1) = 1"),
            Err(PlanError::NotAValue(_))
        ));
        assert_eq!(
            plan(&config, "SELECT * FROM db WHERE c0 < 1024"),
            Err(PlanError::ConstantOutOfRange {
                value: 1024,
                max: 1023
            })
        );
        assert_eq!(
            plan(&CircuitConfig::new(0), "SELECT * FROM db"),
            Err(PlanError::NoColumns)
        );
    }

    #[test]
    fn test_plan_display() {
        let config = CircuitConfig::new(2);
        let plan = plan(&config, "SELECT c1 FROM db WHERE c0 < 25").unwrap();

        assert_eq!(
            plan.to_string(),
            "-- SELECT c1 FROM db WHERE (c0 < 25)\n\
             columns: 2, value bits: 10\n\
             ind0 = lt(col[0], 25)\n\
             select rows where ind0\n\
             output col[1]"
        );
    }
}

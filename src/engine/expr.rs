//! Expression trees for candidate formulas.
//!
//! A candidate solution is a small tree of arithmetic operations over the
//! dataset's input variables and numeric constants. Trees are cheap to
//! clone and carry a cached infix rendering so consumers never re-walk
//! the tree to display a formula.

use serde::{Deserialize, Serialize};

use super::Fitness;

/// Operators available to the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Sin,
    Cos,
    Sqrt,
    Abs,
}

impl Op {
    /// Number of child expressions the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => 2,
            Op::Sin | Op::Cos | Op::Sqrt | Op::Abs => 1,
        }
    }

    /// Infix symbol for binary operators.
    fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Pow => "^",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Sqrt => "sqrt",
            Op::Abs => "abs",
        }
    }
}

/// An expression tree node.
///
/// Variables index into the dataset's input-column order; the labels
/// themselves are only needed for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric constant.
    Const(f64),
    /// Input variable by column position.
    Var(usize),
    /// Operator applied to `arity()` child expressions.
    Call(Op, Vec<Expr>),
}

impl Expr {
    /// Evaluate the formula on one row of input values.
    ///
    /// Degenerate arithmetic (division by zero, sqrt of a negative) is
    /// allowed to produce NaN/infinity; the aggregator screens those out
    /// of the statistics.
    pub fn eval(&self, inputs: &[f64]) -> f64 {
        match self {
            Expr::Const(v) => *v,
            Expr::Var(i) => inputs.get(*i).copied().unwrap_or(f64::NAN),
            Expr::Call(op, args) => match op {
                Op::Add => args[0].eval(inputs) + args[1].eval(inputs),
                Op::Sub => args[0].eval(inputs) - args[1].eval(inputs),
                Op::Mul => args[0].eval(inputs) * args[1].eval(inputs),
                Op::Div => args[0].eval(inputs) / args[1].eval(inputs),
                Op::Pow => args[0].eval(inputs).powf(args[1].eval(inputs)),
                Op::Sin => args[0].eval(inputs).sin(),
                Op::Cos => args[0].eval(inputs).cos(),
                Op::Sqrt => args[0].eval(inputs).sqrt(),
                Op::Abs => args[0].eval(inputs).abs(),
            },
        }
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::Var(_) => 1,
            Expr::Call(_, args) => 1 + args.iter().map(Expr::node_count).sum::<usize>(),
        }
    }

    /// Render as an infix formula, e.g. `((x + 2) * sin(y))`.
    pub fn render(&self, labels: &[String]) -> String {
        match self {
            Expr::Const(v) => format!("{}", v),
            Expr::Var(i) => labels
                .get(*i)
                .cloned()
                .unwrap_or_else(|| format!("x{}", i)),
            Expr::Call(op, args) => {
                if op.arity() == 2 {
                    format!(
                        "({} {} {})",
                        args[0].render(labels),
                        op.symbol(),
                        args[1].render(labels)
                    )
                } else {
                    format!("{}({})", op.symbol(), args[0].render(labels))
                }
            }
        }
    }
}

/// One evaluated candidate: the expression tree, its cached rendering,
/// and the fitness assigned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionCandidate {
    /// The formula as a tree.
    pub expr: Expr,
    /// Infix rendering, cached at construction.
    pub rendering: String,
    /// Scalar or vector fitness.
    pub fitness: Fitness,
}

impl SolutionCandidate {
    /// Build a candidate, caching its rendering against `labels`.
    pub fn new(expr: Expr, labels: &[String], fitness: Fitness) -> Self {
        let rendering = expr.render(labels);
        Self {
            expr,
            rendering,
            fitness,
        }
    }

    /// Evaluate the candidate formula on one row of input values.
    pub fn evaluate(&self, inputs: &[f64]) -> f64 {
        self.expr.eval(inputs)
    }

    /// Number of nodes in the expression tree.
    pub fn node_count(&self) -> usize {
        self.expr.node_count()
    }
}

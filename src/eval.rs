// SPDX: CC0-1.0

use crate::{
    expr::{Expr, Fun, Var},
    Number, Point,
};
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operation {
    Push(Number),
    Load(Var),
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Call(Fun),
}

impl Operation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::Load(_) => "load",
            Self::Neg => "neg",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Pow => "pow",
            Self::Call(fun) => fun.name(),
        }
    }

    pub const fn arity(&self) -> usize {
        match self {
            Self::Push(_) | Self::Load(_) => 0,
            Self::Neg | Self::Call(_) => 1,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Pow => 2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(val) => write!(f, "push {val}"),
            Self::Load(var) => write!(f, "load {}", var.name()),
            op => write!(f, "call '{}'", op.name()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum EvalErrTyp {
    Empty,
    MissingArgs { arity: usize, found: usize },
    StackMismatch { expected: usize, found: usize },
    NonFiniteInput { point: Point<Number> },
    DivByZero,
    Domain { arg: Number },
    PowDomain { base: Number, exp: Number },
    Overflow,
}

#[derive(Debug, PartialEq)]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub op: Option<Operation>, // if none, associated with end-of-program checking
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.op.as_ref().map_or("?", Operation::name);
        match &self.typ {
            EvalErrTyp::Empty => write!(f, "cannot evaluate empty program"),

            EvalErrTyp::MissingArgs { arity, found } => write!(
                f,
                "operation '{name}' requires {arity} argument{s}, but found {found}",
                s = if *arity == 1 { "" } else { "s" }
            ),

            EvalErrTyp::StackMismatch { expected, found } => write!(
                f,
                "expected {expected} value{s} on the stack but found {found}",
                s = if *expected == 1 { "" } else { "s" }
            ),

            EvalErrTyp::NonFiniteInput { point } => {
                write!(f, "cannot evaluate at non-finite point ({}, {})", point.x, point.y)
            }

            EvalErrTyp::DivByZero => write!(f, "division by zero"),

            EvalErrTyp::Domain { arg } => write!(f, "'{name}' is undefined at {arg}"),

            EvalErrTyp::PowDomain { base, exp } => {
                write!(f, "{base} raised to the power {exp} is not a real number")
            }

            EvalErrTyp::Overflow => write!(f, "result of '{name}' is too large"),
        }
    }
}

impl std::error::Error for EvalErr {}

/// An expression flattened to postfix so it can be evaluated many times
/// without walking the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
}

impl Program {
    #[inline]
    pub const fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    pub fn compile(expr: &Expr) -> Self {
        fn emit(expr: &Expr, ops: &mut Vec<Operation>) {
            let binary = |a: &Expr, b: &Expr, op: Operation, ops: &mut Vec<Operation>| {
                emit(a, ops);
                emit(b, ops);
                ops.push(op);
            };
            match expr {
                Expr::Num(val) => ops.push(Operation::Push(*val)),
                Expr::Const(c) => ops.push(Operation::Push(c.value())),
                Expr::Var(var) => ops.push(Operation::Load(*var)),
                Expr::Neg(a) => {
                    emit(a, ops);
                    ops.push(Operation::Neg);
                }
                Expr::Add(a, b) => binary(a, b, Operation::Add, ops),
                Expr::Sub(a, b) => binary(a, b, Operation::Sub, ops),
                Expr::Mul(a, b) => binary(a, b, Operation::Mul, ops),
                Expr::Div(a, b) => binary(a, b, Operation::Div, ops),
                Expr::Pow(a, b) => binary(a, b, Operation::Pow, ops),
                Expr::Call(fun, a) => {
                    emit(a, ops);
                    ops.push(Operation::Call(*fun));
                }
            }
        }

        let mut ops = Vec::new();
        emit(expr, &mut ops);
        Self::new(ops)
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }
}

fn check(op: Operation, val: Number, args: &[Number]) -> Result<Number, EvalErr> {
    if val.is_finite() {
        return Ok(val);
    }
    let typ = match (op, args) {
        (Operation::Div, [_, b]) if *b == 0.0 => EvalErrTyp::DivByZero,
        // 0^-n
        (Operation::Pow, [a, b]) if *a == 0.0 && *b < 0.0 => EvalErrTyp::DivByZero,
        (Operation::Pow, [a, b]) if val.is_nan() => EvalErrTyp::PowDomain { base: *a, exp: *b },
        // ln(0) is -inf
        (Operation::Call(Fun::Ln), [a]) => EvalErrTyp::Domain { arg: *a },
        (Operation::Call(_), [a]) if val.is_nan() => EvalErrTyp::Domain { arg: *a },
        _ if val.is_nan() => EvalErrTyp::Domain { arg: Number::NAN },
        _ => EvalErrTyp::Overflow,
    };
    Err(EvalErr { typ, op: Some(op) })
}

/// Run `prog` with `x` and `y` bound to the coordinates of `point`.
///
/// `stack` is scratch space, reused between calls to avoid reallocating when
/// sampling a grid.
pub fn eval(prog: &Program, point: Point<Number>, stack: &mut Vec<Number>) -> Result<Number, EvalErr> {
    fn expect_exactly_n(stack: &[Number], n: usize) -> Result<(), EvalErr> {
        let len = stack.len();
        if len == n {
            Ok(())
        } else {
            Err(EvalErr {
                typ: EvalErrTyp::StackMismatch {
                    expected: n,
                    found: len,
                },
                op: None,
            })
        }
    }

    if prog.ops.is_empty() {
        return Err(EvalErr {
            typ: EvalErrTyp::Empty,
            op: None,
        });
    }
    if !(point.x.is_finite() && point.y.is_finite()) {
        return Err(EvalErr {
            typ: EvalErrTyp::NonFiniteInput { point },
            op: None,
        });
    }

    stack.clear();

    for &op in prog.ops() {
        let arity = op.arity();
        if stack.len() < arity {
            return Err(EvalErr {
                typ: EvalErrTyp::MissingArgs {
                    arity,
                    found: stack.len(),
                },
                op: Some(op),
            });
        }
        // stack: ...a, b, c, d
        //                 ^^^^ args if arity is 2
        let args = &stack[stack.len() - arity..];
        let val = match (op, args) {
            (Operation::Push(val), []) => val,
            (Operation::Load(Var::X), []) => point.x,
            (Operation::Load(Var::Y), []) => point.y,
            (Operation::Neg, [a]) => -a,
            (Operation::Call(fun), [a]) => fun.apply(*a),
            (Operation::Add, [a, b]) => a + b,
            (Operation::Sub, [a, b]) => a - b,
            (Operation::Mul, [a, b]) => a * b,
            (Operation::Div, [a, b]) => a / b,
            (Operation::Pow, [a, b]) => a.powf(*b),
            _ => unreachable!("arity checked above"),
        };
        let val = check(op, val, args)?;
        stack.truncate(stack.len() - arity);
        stack.push(val);
    }

    expect_exactly_n(stack, 1)?;
    stack.pop().ok_or(EvalErr {
        typ: EvalErrTyp::Empty,
        op: None,
    })
}

/// Evaluate `expr` at a single point.
pub fn evaluate(expr: &Expr, point: Point<Number>) -> Result<Number, EvalErr> {
    eval(&Program::compile(expr), point, &mut Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    fn at(src: &str, x: Number, y: Number) -> Result<Number, EvalErr> {
        evaluate(&parse_str(src).unwrap(), Point { x, y })
    }

    #[test]
    fn origin_is_exactly_zero() {
        assert_eq!(at("x**2 + y**2", 0.0, 0.0), Ok(0.0));
    }

    #[test]
    fn precedence() {
        assert_eq!(at("1 + 2*3^2", 0.0, 0.0), Ok(19.0));
        assert_eq!(at("2^3^2", 0.0, 0.0), Ok(512.0));
        assert_eq!(at("-x**2", 3.0, 0.0), Ok(-9.0));
        assert_eq!(at("x - y - 1", 5.0, 2.0), Ok(2.0));
        assert_eq!(at("x / y / 2", 8.0, 2.0), Ok(2.0));
        assert_eq!(at("log(8, 2)", 0.0, 0.0).map(Number::round), Ok(3.0));
    }

    #[test]
    fn division_by_zero() {
        let err = at("1/x", 0.0, 1.0).unwrap_err();
        assert_eq!(err.typ, EvalErrTyp::DivByZero);
        assert_eq!(err.op, Some(Operation::Div));

        let err = at("x^-1", 0.0, 1.0).unwrap_err();
        assert_eq!(err.typ, EvalErrTyp::DivByZero);
    }

    #[test]
    fn domain_errors() {
        let err = at("ln(x)", -1.0, 0.0).unwrap_err();
        assert_eq!(err.typ, EvalErrTyp::Domain { arg: -1.0 });
        assert_eq!(err.to_string(), "'ln' is undefined at -1");

        assert!(at("ln(x)", 0.0, 0.0).is_err());
        assert!(at("sqrt(y)", 0.0, -4.0).is_err());
        assert!(at("asin(x)", 2.0, 0.0).is_err());

        let err = at("x^0.5", -1.0, 0.0).unwrap_err();
        assert_eq!(
            err.typ,
            EvalErrTyp::PowDomain {
                base: -1.0,
                exp: 0.5
            }
        );
    }

    #[test]
    fn overflow() {
        let err = at("exp(x)", 1000.0, 0.0).unwrap_err();
        assert_eq!(err.typ, EvalErrTyp::Overflow);
    }

    #[test]
    fn non_finite_point() {
        let err = at("x", Number::NAN, 0.0).unwrap_err();
        assert!(matches!(err.typ, EvalErrTyp::NonFiniteInput { .. }));
    }

    #[test]
    fn malformed_programs() {
        let mut stack = Vec::new();
        let origin = Point { x: 0.0, y: 0.0 };

        let err = eval(&Program::new(Vec::new()), origin, &mut stack).unwrap_err();
        assert_eq!(err.typ, EvalErrTyp::Empty);

        let prog = Program::new(vec![Operation::Push(1.0), Operation::Add]);
        let err = eval(&prog, origin, &mut stack).unwrap_err();
        assert_eq!(err.typ, EvalErrTyp::MissingArgs { arity: 2, found: 1 });

        let prog = Program::new(vec![Operation::Push(1.0), Operation::Push(2.0)]);
        let err = eval(&prog, origin, &mut stack).unwrap_err();
        assert_eq!(
            err.typ,
            EvalErrTyp::StackMismatch {
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn compiled_postfix() {
        let prog = Program::compile(&parse_str("sin(x) * -y").unwrap());
        let text: Vec<String> = prog.ops().map(ToString::to_string).collect();
        assert_eq!(text, ["load x", "call 'sin'", "load y", "call 'neg'", "call 'mul'"]);
    }
}

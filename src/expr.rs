// SPDX: CC0-1.0

use crate::Number;
use core::{f64::consts, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Var {
    X,
    Y,
}

impl Var {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Const {
    Pi,
    Tau,
    E,
}

impl Const {
    pub const fn value(&self) -> Number {
        match self {
            Self::Pi => consts::PI,
            Self::Tau => consts::TAU,
            Self::E => consts::E,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pi => "pi",
            Self::Tau => "tau",
            Self::E => "e",
        }
    }
}

/// Unary functions an expression may call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fun {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Fun {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
        }
    }

    pub fn apply(&self, x: Number) -> Number {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Sqrt => x.sqrt(),
            Self::Abs => x.abs(),
        }
    }
}

/// Symbolic expression in the two variables `x` and `y`.
///
/// The variant constructors build the tree exactly as written (the parser
/// uses them). The lowercase associated functions ([`Expr::add`],
/// [`Expr::mul`], ...) fold constants and drop identities, and are what
/// differentiation builds its results with.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(Number),
    Const(Const),
    Var(Var),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Fun, Box<Expr>),
}

impl Expr {
    pub const ZERO: Self = Self::Num(0.0);
    pub const ONE: Self = Self::Num(1.0);

    pub const fn as_num(&self) -> Option<Number> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_num(&self, val: Number) -> bool {
        self.as_num() == Some(val)
    }

    pub fn depends_on(&self, var: Var) -> bool {
        match self {
            Self::Num(_) | Self::Const(_) => false,
            Self::Var(v) => *v == var,
            Self::Neg(a) | Self::Call(_, a) => a.depends_on(var),
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::Div(a, b)
            | Self::Pow(a, b) => a.depends_on(var) || b.depends_on(var),
        }
    }

    // folding is skipped when it would produce a non-finite literal, so the
    // evaluator still gets to report the error
    fn fold(val: Number) -> Option<Self> {
        val.is_finite().then_some(Self::Num(val))
    }

    pub fn neg(a: Self) -> Self {
        match a {
            Self::Num(n) => Self::Num(-n),
            Self::Neg(inner) => *inner,
            a => Self::Neg(Box::new(a)),
        }
    }

    pub fn add(a: Self, b: Self) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if let Some(folded) = Self::fold(x + y) {
                return folded;
            }
        }
        if a.is_num(0.0) {
            b
        } else if b.is_num(0.0) {
            a
        } else {
            Self::Add(Box::new(a), Box::new(b))
        }
    }

    pub fn sub(a: Self, b: Self) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if let Some(folded) = Self::fold(x - y) {
                return folded;
            }
        }
        if b.is_num(0.0) {
            a
        } else if a.is_num(0.0) {
            Self::neg(b)
        } else {
            Self::Sub(Box::new(a), Box::new(b))
        }
    }

    pub fn mul(a: Self, b: Self) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if let Some(folded) = Self::fold(x * y) {
                return folded;
            }
        }
        if a.is_num(0.0) || b.is_num(0.0) {
            Self::ZERO
        } else if a.is_num(1.0) {
            b
        } else if b.is_num(1.0) {
            a
        } else if a.is_num(-1.0) {
            Self::neg(b)
        } else if b.is_num(-1.0) {
            Self::neg(a)
        } else {
            Self::Mul(Box::new(a), Box::new(b))
        }
    }

    pub fn div(a: Self, b: Self) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if y != 0.0 {
                if let Some(folded) = Self::fold(x / y) {
                    return folded;
                }
            }
        }
        if b.is_num(1.0) {
            a
        } else if a.is_num(0.0) && !b.is_num(0.0) {
            Self::ZERO
        } else {
            Self::Div(Box::new(a), Box::new(b))
        }
    }

    pub fn pow(base: Self, exp: Self) -> Self {
        if let (Some(x), Some(y)) = (base.as_num(), exp.as_num()) {
            if let Some(folded) = Self::fold(x.powf(y)) {
                return folded;
            }
        }
        if exp.is_num(0.0) {
            Self::ONE
        } else if exp.is_num(1.0) {
            base
        } else {
            Self::Pow(Box::new(base), Box::new(exp))
        }
    }

    pub fn call(fun: Fun, arg: Self) -> Self {
        Self::Call(fun, Box::new(arg))
    }

    /// Binding strength used when printing; higher binds tighter.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Self::Add(..) | Self::Sub(..) => 2,
            Self::Mul(..) | Self::Div(..) => 3,
            Self::Neg(_) => 4,
            Self::Num(n) if n.is_sign_negative() => 4,
            Self::Pow(..) => 5,
            Self::Num(_) | Self::Const(_) | Self::Var(_) | Self::Call(..) => 6,
        }
    }
}

struct Operand<'a> {
    expr: &'a Expr,
    parens: bool,
}

impl<'a> Operand<'a> {
    fn left(expr: &'a Expr, prec: u8) -> Self {
        Self {
            expr,
            parens: expr.precedence() < prec,
        }
    }

    // right operands of left associative operators need parens at equal
    // precedence too: a - (b - c), a / (b * c)
    fn right(expr: &'a Expr, prec: u8) -> Self {
        Self {
            expr,
            parens: expr.precedence() <= prec,
        }
    }
}

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parens {
            write!(f, "({})", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = self.precedence();
        let l = |e| Operand::left(e, prec);
        let r = |e| Operand::right(e, prec);

        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Const(c) => write!(f, "{}", c.name()),
            Self::Var(v) => write!(f, "{}", v.name()),
            Self::Neg(a) => write!(f, "-{}", l(a)),
            Self::Add(a, b) => write!(f, "{} + {}", l(a), l(b)),
            Self::Sub(a, b) => write!(f, "{} - {}", l(a), r(b)),
            Self::Mul(a, b) => write!(f, "{}*{}", l(a), l(b)),
            Self::Div(a, b) => write!(f, "{}/{}", l(a), r(b)),
            // right associative: a^b^c is a^(b^c)
            Self::Pow(a, b) => write!(f, "{}^{}", r(a), l(b)),
            Self::Call(fun, a) => write!(f, "{}({a})", fun.name()),
        }
    }
}

// SPDX: CC0-1.0

use crate::expr::{Const, Expr, Fun, Var};
use core::ops::RangeInclusive;
use std::collections::HashMap;

pub const X: &str = "x";
pub const Y: &str = "y";

/// A function name as seen by the parser: how many arguments it takes and
/// how to turn them into an expression.
#[derive(Debug)]
pub struct Builtin {
    pub arity: RangeInclusive<usize>,
    pub build: fn(Vec<Expr>) -> Expr,
}

impl Builtin {
    pub const fn new(arity: RangeInclusive<usize>, build: fn(Vec<Expr>) -> Expr) -> Self {
        Self { arity, build }
    }

    pub fn accepts(&self, args: usize) -> bool {
        self.arity.contains(&args)
    }
}

#[derive(Debug)]
pub enum Ident {
    Var(Var),
    Const(Const),
    Fun(Builtin),
}

impl Ident {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Var(_) => "variable",
            Self::Const(_) => "constant",
            Self::Fun(_) => "function",
        }
    }
}

pub type Idents = HashMap<&'static str, Ident>;

/// Every identifier an expression may mention. Anything else is rejected
/// by the parser.
pub fn standard_idents() -> Idents {
    let mut ret = HashMap::new();

    ret.insert(X, Ident::Var(Var::X));
    ret.insert(Y, Ident::Var(Var::Y));

    ret.insert("pi", Ident::Const(Const::Pi));
    ret.insert("tau", Ident::Const(Const::Tau));
    ret.insert("e", Ident::Const(Const::E));
    ret.insert("E", Ident::Const(Const::E));

    ret.insert("abs", unary(abs));
    ret.insert("sqrt", unary(sqrt));
    ret.insert("exp", unary(exp));
    ret.insert("ln", unary(ln));
    ret.insert("log", Ident::Fun(Builtin::new(1..=2, log)));

    // trig
    ret.insert("sin", unary(sin));
    ret.insert("cos", unary(cos));
    ret.insert("tan", unary(tan));
    ret.insert("asin", unary(arcsin));
    ret.insert("acos", unary(arccos));
    ret.insert("atan", unary(arctan));
    ret.insert("arcsin", unary(arcsin));
    ret.insert("arccos", unary(arccos));
    ret.insert("arctan", unary(arctan));
    ret.insert("sinh", unary(sinh));
    ret.insert("cosh", unary(cosh));
    ret.insert("tanh", unary(tanh));
    ret
}

fn unary(build: fn(Vec<Expr>) -> Expr) -> Ident {
    Ident::Fun(Builtin::new(1..=1, build))
}

#[track_caller]
fn expect_n<const N: usize>(args: Vec<Expr>) -> [Expr; N] {
    match args.try_into() {
        Ok(args) => args,
        Err(args) => panic!("expected {N} arguments, got {}", args.len()),
    }
}

fn call(fun: Fun, args: Vec<Expr>) -> Expr {
    let [x] = expect_n::<1>(args);
    Expr::call(fun, x)
}

pub fn abs(args: Vec<Expr>) -> Expr {
    call(Fun::Abs, args)
}

pub fn sqrt(args: Vec<Expr>) -> Expr {
    call(Fun::Sqrt, args)
}

pub fn exp(args: Vec<Expr>) -> Expr {
    call(Fun::Exp, args)
}

pub fn ln(args: Vec<Expr>) -> Expr {
    call(Fun::Ln, args)
}

/// `log(x)` is the natural logarithm, `log(x, base)` is `ln(x)/ln(base)`.
pub fn log(args: Vec<Expr>) -> Expr {
    if args.len() == 2 {
        let [x, base] = expect_n::<2>(args);
        Expr::Div(
            Box::new(Expr::call(Fun::Ln, x)),
            Box::new(Expr::call(Fun::Ln, base)),
        )
    } else {
        call(Fun::Ln, args)
    }
}

pub fn sin(args: Vec<Expr>) -> Expr {
    call(Fun::Sin, args)
}

pub fn cos(args: Vec<Expr>) -> Expr {
    call(Fun::Cos, args)
}

pub fn tan(args: Vec<Expr>) -> Expr {
    call(Fun::Tan, args)
}

pub fn arcsin(args: Vec<Expr>) -> Expr {
    call(Fun::Asin, args)
}

pub fn arccos(args: Vec<Expr>) -> Expr {
    call(Fun::Acos, args)
}

pub fn arctan(args: Vec<Expr>) -> Expr {
    call(Fun::Atan, args)
}

pub fn sinh(args: Vec<Expr>) -> Expr {
    call(Fun::Sinh, args)
}

pub fn cosh(args: Vec<Expr>) -> Expr {
    call(Fun::Cosh, args)
}

pub fn tanh(args: Vec<Expr>) -> Expr {
    call(Fun::Tanh, args)
}

/// Best guess at what a misspelled identifier was meant to be.
pub fn most_similar<'a>(idents: &'a Idents, text: &str) -> Option<(&'static str, &'a Ident)> {
    let text = text.to_ascii_lowercase();
    idents
        .iter()
        .map(|(k, v)| {
            (
                strsim::normalized_damerau_levenshtein(&text, &k.to_ascii_lowercase()),
                (*k, v),
            )
        })
        .filter(|(sim, _)| *sim > 0.3)
        // ties broken by name so the suggestion doesn't depend on hash order
        .max_by(|(a_sim, (a_key, _)), (b_sim, (b_key, _))| {
            a_sim.total_cmp(b_sim).then_with(|| b_key.cmp(a_key))
        })
        .map(|(_, kv)| kv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arities() {
        let idents = standard_idents();
        let Some(Ident::Fun(log)) = idents.get("log") else {
            panic!("log is a function");
        };
        assert!(log.accepts(1) && log.accepts(2) && !log.accepts(3));
        let Some(Ident::Fun(sin)) = idents.get("sin") else {
            panic!("sin is a function");
        };
        assert!(!sin.accepts(0) && !sin.accepts(2));
    }

    #[test]
    fn log_with_base() {
        let two = Expr::Num(2.0);
        let e = log(vec![Expr::Var(Var::X), two.clone()]);
        assert_eq!(
            e,
            Expr::Div(
                Box::new(Expr::call(Fun::Ln, Expr::Var(Var::X))),
                Box::new(Expr::call(Fun::Ln, two)),
            )
        );
        assert_eq!(log(vec![Expr::Var(Var::Y)]), Expr::call(Fun::Ln, Expr::Var(Var::Y)));
    }

    #[test]
    fn suggestions() {
        let idents = standard_idents();
        let (name, ident) = most_similar(&idents, "sine").unwrap();
        assert_eq!(name, "sin");
        assert_eq!(ident.kind(), "function");
        assert!(most_similar(&idents, "qwertyuiop").is_none());
    }
}

// SPDX: CC0-1.0

//! LaTeX rendering of expressions, for pasting into notes or slides.

use crate::{
    expr::{Const, Expr, Fun},
    GradientResult, Number, Point,
};
use core::fmt::{self, Write};

/// Wrapper whose `Display` writes the expression as LaTeX.
pub struct Latex<'a>(pub &'a Expr);

impl fmt::Display for Latex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self.0)
    }
}

fn write_const(f: &mut impl Write, c: Const) -> fmt::Result {
    match c {
        Const::Pi => f.write_str(r"\pi"),
        Const::Tau => f.write_str(r"\tau"),
        Const::E => f.write_str("e"),
    }
}

fn write_paren(f: &mut impl Write, e: &Expr, parens: bool) -> fmt::Result {
    if parens {
        f.write_str(r"\left(")?;
        write_expr(f, e)?;
        f.write_str(r"\right)")
    } else {
        write_expr(f, e)
    }
}

fn write_expr(f: &mut impl Write, e: &Expr) -> fmt::Result {
    let prec = e.precedence();
    match e {
        Expr::Num(n) => write!(f, "{n}"),
        Expr::Const(c) => write_const(f, *c),
        Expr::Var(v) => f.write_str(v.name()),
        Expr::Neg(a) => {
            f.write_str("- ")?;
            write_paren(f, a, a.precedence() < prec)
        }
        Expr::Add(a, b) => {
            write_paren(f, a, a.precedence() < prec)?;
            f.write_str(" + ")?;
            write_paren(f, b, b.precedence() < prec)
        }
        Expr::Sub(a, b) => {
            write_paren(f, a, a.precedence() < prec)?;
            f.write_str(" - ")?;
            write_paren(f, b, b.precedence() <= prec)
        }
        Expr::Mul(a, b) => {
            write_paren(f, a, a.precedence() < prec)?;
            // 2 x, but 2 \cdot 3
            if a.as_num().is_some() && b.as_num().is_none() && b.precedence() > prec {
                f.write_str(" ")?;
            } else {
                f.write_str(r" \cdot ")?;
            }
            write_paren(f, b, b.precedence() <= prec)
        }
        Expr::Div(a, b) => {
            f.write_str(r"\frac{")?;
            write_expr(f, a)?;
            f.write_str("}{")?;
            write_expr(f, b)?;
            f.write_str("}")
        }
        Expr::Pow(a, b) => {
            write_paren(f, a, a.precedence() <= prec)?;
            f.write_str("^{")?;
            write_expr(f, b)?;
            f.write_str("}")
        }
        Expr::Call(Fun::Sqrt, a) => {
            f.write_str(r"\sqrt{")?;
            write_expr(f, a)?;
            f.write_str("}")
        }
        Expr::Call(Fun::Abs, a) => {
            f.write_str(r"\left|")?;
            write_expr(f, a)?;
            f.write_str(r"\right|")
        }
        Expr::Call(Fun::Exp, a) => {
            f.write_str("e^{")?;
            write_expr(f, a)?;
            f.write_str("}")
        }
        Expr::Call(fun, a) => {
            let name = match fun {
                Fun::Ln => r"\log",
                Fun::Sin => r"\sin",
                Fun::Cos => r"\cos",
                Fun::Tan => r"\tan",
                Fun::Asin => r"\operatorname{asin}",
                Fun::Acos => r"\operatorname{acos}",
                Fun::Atan => r"\operatorname{atan}",
                Fun::Sinh => r"\sinh",
                Fun::Cosh => r"\cosh",
                Fun::Tanh => r"\tanh",
                Fun::Sqrt | Fun::Abs | Fun::Exp => unreachable!("handled above"),
            };
            write!(f, r"{name}{{\left(")?;
            write_expr(f, a)?;
            f.write_str(r" \right)}")
        }
    }
}

/// `\nabla f(x, y) = \langle fx, fy \rangle` with components rounded to
/// `decimals` places. Rounding only affects the text.
pub fn gradient_line(point: Point<Number>, grad: &GradientResult, decimals: usize) -> String {
    format!(
        r"\nabla f({px}, {py}) = \langle {gx:.decimals$}, {gy:.decimals$} \rangle",
        px = point.x,
        py = point.y,
        gx = grad.gradient.x,
        gy = grad.gradient.y,
    )
}

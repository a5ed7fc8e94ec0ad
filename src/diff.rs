// SPDX: CC0-1.0

use crate::expr::{Expr, Fun, Var};

/// Exact partial derivative of `expr` with respect to `var`.
pub fn differentiate(expr: &Expr, var: Var) -> Expr {
    match expr {
        Expr::Num(_) | Expr::Const(_) => Expr::ZERO,

        Expr::Var(v) => {
            if *v == var {
                Expr::ONE
            } else {
                Expr::ZERO
            }
        }

        Expr::Neg(a) => Expr::neg(differentiate(a, var)),

        Expr::Add(a, b) => Expr::add(differentiate(a, var), differentiate(b, var)),

        Expr::Sub(a, b) => Expr::sub(differentiate(a, var), differentiate(b, var)),

        // (uv)' = u'v + uv'
        Expr::Mul(a, b) => Expr::add(
            Expr::mul(differentiate(a, var), (**b).clone()),
            Expr::mul((**a).clone(), differentiate(b, var)),
        ),

        Expr::Div(a, b) => {
            if b.depends_on(var) {
                // (u/v)' = (u'v - uv') / v^2
                Expr::div(
                    Expr::sub(
                        Expr::mul(differentiate(a, var), (**b).clone()),
                        Expr::mul((**a).clone(), differentiate(b, var)),
                    ),
                    Expr::pow((**b).clone(), Expr::Num(2.0)),
                )
            } else {
                Expr::div(differentiate(a, var), (**b).clone())
            }
        }

        Expr::Pow(base, exp) => diff_pow(base, exp, var),

        Expr::Call(fun, arg) => {
            // chain rule
            let inner = differentiate(arg, var);
            if inner.is_num(0.0) {
                return Expr::ZERO;
            }
            Expr::mul(derivative_of(*fun, arg), inner)
        }
    }
}

fn diff_pow(base: &Expr, exp: &Expr, var: Var) -> Expr {
    let base_depends = base.depends_on(var);
    let exp_depends = exp.depends_on(var);
    let ln = |e: &Expr| Expr::call(Fun::Ln, e.clone());

    match (base_depends, exp_depends) {
        (false, false) => Expr::ZERO,

        // power rule: (u^n)' = n u^(n-1) u'
        (true, false) => Expr::mul(
            Expr::mul(
                exp.clone(),
                Expr::pow(base.clone(), Expr::sub(exp.clone(), Expr::ONE)),
            ),
            differentiate(base, var),
        ),

        // (a^v)' = a^v ln(a) v'
        (false, true) => Expr::mul(
            Expr::mul(Expr::pow(base.clone(), exp.clone()), ln(base)),
            differentiate(exp, var),
        ),

        // (u^v)' = u^v (v' ln(u) + v u'/u)
        (true, true) => Expr::mul(
            Expr::pow(base.clone(), exp.clone()),
            Expr::add(
                Expr::mul(differentiate(exp, var), ln(base)),
                Expr::div(
                    Expr::mul(exp.clone(), differentiate(base, var)),
                    base.clone(),
                ),
            ),
        ),
    }
}

/// `f'(arg)` for the outer function of a call.
fn derivative_of(fun: Fun, arg: &Expr) -> Expr {
    let u = || arg.clone();
    let one_minus_square = || Expr::sub(Expr::ONE, Expr::pow(u(), Expr::Num(2.0)));

    match fun {
        Fun::Sin => Expr::call(Fun::Cos, u()),
        Fun::Cos => Expr::neg(Expr::call(Fun::Sin, u())),
        Fun::Tan => Expr::div(
            Expr::ONE,
            Expr::pow(Expr::call(Fun::Cos, u()), Expr::Num(2.0)),
        ),
        Fun::Asin => Expr::div(Expr::ONE, Expr::call(Fun::Sqrt, one_minus_square())),
        Fun::Acos => Expr::neg(Expr::div(
            Expr::ONE,
            Expr::call(Fun::Sqrt, one_minus_square()),
        )),
        Fun::Atan => Expr::div(
            Expr::ONE,
            Expr::add(Expr::ONE, Expr::pow(u(), Expr::Num(2.0))),
        ),
        Fun::Sinh => Expr::call(Fun::Cosh, u()),
        Fun::Cosh => Expr::call(Fun::Sinh, u()),
        Fun::Tanh => Expr::sub(
            Expr::ONE,
            Expr::pow(Expr::call(Fun::Tanh, u()), Expr::Num(2.0)),
        ),
        Fun::Exp => Expr::call(Fun::Exp, u()),
        Fun::Ln => Expr::div(Expr::ONE, u()),
        Fun::Sqrt => Expr::div(
            Expr::ONE,
            Expr::mul(Expr::Num(2.0), Expr::call(Fun::Sqrt, u())),
        ),
        // undefined at 0, where the evaluator reports a division by zero
        Fun::Abs => Expr::div(u(), Expr::call(Fun::Abs, u())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eval, parse_str, Point};

    fn d(src: &str, var: Var) -> Expr {
        differentiate(&parse_str(src).unwrap(), var)
    }

    fn at(expr: &Expr, x: f64, y: f64) -> f64 {
        eval::evaluate(expr, Point { x, y }).unwrap()
    }

    #[test]
    fn polynomial() {
        assert_eq!(d("x**2 + y**2", Var::X).to_string(), "2*x");
        assert_eq!(d("x**2 + y**2", Var::Y).to_string(), "2*y");
        assert_eq!(d("3*x*y", Var::Y).to_string(), "3*x");
        assert_eq!(d("y", Var::X), Expr::ZERO);
        assert_eq!(d("5", Var::X), Expr::ZERO);
    }

    #[test]
    fn linear() {
        let f = parse_str("x**3*y - sin(x*y)").unwrap();
        let g = parse_str("exp(x)/y + ln(x**2 + 1)").unwrap();
        let sum = Expr::Add(Box::new(f.clone()), Box::new(g.clone()));
        for var in [Var::X, Var::Y] {
            assert_eq!(
                differentiate(&sum, var),
                Expr::add(differentiate(&f, var), differentiate(&g, var)),
            );
        }
    }

    #[test]
    fn product_and_quotient() {
        // d/dx x sin(x) = sin(x) + x cos(x)
        let e = d("x*sin(x)", Var::X);
        let want = 2f64.sin() + 2.0 * 2f64.cos();
        assert!((at(&e, 2.0, 0.0) - want).abs() < 1e-12);

        // d/dy x/y = -x/y^2
        let e = d("x/y", Var::Y);
        assert!((at(&e, 3.0, 2.0) - (-0.75)).abs() < 1e-12);
    }

    #[test]
    fn chain_rule() {
        // d/dx exp(x y) = y exp(x y)
        let e = d("exp(x*y)", Var::X);
        let want = 3.0 * 6f64.exp();
        assert!((at(&e, 2.0, 3.0) - want).abs() < 1e-9);

        // d/dy sqrt(x**2 + y**2) = y / sqrt(x^2 + y^2)
        let e = d("sqrt(x**2 + y**2)", Var::Y);
        assert!((at(&e, 3.0, 4.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn variable_exponent() {
        // d/dx 2^x = 2^x ln 2
        let e = d("2^x", Var::X);
        assert!((at(&e, 3.0, 0.0) - 8.0 * 2f64.ln()).abs() < 1e-12);

        // d/dx x^x = x^x (ln x + 1)
        let e = d("x^x", Var::X);
        assert!((at(&e, 2.0, 0.0) - 4.0 * (2f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn inverse_trig() {
        let e = d("asin(x) + acos(y) + atan(x*y)", Var::X);
        let (x, y): (f64, f64) = (0.5, 0.25);
        let want = 1.0 / (1.0 - x * x).sqrt() + y / (1.0 + (x * y) * (x * y));
        assert!((at(&e, x, y) - want).abs() < 1e-12);
    }

    #[test]
    fn abs_undefined_at_zero() {
        let e = d("abs(x)", Var::X);
        assert_eq!(at(&e, -2.0, 0.0), -1.0);
        assert!(eval::evaluate(&e, Point { x: 0.0, y: 0.0 }).is_err());
    }
}

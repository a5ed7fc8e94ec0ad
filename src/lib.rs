// SPDX: CC0-1.0

pub mod diff;
pub mod eval;
pub mod expr;
pub mod latex;
pub mod lex;
pub mod parse;
pub mod plot;
pub mod shell;
pub mod stdlib;

use crate::{
    eval::{EvalErr, Program},
    expr::{Expr, Var},
    lex::Lexer,
    parse::ParseErr,
};
use core::{fmt, num::NonZeroU16, ops::Range};
use log::debug;
use std::sync::Arc;

pub use crate::{diff::differentiate, eval::evaluate};

pub type Number = f64;

/// Grids finer than this per axis are refused.
pub const MAX_RESOLUTION: u16 = 200;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub x: Range<Number>,
    pub y: Range<Number>,
    pub resolution: NonZeroU16,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            x: -5.0..5.0,
            y: -5.0..5.0,
            resolution: NonZeroU16::new(50).unwrap_or(NonZeroU16::MIN),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("x range", &self.x)
            .field("y range", &self.y)
            .field("resolution", &self.resolution)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WindowErr {
    ResolutionTooLarge { found: u16, max: u16 },
    NonFiniteBound,
}

impl fmt::Display for WindowErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolutionTooLarge { found, max } => {
                write!(f, "resolution {found} is above the maximum of {max}")
            }
            Self::NonFiniteBound => write!(f, "window bounds must be finite numbers"),
        }
    }
}

impl std::error::Error for WindowErr {}

impl Window {
    pub fn validate(&self) -> Result<(), WindowErr> {
        let bounds = [self.x.start, self.x.end, self.y.start, self.y.end];
        if !bounds.iter().all(|b| b.is_finite()) {
            return Err(WindowErr::NonFiniteBound);
        }
        if self.resolution.get() > MAX_RESOLUTION {
            return Err(WindowErr::ResolutionTooLarge {
                found: self.resolution.get(),
                max: MAX_RESOLUTION,
            });
        }
        Ok(())
    }

    /// Evenly spaced coordinates along one axis, both ends included.
    pub fn axis(&self, range: &Range<Number>) -> Vec<Number> {
        let n = self.resolution.get();
        if n == 1 {
            return vec![range.start];
        }
        let step = (range.end - range.start) / Number::from(n - 1);
        (0..n)
            .map(|i| {
                if i == n - 1 {
                    range.end
                } else {
                    range.start + step * Number::from(i)
                }
            })
            .collect()
    }
}

/// Value of a function and its gradient at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientResult {
    pub value: Number,
    pub gradient: Point<Number>,
}

impl GradientResult {
    pub fn magnitude(&self) -> Number {
        self.gradient.x.hypot(self.gradient.y)
    }
}

/// A function sampled on a regular grid, laid out like a meshgrid: row `i`
/// holds `y = ys[i][_]`, column `j` holds `x = xs[_][j]`. Cells where the
/// function is undefined are NaN.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceSample {
    pub xs: Vec<Vec<Number>>,
    pub ys: Vec<Vec<Number>>,
    pub zs: Vec<Vec<Number>>,
}

impl SurfaceSample {
    pub fn rows(&self) -> usize {
        self.zs.len()
    }

    pub fn cols(&self) -> usize {
        self.zs.first().map_or(0, Vec::len)
    }

    pub fn undefined(&self) -> usize {
        self.zs.iter().flatten().filter(|z| z.is_nan()).count()
    }
}

/// Parse `text` as a function of `x` and `y`.
pub fn parse_str(text: &str) -> Result<Expr, ParseErr> {
    parse_src(&Arc::new(text.to_string()))
}

/// Like [`parse_str`], but errors borrow `src` so spans can point into it.
pub fn parse_src(src: &Arc<String>) -> Result<Expr, ParseErr> {
    parse::parse(Lexer::new(src), &stdlib::standard_idents())
}

/// Exact value and gradient of `expr` at `point`. Fails if the function or
/// either partial derivative is undefined there.
pub fn gradient_at(expr: &Expr, point: Point<Number>) -> Result<GradientResult, EvalErr> {
    let value = evaluate(expr, point)?;
    let dx = evaluate(&differentiate(expr, Var::X), point)?;
    let dy = evaluate(&differentiate(expr, Var::Y), point)?;
    Ok(GradientResult {
        value,
        gradient: Point { x: dx, y: dy },
    })
}

/// Sample `expr` over `window`.
pub fn sample_surface(expr: &Expr, window: &Window) -> Result<SurfaceSample, WindowErr> {
    sample(&Program::compile(expr), window)
}

pub(crate) fn sample(prog: &Program, window: &Window) -> Result<SurfaceSample, WindowErr> {
    window.validate()?;

    let xs = window.axis(&window.x);
    let ys = window.axis(&window.y);

    let mut stack: Vec<Number> = Vec::new();
    let mut ret = SurfaceSample {
        xs: Vec::with_capacity(ys.len()),
        ys: Vec::with_capacity(ys.len()),
        zs: Vec::with_capacity(ys.len()),
    };

    for &y in &ys {
        let row = xs
            .iter()
            .map(|&x| eval::eval(prog, Point { x, y }, &mut stack).unwrap_or(Number::NAN))
            .collect();
        ret.xs.push(xs.clone());
        ret.ys.push(vec![y; xs.len()]);
        ret.zs.push(row);
    }

    let undefined = ret.undefined();
    if undefined > 0 {
        debug!(
            "function is undefined at {undefined} of {} grid points",
            xs.len() * ys.len()
        );
    }
    Ok(ret)
}

/// A parsed function together with its partial derivatives, each compiled
/// once so repeated evaluation doesn't re-parse or re-differentiate.
#[derive(Clone, Debug)]
pub struct Function {
    pub src: Arc<String>,
    pub expr: Expr,
    pub dx: Expr,
    pub dy: Expr,
    prog: Program,
    prog_dx: Program,
    prog_dy: Program,
}

impl Function {
    pub fn new(src: Arc<String>) -> Result<Self, ParseErr> {
        let expr = parse_src(&src)?;
        Ok(Self::from_expr(src, expr))
    }

    pub fn from_expr(src: Arc<String>, expr: Expr) -> Self {
        let dx = differentiate(&expr, Var::X);
        let dy = differentiate(&expr, Var::Y);
        debug!("df/dx = {dx}, df/dy = {dy}");
        let prog = Program::compile(&expr);
        let prog_dx = Program::compile(&dx);
        let prog_dy = Program::compile(&dy);
        debug!(
            "compiled programs of {} / {} / {} operations",
            prog.ops.len(),
            prog_dx.ops.len(),
            prog_dy.ops.len()
        );
        Self {
            src,
            expr,
            dx,
            dy,
            prog,
            prog_dx,
            prog_dy,
        }
    }

    pub fn programs(&self) -> [(&'static str, &Program); 3] {
        [
            ("f", &self.prog),
            ("df/dx", &self.prog_dx),
            ("df/dy", &self.prog_dy),
        ]
    }

    pub fn evaluate(&self, point: Point<Number>) -> Result<Number, EvalErr> {
        eval::eval(&self.prog, point, &mut Vec::new())
    }

    pub fn gradient_at(&self, point: Point<Number>) -> Result<GradientResult, EvalErr> {
        let mut stack = Vec::new();
        let value = eval::eval(&self.prog, point, &mut stack)?;
        let dx = eval::eval(&self.prog_dx, point, &mut stack)?;
        let dy = eval::eval(&self.prog_dy, point, &mut stack)?;
        Ok(GradientResult {
            value,
            gradient: Point { x: dx, y: dy },
        })
    }

    pub fn sample_surface(&self, window: &Window) -> Result<SurfaceSample, WindowErr> {
        sample(&self.prog, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct WarnCounter(AtomicUsize);

    impl log::Log for WarnCounter {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if record.level() <= log::Level::Warn {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        fn flush(&self) {}
    }

    static WARNINGS: WarnCounter = WarnCounter(AtomicUsize::new(0));

    #[test]
    fn axis_includes_both_ends() {
        let win = Window {
            x: -1.0..1.0,
            y: 0.0..3.0,
            resolution: NonZeroU16::new(5).unwrap(),
        };
        assert_eq!(win.axis(&win.x), [-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(win.axis(&win.y), [0.0, 0.75, 1.5, 2.25, 3.0]);

        let win = Window {
            resolution: NonZeroU16::MIN,
            ..win
        };
        assert_eq!(win.axis(&win.x), [-1.0]);
    }

    #[test]
    fn window_limits() {
        let mut win = Window::default();
        assert_eq!(win.validate(), Ok(()));

        win.resolution = NonZeroU16::new(MAX_RESOLUTION + 1).unwrap();
        assert_eq!(
            win.validate(),
            Err(WindowErr::ResolutionTooLarge {
                found: MAX_RESOLUTION + 1,
                max: MAX_RESOLUTION
            })
        );

        win.resolution = NonZeroU16::new(MAX_RESOLUTION).unwrap();
        win.y.end = Number::INFINITY;
        assert_eq!(win.validate(), Err(WindowErr::NonFiniteBound));
    }

    #[test]
    fn meshgrid_layout() {
        let win = Window {
            x: 0.0..2.0,
            y: 10.0..20.0,
            resolution: NonZeroU16::new(3).unwrap(),
        };
        let expr = parse_str("x + y").unwrap();
        let s = sample_surface(&expr, &win).unwrap();
        assert_eq!(s.xs[2], [0.0, 1.0, 2.0]);
        assert_eq!(s.ys[2], [20.0, 20.0, 20.0]);
        assert_eq!(s.zs[1], [15.0, 16.0, 17.0]);
    }

    #[test]
    fn undefined_cells_are_not_warnings() {
        // the shell already tells the user, the log only traces it
        let _ = log::set_logger(&WARNINGS);
        log::set_max_level(log::LevelFilter::Trace);

        let expr = parse_str("1/x").unwrap();
        let win = Window {
            x: -1.0..1.0,
            y: -1.0..1.0,
            resolution: NonZeroU16::new(3).unwrap(),
        };
        let s = sample_surface(&expr, &win).unwrap();
        assert_eq!(s.undefined(), 3);
        assert_eq!(WARNINGS.0.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn function_matches_free_functions() {
        let src = Arc::new(String::from("x**2*y + sin(y)"));
        let fun = Function::new(src).unwrap();
        let p = Point { x: 0.5, y: -1.5 };
        assert_eq!(fun.gradient_at(p), gradient_at(&fun.expr, p));
        assert_eq!(fun.evaluate(p), evaluate(&fun.expr, p));
        assert_eq!(
            fun.sample_surface(&Window::default()),
            sample_surface(&fun.expr, &Window::default())
        );
    }
}

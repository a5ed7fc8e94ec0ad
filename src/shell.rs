// SPDX: CC0-1.0

use crate::{
    eval::{EvalErr, EvalErrTyp, Program},
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::{ParseErr, ParseErrTyp},
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetExpr,
    SetPoint,
    SetWin,
    SetStyle,
    Grad,
    Latex,
    PrintProg,
    Plot,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetExpr,
            Self::SetPoint,
            Self::Grad,
            Self::Plot,
            Self::SetWin,
            Self::SetStyle,
            Self::Latex,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetExpr => "set the function f(x, y) to visualize",
            Self::SetPoint => "set the point where the gradient is taken",
            Self::SetWin => "set the plotted domain and grid resolution",
            Self::SetStyle => "set arrow scale, arrow head and label language",
            Self::Grad => "print the value and gradient of f at the point",
            Self::Latex => "print f and its gradient as LaTeX",
            Self::PrintProg => "print programs compiled from f and its partials (for debugging)",
            Self::Plot => "plot the surface of f with its gradient at the point",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetExpr => "set",
            Self::SetPoint => "point",
            Self::SetWin => "window",
            Self::SetStyle => "style",
            Self::Grad => "grad",
            Self::Latex => "latex",
            Self::PrintProg => "prog",
            Self::Plot => "plot",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for c in Self::exhaustive() {
            if s == c.name() {
                return Ok(*c);
            }
        }
        Err(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn expr_undefined<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no function is defined")
}

/// Explain a parse error to the user: the offending span, the cause and,
/// where one exists, a hint.
pub fn report_parse_err<W: Write>(mut out: W, err: &ParseErr) -> io::Result<()> {
    writeln!(out)?;
    underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    match &err.typ {
        ParseErrTyp::LexErr(lex_err) => match lex_err {
            LexErrTyp::InvalidChar => {
                writeln!(
                    out,
                    "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^(),"
                )?;
            }
            LexErrTyp::Unsupported(typ) => match typ {
                TokTyp::Ident
                | TokTyp::Number
                | TokTyp::Op(_)
                | TokTyp::Comma
                | TokTyp::OpenParen
                | TokTyp::CloseParen => {}

                TokTyp::XGreater | TokTyp::XLess => {
                    writeln!(out, "note: expected an expression but found an inequality")?;
                }
                TokTyp::XEqual => {
                    writeln!(
                        out,
                        "note: expected an expression but found an equation, enter only the right hand side of f(x, y) = ..."
                    )?;
                }
                TokTyp::XPipe => writeln!(
                    out,
                    "note: use the 'abs' function to compute absolute value"
                )?,
                TokTyp::XOpenSquareBracket
                | TokTyp::XCloseSquareBracket
                | TokTyp::XOpenCurly
                | TokTyp::XCloseCurly => {
                    writeln!(out, "note: only round parentheses can group expressions")?;
                }
            },
        },

        ParseErrTyp::ParseNum(_) => writeln!(out, "note: parsing as floating point number")?,

        ParseErrTyp::UnknownIdent { suggestion } => {
            writeln!(out, "note: the variables are 'x' and 'y'")?;
            if let Some((name, kind)) = suggestion {
                writeln!(out, "note: {kind} '{name}' has a similar name")?;
            }
        }

        ParseErrTyp::ExpectedOperator => writeln!(
            out,
            "note: implicit multiplication is not supported, so for example '2x' would be '2*x'"
        )?,

        ParseErrTyp::ExpectedOperand => {
            writeln!(out, "note: exponentiation is written 'x**2' or 'x^2'")?
        }

        ParseErrTyp::TooDeep { .. } => writeln!(
            out,
            "note: try removing repeated signs or splitting the expression into simpler terms"
        )?,

        ParseErrTyp::NumOutOfRange
        | ParseErrTyp::ExpectedCall
        | ParseErrTyp::Arity { .. }
        | ParseErrTyp::MisplacedComma
        | ParseErrTyp::ParenMismatch
        | ParseErrTyp::Empty => {}
    }
    Ok(())
}

pub fn report_eval_err<W: Write>(mut out: W, what: &str, err: &EvalErr) -> io::Result<()> {
    writeln!(out, "evaluation error in {what}: {err}")?;
    match err.typ {
        EvalErrTyp::DivByZero | EvalErrTyp::Domain { .. } | EvalErrTyp::PowDomain { .. } => {
            writeln!(
                out,
                "note: the function or its gradient is undefined at this point, try moving it"
            )?;
        }
        EvalErrTyp::Overflow => writeln!(out, "note: try a point closer to the origin")?,
        EvalErrTyp::Empty
        | EvalErrTyp::MissingArgs { .. }
        | EvalErrTyp::StackMismatch { .. }
        | EvalErrTyp::NonFiniteInput { .. } => {}
    }
    Ok(())
}

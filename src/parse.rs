// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm),
// reducing into an expression tree instead of emitting postfix

use crate::{
    expr::Expr,
    lex::{LexErr, LexErrTyp, Lexer, OpTok, SubStr, Tok, TokTyp},
    stdlib::{self, Builtin, Ident, Idents},
    Number,
};
use core::{fmt, num::ParseFloatError};
use log::debug;

/// Deepest expression tree the parser will build. Everything downstream
/// walks trees recursively, so this bounds stack use.
pub const MAX_DEPTH: usize = 100;

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    NumOutOfRange,
    UnknownIdent {
        suggestion: Option<(&'static str, &'static str)>,
    },
    ExpectedOperand,
    ExpectedOperator,
    ExpectedCall,
    Arity {
        name: String,
        expected: (usize, usize),
        found: usize,
    },
    MisplacedComma,
    ParenMismatch,
    TooDeep {
        max: usize,
    },
    Empty,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::NumOutOfRange => write!(f, "number is too large"),
            Self::UnknownIdent { .. } => write!(f, "unknown identifier"),
            Self::ExpectedOperand => write!(f, "expected a number, variable or '('"),
            Self::ExpectedOperator => write!(f, "expected an operator"),
            Self::ExpectedCall => write!(f, "expected '(' after function name"),
            Self::Arity {
                name,
                expected: (min, max),
                found,
            } => {
                let s = if *max == 1 { "" } else { "s" };
                if min == max {
                    write!(f, "function '{name}' takes {min} argument{s}, but found {found}")
                } else {
                    write!(
                        f,
                        "function '{name}' takes {min} to {max} argument{s}, but found {found}"
                    )
                }
            }
            Self::MisplacedComma => write!(f, "comma outside of function call"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::TooDeep { max } => {
                write!(f, "expression is nested more than {max} levels deep")
            }
            Self::Empty => write!(f, "expression is empty"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}'", self.typ, self.loc)
    }
}

impl std::error::Error for ParseErr {}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    const fn binary(tok: OpTok) -> Self {
        match tok {
            OpTok::Plus => Self::Add,
            OpTok::Minus => Self::Sub,
            OpTok::Star => Self::Mul,
            OpTok::Slash => Self::Div,
            OpTok::Pow => Self::Pow,
        }
    }

    const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Neg => 4,
            Self::Pow => 5,
        }
    }

    const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            // prefix, so it never pops anything when pushed
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Pow => Right,
        }
    }

    const fn arity(&self) -> usize {
        match self {
            Self::Neg => 1,
            _ => 2,
        }
    }
}

#[derive(Debug)]
enum ShuntOpTyp<'i> {
    Operator(OperatorTyp),
    Fun(&'i Builtin),
    // `args` counts commas seen so far plus one, only meaningful for calls
    OpenParen { call: bool, args: usize },
}

#[derive(Debug)]
struct ShuntOp<'i> {
    typ: ShuntOpTyp<'i>,
    loc: SubStr,
}

struct Shunt<'i> {
    out: Vec<(Expr, usize)>, // output, with the depth of each tree
    ops: Vec<ShuntOp<'i>>,   // operator stack
}

impl Shunt<'_> {
    fn push(&mut self, expr: Expr, depth: usize, loc: &SubStr) -> Result<(), ParseErr> {
        if depth > MAX_DEPTH {
            return Err(ParseErr {
                typ: ParseErrTyp::TooDeep { max: MAX_DEPTH },
                loc: loc.clone(),
            });
        }
        self.out.push((expr, depth));
        Ok(())
    }

    fn pop_operand(&mut self, loc: &SubStr) -> Result<(Expr, usize), ParseErr> {
        self.out.pop().ok_or_else(|| ParseErr {
            typ: ParseErrTyp::ExpectedOperand,
            loc: loc.clone(),
        })
    }

    fn apply(&mut self, op: OperatorTyp, loc: &SubStr) -> Result<(), ParseErr> {
        let (expr, depth) = if op.arity() == 1 {
            let (a, depth) = self.pop_operand(loc)?;
            (Expr::Neg(Box::new(a)), depth + 1)
        } else {
            let (b, b_depth) = self.pop_operand(loc)?;
            let (a, a_depth) = self.pop_operand(loc)?;
            let (a, b) = (Box::new(a), Box::new(b));
            let expr = match op {
                OperatorTyp::Add => Expr::Add(a, b),
                OperatorTyp::Sub => Expr::Sub(a, b),
                OperatorTyp::Mul => Expr::Mul(a, b),
                OperatorTyp::Div => Expr::Div(a, b),
                OperatorTyp::Pow => Expr::Pow(a, b),
                OperatorTyp::Neg => unreachable!("negation is unary"),
            };
            (expr, a_depth.max(b_depth) + 1)
        };
        self.push(expr, depth, loc)
    }

    fn call(&mut self, fun: &Builtin, args: usize, loc: &SubStr) -> Result<(), ParseErr> {
        if !fun.accepts(args) {
            return Err(ParseErr {
                typ: ParseErrTyp::Arity {
                    name: loc.get().to_string(),
                    expected: (*fun.arity.start(), *fun.arity.end()),
                    found: args,
                },
                loc: loc.clone(),
            });
        }
        if self.out.len() < args {
            return Err(ParseErr {
                typ: ParseErrTyp::ExpectedOperand,
                loc: loc.clone(),
            });
        }
        let argv = self.out.split_off(self.out.len() - args);
        // a builtin adds at most two levels, as in log(x, b) = ln(x)/ln(b)
        let depth = argv.iter().map(|(_, depth)| *depth).max().unwrap_or(0) + 2;
        let argv = argv.into_iter().map(|(expr, _)| expr).collect();
        self.push((fun.build)(argv), depth, loc)
    }

    /// Reduce operators until an open paren is on top of the stack.
    fn reduce_to_paren(&mut self) -> Result<(), ParseErr> {
        while let Some(op) = self.ops.last() {
            match op.typ {
                ShuntOpTyp::OpenParen { .. } => break,
                ShuntOpTyp::Operator(typ) => {
                    let loc = op.loc.clone();
                    self.ops.pop();
                    self.apply(typ, &loc)?;
                }
                ShuntOpTyp::Fun(_) => unreachable!("function names are always followed by a paren"),
            }
        }
        Ok(())
    }
}

/// Parse a token stream into an expression over the identifiers in `idents`.
pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Expr, ParseErr> {
    let src = lex.src();
    let mut shunt = Shunt {
        out: Vec::new(),
        ops: Vec::new(),
    };
    let mut expect_operand = true;
    let mut pending_call: Option<SubStr> = None;
    let mut last: Option<Tok> = None;

    for tok in lex {
        let tok = tok?;

        if let Some(loc) = pending_call.take() {
            if tok.typ != TokTyp::OpenParen {
                return Err(ParseErr {
                    typ: ParseErrTyp::ExpectedCall,
                    loc,
                });
            }
        }

        let is_operand = matches!(tok.typ, TokTyp::Number | TokTyp::Ident | TokTyp::OpenParen);
        if is_operand && !expect_operand {
            // implicit multiplication like `2x` or `x(y)`
            return Err(ParseErr {
                typ: ParseErrTyp::ExpectedOperator,
                loc: tok.loc,
            });
        }

        match tok.typ {
            TokTyp::Number => {
                let num: Number = match tok.loc.get().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                };
                if !num.is_finite() {
                    return Err(ParseErr {
                        typ: ParseErrTyp::NumOutOfRange,
                        loc: tok.loc,
                    });
                }
                shunt.out.push((Expr::Num(num), 1));
                expect_operand = false;
            }

            TokTyp::Ident => match idents.get(tok.loc.get()) {
                Some(Ident::Var(var)) => {
                    shunt.out.push((Expr::Var(*var), 1));
                    expect_operand = false;
                }
                Some(Ident::Const(c)) => {
                    shunt.out.push((Expr::Const(*c), 1));
                    expect_operand = false;
                }
                Some(Ident::Fun(fun)) => {
                    shunt.ops.push(ShuntOp {
                        typ: ShuntOpTyp::Fun(fun),
                        loc: tok.loc.clone(),
                    });
                    pending_call = Some(tok.loc.clone());
                }
                None => {
                    let suggestion = stdlib::most_similar(idents, tok.loc.get())
                        .map(|(name, ident)| (name, ident.kind()));
                    return Err(ParseErr {
                        typ: ParseErrTyp::UnknownIdent { suggestion },
                        loc: tok.loc,
                    });
                }
            },

            TokTyp::Op(op) if expect_operand => match op {
                // prefix operators
                OpTok::Minus => shunt.ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(OperatorTyp::Neg),
                    loc: tok.loc.clone(),
                }),
                OpTok::Plus => {}
                OpTok::Star | OpTok::Slash | OpTok::Pow => {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ExpectedOperand,
                        loc: tok.loc,
                    })
                }
            },

            TokTyp::Op(op) => {
                let o1 = OperatorTyp::binary(op);
                while let Some(o2) = shunt.ops.last() {
                    let ShuntOpTyp::Operator(o2_typ) = o2.typ else {
                        break;
                    };
                    if (o2_typ.precedence() > o1.precedence())
                        || ((o1.precedence() == o2_typ.precedence())
                            && (o1.associativity() == Associativity::Left))
                    {
                        let loc = o2.loc.clone();
                        shunt.ops.pop();
                        shunt.apply(o2_typ, &loc)?;
                    } else {
                        break;
                    }
                }
                shunt.ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc.clone(),
                });
                expect_operand = true;
            }

            TokTyp::Comma => {
                if expect_operand {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ExpectedOperand,
                        loc: tok.loc,
                    });
                }
                shunt.reduce_to_paren()?;
                match shunt.ops.last_mut() {
                    Some(ShuntOp {
                        typ: ShuntOpTyp::OpenParen { call: true, args },
                        ..
                    }) => *args += 1,
                    _ => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::MisplacedComma,
                            loc: tok.loc,
                        })
                    }
                }
                expect_operand = true;
            }

            TokTyp::OpenParen => {
                let call = matches!(
                    shunt.ops.last(),
                    Some(ShuntOp {
                        typ: ShuntOpTyp::Fun(_),
                        ..
                    })
                ) && last.as_ref().is_some_and(|t| t.typ == TokTyp::Ident);
                shunt.ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen { call, args: 1 },
                    loc: tok.loc.clone(),
                });
            }

            TokTyp::CloseParen => {
                let empty_call = matches!(
                    shunt.ops.last(),
                    Some(ShuntOp {
                        typ: ShuntOpTyp::OpenParen { call: true, .. },
                        ..
                    })
                ) && last.as_ref().is_some_and(|t| t.typ == TokTyp::OpenParen);

                if expect_operand && !empty_call {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ExpectedOperand,
                        loc: tok.loc,
                    });
                }

                shunt.reduce_to_paren()?;
                let Some(ShuntOp {
                    typ: ShuntOpTyp::OpenParen { call, args },
                    ..
                }) = shunt.ops.pop()
                else {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ParenMismatch,
                        loc: tok.loc,
                    });
                };

                // handle functions
                if call {
                    let args = if empty_call { 0 } else { args };
                    if let Some(ShuntOp {
                        typ: ShuntOpTyp::Fun(fun),
                        loc,
                    }) = shunt.ops.pop()
                    {
                        shunt.call(fun, args, &loc)?;
                    }
                }
                expect_operand = false;
            }

            TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => unreachable!("unsupported token survived until parsing"),
        }

        last = Some(tok);
    }

    let end = SubStr::end(src);
    if last.is_none() {
        return Err(ParseErr {
            typ: ParseErrTyp::Empty,
            loc: end,
        });
    }

    if let Some(loc) = pending_call {
        return Err(ParseErr {
            typ: ParseErrTyp::ExpectedCall,
            loc,
        });
    }
    if expect_operand {
        return Err(ParseErr {
            typ: ParseErrTyp::ExpectedOperand,
            loc: end,
        });
    }

    while let Some(op) = shunt.ops.pop() {
        match op.typ {
            ShuntOpTyp::Operator(typ) => shunt.apply(typ, &op.loc)?,
            ShuntOpTyp::OpenParen { .. } | ShuntOpTyp::Fun(_) => {
                return Err(ParseErr {
                    typ: ParseErrTyp::ParenMismatch,
                    loc: op.loc,
                });
            }
        }
    }

    let (expr, _) = shunt.out.pop().ok_or(ParseErr {
        typ: ParseErrTyp::Empty,
        loc: end.clone(),
    })?;
    if !shunt.out.is_empty() {
        return Err(ParseErr {
            typ: ParseErrTyp::ExpectedOperator,
            loc: end,
        });
    }

    debug!("parsed {expr}");
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::{Const, Fun, Var},
        parse_str,
    };

    fn err(src: &str) -> ParseErr {
        parse_str(src).unwrap_err()
    }

    #[test]
    fn shapes() {
        let x = || Box::new(Expr::Var(Var::X));
        let y = || Box::new(Expr::Var(Var::Y));
        let two = || Box::new(Expr::Num(2.0));

        assert_eq!(
            parse_str("x**2 + y**2").unwrap(),
            Expr::Add(Box::new(Expr::Pow(x(), two())), Box::new(Expr::Pow(y(), two())))
        );
        assert_eq!(
            parse_str("-x^2").unwrap(),
            Expr::Neg(Box::new(Expr::Pow(x(), two())))
        );
        assert_eq!(
            parse_str("x^-2").unwrap(),
            Expr::Pow(x(), Box::new(Expr::Neg(two())))
        );
        assert_eq!(
            parse_str("+cos(pi*y)").unwrap(),
            Expr::call(
                Fun::Cos,
                Expr::Mul(Box::new(Expr::Const(Const::Pi)), y())
            )
        );
        assert_eq!(parse_str("((x))").unwrap(), Expr::Var(Var::X));
    }

    #[test]
    fn nested_calls() {
        let e = parse_str("log(sqrt(x*y), 2) - atan(exp(y))").unwrap();
        assert_eq!(e.to_string(), "ln(sqrt(x*y))/ln(2) - atan(exp(y))");
    }

    #[test]
    fn display_reparses() {
        for src in ["x - (y - 1)", "(-x)^2", "2^3^2", "(2^3)^2", "x/(y*2)", "-(x + y)"] {
            let e = parse_str(src).unwrap();
            assert_eq!(parse_str(&e.to_string()).unwrap(), e, "{src}");
        }
    }

    #[test]
    fn rejects_doubled_operators() {
        let e = err("x^^2");
        assert!(matches!(e.typ, ParseErrTyp::ExpectedOperand));
        assert_eq!(e.loc.start(), 2);

        assert!(matches!(err("x***2").typ, ParseErrTyp::ExpectedOperand));
        assert!(matches!(err("x*").typ, ParseErrTyp::ExpectedOperand));
    }

    #[test]
    fn rejects_foreign_code() {
        let e = err("import os");
        assert!(matches!(e.typ, ParseErrTyp::UnknownIdent { .. }));
        assert_eq!(e.loc.get(), "import");

        assert!(matches!(
            err("__import__('os')").typ,
            ParseErrTyp::LexErr(LexErrTyp::InvalidChar)
        ));
        assert!(matches!(err("z + 1").typ, ParseErrTyp::UnknownIdent { .. }));
    }

    #[test]
    fn rejects_implicit_multiplication() {
        let e = err("2x");
        assert!(matches!(e.typ, ParseErrTyp::ExpectedOperator));
        assert_eq!(e.loc.get(), "x");
        assert!(matches!(err("x (y)").typ, ParseErrTyp::ExpectedOperator));
        assert!(matches!(err("x y").typ, ParseErrTyp::ExpectedOperator));
    }

    #[test]
    fn function_calls() {
        assert!(matches!(err("sin x").typ, ParseErrTyp::ExpectedCall));
        assert!(matches!(err("sin").typ, ParseErrTyp::ExpectedCall));
        assert!(matches!(
            err("sin()").typ,
            ParseErrTyp::Arity { found: 0, .. }
        ));
        assert!(matches!(
            err("sin(x, y)").typ,
            ParseErrTyp::Arity { found: 2, .. }
        ));
        assert!(matches!(
            err("log(x, y, 2)").typ,
            ParseErrTyp::Arity {
                expected: (1, 2),
                found: 3,
                ..
            }
        ));
        assert!(matches!(err("x, y").typ, ParseErrTyp::MisplacedComma));
        assert!(matches!(err("(x, y)").typ, ParseErrTyp::MisplacedComma));
    }

    #[test]
    fn parens_and_empties() {
        assert!(matches!(err("(x + y").typ, ParseErrTyp::ParenMismatch));
        assert!(matches!(err("x + y)").typ, ParseErrTyp::ParenMismatch));
        assert!(matches!(err("()").typ, ParseErrTyp::ExpectedOperand));
        assert!(matches!(err("").typ, ParseErrTyp::Empty));
        assert!(matches!(err("   ").typ, ParseErrTyp::Empty));
    }

    #[test]
    fn numbers() {
        assert!(matches!(err("1.2.3").typ, ParseErrTyp::ParseNum(_)));
        assert!(matches!(err(&"9".repeat(400)).typ, ParseErrTyp::NumOutOfRange));
        assert_eq!(parse_str(".5").unwrap(), Expr::Num(0.5));
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(parse_str("1e-3").unwrap(), Expr::Num(1e-3));
        assert_eq!(parse_str("2.5E3").unwrap(), Expr::Num(2500.0));
        assert_eq!(parse_str("4e+2").unwrap(), Expr::Num(400.0));
        assert_eq!(
            parse_str("2*e").unwrap(),
            Expr::Mul(Box::new(Expr::Num(2.0)), Box::new(Expr::Const(Const::E)))
        );
        // no digits after the e, so this is 2 followed by the constant
        assert!(matches!(err("2e").typ, ParseErrTyp::ExpectedOperator));
        assert!(matches!(err("1e999").typ, ParseErrTyp::NumOutOfRange));
    }

    #[test]
    fn depth_is_limited() {
        let deep = ["-".repeat(20_000) + "x", "x".to_string() + &"+x".repeat(50_000)];
        for src in deep {
            assert!(matches!(
                err(&src).typ,
                ParseErrTyp::TooDeep { max: MAX_DEPTH }
            ));
        }
        assert!(matches!(
            err(&("sin(".repeat(MAX_DEPTH) + "x" + &")".repeat(MAX_DEPTH))).typ,
            ParseErrTyp::TooDeep { .. }
        ));

        // a chain of n terms is n levels deep
        let src = "x".to_string() + &"+x".repeat(MAX_DEPTH - 1);
        assert!(parse_str(&src).is_ok());
        let src = "x".to_string() + &"+x".repeat(MAX_DEPTH);
        assert!(matches!(err(&src).typ, ParseErrTyp::TooDeep { .. }));
    }
}

// SPDX: CC0-1.0

use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    /// One character wide span just past the end of the source.
    #[inline]
    pub fn end(src: Arc<String>) -> Self {
        let start = src.len();
        Self::new(src, start, 1)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        let end = (self.start + self.len).min(self.src.len());
        let start = self.start.min(end);
        &self.src[start..end]
    }

    pub fn shift_right(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpTok {
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OpTok),
    Comma,
    OpenParen,
    CloseParen,

    // unsupported tokens
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident
            | Self::Number
            | Self::Op(_)
            | Self::Comma
            | Self::OpenParen
            | Self::CloseParen => false,

            // unsupported tokens
            Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            has_errored: false,
        }
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(self.src)
    }

    pub fn trim_whitespace(&mut self) {
        while self.cur.next_if(|(_, chr)| chr.is_ascii_whitespace()).is_some() {}
    }

    fn span(&self, start: usize, len: usize) -> SubStr {
        SubStr::new(Arc::clone(self.src), start, len)
    }

    pub fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Op(OpTok::Plus),
            '-' => TokTyp::Op(OpTok::Minus),
            '/' => TokTyp::Op(OpTok::Slash),
            '^' => TokTyp::Op(OpTok::Pow),
            ',' => TokTyp::Comma,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next(); // consume because we only peeked
        Some(Tok {
            typ,
            loc: self.span(idx, chr.len_utf8()),
        })
    }

    /// `*` is multiplication, `**` is exponentiation.
    pub fn consume_star(&mut self) -> Option<Tok> {
        let (idx, _) = self.cur.next_if(|(_, chr)| *chr == '*')?;
        if self.cur.next_if(|(_, chr)| *chr == '*').is_some() {
            Some(Tok {
                typ: TokTyp::Op(OpTok::Pow),
                loc: self.span(idx, 2),
            })
        } else {
            Some(Tok {
                typ: TokTyp::Op(OpTok::Star),
                loc: self.span(idx, 1),
            })
        }
    }

    pub fn consume_by<P>(&mut self, next_idx: usize, typ: TokTyp, predicate: P) -> Option<Tok>
    where
        P: Fn(char) -> bool,
    {
        let mut tok = Tok {
            typ,
            loc: self.span(next_idx, 0),
        };
        while self.cur.next_if(|(_, chr)| predicate(*chr)).is_some() {
            // predicates only accept ascii
            tok.loc.shift_right(1);
        }
        if tok.loc.is_empty() {
            // there is no next token of type `typ`
            None
        } else {
            Some(tok)
        }
    }
}

impl Lexer<'_> {
    /// Extend a number token over an exponent like `e-3`. Nothing is
    /// consumed unless a digit follows, so `2e` stays `2` then `e`.
    fn consume_exponent(&mut self, tok: &mut Tok) {
        let mut ahead = self.cur.clone();
        if ahead.next_if(|&(_, chr)| matches!(chr, 'e' | 'E')).is_none() {
            return;
        }
        ahead.next_if(|&(_, chr)| matches!(chr, '+' | '-'));
        if ahead.next_if(|(_, chr)| chr.is_ascii_digit()).is_none() {
            return;
        }
        while ahead.next_if(|(_, chr)| chr.is_ascii_digit()).is_some() {}

        let end = ahead.peek().map_or(self.src.len(), |&(idx, _)| idx);
        tok.loc.shift_right(end - (tok.loc.start() + tok.loc.len()));
        self.cur = ahead;
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        let ret = if let Some(tok) = self.consume_unambiguous() {
            tok
        } else if let Some(tok) = self.consume_star() {
            tok
        } else if let Some(tok) =
            // parse identifiers
            self.consume_by(next_idx, TokTyp::Ident, |chr| chr.is_ascii_alphabetic())
        {
            tok
        } else if let Some(mut tok) = self.consume_by(next_idx, TokTyp::Number, |chr| {
            chr.is_ascii_digit() || chr == '.'
        }) {
            // parse numbers
            self.consume_exponent(&mut tok);
            tok
        } else {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                loc: self.span(next_idx, next_chr.len_utf8()),
            }));
        };

        if ret.typ.is_unsupported() {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::Unsupported(ret.typ),
                loc: ret.loc,
            }));
        }
        Some(Ok(ret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typs(src: &str) -> Vec<Result<TokTyp, LexErrTyp>> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src)
            .map(|tok| tok.map(|tok| tok.typ).map_err(|err| err.typ))
            .collect()
    }

    #[test]
    fn double_star_is_pow() {
        use OpTok::*;
        assert_eq!(
            typs("x**2*y^3"),
            vec![
                Ok(TokTyp::Ident),
                Ok(TokTyp::Op(Pow)),
                Ok(TokTyp::Number),
                Ok(TokTyp::Op(Star)),
                Ok(TokTyp::Ident),
                Ok(TokTyp::Op(Pow)),
                Ok(TokTyp::Number),
            ]
        );
    }

    #[test]
    fn spans() {
        let src = Arc::new(String::from("  sin(x1.5)"));
        let toks: Vec<Tok> = Lexer::new(&src).map(Result::unwrap).collect();
        let text: Vec<&str> = toks.iter().map(|tok| tok.loc.get()).collect();
        assert_eq!(text, ["sin", "(", "x", "1.5", ")"]);
        assert_eq!(toks[0].loc.start(), 2);
    }

    #[test]
    fn stops_after_error() {
        assert_eq!(
            typs("x = 1"),
            vec![
                Ok(TokTyp::Ident),
                Err(LexErrTyp::Unsupported(TokTyp::XEqual)),
            ]
        );
        assert_eq!(typs("x; y"), vec![Ok(TokTyp::Ident), Err(LexErrTyp::InvalidChar)]);
    }

    #[test]
    fn exponents() {
        let src = Arc::new(String::from("1e-3*2.5E3+4e+2 2e x"));
        let toks: Vec<Tok> = Lexer::new(&src).map(Result::unwrap).collect();
        let text: Vec<&str> = toks.iter().map(|tok| tok.loc.get()).collect();
        assert_eq!(text, ["1e-3", "*", "2.5E3", "+", "4e+2", "2", "e", "x"]);
        assert_eq!(toks[6].typ, TokTyp::Ident);
        assert_eq!(
            typs("3e+"),
            vec![
                Ok(TokTyp::Number),
                Ok(TokTyp::Ident),
                Ok(TokTyp::Op(OpTok::Plus)),
            ]
        );
    }

    #[test]
    fn only_ascii_whitespace() {
        let src = Arc::new(String::from("x +\u{3000}y"));
        let err = Lexer::new(&src).nth(2).unwrap().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::InvalidChar);
        assert_eq!(err.loc.start(), 3);
        assert_eq!(err.loc.get(), "\u{3000}");
    }

    #[test]
    fn non_ascii_is_invalid() {
        let src = Arc::new(String::from("x·y"));
        let err = Lexer::new(&src).nth(1).unwrap().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::InvalidChar);
        assert_eq!(err.loc.get(), "·");
    }
}

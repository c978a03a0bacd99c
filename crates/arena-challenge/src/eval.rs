//! Exact arithmetic evaluation of challenge expressions.
//!
//! Grammar (standard precedence, left-associative):
//!
//! ```text
//! expr   := term   (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := integer | '(' expr ')' | '-' factor
//! ```
//!
//! Division is real-valued: `7 / 2` is `7/2`, not `3`. Values are carried as
//! reduced rationals over `i128`, so "is the result an integer" is an exact
//! question with no floating-point rounding involved.

use std::fmt;

// ---------------------------------------------------------------------------
// Ratio
// ---------------------------------------------------------------------------

/// Reduced rational number. Invariant: `den > 0` and `gcd(|num|, den) == 1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ratio {
    num: i128,
    den: i128,
}

impl Ratio {
    pub const ZERO: Ratio = Ratio { num: 0, den: 1 };

    pub fn integer(n: i128) -> Self {
        Self { num: n, den: 1 }
    }

    fn new(num: i128, den: i128) -> Result<Self, EvalError> {
        if den == 0 {
            return Err(EvalError::DivisionByZero);
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i128;
        let (mut n, mut d) = (num / g, den / g);
        if d < 0 {
            n = n.checked_neg().ok_or(EvalError::Overflow)?;
            d = d.checked_neg().ok_or(EvalError::Overflow)?;
        }
        Ok(Self { num: n, den: d })
    }

    pub fn numer(&self) -> i128 {
        self.num
    }

    pub fn denom(&self) -> i128 {
        self.den
    }

    /// `Some(n)` when the value is a whole number.
    pub fn to_integer(&self) -> Option<i128> {
        (self.den == 1).then_some(self.num)
    }

    fn add(self, rhs: Self) -> Result<Self, EvalError> {
        let n = mul(self.num, rhs.den)?
            .checked_add(mul(rhs.num, self.den)?)
            .ok_or(EvalError::Overflow)?;
        Self::new(n, mul(self.den, rhs.den)?)
    }

    fn sub(self, rhs: Self) -> Result<Self, EvalError> {
        let n = mul(self.num, rhs.den)?
            .checked_sub(mul(rhs.num, self.den)?)
            .ok_or(EvalError::Overflow)?;
        Self::new(n, mul(self.den, rhs.den)?)
    }

    fn mul(self, rhs: Self) -> Result<Self, EvalError> {
        Self::new(mul(self.num, rhs.num)?, mul(self.den, rhs.den)?)
    }

    fn div(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.num == 0 {
            return Err(EvalError::DivisionByZero);
        }
        Self::new(mul(self.num, rhs.den)?, mul(self.den, rhs.num)?)
    }

    fn neg(self) -> Result<Self, EvalError> {
        Ok(Self {
            num: self.num.checked_neg().ok_or(EvalError::Overflow)?,
            den: self.den,
        })
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn mul(a: i128, b: i128) -> Result<i128, EvalError> {
    a.checked_mul(b).ok_or(EvalError::Overflow)
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    if a == 0 {
        1
    } else {
        a
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Input contained no tokens.
    Empty,
    /// A character outside the expression alphabet.
    UnexpectedChar { pos: usize, ch: char },
    /// A token that cannot appear at this position.
    UnexpectedToken { pos: usize },
    /// Input ended in the middle of an expression.
    UnexpectedEnd,
    /// Input continued after a complete expression.
    TrailingInput { pos: usize },
    DivisionByZero,
    Overflow,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty expression"),
            Self::UnexpectedChar { pos, ch } => {
                write!(f, "unexpected character '{ch}' at byte {pos}")
            }
            Self::UnexpectedToken { pos } => write!(f, "unexpected token at byte {pos}"),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::TrailingInput { pos } => write!(f, "trailing input at byte {pos}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl std::error::Error for EvalError {}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Tok {
    Num(i128),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<(usize, Tok)>, EvalError> {
    let mut out = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let tok = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' => {
                let start = i;
                let mut n: i128 = 0;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    n = n
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(i128::from(bytes[i] - b'0')))
                        .ok_or(EvalError::Overflow)?;
                    i += 1;
                }
                out.push((start, Tok::Num(n)));
                continue;
            }
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'*' => Tok::Star,
            b'/' => Tok::Slash,
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            _ => {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(EvalError::UnexpectedChar { pos: i, ch });
            }
        };
        out.push((i, tok));
        i += 1;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    toks: Vec<(usize, Tok)>,
    at: usize,
}

impl Parser {
    fn peek(&self) -> Option<Tok> {
        self.toks.get(self.at).map(|(_, t)| *t)
    }

    fn pos(&self) -> usize {
        self.toks.get(self.at).map(|(p, _)| *p).unwrap_or(0)
    }

    fn expr(&mut self) -> Result<Ratio, EvalError> {
        let mut acc = self.term()?;
        while let Some(t @ (Tok::Plus | Tok::Minus)) = self.peek() {
            self.at += 1;
            let rhs = self.term()?;
            acc = if t == Tok::Plus { acc.add(rhs)? } else { acc.sub(rhs)? };
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Ratio, EvalError> {
        let mut acc = self.factor()?;
        while let Some(t @ (Tok::Star | Tok::Slash)) = self.peek() {
            self.at += 1;
            let rhs = self.factor()?;
            acc = if t == Tok::Star { acc.mul(rhs)? } else { acc.div(rhs)? };
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<Ratio, EvalError> {
        let pos = self.pos();
        match self.peek() {
            None => Err(EvalError::UnexpectedEnd),
            Some(Tok::Num(n)) => {
                self.at += 1;
                Ok(Ratio::integer(n))
            }
            Some(Tok::Minus) => {
                self.at += 1;
                self.factor()?.neg()
            }
            Some(Tok::LParen) => {
                self.at += 1;
                let inner = self.expr()?;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.at += 1;
                        Ok(inner)
                    }
                    Some(_) => Err(EvalError::UnexpectedToken { pos: self.pos() }),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(_) => Err(EvalError::UnexpectedToken { pos }),
        }
    }
}

/// Evaluate an arithmetic expression exactly.
pub fn evaluate(src: &str) -> Result<Ratio, EvalError> {
    let toks = tokenize(src)?;
    if toks.is_empty() {
        return Err(EvalError::Empty);
    }
    let mut p = Parser { toks, at: 0 };
    let v = p.expr()?;
    if p.at < p.toks.len() {
        return Err(EvalError::TrailingInput { pos: p.pos() });
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(src: &str) -> Option<i128> {
        evaluate(src).unwrap().to_integer()
    }

    #[test]
    fn precedence_is_standard() {
        assert_eq!(int("2 + 3 * 4"), Some(14));
        assert_eq!(int("(2 + 3) * 4"), Some(20));
        assert_eq!(int("20 - 4 - 3"), Some(13));
        assert_eq!(int("18 / 3 / 2"), Some(3));
        assert_eq!(int("(7 - 2 * 3 + 10)"), Some(11));
    }

    #[test]
    fn division_is_real_valued() {
        let v = evaluate("7 / 2").unwrap();
        assert_eq!(v.to_integer(), None);
        assert_eq!((v.numer(), v.denom()), (7, 2));
        // Fractional intermediate that comes back to a whole number.
        assert_eq!(int("7 / 3 * 3"), Some(7));
        assert_eq!(int("1 / 3 + 2 / 3"), Some(1));
    }

    #[test]
    fn negative_results_are_representable() {
        assert_eq!(int("3 - 10"), Some(-7));
        assert_eq!(int("-4 * 2"), Some(-8));
        assert_eq!(evaluate("1 - 7 / 2").unwrap().to_string(), "-5/2");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(evaluate("5 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("5 / (3 - 3)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert_eq!(evaluate(""), Err(EvalError::Empty));
        assert_eq!(evaluate("   "), Err(EvalError::Empty));
        assert_eq!(evaluate("2 +"), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("(2 + 3"), Err(EvalError::UnexpectedEnd));
        assert_eq!(evaluate("2 3"), Err(EvalError::TrailingInput { pos: 2 }));
        assert_eq!(evaluate("2 ) 3"), Err(EvalError::TrailingInput { pos: 2 }));
        assert_eq!(evaluate("* 2"), Err(EvalError::UnexpectedToken { pos: 0 }));
        assert_eq!(
            evaluate("2 x 3"),
            Err(EvalError::UnexpectedChar { pos: 2, ch: 'x' })
        );
    }

    #[test]
    fn oversized_literal_overflows_instead_of_wrapping() {
        let big = "9".repeat(60);
        assert_eq!(evaluate(&big), Err(EvalError::Overflow));
    }
}

//! The literal syntax shared by default values in DC source and by the text
//! form of field data.
//!
//! ```text
//! Literal := ('-' | '+')? Number | Bool | Rawchar | Quote | '[]'
//!          | '(' (Element (',' Element)*)? ')'
//! Element := (Identifier '=')? Literal
//! ```

use std::fmt;

use crate::{
    error::DcError,
    lexer::Lexer,
    token::{Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number text as lexed, in any radix, without its sign.
    Number { text: String, negative: bool },
    Bool(bool),
    Char(u8),
    Str(Vec<u8>),
    List(Vec<Element>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name:  Option<String>,
    pub value: Literal,
}

impl Literal {
    pub fn describe(&self) -> String {
        match self {
            Literal::Number { text, negative: true } => format!("the number -{}", text),
            Literal::Number { text, .. } => format!("the number {}", text),
            Literal::Bool(b) => format!("the bool {}", b),
            Literal::Char(_) => "a character constant".to_owned(),
            Literal::Str(_) => "a quoted string".to_owned(),
            Literal::List(_) => "a value list".to_owned(),
        }
    }

    /// The integer value of a number without a fractional part. Booleans
    /// count as 0 and 1.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Literal::Bool(b) => Some(*b as i128),
            Literal::Number { text, negative } => {
                let magnitude = parse_unsigned(text)? as i128;
                Some(if *negative { -magnitude } else { magnitude })
            }
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Number { text, negative } => {
                let magnitude = match parse_unsigned(text) {
                    Some(int) => int as f64,
                    None if is_decimal(text) => text.parse::<f64>().ok()?,
                    None => return None,
                };
                Some(if *negative { -magnitude } else { magnitude })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn is_decimal(text: &str) -> bool {
    !text.is_empty()
        && text.chars().any(|c| c.is_ascii_digit())
        && text.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Parses integer number text in the lexer's radixes: `0x` hex, `0b`
/// binary, a leading `0` octal, decimal otherwise.
fn parse_unsigned(text: &str) -> Option<u64> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        (bin, 2)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// A malformed literal. `found` is the kind of the offending token, so a
/// caller sharing the lexer can tell lex errors and end of input apart.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralError {
    pub msg:   String,
    pub pos:   usize,
    pub found: TokenKind,
}

impl LiteralError {
    fn unexpected(token: &Token, expected: &str) -> LiteralError {
        let msg = match token.kind {
            TokenKind::Error => token.text.clone(),
            TokenKind::Eof => format!("expected {} but reached the end of input", expected),
            _ => format!("expected {} but found {}", expected, token),
        };
        LiteralError {
            msg,
            pos: token.pos,
            found: token.kind,
        }
    }
}

impl From<LiteralError> for DcError {
    fn from(err: LiteralError) -> DcError {
        DcError::syntax(err.msg, err.pos)
    }
}

/// Reads one literal from `lexer`.
pub fn parse_literal(lexer: &mut Lexer) -> Result<Literal, LiteralError> {
    let token = lexer.next_token();
    match token.kind {
        TokenKind::Operator if token.text == "-" || token.text == "+" => {
            let number = lexer.next_token();
            if number.kind != TokenKind::Number {
                return Err(LiteralError::unexpected(&number, "a number after the sign"));
            }
            Ok(Literal::Number {
                text:     number.text,
                negative: token.text == "-",
            })
        }
        TokenKind::Number => Ok(Literal::Number {
            text:     token.text,
            negative: false,
        }),
        TokenKind::Bool => Ok(Literal::Bool(token.text == "true")),
        TokenKind::Quote => Ok(Literal::Str(unescape(&token)?)),
        TokenKind::Rawchar => {
            let bytes = unescape(&token)?;
            match bytes.as_slice() {
                [c] => Ok(Literal::Char(*c)),
                _ => Err(LiteralError {
                    msg:   format!("character constant {} must hold exactly one byte", token.text),
                    pos:   token.pos,
                    found: token.kind,
                }),
            }
        }
        TokenKind::VarArray => Ok(Literal::List(Vec::new())),
        TokenKind::LeftParen => {
            let elements = parse_elements(lexer, TokenKind::RightParen)?;
            Ok(Literal::List(elements))
        }
        _ => Err(LiteralError::unexpected(&token, "a value")),
    }
}

/// Reads comma separated elements up to and including `close`.
pub fn parse_elements(lexer: &mut Lexer, close: TokenKind) -> Result<Vec<Element>, LiteralError> {
    let mut elements = Vec::new();
    if lexer.peek_token().is(close) {
        lexer.next_token();
        return Ok(elements);
    }
    loop {
        elements.push(parse_element(lexer)?);
        let token = lexer.next_token();
        match token.kind {
            TokenKind::Separator => continue,
            kind if kind == close => return Ok(elements),
            _ => return Err(LiteralError::unexpected(&token, &format!("',' or '{}'", close))),
        }
    }
}

fn parse_element(lexer: &mut Lexer) -> Result<Element, LiteralError> {
    if !lexer.peek_token().is(TokenKind::Identifier) {
        return Ok(Element {
            name:  None,
            value: parse_literal(lexer)?,
        });
    }
    let name = lexer.next_token();
    let assign = lexer.next_token();
    if assign.kind != TokenKind::Assignment {
        return Err(LiteralError::unexpected(&assign, &format!("'=' after '{}'", name.text)));
    }
    Ok(Element {
        name:  Some(name.text),
        value: parse_literal(lexer)?,
    })
}

/// Parses a whole text as a comma separated element list.
pub fn parse_text(text: &str) -> Result<Vec<Element>, LiteralError> {
    let mut lexer = Lexer::new(text);
    if lexer.peek_token().is(TokenKind::Eof) {
        return Ok(Vec::new());
    }
    parse_elements(&mut lexer, TokenKind::Eof)
}

/// Strips the quotes from a Quote or Rawchar token and resolves escapes.
pub fn unescape(token: &Token) -> Result<Vec<u8>, LiteralError> {
    let fail = |msg: String| LiteralError {
        msg,
        pos: token.pos,
        found: token.kind,
    };

    let text = token.text.as_bytes();
    let inner = text
        .get(1..text.len().saturating_sub(1))
        .ok_or_else(|| fail(format!("malformed quoted literal {}", token.text)))?;

    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        let b = inner[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(&escape) = inner.get(i) else {
            return Err(fail("trailing backslash in quoted literal".to_owned()));
        };
        i += 1;
        match escape {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'0' => out.push(0),
            b'\\' | b'"' | b'\'' => out.push(escape),
            b'x' => {
                let hex = inner
                    .get(i..i + 2)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| fail("\\x must be followed by two hex digits".to_owned()))?;
                out.push(hex);
                i += 2;
            }
            other => {
                return Err(fail(format!("unknown escape sequence '\\{}'", other as char)));
            }
        }
    }
    Ok(out)
}

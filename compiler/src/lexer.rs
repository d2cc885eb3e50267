use tracing::trace;

use crate::token::{Token, TokenKind};

/// What the next scan expects. Fixed array sizes `[N]` are scanned as three
/// tokens with nothing allowed in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Any,
    ArrayLength,
    ArrayClose,
}

/// A pull-based tokenizer for DC source text with one token of lookahead.
///
/// Tokens are scanned on demand by [`Lexer::next_token`] and
/// [`Lexer::peek_token`]. The sequence always ends with exactly one `Eof` or
/// `Error` token; every call after that returns `Eof`.
pub struct Lexer<'a> {
    input:       &'a str,
    pos:         usize,
    start:       usize,
    last_pos:    usize,
    paren_depth:  usize,
    curly_depth:  usize,
    square_depth: usize,
    mode:        Mode,
    peeked:      Option<Token>,
    finished:    bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input,
            pos:         0,
            start:       0,
            last_pos:    0,
            paren_depth:  0,
            curly_depth:  0,
            square_depth: 0,
            mode:        Mode::Any,
            peeked:      None,
            finished:    false,
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn next_token(&mut self) -> Token {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan(),
        };
        self.last_pos = token.pos;
        token
    }

    pub fn peek_token(&mut self) -> &Token {
        if self.peeked.is_none() {
            let token = self.scan();
            self.peeked = Some(token);
        }
        // Filled just above.
        self.peeked.get_or_insert_with(|| Token::new(TokenKind::Eof, 0, ""))
    }

    /// 1-based line of the most recent token returned by `next_token`.
    /// Peeking does not move it.
    pub fn line_number(&self) -> usize {
        line_of(self.input, self.last_pos)
    }

    fn scan(&mut self) -> Token {
        if self.finished {
            return Token::new(TokenKind::Eof, self.input.len(), "");
        }

        let token = match self.mode {
            Mode::ArrayLength => {
                self.mode = Mode::ArrayClose;
                self.lex_number()
            }
            Mode::ArrayClose => {
                self.mode = Mode::Any;
                if self.peek() == Some(']') {
                    self.bump();
                    self.square_depth -= 1;
                    self.emit(TokenKind::RightSquare)
                } else {
                    self.error("found opening '[' without matching ']' for array type definition.")
                }
            }
            Mode::Any => self.lex_any(),
        };

        if token.is_terminal() {
            self.finished = true;
        }
        trace!(kind = ?token.kind, pos = token.pos, text = %token.text, "token");
        token
    }

    fn lex_any(&mut self) -> Token {
        loop {
            self.start = self.pos;
            let Some(c) = self.bump() else {
                if self.paren_depth > 0 {
                    return self.error("unclosed left paren");
                }
                if self.curly_depth > 0 {
                    return self.error("unclosed left curly");
                }
                if self.square_depth > 0 {
                    return self.error("unclosed left square");
                }
                return self.emit(TokenKind::Eof);
            };

            let token = match c {
                ' ' | '\t' | '\r' | '\n' => continue,

                '0'..='9' | '.' => {
                    self.pos = self.start;
                    self.lex_number()
                }
                c if is_alphanumeric(c) => self.lex_identifier(),

                '/' if self.peek() == Some('/') => {
                    match self.input[self.pos..].find(['\r', '\n']) {
                        Some(i) => self.pos += i + 1,
                        None => self.pos = self.input.len(),
                    }
                    continue;
                }
                '/' if self.peek() == Some('*') => {
                    self.bump();
                    match self.input[self.pos..].find("*/") {
                        Some(i) => self.pos += i + 2,
                        None => return self.error("unclosed block comment"),
                    }
                    continue;
                }

                '=' => self.emit(TokenKind::Assignment),
                '+' | '-' | '*' | '/' | '%' => self.emit(TokenKind::Operator),
                ':' => self.emit(TokenKind::Composition),
                ',' => self.emit(TokenKind::Separator),
                ';' => self.emit(TokenKind::Endline),

                '(' => {
                    self.paren_depth += 1;
                    self.emit(TokenKind::LeftParen)
                }
                ')' => {
                    if self.paren_depth == 0 {
                        return self.error(format!("unexpected right paren {}", unicode(c)));
                    }
                    self.paren_depth -= 1;
                    self.emit(TokenKind::RightParen)
                }
                '{' => {
                    self.curly_depth += 1;
                    self.emit(TokenKind::LeftCurly)
                }
                '}' => {
                    if self.curly_depth == 0 {
                        return self.error(format!("unexpected right curly {}", unicode(c)));
                    }
                    self.curly_depth -= 1;
                    self.emit(TokenKind::RightCurly)
                }

                ']' => return self.error(format!("unexpected right square {}", unicode(c))),

                '"' => self.lex_quoted('"', TokenKind::Quote, "unterminated string"),
                '\'' => self.lex_quoted('\'', TokenKind::Rawchar, "unterminated character constant"),

                '[' => match self.peek() {
                    Some('0'..='9' | '.') => {
                        self.square_depth += 1;
                        self.mode = Mode::ArrayLength;
                        self.emit(TokenKind::LeftSquare)
                    }
                    Some(']') => {
                        self.bump();
                        self.emit(TokenKind::VarArray)
                    }
                    Some(next) => {
                        self.error(format!("unexpected character: {}, following '['", unicode(next)))
                    }
                    None => self.error("unexpected end of input following '['"),
                },

                c => self.error(format!("unexpected character: {}", unicode(c))),
            };
            return token;
        }
    }

    fn lex_number(&mut self) -> Token {
        self.start = self.pos;

        // A leading zero only makes octal when an octal digit follows, so
        // `0` and `0.5` stay decimal.
        let (prefix, radix) = if self.accept(|c| c == '0') {
            if self.accept(|c| c == 'x' || c == 'X') {
                ("0x", 16)
            } else if self.accept(|c| c == 'b' || c == 'B') {
                ("0b", 2)
            } else if self.peek().is_some_and(|c| c.is_digit(8)) {
                ("0", 8)
            } else {
                ("", 10)
            }
        } else {
            ("", 10)
        };

        while self.accept(|c| c.is_digit(radix)) {}

        if self.accept(|c| c == '.') {
            if radix != 10 {
                return self.error(format!(
                    "non-decimal number (starting with '{}') cannot contain a decimal point.",
                    prefix
                ));
            }
            while self.accept(|c| c.is_ascii_digit()) {}
        }

        if self.peek().is_some_and(is_alphanumeric) {
            self.bump();
            let text = &self.input[self.start..self.pos];
            return self.error(format!("bad number syntax: {:?}", text));
        }

        self.emit(TokenKind::Number)
    }

    fn lex_identifier(&mut self) -> Token {
        while self.accept(is_alphanumeric) {}

        if let Some(c) = self.peek() {
            if !is_terminator(c) {
                return self.error(format!("bad character in identifier {}", unicode(c)));
            }
        }

        let word = &self.input[self.start..self.pos];
        let kind = match TokenKind::reserved(word) {
            Some(kind) => kind,
            None if word == "true" || word == "false" => TokenKind::Bool,
            None => TokenKind::Identifier,
        };
        self.emit(kind)
    }

    /// Scans a string or character constant. The opening quote is already
    /// consumed; the token text keeps both quotes.
    fn lex_quoted(&mut self, quote: char, kind: TokenKind, unterminated: &str) -> Token {
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    None | Some('\n') => return self.error(unterminated),
                    Some(_) => {}
                },
                None | Some('\n') => return self.error(unterminated),
                Some(c) if c == quote => return self.emit(kind),
                Some(_) => {}
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn accept(&mut self, valid: impl Fn(char) -> bool) -> bool {
        match self.peek() {
            Some(c) if valid(c) => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    fn emit(&mut self, kind: TokenKind) -> Token {
        let token = Token::new(kind, self.start, &self.input[self.start..self.pos]);
        self.start = self.pos;
        token
    }

    fn error(&mut self, msg: impl Into<String>) -> Token {
        Token::new(TokenKind::Error, self.start, msg)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token up to and including the terminal `Eof` or `Error`.
    fn next(&mut self) -> Option<Token> {
        if self.finished && self.peeked.is_none() {
            return None;
        }
        Some(self.next_token())
    }
}

/// Scans all of `input`. The last token is `Eof` or `Error`.
pub fn lex(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

/// 1-based line containing byte offset `pos`.
pub fn line_of(input: &str, pos: usize) -> usize {
    let end = pos.min(input.len());
    1 + input.as_bytes()[..end].iter().filter(|b| **b == b'\n').count()
}

fn is_alphanumeric(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_terminator(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\r' | '\n' | '+' | '-' | '*' | '/' | '%' | '=' | ',' | ':' | ';' | '(' | ')' | '{' | '}' | '[' | ']'
    )
}

fn unicode(c: char) -> String {
    format!("U+{:04X} '{}'", c as u32, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::{
        Bool, Composition, DClass, Endline, Eof, Error, Float64, Identifier, Int8, Keyword, LeftCurly,
        LeftParen, LeftSquare, Number, Operator, Quote, Rawchar, RightCurly, RightParen, RightSquare,
        Separator, Struct, Uint8, VarArray,
    };

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    fn last_error(input: &str) -> String {
        let tokens = lex(input);
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, Error, "expected an error lexing {:?}, got {:?}", input, tokens);
        last.text.clone()
    }

    #[test]
    fn declarations_and_punctuation() {
        assert_eq!(
            kinds("dclass A : B { uint8 x[]; f(int8 y); m : x, f; };"),
            [
                DClass, Identifier, Composition, Identifier, LeftCurly, Uint8, Identifier, VarArray,
                Endline, Identifier, LeftParen, Int8, Identifier, RightParen, Endline, Identifier,
                Composition, Identifier, Separator, Identifier, Endline, RightCurly, Endline, Eof,
            ]
        );
    }

    #[test]
    fn number_radixes() {
        let tokens = lex("0b110");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(Number, 0, "0b110"));

        assert_eq!(kinds("0x1F 017 3.25 .5"), [Number, Number, Number, Number, Eof]);
        assert_eq!(last_error("3k"), "bad number syntax: \"3k\"");
        assert_eq!(kinds("0 0.5 0.25 00 0.0"), [Number, Number, Number, Number, Number, Eof]);
        assert_eq!(
            last_error("07.5"),
            "non-decimal number (starting with '0') cannot contain a decimal point."
        );
        assert_eq!(
            last_error("0x1.5"),
            "non-decimal number (starting with '0x') cannot contain a decimal point."
        );
    }

    #[test]
    fn unclosed_paren_after_tokens() {
        let tokens = lex("(3");
        assert_eq!(tokens[0].kind, LeftParen);
        assert_eq!(tokens[1], Token::new(Number, 1, "3"));
        assert_eq!(tokens[2].kind, Error);
        assert_eq!(tokens[2].text, "unclosed left paren");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn stray_closers_fail_immediately() {
        assert_eq!(last_error("a )"), "unexpected right paren U+0029 ')'");
        assert_eq!(last_error("}"), "unexpected right curly U+007D '}'");
        assert_eq!(last_error("{ x"), "unclosed left curly");
    }

    #[test]
    fn identifiers_keywords_and_bools() {
        assert_eq!(kinds("keyword struct true false float64 x_1"), [
            Keyword, Struct, Bool, Bool, Float64, Identifier, Eof
        ]);
        assert_eq!(last_error("abc\"d\""), "bad character in identifier U+0022 '\"'");
    }

    #[test]
    fn quoted_literals() {
        let tokens = lex(r#""a\"b" 'c' '\n'"#);
        assert_eq!(tokens[0], Token::new(Quote, 0, r#""a\"b""#));
        assert_eq!(tokens[1].kind, Rawchar);
        assert_eq!(tokens[2].text, r"'\n'");
        assert_eq!(last_error("\"abc"), "unterminated string");
        assert_eq!(last_error("\"ab\nc\""), "unterminated string");
        assert_eq!(last_error("'a"), "unterminated character constant");
    }

    #[test]
    fn comments() {
        assert_eq!(kinds("a // b c\n d"), [Identifier, Identifier, Eof]);
        assert_eq!(kinds("a // trailing"), [Identifier, Eof]);
        assert_eq!(kinds("a /* b \n c */ d"), [Identifier, Identifier, Eof]);
        assert_eq!(last_error("a /* b"), "unclosed block comment");
        assert_eq!(kinds("a / b"), [Identifier, Operator, Identifier, Eof]);
    }

    #[test]
    fn array_sizes() {
        assert_eq!(kinds("x[16]"), [Identifier, LeftSquare, Number, RightSquare, Eof]);
        assert_eq!(
            last_error("x[16 ]"),
            "found opening '[' without matching ']' for array type definition."
        );
        assert_eq!(last_error("x[a]"), "unexpected character: U+0061 'a', following '['");
    }

    #[test]
    fn stray_right_square() {
        assert_eq!(last_error("x ]"), "unexpected right square U+005D ']'");
        assert_eq!(last_error("x]"), "unexpected right square U+005D ']'");
        assert_eq!(kinds("x[2] y"), [Identifier, LeftSquare, Number, RightSquare, Identifier, Eof]);
    }

    #[test]
    fn unexpected_character() {
        assert_eq!(last_error("a @"), "unexpected character: U+0040 '@'");
    }

    #[test]
    fn nothing_after_terminal_token() {
        let mut lexer = Lexer::new("@ a b");
        assert_eq!(lexer.next_token().kind, Error);
        assert_eq!(lexer.next_token().kind, Eof);
        assert_eq!(lexer.next_token().kind, Eof);

        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, Eof);
        assert!(lexer.next().is_none());
    }

    #[test]
    fn peek_does_not_move_line() {
        let mut lexer = Lexer::new("a\nb\nc");
        lexer.next_token();
        assert_eq!(lexer.line_number(), 1);
        assert_eq!(lexer.peek_token().text, "b");
        assert_eq!(lexer.line_number(), 1);
        lexer.next_token();
        assert_eq!(lexer.line_number(), 2);
        lexer.next_token();
        assert_eq!(lexer.line_number(), 3);
    }
}

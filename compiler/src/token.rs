use lazy_static::lazy_static;
use std::{collections::HashMap, fmt};

use dclass_schema::DataType;

/// Token kinds, grouped so that a kind's category is a range check. The
/// declaration keywords and the data type keywords each form one contiguous
/// run at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Error,
    Eof,

    Bool,
    Number,
    Rawchar,
    Quote,

    Identifier,
    Operator,
    LeftParen,
    RightParen,
    LeftCurly,
    RightCurly,
    LeftSquare,
    RightSquare,
    Composition,
    Endline,
    Separator,
    Assignment,
    VarArray,

    Keyword,
    DClass,
    Struct,

    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float64,
    String,
    Blob,
    Char,
}

lazy_static! {
    static ref RESERVED: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("keyword", TokenKind::Keyword);
        map.insert("dclass",  TokenKind::DClass);
        map.insert("struct",  TokenKind::Struct);
        map.insert("int8",    TokenKind::Int8);
        map.insert("int16",   TokenKind::Int16);
        map.insert("int32",   TokenKind::Int32);
        map.insert("int64",   TokenKind::Int64);
        map.insert("uint8",   TokenKind::Uint8);
        map.insert("uint16",  TokenKind::Uint16);
        map.insert("uint32",  TokenKind::Uint32);
        map.insert("uint64",  TokenKind::Uint64);
        map.insert("float64", TokenKind::Float64);
        map.insert("string",  TokenKind::String);
        map.insert("blob",    TokenKind::Blob);
        map.insert("char",    TokenKind::Char);
        map
    };
}

impl TokenKind {
    /// The kind of a reserved word, if `word` is one.
    pub fn reserved(word: &str) -> Option<TokenKind> {
        RESERVED.get(word).copied()
    }

    pub fn is_declaration(self) -> bool {
        (TokenKind::Keyword..=TokenKind::Struct).contains(&self)
    }

    pub fn is_data_type(self) -> bool {
        (TokenKind::Int8..=TokenKind::Char).contains(&self)
    }

    /// The builtin data type named by a data type keyword.
    pub fn data_type(self) -> Option<DataType> {
        let data_type = match self {
            TokenKind::Int8 => DataType::Int8,
            TokenKind::Int16 => DataType::Int16,
            TokenKind::Int32 => DataType::Int32,
            TokenKind::Int64 => DataType::Int64,
            TokenKind::Uint8 => DataType::Uint8,
            TokenKind::Uint16 => DataType::Uint16,
            TokenKind::Uint32 => DataType::Uint32,
            TokenKind::Uint64 => DataType::Uint64,
            TokenKind::Float64 => DataType::Float64,
            TokenKind::String => DataType::String,
            TokenKind::Blob => DataType::Blob,
            TokenKind::Char => DataType::Char,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Error => "error",
            TokenKind::Eof => "EOF",
            TokenKind::Bool => "bool",
            TokenKind::Number => "number",
            TokenKind::Rawchar => "char-constant",
            TokenKind::Quote => "quoted-string",
            TokenKind::Identifier => "identifier",
            TokenKind::Operator => "<op>",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftCurly => "{",
            TokenKind::RightCurly => "}",
            TokenKind::LeftSquare => "[",
            TokenKind::RightSquare => "]",
            TokenKind::Composition => ":",
            TokenKind::Endline => ";",
            TokenKind::Separator => ",",
            TokenKind::Assignment => "=",
            TokenKind::VarArray => "[]",
            TokenKind::Keyword => "keyword",
            TokenKind::DClass => "dclass",
            TokenKind::Struct => "struct",
            TokenKind::Int8 => "int8",
            TokenKind::Int16 => "int16",
            TokenKind::Int32 => "int32",
            TokenKind::Int64 => "int64",
            TokenKind::Uint8 => "uint8",
            TokenKind::Uint16 => "uint16",
            TokenKind::Uint32 => "uint32",
            TokenKind::Uint64 => "uint64",
            TokenKind::Float64 => "float64",
            TokenKind::String => "string",
            TokenKind::Blob => "blob",
            TokenKind::Char => "char",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lexed token. `pos` is the byte offset of its first character. For
/// `Error` tokens `text` is the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos:  usize,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, pos: usize, text: impl Into<String>) -> Token {
        Token {
            kind,
            pos,
            text: text.into(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// True for `Eof` and `Error`, after which the lexer produces nothing.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TokenKind::Eof | TokenKind::Error)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Error => write!(f, "{}", self.text),
            k if k.is_declaration() || k.is_data_type() => write!(f, "<{}>", self.text),
            _ if self.text.chars().count() > 10 => {
                let head: String = self.text.chars().take(10).collect();
                write!(f, "{:?}...", head)
            }
            _ => write!(f, "{:?}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ranges() {
        assert!(TokenKind::DClass.is_declaration());
        assert!(!TokenKind::Int8.is_declaration());
        assert!(TokenKind::Int8.is_data_type());
        assert!(TokenKind::Char.is_data_type());
        assert!(!TokenKind::VarArray.is_data_type());
        assert_eq!(TokenKind::reserved("float64"), Some(TokenKind::Float64));
        assert_eq!(TokenKind::reserved("true"), None);
        assert_eq!(TokenKind::Uint64.data_type(), Some(DataType::Uint64));
    }

    #[test]
    fn display() {
        assert_eq!(Token::new(TokenKind::Struct, 0, "struct").to_string(), "<struct>");
        assert_eq!(Token::new(TokenKind::Identifier, 0, "abc").to_string(), "\"abc\"");
        assert_eq!(
            Token::new(TokenKind::Quote, 0, "\"a long string\"").to_string(),
            "\"\\\"a long st\"..."
        );
        assert_eq!(Token::new(TokenKind::Eof, 3, "").to_string(), "EOF");
    }
}

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Lex,
    Parse,
    Definition,
}

/// A problem found while compiling a DC file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: Category,
    pub message:  String,
    pub line:     usize,
}

impl Diagnostic {
    pub fn lex(message: impl Into<String>, line: usize) -> Diagnostic {
        Diagnostic {
            category: Category::Lex,
            message:  message.into(),
            line,
        }
    }

    pub fn parse(message: impl Into<String>, line: usize) -> Diagnostic {
        Diagnostic {
            category: Category::Parse,
            message:  message.into(),
            line,
        }
    }

    /// A name used but never declared. `kind` is `keyword`, `struct` or
    /// `dclass`; `line` is where the name was first used.
    pub fn undefined(kind: &str, name: &str, line: usize) -> Diagnostic {
        Diagnostic::definition(
            format!(
                "used {} '{}', but '{}' was never defined (first used on line {})",
                kind, name, name, line
            ),
            line,
        )
    }

    pub fn definition(message: impl Into<String>, line: usize) -> Diagnostic {
        Diagnostic {
            category: Category::Definition,
            message:  message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            Category::Lex => write!(f, "lex error(line: {}): {}", self.line, self.message),
            Category::Parse => write!(f, "parse error(line: {}): {}", self.line, self.message),
            Category::Definition => write!(f, "definition error: {}", self.message),
        }
    }
}

use serde::Serialize;
use std::fmt;
use std::mem;

/// Declares `TokenType` with the given payload‑free kinds plus the two
/// literal kinds, and a `name()` that spells each kind as written here.
macro_rules! token_types {
    ($($kind:ident),* $(,)?) => {
        /// The different kinds of tokens recognized by the Rox scanner.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Serialize)]
        pub enum TokenType {
            $($kind,)*

            /// String literal contents, without the quotes.
            STRING(String),

            NUMBER(f64),
        }

        impl TokenType {
            /// Kind name without payload, as printed by `--emit tokens`.
            pub fn name(&self) -> &'static str {
                match self {
                    $(TokenType::$kind => stringify!($kind),)*
                    TokenType::STRING(_) => "STRING",
                    TokenType::NUMBER(_) => "NUMBER",
                }
            }
        }
    };
}

token_types! {
    // single‑character punctuation
    LEFT_PAREN, RIGHT_PAREN, LEFT_BRACE, RIGHT_BRACE,
    COMMA, DOT, MINUS, PLUS, SEMICOLON, SLASH, STAR,
    QUESTION, COLON,

    // one or two characters
    BANG, BANG_EQUAL,
    EQUAL, EQUAL_EQUAL,
    GREATER, GREATER_EQUAL,
    LESS, LESS_EQUAL,

    IDENTIFIER,

    // keywords
    AND, BREAK, CLASS, CONTINUE, ELSE, FALSE, FUN, FOR, IF, NIL,
    OR, PRINT, RETURN, SUPER, THIS, TRUE, VAR, WHILE,

    EOF,
}

/// Kinds compare by variant only; literal payloads are ignored, so
/// `check(TokenType::NUMBER(0.0))` matches any number.
impl PartialEq for TokenType {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// One scanned lexeme. `lexeme` borrows from the source buffer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    pub token_type: TokenType,
    pub lexeme: &'a str,
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn new(token_type: TokenType, lexeme: &'a str, line: usize) -> Self {
        Self {
            token_type,
            lexeme,
            line,
        }
    }
}

/// `KIND lexeme literal`, e.g. `NUMBER 3 3.0`, `STRING "hi" hi`, `AND and null`.
impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.token_type.name(), self.lexeme)?;

        match &self.token_type {
            TokenType::STRING(s) => f.write_str(s),

            // integral values keep a ".0" suffix
            TokenType::NUMBER(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                let mut buf = itoa::Buffer::new();
                write!(f, "{}.0", buf.format(*n as i64))
            }

            TokenType::NUMBER(n) => write!(f, "{}", n),

            _ => f.write_str("null"),
        }
    }
}

//! Lexer (tokenizer) for the JavaScript subset
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! parser. Line (`//`) and block (`/* */`) comments are skipped. Reserved
//! words outside the supported subset (`let`, `const`, `class`, ...) are
//! tokenized as [`Token::Reserved`] so the parser can report a precise
//! "not supported" error instead of misreading them as identifiers.

use super::ast::SourceLocation;
use std::fmt;

/// Position of a token: 1-based line/column plus the byte offset into the
/// source. The offset is what lets the parser recover the exact source
/// text of a function body for the trace encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Pos {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

/// All token variants produced by the lexer.
///
/// Every variant carries a [`Pos`] so that parse errors can report an
/// accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64, Pos),
    Str(String, Pos),

    // Identifiers
    Ident(String, Pos),
    /// Reserved word outside the supported subset
    Reserved(String, Pos),

    // Keywords
    Var(Pos),
    Function(Pos),
    If(Pos),
    Else(Pos),
    While(Pos),
    Do(Pos),
    For(Pos),
    Return(Pos),
    Break(Pos),
    Continue(Pos),
    Throw(Pos),
    Try(Pos),
    Catch(Pos),
    Finally(Pos),
    With(Pos),
    New(Pos),
    This(Pos),
    TypeOf(Pos),
    True(Pos),
    False(Pos),
    Null(Pos),
    Debugger(Pos),

    // Operators
    Plus(Pos),      // +
    Minus(Pos),     // -
    Star(Pos),      // *
    Slash(Pos),     // /
    Percent(Pos),   // %
    EqEq(Pos),      // ==
    EqEqEq(Pos),    // ===
    NotEq(Pos),     // !=
    NotEqEq(Pos),   // !==
    Lt(Pos),        // <
    Le(Pos),        // <=
    Gt(Pos),        // >
    Ge(Pos),        // >=
    AndAnd(Pos),    // &&
    OrOr(Pos),      // ||
    Bang(Pos),      // !
    Eq(Pos),        // =
    PlusEq(Pos),    // +=
    MinusEq(Pos),   // -=
    StarEq(Pos),    // *=
    SlashEq(Pos),   // /=
    PercentEq(Pos), // %=
    PlusPlus(Pos),  // ++
    MinusMinus(Pos), // --
    Question(Pos),  // ?
    Colon(Pos),     // :
    Dot(Pos),       // .

    // Punctuation
    LParen(Pos),   // (
    RParen(Pos),   // )
    LBrace(Pos),   // {
    RBrace(Pos),   // }
    LBracket(Pos), // [
    RBracket(Pos), // ]
    Semicolon(Pos), // ;
    Comma(Pos),    // ,

    // End of file
    Eof(Pos),
}

impl Token {
    /// Returns the position where this token appears.
    pub fn pos(&self) -> Pos {
        match self {
            Token::Number(_, p)
            | Token::Str(_, p)
            | Token::Ident(_, p)
            | Token::Reserved(_, p)
            | Token::Var(p)
            | Token::Function(p)
            | Token::If(p)
            | Token::Else(p)
            | Token::While(p)
            | Token::Do(p)
            | Token::For(p)
            | Token::Return(p)
            | Token::Break(p)
            | Token::Continue(p)
            | Token::Throw(p)
            | Token::Try(p)
            | Token::Catch(p)
            | Token::Finally(p)
            | Token::With(p)
            | Token::New(p)
            | Token::This(p)
            | Token::TypeOf(p)
            | Token::True(p)
            | Token::False(p)
            | Token::Null(p)
            | Token::Debugger(p)
            | Token::Plus(p)
            | Token::Minus(p)
            | Token::Star(p)
            | Token::Slash(p)
            | Token::Percent(p)
            | Token::EqEq(p)
            | Token::EqEqEq(p)
            | Token::NotEq(p)
            | Token::NotEqEq(p)
            | Token::Lt(p)
            | Token::Le(p)
            | Token::Gt(p)
            | Token::Ge(p)
            | Token::AndAnd(p)
            | Token::OrOr(p)
            | Token::Bang(p)
            | Token::Eq(p)
            | Token::PlusEq(p)
            | Token::MinusEq(p)
            | Token::StarEq(p)
            | Token::SlashEq(p)
            | Token::PercentEq(p)
            | Token::PlusPlus(p)
            | Token::MinusMinus(p)
            | Token::Question(p)
            | Token::Colon(p)
            | Token::Dot(p)
            | Token::LParen(p)
            | Token::RParen(p)
            | Token::LBrace(p)
            | Token::RBrace(p)
            | Token::LBracket(p)
            | Token::RBracket(p)
            | Token::Semicolon(p)
            | Token::Comma(p)
            | Token::Eof(p) => *p,
        }
    }

    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        self.pos().location()
    }

    /// Short human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n, _) => format!("number {}", n),
            Token::Str(_, _) => "string literal".to_string(),
            Token::Ident(name, _) => format!("identifier '{}'", name),
            Token::Reserved(word, _) => format!("reserved word '{}'", word),
            Token::Eof(_) => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Var(_) => "var",
            Token::Function(_) => "function",
            Token::If(_) => "if",
            Token::Else(_) => "else",
            Token::While(_) => "while",
            Token::Do(_) => "do",
            Token::For(_) => "for",
            Token::Return(_) => "return",
            Token::Break(_) => "break",
            Token::Continue(_) => "continue",
            Token::Throw(_) => "throw",
            Token::Try(_) => "try",
            Token::Catch(_) => "catch",
            Token::Finally(_) => "finally",
            Token::With(_) => "with",
            Token::New(_) => "new",
            Token::This(_) => "this",
            Token::TypeOf(_) => "typeof",
            Token::True(_) => "true",
            Token::False(_) => "false",
            Token::Null(_) => "null",
            Token::Debugger(_) => "debugger",
            Token::Plus(_) => "+",
            Token::Minus(_) => "-",
            Token::Star(_) => "*",
            Token::Slash(_) => "/",
            Token::Percent(_) => "%",
            Token::EqEq(_) => "==",
            Token::EqEqEq(_) => "===",
            Token::NotEq(_) => "!=",
            Token::NotEqEq(_) => "!==",
            Token::Lt(_) => "<",
            Token::Le(_) => "<=",
            Token::Gt(_) => ">",
            Token::Ge(_) => ">=",
            Token::AndAnd(_) => "&&",
            Token::OrOr(_) => "||",
            Token::Bang(_) => "!",
            Token::Eq(_) => "=",
            Token::PlusEq(_) => "+=",
            Token::MinusEq(_) => "-=",
            Token::StarEq(_) => "*=",
            Token::SlashEq(_) => "/=",
            Token::PercentEq(_) => "%=",
            Token::PlusPlus(_) => "++",
            Token::MinusMinus(_) => "--",
            Token::Question(_) => "?",
            Token::Colon(_) => ":",
            Token::Dot(_) => ".",
            Token::LParen(_) => "(",
            Token::RParen(_) => ")",
            Token::LBrace(_) => "{",
            Token::RBrace(_) => "}",
            Token::LBracket(_) => "[",
            Token::RBracket(_) => "]",
            Token::Semicolon(_) => ";",
            Token::Comma(_) => ",",
            _ => "?",
        }
    }
}

/// Lexer error
#[derive(Debug, Clone, thiserror::Error)]
#[error("Lex error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Reserved words recognized but not part of the supported subset.
/// Contextual names (`get`, `of`, `async`, ...) stay plain identifiers.
const UNSUPPORTED_RESERVED: &[&str] = &[
    "let", "const", "class", "extends", "super", "switch", "case", "default",
    "delete", "void", "in", "instanceof", "yield", "import", "export", "enum",
];

/// Hand-written scanner producing the full token stream up front.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    /// Byte offset of each entry in `chars`
    offsets: Vec<usize>,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let offsets = source.char_indices().map(|(i, _)| i).collect();
        Lexer {
            source,
            chars,
            offsets,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input, ending with an [`Token::Eof`].
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;
            if self.is_at_end() {
                tokens.push(Token::Eof(self.pos()));
                break;
            }
            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
            offset: self
                .offsets
                .get(self.position)
                .copied()
                .unwrap_or(self.source.len()),
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_next() == Some('*') => {
                    let start = self.pos();
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            Some('*') if self.peek_next() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => {
                                return Err(LexError {
                                    message: "Unterminated block comment".to_string(),
                                    location: start.location(),
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let pos = self.pos();
        let ch = self.peek().expect("next_token called at end of input");

        if ch.is_ascii_digit() {
            return self.lex_number(pos);
        }
        if ch == '"' || ch == '\'' {
            return self.lex_string(pos);
        }
        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            return Ok(self.lex_word(pos));
        }

        self.advance();
        let token = match ch {
            '+' => match self.peek() {
                Some('+') => {
                    self.advance();
                    Token::PlusPlus(pos)
                }
                Some('=') => {
                    self.advance();
                    Token::PlusEq(pos)
                }
                _ => Token::Plus(pos),
            },
            '-' => match self.peek() {
                Some('-') => {
                    self.advance();
                    Token::MinusMinus(pos)
                }
                Some('=') => {
                    self.advance();
                    Token::MinusEq(pos)
                }
                _ => Token::Minus(pos),
            },
            '*' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::StarEq(pos)
                }
                _ => Token::Star(pos),
            },
            '/' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::SlashEq(pos)
                }
                _ => Token::Slash(pos),
            },
            '%' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::PercentEq(pos)
                }
                _ => Token::Percent(pos),
            },
            '=' => match self.peek() {
                Some('=') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::EqEqEq(pos)
                    } else {
                        Token::EqEq(pos)
                    }
                }
                _ => Token::Eq(pos),
            },
            '!' => match self.peek() {
                Some('=') => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        Token::NotEqEq(pos)
                    } else {
                        Token::NotEq(pos)
                    }
                }
                _ => Token::Bang(pos),
            },
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::Le(pos)
                }
                _ => Token::Lt(pos),
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::Ge(pos)
                }
                _ => Token::Gt(pos),
            },
            '&' => match self.peek() {
                Some('&') => {
                    self.advance();
                    Token::AndAnd(pos)
                }
                _ => {
                    return Err(LexError {
                        message: "Bitwise '&' is not supported".to_string(),
                        location: pos.location(),
                    });
                }
            },
            '|' => match self.peek() {
                Some('|') => {
                    self.advance();
                    Token::OrOr(pos)
                }
                _ => {
                    return Err(LexError {
                        message: "Bitwise '|' is not supported".to_string(),
                        location: pos.location(),
                    });
                }
            },
            '?' => Token::Question(pos),
            ':' => Token::Colon(pos),
            '.' => Token::Dot(pos),
            '(' => Token::LParen(pos),
            ')' => Token::RParen(pos),
            '{' => Token::LBrace(pos),
            '}' => Token::RBrace(pos),
            '[' => Token::LBracket(pos),
            ']' => Token::RBracket(pos),
            ';' => Token::Semicolon(pos),
            ',' => Token::Comma(pos),
            other => {
                return Err(LexError {
                    message: format!("Unexpected character '{}'", other),
                    location: pos.location(),
                });
            }
        };

        Ok(token)
    }

    fn lex_number(&mut self, pos: Pos) -> Result<Token, LexError> {
        let mut text = String::new();

        // Hex literal
        if self.peek() == Some('0') && matches!(self.peek_next(), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let mut hex = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    hex.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if hex.is_empty() {
                return Err(LexError {
                    message: "Malformed hex literal".to_string(),
                    location: pos.location(),
                });
            }
            let value = u64::from_str_radix(&hex, 16).map_err(|_| LexError {
                message: "Hex literal out of range".to_string(),
                location: pos.location(),
            })?;
            return Ok(Token::Number(value as f64, pos));
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut exp = String::from("e");
            let save = self.position;
            let (save_line, save_col) = (self.line, self.column);
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                exp.push(self.advance().unwrap());
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        exp.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                text.push_str(&exp);
            } else {
                // Not an exponent after all (e.g. `1e` would be `1` then ident `e`)
                self.position = save;
                self.line = save_line;
                self.column = save_col;
            }
        }

        let value: f64 = text.parse().map_err(|_| LexError {
            message: format!("Malformed number literal '{}'", text),
            location: pos.location(),
        })?;
        Ok(Token::Number(value, pos))
    }

    fn lex_string(&mut self, pos: Pos) -> Result<Token, LexError> {
        let quote = self.advance().expect("string start");
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(LexError {
                        message: "Unterminated string literal".to_string(),
                        location: pos.location(),
                    });
                }
                Some('\n') => {
                    return Err(LexError {
                        message: "Unterminated string literal (newline in string)".to_string(),
                        location: pos.location(),
                    });
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some('"') => value.push('"'),
                    Some('0') => value.push('\0'),
                    Some(other) => {
                        return Err(LexError {
                            message: format!("Unsupported escape sequence '\\{}'", other),
                            location: pos.location(),
                        });
                    }
                    None => {
                        return Err(LexError {
                            message: "Unterminated string literal".to_string(),
                            location: pos.location(),
                        });
                    }
                },
                Some(c) => value.push(c),
            }
        }

        Ok(Token::Str(value, pos))
    }

    fn lex_word(&mut self, pos: Pos) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match word.as_str() {
            "var" => Token::Var(pos),
            "function" => Token::Function(pos),
            "if" => Token::If(pos),
            "else" => Token::Else(pos),
            "while" => Token::While(pos),
            "do" => Token::Do(pos),
            "for" => Token::For(pos),
            "return" => Token::Return(pos),
            "break" => Token::Break(pos),
            "continue" => Token::Continue(pos),
            "throw" => Token::Throw(pos),
            "try" => Token::Try(pos),
            "catch" => Token::Catch(pos),
            "finally" => Token::Finally(pos),
            "with" => Token::With(pos),
            "new" => Token::New(pos),
            "this" => Token::This(pos),
            "typeof" => Token::TypeOf(pos),
            "true" => Token::True(pos),
            "false" => Token::False(pos),
            "null" => Token::Null(pos),
            "debugger" => Token::Debugger(pos),
            _ if UNSUPPORTED_RESERVED.contains(&word.as_str()) => Token::Reserved(word, pos),
            _ => Token::Ident(word, pos),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().expect("lex failed")
    }

    #[test]
    fn lexes_numbers() {
        let tokens = kinds("1 2.5 0x10 3e2");
        assert!(matches!(tokens[0], Token::Number(n, _) if n == 1.0));
        assert!(matches!(tokens[1], Token::Number(n, _) if n == 2.5));
        assert!(matches!(tokens[2], Token::Number(n, _) if n == 16.0));
        assert!(matches!(tokens[3], Token::Number(n, _) if n == 300.0));
    }

    #[test]
    fn lexes_strings_with_escapes() {
        let tokens = kinds(r#"'a\nb' "c\"d""#);
        assert!(matches!(&tokens[0], Token::Str(s, _) if s == "a\nb"));
        assert!(matches!(&tokens[1], Token::Str(s, _) if s == "c\"d"));
    }

    #[test]
    fn distinguishes_equality_operators() {
        let tokens = kinds("= == === != !==");
        assert!(matches!(tokens[0], Token::Eq(_)));
        assert!(matches!(tokens[1], Token::EqEq(_)));
        assert!(matches!(tokens[2], Token::EqEqEq(_)));
        assert!(matches!(tokens[3], Token::NotEq(_)));
        assert!(matches!(tokens[4], Token::NotEqEq(_)));
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = kinds("a\n  b");
        let a = tokens[0].location();
        let b = tokens[1].location();
        assert_eq!((a.line, a.column), (1, 1));
        assert_eq!((b.line, b.column), (2, 3));
    }

    #[test]
    fn reserved_words_are_flagged() {
        let tokens = kinds("let x");
        assert!(matches!(&tokens[0], Token::Reserved(w, _) if w == "let"));
    }

    #[test]
    fn skips_comments() {
        let tokens = kinds("1 // line\n/* block\n */ 2");
        assert!(matches!(tokens[0], Token::Number(n, _) if n == 1.0));
        assert!(matches!(tokens[1], Token::Number(n, _) if n == 2.0));
        assert!(matches!(tokens[2], Token::Eof(_)));
    }
}

//! Unit lexer (tokenizer).
//!
//! Converts unit source text into a stream of [`Token`]s: the three bracket
//! pairs, string, integer and float literals, and symbols. Comments start
//! with `;` and run to the end of the line.

use formforge_core::{FormResult, FormforgeError};

/// A token produced by the unit lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// A string literal, unescaped.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// Any other bare word: builtin names, variables, `null`, `true`, `false`.
    Symbol(String),
}

/// A token with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

fn syntax(line: usize, message: impl Into<String>) -> FormforgeError {
    FormforgeError::UnitSyntax {
        line,
        message: message.into(),
    }
}

const fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';') || c.is_ascii_whitespace()
}

/// Tokenizes unit source text.
///
/// # Errors
///
/// Returns [`FormforgeError::UnitSyntax`] for unterminated strings, bad
/// escapes, and malformed numbers.
pub fn tokenize(source: &str) -> FormResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        let start = line;
        let token = match c {
            '\n' => {
                line += 1;
                chars.next();
                continue;
            }
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            ';' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
                continue;
            }
            '(' | ')' | '[' | ']' | '{' | '}' => {
                chars.next();
                match c {
                    '(' => Token::OpenParen,
                    ')' => Token::CloseParen,
                    '[' => Token::OpenBracket,
                    ']' => Token::CloseBracket,
                    '{' => Token::OpenBrace,
                    _ => Token::CloseBrace,
                }
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        None => return Err(syntax(start, "unterminated string literal")),
                        Some('"') => break,
                        Some('\\') => text.push(read_escape(&mut chars, line)?),
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            text.push(c);
                        }
                    }
                }
                Token::Str(text)
            }
            _ => {
                let mut word = String::new();
                while let Some(c) = chars.next_if(|&c| !is_delimiter(c)) {
                    word.push(c);
                }
                classify(word, line)?
            }
        };
        tokens.push(Spanned { token, line: start });
    }

    Ok(tokens)
}

fn read_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: usize,
) -> FormResult<char> {
    match chars.next() {
        Some('"') => Ok('"'),
        Some('\\') => Ok('\\'),
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('u') => {
            if chars.next() != Some('{') {
                return Err(syntax(line, "expected '{' after \\u"));
            }
            let mut hex = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) if c.is_ascii_hexdigit() && hex.len() < 6 => hex.push(c),
                    _ => return Err(syntax(line, "malformed \\u{..} escape")),
                }
            }
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| syntax(line, format!("invalid code point \\u{{{hex}}}")))
        }
        Some(other) => Err(syntax(line, format!("unknown escape \\{other}"))),
        None => Err(syntax(line, "unterminated string literal")),
    }
}

fn classify(word: String, line: usize) -> FormResult<Token> {
    let mut chars = word.chars();
    let numeric = match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };
    if !numeric {
        return Ok(Token::Symbol(word));
    }
    if word.contains(['.', 'e', 'E']) {
        word.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| syntax(line, format!("malformed float '{word}'")))
    } else {
        word.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| syntax(line, format!("malformed integer '{word}'")))
    }
}

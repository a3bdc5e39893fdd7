//! Module: query::parse::lexer
//! Responsibility: turning QL text into tokens.
//! Does not own: grammar or precedence (mod.rs).

use super::ParseError;

///
/// Token
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    /// Identifier or keyword; dotted paths lex as one token.
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Star,
}

impl Token {
    /// Case-insensitive keyword check against an identifier token.
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Ident(text) if text.eq_ignore_ascii_case(keyword))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(text) => format!("'{text}'"),
            Self::Str(text) => format!("string '{text}'"),
            Self::Int(n) => format!("number {n}"),
            Self::Float(x) => format!("number {x}"),
            Self::Eq => "'='".into(),
            Self::Lt => "'<'".into(),
            Self::Lte => "'<='".into(),
            Self::Gt => "'>'".into(),
            Self::Gte => "'>='".into(),
            Self::LParen => "'('".into(),
            Self::RParen => "')'".into(),
            Self::LBrace => "'{'".into(),
            Self::RBrace => "'}'".into(),
            Self::Comma => "','".into(),
            Self::Colon => "':'".into(),
            Self::Star => "'*'".into(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

pub(crate) fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if is_ident_start(c) {
            let start = pos;
            while pos < chars.len() && is_ident_part(chars[pos]) {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        if c.is_ascii_digit() || (c == '-' && matches!(chars.get(pos + 1), Some(d) if d.is_ascii_digit()))
        {
            let start = pos;
            pos += 1;
            let mut is_float = false;
            while pos < chars.len()
                && (chars[pos].is_ascii_digit() || (chars[pos] == '.' && !is_float))
            {
                if chars[pos] == '.' {
                    // a trailing dot belongs to the next token, not the number
                    if !matches!(chars.get(pos + 1), Some(d) if d.is_ascii_digit()) {
                        break;
                    }
                    is_float = true;
                }
                pos += 1;
            }

            let text: String = chars[start..pos].iter().collect();
            let token = if is_float {
                Token::Float(text.parse().map_err(|_| ParseError::InvalidNumber {
                    text: text.clone(),
                })?)
            } else {
                Token::Int(text.parse().map_err(|_| ParseError::InvalidNumber {
                    text: text.clone(),
                })?)
            };
            tokens.push(token);
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            let start = pos;
            pos += 1;
            let mut text = String::new();
            loop {
                match chars.get(pos) {
                    Some(&ch) if ch == quote => {
                        pos += 1;
                        break;
                    }
                    Some(&ch) => {
                        text.push(ch);
                        pos += 1;
                    }
                    None => return Err(ParseError::UnterminatedString { pos: start }),
                }
            }
            tokens.push(Token::Str(text));
            continue;
        }

        let token = match c {
            '=' => {
                // accept both '=' and '=='
                if chars.get(pos + 1) == Some(&'=') {
                    pos += 1;
                }
                Token::Eq
            }
            '<' => {
                if chars.get(pos + 1) == Some(&'=') {
                    pos += 1;
                    Token::Lte
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if chars.get(pos + 1) == Some(&'=') {
                    pos += 1;
                    Token::Gte
                } else {
                    Token::Gt
                }
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '*' => Token::Star,
            other => return Err(ParseError::UnexpectedChar { ch: other, pos }),
        };

        tokens.push(token);
        pos += 1;
    }

    Ok(tokens)
}

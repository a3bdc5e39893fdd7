//! Module: query::parse
//! Responsibility: the QL grammar — `select … where … order by …` — parsed
//! into projection, filter tree, and sort list.
//! Does not own: index validation; `order by asc` parses fine here and is
//! rejected later as an unindexed empty property.

mod lexer;

use crate::query::{
    builder::{Projection, SortDirection, SortPredicate},
    predicate::{CompareOp, ComparePredicate, FilterExpr},
};
use crate::value::Value;
use lexer::{Token, lex};
use thiserror::Error as ThisError;

///
/// ParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal at position {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number '{text}'")]
    InvalidNumber { text: String },

    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: String },

    #[error("unexpected end of query, expected {expected}")]
    UnexpectedEnd { expected: String },
}

///
/// ParsedQuery
///

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedQuery {
    pub projection: Projection,
    pub filter: Option<FilterExpr>,
    pub sorts: Vec<SortPredicate>,
    pub limit: Option<usize>,
}

/// Parse a full QL string. Every clause is optional; the empty string is
/// the match-everything query.
pub fn parse_ql(input: &str) -> Result<ParsedQuery, ParseError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };

    let projection = if parser.eat_keyword("select") {
        parser.parse_projection()?
    } else {
        Projection::All
    };

    let filter = if parser.eat_keyword("where") {
        Some(parser.parse_or_expr()?)
    } else {
        None
    };

    let sorts = if parser.eat_keyword("order") {
        parser.expect_keyword("by")?;
        parser.parse_sorts()?
    } else {
        Vec::new()
    };

    let limit = if parser.eat_keyword("limit") {
        Some(parser.parse_limit()?)
    } else {
        None
    };

    if let Some(extra) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            found: extra.describe(),
            expected: "end of query".into(),
        });
    }

    Ok(ParsedQuery {
        projection,
        filter,
        sorts,
        limit,
    })
}

/// Parse a bare filter fragment (`index >= 10`), the grammar of a `where`
/// clause without the keyword.
pub fn parse_filter(input: &str) -> Result<FilterExpr, ParseError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };

    let filter = parser.parse_or_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            found: extra.describe(),
            expected: "end of filter".into(),
        });
    }

    Ok(filter)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{keyword}'")))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                found: token.describe(),
                expected: expected.into(),
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.into(),
            },
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let Some(Token::Ident(text)) = self.next() else {
                    return Err(self.unexpected(expected));
                };
                Ok(text)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    // select * | select {a, b} | select {alias : path, ...} | select a, b
    fn parse_projection(&mut self) -> Result<Projection, ParseError> {
        match self.peek() {
            Some(Token::Star) => {
                self.pos += 1;
                Ok(Projection::All)
            }
            Some(Token::LBrace) => {
                self.pos += 1;
                let mut entries = Vec::new();
                let mut aliased = false;
                loop {
                    let first = self.expect_ident("projection property")?;
                    if matches!(self.peek(), Some(Token::Colon)) {
                        self.pos += 1;
                        let source = self.expect_ident("projection source property")?;
                        entries.push((first, source));
                        aliased = true;
                    } else {
                        entries.push((first.clone(), first));
                    }

                    match self.next() {
                        Some(Token::Comma) => {}
                        Some(Token::RBrace) => break,
                        Some(other) => {
                            return Err(ParseError::UnexpectedToken {
                                found: other.describe(),
                                expected: "',' or '}'".into(),
                            });
                        }
                        None => {
                            return Err(ParseError::UnexpectedEnd {
                                expected: "',' or '}'".into(),
                            });
                        }
                    }
                }

                if aliased {
                    Ok(Projection::Aliased(entries))
                } else {
                    Ok(Projection::Fields(
                        entries.into_iter().map(|(_, source)| source).collect(),
                    ))
                }
            }
            _ => {
                let mut fields = vec![self.expect_ident("projection property or '*'")?];
                while matches!(self.peek(), Some(Token::Comma)) {
                    self.pos += 1;
                    fields.push(self.expect_ident("projection property")?);
                }
                Ok(Projection::Fields(fields))
            }
        }
    }

    fn parse_or_expr(&mut self) -> Result<FilterExpr, ParseError> {
        let mut branches = vec![self.parse_and_expr()?];
        while self.eat_keyword("or") {
            branches.push(self.parse_and_expr()?);
        }

        if branches.len() == 1 {
            Ok(branches.swap_remove(0))
        } else {
            Ok(FilterExpr::Or(branches))
        }
    }

    fn parse_and_expr(&mut self) -> Result<FilterExpr, ParseError> {
        let mut branches = vec![self.parse_not_expr()?];
        while self.eat_keyword("and") {
            branches.push(self.parse_not_expr()?);
        }

        if branches.len() == 1 {
            Ok(branches.swap_remove(0))
        } else {
            Ok(FilterExpr::And(branches))
        }
    }

    fn parse_not_expr(&mut self) -> Result<FilterExpr, ParseError> {
        if self.eat_keyword("not") {
            let inner = self.parse_not_expr()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterExpr, ParseError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            let inner = self.parse_or_expr()?;
            if !matches!(self.next(), Some(Token::RParen)) {
                return Err(ParseError::UnexpectedEnd {
                    expected: "')'".into(),
                });
            }
            return Ok(inner);
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, ParseError> {
        let property = self.expect_ident("property path")?;

        let op = match self.peek() {
            Some(Token::Eq) => CompareOp::Eq,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Gte) => CompareOp::Gte,
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Lte) => CompareOp::Lte,
            Some(token) if token.is_keyword("contains") => CompareOp::Contains,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.pos += 1;

        let value = self.parse_literal()?;

        Ok(FilterExpr::Compare(ComparePredicate::new(
            property, op, value,
        )))
    }

    fn parse_literal(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(Token::Str(_)) => {
                let Some(Token::Str(text)) = self.next() else {
                    return Err(self.unexpected("literal value"));
                };
                Ok(Value::Text(text))
            }
            Some(Token::Int(n)) => {
                let value = Value::Int(*n);
                self.pos += 1;
                Ok(value)
            }
            Some(Token::Float(x)) => {
                let value = Value::Float(*x);
                self.pos += 1;
                Ok(value)
            }
            Some(token) if token.is_keyword("true") => {
                self.pos += 1;
                Ok(Value::Bool(true))
            }
            Some(token) if token.is_keyword("false") => {
                self.pos += 1;
                Ok(Value::Bool(false))
            }
            _ => Err(self.unexpected("literal value")),
        }
    }

    fn parse_limit(&mut self) -> Result<usize, ParseError> {
        match self.peek() {
            Some(Token::Int(n)) => {
                let limit = usize::try_from(*n).map_err(|_| ParseError::InvalidNumber {
                    text: n.to_string(),
                })?;
                self.pos += 1;
                Ok(limit)
            }
            _ => Err(self.unexpected("page size")),
        }
    }

    fn parse_sorts(&mut self) -> Result<Vec<SortPredicate>, ParseError> {
        let mut sorts = vec![self.parse_sort_item()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            sorts.push(self.parse_sort_item()?);
        }
        Ok(sorts)
    }

    // `order by asc` is grammatical: a bare direction sorts on the empty
    // property name, which no index can ever satisfy downstream.
    fn parse_sort_item(&mut self) -> Result<SortPredicate, ParseError> {
        let first = self.expect_ident("sort property")?;

        if let Some(direction) = direction_keyword(&first) {
            return Ok(SortPredicate {
                property: String::new(),
                direction,
            });
        }

        let direction = match self.peek() {
            Some(Token::Ident(text)) => match direction_keyword(text) {
                Some(direction) => {
                    self.pos += 1;
                    direction
                }
                None => SortDirection::Ascending,
            },
            _ => SortDirection::Ascending,
        };

        Ok(SortPredicate {
            property: first,
            direction,
        })
    }
}

fn direction_keyword(text: &str) -> Option<SortDirection> {
    if text.eq_ignore_ascii_case("asc") {
        Some(SortDirection::Ascending)
    } else if text.eq_ignore_ascii_case("desc") {
        Some(SortDirection::Descending)
    } else {
        None
    }
}

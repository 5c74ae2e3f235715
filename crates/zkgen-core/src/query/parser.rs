/// Parser for SELECT queries
///
/// Converts a stream of tokens into an Abstract Syntax Tree (AST).
use super::ast::*;
use super::lexer::{Lexer, LexerError, Token};
use std::fmt;

/// Deepest expression nesting the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parser for SELECT queries
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    /// Create a new parser from query text
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize().map_err(ParseError::LexerError)?;
        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
        })
    }

    /// Parse the query into an AST
    pub fn parse(&mut self) -> Result<Query, ParseError> {
        let select = self.parse_select()?;
        let from = self.parse_from()?;
        let where_clause = self.parse_where()?;

        self.expect_token(Token::Eof)?;

        Ok(Query {
            select,
            from,
            where_clause,
        })
    }

    fn parse_select(&mut self) -> Result<SelectClause, ParseError> {
        self.expect_token(Token::Select)?;

        if self.current_token() == &Token::Asterisk {
            self.advance();
            return Ok(SelectClause {
                columns: vec![SelectColumn::Wildcard],
            });
        }

        if self.current_token() == &Token::From {
            return Err(ParseError::EmptySelectList);
        }

        let mut columns = Vec::new();

        loop {
            if let Token::Identifier(name) = self.current_token().clone() {
                self.advance();
                columns.push(SelectColumn::Column(name));
            } else {
                return Err(ParseError::UnexpectedToken {
                    expected: "column name or *".to_string(),
                    found: self.current_token().clone(),
                });
            }

            if self.current_token() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        Ok(SelectClause { columns })
    }

    fn parse_from(&mut self) -> Result<FromClause, ParseError> {
        self.expect_token(Token::From)?;

        if let Token::Identifier(table) = self.current_token().clone() {
            self.advance();
            Ok(FromClause { table })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: "table name".to_string(),
                found: self.current_token().clone(),
            })
        }
    }

    fn parse_where(&mut self) -> Result<Option<WhereClause>, ParseError> {
        if self.current_token() != &Token::Where {
            return Ok(None);
        }

        self.advance();
        let condition = self.parse_expression()?;

        Ok(Some(WhereClause { condition }))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        let mut chained = 0;

        while self.current_token() == &Token::Or {
            self.advance();
            self.descend()?;
            chained += 1;
            let right = self.parse_logical_and()?;
            left = Expression::LogicalOp {
                left: Box::new(left),
                op: LogicalOperator::Or,
                right: Box::new(right),
            };
        }

        self.depth -= chained;
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_not()?;
        let mut chained = 0;

        while self.current_token() == &Token::And {
            self.advance();
            self.descend()?;
            chained += 1;
            let right = self.parse_not()?;
            left = Expression::LogicalOp {
                left: Box::new(left),
                op: LogicalOperator::And,
                right: Box::new(right),
            };
        }

        self.depth -= chained;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if self.current_token() == &Token::Not {
            self.advance();
            self.descend()?;
            let expr = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expression::Not(Box::new(expr)));
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_primary()?;

        if self.current_token() == &Token::Between {
            self.advance();
            let min = self.parse_primary()?;
            self.expect_token(Token::And)?;
            let max = self.parse_primary()?;

            return Ok(Expression::Between {
                expr: Box::new(left),
                min: Box::new(min),
                max: Box::new(max),
            });
        }

        let op = match self.current_token() {
            Token::Eq => BinaryOperator::Eq,
            Token::Ne => BinaryOperator::Ne,
            Token::Lt => BinaryOperator::Lt,
            Token::Le => BinaryOperator::Le,
            Token::Gt => BinaryOperator::Gt,
            Token::Ge => BinaryOperator::Ge,
            _ => return Ok(left),
        };

        self.advance();
        let right = self.parse_primary()?;

        Ok(Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.current_token().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Expression::Column(name))
            }
            Token::Integer(value) => {
                self.advance();
                Ok(Expression::Literal(value))
            }
            Token::LeftParen => {
                self.advance();
                self.descend()?;
                let expr = self.parse_expression()?;
                self.expect_token(Token::RightParen)?;
                self.depth -= 1;
                Ok(expr)
            }
            token => Err(ParseError::UnexpectedToken {
                expected: "column, integer or '('".to_string(),
                found: token,
            }),
        }
    }

    // Chained AND/OR count as nesting too: they build left-deep trees that the
    // planner and Display walk recursively.
    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        Ok(())
    }

    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("{}", expected),
                found: self.current_token().clone(),
            })
        }
    }
}

/// Parse query text into an AST.
///
/// ```
/// use zkgen_core::query::parse_query;
///
/// let query = parse_query("SELECT * FROM db WHERE c0 < 25 AND c1 = 3").unwrap();
/// assert_eq!(query.from.table, "db");
/// ```
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    Parser::new(input)?.parse()
}

/// Parser errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    LexerError(LexerError),
    UnexpectedToken { expected: String, found: Token },
    EmptySelectList,
    NestingTooDeep { limit: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::LexerError(e) => write!(f, "Lexer error: {}", e),
            ParseError::UnexpectedToken { expected, found } => {
                write!(f, "Expected {}, found {}", expected, found)
            }
            ParseError::EmptySelectList => write!(f, "SELECT list cannot be empty"),
            ParseError::NestingTooDeep { limit } => {
                write!(f, "Expression nesting exceeds {} levels", limit)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::LexerError(e) => Some(e),
            _ => None,
        }
    }
}

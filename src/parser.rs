/*!
Recursive‑descent parser: token slice → owned [`Stmt`] list.

Time & Space
------------
* **n** = number of tokens (including the sole EOF).

| Phase / function              | Cost | Rationale                                              |
|-------------------------------|-----:|--------------------------------------------------------|
| `Parser::parse` main loop     | Θ(n) | Each token is consumed once via `advance()`.           |
| Error recovery `synchronize()`| O(k) | Discards tokens up to the next statement boundary.     |

Call‑stack depth grows with syntactic nesting.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`                | `debug`| Descent into grammar branches.            |
| Recovered errors             | `warn` | Every error after the first one reported. |

Grammar
-------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt | returnStmt
               | whileStmt | breakStmt | continueStmt | block ;
block          → "{" declaration* "}" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | ternary ;
ternary        → logic_or ( "?" expression ":" ternary )? ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT
               | "fun" "(" parameters? ")" block ;
```
*/

use std::rc::Rc;

use crate::ast::{
    BinaryOp, Expr, ExprIdGen, FunctionDecl, LiteralValue, LogicalOp, Name, Stmt, UnaryOp,
};
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info, warn};

const MAX_ARGS: usize = 255;

/// Top‑level parser over an immutable slice of tokens ending in `EOF`.
///
/// Resolvable nodes draw their ids from the borrowed generator, so a session
/// can parse many inputs without id collisions.
pub struct Parser<'a, 'g> {
    tokens: &'a [Token<'a>],
    current: usize,
    ids: &'g mut ExprIdGen,
}

impl<'a, 'g> Parser<'a, 'g> {
    pub fn new(tokens: &'a [Token<'a>], ids: &'g mut ExprIdGen) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            ids,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program. After an error the parser synchronises and
    /// keeps going so later errors are logged; the first one is returned.
    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();
        let mut first_error: Option<LoxError> = None;

        if self.tokens.is_empty() {
            return Ok(statements);
        }

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),

                Err(e) => {
                    warn!("Parse error: {}", e);

                    first_error.get_or_insert(e);
                    self.synchronize();
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Parsed {} statements", statements.len());

                Ok(statements)
            }
        }
    }

    /// Parse the input as a single expression followed by `EOF`.
    pub fn parse_expression(&mut self) -> Result<Expr> {
        if self.tokens.is_empty() {
            return Err(LoxError::parse(1, "at end: Expect expression."));
        }

        let expr = self.expression()?;

        if !self.is_at_end() {
            return Err(self.error_at_current("Expect end of expression."));
        }

        Ok(expr)
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.check(TokenType::FUN) && self.check_next(TokenType::IDENTIFIER) {
            self.advance();
            Ok(Stmt::Function(self.function("function")?))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = Name::from(self.consume(TokenType::IDENTIFIER, "Expect class name.")?);

        let superclass = if self.matches(TokenType::LESS) {
            let super_name = self.consume(TokenType::IDENTIFIER, "Expect superclass name.")?;

            Some(Expr::Variable {
                id: self.ids.fresh(),
                name: Name::from(super_name),
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// `IDENT "(" parameters? ")" block` for functions and methods.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name = Name::from(
            self.consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?,
        );

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let line = name.line;
        let params = self.parameters()?;

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name: Some(name),
            params,
            body,
            line,
        }))
    }

    /// Parameter list up to and including the closing `)`.
    fn parameters(&mut self) -> Result<Vec<Name>> {
        let mut params: Vec<Name> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGS {
                    return Err(self.error_at_current("Can't have more than 255 parameters."));
                }

                params.push(Name::from(
                    self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?,
                ));

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;

        Ok(params)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = Name::from(self.consume(TokenType::IDENTIFIER, "Expect variable name.")?);

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────
    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::BREAK) {
            let line = self.previous().line;
            self.consume(TokenType::SEMICOLON, "Expect ';' after 'break'.")?;
            Ok(Stmt::Break { line })
        } else if self.matches(TokenType::CONTINUE) {
            let line = self.previous().line;
            self.consume(TokenType::SEMICOLON, "Expect ';' after 'continue'.")?;
            Ok(Stmt::Continue { line })
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let line = self.previous().line;
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { line, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────
    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.ternary()?;

        if self.matches(TokenType::EQUAL) {
            let equals_line = self.previous().line;
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: self.ids.fresh(),
                    name,
                    value,
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),

                _ => Err(LoxError::parse(
                    equals_line,
                    "at '=': Invalid assignment target.",
                )),
            };
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr> {
        let condition = self.logical_or()?;

        if self.matches(TokenType::QUESTION) {
            let then_branch = self.expression()?;
            self.consume(
                TokenType::COLON,
                "Expect ':' after then branch of conditional expression.",
            )?;
            let else_branch = self.ternary()?;

            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(condition)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// One left-associative binary precedence level.
    fn binary_level(
        &mut self,
        operators: &[(TokenType, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr = operand(self)?;

        'outer: loop {
            for (token_type, operator) in operators {
                if self.matches(token_type.clone()) {
                    let line = self.previous().line;
                    let right = operand(self)?;

                    expr = Expr::Binary {
                        left: Box::new(expr),
                        operator: *operator,
                        right: Box::new(right),
                        line,
                    };

                    continue 'outer;
                }
            }

            return Ok(expr);
        }
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::BANG_EQUAL, BinaryOp::BangEqual),
                (TokenType::EQUAL_EQUAL, BinaryOp::EqualEqual),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::GREATER, BinaryOp::Greater),
                (TokenType::GREATER_EQUAL, BinaryOp::GreaterEqual),
                (TokenType::LESS, BinaryOp::Less),
                (TokenType::LESS_EQUAL, BinaryOp::LessEqual),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::MINUS, BinaryOp::Minus),
                (TokenType::PLUS, BinaryOp::Plus),
            ],
            Self::factor,
        )
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::STAR, BinaryOp::Star),
                (TokenType::SLASH, BinaryOp::Slash),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        let operator = if self.matches(TokenType::BANG) {
            Some(UnaryOp::Bang)
        } else if self.matches(TokenType::MINUS) {
            Some(UnaryOp::Minus)
        } else {
            None
        };

        if let Some(operator) = operator {
            let line = self.previous().line;
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
                line,
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name = self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name: Name::from(name),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    return Err(self.error_at_current("Can't have more than 255 arguments."));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            line: paren.line,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek();

        let expr = match &token.token_type {
            TokenType::FALSE => Expr::Literal(LiteralValue::False),
            TokenType::TRUE => Expr::Literal(LiteralValue::True),
            TokenType::NIL => Expr::Literal(LiteralValue::Nil),
            TokenType::NUMBER(n) => Expr::Literal(LiteralValue::Number(*n)),
            TokenType::STRING(s) => Expr::Literal(LiteralValue::Str(s.clone())),

            TokenType::IDENTIFIER => Expr::Variable {
                id: self.ids.fresh(),
                name: Name::from(token),
            },

            TokenType::THIS => Expr::This {
                id: self.ids.fresh(),
                line: token.line,
            },

            TokenType::SUPER => {
                self.advance();
                self.consume(TokenType::DOT, "Expect '.' after 'super'.")?;
                let method = self.consume(TokenType::IDENTIFIER, "Expect superclass method name.")?;

                return Ok(Expr::Super {
                    id: self.ids.fresh(),
                    method: Name::from(method),
                    line: token.line,
                });
            }

            TokenType::FUN => {
                self.advance();
                self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'fun'.")?;
                let params = self.parameters()?;
                self.consume(TokenType::LEFT_BRACE, "Expect '{' before lambda body.")?;
                let body = self.block()?;

                return Ok(Expr::Lambda(Rc::new(FunctionDecl {
                    name: None,
                    params,
                    body,
                    line: token.line,
                })));
            }

            TokenType::LEFT_PAREN => {
                self.advance();
                let expr: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

                return Ok(Expr::Grouping(Box::new(expr)));
            }

            _ => return Err(self.error_at_current("Expect expression.")),
        };

        self.advance();

        Ok(expr)
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error_at_current(message))
    }

    fn error_at_current(&self, message: &str) -> LoxError {
        let token = self.peek();

        let location = match token.token_type {
            TokenType::EOF => "at end".to_string(),
            _ => format!("at '{}'", token.lexeme),
        };

        LoxError::parse(token.line, format!("{}: {}", location, message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn check_next(&self, ttype: TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.token_type == ttype,
            None => false,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    /// Current token; a slice without `EOF` is treated as ending at its last token.
    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}

//! Recursive-descent + Pratt-style expression parser.

use crate::ast::*;
use crate::lexer;
use crate::tokens::{Token, TokenKind};
use policy_core::{Fqn, Range, Trinary};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub range: Range,
}

pub fn parse(source: &str, file: impl Into<Arc<str>>) -> (Program, Vec<ParseError>) {
    let file: Arc<str> = file.into();
    let tokens = lexer::tokenize(source, file.clone());
    let mut parser = Parser {
        tokens,
        pos: 0,
        errors: Vec::new(),
    };
    let start = parser.current_range();
    let mut statements = Vec::new();

    while parser.is_comment_token() {
        statements.push(parser.parse_comment_stmt());
    }
    if parser.check_kind(TokenKind::Namespace) {
        statements.push(parser.parse_namespace());
    } else {
        parser.error(
            "a policy file must begin with a 'namespace' statement",
            parser.current_range(),
        );
    }

    while !parser.at_eof() {
        if parser.is_comment_token() {
            statements.push(parser.parse_comment_stmt());
            continue;
        }
        match parser.peek().kind {
            TokenKind::Semicolon => {
                parser.bump();
            }
            TokenKind::Namespace => {
                parser.error(
                    "only one 'namespace' statement is allowed per file",
                    parser.current_range(),
                );
                parser.bump();
                parser.synchronize_top_level();
            }
            TokenKind::Policy => statements.push(parser.parse_policy()),
            TokenKind::Shape => statements.push(parser.parse_shape()),
            TokenKind::Export => statements.push(parser.parse_shape_export()),
            _ => {
                parser.error(
                    format!("unexpected token '{}' at top level", parser.peek().kind),
                    parser.current_range(),
                );
                parser.bump();
                parser.synchronize_top_level();
            }
        }
    }

    let end = parser.current_range();
    let range = start.merge(&end);
    (
        Program {
            file,
            statements,
            range,
        },
        parser.errors,
    )
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn current_range(&self) -> Range {
        self.peek().range.clone()
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(&kind)
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.check_kind(kind) {
            self.bump();
            true
        } else {
            self.error(
                format!("expected {what}, found '{}'", self.peek().kind),
                self.current_range(),
            );
            false
        }
    }

    fn expect_ident_tok(&mut self, what: &str) -> Option<Token> {
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            Some(self.bump())
        } else {
            self.error(format!("expected {what}"), self.current_range());
            None
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<String> {
        self.expect_ident_tok(what).map(|t| match t.kind {
            TokenKind::Ident(s) => s,
            _ => unreachable!(),
        })
    }

    fn error(&mut self, message: impl Into<String>, range: Range) {
        self.errors.push(ParseError {
            message: message.into(),
            range,
        });
    }

    fn is_comment_token(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::LineComment(_) | TokenKind::TrailingComment(_)
        )
    }

    fn parse_comment_stmt(&mut self) -> Statement {
        let tok = self.bump();
        let text = match tok.kind {
            TokenKind::LineComment(s) | TokenKind::TrailingComment(s) => s,
            _ => unreachable!(),
        };
        Statement::Comment(CommentStmt { text, range: tok.range })
    }

    fn synchronize_top_level(&mut self) {
        while !self.at_eof() {
            match self.peek().kind {
                TokenKind::Namespace | TokenKind::Policy | TokenKind::Shape | TokenKind::Export => break,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn synchronize_policy_body(&mut self) {
        while !self.at_eof() {
            match self.peek().kind {
                TokenKind::Let
                | TokenKind::Fact
                | TokenKind::Use
                | TokenKind::Rule
                | TokenKind::Export
                | TokenKind::Shape
                | TokenKind::RBrace => break,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_fqn(&mut self) -> (Fqn, Range) {
        let mut parts = Vec::new();
        let mut range = self.current_range();
        if let Some(tok) = self.expect_ident_tok("a path segment") {
            if let TokenKind::Ident(name) = tok.kind {
                parts.push(name);
            }
            range = tok.range;
        }
        while self.check_kind(TokenKind::Slash) {
            self.bump();
            if let Some(tok) = self.expect_ident_tok("a path segment") {
                range = range.merge(&tok.range);
                if let TokenKind::Ident(name) = tok.kind {
                    parts.push(name);
                }
            } else {
                break;
            }
        }
        (Fqn::new(parts), range)
    }

    // ── Statements ──

    fn parse_namespace(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        let (fqn, fqn_range) = self.parse_fqn();
        if self.check_kind(TokenKind::Semicolon) {
            self.bump();
        }
        Statement::Namespace(NamespaceStmt {
            fqn,
            range: start.merge(&fqn_range),
        })
    }

    fn parse_policy(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        let name = self.expect_ident("a policy name").unwrap_or_default();
        self.expect_kind(TokenKind::LBrace, "'{'");
        let mut body = Vec::new();
        while !self.check_kind(TokenKind::RBrace) && !self.at_eof() {
            if self.is_comment_token() {
                body.push(self.parse_comment_stmt());
                continue;
            }
            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.bump();
                }
                TokenKind::Let => body.push(self.parse_var_decl()),
                TokenKind::Fact => body.push(self.parse_fact()),
                TokenKind::Use => body.push(self.parse_use()),
                TokenKind::Rule => body.push(self.parse_rule()),
                TokenKind::Export => body.push(self.parse_rule_export()),
                TokenKind::Shape => body.push(self.parse_shape()),
                _ => {
                    self.error(
                        format!("unexpected token '{}' in policy body", self.peek().kind),
                        self.current_range(),
                    );
                    self.bump();
                    self.synchronize_policy_body();
                }
            }
        }
        let end = self.current_range();
        self.expect_kind(TokenKind::RBrace, "'}'");
        Statement::Policy(PolicyStmt {
            name,
            body,
            range: start.merge(&end),
        })
    }

    fn parse_shape_export(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        self.expect_kind(TokenKind::Shape, "'shape'");
        let (name, end) = match self.expect_ident_tok("a shape name") {
            Some(tok) => {
                let end = tok.range.clone();
                let name = match tok.kind {
                    TokenKind::Ident(s) => s,
                    _ => unreachable!(),
                };
                (name, end)
            }
            None => (String::new(), self.current_range()),
        };
        Statement::ShapeExport(ShapeExportStmt {
            name,
            range: start.merge(&end),
        })
    }

    fn parse_rule_export(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        self.expect_kind(TokenKind::Decision, "'decision'");
        self.expect_kind(TokenKind::Of, "'of'");
        let of = self.expect_ident("the exported rule's name").unwrap_or_default();
        let mut attachments = Vec::new();
        let mut end = self.current_range();
        while self.check_kind(TokenKind::Attach) {
            let a_start = self.current_range();
            self.bump();
            let what = self.expect_ident("an attachment name").unwrap_or_default();
            self.expect_kind(TokenKind::As, "'as'");
            let as_expr = self.parse_expression();
            let range = a_start.merge(as_expr.range());
            end = range.clone();
            attachments.push(Expression::Attachment(AttachmentNode { what, as_expr, range }));
        }
        Statement::RuleExport(RuleExportStmt {
            of,
            attachments,
            range: start.merge(&end),
        })
    }

    fn parse_fact(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        let name = self.expect_ident("a fact name").unwrap_or_default();
        let optional = if self.check_kind(TokenKind::Question) {
            self.bump();
            true
        } else {
            false
        };
        self.expect_kind(TokenKind::Colon, "':'");
        let type_ref = self.parse_type_ref();
        let alias = if self.check_kind(TokenKind::As) {
            self.bump();
            self.expect_ident("an alias").unwrap_or_else(|| name.clone())
        } else {
            name.clone()
        };
        let default = if self.check_kind(TokenKind::Default) {
            self.bump();
            Some(self.parse_expression())
        } else {
            None
        };
        let end = default
            .as_ref()
            .map(|d| d.range().clone())
            .unwrap_or_else(|| type_ref.range.clone());
        Statement::Fact(FactStmt {
            name,
            type_ref,
            alias,
            default,
            optional,
            range: start.merge(&end),
        })
    }

    fn parse_use(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        self.expect_kind(TokenKind::LBrace, "'{'");
        let mut modules = Vec::new();
        if !self.check_kind(TokenKind::RBrace) {
            loop {
                modules.push(self.expect_ident("a module name").unwrap_or_default());
                if self.check_kind(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect_kind(TokenKind::RBrace, "'}'");
        self.expect_kind(TokenKind::From, "'from'");
        let mut from_string = None;
        let mut from_lib_parts = None;
        let mut default_alias = String::new();
        match self.peek().kind.clone() {
            TokenKind::String(s) => {
                self.bump();
                default_alias = s.rsplit('/').next().unwrap_or(&s).to_string();
                from_string = Some(s);
            }
            TokenKind::At => {
                self.bump();
                let mut parts = vec![self.expect_ident("a library path segment").unwrap_or_default()];
                while self.check_kind(TokenKind::Slash) {
                    self.bump();
                    parts.push(self.expect_ident("a library path segment").unwrap_or_default());
                }
                default_alias = parts.last().cloned().unwrap_or_default();
                from_lib_parts = Some(parts);
            }
            _ => {
                self.error(
                    "expected a string literal or '@' library path after 'from'",
                    self.current_range(),
                );
            }
        }
        let alias = if self.check_kind(TokenKind::As) {
            self.bump();
            self.expect_ident("an alias").unwrap_or(default_alias)
        } else {
            default_alias
        };
        let end = self.current_range();
        Statement::Use(UseStmt {
            modules,
            from_string,
            from_lib_parts,
            alias,
            range: start.merge(&end),
        })
    }

    fn parse_rule(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        let name = self.expect_ident("a rule name").unwrap_or_default();
        self.expect_kind(TokenKind::Assign, "'='");
        let default = if self.check_kind(TokenKind::Default) {
            self.bump();
            Some(self.parse_expression())
        } else {
            None
        };
        let when = if self.check_kind(TokenKind::When) {
            self.bump();
            Some(self.parse_expression())
        } else {
            None
        };
        let body = self.parse_expression();
        let end = body.range().clone();
        Statement::Rule(RuleStmt {
            name,
            default,
            when,
            body,
            range: start.merge(&end),
        })
    }

    fn parse_var_decl(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        let name = self.expect_ident("a variable name").unwrap_or_default();
        let type_ref = if self.check_kind(TokenKind::Colon) {
            self.bump();
            Some(self.parse_type_ref())
        } else {
            None
        };
        self.expect_kind(TokenKind::Assign, "'='");
        let value = self.parse_expression();
        let end = value.range().clone();
        Statement::VarDecl(VarDeclStmt {
            name,
            type_ref,
            value,
            range: start.merge(&end),
        })
    }

    fn parse_shape(&mut self) -> Statement {
        let start = self.current_range();
        self.bump();
        let name = self.expect_ident("a shape name").unwrap_or_default();
        let with = if self.check_kind(TokenKind::With) {
            self.bump();
            Some(self.parse_fqn().0)
        } else {
            None
        };
        let (body, end) = if with.is_some() || self.check_kind(TokenKind::LBrace) {
            self.expect_kind(TokenKind::LBrace, "'{'");
            let mut fields = Vec::new();
            while !self.check_kind(TokenKind::RBrace) && !self.at_eof() {
                if self.is_comment_token() {
                    self.bump();
                    continue;
                }
                let field_start = self.current_range();
                let fname = self.expect_ident("a field name").unwrap_or_default();
                let mut not_null = false;
                let mut optional = false;
                loop {
                    match self.peek().kind {
                        TokenKind::Bang => {
                            self.bump();
                            not_null = true;
                        }
                        TokenKind::Question => {
                            self.bump();
                            optional = true;
                        }
                        _ => break,
                    }
                }
                self.expect_kind(TokenKind::Colon, "':'");
                let type_ref = self.parse_type_ref();
                let range = field_start.merge(&type_ref.range);
                fields.push((fname, ShapeField { type_ref, not_null, optional, range }));
                if self.check_kind(TokenKind::Comma) {
                    self.bump();
                }
            }
            let end = self.current_range();
            self.expect_kind(TokenKind::RBrace, "'}'");
            (ShapeBody::Complex { with, fields }, end)
        } else {
            let type_ref = self.parse_type_ref();
            let end = type_ref.range.clone();
            (ShapeBody::Simple(type_ref), end)
        };
        Statement::Shape(ShapeStmt {
            name,
            body,
            range: start.merge(&end),
        })
    }

    // ── Type references ──

    fn parse_type_ref(&mut self) -> TypeRef {
        let start = self.current_range();
        let (kind, mut end) = match self.peek().kind.clone() {
            TokenKind::StringTy => {
                self.bump();
                (TypeRefKind::String, start.clone())
            }
            TokenKind::IntTy => {
                self.bump();
                (TypeRefKind::Int, start.clone())
            }
            TokenKind::FloatTy => {
                self.bump();
                (TypeRefKind::Float, start.clone())
            }
            TokenKind::BooleanTy => {
                self.bump();
                (TypeRefKind::Boolean, start.clone())
            }
            TokenKind::DocumentTy => {
                self.bump();
                (TypeRefKind::Document, start.clone())
            }
            TokenKind::ListTy => {
                self.bump();
                self.expect_kind(TokenKind::LBracket, "'['");
                let elem = self.parse_type_ref();
                let end = self.current_range();
                self.expect_kind(TokenKind::RBracket, "']'");
                (TypeRefKind::List(Box::new(elem)), end)
            }
            TokenKind::Map => {
                self.bump();
                self.expect_kind(TokenKind::LBracket, "'['");
                let value = self.parse_type_ref();
                let end = self.current_range();
                self.expect_kind(TokenKind::RBracket, "']'");
                (TypeRefKind::Map(Box::new(value)), end)
            }
            TokenKind::RecordTy => {
                self.bump();
                self.expect_kind(TokenKind::LBracket, "'['");
                let mut fields = vec![self.parse_type_ref()];
                while self.check_kind(TokenKind::Comma) {
                    self.bump();
                    fields.push(self.parse_type_ref());
                }
                let end = self.current_range();
                self.expect_kind(TokenKind::RBracket, "']'");
                (TypeRefKind::Record(fields), end)
            }
            TokenKind::Ident(_) => {
                let (fqn, fqn_range) = self.parse_fqn();
                (TypeRefKind::Shape(fqn), fqn_range)
            }
            _ => {
                self.error(
                    format!("expected a type reference, found '{}'", self.peek().kind),
                    start.clone(),
                );
                self.bump();
                (TypeRefKind::Document, start.clone())
            }
        };
        let mut constraints = Vec::new();
        while self.check_kind(TokenKind::At) {
            let c_start = self.current_range();
            self.bump();
            let name = self.expect_ident("a constraint name").unwrap_or_default();
            let mut args = Vec::new();
            if self.check_kind(TokenKind::LParen) {
                self.bump();
                if !self.check_kind(TokenKind::RParen) {
                    loop {
                        args.push(self.parse_constraint_arg());
                        if self.check_kind(TokenKind::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                end = self.current_range();
                self.expect_kind(TokenKind::RParen, "')'");
            } else {
                end = c_start.clone();
            }
            constraints.push(Constraint {
                name,
                args,
                range: c_start.merge(&end),
            });
        }
        TypeRef {
            kind,
            constraints,
            range: start.merge(&end),
        }
    }

    fn parse_constraint_arg(&mut self) -> ConstraintArg {
        match self.peek().kind.clone() {
            TokenKind::String(s) => {
                self.bump();
                ConstraintArg::String(s)
            }
            TokenKind::Int(n) => {
                self.bump();
                ConstraintArg::Int(n)
            }
            TokenKind::Float(n) => {
                self.bump();
                ConstraintArg::Float(n)
            }
            TokenKind::True => {
                self.bump();
                ConstraintArg::Trinary(Trinary::True)
            }
            TokenKind::False => {
                self.bump();
                ConstraintArg::Trinary(Trinary::False)
            }
            TokenKind::Unknown => {
                self.bump();
                ConstraintArg::Trinary(Trinary::Unknown)
            }
            TokenKind::Null => {
                self.bump();
                ConstraintArg::Null
            }
            TokenKind::Minus => {
                self.bump();
                match self.peek().kind.clone() {
                    TokenKind::Int(n) => {
                        self.bump();
                        ConstraintArg::Int(-n)
                    }
                    TokenKind::Float(n) => {
                        self.bump();
                        ConstraintArg::Float(-n)
                    }
                    _ => {
                        self.error("expected a number after '-'", self.current_range());
                        ConstraintArg::Null
                    }
                }
            }
            TokenKind::LBracket => {
                self.bump();
                let mut items = Vec::new();
                if !self.check_kind(TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_constraint_arg());
                        if self.check_kind(TokenKind::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                self.expect_kind(TokenKind::RBracket, "']'");
                ConstraintArg::List(items)
            }
            TokenKind::LBrace => {
                self.bump();
                let mut entries = Vec::new();
                if !self.check_kind(TokenKind::RBrace) {
                    loop {
                        let key = match self.peek().kind.clone() {
                            TokenKind::Ident(s) => {
                                self.bump();
                                s
                            }
                            TokenKind::String(s) => {
                                self.bump();
                                s
                            }
                            _ => {
                                self.error("expected a map key", self.current_range());
                                self.bump();
                                String::new()
                            }
                        };
                        self.expect_kind(TokenKind::Colon, "':'");
                        let value = self.parse_constraint_arg();
                        entries.push((key, value));
                        if self.check_kind(TokenKind::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                self.expect_kind(TokenKind::RBrace, "'}'");
                ConstraintArg::Map(entries)
            }
            _ => {
                self.error(
                    format!(
                        "expected a literal constraint argument, found '{}'",
                        self.peek().kind
                    ),
                    self.current_range(),
                );
                self.bump();
                ConstraintArg::Null
            }
        }
    }

    // ── Expressions ──

    fn parse_expression(&mut self) -> Box<Expression> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Box<Expression> {
        let cond = self.parse_or();
        if self.check_kind(TokenKind::Question) {
            self.bump();
            let then_branch = if self.check_kind(TokenKind::Colon) {
                cond.clone()
            } else {
                self.parse_expression()
            };
            self.expect_kind(TokenKind::Colon, "':'");
            let else_branch = self.parse_expression();
            let range = cond.range().merge(else_branch.range());
            Box::new(Expression::Ternary {
                cond,
                then_branch,
                else_branch,
                range,
            })
        } else {
            cond
        }
    }

    fn parse_or(&mut self) -> Box<Expression> {
        let mut left = self.parse_xor();
        while self.check_kind(TokenKind::Or) {
            self.bump();
            let right = self.parse_xor();
            let range = left.range().merge(right.range());
            left = Box::new(Expression::Infix {
                left,
                op: InfixOp::Or,
                right,
                range,
            });
        }
        left
    }

    fn parse_xor(&mut self) -> Box<Expression> {
        let mut left = self.parse_and();
        while self.check_kind(TokenKind::Xor) {
            self.bump();
            let right = self.parse_and();
            let range = left.range().merge(right.range());
            left = Box::new(Expression::Infix {
                left,
                op: InfixOp::Xor,
                right,
                range,
            });
        }
        left
    }

    fn parse_and(&mut self) -> Box<Expression> {
        let mut left = self.parse_equality();
        while self.check_kind(TokenKind::And) {
            self.bump();
            let right = self.parse_equality();
            let range = left.range().merge(right.range());
            left = Box::new(Expression::Infix {
                left,
                op: InfixOp::And,
                right,
                range,
            });
        }
        left
    }

    fn parse_equality(&mut self) -> Box<Expression> {
        let mut left = self.parse_comparison();
        loop {
            match self.peek().kind {
                TokenKind::EqEq => {
                    self.bump();
                    let right = self.parse_comparison();
                    let range = left.range().merge(right.range());
                    left = Box::new(Expression::Infix {
                        left,
                        op: InfixOp::Eq,
                        right,
                        range,
                    });
                }
                TokenKind::NotEq => {
                    self.bump();
                    let right = self.parse_comparison();
                    let range = left.range().merge(right.range());
                    left = Box::new(Expression::Infix {
                        left,
                        op: InfixOp::NotEq,
                        right,
                        range,
                    });
                }
                TokenKind::Is => {
                    self.bump();
                    match self.peek().kind {
                        TokenKind::Defined => {
                            let tok = self.bump();
                            let range = left.range().merge(&tok.range);
                            left = Box::new(Expression::IsDefined { left, range });
                        }
                        TokenKind::Empty => {
                            let tok = self.bump();
                            let range = left.range().merge(&tok.range);
                            left = Box::new(Expression::IsEmpty { left, range });
                        }
                        _ => {
                            self.error("expected 'defined' or 'empty' after 'is'", self.current_range());
                        }
                    }
                }
                _ => break,
            }
        }
        left
    }

    fn parse_comparison(&mut self) -> Box<Expression> {
        let mut left = self.parse_unary();
        loop {
            match self.peek().kind {
                TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
                    let op_tok = self.bump();
                    let op = match op_tok.kind {
                        TokenKind::Lt => InfixOp::Lt,
                        TokenKind::LtEq => InfixOp::LtEq,
                        TokenKind::Gt => InfixOp::Gt,
                        TokenKind::GtEq => InfixOp::GtEq,
                        _ => unreachable!(),
                    };
                    let right = self.parse_unary();
                    let range = left.range().merge(right.range());
                    left = Box::new(Expression::Infix { left, op, right, range });
                }
                TokenKind::In | TokenKind::Contains | TokenKind::Matches => {
                    let op_tok = self.bump();
                    let op = match op_tok.kind {
                        TokenKind::In => InfixOp::In,
                        TokenKind::Contains => InfixOp::Contains,
                        TokenKind::Matches => InfixOp::Matches,
                        _ => unreachable!(),
                    };
                    let right = self.parse_unary();
                    let range = left.range().merge(right.range());
                    left = Box::new(Expression::Infix { left, op, right, range });
                }
                TokenKind::Not
                    if matches!(
                        self.peek_at(1).kind,
                        TokenKind::In | TokenKind::Contains | TokenKind::Matches
                    ) =>
                {
                    self.bump();
                    let op_tok = self.bump();
                    let op = match op_tok.kind {
                        TokenKind::In => InfixOp::In,
                        TokenKind::Contains => InfixOp::Contains,
                        TokenKind::Matches => InfixOp::Matches,
                        _ => unreachable!(),
                    };
                    let right = self.parse_unary();
                    let inner_range = left.range().merge(right.range());
                    let inner = Box::new(Expression::Infix {
                        left,
                        op,
                        right,
                        range: inner_range.clone(),
                    });
                    left = Box::new(Expression::Unary {
                        op: UnaryOp::Not,
                        right: inner,
                        range: inner_range,
                    });
                }
                _ => break,
            }
        }
        left
    }

    // Binds looser than SUM/PRODUCT but tighter than COMPARISON, matching
    // the ladder's literal ordering rather than the usual "unary binds
    // tightest" convention.
    fn parse_unary(&mut self) -> Box<Expression> {
        match self.peek().kind {
            TokenKind::Not | TokenKind::Bang => {
                let tok = self.bump();
                let operand = self.parse_unary();
                let range = tok.range.merge(operand.range());
                Box::new(Expression::Unary {
                    op: UnaryOp::Not,
                    right: operand,
                    range,
                })
            }
            TokenKind::Minus => {
                let tok = self.bump();
                let operand = self.parse_unary();
                let range = tok.range.merge(operand.range());
                Box::new(Expression::Unary {
                    op: UnaryOp::Neg,
                    right: operand,
                    range,
                })
            }
            _ => self.parse_sum(),
        }
    }

    fn parse_sum(&mut self) -> Box<Expression> {
        let mut left = self.parse_product();
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => InfixOp::Add,
                TokenKind::Minus => InfixOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_product();
            let range = left.range().merge(right.range());
            left = Box::new(Expression::Infix { left, op, right, range });
        }
        left
    }

    fn parse_product(&mut self) -> Box<Expression> {
        let mut left = self.parse_postfix();
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => InfixOp::Mul,
                TokenKind::Slash => InfixOp::Div,
                TokenKind::Percent => InfixOp::Mod,
                _ => break,
            };
            self.bump();
            let right = self.parse_postfix();
            let range = left.range().merge(right.range());
            left = Box::new(Expression::Infix { left, op, right, range });
        }
        left
    }

    fn parse_postfix(&mut self) -> Box<Expression> {
        let mut expr = self.parse_primary();
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.bump();
                    let field_tok = self.expect_ident_tok("a field name");
                    let (field, end) = match field_tok {
                        Some(tok) => {
                            let end = tok.range.clone();
                            let name = match tok.kind {
                                TokenKind::Ident(s) => s,
                                _ => unreachable!(),
                            };
                            (name, end)
                        }
                        None => (String::new(), self.current_range()),
                    };
                    let range = expr.range().merge(&end);
                    expr = Box::new(Expression::FieldAccess { left: expr, field, range });
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expression();
                    let end = self.current_range();
                    self.expect_kind(TokenKind::RBracket, "']'");
                    let range = expr.range().merge(&end);
                    expr = Box::new(Expression::IndexAccess { left: expr, index, range });
                }
                TokenKind::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    if !self.check_kind(TokenKind::RParen) {
                        loop {
                            args.push(*self.parse_expression());
                            if self.check_kind(TokenKind::Comma) {
                                self.bump();
                            } else {
                                break;
                            }
                        }
                    }
                    let mut end = self.current_range();
                    self.expect_kind(TokenKind::RParen, "')'");
                    let mut memoized = false;
                    let mut memoize_ttl_seconds = None;
                    if self.check_kind(TokenKind::Bang) {
                        memoized = true;
                        let bang = self.bump();
                        end = bang.range;
                        if let TokenKind::Int(n) = self.peek().kind {
                            let tok = self.bump();
                            memoize_ttl_seconds = Some(n);
                            end = tok.range;
                        }
                    }
                    let range = expr.range().merge(&end);
                    expr = Box::new(Expression::Call {
                        callee: expr,
                        args,
                        memoized,
                        memoize_ttl_seconds,
                        range,
                    });
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> Box<Expression> {
        let mut leading = Vec::new();
        while self.is_comment_token() {
            let tok = self.bump();
            let text = match tok.kind {
                TokenKind::LineComment(s) | TokenKind::TrailingComment(s) => s,
                _ => unreachable!(),
            };
            leading.push((text, tok.range));
        }
        let mut expr = self.parse_primary_inner();
        // The comment closest to the expression becomes the outermost wrapper.
        for (text, comment_range) in leading {
            let range = comment_range.merge(expr.range());
            expr = Box::new(Expression::PrecedingComment { text, wrapped: expr, range });
        }
        if let TokenKind::TrailingComment(_) = self.peek().kind {
            let tok = self.bump();
            let text = match tok.kind {
                TokenKind::TrailingComment(s) => s,
                _ => unreachable!(),
            };
            let range = expr.range().merge(&tok.range);
            expr = Box::new(Expression::TrailingComment { text, wrapped: expr, range });
        }
        expr
    }

    fn parse_primary_inner(&mut self) -> Box<Expression> {
        match self.peek().kind.clone() {
            TokenKind::Int(n) => {
                let tok = self.bump();
                Box::new(Expression::IntLit(n, tok.lexeme, tok.range))
            }
            TokenKind::Float(n) => {
                let tok = self.bump();
                Box::new(Expression::FloatLit(n, tok.lexeme, tok.range))
            }
            TokenKind::String(s) => {
                let tok = self.bump();
                Box::new(Expression::StringLit(s, tok.range))
            }
            TokenKind::True => {
                let tok = self.bump();
                Box::new(Expression::TrinaryLit(Trinary::True, tok.range))
            }
            TokenKind::False => {
                let tok = self.bump();
                Box::new(Expression::TrinaryLit(Trinary::False, tok.range))
            }
            TokenKind::Unknown => {
                let tok = self.bump();
                Box::new(Expression::TrinaryLit(Trinary::Unknown, tok.range))
            }
            TokenKind::Null => {
                let tok = self.bump();
                Box::new(Expression::Null(tok.range))
            }
            TokenKind::Ident(name) => {
                let tok = self.bump();
                Box::new(Expression::Identifier(name, tok.range))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expression();
                self.expect_kind(TokenKind::RParen, "')'");
                inner
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_block_or_map(),
            TokenKind::Any | TokenKind::All | TokenKind::Filter | TokenKind::Map | TokenKind::Distinct | TokenKind::Count => {
                self.parse_quantifier()
            }
            TokenKind::Reduce => self.parse_reduce(),
            TokenKind::Cast => self.parse_cast(),
            TokenKind::Transform => self.parse_transform(),
            TokenKind::Import => self.parse_import(),
            _ => {
                let range = self.current_range();
                self.error(
                    format!("unexpected token '{}' in expression", self.peek().kind),
                    range.clone(),
                );
                self.bump();
                Box::new(Expression::Null(range))
            }
        }
    }

    fn parse_list_literal(&mut self) -> Box<Expression> {
        let start = self.current_range();
        self.bump();
        let mut items = Vec::new();
        if !self.check_kind(TokenKind::RBracket) {
            loop {
                items.push(*self.parse_expression());
                if self.check_kind(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        let end = self.current_range();
        self.expect_kind(TokenKind::RBracket, "']'");
        Box::new(Expression::ListLiteral(items, start.merge(&end)))
    }

    fn parse_block_or_map(&mut self) -> Box<Expression> {
        let start = self.current_range();
        self.bump();
        match self.peek().kind {
            TokenKind::String(_) | TokenKind::LBracket | TokenKind::RBrace => self.parse_map_literal_body(start),
            _ => self.parse_block_body(start),
        }
    }

    fn parse_map_literal_body(&mut self, start: Range) -> Box<Expression> {
        let mut entries = Vec::new();
        while !self.check_kind(TokenKind::RBrace) && !self.at_eof() {
            let key = if self.check_kind(TokenKind::LBracket) {
                self.bump();
                let e = self.parse_expression();
                self.expect_kind(TokenKind::RBracket, "']'");
                e
            } else {
                self.parse_primary()
            };
            self.expect_kind(TokenKind::Colon, "':'");
            let value = self.parse_expression();
            let range = key.range().merge(value.range());
            entries.push(MapEntry { key, value, range });
            if self.check_kind(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        let end = self.current_range();
        self.expect_kind(TokenKind::RBrace, "'}'");
        Box::new(Expression::MapLiteral(entries, start.merge(&end)))
    }

    fn parse_block_body(&mut self, start: Range) -> Box<Expression> {
        let mut statements = Vec::new();
        loop {
            if self.is_comment_token() {
                statements.push(self.parse_comment_stmt());
                continue;
            }
            if self.check_kind(TokenKind::Let) {
                statements.push(self.parse_var_decl());
                continue;
            }
            if self.check_kind(TokenKind::Yield) {
                self.bump();
                let yield_expr = self.parse_expression();
                let end = self.current_range();
                self.expect_kind(TokenKind::RBrace, "'}'");
                let range = start.merge(&end);
                return Box::new(Expression::Block {
                    statements,
                    yield_expr,
                    range,
                });
            }
            if self.check_kind(TokenKind::RBrace) || self.at_eof() {
                break;
            }
            self.error(
                format!("expected 'let' or 'yield' in block, found '{}'", self.peek().kind),
                self.current_range(),
            );
            self.bump();
        }
        let end = self.current_range();
        self.expect_kind(TokenKind::RBrace, "'}'");
        let range = start.merge(&end);
        Box::new(Expression::Block {
            statements,
            yield_expr: Box::new(Expression::Null(end)),
            range,
        })
    }

    fn parse_quantifier(&mut self) -> Box<Expression> {
        let start = self.current_range();
        let kind = match self.bump().kind {
            TokenKind::Any => QuantifierKind::Any,
            TokenKind::All => QuantifierKind::All,
            TokenKind::Filter => QuantifierKind::Filter,
            TokenKind::Map => QuantifierKind::Map,
            TokenKind::Distinct => QuantifierKind::Distinct,
            TokenKind::Count => QuantifierKind::Count,
            _ => unreachable!(),
        };
        let collection = self.parse_expression();
        self.expect_kind(TokenKind::As, "'as'");
        let value_iter = self.expect_ident("an iterator name").unwrap_or_default();
        let index_iter = if self.check_kind(TokenKind::Comma) {
            self.bump();
            Some(self.expect_ident("a second iterator name").unwrap_or_default())
        } else {
            None
        };
        let brace_range = self.current_range();
        self.expect_kind(TokenKind::LBrace, "'{'");
        let body = self.parse_block_body(brace_range);
        let range = start.merge(body.range());
        Box::new(Expression::Quantifier(QuantifierExpr {
            kind,
            collection,
            value_iter,
            index_iter,
            body,
            range,
        }))
    }

    fn parse_reduce(&mut self) -> Box<Expression> {
        let start = self.current_range();
        self.bump();
        let collection = self.parse_expression();
        self.expect_kind(TokenKind::From, "'from'");
        let from_expr = self.parse_expression();
        self.expect_kind(TokenKind::As, "'as'");
        let accumulator = self.expect_ident("an accumulator name").unwrap_or_default();
        self.expect_kind(TokenKind::Comma, "','");
        let value_iter = self.expect_ident("an iterator name").unwrap_or_default();
        let index_iter = if self.check_kind(TokenKind::Comma) {
            self.bump();
            Some(self.expect_ident("a second iterator name").unwrap_or_default())
        } else {
            None
        };
        let brace_range = self.current_range();
        self.expect_kind(TokenKind::LBrace, "'{'");
        let body = self.parse_block_body(brace_range);
        let range = start.merge(body.range());
        Box::new(Expression::Reduce(ReduceExpr {
            collection,
            from_expr,
            accumulator,
            value_iter,
            index_iter,
            body,
            range,
        }))
    }

    fn parse_cast(&mut self) -> Box<Expression> {
        let start = self.current_range();
        self.bump();
        self.expect_kind(TokenKind::LParen, "'('");
        let expr = self.parse_expression();
        self.expect_kind(TokenKind::Comma, "','");
        let target_type = self.parse_type_ref();
        let end = self.current_range();
        self.expect_kind(TokenKind::RParen, "')'");
        Box::new(Expression::Cast {
            expr,
            target_type,
            range: start.merge(&end),
        })
    }

    fn parse_transform(&mut self) -> Box<Expression> {
        let start = self.current_range();
        self.bump();
        self.expect_kind(TokenKind::LParen, "'('");
        let expr = self.parse_expression();
        self.expect_kind(TokenKind::Comma, "','");
        let jq_program = match self.peek().kind.clone() {
            TokenKind::String(s) => {
                self.bump();
                s
            }
            _ => {
                self.error("expected a string literal jq program", self.current_range());
                String::new()
            }
        };
        let end = self.current_range();
        self.expect_kind(TokenKind::RParen, "')'");
        Box::new(Expression::Transform {
            expr,
            jq_program,
            range: start.merge(&end),
        })
    }

    fn parse_import(&mut self) -> Box<Expression> {
        let start = self.current_range();
        self.bump();
        self.expect_kind(TokenKind::Decision, "'decision'");
        let rule_to_import = self.expect_ident("the rule name to import").unwrap_or_default();
        self.expect_kind(TokenKind::From, "'from'");
        let (from_policy_fqn, mut end) = self.parse_fqn();
        let mut with_clauses = Vec::new();
        while self.check_kind(TokenKind::With) {
            let with_start = self.current_range();
            self.bump();
            let name = self.expect_ident("a parameter name").unwrap_or_default();
            self.expect_kind(TokenKind::As, "'as'");
            let value = self.parse_expression();
            let range = with_start.merge(value.range());
            end = range.clone();
            with_clauses.push(Expression::With(WithClause { name, value, range }));
        }
        Box::new(Expression::Import(ImportExpr {
            rule_to_import,
            from_policy_fqn,
            with_clauses,
            range: start.merge(&end),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        let (program, errors) = parse(src, "t.pl");
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        program
    }

    #[test]
    fn minimal_namespace_has_no_errors() {
        let (program, errors) = parse("namespace minimal", "t.pl");
        assert!(errors.is_empty());
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Statement::Namespace(_)));
    }

    #[test]
    fn missing_namespace_is_an_error() {
        let (_, errors) = parse("policy p {}", "t.pl");
        assert!(!errors.is_empty());
    }

    #[test]
    fn trailing_comment_attaches_to_the_expression_on_its_line() {
        let program = parse_ok("namespace m\npolicy p {\n  let r = 1 -- note\n  rule nonzero = { yield r != 0 }\n  export decision of nonzero\n}");
        let Statement::Policy(policy) = &program.statements[1] else {
            panic!("expected policy");
        };
        let Statement::VarDecl(decl) = &policy.body[0] else {
            panic!("expected let");
        };
        let Expression::TrailingComment { text, .. } = decl.value.as_ref() else {
            panic!("expected a trailing comment wrapping the value, got {:?}", decl.value);
        };
        assert_eq!(text, " note");
    }

    #[test]
    fn precedence_round_trip_matches_arith_example() {
        let program = parse_ok(
            "namespace m\npolicy arith {\n  let r = (2 + 3) * 4 % 5 - 6 / 2\n  rule nonzero = { yield r != 0 }\n  export decision of nonzero\n}",
        );
        let Statement::Policy(policy) = &program.statements[1] else {
            panic!("expected policy");
        };
        let Statement::VarDecl(decl) = &policy.body[0] else {
            panic!("expected let");
        };
        // top-level operator is the last `-`, left-associative chain.
        let Expression::Infix { op, .. } = decl.value.as_ref() else {
            panic!("expected infix");
        };
        assert_eq!(*op, InfixOp::Sub);
    }

    #[test]
    fn ternary_degenerate_form() {
        let expr_tokens = "namespace m\npolicy p {\n  let r = x ? : y\n  rule ok = { yield true }\n  export decision of ok\n}";
        let program = parse_ok(expr_tokens);
        let Statement::Policy(policy) = &program.statements[1] else {
            panic!();
        };
        let Statement::VarDecl(decl) = &policy.body[0] else {
            panic!();
        };
        match decl.value.as_ref() {
            Expression::Ternary {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                assert!(matches!(cond.as_ref(), Expression::Identifier(n, _) if n == "x"));
                assert!(matches!(then_branch.as_ref(), Expression::Identifier(n, _) if n == "x"));
                assert!(matches!(else_branch.as_ref(), Expression::Identifier(n, _) if n == "y"));
            }
            other => panic!("expected ternary, got {other:?}"),
        }
    }

    #[test]
    fn not_in_desugars_to_unary_not_wrapping_infix_in() {
        let program = parse_ok(
            "namespace m\npolicy p {\n  rule r = { yield x not in y }\n  export decision of r\n}",
        );
        let Statement::Policy(policy) = &program.statements[1] else {
            panic!();
        };
        let Statement::Rule(rule) = &policy.body[0] else {
            panic!();
        };
        let Expression::Block { yield_expr, .. } = rule.body.as_ref() else {
            panic!();
        };
        match yield_expr.as_ref() {
            Expression::Unary { op, right, .. } => {
                assert_eq!(*op, UnaryOp::Not);
                assert!(matches!(right.as_ref(), Expression::Infix { op: InfixOp::In, .. }));
            }
            other => panic!("expected unary-not wrapping infix, got {other:?}"),
        }
    }

    #[test]
    fn empty_policy_parses_with_no_errors_parser_defers_to_indexer() {
        // The parser accepts an empty policy body; the indexer is responsible
        // for the "no exports" diagnostic.
        let program = parse_ok("namespace x\npolicy p {}");
        assert_eq!(program.statements.len(), 2);
    }
}

use crate::language::{
    ast::{Ast, DeclaredType, NodeId, ParamSlot, ScopeEntry},
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::Span,
    token::{Token, TokenKind},
};
use crate::runtime::value::NumericValue;

/// Parses a whole source text into one arena plus the top-level expression
/// roots in source order. All tree construction goes through the `Ast`
/// builder methods, never around them.
pub fn parse_program(source: &str) -> Result<(Ast, Vec<NodeId>), SyntaxErrors> {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span))
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(tokens).parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
    ast: Ast,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            ast: Ast::new(),
        }
    }

    fn parse(mut self) -> Result<(Ast, Vec<NodeId>), SyntaxErrors> {
        let mut roots = Vec::new();
        while !self.at_eof() {
            match self.parse_expr() {
                Some(id) => roots.push(id),
                None => self.synchronize(),
            }
        }
        if self.errors.is_empty() {
            Ok((self.ast, roots))
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn error_at(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(SyntaxError::new(message, span));
    }

    /// After a failed form, skip ahead to the next plausible expression
    /// start so one mistake does not cascade.
    fn synchronize(&mut self) {
        while !self.at_eof() {
            match self.peek().kind {
                TokenKind::LParen => return,
                TokenKind::RParen => {
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn expect_rparen(&mut self, context: &str) -> Option<()> {
        let token = self.advance();
        if token.kind == TokenKind::RParen {
            Some(())
        } else {
            self.error_at(
                token.span,
                format!("Expected `)` to close {context}, found {}", token.kind.describe()),
            );
            None
        }
    }

    fn expect_lparen(&mut self, context: &str) -> Option<()> {
        let token = self.advance();
        if token.kind == TokenKind::LParen {
            Some(())
        } else {
            self.error_at(
                token.span,
                format!("Expected `(` to open {context}, found {}", token.kind.describe()),
            );
            None
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Option<(String, Span)> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier(name) => Some((name, token.span)),
            other => {
                self.error_at(
                    token.span,
                    format!("Expected {context}, found {}", other.describe()),
                );
                None
            }
        }
    }

    fn parse_expr(&mut self) -> Option<NodeId> {
        let token = self.advance();
        match token.kind {
            TokenKind::Integer(value) => Some(self.ast.number(NumericValue::Int(value))),
            TokenKind::Float(value) => Some(self.ast.number(NumericValue::Float(value))),
            TokenKind::Identifier(name) => Some(self.ast.symbol(name)),
            TokenKind::LParen => self.parse_form(),
            TokenKind::RParen => {
                self.error_at(token.span, "Unexpected `)`");
                None
            }
            TokenKind::Eof => {
                self.error_at(token.span, "Unexpected end of input, expected an expression");
                None
            }
        }
    }

    fn parse_form(&mut self) -> Option<NodeId> {
        let (name, span) = self.expect_identifier("an operator or form name")?;
        match name.as_str() {
            "let" => self.parse_let(),
            "cond" => self.parse_cond(),
            "lambda" => {
                self.error_at(span, "`lambda` is only valid inside a `let` binding");
                None
            }
            _ => self.parse_call(&name),
        }
    }

    fn parse_call(&mut self, name: &str) -> Option<NodeId> {
        let mut operands = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.at_eof() {
            operands.push(self.parse_expr()?);
        }
        self.expect_rparen(&format!("the call to `{name}`"))?;

        // Operand chains are linked back to front so the chain comes out in
        // source order.
        let mut chain = None;
        for id in operands.into_iter().rev() {
            chain = Some(self.ast.link_sibling(id, chain));
        }
        Some(self.ast.function_call(name, chain))
    }

    fn parse_cond(&mut self) -> Option<NodeId> {
        let condition = self.parse_expr()?;
        let if_true = self.parse_expr()?;
        let if_false = self.parse_expr()?;
        self.expect_rparen("the `cond` form")?;
        Some(self.ast.conditional(condition, if_true, if_false))
    }

    /// `(let (binding+) body)` — the finished table attaches to the body
    /// node, which becomes the whole form's node.
    fn parse_let(&mut self) -> Option<NodeId> {
        self.expect_lparen("the `let` binding list")?;
        let mut table: Vec<ScopeEntry> = Vec::new();
        while self.check(&TokenKind::LParen) {
            let entry = self.parse_binding()?;
            // Prepended, so the table holds bindings in reverse source
            // order; lookup takes the first name match.
            table.insert(0, entry);
        }
        self.expect_rparen("the `let` binding list")?;
        if table.is_empty() {
            let span = self.peek().span;
            self.error_at(span, "`let` requires at least one binding");
            return None;
        }
        let body = self.parse_expr()?;
        self.expect_rparen("the `let` form")?;
        Some(self.ast.attach_scope(table, body))
    }

    fn parse_binding(&mut self) -> Option<ScopeEntry> {
        self.expect_lparen("a binding")?;
        let (first, _) = self.expect_identifier("a binding name or type")?;

        let (declared_type, name) = match first.as_str() {
            "int" | "double" => {
                let declared = if first == "int" {
                    DeclaredType::Int
                } else {
                    DeclaredType::Float
                };
                let (name, _) = self.expect_identifier("a binding name")?;
                (declared, name)
            }
            _ => (DeclaredType::Any, first),
        };

        if self.check_keyword("lambda") {
            self.advance();
            return self.parse_lambda_binding(declared_type, name);
        }

        let expr = self.parse_expr()?;
        self.expect_rparen("the binding")?;
        Some(ScopeEntry::variable(declared_type, name, expr))
    }

    fn parse_lambda_binding(
        &mut self,
        declared_type: DeclaredType,
        name: String,
    ) -> Option<ScopeEntry> {
        self.expect_lparen("the parameter list")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.at_eof() {
            let (param, _) = self.expect_identifier("a parameter name")?;
            params.push(ParamSlot::new(param));
        }
        self.expect_rparen("the parameter list")?;
        let body = self.parse_expr()?;
        self.expect_rparen("the lambda binding")?;
        Some(self.ast.lambda_binding(declared_type, name, params, body))
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier(name) if name == keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::ast::{BindingKind, Payload};
    use crate::language::ops::Operator;

    fn parse_one(source: &str) -> (Ast, NodeId) {
        let (ast, roots) = parse_program(source).expect("parse failed");
        assert_eq!(roots.len(), 1, "expected exactly one top-level expression");
        (ast, roots[0])
    }

    #[test]
    fn calls_keep_operands_in_source_order() {
        let (ast, root) = parse_one("(sub 10 4 1)");
        let Payload::Call { op, args, .. } = &ast.node(root).payload else {
            panic!("expected a call");
        };
        assert_eq!(*op, Operator::Sub);
        let values: Vec<_> = ast
            .siblings(*args)
            .map(|id| match ast.node(id).payload {
                Payload::Number(value) => value,
                ref other => panic!("expected numbers, got {other:?}"),
            })
            .collect();
        assert_eq!(
            values,
            vec![
                NumericValue::Int(10),
                NumericValue::Int(4),
                NumericValue::Int(1)
            ]
        );
    }

    #[test]
    fn let_attaches_the_table_to_the_body() {
        let (ast, root) = parse_one("(let ((int x 5) (y 2.5)) (add x y))");
        let scope = &ast.node(root).scope;
        assert_eq!(scope.len(), 2);
        // Prepend order: the last source binding sits first.
        assert_eq!(scope[0].name, "y");
        assert_eq!(scope[0].declared_type, DeclaredType::Any);
        assert_eq!(scope[1].name, "x");
        assert_eq!(scope[1].declared_type, DeclaredType::Int);
        for entry in scope {
            assert_eq!(ast.node(entry.expr).parent, Some(root));
        }
    }

    #[test]
    fn lambda_bindings_carry_a_parameter_table() {
        let (ast, root) = parse_one("(let ((f lambda (a b) (add a b))) (f 1 2))");
        let scope = &ast.node(root).scope;
        assert_eq!(scope.len(), 1);
        assert_eq!(scope[0].kind, BindingKind::Lambda);
        let body = scope[0].expr;
        let params: Vec<_> = ast
            .node(body)
            .params
            .iter()
            .map(|slot| slot.name.clone())
            .collect();
        assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ast.node(body).parent, Some(root));
    }

    #[test]
    fn unknown_operators_parse_as_custom_calls() {
        let (ast, root) = parse_one("(square 4)");
        match &ast.node(root).payload {
            Payload::Call { op, name, .. } => {
                assert_eq!(*op, Operator::Custom);
                assert_eq!(name.as_deref(), Some("square"));
            }
            other => panic!("expected a call, got {other:?}"),
        }
    }

    #[test]
    fn multiple_top_level_expressions_come_back_in_order() {
        let (_, roots) = parse_program("1 (add 2 3) 4.5").expect("parse failed");
        assert_eq!(roots.len(), 3);
    }

    #[test]
    fn malformed_programs_accumulate_errors() {
        assert!(parse_program("(add 1").is_err());
        assert!(parse_program(")").is_err());
        assert!(parse_program("(let () 5)").is_err());
        assert!(parse_program("(lambda (x) x)").is_err());
        assert!(parse_program("(cond 1 2)").is_err());
    }
}

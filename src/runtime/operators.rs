use crate::diagnostics::WarningKind;
use crate::language::ast::{Ast, NodeId, Payload};
use crate::language::ops::Operator;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::interpreter::Evaluator;
use crate::runtime::value::{round_to_int, NumericValue};
use rand::Rng;
use std::io::Write;

/// Comparisons involving a Float treat differences within this tolerance
/// as equality.
const FLOAT_TOLERANCE: f64 = 1e-6;

impl Evaluator<'_> {
    pub(super) fn eval_builtin(
        &mut self,
        ast: &mut Ast,
        node: NodeId,
        op: Operator,
        args: Option<NodeId>,
    ) -> EvalResult<NumericValue> {
        match op {
            Operator::Neg
            | Operator::Abs
            | Operator::Exp
            | Operator::Sqrt
            | Operator::Log
            | Operator::Exp2
            | Operator::Cbrt => self.eval_unary(ast, op, args),
            Operator::Add | Operator::Sub | Operator::Mult | Operator::Div => {
                self.eval_fold(ast, op, args)
            }
            Operator::Remainder
            | Operator::Pow
            | Operator::Max
            | Operator::Min
            | Operator::Hypot
            | Operator::Equal
            | Operator::Less
            | Operator::Greater => self.eval_binary(ast, op, args),
            Operator::Print => self.eval_print(ast, args),
            Operator::Read => self.eval_read(ast, node, args),
            Operator::Rand => self.eval_rand(ast, node, args),
            // Custom calls dispatch through the lambda protocol before this
            // point; landing here means the AST was built wrong.
            Operator::Custom => Err(EvalError::Internal {
                message: "custom call reached the built-in dispatcher".to_string(),
            }),
        }
    }

    fn operand_ids(&self, ast: &Ast, args: Option<NodeId>) -> Vec<NodeId> {
        ast.siblings(args).collect()
    }

    fn require_operands(&self, op: Operator, ids: &[NodeId], minimum: usize) -> EvalResult<()> {
        if ids.len() < minimum {
            return Err(EvalError::TooFewOperands {
                operator: op.to_string(),
                minimum,
                received: ids.len(),
            });
        }
        Ok(())
    }

    fn warn_extras(&mut self, op: Operator, supplied: usize, arity: usize) {
        if supplied > arity {
            self.diagnostics.warn(
                WarningKind::ExtraArguments,
                format!("`{op}` ignores {} extra operand(s)", supplied - arity),
            );
        }
    }

    fn eval_unary(
        &mut self,
        ast: &mut Ast,
        op: Operator,
        args: Option<NodeId>,
    ) -> EvalResult<NumericValue> {
        let ids = self.operand_ids(ast, args);
        self.require_operands(op, &ids, 1)?;
        self.warn_extras(op, ids.len(), 1);
        let value = self.evaluate(ast, ids[0])?;
        match op {
            Operator::Neg => Ok(match value {
                NumericValue::Int(v) => NumericValue::Int(-v),
                NumericValue::Float(v) => NumericValue::Float(-v),
            }),
            Operator::Abs => Ok(match value {
                NumericValue::Int(v) => NumericValue::Int(v.abs()),
                NumericValue::Float(v) => NumericValue::Float(v.abs()),
            }),
            // Inherently fractional results stay Float whatever the input.
            Operator::Exp => Ok(NumericValue::Float(value.as_f64().exp())),
            Operator::Sqrt => Ok(NumericValue::Float(value.as_f64().sqrt())),
            Operator::Log => Ok(NumericValue::Float(value.as_f64().ln())),
            Operator::Exp2 => Ok(NumericValue::Float(value.as_f64().exp2())),
            Operator::Cbrt => Ok(NumericValue::Float(value.as_f64().cbrt())),
            _ => Err(EvalError::Internal {
                message: format!("`{op}` dispatched as unary"),
            }),
        }
    }

    /// `add`/`sub`/`mult`/`div`: left fold over two or more operands, each
    /// step applying the binary coercion rule.
    fn eval_fold(
        &mut self,
        ast: &mut Ast,
        op: Operator,
        args: Option<NodeId>,
    ) -> EvalResult<NumericValue> {
        let ids = self.operand_ids(ast, args);
        self.require_operands(op, &ids, 2)?;
        let mut acc = self.evaluate(ast, ids[0])?;
        for &id in &ids[1..] {
            let rhs = self.evaluate(ast, id)?;
            acc = fold_step(op, acc, rhs)?;
        }
        Ok(acc)
    }

    fn eval_binary(
        &mut self,
        ast: &mut Ast,
        op: Operator,
        args: Option<NodeId>,
    ) -> EvalResult<NumericValue> {
        let ids = self.operand_ids(ast, args);
        self.require_operands(op, &ids, 2)?;
        self.warn_extras(op, ids.len(), 2);
        let lhs = self.evaluate(ast, ids[0])?;
        let rhs = self.evaluate(ast, ids[1])?;
        match op {
            Operator::Remainder => match (lhs, rhs) {
                (NumericValue::Int(_), NumericValue::Int(0)) => Err(EvalError::DivisionByZero),
                (NumericValue::Int(a), NumericValue::Int(b)) => Ok(NumericValue::Int(a % b)),
                _ => Ok(NumericValue::Float(lhs.as_f64() % rhs.as_f64())),
            },
            Operator::Pow => match (lhs, rhs) {
                (NumericValue::Int(a), NumericValue::Int(b)) => Ok(NumericValue::Int(
                    round_to_int((a as f64).powf(b as f64)),
                )),
                _ => Ok(NumericValue::Float(lhs.as_f64().powf(rhs.as_f64()))),
            },
            Operator::Max => match (lhs, rhs) {
                (NumericValue::Int(a), NumericValue::Int(b)) => Ok(NumericValue::Int(a.max(b))),
                _ => Ok(NumericValue::Float(lhs.as_f64().max(rhs.as_f64()))),
            },
            Operator::Min => match (lhs, rhs) {
                (NumericValue::Int(a), NumericValue::Int(b)) => Ok(NumericValue::Int(a.min(b))),
                _ => Ok(NumericValue::Float(lhs.as_f64().min(rhs.as_f64()))),
            },
            Operator::Hypot => Ok(NumericValue::Float(lhs.as_f64().hypot(rhs.as_f64()))),
            Operator::Equal | Operator::Less | Operator::Greater => Ok(compare(op, lhs, rhs)),
            _ => Err(EvalError::Internal {
                message: format!("`{op}` dispatched as binary"),
            }),
        }
    }

    /// Evaluates and renders every operand in order, returning the last
    /// value.
    fn eval_print(&mut self, ast: &mut Ast, args: Option<NodeId>) -> EvalResult<NumericValue> {
        let ids = self.operand_ids(ast, args);
        self.require_operands(Operator::Print, &ids, 1)?;
        let mut last = self.evaluate(ast, ids[0])?;
        writeln!(self.output, "{last}")?;
        for &id in &ids[1..] {
            last = self.evaluate(ast, id)?;
            writeln!(self.output, "{last}")?;
        }
        Ok(last)
    }

    fn warn_ignored_operands(&mut self, op: Operator, ast: &Ast, args: Option<NodeId>) {
        let supplied = ast.siblings(args).count();
        self.warn_extras(op, supplied, 0);
    }

    /// Blocking input. The parsed value replaces this node's payload, so
    /// later evaluations of the same node return it without reading again.
    fn eval_read(
        &mut self,
        ast: &mut Ast,
        node: NodeId,
        args: Option<NodeId>,
    ) -> EvalResult<NumericValue> {
        self.warn_ignored_operands(Operator::Read, ast, args);
        let token = self.read_token()?;
        let value = parse_read_token(&token)?;
        ast.replace_payload(node, Payload::Number(value));
        Ok(value)
    }

    /// One pseudo-random Float in [0, 1), memoized into the node the same
    /// way `read` is.
    fn eval_rand(
        &mut self,
        ast: &mut Ast,
        node: NodeId,
        args: Option<NodeId>,
    ) -> EvalResult<NumericValue> {
        self.warn_ignored_operands(Operator::Rand, ast, args);
        let value = NumericValue::Float(rand::thread_rng().gen::<f64>());
        ast.replace_payload(node, Payload::Number(value));
        Ok(value)
    }

    /// Reads one whitespace-delimited token from the input handle.
    fn read_token(&mut self) -> EvalResult<String> {
        let mut token = String::new();
        let mut done = false;
        while !done {
            let buf = self.input.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let mut used = 0;
            for &byte in buf {
                if byte.is_ascii_whitespace() {
                    used += 1;
                    if !token.is_empty() {
                        done = true;
                        break;
                    }
                } else {
                    token.push(byte as char);
                    used += 1;
                }
            }
            self.input.consume(used);
        }
        if token.is_empty() {
            Err(EvalError::InputExhausted)
        } else {
            Ok(token)
        }
    }
}

fn fold_step(op: Operator, lhs: NumericValue, rhs: NumericValue) -> EvalResult<NumericValue> {
    match (lhs, rhs) {
        (NumericValue::Int(a), NumericValue::Int(b)) => {
            let result = match op {
                Operator::Add => a + b,
                Operator::Sub => a - b,
                Operator::Mult => a * b,
                Operator::Div => {
                    if b == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    a / b
                }
                _ => {
                    return Err(EvalError::Internal {
                        message: format!("`{op}` dispatched as fold"),
                    })
                }
            };
            Ok(NumericValue::Int(result))
        }
        _ => {
            let a = lhs.as_f64();
            let b = rhs.as_f64();
            let result = match op {
                Operator::Add => a + b,
                Operator::Sub => a - b,
                Operator::Mult => a * b,
                Operator::Div => a / b,
                _ => {
                    return Err(EvalError::Internal {
                        message: format!("`{op}` dispatched as fold"),
                    })
                }
            };
            Ok(NumericValue::Float(result))
        }
    }
}

fn compare(op: Operator, lhs: NumericValue, rhs: NumericValue) -> NumericValue {
    let truth = match (lhs, rhs) {
        (NumericValue::Int(a), NumericValue::Int(b)) => match op {
            Operator::Equal => a == b,
            Operator::Less => a < b,
            _ => a > b,
        },
        _ => {
            let a = lhs.as_f64();
            let b = rhs.as_f64();
            match op {
                Operator::Equal => (a - b).abs() <= FLOAT_TOLERANCE,
                Operator::Less => b - a > FLOAT_TOLERANCE,
                _ => a - b > FLOAT_TOLERANCE,
            }
        }
    };
    NumericValue::Int(truth as i64)
}

/// `read` accepts `-?[0-9]+` as Integer, or the same with exactly one `.`
/// as Float. Anything else is a fatal parse error for that read.
fn parse_read_token(token: &str) -> EvalResult<NumericValue> {
    let body = token.strip_prefix('-').unwrap_or(token);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    let dots = body.matches('.').count();
    let well_formed = digits > 0 && dots <= 1 && digits + dots == body.chars().count();
    if !well_formed {
        return Err(EvalError::MalformedInput {
            token: token.to_string(),
        });
    }
    let parsed = if dots == 0 {
        token.parse::<i64>().map(NumericValue::Int).ok()
    } else {
        token.parse::<f64>().map(NumericValue::Float).ok()
    };
    parsed.ok_or_else(|| EvalError::MalformedInput {
        token: token.to_string(),
    })
}

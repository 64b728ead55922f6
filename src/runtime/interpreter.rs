use crate::diagnostics::{Diagnostics, WarningKind};
use crate::language::ast::{Ast, DeclaredType, NodeId, Payload};
use crate::language::ops::Operator;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::scope::{self, SymbolLookup};
use crate::runtime::value::{round_to_int, NumericValue};
use std::io::{self, BufRead, Write};

/// Policy for a lambda call that supplies fewer arguments than the callee
/// declares parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingArgPolicy {
    /// Bind `Int(1)` to every unfilled slot and record a warning.
    #[default]
    DefaultToOne,
    /// Treat the mismatch as a fatal arity error.
    Fatal,
}

/// Policy for a symbol that resolves to no binding anywhere on the parent
/// chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnboundSymbolPolicy {
    /// Fail the evaluation.
    #[default]
    Fatal,
    /// Record a warning and yield `Float(NaN)`.
    NanFallback,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EvalOptions {
    pub missing_args: MissingArgPolicy,
    pub unbound_symbols: UnboundSymbolPolicy,
}

/// The recursive tree-walking evaluator. One instance serves a whole
/// program unit: it carries the policy knobs, the warning channel, and the
/// input/output handles used by `read` and `print`.
pub struct Evaluator<'io> {
    pub(super) options: EvalOptions,
    pub(super) diagnostics: Diagnostics,
    pub(super) input: Box<dyn BufRead + 'io>,
    pub(super) output: Box<dyn Write + 'io>,
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator<'static> {
    pub fn new() -> Self {
        Evaluator::with_io(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }
}

impl<'io> Evaluator<'io> {
    pub fn with_io(input: Box<dyn BufRead + 'io>, output: Box<dyn Write + 'io>) -> Self {
        Self {
            options: EvalOptions::default(),
            diagnostics: Diagnostics::new(),
            input,
            output,
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Evaluates one node to a numeric value. The arena is borrowed
    /// mutably because `read` and `rand` rewrite their own node and lambda
    /// calls overwrite parameter slots.
    pub fn evaluate(&mut self, ast: &mut Ast, node: NodeId) -> EvalResult<NumericValue> {
        match &ast.node(node).payload {
            Payload::Number(value) => Ok(*value),
            Payload::Symbol(name) => {
                let name = name.clone();
                self.eval_symbol(ast, node, &name)
            }
            Payload::Conditional {
                condition,
                if_true,
                if_false,
            } => {
                let (condition, if_true, if_false) = (*condition, *if_true, *if_false);
                let chosen = if self.evaluate(ast, condition)?.is_truthy() {
                    if_true
                } else {
                    if_false
                };
                self.evaluate(ast, chosen)
            }
            Payload::Call { op, name, args } => {
                let (op, name, args) = (*op, name.clone(), *args);
                match op {
                    Operator::Custom => {
                        let name = name.ok_or_else(|| EvalError::Internal {
                            message: "custom call node without a name".to_string(),
                        })?;
                        self.eval_custom_call(ast, node, &name, args)
                    }
                    _ => self.eval_builtin(ast, node, op, args),
                }
            }
        }
    }

    fn eval_symbol(&mut self, ast: &mut Ast, node: NodeId, name: &str) -> EvalResult<NumericValue> {
        match scope::resolve_symbol(ast, node, name) {
            // Parameter slots hold concrete values; no typing or coercion
            // applies to them.
            Some(SymbolLookup::Parameter(value)) => Ok(value),
            Some(SymbolLookup::Variable {
                expr,
                declared_type,
            }) => {
                let value = self.evaluate(ast, expr)?;
                Ok(self.coerce_declared(name, declared_type, value))
            }
            None => match self.options.unbound_symbols {
                UnboundSymbolPolicy::Fatal => Err(EvalError::UnknownSymbol {
                    name: name.to_string(),
                }),
                UnboundSymbolPolicy::NanFallback => {
                    self.diagnostics.warn(
                        WarningKind::UnboundSymbol,
                        format!("Unknown symbol `{name}` evaluated to NaN"),
                    );
                    Ok(NumericValue::Float(f64::NAN))
                }
            },
        }
    }

    fn coerce_declared(
        &mut self,
        name: &str,
        declared_type: DeclaredType,
        value: NumericValue,
    ) -> NumericValue {
        match (declared_type, value) {
            (DeclaredType::Int, NumericValue::Float(f)) => {
                let rounded = round_to_int(f);
                self.diagnostics.warn(
                    WarningKind::PrecisionLoss,
                    format!("Precision loss on `{name}`: {f} rounded to {rounded}"),
                );
                NumericValue::Int(rounded)
            }
            (DeclaredType::Float, NumericValue::Int(i)) => NumericValue::Float(i as f64),
            (_, value) => value,
        }
    }

    /// The lambda call protocol: resolve the callee, evaluate actuals
    /// eagerly left to right in the caller's scope, bind them positionally
    /// into the callee's parameter slots, then evaluate the body in its
    /// own lexical scope.
    fn eval_custom_call(
        &mut self,
        ast: &mut Ast,
        node: NodeId,
        name: &str,
        args: Option<NodeId>,
    ) -> EvalResult<NumericValue> {
        let (body, declared_type) = scope::resolve_lambda(ast, node, name).ok_or_else(|| {
            EvalError::UnknownFunction {
                name: name.to_string(),
            }
        })?;

        let arg_ids: Vec<NodeId> = ast.siblings(args).collect();
        let mut values = Vec::with_capacity(arg_ids.len());
        for id in arg_ids {
            values.push(self.evaluate(ast, id)?);
        }

        let expected = ast.node(body).params.len();
        let received = values.len();
        if received > expected {
            self.diagnostics.warn(
                WarningKind::ExtraArguments,
                format!(
                    "Call to `{name}` discards {} extra argument(s)",
                    received - expected
                ),
            );
            values.truncate(expected);
        }
        if received < expected {
            match self.options.missing_args {
                MissingArgPolicy::Fatal => {
                    return Err(EvalError::ArityMismatch {
                        name: name.to_string(),
                        expected,
                        received,
                    });
                }
                MissingArgPolicy::DefaultToOne => {
                    self.diagnostics.warn(
                        WarningKind::MissingArguments,
                        format!(
                            "Call to `{name}` missing {} argument(s), defaulted to 1",
                            expected - received
                        ),
                    );
                    values.resize(expected, NumericValue::Int(1));
                }
            }
        }

        for (slot, value) in ast.node_mut(body).params.iter_mut().zip(values) {
            slot.value = value;
        }

        // Typed lambda bindings narrow or widen the call result the same
        // way typed variables do.
        let result = self.evaluate(ast, body)?;
        Ok(self.coerce_declared(name, declared_type, result))
    }
}

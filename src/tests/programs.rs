//! End-to-end tests: source text through the lexer, parser, and evaluator.

use crate::diagnostics::{Diagnostics, WarningKind};
use crate::language::parser::parse_program;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::interpreter::{EvalOptions, Evaluator, MissingArgPolicy, UnboundSymbolPolicy};
use crate::runtime::value::NumericValue;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use NumericValue::{Float, Int};

/// An output sink the test keeps a handle on after handing it to the
/// evaluator.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Run {
    results: Vec<EvalResult<NumericValue>>,
    evaluator: Evaluator<'static>,
    output: SharedBuf,
}

impl Run {
    fn single(&mut self) -> NumericValue {
        assert_eq!(self.results.len(), 1, "expected one top-level expression");
        self.results
            .remove(0)
            .expect("expected a successful evaluation")
    }

    fn warning_count(&self, kind: WarningKind) -> usize {
        self.evaluator.diagnostics().count(kind)
    }
}

fn run_with(source: &str, input: &str, options: EvalOptions) -> Run {
    let (mut ast, roots) = parse_program(source).expect("parse failed");
    let output = SharedBuf::default();
    let mut evaluator = Evaluator::with_io(
        Box::new(Cursor::new(input.to_string().into_bytes())),
        Box::new(output.clone()),
    )
    .with_options(options)
    .with_diagnostics(Diagnostics::silent());
    let results = roots
        .into_iter()
        .map(|root| evaluator.evaluate(&mut ast, root))
        .collect();
    Run {
        results,
        evaluator,
        output,
    }
}

fn run(source: &str) -> Run {
    run_with(source, "", EvalOptions::default())
}

fn eval(source: &str) -> NumericValue {
    run(source).single()
}

#[test]
fn integer_arithmetic_from_source() {
    assert_eq!(eval("(add 1 2 3)"), Int(6));
    assert_eq!(eval("(mult 2 (sub 10 4) 3)"), Int(36));
    assert_eq!(eval("(div 9 2)"), Int(4));
}

#[test]
fn float_contagion_from_source() {
    assert_eq!(eval("(add 1 2.0)"), Float(3.0));
    assert_eq!(eval("(div 9 2.0)"), Float(4.5));
}

#[test]
fn equal_is_reflexive_and_tolerant() {
    assert_eq!(eval("(equal 5 5)"), Int(1));
    assert_eq!(eval("(equal 5.5 5.5)"), Int(1));
    assert_eq!(eval("(equal 1.0000001 1.0)"), Int(1));
    assert_eq!(eval("(equal 1.01 1.0)"), Int(0));
}

#[test]
fn inner_bindings_shadow_outer_ones() {
    assert_eq!(eval("(let ((x 1)) (add x (let ((x 2)) x)))"), Int(3));
    // The outer binding stays visible to expressions outside the inner
    // block.
    assert_eq!(eval("(let ((x 1)) (add (let ((x 2)) x) x))"), Int(3));
}

#[test]
fn nested_let_blocks_resolve_outward() {
    assert_eq!(eval("(let ((a 1)) (let ((b 2)) (add a b)))"), Int(3));
    assert_eq!(eval("(let ((a 1)) (let ((b a)) b))"), Int(1));
}

#[test]
fn conditionals_pick_a_branch_by_truthiness() {
    assert_eq!(eval("(cond 1 10 20)"), Int(10));
    assert_eq!(eval("(cond 0 10 20)"), Int(20));
    assert_eq!(eval("(cond 0.5 10 20)"), Int(10));
    assert_eq!(eval("(cond 0.0 10 20)"), Int(20));
}

#[test]
fn the_untaken_branch_never_runs() {
    let mut run = run("(cond 0 (print 111) (print 222))");
    assert_eq!(run.single(), Int(222));
    assert_eq!(run.output.contents(), "Int Type: 222\n");

    let mut run = run_with("(cond 7 (print 111) (print 222))", "", EvalOptions::default());
    assert_eq!(run.single(), Int(111));
    assert_eq!(run.output.contents(), "Int Type: 111\n");
}

#[test]
fn print_renders_everything_and_returns_the_last() {
    let mut run = run("(print 1 2.5)");
    assert_eq!(run.single(), Float(2.5));
    assert_eq!(run.output.contents(), "Int Type: 1\nDouble Type: 2.500000\n");
}

#[test]
fn identity_lambda_round_trips_both_kinds() {
    assert_eq!(eval("(let ((f lambda (x) x)) (f 5))"), Int(5));
    assert_eq!(eval("(let ((f lambda (x) x)) (f 5.0))"), Float(5.0));
}

#[test]
fn lambdas_close_over_their_definition_site() {
    assert_eq!(
        eval("(let ((a 10) (f lambda (x) (add x a))) (f 5))"),
        Int(15)
    );
}

#[test]
fn call_arguments_evaluate_in_the_caller_scope() {
    assert_eq!(
        eval("(let ((f lambda (x) x)) (let ((y 3)) (f (add y 1))))"),
        Int(4)
    );
}

#[test]
fn lambda_calls_nest() {
    assert_eq!(
        eval("(let ((sq lambda (x) (mult x x)) (twice lambda (x) (add x x))) (sq (twice 3)))"),
        Int(36)
    );
}

#[test]
fn extra_lambda_arguments_warn_and_drop() {
    let mut run = run("(let ((f lambda (x) x)) (f 5 6 7))");
    assert_eq!(run.single(), Int(5));
    assert_eq!(run.warning_count(WarningKind::ExtraArguments), 1);
}

#[test]
fn missing_lambda_arguments_default_to_one() {
    let mut run = run("(let ((f lambda (x y) (add x y))) (f 5))");
    assert_eq!(run.single(), Int(6));
    assert_eq!(run.warning_count(WarningKind::MissingArguments), 1);
}

#[test]
fn missing_lambda_arguments_can_be_made_fatal() {
    let run = run_with(
        "(let ((f lambda (x y) (add x y))) (f 5))",
        "",
        EvalOptions {
            missing_args: MissingArgPolicy::Fatal,
            ..EvalOptions::default()
        },
    );
    assert!(matches!(
        run.results[0],
        Err(EvalError::ArityMismatch {
            expected: 2,
            received: 1,
            ..
        })
    ));
}

#[test]
fn unknown_lambda_names_are_fatal() {
    let run = run("(mystery 1 2)");
    assert!(matches!(
        run.results[0],
        Err(EvalError::UnknownFunction { .. })
    ));
}

#[test]
fn unbound_symbols_are_fatal_by_default() {
    let run = run("(add ghost 1)");
    assert!(matches!(run.results[0], Err(EvalError::UnknownSymbol { .. })));
}

#[test]
fn unbound_symbols_can_fall_back_to_nan() {
    let mut run = run_with(
        "ghost",
        "",
        EvalOptions {
            unbound_symbols: UnboundSymbolPolicy::NanFallback,
            ..EvalOptions::default()
        },
    );
    assert!(run.single().as_f64().is_nan());
    assert_eq!(run.warning_count(WarningKind::UnboundSymbol), 1);
}

#[test]
fn typed_bindings_coerce_on_reference() {
    let mut run = run("(let ((int x 3.7)) x)");
    assert_eq!(run.single(), Int(4));
    assert_eq!(run.warning_count(WarningKind::PrecisionLoss), 1);

    assert_eq!(eval("(let ((double x 2)) x)"), Float(2.0));
}

#[test]
fn typed_lambda_bindings_coerce_the_call_result() {
    let mut run = run("(let ((int f lambda (x) (div x 2.0))) (f 5))");
    assert_eq!(run.single(), Int(3));
    assert_eq!(run.warning_count(WarningKind::PrecisionLoss), 1);

    assert_eq!(
        eval("(let ((double g lambda (x) (add x 1))) (g 1))"),
        Float(2.0)
    );
}

#[test]
fn pow_with_three_arguments_uses_the_first_two() {
    let mut run = run("(pow 2 3 9)");
    assert_eq!(run.single(), Int(8));
    assert_eq!(run.warning_count(WarningKind::ExtraArguments), 1);
}

#[test]
fn add_with_one_argument_is_fatal_not_identity() {
    let run = run("(add 1)");
    assert!(matches!(
        run.results[0],
        Err(EvalError::TooFewOperands { minimum: 2, .. })
    ));
}

#[test]
fn rand_fixes_its_value_on_first_evaluation() {
    // Two references to the same binding evaluate the same `(rand)` node;
    // the first evaluation rewrites it, so the difference is exactly zero.
    assert_eq!(eval("(let ((r (rand))) (sub r r))"), Float(0.0));
    assert_eq!(eval("(let ((r (rand))) (equal r r))"), Int(1));
}

#[test]
fn read_consumes_tokens_in_evaluation_order() {
    let mut run = run_with("(add (read) (read))", "3 4", EvalOptions::default());
    assert_eq!(run.single(), Int(7));

    let mut run = run_with("(mult (read) 2)", "-2.5", EvalOptions::default());
    assert_eq!(run.single(), Float(-5.0));
}

#[test]
fn read_in_an_untaken_branch_consumes_nothing() {
    let mut run = run_with("(cond 1 42 (read)) (read)", "9", EvalOptions::default());
    assert_eq!(run.results.len(), 2);
    assert_eq!(
        run.results.remove(0).expect("first expression failed"),
        Int(42)
    );
    assert_eq!(
        run.results.remove(0).expect("second expression failed"),
        Int(9)
    );
}

#[test]
fn malformed_read_input_is_fatal() {
    let run = run_with("(read)", "banana", EvalOptions::default());
    assert!(matches!(
        run.results[0],
        Err(EvalError::MalformedInput { .. })
    ));
}

#[test]
fn division_by_zero_is_fatal_for_integers_only() {
    let run = run("(div 1 0)");
    assert!(matches!(run.results[0], Err(EvalError::DivisionByZero)));
    assert_eq!(eval("(div 1.0 0)"), Float(f64::INFINITY));
}

#[test]
fn warnings_accumulate_across_top_level_expressions() {
    let run = run_with("(pow 2 3 9) (neg 1 2)", "", EvalOptions::default());
    assert_eq!(run.results.len(), 2);
    assert_eq!(run.warning_count(WarningKind::ExtraArguments), 2);
}

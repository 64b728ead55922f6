use crate::language::errors::{SyntaxError, SyntaxErrors};
use crate::runtime::error::EvalError;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: err.label,
        }
    }
}

pub fn emit_syntax_errors(name: &str, source: &str, errors: &SyntaxErrors) {
    let src = NamedSource::new(name, source.to_string());
    for err in &errors.errors {
        let diagnostic = SyntaxDiagnostic::from_error(src.clone(), err.clone());
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn report_eval_error(error: &EvalError) {
    eprintln!("Evaluation error: {}", error);
}

/// Classification of a recoverable evaluation diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarningKind {
    /// An operator received more operands than its arity; the extras were
    /// evaluated-or-discarded per its policy.
    ExtraArguments,
    /// A lambda call supplied fewer arguments than parameters and the
    /// lenient policy filled the gap.
    MissingArguments,
    /// A Float narrowed to an Integer binding and rounding applied.
    PrecisionLoss,
    /// A symbol failed to resolve under the NaN-fallback policy.
    UnboundSymbol,
}

#[derive(Clone, Debug)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// The warning channel. Warnings are recorded for callers to inspect and
/// echoed to stderr unless silenced; fatal conditions never land here,
/// they travel as [`EvalError`].
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    quiet: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector that records without echoing, for embedding and tests.
    pub fn silent() -> Self {
        Self {
            warnings: Vec::new(),
            quiet: true,
        }
    }

    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        if !self.quiet {
            eprintln!("warning: {message}");
        }
        self.warnings.push(Warning { kind, message });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings
            .iter()
            .filter(|warning| warning.kind == kind)
            .count()
    }
}

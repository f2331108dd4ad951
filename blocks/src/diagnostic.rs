use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic as Report, Label, Severity};

use crate::ids::{BlockId, FunctionId, VariableId};

/// What went wrong while walking a block tree. None of these abort a run;
/// the offending node is skipped or resolved to a neutral value.
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    UnknownBlockKind,
    UndefinedVariable(VariableId),
    UndefinedFunction(FunctionId),
    UndefinedParameter(String),
    UndefinedInstance(String),
    UndefinedMethod { class: String, method: String },
    MalformedSlot { expected: String, got: String },
    DivisionByZero,
    MissingCondition,
    /// A logic block with one side left empty, named `left` or `right`.
    MissingOperand(&'static str),
    ArgumentCount {
        function: String,
        expected: usize,
        got: usize,
    },
    MissingReturnValue(String),
    MisplacedBlock(String),
    NestingTooDeep(usize),
    RecursionTooDeep(usize),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::UnknownBlockKind => write!(f, "unknown block kind"),
            Problem::UndefinedVariable(id) => write!(f, "undefined variable: {}", id),
            Problem::UndefinedFunction(id) => write!(f, "undefined function: {}", id),
            Problem::UndefinedParameter(name) => write!(f, "undefined parameter: {}", name),
            Problem::UndefinedInstance(name) => write!(f, "undefined instance: {}", name),
            Problem::UndefinedMethod { class, method } => {
                write!(f, "undefined method: {}.{}", class, method)
            }
            Problem::MalformedSlot { expected, got } => {
                write!(f, "malformed slot: expected {}, got {}", expected, got)
            }
            Problem::DivisionByZero => write!(f, "division by zero (result is NaN)"),
            Problem::MissingCondition => write!(f, "missing condition (treated as false)"),
            Problem::MissingOperand(side) => {
                write!(f, "logic block has no {} condition (treated as true)", side)
            }
            Problem::ArgumentCount {
                function,
                expected,
                got,
            } => write!(
                f,
                "function '{}' takes {} argument(s), got {}",
                function, expected, got
            ),
            Problem::MissingReturnValue(function) => {
                write!(f, "function '{}' returned no value", function)
            }
            Problem::MisplacedBlock(reason) => write!(f, "misplaced block: {}", reason),
            Problem::NestingTooDeep(limit) => {
                write!(f, "nesting deeper than {} levels", limit)
            }
            Problem::RecursionTooDeep(limit) => {
                write!(f, "calls nested deeper than {} levels", limit)
            }
        }
    }
}

/// A problem attributed to the block that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub problem: Problem,
    pub block: Option<BlockId>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn warning(problem: Problem, block: &BlockId) -> Self {
        Diagnostic {
            problem,
            block: Some(block.clone()),
            severity: Severity::Warning,
        }
    }

    pub fn error(problem: Problem, block: &BlockId) -> Self {
        Diagnostic {
            problem,
            block: Some(block.clone()),
            severity: Severity::Error,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic. `span` is where the
    /// block sits in the program source, when known.
    pub fn to_report(&self, file_id: usize, span: Option<Range<usize>>) -> Report<usize> {
        let report = Report::new(self.severity).with_message(self.problem.to_string());
        match (span, &self.block) {
            (Some(span), Some(block)) => report
                .with_labels(vec![Label::primary(file_id, span).with_message(format!("block {}", block))]),
            (None, Some(block)) => report.with_notes(vec![format!("in block {}", block)]),
            (_, None) => report,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(block) => write!(f, "{} (block {})", self.problem, block),
            None => self.problem.fmt(f),
        }
    }
}

impl std::error::Error for Diagnostic {}

use pest::Span;
use thiserror::Error as ThisError;

use crate::ast::StringSpan;
use crate::parser::Rule;

/// Errors raised while compiling a OneModel description.
///
/// Every variant is fatal to the export that raised it. Walker errors carry the
/// span of the offending node so that [`Error::as_error_message`] can point at
/// the source line.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A qualifier of a dotted name does not exist.
    #[error("undefined namespace '{qualifier}' in '{path}'")]
    UndefinedNamespace {
        path: String,
        qualifier: String,
        span: Option<StringSpan>,
    },

    /// Read of an unbound name.
    #[error("undefined name '{path}'")]
    UndefinedName {
        path: String,
        span: Option<StringSpan>,
    },

    /// A reactant, product, rule target or expression symbol is not defined in
    /// any enclosing scope.
    #[error("cannot resolve '{name}' referenced by '{context}'")]
    UnresolvedReference { context: String, name: String },

    /// The substitution variables cannot be ordered, either because they depend
    /// on each other or because they use an unknown symbol.
    #[error(
        "dependencies of substitution variables cannot be satisfied: {}",
        .unresolved.join(", ")
    )]
    CyclicOrMissingDependency { unresolved: Vec<String> },

    /// Re-declaration of an existing name while overwrites are denied.
    #[error("'{path}' is already defined")]
    Overwrite {
        path: String,
        span: Option<StringSpan>,
    },

    /// An expression contains something the expression parser or one of the
    /// renderers cannot handle.
    #[error("cannot serialize expression '{expression}': {message}")]
    Serialization { expression: String, message: String },

    /// A reserved attribute (`value`, `reactants`, ...) was given a value of the
    /// wrong kind.
    #[error("invalid value for '{key}' of '{path}': expected {expected}, found {found}")]
    InvalidAttribute {
        path: String,
        key: String,
        expected: &'static str,
        found: &'static str,
        span: Option<StringSpan>,
    },

    /// Two entities flatten to the same qualified id.
    #[error("qualified id '{id}' is defined more than once")]
    DuplicateQualifiedId { id: String },

    /// More than one rule targets the same state.
    #[error("state '{state}' has more than one equation")]
    DuplicateEquation { state: String },

    /// A declared name collides with a symbol the outputs rely on, such as the
    /// time or the locals of the Matlab functions.
    #[error("'{name}' is reserved for {usage}")]
    ReservedName { name: String, usage: &'static str },

    #[error("reaction '{reaction}' has no kinetic law")]
    MissingKineticLaw { reaction: String },

    #[error("{0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
}

impl Error {
    pub fn span(&self) -> Option<StringSpan> {
        match self {
            Error::UndefinedNamespace { span, .. }
            | Error::UndefinedName { span, .. }
            | Error::Overwrite { span, .. }
            | Error::InvalidAttribute { span, .. } => *span,
            _ => None,
        }
    }

    pub fn as_error_message(&self, input: &str) -> String {
        let position = self
            .span()
            .and_then(|source_ref| Span::new(input, source_ref.pos_start, source_ref.pos_end))
            .map(|span| span.start_pos().line_col());
        match position {
            Some((line, col)) => format!("Line {}, Column {}: Error: {}", line, col, self),
            None => format!("Error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::ast::StringSpan;

    #[test]
    fn error_message_with_position() {
        let input = "species A\nspecies foo.B\n";
        let err = Error::UndefinedNamespace {
            path: "foo.B".to_string(),
            qualifier: "foo".to_string(),
            span: Some(StringSpan {
                pos_start: 18,
                pos_end: 23,
            }),
        };
        assert_eq!(
            err.as_error_message(input),
            "Line 2, Column 9: Error: undefined namespace 'foo' in 'foo.B'"
        );
    }

    #[test]
    fn error_message_without_position() {
        let err = Error::CyclicOrMissingDependency {
            unresolved: vec!["x".to_string(), "y".to_string()],
        };
        assert_eq!(
            err.as_error_message(""),
            "Error: dependencies of substitution variables cannot be satisfied: x, y"
        );
    }
}

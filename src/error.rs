use thiserror::Error;

/// Errors raised while turning an energy expression into a compiled expression.
///
/// These are only ever produced at compile time, never during evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("Unexpected token {found}, expected {expected}")]
    UnexpectedToken { found: String, expected: String },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {name} expects {expected} arguments, got {found}")]
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid particle label '{label}' in {function}(), expected p1..p{particles_per_bond}")]
    InvalidParticleLabel {
        function: String,
        label: String,
        particles_per_bond: usize,
    },

    #[error("Definition of '{0}' refers to itself")]
    RecursiveDefinition(String),

    #[error("'{0}' is defined more than once")]
    DuplicateDefinition(String),

    #[error("Cannot differentiate {0}")]
    NotDifferentiable(String),
}

/// The error taxonomy for defining, compiling and running compound bonds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BondForceError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Range error: {0}")]
    Range(String),

    #[error("Context out of sync: {0}")]
    ContextSync(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BondForceResult<T> = Result<T, BondForceError>;

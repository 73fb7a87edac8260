use thiserror::Error;

/// Raised while constructing a grammar from plain collections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("production `{lhs} → {rhs}` references undeclared symbol `{symbol}`")]
    UndeclaredSymbol {
        lhs: String,
        rhs: String,
        symbol: String,
    },
    #[error("start symbol `{0}` is not a declared non-terminal")]
    UndeclaredStartSymbol(String),
    #[error("the grammar has no start symbol")]
    MissingStartSymbol,
    #[error("symbol `{0}` is declared both as a terminal and as a non-terminal")]
    AmbiguousSymbol(String),
    #[error("symbol names cannot be empty")]
    EmptySymbolName,
    #[error("the left-hand side of a production cannot be empty")]
    EmptyLeftHandSide,
}

/// Raised by the text front end before any grammar is constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no {0} were declared")]
    EmptyDeclaration(&'static str),
    #[error("malformed list of {what} `{text}`, expected names separated by `,` or `;`")]
    MalformedDeclaration { what: &'static str, text: String },
    #[error("line {line}: expected `->` or `→` in production `{text}`")]
    MissingArrow { line: usize, text: String },
    #[error("line {line}: production `{text}` has an empty left-hand side")]
    EmptyLeftHandSide { line: usize, text: String },
    #[error("symbol `{symbol}` in production `{production}` is neither a terminal nor a non-terminal")]
    UnknownSymbol { symbol: String, production: String },
    #[error("line {line}: unexpected `{text}`")]
    UnexpectedLine { line: usize, text: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Raised when a grammar is checked against Chomsky normal form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalFormError {
    #[error("`{0}` is not a single non-terminal")]
    NonContextFreeKey(String),
    #[error("unit production `{lhs} → {rhs}`")]
    UnitProduction { lhs: String, rhs: String },
    #[error("`{lhs} → {rhs}` is neither a single terminal nor two non-terminals")]
    InvalidBody { lhs: String, rhs: String },
    #[error("`{0} → ε` is only allowed for a start symbol")]
    ErasingNonStart(String),
    #[error("erasable start symbol `{0}` appears on a right-hand side")]
    ErasableStartOnRhs(String),
    #[error("non-terminal `{0}` is not reachable from a start symbol")]
    Inaccessible(String),
    #[error("non-terminal `{0}` derives no terminal string")]
    NonProductive(String),
}

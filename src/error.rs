use crate::{
    BuildError, ConflictKind, GrammarError, LexError, ParseError, TableConflictError,
};
use std::fmt::{Display, Formatter};

impl GrammarError {
    pub fn new(message: String) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GrammarError: {}", self.message)
    }
}

impl std::error::Error for GrammarError {}

impl LexError {
    pub fn new(pointer: usize, message: String) -> Self {
        Self { pointer, message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LexError: {}", self.message)
    }
}

impl std::error::Error for LexError {}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::ShiftReduce => write!(f, "shift/reduce"),
            ConflictKind::ReduceReduce => write!(f, "reduce/reduce"),
        }
    }
}

impl TableConflictError {
    pub fn new(state: usize, symbol: String, kind: ConflictKind) -> Self {
        Self {
            state,
            symbol,
            kind,
        }
    }
}

impl Display for TableConflictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TableConflictError: unresolved {} conflict in state {} on symbol {}",
            self.kind, self.state, self.symbol
        )
    }
}

impl std::error::Error for TableConflictError {}

impl ParseError {
    pub fn new(pointer: usize, message: String) -> Self {
        Self { pointer, message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.pointer, err.message)
    }
}

impl From<GrammarError> for BuildError {
    fn from(err: GrammarError) -> Self {
        BuildError::Grammar(err)
    }
}

impl From<TableConflictError> for BuildError {
    fn from(err: TableConflictError) -> Self {
        BuildError::Conflict(err)
    }
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Grammar(err) => write!(f, "{}", err),
            BuildError::Conflict(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for BuildError {}

//! Language parser generator (lang_lr) is a library to build LR parsing tables for a
//! context-free grammar and to drive table based parsers which consume a token stream
//! into a semantic value.
//!
//! # Overview
//! A parser for a language is usually produced by a parser generator tool from a grammar
//! written in a generator specific format.
//! The generator compiles the grammar into a parsing table, and a small table driven
//! runtime uses the table to tokenize and parse input strings.
//! This library implements the generator side for the LR family of parsing algorithms
//! (LR(0), SLR(1), LALR(1) and CLR(1)) together with an in-process driver and a regex
//! based tokenizer with stackable lexical states, so grammars can be developed, debugged
//! and executed without emitting any code.
//! The computed table, productions, tokens and lexical rules can also be serialized into
//! a stable JSON artifact which target-language emitters consume to produce a standalone
//! parser module.
//!
//! # Design
//!
//! A grammar is ingested from a structured (JSON) representation into a normalized
//! [Grammar]: symbols are classified into non-terminals, terminals and tokens,
//! productions are numbered, the augmented production is added for LR modes, and
//! operator precedence declarations are resolved.
//! From the normalized grammar a [SetsGenerator] computes First/Follow sets, a
//! [CanonicalCollection] builds the LR item state graph with mode specific lookaheads
//! and LALR(1) state merging, and a [ParsingTable] lays the shift/reduce/goto/accept
//! entries with deterministic conflict resolution.
//! The [LrParser] runtime drives the table over tokens produced by a [Tokenizer] and
//! folds semantic values with user registered actions.
//!
//! # Example
//!
//! Following is an arithmetic expression parser implemented with lang_lr.
//! ```
//! use lang_lr::{Grammar, GrammarMode, LrParser, TableOptions, Token, ValueImpl};
//!
//! #[derive(Debug, Clone)]
//! enum Value {
//!     Null,
//!     Number(f64),
//!     Text(String),
//! }
//!
//! impl ValueImpl for Value {
//!     fn null() -> Self { Value::Null }
//!     fn leaf(token: &Token) -> Self {
//!         match token.kind.as_str() {
//!             "NUMBER" => Value::Number(token.value.parse().unwrap()),
//!             _ => Value::Text(token.value.clone()),
//!         }
//!     }
//!     fn node(_symbol: &str, children: Vec<Self>) -> Self {
//!         children.into_iter().next().unwrap_or(Value::Null)
//!     }
//! }
//!
//! fn num(value: &Value) -> f64 {
//!     match value {
//!         Value::Number(n) => *n,
//!         _ => 0.0,
//!     }
//! }
//!
//! let grammar = Grammar::from_json(
//!     r##"{
//!         "lex": {
//!             "rules": [
//!                 ["\\s+", ""],
//!                 ["\\d+", "return 'NUMBER';"]
//!             ]
//!         },
//!         "operators": [["left", "'+'"], ["left", "'*'"]],
//!         "bnf": [
//!             {
//!                 "lhs": "E",
//!                 "alternatives": ["E '+' E", "E '*' E", "'(' E ')'", "NUMBER"]
//!             }
//!         ]
//!     }"##,
//!     GrammarMode::LALR1,
//! )
//! .unwrap();
//!
//! let mut parser: LrParser<Value> = LrParser::new(grammar, TableOptions::default()).unwrap();
//!
//! parser.set_action(1, |_, values| Value::Number(num(&values[0]) + num(&values[2])));
//! parser.set_action(2, |_, values| Value::Number(num(&values[0]) * num(&values[2])));
//! parser.set_action(3, |_, mut values| values.remove(1));
//!
//! let value = parser.parse("2 + 2 * 2").unwrap();
//! assert!(matches!(value, Value::Number(n) if n == 6.0));
//!
//! let value = parser.parse("(2 + 2) * 2").unwrap();
//! assert!(matches!(value, Value::Number(n) if n == 8.0));
//! ```
//!
//! # License
//! [lang_lr](crate) is provided under the MIT license.

mod artifacts;
mod error;
mod logger;
mod mode;
mod parse_tree;
mod position;
mod sets;
mod tokenizer;

pub mod examples;
pub mod grammar;
pub mod lexeme;
pub mod lr;

use once_cell::unsync::OnceCell;
use std::fmt::Debug;

pub use artifacts::TableArtifacts;
pub use grammar::{Grammar, GrammarSpec, Operator, OperatorAssoc};
pub use lexeme::{LexContext, LexGrammar, LexHandler, LexRule, StateOp, TokenAction};
pub use lr::{
    CanonicalCollection, LrItem, LrParser, LrState, ParsingTable, ResolvedConflict,
    SemanticHandler, TableEntry, TableOptions, YyContext,
};
pub use sets::SetsGenerator;
pub use tokenizer::Tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The parsing algorithm a grammar is compiled for.
///
/// The mode decides production numbering (LR modes carry the augmented production with
/// number 0), whether LR items carry lookahead sets, and which reduce set the
/// [ParsingTable] consults for a final item.
pub enum GrammarMode {
    LR0,
    SLR1,
    LALR1,
    CLR1,
    LL1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The line and column information at a code point.
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A wrapper for the input text to be parsed with lazily computed line information.
pub struct Code<'c> {
    pub value: &'c str,
    line_breaks: OnceCell<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The source span of a token or of a reduced non-terminal.
///
/// Offsets are byte offsets into the parsed string; lines and columns are 1-based.
pub struct SourceLocation {
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Element of the tokenized data returned by the [Tokenizer].
///
/// The `kind` of a token produced for an explicit quoted terminal is the quoted form
/// itself (`"'+'"`), so parsing table lookups need no second probe.
pub struct Token {
    pub kind: String,
    pub value: String,
    pub loc: SourceLocation,
}

/// A trait implemented by semantic value types folded by the [LrParser].
///
/// When the driver shifts a token it wraps it with [leaf](ValueImpl::leaf); when it
/// reduces a production with no registered action it applies the default semantics:
/// an epsilon production yields [null](ValueImpl::null), a single symbol production
/// propagates its only child, and any other production folds its children with
/// [node](ValueImpl::node).
pub trait ValueImpl: Clone + Debug {
    fn null() -> Self;
    fn leaf(token: &Token) -> Self;
    fn node(symbol: &str, children: Vec<Self>) -> Self;
}

#[derive(Debug, Clone, PartialEq)]
/// The default semantic value: a parse tree folding the raw token sequence via the
/// productions that reduced it.
pub enum ParseTree {
    Null,
    Leaf {
        kind: String,
        value: String,
        start: usize,
        end: usize,
    },
    Node {
        symbol: String,
        children: Vec<ParseTree>,
    },
}

#[derive(Debug)]
/// An error returned when a grammar specification cannot be normalized: an unknown
/// symbol in a precedence declaration, a missing start symbol, a malformed production
/// or lexical rule, or a reference to an undefined macro.
pub struct GrammarError {
    message: String,
}

#[derive(Debug)]
/// An error returned when no lexical rule matches at the current position.
pub struct LexError {
    pub pointer: usize,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The kind of a parsing table conflict.
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

#[derive(Debug)]
/// An error returned when a conflict survives precedence and associativity processing
/// while conflict resolution is disabled.
pub struct TableConflictError {
    pub state: usize,
    pub symbol: String,
    pub kind: ConflictKind,
}

#[derive(Debug)]
/// An error returned when the driver cannot continue: a missing table entry, an
/// unexpected end of input, or a residual stack after accept.
pub struct ParseError {
    pub pointer: usize,
    message: String,
}

#[derive(Debug)]
/// An error returned while assembling a parser from a grammar specification.
pub enum BuildError {
    Grammar(GrammarError),
    Conflict(TableConflictError),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// A enum structure to assign multiple level debugging to the generator, the driver
/// and the tokenizer.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

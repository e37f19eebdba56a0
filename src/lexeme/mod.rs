//! A module consisting of the lexical grammar: regex driven rules with stackable
//! start conditions, macro expansion, and the handler actions a matched rule applies
//! to the tokenizer.
//!
//! A lexical rule matches its compiled regular expression against the remaining input,
//! always anchored at the current position. The first rule that matches wins, and its
//! handler decides what happens next: return a token kind (or several, queued), skip
//! the match, or change the active start condition by mutating the state stack.
//! Handlers coming from the structured grammar surface are a small command language
//! (`return 'NUMBER';`, `begin('comment');`, `push_state('s');`, `pop_state();`,
//! `skip`) compiled when the grammar is built; a closure based [thunk](LexHandler::Thunk)
//! handler covers behavior the command language cannot express, including rewriting
//! `yytext` before the token is produced.

mod lex_grammar;
mod rule;

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

pub use lex_grammar::INITIAL_STATE;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A start condition stack operation performed by a lexical rule handler.
pub enum StateOp {
    /// Push a state, activating it.
    Push(String),
    /// Pop the current state, re-activating the previous one.
    Pop,
    /// Replace the current state.
    Begin(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// The outcome of a lexical rule handler: state stack operations followed by the token
/// kinds to emit. No token kinds means the match is skipped.
pub struct TokenAction {
    pub ops: Vec<StateOp>,
    pub tokens: Vec<String>,
}

impl TokenAction {
    pub fn skip() -> Self {
        TokenAction::default()
    }

    pub fn token(kind: &str) -> Self {
        TokenAction {
            ops: Vec::new(),
            tokens: vec![kind.to_string()],
        }
    }

    pub fn with_op(mut self, op: StateOp) -> Self {
        self.ops.push(op);
        self
    }
}

/// The mutable tokenizer view handed to a thunk handler.
pub struct LexContext<'t> {
    /// The matched text; overwrite it to alter the produced token's value.
    pub yytext: &'t mut String,
    /// The start condition stack. The bottom entry is the `INITIAL` state.
    pub state_stack: &'t mut Vec<String>,
}

impl<'t> LexContext<'t> {
    pub fn current_state(&self) -> &str {
        self.state_stack
            .last()
            .map_or(INITIAL_STATE, |state| state.as_str())
    }
}

#[derive(Clone)]
/// The handler of a lexical rule.
pub enum LexHandler {
    /// A handler compiled from the command language of the structured surface. The raw
    /// source is carried for the persisted artifacts.
    Command { raw: String, action: TokenAction },
    /// A closure invoked with the matched text and state stack.
    Thunk(Rc<dyn Fn(&mut LexContext) -> TokenAction>),
}

impl Debug for LexHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LexHandler::Command { raw, .. } => write!(f, "Command({:?})", raw),
            LexHandler::Thunk(_) => write!(f, "Thunk"),
        }
    }
}

#[derive(Debug, Clone)]
/// A compiled lexical rule: optional start conditions, the anchored matcher, and the
/// handler applied on a match.
pub struct LexRule {
    start_conditions: Option<Vec<String>>,
    raw_matcher: String,
    matcher: Regex,
    handler: LexHandler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether a start condition extends the default rule set or replaces it.
pub enum StartConditionKind {
    Inclusive,
    Exclusive,
}

#[derive(Debug, Clone)]
/// The compiled lexical grammar: macros, rules in priority order, start conditions,
/// and the per-state applicable rule lists computed at build time.
pub struct LexGrammar {
    macros: BTreeMap<String, String>,
    rules: Vec<LexRule>,
    start_conditions: BTreeMap<String, StartConditionKind>,
    rules_by_state: BTreeMap<String, Vec<usize>>,
    case_insensitive: bool,
}

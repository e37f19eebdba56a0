use crate::grammar::symbol;
use crate::lexeme::{LexContext, LexGrammar, LexHandler, StateOp, INITIAL_STATE};
use crate::{Code, LexError, Log, Token};
use once_cell::unsync::OnceCell;
use std::collections::VecDeque;

/// Base tokenization structure for lexical analysis.
///
/// The tokenizer matches the lexical rules of the current start condition against the
/// remaining input, always anchored at the cursor; the first matching rule in declared
/// order wins. The winning rule's handler may return one token kind, several (the rest
/// are queued and handed out on the following requests with the same matched text), or
/// none at all: a skip rule, which is not an error condition. Handlers can also push,
/// pop or replace the active start condition on the state stack.
///
/// # Example
/// ```
/// use lang_lr::{Grammar, GrammarMode, Tokenizer};
///
/// let grammar = Grammar::from_json(
///     r##"{
///         "lex": { "rules": [["\\s+", ""], ["\\d+", "return 'NUMBER';"]] },
///         "bnf": [ { "lhs": "E", "alternatives": ["NUMBER"] } ]
///     }"##,
///     GrammarMode::SLR1,
/// )
/// .unwrap();
///
/// let mut tokenizer = Tokenizer::new(grammar.lex_grammar(), "1 2");
/// let token = tokenizer.get_next_token().unwrap();
/// assert_eq!((token.kind.as_str(), token.value.as_str()), ("NUMBER", "1"));
/// let token = tokenizer.get_next_token().unwrap();
/// assert_eq!((token.kind.as_str(), token.value.as_str()), ("NUMBER", "2"));
/// assert!(tokenizer.is_eof());
/// assert_eq!(tokenizer.get_next_token().unwrap().kind, "$");
/// ```
pub struct Tokenizer<'t> {
    lex_grammar: &'t LexGrammar,
    code: Code<'t>,
    cursor: usize,
    state_stack: Vec<String>,
    queue: VecDeque<Token>,
    log: OnceCell<Log<&'static str>>,
}

impl<'t> Tokenizer<'t> {
    pub fn new(lex_grammar: &'t LexGrammar, input: &'t str) -> Self {
        Self {
            lex_grammar,
            code: Code::new(input),
            cursor: 0,
            state_stack: vec![INITIAL_STATE.to_string()],
            queue: VecDeque::new(),
            log: OnceCell::new(),
        }
    }

    /// Set a log label to debug the tokenization.
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    pub fn current_state(&self) -> &str {
        self.state_stack
            .last()
            .map_or(INITIAL_STATE, |state| state.as_str())
    }

    pub fn push_state(&mut self, state: &str) {
        self.state_stack.push(state.to_string());
    }

    /// Pop the current start condition. The bottom `INITIAL` entry always remains.
    pub fn pop_state(&mut self) {
        if self.state_stack.len() > 1 {
            self.state_stack.pop();
        }
    }

    /// Replace the current start condition.
    pub fn begin(&mut self, state: &str) {
        self.state_stack.pop();
        self.state_stack.push(state.to_string());
    }

    pub fn has_more_tokens(&self) -> bool {
        self.cursor <= self.code.value.len()
    }

    /// Whether the cursor stands exactly at the final position.
    pub fn is_eof(&self) -> bool {
        self.cursor == self.code.value.len()
    }

    pub fn has_queued_tokens(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn get_next_token(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.queue.pop_front() {
            return Ok(token);
        }

        #[cfg(debug_assertions)]
        let debug = self.log.get().map_or(Log::None, |label| *label);

        loop {
            if self.cursor >= self.code.value.len() {
                return Ok(self.eof_token());
            }

            let rule_indices = self
                .lex_grammar
                .rules_for_state(self.current_state())
                .ok_or_else(|| {
                    LexError::new(
                        self.cursor,
                        format!(
                            "Lexical state '{}' is not defined.",
                            self.current_state()
                        ),
                    )
                })?;

            let remaining: &str = &self.code.value[self.cursor..];
            let matched = rule_indices.iter().find_map(|&index| {
                self.lex_grammar
                    .rule(index)
                    .try_match(remaining)
                    .map(|length| (index, length))
            });

            let (index, length) = match matched {
                Some(matched) => matched,
                None => {
                    let offending = remaining.chars().next().unwrap();
                    let position = self.code.obtain_position(self.cursor);
                    return Err(LexError::new(
                        self.cursor,
                        format!(
                            "Unexpected token: \"{}\" at {}.\n\n{}",
                            offending,
                            position,
                            self.code.obtain_extract(self.cursor)
                        ),
                    ));
                }
            };

            let start = self.cursor;
            let end = start + length;
            let mut yytext = remaining[..length].to_string();
            self.cursor = end;

            let action = match self.lex_grammar.rule(index).handler() {
                LexHandler::Command { action, .. } => action.clone(),
                LexHandler::Thunk(handler) => {
                    let mut context = LexContext {
                        yytext: &mut yytext,
                        state_stack: &mut self.state_stack,
                    };
                    handler(&mut context)
                }
            };

            for op in &action.ops {
                match op {
                    StateOp::Push(state) => self.state_stack.push(state.clone()),
                    StateOp::Pop => self.pop_state(),
                    StateOp::Begin(state) => self.begin(state),
                }
            }

            #[cfg(debug_assertions)]
            if debug.order() >= Log::Verbose(()).order() {
                println!(
                    "[{}; Lexeme]: rule {} matched {:?} at {} in state {:?}",
                    debug,
                    index,
                    yytext,
                    self.code.obtain_position(start),
                    self.current_state()
                );
            }

            if action.tokens.is_empty() {
                continue;
            }

            let loc = self.code.obtain_location(start, end);
            let mut tokens = action
                .tokens
                .iter()
                .map(|kind| Token {
                    kind: kind.clone(),
                    value: yytext.clone(),
                    loc,
                });
            let first = tokens.next().unwrap();
            for token in tokens {
                self.queue.push_back(token);
            }

            #[cfg(debug_assertions)]
            if debug.order() >= Log::Success(()).order() {
                println!(
                    "[{}; Token]: {} {:?} at {}",
                    debug,
                    first.kind,
                    first.value,
                    self.code.obtain_position(start)
                );
            }

            return Ok(first);
        }
    }

    fn eof_token(&self) -> Token {
        let end = self.code.value.len();
        Token {
            kind: symbol::EOF.to_string(),
            value: String::new(),
            loc: self.code.obtain_location(end, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexeme::{LexRule, TokenAction};
    use crate::{Grammar, GrammarMode};

    fn comment_grammar() -> Grammar {
        Grammar::from_json(
            r##"{
                "lex": {
                    "rules": [
                        ["\\s+", ""],
                        ["\\d+", "return 'NUMBER';"],
                        ["\\/\\*", "push_state('comment');"],
                        [["comment"], "\\*\\/", "pop_state();"],
                        [["comment"], "\\d+", "return 'NUMBER_IN_COMMENT';"],
                        [["comment"], "\\s+", ""]
                    ],
                    "startConditions": { "comment": 1 }
                },
                "bnf": [ { "lhs": "E", "alternatives": ["NUMBER"] } ]
            }"##,
            GrammarMode::SLR1,
        )
        .unwrap()
    }

    #[test]
    fn switches_lexical_states_on_the_stack() {
        let grammar = comment_grammar();
        let mut tokenizer = Tokenizer::new(grammar.lex_grammar(), "1 /* 2 */ 3");

        let kinds_and_offsets: Vec<(String, usize)> = std::iter::from_fn(|| {
            let token = tokenizer.get_next_token().unwrap();
            if token.kind == "$" {
                None
            } else {
                Some((token.kind, token.loc.start_offset))
            }
        })
        .collect();

        assert_eq!(
            kinds_and_offsets,
            vec![
                ("NUMBER".to_string(), 0),
                ("NUMBER_IN_COMMENT".to_string(), 5),
                ("NUMBER".to_string(), 10),
            ]
        );
        assert!(tokenizer.is_eof());
    }

    #[test]
    fn tracks_locations_across_lines() {
        let grammar = comment_grammar();
        let mut tokenizer = Tokenizer::new(grammar.lex_grammar(), "1\n 23");

        let first = tokenizer.get_next_token().unwrap();
        assert_eq!((first.loc.start_line, first.loc.start_column), (1, 1));

        let second = tokenizer.get_next_token().unwrap();
        assert_eq!(second.value, "23");
        assert_eq!((second.loc.start_line, second.loc.start_column), (2, 2));
        assert_eq!((second.loc.start_offset, second.loc.end_offset), (3, 5));
    }

    #[test]
    fn token_locations_are_monotonic() {
        let grammar = comment_grammar();
        let mut tokenizer = Tokenizer::new(grammar.lex_grammar(), "1 /* 2 3 */ 4\n5");

        let mut previous_end = 0;
        loop {
            let token = tokenizer.get_next_token().unwrap();
            assert!(previous_end <= token.loc.start_offset);
            previous_end = token.loc.end_offset;
            if token.kind == "$" {
                break;
            }
        }
    }

    #[test]
    fn reports_lex_errors_with_position_and_extract() {
        let grammar = comment_grammar();
        let mut tokenizer = Tokenizer::new(grammar.lex_grammar(), "1 @");
        tokenizer.get_next_token().unwrap();

        let err = tokenizer.get_next_token().unwrap_err();
        assert_eq!(err.pointer, 2);
        assert!(err.message().contains("Unexpected token: \"@\" at 1:3"));
        assert!(err.message().contains("^"));
    }

    #[test]
    fn queues_extra_tokens_from_a_list_handler() {
        let grammar = Grammar::from_json(
            r##"{
                "lex": { "rules": [["ab", "return ['A', 'B'];"]] },
                "bnf": [ { "lhs": "S", "alternatives": ["A B"] } ]
            }"##,
            GrammarMode::SLR1,
        )
        .unwrap();
        let mut tokenizer = Tokenizer::new(grammar.lex_grammar(), "ab");

        let first = tokenizer.get_next_token().unwrap();
        assert_eq!((first.kind.as_str(), first.value.as_str()), ("A", "ab"));
        assert!(tokenizer.has_queued_tokens());
        let second = tokenizer.get_next_token().unwrap();
        assert_eq!((second.kind.as_str(), second.value.as_str()), ("B", "ab"));
        assert!(!tokenizer.has_queued_tokens());
    }

    #[test]
    fn thunk_handlers_can_rewrite_yytext() {
        let grammar = comment_grammar();
        let mut lex_grammar = grammar.lex_grammar().clone();
        lex_grammar.add_rule(
            LexRule::thunk(r#""[^"]*""#, |context| {
                let trimmed = context.yytext[1..context.yytext.len() - 1].to_string();
                *context.yytext = trimmed;
                TokenAction::token("STRING")
            })
            .unwrap(),
        );

        let mut tokenizer = Tokenizer::new(&lex_grammar, "\"hi\"");
        let token = tokenizer.get_next_token().unwrap();
        assert_eq!((token.kind.as_str(), token.value.as_str()), ("STRING", "hi"));
    }
}

use super::{CanonicalCollection, ParsingTable, TableEntry, TableOptions};
use crate::grammar::symbol;
use crate::sets::SetsGenerator;
use crate::{
    BuildError, Code, Grammar, Log, ParseError, ParseTree, SourceLocation, Token, Tokenizer,
    ValueImpl,
};
use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A semantic action invoked on a reduction: the context record plus the semantic
/// values of the right-hand side, left to right. Its result becomes the value of the
/// reduced non-terminal.
pub type SemanticHandler<V> = Rc<dyn Fn(&mut YyContext, Vec<V>) -> V>;

/// The explicit context record passed to every semantic action.
pub struct YyContext {
    /// The text of the most recently shifted token.
    pub yytext: String,
    /// The locations of the popped right-hand side values of the current reduction.
    pub locations: Vec<Option<SourceLocation>>,
    /// A user state slot shared across the actions of one parse.
    pub yy: serde_json::Value,
}

struct SymbolRecord<V> {
    on_symbol: String,
    value: V,
    loc: Option<SourceLocation>,
}

// The stack alternates symbol-value records and state numbers; the bottom entry is
// the starting state's number.
enum StackEntry<V> {
    State(usize),
    Value(SymbolRecord<V>),
}

/// The table driven LR recognizer.
///
/// The parser owns the normalized grammar, the canonical collection and the parsing
/// table; [parse](LrParser::parse) tokenizes the input and runs the shift/reduce loop,
/// folding semantic values with the registered actions (or the default propagation
/// semantics of [ValueImpl]). The value type defaults to [ParseTree], which folds the
/// raw token sequence via the reducing productions.
pub struct LrParser<V: ValueImpl = ParseTree> {
    grammar: Grammar,
    collection: CanonicalCollection,
    table: ParsingTable,
    handlers: HashMap<usize, SemanticHandler<V>>,
    on_parse_begin: Option<Rc<dyn Fn(&str)>>,
    on_parse_end: Option<Rc<dyn Fn(&V)>>,
    log: OnceCell<Log<&'static str>>,
}

impl<V: ValueImpl> LrParser<V> {
    /// Build the automaton and table for the grammar and wrap them in a driver.
    pub fn new(grammar: Grammar, options: TableOptions) -> Result<Self, BuildError> {
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets)?;
        let table = ParsingTable::new(&grammar, &collection, &sets, options)?;
        drop(sets);
        Ok(Self {
            grammar,
            collection,
            table,
            handlers: HashMap::new(),
            on_parse_begin: None,
            on_parse_end: None,
            log: OnceCell::new(),
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn collection(&self) -> &CanonicalCollection {
        &self.collection
    }

    pub fn table(&self) -> &ParsingTable {
        &self.table
    }

    /// Register the semantic action of a production by its number.
    pub fn set_action<TF: Fn(&mut YyContext, Vec<V>) -> V + 'static>(
        &mut self,
        production: usize,
        handler: TF,
    ) {
        self.handlers.insert(production, Rc::new(handler));
    }

    /// Install a hook invoked with the input before each parse.
    pub fn set_on_parse_begin<TF: Fn(&str) + 'static>(&mut self, hook: TF) {
        self.on_parse_begin = Some(Rc::new(hook));
    }

    /// Install a hook invoked with the final value after each accepted parse.
    pub fn set_on_parse_end<TF: Fn(&V) + 'static>(&mut self, hook: TF) {
        self.on_parse_end = Some(Rc::new(hook));
    }

    /// Set a log label to debug the driver.
    pub fn set_log(&self, log: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(log)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    /// Tokenize and parse the input, returning the semantic value of the start
    /// symbol.
    pub fn parse<'a>(&'a self, input: &'a str) -> Result<V, ParseError> {
        if let Some(hook) = &self.on_parse_begin {
            hook(input);
        }

        #[cfg(debug_assertions)]
        let debug = self.log.get().map_or(Log::None, |label| *label);

        let code = Code::new(input);
        let mut tokenizer = Tokenizer::new(self.grammar.lex_grammar(), input);
        let mut context = YyContext {
            yytext: String::new(),
            locations: Vec::new(),
            yy: serde_json::Value::Null,
        };

        let mut stack: Vec<StackEntry<V>> =
            vec![StackEntry::State(self.collection.start_state())];
        let mut token = tokenizer.get_next_token()?;

        loop {
            let state = peek_state(&stack)?;
            let entry = match self.table.entry(state, &token.kind) {
                None => return Err(unexpected_token(&code, &token)),
                Some(entry) if entry.is_conflict() => {
                    return Err(unexpected_token(&code, &token))
                }
                Some(entry) => entry.clone(),
            };

            match entry {
                TableEntry::Shift(target) => {
                    #[cfg(debug_assertions)]
                    if debug.order() >= Log::Verbose(()).order() {
                        println!("[{}; Shift]: {} -> state {}", debug, token.kind, target);
                    }
                    context.yytext = token.value.clone();
                    stack.push(StackEntry::Value(SymbolRecord {
                        on_symbol: token.kind.clone(),
                        value: V::leaf(&token),
                        loc: Some(token.loc),
                    }));
                    stack.push(StackEntry::State(target));
                    token = tokenizer.get_next_token()?;
                }

                TableEntry::Reduce(number) => {
                    let production = self.grammar.production(number);
                    #[cfg(debug_assertions)]
                    if debug.order() >= Log::Verbose(()).order() {
                        println!("[{}; Reduce]: by {} ({})", debug, number, production);
                    }

                    let arity = production.rhs_length();
                    let mut values: Vec<V> = Vec::with_capacity(arity);
                    let mut locations: Vec<Option<SourceLocation>> = Vec::with_capacity(arity);
                    for _ in 0..arity {
                        match stack.pop() {
                            Some(StackEntry::State(_)) => {}
                            _ => return Err(corrupted_stack(&token)),
                        }
                        match stack.pop() {
                            Some(StackEntry::Value(record)) => {
                                values.push(record.value);
                                locations.push(record.loc);
                            }
                            _ => return Err(corrupted_stack(&token)),
                        }
                    }
                    values.reverse();
                    locations.reverse();

                    let first = locations.iter().find_map(|loc| *loc);
                    let last = locations.iter().rev().find_map(|loc| *loc);
                    let loc = SourceLocation::merge(first, last);

                    let value = match self.handlers.get(&number) {
                        Some(handler) => {
                            context.locations = locations;
                            handler(&mut context, values)
                        }
                        None if arity == 0 => V::null(),
                        None if arity == 1 => values.pop().unwrap(),
                        None => V::node(production.lhs(), values),
                    };

                    let state = peek_state(&stack)?;
                    let goto = match self.table.entry(state, production.lhs()) {
                        Some(TableEntry::Goto(target)) => *target,
                        _ => {
                            return Err(ParseError::new(
                                token.loc.start_offset,
                                format!(
                                    "Missing goto entry for {} in state {}.",
                                    production.lhs(),
                                    state
                                ),
                            ))
                        }
                    };
                    stack.push(StackEntry::Value(SymbolRecord {
                        on_symbol: production.lhs().to_string(),
                        value,
                        loc,
                    }));
                    stack.push(StackEntry::State(goto));
                }

                TableEntry::Accept => {
                    stack.pop();
                    let record = match stack.pop() {
                        Some(StackEntry::Value(record)) => record,
                        _ => return Err(corrupted_stack(&token)),
                    };
                    debug_assert_eq!(record.on_symbol, self.grammar.start_symbol());

                    let clean = matches!(
                        stack.as_slice(),
                        [StackEntry::State(bottom)] if *bottom == self.collection.start_state()
                    );
                    if !clean || !tokenizer.is_eof() || tokenizer.has_queued_tokens() {
                        return Err(ParseError::new(
                            token.loc.start_offset,
                            "Residual stack after accept; the input continues past a complete parse."
                                .to_string(),
                        ));
                    }

                    #[cfg(debug_assertions)]
                    if debug.order() >= Log::Success(()).order() {
                        println!("[{}; Accept]", debug);
                    }
                    if let Some(hook) = &self.on_parse_end {
                        hook(&record.value);
                    }
                    return Ok(record.value);
                }

                TableEntry::Goto(_) | TableEntry::Conflict(_) => {
                    return Err(unexpected_token(&code, &token))
                }
            }
        }
    }
}

fn peek_state<V>(stack: &[StackEntry<V>]) -> Result<usize, ParseError> {
    match stack.last() {
        Some(StackEntry::State(state)) => Ok(*state),
        _ => Err(ParseError::new(
            0,
            "The parsing stack does not hold a state at its top.".to_string(),
        )),
    }
}

fn corrupted_stack(token: &Token) -> ParseError {
    ParseError::new(
        token.loc.start_offset,
        "The parsing stack does not alternate values and states.".to_string(),
    )
}

fn unexpected_token(code: &Code, token: &Token) -> ParseError {
    let position = format!("{}:{}", token.loc.start_line, token.loc.start_column);
    if token.kind == symbol::EOF {
        ParseError::new(
            token.loc.start_offset,
            format!("Unexpected end of input at {}.", position),
        )
    } else {
        ParseError::new(
            token.loc.start_offset,
            format!(
                "Unexpected token: \"{}\" at {}.\n\n{}",
                token.value,
                position,
                code.obtain_extract(token.loc.start_offset)
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarMode;

    fn binary_parser() -> LrParser {
        let grammar = Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "N", "alternatives": ["L"] },
                    { "lhs": "L", "alternatives": ["L B", "B"] },
                    { "lhs": "B", "alternatives": ["'1'", "'0'"] }
                ]
            }"##,
            GrammarMode::SLR1,
        )
        .unwrap();
        LrParser::new(grammar, TableOptions::default()).unwrap()
    }

    #[test]
    fn accepts_and_rejects_binary_strings() {
        let parser = binary_parser();
        assert!(parser.parse("101001101").is_ok());
        assert!(parser.parse("1").is_ok());

        let err = parser.parse("102").unwrap_err();
        assert!(err.message().contains("Unexpected token: \"2\" at 1:3"));
        assert!(parser.parse("").is_err());
    }

    #[test]
    fn default_semantics_fold_the_token_sequence() {
        let parser = binary_parser();
        let tree = parser.parse("10").unwrap();
        assert_eq!(tree.leaf_values(), vec!["1", "0"]);
        assert!(tree.contains("L"));
        assert!(tree.contains("'1'"));
    }

    #[test]
    fn reduction_locations_span_their_constituents() {
        let grammar = Grammar::from_json(
            r##"{
                "lex": { "rules": [["\\s+", ""], ["\\d+", "return 'NUMBER';"]] },
                "bnf": [
                    { "lhs": "Pair", "alternatives": [
                        { "rhs": "NUMBER NUMBER", "action": "$$ = [$1, $2]" }
                    ] }
                ]
            }"##,
            GrammarMode::SLR1,
        )
        .unwrap();
        let mut parser: LrParser<ParseTree> =
            LrParser::new(grammar, TableOptions::default()).unwrap();
        parser.set_action(1, |context, values| {
            assert_eq!(context.locations.len(), 2);
            let first = context.locations[0].unwrap();
            let second = context.locations[1].unwrap();
            assert_eq!(first.start_offset, 0);
            assert_eq!(second.start_line, 2);
            ParseTree::node("Pair", values)
        });

        parser.parse("12\n 34").unwrap();
    }

    #[test]
    fn invokes_parse_hooks() {
        use std::cell::RefCell;

        let grammar = Grammar::from_json(
            r##"{ "bnf": [ { "lhs": "S", "alternatives": ["'a'"] } ] }"##,
            GrammarMode::SLR1,
        )
        .unwrap();
        let mut parser: LrParser<ParseTree> =
            LrParser::new(grammar, TableOptions::default()).unwrap();

        let events: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let begin_events = events.clone();
        parser.set_on_parse_begin(move |input| {
            begin_events.borrow_mut().push(format!("begin:{}", input));
        });
        let end_events = events.clone();
        parser.set_on_parse_end(move |_value: &ParseTree| {
            end_events.borrow_mut().push("end".to_string());
        });

        parser.parse("a").unwrap();
        assert_eq!(
            events.borrow().as_slice(),
            &["begin:a".to_string(), "end".to_string()]
        );
    }

    #[test]
    fn epsilon_reductions_carry_no_location() {
        let grammar = Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "S", "alternatives": ["Opt 'a'"] },
                    { "lhs": "Opt", "alternatives": ["'b'", "ε"] }
                ]
            }"##,
            GrammarMode::SLR1,
        )
        .unwrap();
        let parser: LrParser<ParseTree> =
            LrParser::new(grammar, TableOptions::default()).unwrap();

        let tree = parser.parse("a").unwrap();
        assert!(tree.contains("'a'"));
        let tree = parser.parse("ba").unwrap();
        assert!(tree.contains("'b'"));
    }
}

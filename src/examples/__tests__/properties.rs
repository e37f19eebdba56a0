use crate::examples::calculator::{calculator_grammar, CALCULATOR_GRAMMAR};
use crate::grammar::symbol;
use crate::lr::TableOptions;
use crate::sets::SetsGenerator;
use crate::{
    CanonicalCollection, Grammar, GrammarMode, LrParser, ParseTree, ParsingTable, TableArtifacts,
    TableEntry,
};

fn automaton(
    grammar: &Grammar,
) -> (SetsGenerator<'_>, CanonicalCollection) {
    let sets = SetsGenerator::new(grammar);
    let collection = CanonicalCollection::new(grammar, &sets).unwrap();
    (sets, collection)
}

#[test]
fn production_numbers_are_contiguous_with_a_single_augmented_rule() {
    let grammar = calculator_grammar(GrammarMode::LALR1);

    for (index, production) in grammar.productions().iter().enumerate() {
        assert_eq!(production.number(), index);
    }
    let augmented: Vec<_> = grammar
        .productions()
        .iter()
        .filter(|p| p.lhs() == symbol::AUGMENTED_LHS)
        .collect();
    assert_eq!(augmented.len(), 1);
    assert_eq!(augmented[0].number(), 0);
}

#[test]
fn closure_contains_every_expansion_of_a_dotted_non_terminal() {
    let grammar = calculator_grammar(GrammarMode::CLR1);
    let (_, collection) = automaton(&grammar);

    for state in collection.states() {
        for item in state.items() {
            let Some(current) = item.current_symbol(&grammar) else {
                continue;
            };
            if !grammar.is_non_terminal(current) {
                continue;
            }
            for production in grammar.productions_for_symbol(current) {
                assert!(
                    state
                        .items()
                        .iter()
                        .any(|candidate| candidate.production() == production.number()
                            && candidate.dot() == 0),
                    "state {} misses the closure of {}",
                    state.number(),
                    production
                );
            }
        }
    }
}

#[test]
fn goto_has_at_most_one_successor_per_symbol() {
    let grammar = calculator_grammar(GrammarMode::LALR1);
    let (_, collection) = automaton(&grammar);

    for state in collection.states() {
        // The transition map is keyed by symbol, so a duplicate would have collapsed;
        // check the kernels it points to are the advanced items of this state.
        for (on_symbol, target) in state.transitions() {
            let advanced = state.goto_kernel(on_symbol, &grammar);
            assert!(!advanced.is_empty());
            let target_state = collection.state(*target);
            for item in &advanced {
                assert!(target_state
                    .kernel_items()
                    .iter()
                    .any(|kernel| kernel.production() == item.production()
                        && kernel.dot() == item.dot()));
            }
        }
    }
}

#[test]
fn lalr_merging_preserves_lr0_kernels_and_unions_lookaheads() {
    let grammar_clr = calculator_grammar(GrammarMode::CLR1);
    let (_, clr) = automaton(&grammar_clr);
    let grammar_lalr = calculator_grammar(GrammarMode::LALR1);
    let (_, lalr) = automaton(&grammar_lalr);

    assert!(lalr.size() <= clr.size());

    // Every LALR state is a fold of the CLR states sharing its LR(0) kernel.
    for lalr_state in lalr.states() {
        let lr0_key = lalr_state.lr0_kernel_key(&grammar_lalr);
        let merged: Vec<_> = clr
            .states()
            .iter()
            .filter(|clr_state| clr_state.lr0_kernel_key(&grammar_clr) == lr0_key)
            .collect();
        assert!(!merged.is_empty());

        for item in lalr_state.kernel_items() {
            let mut expected = std::collections::BTreeSet::new();
            for clr_state in &merged {
                let twin = clr_state
                    .kernel_items()
                    .iter()
                    .find(|candidate| {
                        candidate.production() == item.production()
                            && candidate.dot() == item.dot()
                    })
                    .unwrap();
                expected.extend(twin.lookaheads().unwrap().iter().cloned());
            }
            assert_eq!(item.lookaheads().unwrap(), &expected);
        }
    }
}

#[test]
fn reduce_entries_cover_the_whole_reduce_set() {
    let grammar = calculator_grammar(GrammarMode::LALR1);
    let (sets, collection) = automaton(&grammar);
    let table =
        ParsingTable::new(&grammar, &collection, &sets, TableOptions::default()).unwrap();

    for state in collection.states() {
        for item in state.items() {
            if !item.is_reduce(&grammar) {
                continue;
            }
            let number = item.production().to_string();
            for terminal in item.lookaheads().unwrap() {
                // Every reduce-set column holds the reduction or a conflict-resolved
                // replacement laid by precedence.
                let entry = table.entry(state.number(), terminal);
                match entry {
                    Some(TableEntry::Reduce(_)) | Some(TableEntry::Shift(_)) => {}
                    other => panic!(
                        "state {} column {} holds {:?} instead of r{} or a resolution",
                        state.number(),
                        terminal,
                        other,
                        number
                    ),
                }
            }
        }
    }
}

#[test]
fn default_propagation_folds_to_the_raw_token_sequence() {
    let grammar = Grammar::from_json(
        r##"{
            "lex": { "rules": [["\\s+", ""], ["\\d+", "return 'NUMBER';"]] },
            "bnf": [
                { "lhs": "List", "alternatives": ["List NUMBER", "NUMBER"] }
            ]
        }"##,
        GrammarMode::LALR1,
    )
    .unwrap();
    let parser: LrParser<ParseTree> = LrParser::new(grammar, TableOptions::default()).unwrap();

    let tree = parser.parse("1 2 3").unwrap();
    assert_eq!(tree.leaf_values(), vec!["1", "2", "3"]);
}

#[test]
fn two_generations_produce_byte_equal_artifacts() {
    let encode = || {
        let grammar = Grammar::from_json(CALCULATOR_GRAMMAR, GrammarMode::LALR1).unwrap();
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets).unwrap();
        let table =
            ParsingTable::new(&grammar, &collection, &sets, TableOptions::default()).unwrap();
        TableArtifacts::encode(&grammar, &table, None).to_json_pretty()
    };

    assert_eq!(encode(), encode());
}

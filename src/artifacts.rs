use crate::grammar::symbol;
use crate::lr::{ParsingTable, TableEntry};
use crate::Grammar;
use serde_json::{Map, Value};
use std::path::Path;

/// The persisted parser data consumed by target-language module emitters: the encoded
/// parsing table, the symbol-code map, the production table, the semantic action
/// sources (raw and rewritten), and the lexical rules with their per-state index.
///
/// Symbol codes run non-terminals first in declaration order, then terminals and
/// tokens, with the end of input marker last. Productions are listed from number 1
/// (the augmented production reduces to `acc` and needs no entry); entry `n - 1`
/// describes production `n`. Emission order is stable, so two generations of the same
/// grammar with the same options are byte-equal.
pub struct TableArtifacts {
    value: Value,
}

impl TableArtifacts {
    pub fn encode(
        grammar: &Grammar,
        table: &ParsingTable,
        custom_tokenizer: Option<&str>,
    ) -> Self {
        let mut symbol_codes: Vec<String> = Vec::new();
        symbol_codes.extend(grammar.non_terminals().iter().cloned());
        symbol_codes.extend(grammar.terminals().iter().cloned());
        symbol_codes.extend(grammar.tokens().iter().cloned());
        symbol_codes.push(symbol::EOF.to_string());

        let code_of = |name: &str| {
            symbol_codes
                .iter()
                .position(|candidate| candidate == name)
                .map_or(Value::Null, Value::from)
        };

        let mut tokens = Map::new();
        for (code, name) in symbol_codes.iter().enumerate() {
            tokens.insert(name.clone(), Value::from(code));
        }

        let mut table_rows: Vec<Value> = Vec::new();
        for row in table.rows() {
            let mut encoded = Map::new();
            for (code, name) in symbol_codes.iter().enumerate() {
                if let Some(entry) = row.get(name) {
                    let value = match entry {
                        TableEntry::Goto(target) => Value::from(*target),
                        action => Value::from(action.to_string()),
                    };
                    encoded.insert(code.to_string(), value);
                }
            }
            table_rows.push(Value::Object(encoded));
        }

        let mut productions: Vec<Value> = Vec::new();
        let mut handlers: Vec<Value> = Vec::new();
        for production in grammar.productions() {
            if production.is_augmented() {
                continue;
            }
            let handler_id = match production.semantic_action() {
                Some(action) => {
                    let mut handler = Map::new();
                    handler.insert("raw".to_string(), Value::from(action));
                    handler.insert(
                        "rewritten".to_string(),
                        Value::from(production.rewritten_action().unwrap()),
                    );
                    handlers.push(Value::Object(handler));
                    Value::from(handlers.len() - 1)
                }
                None => Value::Null,
            };
            productions.push(Value::Array(vec![
                code_of(production.lhs()),
                Value::from(production.rhs_length()),
                handler_id,
            ]));
        }

        let mut artifacts = Map::new();
        artifacts.insert("mode".to_string(), Value::from(grammar.mode().to_string()));
        artifacts.insert(
            "captureLocations".to_string(),
            Value::from(grammar.capture_locations()),
        );
        artifacts.insert("tokens".to_string(), Value::Object(tokens));
        artifacts.insert("table".to_string(), Value::Array(table_rows));
        artifacts.insert("productions".to_string(), Value::Array(productions));
        artifacts.insert("handlers".to_string(), Value::Array(handlers));

        match custom_tokenizer {
            Some(path) => {
                artifacts.insert("customTokenizer".to_string(), Value::from(path));
            }
            None => {
                let lex_grammar = grammar.lex_grammar();
                let mut lex_rules: Vec<Value> = Vec::new();
                let mut lex_handlers: Vec<Value> = Vec::new();
                for rule in lex_grammar.rules() {
                    let handler_id = match rule.handler_source() {
                        Some(source) => {
                            lex_handlers.push(Value::from(source));
                            Value::from(lex_handlers.len() - 1)
                        }
                        None => Value::Null,
                    };
                    let mut encoded = vec![Value::from(rule.raw_matcher()), handler_id];
                    if let Some(states) = rule.start_conditions() {
                        encoded.push(Value::Array(
                            states.iter().map(|s| Value::from(s.as_str())).collect(),
                        ));
                    }
                    lex_rules.push(Value::Array(encoded));
                }

                let mut lex_rules_by_state = Map::new();
                for (state, indices) in lex_grammar.rules_by_state() {
                    lex_rules_by_state.insert(
                        state.clone(),
                        Value::Array(indices.iter().map(|&i| Value::from(i)).collect()),
                    );
                }

                artifacts.insert("lexRules".to_string(), Value::Array(lex_rules));
                artifacts.insert("lexHandlers".to_string(), Value::Array(lex_handlers));
                artifacts.insert(
                    "lexRulesByState".to_string(),
                    Value::Object(lex_rules_by_state),
                );
            }
        }

        if !grammar.module_include().is_empty() {
            artifacts.insert(
                "moduleInclude".to_string(),
                Value::from(grammar.module_include()),
            );
        }

        Self {
            value: Value::Object(artifacts),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.value).expect("artifact values serialize")
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_json_pretty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lr::TableOptions;
    use crate::sets::SetsGenerator;
    use crate::{CanonicalCollection, GrammarMode, ParsingTable};

    const CALC: &str = r##"{
        "lex": { "rules": [["\\s+", ""], ["\\d+", "return 'NUMBER';"]] },
        "operators": [["left", "'+'"], ["left", "'*'"]],
        "bnf": [
            { "lhs": "E", "alternatives": ["E '+' E", "E '*' E", "'(' E ')'", "NUMBER"] }
        ]
    }"##;

    fn encode_calc() -> TableArtifacts {
        let grammar = Grammar::from_json(CALC, GrammarMode::LALR1).unwrap();
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets).unwrap();
        let table =
            ParsingTable::new(&grammar, &collection, &sets, TableOptions::default()).unwrap();
        TableArtifacts::encode(&grammar, &table, None)
    }

    #[test]
    fn orders_symbol_codes_with_eof_last() {
        let artifacts = encode_calc();
        let tokens = artifacts.value()["tokens"].as_object().unwrap();
        assert_eq!(tokens["E"], 0);
        assert_eq!(tokens["'+'"], 1);
        assert_eq!(tokens["NUMBER"], 5);
        assert_eq!(tokens["$"], 6);
    }

    #[test]
    fn encodes_productions_with_handler_references() {
        let artifacts = encode_calc();
        let productions = artifacts.value()["productions"].as_array().unwrap();
        assert_eq!(productions.len(), 4);
        // E '+' E: lhs-code 0, arity 3, no explicit or default action.
        assert_eq!(productions[0][0], 0);
        assert_eq!(productions[0][1], 3);
        assert!(productions[0][2].is_null());
        // NUMBER: the default propagation handler.
        let handler_id = productions[3][2].as_u64().unwrap() as usize;
        let handlers = artifacts.value()["handlers"].as_array().unwrap();
        assert_eq!(handlers[handler_id]["raw"], "$$ = $1");
        assert_eq!(handlers[handler_id]["rewritten"], "__ = _1");
    }

    #[test]
    fn generation_is_byte_stable() {
        let first = encode_calc().to_json_pretty();
        let second = encode_calc().to_json_pretty();
        assert_eq!(first, second);
        assert!(first.contains("lexRulesByState"));
    }

    #[test]
    fn custom_tokenizer_replaces_lex_sections() {
        let grammar = Grammar::from_json(CALC, GrammarMode::LALR1).unwrap();
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets).unwrap();
        let table =
            ParsingTable::new(&grammar, &collection, &sets, TableOptions::default()).unwrap();
        let artifacts = TableArtifacts::encode(&grammar, &table, Some("./tokenizer.js"));

        assert_eq!(artifacts.value()["customTokenizer"], "./tokenizer.js");
        assert!(artifacts.value().get("lexRules").is_none());
    }
}

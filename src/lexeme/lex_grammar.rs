use super::{LexGrammar, LexRule, StartConditionKind};
use crate::grammar::symbol;
use crate::grammar::LexSpec;
use crate::GrammarError;
use std::collections::BTreeMap;

/// The always present, inclusive default start condition.
pub const INITIAL_STATE: &str = "INITIAL";

impl LexGrammar {
    /// Build the lexical grammar from the structured surface: compile user rules in
    /// priority order, then append one auto-generated rule per quoted terminal so any
    /// unmatched explicit terminal still tokenizes.
    pub(crate) fn build(
        spec: Option<LexSpec>,
        terminals: &[String],
    ) -> Result<Self, GrammarError> {
        let spec = spec.unwrap_or_default();

        let mut start_conditions = BTreeMap::new();
        start_conditions.insert(INITIAL_STATE.to_string(), StartConditionKind::Inclusive);
        for (name, kind) in &spec.start_conditions {
            let kind = if *kind == 0 {
                StartConditionKind::Inclusive
            } else {
                StartConditionKind::Exclusive
            };
            start_conditions.insert(name.clone(), kind);
        }

        let case_insensitive = spec.options.case_insensitive;
        let mut rules = Vec::new();
        for rule_spec in &spec.rules {
            let conditions = rule_spec.start_conditions().map(|states| states.to_vec());
            if let Some(states) = &conditions {
                for state in states {
                    if state != "*" && !start_conditions.contains_key(state) {
                        return Err(GrammarError::new(format!(
                            "Lex rule for '{}' references undeclared start condition '{}'.",
                            rule_spec.matcher(),
                            state
                        )));
                    }
                }
            }
            rules.push(LexRule::compile(
                conditions,
                rule_spec.matcher(),
                rule_spec.handler(),
                &spec.macros,
                case_insensitive || rule_spec.options().case_insensitive,
            )?);
        }

        for terminal in terminals {
            let literal = regex::escape(symbol::terminal_value(terminal));
            rules.push(LexRule::compile(
                None,
                &literal,
                &format!("return \"{}\";", terminal),
                &BTreeMap::new(),
                false,
            )?);
        }

        let mut grammar = Self {
            macros: spec.macros.clone(),
            rules,
            start_conditions,
            rules_by_state: BTreeMap::new(),
            case_insensitive,
        };
        grammar.compute_rules_by_state();
        Ok(grammar)
    }

    /// Append a programmatic rule and recompute the per-state rule lists.
    pub fn add_rule(&mut self, rule: LexRule) {
        self.rules.push(rule);
        self.compute_rules_by_state();
    }

    // An inclusive state takes the rules with no start conditions plus the rules
    // naming it; an exclusive state takes only the rules naming it. `*` names every
    // state.
    fn compute_rules_by_state(&mut self) {
        let mut rules_by_state = BTreeMap::new();
        for (state, kind) in &self.start_conditions {
            let mut list = Vec::new();
            for (index, rule) in self.rules.iter().enumerate() {
                let applicable = match rule.start_conditions() {
                    None => *kind == StartConditionKind::Inclusive,
                    Some(states) => states.iter().any(|s| s == state || s == "*"),
                };
                if applicable {
                    list.push(index);
                }
            }
            rules_by_state.insert(state.clone(), list);
        }
        self.rules_by_state = rules_by_state;
    }

    pub fn rules(&self) -> &[LexRule] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> &LexRule {
        &self.rules[index]
    }

    pub fn rules_for_state(&self, state: &str) -> Option<&[usize]> {
        self.rules_by_state.get(state).map(|list| list.as_slice())
    }

    pub fn rules_by_state(&self) -> &BTreeMap<String, Vec<usize>> {
        &self.rules_by_state
    }

    pub fn start_conditions(&self) -> &BTreeMap<String, StartConditionKind> {
        &self.start_conditions
    }

    pub fn macros(&self) -> &BTreeMap<String, String> {
        &self.macros
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarSpec;

    fn comment_lex_spec() -> LexSpec {
        let spec = GrammarSpec::from_json(
            r##"{
                "lex": {
                    "rules": [
                        ["\\s+", ""],
                        ["\\d+", "return 'NUMBER';"],
                        ["\\/\\*", "push_state('comment');"],
                        [["comment"], "\\*\\/", "pop_state();"],
                        [["comment"], "\\d+", "return 'NUMBER_IN_COMMENT';"]
                    ],
                    "startConditions": { "comment": 1 }
                },
                "bnf": [ { "lhs": "E", "alternatives": ["NUMBER"] } ]
            }"##,
        )
        .unwrap();
        spec.lex.unwrap()
    }

    #[test]
    fn computes_inclusive_and_exclusive_rule_lists() {
        let grammar = LexGrammar::build(Some(comment_lex_spec()), &[]).unwrap();

        // INITIAL is inclusive: every rule without start conditions applies.
        assert_eq!(
            grammar.rules_for_state(INITIAL_STATE).unwrap(),
            &[0, 1, 2]
        );
        // comment is exclusive: only the rules naming it apply.
        assert_eq!(grammar.rules_for_state("comment").unwrap(), &[3, 4]);
        assert_eq!(grammar.rules_for_state("missing"), None);
    }

    #[test]
    fn wildcard_start_condition_applies_everywhere() {
        let spec = GrammarSpec::from_json(
            r##"{
                "lex": {
                    "rules": [
                        [["*"], "\\s+", ""],
                        ["\\d+", "return 'NUMBER';"],
                        [["comment"], "x", "return 'X';"]
                    ],
                    "startConditions": { "comment": 1 }
                },
                "bnf": [ { "lhs": "E", "alternatives": ["NUMBER"] } ]
            }"##,
        )
        .unwrap();
        let grammar = LexGrammar::build(spec.lex, &[]).unwrap();
        assert_eq!(grammar.rules_for_state(INITIAL_STATE).unwrap(), &[0, 1]);
        assert_eq!(grammar.rules_for_state("comment").unwrap(), &[0, 2]);
    }

    #[test]
    fn rejects_undeclared_start_conditions() {
        let spec = GrammarSpec::from_json(
            r##"{
                "lex": {
                    "rules": [ [["nowhere"], "x", "return 'X';"] ]
                },
                "bnf": [ { "lhs": "E", "alternatives": ["NUMBER"] } ]
            }"##,
        )
        .unwrap();
        assert!(LexGrammar::build(spec.lex, &[]).is_err());
    }
}

//! A module consisting of the grammar model: symbol classification, numbered
//! productions, operator precedence, and the normalization of a structured grammar
//! specification into the canonical internal form consumed by the sets generator and
//! the canonical collection.

mod production;
mod spec;
pub mod symbol;

pub use production::Production;
pub use spec::{AltSpec, BnfRule, GrammarSpec, LexOptions, LexRuleSpec, LexSpec};

use crate::lexeme::LexGrammar;
use crate::{GrammarError, GrammarMode};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The associativity of an operator line.
pub enum OperatorAssoc {
    Left,
    Right,
    NonAssoc,
}

impl FromStr for OperatorAssoc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(OperatorAssoc::Left),
            "right" => Ok(OperatorAssoc::Right),
            "nonassoc" => Ok(OperatorAssoc::NonAssoc),
            _ => Err(format!(
                "Unknown associativity '{}'. Expected left, right or nonassoc.",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Precedence and associativity resolved for one operator symbol.
///
/// Precedence is the 1-based index of the declaring operator line; a later line binds
/// tighter.
pub struct Operator {
    pub precedence: usize,
    pub assoc: OperatorAssoc,
}

#[derive(Debug)]
/// The canonical internal form of a grammar.
///
/// Normalization is deterministic and idempotent: the start symbol is chosen, the
/// augmented production is prepended in LR modes, operator lines become a
/// symbol-to-precedence map, symbols are classified into non-terminals, terminals and
/// tokens by scanning the productions, and the lexical grammar is built with an
/// auto-generated rule per quoted terminal so any unmatched explicit terminal still
/// tokenizes.
pub struct Grammar {
    mode: GrammarMode,
    start_symbol: String,
    productions: Vec<Production>,
    productions_by_lhs: BTreeMap<String, Vec<usize>>,
    operators: BTreeMap<String, Operator>,
    non_terminals: Vec<String>,
    terminals: Vec<String>,
    tokens: Vec<String>,
    lex_grammar: LexGrammar,
    module_include: String,
    capture_locations: bool,
}

impl Grammar {
    pub fn new(spec: GrammarSpec, mode: GrammarMode) -> Result<Self, GrammarError> {
        if spec.bnf.is_empty() {
            return Err(GrammarError::new(
                "Grammar specification contains no productions.".to_string(),
            ));
        }

        let mut operators = BTreeMap::new();
        for (index, line) in spec.operators.iter().enumerate() {
            let mut parts = line.iter();
            let assoc = parts
                .next()
                .ok_or_else(|| GrammarError::new("Empty operator declaration line.".to_string()))
                .and_then(|assoc| OperatorAssoc::from_str(assoc).map_err(GrammarError::new))?;
            for symbol_name in parts {
                operators.insert(
                    symbol_name.clone(),
                    Operator {
                        precedence: index + 1,
                        assoc,
                    },
                );
            }
        }

        let start_symbol = match &spec.start {
            Some(start) => {
                if !spec.bnf.iter().any(|rule| &rule.lhs == start) {
                    return Err(GrammarError::new(format!(
                        "Start symbol '{}' has no productions.",
                        start
                    )));
                }
                start.clone()
            }
            None => spec.bnf[0].lhs.clone(),
        };

        let mut productions = Vec::new();
        if mode.is_lr() {
            productions.push(Production::augmented(&start_symbol));
        }
        let mut number = 1;
        for rule in &spec.bnf {
            for (alt_index, alternative) in rule.alternatives.iter().enumerate() {
                productions.push(Production::new(
                    number,
                    &rule.lhs,
                    alternative.rhs(),
                    alternative.action(),
                    alternative.prec(),
                    &operators,
                    alt_index > 0,
                )?);
                number += 1;
            }
        }

        let mut non_terminals: Vec<String> = Vec::new();
        for rule in &spec.bnf {
            if !non_terminals.iter().any(|nt| nt == &rule.lhs) {
                non_terminals.push(rule.lhs.clone());
            }
        }
        let lhs_set: BTreeSet<&str> = non_terminals.iter().map(|nt| nt.as_str()).collect();

        let mut terminals: Vec<String> = Vec::new();
        let mut inferred_tokens: Vec<String> = Vec::new();
        for production in &productions {
            for rhs_symbol in production.rhs() {
                if symbol::is_terminal(rhs_symbol) {
                    if !terminals.iter().any(|t| t == rhs_symbol) {
                        terminals.push(rhs_symbol.clone());
                    }
                } else if !lhs_set.contains(rhs_symbol.as_str())
                    && !inferred_tokens.iter().any(|t| t == rhs_symbol)
                {
                    inferred_tokens.push(rhs_symbol.clone());
                }
            }
        }
        let tokens = spec.tokens.clone().unwrap_or(inferred_tokens);

        let mut productions_by_lhs: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for production in &productions {
            productions_by_lhs
                .entry(production.lhs().to_string())
                .or_default()
                .push(production.number());
        }

        let lex_grammar = LexGrammar::build(spec.lex.clone(), &terminals)?;

        Ok(Self {
            mode,
            start_symbol,
            productions,
            productions_by_lhs,
            operators,
            non_terminals,
            terminals,
            tokens,
            lex_grammar,
            module_include: spec.module_include.clone().unwrap_or_default(),
            capture_locations: spec.capture_locations,
        })
    }

    pub fn from_json(json: &str, mode: GrammarMode) -> Result<Self, GrammarError> {
        Grammar::new(GrammarSpec::from_json(json)?, mode)
    }

    pub fn mode(&self) -> GrammarMode {
        self.mode
    }

    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    /// All productions in numbering order. In LR modes the augmented production
    /// `$accept -> S` comes first with number 0.
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Look a production up by its number.
    pub fn production(&self, number: usize) -> &Production {
        if self.mode.is_lr() {
            &self.productions[number]
        } else {
            &self.productions[number - 1]
        }
    }

    /// The augmented production of an LR mode grammar.
    pub fn augmented_production(&self) -> &Production {
        debug_assert!(self.mode.is_lr());
        &self.productions[0]
    }

    /// All productions whose left-hand side is the given non-terminal.
    pub fn productions_for_symbol(&self, lhs: &str) -> Vec<&Production> {
        self.productions_by_lhs.get(lhs).map_or(Vec::new(), |numbers| {
            numbers.iter().map(|n| self.production(*n)).collect()
        })
    }

    /// All productions whose right-hand side mentions the given symbol.
    pub fn productions_with_symbol(&self, symbol: &str) -> Vec<&Production> {
        self.productions
            .iter()
            .filter(|p| p.rhs().iter().any(|s| s == symbol))
            .collect()
    }

    pub fn is_non_terminal(&self, symbol: &str) -> bool {
        self.productions_by_lhs.contains_key(symbol)
    }

    pub fn is_token(&self, symbol: &str) -> bool {
        self.tokens.iter().any(|t| t == symbol)
    }

    /// Non-terminals in first-appearance order, excluding the augmented symbol.
    pub fn non_terminals(&self) -> &[String] {
        &self.non_terminals
    }

    /// Quoted terminals in first-appearance order.
    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    /// Token symbols: inferred from the productions, or the explicit declaration when
    /// one is present.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Every symbol an action entry can be laid under: terminals, tokens, and the end
    /// of input marker.
    pub fn terminal_alphabet(&self) -> Vec<String> {
        let mut alphabet = self.terminals.clone();
        alphabet.extend(self.tokens.iter().cloned());
        alphabet.push(symbol::EOF.to_string());
        alphabet
    }

    pub fn operators(&self) -> &BTreeMap<String, Operator> {
        &self.operators
    }

    pub fn operator(&self, symbol: &str) -> Option<&Operator> {
        self.operators.get(symbol)
    }

    pub fn lex_grammar(&self) -> &LexGrammar {
        &self.lex_grammar
    }

    pub fn capture_locations(&self) -> bool {
        self.capture_locations
    }

    pub fn module_include(&self) -> &str {
        &self.module_include
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Grammar ({} mode):", self.mode)?;
        writeln!(f)?;
        for production in &self.productions {
            writeln!(f, "{:>5}. {}", production.number(), production)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc_spec() -> GrammarSpec {
        GrammarSpec::from_json(
            r##"{
                "operators": [["left", "'+'"], ["left", "'*'"]],
                "bnf": [
                    {
                        "lhs": "E",
                        "alternatives": ["E '+' E", "E '*' E", "'(' E ')'", "NUMBER"]
                    }
                ]
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn numbers_productions_with_augmented_rule_in_lr_mode() {
        let grammar = Grammar::new(calc_spec(), GrammarMode::LALR1).unwrap();
        assert_eq!(grammar.productions().len(), 5);
        assert_eq!(grammar.production(0).lhs(), "$accept");
        assert_eq!(grammar.production(0).rhs(), &["E".to_string()]);
        for (index, production) in grammar.productions().iter().enumerate() {
            assert_eq!(production.number(), index);
        }
        assert_eq!(grammar.start_symbol(), "E");
    }

    #[test]
    fn numbers_productions_from_one_in_ll_mode() {
        let grammar = Grammar::new(calc_spec(), GrammarMode::LL1).unwrap();
        assert_eq!(grammar.productions().len(), 4);
        assert_eq!(grammar.production(1).lhs(), "E");
        assert_eq!(grammar.productions()[0].number(), 1);
    }

    #[test]
    fn classifies_symbols() {
        let grammar = Grammar::new(calc_spec(), GrammarMode::LALR1).unwrap();
        assert_eq!(grammar.non_terminals(), &["E".to_string()]);
        assert_eq!(
            grammar.terminals(),
            &[
                "'+'".to_string(),
                "'*'".to_string(),
                "'('".to_string(),
                "')'".to_string()
            ]
        );
        assert_eq!(grammar.tokens(), &["NUMBER".to_string()]);
        assert!(grammar.is_non_terminal("E"));
        assert!(grammar.is_token("NUMBER"));
    }

    #[test]
    fn resolves_operator_precedence_lines() {
        let grammar = Grammar::new(calc_spec(), GrammarMode::LALR1).unwrap();
        let plus = grammar.operator("'+'").unwrap();
        let times = grammar.operator("'*'").unwrap();
        assert_eq!(plus.precedence, 1);
        assert_eq!(times.precedence, 2);
        assert!(times.precedence > plus.precedence);
        assert_eq!(plus.assoc, OperatorAssoc::Left);

        assert_eq!(grammar.production(1).precedence(), 1);
        assert_eq!(grammar.production(2).precedence(), 2);
    }

    #[test]
    fn explicit_start_symbol_must_have_productions() {
        let mut spec = calc_spec();
        spec.start = Some("Missing".to_string());
        assert!(Grammar::new(spec, GrammarMode::LALR1).is_err());
    }

    #[test]
    fn appends_auto_rules_for_quoted_terminals() {
        let grammar = Grammar::new(calc_spec(), GrammarMode::LALR1).unwrap();
        // One auto rule per explicit terminal, even with no user lex section.
        assert_eq!(grammar.lex_grammar().rules().len(), 4);
    }
}

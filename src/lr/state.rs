use super::{LrItem, LrState};
use crate::grammar::symbol;
use crate::sets::SetsGenerator;
use crate::Grammar;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

impl LrState {
    /// Build a state from its kernel items and close it: every item with a
    /// non-terminal right of the dot expands to all productions of that non-terminal,
    /// with lookaheads computed from the First set of the suffix in LALR(1)/CLR(1)
    /// modes. Items sharing an LR(0) key keep a single, merged lookahead set.
    pub(crate) fn closed(kernel_items: Vec<LrItem>, grammar: &Grammar, sets: &SetsGenerator) -> Self {
        let mut state = Self {
            number: 0,
            kernel_length: kernel_items.len(),
            items: kernel_items,
            transitions: BTreeMap::new(),
        };
        state.close(grammar, sets);
        state
    }

    // Runs to fixpoint: a lookahead added to an already closed item re-expands it on
    // the following pass.
    fn close(&mut self, grammar: &Grammar, sets: &SetsGenerator) {
        let uses_lookaheads = grammar.mode().uses_lookaheads();
        loop {
            let mut pending: Vec<(usize, Option<BTreeSet<String>>)> = Vec::new();

            for item in &self.items {
                let current = match item.current_symbol(grammar) {
                    Some(current) if grammar.is_non_terminal(current) => current,
                    _ => continue,
                };

                let lookaheads = if uses_lookaheads {
                    let production = grammar.production(item.production());
                    let suffix = &production.rhs()[item.dot() + 1..];
                    let mut lookaheads = sets.first_of_rhs(suffix);
                    // The suffix deriving ε exposes the item's own lookaheads.
                    if lookaheads.remove(symbol::EPSILON) {
                        if let Some(own) = item.lookaheads() {
                            lookaheads.extend(own.iter().cloned());
                        }
                    }
                    Some(lookaheads)
                } else {
                    None
                };

                for production in grammar.productions_for_symbol(current) {
                    pending.push((production.number(), lookaheads.clone()));
                }
            }

            let mut changed = false;
            for (number, lookaheads) in pending {
                match self
                    .items
                    .iter_mut()
                    .find(|item| item.production() == number && item.dot() == 0)
                {
                    Some(existing) => {
                        if let Some(lookaheads) = &lookaheads {
                            changed |= existing.merge_lookaheads(lookaheads);
                        }
                    }
                    None => {
                        self.items.push(LrItem::new(number, 0, lookaheads));
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: usize) {
        self.number = number;
    }

    /// All items: the kernel first, then the closure items.
    pub fn items(&self) -> &[LrItem] {
        &self.items
    }

    /// The founding items of the state.
    pub fn kernel_items(&self) -> &[LrItem] {
        &self.items[..self.kernel_length]
    }

    pub fn transitions(&self) -> &BTreeMap<String, usize> {
        &self.transitions
    }

    pub(crate) fn set_transition(&mut self, on_symbol: String, target: usize) {
        self.transitions.insert(on_symbol, target);
    }

    pub(crate) fn remap_transitions(&mut self, map: impl Fn(usize) -> usize) {
        for target in self.transitions.values_mut() {
            *target = map(*target);
        }
    }

    /// The symbols standing right of a dot in this state, in deterministic order.
    pub fn transition_symbols(&self, grammar: &Grammar) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        let mut seen = BTreeSet::new();
        for item in &self.items {
            if let Some(current) = item.current_symbol(grammar) {
                if seen.insert(current.to_string()) {
                    symbols.push(current.to_string());
                }
            }
        }
        symbols.sort();
        symbols
    }

    /// The kernel of the goto target on a symbol: every item with that symbol at the
    /// dot, advanced.
    pub fn goto_kernel(&self, on_symbol: &str, grammar: &Grammar) -> Vec<LrItem> {
        self.items
            .iter()
            .filter(|item| item.current_symbol(grammar) == Some(on_symbol))
            .map(|item| item.advance())
            .collect()
    }

    /// Union the lookaheads of a state sharing this state's LR(0) kernel, item by
    /// item. Reports whether any set grew.
    pub(crate) fn merge_lookaheads_from(&mut self, other: &LrState) -> bool {
        let mut changed = false;
        for other_item in &other.items {
            if let Some(lookaheads) = other_item.lookaheads() {
                if let Some(item) = self.items.iter_mut().find(|item| {
                    item.production() == other_item.production() && item.dot() == other_item.dot()
                }) {
                    changed |= item.merge_lookaheads(lookaheads);
                }
            }
        }
        changed
    }

    /// The state identity: the sorted full keys of the kernel items.
    pub fn kernel_key(&self, grammar: &Grammar) -> String {
        let mut keys: Vec<String> = self
            .kernel_items()
            .iter()
            .map(|item| item.full_key(grammar))
            .collect();
        keys.sort();
        keys.join("|")
    }

    /// The LR(0) identity of the kernel, shared by LALR(1) merge candidates.
    pub fn lr0_kernel_key(&self, grammar: &Grammar) -> String {
        let mut keys: Vec<String> = self
            .kernel_items()
            .iter()
            .map(|item| item.lr0_key(grammar))
            .collect();
        keys.sort();
        keys.join("|")
    }

    /// A state containing exactly one item which is final.
    pub fn is_final(&self, grammar: &Grammar) -> bool {
        self.items.len() == 1 && self.items[0].is_final(grammar)
    }

    /// The final state whose sole item reduces the augmented production.
    pub fn is_accept(&self, grammar: &Grammar) -> bool {
        self.is_final(grammar) && self.items[0].is_accept(grammar)
    }

    pub fn render(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        writeln!(out, "State {}", self.number).unwrap();
        for (index, item) in self.items.iter().enumerate() {
            let marker = if index < self.kernel_length { "*" } else { " " };
            writeln!(out, "  {} {}", marker, item.render(grammar)).unwrap();
        }
        if !self.transitions.is_empty() {
            let transitions: Vec<String> = self
                .transitions
                .iter()
                .map(|(on_symbol, target)| format!("{} -> {}", on_symbol, target))
                .collect();
            writeln!(out, "    on: {}", transitions.join(", ")).unwrap();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarMode;

    fn grammar(mode: GrammarMode) -> Grammar {
        Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "S", "alternatives": ["A A"] },
                    { "lhs": "A", "alternatives": ["'a' A", "'b'"] }
                ]
            }"##,
            mode,
        )
        .unwrap()
    }

    fn root_state(grammar: &Grammar, sets: &SetsGenerator) -> LrState {
        let lookaheads = grammar
            .mode()
            .uses_lookaheads()
            .then(|| BTreeSet::from(["$".to_string()]));
        LrState::closed(vec![LrItem::new(0, 0, lookaheads)], grammar, sets)
    }

    #[test]
    fn closes_over_non_terminals_at_the_dot() {
        let grammar = grammar(GrammarMode::LR0);
        let sets = SetsGenerator::new(&grammar);
        let state = root_state(&grammar, &sets);

        // $accept -> • S, S -> • A A, A -> • 'a' A, A -> • 'b'
        assert_eq!(state.items().len(), 4);
        assert_eq!(state.kernel_items().len(), 1);
    }

    #[test]
    fn closure_computes_lookaheads_from_the_suffix() {
        let grammar = grammar(GrammarMode::CLR1);
        let sets = SetsGenerator::new(&grammar);
        let state = root_state(&grammar, &sets);

        // S -> • A A inherits {$} through the empty suffix of $accept -> • S.
        let s_item = state
            .items()
            .iter()
            .find(|item| item.production() == 1)
            .unwrap();
        assert_eq!(s_item.lookaheads().unwrap(), &BTreeSet::from(["$".to_string()]));

        // A -> • 'a' A before the second A: lookahead is First(A) = {'a', 'b'}.
        let a_item = state
            .items()
            .iter()
            .find(|item| item.production() == 2)
            .unwrap();
        assert_eq!(
            a_item.lookaheads().unwrap(),
            &BTreeSet::from(["'a'".to_string(), "'b'".to_string()])
        );
    }

    #[test]
    fn goto_kernel_advances_matching_items() {
        let grammar = grammar(GrammarMode::LR0);
        let sets = SetsGenerator::new(&grammar);
        let state = root_state(&grammar, &sets);

        let kernel = state.goto_kernel("A", &grammar);
        assert_eq!(kernel.len(), 1);
        assert_eq!(kernel[0].lr0_key(&grammar), "S -> A • A");

        let kernel = state.goto_kernel("'a'", &grammar);
        assert_eq!(kernel.len(), 1);
        assert_eq!(kernel[0].lr0_key(&grammar), "A -> 'a' • A");
    }

    #[test]
    fn lookahead_merge_reaches_nested_closures() {
        // S -> A; A -> B; B -> 'b'. In the root state the closure lookahead of
        // B -> • 'b' flows through A's empty suffix from the kernel lookahead.
        let grammar = Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "S", "alternatives": ["A"] },
                    { "lhs": "A", "alternatives": ["B"] },
                    { "lhs": "B", "alternatives": ["'b'"] }
                ]
            }"##,
            GrammarMode::CLR1,
        )
        .unwrap();
        let sets = SetsGenerator::new(&grammar);
        let state = root_state(&grammar, &sets);

        let b_item = state
            .items()
            .iter()
            .find(|item| item.production() == 3)
            .unwrap();
        assert_eq!(b_item.lookaheads().unwrap(), &BTreeSet::from(["$".to_string()]));
    }
}

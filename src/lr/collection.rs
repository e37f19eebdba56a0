use super::{CanonicalCollection, LrItem, LrState};
use crate::grammar::symbol;
use crate::sets::SetsGenerator;
use crate::{Grammar, GrammarError, GrammarMode};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::Write;

impl CanonicalCollection {
    /// Build the state graph: close the root item of the augmented production, then
    /// follow goto transitions through the kernel registry until no new kernel set
    /// appears. LALR(1) grammars are built with full lookaheads and folded afterwards
    /// by merging states sharing an LR(0) kernel.
    pub fn new(grammar: &Grammar, sets: &SetsGenerator) -> Result<Self, GrammarError> {
        let mode = grammar.mode();
        if !mode.is_lr() {
            return Err(GrammarError::new(format!(
                "The canonical collection requires an LR mode; the grammar is {}.",
                mode
            )));
        }

        let root_lookaheads = mode
            .uses_lookaheads()
            .then(|| BTreeSet::from([symbol::EOF.to_string()]));
        let root_item = LrItem::new(0, 0, root_lookaheads);

        let mut states: Vec<LrState> = Vec::new();
        let mut kernel_index: HashMap<String, usize> = HashMap::new();
        // Buckets in creation order; the first state of a bucket becomes the LALR
        // representative.
        let mut lr0_index: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        let root = LrState::closed(vec![root_item], grammar, sets);
        kernel_index.insert(root.kernel_key(grammar), 0);
        lr0_index
            .entry(root.lr0_kernel_key(grammar))
            .or_default()
            .push(0);
        states.push(root);

        let mut queue: VecDeque<usize> = VecDeque::from([0]);
        while let Some(index) = queue.pop_front() {
            for on_symbol in states[index].transition_symbols(grammar) {
                let kernel = states[index].goto_kernel(&on_symbol, grammar);
                let key = kernel_key_of(&kernel, grammar);

                let target = match kernel_index.get(&key) {
                    Some(&target) => target,
                    None => {
                        let state = LrState::closed(kernel, grammar, sets);
                        let target = states.len();
                        kernel_index.insert(key, target);
                        lr0_index
                            .entry(state.lr0_kernel_key(grammar))
                            .or_default()
                            .push(target);
                        states.push(state);
                        queue.push_back(target);
                        target
                    }
                };
                states[index].set_transition(on_symbol, target);
            }
        }

        let mut dead = vec![false; states.len()];
        let mut redirect: Vec<usize> = (0..states.len()).collect();
        if mode == GrammarMode::LALR1 {
            for bucket in lr0_index.values().filter(|bucket| bucket.len() > 1) {
                let representative = bucket[0];
                for &merged in &bucket[1..] {
                    let merged_state = states[merged].clone();
                    states[representative].merge_lookaheads_from(&merged_state);
                    dead[merged] = true;
                    redirect[merged] = representative;
                    kernel_index.remove(&merged_state.kernel_key(grammar));
                }
            }
        }

        // Renumber the surviving states 0..N-1 and rewire every transition; the
        // sequence is frozen from here on.
        let mut new_numbers = vec![usize::MAX; states.len()];
        let mut renumbered: Vec<LrState> = Vec::new();
        for (old_index, state) in states.into_iter().enumerate() {
            if dead[old_index] {
                continue;
            }
            new_numbers[old_index] = renumbered.len();
            renumbered.push(state);
        }
        for (number, state) in renumbered.iter_mut().enumerate() {
            state.set_number(number);
            state.remap_transitions(|target| new_numbers[redirect[target]]);
        }
        let kernel_index = renumbered
            .iter()
            .map(|state| (state.kernel_key(grammar), state.number()))
            .collect();

        Ok(Self {
            states: renumbered,
            start_state: 0,
            mode,
            kernel_index,
        })
    }

    pub fn states(&self) -> &[LrState] {
        &self.states
    }

    pub fn state(&self, number: usize) -> &LrState {
        &self.states[number]
    }

    pub fn size(&self) -> usize {
        self.states.len()
    }

    pub fn mode(&self) -> GrammarMode {
        self.mode
    }

    /// The number of the state closing over the augmented root item.
    pub fn start_state(&self) -> usize {
        self.start_state
    }

    pub fn starting_state(&self) -> &LrState {
        &self.states[self.start_state]
    }

    pub fn state_by_kernel_key(&self, key: &str) -> Option<&LrState> {
        self.kernel_index.get(key).map(|&number| self.state(number))
    }

    pub fn render(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        writeln!(
            out,
            "Canonical collection: {} state(s) ({} mode). Kernel items are marked *.",
            self.states.len(),
            self.mode
        )
        .unwrap();
        writeln!(out).unwrap();
        for state in &self.states {
            out.push_str(&state.render(grammar));
        }
        out
    }
}

fn kernel_key_of(kernel: &[LrItem], grammar: &Grammar) -> String {
    let mut keys: Vec<String> = kernel.iter().map(|item| item.full_key(grammar)).collect();
    keys.sort();
    keys.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_grammar(mode: GrammarMode) -> Grammar {
        Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "N", "alternatives": ["L"] },
                    { "lhs": "L", "alternatives": ["L B", "B"] },
                    { "lhs": "B", "alternatives": ["'1'", "'0'"] }
                ]
            }"##,
            mode,
        )
        .unwrap()
    }

    fn cc_grammar(mode: GrammarMode) -> Grammar {
        Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "S", "alternatives": ["C C"] },
                    { "lhs": "C", "alternatives": ["'c' C", "'d'"] }
                ]
            }"##,
            mode,
        )
        .unwrap()
    }

    #[test]
    fn builds_the_binary_strings_automaton() {
        let grammar = binary_grammar(GrammarMode::SLR1);
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets).unwrap();

        assert_eq!(collection.size(), 7);
        assert_eq!(collection.start_state(), 0);
        // The root closes over every production of the grammar.
        assert_eq!(collection.starting_state().items().len(), 6);

        // Contiguous numbering after the freeze.
        for (index, state) in collection.states().iter().enumerate() {
            assert_eq!(state.number(), index);
            for (_, target) in state.transitions() {
                assert!(*target < collection.size());
            }
        }
    }

    #[test]
    fn rejects_non_lr_modes() {
        let grammar = binary_grammar(GrammarMode::LL1);
        let sets = SetsGenerator::new(&grammar);
        assert!(CanonicalCollection::new(&grammar, &sets).is_err());
    }

    #[test]
    fn clr_distinguishes_lookahead_contexts() {
        let grammar = cc_grammar(GrammarMode::CLR1);
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets).unwrap();
        // The classic S -> C C automaton: 10 CLR(1) states.
        assert_eq!(collection.size(), 10);
    }

    #[test]
    fn lalr_merges_states_sharing_an_lr0_kernel() {
        let grammar = cc_grammar(GrammarMode::LALR1);
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets).unwrap();
        // The same automaton folds to 7 LALR(1) states.
        assert_eq!(collection.size(), 7);

        // The merged C -> 'd' • state carries the union of its lookaheads.
        let d_state = collection
            .states()
            .iter()
            .find(|state| {
                state.items().len() == 1 && state.items()[0].lr0_key(&grammar) == "C -> 'd' •"
            })
            .unwrap();
        assert_eq!(
            d_state.items()[0].lookaheads().unwrap(),
            &BTreeSet::from(["$".to_string(), "'c'".to_string(), "'d'".to_string()])
        );
    }

    #[test]
    fn goto_is_deterministic_and_consistent_with_kernels() {
        let grammar = binary_grammar(GrammarMode::SLR1);
        let sets = SetsGenerator::new(&grammar);
        let collection = CanonicalCollection::new(&grammar, &sets).unwrap();

        for state in collection.states() {
            for (on_symbol, target) in state.transitions() {
                // The target kernel is exactly the advanced items of this state.
                let expected = kernel_key_of(&state.goto_kernel(on_symbol, &grammar), &grammar);
                assert_eq!(collection.state(*target).kernel_key(&grammar), expected);
            }
        }
    }
}

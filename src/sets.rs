use crate::grammar::symbol;
use crate::Grammar;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// First/Follow set computation over the grammar alphabet.
///
/// All sets are computed once at construction with a worklist to fixed point and
/// memoized; termination is guaranteed because the sets only grow and are bounded by
/// the finite alphabet. `ε` appears in a First set exactly when the symbol derives the
/// empty string.
pub struct SetsGenerator<'g> {
    grammar: &'g Grammar,
    first: BTreeMap<String, BTreeSet<String>>,
    follow: BTreeMap<String, BTreeSet<String>>,
}

impl<'g> SetsGenerator<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        let first = compute_first(grammar);
        let follow = compute_follow(grammar, &first);
        Self {
            grammar,
            first,
            follow,
        }
    }

    /// First set of a single grammar symbol. For a terminal, a token or `$` this is
    /// the symbol itself.
    pub fn first_of(&self, symbol: &str) -> &BTreeSet<String> {
        self.first
            .get(symbol)
            .unwrap_or_else(|| panic!("First set requested for unknown symbol '{}'", symbol))
    }

    /// First set of a right-hand side slice: the union of the member First sets while
    /// the members derive `ε`, containing `ε` exactly when every member does.
    pub fn first_of_rhs(&self, rhs: &[String]) -> BTreeSet<String> {
        first_of_rhs_in(&self.first, rhs)
    }

    /// Follow set of a non-terminal.
    pub fn follow_of(&self, symbol: &str) -> &BTreeSet<String> {
        self.follow
            .get(symbol)
            .unwrap_or_else(|| panic!("Follow set requested for unknown symbol '{}'", symbol))
    }

    pub fn grammar(&self) -> &Grammar {
        self.grammar
    }
}

fn first_of_rhs_in(
    first: &BTreeMap<String, BTreeSet<String>>,
    rhs: &[String],
) -> BTreeSet<String> {
    let mut result = BTreeSet::new();
    let mut all_nullable = true;

    for rhs_symbol in rhs {
        let symbol_first = match first.get(rhs_symbol) {
            Some(set) => set,
            None => {
                // Symbols with no computed set (unseen tokens) start just themselves.
                result.insert(rhs_symbol.clone());
                all_nullable = false;
                break;
            }
        };
        result.extend(
            symbol_first
                .iter()
                .filter(|s| !symbol::is_epsilon(s))
                .cloned(),
        );
        if !symbol_first.contains(symbol::EPSILON) {
            all_nullable = false;
            break;
        }
    }

    if all_nullable {
        result.insert(symbol::EPSILON.to_string());
    }
    result
}

fn compute_first(grammar: &Grammar) -> BTreeMap<String, BTreeSet<String>> {
    let mut first: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for terminal in grammar.terminal_alphabet() {
        first.insert(terminal.clone(), BTreeSet::from([terminal]));
    }
    first.insert(
        symbol::EPSILON.to_string(),
        BTreeSet::from([symbol::EPSILON.to_string()]),
    );
    for production in grammar.productions() {
        first.entry(production.lhs().to_string()).or_default();
    }

    let mut additions = true;
    while additions {
        additions = false;
        for production in grammar.productions() {
            let rhs_first = if production.is_epsilon() {
                BTreeSet::from([symbol::EPSILON.to_string()])
            } else {
                first_of_rhs_in(&first, production.rhs())
            };

            let lhs_first = first.get_mut(production.lhs()).unwrap();
            let before = lhs_first.len();
            lhs_first.extend(rhs_first);
            if lhs_first.len() > before {
                additions = true;
            }
        }
    }
    first
}

fn compute_follow(
    grammar: &Grammar,
    first: &BTreeMap<String, BTreeSet<String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut follow: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for production in grammar.productions() {
        follow.entry(production.lhs().to_string()).or_default();
    }

    // The end of input follows the start symbol (the augmented start in LR modes).
    let seed = if grammar.mode().is_lr() {
        symbol::AUGMENTED_LHS
    } else {
        grammar.start_symbol()
    };
    follow
        .get_mut(seed)
        .unwrap()
        .insert(symbol::EOF.to_string());

    let mut additions = true;
    while additions {
        additions = false;
        for production in grammar.productions() {
            for (index, rhs_symbol) in production.rhs().iter().enumerate() {
                if !grammar.is_non_terminal(rhs_symbol) {
                    continue;
                }
                let suffix_first = first_of_rhs_in(first, &production.rhs()[index + 1..]);
                let suffix_nullable = suffix_first.contains(symbol::EPSILON);

                let mut incoming: BTreeSet<String> = suffix_first
                    .into_iter()
                    .filter(|s| !symbol::is_epsilon(s))
                    .collect();
                if suffix_nullable {
                    incoming.extend(follow.get(production.lhs()).unwrap().iter().cloned());
                }

                let target = follow.get_mut(rhs_symbol).unwrap();
                let before = target.len();
                target.extend(incoming);
                if target.len() > before {
                    additions = true;
                }
            }
        }
    }
    follow
}

impl Display for SetsGenerator<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "First sets:")?;
        for (symbol_name, set) in &self.first {
            if self.grammar.is_non_terminal(symbol_name) {
                writeln!(
                    f,
                    "  First({}) = {{ {} }}",
                    symbol_name,
                    set.iter().cloned().collect::<Vec<_>>().join(" ")
                )?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Follow sets:")?;
        for (symbol_name, set) in &self.follow {
            writeln!(
                f,
                "  Follow({}) = {{ {} }}",
                symbol_name,
                set.iter().cloned().collect::<Vec<_>>().join(" ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarMode;

    fn expression_grammar() -> Grammar {
        Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "E", "alternatives": ["T Ep"] },
                    { "lhs": "Ep", "alternatives": ["'+' T Ep", "ε"] },
                    { "lhs": "T", "alternatives": ["F Tp"] },
                    { "lhs": "Tp", "alternatives": ["'*' F Tp", "ε"] },
                    { "lhs": "F", "alternatives": ["'(' E ')'", "'id'"] }
                ]
            }"##,
            GrammarMode::SLR1,
        )
        .unwrap()
    }

    fn set(symbols: &[&str]) -> BTreeSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn computes_first_sets() {
        let grammar = expression_grammar();
        let sets = SetsGenerator::new(&grammar);

        assert_eq!(sets.first_of("'id'"), &set(&["'id'"]));
        assert_eq!(sets.first_of("F"), &set(&["'('", "'id'"]));
        assert_eq!(sets.first_of("T"), &set(&["'('", "'id'"]));
        assert_eq!(sets.first_of("E"), &set(&["'('", "'id'"]));
        assert_eq!(sets.first_of("Ep"), &set(&["'+'", "ε"]));
        assert_eq!(sets.first_of("Tp"), &set(&["'*'", "ε"]));
        assert_eq!(sets.first_of("$accept"), &set(&["'('", "'id'"]));
    }

    #[test]
    fn computes_first_of_rhs_slices() {
        let grammar = expression_grammar();
        let sets = SetsGenerator::new(&grammar);

        assert_eq!(
            sets.first_of_rhs(&["T".to_string(), "Ep".to_string()]),
            set(&["'('", "'id'"])
        );
        // Both symbols derive ε, so the slice does too.
        assert_eq!(
            sets.first_of_rhs(&["Ep".to_string(), "Tp".to_string()]),
            set(&["'+'", "'*'", "ε"])
        );
        assert_eq!(sets.first_of_rhs(&[]), set(&["ε"]));
    }

    #[test]
    fn computes_follow_sets() {
        let grammar = expression_grammar();
        let sets = SetsGenerator::new(&grammar);

        assert_eq!(sets.follow_of("E"), &set(&["$", "')'"]));
        assert_eq!(sets.follow_of("Ep"), &set(&["$", "')'"]));
        assert_eq!(sets.follow_of("T"), &set(&["$", "')'", "'+'"]));
        assert_eq!(sets.follow_of("Tp"), &set(&["$", "')'", "'+'"]));
        assert_eq!(sets.follow_of("F"), &set(&["$", "')'", "'+'", "'*'"]));
    }
}

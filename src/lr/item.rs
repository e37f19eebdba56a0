use super::LrItem;
use crate::Grammar;
use std::collections::BTreeSet;

impl LrItem {
    pub(crate) fn new(production: usize, dot: usize, lookaheads: Option<BTreeSet<String>>) -> Self {
        Self {
            production,
            dot,
            lookaheads,
        }
    }

    /// The number of the production this item stands in.
    pub fn production(&self) -> usize {
        self.production
    }

    /// The dot position, 0 to the length of the right-hand side.
    pub fn dot(&self) -> usize {
        self.dot
    }

    pub fn lookaheads(&self) -> Option<&BTreeSet<String>> {
        self.lookaheads.as_ref()
    }

    /// The symbol standing right of the dot, or none for a final item.
    pub fn current_symbol<'g>(&self, grammar: &'g Grammar) -> Option<&'g str> {
        grammar
            .production(self.production)
            .rhs()
            .get(self.dot)
            .map(|s| s.as_str())
    }

    pub fn is_final(&self, grammar: &Grammar) -> bool {
        self.dot == grammar.production(self.production).rhs_length()
    }

    /// Whether the driver shifts on this item: the current symbol is a terminal or a
    /// token.
    pub fn is_shift(&self, grammar: &Grammar) -> bool {
        self.current_symbol(grammar)
            .map_or(false, |s| !grammar.is_non_terminal(s))
    }

    pub fn is_reduce(&self, grammar: &Grammar) -> bool {
        self.is_final(grammar) && !grammar.production(self.production).is_augmented()
    }

    pub fn is_accept(&self, grammar: &Grammar) -> bool {
        self.is_final(grammar) && grammar.production(self.production).is_augmented()
    }

    /// A new item with the dot advanced past the current symbol, carrying the same
    /// lookaheads.
    pub fn advance(&self) -> LrItem {
        LrItem {
            production: self.production,
            dot: self.dot + 1,
            lookaheads: self.lookaheads.clone(),
        }
    }

    /// Union the other lookahead set into this item's; reports whether the set grew.
    pub(crate) fn merge_lookaheads(&mut self, other: &BTreeSet<String>) -> bool {
        match &mut self.lookaheads {
            Some(lookaheads) => {
                let before = lookaheads.len();
                lookaheads.extend(other.iter().cloned());
                lookaheads.len() > before
            }
            None => {
                self.lookaheads = Some(other.clone());
                true
            }
        }
    }

    /// The LR(0) identity of the item: `LHS -> α • β`.
    pub fn lr0_key(&self, grammar: &Grammar) -> String {
        let production = grammar.production(self.production);
        let mut parts: Vec<&str> = Vec::with_capacity(production.rhs_length() + 1);
        for (index, rhs_symbol) in production.rhs().iter().enumerate() {
            if index == self.dot {
                parts.push("•");
            }
            parts.push(rhs_symbol);
        }
        if self.dot == production.rhs_length() {
            parts.push("•");
        }
        format!("{} -> {}", production.lhs(), parts.join(" "))
    }

    /// The full identity: the LR(0) key extended with the sorted lookaheads when the
    /// mode carries them.
    pub fn full_key(&self, grammar: &Grammar) -> String {
        match &self.lookaheads {
            Some(lookaheads) => format!(
                "{}/{}",
                self.lr0_key(grammar),
                lookaheads.iter().cloned().collect::<Vec<_>>().join(",")
            ),
            None => self.lr0_key(grammar),
        }
    }

    /// The item rendered for collection dumps.
    pub fn render(&self, grammar: &Grammar) -> String {
        match &self.lookaheads {
            Some(lookaheads) => format!(
                "[{}, {{{}}}]",
                self.lr0_key(grammar),
                lookaheads.iter().cloned().collect::<Vec<_>>().join(" ")
            ),
            None => format!("[{}]", self.lr0_key(grammar)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarMode;

    fn grammar() -> Grammar {
        Grammar::from_json(
            r##"{
                "bnf": [
                    { "lhs": "E", "alternatives": ["E '+' E", "NUMBER"] }
                ]
            }"##,
            GrammarMode::CLR1,
        )
        .unwrap()
    }

    #[test]
    fn advances_the_dot_to_final() {
        let grammar = grammar();
        let item = LrItem::new(1, 0, Some(BTreeSet::from(["$".to_string()])));
        assert_eq!(item.current_symbol(&grammar), Some("E"));
        assert!(!item.is_final(&grammar));

        let item = item.advance().advance();
        assert_eq!(item.current_symbol(&grammar), Some("E"));
        let item = item.advance();
        assert!(item.is_final(&grammar));
        assert!(item.is_reduce(&grammar));
        assert_eq!(item.current_symbol(&grammar), None);
    }

    #[test]
    fn distinguishes_accept_from_reduce() {
        let grammar = grammar();
        let augmented = LrItem::new(0, 1, Some(BTreeSet::from(["$".to_string()])));
        assert!(augmented.is_accept(&grammar));
        assert!(!augmented.is_reduce(&grammar));
    }

    #[test]
    fn keys_carry_dot_position_and_lookaheads() {
        let grammar = grammar();
        let item = LrItem::new(
            1,
            1,
            Some(BTreeSet::from(["$".to_string(), "'+'".to_string()])),
        );
        assert_eq!(item.lr0_key(&grammar), "E -> E • '+' E");
        assert_eq!(item.full_key(&grammar), "E -> E • '+' E/$,'+'");

        let bare = LrItem::new(2, 1, None);
        assert_eq!(bare.lr0_key(&grammar), "E -> NUMBER •");
        assert_eq!(bare.full_key(&grammar), bare.lr0_key(&grammar));
    }

    #[test]
    fn merges_lookahead_sets() {
        let grammar = grammar();
        let mut item = LrItem::new(1, 0, Some(BTreeSet::from(["$".to_string()])));
        let grew = item.merge_lookaheads(&BTreeSet::from(["'+'".to_string()]));
        assert!(grew);
        assert!(!item.merge_lookaheads(&BTreeSet::from(["'+'".to_string()])));
        assert_eq!(item.full_key(&grammar), "E -> • E '+' E/$,'+'");
    }
}

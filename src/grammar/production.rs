use super::symbol;
use crate::{GrammarError, Operator};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

static ACTION_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$@](\$|\d+|[A-Za-z_][A-Za-z0-9_]*)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
/// A numbered grammar production with its semantic action and resolved precedence.
///
/// Productions are created once during grammar normalization and never mutated.
pub struct Production {
    number: usize,
    lhs: String,
    rhs: Vec<String>,
    semantic_action: Option<String>,
    precedence: usize,
    is_short: bool,
}

impl Production {
    /// Create a production from a whitespace separated right-hand side.
    ///
    /// An empty right-hand side or an explicit `ε` yields the epsilon production.
    /// Without an explicit action, an epsilon production propagates null and a single
    /// symbol production propagates its only value.
    pub(crate) fn new(
        number: usize,
        lhs: &str,
        rhs: &str,
        action: Option<&str>,
        prec_tag: Option<&str>,
        operators: &BTreeMap<String, Operator>,
        is_short: bool,
    ) -> Result<Self, GrammarError> {
        let mut symbols = symbol::split_rhs(rhs);
        if symbols.len() == 1 && symbol::is_epsilon(&symbols[0]) {
            symbols.clear();
        } else if symbols.iter().any(|s| symbol::is_epsilon(s)) {
            return Err(GrammarError::new(format!(
                "Malformed production {} -> {}: {} cannot be combined with other symbols.",
                lhs,
                rhs,
                symbol::EPSILON
            )));
        }

        let precedence = match prec_tag {
            Some(tag) => match operators.get(tag) {
                Some(operator) => operator.precedence,
                None => {
                    return Err(GrammarError::new(format!(
                        "Unknown precedence tag '{}' on production {} -> {}.",
                        tag, lhs, rhs
                    )))
                }
            },
            // Only raw quoted terminals take part in precedence inference.
            None => symbols
                .iter()
                .rev()
                .find(|s| symbol::is_terminal(s))
                .and_then(|s| operators.get(s.as_str()))
                .map_or(0, |operator| operator.precedence),
        };

        let semantic_action = match action {
            Some(action) => Some(action.to_string()),
            None if symbols.is_empty() => Some("$$ = null".to_string()),
            None if symbols.len() == 1 => Some("$$ = $1".to_string()),
            None => None,
        };

        Ok(Self {
            number,
            lhs: lhs.to_string(),
            rhs: symbols,
            semantic_action,
            precedence,
            is_short,
        })
    }

    /// The augmented production `$accept -> S` carrying number 0 in LR modes.
    pub(crate) fn augmented(start_symbol: &str) -> Self {
        Self {
            number: 0,
            lhs: symbol::AUGMENTED_LHS.to_string(),
            rhs: vec![start_symbol.to_string()],
            semantic_action: Some("$$ = $1".to_string()),
            precedence: 0,
            is_short: false,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn lhs(&self) -> &str {
        &self.lhs
    }

    pub fn rhs(&self) -> &[String] {
        &self.rhs
    }

    pub fn rhs_length(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_epsilon(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn is_augmented(&self) -> bool {
        self.lhs == symbol::AUGMENTED_LHS
    }

    /// Whether the production was written with the `|` shorthand of its rule.
    pub fn is_short(&self) -> bool {
        self.is_short
    }

    pub fn precedence(&self) -> usize {
        self.precedence
    }

    /// The semantic action source as carried by the grammar, defaults applied.
    pub fn semantic_action(&self) -> Option<&str> {
        self.semantic_action.as_deref()
    }

    /// The semantic action with `$$`/`$k`/`$name`/`@$`/`@k` references substituted
    /// with generator chosen variable names, as consumed by module emitters.
    pub fn rewritten_action(&self) -> Option<String> {
        self.semantic_action
            .as_deref()
            .map(|action| rewrite_action(action, &self.rhs))
    }
}

impl Display for Production {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.rhs.is_empty() {
            write!(f, "{} -> {}", self.lhs, symbol::EPSILON)
        } else {
            write!(f, "{} -> {}", self.lhs, self.rhs.join(" "))
        }
    }
}

/// Substitute positional (`$1`), named (`$name`), result (`$$`) and location (`@k`,
/// `@$`) references with stable variable names.
pub(crate) fn rewrite_action(action: &str, rhs: &[String]) -> String {
    ACTION_REF
        .replace_all(action, |caps: &regex::Captures| {
            let is_location = caps[0].starts_with('@');
            let reference = &caps[1];

            let position = if reference == "$" {
                None
            } else if let Ok(k) = reference.parse::<usize>() {
                Some(k)
            } else {
                match rhs
                    .iter()
                    .position(|s| s == reference || symbol::terminal_value(s) == reference)
                {
                    Some(index) => Some(index + 1),
                    None => return caps[0].to_string(),
                }
            };

            match (position, is_location) {
                (None, false) => "__".to_string(),
                (None, true) => "__loc".to_string(),
                (Some(k), false) => format!("_{}", k),
                (Some(k), true) => format!("_{}_loc", k),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OperatorAssoc;

    fn operators() -> BTreeMap<String, Operator> {
        let mut operators = BTreeMap::new();
        operators.insert(
            "'+'".to_string(),
            Operator {
                precedence: 1,
                assoc: OperatorAssoc::Left,
            },
        );
        operators.insert(
            "'*'".to_string(),
            Operator {
                precedence: 2,
                assoc: OperatorAssoc::Left,
            },
        );
        operators
    }

    #[test]
    fn infers_precedence_from_last_terminal() {
        let operators = operators();
        let p = Production::new(1, "E", "E '+' E", None, None, &operators, false).unwrap();
        assert_eq!(p.precedence(), 1);
        let p = Production::new(2, "E", "E '*' E", None, None, &operators, false).unwrap();
        assert_eq!(p.precedence(), 2);
        let p = Production::new(3, "E", "NUMBER", None, None, &operators, false).unwrap();
        assert_eq!(p.precedence(), 0);
    }

    #[test]
    fn explicit_prec_tag_overrides_inference() {
        let operators = operators();
        let p = Production::new(1, "E", "E '*' E", None, Some("'+'"), &operators, false).unwrap();
        assert_eq!(p.precedence(), 1);

        let err = Production::new(1, "E", "E '*' E", None, Some("'-'"), &operators, false);
        assert!(err.is_err());
    }

    #[test]
    fn applies_default_semantic_actions() {
        let operators = operators();
        let p = Production::new(1, "E", "NUMBER", None, None, &operators, false).unwrap();
        assert_eq!(p.semantic_action(), Some("$$ = $1"));
        let p = Production::new(2, "E", "", None, None, &operators, false).unwrap();
        assert!(p.is_epsilon());
        assert_eq!(p.semantic_action(), Some("$$ = null"));
        let p = Production::new(3, "E", "ε", None, None, &operators, false).unwrap();
        assert!(p.is_epsilon());
        let p = Production::new(4, "E", "E '+' E", None, None, &operators, false).unwrap();
        assert_eq!(p.semantic_action(), None);
    }

    #[test]
    fn rewrites_action_references() {
        let rhs: Vec<String> = vec!["E".into(), "'+'".into(), "E".into()];
        assert_eq!(
            rewrite_action("$$ = $1 + $3", &rhs),
            "__ = _1 + _3".to_string()
        );
        assert_eq!(
            rewrite_action("@$ = @1; $$ = $E", &rhs),
            "__loc = _1_loc; __ = _1".to_string()
        );

        let named: Vec<String> = vec!["IF".into(), "Condition".into(), "Block".into()];
        assert_eq!(
            rewrite_action("$$ = [$Condition, $Block]", &named),
            "__ = [_2, _3]".to_string()
        );
    }
}

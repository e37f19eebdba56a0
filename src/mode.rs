use crate::GrammarMode;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

impl GrammarMode {
    /// Whether the mode belongs to the LR family and carries the augmented production.
    pub fn is_lr(&self) -> bool {
        !matches!(self, GrammarMode::LL1)
    }

    /// Whether LR items carry lookahead sets in this mode.
    pub fn uses_lookaheads(&self) -> bool {
        matches!(self, GrammarMode::LALR1 | GrammarMode::CLR1)
    }
}

impl Display for GrammarMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GrammarMode::LR0 => "LR0",
            GrammarMode::SLR1 => "SLR1",
            GrammarMode::LALR1 => "LALR1",
            GrammarMode::CLR1 => "CLR1",
            GrammarMode::LL1 => "LL1",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for GrammarMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LR0" | "LR(0)" => Ok(GrammarMode::LR0),
            "SLR1" | "SLR(1)" => Ok(GrammarMode::SLR1),
            "LALR1" | "LALR(1)" => Ok(GrammarMode::LALR1),
            "CLR1" | "CLR(1)" => Ok(GrammarMode::CLR1),
            "LL1" | "LL(1)" => Ok(GrammarMode::LL1),
            _ => Err(format!(
                "Unknown parsing mode '{}'. Expected one of LR0, SLR1, LALR1, CLR1, LL1.",
                s
            )),
        }
    }
}

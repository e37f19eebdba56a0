use crate::GrammarError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
/// The structured grammar surface.
///
/// This is the JSON equivalent of the BNF-with-declarations text format: `bnf` holds
/// the rules in source order, `operators` holds associativity lines in increasing
/// precedence, `tokens` optionally overrides token inference, and `lex` is the inline
/// lexical grammar.
pub struct GrammarSpec {
    pub lex: Option<LexSpec>,
    pub bnf: Vec<BnfRule>,
    pub operators: Vec<Vec<String>>,
    pub tokens: Option<Vec<String>>,
    pub start: Option<String>,
    #[serde(rename = "moduleInclude")]
    pub module_include: Option<String>,
    #[serde(rename = "captureLocations")]
    pub capture_locations: bool,
}

impl GrammarSpec {
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        serde_json::from_str(json)
            .map_err(|err| GrammarError::new(format!("Malformed grammar specification: {}", err)))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// One grammar rule: a left-hand side with its alternative production bodies.
pub struct BnfRule {
    pub lhs: String,
    pub alternatives: Vec<AltSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
/// A production alternative: either a plain right-hand side string, or a body with an
/// explicit semantic action and/or a `%prec` tag.
pub enum AltSpec {
    Rhs(String),
    Full {
        rhs: String,
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        prec: Option<String>,
    },
}

impl AltSpec {
    pub fn rhs(&self) -> &str {
        match self {
            AltSpec::Rhs(rhs) => rhs,
            AltSpec::Full { rhs, .. } => rhs,
        }
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            AltSpec::Rhs(_) => None,
            AltSpec::Full { action, .. } => action.as_deref(),
        }
    }

    pub fn prec(&self) -> Option<&str> {
        match self {
            AltSpec::Rhs(_) => None,
            AltSpec::Full { prec, .. } => prec.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
/// The lexical grammar surface: macros, rules in priority order, start conditions
/// (`0` inclusive, `1` exclusive) and global options.
pub struct LexSpec {
    pub macros: BTreeMap<String, String>,
    pub rules: Vec<LexRuleSpec>,
    #[serde(rename = "startConditions")]
    pub start_conditions: BTreeMap<String, u8>,
    pub options: LexOptions,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LexOptions {
    #[serde(rename = "case-insensitive")]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
/// One lexical rule: `[matcher, handler]`, `[startConditions, matcher, handler]`, or
/// `[matcher, handler, options]`.
pub enum LexRuleSpec {
    Plain(String, String),
    InStates(Vec<String>, String, String),
    WithOptions(String, String, LexOptions),
}

impl LexRuleSpec {
    pub fn start_conditions(&self) -> Option<&[String]> {
        match self {
            LexRuleSpec::InStates(states, _, _) => Some(states),
            _ => None,
        }
    }

    pub fn matcher(&self) -> &str {
        match self {
            LexRuleSpec::Plain(matcher, _) => matcher,
            LexRuleSpec::InStates(_, matcher, _) => matcher,
            LexRuleSpec::WithOptions(matcher, _, _) => matcher,
        }
    }

    pub fn handler(&self) -> &str {
        match self {
            LexRuleSpec::Plain(_, handler) => handler,
            LexRuleSpec::InStates(_, _, handler) => handler,
            LexRuleSpec::WithOptions(_, handler, _) => handler,
        }
    }

    pub fn options(&self) -> LexOptions {
        match self {
            LexRuleSpec::WithOptions(_, _, options) => *options,
            _ => LexOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_rule_alternatives() {
        let spec = GrammarSpec::from_json(
            r##"{
                "bnf": [
                    {
                        "lhs": "E",
                        "alternatives": [
                            "E '+' E",
                            { "rhs": "E '*' E", "action": "$$ = $1 * $3" },
                            { "rhs": "NUMBER", "prec": "'*'" }
                        ]
                    }
                ]
            }"##,
        )
        .unwrap();

        let alternatives = &spec.bnf[0].alternatives;
        assert_eq!(alternatives[0].rhs(), "E '+' E");
        assert_eq!(alternatives[0].action(), None);
        assert_eq!(alternatives[1].action(), Some("$$ = $1 * $3"));
        assert_eq!(alternatives[2].prec(), Some("'*'"));
    }

    #[test]
    fn deserializes_lex_rule_forms() {
        let spec = GrammarSpec::from_json(
            r##"{
                "lex": {
                    "macros": { "digit": "[0-9]" },
                    "rules": [
                        ["\\s+", ""],
                        [["comment"], "{digit}+", "return 'NUMBER_IN_COMMENT';"],
                        ["{digit}+", "return 'NUMBER';", { "case-insensitive": true }]
                    ],
                    "startConditions": { "comment": 1 }
                },
                "bnf": [ { "lhs": "E", "alternatives": ["NUMBER"] } ]
            }"##,
        )
        .unwrap();

        let lex = spec.lex.unwrap();
        assert_eq!(lex.rules.len(), 3);
        assert_eq!(lex.rules[0].start_conditions(), None);
        assert_eq!(
            lex.rules[1].start_conditions().unwrap(),
            &["comment".to_string()]
        );
        assert!(lex.rules[2].options().case_insensitive);
        assert_eq!(lex.start_conditions.get("comment"), Some(&1));
    }
}

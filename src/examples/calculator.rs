//! An arithmetic expression evaluator: `E : E '+' E | E '*' E | '(' E ')' | NUMBER`
//! with `'+'` and `'*'` declared left associative, `'*'` binding tighter.

use crate::{Grammar, GrammarMode, LrParser, TableOptions, Token, ValueImpl};

pub const CALCULATOR_GRAMMAR: &str = r##"{
    "lex": {
        "rules": [
            ["\\s+", ""],
            ["\\d+", "return 'NUMBER';"]
        ]
    },
    "operators": [["left", "'+'"], ["left", "'*'"]],
    "bnf": [
        {
            "lhs": "E",
            "alternatives": ["E '+' E", "E '*' E", "'(' E ')'", "NUMBER"]
        }
    ]
}"##;

#[derive(Debug, Clone, PartialEq)]
pub enum CalcValue {
    Null,
    Number(f64),
    Op(String),
}

impl ValueImpl for CalcValue {
    fn null() -> Self {
        CalcValue::Null
    }

    fn leaf(token: &Token) -> Self {
        match token.kind.as_str() {
            "NUMBER" => CalcValue::Number(token.value.parse().unwrap_or(0.0)),
            _ => CalcValue::Op(token.value.clone()),
        }
    }

    fn node(_symbol: &str, children: Vec<Self>) -> Self {
        children.into_iter().next().unwrap_or(CalcValue::Null)
    }
}

pub fn calc_number(value: &CalcValue) -> f64 {
    match value {
        CalcValue::Number(n) => *n,
        _ => 0.0,
    }
}

pub fn calculator_grammar(mode: GrammarMode) -> Grammar {
    Grammar::from_json(CALCULATOR_GRAMMAR, mode).unwrap()
}

/// A ready to run evaluating parser for the calculator grammar.
pub fn calculator(mode: GrammarMode) -> LrParser<CalcValue> {
    let mut parser: LrParser<CalcValue> =
        LrParser::new(calculator_grammar(mode), TableOptions::default()).unwrap();

    parser.set_action(1, |_, values| {
        CalcValue::Number(calc_number(&values[0]) + calc_number(&values[2]))
    });
    parser.set_action(2, |_, values| {
        CalcValue::Number(calc_number(&values[0]) * calc_number(&values[2]))
    });
    parser.set_action(3, |_, mut values| values.remove(1));

    parser
}

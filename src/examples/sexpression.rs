//! An s-expression reader folding `(+ 1 15)` into the JSON value `["+", 1, 15]`.

use crate::{Grammar, GrammarMode, LrParser, TableOptions, Token, ValueImpl};
use serde_json::Value;

pub const SEXPRESSION_GRAMMAR: &str = r##"{
    "lex": {
        "rules": [
            ["\\s+", ""],
            ["\\d+", "return 'NUMBER';"],
            ["\"[^\"]*\"", "return 'STRING';"],
            ["[^\\s()]+", "return 'SYMBOL';"]
        ]
    },
    "bnf": [
        { "lhs": "Exp", "alternatives": ["Atom", "List"] },
        { "lhs": "List", "alternatives": ["'(' ListEntries ')'"] },
        { "lhs": "ListEntries", "alternatives": ["ListEntries Exp", "ε"] },
        { "lhs": "Atom", "alternatives": ["NUMBER", "SYMBOL", "STRING"] }
    ]
}"##;

#[derive(Debug, Clone, PartialEq)]
pub enum SexpValue {
    Null,
    Json(Value),
}

impl SexpValue {
    pub fn into_json(self) -> Value {
        match self {
            SexpValue::Null => Value::Null,
            SexpValue::Json(value) => value,
        }
    }
}

impl ValueImpl for SexpValue {
    fn null() -> Self {
        SexpValue::Null
    }

    fn leaf(token: &Token) -> Self {
        match token.kind.as_str() {
            "NUMBER" => match token.value.parse::<i64>() {
                Ok(n) => SexpValue::Json(Value::from(n)),
                Err(_) => SexpValue::Json(Value::from(token.value.parse::<f64>().unwrap_or(0.0))),
            },
            "SYMBOL" => SexpValue::Json(Value::from(token.value.as_str())),
            "STRING" => SexpValue::Json(Value::from(&token.value[1..token.value.len() - 1])),
            _ => SexpValue::Null,
        }
    }

    fn node(_symbol: &str, children: Vec<Self>) -> Self {
        children.into_iter().next().unwrap_or(SexpValue::Null)
    }
}

/// A ready to run s-expression reader.
pub fn sexpression() -> LrParser<SexpValue> {
    let grammar = Grammar::from_json(SEXPRESSION_GRAMMAR, GrammarMode::LALR1).unwrap();
    let mut parser: LrParser<SexpValue> =
        LrParser::new(grammar, TableOptions::default()).unwrap();

    // List : '(' ListEntries ')'
    parser.set_action(3, |_, mut values| values.remove(1));
    // ListEntries : ListEntries Exp
    parser.set_action(4, |_, mut values| {
        let item = values.pop().unwrap().into_json();
        match values.pop().unwrap() {
            SexpValue::Json(Value::Array(mut entries)) => {
                entries.push(item);
                SexpValue::Json(Value::Array(entries))
            }
            _ => SexpValue::Null,
        }
    });
    // ListEntries : ε
    parser.set_action(5, |_, _| SexpValue::Json(Value::Array(Vec::new())));

    parser
}

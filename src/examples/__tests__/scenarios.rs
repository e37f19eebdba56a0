use crate::examples::calculator::{calc_number, calculator};
use crate::examples::sexpression::sexpression;
use crate::{
    ConflictKind, Grammar, GrammarMode, LrParser, ParseTree, TableOptions, Tokenizer,
};

#[test]
fn calc_arithmetic_respects_precedence_and_parentheses() {
    let parser = calculator(GrammarMode::LALR1);

    let value = parser.parse("2 + 2 * 2").unwrap();
    assert_eq!(calc_number(&value), 6.0);

    let value = parser.parse("(2 + 2) * 2").unwrap();
    assert_eq!(calc_number(&value), 8.0);
}

#[test]
fn calc_arithmetic_works_in_every_lookahead_mode() {
    for mode in [GrammarMode::SLR1, GrammarMode::LALR1, GrammarMode::CLR1] {
        let parser = calculator(mode);
        assert_eq!(calc_number(&parser.parse("1 + 2 * 3 + 4").unwrap()), 11.0);
    }
}

#[test]
fn binary_strings_parse_under_slr1() {
    let grammar = Grammar::from_json(
        r##"{
            "bnf": [
                { "lhs": "N", "alternatives": ["L"] },
                { "lhs": "L", "alternatives": ["L B", "B"] },
                { "lhs": "B", "alternatives": ["'1'", "'0'"] }
            ]
        }"##,
        GrammarMode::SLR1,
    )
    .unwrap();
    let parser: LrParser<ParseTree> = LrParser::new(grammar, TableOptions::default()).unwrap();

    assert!(parser.parse("101001101").is_ok());
    assert!(parser.parse("10 2 01").is_err());
}

#[test]
fn s_expressions_fold_into_json() {
    let parser = sexpression();

    let value = parser.parse("(+ 1 15)").unwrap().into_json();
    assert_eq!(value, serde_json::json!(["+", 1, 15]));

    let value = parser
        .parse("(define (square x) (* x x))")
        .unwrap()
        .into_json();
    assert_eq!(
        value,
        serde_json::json!(["define", ["square", "x"], ["*", "x", "x"]])
    );

    let value = parser.parse("()").unwrap().into_json();
    assert_eq!(value, serde_json::json!([]));
}

const DANGLING_ELSE: &str = r##"{
    "lex": {
        "rules": [
            ["\\s+", ""],
            ["if", "return \"'if'\";"],
            ["else", "return \"'else'\";"],
            ["[a-z]+", "return 'IDENT';"]
        ]
    },
    "operators": [["nonassoc", "THEN"], ["nonassoc", "'else'"]],
    "bnf": [
        { "lhs": "Statement", "alternatives": ["IfStatement", "Expr ';'"] },
        {
            "lhs": "IfStatement",
            "alternatives": [
                { "rhs": "'if' '(' Expr ')' Statement", "prec": "THEN" },
                "'if' '(' Expr ')' Statement 'else' Statement"
            ]
        },
        { "lhs": "Expr", "alternatives": ["IDENT"] }
    ]
}"##;

#[test]
fn dangling_else_attaches_to_the_inner_if() {
    let grammar = Grammar::from_json(DANGLING_ELSE, GrammarMode::LALR1).unwrap();
    // Precedence alone resolves the shift/reduce on 'else'.
    let parser: LrParser<ParseTree> = LrParser::new(grammar, TableOptions::default()).unwrap();

    let tree = parser.parse("if (x) if (y) a; else b;").unwrap();

    let outer = tree
        .find_tree(&|t| matches!(t, ParseTree::Node { symbol, .. } if symbol == "IfStatement"))
        .unwrap();
    let outer_children = match outer {
        ParseTree::Node { children, .. } => children,
        _ => unreachable!(),
    };
    // The outer if took the %prec THEN alternative: no 'else' among its children.
    assert_eq!(outer_children.len(), 5);
    assert!(!outer_children
        .iter()
        .any(|child| matches!(child, ParseTree::Leaf { kind, .. } if kind == "'else'")));

    // The inner if carries the else branch.
    let inner = outer_children[4]
        .find_tree(&|t| matches!(t, ParseTree::Node { symbol, .. } if symbol == "IfStatement"))
        .unwrap();
    let inner_children = match inner {
        ParseTree::Node { children, .. } => children,
        _ => unreachable!(),
    };
    assert_eq!(inner_children.len(), 7);
    assert!(inner_children
        .iter()
        .any(|child| matches!(child, ParseTree::Leaf { kind, .. } if kind == "'else'")));
}

#[test]
fn associativity_conflicts_fail_without_operator_declarations() {
    let grammar = Grammar::from_json(
        r##"{
            "lex": { "rules": [["\\s+", ""], ["\\d+", "return 'NUMBER';"]] },
            "bnf": [
                { "lhs": "E", "alternatives": ["E '+' E", "E '*' E", "NUMBER"] }
            ]
        }"##,
        GrammarMode::LALR1,
    )
    .unwrap();

    match LrParser::<ParseTree>::new(grammar, TableOptions::default()) {
        Err(crate::BuildError::Conflict(conflict)) => {
            assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
            assert!(conflict.symbol == "'+'" || conflict.symbol == "'*'");
        }
        Err(other) => panic!("expected a table conflict, got {:?}", other),
        Ok(_) => panic!("the ambiguous grammar built a table without conflicts"),
    }
}

#[test]
fn tokenizer_states_produce_the_commented_number_sequence() {
    let grammar = Grammar::from_json(
        r##"{
            "lex": {
                "rules": [
                    ["\\s+", ""],
                    ["\\d+", "return 'NUMBER';"],
                    ["\\/\\*", "push_state('comment');"],
                    [["comment"], "\\*\\/", "pop_state();"],
                    [["comment"], "\\d+", "return 'NUMBER_IN_COMMENT';"],
                    [["comment"], "\\s+", ""]
                ],
                "startConditions": { "comment": 1 }
            },
            "bnf": [ { "lhs": "E", "alternatives": ["NUMBER"] } ]
        }"##,
        GrammarMode::SLR1,
    )
    .unwrap();

    let mut tokenizer = Tokenizer::new(grammar.lex_grammar(), "1 /* 2 */ 3");
    let mut sequence = Vec::new();
    loop {
        let token = tokenizer.get_next_token().unwrap();
        let done = token.kind == "$";
        sequence.push((token.kind, token.loc.start_offset));
        if done {
            break;
        }
    }

    assert_eq!(
        sequence,
        vec![
            ("NUMBER".to_string(), 0),
            ("NUMBER_IN_COMMENT".to_string(), 5),
            ("NUMBER".to_string(), 10),
            ("$".to_string(), 11),
        ]
    );
}

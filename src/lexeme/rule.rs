use super::{LexContext, LexHandler, LexRule, StateOp, TokenAction};
use crate::GrammarError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::rc::Rc;

static MACRO_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

const MACRO_EXPANSION_LIMIT: usize = 16;

impl LexRule {
    /// Compile a rule from the structured surface.
    ///
    /// `{name}` macro references are textually expanded before compilation, the
    /// matcher is anchored at the start of the remaining input, and the handler
    /// command source is parsed into a [TokenAction].
    pub(crate) fn compile(
        start_conditions: Option<Vec<String>>,
        matcher: &str,
        handler: &str,
        macros: &BTreeMap<String, String>,
        case_insensitive: bool,
    ) -> Result<Self, GrammarError> {
        let expanded = expand_macros(matcher, macros)?;
        let action = parse_handler(handler)?;
        Ok(Self {
            start_conditions,
            raw_matcher: matcher.to_string(),
            matcher: compile_matcher(&expanded, case_insensitive)?,
            handler: LexHandler::Command {
                raw: handler.to_string(),
                action,
            },
        })
    }

    /// Create a rule with a programmatic handler closure.
    pub fn thunk<TF: Fn(&mut LexContext) -> TokenAction + 'static>(
        matcher: &str,
        handler: TF,
    ) -> Result<Self, GrammarError> {
        Ok(Self {
            start_conditions: None,
            raw_matcher: matcher.to_string(),
            matcher: compile_matcher(matcher, false)?,
            handler: LexHandler::Thunk(Rc::new(handler)),
        })
    }

    /// Create a thunk rule restricted to the given start conditions.
    pub fn thunk_in_states<TF: Fn(&mut LexContext) -> TokenAction + 'static>(
        states: Vec<String>,
        matcher: &str,
        handler: TF,
    ) -> Result<Self, GrammarError> {
        let mut rule = LexRule::thunk(matcher, handler)?;
        rule.start_conditions = Some(states);
        Ok(rule)
    }

    /// Attempt an anchored match against the remaining input; returns the matched
    /// length.
    pub fn try_match(&self, remaining: &str) -> Option<usize> {
        self.matcher.find(remaining).map(|m| {
            debug_assert_eq!(m.start(), 0);
            m.end()
        })
    }

    pub fn start_conditions(&self) -> Option<&[String]> {
        self.start_conditions.as_deref()
    }

    pub fn raw_matcher(&self) -> &str {
        &self.raw_matcher
    }

    pub fn handler(&self) -> &LexHandler {
        &self.handler
    }

    /// The raw handler source for command rules, as persisted in artifacts.
    pub fn handler_source(&self) -> Option<&str> {
        match &self.handler {
            LexHandler::Command { raw, .. } => Some(raw),
            LexHandler::Thunk(_) => None,
        }
    }
}

fn compile_matcher(pattern: &str, case_insensitive: bool) -> Result<Regex, GrammarError> {
    let anchored = if pattern.starts_with('^') {
        pattern.to_string()
    } else {
        format!("^(?:{})", pattern)
    };
    let flagged = if case_insensitive {
        format!("(?i){}", anchored)
    } else {
        anchored
    };
    let regexp = Regex::new(&flagged).map_err(|err| {
        GrammarError::new(format!(
            "Lex matcher '{}' is not a valid regex expression: {}",
            pattern, err
        ))
    })?;
    if regexp.is_match("") {
        return Err(GrammarError::new(format!(
            "Lex matcher '{}' should not match an empty string.",
            pattern
        )));
    }
    Ok(regexp)
}

/// Expand `{name}` macro references, leaving regex repetitions and `\p{..}` classes
/// untouched. Expansion is repeated for nested macros up to a fixed depth.
pub(crate) fn expand_macros(
    pattern: &str,
    macros: &BTreeMap<String, String>,
) -> Result<String, GrammarError> {
    let mut current = pattern.to_string();
    for _ in 0..MACRO_EXPANSION_LIMIT {
        let mut expanded = String::with_capacity(current.len());
        let mut last_end = 0;
        let mut changed = false;

        for caps in MACRO_REF.captures_iter(&current) {
            let m = caps.get(0).unwrap();
            let preceded_by_class = m.start() >= 2
                && matches!(
                    current.get(m.start() - 2..m.start()),
                    Some(r"\p") | Some(r"\P")
                );
            if preceded_by_class {
                continue;
            }
            let name = &caps[1];
            let replacement = macros.get(name).ok_or_else(|| {
                GrammarError::new(format!(
                    "Macro '{{{}}}' referenced in lex matcher '{}' is not defined.",
                    name, pattern
                ))
            })?;
            expanded.push_str(&current[last_end..m.start()]);
            expanded.push_str(replacement);
            last_end = m.end();
            changed = true;
        }
        if !changed {
            return Ok(current);
        }
        expanded.push_str(&current[last_end..]);
        current = expanded;
    }
    Err(GrammarError::new(format!(
        "Macro expansion in lex matcher '{}' did not terminate; the macros are recursive.",
        pattern
    )))
}

/// Parse the handler command language: semicolon separated commands among
/// `return 'KIND'`, `return ['A', 'B']`, `begin('state')`, `push_state('state')`,
/// `pop_state()` and `skip`. An empty source is a skip rule.
pub(crate) fn parse_handler(source: &str) -> Result<TokenAction, GrammarError> {
    let mut action = TokenAction::skip();
    for command in source.split(';') {
        let command = command.trim();
        if command.is_empty() || command == "skip" {
            continue;
        }
        if let Some(argument) = command.strip_prefix("return ") {
            let argument = argument.trim();
            if let Some(list) = argument.strip_prefix('[') {
                let list = list.strip_suffix(']').ok_or_else(|| {
                    GrammarError::new(format!("Malformed token list in lex handler '{}'.", source))
                })?;
                for item in list.split(',') {
                    action.tokens.push(strip_quotes(item.trim()).to_string());
                }
            } else {
                action.tokens.push(strip_quotes(argument).to_string());
            }
        } else if let Some(state) = call_argument(command, &["begin", "this.begin"]) {
            action.ops.push(StateOp::Begin(state));
        } else if let Some(state) = call_argument(command, &["push_state", "pushState", "this.pushState"]) {
            action.ops.push(StateOp::Push(state));
        } else if command == "pop_state()" || command == "popState()" || command == "this.popState()" {
            action.ops.push(StateOp::Pop);
        } else {
            return Err(GrammarError::new(format!(
                "Unsupported lex handler command '{}'.",
                command
            )));
        }
    }
    Ok(action)
}

fn call_argument(command: &str, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(rest) = command.strip_prefix(name) {
            let rest = rest.trim();
            if let Some(argument) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
                return Some(strip_quotes(argument.trim()).to_string());
            }
        }
    }
    None
}

/// Strip one layer of matching quotes, so `return 'NUMBER'` yields `NUMBER` while
/// `return "'+'"` yields the quoted terminal kind `'+'`.
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_nested_macros() {
        let mut macros = BTreeMap::new();
        macros.insert("digit".to_string(), "[0-9]".to_string());
        macros.insert("number".to_string(), "{digit}+(\\.{digit}+)?".to_string());

        assert_eq!(
            expand_macros("{number}", &macros).unwrap(),
            "[0-9]+(\\.[0-9]+)?"
        );
        assert_eq!(expand_macros(r"a{2,3}", &macros).unwrap(), r"a{2,3}");
        assert_eq!(
            expand_macros(r"\p{Alpha}+", &macros).unwrap(),
            r"\p{Alpha}+"
        );
        assert!(expand_macros("{undefined}", &macros).is_err());
    }

    #[test]
    fn rejects_recursive_macros() {
        let mut macros = BTreeMap::new();
        macros.insert("a".to_string(), "{b}".to_string());
        macros.insert("b".to_string(), "{a}".to_string());
        assert!(expand_macros("{a}", &macros).is_err());
    }

    #[test]
    fn parses_handler_commands() {
        assert_eq!(parse_handler("").unwrap(), TokenAction::skip());
        assert_eq!(
            parse_handler("return 'NUMBER';").unwrap(),
            TokenAction::token("NUMBER")
        );
        assert_eq!(
            parse_handler("return \"'+'\";").unwrap(),
            TokenAction::token("'+'")
        );
        assert_eq!(
            parse_handler("return ['A', 'B'];").unwrap(),
            TokenAction {
                ops: Vec::new(),
                tokens: vec!["A".to_string(), "B".to_string()],
            }
        );
        assert_eq!(
            parse_handler("push_state('comment');").unwrap(),
            TokenAction::skip().with_op(StateOp::Push("comment".to_string()))
        );
        assert_eq!(
            parse_handler("pop_state(); return 'CLOSE';").unwrap(),
            TokenAction::token("CLOSE").with_op(StateOp::Pop)
        );
        assert!(parse_handler("launch_missiles()").is_err());
    }

    #[test]
    fn anchors_matchers() {
        let rule = LexRule::compile(None, r"\d+", "return 'NUMBER';", &BTreeMap::new(), false)
            .unwrap();
        assert_eq!(rule.try_match("42abc"), Some(2));
        assert_eq!(rule.try_match("abc42"), None);
    }

    #[test]
    fn supports_case_insensitive_matchers() {
        let rule = LexRule::compile(None, "select", "return 'SELECT';", &BTreeMap::new(), true)
            .unwrap();
        assert_eq!(rule.try_match("SeLeCt *"), Some(6));
    }

    #[test]
    fn rejects_nullable_matchers() {
        assert!(LexRule::compile(None, r"\d*", "return 'N';", &BTreeMap::new(), false).is_err());
    }
}

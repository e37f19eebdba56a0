//! Syntactic symbol classification.
//!
//! A symbol is a non-empty string. A *terminal* is wrapped in matching single or double
//! quotes (`'+'`, `"if"`); any other symbol is a non-terminal when it appears on the
//! left-hand side of a production, or a token otherwise. The symbols `$` (end of
//! input) and `ε` (the empty production body) are reserved.

/// The end of input marker.
pub const EOF: &str = "$";

/// The epsilon symbol marking an empty production body.
pub const EPSILON: &str = "ε";

/// Left-hand side of the augmented production added in LR modes.
pub const AUGMENTED_LHS: &str = "$accept";

/// Whether the symbol is a quoted terminal.
pub fn is_terminal(symbol: &str) -> bool {
    let bytes = symbol.as_bytes();
    bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
}

/// The raw value of a quoted terminal.
pub fn terminal_value(symbol: &str) -> &str {
    if is_terminal(symbol) {
        &symbol[1..symbol.len() - 1]
    } else {
        symbol
    }
}

pub fn is_epsilon(symbol: &str) -> bool {
    symbol == EPSILON
}

pub fn is_eof(symbol: &str) -> bool {
    symbol == EOF
}

/// Split a whitespace separated right-hand side string into symbols, keeping quoted
/// spaces (`' '`) as a single terminal.
pub fn split_rhs(rhs: &str) -> Vec<String> {
    let mut symbols = Vec::new();
    let mut buffer = String::new();
    let mut quote: Option<char> = None;

    for c in rhs.chars() {
        match quote {
            Some(q) => {
                buffer.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c.is_whitespace() {
                    if !buffer.is_empty() {
                        symbols.push(std::mem::take(&mut buffer));
                    }
                } else {
                    if (c == '\'' || c == '"') && buffer.is_empty() {
                        quote = Some(c);
                    }
                    buffer.push(c);
                }
            }
        }
    }
    if !buffer.is_empty() {
        symbols.push(buffer);
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_quoted_symbols_as_terminals() {
        assert!(is_terminal("'+'"));
        assert!(is_terminal("\"if\""));
        assert!(is_terminal("' '"));
        assert!(!is_terminal("NUMBER"));
        assert!(!is_terminal("E"));
        assert!(!is_terminal("'mismatched\""));
        assert_eq!(terminal_value("'+'"), "+");
        assert_eq!(terminal_value("\"if\""), "if");
        assert_eq!(terminal_value("NUMBER"), "NUMBER");
    }

    #[test]
    fn splits_rhs_with_quoted_spaces() {
        assert_eq!(split_rhs("E '+' E"), vec!["E", "'+'", "E"]);
        assert_eq!(split_rhs("A ' ' B"), vec!["A", "' '", "B"]);
        assert_eq!(split_rhs("  NUMBER  "), vec!["NUMBER"]);
        assert_eq!(split_rhs(""), Vec::<String>::new());
    }
}

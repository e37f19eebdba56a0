use crate::{ParseTree, Token, ValueImpl};
use ptree::TreeItem;
use std::borrow::Cow;

impl ValueImpl for ParseTree {
    fn null() -> Self {
        ParseTree::Null
    }

    fn leaf(token: &Token) -> Self {
        ParseTree::Leaf {
            kind: token.kind.clone(),
            value: token.value.clone(),
            start: token.loc.start_offset,
            end: token.loc.end_offset,
        }
    }

    fn node(symbol: &str, children: Vec<Self>) -> Self {
        ParseTree::Node {
            symbol: symbol.to_string(),
            children,
        }
    }
}

impl ParseTree {
    /// Whether the tree or any nested child carries the given symbol or token kind.
    pub fn contains(&self, symbol: &str) -> bool {
        match self {
            ParseTree::Null => false,
            ParseTree::Leaf { kind, .. } => kind == symbol,
            ParseTree::Node {
                symbol: node_symbol,
                children,
            } => node_symbol == symbol || children.iter().any(|child| child.contains(symbol)),
        }
    }

    /// Search through all nested children and return the first matching subtree.
    pub fn find_tree<TF: Fn(&ParseTree) -> bool>(&self, p: &TF) -> Option<&ParseTree> {
        if p(self) {
            Some(self)
        } else {
            match self {
                ParseTree::Node { children, .. } => {
                    children.iter().find_map(|child| child.find_tree(p))
                }
                _ => None,
            }
        }
    }

    /// Collect the leaf values in source order.
    pub fn leaf_values(&self) -> Vec<&str> {
        let mut values = Vec::new();
        self.collect_leaves(&mut values);
        values
    }

    fn collect_leaves<'this>(&'this self, values: &mut Vec<&'this str>) {
        match self {
            ParseTree::Null => {}
            ParseTree::Leaf { value, .. } => values.push(value),
            ParseTree::Node { children, .. } => {
                for child in children {
                    child.collect_leaves(values);
                }
            }
        }
    }

    pub fn print(&self) -> Result<(), std::io::Error> {
        ptree::print_tree(self)
    }
}

impl TreeItem for ParseTree {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        match self {
            ParseTree::Null => write!(f, "ε"),
            ParseTree::Leaf {
                kind,
                value,
                start,
                end,
            } => write!(f, "{} {:?} # {}-{}", kind, value, start, end),
            ParseTree::Node { symbol, .. } => write!(f, "{}", symbol),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        match self {
            ParseTree::Node { children, .. } => Cow::from(children),
            _ => Cow::from(Vec::new()),
        }
    }
}

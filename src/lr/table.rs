use super::{
    CanonicalCollection, ParsingTable, ResolvedConflict, TableEntry, TableOptions,
};
use crate::grammar::symbol;
use crate::sets::SetsGenerator;
use crate::{ConflictKind, Grammar, GrammarMode, OperatorAssoc, TableConflictError};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Write};

impl TableEntry {
    pub fn is_conflict(&self) -> bool {
        matches!(self, TableEntry::Conflict(_))
    }
}

impl Display for TableEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TableEntry::Shift(state) => write!(f, "s{}", state),
            TableEntry::Reduce(production) => write!(f, "r{}", production),
            TableEntry::Goto(state) => write!(f, "{}", state),
            TableEntry::Accept => write!(f, "acc"),
            TableEntry::Conflict(members) => {
                let rendered: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", rendered.join("/"))
            }
        }
    }
}

enum Resolution {
    Keep(TableEntry, String),
    Remove(String),
    Unresolved(ConflictKind),
}

impl ParsingTable {
    /// Lay shift/reduce/goto/accept entries for every state, then resolve the
    /// conflict markers: declared precedence and associativity first, then (when
    /// enabled) shift over reduce and the smaller production number as defaults.
    pub fn new(
        grammar: &Grammar,
        collection: &CanonicalCollection,
        sets: &SetsGenerator,
        options: TableOptions,
    ) -> Result<Self, TableConflictError> {
        let mut rows: Vec<BTreeMap<String, TableEntry>> = vec![BTreeMap::new(); collection.size()];

        for state in collection.states() {
            let row = &mut rows[state.number()];

            for (on_symbol, target) in state.transitions() {
                let entry = if grammar.is_non_terminal(on_symbol) {
                    TableEntry::Goto(*target)
                } else {
                    TableEntry::Shift(*target)
                };
                lay(row, on_symbol, entry);
            }

            for item in state.items() {
                if item.is_accept(grammar) {
                    lay(row, symbol::EOF, TableEntry::Accept);
                } else if item.is_reduce(grammar) {
                    let production = grammar.production(item.production());
                    let reduce_set: Vec<String> = match grammar.mode() {
                        GrammarMode::LR0 => grammar.terminal_alphabet(),
                        GrammarMode::SLR1 => {
                            sets.follow_of(production.lhs()).iter().cloned().collect()
                        }
                        GrammarMode::LALR1 | GrammarMode::CLR1 => item
                            .lookaheads()
                            .expect("items carry lookaheads in LALR(1)/CLR(1) modes")
                            .iter()
                            .cloned()
                            .collect(),
                        GrammarMode::LL1 => {
                            unreachable!("the canonical collection rejects non-LR modes")
                        }
                    };
                    for terminal in reduce_set {
                        lay(row, &terminal, TableEntry::Reduce(production.number()));
                    }
                }
            }
        }

        let mut resolved_conflicts = Vec::new();
        for (state_number, row) in rows.iter_mut().enumerate() {
            let conflicted: Vec<String> = row
                .iter()
                .filter(|(_, entry)| entry.is_conflict())
                .map(|(on_symbol, _)| on_symbol.clone())
                .collect();

            for on_symbol in conflicted {
                let members = match row.get(&on_symbol) {
                    Some(TableEntry::Conflict(members)) => members.clone(),
                    _ => continue,
                };
                let kind = conflict_kind(&members);
                match resolve(grammar, &on_symbol, &members, options) {
                    Resolution::Keep(entry, resolution) => {
                        row.insert(on_symbol.clone(), entry);
                        resolved_conflicts.push(ResolvedConflict {
                            state: state_number,
                            symbol: on_symbol,
                            kind,
                            resolution,
                        });
                    }
                    Resolution::Remove(resolution) => {
                        row.remove(&on_symbol);
                        resolved_conflicts.push(ResolvedConflict {
                            state: state_number,
                            symbol: on_symbol,
                            kind,
                            resolution,
                        });
                    }
                    Resolution::Unresolved(kind) => {
                        return Err(TableConflictError::new(state_number, on_symbol, kind))
                    }
                }
            }
        }

        Ok(Self {
            rows,
            resolved_conflicts,
            mode: grammar.mode(),
        })
    }

    pub fn entry(&self, state: usize, on_symbol: &str) -> Option<&TableEntry> {
        self.rows.get(state).and_then(|row| row.get(on_symbol))
    }

    pub fn rows(&self) -> &[BTreeMap<String, TableEntry>] {
        &self.rows
    }

    pub fn mode(&self) -> GrammarMode {
        self.mode
    }

    /// The conflicts the builder resolved, as diagnostics.
    pub fn resolved_conflicts(&self) -> &[ResolvedConflict] {
        &self.resolved_conflicts
    }

    /// Render the action/goto grid: terminal and token columns first, then the
    /// non-terminal goto columns.
    pub fn render(&self, grammar: &Grammar) -> String {
        let mut columns = grammar.terminal_alphabet();
        columns.extend(grammar.non_terminals().iter().cloned());

        let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
        let mut cells: Vec<Vec<String>> = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let rendered: Vec<String> = columns
                .iter()
                .map(|column| row.get(column).map_or(String::new(), |e| e.to_string()))
                .collect();
            for (index, cell) in rendered.iter().enumerate() {
                widths[index] = widths[index].max(cell.len());
            }
            cells.push(rendered);
        }

        let state_width = self.rows.len().to_string().len().max("state".len());
        let mut out = String::new();
        write!(out, "{:>state_width$}", "state", state_width = state_width).unwrap();
        for (column, width) in columns.iter().zip(&widths) {
            write!(out, "  {:>width$}", column, width = *width).unwrap();
        }
        writeln!(out).unwrap();
        for (number, rendered) in cells.iter().enumerate() {
            write!(out, "{:>state_width$}", number, state_width = state_width).unwrap();
            for (cell, width) in rendered.iter().zip(&widths) {
                write!(out, "  {:>width$}", cell, width = *width).unwrap();
            }
            writeln!(out).unwrap();
        }
        out
    }
}

fn lay(row: &mut BTreeMap<String, TableEntry>, on_symbol: &str, entry: TableEntry) {
    match row.get_mut(on_symbol) {
        None => {
            row.insert(on_symbol.to_string(), entry);
        }
        Some(existing) if *existing == entry => {}
        Some(TableEntry::Conflict(members)) => {
            if !members.contains(&entry) {
                members.push(entry);
            }
        }
        Some(existing) => {
            let previous = existing.clone();
            *existing = TableEntry::Conflict(vec![previous, entry]);
        }
    }
}

fn conflict_kind(members: &[TableEntry]) -> ConflictKind {
    if members.iter().any(|m| matches!(m, TableEntry::Shift(_))) {
        ConflictKind::ShiftReduce
    } else {
        ConflictKind::ReduceReduce
    }
}

fn resolve(
    grammar: &Grammar,
    on_symbol: &str,
    members: &[TableEntry],
    options: TableOptions,
) -> Resolution {
    let shift = members.iter().find_map(|m| match m {
        TableEntry::Shift(target) => Some(*target),
        _ => None,
    });
    let accept = members.iter().any(|m| matches!(m, TableEntry::Accept));
    let mut reduces: Vec<usize> = members
        .iter()
        .filter_map(|m| match m {
            TableEntry::Reduce(production) => Some(*production),
            _ => None,
        })
        .collect();
    reduces.sort_unstable();

    match (shift, reduces.first()) {
        (Some(shift_target), Some(&reduce_production)) => {
            if let Some(operator) = grammar.operator(on_symbol) {
                let production_precedence = grammar.production(reduce_production).precedence();
                if production_precedence > operator.precedence {
                    Resolution::Keep(
                        TableEntry::Reduce(reduce_production),
                        "reduce wins by production precedence".to_string(),
                    )
                } else if operator.precedence > production_precedence {
                    Resolution::Keep(
                        TableEntry::Shift(shift_target),
                        "shift wins by token precedence".to_string(),
                    )
                } else {
                    match operator.assoc {
                        OperatorAssoc::Left => Resolution::Keep(
                            TableEntry::Reduce(reduce_production),
                            "reduce wins by left associativity".to_string(),
                        ),
                        OperatorAssoc::Right => Resolution::Keep(
                            TableEntry::Shift(shift_target),
                            "shift wins by right associativity".to_string(),
                        ),
                        OperatorAssoc::NonAssoc => Resolution::Remove(
                            "entry removed for a nonassoc operator; taking it raises a parse error"
                                .to_string(),
                        ),
                    }
                }
            } else if options.resolve_conflicts {
                Resolution::Keep(
                    TableEntry::Shift(shift_target),
                    "shift wins by default".to_string(),
                )
            } else {
                Resolution::Unresolved(ConflictKind::ShiftReduce)
            }
        }
        (None, Some(&reduce_production)) if !accept => {
            if options.resolve_conflicts {
                Resolution::Keep(
                    TableEntry::Reduce(reduce_production),
                    "the smaller production number wins".to_string(),
                )
            } else {
                Resolution::Unresolved(ConflictKind::ReduceReduce)
            }
        }
        _ => {
            if options.resolve_conflicts && accept {
                Resolution::Keep(TableEntry::Accept, "accept wins".to_string())
            } else {
                Resolution::Unresolved(conflict_kind(members))
            }
        }
    }
}

use std::collections::HashMap;
use std::fmt;

use crate::cond::Condition;
use crate::stmt::Statement;

/// A statement guarded by zero or more conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalStatement {
    pub statement: Statement,
    pub conditions: Vec<Condition>,
}

impl fmt::Display for ConditionalStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statement)?;
        for condition in &self.conditions {
            write!(f, " {}", condition)?;
        }
        Ok(())
    }
}

/// A parsed yack dialog: a sequence of conditional statements plus a
/// label index. Each label points to a statement index; a label may be
/// bound one past the last statement.
///
/// A dialog is immutable once parsed and can be shared by any number of
/// runners.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dialog {
    pub statements: Vec<ConditionalStatement>,
    pub labels: HashMap<String, usize>,
}

impl fmt::Display for Dialog {
    /// Formats the dialog in yack syntax. Label blocks are preceded by a
    /// blank line; labels bound to the same index are written in sorted
    /// order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lookup: HashMap<usize, Vec<&str>> = HashMap::new();
        for (label, &index) in &self.labels {
            lookup.entry(index).or_default().push(label.as_str());
        }
        for labels in lookup.values_mut() {
            labels.sort_unstable();
        }
        for (i, statement) in self.statements.iter().enumerate() {
            write_labels(f, &lookup, i)?;
            writeln!(f, "{}", statement)?;
        }
        write_labels(f, &lookup, self.statements.len())
    }
}

fn write_labels(
    f: &mut fmt::Formatter<'_>,
    lookup: &HashMap<usize, Vec<&str>>,
    index: usize,
) -> fmt::Result {
    if let Some(labels) = lookup.get(&index) {
        for (i, label) in labels.iter().enumerate() {
            if i == 0 {
                writeln!(f)?;
            }
            writeln!(f, ":{}", label)?;
        }
    }
    Ok(())
}

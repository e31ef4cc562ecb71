//! The statements of the yack language.

use std::fmt;

/// One statement of a dialog script, rendered back to yack syntax by its
/// `Display` implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Stop all actors from talking.
    ShutUp,
    /// An actor speaks a line, optionally jumping to a label afterwards.
    Say { actor: String, text: String, goto_label: Option<String> },
    /// Wait for the given number of seconds.
    Pause { seconds: f64 },
    /// Run a scripting-language snippet.
    Execute { code: String },
    /// Jump to a label.
    Goto { label: String },
    /// Offer a numbered dialog option leading to a label.
    Choice { index: i64, text: String, goto_label: String },
    /// Wait until an actor (or anyone) finished talking.
    WaitFor { actor: Option<String> },
    /// Wait while a scripting condition holds.
    WaitWhile { code: String },
    /// Toggle parrot mode: speaking a chosen option before branching.
    Parrot { enabled: bool },
    /// Switch the current actor.
    Dialog { actor: String },
    /// Register an override label.
    Override { label: String },
    /// Allow or disallow object interaction during the dialog.
    AllowObjects { allow: bool },
    /// Limit the number of options offered at once.
    Limit { n: usize },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::ShutUp => write!(f, "shutup"),
            Statement::Say { actor, text, goto_label } => {
                write!(f, "{}: {}", actor, quote(text))?;
                if let Some(label) = goto_label {
                    write!(f, " -> {}", label)?;
                }
                Ok(())
            }
            Statement::Pause { seconds } => write!(f, "pause {}", seconds),
            Statement::Execute { code } => write!(f, "!{}", code),
            Statement::Goto { label } => write!(f, "-> {}", label),
            Statement::Choice { index, text, goto_label } => {
                write!(f, "{} {} -> {}", index, quote(text), goto_label)
            }
            Statement::WaitFor { actor: None } => write!(f, "waitfor"),
            Statement::WaitFor { actor: Some(actor) } => write!(f, "waitfor {}", actor),
            Statement::WaitWhile { code } => write!(f, "waitwhile {}", code),
            Statement::Parrot { enabled } => write!(f, "parrot {}", bool_lit(*enabled)),
            Statement::Dialog { actor } => write!(f, "dialog {}", actor),
            Statement::Override { label } => write!(f, "override {}", label),
            Statement::AllowObjects { allow } => write!(f, "allowobjects {}", bool_lit(*allow)),
            Statement::Limit { n } => write!(f, "limit {}", n),
        }
    }
}

fn bool_lit(b: bool) -> &'static str {
    if b {
        "YES"
    } else {
        "NO"
    }
}

/// Quotes a string the way yack sources write it, escaping backslashes,
/// double quotes and newlines.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let cases: &[(Statement, &str)] = &[
            (Statement::ShutUp, "shutup"),
            (
                Statement::Say {
                    actor: "testactor".to_owned(),
                    text: "@12345".to_owned(),
                    goto_label: None,
                },
                "testactor: \"@12345\"",
            ),
            (
                Statement::Say {
                    actor: "testactor2".to_owned(),
                    text: "hello, world".to_owned(),
                    goto_label: Some("done".to_owned()),
                },
                "testactor2: \"hello, world\" -> done",
            ),
            (Statement::Pause { seconds: 2.5 }, "pause 2.5"),
            (Statement::Pause { seconds: 4.0 }, "pause 4"),
            (Statement::Execute { code: "testFunc()".to_owned() }, "!testFunc()"),
            (Statement::Goto { label: "main".to_owned() }, "-> main"),
            (
                Statement::Choice {
                    index: 1,
                    text: "hello, world".to_owned(),
                    goto_label: "greet".to_owned(),
                },
                "1 \"hello, world\" -> greet",
            ),
            (Statement::WaitFor { actor: None }, "waitfor"),
            (Statement::WaitFor { actor: Some("testactor".to_owned()) }, "waitfor testactor"),
            (
                Statement::WaitWhile { code: "g.test_var == NO".to_owned() },
                "waitwhile g.test_var == NO",
            ),
            (Statement::Parrot { enabled: false }, "parrot NO"),
            (Statement::Parrot { enabled: true }, "parrot YES"),
            (Statement::Dialog { actor: "testactor2".to_owned() }, "dialog testactor2"),
            (Statement::Override { label: "done".to_owned() }, "override done"),
            (Statement::AllowObjects { allow: false }, "allowobjects NO"),
            (Statement::AllowObjects { allow: true }, "allowobjects YES"),
            (Statement::Limit { n: 4 }, "limit 4"),
        ];
        for (statement, want) in cases {
            assert_eq!(statement.to_string(), *want);
        }
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\\b"), r#""a\\b""#);
        assert_eq!(quote("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(quote("line\nbreak"), r#""line\nbreak""#);
    }
}

//! Reading and running yack dialogs.
//!
//! Yack is the line-oriented language the games use for branching
//! conversations: a sequence of statements, each optionally guarded by
//! conditions in square brackets, with labels as goto targets. Parsing
//! yields an immutable [`Dialog`]; a [`Runner`] steps through it,
//! collecting numbered choices and delegating all code evaluation to a
//! pluggable [`Scripting`] implementation and all speech to a [`Talk`]
//! collaborator.
//!
//! The grammar, in EBNF:
//!
//! ```text
//! SourceFile = { Line } .
//!
//! Line = [ (LabelTag | ConditionalStatement) ] [ comment ] newline .
//!
//! LabelTag = ":" label .
//!
//! ConditionalStatement = Statement { Condition } .
//!
//! Condition = "[" ("once" | "showonce" | "onceever" | "showonceever" |
//!                  "temponce" | actor_name | Code) "]" .
//!
//! Statement = SayStmt | GotoStmt | ExecuteStmt | ChoiceStmt | ShutUpStmt |
//!             PauseStmt | WaitForStmt | WaitWhileStmt | ParrotStmt |
//!             DialogStmt | OverrideStmt | AllowObjectsStmt | LimitStmt .
//!
//! SayStmt          = actor_name ":" string_lit [ GotoStmt ] .
//! GotoStmt         = "->" label .
//! ExecuteStmt      = "!" Code .
//! ChoiceStmt       = int_lit (string_lit | ("$" Code)) GotoStmt .
//! ShutUpStmt       = "shutup" .
//! PauseStmt        = "pause" float_lit .
//! WaitForStmt      = "waitfor" [ actor_name ] .
//! WaitWhileStmt    = "waitwhile" Code .
//! ParrotStmt       = "parrot" bool_lit .
//! DialogStmt       = "dialog" actor_name .
//! OverrideStmt     = "override" label .
//! AllowObjectsStmt = "allowobjects" bool_lit .
//! LimitStmt        = "limit" int_lit .
//!
//! Code = /* Scripting language expression, e.g. Squirrel */ .
//!
//! comment        = ";" { unicode_char } .
//! actor_name     = unicode_letter { unicode_letter | unicode_digit } .
//! label          = letter_uscore { letter_uscore | unicode_digit } .
//! letter_uscore  = unicode_letter | "_" .
//! bool_lit       = "yes" | "YES" | "no" | "NO" .
//! int_lit        = decimal_digits .
//! float_lit      = decimal_digits | decimal_digits "." [ decimal_digits ] |
//!                  "." decimal_digits .
//! string_lit     = `"` { unicode_char | escaped_char } `"` .
//! escaped_char   = `\` ( "n" | `\` | `"` ) .
//! ```

pub mod cond;
mod context;
pub mod dialog;
mod errors;
mod parser;
mod runner;
mod scanner;
pub mod scripting;
pub mod stmt;

pub use dialog::{ConditionalStatement, Dialog};
pub use errors::{ErrorList, ParseError};
pub use parser::{load, parse, LoadError};
pub use runner::{ChoiceOption, Choices, Outcome, Runner, Talk};
pub use scanner::Pos;
pub use scripting::{NoopScripting, Scripting};

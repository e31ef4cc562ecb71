use std::collections::HashMap;
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::cond::Condition;
use crate::dialog::{ConditionalStatement, Dialog};
use crate::errors::{ErrorList, ParseError};
use crate::scanner::{Pos, Scanner, Token};
use crate::stmt::Statement;

/// Reads and parses a dialog from a yack file.
pub fn load(path: impl AsRef<Path>) -> Result<Dialog, LoadError> {
    let path = path.as_ref();
    let src = fs::read_to_string(path)?;
    let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    parse(&filename, &src).map_err(LoadError::Parse)
}

/// Parses a dialog from yack source. The filename is only used as a
/// prefix for error messages. All syntax errors encountered are returned
/// together; statements that did parse are dropped with them.
pub fn parse(filename: &str, src: &str) -> Result<Dialog, ErrorList> {
    Parser::new(filename, src).parse()
}

#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Parse(ErrorList),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "could not read yack file: {}", e),
            LoadError::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Io(e)
    }
}

struct Parser {
    filename: String,
    scanner: Scanner,
    tok: Token,
    pos: Pos,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(filename: &str, src: &str) -> Parser {
        Parser {
            filename: filename.to_owned(),
            scanner: Scanner::new(src),
            tok: Token::Eof,
            pos: Pos { line: 1, column: 1 },
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Dialog, ErrorList> {
        self.next();
        let mut statements = Vec::new();
        let mut labels = HashMap::new();
        while self.tok != Token::Eof {
            if self.tok == Token::Punct(':') {
                self.next();
                let label = self.parse_identifier();
                labels.insert(label, statements.len());
                self.expect_comment_or_newline();
                continue;
            }
            let statement = self.parse_statement();
            let conditions = self.parse_conditions();
            self.expect_comment_or_newline();
            if let Some(statement) = statement {
                statements.push(ConditionalStatement { statement, conditions });
            }
        }
        if self.errors.is_empty() {
            Ok(Dialog { statements, labels })
        } else {
            Err(ErrorList(self.errors))
        }
    }

    fn next(&mut self) {
        let (pos, tok) = self.scanner.scan();
        for (err_pos, message) in self.scanner.take_errors() {
            self.error(err_pos, message);
        }
        self.pos = pos;
        self.tok = tok;
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.tok.clone() {
            Token::Punct('!') => {
                let code = self.parse_code_raw();
                Some(Statement::Execute { code })
            }
            Token::Punct('-') => {
                let label = self.parse_goto();
                Some(Statement::Goto { label })
            }
            Token::Int(_) => {
                let index = self.parse_int();
                let text = if self.tok == Token::Punct('$') {
                    self.parse_code(Some('$'))
                } else {
                    self.parse_string()
                };
                let goto_label = self.parse_goto();
                Some(Statement::Choice { index, text, goto_label })
            }
            Token::Ident(ident) => {
                if self.scanner.peek_char() == Some(':') {
                    self.next(); // the colon
                    self.next(); // the text
                    let text = self.parse_string();
                    let goto_label = if self.tok == Token::Punct('-') {
                        Some(self.parse_goto())
                    } else {
                        None
                    };
                    return Some(Statement::Say { actor: ident, text, goto_label });
                }
                match ident.as_str() {
                    "shutup" => {
                        self.next();
                        Some(Statement::ShutUp)
                    }
                    "pause" => {
                        self.next();
                        let seconds = self.parse_float();
                        Some(Statement::Pause { seconds })
                    }
                    "waitfor" => {
                        self.next();
                        let actor = match self.tok {
                            Token::Ident(_) => Some(self.parse_identifier()),
                            _ => None,
                        };
                        Some(Statement::WaitFor { actor })
                    }
                    "waitwhile" => {
                        let code = self.parse_code_raw();
                        Some(Statement::WaitWhile { code })
                    }
                    "parrot" => {
                        self.next();
                        let enabled = self.parse_bool();
                        Some(Statement::Parrot { enabled })
                    }
                    "dialog" => {
                        self.next();
                        let actor = self.parse_identifier();
                        Some(Statement::Dialog { actor })
                    }
                    "override" => {
                        self.next();
                        let label = self.parse_identifier();
                        Some(Statement::Override { label })
                    }
                    "allowobjects" => {
                        self.next();
                        let allow = self.parse_bool();
                        Some(Statement::AllowObjects { allow })
                    }
                    "limit" => {
                        self.next();
                        let n = self.parse_int();
                        Some(Statement::Limit { n: n.max(0) as usize })
                    }
                    _ => {
                        self.next();
                        self.error(self.pos, format!("invalid command: {}", ident));
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn parse_conditions(&mut self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        while self.tok == Token::Punct('[') {
            let first = self.scanner.next_char();
            let code = self.parse_code(first);
            self.expect(&Token::Punct(']'));
            conditions.push(classify_condition(code));
        }
        conditions
    }

    fn parse_goto(&mut self) -> String {
        self.expect(&Token::Punct('-'));
        self.expect(&Token::Punct('>'));
        self.parse_identifier()
    }

    fn parse_identifier(&mut self) -> String {
        let name = self.tok.text();
        if !matches!(self.tok, Token::Ident(_)) {
            self.error_expected("identifier");
        }
        self.next();
        name
    }

    fn parse_int(&mut self) -> i64 {
        let lit = self.tok.text();
        if !matches!(self.tok, Token::Int(_)) {
            self.error_expected("integer");
        }
        self.next();
        match lit.parse() {
            Ok(i) => i,
            Err(_) => {
                self.error(self.pos, format!("invalid integer literal: {}", lit));
                0
            }
        }
    }

    fn parse_float(&mut self) -> f64 {
        let lit = self.tok.text();
        if matches!(self.tok, Token::Float(_) | Token::Int(_)) {
            self.next();
        } else {
            self.error_expected("number");
            self.next();
        }
        match lit.parse() {
            Ok(f) => f,
            Err(_) => {
                self.error(self.pos, format!("invalid number literal: {}", lit));
                0.0
            }
        }
    }

    fn parse_string(&mut self) -> String {
        let lit = self.tok.text();
        if !matches!(self.tok, Token::Str(_)) {
            self.error_expected("string");
        }
        self.next();
        match unquote(&lit) {
            Ok(s) => s,
            Err(()) => {
                self.error(self.pos, format!("invalid string literal: {}", lit));
                lit
            }
        }
    }

    fn parse_bool(&mut self) -> bool {
        let lit = self.parse_identifier();
        match lit.as_str() {
            "YES" | "yes" => true,
            "NO" | "no" => false,
            _ => {
                self.error(self.pos, format!("invalid boolean literal: {}", lit));
                false
            }
        }
    }

    /// Abandons the current token and captures code text from the next
    /// raw character on. Used for `!` statements and `waitwhile`.
    fn parse_code_raw(&mut self) -> String {
        let first = self.scanner.next_char();
        self.parse_code(first)
    }

    /// Captures raw code text until a terminator: newline, `->`, `;`
    /// outside a string, or a square bracket that opens a condition or
    /// closes the enclosing one. Square bracket nesting inside the code
    /// is tracked; string literals hide all terminators.
    fn parse_code(&mut self, first: Option<char>) -> String {
        let mut code = String::new();
        let mut in_string = false;
        let mut in_escape = false;
        let mut open_brackets = 0;
        let mut prev: Option<char> = None;
        let mut cur = first;
        while let Some(c) = cur {
            if c == '\n' {
                break;
            }
            if !in_string {
                if c == ';' {
                    break; // comment starts here
                }
                if c == '-' && self.scanner.peek_char() == Some('>') {
                    break; // goto starts here
                }
                if c == '['
                    && prev.map_or(false, char::is_whitespace)
                    && !self.scanner.peek_char().map_or(false, char::is_whitespace)
                {
                    break; // conditions start here
                }
                if c == ']' && open_brackets == 0 {
                    break; // the enclosing condition ends here
                }
                if c == '[' {
                    open_brackets += 1;
                }
                if c == ']' {
                    open_brackets -= 1;
                }
            }
            match c {
                '\\' => {
                    if in_string && !in_escape {
                        in_escape = true;
                    }
                }
                '"' => {
                    if !in_escape {
                        in_string = !in_string;
                    }
                    in_escape = false;
                }
                _ => in_escape = false,
            }
            code.push(c);
            prev = Some(c);
            cur = self.scanner.next_char();
        }
        self.pos = self.scanner.pos();
        self.tok = match cur {
            None => Token::Eof,
            Some('\n') => Token::Newline,
            Some(c) => Token::Punct(c),
        };
        code.trim().to_owned()
    }

    fn skip_comment(&mut self) {
        let mut cur = self.scanner.next_char();
        while let Some(c) = cur {
            if c == '\n' {
                break;
            }
            cur = self.scanner.next_char();
        }
        self.pos = self.scanner.pos();
        self.tok = match cur {
            None => Token::Eof,
            Some(_) => Token::Newline,
        };
    }

    fn expect_comment_or_newline(&mut self) {
        match self.tok {
            Token::Punct(';') | Token::Newline | Token::Eof => (),
            _ => {
                self.error_expected("newline");
                self.next();
                return;
            }
        }
        if self.tok == Token::Punct(';') {
            self.skip_comment();
        }
        if self.tok == Token::Newline {
            self.next();
        }
    }

    fn expect(&mut self, tok: &Token) {
        if self.tok != *tok {
            self.error_expected(&tok.describe());
        }
        self.next(); // make progress in any case
    }

    fn error_expected(&mut self, what: &str) {
        let found = self.tok.describe();
        self.error(self.pos, format!("expected {}, found {}", what, found));
    }

    fn error(&mut self, pos: Pos, message: impl Into<String>) {
        self.errors.push(ParseError {
            filename: self.filename.clone(),
            pos,
            message: message.into(),
        });
    }
}

fn classify_condition(code: String) -> Condition {
    match code.as_str() {
        "once" => return Condition::Once,
        "showonce" => return Condition::ShowOnce,
        "onceever" => return Condition::OnceEver,
        "showonceever" => return Condition::ShowOnceEver,
        "temponce" => return Condition::TempOnce,
        _ => (),
    }
    if is_actor_name(&code) {
        Condition::Actor(code)
    } else {
        Condition::Code(code)
    }
}

fn is_actor_name(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => chars.all(|c| c.is_alphanumeric()),
        _ => false,
    }
}

/// Undoes the quoting of a yack string literal. Only the escapes the
/// language defines are accepted: `\n`, `\"` and `\\`.
fn unquote(lit: &str) -> Result<String, ()> {
    let inner = lit.strip_prefix('"').ok_or(())?.strip_suffix('"').ok_or(())?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            if c == '"' {
                return Err(()); // unescaped quote inside the literal
            }
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            _ => return Err(()),
        }
    }
    Ok(out)
}

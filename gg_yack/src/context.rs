use std::collections::{BTreeMap, HashSet};
use std::thread;
use std::time::Duration;

use crate::cond::Condition;
use crate::dialog::Dialog;
use crate::runner::{ChoiceOption, Choices, Outcome, Talk, LABEL_EXIT};
use crate::scripting::{Scripting, Value};
use crate::stmt::Statement;

const DEFAULT_LIMIT: usize = 6;

/// Per-run interpreter state. The dialog itself stays shared and
/// untouched; everything mutable lives here.
pub(crate) struct Context<'a, S, T> {
    dialog: &'a Dialog,
    scripting: S,
    talk: T,

    pc: usize,

    current_actor: String,
    parrot: bool,
    objects_allowed: bool,
    limit: usize,

    /// Pending choices by their choice index; the first statement
    /// registered for an index wins.
    choices: BTreeMap<i64, usize>,

    executed: HashSet<usize>,
    shown: HashSet<usize>,
}

impl<'a, S: Scripting, T: Talk> Context<'a, S, T> {
    pub(crate) fn new(dialog: &'a Dialog, scripting: S, talk: T, start_actor: &str) -> Self {
        Context {
            dialog,
            scripting,
            talk,
            pc: 0,
            current_actor: start_actor.to_owned(),
            parrot: true,
            objects_allowed: false,
            limit: DEFAULT_LIMIT,
            choices: BTreeMap::new(),
            executed: HashSet::new(),
            shown: HashSet::new(),
        }
    }

    pub(crate) fn goto_label(&mut self, label: &str) {
        if label == LABEL_EXIT {
            self.pc = self.dialog.statements.len();
            return;
        }
        // Unknown labels fall back to the top of the dialog.
        self.pc = self.dialog.labels.get(label).copied().unwrap_or(0);
    }

    pub(crate) fn run(&mut self) -> Outcome {
        while self.pc < self.dialog.statements.len() {
            let index = self.pc;
            if self.conditions_fulfilled(index) {
                if matches!(self.dialog.statements[index].statement, Statement::Choice { .. }) {
                    self.add_choice(index);
                } else {
                    self.execute(index);
                }
            }
            if self.pc == index {
                self.pc += 1;
            }
            if self.choices_ready() {
                return Outcome::Choices(Choices {
                    actor: self.current_actor.clone(),
                    options: self.choice_options(),
                });
            }
        }
        Outcome::End
    }

    pub(crate) fn choose(&mut self, option: &ChoiceOption) -> Outcome {
        self.choices.clear();
        self.execute(option.statement_index);
        self.run()
    }

    fn conditions_fulfilled(&mut self, index: usize) -> bool {
        let dialog = self.dialog;
        dialog.statements[index].conditions.iter().all(|c| self.is_fulfilled(index, c))
    }

    fn is_fulfilled(&mut self, index: usize, condition: &Condition) -> bool {
        match condition {
            Condition::Once | Condition::OnceEver | Condition::TempOnce => {
                !self.executed.contains(&index)
            }
            Condition::ShowOnce | Condition::ShowOnceEver => !self.shown.contains(&index),
            Condition::Actor(actor) => self.current_actor == *actor,
            Condition::Code(code) => self.is_code_true(code),
        }
    }

    fn is_code_true(&mut self, code: &str) -> bool {
        matches!(self.scripting.eval(code), Ok(Value::Bool(true)))
    }

    fn execute(&mut self, index: usize) {
        let dialog = self.dialog;
        let statement = match dialog.statements.get(index) {
            Some(cs) => &cs.statement,
            None => return,
        };
        match statement {
            Statement::ShutUp => self.shut_up(),
            Statement::Say { actor, text, goto_label } => {
                self.talk.say(actor, text);
                if let Some(label) = goto_label {
                    self.goto_label(label);
                }
            }
            Statement::Pause { seconds } => pause(*seconds),
            Statement::Execute { code } => {
                let _ = self.scripting.eval(code);
            }
            Statement::Goto { label } => self.goto_label(label),
            Statement::Choice { text, goto_label, .. } => {
                if self.parrot {
                    let actor = self.current_actor.clone();
                    self.talk.say(&actor, text);
                }
                self.goto_label(goto_label);
            }
            Statement::WaitFor { actor } => self.wait_for(actor.as_deref()),
            Statement::WaitWhile { code } => self.wait_while(code),
            Statement::Parrot { enabled } => self.parrot = *enabled,
            Statement::Dialog { actor } => self.current_actor = actor.clone(),
            Statement::Override { label } => self.override_label(label),
            Statement::AllowObjects { allow } => self.objects_allowed = *allow,
            Statement::Limit { n } => self.limit = *n,
        }
        self.executed.insert(index);
    }

    fn add_choice(&mut self, index: usize) {
        let choice_index = match self.dialog.statements[index].statement {
            Statement::Choice { index: choice_index, .. } => choice_index,
            _ => return,
        };
        if self.choices.contains_key(&choice_index) {
            return;
        }
        self.choices.insert(choice_index, index);
        self.shown.insert(index);
    }

    fn choices_ready(&self) -> bool {
        if self.choices.is_empty() {
            return false;
        }
        match self.dialog.statements.get(self.pc) {
            Some(cs) => !matches!(cs.statement, Statement::Choice { .. }),
            None => false,
        }
    }

    fn choice_options(&mut self) -> Vec<ChoiceOption> {
        let pending: Vec<usize> = self.choices.values().copied().collect();
        pending
            .into_iter()
            .map(|statement_index| {
                let text = match &self.dialog.statements[statement_index].statement {
                    Statement::Choice { text, .. } => text.clone(),
                    _ => String::new(),
                };
                ChoiceOption { text: self.eval_text(&text), statement_index }
            })
            .collect()
    }

    fn eval_text(&mut self, text: &str) -> String {
        let code = match text.strip_prefix('$') {
            Some(code) => code,
            None => return text.to_owned(),
        };
        match self.scripting.eval(code) {
            Ok(Value::String(s)) => s,
            Ok(_) => "(script error: not a string)".to_owned(),
            Err(_) => "(script error)".to_owned(),
        }
    }

    // These statements need engine support that is not routed through the
    // Talk collaborator; they are accepted and recorded as executed.
    fn shut_up(&mut self) {}
    fn wait_for(&mut self, _actor: Option<&str>) {}
    fn wait_while(&mut self, _code: &str) {}
    fn override_label(&mut self, _label: &str) {}

    pub(crate) fn current_actor(&self) -> &str {
        &self.current_actor
    }

    pub(crate) fn parrot(&self) -> bool {
        self.parrot
    }

    pub(crate) fn objects_allowed(&self) -> bool {
        self.objects_allowed
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }
}

fn pause(seconds: f64) {
    if seconds > 0.0 && seconds.is_finite() {
        thread::sleep(Duration::from_secs_f64(seconds));
    }
}

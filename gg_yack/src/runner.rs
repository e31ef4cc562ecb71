use crate::context::Context;
use crate::dialog::Dialog;
use crate::scripting::Scripting;

pub(crate) const LABEL_INIT: &str = "init";
pub(crate) const LABEL_START: &str = "start";
pub(crate) const LABEL_EXIT: &str = "exit";

/// The collaborator that actually makes actors speak.
pub trait Talk {
    fn say(&mut self, actor: &str, text: &str);
}

/// The result of running a dialog until it needs the player.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The dialog collected options and waits for a selection.
    Choices(Choices),
    /// The dialog ran to its end.
    End,
}

/// A set of dialog options offered to the player, sorted by their choice
/// index.
#[derive(Debug, Clone, PartialEq)]
pub struct Choices {
    pub actor: String,
    pub options: Vec<ChoiceOption>,
}

/// One selectable option. The display text has `$` expressions already
/// resolved; the handle back to the underlying choice statement is its
/// index in the shared dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub text: String,
    pub(crate) statement_index: usize,
}

/// Runs a dialog. The dialog is shared and immutable; each runner owns
/// its own state, scripting evaluator and talk collaborator.
pub struct Runner<'a, S: Scripting, T: Talk> {
    ctx: Context<'a, S, T>,
}

impl<'a, S: Scripting, T: Talk> Runner<'a, S, T> {
    pub fn new(dialog: &'a Dialog, scripting: S, talk: T, start_actor: &str) -> Self {
        Runner { ctx: Context::new(dialog, scripting, talk, start_actor) }
    }

    /// Runs the `init` label, discarding any choices it produces.
    pub fn init(&mut self) {
        let _ = self.start_at(LABEL_INIT);
    }

    /// Runs from the `start` label.
    pub fn start(&mut self) -> Outcome {
        self.start_at(LABEL_START)
    }

    /// Runs from the given label. The special label `exit` ends the run
    /// immediately.
    pub fn start_at(&mut self, label: &str) -> Outcome {
        self.ctx.goto_label(label);
        self.ctx.run()
    }

    /// Selects one of the offered options and resumes the run.
    pub fn choose(&mut self, option: &ChoiceOption) -> Outcome {
        self.ctx.choose(option)
    }

    /// The actor currently speaking chosen options.
    pub fn current_actor(&self) -> &str {
        self.ctx.current_actor()
    }

    /// Whether a chosen option is spoken before branching.
    pub fn parrot(&self) -> bool {
        self.ctx.parrot()
    }

    /// Whether object interaction is allowed during the dialog.
    pub fn objects_allowed(&self) -> bool {
        self.ctx.objects_allowed()
    }

    /// The choice-count limit set by the `limit` statement.
    pub fn choice_limit(&self) -> usize {
        self.ctx.limit()
    }
}

use super::draft::Draft;
use super::submission::CreatedAwb;
use super::workflow::Step;

/// Snapshot of one creation flow, published after every state change.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowState {
    pub step: Step,
    pub draft: Draft,
    /// Set while the creation request is on the wire; callers disable submit.
    pub submitting: bool,
    pub completed: Option<CreatedAwb>,
    pub notice: Option<Notice>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            step: Step::DeliveryMethod,
            draft: Draft::default(),
            submitting: false,
            completed: None,
            notice: None,
        }
    }
}

impl WorkflowState {
    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// Message surfaced to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One independently loaded choice list.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceSlot<T> {
    pub loading: bool,
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> ChoiceSlot<T> {
    pub fn pending() -> Self {
        Self {
            loading: true,
            items: Vec::new(),
            error: None,
        }
    }

    pub fn loaded(items: Vec<T>) -> Self {
        Self {
            loading: false,
            items,
            error: None,
        }
    }

    /// Failed fetches degrade to an empty list.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loading: false,
            items: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.loading
    }
}

impl<T> Default for ChoiceSlot<T> {
    fn default() -> Self {
        Self::pending()
    }
}

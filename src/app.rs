use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    domain::{
        gate, gates_between, AwbRequest, ChoiceSlot, Client, CreatedAwb, Draft, DraftAction,
        DraftEffect, Notice, NoticeKind, PickupPoint, Product, Step, ValidationError,
        WorkflowState,
    },
    infra::{GatewayError, ListParams, LockerBridge, Resource, ResourceGateway, SortOrder},
};

/// Choice lists are small; one page holds them all.
pub const CHOICE_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("an AWB submission is already in flight")]
    SubmissionInFlight,
    #[error("submitting is only possible from the summary (currently at {step})")]
    NotAtSummary { step: Step },
    #[error("this workflow already created an AWB")]
    Completed,
    #[error("the courier response carried no AWB number")]
    MissingAwbNumber(Value),
    #[error("failed to encode the AWB request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Independently loaded choice lists, one channel each.
pub struct ChoiceBoard {
    clients: watch::Sender<ChoiceSlot<Client>>,
    products: watch::Sender<ChoiceSlot<Product>>,
    pickup_points: watch::Sender<ChoiceSlot<PickupPoint>>,
}

impl Default for ChoiceBoard {
    fn default() -> Self {
        Self {
            clients: watch::Sender::new(ChoiceSlot::pending()),
            products: watch::Sender::new(ChoiceSlot::pending()),
            pickup_points: watch::Sender::new(ChoiceSlot::pending()),
        }
    }
}

impl ChoiceBoard {
    pub fn clients(&self) -> watch::Receiver<ChoiceSlot<Client>> {
        self.clients.subscribe()
    }

    pub fn products(&self) -> watch::Receiver<ChoiceSlot<Product>> {
        self.products.subscribe()
    }

    pub fn pickup_points(&self) -> watch::Receiver<ChoiceSlot<PickupPoint>> {
        self.pickup_points.subscribe()
    }
}

/// Drives one AWB creation flow.
///
/// Every draft change, including the asynchronous locker selection, is
/// applied through the single `watch` channel behind [`subscribe`].
/// Must be used from within a Tokio runtime.
///
/// [`subscribe`]: WorkflowController::subscribe
pub struct WorkflowController {
    gateway: Arc<ResourceGateway>,
    bridge: Arc<LockerBridge>,
    state: Arc<watch::Sender<WorkflowState>>,
    choices: Arc<ChoiceBoard>,
    lifetime: CancellationToken,
    started: AtomicBool,
    submitting: AtomicBool,
}

impl WorkflowController {
    pub fn new(gateway: Arc<ResourceGateway>, bridge: Arc<LockerBridge>) -> Self {
        Self {
            gateway,
            bridge,
            state: Arc::new(watch::Sender::new(WorkflowState::default())),
            choices: Arc::new(ChoiceBoard::default()),
            lifetime: CancellationToken::new(),
            started: AtomicBool::new(false),
            submitting: AtomicBool::new(false),
        }
    }

    /// Kicks off the three choice-list fetches. Later calls do nothing.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        self.spawn_choice_fetch(Resource::Clients, "name", Client::from_record, |board| {
            &board.clients
        });
        self.spawn_choice_fetch(Resource::Products, "name", Product::from_record, |board| {
            &board.products
        });
        self.spawn_choice_fetch(
            Resource::PickupPoints,
            "alias",
            PickupPoint::from_record,
            |board| &board.pickup_points,
        );
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    pub fn choices(&self) -> &ChoiceBoard {
        &self.choices
    }

    /// Resolves once every choice list finished loading, or the flow closed.
    pub async fn choices_settled(&self) {
        let mut clients = self.choices.clients();
        let mut products = self.choices.products();
        let mut pickup_points = self.choices.pickup_points();
        let all = async {
            let _ = clients.wait_for(ChoiceSlot::is_settled).await;
            let _ = products.wait_for(ChoiceSlot::is_settled).await;
            let _ = pickup_points.wait_for(ChoiceSlot::is_settled).await;
        };
        tokio::select! {
            _ = self.lifetime.cancelled() => {}
            _ = all => {}
        }
    }

    pub fn dispatch(&self, action: DraftAction) -> DraftEffect {
        let effect = apply_action(&self.state, action);
        if effect == DraftEffect::OpenLockerSelector {
            self.open_locker_selector();
        }
        effect
    }

    /// Moves one step forward if the current step's gate holds.
    pub fn advance(&self) -> Result<Step, WorkflowError> {
        let mut outcome = Ok(Step::Summary);
        self.state.send_modify(|state| {
            outcome = match gate(state.step, &state.draft) {
                Ok(()) => {
                    state.step = state.step.next().unwrap_or(state.step);
                    state.notice = None;
                    Ok(state.step)
                }
                Err(err) => {
                    state.notice = Some(Notice::new(NoticeKind::Warning, err.message));
                    Err(err)
                }
            };
        });
        outcome.map_err(WorkflowError::from)
    }

    pub fn back(&self) -> Step {
        let mut step = Step::DeliveryMethod;
        self.state.send_modify(|state| {
            state.step = state.step.previous().unwrap_or(state.step);
            state.notice = None;
            step = state.step;
        });
        step
    }

    /// Jumps to `target`; forward jumps check every gate on the way.
    pub fn go_to(&self, target: Step) -> Result<Step, WorkflowError> {
        let mut outcome = Ok(target);
        self.state.send_modify(|state| {
            let checked = if target > state.step {
                gates_between(state.step, target, &state.draft)
            } else {
                Ok(())
            };
            outcome = match checked {
                Ok(()) => {
                    state.step = target;
                    state.notice = None;
                    Ok(target)
                }
                Err(err) => {
                    state.notice = Some(Notice::new(NoticeKind::Warning, err.message));
                    Err(err)
                }
            };
        });
        outcome.map_err(WorkflowError::from)
    }

    /// Sends the creation request for the current draft.
    ///
    /// On failure the step and draft stay as they were so the operator can
    /// fix the problem and retry.
    pub async fn submit(&self) -> Result<CreatedAwb, WorkflowError> {
        if self.state.borrow().is_completed() {
            return Err(WorkflowError::Completed);
        }
        if self.submitting.swap(true, Ordering::AcqRel) {
            return Err(WorkflowError::SubmissionInFlight);
        }
        // Held until the outcome is published, so no second request can start in between.
        let _in_flight = InFlight {
            flag: &self.submitting,
            state: &self.state,
        };

        let snapshot = self.snapshot();
        if snapshot.is_completed() {
            return Err(WorkflowError::Completed);
        }
        if snapshot.step != Step::Summary {
            return Err(WorkflowError::NotAtSummary {
                step: snapshot.step,
            });
        }
        let request = match AwbRequest::from_draft(&snapshot.draft) {
            Ok(request) => request,
            Err(err) => {
                self.notify(Notice::new(NoticeKind::Warning, err.message));
                return Err(err.into());
            }
        };
        let body = serde_json::to_value(&request)?;

        self.state.send_modify(|state| state.submitting = true);
        let outcome = self.gateway.create(Resource::Shipments, body).await;

        let record = match outcome {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "AWB submission failed");
                self.notify(Notice::new(NoticeKind::Error, err.user_message()));
                return Err(err.into());
            }
        };
        let Some(created) = CreatedAwb::from_record(record.clone()) else {
            warn!(%record, "courier response carried no AWB number");
            self.notify(Notice::new(
                NoticeKind::Error,
                "The courier did not return an AWB number",
            ));
            return Err(WorkflowError::MissingAwbNumber(record));
        };

        info!(awb_number = %created.awb_number, "AWB created");
        let message = format!("AWB {} created", created.awb_number);
        let completed = created.clone();
        self.state.send_modify(move |state| {
            state.draft = Draft::default();
            state.completed = Some(completed);
            state.submitting = false;
            state.notice = Some(Notice::new(NoticeKind::Success, message));
        });
        self.lifetime.cancel();
        Ok(created)
    }

    /// Ends the flow; pending fetches and locker requests stop writing.
    pub fn close(&self) {
        self.lifetime.cancel();
    }

    fn notify(&self, notice: Notice) {
        self.state.send_modify(|state| state.notice = Some(notice));
    }

    fn open_locker_selector(&self) {
        let receiver = match self.bridge.request_selection() {
            Ok(receiver) => receiver,
            Err(err) => {
                warn!(error = %err, "locker selection unavailable");
                self.notify(Notice::new(
                    NoticeKind::Warning,
                    format!("{err}. Select the locker delivery again to retry."),
                ));
                return;
            }
        };

        let state = Arc::clone(&self.state);
        let lifetime = self.lifetime.clone();
        tokio::spawn(async move {
            let selection = tokio::select! {
                _ = lifetime.cancelled() => return,
                selection = receiver => selection,
            };
            match selection {
                Ok(selection) => {
                    apply_action(&state, DraftAction::LockerSelected(selection));
                }
                Err(_) => debug!("locker request superseded"),
            }
        });
    }

    fn spawn_choice_fetch<T>(
        &self,
        resource: Resource,
        sort_field: &'static str,
        decode: fn(Value) -> Option<T>,
        slot: fn(&ChoiceBoard) -> &watch::Sender<ChoiceSlot<T>>,
    ) where
        T: Send + Sync + 'static,
    {
        let gateway = Arc::clone(&self.gateway);
        let choices = Arc::clone(&self.choices);
        let lifetime = self.lifetime.clone();

        tokio::spawn(async move {
            let params = ListParams::new(1, CHOICE_PAGE_SIZE).sorted_by(sort_field, SortOrder::Asc);
            let fetched = tokio::select! {
                _ = lifetime.cancelled() => return,
                fetched = gateway.list(resource, &params) => fetched,
            };
            if lifetime.is_cancelled() {
                return;
            }
            let next = match fetched {
                Ok(list) => {
                    let items: Vec<T> = list.items.into_iter().filter_map(decode).collect();
                    debug!(%resource, count = items.len(), "choices loaded");
                    ChoiceSlot::loaded(items)
                }
                Err(err) => {
                    warn!(%resource, error = %err, "failed to load choices");
                    ChoiceSlot::failed(err.user_message())
                }
            };
            slot(&choices).send_replace(next);
        });
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

fn apply_action(state: &watch::Sender<WorkflowState>, action: DraftAction) -> DraftEffect {
    let mut effect = DraftEffect::None;
    state.send_modify(|state| effect = state.draft.apply(action));
    effect
}

// Clears the in-flight markers however `submit` exits.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    state: &'a watch::Sender<WorkflowState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.submitting, false));
        self.flag.store(false, Ordering::Release);
    }
}

//! Adapter for the courier's locker map widget.
//!
//! The widget is a capability of the hosting environment. It may be missing
//! entirely; callers get a [`BridgeError`] and carry on without a locker.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::domain::draft::LockerSelection;

pub const DEFAULT_CLIENT_ID: &str = "e3aff034-224d-4af3-8520-9e6a1d75ee14";
pub const DEFAULT_API_USERNAME: &str = "apisupportTEST";

/// Receives every raw message the widget publishes.
pub type SelectionHandler = Box<dyn FnMut(Value) + Send>;

/// Global widget entry point.
pub trait LockerWidget: Send + Sync {
    fn init(&self, config: &LockerConfig);
    /// The single live widget instance, if the widget exposes one.
    fn instance(&self) -> Option<Arc<dyn LockerInstance>>;
}

pub trait LockerInstance: Send + Sync {
    fn open(&self);
    fn close(&self);
    fn subscribe(&self, handler: SelectionHandler);
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockerConfig {
    pub client_id: String,
    pub country_code: String,
    pub lang_code: String,
    pub city: String,
    pub county: String,
    pub theme: String,
    pub api_username: String,
    pub filters: Vec<Value>,
    pub initial_map_center: String,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            country_code: "RO".to_string(),
            lang_code: "ro".to_string(),
            city: "Sectorul 2".to_string(),
            county: "Bucuresti".to_string(),
            theme: "light".to_string(),
            api_username: DEFAULT_API_USERNAME.to_string(),
            filters: vec![json!({"showLockers": true}), json!({"showPudos": true})],
            initial_map_center: "Sectorul 2".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("locker widget is not available")]
    Unavailable,
    #[error("locker widget has no active instance")]
    NoInstance,
}

#[derive(Default)]
struct Pending {
    ticket: u64,
    reply: Option<oneshot::Sender<LockerSelection>>,
}

pub struct LockerBridge {
    widget: Option<Arc<dyn LockerWidget>>,
    config: LockerConfig,
    initialized: OnceLock<()>,
    pending: Arc<Mutex<Pending>>,
}

impl LockerBridge {
    pub fn new(widget: Arc<dyn LockerWidget>, config: LockerConfig) -> Self {
        Self {
            widget: Some(widget),
            config,
            initialized: OnceLock::new(),
            pending: Arc::default(),
        }
    }

    /// A bridge for environments without the widget.
    pub fn unavailable() -> Self {
        Self {
            widget: None,
            config: LockerConfig::default(),
            initialized: OnceLock::new(),
            pending: Arc::default(),
        }
    }

    /// Opens the widget and resolves with the next locker the user picks.
    ///
    /// A newer request supersedes this one: its receiver then resolves with
    /// an error and its handler ignores further events.
    pub fn request_selection(&self) -> Result<oneshot::Receiver<LockerSelection>, BridgeError> {
        let widget = self.widget.as_ref().ok_or(BridgeError::Unavailable)?;
        self.initialized.get_or_init(|| {
            widget.init(&self.config);
            debug!("locker widget initialised");
        });
        let instance = widget.instance().ok_or(BridgeError::NoInstance)?;

        let (reply, receiver) = oneshot::channel();
        let ticket = {
            let mut pending = self.lock_pending();
            pending.ticket += 1;
            // Dropping the previous sender cancels the earlier request.
            pending.reply = Some(reply);
            pending.ticket
        };

        let pending = Arc::clone(&self.pending);
        // Released once the reply is sent; the instance owns this handler.
        let mut to_close = Some(Arc::clone(&instance));
        instance.subscribe(Box::new(move |message| {
            let Some(selection) = parse_selection(&message) else {
                warn!(%message, "ignoring locker message without a locker id");
                return;
            };
            let reply = {
                let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
                if pending.ticket != ticket {
                    debug!(ticket, "ignoring selection for a superseded request");
                    return;
                }
                pending.reply.take()
            };
            let Some(reply) = reply else {
                return;
            };
            if let Some(instance) = to_close.take() {
                instance.close();
            }
            info!(locker_id = selection.locker_id, "locker selected");
            if reply.send(selection).is_err() {
                debug!("locker selection arrived after the request was dropped");
            }
        }));
        instance.open();
        Ok(receiver)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_selection(message: &Value) -> Option<LockerSelection> {
    let locker_id = match message.get("lockerId")? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let name = message
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Locker {locker_id}"));
    Some(LockerSelection { locker_id, name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeInstance {
        handlers: Mutex<Vec<SelectionHandler>>,
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    impl FakeInstance {
        fn emit(&self, message: Value) {
            for handler in self.handlers.lock().unwrap().iter_mut() {
                handler(message.clone());
            }
        }
    }

    impl LockerInstance for FakeInstance {
        fn open(&self) {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }

        fn subscribe(&self, handler: SelectionHandler) {
            self.handlers.lock().unwrap().push(handler);
        }
    }

    struct FakeWidget {
        inits: AtomicUsize,
        config: Mutex<Option<Value>>,
        instance: Option<Arc<FakeInstance>>,
    }

    impl FakeWidget {
        fn new() -> Self {
            Self {
                inits: AtomicUsize::new(0),
                config: Mutex::new(None),
                instance: Some(Arc::new(FakeInstance::default())),
            }
        }

        fn live(&self) -> &FakeInstance {
            self.instance.as_deref().unwrap()
        }
    }

    impl LockerWidget for FakeWidget {
        fn init(&self, config: &LockerConfig) {
            self.inits.fetch_add(1, Ordering::SeqCst);
            *self.config.lock().unwrap() = Some(serde_json::to_value(config).unwrap());
        }

        fn instance(&self) -> Option<Arc<dyn LockerInstance>> {
            self.instance
                .clone()
                .map(|instance| instance as Arc<dyn LockerInstance>)
        }
    }

    #[tokio::test]
    async fn selection_closes_the_widget_and_resolves() {
        let widget = Arc::new(FakeWidget::new());
        let bridge = LockerBridge::new(widget.clone(), LockerConfig::default());

        let receiver = bridge.request_selection().unwrap();
        assert_eq!(widget.live().opened.load(Ordering::SeqCst), 1);

        widget
            .live()
            .emit(json!({"lockerId": 4821, "name": "easybox Mega Mall"}));

        assert_eq!(
            receiver.await.unwrap(),
            LockerSelection {
                locker_id: 4821,
                name: "easybox Mega Mall".into()
            }
        );
        assert_eq!(widget.live().closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn widget_is_initialised_once_with_the_fixed_options() {
        let widget = Arc::new(FakeWidget::new());
        let bridge = LockerBridge::new(widget.clone(), LockerConfig::default());

        let _first = bridge.request_selection().unwrap();
        let _second = bridge.request_selection().unwrap();

        assert_eq!(widget.inits.load(Ordering::SeqCst), 1);
        let config = widget.config.lock().unwrap().clone().unwrap();
        assert_eq!(config["clientId"], json!(DEFAULT_CLIENT_ID));
        assert_eq!(config["countryCode"], json!("RO"));
        assert_eq!(config["initialMapCenter"], json!("Sectorul 2"));
        assert_eq!(
            config["filters"],
            json!([{"showLockers": true}, {"showPudos": true}])
        );
    }

    #[tokio::test]
    async fn last_request_wins() {
        let widget = Arc::new(FakeWidget::new());
        let bridge = LockerBridge::new(widget.clone(), LockerConfig::default());

        let first = bridge.request_selection().unwrap();
        let second = bridge.request_selection().unwrap();
        widget.live().emit(json!({"lockerId": "77", "name": "Lidl"}));

        assert!(first.await.is_err());
        assert_eq!(second.await.unwrap().locker_id, 77);
        assert_eq!(widget.live().closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_messages_keep_the_handler_armed() {
        let widget = Arc::new(FakeWidget::new());
        let bridge = LockerBridge::new(widget.clone(), LockerConfig::default());

        let mut receiver = bridge.request_selection().unwrap();
        widget.live().emit(json!({"name": "no id"}));
        widget.live().emit(json!({"lockerId": "abc"}));
        assert!(receiver.try_recv().is_err());
        assert_eq!(widget.live().closed.load(Ordering::SeqCst), 0);

        widget.live().emit(json!({"lockerId": 12}));
        let selection = receiver.await.unwrap();
        assert_eq!(selection.locker_id, 12);
        assert_eq!(selection.name, "Locker 12");
    }

    struct Handle(Arc<FakeInstance>);

    impl LockerInstance for Handle {
        fn open(&self) {
            self.0.open();
        }

        fn close(&self) {
            self.0.close();
        }

        fn subscribe(&self, handler: SelectionHandler) {
            self.0.subscribe(handler);
        }
    }

    struct HandlePerCall(Arc<FakeInstance>);

    impl LockerWidget for HandlePerCall {
        fn init(&self, _config: &LockerConfig) {}

        fn instance(&self) -> Option<Arc<dyn LockerInstance>> {
            Some(Arc::new(Handle(Arc::clone(&self.0))))
        }
    }

    #[tokio::test]
    async fn short_lived_handles_still_close_the_widget() {
        let shared = Arc::new(FakeInstance::default());
        let bridge = LockerBridge::new(
            Arc::new(HandlePerCall(Arc::clone(&shared))),
            LockerConfig::default(),
        );

        let receiver = bridge.request_selection().unwrap();
        shared.emit(json!({"lockerId": 5}));

        assert_eq!(receiver.await.unwrap().locker_id, 5);
        assert_eq!(shared.closed.load(Ordering::SeqCst), 1);

        shared.emit(json!({"lockerId": 6}));
        assert_eq!(shared.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_widget_or_instance_is_reported() {
        assert_eq!(
            LockerBridge::unavailable().request_selection().unwrap_err(),
            BridgeError::Unavailable
        );

        let widget = Arc::new(FakeWidget {
            instance: None,
            ..FakeWidget::new()
        });
        let bridge = LockerBridge::new(widget, LockerConfig::default());
        assert_eq!(bridge.request_selection().unwrap_err(), BridgeError::NoInstance);
    }
}

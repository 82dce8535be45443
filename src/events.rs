use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

use crate::host::{TextPosition, TextRange};

/// Editor events the tracker reacts to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EditorEvent {
    Focus {
        path: PathBuf,
    },
    Close {
        path: PathBuf,
    },
    #[serde(rename_all = "camelCase")]
    Select {
        path: PathBuf,
        selection: TextRange,
        line_text: String,
    },
    Mode {
        mode: String,
    },
    Command {
        command: String,
    },
}

impl EditorEvent {
    pub fn caret(path: impl Into<PathBuf>, position: TextPosition, line_text: impl Into<String>) -> Self {
        Self::Select {
            path: path.into(),
            selection: TextRange::new(position, position),
            line_text: line_text.into(),
        }
    }
}

/// Messages published to observers of the graph.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    GraphChanged,
    Highlighted(String),
    Warning(String),
    RevealPanel,
}

type Handler<T> = Arc<Mutex<dyn FnMut(&T) + Send>>;

struct Registry<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

/// Fan-out of values to registered handlers.
pub struct Dispatcher<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }
}

impl<T: 'static> Dispatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The handler stays registered until the returned token is dropped or disposed.
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe(&self, handler: impl FnMut(&T) + Send + 'static) -> Subscription {
        let id = match self.registry.lock() {
            Ok(mut registry) => {
                let id = registry.next_id;
                registry.next_id += 1;
                registry.handlers.push((id, Arc::new(Mutex::new(handler))));
                id
            }
            Err(_) => u64::MAX,
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade()
                    && let Ok(mut registry) = registry.lock()
                {
                    registry.handlers.retain(|(handler_id, _)| *handler_id != id);
                }
            })),
        }
    }

    /// Handlers run outside the registry lock and may drop or dispose
    /// subscriptions. A handler already running is skipped by a nested emit.
    pub fn emit(&self, value: &T) {
        let handlers = match self.registry.lock() {
            Ok(registry) => registry
                .handlers
                .iter()
                .map(|(_, handler)| Arc::clone(handler))
                .collect::<Vec<_>>(),
            Err(_) => return,
        };
        for handler in handlers {
            if let Ok(mut handler) = handler.try_lock() {
                (&mut *handler)(value);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .map(|registry| registry.handlers.len())
            .unwrap_or(0)
    }
}

pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn dispose(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

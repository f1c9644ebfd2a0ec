//! Test helpers: a `tracing` layer that records every event it sees, and a
//! handler that records the context it was called with.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use http::StatusCode;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::handler::Handler;
use crate::{Request, Response};

#[derive(Clone, Debug)]
pub(crate) struct Captured {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl Captured {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Clone, Default)]
pub(crate) struct Capture {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl Capture {
    pub fn dispatch(&self) -> Dispatch {
        Dispatch::new(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn events(&self) -> Vec<Captured> {
        self.events.lock().unwrap().clone()
    }

    /// Events at `level` whose message is exactly `message`.
    pub fn find(&self, level: Level, message: &str) -> Vec<Captured> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level && e.message == message)
            .collect()
    }

    /// The single event matching `level` and `message`; panics otherwise.
    pub fn one(&self, level: Level, message: &str) -> Captured {
        let mut found = self.find(level, message);
        assert_eq!(found.len(), 1, "expected exactly one {level} {message:?}, got {found:?}");
        found.remove(0)
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_owned(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_owned());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }
}

/// Remembers the request context the wrapped handler last saw.
#[derive(Clone, Default)]
pub(crate) struct Probe {
    seen: Arc<Mutex<Option<crate::Context>>>,
    calls: Arc<Mutex<usize>>,
}

impl Probe {
    /// A handler that records its context and answers with `status`.
    pub fn handler(&self, status: StatusCode) -> impl Handler {
        let probe = self.clone();
        move |req: Request| {
            let probe = probe.clone();
            async move {
                *probe.seen.lock().unwrap() = Some(req.context().clone());
                *probe.calls.lock().unwrap() += 1;
                Response::status(status)
            }
        }
    }

    /// The context of the last call; panics if the handler never ran.
    pub fn context(&self) -> crate::Context {
        self.seen.lock().unwrap().clone().expect("handler was not called")
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

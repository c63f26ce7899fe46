// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared helpers for unit tests: token minting and log capture.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
};

/// HS256-sign `payload` with `secret`.
pub(crate) fn sign(payload: Value, secret: &str) -> String {
    encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("signing should succeed")
}

/// Events recorded while a closure ran.
#[derive(Debug, Clone, Default)]
pub(crate) struct Captured(Vec<(Level, String)>);

impl Captured {
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.0.iter().map(|(_, message)| message.clone()).collect()
    }

    pub(crate) fn levels(&self) -> Vec<Level> {
        self.0.iter().map(|(level, _)| *level).collect()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(level, _)| *level == Level::WARN)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[derive(Clone, Default)]
struct EventCollector {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl<S: Subscriber> Layer<S> for EventCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .expect("lock poisoned")
            .push((*event.metadata().level(), visitor.message));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

/// Run `f` under a subscriber that records every event on this thread.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> Captured {
    let collector = EventCollector::default();
    let events = Arc::clone(&collector.events);

    let subscriber = tracing_subscriber::registry().with(collector);
    tracing::subscriber::with_default(subscriber, f);

    let recorded = events.lock().expect("lock poisoned").clone();
    Captured(recorded)
}

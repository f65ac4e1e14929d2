use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use super::kind::EventKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub kind: EventKind,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

type Handler = Box<dyn FnMut(&Event)>;

/// In-process observer registry; handlers run synchronously in subscription order
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(Option<EventKind>, Handler)>,
    published: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&Event) + 'static,
    {
        self.handlers.push((Some(kind), Box::new(handler)));
    }

    pub fn subscribe_all<F>(&mut self, handler: F)
    where
        F: FnMut(&Event) + 'static,
    {
        self.handlers.push((None, Box::new(handler)));
    }

    pub fn publish<T: Serialize + ?Sized>(&mut self, kind: EventKind, payload: &T) {
        let payload = serde_json::to_value(payload).unwrap_or_else(|e| {
            warn!("Failed to serialize {} payload: {}", kind, e);
            Value::Null
        });
        let event = Event {
            kind,
            payload,
            timestamp: Utc::now(),
        };
        debug!("Event {}", kind);
        self.published += 1;

        for (filter, handler) in self.handlers.iter_mut() {
            if filter.is_none_or(|wanted| wanted == kind) {
                handler(&event);
            }
        }
    }

    pub fn published_count(&self) -> usize {
        self.published
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_handlers_receive_matching_events() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let all = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&seen);
        bus.subscribe(EventKind::MatchCompleted, move |event| sink.borrow_mut().push(event.payload.clone()));
        let counter = Rc::clone(&all);
        bus.subscribe_all(move |_| *counter.borrow_mut() += 1);

        bus.publish(EventKind::MatchStarted, &serde_json::json!({"id": "m1"}));
        bus.publish(EventKind::MatchCompleted, &serde_json::json!({"id": "m1"}));

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0]["id"], "m1");
        assert_eq!(*all.borrow(), 2);
        assert_eq!(bus.published_count(), 2);
    }
}

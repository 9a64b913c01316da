//! Shared helpers for the integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use tessella_model::{Event, EventKind, Model, ModelListener};

static TRACING: Once = Once::new();

/// Install the env-filtered test subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Listener recording every delivered event in order
#[derive(Default)]
pub struct Recorder {
    events: RefCell<Vec<Event>>,
}

impl Recorder {
    pub fn install(model: &mut Model) -> Rc<Recorder> {
        init_tracing();
        let recorder = Rc::new(Recorder::default());
        model.add_listener(recorder.clone());
        recorder
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(|e| e.kind).collect()
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind == kind).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl ModelListener for Recorder {
    fn on_event(&self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Names of the alias entities on a facet or business object, in list order.
pub fn alias_names(model: &Model, owner: tessella_model::EntityKey) -> Vec<String> {
    model
        .aliases(owner)
        .unwrap()
        .iter()
        .map(|k| model.alias(*k).unwrap().name().to_string())
        .collect()
}

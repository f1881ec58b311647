//! Event recording: classification, filtering, and the outgoing store.

use tracing::warn;

use crate::event::Event;

/// Decides whether an outgoing event reaches the store.
///
/// Implemented for plain closures, so `|ev| ev.kind() == EventKind::Jump`
/// works directly.
pub trait EventFilter {
    /// True when the event should be kept.
    fn accept(&self, event: &Event) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&Event) -> bool,
{
    fn accept(&self, event: &Event) -> bool {
        self(event)
    }
}

/// The default filter: everything passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl EventFilter for AcceptAll {
    fn accept(&self, _event: &Event) -> bool {
        true
    }
}

/// Forwarding target for accepted events, in addition to the store.
pub type ForwardFn = Box<dyn FnMut(&Event) -> Result<(), String> + Send>;

/// Classifies outgoing events, applies the filter, and appends accepted
/// records to the engine-owned store.
///
/// An optional forwarding sink receives every stored event; a refusal is
/// logged once and the run continues.
pub struct Recorder {
    store: Vec<Event>,
    filter: Box<dyn EventFilter + Send>,
    forward: Option<ForwardFn>,
    refusal_logged: bool,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("stored", &self.store.len())
            .field("refusal_logged", &self.refusal_logged)
            .finish()
    }
}

impl Recorder {
    /// A recorder with the default accept-everything filter.
    pub fn accepting_all() -> Self {
        Self::with_filter(Box::new(AcceptAll))
    }

    /// A recorder with a user-provided filter.
    pub fn with_filter(filter: Box<dyn EventFilter + Send>) -> Self {
        Self {
            store: Vec::new(),
            filter,
            forward: None,
            refusal_logged: false,
        }
    }

    /// Installs a forwarding sink called for every stored event.
    pub fn forward_to(&mut self, forward: ForwardFn) {
        self.forward = Some(forward);
    }

    /// Records one event if the filter accepts it.
    pub fn record(&mut self, event: Event) {
        if !self.filter.accept(&event) {
            return;
        }
        if let Some(forward) = self.forward.as_mut() {
            if let Err(reason) = forward(&event) {
                if !self.refusal_logged {
                    warn!(%reason, "sink refused an event; continuing without it");
                    self.refusal_logged = true;
                }
            }
        }
        self.store.push(event);
    }

    /// The events stored so far.
    pub fn events(&self) -> &[Event] {
        &self.store
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Consumes the store, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.store)
    }
}

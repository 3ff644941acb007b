use crate::{Address, chain::ConnectedChain};
use std::{cell::RefCell, rc::Rc};

/// Lifecycle messages the connectors emit to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorMessage {
    /// a `connect` just started
    Connecting,
    /// the active account and/or chain changed
    Change {
        account: Option<Address>,
        chain: Option<ConnectedChain>,
    },
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&ConnectorMessage)>;

/// Registry of the listeners of a connector.
///
/// Cloning shares the registry: the provider event handlers keep a clone
/// so the messages reach the listeners the application registered.
#[derive(Clone, Default)]
pub struct Emitter {
    inner: Rc<RefCell<Listeners>>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&ConnectorMessage) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Rc::new(listener)));
        id
    }

    /// returns `false` if the listener was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    pub fn emit(&self, message: ConnectorMessage) {
        // listeners may (un)subscribe while being notified
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(&message);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

#[cfg(test)]
pub(crate) fn record(emitter: &Emitter) -> Rc<RefCell<Vec<ConnectorMessage>>> {
    let messages = Rc::new(RefCell::new(Vec::new()));
    let sink = messages.clone();
    emitter.subscribe(move |message| sink.borrow_mut().push(message.clone()));
    messages
}

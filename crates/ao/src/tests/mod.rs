
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::active::{ActiveContext, SignalHandler};
use crate::event::Signal;

#[derive(Clone, Default)]
struct Collector {
    events: Arc<Mutex<Vec<Signal>>>,
}

impl Collector {
    fn signals(&self) -> Vec<Signal> {
        self.events.lock().unwrap().clone()
    }
}

impl SignalHandler for Collector {
    fn handle_signal(&mut self, signal: Signal, _ctx: &mut ActiveContext) {
        self.events.lock().unwrap().push(signal);
    }
}

/// Forwards every dispatched signal, tagged with the dispatching thread name.
struct Forwarder {
    tx: mpsc::Sender<(Option<String>, Signal)>,
}

impl SignalHandler for Forwarder {
    fn handle_signal(&mut self, signal: Signal, _ctx: &mut ActiveContext) {
        let thread = std::thread::current().name().map(str::to_owned);
        let _ = self.tx.send((thread, signal));
    }
}

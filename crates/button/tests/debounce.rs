//! Debounce timing against a manual clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ao::{
    ActiveConfig, ActiveContext, Clock, RuntimeConfig, Signal, SignalHandler, Simulation, Wiring,
};
use ao_broker::{BrokerBuilder, Publisher};
use ao_button::{Button, ButtonConfig, Level, Polarity, SimulatedLine};

const PRESSED: Signal = Signal::user(0x20);
const RELEASED: Signal = Signal::user(0x21);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[derive(Clone, Default)]
struct Indicator {
    log: Arc<Mutex<Vec<Signal>>>,
}

impl Indicator {
    fn seen(&self) -> Vec<Signal> {
        self.log.lock().unwrap().clone()
    }
}

impl SignalHandler for Indicator {
    fn handle_signal(&mut self, signal: Signal, _ctx: &mut ActiveContext) {
        if signal != Signal::INIT {
            self.log.lock().unwrap().push(signal);
        }
    }
}

fn system(config: ButtonConfig) -> (Simulation, SimulatedLine, Indicator) {
    let mut wiring = Wiring::new(RuntimeConfig::builder().clock(Clock::Manual).build());
    let broker = wiring
        .declare(ActiveConfig::new("broker").with_priority(3))
        .unwrap();
    let button = wiring
        .declare(ActiveConfig::new("button").with_priority(2))
        .unwrap();
    let indicator = wiring.declare(ActiveConfig::new("indicator")).unwrap();

    let mut table = BrokerBuilder::new();
    table.subscribe(PRESSED, indicator.mailbox()).unwrap();
    table.subscribe(RELEASED, indicator.mailbox()).unwrap();

    let line = SimulatedLine::new(Level::High);
    let behavior = Button::new(
        &mut wiring,
        &button,
        line.clone(),
        Publisher::new(broker.mailbox()),
        config,
    )
    .unwrap();

    let recorder = Indicator::default();
    wiring.bind(broker, table.build()).unwrap();
    wiring.bind(button, behavior).unwrap();
    wiring.bind(indicator, recorder.clone()).unwrap();
    (wiring.simulate().unwrap(), line, recorder)
}

fn defaults() -> ButtonConfig {
    ButtonConfig::new(PRESSED, RELEASED)
}

#[test]
fn press_is_published_one_window_after_detection() {
    let (mut sim, line, indicator) = system(defaults());
    line.set(Level::Low);

    // Detected by the poll at 50ms, confirmed at 65ms.
    sim.advance(ms(64));
    assert!(indicator.seen().is_empty());
    sim.advance(ms(1));
    assert_eq!(indicator.seen(), vec![PRESSED]);

    // Holding the button does not repeat the event.
    sim.advance(ms(1000));
    assert_eq!(indicator.seen(), vec![PRESSED]);
}

#[test]
fn release_follows_press() {
    let (mut sim, line, indicator) = system(defaults());
    line.set(Level::Low);
    sim.advance(ms(65));

    line.set(Level::High);
    sim.advance(ms(49));
    assert_eq!(indicator.seen(), vec![PRESSED]);
    sim.advance(ms(1));
    assert_eq!(indicator.seen(), vec![PRESSED, RELEASED]);
}

#[test]
fn glitch_between_polls_is_invisible() {
    let (mut sim, line, indicator) = system(defaults());
    sim.advance(ms(10));
    line.set(Level::Low);
    sim.advance(ms(10));
    line.set(Level::High);

    sim.advance(ms(300));
    assert!(indicator.seen().is_empty());
}

#[test]
fn glitch_shorter_than_window_is_rejected() {
    let (mut sim, line, indicator) = system(defaults());
    sim.advance(ms(45));
    line.set(Level::Low);
    // The poll at 50ms sees it and arms the window.
    sim.advance(ms(10));
    line.set(Level::High);

    sim.advance(ms(300));
    assert!(indicator.seen().is_empty());
}

#[test]
fn later_poll_restarts_the_window() {
    let config = defaults().with_poll_period(ms(10)).with_debounce(ms(15));
    let (mut sim, line, indicator) = system(config);
    line.set(Level::Low);

    // Armed at 10ms, restarted at 20ms. Without the restart the window
    // would close at 25ms with the line still low.
    sim.advance(ms(22));
    line.set(Level::High);

    sim.advance(ms(100));
    assert!(indicator.seen().is_empty());
}

#[test]
fn active_high_line_reports_edges_by_level() {
    let (mut sim, line, indicator) = system(defaults().with_polarity(Polarity::ActiveHigh));

    // Starts high, so the first change is a release.
    line.set(Level::Low);
    sim.advance(ms(65));
    assert_eq!(indicator.seen(), vec![RELEASED]);

    line.set(Level::High);
    sim.advance(ms(50));
    assert_eq!(indicator.seen(), vec![RELEASED, PRESSED]);
}

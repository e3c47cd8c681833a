//! Host demo: a debounced button publishing through the event broker.
//!
//! A stimulus thread plays a few presses (and one glitch shorter than the
//! debounce window) on a simulated line; an indicator active object logs
//! what the broker delivers. Runs for the number of seconds given as the
//! first argument (default 2), then exits.
//!
//! ```text
//! RUST_LOG=debug cargo run -p button-demo -- 3
//! ```

use std::error::Error;
use std::process;
use std::thread;
use std::time::Duration;

use ao::{ActiveConfig, ActiveContext, RuntimeConfig, Signal, SignalHandler, Wiring};
use ao_broker::{BrokerBuilder, Publisher};
use ao_button::{Button, ButtonConfig, Level, SimulatedLine};

/// Global button event kinds.
mod kinds {
    use ao::Signal;

    pub const BUTTON_PRESSED: Signal = Signal::user(0x100);
    pub const BUTTON_RELEASED: Signal = Signal::user(0x101);
    // Declared for consumers; no producer emits these yet.
    #[allow(dead_code)]
    pub const BUTTON_DOUBLE_PRESS: Signal = Signal::user(0x102);
    #[allow(dead_code)]
    pub const BUTTON_HOLD: Signal = Signal::user(0x103);
}

const DEFAULT_RUN_SECS: u64 = 2;

struct Indicator {
    presses: u32,
}

impl SignalHandler for Indicator {
    fn handle_signal(&mut self, signal: Signal, ctx: &mut ActiveContext) {
        match signal {
            Signal::INIT => log::info!("`{}` waiting for button events", ctx.name()),
            kinds::BUTTON_PRESSED => {
                self.presses += 1;
                log::info!("button pressed (#{})", self.presses);
            }
            kinds::BUTTON_RELEASED => log::info!("button released"),
            other => log::warn!("`{}`: unexpected {other}", ctx.name()),
        }
    }
}

/// Plays presses and one glitch on `line`, forever.
fn stimulus(line: SimulatedLine) {
    let script = [
        (Level::Low, 300),
        (Level::High, 400),
        // Too short for the debounce window.
        (Level::Low, 5),
        (Level::High, 400),
    ];
    loop {
        for (level, hold_ms) in script {
            line.set(level);
            thread::sleep(Duration::from_millis(hold_ms));
        }
    }
}

fn run_secs() -> Result<u64, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(arg) => Ok(arg.parse()?),
        None => Ok(DEFAULT_RUN_SECS),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let run_for = Duration::from_secs(run_secs()?);

    let mut wiring = Wiring::new(RuntimeConfig::builder().name("button-demo").build());
    let broker = wiring.declare(ActiveConfig::new("broker").with_priority(3))?;
    let button = wiring.declare(ActiveConfig::new("button").with_priority(2))?;
    let indicator = wiring.declare(ActiveConfig::new("indicator").with_priority(1))?;

    let mut table = BrokerBuilder::new();
    table.subscribe(kinds::BUTTON_PRESSED, indicator.mailbox())?;
    table.subscribe(kinds::BUTTON_RELEASED, indicator.mailbox())?;

    let line = SimulatedLine::new(Level::High);
    let button_ao = Button::new(
        &mut wiring,
        &button,
        line.clone(),
        Publisher::new(broker.mailbox()),
        ButtonConfig::new(kinds::BUTTON_PRESSED, kinds::BUTTON_RELEASED),
    )?;

    wiring.bind(broker, table.build())?;
    wiring.bind(button, button_ao)?;
    wiring.bind(indicator, Indicator { presses: 0 })?;
    let runtime = wiring.start()?;
    log::info!("running {:?} for {run_for:?}", runtime.actors());

    thread::Builder::new()
        .name("stimulus".into())
        .spawn(move || stimulus(line))?;

    thread::sleep(run_for);
    log::info!("done");
    process::exit(0);
}

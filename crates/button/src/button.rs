//! The debounced button active object.

use core::time::Duration;

use ao::{
    ActiveBehavior, ActiveContext, Declared, Event, Signal, TimedEvent, TimedEventConfig, Wiring,
    WiringError,
};
use ao_broker::Publisher;

use crate::input::{InputLine, Level, Polarity};

/// Periodic sampling tick.
pub const POLL_SIG: Signal = Signal::user(0);
/// The debounce window elapsed.
pub const DEBOUNCED_SIG: Signal = Signal::user(1);
/// A press was confirmed.
pub const PRESSED_SIG: Signal = Signal::user(2);
/// A release was confirmed.
pub const RELEASED_SIG: Signal = Signal::user(3);

/// Timing, polarity and output kinds of a [`Button`].
#[derive(Debug, Clone)]
pub struct ButtonConfig {
    pub poll_period: Duration,
    pub debounce: Duration,
    pub polarity: Polarity,
    /// Global kind published on a confirmed press.
    pub pressed_kind: Signal,
    /// Global kind published on a confirmed release.
    pub released_kind: Signal,
}

impl ButtonConfig {
    pub fn new(pressed_kind: Signal, released_kind: Signal) -> Self {
        Self {
            poll_period: Duration::from_millis(50),
            debounce: Duration::from_millis(15),
            polarity: Polarity::ActiveLow,
            pressed_kind,
            released_kind,
        }
    }

    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }
}

/// Polls a digital line and publishes debounced press/release events.
///
/// A change seen by a poll arms the debounce window; every later poll that
/// still sees a change restarts it. The change is committed only if the line
/// still differs from the stable level when the window elapses.
pub struct Button<L> {
    line: L,
    publisher: Publisher,
    config: ButtonConfig,
    poll: TimedEvent,
    debounce: TimedEvent,
    stable: Level,
}

impl<L: InputLine> Button<L> {
    /// Registers the poll and debounce timed events against the mailbox of
    /// `declared`.
    pub fn new(
        wiring: &mut Wiring,
        declared: &Declared,
        line: L,
        publisher: Publisher,
        config: ButtonConfig,
    ) -> Result<Self, WiringError> {
        if config.debounce >= config.poll_period {
            // Each poll would restart the window before it elapses.
            log::warn!(
                "`{}`: debounce {:?} not shorter than poll period {:?}, a steady change never commits",
                declared.name(),
                config.debounce,
                config.poll_period
            );
        }

        let poll = wiring.timed_event(
            TimedEventConfig::new("button-poll", POLL_SIG, config.poll_period).periodic(),
            declared.mailbox(),
        )?;
        let debounce = wiring.timed_event(
            TimedEventConfig::new("button-debounce", DEBOUNCED_SIG, config.debounce),
            declared.mailbox(),
        )?;

        Ok(Self {
            stable: line.level(),
            line,
            publisher,
            config,
            poll,
            debounce,
        })
    }

    /// Last committed level of the line.
    pub fn stable_level(&self) -> Level {
        self.stable
    }

    /// Whether a debounce window is currently running.
    pub fn is_debouncing(&self) -> bool {
        self.debounce.is_armed()
    }

    fn on_poll(&mut self) {
        if self.line.level() != self.stable {
            self.debounce.arm();
        }
    }

    fn on_debounced(&mut self, ctx: &ActiveContext) {
        let level = self.line.level();
        if level == self.stable {
            log::debug!("`{}`: noise rejected", ctx.name());
            return;
        }

        self.stable = level;
        log::debug!("`{}`: line settled {:?}", ctx.name(), level);
        let edge = if self.config.polarity.is_active(level) {
            PRESSED_SIG
        } else {
            RELEASED_SIG
        };
        ctx.post_self(Event::new(edge));
    }
}

impl<L: InputLine> ActiveBehavior for Button<L> {
    fn on_event(&mut self, ctx: &mut ActiveContext, event: Event) {
        match event.signal() {
            Signal::INIT => {
                self.stable = self.line.level();
                self.poll.arm();
                ctx.post_self(Event::new(POLL_SIG));
                log::debug!("`{}`: initial level {:?}", ctx.name(), self.stable);
            }
            POLL_SIG => self.on_poll(),
            DEBOUNCED_SIG => self.on_debounced(ctx),
            PRESSED_SIG => {
                log::debug!("`{}`: pressed", ctx.name());
                self.publisher.publish(self.config.pressed_kind);
            }
            RELEASED_SIG => {
                log::debug!("`{}`: released", ctx.name());
                self.publisher.publish(self.config.released_kind);
            }
            other => log::trace!("`{}`: ignoring {other}", ctx.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SimulatedLine;
    use ao::{ActiveConfig, Clock, Inbox, RuntimeConfig};

    const PRESSED: Signal = Signal::user(10);
    const RELEASED: Signal = Signal::user(11);

    struct Harness {
        button: Button<SimulatedLine>,
        line: SimulatedLine,
        ctx: ActiveContext,
        /// Events the button posted to itself.
        own: Inbox,
        published: Inbox,
        // Keeps the wheel alive; never started.
        _wiring: Wiring,
    }

    fn harness(config: ButtonConfig) -> Harness {
        let timeout = Duration::from_millis(1);
        let mut wiring = Wiring::new(RuntimeConfig::builder().clock(Clock::Manual).build());
        let declared = wiring.declare(ActiveConfig::new("button")).unwrap();
        let (broker, published) = ao::mailbox("broker", 8, timeout).unwrap();
        let (mailbox, own) = ao::mailbox("button", 8, timeout).unwrap();

        let line = SimulatedLine::new(Level::High);
        let button = Button::new(
            &mut wiring,
            &declared,
            line.clone(),
            Publisher::new(&broker),
            config,
        )
        .unwrap();
        Harness {
            button,
            line,
            ctx: ActiveContext::new("button", mailbox),
            own,
            published,
            _wiring: wiring,
        }
    }

    impl Harness {
        fn send(&mut self, signal: Signal) {
            self.button.on_event(&mut self.ctx, Event::new(signal));
        }

        /// Signals the button posted to itself since the last call.
        fn self_posted(&self) -> Vec<Signal> {
            std::iter::from_fn(|| self.own.try_receive())
                .map(|event| event.signal())
                .collect()
        }
    }

    #[test]
    fn init_samples_line_and_arms_poll() {
        let mut h = harness(ButtonConfig::new(PRESSED, RELEASED));
        h.line.set(Level::Low);
        h.send(Signal::INIT);

        assert_eq!(h.button.stable_level(), Level::Low);
        assert!(h.button.poll.is_armed());
        assert!(!h.button.is_debouncing());
        assert_eq!(h.self_posted(), vec![POLL_SIG]);
    }

    #[test]
    fn poll_without_change_does_nothing() {
        let mut h = harness(ButtonConfig::new(PRESSED, RELEASED));
        h.send(Signal::INIT);
        h.self_posted();
        h.send(POLL_SIG);
        assert!(!h.button.is_debouncing());
        assert!(h.self_posted().is_empty());
    }

    #[test]
    fn confirmed_press_goes_through_local_signal() {
        let mut h = harness(ButtonConfig::new(PRESSED, RELEASED));
        h.send(Signal::INIT);
        h.self_posted();
        h.line.set(Level::Low);
        h.send(POLL_SIG);
        assert!(h.button.is_debouncing());

        h.send(DEBOUNCED_SIG);
        assert_eq!(h.button.stable_level(), Level::Low);
        assert_eq!(h.self_posted(), vec![PRESSED_SIG]);
        // Nothing global until the local PRESSED is handled.
        assert!(h.published.try_receive().is_none());

        h.send(PRESSED_SIG);
        assert_eq!(
            h.published.try_receive().map(|e| e.signal()),
            Some(PRESSED)
        );
    }

    #[test]
    fn reverted_line_is_noise() {
        let mut h = harness(ButtonConfig::new(PRESSED, RELEASED));
        h.send(Signal::INIT);
        h.self_posted();
        h.line.set(Level::Low);
        h.send(POLL_SIG);
        h.line.set(Level::High);
        h.send(DEBOUNCED_SIG);

        assert_eq!(h.button.stable_level(), Level::High);
        assert!(h.self_posted().is_empty());
        assert!(h.published.try_receive().is_none());
    }

    #[test]
    fn active_high_swaps_edges() {
        let mut h = harness(
            ButtonConfig::new(PRESSED, RELEASED).with_polarity(Polarity::ActiveHigh),
        );
        h.line.set(Level::Low);
        h.send(Signal::INIT);
        h.self_posted();

        h.line.set(Level::High);
        h.send(POLL_SIG);
        h.send(DEBOUNCED_SIG);
        assert_eq!(h.button.stable_level(), Level::High);
        assert_eq!(h.self_posted(), vec![PRESSED_SIG]);

        h.line.set(Level::Low);
        h.send(POLL_SIG);
        h.send(DEBOUNCED_SIG);
        assert_eq!(h.button.stable_level(), Level::Low);
        assert_eq!(h.self_posted(), vec![RELEASED_SIG]);
    }

    #[test]
    fn active_low_release_reports_released() {
        let mut h = harness(ButtonConfig::new(PRESSED, RELEASED));
        h.line.set(Level::Low);
        h.send(Signal::INIT);
        h.self_posted();

        h.line.set(Level::High);
        h.send(POLL_SIG);
        h.send(DEBOUNCED_SIG);
        assert_eq!(h.self_posted(), vec![RELEASED_SIG]);

        h.send(RELEASED_SIG);
        assert_eq!(
            h.published.try_receive().map(|e| e.signal()),
            Some(RELEASED)
        );
    }

    #[test]
    fn defaults_match_pulled_up_switch() {
        let config = ButtonConfig::new(PRESSED, RELEASED);
        assert_eq!(config.poll_period, Duration::from_millis(50));
        assert_eq!(config.debounce, Duration::from_millis(15));
        assert_eq!(config.polarity, Polarity::ActiveLow);
    }
}

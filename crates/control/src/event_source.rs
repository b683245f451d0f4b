//! Event sources driving an `EventHandler`

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;
use simcore::{ContractViolation, EventHandler, LoopEvent};

/// Ticks delivered at most per `advance`; older backlog is dropped.
pub const DEFAULT_MAX_CATCH_UP: u32 = 5;

/// Fixed-period timer fed with wall-clock time.
///
/// Elapsed time accumulates until it covers whole periods, which are
/// returned as ticks. The remainder carries over to the next call.
#[derive(Debug, Clone)]
pub struct TickClock {
    period: Duration,
    accumulator: Duration,
    max_catch_up: u32,
    stopped: bool,
}

impl TickClock {
    /// Clock ticking every `timestep_seconds`, rounded to whole milliseconds.
    pub fn new(timestep_seconds: f64) -> Result<Self, ContractViolation> {
        ContractViolation::check_positive("timestep", timestep_seconds)?;
        let millis = ((timestep_seconds * 1000.0).round() as u64).max(1);
        Ok(TickClock {
            period: Duration::from_millis(millis),
            accumulator: Duration::ZERO,
            max_catch_up: DEFAULT_MAX_CATCH_UP,
            stopped: false,
        })
    }

    pub fn with_max_catch_up(mut self, max_catch_up: u32) -> Self {
        self.max_catch_up = max_catch_up.max(1);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn period_millis(&self) -> u64 {
        self.period.as_millis() as u64
    }

    /// Add `elapsed` and return the number of whole periods now due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.stopped {
            return 0;
        }
        self.accumulator += elapsed;

        let period = self.period.as_nanos();
        let due = self.accumulator.as_nanos() / period;
        let remainder = self.accumulator.as_nanos() % period;
        self.accumulator = Duration::from_nanos(remainder as u64);

        if due > self.max_catch_up as u128 {
            debug!("tick clock behind by {} periods, dropping backlog", due);
            self.max_catch_up
        } else {
            due as u32
        }
    }

    /// Time until the next tick is due.
    pub fn until_next(&self) -> Duration {
        self.period.saturating_sub(self.accumulator)
    }

    /// Stop delivering ticks. Idempotent.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.accumulator = Duration::ZERO;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// FIFO of pending events, dispatched in delivery order.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<LoopEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: LoopEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Deliver every queued event to `handler`.
    ///
    /// Once the handler reports stopped, the rest of the queue is discarded.
    /// Returns the number of events delivered.
    pub fn dispatch_all<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.events.pop_front() {
            if handler.is_stopped() {
                debug!("handler stopped, dropping {} queued events", self.events.len() + 1);
                self.events.clear();
                break;
            }
            handler.handle(&event);
            delivered += 1;
        }
        delivered
    }
}

impl Extend<LoopEvent> for EventQueue {
    fn extend<T: IntoIterator<Item = LoopEvent>>(&mut self, iter: T) {
        self.events.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcore::Key;

    #[test]
    fn test_period_from_timestep() {
        assert_eq!(TickClock::new(0.01).unwrap().period_millis(), 10);
        assert_eq!(TickClock::new(0.0001).unwrap().period_millis(), 1);
        assert!(TickClock::new(-0.01).is_err());
        assert!(TickClock::new(f64::NAN).is_err());
    }

    #[test]
    fn test_advance_accumulates() {
        let mut clock = TickClock::new(0.01).unwrap();
        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert_eq!(clock.advance(Duration::from_millis(7)), 1);
        assert_eq!(clock.until_next(), Duration::from_millis(9));
        assert_eq!(clock.advance(Duration::from_millis(29)), 3);
    }

    #[test]
    fn test_advance_caps_backlog() {
        let mut clock = TickClock::new(0.01).unwrap().with_max_catch_up(2);
        assert_eq!(clock.advance(Duration::from_secs(1)), 2);
        assert_eq!(clock.advance(Duration::from_millis(10)), 1);
    }

    #[test]
    fn test_stopped_clock_is_silent() {
        let mut clock = TickClock::new(0.01).unwrap();
        clock.stop();
        clock.stop();
        assert!(clock.is_stopped());
        assert_eq!(clock.advance(Duration::from_secs(1)), 0);
    }

    #[derive(Default)]
    struct Log {
        events: Vec<LoopEvent>,
        stopped: bool,
    }

    impl EventHandler for Log {
        fn on_timer_tick(&mut self) {
            self.events.push(LoopEvent::TimerTick);
        }
        fn on_key_press(&mut self, key: &Key) {
            self.events.push(LoopEvent::KeyPress(key.clone()));
        }
        fn on_shutdown(&mut self) {
            self.events.push(LoopEvent::Shutdown);
            self.stopped = true;
        }
        fn is_stopped(&self) -> bool {
            self.stopped
        }
    }

    #[test]
    fn test_dispatch_in_order_until_stopped() {
        let mut queue = EventQueue::new();
        queue.extend([
            LoopEvent::KeyPress(Key::Up),
            LoopEvent::TimerTick,
            LoopEvent::Shutdown,
            LoopEvent::TimerTick,
            LoopEvent::Shutdown,
        ]);
        let mut log = Log::default();

        assert_eq!(queue.dispatch_all(&mut log), 3);
        assert_eq!(
            log.events,
            vec![LoopEvent::KeyPress(Key::Up), LoopEvent::TimerTick, LoopEvent::Shutdown]
        );
        assert!(queue.is_empty());
    }
}

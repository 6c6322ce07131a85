//! Which automatic speech bubble to show, and when.
//!
//! The scheduler is pure: callers pass the current instant and a random roll
//! in `[0, 1)`, so a decision can be replayed exactly in tests.

use std::time::{Duration, Instant};

use crate::config::BubbleSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    /// The current time.
    Clock,
    /// A weather line for the configured city.
    Weather,
    /// A short tip generated by the model.
    Tip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleDecision {
    /// The user is busy with the pet; try again after the next delay.
    Postpone,
    /// Nothing is due this round.
    Quiet,
    Speak(BubbleKind),
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    busy_until: Option<Instant>,
    last_weather: Option<Instant>,
    last_tip: Option<Instant>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(
        &self,
        now: Instant,
        roll: f64,
        input_open: bool,
        schedule: &BubbleSchedule,
    ) -> BubbleDecision {
        if input_open || self.busy_until.is_some_and(|until| now < until) {
            return BubbleDecision::Postpone;
        }

        if roll < schedule.clock_chance {
            return BubbleDecision::Speak(BubbleKind::Clock);
        }
        if roll < schedule.weather_chance
            && elapsed(self.last_weather, now, schedule.weather_cooldown)
        {
            return BubbleDecision::Speak(BubbleKind::Weather);
        }
        if elapsed(self.last_tip, now, schedule.tip_cooldown) {
            return BubbleDecision::Speak(BubbleKind::Tip);
        }
        BubbleDecision::Quiet
    }

    /// Stamps the cooldown for `kind`. Clock bubbles have none.
    pub fn record(&mut self, kind: BubbleKind, now: Instant) {
        match kind {
            BubbleKind::Clock => {}
            BubbleKind::Weather => self.last_weather = Some(now),
            BubbleKind::Tip => self.last_tip = Some(now),
        }
    }

    /// Keeps automatic bubbles quiet for `silence_after_chat` from `now`.
    pub fn hold(&mut self, now: Instant, schedule: &BubbleSchedule) {
        self.busy_until = Some(now + schedule.silence_after_chat);
    }

    pub fn resume(&mut self) {
        self.busy_until = None;
    }

    pub fn is_holding(&self, now: Instant) -> bool {
        self.busy_until.is_some_and(|until| now < until)
    }
}

fn elapsed(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    match last {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= cooldown,
    }
}

impl BubbleSchedule {
    /// Delay before the next automatic bubble; `roll` in `[0, 1]` picks a
    /// point between `min_delay` and `max_delay`. A non-finite roll counts
    /// as `0`.
    pub fn next_delay(&self, roll: f64) -> Duration {
        let span = self.max_delay.saturating_sub(self.min_delay);
        let roll = if roll.is_finite() { roll.clamp(0.0, 1.0) } else { 0.0 };
        self.min_delay + span.mul_f64(roll)
    }
}

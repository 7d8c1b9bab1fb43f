//! Periodic sensor monitoring
//!
//! Polls each sensor on its own period over one client connection. Every
//! period is a multiple of the schedule tick: on each tick the monitor sends
//! the sensor queries that are due, stamps the replies with the local time and
//! keeps the last few readings per sensor.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::client::Client;
use crate::error::{FlowerpotError, Result};
use crate::protocol::Command;

/// Readings kept per sensor by default
pub const DEFAULT_HISTORY_LEN: usize = 5;

const MINUTE: u64 = 60;

// =============================================================================
// Schedule
// =============================================================================

/// Which sensors to poll and how often
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    tick: Duration,
    periods: Vec<(Command, Duration)>,
}

impl PollSchedule {
    /// An empty schedule advancing by `tick`
    pub fn new(tick: Duration) -> Result<Self> {
        if tick.is_zero() {
            return Err(FlowerpotError::Config(
                "poll tick must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            tick,
            periods: Vec::new(),
        })
    }

    /// Build a schedule whose tick is the largest common factor of `periods`
    pub fn from_periods(periods: &[(Command, Duration)]) -> Result<Self> {
        let tick = common_factor(periods.iter().map(|(_, period)| *period)).ok_or_else(|| {
            FlowerpotError::Config("no sensor has a poll period".to_string())
        })?;

        periods
            .iter()
            .try_fold(Self::new(tick)?, |schedule, (command, period)| {
                schedule.with_period(*command, *period)
            })
    }

    /// Poll `command` every `period`, replacing any earlier period for it
    pub fn with_period(mut self, command: Command, period: Duration) -> Result<Self> {
        if !command.has_data() {
            return Err(FlowerpotError::Config(format!(
                "{} is not a sensor query",
                command.name()
            )));
        }
        if period.is_zero() || period.as_millis() % self.tick.as_millis() != 0 {
            return Err(FlowerpotError::Config(format!(
                "{} period ({:?}) is not a multiple of the tick ({:?})",
                command.name(),
                period,
                self.tick
            )));
        }

        match self.periods.iter_mut().find(|(c, _)| *c == command) {
            Some(entry) => entry.1 = period,
            None => self.periods.push((command, period)),
        }
        Ok(self)
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn periods(&self) -> &[(Command, Duration)] {
        &self.periods
    }

    /// Sensors due on tick number `tick_index` (tick 0 polls everything)
    pub fn due(&self, tick_index: u64) -> impl Iterator<Item = Command> + '_ {
        let elapsed_ms = self.tick.as_millis() * u128::from(tick_index);
        self.periods
            .iter()
            .filter(move |(_, period)| elapsed_ms % period.as_millis() == 0)
            .map(|(command, _)| *command)
    }
}

impl Default for PollSchedule {
    /// Light and temperature every 15 minutes, humidity and moisture hourly,
    /// fertilizer and water every two hours
    fn default() -> Self {
        let minutes = |m: u64| Duration::from_secs(m * MINUTE);
        Self {
            tick: minutes(15),
            periods: vec![
                (Command::GetTemperature, minutes(15)),
                (Command::GetHumidity, minutes(60)),
                (Command::GetLight, minutes(15)),
                (Command::GetWater, minutes(120)),
                (Command::GetMoisture, minutes(60)),
                (Command::GetFertilizer, minutes(120)),
            ],
        }
    }
}

/// Largest duration (in whole ms) dividing every non-zero period
pub fn common_factor(periods: impl IntoIterator<Item = Duration>) -> Option<Duration> {
    fn gcd(a: u128, b: u128) -> u128 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }

    let ms = periods
        .into_iter()
        .map(|p| p.as_millis())
        .filter(|&p| p > 0)
        .fold(0, gcd);

    (ms > 0).then(|| Duration::from_millis(ms as u64))
}

// =============================================================================
// Readings
// =============================================================================

/// A sensor value and when it was received
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub command: Command,
    pub value: f32,
    pub at: DateTime<Local>,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.command.name(),
            self.value
        )
    }
}

// =============================================================================
// Monitor
// =============================================================================

/// Drives a [`PollSchedule`] over a [`Client`]
#[derive(Debug)]
pub struct Monitor {
    schedule: PollSchedule,
    history_len: usize,
    history: HashMap<Command, VecDeque<Reading>>,
    ticks: u64,
}

impl Monitor {
    /// Create a monitor keeping at most `history_len` readings per sensor
    pub fn new(schedule: PollSchedule, history_len: usize) -> Self {
        Self {
            schedule,
            history_len: history_len.max(1),
            history: HashMap::new(),
            ticks: 0,
        }
    }

    pub fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    /// Ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Stored readings for `command`, oldest first
    pub fn history(&self, command: Command) -> impl Iterator<Item = &Reading> + '_ {
        self.history.get(&command).into_iter().flatten()
    }

    pub fn latest(&self, command: Command) -> Option<&Reading> {
        self.history.get(&command).and_then(|readings| readings.back())
    }

    /// Run one tick: query every due sensor and return the new readings
    ///
    /// A sensor answering ERR is logged and skipped. Transport errors end the
    /// tick and are returned.
    pub fn poll(&mut self, client: &mut Client) -> Result<Vec<Reading>> {
        let due: Vec<Command> = self.schedule.due(self.ticks).collect();
        let mut readings = Vec::with_capacity(due.len());

        for command in due {
            tracing::debug!("Polling {} (tick {})", command.name(), self.ticks);
            let response = client.command(command)?;

            match response.data {
                Some(value) if response.status.is_ok() => {
                    let reading = Reading {
                        command,
                        value,
                        at: Local::now(),
                    };
                    self.record(reading);
                    readings.push(reading);
                }
                _ => tracing::warn!("{} failed: {}", command.name(), response),
            }
        }

        self.ticks += 1;
        Ok(readings)
    }

    /// Poll on every tick until `max_ticks` have run, or forever with `None`
    pub fn run<F>(
        &mut self,
        client: &mut Client,
        max_ticks: Option<u64>,
        mut on_reading: F,
    ) -> Result<()>
    where
        F: FnMut(&Reading),
    {
        loop {
            for reading in self.poll(client)? {
                on_reading(&reading);
            }

            if max_ticks.is_some_and(|max| self.ticks >= max) {
                return Ok(());
            }
            thread::sleep(self.schedule.tick());
        }
    }

    fn record(&mut self, reading: Reading) {
        let readings = self.history.entry(reading.command).or_default();
        readings.push_back(reading);
        while readings.len() > self.history_len {
            readings.pop_front();
        }
    }
}

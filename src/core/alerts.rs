//! Alert rules and per-sensor alert evaluation.
//!
//! A rule is a `+` separated list of clauses, each an allowed range with an
//! optional time-of-day window:
//!
//! ```text
//! 76-80                             always between 76 and 80
//! 08:00-20:00=600-1023+21:00-07:00=0-50
//! 0                                 exactly 0
//! ```
//!
//! A value breaches the rule if it falls outside the range of any clause
//! that applies at the current time.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::config::SensorDecl;
use crate::error::{ReefError, Result};

/// Grace period after start-up before any alert can fire
pub const WARM_UP_SECS: i64 = 90;

/// Daily window `[start, end)`, wrapping past midnight when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Parse `HH:MM-HH:MM`
    pub fn parse(text: &str) -> Result<Self> {
        let (start, end) = text
            .split_once('-')
            .ok_or_else(|| ReefError::config(format!("time window needs start-end: {:?}", text)))?;
        Ok(Self {
            start: parse_clock(start)?,
            end: parse_clock(end)?,
        })
    }

    pub fn contains(&self, now: NaiveDateTime) -> bool {
        let today = now.date();
        let start = today.and_time(self.start);
        let mut end = today.and_time(self.end);
        if self.start > self.end {
            end += TimeDelta::days(1);
        }
        let tomorrow = now + TimeDelta::days(1);

        (start <= now && now < end) || (start <= tomorrow && tomorrow < end)
    }
}

fn parse_clock(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|_| ReefError::config(format!("invalid HH:MM time: {:?}", text)))
}

/// One allowed range, optionally restricted to a time window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clause {
    pub window: Option<TimeWindow>,
    pub low: f64,
    pub high: f64,
}

impl Clause {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (window, range) = if text.contains(':') {
            let (window, range) = text.split_once('=').ok_or_else(|| {
                ReefError::config(format!("timed clause needs window=range: {:?}", text))
            })?;
            (Some(TimeWindow::parse(window)?), range)
        } else {
            (None, text)
        };

        let (low, high) = parse_range(range.trim())?;
        Ok(Self { window, low, high })
    }

    pub fn applies(&self, now: NaiveDateTime) -> bool {
        self.window.map_or(true, |w| w.contains(now))
    }

    pub fn violated_by(&self, value: f64) -> bool {
        value < self.low || value > self.high
    }
}

/// `low-high` or a single exact value. A leading minus belongs to `low`.
fn parse_range(text: &str) -> Result<(f64, f64)> {
    let number = |s: &str| -> Result<f64> {
        s.trim()
            .parse()
            .map_err(|_| ReefError::config(format!("invalid number in rule: {:?}", s)))
    };

    let split = text.get(1..).and_then(|rest| rest.find('-')).map(|i| i + 1);
    match split {
        Some(i) => Ok((number(&text[..i])?, number(&text[i + 1..])?)),
        None => {
            let value = number(text)?;
            Ok((value, value))
        }
    }
}

/// Ordered clauses, ORed together
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    clauses: Vec<Clause>,
}

impl AlertRule {
    pub fn parse(text: &str) -> Result<Self> {
        let clauses = text
            .split('+')
            .map(Clause::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn breached(&self, value: f64, now: NaiveDateTime) -> bool {
        self.clauses
            .iter()
            .any(|clause| clause.applies(now) && clause.violated_by(value))
    }
}

/// An alert raised for one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub label: String,
    pub value: f64,
    pub message: String,
}

/// Result of one evaluation. The value is passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub alert: Option<Alert>,
}

/// Per-sensor alert state: warm-up gate and nag suppression
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    label: String,
    rule: AlertRule,
    nag: TimeDelta,
    warm_up: TimeDelta,
    started: NaiveDateTime,
    armed: bool,
    last_alert: Option<NaiveDateTime>,
}

impl AlertEvaluator {
    pub fn new<S: Into<String>>(
        label: S,
        rule: AlertRule,
        nag_hours: u32,
        started: NaiveDateTime,
    ) -> Self {
        Self {
            label: label.into(),
            rule,
            nag: TimeDelta::hours(i64::from(nag_hours)),
            warm_up: TimeDelta::seconds(WARM_UP_SECS),
            started,
            armed: false,
            last_alert: None,
        }
    }

    pub fn from_decl(decl: &SensorDecl, started: NaiveDateTime) -> Result<Self> {
        let rule = AlertRule::parse(&decl.rule).map_err(|e| {
            ReefError::config(format!("sensor {:?}: {}", decl.label, e))
        })?;
        Ok(Self::new(decl.label.clone(), rule, decl.nag_hours, started))
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn last_alert(&self) -> Option<NaiveDateTime> {
        self.last_alert
    }

    pub fn rule(&self) -> &AlertRule {
        &self.rule
    }

    /// Evaluate `value` at `now`.
    ///
    /// Until armed, nothing is evaluated. Arming needs the warm-up to have
    /// elapsed and a non-negative (available) value.
    pub fn test(&mut self, value: f64, now: NaiveDateTime) -> Evaluation {
        if !self.armed {
            if value < 0.0 || now < self.started + self.warm_up {
                return Evaluation { value, alert: None };
            }
            self.armed = true;
        }

        if !self.rule.breached(value, now) {
            return Evaluation { value, alert: None };
        }

        let nagged_recently = self
            .last_alert
            .is_some_and(|last| now - last < self.nag);
        if nagged_recently {
            return Evaluation { value, alert: None };
        }

        self.last_alert = Some(now);
        warn!("{} out of range: {}", self.label, value);
        Evaluation {
            value,
            alert: Some(Alert {
                label: self.label.clone(),
                value,
                message: format!("{} Alert!", self.label),
            }),
        }
    }
}

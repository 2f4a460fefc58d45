//! Date-range controller
//!
//! Holds the active observation window and acts as the acceptance gate for
//! live events. Every mutation is mirrored to the view's [`Location`].

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::location::Location;

/// Length of the default window, ending now
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Observation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// When set, `to` tracks "now" and only `from` is enforced
    pub is_to_date_live: bool,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>, is_to_date_live: bool) -> Result<Self> {
        if from > to {
            return Err(SyncError::InvalidRange(format!(
                "from {} is after to {}",
                format_instant(from),
                format_instant(to)
            )));
        }
        Ok(Self {
            from,
            to,
            is_to_date_live,
        })
    }

    /// Last seven days, live
    pub fn default_at(now: DateTime<Utc>) -> Self {
        Self {
            from: now - Duration::days(DEFAULT_WINDOW_DAYS),
            to: now,
            is_to_date_live: true,
        }
    }

    /// Restore a range from the location's `from`/`to` parameters.
    ///
    /// Missing, malformed, inverted or future-dated values fall back to the
    /// default range without surfacing an error.
    pub fn from_location(location: &dyn Location, now: DateTime<Utc>) -> Self {
        let from = location.query_param("from").and_then(|v| parse_instant(&v));
        let to = location.query_param("to").and_then(|v| parse_instant(&v));

        match (from, to) {
            (Some(from), Some(to)) if from <= to && to <= now => Self {
                from,
                to,
                is_to_date_live: false,
            },
            _ => Self::default_at(now),
        }
    }

    /// Acceptance gate for a live event timestamp
    pub fn accepts(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.from && (self.is_to_date_live || timestamp <= self.to)
    }
}

/// Format an instant the way it is written to the location
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse `YYYY-MM-DDTHH:mm:ss(.sss)?Z`
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let body = raw.strip_suffix('Z')?;
    let (date_time, fraction) = match body.split_once('.') {
        Some((date_time, fraction)) => (date_time, Some(fraction)),
        None => (body, None),
    };

    if date_time.len() != 19 {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(date_time, "%Y-%m-%dT%H:%M:%S").ok()?;

    let millis = match fraction {
        Some(f) if f.len() == 3 && f.bytes().all(|b| b.is_ascii_digit()) => f.parse::<i64>().ok()?,
        Some(_) => return None,
        None => 0,
    };

    Some(Utc.from_utc_datetime(&naive) + Duration::milliseconds(millis))
}

/// Owner of the active [`DateRange`]
pub struct DateRangeController {
    state: watch::Sender<DateRange>,
    location: Arc<dyn Location>,
    clock: Arc<dyn Clock>,
}

impl DateRangeController {
    /// Create a controller initialized from the location
    pub fn new(location: Arc<dyn Location>, clock: Arc<dyn Clock>) -> Self {
        let initial = DateRange::from_location(location.as_ref(), clock.now());
        info!(
            from = %format_instant(initial.from),
            to = %format_instant(initial.to),
            live = initial.is_to_date_live,
            "Date range initialized"
        );

        let (state, _) = watch::channel(initial);
        Self {
            state,
            location,
            clock,
        }
    }

    /// Current range
    pub fn current(&self) -> DateRange {
        *self.state.borrow()
    }

    /// Receive every range change
    pub fn subscribe(&self) -> watch::Receiver<DateRange> {
        self.state.subscribe()
    }

    pub fn set_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        is_to_date_live: bool,
    ) -> Result<()> {
        self.commit(DateRange::new(from, to, is_to_date_live)?);
        Ok(())
    }

    /// Move the lower bound. A live window also slides `to` up to now, so a
    /// `from` between the last tick and now is accepted.
    pub fn set_from(&self, from: DateTime<Utc>) -> Result<()> {
        let current = self.current();
        let to = if current.is_to_date_live {
            current.to.max(self.clock.now())
        } else {
            current.to
        };
        self.commit(DateRange::new(from, to, current.is_to_date_live)?);
        Ok(())
    }

    pub fn set_to(&self, to: DateTime<Utc>, is_to_date_live: bool) -> Result<()> {
        let current = self.current();
        self.commit(DateRange::new(current.from, to, is_to_date_live)?);
        Ok(())
    }

    /// Return to the default seven-day live window
    pub fn reset(&self) {
        self.commit(DateRange::default_at(self.clock.now()));
    }

    /// Slide `to` forward to now when the window is live.
    ///
    /// Returns whether the range changed.
    pub fn update_to_if_live(&self) -> bool {
        let current = self.current();
        if !current.is_to_date_live {
            return false;
        }

        let now = self.clock.now().max(current.from);
        if now == current.to {
            return false;
        }

        self.commit(DateRange { to: now, ..current });
        true
    }

    fn commit(&self, range: DateRange) {
        let from = format_instant(range.from);
        let to = format_instant(range.to);
        debug!(%from, %to, live = range.is_to_date_live, "Date range updated");

        self.state.send_replace(range);
        self.location.replace_range(&from, &to);
    }
}

//! Aggregate statistics over persisted phase rows.
//!
//! Recomputed from scratch on every request; nothing here is cached or
//! persisted. "Current month" means the calendar month containing `now` in
//! `now`'s time zone (local time in production).

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Local, TimeZone};
use serde::Serialize;

use crate::phase::PhaseKind;
use crate::store::PersistedRow;

/// Count, total and mean duration for one group of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhaseAverage {
    pub count: u64,
    /// Saturates at the `i64` bounds; the mean is taken from the exact sum.
    pub total_ms: i64,
    pub average_ms: f64,
    #[serde(skip)]
    sum_ms: i128,
}

impl PhaseAverage {
    fn add(&mut self, duration_ms: i64) {
        self.count += 1;
        self.sum_ms += i128::from(duration_ms);
    }

    fn finish(&mut self) {
        self.total_ms = i64::try_from(self.sum_ms).unwrap_or(if self.sum_ms < 0 {
            i64::MIN
        } else {
            i64::MAX
        });
        self.average_ms = if self.count == 0 {
            0.0
        } else {
            self.sum_ms as f64 / self.count as f64
        };
    }
}

/// Overall and per-kind averages for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub overall: PhaseAverage,
    /// Always holds every tracked kind, zeroed when it has no rows.
    pub per_phase: BTreeMap<PhaseKind, PhaseAverage>,
}

impl Default for PeriodStats {
    fn default() -> Self {
        PeriodStats {
            overall: PhaseAverage::default(),
            per_phase: PhaseKind::TRACKED
                .iter()
                .map(|kind| (*kind, PhaseAverage::default()))
                .collect(),
        }
    }
}

impl PeriodStats {
    fn add(&mut self, kind: Option<PhaseKind>, duration_ms: i64) {
        self.overall.add(duration_ms);
        if let Some(kind) = kind.filter(|k| k.is_persistable()) {
            self.per_phase.entry(kind).or_default().add(duration_ms);
        }
    }

    fn finish(&mut self) {
        self.overall.finish();
        for average in self.per_phase.values_mut() {
            average.finish();
        }
    }

    pub fn average_ms(&self) -> f64 {
        self.overall.average_ms
    }

    pub fn average_for(&self, kind: PhaseKind) -> f64 {
        self.per_phase.get(&kind).map_or(0.0, |a| a.average_ms)
    }

    pub fn count_for(&self, kind: PhaseKind) -> u64 {
        self.per_phase.get(&kind).map_or(0, |a| a.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub all_time: PeriodStats,
    pub current_month: PeriodStats,
}

/// Stateless: every call is a pure function of the rows and the reference time.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    pub fn new() -> Self {
        StatisticsAggregator
    }

    /// Computes statistics with the current local date as "this month".
    pub fn compute(&self, rows: &[PersistedRow]) -> AggregateStats {
        self.compute_at(rows, &Local::now())
    }

    /// Computes statistics treating `now` as the current moment. Row dates are
    /// interpreted in `now`'s time zone.
    pub fn compute_at<Tz: TimeZone>(&self, rows: &[PersistedRow], now: &DateTime<Tz>) -> AggregateStats {
        let mut stats = AggregateStats::default();
        let zone = now.timezone();

        for row in rows {
            let kind = row.kind();
            stats.all_time.add(kind, row.duration);

            let in_current_month = zone
                .timestamp_millis_opt(row.date)
                .single()
                .is_some_and(|date| date.year() == now.year() && date.month() == now.month());
            if in_current_month {
                stats.current_month.add(kind, row.duration);
            }
        }

        stats.all_time.finish();
        stats.current_month.finish();
        stats
    }
}

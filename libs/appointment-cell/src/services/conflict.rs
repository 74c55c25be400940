// libs/appointment-cell/src/services/conflict.rs
//! Pairwise overlap detection for a candidate against a doctor's day.
//!
//! Pure functions only: callers fetch the existing appointments and decide
//! what a conflict means for their response. Working hours are checked
//! separately through [`WorkingHours::contains`](super::availability::WorkingHours::contains).

use crate::models::SchedulingError;
use crate::services::interval::{Interval, Scheduled};

/// Whether `candidate` overlaps any entry of `existing` booked for the same
/// doctor and date. Entries for other doctors or dates are ignored; there is
/// no identity-based self-exclusion, so a stored copy of the candidate counts.
///
/// Every interval is validated before any comparison, so the call either
/// answers for the whole list or fails.
pub fn has_conflict<C, E>(candidate: &C, existing: &[E]) -> Result<bool, SchedulingError>
where
    C: Scheduled + ?Sized,
    E: Scheduled,
{
    let wanted = candidate.interval()?;
    let booked = same_day_intervals(candidate, existing)?;

    Ok(booked.iter().any(|(_, interval)| interval.overlaps(&wanted)))
}

/// Same rule as [`has_conflict`] for an interval that is not attached to a
/// doctor yet; `existing` must already be scoped to one doctor and date.
pub fn interval_has_conflict(wanted: &Interval, existing: &[Interval]) -> bool {
    existing.iter().any(|interval| interval.overlaps(wanted))
}

/// The entries of `existing` that overlap `candidate`, in input order.
pub fn find_conflicts<'a, C, E>(candidate: &C, existing: &'a [E]) -> Result<Vec<&'a E>, SchedulingError>
where
    C: Scheduled + ?Sized,
    E: Scheduled,
{
    let wanted = candidate.interval()?;
    let booked = same_day_intervals(candidate, existing)?;

    Ok(booked
        .into_iter()
        .filter(|(_, interval)| interval.overlaps(&wanted))
        .map(|(entry, _)| entry)
        .collect())
}

/// Intervals of every entry sharing the candidate's doctor and date.
pub fn same_day_intervals<'a, C, E>(
    candidate: &C,
    existing: &'a [E],
) -> Result<Vec<(&'a E, Interval)>, SchedulingError>
where
    C: Scheduled + ?Sized,
    E: Scheduled,
{
    existing
        .iter()
        .filter(|entry| entry.same_day_as(candidate))
        .map(|entry| entry.interval().map(|interval| (entry, interval)))
        .collect()
}

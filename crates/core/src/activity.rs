use crate::domain::{ActivityRate, NormalizedInstant};

const MS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

/// Projects the observed post timestamps onto a 7-day posting rate.
///
/// The observed span between the earliest and latest post is extrapolated to
/// a week, whatever its length. When every post shares one timestamp there is
/// no span and the post count itself is reported.
pub fn estimate(instants: &[NormalizedInstant]) -> ActivityRate {
    if instants.is_empty() {
        return ActivityRate::NoData;
    }

    let mut sorted = instants.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let latest = sorted[0];
    let earliest = sorted[sorted.len() - 1];

    let count = sorted.len() as f64;
    let span_days = (latest - earliest).num_milliseconds() as f64 / MS_PER_DAY;

    if span_days == 0.0 {
        return ActivityRate::PerWeek(count);
    }

    ActivityRate::PerWeek(count / span_days * 7.0)
}

// src/store/ids.rs

use chrono::{DateTime, Utc};

/// Derive a submission id from `now`, unique among `taken`.
///
/// The base id is the UTC timestamp down to microseconds. Two submissions
/// created within the same tick get `-1`, `-2`, ... suffixes instead of
/// overwriting each other.
pub fn next_submission_id<'a, I>(now: DateTime<Utc>, taken: I) -> String
where
    I: IntoIterator<Item = &'a String> + Clone,
{
    let base = now.format("%Y%m%d%H%M%S%6f").to_string();
    let is_taken = |candidate: &str| taken.clone().into_iter().any(|id| id == candidate);

    if !is_taken(&base) {
        return base;
    }

    let mut n: u32 = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

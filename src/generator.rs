use std::{collections::BTreeMap, ops::RangeInclusive};

use chrono::{DateTime, Duration, TimeZone};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::types::UsageRecord;

pub const USERS: [&str; 5] = [
    "alice@example.com",
    "bob@example.com",
    "charlie@example.com",
    "diana@example.com",
    "eve@example.com",
];

pub const LANGUAGES: [&str; 7] =
    ["Python", "JavaScript", "TypeScript", "Java", "Go", "C#", "Ruby"];

pub const LANGUAGES_PER_USER: RangeInclusive<usize> = 3..=5;
pub const COMPLETIONS_PER_LANGUAGE: RangeInclusive<u32> = 10..=200;
pub const ACTIVE_HOURS: RangeInclusive<f64> = 5.0..=40.0;
pub const MAX_DAYS_SINCE_SEEN: i64 = 7;

/// Where per-request randomness comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entropy {
    Os,

    /// Every rng built from this yields the same sequence.
    Seeded(u64),
}

impl Entropy {
    #[must_use]
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or(Self::Os, Self::Seeded)
    }

    /// A fresh generator. Nothing is shared between callers.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self {
            Self::Os => StdRng::from_entropy(),
            Self::Seeded(seed) => StdRng::seed_from_u64(*seed),
        }
    }
}

/// One record per entry in [`USERS`], in that order.
pub fn generate<R, Tz>(rng: &mut R, now: DateTime<Tz>) -> Vec<UsageRecord>
where
    R: Rng + ?Sized,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    USERS
        .iter()
        .map(|user| record(&mut *rng, user, &now))
        .collect()
}

fn record<R, Tz>(rng: &mut R, user: &str, now: &DateTime<Tz>) -> UsageRecord
where
    R: Rng + ?Sized,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let n = rng.gen_range(LANGUAGES_PER_USER);
    let language_breakdown: BTreeMap<String, u32> = LANGUAGES
        .choose_multiple(rng, n)
        .map(|lang| {
            let count = rng.gen_range(COMPLETIONS_PER_LANGUAGE);
            (lang.to_string(), count)
        })
        .collect();
    let completions = language_breakdown.values().sum();
    let active_hours = round_to_tenth(rng.gen_range(ACTIVE_HOURS));
    let days_ago = rng.gen_range(0..=MAX_DAYS_SINCE_SEEN);
    let last_seen = (now.clone() - Duration::days(days_ago)).to_rfc3339();
    UsageRecord {
        user: user.to_string(),
        completions,
        active_hours,
        language_breakdown,
        last_seen,
    }
}

fn round_to_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

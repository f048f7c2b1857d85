use std::collections::BTreeMap;

use chrono::Datelike;

use lotto539_db::models::{Draw, POOL_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberStats {
    pub number: u8,
    pub frequency: u32,
    /// Draws since the number last came out (0 = in the latest draw).
    pub gap: u32,
}

pub fn is_multiple_of_three(n: u8) -> bool {
    n % 3 == 0
}

/// Frequency and gap of every number of the pool. `draws` is in ascending
/// date order.
pub fn compute_stats(draws: &[Draw]) -> Vec<NumberStats> {
    let mut stats: Vec<NumberStats> = (1..=POOL_SIZE)
        .map(|n| NumberStats {
            number: n,
            frequency: 0,
            gap: draws.len() as u32,
        })
        .collect();

    for (i, draw) in draws.iter().rev().enumerate() {
        for n in draw.numbers.iter() {
            let stat = &mut stats[(n - 1) as usize];
            if stat.frequency == 0 {
                stat.gap = i as u32;
            }
            stat.frequency += 1;
        }
    }

    stats
}

/// Per-year statistics, keyed by calendar year.
pub fn yearly_stats(draws: &[Draw]) -> BTreeMap<i32, Vec<NumberStats>> {
    let mut by_year: BTreeMap<i32, Vec<Draw>> = BTreeMap::new();
    for draw in draws {
        by_year.entry(draw.date.year()).or_default().push(draw.clone());
    }
    by_year
        .into_iter()
        .map(|(year, year_draws)| (year, compute_stats(&year_draws)))
        .collect()
}

/// How often each multiple of 3 (3, 6, ..., 39) came out.
pub fn multiples_of_three(draws: &[Draw]) -> Vec<(u8, u32)> {
    compute_stats(draws)
        .into_iter()
        .filter(|s| is_multiple_of_three(s.number))
        .map(|s| (s.number, s.frequency))
        .collect()
}

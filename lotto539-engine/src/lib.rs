pub mod backtest;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod pricing;
pub mod recommend;
pub mod stats;
pub mod transition;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate};
    use lotto539_db::models::{Draw, NumberSet, POOL_SIZE};
    use lotto539_db::store::DrawStore;
    use rand::rngs::StdRng;
    use rand::seq::index;
    use rand::SeedableRng;

    pub fn draw(date: &str, numbers: [u8; 5]) -> Draw {
        Draw {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            numbers: NumberSet::new(&numbers).unwrap(),
        }
    }

    /// Sixty seeded random draws on consecutive days, oldest first.
    pub fn sample_draws() -> Vec<Draw> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(539);
        (0..60)
            .map(|i| {
                let numbers: Vec<u8> = index::sample(&mut rng, POOL_SIZE as usize, 5)
                    .iter()
                    .map(|idx| idx as u8 + 1)
                    .collect();
                Draw {
                    date: start + Duration::days(i),
                    numbers: NumberSet::new(&numbers).unwrap(),
                }
            })
            .collect()
    }

    /// Draw store holding exactly `draws`.
    pub fn store_of(draws: Vec<Draw>) -> DrawStore {
        DrawStore::from_draws(draws)
    }
}

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use lotto539_db::models::{Draw, NumberSet};

use crate::transition::TransitionModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub number: u8,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    /// Date of the draw the recommendation was computed from.
    pub basis_date: NaiveDate,
    pub last_numbers: NumberSet,
    /// Best candidates by descending score.
    pub ranked: Vec<Candidate>,
    /// Same numbers as `ranked`, ascending, for display.
    pub top10: Vec<u8>,
    /// First picks of `ranked`, in score order.
    pub top5: Vec<u8>,
}

/// Sums the followers of every number of `latest` and ranks the result.
/// Numbers of `latest` itself are never recommended. Equal scores rank
/// by ascending number.
pub fn recommend(
    model: &TransitionModel,
    latest: &Draw,
    top_n: usize,
    pick_count: usize,
) -> Recommendation {
    let mut scores: BTreeMap<u8, u32> = BTreeMap::new();
    for n in latest.numbers.iter() {
        for f in model.followers(n) {
            *scores.entry(f.number).or_insert(0) += f.count;
        }
    }
    for n in latest.numbers.iter() {
        scores.remove(&n);
    }

    let mut ranked: Vec<Candidate> = scores
        .into_iter()
        .map(|(number, score)| Candidate { number, score })
        .collect();
    ranked.sort_by_key(|c| (Reverse(c.score), c.number));
    ranked.truncate(top_n);

    let top5: Vec<u8> = ranked.iter().take(pick_count).map(|c| c.number).collect();
    let mut top10: Vec<u8> = ranked.iter().map(|c| c.number).collect();
    top10.sort_unstable();

    Recommendation {
        basis_date: latest.date,
        last_numbers: latest.numbers,
        ranked,
        top10,
        top5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{draw, sample_draws};
    use crate::transition::MAX_FOLLOWERS;

    #[test]
    fn test_scores_are_summed_across_last_numbers() {
        let draws = vec![
            draw("2024-01-01", [1, 2, 3, 4, 5]),
            draw("2024-01-02", [10, 11, 12, 13, 14]),
            draw("2024-01-03", [1, 20, 21, 22, 23]),
            draw("2024-01-04", [10, 30, 31, 32, 33]),
        ];
        let model = TransitionModel::build(&draws, MAX_FOLLOWERS);
        let latest = draw("2024-01-05", [1, 2, 6, 7, 8]);
        let rec = recommend(&model, &latest, 10, 5);

        // 1 -> {10..14} and {10,30..33}; 2 -> {10..14}
        assert_eq!(rec.ranked[0], Candidate { number: 10, score: 3 });
        assert_eq!(rec.ranked[1], Candidate { number: 11, score: 2 });
        assert_eq!(rec.top5, vec![10, 11, 12, 13, 14]);
        assert_eq!(rec.top10, vec![10, 11, 12, 13, 14, 30, 31, 32, 33]);
        assert_eq!(rec.basis_date, latest.date);
    }

    #[test]
    fn test_never_recommends_last_numbers() {
        let draws = sample_draws();
        let model = TransitionModel::build(&draws, MAX_FOLLOWERS);
        for latest in &draws {
            let rec = recommend(&model, latest, 10, 5);
            for n in rec.top10.iter().chain(rec.top5.iter()) {
                assert!(!latest.numbers.contains(*n), "{} was just drawn", n);
            }
        }
    }

    #[test]
    fn test_top5_is_prefix_of_ranking() {
        let draws = sample_draws();
        let model = TransitionModel::build(&draws, MAX_FOLLOWERS);
        let rec = recommend(&model, draws.last().unwrap(), 10, 5);
        assert!(rec.top10.len() >= 5);
        assert_eq!(rec.top10.len(), rec.ranked.len());
        let ranked: Vec<u8> = rec.ranked.iter().map(|c| c.number).collect();
        assert_eq!(&ranked[..5], rec.top5.as_slice());
        assert!(rec.top10.windows(2).all(|w| w[0] < w[1]));
        assert!(rec.ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_rank_by_ascending_number() {
        let draws = vec![
            draw("2024-01-01", [1, 2, 3, 4, 5]),
            draw("2024-01-02", [39, 17, 8, 25, 12]),
        ];
        let model = TransitionModel::build(&draws, MAX_FOLLOWERS);
        let rec = recommend(&model, &draw("2024-01-03", [1, 20, 21, 22, 23]), 10, 3);
        assert_eq!(rec.top5, vec![8, 12, 17]);
    }

    #[test]
    fn test_unknown_numbers_give_empty_ranking() {
        let model = TransitionModel::default();
        let rec = recommend(&model, &draw("2024-01-01", [1, 2, 3, 4, 5]), 10, 5);
        assert!(rec.ranked.is_empty());
        assert!(rec.top5.is_empty());
    }
}

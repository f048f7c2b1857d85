use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use lotto539_db::models::{PICK_COUNT, POOL_SIZE};

/// Price of a single ticket for each bet size (2 to 5 numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrices {
    pub two: u64,
    pub three: u64,
    pub four: u64,
    pub five: u64,
}

impl Default for UnitPrices {
    fn default() -> Self {
        Self {
            two: 50,
            three: 50,
            four: 50,
            five: 50,
        }
    }
}

impl UnitPrices {
    fn for_size(&self, k: usize) -> u64 {
        match k {
            2 => self.two,
            3 => self.three,
            4 => self.four,
            _ => self.five,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRow {
    pub size: usize,
    pub combinations: u64,
    pub unit_price: u64,
    pub subtotal: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    pub numbers: Vec<u8>,
    pub rows: Vec<PriceRow>,
    pub total: u64,
}

pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

/// Cost of covering every 2-, 3-, 4- and 5-number combination of `numbers`.
pub fn price_combinations(numbers: &[u8], prices: &UnitPrices) -> Result<PriceTable> {
    if let Some(n) = numbers.iter().find(|&&n| n < 1 || n > POOL_SIZE) {
        bail!("Number {} out of range (1-{})", n, POOL_SIZE);
    }
    let mut unique = numbers.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() < 2 {
        bail!("At least 2 distinct numbers are needed, got {}", unique.len());
    }

    let n = unique.len() as u64;
    let mut rows = Vec::with_capacity(PICK_COUNT - 1);
    let mut total: u64 = 0;
    for size in 2..=PICK_COUNT {
        let combinations = binomial(n, size as u64);
        let unit_price = prices.for_size(size);
        let Some(subtotal) = combinations.checked_mul(unit_price) else {
            bail!("Subtotal for {}-number bets overflows ({} x {})", size, combinations, unit_price);
        };
        let Some(sum) = total.checked_add(subtotal) else {
            bail!("Total cost overflows");
        };
        total = sum;
        rows.push(PriceRow {
            size,
            combinations,
            unit_price,
            subtotal,
        });
    }

    Ok(PriceTable {
        numbers: unique,
        rows,
        total,
    })
}

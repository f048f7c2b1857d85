use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::import::ImportResult;
use lotto539_db::models::Draw;
use lotto539_engine::backtest::{HitCheck, HitOutcome, HitSummary};
use lotto539_engine::pricing::PriceTable;
use lotto539_engine::recommend::Recommendation;
use lotto539_engine::stats::{is_multiple_of_three, NumberStats};

pub const PENDING_LABEL: &str = "尚無下一期";
pub const MALFORMED_LABEL: &str = "日期格式錯誤";

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn number_cell(n: u8) -> Cell {
    let cell = Cell::new(format!("{:02}", n));
    if is_multiple_of_three(n) {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

pub fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("沒有可顯示的開獎資料。");
        return;
    }

    let mut table = new_table(vec!["日期", "號碼"]);
    for draw in draws {
        table.add_row(vec![draw.date.format("%Y-%m-%d").to_string(), draw.numbers.to_string()]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult, partitions: &[String]) {
    println!("匯入完成：");
    println!("  讀取列數 : {}", result.total_records);
    println!("  新增     : {}", result.inserted);
    println!("  重複略過 : {}", result.skipped);
    if result.errors > 0 {
        println!("  錯誤     : {}", result.errors);
    }
    println!("  分區     : {}", partitions.join(", "));
}

pub fn display_stats(label: &str, stats: &[NumberStats], draw_count: usize) {
    println!("\n📊 {} 統計（{} 期）\n", label, draw_count);

    let mut table = new_table(vec!["號碼", "出現次數", "未開期數"]);
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));

    for stat in &sorted {
        table.add_row(vec![
            number_cell(stat.number),
            Cell::new(stat.frequency),
            Cell::new(stat.gap),
        ]);
    }
    println!("{table}");
}

pub fn display_multiples_of_three(counts: &[(u8, u32)]) {
    println!("\n📈 3 的倍數號碼出現次數\n");

    let mut table = new_table(vec!["號碼", "出現次數", ""]);
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    for &(number, count) in counts {
        let bar = "█".repeat((count as usize * 30).div_ceil(max as usize));
        table.add_row(vec![number_cell(number), Cell::new(count), Cell::new(bar)]);
    }
    println!("{table}");
}

/// Multiples of 3 shown next to a recommendation.
pub const MULTIPLES_SHOWN: usize = 3;

/// First multiples of 3 of `top10`, in its ascending order.
pub fn leading_multiples_of_three(top10: &[u8]) -> Vec<u8> {
    top10
        .iter()
        .copied()
        .filter(|&n| is_multiple_of_three(n))
        .take(MULTIPLES_SHOWN)
        .collect()
}

/// Multi-line summary shared by the terminal and the text log.
pub fn recommendation_summary(rec: &Recommendation, timestamp: &str, multiples: &[u8]) -> String {
    format!(
        "🕒 {}\n📅 最近一期號碼：{}\n🎯 推薦號碼（{}）：{}\n🏆 機率最高前 {}：{}\n🔢 3 的倍數前三：{}",
        timestamp,
        join_numbers(rec.last_numbers.as_slice()),
        rec.top10.len(),
        join_numbers(&rec.top10),
        rec.top5.len(),
        join_numbers(&rec.top5),
        join_numbers(multiples),
    )
}

pub fn display_recommendation(rec: &Recommendation, summary: &str) {
    println!("\n{summary}\n");

    let mut table = new_table(vec!["#", "號碼", "分數", "前五"]);
    for (i, candidate) in rec.ranked.iter().enumerate() {
        let pick = if rec.top5.contains(&candidate.number) { "★" } else { "" };
        table.add_row(vec![
            Cell::new(i + 1),
            number_cell(candidate.number),
            Cell::new(candidate.score),
            Cell::new(pick),
        ]);
    }
    println!("{table}");
}

/// Row cells shared by the table and the CSV export.
pub fn hit_check_fields(check: &HitCheck) -> [String; 5] {
    let basis = check
        .basis_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| check.basis.clone());
    match &check.outcome {
        HitOutcome::Verified {
            verification_date,
            hit_numbers,
            hit_count,
        } => {
            let hits: Vec<u8> = hit_numbers.iter().copied().collect();
            [
                check.timestamp.clone(),
                basis,
                verification_date.format("%Y-%m-%d").to_string(),
                hit_count.to_string(),
                join_numbers(&hits),
            ]
        }
        HitOutcome::Pending => [
            check.timestamp.clone(),
            basis,
            PENDING_LABEL.to_string(),
            "-".to_string(),
            "-".to_string(),
        ],
        HitOutcome::MalformedBasisDate => [
            check.timestamp.clone(),
            basis,
            MALFORMED_LABEL.to_string(),
            "-".to_string(),
            "-".to_string(),
        ],
    }
}

pub const HIT_CHECK_HEADER: [&str; 5] = ["推薦時間", "基準日期", "對獎日期", "中獎數", "中獎號"];

pub fn display_hit_checks(checks: &[HitCheck], summary: &HitSummary) {
    if checks.is_empty() {
        println!("尚無推薦歷史紀錄。");
        return;
    }

    let mut table = new_table(HIT_CHECK_HEADER.to_vec());
    for check in checks {
        let fields = hit_check_fields(check);
        let color = match &check.outcome {
            HitOutcome::Verified { hit_count, .. } if *hit_count >= 2 => Color::Green,
            HitOutcome::Verified { .. } => Color::White,
            HitOutcome::Pending => Color::Yellow,
            HitOutcome::MalformedBasisDate => Color::Red,
        };
        table.add_row(fields.into_iter().map(|f| Cell::new(f).fg(color)));
    }
    println!("{table}");

    println!(
        "\n已對獎 {} 筆，待開獎 {} 筆，日期錯誤 {} 筆，平均中獎數 {:.2}",
        summary.verified,
        summary.pending,
        summary.malformed,
        summary.average_hits()
    );
    for (k, n) in summary.by_hit_count.iter().enumerate().filter(|(_, n)| **n > 0) {
        println!("  中 {} 個：{} 筆", k, n);
    }
}

pub fn display_price_table(table_data: &PriceTable) {
    println!("\n💰 號碼：{}\n", join_numbers(&table_data.numbers));

    let mut table = new_table(vec!["星別", "組合數", "單注金額", "小計"]);
    for row in &table_data.rows {
        table.add_row(vec![
            format!("{}星", row.size),
            row.combinations.to_string(),
            row.unit_price.to_string(),
            row.subtotal.to_string(),
        ]);
    }
    println!("{table}");
    println!("總金額：{}", table_data.total);
}

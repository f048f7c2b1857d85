mod display;
mod import;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};

use lotto539_db::db::{count_rows, fetch_partitions, migrate, open_db};
use lotto539_db::rusqlite::Connection;
use lotto539_db::store::DrawStore;
use lotto539_engine::backtest::summarize;
use lotto539_engine::config::AppConfig;
use lotto539_engine::engine::Engine;
use lotto539_engine::history::TIMESTAMP_FORMAT;
use lotto539_engine::pricing::{price_combinations, UnitPrices};
use lotto539_engine::stats::{multiples_of_three, yearly_stats};
use crate::display::{
    display_draws, display_hit_checks, display_import_summary, display_multiples_of_three,
    display_price_table, display_recommendation, display_stats, hit_check_fields,
    leading_multiples_of_three, recommendation_summary, HIT_CHECK_HEADER,
};

#[derive(Parser)]
#[command(name = "lotto539", about = "今彩539 號碼轉移分析工具")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overriding the configured one for this run
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import raw draw rows from a `date,n1..n5` CSV file
    Import {
        #[arg(short, long)]
        file: PathBuf,

        /// Partition label; defaults to the year of each row
        #[arg(short, long)]
        partition: Option<String>,
    },

    /// Print the database path
    DbPath,

    /// List the latest draws
    List {
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Per-year frequencies and the multiples-of-3 table
    Stats {
        /// Single year; defaults to the configured window
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Rebuild the transition model and its report
    Build,

    /// Adopt a transition report from an earlier run as the current model
    ImportReport {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Recommend numbers from the latest draw
    Recommend {
        /// Append the recommendation to the history log
        #[arg(short, long)]
        save: bool,
    },

    /// Show the recommendation history, newest first
    History,

    /// Check every logged recommendation against the following draw
    Check {
        /// Also write the results to a CSV file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Remove the recommendation history
    ClearHistory,

    /// Combination count and cost of 2- to 5-number bets
    Price {
        #[arg(required = true, num_args = 2..)]
        numbers: Vec<u8>,

        #[arg(long)]
        p2: Option<u64>,
        #[arg(long)]
        p3: Option<u64>,
        #[arg(long)]
        p4: Option<u64>,
        #[arg(long)]
        p5: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    let path = config.db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;
    let engine = Engine::new(config);

    match cli.command {
        Command::Import { file, partition } => cmd_import(&conn, &file, partition.as_deref()),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Stats { year } => cmd_stats(&conn, engine.config(), year),
        Command::Build => cmd_build(&conn, &engine),
        Command::ImportReport { file } => {
            let model = engine.import_report(&file)?;
            println!("✅ 已匯入轉移分析：{} 個號碼", model.len());
            println!("  模型 : {}", engine.config().model_path().display());
            Ok(())
        }
        Command::Recommend { save } => cmd_recommend(&conn, &engine, save),
        Command::History => cmd_history(&engine),
        Command::Check { export } => cmd_check(&conn, &engine, export.as_deref()),
        Command::ClearHistory => cmd_clear_history(&engine),
        Command::Price { numbers, p2, p3, p4, p5 } => {
            let defaults = engine.config().unit_prices;
            let prices = UnitPrices {
                two: p2.unwrap_or(defaults.two),
                three: p3.unwrap_or(defaults.three),
                four: p4.unwrap_or(defaults.four),
                five: p5.unwrap_or(defaults.five),
            };
            display_price_table(&price_combinations(&numbers, &prices)?);
            Ok(())
        }
    }
}

/// Draw store of the current database, or `None` (with a hint) when empty.
fn load_store(conn: &Connection) -> Result<Option<DrawStore>> {
    if count_rows(conn)? == 0 {
        println!("資料庫是空的，請先執行：lotto539 import --file <csv>");
        return Ok(None);
    }
    let (store, _) = DrawStore::load(conn)?;
    if store.is_empty() {
        println!("資料庫中沒有有效的開獎資料。");
        return Ok(None);
    }
    Ok(Some(store))
}

fn cmd_import(conn: &Connection, file: &Path, partition: Option<&str>) -> Result<()> {
    let result = import::import_csv(conn, file, partition)?;
    display_import_summary(&result, &fetch_partitions(conn)?);
    Ok(())
}

fn cmd_list(conn: &Connection, last: usize) -> Result<()> {
    let Some(store) = load_store(conn)? else {
        return Ok(());
    };
    let draws: Vec<_> = store.all().iter().rev().take(last).cloned().collect();
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(conn: &Connection, config: &AppConfig, year: Option<i32>) -> Result<()> {
    let Some(store) = load_store(conn)? else {
        return Ok(());
    };
    let draws: Vec<_> = store
        .all()
        .iter()
        .filter(|d| match year {
            Some(y) => d.date.year() == y,
            None => config.covers(d.date),
        })
        .cloned()
        .collect();

    if draws.is_empty() {
        println!("所選期間沒有開獎資料。");
        return Ok(());
    }

    for (y, stats) in yearly_stats(&draws) {
        let count = draws.iter().filter(|d| d.date.year() == y).count();
        display_stats(&y.to_string(), &stats, count);
    }
    display_multiples_of_three(&multiples_of_three(&draws));
    Ok(())
}

fn cmd_build(conn: &Connection, engine: &Engine) -> Result<()> {
    let Some(store) = load_store(conn)? else {
        return Ok(());
    };
    let model = engine.build_transition_model(&store)?;
    println!("✅ 轉移分析完成：{} 期，{} 個號碼", store.len(), model.len());
    println!("  模型 : {}", engine.config().model_path().display());
    println!("  報告 : {}", engine.config().report_path().display());
    Ok(())
}

fn cmd_recommend(conn: &Connection, engine: &Engine, save: bool) -> Result<()> {
    let Some(store) = load_store(conn)? else {
        return Ok(());
    };
    let Some(rec) = engine.recommend(&store)? else {
        println!("尚未有轉移分析結果，請先執行：lotto539 build");
        return Ok(());
    };

    let now = Local::now().naive_local();
    let multiples = leading_multiples_of_three(&rec.top10);
    let summary = recommendation_summary(&rec, &now.format(TIMESTAMP_FORMAT).to_string(), &multiples);
    display_recommendation(&rec, &summary);

    if save {
        engine.record_recommendation(&rec, &summary, now)?;
        println!("已寫入歷史檔：{}", engine.log().csv_path().display());
    }
    Ok(())
}

fn cmd_history(engine: &Engine) -> Result<()> {
    let lines = engine.history_lines()?;
    if lines.is_empty() {
        println!("尚無推薦歷史紀錄。");
        return Ok(());
    }
    for line in lines.iter().rev() {
        println!("{line}");
    }
    Ok(())
}

fn cmd_check(conn: &Connection, engine: &Engine, export: Option<&Path>) -> Result<()> {
    let Some(store) = load_store(conn)? else {
        return Ok(());
    };
    let checks = engine.check_hits(&store)?;
    display_hit_checks(&checks, &summarize(&checks));

    if let Some(path) = export {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Unable to create {:?}", path))?;
        writer.write_record(HIT_CHECK_HEADER)?;
        for check in &checks {
            writer.write_record(hit_check_fields(check))?;
        }
        writer.flush()?;
        println!("對獎結果已匯出：{}", path.display());
    }
    Ok(())
}

fn cmd_clear_history(engine: &Engine) -> Result<()> {
    let removed = engine.clear_history()?;
    if removed.is_empty() {
        println!("尚無推薦歷史紀錄。");
    } else {
        for path in &removed {
            println!("已刪除：{}", path.display());
        }
    }
    Ok(())
}

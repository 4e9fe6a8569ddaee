use crate::db::pool::DbPool;
use crate::errors::AppResult;
use ansi_term::Colour;
use regex::Regex;
use std::sync::LazyLock;

const OP_TARGET_WIDTH: usize = 48;

static ANSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;]*[mK]").expect("static regex"));

fn strip_ansi(s: &str) -> String {
    ANSI.replace_all(s, "").into_owned()
}

/// Colour of an audit operation
fn color_for_operation(op: &str) -> Colour {
    match op {
        "check_in" => Colour::Green,
        "check_out" => Colour::Cyan,
        "force_checkout" | "force_all" => Colour::Red,
        "edit" => Colour::Yellow,
        "roster" => Colour::Blue,
        "migration_applied" => Colour::Purple,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub id: i64,
    pub date: String,
    pub operation: String,
    pub target: String,
    pub message: String,
}

pub struct LogLogic;

impl LogLogic {
    /// Most recent `limit` lines (all when `None`), oldest first.
    pub fn load(pool: &mut DbPool, limit: Option<usize>) -> AppResult<Vec<LogLine>> {
        let mut stmt = pool.conn.prepare_cached(
            "SELECT id, date, operation, target, message FROM (
                SELECT id, date, operation, COALESCE(target, '') AS target, message
                FROM log ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
        )?;

        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let rows = stmt.query_map([limit], |row| {
            let raw_date: String = row.get(1)?;
            let date = chrono::DateTime::parse_from_rfc3339(&raw_date)
                .map(|dt| dt.format("%FT%T%:z").to_string())
                .unwrap_or(raw_date);

            Ok(LogLine {
                id: row.get(0)?,
                date,
                operation: row.get(2)?,
                target: row.get(3)?,
                message: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn print_log(pool: &mut DbPool, limit: Option<usize>) -> AppResult<()> {
        let lines = Self::load(pool, limit)?;
        if lines.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let id_w = lines.iter().map(|l| l.id.to_string().len()).max().unwrap_or(1);
        let date_w = lines.iter().map(|l| l.date.len()).max().unwrap_or(10);

        println!("📜 Internal log:\n");

        for line in &lines {
            let color = color_for_operation(&line.operation);

            let plain = if line.target.is_empty() {
                line.operation.clone()
            } else {
                format!("{} ({})", line.operation, line.target)
            };
            let visible = if plain.chars().count() > OP_TARGET_WIDTH {
                let mut s: String = plain.chars().take(OP_TARGET_WIDTH - 3).collect();
                s.push_str("...");
                s
            } else {
                plain
            };

            // only the operation word is coloured
            let painted = match visible.split_once(' ') {
                Some((op, rest)) => format!("{} {}", color.paint(op), rest),
                None => color.paint(visible.as_str()).to_string(),
            };
            let padding = " ".repeat(OP_TARGET_WIDTH.saturating_sub(strip_ansi(&painted).chars().count()));

            println!(
                "{:>id_w$}: {:<date_w$} | {}{} => {}",
                line.id,
                line.date,
                painted,
                padding,
                line.message,
                id_w = id_w,
                date_w = date_w
            );
        }

        Ok(())
    }
}

//! Plain-text tables for terminal output
//!
//! Column widths are measured in chars, which is close enough for the mostly
//! ASCII data the backend returns.

use crate::domain::types::{LeaderboardEntry, PointType, Reward, RewardRecord, UserPoints};
use chrono::{DateTime, Utc};

const GAP: &str = "  ";

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self { headers: headers.iter().map(|h| h.to_string()).collect(), rows: Vec::new() }
    }

    pub fn row(&mut self, cells: Vec<String>) -> &mut Self {
        self.rows.push(cells);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let w = cell.chars().count();
                match widths.get_mut(i) {
                    Some(current) => *current = (*current).max(w),
                    None => widths.push(w),
                }
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();
        push_line(&mut out, &self.headers, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths);
        for row in &self.rows {
            push_line(&mut out, row, &widths);
        }
        if self.rows.is_empty() {
            out.push_str("(no rows)\n");
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        if i > 0 {
            line.push_str(GAP);
        }
        line.push_str(cell);
        let pad = width.saturating_sub(cell.chars().count());
        line.extend(std::iter::repeat(' ').take(pad));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_else(|| "-".to_string())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

pub fn point_types(items: &[PointType]) -> Table {
    let mut table = Table::new(&["ID", "URI", "NAME", "ENABLED", "CREATED", "DESCRIPTION"]);
    for pt in items {
        table.row(vec![
            pt.id.clone(),
            pt.uri.clone(),
            pt.display_name.clone(),
            yes_no(pt.enabled),
            timestamp(pt.created_at_utc()),
            pt.description.clone(),
        ]);
    }
    table
}

pub fn user_points(items: &[UserPoints]) -> Table {
    let mut table = Table::new(&["ID", "USER", "NAME", "BALANCE"]);
    for row in items {
        table.row(vec![
            row.id.clone(),
            row.user_id.clone(),
            row.name.clone(),
            row.balance.to_string(),
        ]);
    }
    table
}

pub fn leaderboard(items: &[LeaderboardEntry]) -> Table {
    let mut table = Table::new(&["RANK", "USER", "NAME", "POINTS"]);
    for row in items {
        table.row(vec![
            row.rank.to_string(),
            row.user_id.clone(),
            row.name.clone(),
            row.points.to_string(),
        ]);
    }
    table
}

pub fn rewards(items: &[Reward]) -> Table {
    let mut table = Table::new(&["ID", "NAME", "TYPE", "COST", "STOCK", "DESCRIPTION"]);
    for reward in items {
        table.row(vec![
            reward.id.clone(),
            reward.name.clone(),
            reward.kind.clone(),
            reward.cost.to_string(),
            reward.stock.to_string(),
            reward.description.clone(),
        ]);
    }
    table
}

pub fn reward_records(items: &[RewardRecord]) -> Table {
    let mut table = Table::new(&["ID", "USER", "REWARD", "TYPE", "COST", "AT"]);
    for record in items {
        let user = if record.user_name.is_empty() { &record.user_id } else { &record.user_name };
        table.row(vec![
            record.id.clone(),
            user.clone(),
            record.reward_name.clone(),
            record.kind.clone(),
            record.cost.to_string(),
            timestamp(record.created_at_utc()),
        ]);
    }
    table
}

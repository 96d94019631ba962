//! Terminal rendering of a gate report: tables and an ASCII forecast chart.
//!
//! Charts are fixed-size character grids, deterministic so they can be
//! checked in tests.
//!
//! Raw price chart:
//! - open: `o`
//! - close: `*`
//!
//! Forecast chart:
//! - history closes: `*`
//! - forecast: `-` line
//! - uncertainty band: `.`

use chrono::{Datelike, NaiveDate, Weekday};
use stockcast_core::data::{RawBar, RawSeries};
use stockcast_core::{ForecastRow, ForecastTable, GateReport, TrainingSeries};

/// Rows shown by the head/tail previews.
pub const PREVIEW_ROWS: usize = 5;

/// Full text report for a successful request.
pub fn format_report(report: &GateReport, chart: Option<(usize, usize)>) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", report.symbol));
    out.push_str(&format!(
        "Source:   {} ({} to {})\n",
        report.raw.source, report.start, report.end
    ));
    out.push_str(&format!("Horizon:  {}\n\n", report.horizon));

    out.push_str("--- Raw data (tail) ---\n");
    out.push_str(&format_raw_tail(&report.raw, PREVIEW_ROWS));
    out.push('\n');

    if let Some((width, height)) = chart {
        out.push_str("--- Raw open/close ---\n");
        out.push_str(&render_raw_chart(&report.raw, width, height));
        out.push('\n');
    }

    out.push_str("--- Training data preview ---\n");
    out.push_str(&format_training_preview(&report.training, PREVIEW_ROWS));
    out.push('\n');

    out.push_str("--- Forecast data (tail) ---\n");
    out.push_str(&format_forecast_tail(&report.forecast, PREVIEW_ROWS));
    out.push('\n');

    if let Some((width, height)) = chart {
        out.push_str(&format!(
            "--- Forecast plot for {} ---\n",
            report.horizon
        ));
        out.push_str(&render_chart(&report.training, &report.forecast, width, height));
        out.push('\n');
    }

    out.push_str("--- Forecast components ---\n");
    out.push_str(&format_components(&report.forecast));
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "NaN".to_string(),
    }
}

pub fn format_raw_tail(raw: &RawSeries, n: usize) -> String {
    let mut out = format!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>12}\n",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for bar in raw.tail(n) {
        out.push_str(&format_raw_bar(bar));
    }
    out
}

fn format_raw_bar(bar: &RawBar) -> String {
    let volume = bar
        .volume
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>12}\n",
        bar.date.to_string(),
        fmt_opt(bar.open),
        fmt_opt(bar.high),
        fmt_opt(bar.low),
        fmt_opt(bar.close),
        volume
    )
}

pub fn format_training_preview(training: &TrainingSeries, n: usize) -> String {
    let mut out = format!("{:<12} {:>10}\n", "ds", "y");
    for p in training.head(n) {
        out.push_str(&format!("{:<12} {:>10.2}\n", p.ds.to_string(), p.y));
    }
    let (missing_ds, missing_y) = training.missing_counts();
    out.push_str(&format!("Shape: ({}, 2)\n", training.len()));
    out.push_str(&format!("Missing values: ds={missing_ds} y={missing_y}\n"));
    out
}

pub fn format_forecast_tail(table: &ForecastTable, n: usize) -> String {
    let mut out = format!(
        "{:<12} {:>10} {:>11} {:>11}\n",
        "ds", "yhat", "yhat_lower", "yhat_upper"
    );
    for row in table.tail(n) {
        out.push_str(&format!(
            "{:<12} {:>10.2} {:>11.2} {:>11.2}\n",
            row.ds.to_string(),
            row.yhat,
            row.yhat_lower,
            row.yhat_upper
        ));
    }
    out
}

/// Trend at the start, end of history and end of forecast, plus the weekly
/// effect per weekday.
pub fn format_components(table: &ForecastTable) -> String {
    let mut out = String::new();
    let history = table.history();
    let checkpoints = [
        ("trend (first history)", history.first()),
        ("trend (last history)", history.last()),
        ("trend (end of forecast)", table.last()),
    ];
    for (label, row) in checkpoints {
        if let Some(row) = row {
            out.push_str(&format!("{label:<24} {}  {:.2}\n", row.ds, row.trend));
        }
    }

    let mut weekly: [Option<f64>; 7] = [None; 7];
    for row in table.rows() {
        let idx = row.ds.weekday().num_days_from_monday() as usize;
        weekly[idx].get_or_insert(row.weekly);
    }
    let days = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    let cells: Vec<String> = days
        .iter()
        .zip(weekly)
        .filter_map(|(day, w)| w.map(|w| format!("{day}={w:+.3}")))
        .collect();
    out.push_str(&format!("weekly: {}\n", cells.join(" ")));
    out
}

/// Render the raw open and close prices on a `width` x `height` grid.
///
/// Where both land on one cell the close wins.
pub fn render_raw_chart(raw: &RawSeries, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let finite = |v: Option<f64>| v.filter(|v| v.is_finite());
    let values: Vec<f64> = raw
        .bars
        .iter()
        .flat_map(|b| [finite(b.open), finite(b.close)])
        .flatten()
        .collect();
    let (Some(t0), Some(t1)) = (raw.first_date(), raw.last_date()) else {
        return "(nothing to plot)\n".to_string();
    };
    if values.is_empty() {
        return "(nothing to plot)\n".to_string();
    }
    let t1 = t1.max(t0 + chrono::Duration::days(1));

    let min_y = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_y = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = if max_y > min_y {
        pad_range(min_y, max_y, 0.05)
    } else {
        (min_y - 1.0, max_y + 1.0)
    };

    let mut grid = vec![vec![' '; width]; height];
    let x_of = |ds: NaiveDate| map_x((ds - t0).num_days() as f64, (t1 - t0).num_days() as f64, width);

    for bar in &raw.bars {
        if let Some(open) = finite(bar.open) {
            grid[map_y(open, y_min, y_max, height)][x_of(bar.date)] = 'o';
        }
    }
    for bar in &raw.bars {
        if let Some(close) = finite(bar.close) {
            grid[map_y(close, y_min, y_max, height)][x_of(bar.date)] = '*';
        }
    }

    let mut out = format!("Raw: {t0} .. {t1} | y=[{y_min:.2}, {y_max:.2}] | o=open *=close\n");
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// Render history and forecast on a `width` x `height` grid.
pub fn render_chart(
    training: &TrainingSeries,
    table: &ForecastTable,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(t0), Some(t1)) = (training.first_date(), table.last().map(|r| r.ds)) else {
        return "(nothing to plot)\n".to_string();
    };
    let t1 = t1.max(t0 + chrono::Duration::days(1));

    let (y_min, y_max) = y_range(training, table.future()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let x_of = |ds: NaiveDate| map_x((ds - t0).num_days() as f64, (t1 - t0).num_days() as f64, width);

    // Band first, then the forecast line, then history so observations stay visible.
    for row in table.future() {
        let x = x_of(row.ds);
        grid[map_y(row.yhat_upper, y_min, y_max, height)][x] = '.';
        grid[map_y(row.yhat_lower, y_min, y_max, height)][x] = '.';
    }

    let line: Vec<(usize, usize)> = sample(table.future(), width)
        .into_iter()
        .map(|row| (x_of(row.ds), map_y(row.yhat, y_min, y_max, height)))
        .collect();
    for pair in line.windows(2) {
        draw_line(&mut grid, pair[0], pair[1], '-');
    }
    if let [point] = line.as_slice() {
        draw_line(&mut grid, *point, *point, '-');
    }

    for p in training.points() {
        grid[map_y(p.y, y_min, y_max, height)][x_of(p.ds)] = '*';
    }

    let mut out = format!("Plot: {t0} .. {t1} | y=[{y_min:.2}, {y_max:.2}]\n");
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// At most `n` evenly spaced rows, always including the last one.
fn sample(rows: &[ForecastRow], n: usize) -> Vec<&ForecastRow> {
    if rows.len() <= n {
        return rows.iter().collect();
    }
    let step = rows.len() as f64 / n as f64;
    let mut picked: Vec<&ForecastRow> = (0..n)
        .map(|i| &rows[((i as f64 * step) as usize).min(rows.len() - 1)])
        .collect();
    if let Some(last) = rows.last() {
        if picked.last().map(|r| r.ds) != Some(last.ds) {
            picked.push(last);
        }
    }
    picked
}

fn y_range(training: &TrainingSeries, future: &[ForecastRow]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in training.points() {
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    for row in future {
        min_y = min_y.min(row.yhat_lower);
        max_y = max_y.max(row.yhat_upper);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_span: f64, width: usize) -> usize {
    let u = (t / t_span).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only writes into empty cells.
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

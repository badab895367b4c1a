//! Plain-text dashboard
//!
//! Everything renders into a `String` so the binaries only print. Headings
//! are coloured with `colored`, which honours `NO_COLOR`.

use colored::Colorize;
use price_forecast::config::DashboardVariant;
use price_forecast::data::TimeSeries;
use price_forecast::models::ForecastResult;
use price_forecast::outlook::OutlookTable;
use price_forecast::service::{DashboardView, ForecastRequest};
use std::fmt::Write;

const RULE_WIDTH: usize = 72;
const CHART_WIDTH: usize = 60;
const CHART_HEIGHT: usize = 16;
/// History shown in front of the forecast
pub const CHART_HISTORY_DAYS: usize = 120;

pub fn render_header(symbol: &str) -> String {
    format!(
        "{}\n{}\n{}\n",
        "=".repeat(RULE_WIDTH).blue(),
        format!("{} Forecast", symbol).bold().blue(),
        format!("Adaptive forecasting for the {} market", symbol).italic()
    )
}

/// General information plus the horizon and interval in effect
pub fn render_sidebar(request: &ForecastRequest) -> String {
    let variant = request.variant;
    let mut out = String::new();

    let _ = writeln!(out, "{}", "General Information".bold());
    let _ = writeln!(
        out,
        "New data collected daily (close prices). The model is re-tuned daily so the\n\
         forecast follows current market conditions. Cross-validation suggests a\n\
         forecast horizon of 10-14 days as most suitable."
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "Forecast Horizon".bold());
    let _ = writeln!(
        out,
        "{} days (default {}, step {}; pass --horizon N for a custom value)",
        request.horizon,
        variant.default_horizon(),
        variant.horizon_step()
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "Interval Width".bold());
    let choices: Vec<String> = variant
        .interval_choices()
        .iter()
        .map(|c| {
            let label = format!("{:.2}", c);
            if (c - request.interval_width).abs() < 1e-9 {
                format!("({})", label)
            } else {
                label
            }
        })
        .collect();
    let _ = writeln!(out, "{}", choices.join("  "));
    if variant == DashboardVariant::Monthly {
        let _ = writeln!(out, "Interval fixed for the {} dashboard", variant);
    }
    out
}

/// Scaled row of `value` in a chart of `height` rows, row 0 at the top
fn chart_row(value: f64, low: f64, high: f64, height: usize) -> usize {
    if high <= low {
        return height / 2;
    }
    let scaled = (high - value) / (high - low) * (height - 1) as f64;
    (scaled.round().max(0.0) as usize).min(height - 1)
}

/// ASCII chart of recent actuals, the fitted line and the forecast band
///
/// `o` marks actual closes, `*` the point forecast and `:` the interval
/// band past the end of the history.
pub fn render_chart(series: &TimeSeries, forecast: &ForecastResult, history_days: usize) -> String {
    let history_len = forecast.history_len();
    let skip = history_len.saturating_sub(history_days);
    let points = &forecast.points()[skip..];
    if points.is_empty() {
        return "(no forecast points)\n".to_string();
    }

    // one column per bucket of consecutive days
    let columns = points.len().min(CHART_WIDTH);
    let bucket = (points.len() + columns - 1) / columns;
    let actual_offset = series.len().saturating_sub(history_len);

    struct Column {
        yhat: f64,
        lower: f64,
        upper: f64,
        actual: Option<f64>,
        future: bool,
    }

    let cols: Vec<Column> = points
        .chunks(bucket)
        .enumerate()
        .map(|(c, chunk)| {
            let start = skip + c * bucket;
            let yhat = chunk.iter().map(|p| p.yhat).sum::<f64>() / chunk.len() as f64;
            let lower = chunk.iter().map(|p| p.yhat_lower).fold(f64::INFINITY, f64::min);
            let upper = chunk.iter().map(|p| p.yhat_upper).fold(f64::NEG_INFINITY, f64::max);
            let actuals: Vec<f64> = (start..start + chunk.len())
                .filter(|&i| i < history_len)
                .filter_map(|i| series.values().get(actual_offset + i).copied())
                .collect();
            let actual = if actuals.is_empty() {
                None
            } else {
                Some(actuals.iter().sum::<f64>() / actuals.len() as f64)
            };
            Column {
                yhat,
                lower,
                upper,
                actual,
                future: start + chunk.len() > history_len,
            }
        })
        .collect();

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for col in &cols {
        let band_low = if col.future { col.lower } else { col.yhat };
        let band_high = if col.future { col.upper } else { col.yhat };
        low = low.min(band_low).min(col.actual.unwrap_or(band_low));
        high = high.max(band_high).max(col.actual.unwrap_or(band_high));
    }

    let mut grid = vec![vec![' '; cols.len()]; CHART_HEIGHT];
    for (c, col) in cols.iter().enumerate() {
        if col.future {
            let top = chart_row(col.upper, low, high, CHART_HEIGHT);
            let bottom = chart_row(col.lower, low, high, CHART_HEIGHT);
            for row in grid.iter_mut().take(bottom + 1).skip(top) {
                row[c] = ':';
            }
        }
        grid[chart_row(col.yhat, low, high, CHART_HEIGHT)][c] = '*';
        if let Some(actual) = col.actual {
            grid[chart_row(actual, low, high, CHART_HEIGHT)][c] = 'o';
        }
    }

    let mut out = String::new();
    for (r, row) in grid.iter().enumerate() {
        let label = if r == 0 {
            format!("{:>10.2}", high)
        } else if r == CHART_HEIGHT - 1 {
            format!("{:>10.2}", low)
        } else {
            " ".repeat(10)
        };
        let _ = writeln!(out, "{} |{}", label, row.iter().collect::<String>());
    }
    let _ = writeln!(out, "{} +{}", " ".repeat(10), "-".repeat(cols.len()));

    let first = points[0].date;
    let last = points[points.len() - 1].date;
    let _ = writeln!(
        out,
        "{}  {} .. {}   (o actual, * forecast, : interval)",
        " ".repeat(10),
        first,
        last
    );
    out
}

/// Outlook heading plus the stored table as-is
pub fn render_outlook(outlook: &OutlookTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        "Cross-validation performance metrics for a 6 - 14 day horizon".bold()
    );
    let _ = write!(out, "{}", outlook);
    out
}

/// The whole dashboard
pub fn render_dashboard(view: &DashboardView, series: &TimeSeries, source_label: &str) -> String {
    let mut out = render_header(&view.symbol);
    out.push('\n');
    out.push_str(&render_sidebar(&view.request));
    out.push('\n');
    out.push_str(&render_chart(series, &view.forecast, CHART_HISTORY_DAYS));
    out.push('\n');

    if let Some(last) = view.forecast.future().last() {
        let _ = writeln!(
            out,
            "{} on {}: {:.2} ({:.2} to {:.2})",
            "Forecast".green(),
            last.date,
            last.yhat,
            last.yhat_lower,
            last.yhat_upper
        );
        out.push('\n');
    }

    out.push_str(&render_outlook(&view.outlook));
    let _ = writeln!(out, "\n{}", format!("Data source: {}", source_label).italic());
    out
}

// Chart rendering seam and a dependency-free SVG implementation.
// Input records are expected cleaned and sorted by timestamp ascending.

mod svg;

use crate::models::{AggregatedStatistics, MeasurementRecord, Metric};
use std::path::{Path, PathBuf};
use svg::{Anchor, Panel, Svg};
use thiserror::Error;
use tracing::{info, instrument};

pub const TIME_SERIES: &str = "time_series.svg";
pub const COMBINED_SPEED: &str = "combined_speed.svg";
pub const STATISTICS_BOXPLOT: &str = "statistics_boxplot.svg";
pub const STATISTICS_HISTOGRAM: &str = "statistics_histogram.svg";
pub const SERVER_COMPARISON: &str = "server_comparison.svg";

const MEAN_COLOR: &str = "#d62728";

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to write chart {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns records and statistics into image files under `out_dir`; returns the files written.
pub trait ChartRenderer {
    fn render(
        &self,
        records: &[MeasurementRecord],
        stats: &AggregatedStatistics,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ChartError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SvgChartRenderer;

impl ChartRenderer for SvgChartRenderer {
    #[instrument(skip_all, fields(out_dir = %out_dir.display(), records = records.len()))]
    fn render(
        &self,
        records: &[MeasurementRecord],
        stats: &AggregatedStatistics,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ChartError> {
        std::fs::create_dir_all(out_dir).map_err(|source| ChartError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let mut charts = vec![
            (TIME_SERIES, time_series(records, stats)),
            (COMBINED_SPEED, combined_speed(records)),
            (STATISTICS_BOXPLOT, boxplots(records)),
            (STATISTICS_HISTOGRAM, histograms(stats)),
        ];
        match server_comparison(stats) {
            Some(doc) => charts.push((SERVER_COMPARISON, doc)),
            None => info!("fewer than two servers; skipping server comparison chart"),
        }

        let mut written = Vec::with_capacity(charts.len());
        for (name, doc) in charts {
            let path = out_dir.join(name);
            std::fs::write(&path, doc).map_err(|source| ChartError::Io {
                path: path.clone(),
                source,
            })?;
            info!(chart = %path.display(), "chart written");
            written.push(path);
        }
        Ok(written)
    }
}

fn color(metric: Metric) -> &'static str {
    match metric {
        Metric::Download => "#2E86AB",
        Metric::Upload => "#A23B72",
        Metric::Ping => "#F18F01",
    }
}

fn epoch_secs(r: &MeasurementRecord) -> f64 {
    r.timestamp.and_utc().timestamp() as f64
}

fn value_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

/// First and last timestamp under the x axis.
fn time_labels(svg: &mut Svg, panel: &Panel, records: &[MeasurementRecord]) {
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        let fmt = "%Y-%m-%d %H:%M";
        svg.text(
            panel.left,
            panel.bottom() + 16.0,
            &first.timestamp.format(fmt).to_string(),
            Anchor::Start,
            11.0,
            false,
        );
        if records.len() > 1 {
            svg.text(
                panel.left + panel.width,
                panel.bottom() + 16.0,
                &last.timestamp.format(fmt).to_string(),
                Anchor::End,
                11.0,
                false,
            );
        }
    }
}

fn plot_series(svg: &mut Svg, panel: &Panel, records: &[MeasurementRecord], metric: Metric) {
    let points: Vec<(f64, f64)> = records
        .iter()
        .map(|r| (panel.x(epoch_secs(r)), panel.y(metric.value(r))))
        .collect();
    svg.polyline(&points, color(metric));
    for p in points {
        svg.circle(p, 3.0, color(metric));
    }
}

fn time_series(records: &[MeasurementRecord], stats: &AggregatedStatistics) -> String {
    let (width, panel_h) = (1000.0, 220.0);
    let mut svg = Svg::new(width, 60.0 + 3.0 * (panel_h + 70.0));
    svg.title("Network speed over time");

    let x_lo = stats.first_timestamp.and_utc().timestamp() as f64;
    let x_hi = stats.last_timestamp.and_utc().timestamp() as f64;
    for (i, metric) in Metric::ALL.into_iter().enumerate() {
        let (lo, hi) = value_range(records.iter().map(|r| metric.value(r)));
        let panel = Panel::new(90.0, 80.0 + i as f64 * (panel_h + 70.0), width - 140.0, panel_h)
            .with_x(x_lo, x_hi)
            .with_y(lo, hi);
        let label = format!("{} ({})", metric.label(), metric.unit());
        panel.axes(&mut svg, &format!("{} trend", metric.label()), &label);

        let mean = stats.summary(metric).mean;
        svg.line(
            (panel.left, panel.y(mean)),
            (panel.left + panel.width, panel.y(mean)),
            MEAN_COLOR,
            true,
        );
        svg.text(
            panel.left + panel.width - 4.0,
            panel.y(mean) - 6.0,
            &format!("mean: {:.2} {}", mean, metric.unit()),
            Anchor::End,
            11.0,
            false,
        );
        plot_series(&mut svg, &panel, records, metric);
        time_labels(&mut svg, &panel, records);
    }
    svg.finish()
}

fn combined_speed(records: &[MeasurementRecord]) -> String {
    let width = 1000.0;
    let mut svg = Svg::new(width, 480.0);
    svg.title("Download vs upload");

    let (x_lo, x_hi) = value_range(records.iter().map(epoch_secs));
    let (lo, hi) = value_range(
        records
            .iter()
            .flat_map(|r| [r.download_mbps, r.upload_mbps]),
    );
    let panel = Panel::new(90.0, 80.0, width - 140.0, 330.0)
        .with_x(x_lo, x_hi)
        .with_y(lo, hi);
    panel.axes(&mut svg, "Throughput", "Speed (Mbps)");
    for metric in [Metric::Download, Metric::Upload] {
        plot_series(&mut svg, &panel, records, metric);
    }
    time_labels(&mut svg, &panel, records);

    for (i, metric) in [Metric::Download, Metric::Upload].into_iter().enumerate() {
        let y = 96.0 + i as f64 * 18.0;
        svg.rect(panel.left + 12.0, y - 10.0, 12.0, 12.0, color(metric), 1.0);
        svg.text(panel.left + 30.0, y, metric.label(), Anchor::Start, 12.0, false);
    }
    svg.finish()
}

/// Quartiles with linear interpolation, as used for the box edges.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let (i, frac) = (pos.floor() as usize, pos.fract());
    match sorted.get(i + 1) {
        Some(next) => sorted[i] + (next - sorted[i]) * frac,
        None => sorted[i],
    }
}

fn boxplots(records: &[MeasurementRecord]) -> String {
    let (width, panel_w) = (1000.0, 240.0);
    let mut svg = Svg::new(width, 420.0);
    svg.title("Distribution");

    for (i, metric) in Metric::ALL.into_iter().enumerate() {
        let mut values: Vec<f64> = records.iter().map(|r| metric.value(r)).collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);
        let (lo, hi) = (values[0], values[values.len() - 1]);
        let panel = Panel::new(90.0 + i as f64 * (panel_w + 90.0), 80.0, panel_w, 290.0)
            .with_y(lo, hi);
        panel.axes(
            &mut svg,
            &format!("{} distribution", metric.label()),
            &format!("{} ({})", metric.label(), metric.unit()),
        );

        let (q1, q2, q3) = (
            quantile(&values, 0.25),
            quantile(&values, 0.5),
            quantile(&values, 0.75),
        );
        let cx = panel.left + panel.width / 2.0;
        let half = panel.width / 6.0;
        svg.line((cx, panel.y(lo)), (cx, panel.y(q1)), "black", false);
        svg.line((cx, panel.y(q3)), (cx, panel.y(hi)), "black", false);
        svg.line((cx - half / 2.0, panel.y(lo)), (cx + half / 2.0, panel.y(lo)), "black", false);
        svg.line((cx - half / 2.0, panel.y(hi)), (cx + half / 2.0, panel.y(hi)), "black", false);
        svg.rect(
            cx - half,
            panel.y(q3),
            2.0 * half,
            panel.y(q1) - panel.y(q3),
            color(metric),
            0.7,
        );
        svg.line((cx - half, panel.y(q2)), (cx + half, panel.y(q2)), "#ff7f0e", false);
    }
    svg.finish()
}

fn histograms(stats: &AggregatedStatistics) -> String {
    let (width, panel_w) = (1000.0, 240.0);
    let mut svg = Svg::new(width, 440.0);
    svg.title("Histogram");

    for (i, metric) in Metric::ALL.into_iter().enumerate() {
        let Some(hist) = stats.histogram(metric) else {
            continue;
        };
        let (Some(first), Some(last)) = (hist.bins.first(), hist.bins.last()) else {
            continue;
        };
        let max_count = hist.bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
        let mut panel = Panel::new(90.0 + i as f64 * (panel_w + 90.0), 80.0, panel_w, 290.0)
            .with_x(first.lower, last.upper);
        panel.y_range = (0.0, max_count.max(1.0));
        panel.axes(
            &mut svg,
            &format!("{} distribution", metric.label()),
            "Frequency",
        );
        for bin in &hist.bins {
            let x = panel.x(bin.lower);
            svg.rect(
                x,
                panel.y(bin.count as f64),
                panel.x(bin.upper) - x,
                panel.bottom() - panel.y(bin.count as f64),
                color(metric),
                0.7,
            );
        }
        let mean = stats.summary(metric).mean;
        svg.line(
            (panel.x(mean), panel.top),
            (panel.x(mean), panel.bottom()),
            MEAN_COLOR,
            true,
        );
        svg.text(
            panel.left + panel.width / 2.0,
            panel.bottom() + 30.0,
            &format!("{} ({}), mean {:.2}", metric.label(), metric.unit(), mean),
            Anchor::Middle,
            11.0,
            false,
        );
    }
    svg.finish()
}

fn server_comparison(stats: &AggregatedStatistics) -> Option<String> {
    let groups = stats.servers.as_ref()?;
    let (width, panel_w) = (1000.0, 240.0);
    let mut svg = Svg::new(width, 480.0);
    svg.title("Per-server comparison");

    for (i, metric) in Metric::ALL.into_iter().enumerate() {
        let means: Vec<f64> = groups.iter().map(|g| g.summary(metric).mean).collect();
        let (_, hi) = value_range(means.iter().copied());
        let mut panel = Panel::new(90.0 + i as f64 * (panel_w + 90.0), 80.0, panel_w, 270.0);
        panel.y_range = (0.0, if hi > 0.0 { hi * 1.05 } else { 1.0 });
        panel.axes(
            &mut svg,
            &format!("Mean {} per server", metric.label().to_lowercase()),
            &format!("{} ({})", metric.label(), metric.unit()),
        );
        let slot = panel.width / groups.len() as f64;
        for (j, (group, mean)) in groups.iter().zip(&means).enumerate() {
            let x = panel.left + slot * j as f64 + slot * 0.15;
            svg.rect(
                x,
                panel.y(*mean),
                slot * 0.7,
                panel.bottom() - panel.y(*mean),
                color(metric),
                0.7,
            );
            svg.rotated_text(x + slot * 0.35, panel.bottom() + 14.0, &group.server, -45.0);
        }
    }
    Some(svg.finish())
}

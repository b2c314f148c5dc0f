//! Multi-series trend chart
//!
//! Five metrics share one date axis and one Y scale. Layout:
//!
//! ```text
//!  +--------------------------------------------+
//!  |  legend (top padding band)                 |
//!  |     +--------------------------------+     |
//!  |  Y  |  plot rectangle, 6 h-gridlines |     |
//!  |     |  + one v-gridline per point    |     |
//!  |     +--------------------------------+     |
//!  |        X labels (month/day)                |
//!  +--------------------------------------------+
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::model::{Metric, TimeSeriesPoint};
use crate::surface::{
    prepare, Color, DrawingSurface, Point, Rect, TextAlign, TextBaseline, TextStyle,
};

/// Space reserved on every side of the plot for labels and legend.
pub const PADDING: f64 = 60.0;
pub const MARKER_RADIUS: f64 = 3.0;
pub const LINE_WIDTH: f64 = 2.0;
pub const GRID_ROWS: usize = 5;
pub const MAX_X_LABELS: usize = 6;

const FONT_SIZE: f64 = 12.0;
const LEGEND_SWATCH: f64 = 12.0;

/// Largest value across all metrics and all points. Never negative.
pub fn global_max(data: &[TimeSeriesPoint]) -> f64 {
    data.iter()
        .flat_map(|point| Metric::ALL.iter().map(move |m| point.value(*m)))
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}

/// Indices that get an X-axis label: every `ceil(n/6)`-th point plus the last.
pub fn x_label_indices(n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let step = n.div_ceil(MAX_X_LABELS);
    (0..n).filter(|i| i % step == 0 || *i == n - 1).collect()
}

/// Y-axis label values, top to bottom.
pub fn y_label_values(global_max: f64) -> Vec<f64> {
    (0..=GRID_ROWS)
        .map(|i| (global_max * (GRID_ROWS - i) as f64 / GRID_ROWS as f64).round())
        .collect()
}

/// Coordinate mapping from (index, value) to logical surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub count: usize,
    pub global_max: f64,
}

impl ChartLayout {
    pub fn new(width: f64, height: f64, count: usize, global_max: f64) -> Self {
        Self {
            width,
            height,
            count,
            global_max,
        }
    }

    pub fn plot_width(&self) -> f64 {
        self.width - 2.0 * PADDING
    }

    pub fn plot_height(&self) -> f64 {
        self.height - 2.0 * PADDING
    }

    pub fn plot_rect(&self) -> Rect {
        Rect::new(PADDING, PADDING, self.plot_width(), self.plot_height())
    }

    pub fn baseline(&self) -> f64 {
        self.height - PADDING
    }

    /// A single point sits at the horizontal centre.
    pub fn x_at(&self, index: usize) -> f64 {
        if self.count <= 1 {
            return PADDING + self.plot_width() / 2.0;
        }
        PADDING + self.plot_width() * index as f64 / (self.count - 1) as f64
    }

    /// Larger values sit higher. With an all-zero series everything lies on
    /// the baseline.
    pub fn y_at(&self, value: f64) -> f64 {
        if self.global_max <= 0.0 || !value.is_finite() {
            return self.baseline();
        }
        self.baseline() - self.plot_height() * value / self.global_max
    }

    /// Y of the i-th horizontal gridline, counted from the top.
    pub fn grid_y(&self, row: usize) -> f64 {
        PADDING + self.plot_height() * row as f64 / GRID_ROWS as f64
    }

    pub fn point(&self, index: usize, value: f64) -> Point {
        Point::new(self.x_at(index), self.y_at(value))
    }
}

/// Draw the full chart for `data`. An empty series draws nothing at all.
pub fn render_trend(data: &[TimeSeriesPoint], surface: &mut impl DrawingSurface) {
    if data.is_empty() {
        return;
    }

    let size = prepare(surface);
    let layout = ChartLayout::new(size.width, size.height, data.len(), global_max(data));
    debug!(
        points = layout.count,
        global_max = layout.global_max,
        width = layout.width,
        height = layout.height,
        "drawing trend chart"
    );

    surface.clear(Rect::new(0.0, 0.0, size.width, size.height));

    draw_grid(&layout, surface);
    for metric in Metric::ALL {
        draw_series(&layout, data, metric, surface);
    }
    draw_y_labels(&layout, surface);
    draw_x_labels(&layout, data, surface);
    draw_legend(surface);
}

fn draw_grid(layout: &ChartLayout, surface: &mut impl DrawingSurface) {
    for row in 0..=GRID_ROWS {
        let y = layout.grid_y(row);
        surface.line(
            Point::new(PADDING, y),
            Point::new(layout.width - PADDING, y),
            Color::GRID,
            1.0,
        );
    }

    for i in 0..layout.count {
        let x = layout.x_at(i);
        surface.line(
            Point::new(x, PADDING),
            Point::new(x, layout.baseline()),
            Color::GRID,
            1.0,
        );
    }
}

fn draw_series(
    layout: &ChartLayout,
    data: &[TimeSeriesPoint],
    metric: Metric,
    surface: &mut impl DrawingSurface,
) {
    let color = metric.color();
    let points: Vec<Point> = data
        .iter()
        .enumerate()
        .map(|(i, point)| layout.point(i, point.value(metric)))
        .collect();

    surface.polyline(&points, color, LINE_WIDTH);
    for p in &points {
        surface.fill_circle(*p, MARKER_RADIUS, color);
    }
}

fn draw_y_labels(layout: &ChartLayout, surface: &mut impl DrawingSurface) {
    let style = TextStyle::new(Color::MUTED, FONT_SIZE)
        .align(TextAlign::Right)
        .baseline(TextBaseline::Middle);

    for (row, value) in y_label_values(layout.global_max).into_iter().enumerate() {
        surface.fill_text(
            &format!("{}", value),
            Point::new(PADDING - 10.0, layout.grid_y(row)),
            &style,
        );
    }
}

fn draw_x_labels(layout: &ChartLayout, data: &[TimeSeriesPoint], surface: &mut impl DrawingSurface) {
    let style = TextStyle::new(Color::MUTED, FONT_SIZE)
        .align(TextAlign::Center)
        .baseline(TextBaseline::Top);

    for i in x_label_indices(data.len()) {
        surface.fill_text(
            &data[i].short_label(),
            Point::new(layout.x_at(i), layout.baseline() + 10.0),
            &style,
        );
    }
}

fn draw_legend(surface: &mut impl DrawingSurface) {
    let style = TextStyle::new(Color::MUTED, FONT_SIZE).baseline(TextBaseline::Middle);
    let y = PADDING / 2.0;
    let mut x = PADDING;

    for metric in Metric::ALL {
        surface.fill_rect(
            Rect::new(x, y - LEGEND_SWATCH / 2.0, LEGEND_SWATCH, LEGEND_SWATCH),
            metric.color(),
        );
        let label = metric.label();
        surface.fill_text(label, Point::new(x + LEGEND_SWATCH + 6.0, y), &style);
        x += LEGEND_SWATCH + 6.0 + label.len() as f64 * FONT_SIZE * 0.6 + 18.0;
    }
}

/// Holds the current series and redraws whenever it is replaced.
///
/// Series are compared by handle, not by content: handing over a new `Arc`
/// always triggers a full redraw. No surface is kept between calls.
#[derive(Debug, Default)]
pub struct TrendChart {
    data: Option<Arc<[TimeSeriesPoint]>>,
    redraws: u64,
}

impl TrendChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&[TimeSeriesPoint]> {
        self.data.as_deref()
    }

    /// Number of full redraws performed so far.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    /// Replace the series. Redraws and returns `true` if the handle changed.
    ///
    /// An empty or absent series draws nothing, so the surface keeps
    /// whatever the previous series left on it.
    pub fn set_data(
        &mut self,
        data: Option<Arc<[TimeSeriesPoint]>>,
        surface: &mut impl DrawingSurface,
    ) -> bool {
        let changed = match (&self.data, &data) {
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return false;
        }

        self.data = data;
        self.draw(surface);
        true
    }

    /// Redraw the current series after the host changed the surface size.
    pub fn resize(&mut self, surface: &mut impl DrawingSurface) {
        self.draw(surface);
    }

    fn draw(&mut self, surface: &mut impl DrawingSurface) {
        match self.data.as_deref() {
            Some(data) if !data.is_empty() => {
                render_trend(data, surface);
                self.redraws += 1;
            }
            _ => {}
        }
    }
}

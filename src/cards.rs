//! Overview cards: one card per metric with total, weekly additions and
//! week-over-week growth.

use crate::model::{Metric, StatsOverview};
use crate::surface::{prepare, Color, DrawingSurface, Point, Rect, TextAlign, TextStyle};

const MARGIN: f64 = 16.0;
const GAP: f64 = 16.0;
const INSET: f64 = 14.0;
const ICON: f64 = 28.0;

const POSITIVE: Color = Color::rgb(0x10, 0xb9, 0x81);
const NEGATIVE: Color = Color::rgb(0xef, 0x44, 0x44);

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Card rectangles laid out left to right across the surface.
pub fn card_rects(width: f64, height: f64) -> Vec<Rect> {
    let count = Metric::ALL.len() as f64;
    let card_width = ((width - 2.0 * MARGIN - GAP * (count - 1.0)) / count).max(0.0);
    let card_height = (height - 2.0 * MARGIN).max(0.0);

    (0..Metric::ALL.len())
        .map(|i| {
            Rect::new(
                MARGIN + i as f64 * (card_width + GAP),
                MARGIN,
                card_width,
                card_height,
            )
        })
        .collect()
}

pub fn render_overview_cards(overview: &StatsOverview, surface: &mut impl DrawingSurface) {
    let size = prepare(surface);
    surface.clear(Rect::new(0.0, 0.0, size.width, size.height));

    for (metric, rect) in Metric::ALL.into_iter().zip(card_rects(size.width, size.height)) {
        let stats = overview.get(metric);
        let left = rect.x + INSET;

        surface.stroke_rect(rect, Color::BORDER, 1.0);
        surface.fill_rect(
            Rect::new(left, rect.y + INSET, ICON, ICON),
            metric.color(),
        );
        surface.fill_text(
            metric.label(),
            Point::new(left + ICON + 8.0, rect.y + INSET + ICON * 0.7),
            &TextStyle::new(Color::INK, 14.0).bold(),
        );

        let mut y = rect.y + INSET + ICON + 34.0;
        surface.fill_text(
            &group_thousands(stats.total),
            Point::new(left, y),
            &TextStyle::new(Color::INK, 26.0).bold(),
        );
        y += 18.0;
        surface.fill_text("total", Point::new(left, y), &TextStyle::new(Color::MUTED, 11.0));

        y += 26.0;
        surface.fill_text(
            &format!("+{}", group_thousands(stats.new_this_week)),
            Point::new(left, y),
            &TextStyle::new(metric.color(), 16.0).bold(),
        );
        surface.fill_text(
            "this week",
            Point::new(rect.x + rect.width - INSET, y),
            &TextStyle::new(Color::MUTED, 11.0).align(TextAlign::Right),
        );

        y += 24.0;
        let growth_color = if stats.is_growing() { POSITIVE } else { NEGATIVE };
        surface.fill_text(
            &stats.growth_label(),
            Point::new(left, y),
            &TextStyle::new(growth_color, 12.0).bold(),
        );
        surface.fill_text(
            "vs last week",
            Point::new(rect.x + rect.width - INSET, y),
            &TextStyle::new(Color::MUTED, 11.0).align(TextAlign::Right),
        );
    }
}

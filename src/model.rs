use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::surface::Color;

// ============================================================================
// Trend series
// ============================================================================

/// One day of community activity, as returned in the `trend` array of
/// `GET /stats`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub users: f64,
    pub blogs: f64,
    pub tutorials: f64,
    pub events: f64,
    pub posts: f64,
}

impl TimeSeriesPoint {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Users => self.users,
            Metric::Blogs => self.blogs,
            Metric::Tutorials => self.tutorials,
            Metric::Events => self.events,
            Metric::Posts => self.posts,
        }
    }

    /// Calendar day of the point. Accepts a bare ISO day or a full RFC 3339
    /// timestamp and keeps only its date part.
    pub fn day(&self) -> Option<NaiveDate> {
        let head = self.date.get(..10).unwrap_or(&self.date);
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }

    /// Axis label in `month/day` form. Falls back to the raw string when the
    /// date cannot be parsed.
    pub fn short_label(&self) -> String {
        match self.day() {
            Some(day) => format!("{}/{}", day.month(), day.day()),
            None => self.date.clone(),
        }
    }
}

/// The five charted metrics. Order, colour and label are fixed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Users,
    Blogs,
    Tutorials,
    Events,
    Posts,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Users,
        Metric::Blogs,
        Metric::Tutorials,
        Metric::Events,
        Metric::Posts,
    ];

    pub fn color(self) -> Color {
        match self {
            Metric::Users => Color::rgb(0x8b, 0x5c, 0xf6),     // violet
            Metric::Blogs => Color::rgb(0x06, 0xb6, 0xd4),     // cyan
            Metric::Tutorials => Color::rgb(0x10, 0xb9, 0x81), // green
            Metric::Events => Color::rgb(0xf5, 0x9e, 0x0b),    // amber
            Metric::Posts => Color::rgb(0xef, 0x44, 0x44),     // red
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Users => "Users",
            Metric::Blogs => "Blogs",
            Metric::Tutorials => "Tutorials",
            Metric::Events => "Events",
            Metric::Posts => "Posts",
        }
    }
}

// ============================================================================
// Overview
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CategoryStats {
    pub total: u64,
    #[serde(rename = "new_this_Week")]
    pub new_this_week: u64,
    #[serde(rename = "new_this_Month")]
    pub new_this_month: u64,
    pub weekly_growth: f64,
    pub monthly_growth: f64,
}

impl CategoryStats {
    pub fn is_growing(&self) -> bool {
        self.weekly_growth >= 0.0
    }

    /// Week-over-week growth with an explicit sign, e.g. `+12.5%`.
    pub fn growth_label(&self) -> String {
        if self.is_growing() {
            format!("+{:.1}%", self.weekly_growth)
        } else {
            format!("{:.1}%", self.weekly_growth)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatsOverview {
    pub users: CategoryStats,
    pub blogs: CategoryStats,
    pub tutorials: CategoryStats,
    pub events: CategoryStats,
    pub posts: CategoryStats,
}

impl StatsOverview {
    pub fn get(&self, metric: Metric) -> &CategoryStats {
        match metric {
            Metric::Users => &self.users,
            Metric::Blogs => &self.blogs,
            Metric::Tutorials => &self.tutorials,
            Metric::Events => &self.events,
            Metric::Posts => &self.posts,
        }
    }
}

/// Payload of `GET /stats`. Either half may be null upstream.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StatsResponse {
    pub overview: Option<StatsOverview>,
    pub trend: Option<Vec<TimeSeriesPoint>>,
}

// ============================================================================
// API envelope
// ============================================================================

/// Uniform response wrapper used by every endpoint of the community API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub code: i64,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub const OK: i64 = 200;

    pub fn is_success(&self) -> bool {
        self.code == Self::OK && self.data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_label_strips_leading_zeros() {
        let point = TimeSeriesPoint {
            date: "2024-01-05".to_string(),
            users: 0.0,
            blogs: 0.0,
            tutorials: 0.0,
            events: 0.0,
            posts: 0.0,
        };
        assert_eq!(point.short_label(), "1/5");
    }

    #[test]
    fn short_label_accepts_timestamps_and_garbage() {
        let mut point = TimeSeriesPoint {
            date: "2024-12-31T00:00:00Z".to_string(),
            users: 0.0,
            blogs: 0.0,
            tutorials: 0.0,
            events: 0.0,
            posts: 0.0,
        };
        assert_eq!(point.short_label(), "12/31");

        point.date = "week 3".to_string();
        assert_eq!(point.short_label(), "week 3");
    }

    #[test]
    fn metric_colors_are_fixed() {
        let hex: Vec<String> = Metric::ALL.iter().map(|m| m.color().to_hex()).collect();
        assert_eq!(
            hex,
            vec!["#8b5cf6", "#06b6d4", "#10b981", "#f59e0b", "#ef4444"]
        );
    }

    #[test]
    fn stats_envelope_decodes_wire_names() {
        let body = r#"{
            "code": 200,
            "message": "query success",
            "data": {
                "overview": {
                    "users": {"total": 120, "new_this_Week": 4, "new_this_Month": 9, "weekly_growth": 12.5, "monthly_growth": -1.0},
                    "blogs": {"total": 0, "new_this_Week": 0, "new_this_Month": 0, "weekly_growth": 0, "monthly_growth": 0},
                    "tutorials": {"total": 0, "new_this_Week": 0, "new_this_Month": 0, "weekly_growth": 0, "monthly_growth": 0},
                    "events": {"total": 0, "new_this_Week": 0, "new_this_Month": 0, "weekly_growth": 0, "monthly_growth": 0},
                    "posts": {"total": 0, "new_this_Week": 0, "new_this_Month": 0, "weekly_growth": -3, "monthly_growth": 0}
                },
                "trend": [
                    {"date": "2024-01-01", "users": 10, "blogs": 0, "tutorials": 0, "events": 0, "posts": 0}
                ]
            }
        }"#;

        let envelope: Envelope<StatsResponse> = serde_json::from_str(body).unwrap();
        assert!(envelope.is_success());

        let stats = envelope.data.unwrap();
        let overview = stats.overview.unwrap();
        assert_eq!(overview.users.new_this_week, 4);
        assert_eq!(overview.users.growth_label(), "+12.5%");
        assert_eq!(overview.posts.growth_label(), "-3.0%");
        assert_eq!(stats.trend.unwrap()[0].value(Metric::Users), 10.0);
    }

    #[test]
    fn envelope_without_data_is_not_success() {
        let envelope: Envelope<StatsResponse> =
            serde_json::from_str(r#"{"code": 200, "message": "empty"}"#).unwrap();
        assert!(!envelope.is_success());

        let envelope: Envelope<StatsResponse> =
            serde_json::from_str(r#"{"code": 401, "message": "success fail", "data": null}"#)
                .unwrap();
        assert!(!envelope.is_success());
    }
}

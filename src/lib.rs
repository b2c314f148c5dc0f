//! Statistics views for the Nexus community site: the multi-metric trend
//! chart, the overview cards and the week-range calendar picker.

pub mod calendar;
pub mod cards;
pub mod model;
pub mod surface;
pub mod trend;

pub use calendar::{
    days_in_month, week_of, CalendarPicker, DateRange, DayCell, MonthStep, MountedPicker,
    PointerHub, QuickSelect,
};
pub use cards::render_overview_cards;
pub use model::{CategoryStats, Envelope, Metric, StatsOverview, StatsResponse, TimeSeriesPoint};
pub use surface::{DrawingSurface, RecordingSurface, SvgSurface};
pub use trend::{render_trend, TrendChart};

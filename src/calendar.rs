//! Week-range calendar picker
//!
//! Weeks run Sunday to Saturday. The month grid is always 42 cells so its
//! height does not change between months.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use chrono::{Datelike, Days, Duration, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::surface::{Point, Rect};

pub const GRID_CELLS: usize = 42;
pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

// ============================================================================
// Date math
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..=(self.end - start).num_days()).map(move |i| start + Duration::days(i))
    }

    /// Query parameters understood by the listing endpoints.
    pub fn to_query(&self) -> [(&'static str, String); 2] {
        [
            ("start_date", self.start.format("%Y-%m-%d").to_string()),
            ("end_date", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%b %-d"),
            self.end.format("%b %-d")
        )
    }
}

/// Sunday that starts the week containing `date`. `None` when that Sunday
/// falls before the first representable date.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(date.weekday().num_days_from_sunday().into()))
}

/// Sunday-to-Saturday week containing `date`, if the whole week is
/// representable.
pub fn week_of(date: NaiveDate) -> Option<DateRange> {
    let start = week_start(date)?;
    Some(DateRange {
        start,
        end: start.checked_add_days(Days::new(6))?,
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QuickSelect {
    ThisWeek,
    LastWeek,
}

impl QuickSelect {
    pub fn range_at(self, today: NaiveDate) -> Option<DateRange> {
        match self {
            QuickSelect::ThisWeek => week_of(today),
            QuickSelect::LastWeek => week_of(week_start(today)?.checked_sub_days(Days::new(7))?),
        }
    }
}

impl FromStr for QuickSelect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "this-week" | "thisWeek" => Ok(QuickSelect::ThisWeek),
            "last-week" | "lastWeek" => Ok(QuickSelect::LastWeek),
            other => Err(format!("unknown quick select '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
}

/// The 6 x 7 grid for the month containing `reference`: trailing days of the
/// previous month, the whole month, then leading days of the next month.
///
/// `None` for the first and last months chrono can represent, whose grids
/// would run past the ends of the calendar.
pub fn days_in_month(reference: NaiveDate) -> Option<Vec<DayCell>> {
    let first = reference.with_day(1)?;
    let grid_start = week_start(first)?;
    grid_start.checked_add_days(Days::new(GRID_CELLS as u64 - 1))?;

    let cells = (0..GRID_CELLS as u64)
        .filter_map(|i| grid_start.checked_add_days(Days::new(i)))
        .map(|date| DayCell {
            date,
            is_current_month: date.year() == first.year() && date.month() == first.month(),
        })
        .collect();
    Some(cells)
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonthStep {
    Prev,
    Next,
}

/// Move by one calendar month. The day is clamped to the target month's
/// length; the cursor stays put at the edges of the representable range.
pub fn step_month(cursor: NaiveDate, step: MonthStep) -> NaiveDate {
    let moved = match step {
        MonthStep::Prev => cursor.checked_sub_months(Months::new(1)),
        MonthStep::Next => cursor.checked_add_months(Months::new(1)),
    };
    moved.unwrap_or(cursor)
}

// ============================================================================
// Picker
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Closed,
    Open,
}

/// One rendered day button.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellView {
    pub date: NaiveDate,
    pub day: u32,
    pub is_current_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
}

type RangeCallback = Box<dyn FnMut(DateRange)>;

pub struct CalendarPicker {
    state: PickerState,
    cursor: NaiveDate,
    selected: Option<NaiveDate>,
    region: Option<Rect>,
    on_change: RangeCallback,
}

impl fmt::Debug for CalendarPicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarPicker")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("selected", &self.selected)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl CalendarPicker {
    /// Picker showing the current month.
    pub fn new(on_change: impl FnMut(DateRange) + 'static) -> Self {
        Self::new_at(Local::now().date_naive(), on_change)
    }

    pub fn new_at(cursor: NaiveDate, on_change: impl FnMut(DateRange) + 'static) -> Self {
        Self {
            state: PickerState::Closed,
            cursor,
            selected: None,
            region: None,
            on_change: Box::new(on_change),
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PickerState::Open
    }

    pub fn cursor(&self) -> NaiveDate {
        self.cursor
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    /// Area the picker occupies on screen, trigger and popup included.
    pub fn set_region(&mut self, region: Rect) {
        self.region = Some(region);
    }

    pub fn toggle(&mut self) {
        self.state = match self.state {
            PickerState::Closed => PickerState::Open,
            PickerState::Open => PickerState::Closed,
        };
    }

    pub fn close(&mut self) {
        self.state = PickerState::Closed;
    }

    /// Close if a pointer went down outside the picker's region. Without a
    /// known region nothing can be decided, so the event is ignored.
    pub fn handle_pointer_down(&mut self, at: Point) {
        match self.region {
            Some(region) if !region.contains(at) => self.close(),
            _ => {}
        }
    }

    pub fn handle_date_click(&mut self, date: NaiveDate) {
        self.selected = Some(date);
        self.emit(week_of(date));
    }

    pub fn handle_quick_select(&mut self, kind: QuickSelect) {
        self.handle_quick_select_at(kind, Local::now().date_naive());
    }

    pub fn handle_quick_select_at(&mut self, kind: QuickSelect, today: NaiveDate) {
        self.emit(kind.range_at(today));
    }

    pub fn change_month(&mut self, step: MonthStep) {
        self.cursor = step_month(self.cursor, step);
    }

    /// Month heading, e.g. `March 2024`.
    pub fn month_title(&self) -> String {
        self.cursor.format("%B %Y").to_string()
    }

    pub fn cells(&self) -> Option<Vec<CellView>> {
        self.cells_at(Local::now().date_naive())
    }

    pub fn cells_at(&self, today: NaiveDate) -> Option<Vec<CellView>> {
        cell_views(self.cursor, self.selected, today)
    }

    /// Report `range` and close. A week that cannot be represented closes the
    /// popup without calling back.
    fn emit(&mut self, range: Option<DateRange>) {
        match range {
            Some(range) => {
                debug!(start = %range.start, end = %range.end, "week selected");
                (self.on_change)(range);
            }
            None => debug!("selected week is outside the supported date range"),
        }
        self.close();
    }
}

/// Grid for the month of `cursor` with per-cell flags.
pub fn cell_views(
    cursor: NaiveDate,
    selected: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<Vec<CellView>> {
    let cells = days_in_month(cursor)?
        .into_iter()
        .map(|cell| CellView {
            date: cell.date,
            day: cell.date.day(),
            is_current_month: cell.is_current_month,
            is_today: cell.date == today,
            is_selected: selected == Some(cell.date),
        })
        .collect();
    Some(cells)
}

// ============================================================================
// Outside-pointer listener
// ============================================================================

type PointerHandler = Rc<dyn Fn(Point)>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<(u64, PointerHandler)>,
}

/// Dispatches pointer-down events to the listeners registered on it.
///
/// Constructed and owned by the host; there is no process-wide instance.
#[derive(Clone, Default)]
pub struct PointerHub {
    inner: Rc<RefCell<HubInner>>,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`. It stays registered until the returned guard is
    /// dropped.
    pub fn listen(&self, handler: impl Fn(Point) + 'static) -> Listener {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Rc::new(handler)));
        Listener {
            id,
            hub: Rc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn pointer_down(&self, at: Point) {
        // Handlers may register or drop listeners, so call them on a snapshot.
        let handlers: Vec<PointerHandler> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();

        for handler in handlers {
            handler(at);
        }
    }
}

/// Registration guard returned by [`PointerHub::listen`].
pub struct Listener {
    id: u64,
    hub: Weak<RefCell<HubInner>>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.borrow_mut().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// A picker attached to a pointer hub. Dropping it detaches the outside
/// listener.
pub struct MountedPicker {
    picker: Rc<RefCell<CalendarPicker>>,
    _listener: Listener,
}

impl MountedPicker {
    pub fn mount(picker: CalendarPicker, hub: &PointerHub) -> Self {
        let picker = Rc::new(RefCell::new(picker));
        let weak = Rc::downgrade(&picker);

        let listener = hub.listen(move |at| {
            let Some(picker) = weak.upgrade() else {
                return;
            };
            // Busy means the event came from inside one of the picker's own
            // callbacks; the picker is handling it already.
            if let Ok(mut inner) = picker.try_borrow_mut() {
                inner.handle_pointer_down(at);
            };
        });

        Self {
            picker,
            _listener: listener,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut CalendarPicker) -> R) -> R {
        f(&mut self.picker.borrow_mut())
    }

    /// Detach from the hub and drop the picker.
    pub fn unmount(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recorder() -> (Rc<RefCell<Vec<DateRange>>>, impl FnMut(DateRange) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |range| sink.borrow_mut().push(range))
    }

    #[test]
    fn week_always_starts_sunday_and_spans_seven_days() {
        let mut d = date(2023, 1, 1);
        while d <= date(2025, 12, 31) {
            let week = week_of(d).unwrap();
            assert_eq!(week.start.weekday().num_days_from_sunday(), 0, "{d}");
            assert_eq!(week.end - week.start, Duration::days(6));
            assert!(week.contains(d));
            d += Duration::days(1);
        }
    }

    #[test]
    fn thursday_click_selects_surrounding_week() {
        let (seen, sink) = recorder();
        let mut picker = CalendarPicker::new_at(date(2024, 3, 1), sink);
        picker.toggle();
        picker.handle_date_click(date(2024, 3, 14));

        assert_eq!(
            seen.borrow().as_slice(),
            &[DateRange {
                start: date(2024, 3, 10),
                end: date(2024, 3, 16)
            }]
        );
        assert_eq!(picker.selected(), Some(date(2024, 3, 14)));
        assert_eq!(picker.state(), PickerState::Closed);
    }

    #[test]
    fn week_may_cross_month_and_year() {
        assert_eq!(
            week_of(date(2025, 1, 1)),
            Some(DateRange {
                start: date(2024, 12, 29),
                end: date(2025, 1, 4)
            })
        );
    }

    #[test]
    fn grid_is_always_42_cells_with_whole_month() {
        for year in [1999, 2000, 2023, 2024, 2100] {
            for month in 1..=12 {
                let reference = date(year, month, 15);
                let cells = days_in_month(reference).unwrap();
                assert_eq!(cells.len(), GRID_CELLS);

                let next = step_month(date(year, month, 1), MonthStep::Next);
                let month_len = (next - date(year, month, 1)).num_days() as usize;
                let current = cells.iter().filter(|c| c.is_current_month).count();
                assert_eq!(current, month_len, "{year}-{month}");

                assert_eq!(cells[0].date.weekday().num_days_from_sunday(), 0);
                assert!(cells.windows(2).all(|w| w[1].date - w[0].date == Duration::days(1)));
            }
        }
    }

    #[test]
    fn grid_starts_on_first_when_month_starts_sunday() {
        // September 2024 starts on a Sunday.
        let cells = days_in_month(date(2024, 9, 30)).unwrap();
        assert_eq!(cells[0].date, date(2024, 9, 1));
        assert!(cells[0].is_current_month);
        assert_eq!(cells[41].date, date(2024, 10, 12));
    }

    #[test]
    fn quick_select_weeks_are_adjacent() {
        let mut today = date(2024, 1, 1);
        for _ in 0..400 {
            let this = QuickSelect::ThisWeek.range_at(today).unwrap();
            let last = QuickSelect::LastWeek.range_at(today).unwrap();
            assert_eq!(this.start - last.end, Duration::days(1));
            assert_eq!(last.end, this.start - Duration::days(1));
            assert_eq!(last.start, this.start - Duration::days(7));
            assert!(this.contains(today));
            today += Duration::days(1);
        }
    }

    #[test]
    fn quick_select_emits_and_closes() {
        let (seen, sink) = recorder();
        let mut picker = CalendarPicker::new_at(date(2024, 3, 1), sink);
        picker.toggle();
        picker.handle_quick_select_at(QuickSelect::LastWeek, date(2024, 3, 14));

        assert_eq!(
            seen.borrow()[0],
            DateRange {
                start: date(2024, 3, 3),
                end: date(2024, 3, 9)
            }
        );
        assert!(!picker.is_open());
        assert_eq!(picker.selected(), None);
    }

    #[test]
    fn quick_select_parses_both_spellings() {
        assert_eq!("this-week".parse::<QuickSelect>(), Ok(QuickSelect::ThisWeek));
        assert_eq!("lastWeek".parse::<QuickSelect>(), Ok(QuickSelect::LastWeek));
        assert!("next-week".parse::<QuickSelect>().is_err());
    }

    #[test]
    fn month_steps_clamp_instead_of_skipping() {
        assert_eq!(step_month(date(2024, 1, 31), MonthStep::Next), date(2024, 2, 29));
        assert_eq!(step_month(date(2024, 3, 31), MonthStep::Prev), date(2024, 2, 29));
        assert_eq!(step_month(date(2024, 12, 15), MonthStep::Next), date(2025, 1, 15));
        assert_eq!(step_month(date(2024, 1, 15), MonthStep::Prev), date(2023, 12, 15));
    }

    #[test]
    fn change_month_moves_cursor_and_title() {
        let mut picker = CalendarPicker::new_at(date(2024, 3, 31), |_| {});
        assert_eq!(picker.month_title(), "March 2024");

        picker.change_month(MonthStep::Prev);
        assert_eq!(picker.month_title(), "February 2024");
        picker.change_month(MonthStep::Next);
        picker.change_month(MonthStep::Next);
        assert_eq!(picker.month_title(), "April 2024");
    }

    #[test]
    fn cell_flags_are_independent() {
        let mut picker = CalendarPicker::new_at(date(2024, 3, 1), |_| {});
        picker.handle_date_click(date(2024, 3, 14));

        let cells = picker.cells_at(date(2024, 3, 14)).unwrap();
        let both = cells.iter().find(|c| c.date == date(2024, 3, 14)).unwrap();
        assert!(both.is_today && both.is_selected && both.is_current_month);

        let outside = cells.iter().find(|c| c.date == date(2024, 2, 29)).unwrap();
        assert!(!outside.is_current_month && !outside.is_today && !outside.is_selected);

        assert_eq!(cells.iter().filter(|c| c.is_today).count(), 1);
        assert_eq!(cells.iter().filter(|c| c.is_selected).count(), 1);
    }

    #[test]
    fn toggle_flips_state() {
        let mut picker = CalendarPicker::new_at(date(2024, 3, 1), |_| {});
        assert_eq!(picker.state(), PickerState::Closed);
        picker.toggle();
        assert_eq!(picker.state(), PickerState::Open);
        picker.toggle();
        assert_eq!(picker.state(), PickerState::Closed);
    }

    #[test]
    fn outside_pointer_closes_inside_does_not() {
        let hub = PointerHub::new();
        let mut picker = CalendarPicker::new_at(date(2024, 3, 1), |_| {});
        picker.set_region(Rect::new(0.0, 0.0, 300.0, 320.0));
        let mounted = MountedPicker::mount(picker, &hub);

        mounted.with(|p| p.toggle());
        hub.pointer_down(Point::new(100.0, 100.0));
        assert!(mounted.with(|p| p.is_open()));

        hub.pointer_down(Point::new(500.0, 100.0));
        assert!(!mounted.with(|p| p.is_open()));
    }

    #[test]
    fn unknown_region_ignores_pointer() {
        let hub = PointerHub::new();
        let mounted = MountedPicker::mount(CalendarPicker::new_at(date(2024, 3, 1), |_| {}), &hub);
        mounted.with(|p| p.toggle());

        hub.pointer_down(Point::new(5000.0, 5000.0));
        assert!(mounted.with(|p| p.is_open()));
    }

    #[test]
    fn unmount_deregisters_listener() {
        let hub = PointerHub::new();
        let mounted = MountedPicker::mount(CalendarPicker::new_at(date(2024, 3, 1), |_| {}), &hub);
        assert_eq!(hub.listener_count(), 1);

        mounted.unmount();
        assert_eq!(hub.listener_count(), 0);

        hub.pointer_down(Point::new(0.0, 0.0));
    }

    #[test]
    fn dropping_open_picker_deregisters_listener() {
        let hub = PointerHub::new();
        {
            let mounted =
                MountedPicker::mount(CalendarPicker::new_at(date(2024, 3, 1), |_| {}), &hub);
            mounted.with(|p| p.toggle());
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listener_may_unmount_during_dispatch() {
        let hub = PointerHub::new();
        let slot: Rc<RefCell<Option<MountedPicker>>> = Rc::new(RefCell::new(None));

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let victim = Rc::clone(&slot);
        let _first = hub.listen(move |_| {
            counter.set(counter.get() + 1);
            victim.borrow_mut().take();
        });

        let mut picker = CalendarPicker::new_at(date(2024, 3, 1), |_| {});
        picker.set_region(Rect::new(0.0, 0.0, 10.0, 10.0));
        *slot.borrow_mut() = Some(MountedPicker::mount(picker, &hub));
        assert_eq!(hub.listener_count(), 2);

        hub.pointer_down(Point::new(50.0, 50.0));
        assert_eq!(calls.get(), 1);
        assert_eq!(hub.listener_count(), 1);
        assert!(slot.borrow().is_none());
    }

    #[test]
    fn range_formats_as_query_and_label() {
        let range = week_of(date(2024, 3, 14)).unwrap();
        assert_eq!(
            range.to_query(),
            [
                ("start_date", "2024-03-10".to_string()),
                ("end_date", "2024-03-16".to_string())
            ]
        );
        assert_eq!(range.to_string(), "Mar 10 - Mar 16");
        assert_eq!(range.days().count(), 7);
    }

    #[test]
    fn range_serializes_iso_days() {
        let json = serde_json::to_string(&week_of(date(2024, 3, 14)).unwrap()).unwrap();
        assert_eq!(json, r#"{"start":"2024-03-10","end":"2024-03-16"}"#);
    }

    #[test]
    fn date_math_at_calendar_edges_returns_none() {
        assert_eq!(week_of(NaiveDate::MAX), None);
        assert_eq!(days_in_month(NaiveDate::MAX), None);
        assert_eq!(days_in_month(NaiveDate::MIN), None);
        assert_eq!(QuickSelect::LastWeek.range_at(NaiveDate::MIN), None);
        assert!(cell_views(NaiveDate::MAX, None, NaiveDate::MAX).is_none());

        let last_full_week = NaiveDate::MAX - Duration::days(30);
        assert!(week_of(last_full_week).is_some());
    }

    #[test]
    fn unrepresentable_week_closes_without_callback() {
        let (seen, sink) = recorder();
        let mut picker = CalendarPicker::new_at(NaiveDate::MAX, sink);
        picker.toggle();
        picker.handle_date_click(NaiveDate::MAX);

        assert!(seen.borrow().is_empty());
        assert_eq!(picker.selected(), Some(NaiveDate::MAX));
        assert!(!picker.is_open());
        assert!(picker.cells_at(NaiveDate::MAX).is_none());
    }
}

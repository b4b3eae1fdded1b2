//! Seat layout and availability model.
//!
//! A bus seating grid is described by a [`BusLayout`]; rows are labelled
//! `"1".."N"` and columns `'A'..`, and a seat is addressed by the
//! concatenation of both labels (`"2C"`). Seat records reported for a trip
//! are folded into a [`SeatMap`], which classifies every seat for display
//! and decides whether it may become the current selection.
//!
//! Everything here is pure: no I/O, no interior state, safe to share.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Persisted status of a seat record on a trip.
///
/// `Open` only appears on records that were released after a booking was
/// rejected or cancelled; a seat with no record at all is open as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "seat_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Open,
    Booked,
    Reserved,
    Unavailable,
}

/// Display classification of a single seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    Open,
    Booked,
    Reserved,
    Unavailable,
    Selected,
}

impl SeatClass {
    /// Seats in this class cannot be clicked.
    pub fn is_disabled(self) -> bool {
        matches!(self, SeatClass::Booked | SeatClass::Reserved | SeatClass::Unavailable)
    }
}

/// Row/column dimensions of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusLayout {
    pub row_count: i32,
    pub column_count: i32,
}

impl BusLayout {
    pub fn new(row_count: i32, column_count: i32) -> Self {
        Self { row_count, column_count }
    }

    /// Zero or negative dimensions describe an empty bus.
    pub fn is_degenerate(&self) -> bool {
        self.row_count <= 0 || self.column_count <= 0
    }

    /// Columns that get a seat. Anything past [`MAX_COLUMNS`] has no label
    /// of its own and is left out of the grid.
    pub fn columns(&self) -> i32 {
        self.column_count.min(MAX_COLUMNS)
    }

    pub fn capacity(&self) -> usize {
        if self.is_degenerate() {
            0
        } else {
            self.row_count as usize * self.columns() as usize
        }
    }

    /// Whether a 1-based position lies inside the grid.
    pub fn contains(&self, row_position: i32, column_position: i32) -> bool {
        (1..=self.row_count).contains(&row_position)
            && (1..=self.columns()).contains(&column_position)
    }

    pub fn row_labels(&self) -> Vec<String> {
        (1..=self.row_count.max(0)).map(|row| row.to_string()).collect()
    }

    pub fn column_labels(&self) -> Vec<String> {
        (1..=self.columns().max(0))
            .map(|column| column_letter(column).to_string())
            .collect()
    }

    /// Comma-joined row labels as stored on the bus row (`"1,2,3"`).
    pub fn joined_row_labels(&self) -> String {
        self.row_labels().join(",")
    }

    /// Comma-joined column labels as stored on the bus row (`"A,B,C"`).
    pub fn joined_column_labels(&self) -> String {
        self.column_labels().join(",")
    }
}

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_LEN: u32 = 0x800;

/// Number of columns with a distinct letter: every scalar value from 'A'
/// up to `char::MAX`, surrogates excluded.
pub const MAX_COLUMNS: i32 = (char::MAX as u32 - 'A' as u32 + 1 - SURROGATE_LEN) as i32;

/// Letter for a 1-based column index: 1 -> 'A', 2 -> 'B', ...
///
/// Indices past 26 continue through the code points after 'Z', skipping the
/// surrogate block, so every index up to [`MAX_COLUMNS`] gets its own letter.
/// Letters never collide with the decimal row labels. Indices outside
/// `1..=MAX_COLUMNS` map to `U+FFFD`.
pub fn column_letter(column_position: i32) -> char {
    if !(1..=MAX_COLUMNS).contains(&column_position) {
        return char::REPLACEMENT_CHARACTER;
    }
    let mut code = 'A' as u32 + column_position as u32 - 1;
    if code >= SURROGATE_START {
        code += SURROGATE_LEN;
    }
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Inverse of [`column_letter`].
fn column_of(letter: char) -> Option<i32> {
    let mut code = u32::from(letter).checked_sub('A' as u32)?;
    if u32::from(letter) >= SURROGATE_START + SURROGATE_LEN {
        code -= SURROGATE_LEN;
    }
    i32::try_from(code + 1).ok()
}

/// Seat identifier: row label followed by column letter, e.g. `"3B"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(String);

impl SeatId {
    pub fn new(row_position: i32, column_position: i32) -> Self {
        SeatId(format!("{}{}", row_position, column_letter(column_position)))
    }

    /// Splits an identifier back into `(row_position, column_position)`.
    ///
    /// Returns `None` unless the input is a positive decimal row followed by
    /// exactly one column letter at or after 'A'.
    pub fn parse(raw: &str) -> Option<(i32, i32)> {
        let split = raw.find(|c: char| !c.is_ascii_digit())?;
        let (digits, rest) = raw.split_at(split);
        let row: i32 = digits.parse().ok()?;

        let mut chars = rest.chars();
        let letter = chars.next()?;
        if chars.next().is_some() || row < 1 {
            return None;
        }
        Some((row, column_of(letter)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SeatId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<SeatId> for String {
    fn from(id: SeatId) -> Self {
        id.0
    }
}

/// A reported status for one seat position on a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRecord {
    pub row_position: i32,
    pub column_position: i32,
    pub status: SeatStatus,
}

impl SeatRecord {
    pub fn seat_id(&self) -> SeatId {
        SeatId::new(self.row_position, self.column_position)
    }
}

/// One row of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub label: String,
    pub seats: Vec<SeatId>,
}

/// Complete ordered grid of seat identifiers for a layout.
///
/// Degenerate layouts produce an empty grid. Columns are capped at
/// [`MAX_COLUMNS`], so no two seats share an identifier.
pub fn build_grid(layout: &BusLayout) -> Vec<GridRow> {
    if layout.is_degenerate() {
        return Vec::new();
    }

    (1..=layout.row_count)
        .map(|row| GridRow {
            label: row.to_string(),
            seats: (1..=layout.columns())
                .map(|column| SeatId::new(row, column))
                .collect(),
        })
        .collect()
}

/// Classifies a seat. Precedence when the sets overlap:
/// `Unavailable > Booked > Reserved > Selected > Open`.
pub fn classify(
    seat: &str,
    booked: &HashSet<SeatId>,
    reserved: &HashSet<SeatId>,
    unavailable: &HashSet<SeatId>,
    selected: Option<&str>,
) -> SeatClass {
    if unavailable.contains(seat) {
        SeatClass::Unavailable
    } else if booked.contains(seat) {
        SeatClass::Booked
    } else if reserved.contains(seat) {
        SeatClass::Reserved
    } else if selected == Some(seat) {
        SeatClass::Selected
    } else {
        SeatClass::Open
    }
}

/// True iff the seat classifies as open when selection is ignored.
pub fn can_select(
    seat: &str,
    booked: &HashSet<SeatId>,
    reserved: &HashSet<SeatId>,
    unavailable: &HashSet<SeatId>,
) -> bool {
    classify(seat, booked, reserved, unavailable, None) == SeatClass::Open
}

/// Single-seat selection. Holds at most one seat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(Option<SeatId>);

impl Selection {
    pub fn get(&self) -> Option<&SeatId> {
        self.0.as_ref()
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_ref().map(SeatId::as_str)
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

/// Seat statuses of one trip laid over its bus layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMap {
    layout: BusLayout,
    booked: HashSet<SeatId>,
    reserved: HashSet<SeatId>,
    unavailable: HashSet<SeatId>,
}

impl SeatMap {
    /// A map with every seat open.
    pub fn new(layout: BusLayout) -> Self {
        Self {
            layout,
            booked: HashSet::new(),
            reserved: HashSet::new(),
            unavailable: HashSet::new(),
        }
    }

    /// Folds reported seat records into the three status sets.
    ///
    /// Records outside the layout keep their status for direct lookups but
    /// never show up in the grid.
    pub fn from_records<I>(layout: BusLayout, records: I) -> Self
    where
        I: IntoIterator<Item = SeatRecord>,
    {
        let mut map = Self::new(layout);
        for record in records {
            if !layout.contains(record.row_position, record.column_position) {
                debug!(
                    "Seat record at row {} column {} lies outside the {}x{} layout",
                    record.row_position, record.column_position, layout.row_count, layout.column_count
                );
            }
            map.mark(record.seat_id(), record.status);
        }
        map
    }

    /// Records a status for a seat. `Open` clears nothing; it simply adds
    /// no entry.
    pub fn mark(&mut self, seat: SeatId, status: SeatStatus) {
        match status {
            SeatStatus::Open => {}
            SeatStatus::Booked => {
                self.booked.insert(seat);
            }
            SeatStatus::Reserved => {
                self.reserved.insert(seat);
            }
            SeatStatus::Unavailable => {
                self.unavailable.insert(seat);
            }
        }
    }

    pub fn layout(&self) -> BusLayout {
        self.layout
    }

    pub fn grid(&self) -> Vec<GridRow> {
        build_grid(&self.layout)
    }

    pub fn classify(&self, seat: &str, selected: Option<&str>) -> SeatClass {
        classify(seat, &self.booked, &self.reserved, &self.unavailable, selected)
    }

    pub fn can_select(&self, seat: &str) -> bool {
        can_select(seat, &self.booked, &self.reserved, &self.unavailable)
    }

    /// Makes `seat` the current selection if it is an open seat of this
    /// layout. Anything else leaves the selection untouched and returns
    /// `false`.
    pub fn select(&self, selection: &mut Selection, seat: &str) -> bool {
        let Some((row, column)) = SeatId::parse(seat) else {
            return false;
        };
        if !self.layout.contains(row, column) {
            return false;
        }

        let seat = SeatId::new(row, column);
        if !self.can_select(seat.as_str()) {
            return false;
        }
        selection.0 = Some(seat);
        true
    }

    /// Number of grid seats that are currently bookable.
    pub fn open_count(&self) -> usize {
        self.grid()
            .iter()
            .flat_map(|row| row.seats.iter())
            .filter(|seat| self.can_select(seat.as_str()))
            .count()
    }

    /// Per-seat classification of the whole grid, ready to serialise.
    pub fn view(&self, selected: Option<&str>) -> SeatMapView {
        let rows = self
            .grid()
            .into_iter()
            .map(|row| SeatRowView {
                label: row.label,
                seats: row
                    .seats
                    .into_iter()
                    .map(|seat_id| {
                        let class = self.classify(seat_id.as_str(), selected);
                        SeatCell {
                            seat_id,
                            class,
                            disabled: class.is_disabled(),
                        }
                    })
                    .collect(),
            })
            .collect();

        SeatMapView {
            row_count: self.layout.row_count,
            column_count: self.layout.column_count,
            row_labels: self.layout.row_labels(),
            column_labels: self.layout.column_labels(),
            open_seats: self.open_count(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatCell {
    pub seat_id: SeatId,
    pub class: SeatClass,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatRowView {
    pub label: String,
    pub seats: Vec<SeatCell>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMapView {
    pub row_count: i32,
    pub column_count: i32,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub open_seats: usize,
    pub rows: Vec<SeatRowView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(ids: &[&str]) -> HashSet<SeatId> {
        ids.iter().map(|id| SeatId(id.to_string())).collect()
    }

    fn record(row: i32, column: i32, status: SeatStatus) -> SeatRecord {
        SeatRecord { row_position: row, column_position: column, status }
    }

    #[test]
    fn grid_labels_for_two_by_three() {
        let grid = build_grid(&BusLayout::new(2, 3));
        let rows: Vec<Vec<&str>> = grid
            .iter()
            .map(|row| row.seats.iter().map(SeatId::as_str).collect())
            .collect();

        assert_eq!(rows, vec![vec!["1A", "1B", "1C"], vec!["2A", "2B", "2C"]]);
        assert_eq!(grid[0].label, "1");
        assert_eq!(grid[1].label, "2");
    }

    #[test]
    fn degenerate_layouts_yield_empty_grid() {
        assert!(build_grid(&BusLayout::new(0, 4)).is_empty());
        assert!(build_grid(&BusLayout::new(4, 0)).is_empty());
        assert!(build_grid(&BusLayout::new(-2, 3)).is_empty());
        assert_eq!(BusLayout::new(0, 4).capacity(), 0);
    }

    #[test]
    fn labels_match_generation_rule() {
        let layout = BusLayout::new(3, 4);
        assert_eq!(layout.row_labels(), vec!["1", "2", "3"]);
        assert_eq!(layout.column_labels(), vec!["A", "B", "C", "D"]);
        assert_eq!(layout.joined_row_labels(), "1,2,3");
        assert_eq!(layout.joined_column_labels(), "A,B,C,D");
        assert_eq!(BusLayout::new(0, 0).joined_row_labels(), "");
    }

    #[test]
    fn seat_id_from_record_position() {
        assert_eq!(SeatId::new(2, 3).as_str(), "2C");
        assert_eq!(SeatId::new(12, 1).as_str(), "12A");
        assert_eq!(record(3, 2, SeatStatus::Booked).seat_id().as_str(), "3B");
    }

    #[test]
    fn seat_id_parse() {
        assert_eq!(SeatId::parse("2C"), Some((2, 3)));
        assert_eq!(SeatId::parse("14F"), Some((14, 6)));
        assert_eq!(SeatId::parse("C2"), None);
        assert_eq!(SeatId::parse("2"), None);
        assert_eq!(SeatId::parse("2CD"), None);
        assert_eq!(SeatId::parse("0A"), None);
        assert_eq!(SeatId::parse(""), None);
    }

    #[test]
    fn unavailable_beats_booked() {
        let booked = set(&["1A"]);
        let unavailable = set(&["1A"]);
        let class = classify("1A", &booked, &HashSet::new(), &unavailable, None);
        assert_eq!(class, SeatClass::Unavailable);
    }

    #[test]
    fn booked_beats_selection() {
        let booked = set(&["1A"]);
        let class = classify("1A", &booked, &HashSet::new(), &HashSet::new(), Some("1A"));
        assert_eq!(class, SeatClass::Booked);
    }

    #[test]
    fn reserved_beats_selection_and_booked_beats_reserved() {
        let reserved = set(&["2B"]);
        let booked = set(&["2B"]);
        let empty = HashSet::new();
        assert_eq!(classify("2B", &empty, &reserved, &empty, Some("2B")), SeatClass::Reserved);
        assert_eq!(classify("2B", &booked, &reserved, &empty, None), SeatClass::Booked);
    }

    #[test]
    fn selected_open_seat() {
        let empty = HashSet::new();
        assert_eq!(classify("4D", &empty, &empty, &empty, Some("4D")), SeatClass::Selected);
        assert_eq!(classify("4C", &empty, &empty, &empty, Some("4D")), SeatClass::Open);
    }

    #[test]
    fn trip_scenario() {
        let map = SeatMap::from_records(
            BusLayout::new(5, 4),
            vec![
                record(1, 1, SeatStatus::Booked),
                record(1, 2, SeatStatus::Booked),
                record(2, 1, SeatStatus::Reserved),
                record(1, 3, SeatStatus::Unavailable),
            ],
        );

        assert_eq!(map.classify("1A", None), SeatClass::Booked);
        assert_eq!(map.classify("1C", None), SeatClass::Unavailable);
        assert_eq!(map.classify("2A", None), SeatClass::Reserved);
        assert_eq!(map.classify("3D", None), SeatClass::Open);
        assert!(map.can_select("3D"));
        assert!(!map.can_select("1A"));
        assert_eq!(map.open_count(), 16);
    }

    #[test]
    fn out_of_range_record_keeps_status_but_not_grid_slot() {
        let map = SeatMap::from_records(BusLayout::new(2, 2), vec![record(7, 1, SeatStatus::Booked)]);

        assert_eq!(map.classify("7A", None), SeatClass::Booked);
        assert!(map
            .grid()
            .iter()
            .all(|row| row.seats.iter().all(|seat| seat.as_str() != "7A")));
        assert_eq!(map.open_count(), 4);
    }

    #[test]
    fn open_records_are_ignored() {
        let map = SeatMap::from_records(BusLayout::new(1, 2), vec![record(1, 1, SeatStatus::Open)]);
        assert!(map.can_select("1A"));
        assert_eq!(map.open_count(), 2);
    }

    #[test]
    fn selection_only_moves_to_open_seats() {
        let map = SeatMap::from_records(BusLayout::new(3, 3), vec![record(1, 1, SeatStatus::Reserved)]);
        let mut selection = Selection::default();

        assert!(map.select(&mut selection, "2B"));
        assert_eq!(selection.as_deref(), Some("2B"));

        assert!(!map.select(&mut selection, "1A"));
        assert_eq!(selection.as_deref(), Some("2B"));

        assert!(map.select(&mut selection, "3C"));
        assert_eq!(selection.as_deref(), Some("3C"));

        selection.clear();
        assert!(selection.get().is_none());
    }

    #[test]
    fn selection_must_be_a_seat_of_the_layout() {
        let map = SeatMap::new(BusLayout::new(2, 2));
        let mut selection = Selection::default();

        assert!(!map.select(&mut selection, "99Z"));
        assert!(!map.select(&mut selection, "3A"));
        assert!(!map.select(&mut selection, "1C"));
        assert!(!map.select(&mut selection, "hello"));
        assert!(!map.select(&mut selection, ""));
        assert!(selection.get().is_none());

        assert!(map.select(&mut selection, "02B"));
        assert_eq!(selection.as_deref(), Some("2B"));
        assert!(!map.select(&mut selection, "hello"));
        assert_eq!(selection.as_deref(), Some("2B"));
    }

    #[test]
    fn wide_layouts_keep_ids_unique() {
        let grid = build_grid(&BusLayout::new(1, 55_300));
        let unique: HashSet<&SeatId> = grid[0].seats.iter().collect();
        assert_eq!(unique.len(), 55_300);

        let after_gap = SeatId::new(1, 0xD800 - 'A' as i32 + 1);
        assert_eq!(after_gap.as_str(), "1\u{E000}");
        assert_eq!(SeatId::parse(after_gap.as_str()), Some((1, 0xD800 - 'A' as i32 + 1)));
    }

    #[test]
    fn column_count_is_capped() {
        let layout = BusLayout::new(1, i32::MAX);
        assert_eq!(layout.columns(), MAX_COLUMNS);
        assert_eq!(layout.capacity(), MAX_COLUMNS as usize);
        assert!(layout.contains(1, MAX_COLUMNS));
        assert!(!layout.contains(1, MAX_COLUMNS + 1));

        let last = SeatId::new(1, MAX_COLUMNS);
        assert_eq!(last.as_str(), format!("1{}", char::MAX));
        assert_eq!(SeatId::parse(last.as_str()), Some((1, MAX_COLUMNS)));
        assert_eq!(column_letter(MAX_COLUMNS + 1), char::REPLACEMENT_CHARACTER);

        let grid = build_grid(&BusLayout::new(1, MAX_COLUMNS + 10));
        assert_eq!(grid[0].seats.len(), MAX_COLUMNS as usize);
    }

    #[test]
    fn view_marks_disabled_cells() {
        let map = SeatMap::from_records(
            BusLayout::new(1, 3),
            vec![record(1, 1, SeatStatus::Booked), record(1, 3, SeatStatus::Unavailable)],
        );
        let view = map.view(Some("1B"));

        let cells = &view.rows[0].seats;
        assert_eq!(cells[0].class, SeatClass::Booked);
        assert!(cells[0].disabled);
        assert_eq!(cells[1].class, SeatClass::Selected);
        assert!(!cells[1].disabled);
        assert_eq!(cells[2].class, SeatClass::Unavailable);
        assert_eq!(view.open_seats, 1);
        assert_eq!(view.column_labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn status_wire_format() {
        let json = serde_json::to_string(&SeatClass::Unavailable).unwrap();
        assert_eq!(json, "\"UNAVAILABLE\"");
        let status: SeatStatus = serde_json::from_str("\"RESERVED\"").unwrap();
        assert_eq!(status, SeatStatus::Reserved);
    }

    proptest! {
        #[test]
        fn grid_is_complete_and_unique(rows in 1i32..40, columns in 1i32..12) {
            let grid = build_grid(&BusLayout::new(rows, columns));
            prop_assert_eq!(grid.len(), rows as usize);
            prop_assert!(grid.iter().all(|row| row.seats.len() == columns as usize));

            let unique: HashSet<&SeatId> = grid.iter().flat_map(|row| row.seats.iter()).collect();
            prop_assert_eq!(unique.len(), (rows * columns) as usize);
        }

        #[test]
        fn grid_and_classification_are_repeatable(
            rows in 0i32..20,
            columns in 0i32..8,
            booked in proptest::collection::vec((1i32..20, 1i32..8), 0..10),
        ) {
            let layout = BusLayout::new(rows, columns);
            prop_assert_eq!(build_grid(&layout), build_grid(&layout));

            let records: Vec<SeatRecord> = booked
                .iter()
                .map(|&(row, column)| record(row, column, SeatStatus::Booked))
                .collect();
            let first = SeatMap::from_records(layout, records.clone());
            let second = SeatMap::from_records(layout, records);
            prop_assert_eq!(&first, &second);
            for row in first.grid() {
                for seat in row.seats {
                    prop_assert_eq!(first.classify(seat.as_str(), None), second.classify(seat.as_str(), None));
                }
            }
        }

        #[test]
        fn can_select_iff_in_no_status_set(row in 1i32..10, column in 1i32..6, which in 0usize..4) {
            let seat = SeatId::new(row, column);
            let mut map = SeatMap::new(BusLayout::new(10, 6));
            let status = [SeatStatus::Open, SeatStatus::Booked, SeatStatus::Reserved, SeatStatus::Unavailable][which];
            map.mark(seat.clone(), status);
            prop_assert_eq!(map.can_select(seat.as_str()), status == SeatStatus::Open);
        }

        #[test]
        fn parse_inverts_new(row in 1i32..1000, column in 1i32..=MAX_COLUMNS) {
            let seat = SeatId::new(row, column);
            prop_assert_eq!(SeatId::parse(seat.as_str()), Some((row, column)));
        }
    }
}

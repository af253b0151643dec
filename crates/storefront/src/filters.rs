//! Product filter selection.
//!
//! Pure in-memory state: selected categories, tags and user-defined price
//! ranges. [`FilterSelection::to_query`] turns the selection into the
//! catalog query.

use std::collections::BTreeSet;

use orebi_core::{CategoryId, PriceRangeId, TagId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::ProductQuery;
use crate::error::ValidationError;

/// Id assigned to the first price range.
pub const FIRST_PRICE_RANGE_ID: u32 = 950;

/// A user-defined price band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub id: PriceRangeId,
    pub low: Decimal,
    pub high: Decimal,
}

/// Selected filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    categories: BTreeSet<CategoryId>,
    tags: BTreeSet<TagId>,
    selected_ranges: BTreeSet<PriceRangeId>,
    price_ranges: Vec<PriceRange>,
}

impl FilterSelection {
    /// Empty selection with no price ranges.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected category ids.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryId> {
        self.categories.iter()
    }

    /// Selected tag ids.
    pub fn tags(&self) -> impl Iterator<Item = &TagId> {
        self.tags.iter()
    }

    /// All defined price ranges, in insertion order.
    #[must_use]
    pub fn price_ranges(&self) -> &[PriceRange] {
        &self.price_ranges
    }

    /// Selected price ranges, in insertion order.
    pub fn selected_price_ranges(&self) -> impl Iterator<Item = &PriceRange> {
        self.price_ranges
            .iter()
            .filter(|range| self.selected_ranges.contains(&range.id))
    }

    /// Whether a price range is selected.
    #[must_use]
    pub fn is_price_range_selected(&self, id: PriceRangeId) -> bool {
        self.selected_ranges.contains(&id)
    }

    /// Add the category if absent, remove it if present.
    pub fn toggle_category(&mut self, id: CategoryId) {
        toggle(&mut self.categories, id);
    }

    /// Add the tag if absent, remove it if present.
    pub fn toggle_tag(&mut self, id: TagId) {
        toggle(&mut self.tags, id);
    }

    /// Define a new price range.
    ///
    /// Ids are sequential, starting at [`FIRST_PRICE_RANGE_ID`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPriceRange`] unless `low >= 0` and
    /// `high > low`; the ranges are left unchanged.
    pub fn add_price_range(
        &mut self,
        low: Decimal,
        high: Decimal,
    ) -> Result<PriceRange, ValidationError> {
        if low < Decimal::ZERO || high <= low {
            return Err(ValidationError::InvalidPriceRange { low, high });
        }

        let id = self
            .price_ranges
            .iter()
            .map(|range| range.id.as_u32())
            .max()
            .map_or(FIRST_PRICE_RANGE_ID, |max| max + 1);

        let range = PriceRange {
            id: PriceRangeId::new(id),
            low,
            high,
        };
        self.price_ranges.push(range);
        Ok(range)
    }

    /// Remove a price range together with its selection.
    ///
    /// Returns whether a range was removed.
    pub fn remove_price_range(&mut self, id: PriceRangeId) -> bool {
        let before = self.price_ranges.len();
        self.price_ranges.retain(|range| range.id != id);
        self.selected_ranges.remove(&id);
        self.price_ranges.len() < before
    }

    /// Toggle the selection of a price range; other selections are kept.
    ///
    /// Unknown ids are ignored.
    pub fn toggle_price_range_selection(&mut self, id: PriceRangeId) {
        if self.price_ranges.iter().any(|range| range.id == id) {
            toggle(&mut self.selected_ranges, id);
        }
    }

    /// Select exactly one price range, or clear it if it was the selection.
    pub fn select_single_price_range(&mut self, id: PriceRangeId) {
        let was_selected = self.selected_ranges.contains(&id);
        self.selected_ranges.clear();
        if !was_selected {
            self.toggle_price_range_selection(id);
        }
    }

    /// Remove every price range and selection.
    pub fn clear_price_ranges(&mut self) {
        self.price_ranges.clear();
        self.selected_ranges.clear();
    }

    /// Catalog query for the current selection.
    ///
    /// Selected price ranges collapse into one band from the lowest lower
    /// bound to the highest upper bound.
    #[must_use]
    pub fn to_query(&self) -> ProductQuery {
        let (min_price, max_price) = self.selected_price_ranges().fold(
            (None, None),
            |(min, max): (Option<Decimal>, Option<Decimal>), range| {
                (
                    Some(min.map_or(range.low, |m| m.min(range.low))),
                    Some(max.map_or(range.high, |m| m.max(range.high))),
                )
            },
        );

        ProductQuery {
            category_ids: self.categories.iter().cloned().collect(),
            tag_ids: self.tags.iter().cloned().collect(),
            min_price,
            max_price,
            ..ProductQuery::default()
        }
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

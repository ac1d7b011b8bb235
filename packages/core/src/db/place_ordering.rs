//! Dense place arithmetic for relationship sides
//!
//! Places are zero-based integers. Unlike fractional ordering there is no
//! gap to exploit, so inserts and removals renumber the remaining siblings.

/// Calculates places for relationships sharing an item and a side
pub struct PlaceOrderCalculator;

impl PlaceOrderCalculator {
    /// Place following the existing ones
    ///
    /// # Examples
    /// ```
    /// use relata_core::db::PlaceOrderCalculator;
    ///
    /// assert_eq!(PlaceOrderCalculator::next_place([]), 0);
    /// assert_eq!(PlaceOrderCalculator::next_place([0, 4, 1]), 5);
    /// ```
    pub fn next_place(existing: impl IntoIterator<Item = i32>) -> i32 {
        existing
            .into_iter()
            .max()
            .map(|max| max.saturating_add(1))
            .unwrap_or(0)
    }

    /// Indices into `places` in the order their places should be renumbered
    ///
    /// The sort is stable, so siblings sharing a place keep their input order.
    pub fn renumbering_order(places: &[i32]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..places.len()).collect();
        order.sort_by_key(|index| places[*index]);
        order
    }

    /// How many times a value at `place` is repeated in a weighted list of `count` values
    ///
    /// Earlier places weigh more; out-of-range places still count once.
    pub fn weight(count: usize, place: i32) -> usize {
        let place = usize::try_from(place).unwrap_or(0);
        count.saturating_sub(place).max(1)
    }
}

//! Selection expressions: which listed items to download.
//!
//! Grammar (comma separated, whitespace around tokens ignored):
//!
//! ```text
//! expr  := token ("," token)*
//! token := INDEX | INDEX "-" INDEX | "T" | "Q"      (letters case-insensitive)
//! ```
//!
//! Indices are 1-based display positions. Out-of-range indices are dropped,
//! reversed ranges are empty, duplicates keep their first position.

use std::collections::HashSet;

use tracing::{debug, instrument};

use super::error::SelectionError;
use crate::listing::ListedItem;

/// Result of parsing a selection expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Operator asked to end the session.
    Quit,
    /// Display indices in first-occurrence order, all within `1..=item_count`.
    Indices(Vec<usize>),
}

impl Selection {
    /// Returns true when nothing survived the range filter.
    ///
    /// `Quit` is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Indices(indices) if indices.is_empty())
    }

    /// Maps selected display indices to message ids, preserving order.
    ///
    /// Indices with no matching item are skipped; `Quit` maps to nothing.
    #[must_use]
    pub fn resolve_ids(&self, items: &[ListedItem]) -> Vec<i64> {
        let Self::Indices(indices) = self else {
            return Vec::new();
        };
        indices
            .iter()
            .filter_map(|index| {
                items
                    .iter()
                    .find(|item| item.display_index == *index)
                    .map(|item| item.id)
            })
            .collect()
    }
}

/// Parses a selection expression against a listing of `item_count` items.
///
/// # Errors
///
/// Returns [`SelectionError::Malformed`] for the first token that is not an
/// index, a range, `T` or `Q`. Empty input and empty tokens are malformed.
///
/// # Examples
///
/// ```
/// use tgmedia_core::parser::{Selection, parse_selection};
///
/// let selection = parse_selection("3,1-2,3", 10).unwrap();
/// assert_eq!(selection, Selection::Indices(vec![3, 1, 2]));
/// assert_eq!(parse_selection("q", 10).unwrap(), Selection::Quit);
/// ```
#[instrument(level = "debug", skip(expr), fields(expr_len = expr.len()))]
pub fn parse_selection(expr: &str, item_count: usize) -> Result<Selection, SelectionError> {
    let mut indices = Vec::new();
    let mut seen = HashSet::new();

    for raw_token in expr.split(',') {
        let token = raw_token.trim();

        if token.eq_ignore_ascii_case("q") {
            debug!("quit requested");
            return Ok(Selection::Quit);
        }

        let (start, end) = if token.eq_ignore_ascii_case("t") {
            (1, item_count)
        } else if let Some((start, end)) = token.split_once('-') {
            (parse_index(start, token)?, parse_index(end, token)?)
        } else {
            let index = parse_index(token, token)?;
            (index, index)
        };

        // Clamp before expanding so "1-999999999" costs nothing.
        for index in start.max(1)..=end.min(item_count) {
            if seen.insert(index) {
                indices.push(index);
            }
        }
    }

    debug!(selected = indices.len(), item_count, "selection parsed");
    Ok(Selection::Indices(indices))
}

fn parse_index(part: &str, token: &str) -> Result<usize, SelectionError> {
    part.trim()
        .parse::<usize>()
        .map_err(|_| SelectionError::malformed(token))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn indices(expr: &str, count: usize) -> Vec<usize> {
        match parse_selection(expr, count).unwrap() {
            Selection::Indices(indices) => indices,
            Selection::Quit => panic!("unexpected quit for {expr:?}"),
        }
    }

    #[test]
    fn test_single_index() {
        assert_eq!(indices("4", 10), vec![4]);
    }

    #[test]
    fn test_mixed_list_and_range_keeps_order() {
        let result = indices("10,15,18-30", 100);
        assert_eq!(result.len(), 15);
        assert_eq!(&result[..3], &[10, 15, 18]);
        assert_eq!(result.last(), Some(&30));
    }

    #[test]
    fn test_reversed_range_is_empty() {
        assert!(indices("5-3", 100).is_empty());
    }

    #[test]
    fn test_all_token_any_case() {
        assert_eq!(indices("t", 7), (1..=7).collect::<Vec<_>>());
        assert_eq!(indices("T", 3), vec![1, 2, 3]);
    }

    #[test]
    fn test_all_token_with_no_items_is_empty() {
        assert!(indices("t", 0).is_empty());
    }

    #[test]
    fn test_quit_token_any_case() {
        assert_eq!(parse_selection("Q", 0).unwrap(), Selection::Quit);
        assert_eq!(parse_selection(" q ", 50).unwrap(), Selection::Quit);
    }

    #[test]
    fn test_quit_wins_inside_list() {
        assert_eq!(parse_selection("1,q,2", 5).unwrap(), Selection::Quit);
    }

    #[test]
    fn test_letters_are_malformed() {
        let err = parse_selection("abc", 10).unwrap_err();
        assert_eq!(err, SelectionError::malformed("abc"));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        assert!(parse_selection("", 10).is_err());
        assert!(parse_selection("1,,2", 10).is_err());
        assert!(parse_selection("1,", 10).is_err());
    }

    #[test]
    fn test_negative_and_multi_dash_are_malformed() {
        assert!(parse_selection("-3", 10).is_err());
        assert!(parse_selection("1-2-3", 10).is_err());
        assert!(parse_selection("2-", 10).is_err());
    }

    #[test]
    fn test_out_of_range_indices_are_dropped() {
        assert_eq!(indices("0,3,11,7", 10), vec![3, 7]);
        assert_eq!(indices("8-12", 10), vec![8, 9, 10]);
    }

    #[test]
    fn test_huge_range_is_clamped() {
        assert_eq!(indices("1-18446744073709551615", 3), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        assert_eq!(indices("5,1-6,2", 10), vec![5, 1, 2, 3, 4, 6]);
    }

    #[test]
    fn test_whitespace_around_tokens_and_bounds() {
        assert_eq!(indices(" 2 , 4 - 5 ", 10), vec![2, 4, 5]);
    }

    #[test]
    fn test_all_after_explicit_indices_appends_rest() {
        assert_eq!(indices("3,t", 4), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_is_empty() {
        assert!(Selection::Indices(Vec::new()).is_empty());
        assert!(!Selection::Indices(vec![1]).is_empty());
        assert!(!Selection::Quit.is_empty());
    }

    #[test]
    fn test_resolve_ids_follows_selection_order() {
        let items: Vec<ListedItem> = (1..=5)
            .map(|i| ListedItem::new(i64::try_from(i).unwrap() * 100, i, None, None))
            .collect();
        let selection = Selection::Indices(vec![4, 2]);
        assert_eq!(selection.resolve_ids(&items), vec![400, 200]);
        assert!(Selection::Quit.resolve_ids(&items).is_empty());
    }
}

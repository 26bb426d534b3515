//! Key-range windows
//!
//! Splits the key range left after the first page into page-sized windows.
//! Each window is fetched as one command with an inclusive key range, so
//! holes in the key space only make a window sparser, never shift records
//! into a neighbouring window.

use crate::query::{Direction, Filter};

/// Inclusive key range fetched by one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdWindow {
    /// Lowest key of the window
    pub start: u64,
    /// Highest key of the window
    pub end: u64,
    /// Last window of the traversal
    pub is_final: bool,
}

impl IdWindow {
    /// Restrict a filter to this window
    pub fn apply(&self, filter: &Filter, key_field: &str) -> Filter {
        let mut filter = filter.clone();
        filter.set(format!(">={key_field}"), self.start);
        filter.set(format!("<={key_field}"), self.end);
        filter
    }
}

/// Plan the windows between the last key of the first page and the key of the
/// last record of the set.
///
/// Returns the emission direction and the windows in emission order. When the
/// last record's key is above the first page's last key, windows run upward
/// from `first_page_last_id + 1`; when it is below, the boundaries are swapped
/// and windows run downward from `first_page_last_id - 1`. The window reaching
/// `last_element_id` is the final one and may be narrower than `width`.
pub fn split_windows(
    first_page_last_id: u64,
    last_element_id: u64,
    width: usize,
) -> (Direction, Vec<IdWindow>) {
    let width = width.max(1) as u64;
    let mut windows = Vec::new();

    if last_element_id >= first_page_last_id {
        let mut start = first_page_last_id + 1;
        while start <= last_element_id {
            let end = start.saturating_add(width - 1).min(last_element_id);
            windows.push(IdWindow {
                start,
                end,
                is_final: end == last_element_id,
            });
            start = end + 1;
        }
        (Direction::Asc, windows)
    } else {
        let mut end = first_page_last_id - 1;
        loop {
            let start = end.saturating_sub(width - 1).max(last_element_id);
            let is_final = start == last_element_id;
            windows.push(IdWindow {
                start,
                end,
                is_final,
            });
            if is_final {
                break;
            }
            end = start - 1;
        }
        (Direction::Desc, windows)
    }
}

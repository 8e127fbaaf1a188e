//! Derived view state for the meeting grid and header

use serde::{Deserialize, Serialize};

/// Column counts for the video grid on compact and wide screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub compact_columns: u8,
    pub wide_columns: u8,
}

impl GridLayout {
    pub fn for_participants(count: usize) -> Self {
        let (compact_columns, wide_columns) = match count {
            0 | 1 => (1, 1),
            2..=4 => (2, 2),
            5..=6 => (2, 3),
            7..=9 => (3, 3),
            _ => (3, 4),
        };
        Self {
            compact_columns,
            wide_columns,
        }
    }
}

/// Render elapsed seconds as `MM:SS`, or `H:MM:SS` from one hour on
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

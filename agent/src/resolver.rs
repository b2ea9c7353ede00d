//! Task reference resolution.
//!
//! Pure matching of a free-text reference against the task list the user
//! was most recently shown. Precedence is exact > partial > positional:
//! the most specific rule that produces any match wins, and if more than
//! one candidate survives that rule the resolver reports ambiguity rather
//! than guessing.
//!
//! Text rules match pending tasks only (completing or deleting an already
//! completed task by text is almost always a mistake). Positional and
//! numeric rules run against the full displayed list, because the numbers
//! the user types come from the numbered listing, which includes
//! completed tasks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::TaskSnapshot;

/// Outcome of resolving one reference against one task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    NoMatch,
    OneMatch(TaskSnapshot),
    ManyMatches(Vec<TaskSnapshot>),
}

static NUMERIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"task\s*(\d+)", r"#\s*(\d+)", r"number\s*(\d+)", r"^(\d+)$"]
        .iter()
        .map(|p| Regex::new(p).expect("numeric pattern"))
        .collect()
});

const POSITION_WORDS: &[(&str, i64)] = &[
    ("first", 1),
    ("1st", 1),
    ("second", 2),
    ("2nd", 2),
    ("third", 3),
    ("3rd", 3),
    ("fourth", 4),
    ("4th", 4),
    ("fifth", 5),
    ("5th", 5),
    ("last", -1),
];

/// Resolve `reference` against `tasks` (display order). Pure function.
pub fn resolve(reference: &str, tasks: &[TaskSnapshot]) -> Resolution {
    let reference = reference.trim().to_lowercase();
    if reference.is_empty() || tasks.is_empty() {
        return Resolution::NoMatch;
    }

    let pending: Vec<&TaskSnapshot> = tasks.iter().filter(|t| !t.completed).collect();

    // Rule 1: exact case-insensitive description match.
    let exact: Vec<&TaskSnapshot> = pending
        .iter()
        .copied()
        .filter(|t| t.description.to_lowercase() == reference)
        .collect();
    match exact.len() {
        1 => return Resolution::OneMatch(exact[0].clone()),
        n if n > 1 => return Resolution::ManyMatches(exact.into_iter().cloned().collect()),
        _ => {}
    }

    // Rule 2: substring match.
    let partial: Vec<&TaskSnapshot> = pending
        .iter()
        .copied()
        .filter(|t| t.description.to_lowercase().contains(&reference))
        .collect();
    match partial.len() {
        1 => return Resolution::OneMatch(partial[0].clone()),
        n if n > 1 => return Resolution::ManyMatches(partial.into_iter().cloned().collect()),
        _ => {}
    }

    // Rule 3: positional / numeric reference against the displayed list.
    if let Some(task) = resolve_position(&reference, tasks) {
        return Resolution::OneMatch(task.clone());
    }
    if let Some(task) = resolve_numeric(&reference, tasks) {
        return Resolution::OneMatch(task.clone());
    }

    Resolution::NoMatch
}

fn resolve_position<'a>(reference: &str, tasks: &'a [TaskSnapshot]) -> Option<&'a TaskSnapshot> {
    // Whole-word matches only, so "ballast" never reads as "last".
    for (word, position) in POSITION_WORDS {
        if reference.split_whitespace().any(|w| w == *word) {
            return if *position == -1 {
                tasks.last()
            } else {
                tasks.get((*position - 1) as usize)
            };
        }
    }
    None
}

fn resolve_numeric<'a>(reference: &str, tasks: &'a [TaskSnapshot]) -> Option<&'a TaskSnapshot> {
    for pattern in NUMERIC_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(reference) {
            let number: usize = captures.get(1)?.as_str().parse().ok()?;
            // 1-based against the list as displayed.
            if number >= 1 {
                return tasks.get(number - 1);
            }
        }
    }
    None
}

//! Turns one log file into a [`DayRecord`] plus its unresolved food lines.

use tracing::debug;

use crate::food_line::parse_food_line;
use crate::header::{normalize_value, parse_date, recover_date, split_header};
use crate::matcher::FoodMatcher;
use crate::models::{basename, DayRecord, MetaValue, MissingFoodEntry, Nutrients};
use crate::reference::FoodIndex;

/// Longest status annotation kept, in characters.
pub const STATUS_MAX_CHARS: usize = 120;

/// Drives header extraction and food matching for single log entries.
#[derive(Debug, Clone, Copy)]
pub struct DayAggregator<'a> {
    index: &'a FoodIndex,
    matcher: FoodMatcher,
}

impl<'a> DayAggregator<'a> {
    pub fn new(index: &'a FoodIndex) -> Self {
        Self {
            index,
            matcher: FoodMatcher::default(),
        }
    }

    pub fn with_matcher(mut self, matcher: FoodMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Process one log entry. `path` identifies the file (relative to the
    /// corpus root) and is searched for a `YYYY-MM-DD` date when the header
    /// has none. Without either, the record stays undated.
    pub fn process(&self, text: &str, path: &str) -> (DayRecord, Vec<MissingFoodEntry>) {
        let file = basename(path);
        let split = split_header(text);
        let mut meta = split.meta;
        recover_date(&mut meta, path);

        for (key, value) in meta.iter_mut() {
            if key == "date" {
                continue;
            }
            if let MetaValue::Text(s) = value {
                if s.chars().any(|c| c.is_ascii_digit()) {
                    *value = MetaValue::from_normalized(normalize_value(s));
                }
            }
        }

        let lines: Vec<&str> = split.body.lines().collect();
        let status = find_status(&lines);
        if let Some((ref text, _)) = status {
            meta.insert("status", MetaValue::Text(text.clone()));
        }
        let skipped = status.map(|(_, range)| range).unwrap_or(0..0);

        let mut consumed = Nutrients::default();
        let mut foods = Vec::new();
        let mut missing = Vec::new();

        for (i, raw) in lines.iter().enumerate() {
            if skipped.contains(&i) || raw.trim().is_empty() {
                continue;
            }
            let Some(mut item) = parse_food_line(raw) else {
                continue;
            };
            match self.matcher.resolve(&item.name, self.index) {
                Some(m) => {
                    consumed += m.nutrients(item.quantity_g);
                    item.food_id = Some(m.food.id.clone());
                    item.confidence = m.confidence();
                    debug!(
                        "{}: {} g {:?} -> {} ({:?})",
                        file, item.quantity_g, item.name, m.food.id, m.kind
                    );
                    foods.push(item);
                }
                None => {
                    debug!("{}: unresolved {:?}", file, item.name);
                    missing.push(MissingFoodEntry {
                        file: file.clone(),
                        line: raw.trim().to_string(),
                        name: item.name,
                    });
                }
            }
        }

        let date = meta.get("date").map(|v| {
            let raw = v.to_string();
            parse_date(&raw)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or(raw)
        });

        let record = DayRecord {
            file,
            path: path.to_string(),
            date,
            meta,
            consumed: consumed.rounded(),
            matched: foods.len(),
            foods,
            unresolved: missing.len(),
        };
        (record, missing)
    }
}

/// Process one log entry with the default matcher.
pub fn process_entry(
    text: &str,
    path: &str,
    index: &FoodIndex,
) -> (DayRecord, Vec<MissingFoodEntry>) {
    DayAggregator::new(index).process(text, path)
}

/// Find a standalone `Status`/`Agenda` line and join the lines that follow
/// it, up to a blank line or a heading. Returns the annotation and the body
/// line range it covers, heading included.
fn find_status(lines: &[&str]) -> Option<(String, std::ops::Range<usize>)> {
    let start = lines.iter().position(|l| {
        let l = l.trim().to_lowercase();
        l == "status" || l == "agenda"
    })?;

    let mut parts = Vec::new();
    let mut end = start + 1;
    for line in &lines[start + 1..] {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') || s.starts_with("**") {
            break;
        }
        parts.push(s);
        end += 1;
    }
    if parts.is_empty() {
        return None;
    }

    let joined = parts.join(" ");
    let text = if joined.chars().count() > STATUS_MAX_CHARS {
        let head: String = joined.chars().take(STATUS_MAX_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        joined
    };
    Some((text, start..end))
}

//! Header extraction for daily log entries.
//!
//! A log entry starts with a metadata block in one of three shapes, tried in
//! this order:
//!
//! 1. YAML front matter between two `---` lines at the top of the file.
//! 2. A key:value block between two punctuation-only delimiter lines
//!    (`----`, `⸻`, ...), the first of which is the first non-blank line.
//! 3. Key:value lines from the top of the file up to the first blank line.
//!
//! Keys are lower-cased, underscore-joined and mapped onto canonical names;
//! values go through [`normalize_value`]. Nothing in here fails: values that
//! cannot be normalized are kept as written.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_yaml::Value as YamlValue;

use crate::models::{round2, HeaderMetadata, MetaValue};

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid time regex"));

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d+(?:[.,]\d*)?)\s*(?:[%a-zA-Z]+)?$").expect("valid number regex")
});

static DELIMITER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\w\s]+$").expect("valid delimiter regex"));

static PATH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid date regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Header metadata plus the text that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSplit {
    pub meta: HeaderMetadata,
    pub body: String,
}

/// Metadata of a log entry, without the body.
pub fn extract_header(text: &str) -> HeaderMetadata {
    split_header(text).meta
}

/// Separate the metadata block from the body and normalize it.
pub fn split_header(text: &str) -> HeaderSplit {
    let lines: Vec<&str> = text.lines().collect();

    let (pairs, body_start) = front_matter(&lines)
        .or_else(|| delimited_block(&lines))
        .unwrap_or_else(|| blank_line_block(&lines));

    let mut meta = HeaderMetadata::new();
    for (key, value) in pairs {
        let key = canonical_key(&normalize_key(&key));
        let value = if key == "date" {
            normalize_date_value(&value)
        } else {
            normalize_value(&value)
        };
        meta.insert(key, MetaValue::from_normalized(value));
    }

    HeaderSplit {
        meta,
        body: lines[body_start.min(lines.len())..].join("\n"),
    }
}

/// `(pairs, index of first body line)`
type Block = (Vec<(String, String)>, usize);

fn front_matter(lines: &[&str]) -> Option<Block> {
    if lines.first()?.trim_start_matches('\u{feff}').trim() != "---" {
        return None;
    }
    let close = lines.iter().skip(1).position(|l| l.trim() == "---")? + 1;
    let yaml = lines[1..close].join("\n");

    let mapping = match serde_yaml::from_str::<YamlValue>(&yaml) {
        Ok(YamlValue::Mapping(m)) if !m.is_empty() => m,
        _ => return None,
    };
    let pairs = mapping
        .iter()
        .map(|(k, v)| (yaml_scalar_to_string(k), yaml_scalar_to_string(v)))
        .collect();
    Some((pairs, close + 1))
}

fn delimited_block(lines: &[&str]) -> Option<Block> {
    let open = lines.iter().position(|l| !l.trim().is_empty())?;
    if !DELIMITER_RE.is_match(lines[open].trim()) {
        return None;
    }
    let close = lines
        .iter()
        .enumerate()
        .skip(open + 1)
        .find(|(_, l)| {
            let l = l.trim();
            !l.is_empty() && DELIMITER_RE.is_match(l)
        })
        .map(|(i, _)| i)?;
    Some((parse_kv_lines(&lines[open + 1..close]), close + 1))
}

fn blank_line_block(lines: &[&str]) -> Block {
    let end = lines
        .iter()
        .position(|l| l.trim().is_empty())
        .unwrap_or(lines.len());
    let pairs = parse_kv_lines(&lines[..end]);
    if pairs.is_empty() {
        // No header at all: the whole text is body.
        return (pairs, 0);
    }
    (pairs, end + 1)
}

/// Parse `key: value` lines, stopping at the first blank line. Lines without
/// a colon are ignored.
fn parse_kv_lines(lines: &[&str]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            pairs.push((key.trim().to_string(), value.trim().replace(',', ".")));
        }
    }
    pairs
}

/// Lower-case and underscore-join a header key.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Map known header spellings onto canonical keys; unknown keys pass through.
pub fn canonical_key(key: &str) -> String {
    let canonical = match key {
        "weight" => "weight_kg",
        "bodyfat" | "bodyfat_percentage" => "bodyfat_pct",
        "water" | "water_percentage" => "water_pct",
        "muscle" | "muscle_percentage" => "muscle_pct",
        "bones" | "bones_percentage" => "bones_pct",
        "calories" => "target_calories",
        "target_protein" => "target_protein_g",
        "target_fat" => "target_fat_g",
        "target_carbs" => "target_carbs_g",
        "actual_protein" => "actual_protein_g",
        "actual_fat" => "actual_fat_g",
        "actual_carbs" => "actual_carbs_g",
        "abdgirth" => "abdgirth_cm",
        other => other,
    };
    canonical.to_string()
}

/// Normalize one header value.
///
/// - `H:MM` / `HH:MM` become decimal hours (`"7:30"` → `"7.5"`).
/// - A number with an optional unit suffix becomes the bare number, with a
///   dot as decimal separator (`"70,0 kg"` → `"70"`, `"12.5%"` → `"12.5"`).
/// - Anything else is returned trimmed and unquoted.
pub fn normalize_value(raw: &str) -> String {
    let s = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    if s.is_empty() {
        return String::new();
    }

    if let Some(caps) = TIME_RE.captures(s) {
        if let (Ok(h), Ok(m)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            return format_number(f64::from(h) + f64::from(m) / 60.0);
        }
    }

    if let Some(caps) = NUMBER_RE.captures(s) {
        if let Ok(n) = caps[1].replace(',', ".").trim_end_matches('.').parse::<f64>() {
            return format_number(n);
        }
    }

    s.to_string()
}

/// Integer string when whole (within 1e-9), otherwise two decimals at most.
fn format_number(n: f64) -> String {
    if (n - n.round()).abs() < 1e-9 {
        format!("{}", n.round() as i64)
    } else {
        format!("{}", round2(n))
    }
}

/// Parse the date spellings seen in log headers.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn normalize_date_value(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string(),
    }
}

/// Set `date` from a `YYYY-MM-DD` substring of `path` when the header has
/// none. Returns whether a date is present afterwards.
pub fn recover_date(meta: &mut HeaderMetadata, path: &str) -> bool {
    let has_date = meta
        .get("date")
        .is_some_and(|v| !v.to_string().trim().is_empty());
    if has_date {
        return true;
    }
    match PATH_DATE_RE.captures(path) {
        Some(caps) => {
            meta.insert("date", MetaValue::Text(caps[1].to_string()));
            true
        }
        None => false,
    }
}

/// Render a YAML scalar the way it was written; null becomes empty.
pub(crate) fn yaml_scalar_to_string(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => String::new(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

use std::ops::AddAssign;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Round to two decimals, the precision every nutrient total is reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Energy and macronutrient amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    /// Energy (kcal)
    pub kcal: f64,
    /// Protein (g)
    pub protein_g: f64,
    /// Fat (g)
    pub fat_g: f64,
    /// Carbohydrate (g)
    pub carbs_g: f64,
}

impl Nutrients {
    /// Contribution of `grams` of a food whose per-100g values are `self`,
    /// rounded per nutrient.
    pub fn scaled(&self, grams: f64) -> Self {
        let factor = grams / 100.0;
        Self {
            kcal: round2(self.kcal * factor),
            protein_g: round2(self.protein_g * factor),
            fat_g: round2(self.fat_g * factor),
            carbs_g: round2(self.carbs_g * factor),
        }
    }

    pub fn rounded(&self) -> Self {
        Self {
            kcal: round2(self.kcal),
            protein_g: round2(self.protein_g),
            fat_g: round2(self.fat_g),
            carbs_g: round2(self.carbs_g),
        }
    }
}

impl AddAssign for Nutrients {
    fn add_assign(&mut self, other: Self) {
        self.kcal += other.kcal;
        self.protein_g += other.protein_g;
        self.fat_g += other.fat_g;
        self.carbs_g += other.carbs_g;
    }
}

/// An entry of the reference nutrition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFood {
    /// Unique key, e.g. `oats`
    pub id: String,
    /// Display name
    pub name: String,
    /// Nutrition per 100 g
    pub per_100g: Nutrients,
    /// Lower-cased alias strings, declared aliases first
    pub aliases: Vec<String>,
}

/// A normalized header value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    Text(String),
}

impl MetaValue {
    /// Type an already-normalized string: plain decimal numbers become
    /// `Number`, everything else stays text.
    pub fn from_normalized(value: String) -> Self {
        let numeric = !value.is_empty()
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+'));
        match value.parse::<f64>() {
            Ok(n) if numeric && n.is_finite() => MetaValue::Number(n),
            _ => MetaValue::Text(value),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            MetaValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            MetaValue::Number(_) => None,
        }
    }
}

impl std::fmt::Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Number(n) => write!(f, "{}", n),
            MetaValue::Text(s) => f.write_str(s),
        }
    }
}

/// Header key/value pairs in order of first appearance.
///
/// Serializes as a JSON object with keys in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMetadata {
    entries: Vec<(String, MetaValue)>,
}

impl HeaderMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MetaValue::as_f64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut MetaValue)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for HeaderMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One parsed body line describing a consumed quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodLineMatch {
    /// Quantity in grams
    pub quantity_g: f64,
    /// Unit as written (`g`, `gramm`, `g.`), if any
    pub unit: Option<String>,
    /// Food name as written
    pub name: String,
    /// Resolved reference food id
    pub food_id: Option<String>,
    /// Match confidence in [0, 1]; 0 when unresolved
    pub confidence: f64,
}

/// A food mention that could not be resolved against the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFoodEntry {
    /// File basename
    pub file: String,
    /// Raw line, trimmed
    pub line: String,
    /// Parsed food name
    pub name: String,
}

/// Everything known about one log file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRecord {
    /// File basename
    pub file: String,
    /// Path relative to the corpus root; used to order records sharing a date
    pub path: String,
    /// ISO-8601 date when resolvable, otherwise the raw header value
    pub date: Option<String>,
    pub meta: HeaderMetadata,
    /// Totals of all resolved food lines
    pub consumed: Nutrients,
    /// Resolved food lines in body order
    pub foods: Vec<FoodLineMatch>,
    /// Number of resolved food lines
    pub matched: usize,
    /// Number of food lines that went to the missing list
    pub unresolved: usize,
}

impl DayRecord {
    /// The resolved calendar day, if the date is ISO-8601.
    pub fn day(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    pub fn weight_kg(&self) -> Option<f64> {
        self.meta.get_f64("weight_kg")
    }

    /// Recorded intake, from the header's `actual_calories` only.
    pub fn intake_kcal(&self) -> Option<f64> {
        self.meta.get_f64("actual_calories")
    }
}

/// File basename of a path-like string.
pub(crate) fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// A point TDEE estimate for one window-end date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingEstimate {
    /// Window end
    pub date: NaiveDate,
    /// Point estimate (kcal/day)
    pub tdee: f64,
    /// Centered moving average of `tdee`
    pub tdee_smooth: f64,
    /// First weight observation in the window
    pub window_start: NaiveDate,
    /// Last weight observation in the window
    pub window_end: NaiveDate,
    /// Mean recorded intake over the window (kcal/day)
    #[serde(rename = "mean_cal")]
    pub mean_intake: f64,
    /// Weight change between first and last observation (kg)
    #[serde(rename = "delta_w")]
    pub delta_weight: f64,
    /// Days between first and last weight observation
    #[serde(rename = "days")]
    pub span_days: i64,
    /// Energy stored (positive) or released per day (kcal/day)
    pub daily_energy_change: f64,
}

/// Rolling estimates plus aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TdeeReport {
    pub generated: DateTime<Utc>,
    pub n_estimates: usize,
    pub tdee_mean: f64,
    pub tdee_median: f64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub estimates: Vec<RollingEstimate>,
}

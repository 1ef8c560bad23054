use std::sync::LazyLock;

use regex::Regex;

use crate::models::FoodLineMatch;

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*]\s*").expect("valid bullet regex"));

// `<qty>[ ]<unit>? <name>`, the unit restricted to gram spellings.
static QUANTITY_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<qty>[0-9]+[.,]?[0-9]*)\s*(?P<unit>gramm|g\.|g)?\s+(?P<name>.+)$")
        .expect("valid quantity line regex")
});

static NUMBER_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+[.,]?[0-9]*").expect("valid number regex"));

/// Parse a quantity written with either decimal separator.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite() && *q >= 0.0)
}

/// Recognize a body line that records a consumed quantity.
///
/// Returns `None` for anything that is not a consumption line; such lines
/// are skipped by the caller, never reported.
pub fn parse_food_line(line: &str) -> Option<FoodLineMatch> {
    let line = BULLET_RE.replace(line.trim(), "");
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(caps) = QUANTITY_LINE_RE.captures(line) {
        let name = caps["name"].trim();
        if let (Some(quantity_g), false) = (parse_quantity(&caps["qty"]), name.is_empty()) {
            return Some(FoodLineMatch {
                quantity_g,
                unit: caps.name("unit").map(|u| u.as_str().to_lowercase()),
                name: name.to_string(),
                food_id: None,
                confidence: 0.0,
            });
        }
    }

    let run = NUMBER_RUN_RE.find(line)?;
    let name = line[run.end()..].trim();
    if name.is_empty() {
        return None;
    }
    Some(FoodLineMatch {
        quantity_g: parse_quantity(run.as_str())?,
        unit: None,
        name: name.to_string(),
        food_id: None,
        confidence: 0.0,
    })
}

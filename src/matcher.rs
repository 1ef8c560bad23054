use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{Nutrients, ReferenceFood};
use crate::reference::FoodIndex;

/// Minimum similarity for an approximate match.
pub const DEFAULT_MATCH_CUTOFF: f64 = 0.6;

static TOKEN_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ ,\-_/]+").expect("valid token regex"));

/// Which resolution layer produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Whole name equals an alias
    Exact,
    /// One word of the name equals an alias, last word first
    Token,
    /// Closest alias above the similarity cutoff
    Approximate,
}

impl MatchKind {
    pub fn confidence(self) -> f64 {
        match self {
            MatchKind::Exact => 1.0,
            MatchKind::Token => 0.9,
            MatchKind::Approximate => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodMatch<'a> {
    pub food: &'a ReferenceFood,
    pub kind: MatchKind,
}

impl FoodMatch<'_> {
    pub fn confidence(&self) -> f64 {
        self.kind.confidence()
    }

    /// Nutrients contributed by `quantity_g` grams of the matched food.
    pub fn nutrients(&self, quantity_g: f64) -> Nutrients {
        self.food.per_100g.scaled(quantity_g)
    }
}

/// Resolves free-text food names against a [`FoodIndex`].
#[derive(Debug, Clone, Copy)]
pub struct FoodMatcher {
    cutoff: f64,
}

impl Default for FoodMatcher {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_MATCH_CUTOFF,
        }
    }
}

impl FoodMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Layered lookup, first hit wins: exact alias, then tokens from the
    /// last word backwards, then the most similar alias. Ties in similarity
    /// go to the alias that sorts last.
    pub fn resolve<'a>(&self, name: &str, index: &'a FoodIndex) -> Option<FoodMatch<'a>> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        if let Some(food) = index.lookup_alias(&key) {
            return Some(FoodMatch {
                food,
                kind: MatchKind::Exact,
            });
        }

        let tokens: Vec<&str> = TOKEN_SPLIT_RE
            .split(&key)
            .filter(|t| !t.is_empty())
            .collect();
        if let Some(food) = tokens.iter().rev().find_map(|t| index.lookup_alias(t)) {
            return Some(FoodMatch {
                food,
                kind: MatchKind::Token,
            });
        }

        let mut best: Option<(&str, f64)> = None;
        for alias in index.vocabulary() {
            let score = similarity(alias, &key);
            if score < self.cutoff {
                continue;
            }
            // vocabulary is sorted, so `>=` keeps the greatest alias on ties
            if best.map_or(true, |(_, s)| score >= s) {
                best = Some((alias.as_str(), score));
            }
        }
        best.and_then(|(alias, _)| index.lookup_alias(alias))
            .map(|food| FoodMatch {
                food,
                kind: MatchKind::Approximate,
            })
    }
}

/// Ratcliff/Obershelp similarity of two strings: twice the number of
/// characters in matching blocks over the combined length. Blocks are found
/// by taking the longest common run (earliest in `a`, then in `b`) and
/// recursing on both sides of it.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_run(a, &positions, (alo, ahi), (blo, bhi));
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as
/// `(start in a, start in b, length)`.
fn longest_run(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    // run length ending at each position of b, for the previous row of a
    let mut run_at: HashMap<usize, usize> = HashMap::new();
    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        for &j in positions.get(c).map(Vec::as_slice).unwrap_or(&[]) {
            if j < blo {
                continue;
            }
            if j >= bhi {
                break;
            }
            let len = j
                .checked_sub(1)
                .and_then(|prev| run_at.get(&prev))
                .copied()
                .unwrap_or(0)
                + 1;
            next.insert(j, len);
            if len > best_len {
                best_i = i + 1 - len;
                best_j = j + 1 - len;
                best_len = len;
            }
        }
        run_at = next;
    }
    (best_i, best_j, best_len)
}

/// Resolve `name` with the default cutoff. `(None, 0.0)` means unresolved.
pub fn match_food<'a>(name: &str, index: &'a FoodIndex) -> (Option<&'a str>, f64) {
    match FoodMatcher::default().resolve(name, index) {
        Some(m) => (Some(m.food.id.as_str()), m.confidence()),
        None => (None, 0.0),
    }
}

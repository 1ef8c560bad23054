use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::header::yaml_scalar_to_string;
use crate::models::{Nutrients, ReferenceFood};

/// The reference nutrition table with its alias lookups.
///
/// `by_alias` maps every lower-cased alias to the food that declared it
/// first; `vocabulary` is the sorted, de-duplicated alias list used for
/// approximate matching.
#[derive(Debug, Clone, Default)]
pub struct FoodIndex {
    foods: Vec<ReferenceFood>,
    by_id: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    vocabulary: Vec<String>,
}

impl FoodIndex {
    /// Load a YAML reference table. A missing, unreadable or empty table is
    /// fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading reference table {}", path.display()))?;
        let index = Self::from_yaml_str(&raw)
            .with_context(|| format!("parsing reference table {}", path.display()))?;
        if index.is_empty() {
            return Err(PipelineError::ReferenceTableEmpty {
                path: path.to_path_buf(),
            }
            .into());
        }
        info!(
            "loaded {} foods, {} aliases from {}",
            index.len(),
            index.vocabulary.len(),
            path.display()
        );
        Ok(index)
    }

    /// Parse a table keyed by food id:
    ///
    /// ```yaml
    /// oats:
    ///   name: Haferflocken
    ///   kcal_per_100g: 389
    ///   protein_g_per_100g: 17
    ///   fat_g_per_100g: 7
    ///   carbs_g_per_100g: 66
    ///   aliases: [oats, haferflocken]
    /// ```
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: Value = serde_yaml::from_str(raw)?;
        let map = match doc {
            Value::Mapping(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(anyhow!("reference table must map food ids to entries")),
        };

        let mut foods = Vec::with_capacity(map.len());
        for (key, entry) in &map {
            let id = yaml_scalar_to_string(key);
            if id.is_empty() {
                continue;
            }
            foods.push(parse_food(id, entry));
        }
        Ok(Self::from_foods(foods))
    }

    /// Build the lookups. On alias conflicts the food declared first keeps
    /// the alias.
    pub fn from_foods(foods: Vec<ReferenceFood>) -> Self {
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut by_alias: HashMap<String, usize> = HashMap::new();
        let mut vocabulary = Vec::new();

        for (idx, food) in foods.iter().enumerate() {
            by_id.entry(food.id.clone()).or_insert(idx);

            let candidates = food
                .aliases
                .iter()
                .map(String::as_str)
                .chain([food.id.as_str(), food.name.as_str()]);
            for alias in candidates {
                if alias.is_empty() {
                    continue;
                }
                let key = alias.to_lowercase();
                if let Some(&owner) = by_alias.get(&key) {
                    if owner != idx {
                        debug!(
                            "alias {:?} of {} already belongs to {}",
                            key, food.id, foods[owner].id
                        );
                    }
                    continue;
                }
                by_alias.insert(key.clone(), idx);
                vocabulary.push(key);
            }
        }

        vocabulary.sort();
        vocabulary.dedup();

        Self {
            foods,
            by_id,
            by_alias,
            vocabulary,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceFood> {
        self.by_id.get(id).map(|&i| &self.foods[i])
    }

    /// Exact lookup of an already lower-cased alias.
    pub fn lookup_alias(&self, alias: &str) -> Option<&ReferenceFood> {
        self.by_alias.get(alias).map(|&i| &self.foods[i])
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn foods(&self) -> &[ReferenceFood] {
        &self.foods
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }
}

fn parse_food(id: String, entry: &Value) -> ReferenceFood {
    let parse_num = |k: &str| -> f64 {
        let value = entry
            .get(k)
            .and_then(|v| {
                v.as_f64()
                    .or_else(|| v.as_str().and_then(|s| s.replace(',', ".").trim().parse().ok()))
            })
            .unwrap_or(0.0);
        if value < 0.0 {
            warn!("{}: negative {} clamped to 0", id, k);
            return 0.0;
        }
        value
    };

    let per_100g = Nutrients {
        kcal: parse_num("kcal_per_100g"),
        protein_g: parse_num("protein_g_per_100g"),
        fat_g: parse_num("fat_g_per_100g"),
        carbs_g: parse_num("carbs_g_per_100g"),
    };

    let aliases = match entry.get("aliases") {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(yaml_scalar_to_string)
            .filter(|a| !a.is_empty())
            .map(|a| a.to_lowercase())
            .collect(),
        Some(Value::String(single)) if !single.is_empty() => vec![single.to_lowercase()],
        _ => Vec::new(),
    };

    let name = entry
        .get("name")
        .map(yaml_scalar_to_string)
        .unwrap_or_default();

    ReferenceFood {
        id,
        name,
        per_100g,
        aliases,
    }
}

use std::fs;
use std::path::Path;

use nutrilog::pipeline::run;
use nutrilog::{PipelineConfig, PipelineError};
use serde_json::Value;

const FOODS: &str = r#"
oats:
  name: Haferflocken
  kcal_per_100g: 389
  protein_g_per_100g: 17
  fat_g_per_100g: 7
  carbs_g_per_100g: 66
  aliases: [oats, haferflocken]
brown_rice:
  name: Vollkornreis
  kcal_per_100g: 350
  protein_g_per_100g: 7.5
  fat_g_per_100g: 2.7
  carbs_g_per_100g: 72
  aliases: [vollkornreis, reis]
"#;

fn write(dir: &Path, rel: &str, text: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn config_for(root: &Path) -> PipelineConfig {
    PipelineConfig {
        foods_path: root.join("data/foods.yaml"),
        log_dir: root.join("logs/daily"),
        out_dir: root.join("outputs/data"),
        ..PipelineConfig::default()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn full_run_writes_all_outputs() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "data/foods.yaml", FOODS);

    // Written out of date order on purpose.
    write(
        root.path(),
        "logs/daily/2024-01-03.md",
        "---\nweight: 79,8 kg\nactual_calories: 2300 kcal\n---\n\n## Mittag 🍛\n- 125 g Uncle Bens Vollkornreis\n- 80 g Tofu\n",
    );
    write(
        root.path(),
        "logs/daily/2024-01-01.md",
        "Weight: 80,2 kg\nSleep: 7:30\nActual Calories: 2100\n\n- 25 g oats\n",
    );
    write(
        root.path(),
        "logs/daily/week1/tag2.md",
        "⸻\nDate: 02.01.2024\nWeight: 80,0\n⸻\n\nStatus\nDiät Woche 1\n\n50 g haferflockn\n",
    );

    let config = config_for(root.path());
    let result = run(&config).expect("pipeline should succeed");

    let dates: Vec<_> = result
        .corpus
        .records
        .iter()
        .map(|r| r.date.clone().unwrap())
        .collect();
    assert_eq!(dates, ["2024-01-01", "2024-01-02", "2024-01-03"]);

    let summary = read_json(&config.out_dir.join("summary.json"));
    let days = summary.as_array().unwrap();
    assert_eq!(days.len(), 3);
    assert_eq!(days[0]["consumed"]["kcal"], 97.25);
    assert_eq!(days[0]["meta"]["sleep"], 7.5);
    assert_eq!(days[1]["meta"]["status"], "Diät Woche 1");
    assert_eq!(days[1]["consumed"]["kcal"], 194.5);
    assert_eq!(days[2]["consumed"]["kcal"], 437.5);
    assert_eq!(days[2]["foods"][0]["food_id"], "brown_rice");
    assert_eq!(days[2]["foods"][0]["confidence"], 0.9);

    let missing = read_json(&config.out_dir.join("missing_foods.json"));
    assert_eq!(
        missing,
        serde_json::json!([{ "file": "2024-01-03.md", "line": "- 80 g Tofu", "name": "Tofu" }])
    );

    let tdee = read_json(&config.out_dir.join("tdee.json"));
    assert_eq!(tdee["n_estimates"], 2);
    let estimates = tdee["estimates"].as_array().unwrap();
    assert_eq!(estimates[0]["date"], "2024-01-02");
    assert_eq!(estimates[0]["days"], 1);
    assert_eq!(estimates[1]["date"], "2024-01-03");
    assert_eq!(estimates[1]["window_start"], "2024-01-01");
    assert_eq!(estimates[1]["days"], 2);
}

#[test]
fn rerun_is_byte_identical_apart_from_timestamp() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "data/foods.yaml", FOODS);
    write(
        root.path(),
        "logs/daily/2024-01-01.md",
        "weight: 80\nactual_calories: 2000\n\n25 g oats\n",
    );
    write(
        root.path(),
        "logs/daily/2024-01-02.md",
        "weight: 79,9\nactual_calories: 2200\n\n100 g reis\n",
    );

    let config = config_for(root.path());
    run(&config).unwrap();
    let first = fs::read_to_string(config.out_dir.join("summary.json")).unwrap();
    let first_tdee = read_json(&config.out_dir.join("tdee.json"));
    run(&config).unwrap();
    let second = fs::read_to_string(config.out_dir.join("summary.json")).unwrap();
    let second_tdee = read_json(&config.out_dir.join("tdee.json"));

    assert_eq!(first, second);
    assert_eq!(first_tdee["estimates"], second_tdee["estimates"]);
}

#[test]
fn insufficient_data_fails_but_keeps_day_outputs() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "data/foods.yaml", FOODS);
    write(root.path(), "logs/daily/2024-01-01.md", "weight: 80\n\n25 g oats\n");

    let config = config_for(root.path());
    let err = run(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InsufficientData { .. })
    ));
    assert!(config.out_dir.join("summary.json").exists());
    assert!(!config.out_dir.join("tdee.json").exists());
}

#[test]
fn missing_reference_table_aborts_before_output() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "logs/daily/2024-01-01.md", "weight: 80\n\n25 g oats\n");

    let config = config_for(root.path());
    assert!(run(&config).is_err());
    assert!(!config.out_dir.exists());
}

use std::io::Write;
use std::process::Command;

const MAPPING: &str = r#"
areas:
  area_tags: [building]
  linear_tags: [highway]
tables:
  pois:
    type: point
    mapping:
      amenity: [__any__]
    columns:
      - {name: osm_id, type: id}
      - {name: type, type: mapping_value}
      - {name: name, key: name, type: string}
  roads:
    type: linestring
    mapping:
      highway: [__any__]
    columns:
      - {name: osm_id, type: id}
      - {name: class, type: mapping_value}
  buildings:
    type: polygon
    mapping:
      building: [__any__]
    columns:
      - {name: osm_id, type: id}
"#;

const INPUT: &str = r#"{"type":"node","id":1,"tags":{"amenity":"cafe","name":"Corner"}}
{"type":"node","id":2,"tags":{"natural":"tree"}}
{"type":"way","id":3,"tags":{"highway":"residential"},"refs":[1,2,3]}
{"type":"way","id":4,"tags":{"building":"yes"},"refs":[1,2,3,1]}
"#;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn classifies_features_into_rows() {
    let mapping = write_temp(".yaml", MAPPING);
    let input = write_temp(".jsonl", INPUT);
    let output = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_tagmap"))
        .arg("--mapping")
        .arg(mapping.path())
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .arg("--batch-size")
        .arg("2")
        .arg("--verbose")
        .status()
        .expect("failed to execute process");
    assert!(status.success());

    let content = std::fs::read_to_string(output.path()).unwrap();
    let mut rows: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    rows.sort_by_key(|row| row["id"].as_i64());
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0]["table"], "pois");
    assert_eq!(rows[0]["row"], serde_json::json!([1, "cafe", "Corner"]));
    assert_eq!(rows[1]["table"], "roads");
    assert_eq!(rows[1]["value"], "residential");
    assert_eq!(rows[2]["table"], "buildings");
    assert_eq!(rows[2]["row"], serde_json::json!([4]));
}

#[test]
fn invalid_mapping_fails() {
    let mapping = write_temp(
        ".yaml",
        "tables:\n  t:\n    type: point\n    mapping:\n      amenity: [__any__]\n    columns:\n      - {name: x, type: enumerate, key: amenity}\n",
    );
    let input = write_temp(".jsonl", INPUT);
    let output = tempfile::NamedTempFile::with_suffix(".jsonl").unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_tagmap"))
        .arg("--mapping")
        .arg(mapping.path())
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .output()
        .expect("failed to execute process");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("needs values"), "stderr: {stderr}");
}

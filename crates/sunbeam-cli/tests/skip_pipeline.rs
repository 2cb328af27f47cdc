//! Skip semantics through the driver: ingress runs normally while a
//! skipped downstream stage still materializes null artifacts at every
//! declared output path.

use std::fs;
use std::path::Path;

use sunbeam_core::{
    Artifact, CanonicalPath, DataSource, FileType, Payload, QueryHints, TimeSeries,
};
use sunbeam_store::FsDataSource;
use time::macros::datetime;

fn write_config(dir: &Path, upstream_root: &Path, primary_root: &Path) {
    fs::write(
        dir.join("sunbeam.toml"),
        format!(
            r#"
[config]
events_description_file = "events.toml"
ingress_description_file = "ingress.toml"
stages_to_run = ["power"]

[stage_data_source]
data_source_type = "FSDataSource"
fs_root = "{primary}"

[ingress_data_source]
data_source_type = "FSDataSource"
fs_root = "{upstream}"
ingress_origin = "run0"
"#,
            primary = primary_root.display(),
            upstream = upstream_root.display(),
        ),
    )
    .unwrap();

    fs::write(
        dir.join("events.toml"),
        r#"
[[event]]
name = "E1"
start = "2024-07-16T17:00:00Z"
stop = "2024-07-16T18:00:00Z"
"#,
    )
    .unwrap();

    fs::write(
        dir.join("ingress.toml"),
        r#"
[[target]]
type = "TimeSeries"
name = "PackCurrent"
field = "PackCurrent"
measurement = "BMS"
frequency = 1.0
units = "A"
car = "Brightside"
bucket = "Telemetry"
"#,
    )
    .unwrap();
}

#[test]
fn skipped_stage_still_yields_null_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    let upstream_root = dir.path().join("upstream");
    let primary_root = dir.path().join("pipeline_data");
    fs::create_dir_all(&config_dir).unwrap();
    write_config(&config_dir, &upstream_root, &primary_root);

    let upstream = FsDataSource::new(&upstream_root);
    let series = TimeSeries::from_values(
        "PackCurrent",
        "A",
        1.0,
        datetime!(2024-07-16 17:00:00 UTC),
        vec![2.0; 60],
    );
    upstream
        .store(Artifact::new(
            CanonicalPath::new("run0", "E1", "ingress", "PackCurrent"),
            FileType::TimeSeries,
            Some(Payload::TimeSeries(series)),
        ))
        .unwrap();

    sunbeam_cli::run::run_pipeline(
        &config_dir,
        "run1",
        vec!["power".to_string()],
        Vec::new(),
    )
    .unwrap();

    let primary = FsDataSource::new(&primary_root);

    // Ingress ran normally.
    let ingressed = primary
        .get(
            &CanonicalPath::new("run1", "E1", "ingress", "PackCurrent"),
            &QueryHints::default(),
        )
        .unwrap();
    assert!(!ingressed.is_null());

    // Power was skipped: null artifacts at both declared outputs.
    for name in ["pack_power", "motor_power"] {
        let artifact = primary
            .get(
                &CanonicalPath::new("run1", "E1", "power", name),
                &QueryHints::default(),
            )
            .unwrap();
        assert!(artifact.is_null());
        assert_eq!(artifact.file_type, FileType::TimeSeries);
    }
}

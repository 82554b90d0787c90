//! End-to-end pipeline tests over local parquet fixtures.

use arrow::array::{Float64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use mf_ingest::manifest::Manifest;
use mf_ingest::{EntityFilter, IngestConfig, Ingestor, RunSummary};
use mf_reader_parquet::{ParquetMetadataProvider, StoreReader};
use mf_types::{ManifestEntry, ReductionPolicy};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const ELECTRIC: &str = "Electricity";
const GAS: &str = "Natural Gas";

/// A tempdir laid out as data/ + meta/ + out/.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::create_dir_all(dir.path().join("meta")).unwrap();
        Self { dir }
    }

    fn data_prefix(&self) -> String {
        self.dir.path().join("data").to_string_lossy().into_owned()
    }

    fn output_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("out")
    }

    /// Write one entity's time-series file under data/, named
    /// `{entity_id}.parquet`.
    fn write_entity(&self, entity_id: &str, timestamps: Vec<i64>, values: Vec<f64>) {
        self.write_file(&format!("{entity_id}.parquet"), timestamps, values);
    }

    fn write_file(&self, file_name: &str, timestamps: Vec<i64>, values: Vec<f64>) {
        let schema = Arc::new(Schema::new(vec![
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Second, None),
                false,
            ),
            Field::new("net_energy", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampSecondArray::from(timestamps)),
                Arc::new(Float64Array::from(values)),
            ],
        )
        .unwrap();

        let path = self.dir.path().join("data").join(file_name);
        write_parquet(&path, schema, &batch);
    }

    /// Write the partition metadata table under meta/.
    fn write_metadata(&self, partition_key: &str, entities: &[(&str, &str)]) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("bldg_id", DataType::Utf8, false),
            Field::new("heating_fuel", DataType::Utf8, false),
        ]));
        let ids: Vec<&str> = entities.iter().map(|(id, _)| *id).collect();
        let fuels: Vec<&str> = entities.iter().map(|(_, fuel)| *fuel).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(fuels)),
            ],
        )
        .unwrap();

        let path = self
            .dir
            .path()
            .join("meta")
            .join(format!("{partition_key}.parquet"));
        write_parquet(&path, schema, &batch);
    }

    fn config(&self, batch_size: usize) -> IngestConfig {
        IngestConfig::new("upgrade0", self.data_prefix(), self.output_dir())
            .with_columns(vec!["net_energy".to_string()])
            .with_batch_size(batch_size)
            .with_worker_count(2)
    }

    async fn run(&self, config: IngestConfig) -> RunSummary {
        let reader = Arc::new(StoreReader::local_only());
        let template = self
            .dir
            .path()
            .join("meta")
            .join("{key}.parquet")
            .to_string_lossy()
            .into_owned();
        let metadata = ParquetMetadataProvider::new(reader.clone(), template);
        let filter = EntityFilter::new("bldg_id")
            .with_attribute_columns(vec!["heating_fuel".to_string()])
            .with_allowed_values([ELECTRIC]);

        Ingestor::new(config, filter, reader, metadata)
            .run()
            .await
            .unwrap()
    }
}

fn write_parquet(path: &Path, schema: Arc<Schema>, batch: &RecordBatch) {
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
}

/// Read every output file back as (entity_id, hour, value) rows, sorted.
fn read_outputs(output_dir: &Path) -> Vec<(String, i64, f64)> {
    let mut rows = Vec::new();
    let mut names: Vec<_> = std::fs::read_dir(output_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "parquet"))
        .collect();
    names.sort();

    for path in names {
        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        for batch in reader {
            let batch = batch.unwrap();
            let ids = batch
                .column(0)
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap();
            let hours = batch
                .column(1)
                .as_any()
                .downcast_ref::<TimestampSecondArray>()
                .unwrap();
            let values = batch
                .column(2)
                .as_any()
                .downcast_ref::<Float64Array>()
                .unwrap();
            for i in 0..batch.num_rows() {
                rows.push((ids.value(i).to_string(), hours.value(i), values.value(i)));
            }
        }
    }

    rows.sort_by(|a, b| a.partial_cmp(b).unwrap());
    rows
}

fn output_file_names(output_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".parquet"))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_two_entities_one_excluded() {
    let fx = Fixture::new();
    // Upgrade-suffixed file names; the entity id is the stem before "-0"
    fx.write_file("A-0.parquet", vec![600, 1800], vec![3.0, 4.0]);
    fx.write_file("B-0.parquet", vec![600, 1800], vec![10.0, 20.0]);
    fx.write_metadata("upgrade0", &[("A", ELECTRIC), ("B", GAS)]);

    let summary = fx.run(fx.config(1)).await;

    // Two batches from two paths at batch_size 1; only A's batch
    // produces output, B's batch is empty and stays pending.
    assert_eq!(summary.stats.batches_total, 2);
    assert_eq!(summary.stats.batches_completed, 1);
    assert_eq!(summary.stats.batches_empty, 1);
    assert_eq!(summary.stats.paths_dropped, 1);
    assert_eq!(summary.output_paths.len(), 1);

    assert_eq!(
        output_file_names(&fx.output_dir()),
        vec!["upgrade0_batch_000.parquet".to_string()]
    );

    let rows = read_outputs(&fx.output_dir());
    assert_eq!(rows, vec![("A".to_string(), 0, 7.0)]);

    let manifest = Manifest::load(fx.dir.path().join("out").join("upgrade0_manifest.json"));
    assert_eq!(manifest.len(), 1);
    assert!(manifest.contains(0));
    assert!(!manifest.contains(1));
}

#[tokio::test]
async fn test_sum_and_mean_policies() {
    for (policy, expected) in [(ReductionPolicy::Sum, 7.0), (ReductionPolicy::Mean, 3.5)] {
        let fx = Fixture::new();
        fx.write_entity("A", vec![600, 1800], vec![3.0, 4.0]);
        fx.write_metadata("upgrade0", &[("A", ELECTRIC)]);

        fx.run(fx.config(10).with_policy(policy)).await;

        let rows = read_outputs(&fx.output_dir());
        assert_eq!(rows, vec![("A".to_string(), 0, expected)]);
    }
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let fx = Fixture::new();
    fx.write_entity("A", vec![0], vec![1.0]);
    fx.write_entity("B", vec![0], vec![2.0]);
    fx.write_metadata("upgrade0", &[("A", ELECTRIC), ("B", ELECTRIC)]);

    let first = fx.run(fx.config(1)).await;
    assert_eq!(first.stats.batches_completed, 2);
    let rows_after_first = read_outputs(&fx.output_dir());

    let second = fx.run(fx.config(1)).await;
    assert_eq!(second.stats.batches_completed, 0);
    assert_eq!(second.stats.batches_skipped, 2);
    // Same manifest contents, same output rows
    assert_eq!(second.output_paths, first.output_paths);
    assert_eq!(read_outputs(&fx.output_dir()), rows_after_first);
}

#[tokio::test]
async fn test_resume_processes_only_pending_batches() {
    let fx = Fixture::new();
    for (name, value) in [("A", 1.0), ("B", 2.0), ("C", 3.0), ("D", 4.0)] {
        fx.write_entity(name, vec![0], vec![value]);
    }
    fx.write_metadata(
        "upgrade0",
        &[
            ("A", ELECTRIC),
            ("B", ELECTRIC),
            ("C", ELECTRIC),
            ("D", ELECTRIC),
        ],
    );

    // Pretend a previous run completed batches 0 and 1 before dying.
    std::fs::create_dir_all(fx.output_dir()).unwrap();
    let mut seeded = Manifest::load(fx.output_dir().join("upgrade0_manifest.json"));
    seeded.insert(ManifestEntry::new(
        0,
        "out/upgrade0_batch_000.parquet".to_string(),
        vec!["A".to_string()],
        "upgrade0".to_string(),
        1,
    ));
    seeded.insert(ManifestEntry::new(
        1,
        "out/upgrade0_batch_001.parquet".to_string(),
        vec!["B".to_string()],
        "upgrade0".to_string(),
        1,
    ));
    seeded.save().unwrap();

    let summary = fx.run(fx.config(1)).await;

    assert_eq!(summary.stats.batches_total, 4);
    assert_eq!(summary.stats.batches_skipped, 2);
    assert_eq!(summary.stats.batches_completed, 2);

    // Only the pending batches were written this run.
    assert_eq!(
        output_file_names(&fx.output_dir()),
        vec![
            "upgrade0_batch_002.parquet".to_string(),
            "upgrade0_batch_003.parquet".to_string(),
        ]
    );

    // The final manifest holds all four entries, seeded ones untouched.
    let manifest = Manifest::load(fx.output_dir().join("upgrade0_manifest.json"));
    assert_eq!(manifest.len(), 4);
    assert_eq!(
        manifest.output_paths()[0],
        "out/upgrade0_batch_000.parquet"
    );
}

#[tokio::test]
async fn test_batch_size_does_not_change_rows() {
    let entities = [("A", 1.5), ("B", 2.5), ("C", 3.5), ("D", 4.5), ("E", 5.5)];

    let mut reference: Option<Vec<(String, i64, f64)>> = None;
    for batch_size in [1, 2, 50] {
        let fx = Fixture::new();
        for (name, value) in entities {
            fx.write_entity(name, vec![600, 4000], vec![value, value]);
        }
        fx.write_metadata(
            "upgrade0",
            &[
                ("A", ELECTRIC),
                ("B", ELECTRIC),
                ("C", GAS),
                ("D", ELECTRIC),
                ("E", ELECTRIC),
            ],
        );

        fx.run(fx.config(batch_size)).await;
        let rows = read_outputs(&fx.output_dir());

        // 4 allowed entities, 2 hours each
        assert_eq!(rows.len(), 8);
        match &reference {
            None => reference = Some(rows),
            Some(expected) => assert_eq!(&rows, expected),
        }
    }
}

#[tokio::test]
async fn test_every_allowed_entity_lands_in_exactly_one_batch() {
    let fx = Fixture::new();
    for name in ["A", "B", "C", "D", "E", "F", "G"] {
        fx.write_entity(name, vec![0], vec![1.0]);
    }
    let meta: Vec<(&str, &str)> = ["A", "B", "C", "D", "E", "F", "G"]
        .iter()
        .map(|id| (*id, ELECTRIC))
        .collect();
    fx.write_metadata("upgrade0", &meta);

    let summary = fx.run(fx.config(3)).await;
    assert_eq!(summary.stats.batches_total, 3);

    let rows = read_outputs(&fx.output_dir());
    let ids: Vec<&str> = rows.iter().map(|(id, _, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D", "E", "F", "G"]);
}

#[tokio::test]
async fn test_write_failure_leaves_batch_pending() {
    let fx = Fixture::new();
    fx.write_entity("A", vec![600, 1800], vec![3.0, 4.0]);
    fx.write_entity("B", vec![600], vec![5.0]);
    fx.write_metadata("upgrade0", &[("A", ELECTRIC), ("B", ELECTRIC)]);

    // Occupy batch 0's output path with a directory so the rename fails
    let blocker = fx.output_dir().join("upgrade0_batch_000.parquet");
    std::fs::create_dir_all(&blocker).unwrap();

    let first = fx.run(fx.config(1)).await;

    // The failure stays batch-local: run() succeeds, batch 1 completes,
    // batch 0 is recorded as failed and left out of the manifest.
    assert_eq!(first.stats.batches_failed, 1);
    assert_eq!(first.stats.batches_completed, 1);
    assert_eq!(
        first.output_paths.len(),
        1,
        "failed batch must not appear in output_paths"
    );
    assert!(first.output_paths[0].ends_with("upgrade0_batch_001.parquet"));

    let manifest = Manifest::load(fx.output_dir().join("upgrade0_manifest.json"));
    assert!(!manifest.contains(0));
    assert!(manifest.contains(1));

    // Clear the obstruction; the next run retries only batch 0.
    std::fs::remove_dir_all(&blocker).unwrap();
    let second = fx.run(fx.config(1)).await;

    assert_eq!(second.stats.batches_skipped, 1);
    assert_eq!(second.stats.batches_completed, 1);
    assert_eq!(second.stats.batches_failed, 0);
    assert_eq!(second.output_paths.len(), 2);

    let rows = read_outputs(&fx.output_dir());
    assert_eq!(
        rows,
        vec![("A".to_string(), 0, 7.0), ("B".to_string(), 0, 5.0)]
    );
}

#[tokio::test]
async fn test_manifest_entries_record_batch_contents() {
    let fx = Fixture::new();
    fx.write_entity("A", vec![0, 3600], vec![1.0, 2.0]);
    fx.write_entity("B", vec![0], vec![5.0]);
    fx.write_metadata("upgrade0", &[("A", ELECTRIC), ("B", ELECTRIC)]);

    let summary = fx.run(fx.config(10)).await;
    assert_eq!(summary.stats.batches_completed, 1);
    assert_eq!(summary.stats.rows_written, 3);

    let manifest_text =
        std::fs::read_to_string(fx.output_dir().join("upgrade0_manifest.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&manifest_text).unwrap();
    let entry = &parsed["0"];
    assert_eq!(entry["partition_key"], "upgrade0");
    assert_eq!(entry["rows"], 3);
    assert_eq!(entry["entity_ids"][0], "A");
    assert_eq!(entry["entity_ids"][1], "B");
}

use approx::assert_relative_eq;
use polars::prelude::*;
use rna_sequences::types::{FEATURE_COLUMN, SAMPLE_COLUMN, SAMPLE_GROUP};
use rna_sequences::{
    DatasetConfig, Item, Lookup, RnaSeqError, RnaSequences, SampleGroup, UnknownGroupPolicy,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EXAMPLE_DIR: &str = "tests/data/example";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn example() -> RnaSequences {
    init_logger();
    RnaSequences::new(EXAMPLE_DIR).unwrap()
}

fn values(df: &DataFrame, column: &str) -> Vec<f64> {
    df.column(column)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

fn samples(df: &DataFrame) -> Vec<String> {
    df.column(SAMPLE_COLUMN)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|s| s.unwrap().to_string())
        .collect()
}

#[test]
fn test_load_example() {
    let data = example();
    assert_eq!(data.sample_ids(), vec!["sample001", "sample002"]);
    assert_eq!(data.feature_ids(), vec!["GENE1", "GENE2"]);
    assert_eq!(data.n_samples(), 2);
    assert_eq!(data.n_features(), 2);
    assert_eq!(data.get_annotations().height(), 3);
    assert_eq!(
        data.annotated_ids(),
        vec!["sample001", "sample002", "sample003"]
    );
}

#[test]
fn test_count_samples_are_annotated() {
    let data = example();
    let annotated = data.annotated_ids();
    for sample in data.sample_ids() {
        assert!(annotated.contains(&sample));
    }
}

#[test]
fn test_cell_matches_table() {
    let data = example();
    let table = data.get_counts();
    let gene2 = table.column("GENE2").unwrap().f64().unwrap();

    match data
        .get_count(Item::Cell {
            sample: "sample002",
            column: "GENE2",
        })
        .unwrap()
    {
        Lookup::Count(value) => assert_eq!(value, gene2.get(1)),
        other => panic!("unexpected lookup: {other:?}"),
    }
    assert_eq!(data.count_cell("sample001", "GENE1").unwrap(), Some(10.0));
}

#[test]
fn test_column_lookups() {
    let data = example();

    match data.get_count(Item::Column("GENE1")).unwrap() {
        Lookup::Column(column) => assert_eq!(column.len(), 2),
        other => panic!("unexpected lookup: {other:?}"),
    }

    let groups = data.annotation_column(SAMPLE_GROUP).unwrap();
    assert_eq!(groups.len(), 3);

    match data
        .get_annotation(Item::Cell {
            sample: "sample003",
            column: "CNS Subregion",
        })
        .unwrap()
    {
        Lookup::Text(text) => assert_eq!(text, "Cerebellum"),
        other => panic!("unexpected lookup: {other:?}"),
    }
    assert_eq!(
        data.annotation_cell("sample001", "Subject ID").unwrap(),
        "NEUAA111AAA"
    );
}

#[test]
fn test_unknown_keys_fail() {
    let data = example();
    assert!(data.count_column("GENE9").is_err());
    assert!(matches!(
        data.count_cell("sample999", "GENE1"),
        Err(RnaSeqError::UnknownSample(_))
    ));
    assert!(data.annotation_cell("sample001", "Age").is_err());
    // annotated but never counted
    assert!(data.count_cell("sample003", "GENE1").is_err());
}

#[test]
fn test_get_sample_groups() {
    let data = example();

    assert_eq!(samples(&data.get_sample(Some("ALS")).unwrap()), vec!["sample001"]);
    assert_eq!(
        samples(&data.get_sample(Some("Control")).unwrap()),
        vec!["sample002"]
    );
    assert_eq!(
        samples(&data.get_sample(Some("Other")).unwrap()),
        vec!["sample003"]
    );
    assert_eq!(data.get_sample(None).unwrap().height(), 3);

    // the three groups partition the annotated samples
    let total: usize = SampleGroup::ALL
        .iter()
        .map(|g| data.get_group(Some(*g)).unwrap().height())
        .sum();
    assert_eq!(total, 3);
}

#[test]
fn test_unknown_group_is_permissive_by_default() {
    let data = example();
    assert_eq!(data.get_sample(Some("als")).unwrap().height(), 3);
    assert_eq!(data.get_sample_count(Some("Typo")).unwrap().height(), 2);
}

#[test]
fn test_unknown_group_strict() {
    init_logger();
    let config = DatasetConfig::new(EXAMPLE_DIR).with_unknown_group(UnknownGroupPolicy::Strict);
    let data = RnaSequences::from_config(config).unwrap();
    assert!(matches!(
        data.get_sample(Some("Typo")),
        Err(RnaSeqError::UnknownGroup(_))
    ));
    assert_eq!(data.get_sample(None).unwrap().height(), 3);
}

#[test]
fn test_get_sample_count() {
    let data = example();
    assert_eq!(samples(&data.get_sample_count(Some("ALS")).unwrap()), vec!["sample001"]);
    assert_eq!(data.get_sample_count(Some("Other")).unwrap().height(), 0);
    assert_eq!(
        samples(&data.get_sample_count(None).unwrap()),
        vec!["sample001", "sample002"]
    );
}

#[test]
fn test_mean() {
    let data = example();

    let als = data.mean(Some("ALS")).unwrap();
    assert_eq!(als.get_column_names_str(), vec![FEATURE_COLUMN, "Means"]);
    let als = values(&als, "Means");
    assert_relative_eq!(als[0], 10.0, epsilon = 1e-9);
    assert_relative_eq!(als[1], 20.0, epsilon = 1e-9);

    let all = values(&data.mean(None).unwrap(), "Means");
    assert_relative_eq!(all[0], 7.5, epsilon = 1e-9);
    assert_relative_eq!(all[1], 17.5, epsilon = 1e-9);
}

#[test]
fn test_median_and_std() {
    let data = example();

    let medians = data.median(None).unwrap();
    assert_eq!(medians.height(), 2);
    let medians = values(&medians, "Medians");
    assert_relative_eq!(medians[0], 7.5, epsilon = 1e-9);
    assert_relative_eq!(medians[1], 17.5, epsilon = 1e-9);

    let std = data.std(None).unwrap();
    assert_eq!(
        std.get_column_names_str(),
        vec![FEATURE_COLUMN, "Standard Deviations"]
    );
    let std = values(&std, "Standard Deviations");
    // sample standard deviation of {10, 5} and {20, 15}
    assert_relative_eq!(std[0], 12.5_f64.sqrt(), epsilon = 1e-9);
    assert_relative_eq!(std[1], 12.5_f64.sqrt(), epsilon = 1e-9);

    // a single sample has no sample standard deviation
    let als = values(&data.std(Some("ALS")).unwrap(), "Standard Deviations");
    assert!(als[0].is_nan());
}

#[test]
fn test_stats_of_empty_group() {
    let data = example();
    let means = values(&data.mean(Some("Other")).unwrap(), "Means");
    assert_eq!(means.len(), 2);
    assert!(means.iter().all(|m| m.is_nan()));
}

fn copy_example(dir: &Path) {
    for name in ["sample001.txt", "sample002.txt", "GSE124439_family.xml"] {
        fs::copy(Path::new(EXAMPLE_DIR).join(name), dir.join(name)).unwrap();
    }
}

#[test]
fn test_unannotated_sample_fails() {
    init_logger();
    let dir = TempDir::new().unwrap();
    copy_example(dir.path());
    fs::write(
        dir.path().join("sample004.txt"),
        "gene\tcount\nGENE1\t1\nGENE2\t2\n",
    )
    .unwrap();

    match RnaSequences::new(dir.path()) {
        Err(RnaSeqError::UnannotatedSamples(missing)) => assert_eq!(missing, vec!["sample004"]),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_missing_metadata_fails() {
    init_logger();
    let dir = TempDir::new().unwrap();
    fs::copy(
        Path::new(EXAMPLE_DIR).join("sample001.txt"),
        dir.path().join("sample001.txt"),
    )
    .unwrap();
    assert!(matches!(
        RnaSequences::new(dir.path()),
        Err(RnaSeqError::Io(_))
    ));
}

#[test]
fn test_config_from_toml() {
    init_logger();
    let dir = TempDir::new().unwrap();
    copy_example(dir.path());
    fs::rename(
        dir.path().join("GSE124439_family.xml"),
        dir.path().join("family.xml"),
    )
    .unwrap();

    let toml = format!(
        "data_dir = {:?}\nmetadata_file = \"family.xml\"\n",
        dir.path().display().to_string()
    );
    let config_path = dir.path().join("dataset.toml");
    fs::write(&config_path, toml).unwrap();

    let config = DatasetConfig::from_file(&config_path).unwrap();
    let data = RnaSequences::from_config(config).unwrap();
    assert_eq!(data.n_samples(), 2);
    assert_eq!(data.config().metadata_path(), dir.path().join("family.xml"));
}

use approx::assert_relative_eq;

use starcluster::hdf5file::mapping::{
    dataset_name, Schema, BINARY_FIELDS, SCALAR_COUNT, SCALAR_DATASET, SINGLE_FIELDS,
    SINGLE_HR_FIELDS,
};
use starcluster::{Error, Hdf5Snapshot, MemorySource};

/// Scalar block with time `t`, density centre `rdens` and binary count `n_binary`
pub fn scalars(t: f64, rdens: [f64; 3], n_binary: f64) -> Vec<f64> {
    let mut values = vec![0.0; SCALAR_COUNT];
    values[0] = t;
    values[4] = 3.0;
    values[6..9].copy_from_slice(&rdens);
    values[68] = n_binary;
    values
}

/// Three single stars; positions along x, velocities along y
pub fn with_singles(mut source: MemorySource, step: &str) -> MemorySource {
    let columns: [Vec<f64>; 10] = [
        vec![1.0, 2.0, 3.0],    // X1
        vec![0.0, 0.0, 4.0],    // X2
        vec![0.0, 0.0, 0.0],    // X3
        vec![0.0, 0.0, 0.0],    // V1
        vec![1.0, 2.0, 0.0],    // V2
        vec![0.0, 0.0, 5.0],    // V3
        vec![0.5, 1.0, 2.0],    // M
        vec![11.0, 12.0, 13.0], // Name
        vec![0.0, 1.0, 0.0],    // Type
        vec![0.0, 0.0, 0.0],    // ASPN
    ];
    for (field, values) in SINGLE_FIELDS.iter().zip(columns) {
        source.insert(step, &dataset_name(field), values);
    }
    source
}

pub fn with_stellar(mut source: MemorySource, step: &str) -> MemorySource {
    for (k, field) in SINGLE_HR_FIELDS.iter().enumerate() {
        source.insert(step, &dataset_name(field), vec![k as f64; 3]);
    }
    source
}

pub fn step(name: &str, t: f64, rdens: [f64; 3], n_binary: f64) -> MemorySource {
    let source = MemorySource::new().with(name, SCALAR_DATASET, scalars(t, rdens, n_binary));
    with_singles(source, name)
}

// ==================================================================================
// Schema
// ==================================================================================

#[test]
fn schema_tables_are_consistent() {
    let schema = Schema::validated().unwrap();
    assert_eq!(schema.scalar_code("TTOT"), Some(1));
    assert_eq!(schema.scalar_code("N_BINARY"), Some(69));
    assert_eq!(schema.scalar_code("N_MERGER"), Some(70));
    assert_eq!(schema.scalar_code("NOPE"), None);

    assert_eq!(dataset_name(&(23, "M")), "023 M");
    assert_eq!(dataset_name(&BINARY_FIELDS[0]), "101 Bin cm X1");
}

// ==================================================================================
// Decoding
// ==================================================================================

#[test]
fn singles_are_recentred_on_density_centre() {
    let source = with_stellar(step("Step#0", 0.5, [1.0, 0.0, 0.0], 0.0), "Step#0");
    let frame = Hdf5Snapshot::new(source).unwrap().decode("Step#0").unwrap();

    assert_eq!(frame.ttot(), 0.5);
    assert_eq!(frame.n(), 3);
    assert_eq!(frame.scalar("RDENS1"), Some(1.0));
    assert!(frame.warnings.is_empty(), "{:?}", frame.warnings);

    let singles = &frame.singles;
    assert_eq!(singles.len(), 3);
    assert_eq!(singles.x[0].x, 0.0);
    assert_eq!(singles.x[2].x, 2.0);
    assert_eq!(singles.name, vec![11, 12, 13]);
    assert_eq!(singles.kind, vec![0, 1, 0]);

    // third star: x = (2, 4, 0), v = (0, 0, 5)
    assert_relative_eq!(singles.rr[2], 20f64.sqrt());
    assert_relative_eq!(singles.vv[2], 5.0);
    assert_relative_eq!(singles.lz_spec[2], 0.0);
    // second star: x = (1, 0, 0), v = (0, 2, 0), m = 1
    assert_relative_eq!(singles.lz_spec[1], 2.0);
    assert_relative_eq!(singles.lz[1], 2.0);
    assert_relative_eq!(singles.lz[0], 0.0);

    let stellar = singles.stellar.as_ref().unwrap();
    assert_eq!(stellar.kw, vec![5.0; 3]);
    assert!(frame.binaries.is_none());
    assert!(frame.mergers.is_none());
}

#[test]
fn missing_stellar_data_is_a_warning() {
    let frame = Hdf5Snapshot::new(step("Step#1", 1.0, [0.0; 3], 0.0))
        .unwrap()
        .decode("Step#1")
        .unwrap();

    assert!(!frame.has_stellar_data());
    assert_eq!(frame.warnings.len(), 1);
    assert!(frame.warnings[0].contains("KZ(12)"), "{:?}", frame.warnings);
}

#[test]
fn missing_scalar_block_is_fatal() {
    let source = with_singles(MemorySource::new(), "Step#0");
    match Hdf5Snapshot::new(source).unwrap().decode("Step#0") {
        Err(Error::MissingDataset { step, dataset }) => {
            assert_eq!(step, "Step#0");
            assert_eq!(dataset, SCALAR_DATASET);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn short_scalar_block_is_rejected() {
    let source = with_singles(
        MemorySource::new().with("Step#0", SCALAR_DATASET, vec![0.0; 12]),
        "Step#0",
    );
    let result = Hdf5Snapshot::new(source).unwrap().decode("Step#0");
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn missing_core_dataset_is_fatal() {
    let mut source =
        MemorySource::new().with("Step#0", SCALAR_DATASET, scalars(0.0, [0.0; 3], 0.0));
    for field in SINGLE_FIELDS.iter().filter(|f| f.1 != "M") {
        source.insert("Step#0", &dataset_name(field), vec![0.0; 3]);
    }

    match Hdf5Snapshot::new(source).unwrap().decode("Step#0") {
        Err(Error::MissingDataset { dataset, .. }) => assert_eq!(dataset, "023 M"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn unequal_dataset_lengths_are_rejected() {
    let source = step("Step#0", 0.0, [0.0; 3], 0.0).with("Step#0", "023 M", vec![1.0; 4]);
    let result = Hdf5Snapshot::new(source).unwrap().decode("Step#0");
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn binaries_read_only_when_counted() {
    let mut source = step("Step#0", 0.0, [0.0; 3], 2.0);
    for field in BINARY_FIELDS.iter() {
        source.insert("Step#0", &dataset_name(field), vec![1.0, 2.0]);
    }
    // Same datasets, but the scalars claim there are no binaries
    let mut quiet = step("Step#1", 0.0, [0.0; 3], 0.0);
    for field in BINARY_FIELDS.iter() {
        quiet.insert("Step#1", &dataset_name(field), vec![1.0, 2.0]);
    }

    let frame = Hdf5Snapshot::new(source).unwrap().decode("Step#0").unwrap();
    let binaries = frame.binaries.as_ref().unwrap();
    assert_eq!(binaries.len(), 2);
    assert_eq!(binaries.column("Bin ECC"), Some(&[1.0, 2.0][..]));
    assert!(frame.binaries_stellar.is_none());

    let frame = Hdf5Snapshot::new(quiet).unwrap().decode("Step#1").unwrap();
    assert!(frame.binaries.is_none());
}

#[test]
fn counted_binaries_without_datasets_warn() {
    let frame = Hdf5Snapshot::new(step("Step#0", 0.0, [0.0; 3], 1.0))
        .unwrap()
        .decode("Step#0")
        .unwrap();

    assert!(frame.binaries.is_none());
    assert!(
        frame.warnings.iter().any(|w| w.contains("101 Bin cm X1")),
        "{:?}",
        frame.warnings
    );
}

#[test]
fn steps_come_in_file_order() {
    let mut source = step("Step#10", 10.0, [0.0; 3], 0.0);
    for (name, t) in [("Step#2", 2.0), ("Step#5", 5.0)] {
        source = with_singles(source.with(name, SCALAR_DATASET, scalars(t, [0.0; 3], 0.0)), name);
    }

    let frames = Hdf5Snapshot::new(source)
        .unwrap()
        .collect::<starcluster::Result<Vec<_>>>()
        .unwrap();

    let order: Vec<(&str, f64)> = frames.iter().map(|f| (f.step.as_str(), f.ttot())).collect();
    assert_eq!(order, vec![("Step#10", 10.0), ("Step#2", 2.0), ("Step#5", 5.0)]);
}

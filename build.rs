use std::path::Path;

const CATALOG_PATH: &str = "catalogs/demo_catalog.json";
const INFO_PATH: &str = "config/beacon_info.json";
const ACCESS_LEVELS_PATH: &str = "config/access_levels.json";

const ACCESS_LEVELS: [&str; 3] = ["PUBLIC", "REGISTERED", "CONTROLLED"];

fn main() {
    let catalog = read_json(Path::new(CATALOG_PATH), "CATALOG");
    validate_catalog_structure(&catalog);

    let info = read_json(Path::new(INFO_PATH), "BEACON INFO");
    validate_info_structure(&info);

    let access_levels = read_json(Path::new(ACCESS_LEVELS_PATH), "ACCESS LEVELS");
    validate_access_levels(&access_levels);

    set_build_dependencies();
}

fn read_json(path: &Path, label: &str) -> serde_json::Value {
    assert!(
        path.exists(),
        "\n\n{label} BUILD ERROR: File not found\n\
         Path: {}\n\
         Please create the file before building.\n",
        path.display()
    );

    let contents = std::fs::read_to_string(path).unwrap_or_else(|e| {
        panic!(
            "\n\n{label} BUILD ERROR: Failed to read file\n\
             Path: {}\n\
             Error: {e}\n",
            path.display()
        );
    });

    serde_json::from_str(&contents).unwrap_or_else(|e| {
        panic!(
            "\n\n{label} BUILD ERROR: Invalid JSON\n\
             Path: {}\n\
             Error: {e}\n\
             Hint: Check for missing commas, brackets, or invalid syntax.\n",
            path.display()
        );
    })
}

fn validate_catalog_structure(catalog: &serde_json::Value) {
    assert!(
        catalog.is_object(),
        "\n\nCATALOG BUILD ERROR: Root must be a JSON object\n\
         Got: {catalog}\n"
    );

    let datasets = catalog
        .get("datasets")
        .and_then(|d| d.as_array())
        .unwrap_or_else(|| {
            panic!(
                "\n\nCATALOG BUILD ERROR: Missing 'datasets' array\n\
                 The catalog must have a top-level 'datasets' array.\n"
            );
        });

    let mut total_variants = 0;
    for (i, dataset) in datasets.iter().enumerate() {
        let dataset_id = dataset
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>");

        validate_dataset_fields(dataset, dataset_id, i);
        total_variants += validate_dataset_variants(dataset, dataset_id);
    }

    println!(
        "cargo:warning=Validated catalog: {} datasets, {total_variants} total variants",
        datasets.len()
    );
}

fn validate_dataset_fields(dataset: &serde_json::Value, dataset_id: &str, index: usize) {
    for field in ["id", "assembly_id", "access_level"] {
        assert!(
            dataset.get(field).is_some(),
            "\n\nCATALOG BUILD ERROR: Dataset '{dataset_id}' (index {index}) missing '{field}' field\n"
        );
    }

    let access = dataset
        .get("access_level")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    assert!(
        ACCESS_LEVELS.contains(&access),
        "\n\nCATALOG BUILD ERROR: Dataset '{dataset_id}' has unknown access level '{access}'\n\
         Expected one of: {ACCESS_LEVELS:?}\n"
    );
}

fn validate_dataset_variants(dataset: &serde_json::Value, dataset_id: &str) -> usize {
    let Some(variants) = dataset.get("variants").and_then(|v| v.as_array()) else {
        return 0;
    };

    for (j, variant) in variants.iter().enumerate() {
        for field in ["reference_name", "assembly_id", "start", "reference_bases"] {
            assert!(
                variant.get(field).is_some(),
                "\n\nCATALOG BUILD ERROR: Dataset '{dataset_id}' variant {j} missing '{field}' field\n"
            );
        }

        let start = variant.get("start").and_then(serde_json::Value::as_u64);
        let end = variant.get("end").and_then(serde_json::Value::as_u64);
        if let (Some(start), Some(end)) = (start, end) {
            assert!(
                end > start,
                "\n\nCATALOG BUILD ERROR: Dataset '{dataset_id}' variant {j} ends before it starts\n\
                 start={start} end={end}\n"
            );
        }
    }
    variants.len()
}

fn validate_info_structure(info: &serde_json::Value) {
    for field in ["id", "name", "version", "organization"] {
        assert!(
            info.get(field).is_some(),
            "\n\nBEACON INFO BUILD ERROR: Missing '{field}' field\n"
        );
    }
}

fn validate_access_levels(levels: &serde_json::Value) {
    let groups = levels
        .get("fields")
        .and_then(|f| f.as_object())
        .unwrap_or_else(|| panic!("\n\nACCESS LEVELS BUILD ERROR: Missing 'fields' object\n"));

    for (group, details) in groups {
        let summary = details
            .get("accessLevelSummary")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        assert!(
            ACCESS_LEVELS.contains(&summary),
            "\n\nACCESS LEVELS BUILD ERROR: Group '{group}' needs an accessLevelSummary\n\
             Expected one of: {ACCESS_LEVELS:?}\n"
        );
    }
}

fn set_build_dependencies() {
    // Tell cargo to rerun if embedded data changes
    println!("cargo:rerun-if-changed={CATALOG_PATH}");
    println!("cargo:rerun-if-changed={INFO_PATH}");
    println!("cargo:rerun-if-changed={ACCESS_LEVELS_PATH}");

    // Tell cargo to rerun if build.rs changes
    println!("cargo:rerun-if-changed=build.rs");
}

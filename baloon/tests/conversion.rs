//! Tests d'intégration: conversions complètes depuis des fichiers BLN

use std::path::{Path, PathBuf};

use baloon::{ConvertError, Converter, FormatDescriptor, FormatError, Registry};
use bln::FeatureCollection;
use geo::{Area, Geometry};

const SQUARE: &str = "0,0\n1,0\n1,1\n0,1\n";

fn write_bln(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn exterior_len(fc: &FeatureCollection) -> usize {
    match &fc.features[0].geometry {
        Geometry::Polygon(p) => p.exterior().0.len(),
        other => panic!("Expected Polygon, got {:?}", other),
    }
}

#[test]
fn test_all_writable_formats_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_bln(dir.path(), "lot.bln", SQUARE);
    let registry = Registry::with_builtins();
    let converter = Converter::new(&registry);

    let mut targets = vec!["geojson", "shp", "gpkg", "svg"];
    if cfg!(feature = "kml") {
        targets.push("kml");
    }

    let outcomes = converter.convert(&source, &targets, None).unwrap();
    for outcome in &outcomes {
        assert!(outcome.is_success(), "{} failed: {:?}", outcome.extension, outcome.result);
        assert!(outcome.output.exists());
    }

    // Relecture de chaque format lisible
    for extension in targets.iter().filter(|e| **e != "svg") {
        let fc = converter.load(&dir.path().join(format!("lot.{extension}"))).unwrap();
        assert_eq!(fc.len(), 1, "{extension}");
        assert_eq!(exterior_len(&fc), 5, "{extension}");

        let area = fc.features[0].geometry.unsigned_area();
        assert!((area - 1.0).abs() < 1e-9, "{extension}: area {area}");
    }
}

#[test]
fn test_bowtie_is_repaired() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_bln(dir.path(), "bowtie.bln", "0,0\n2,2\n2,0\n0,2\n");
    let registry = Registry::with_builtins();

    let fc = Converter::new(&registry).load(&source).unwrap();
    let geometry = &fc.features[0].geometry;

    assert!(matches!(geometry, Geometry::MultiPolygon(mp) if mp.0.len() == 2));
    assert!((geometry.unsigned_area() - 2.0).abs() < 1e-9);
}

#[test]
fn test_output_dir_and_failures() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let source = write_bln(dir.path(), "lot.bln", SQUARE);
    let registry = Registry::with_builtins();

    let outcomes = Converter::new(&registry)
        .convert(&source, &["GeoJSON", "badformat", ".svg"], Some(out.as_path()))
        .unwrap();

    assert_eq!(outcomes[0].output, out.join("lot.geojson"));
    assert!(outcomes[0].is_success());
    assert!(matches!(
        outcomes[1].result,
        Err(ConvertError::Format(FormatError::Unsupported { .. }))
    ));
    assert!(outcomes[2].is_success());
    assert!(out.join("lot.svg").exists());
}

#[test]
fn test_insufficient_points_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_bln(dir.path(), "line.bln", "10,10\n11,11\n");

    let result = baloon::convert(&source, &["geojson"], None);
    match result {
        Err(ConvertError::Parse(bln::ParseError::InsufficientPoints { found })) => {
            assert_eq!(found, 2)
        }
        other => panic!("Expected InsufficientPoints, got {:?}", other),
    }
    assert!(!dir.path().join("line.geojson").exists());
}

#[test]
fn test_non_finite_lines_skipped_in_geojson() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_bln(dir.path(), "inf.bln", "inf,0\n1,0\n1,1\n0,1\n");

    let outcomes = baloon::convert(&source, &["geojson"], None).unwrap();
    assert!(outcomes[0].is_success());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcomes[0].output).unwrap()).unwrap();
    let ring = &json["features"][0]["geometry"]["coordinates"][0];
    assert_eq!(ring.as_array().map(Vec::len), Some(4));
    assert_eq!(ring[0][0].as_f64(), Some(1.0));
    assert_eq!(ring[0][1].as_f64(), Some(0.0));
}

fn write_marker(_: &FeatureCollection, path: &Path) -> Result<(), baloon::CodecError> {
    std::fs::write(path, "custom")?;
    Ok(())
}

#[test]
fn test_custom_format_registration() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_bln(dir.path(), "lot.bln", SQUARE);

    let mut registry = Registry::with_builtins();
    registry.register(
        FormatDescriptor::new("Marker", &["mark"])
            .with_encode(write_marker)
            .with_description("Test format"),
    );

    let outcomes = Converter::new(&registry)
        .convert(&source, &["mark"], None)
        .unwrap();
    assert!(outcomes[0].is_success());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("lot.mark")).unwrap(),
        "custom"
    );
}

#[test]
fn test_batch_report() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("secteur");
    std::fs::create_dir_all(&nested).unwrap();
    write_bln(dir.path(), "a.bln", SQUARE);
    write_bln(&nested, "b.bln", SQUARE);
    write_bln(&nested, "c.bln", "header only\n");

    let out = tempfile::tempdir().unwrap();
    let report = baloon::batch::convert_tree(dir.path(), &["svg"], Some(out.path()), None).unwrap();

    assert_eq!(report.summary(), "Converted 2/3 files");
    assert!(out.path().join("secteur/b.svg").exists());

    let report_path = out.path().join("report.json");
    report.save_to_file(&report_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(json["files_failed"], 1);
}

//! GeoJSON: écriture en streaming avec geozero, lecture avec le crate geojson

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bln::{Crs, Feature, FeatureCollection, Value};
use geo::{CoordsIter, Geometry};
use geojson::{GeoJson, JsonObject};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{Map, Number};
use tracing::debug;

use super::ensure_parent;
use crate::error::CodecError;

/// Exporte une collection en GeoJSON (streaming avec geozero)
pub fn encode(fc: &FeatureCollection, path: &Path) -> Result<(), CodecError> {
    ensure_finite(fc)?;
    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write_collection(&mut writer, fc)?;
    writer.flush()?;

    Ok(())
}

/// Écrit la FeatureCollection complète
pub fn write_collection<W: Write>(writer: &mut W, fc: &FeatureCollection) -> Result<(), CodecError> {
    ensure_finite(fc)?;
    write!(writer, r#"{{"type":"FeatureCollection","#)?;

    // Membre crs hérité, seulement hors WGS 84
    if fc.crs != Crs::WGS84 {
        write!(
            writer,
            r#""crs":{{"type":"name","properties":{{"name":"{}"}}}},"#,
            fc.crs.urn()
        )?;
    }

    write!(writer, r#""features":["#)?;
    for (i, feature) in fc.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, feature)?;
    }
    write!(writer, "]}}")?;

    Ok(())
}

/// JSON n'a pas de représentation pour NaN ni l'infini
fn ensure_finite(fc: &FeatureCollection) -> Result<(), CodecError> {
    let finite = fc.iter().all(|f| {
        f.geometry
            .coords_iter()
            .all(|c| c.x.is_finite() && c.y.is_finite())
    });
    if finite {
        Ok(())
    } else {
        Err(CodecError::unrecognized("GeoJSON", "non-finite coordinate"))
    }
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(writer: &mut W, feature: &Feature) -> Result<(), CodecError> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    feature.geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, &properties_to_json(feature))?;
    write!(writer, "}}")?;

    Ok(())
}

fn properties_to_json(feature: &Feature) -> Map<String, serde_json::Value> {
    feature
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), value_to_json(value)))
        .collect()
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        // NaN et infinis n'existent pas en JSON
        Value::Number(n) => Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
    }
}

fn value_from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Text(s),
        other => Value::Text(other.to_string()),
    }
}

/// Lit un fichier GeoJSON
pub fn decode(path: &Path) -> Result<FeatureCollection, CodecError> {
    let content = std::fs::read_to_string(path)?;
    decode_str(&content)
}

/// Lit un document GeoJSON (FeatureCollection, Feature ou Geometry seule)
pub fn decode_str(content: &str) -> Result<FeatureCollection, CodecError> {
    let geojson: GeoJson = content.parse()?;

    let (items, crs) = match geojson {
        GeoJson::FeatureCollection(collection) => {
            let crs = named_crs(collection.foreign_members.as_ref());
            let items = collection
                .features
                .into_iter()
                .map(|f| (f.geometry, f.properties))
                .collect();
            (items, crs)
        }
        GeoJson::Feature(feature) => {
            let crs = named_crs(feature.foreign_members.as_ref());
            (vec![(feature.geometry, feature.properties)], crs)
        }
        GeoJson::Geometry(geometry) => (vec![(Some(geometry), None)], Crs::WGS84),
    };

    let mut fc = FeatureCollection::new(crs);
    for (index, (geometry, properties)) in items.into_iter().enumerate() {
        let Some(geometry) = geometry else {
            debug!(index, "Skipping GeoJSON feature without geometry");
            continue;
        };

        let geometry = Geometry::<f64>::try_from(geometry)?;
        let mut feature = Feature::new(geometry, crs);
        if let Some(properties) = properties {
            feature.properties = properties
                .into_iter()
                .map(|(key, value)| (key, value_from_json(value)))
                .collect();
        }
        fc.push(feature);
    }

    Ok(fc)
}

/// CRS d'un membre `crs` nommé, WGS 84 sinon
fn named_crs(foreign_members: Option<&JsonObject>) -> Crs {
    foreign_members
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(|name| name.as_str())
        .and_then(|name| name.parse::<Crs>().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    fn square() -> FeatureCollection {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        FeatureCollection::single(
            Feature::new(Geometry::Polygon(polygon), Crs::WGS84)
                .with_property("name", "Lot \"12\"")
                .with_property("area", 1.0),
        )
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let polygon = polygon![
            (x: f64::INFINITY, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: f64::INFINITY, y: 0.0),
        ];
        let fc = FeatureCollection::single(Feature::new(Geometry::Polygon(polygon), Crs::WGS84));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inf.geojson");
        assert!(matches!(
            encode(&fc, &path),
            Err(CodecError::Unrecognized { format: "GeoJSON", .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_collection() {
        let mut buffer = Vec::new();
        write_collection(&mut buffer, &square()).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert!(json.get("crs").is_none());
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(
            json["features"][0]["geometry"]["coordinates"][0]
                .as_array()
                .unwrap()
                .len(),
            5
        );
        assert_eq!(json["features"][0]["properties"]["name"], "Lot \"12\"");
    }

    #[test]
    fn test_non_default_crs_member() {
        let mut fc = FeatureCollection::new(Crs::epsg(2154));
        fc.push(Feature::new(
            Geometry::Point(Point::new(700000.0, 6600000.0)),
            Crs::epsg(2154),
        ));

        let mut buffer = Vec::new();
        write_collection(&mut buffer, &fc).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("urn:ogc:def:crs:EPSG::2154"));

        let decoded = decode_str(&text).unwrap();
        assert_eq!(decoded.crs, Crs::epsg(2154));
        assert_eq!(decoded.features[0].crs, Crs::epsg(2154));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.geojson");
        let original = square();

        encode(&original, &path).unwrap();
        let decoded = decode(&path).unwrap();

        let (Geometry::Polygon(a), Geometry::Polygon(b)) =
            (&original.features[0].geometry, &decoded.features[0].geometry)
        else {
            panic!("Expected polygons");
        };
        assert_eq!(a.exterior().0.len(), b.exterior().0.len());
        for (ca, cb) in a.exterior().0.iter().zip(&b.exterior().0) {
            assert!((ca.x - cb.x).abs() < 1e-9);
            assert!((ca.y - cb.y).abs() < 1e-9);
        }
        assert_eq!(
            decoded.features[0].properties.get("area"),
            Some(&Value::Number(1.0))
        );
    }

    #[test]
    fn test_decode_skips_null_geometry() {
        let content = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":null,"properties":{"a":1}},
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},
             "properties":{"tags":["x","y"],"ok":true,"none":null}}
        ]}"#;

        let fc = decode_str(content).unwrap();
        assert_eq!(fc.len(), 1);
        let props = &fc.features[0].properties;
        assert_eq!(props.get("tags"), Some(&Value::Text(r#"["x","y"]"#.into())));
        assert_eq!(props.get("ok"), Some(&Value::Bool(true)));
        assert_eq!(props.get("none"), Some(&Value::Null));
    }

    #[test]
    fn test_decode_bare_geometry() {
        let fc = decode_str(r#"{"type":"Point","coordinates":[5.0,47.0]}"#).unwrap();
        assert_eq!(fc.len(), 1);
        assert!(matches!(fc.features[0].geometry, Geometry::Point(_)));
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(decode_str("not json"), Err(CodecError::GeoJson(_))));
    }
}

//! GeoPackage (OGC 1.3), une seule couche par fichier
//!
//! Écriture: le fichier est recréé, la couche porte le nom du fichier.
//! Lecture: seule la première couche de features est lue.

use std::collections::BTreeMap;
use std::path::Path;

use bln::{Crs, Feature, FeatureCollection, Value};
use geo::{BoundingRect, Geometry};
use geozero::wkb::GpkgWkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::{collection_bounds, ensure_parent, geometry_kind};
use crate::error::CodecError;

/// "GPKG" en ASCII
const APPLICATION_ID: i32 = 1_196_444_487;

/// GeoPackage 1.3.0
const USER_VERSION: i32 = 10_300;

const GEOMETRY_COLUMN: &str = "geom";
const FID_COLUMN: &str = "fid";

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

const SCHEMA: &str = r#"
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
INSERT INTO gpkg_spatial_ref_sys VALUES
    ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
    ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system');
"#;

/// Quote un identifiant SQL
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Type SQL d'un attribut, décidé par la première valeur non nulle
fn column_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::Null => None,
        Value::Text(_) => Some("TEXT"),
        Value::Number(_) => Some("REAL"),
        Value::Bool(_) => Some("BOOLEAN"),
    }
}

fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => SqlValue::Real(*n),
        Some(Value::Text(s)) => SqlValue::Text(s.clone()),
    }
}

/// Nom de type GeoPackage commun à la collection, GEOMETRY si mixte
fn geometry_type_name(fc: &FeatureCollection) -> String {
    let mut kinds = fc.iter().map(|f| geometry_kind(&f.geometry));
    match kinds.next() {
        Some(first) if kinds.all(|k| k == first) => first.to_uppercase(),
        _ => "GEOMETRY".to_string(),
    }
}

/// Exporte une collection dans un GeoPackage mono-couche
pub fn encode(fc: &FeatureCollection, path: &Path) -> Result<(), CodecError> {
    let layer = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("features")
        .to_string();

    // Préfixes réservés aux tables de métadonnées GeoPackage et SQLite
    let lowered = layer.to_ascii_lowercase();
    if lowered.starts_with("gpkg_") || lowered.starts_with("sqlite_") {
        return Err(CodecError::unrecognized(
            "GeoPackage",
            format!("layer name '{layer}' uses a reserved prefix, rename the output file"),
        ));
    }

    ensure_parent(path)?;
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let mut conn = Connection::open(path)?;
    conn.pragma_update(None, "application_id", APPLICATION_ID)?;
    conn.pragma_update(None, "user_version", USER_VERSION)?;

    // Schéma des attributs, colonnes réservées exclues
    let mut columns: BTreeMap<&str, Option<&'static str>> = BTreeMap::new();
    for feature in fc {
        for (key, value) in &feature.properties {
            if key.eq_ignore_ascii_case(FID_COLUMN) || key.eq_ignore_ascii_case(GEOMETRY_COLUMN) {
                continue;
            }
            let slot = columns.entry(key.as_str()).or_insert(None);
            if slot.is_none() {
                *slot = column_type(value);
            }
        }
    }
    let columns: Vec<(&str, &str)> = columns
        .into_iter()
        .map(|(name, kind)| (name, kind.unwrap_or("TEXT")))
        .collect();

    let srs_id = i64::from(fc.crs.epsg);
    let bounds = collection_bounds(fc);
    let tx = conn.transaction()?;

    tx.execute_batch(SCHEMA)?;
    tx.execute(
        "INSERT INTO gpkg_spatial_ref_sys VALUES ('WGS 84 geodetic', 4326, 'EPSG', 4326, ?1, 'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid')",
        params![WGS84_WKT],
    )?;
    if fc.crs != Crs::WGS84 {
        tx.execute(
            "INSERT OR IGNORE INTO gpkg_spatial_ref_sys VALUES (?1, ?2, 'EPSG', ?2, 'undefined', NULL)",
            params![fc.crs.to_string(), srs_id],
        )?;
    }

    let mut ddl = format!(
        "CREATE TABLE {} ({} INTEGER PRIMARY KEY AUTOINCREMENT, {} {}",
        quote(&layer),
        FID_COLUMN,
        GEOMETRY_COLUMN,
        geometry_type_name(fc)
    );
    for (name, kind) in &columns {
        ddl.push_str(&format!(", {} {}", quote(name), kind));
    }
    ddl.push(')');
    tx.execute_batch(&ddl)?;

    tx.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            layer,
            bounds.map(|b| b.min().x),
            bounds.map(|b| b.min().y),
            bounds.map(|b| b.max().x),
            bounds.map(|b| b.max().y),
            srs_id
        ],
    )?;
    tx.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, ?2, ?3, ?4, 0, 0)",
        params![layer, GEOMETRY_COLUMN, geometry_type_name(fc), srs_id],
    )?;

    {
        let mut names = vec![quote(GEOMETRY_COLUMN)];
        names.extend(columns.iter().map(|(name, _)| quote(name)));
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(&layer),
            names.join(", "),
            placeholders.join(", ")
        ))?;

        for feature in fc {
            let envelope = feature
                .geometry
                .bounding_rect()
                .map(|b| vec![b.min().x, b.max().x, b.min().y, b.max().y])
                .unwrap_or_default();
            let blob = feature.geometry.to_gpkg_wkb(
                CoordDimensions::xy(),
                i32::try_from(srs_id).ok(),
                envelope,
            )?;

            let mut values = Vec::with_capacity(columns.len() + 1);
            values.push(SqlValue::Blob(blob));
            values.extend(
                columns
                    .iter()
                    .map(|(name, _)| to_sql(feature.properties.get(*name))),
            );
            insert.execute(params_from_iter(values))?;
        }
    }

    tx.commit()?;
    debug!(path = %path.display(), layer = %layer, features = fc.len(), "GeoPackage written");

    Ok(())
}

/// Lit la première couche de features d'un GeoPackage
pub fn decode(path: &Path) -> Result<FeatureCollection, CodecError> {
    let conn = Connection::open(path)?;

    let layer: Option<(String, Option<i64>)> = conn
        .query_row(
            "SELECT table_name, srs_id FROM gpkg_contents WHERE data_type = 'features' ORDER BY rowid LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((layer, contents_srs)) = layer else {
        return Err(CodecError::unrecognized("GeoPackage", "no feature layer"));
    };

    let layers: i64 = conn.query_row(
        "SELECT count(*) FROM gpkg_contents WHERE data_type = 'features'",
        [],
        |row| row.get(0),
    )?;
    if layers > 1 {
        warn!(layer = %layer, layers, "GeoPackage has several feature layers, reading the first only");
    }

    let (geometry_column, srs_id): (String, i64) = conn
        .query_row(
            "SELECT column_name, srs_id FROM gpkg_geometry_columns WHERE table_name = ?1",
            params![layer],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .unwrap_or_else(|| (GEOMETRY_COLUMN.to_string(), contents_srs.unwrap_or(0)));

    let crs = u32::try_from(srs_id)
        .ok()
        .filter(|id| *id > 0)
        .map(Crs::epsg)
        .unwrap_or_default();

    // Colonnes d'attributs: tout sauf la clé primaire et la géométrie
    let mut attributes: Vec<(String, String)> = Vec::new();
    {
        let mut info = conn.prepare(&format!("PRAGMA table_info({})", quote(&layer)))?;
        let rows = info.query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(5)?,
            ))
        })?;
        for row in rows {
            let (name, declared, pk) = row?;
            if pk > 0 || name.eq_ignore_ascii_case(&geometry_column) {
                continue;
            }
            attributes.push((name, declared.to_uppercase()));
        }
    }

    let mut select_columns = vec![quote(&geometry_column)];
    select_columns.extend(attributes.iter().map(|(name, _)| quote(name)));
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {}",
        select_columns.join(", "),
        quote(&layer)
    ))?;

    let mut fc = FeatureCollection::new(crs);
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let geometry: Option<Vec<u8>> = row.get(0)?;
        let Some(blob) = geometry else {
            debug!(layer = %layer, "Skipping GeoPackage row without geometry");
            continue;
        };
        let geometry: Geometry = GpkgWkb(blob).to_geo()?;

        let mut feature = Feature::new(geometry, crs);
        for (i, (name, declared)) in attributes.iter().enumerate() {
            let value = match row.get_ref(i + 1)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) if declared == "BOOLEAN" => Value::Bool(n != 0),
                ValueRef::Integer(n) => Value::Number(n as f64),
                ValueRef::Real(n) => Value::Number(n),
                ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(_) => continue,
            };
            feature.properties.insert(name.clone(), value);
        }
        fc.push(feature);
    }

    Ok(fc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    fn parcel(crs: Crs) -> FeatureCollection {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 3.0, y: 0.0),
            (x: 3.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let mut fc = FeatureCollection::new(crs);
        fc.push(
            Feature::new(Geometry::Polygon(polygon), crs)
                .with_property("name", "Parcelle A")
                .with_property("surface", 6.0)
                .with_property("bati", false),
        );
        fc
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcelles.gpkg");

        encode(&parcel(Crs::WGS84), &path).unwrap();
        let fc = decode(&path).unwrap();

        assert_eq!(fc.len(), 1);
        assert_eq!(fc.crs, Crs::WGS84);
        let feature = &fc.features[0];
        let Geometry::Polygon(polygon) = &feature.geometry else {
            panic!("Expected Polygon");
        };
        assert_eq!(polygon.exterior().0.len(), 5);
        assert!((polygon.unsigned_area() - 6.0).abs() < 1e-9);
        assert_eq!(feature.properties.get("name"), Some(&Value::from("Parcelle A")));
        assert_eq!(feature.properties.get("surface"), Some(&Value::Number(6.0)));
        assert_eq!(feature.properties.get("bati"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_metadata_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcelles.gpkg");
        encode(&parcel(Crs::WGS84), &path).unwrap();

        let conn = Connection::open(&path).unwrap();
        let app_id: i32 = conn
            .query_row("PRAGMA application_id", [], |r| r.get(0))
            .unwrap();
        assert_eq!(app_id, APPLICATION_ID);

        let (table, max_x): (String, f64) = conn
            .query_row("SELECT table_name, max_x FROM gpkg_contents", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(table, "parcelles");
        assert_eq!(max_x, 3.0);

        let type_name: String = conn
            .query_row("SELECT geometry_type_name FROM gpkg_geometry_columns", [], |r| r.get(0))
            .unwrap();
        assert_eq!(type_name, "POLYGON");
    }

    #[test]
    fn test_rewrite_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcelles.gpkg");
        encode(&parcel(Crs::WGS84), &path).unwrap();
        encode(&parcel(Crs::WGS84), &path).unwrap();

        assert_eq!(decode(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_reserved_layer_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["gpkg_contents.gpkg", "GPKG_extensions.gpkg", "sqlite_master.gpkg"] {
            let path = dir.path().join(name);
            match encode(&parcel(Crs::WGS84), &path) {
                Err(CodecError::Unrecognized { format, reason }) => {
                    assert_eq!(format, "GeoPackage");
                    assert!(reason.contains("reserved prefix"), "{reason}");
                }
                other => panic!("Expected Unrecognized for {name}, got {:?}", other),
            }
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_projected_crs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lambert.gpkg");
        encode(&parcel(Crs::epsg(2154)), &path).unwrap();

        let fc = decode(&path).unwrap();
        assert_eq!(fc.crs, Crs::epsg(2154));
    }

    #[test]
    fn test_decode_without_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gpkg");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        drop(conn);

        assert!(matches!(decode(&path), Err(CodecError::Unrecognized { .. })));
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("lot \"a\""), "\"lot \"\"a\"\"\"");
    }
}

//! ESRI Shapefile (.shp/.shx/.dbf, plus .prj à l'écriture)

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use bln::{Crs, Feature, FeatureCollection, Value};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Polygon, Winding};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Multipoint, PolygonRing, Polyline, Shape};
use tracing::{debug, warn};

use super::{ensure_parent, geometry_kind};
use crate::error::CodecError;

/// Colonne d'identifiant toujours présente
const FID_FIELD: &str = "FID";

/// Longueur maximale d'un nom de champ dBase
const MAX_FIELD_NAME: usize = 10;

/// WKT ESRI de WGS 84 pour le fichier .prj
const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// Famille de géométrie d'un shapefile (un seul type par fichier)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeFamily {
    Polygon,
    Polyline,
    Point,
    Multipoint,
}

impl ShapeFamily {
    fn of(geometry: &Geometry) -> Option<Self> {
        match geometry {
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Some(Self::Polygon),
            Geometry::LineString(_) | Geometry::MultiLineString(_) => Some(Self::Polyline),
            Geometry::Point(_) => Some(Self::Point),
            Geometry::MultiPoint(_) => Some(Self::Multipoint),
            _ => None,
        }
    }
}

/// Type de colonne dBase, décidé par la première valeur non nulle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Character,
    Numeric,
    Logical,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Text(_) => Some(Self::Character),
            Value::Number(_) => Some(Self::Numeric),
            Value::Bool(_) => Some(Self::Logical),
        }
    }
}

/// Colonne du schéma: nom d'attribut source et nom dBase tronqué
#[derive(Debug)]
struct Column {
    source: String,
    name: String,
    kind: ColumnKind,
}

/// Exporte une collection en shapefile
pub fn encode(fc: &FeatureCollection, path: &Path) -> Result<(), CodecError> {
    let family = fc
        .iter()
        .find_map(|f| ShapeFamily::of(&f.geometry))
        .ok_or_else(|| CodecError::Empty(format!("no shapefile-compatible geometry for {}", path.display())))?;

    ensure_parent(path)?;
    let columns = schema(fc);

    let mut table = TableWriterBuilder::new().add_numeric_field(field_name(FID_FIELD)?, 10, 0);
    for column in &columns {
        let name = field_name(&column.name)?;
        table = match column.kind {
            ColumnKind::Character => table.add_character_field(name, 254),
            ColumnKind::Numeric => table.add_numeric_field(name, 24, 15),
            ColumnKind::Logical => table.add_logical_field(name),
        };
    }

    let mut writer = shapefile::Writer::from_path(path, table)?;
    let mut fid = 0usize;

    for feature in fc {
        if ShapeFamily::of(&feature.geometry) != Some(family) {
            warn!(
                kind = geometry_kind(&feature.geometry),
                expected = ?family,
                "Skipping feature with incompatible geometry for shapefile"
            );
            continue;
        }

        let record = record_for(feature, &columns, fid);
        match &feature.geometry {
            Geometry::Polygon(p) => {
                writer.write_shape_and_record(&polygon_shape(std::slice::from_ref(p)), &record)?
            }
            Geometry::MultiPolygon(mp) => {
                writer.write_shape_and_record(&polygon_shape(&mp.0), &record)?
            }
            Geometry::LineString(ls) => {
                writer.write_shape_and_record(&polyline_shape(std::slice::from_ref(ls)), &record)?
            }
            Geometry::MultiLineString(mls) => {
                writer.write_shape_and_record(&polyline_shape(&mls.0), &record)?
            }
            Geometry::Point(p) => {
                writer.write_shape_and_record(&shapefile::Point::new(p.x(), p.y()), &record)?
            }
            Geometry::MultiPoint(mp) => {
                let points = mp.iter().map(|p| shapefile::Point::new(p.x(), p.y())).collect();
                writer.write_shape_and_record(&Multipoint::new(points), &record)?
            }
            _ => continue,
        }
        fid += 1;
    }
    drop(writer);

    if fc.crs == Crs::WGS84 {
        std::fs::write(path.with_extension("prj"), WGS84_PRJ)?;
    }

    debug!(path = %path.display(), features = fid, "Shapefile written");
    Ok(())
}

fn field_name(name: &str) -> Result<FieldName, CodecError> {
    FieldName::try_from(name)
        .map_err(|e| CodecError::unrecognized("Shapefile", format!("invalid field name '{name}': {e:?}")))
}

/// Tronque un nom de champ à 10 octets sans couper de caractère
fn truncate_name(name: &str) -> String {
    let mut end = name.len().min(MAX_FIELD_NAME);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Schéma des attributs, dans l'ordre des clés
fn schema(fc: &FeatureCollection) -> Vec<Column> {
    let mut kinds: BTreeMap<&str, Option<ColumnKind>> = BTreeMap::new();
    for feature in fc {
        for (key, value) in &feature.properties {
            let slot = kinds.entry(key.as_str()).or_insert(None);
            if slot.is_none() {
                *slot = ColumnKind::of(value);
            }
        }
    }

    let mut used: Vec<String> = vec![FID_FIELD.to_string()];
    let mut columns = Vec::new();
    for (source, kind) in kinds {
        let Some(kind) = kind else {
            debug!(field = source, "Skipping attribute with only null values");
            continue;
        };
        let name = truncate_name(source);
        if used.iter().any(|u| u.eq_ignore_ascii_case(&name)) {
            warn!(field = source, truncated = %name, "Skipping attribute with duplicate dBase name");
            continue;
        }
        used.push(name.clone());
        columns.push(Column {
            source: source.to_string(),
            name,
            kind,
        });
    }
    columns
}

fn record_for(feature: &Feature, columns: &[Column], fid: usize) -> Record {
    let mut record = Record::default();
    record.insert(FID_FIELD.to_string(), FieldValue::Numeric(Some(fid as f64)));

    for column in columns {
        let value = feature.properties.get(&column.source);
        let field = match column.kind {
            ColumnKind::Character => FieldValue::Character(value.and_then(|v| match v {
                Value::Null => None,
                other => Some(other.to_string()),
            })),
            ColumnKind::Numeric => FieldValue::Numeric(value.and_then(Value::as_f64)),
            ColumnKind::Logical => FieldValue::Logical(value.and_then(|v| match v {
                Value::Bool(b) => Some(*b),
                _ => None,
            })),
        };
        record.insert(column.name.clone(), field);
    }
    record
}

fn to_points(ring: &LineString) -> Vec<shapefile::Point> {
    ring.coords().map(|c| shapefile::Point::new(c.x, c.y)).collect()
}

/// Rings extérieurs en sens horaire, trous en sens anti-horaire
fn polygon_shape(polygons: &[Polygon]) -> shapefile::Polygon {
    let mut rings = Vec::new();
    for polygon in polygons {
        let mut exterior = polygon.exterior().clone();
        exterior.make_cw_winding();
        rings.push(PolygonRing::Outer(to_points(&exterior)));

        for interior in polygon.interiors() {
            let mut hole = interior.clone();
            hole.make_ccw_winding();
            rings.push(PolygonRing::Inner(to_points(&hole)));
        }
    }
    shapefile::Polygon::with_rings(rings)
}

fn polyline_shape(lines: &[LineString]) -> Polyline {
    Polyline::with_parts(lines.iter().map(to_points).collect())
}

/// Lit un shapefile
pub fn decode(path: &Path) -> Result<FeatureCollection, CodecError> {
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut fc = FeatureCollection::new(Crs::WGS84);

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        let Some(geometry) = shape_to_geometry(shape) else {
            continue;
        };

        let mut feature = Feature::new(geometry, Crs::WGS84);
        for (key, value) in HashMap::<String, FieldValue>::from(record) {
            if key.eq_ignore_ascii_case(FID_FIELD) {
                continue;
            }
            feature.properties.insert(key, value_from_field(value));
        }
        fc.push(feature);
    }

    Ok(fc)
}

fn shape_to_geometry(shape: Shape) -> Option<Geometry> {
    match shape {
        Shape::Point(p) => Some(Geometry::Point(geo::Point::new(p.x, p.y))),
        Shape::Multipoint(mp) => Some(Geometry::MultiPoint(MultiPoint::from(
            mp.points()
                .iter()
                .map(|p| geo::Point::new(p.x, p.y))
                .collect::<Vec<_>>(),
        ))),
        Shape::Polyline(pl) => {
            let mut parts: Vec<LineString> = pl.parts().iter().map(|part| line_string(part)).collect();
            if parts.len() == 1 {
                parts.pop().map(Geometry::LineString)
            } else {
                Some(Geometry::MultiLineString(MultiLineString::new(parts)))
            }
        }
        Shape::Polygon(polygon) => {
            let mut polygons = group_rings(polygon.rings());
            if polygons.len() == 1 {
                polygons.pop().map(Geometry::Polygon)
            } else {
                Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
            }
        }
        Shape::NullShape => None,
        other => {
            warn!(shape_type = ?other.shapetype(), "Skipping unsupported shape type");
            None
        }
    }
}

fn line_string(points: &[shapefile::Point]) -> LineString {
    LineString::new(points.iter().map(|p| Coord { x: p.x, y: p.y }).collect())
}

/// Chaque ring extérieur ouvre un polygone, les trous suivent leur extérieur
fn group_rings(rings: &[PolygonRing<shapefile::Point>]) -> Vec<Polygon> {
    let mut polygons: Vec<(LineString, Vec<LineString>)> = Vec::new();

    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push((line_string(points), Vec::new())),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some((_, holes)) => holes.push(line_string(points)),
                // Trou sans extérieur: traité comme extérieur
                None => polygons.push((line_string(points), Vec::new())),
            },
        }
    }

    polygons
        .into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect()
}

fn value_from_field(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(s)) => Value::Text(s.trim_end().to_string()),
        FieldValue::Memo(s) => Value::Text(s),
        FieldValue::Numeric(Some(n)) => Value::Number(n),
        FieldValue::Float(Some(n)) => Value::Number(f64::from(n)),
        FieldValue::Double(n) | FieldValue::Currency(n) => Value::Number(n),
        FieldValue::Integer(n) => Value::Number(f64::from(n)),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Date(Some(d)) => Value::Text(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())),
        _ => Value::Null,
    }
}

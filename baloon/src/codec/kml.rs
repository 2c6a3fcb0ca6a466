//! KML 2.2 (feature `kml`)
//!
//! La lecture tente d'abord le codec vectoriel générique, puis parcourt
//! l'arbre KML (Document/Folder) à la recherche des Placemarks.
//! `.kmz` est un alias: le contenu reste du KML en clair.

use std::fmt::Display;
use std::path::Path;

use bln::{Crs, Feature, FeatureCollection, Value};
use geo::{
    Coord, Geometry, GeometryCollection, HasDimensions, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use super::{ensure_parent, geometry_kind, vector};
use crate::error::CodecError;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Éléments dont les enfants peuvent contenir des Placemarks
const CONTAINERS: &[&str] = &["", "kml", "Document", "Folder"];

fn xml_error(e: impl Display) -> CodecError {
    CodecError::Xml(e.to_string())
}

// ============================================================================
// Écriture
// ============================================================================

type XmlWriter = Writer<Vec<u8>>;

fn start(writer: &mut XmlWriter, name: &str) -> Result<(), CodecError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)
}

fn end(writer: &mut XmlWriter, name: &str) -> Result<(), CodecError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), CodecError> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    end(writer, name)
}

fn coordinates<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> String {
    coords
        .into_iter()
        .map(|c| format!("{},{}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_point(writer: &mut XmlWriter, point: &Point) -> Result<(), CodecError> {
    start(writer, "Point")?;
    text_element(writer, "coordinates", &coordinates([&point.0]))?;
    end(writer, "Point")
}

fn write_line_string(writer: &mut XmlWriter, line: &LineString) -> Result<(), CodecError> {
    start(writer, "LineString")?;
    text_element(writer, "coordinates", &coordinates(&line.0))?;
    end(writer, "LineString")
}

fn write_ring(writer: &mut XmlWriter, boundary: &str, ring: &LineString) -> Result<(), CodecError> {
    start(writer, boundary)?;
    start(writer, "LinearRing")?;
    text_element(writer, "coordinates", &coordinates(&ring.0))?;
    end(writer, "LinearRing")?;
    end(writer, boundary)
}

fn write_polygon(writer: &mut XmlWriter, polygon: &Polygon) -> Result<(), CodecError> {
    start(writer, "Polygon")?;
    write_ring(writer, "outerBoundaryIs", polygon.exterior())?;
    for interior in polygon.interiors() {
        write_ring(writer, "innerBoundaryIs", interior)?;
    }
    end(writer, "Polygon")
}

/// Écrit la géométrie d'une feature; false si le type n'a pas d'équivalent KML
fn write_geometry(writer: &mut XmlWriter, geometry: &Geometry) -> Result<bool, CodecError> {
    match geometry {
        Geometry::Point(p) => write_point(writer, p)?,
        Geometry::LineString(ls) => write_line_string(writer, ls)?,
        Geometry::Polygon(p) => write_polygon(writer, p)?,
        Geometry::MultiPoint(mp) => {
            start(writer, "MultiGeometry")?;
            for p in mp {
                write_point(writer, p)?;
            }
            end(writer, "MultiGeometry")?;
        }
        Geometry::MultiLineString(mls) => {
            start(writer, "MultiGeometry")?;
            for ls in mls {
                write_line_string(writer, ls)?;
            }
            end(writer, "MultiGeometry")?;
        }
        Geometry::MultiPolygon(mp) => {
            start(writer, "MultiGeometry")?;
            for p in mp {
                write_polygon(writer, p)?;
            }
            end(writer, "MultiGeometry")?;
        }
        Geometry::GeometryCollection(_)
        | Geometry::Line(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => return Ok(false),
    }
    Ok(true)
}

/// Nom du Placemark: attribut `name` ou `Name`, sinon `Feature_<index>`
fn placemark_name(feature: &Feature, index: usize) -> String {
    ["name", "Name"]
        .iter()
        .filter_map(|key| feature.properties.get(*key))
        .filter(|v| !v.is_null())
        .map(ToString::to_string)
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| format!("Feature_{index}"))
}

/// Description: les autres attributs non nuls en `clé: valeur`
fn placemark_description(feature: &Feature) -> String {
    let parts: Vec<String> = feature
        .properties
        .iter()
        .filter(|(key, value)| !matches!(key.as_str(), "geometry" | "name" | "Name") && !value.is_null())
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();

    if parts.is_empty() {
        "No description".to_string()
    } else {
        parts.join("; ")
    }
}

/// Sérialise une collection en document KML
pub fn to_kml(fc: &FeatureCollection, document_name: &str) -> Result<Vec<u8>, CodecError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(
            BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)]),
        ))
        .map_err(xml_error)?;

    start(&mut writer, "Document")?;
    text_element(&mut writer, "name", document_name)?;
    text_element(&mut writer, "description", "Generated by baloon")?;

    for (index, feature) in fc.iter().enumerate() {
        let kind = geometry_kind(&feature.geometry);
        if feature.geometry.is_empty() {
            warn!(index, kind, "Skipping empty geometry");
            continue;
        }

        // Rendu à part pour pouvoir ignorer le Placemark entier
        let mut geometry = Writer::new_with_indent(Vec::new(), b' ', 2);
        if !write_geometry(&mut geometry, &feature.geometry)? {
            warn!(index, kind, "Unsupported geometry type for KML, skipping feature");
            continue;
        }

        start(&mut writer, "Placemark")?;
        text_element(&mut writer, "name", &placemark_name(feature, index))?;
        text_element(&mut writer, "description", &placemark_description(feature))?;
        write_geometry(&mut writer, &feature.geometry)?;
        end(&mut writer, "Placemark")?;
    }

    end(&mut writer, "Document")?;
    end(&mut writer, "kml")?;

    let mut xml = writer.into_inner();
    xml.push(b'\n');
    Ok(xml)
}

/// Exporte une collection en KML
pub fn encode(fc: &FeatureCollection, path: &Path) -> Result<(), CodecError> {
    let document_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("baloon");

    let xml = to_kml(fc, document_name)?;
    ensure_parent(path)?;
    std::fs::write(path, xml)?;

    debug!(path = %path.display(), features = fc.len(), "KML written");
    Ok(())
}

// ============================================================================
// Lecture
// ============================================================================

/// Nœud de l'arbre XML simplifié (noms locaux, texte concaténé)
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

// Libération itérative: un imbriquement profond ne doit pas épuiser la pile
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut element) = pending.pop() {
            pending.append(&mut element.children);
        }
    }
}

fn local_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Construit l'arbre avec une pile explicite; la racine est anonyme
fn parse_tree(content: &str) -> Result<Element, CodecError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Element::default()];
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => stack.push(Element::named(local_name(&e))),
            Event::Empty(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Element::named(local_name(&e)));
                }
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    if let Some(element) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(element);
                        }
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_error)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Éléments restés ouverts: rattachés à leur parent
    while stack.len() > 1 {
        if let Some(element) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(element);
            }
        }
    }

    stack
        .pop()
        .ok_or_else(|| CodecError::unrecognized("KML", "empty document"))
}

/// Placemarks des conteneurs, dans l'ordre du document
fn collect_placemarks(root: &Element) -> Vec<&Element> {
    let mut placemarks = Vec::new();
    let mut worklist = vec![root];

    while let Some(element) = worklist.pop() {
        if element.name == "Placemark" {
            placemarks.push(element);
        } else if CONTAINERS.contains(&element.name.as_str()) {
            worklist.extend(element.children.iter().rev());
        }
    }

    placemarks
}

/// Tuples `x,y[,z]` séparés par des blancs; les tuples invalides ou non finis sont ignorés
fn parse_coordinates(text: &str) -> Vec<Coord> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let mut parts = tuple.split(',');
            let x = parts.next()?.trim().parse::<f64>().ok()?;
            let y = parts.next()?.trim().parse::<f64>().ok()?;
            (x.is_finite() && y.is_finite()).then_some(Coord { x, y })
        })
        .collect()
}

fn element_coordinates(element: &Element) -> Vec<Coord> {
    element
        .child("coordinates")
        .map(|c| parse_coordinates(&c.text))
        .unwrap_or_default()
}

fn parse_polygon(element: &Element) -> Option<Polygon> {
    let exterior = element_coordinates(element.child("outerBoundaryIs")?.child("LinearRing")?);
    if exterior.is_empty() {
        return None;
    }

    let interiors = element
        .children_named("innerBoundaryIs")
        .flat_map(|boundary| boundary.children_named("LinearRing"))
        .map(element_coordinates)
        .filter(|ring| !ring.is_empty())
        .map(LineString::new)
        .collect();

    Some(Polygon::new(LineString::new(exterior), interiors))
}

/// Regroupe les parties d'une MultiGeometry: Multi* si homogènes
fn collapse(parts: Vec<Geometry>) -> Option<Geometry> {
    if parts.is_empty() {
        return None;
    }

    if parts.iter().all(|g| matches!(g, Geometry::Point(_))) {
        let points: Vec<Point> = parts
            .into_iter()
            .filter_map(|g| Point::try_from(g).ok())
            .collect();
        return Some(Geometry::MultiPoint(MultiPoint::new(points)));
    }
    if parts.iter().all(|g| matches!(g, Geometry::LineString(_))) {
        let lines: Vec<LineString> = parts
            .into_iter()
            .filter_map(|g| LineString::try_from(g).ok())
            .collect();
        return Some(Geometry::MultiLineString(MultiLineString::new(lines)));
    }
    if parts.iter().all(|g| matches!(g, Geometry::Polygon(_))) {
        let polygons: Vec<Polygon> = parts
            .into_iter()
            .filter_map(|g| Polygon::try_from(g).ok())
            .collect();
        return Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)));
    }

    Some(Geometry::GeometryCollection(GeometryCollection::new_from(parts)))
}

fn parse_geometry(element: &Element) -> Option<Geometry> {
    match element.name.as_str() {
        "Point" => element_coordinates(element)
            .first()
            .map(|c| Geometry::Point(Point::from(*c))),
        "LineString" | "LinearRing" => {
            let coords = element_coordinates(element);
            (!coords.is_empty()).then(|| Geometry::LineString(LineString::new(coords)))
        }
        "Polygon" => parse_polygon(element).map(Geometry::Polygon),
        "MultiGeometry" => {
            // MultiGeometry imbriquées aplaties
            let mut parts = Vec::new();
            let mut worklist: Vec<&Element> = element.children.iter().rev().collect();
            while let Some(child) = worklist.pop() {
                if child.name == "MultiGeometry" {
                    worklist.extend(child.children.iter().rev());
                } else if let Some(geometry) = parse_geometry(child) {
                    parts.push(geometry);
                }
            }
            collapse(parts)
        }
        _ => None,
    }
}

/// Parcourt un document KML et collecte les Placemarks géométriques
pub fn decode_str(content: &str) -> Result<FeatureCollection, CodecError> {
    let root = parse_tree(content)?;
    let mut fc = FeatureCollection::new(Crs::WGS84);

    for placemark in collect_placemarks(&root) {
        let Some(geometry) = placemark.children.iter().find_map(parse_geometry) else {
            debug!("Skipping Placemark without geometry");
            continue;
        };

        let ordinal = fc.len() + 1;
        let name = placemark
            .child("name")
            .map(|n| n.text.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Feature_{ordinal}"));
        let description = placemark
            .child("description")
            .map(|d| d.text.trim().to_string())
            .unwrap_or_default();

        fc.push(
            Feature::new(geometry, Crs::WGS84)
                .with_property("name", Value::Text(name))
                .with_property("description", Value::Text(description)),
        );
    }

    Ok(fc)
}

/// Lit un fichier KML (ou KMZ en clair)
pub fn decode(path: &Path) -> Result<FeatureCollection, CodecError> {
    match vector::decode(path) {
        Ok(fc) => Ok(fc),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Generic vector read failed, using KML parser");
            let content = std::fs::read_to_string(path)?;
            decode_str(&content)
        }
    }
}

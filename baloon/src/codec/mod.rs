//! Codecs de formats vectoriels
//!
//! Chaque codec expose `decode(&Path)` et/ou `encode(&FeatureCollection, &Path)`
//! sur le modèle commun de `bln`. Le registre référence ces fonctions.

pub mod bln;
pub mod geojson;
pub mod gpkg;
#[cfg(feature = "kml")]
pub mod kml;
pub mod shapefile;
pub mod svg;
pub mod vector;

use std::path::Path;

use ::bln::FeatureCollection;
use geo::{BoundingRect, Geometry, Rect};

/// Extension en minuscules d'un chemin (vide si absente)
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Nom lisible d'un type de géométrie, pour les logs et erreurs
pub(crate) fn geometry_kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Emprise de toutes les géométries (None si aucune n'a d'emprise)
pub(crate) fn collection_bounds(fc: &FeatureCollection) -> Option<Rect> {
    fc.iter()
        .filter_map(|f| f.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        })
}

/// Crée le dossier parent d'un fichier de sortie si besoin
pub(crate) fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

//! SVG (écriture seule): projection orthographique 2D des polygones
//!
//! Aucune transformation de CRS: les coordonnées sont mises à l'échelle pour
//! une largeur fixe de 800 unités, axe Y inversé.

use std::fmt::Write as _;
use std::path::Path;

use bln::FeatureCollection;
use geo::{Geometry, Polygon, Rect};
use tracing::debug;

use super::{collection_bounds, ensure_parent, geometry_kind};
use crate::error::CodecError;

/// Largeur fixe du viewport
pub const VIEWPORT_WIDTH: f64 = 800.0;

/// Transformation monde -> viewport
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    min_x: f64,
    max_y: f64,
    scale: f64,
    height: f64,
}

impl Projection {
    pub fn new(bounds: Rect) -> Self {
        let width = (bounds.max().x - bounds.min().x).max(1.0);
        let height = (bounds.max().y - bounds.min().y).max(1.0);
        let scale = VIEWPORT_WIDTH / width;

        Self {
            min_x: bounds.min().x,
            max_y: bounds.max().y,
            scale,
            height: height * scale,
        }
    }

    /// Hauteur du viewport
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.min_x) * self.scale, (self.max_y - y) * self.scale)
    }
}

/// Chemin fermé du ring extérieur d'un polygone
fn polygon_path(polygon: &Polygon, projection: &Projection) -> Option<String> {
    let mut coords = polygon.exterior().coords();
    let first = coords.next()?;

    let (x, y) = projection.apply(first.x, first.y);
    let mut d = format!("M {x:.2},{y:.2}");
    for c in coords {
        let (x, y) = projection.apply(c.x, c.y);
        let _ = write!(d, " L {x:.2},{y:.2}");
    }
    d.push_str(" Z");

    Some(format!(
        "<path d=\"{d}\" fill='none' stroke='black' stroke-width='1' />"
    ))
}

/// Rend une collection en document SVG
pub fn to_svg(fc: &FeatureCollection) -> Result<String, CodecError> {
    let bounds =
        collection_bounds(fc).ok_or_else(|| CodecError::Empty("no geometry to draw in SVG".into()))?;
    let projection = Projection::new(bounds);

    let mut svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h:.2}' viewBox='0 0 {w} {h:.2}'>\n",
        w = VIEWPORT_WIDTH,
        h = projection.height()
    );

    for (index, feature) in fc.iter().enumerate() {
        let polygons: Vec<&Polygon> = match &feature.geometry {
            Geometry::Polygon(p) => vec![p],
            Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
            other => {
                debug!(index, kind = geometry_kind(other), "Skipping non-polygon geometry in SVG");
                continue;
            }
        };

        for path in polygons.into_iter().filter_map(|p| polygon_path(p, &projection)) {
            svg.push_str(&path);
            svg.push('\n');
        }
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Exporte une collection en SVG
pub fn encode(fc: &FeatureCollection, path: &Path) -> Result<(), CodecError> {
    let svg = to_svg(fc)?;
    ensure_parent(path)?;
    std::fs::write(path, svg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bln::{Crs, Feature};
    use geo::{polygon, MultiPolygon, Point};

    fn collection(geometries: Vec<Geometry>) -> FeatureCollection {
        let mut fc = FeatureCollection::new(Crs::WGS84);
        for g in geometries {
            fc.push(Feature::new(g, Crs::WGS84));
        }
        fc
    }

    /// Coordonnées des chemins ("x,y" après M/L)
    fn path_coords(svg: &str) -> Vec<(f64, f64)> {
        svg.split('"')
            .filter(|s| s.starts_with('M'))
            .flat_map(|d| d.split_whitespace())
            .filter(|tok| tok.contains(','))
            .map(|tok| {
                let (x, y) = tok.split_once(',').unwrap();
                (x.parse().unwrap(), y.parse().unwrap())
            })
            .collect()
    }

    #[test]
    fn test_unit_square() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let svg = to_svg(&collection(vec![Geometry::Polygon(square)])).unwrap();

        assert!(svg.starts_with(
            "<svg xmlns='http://www.w3.org/2000/svg' width='800' height='800.00' viewBox='0 0 800 800.00'>"
        ));
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(svg.contains("M 0.00,800.00 L 800.00,800.00 L 800.00,0.00 L 0.00,0.00 L 0.00,800.00 Z"));
        assert!(svg.contains("fill='none' stroke='black' stroke-width='1'"));
    }

    #[test]
    fn test_scale_invariant() {
        let a = polygon![
            (x: -43.2, y: -22.95),
            (x: -43.1, y: -22.95),
            (x: -43.15, y: -22.80),
            (x: -43.2, y: -22.95),
        ];
        let b = polygon![
            (x: 2.0, y: 48.0),
            (x: 2.5, y: 48.0),
            (x: 2.5, y: 48.9),
            (x: 2.0, y: 48.0),
        ];
        let fc = collection(vec![
            Geometry::MultiPolygon(MultiPolygon::new(vec![a, b])),
            Geometry::Point(Point::new(100.0, 10.0)),
        ]);

        let svg = to_svg(&fc).unwrap();
        let projection = Projection::new(collection_bounds(&fc).unwrap());
        let height = projection.height();

        assert_eq!(svg.matches("<path").count(), 2);
        for (x, y) in path_coords(&svg) {
            assert!((0.0..=VIEWPORT_WIDTH).contains(&x), "x out of viewport: {x}");
            assert!(y >= 0.0 && y <= height + 0.005, "y out of viewport: {y}");
        }
    }

    #[test]
    fn test_degenerate_extent() {
        // Emprise nulle: largeur et hauteur ramenées à 1
        let projection = Projection::new(Rect::new((5.0, 5.0), (5.0, 5.0)));
        assert_eq!(projection.height(), VIEWPORT_WIDTH);
        assert_eq!(projection.apply(5.0, 5.0), (0.0, 0.0));
    }

    #[test]
    fn test_empty_collection() {
        assert!(matches!(
            to_svg(&FeatureCollection::new(Crs::WGS84)),
            Err(CodecError::Empty(_))
        ));
    }
}

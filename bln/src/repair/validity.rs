//! Contrôle de validité des polygones (auto-intersections, surfaces nulles)

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Intersects, Line, LineString, MultiPolygon, Polygon};

use super::ring::distinct_coords;

/// Un polygone est valide si tous ses rings le sont et sa surface est non nulle
pub fn is_valid_polygon(polygon: &Polygon) -> bool {
    has_finite_coords(polygon)
        && ring_is_simple(polygon.exterior())
        && polygon.interiors().iter().all(ring_is_simple)
        && polygon.unsigned_area() > 0.0
}

/// Aucune coordonnée NaN ou infinie
pub fn has_finite_coords(polygon: &Polygon) -> bool {
    polygon
        .exterior()
        .coords()
        .chain(polygon.interiors().iter().flat_map(|ring| ring.coords()))
        .all(|c| c.x.is_finite() && c.y.is_finite())
}

pub fn is_valid_multipolygon(multi: &MultiPolygon) -> bool {
    !multi.0.is_empty() && multi.0.iter().all(is_valid_polygon)
}

/// Un ring est simple s'il a au moins 3 sommets distincts et qu'aucune paire
/// d'arêtes non adjacentes ne se touche
pub fn ring_is_simple(ring: &LineString) -> bool {
    let coords = distinct_coords(ring);
    // Ring fermé: le premier sommet est répété en fin
    if coords.len() < 4 || coords.first() != coords.last() {
        return false;
    }

    let segments: Vec<Line> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    find_intersection(&segments).is_none()
}

/// Cherche une paire d'arêtes en conflit (balayage sur x)
///
/// Retourne les indices des deux arêtes fautives.
fn find_intersection(segments: &[Line]) -> Option<(usize, usize)> {
    let n = segments.len();
    let min_x = |l: &Line| l.start.x.min(l.end.x);
    let max_x = |l: &Line| l.start.x.max(l.end.x);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| min_x(&segments[a]).total_cmp(&min_x(&segments[b])));

    for (pos, &i) in order.iter().enumerate() {
        let reach = max_x(&segments[i]);
        for &j in &order[pos + 1..] {
            if min_x(&segments[j]) > reach {
                break;
            }
            if segments_conflict(segments, i, j) {
                return Some((i.min(j), i.max(j)));
            }
        }
    }

    None
}

fn segments_conflict(segments: &[Line], i: usize, j: usize) -> bool {
    let n = segments.len();
    let (a, b) = (segments[i], segments[j]);
    let (lo, hi) = (i.min(j), i.max(j));
    let adjacent = hi == lo + 1 || (lo == 0 && hi == n - 1);

    if adjacent {
        // Deux arêtes consécutives partagent un sommet: seul un
        // recouvrement (aller-retour) est une faute
        matches!(
            line_intersection(a, b),
            Some(LineIntersection::Collinear { .. })
        )
    } else {
        a.intersects(&b)
    }
}

//! Fermeture des rings

use geo::{Coord, LineString};

use crate::types::Point;

/// Construit un ring fermé à partir des sommets lus
///
/// Le premier sommet est recopié en fin de ring s'il n'y est pas déjà.
/// Un ring déjà fermé n'est pas modifié.
pub fn close_ring(points: &[Point]) -> LineString {
    let mut coords: Vec<Coord> = points.iter().map(|&p| p.into()).collect();

    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(first);
        }
    }

    LineString::new(coords)
}

/// Sommets d'un ring fermé sans doublons consécutifs
pub(crate) fn distinct_coords(ring: &LineString) -> Vec<Coord> {
    let mut coords = ring.0.clone();
    coords.dedup();
    coords
}

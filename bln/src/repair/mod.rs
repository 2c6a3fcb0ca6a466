//! Construction et réparation des polygones BLN

pub mod ring;
pub mod validity;

use geo::{Area, BooleanOps, Geometry, MultiPolygon, Polygon};
use tracing::{debug, warn};

use crate::types::{Crs, Feature, Point};

/// Construit la feature polygonale à partir des sommets parsés
///
/// Le ring est fermé, puis réparé une seule fois s'il est invalide. La feature
/// est toujours retournée: la validité reste indicative pour les writers.
pub fn build(points: &[Point]) -> Feature {
    let ring = ring::close_ring(points);
    let polygon = Polygon::new(ring, vec![]);

    let geometry = if validity::is_valid_polygon(&polygon) {
        Geometry::Polygon(polygon)
    } else {
        repair_or_keep(polygon)
    };

    Feature::new(geometry, Crs::WGS84)
}

/// Tente la réparation, garde l'original si elle ne produit rien
fn repair_or_keep(polygon: Polygon) -> Geometry {
    let Some(repaired) = repair(&polygon) else {
        warn!(
            points = polygon.exterior().0.len(),
            "Polygon is degenerate, keeping it unrepaired"
        );
        return Geometry::Polygon(polygon);
    };

    let still_invalid = match &repaired {
        Geometry::Polygon(p) => !validity::is_valid_polygon(p),
        Geometry::MultiPolygon(mp) => !validity::is_valid_multipolygon(mp),
        _ => false,
    };
    if still_invalid {
        warn!("Polygon still invalid after repair");
    }

    repaired
}

/// Réparation équivalente à un buffer nul
///
/// L'union avec un ensemble vide renoue le polygone aux auto-intersections.
/// Opération bornée (un seul passage) et idempotente sur un polygone valide.
/// Retourne `None` si le résultat est vide (polygone dégénéré) ou si une
/// coordonnée n'est pas finie, l'union n'acceptant que des valeurs finies.
pub fn repair(polygon: &Polygon) -> Option<Geometry> {
    if !validity::has_finite_coords(polygon) {
        debug!("Non-finite coordinate, repair skipped");
        return None;
    }

    let subject = MultiPolygon::new(vec![polygon.clone()]);
    let mut repaired = subject.union(&MultiPolygon::new(Vec::new()));

    repaired.0.retain(|p| p.unsigned_area() > 0.0);
    debug!(parts = repaired.0.len(), "Polygon repaired");

    match repaired.0.len() {
        0 => None,
        1 => repaired.0.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(repaired)),
    }
}

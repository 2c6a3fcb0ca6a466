//! # bln
//!
//! Parser pour le format BLN (Golden Software / Surfer) utilisé pour les
//! contours de polygones.
//!
//! ## Features
//!
//! - Lecture tolérante (UTF-8 validé avec `simdutf8`, octets invalides ignorés)
//! - Parsing des coordonnées avec `fast-float`
//! - Fermeture des rings et réparation des polygones auto-intersectés
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let points = bln::parse_path(Path::new("contour.bln"))?;
//! println!("{} sommets", points.len());
//!
//! let feature = bln::build(&points);
//! println!("CRS: {}", feature.crs);
//! ```

pub mod error;
pub mod parser;
pub mod reader;
pub mod repair;
pub mod types;

pub use error::ParseError;
pub use parser::{parse_bytes, parse_line, parse_path, parse_str};
pub use repair::build;
pub use types::{Crs, Feature, FeatureCollection, Point, Value};

use std::path::Path;

/// Lit un fichier BLN et construit sa feature polygonale
///
/// # Errors
///
/// Retourne `ParseError` si le fichier est illisible ou contient moins de
/// 3 lignes de coordonnées.
pub fn read_path(path: &Path) -> Result<Feature, ParseError> {
    let points = parse_path(path)?;
    Ok(build(&points))
}

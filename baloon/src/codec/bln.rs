//! Lecture BLN (lecture seule)

use std::path::Path;

use bln::FeatureCollection;
use tracing::debug;

use crate::error::CodecError;

/// Lit un fichier BLN: une seule feature polygonale en EPSG:4326
pub fn decode(path: &Path) -> Result<FeatureCollection, CodecError> {
    let feature = bln::read_path(path)?;
    debug!(path = %path.display(), crs = %feature.crs, "BLN boundary loaded");
    Ok(FeatureCollection::single(feature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_decode_single_feature() {
        let mut file = tempfile::Builder::new().suffix(".bln").tempfile().unwrap();
        file.write_all(b"0,0\n1,0\n1,1\n0,1\n").unwrap();

        let fc = decode(file.path()).unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.crs, bln::Crs::WGS84);
    }

    #[test]
    fn test_decode_insufficient_points() {
        let mut file = tempfile::Builder::new().suffix(".bln").tempfile().unwrap();
        file.write_all(b"10,10\n11,11\n").unwrap();

        assert!(matches!(
            decode(file.path()),
            Err(CodecError::Parse(bln::ParseError::InsufficientPoints { found: 2 }))
        ));
    }
}

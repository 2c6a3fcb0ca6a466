//! Codec vectoriel générique: GeoJSON et Shapefile
//!
//! L'écriture choisit le format d'après l'extension de destination, la
//! lecture d'après le contenu du fichier.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bln::FeatureCollection;
use tracing::debug;

use super::{extension_of, geojson, shapefile};
use crate::error::CodecError;

/// Code de fichier ESRI en tête de tout .shp (big-endian)
const SHAPEFILE_MAGIC: [u8; 4] = 9994i32.to_be_bytes();

/// Format détecté à la lecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniffed {
    GeoJson,
    Shapefile,
}

/// Reconnaît le format d'après les premiers octets
pub fn sniff(head: &[u8]) -> Option<Sniffed> {
    if head.len() >= 4 && head[..4] == SHAPEFILE_MAGIC {
        return Some(Sniffed::Shapefile);
    }

    let text = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    match text.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Some(Sniffed::GeoJson),
        _ => None,
    }
}

/// Lit un fichier GeoJSON ou Shapefile selon son contenu
pub fn decode(path: &Path) -> Result<FeatureCollection, CodecError> {
    let mut head = [0u8; 512];
    let n = File::open(path)?.read(&mut head)?;

    match sniff(&head[..n]) {
        Some(Sniffed::GeoJson) => {
            debug!(path = %path.display(), "Content sniffed as GeoJSON");
            geojson::decode(path)
        }
        Some(Sniffed::Shapefile) => {
            debug!(path = %path.display(), "Content sniffed as Shapefile");
            shapefile::decode(path)
        }
        None => Err(CodecError::unrecognized(
            "vector",
            format!("{} is neither GeoJSON nor Shapefile", path.display()),
        )),
    }
}

/// Écrit en GeoJSON ou Shapefile selon l'extension de destination
pub fn encode(fc: &FeatureCollection, path: &Path) -> Result<(), CodecError> {
    match extension_of(path).as_str() {
        "geojson" | "json" => geojson::encode(fc, path),
        "shp" => shapefile::encode(fc, path),
        other => Err(CodecError::unrecognized(
            "vector",
            format!("no vector driver for extension '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bln::{Crs, Feature};
    use geo::{Geometry, Point};

    fn point() -> FeatureCollection {
        FeatureCollection::single(Feature::new(
            Geometry::Point(Point::new(2.35, 48.85)),
            Crs::WGS84,
        ))
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff(b"  \n{\"type\":"), Some(Sniffed::GeoJson));
        assert_eq!(sniff(b"\xEF\xBB\xBF{}"), Some(Sniffed::GeoJson));
        assert_eq!(sniff(&[0, 0, 0x27, 0x0A, 0, 0]), Some(Sniffed::Shapefile));
        assert_eq!(sniff(b"<?xml version=\"1.0\"?>"), None);
        assert_eq!(sniff(b""), None);
    }

    #[test]
    fn test_encode_dispatch() {
        let dir = tempfile::tempdir().unwrap();

        encode(&point(), &dir.path().join("p.json")).unwrap();
        encode(&point(), &dir.path().join("p.shp")).unwrap();
        assert!(dir.path().join("p.dbf").exists());

        assert!(matches!(
            encode(&point(), &dir.path().join("p.txt")),
            Err(CodecError::Unrecognized { .. })
        ));
    }

    #[test]
    fn test_decode_by_content() {
        let dir = tempfile::tempdir().unwrap();
        // Extension trompeuse: seul le contenu compte
        let path = dir.path().join("p.data");
        geojson::encode(&point(), &path).unwrap();
        assert_eq!(decode(&path).unwrap().len(), 1);

        let shp = dir.path().join("p.shp");
        shapefile::encode(&point(), &shp).unwrap();
        assert!(matches!(decode(&shp).unwrap().features[0].geometry, Geometry::Point(_)));

        let txt = dir.path().join("p.txt");
        std::fs::write(&txt, "hello").unwrap();
        assert!(decode(&txt).is_err());
    }
}

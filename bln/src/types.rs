//! Types de données pour le crate bln

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use geo::{Coord, Geometry};

/// Sommet lu dans un fichier BLN, dans l'ordre du fichier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Coord {
    fn from(p: Point) -> Self {
        Coord { x: p.x, y: p.y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Valeur scalaire d'un attribut
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Système de coordonnées, identifié par son code EPSG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    pub epsg: u32,
}

impl Crs {
    /// WGS 84, le seul CRS implicite du format BLN
    pub const WGS84: Crs = Crs { epsg: 4326 };

    pub const fn epsg(epsg: u32) -> Self {
        Self { epsg }
    }

    /// Forme URN utilisée par les membres `crs` GeoJSON
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = String;

    /// Accepte `EPSG:4326`, `urn:ogc:def:crs:EPSG::4326` et `OGC:CRS84`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("OGC:CRS84") || s.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84")
        {
            return Ok(Self::WGS84);
        }

        let code = s
            .rsplit(':')
            .next()
            .filter(|_| s.to_ascii_uppercase().contains("EPSG"))
            .ok_or_else(|| format!("Unrecognized CRS: {s}"))?;

        code.parse::<u32>()
            .map(Self::epsg)
            .map_err(|_| format!("Unrecognized CRS: {s}"))
    }
}

/// Une feature avec sa géométrie, ses attributs et son CRS
#[derive(Debug, Clone)]
pub struct Feature {
    /// Géométrie (Polygon pour les sources BLN, MultiPolygon après réparation)
    pub geometry: Geometry,

    /// Attributs de la feature (clé -> valeur), ordre stable
    pub properties: BTreeMap<String, Value>,

    /// CRS de la géométrie
    pub crs: Crs,
}

impl Feature {
    pub fn new(geometry: Geometry, crs: Crs) -> Self {
        Self {
            geometry,
            properties: BTreeMap::new(),
            crs,
        }
    }

    /// Ajoute un attribut (builder)
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Collection de features partageant un même CRS
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Crs,
}

impl FeatureCollection {
    pub fn new(crs: Crs) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    /// Collection à une seule feature (cas de toute source BLN)
    pub fn single(feature: Feature) -> Self {
        let crs = feature.crs;
        Self {
            features: vec![feature],
            crs,
        }
    }

    pub fn push(&mut self, mut feature: Feature) {
        feature.crs = self.crs;
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

//! Registre des formats: extension -> descripteur de capacités
//!
//! Les formats intégrés sont une énumération fermée (`FormatKind`); chacun
//! produit un `FormatDescriptor` qui porte ses fonctions de lecture et
//! d'écriture. Le registre global est rempli au premier accès et peut être
//! étendu avant toute conversion concurrente.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard};

use bln::FeatureCollection;

use crate::codec;
use crate::error::{CodecError, FormatError, Operation};

/// Fonction de lecture d'un format
pub type DecodeFn = fn(&Path) -> Result<FeatureCollection, CodecError>;

/// Fonction d'écriture d'un format
pub type EncodeFn = fn(&FeatureCollection, &Path) -> Result<(), CodecError>;

/// Description d'un format et de ses capacités
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    /// Nom lisible (ex: "GeoJSON")
    pub name: String,

    /// Extensions sans point, en minuscules
    pub extensions: Vec<String>,

    /// Lecture, absente pour les formats en écriture seule
    pub decode: Option<DecodeFn>,

    /// Écriture, absente pour les formats en lecture seule
    pub encode: Option<EncodeFn>,

    pub description: String,
}

impl FormatDescriptor {
    pub fn new(name: impl Into<String>, extensions: &[&str]) -> Self {
        Self {
            name: name.into(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            decode: None,
            encode: None,
            description: String::new(),
        }
    }

    pub fn with_decode(mut self, decode: DecodeFn) -> Self {
        self.decode = Some(decode);
        self
    }

    pub fn with_encode(mut self, encode: EncodeFn) -> Self {
        self.encode = Some(encode);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn can_decode(&self) -> bool {
        self.decode.is_some()
    }

    pub fn can_encode(&self) -> bool {
        self.encode.is_some()
    }
}

/// Formats intégrés
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Bln,
    Shapefile,
    GeoJson,
    GeoPackage,
    #[cfg(feature = "kml")]
    Kml,
    Svg,
}

impl FormatKind {
    /// Formats compilés, dans l'ordre d'enregistrement
    pub const ALL: &'static [FormatKind] = &[
        FormatKind::Bln,
        FormatKind::Shapefile,
        FormatKind::GeoJson,
        FormatKind::Svg,
        FormatKind::GeoPackage,
        #[cfg(feature = "kml")]
        FormatKind::Kml,
    ];

    /// Descripteur du format intégré
    pub fn descriptor(self) -> FormatDescriptor {
        match self {
            Self::Bln => FormatDescriptor::new("BLN", &["bln"])
                .with_decode(codec::bln::decode)
                .with_description("Golden Software BLN polygon file (read-only)"),
            Self::Shapefile => FormatDescriptor::new("Shapefile", &["shp"])
                .with_decode(codec::vector::decode)
                .with_encode(codec::vector::encode)
                .with_description("ESRI Shapefile with .shp, .shx, .dbf components"),
            Self::GeoJson => FormatDescriptor::new("GeoJSON", &["geojson", "json"])
                .with_decode(codec::vector::decode)
                .with_encode(codec::vector::encode)
                .with_description("RFC 7946 GeoJSON feature collection"),
            Self::GeoPackage => FormatDescriptor::new("GeoPackage", &["gpkg"])
                .with_decode(codec::gpkg::decode)
                .with_encode(codec::gpkg::encode)
                .with_description("OGC GeoPackage (SQLite-based, single layer)"),
            #[cfg(feature = "kml")]
            Self::Kml => FormatDescriptor::new("KML", &["kml", "kmz"])
                .with_decode(codec::kml::decode)
                .with_encode(codec::kml::encode)
                .with_description("Keyhole Markup Language (Google Earth format)"),
            Self::Svg => FormatDescriptor::new("SVG", &["svg"])
                .with_encode(codec::svg::encode)
                .with_description("Scalable Vector Graphics 2D projection (write-only)"),
        }
    }
}

/// Extensions de formats intégrés retirés à la compilation, avec leur feature
const GATED_EXTENSIONS: &[(&str, &str)] = &[
    #[cfg(not(feature = "kml"))]
    ("kml", "kml"),
    #[cfg(not(feature = "kml"))]
    ("kmz", "kml"),
];

/// Normalise une extension: minuscules, sans point initial
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Table extension -> descripteur
#[derive(Debug, Clone, Default)]
pub struct Registry {
    formats: HashMap<String, Arc<FormatDescriptor>>,
    // Ordre d'enregistrement, pour un `list` déterministe
    history: Vec<Arc<FormatDescriptor>>,
}

impl Registry {
    /// Registre vide
    pub fn new() -> Self {
        Self::default()
    }

    /// Registre contenant tous les formats intégrés compilés
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in FormatKind::ALL {
            registry.register(kind.descriptor());
        }
        registry
    }

    /// Enregistre un descripteur pour chacune de ses extensions
    ///
    /// Le dernier enregistrement d'une extension l'emporte.
    pub fn register(&mut self, descriptor: FormatDescriptor) {
        let descriptor = Arc::new(descriptor);
        for extension in &descriptor.extensions {
            self.formats
                .insert(normalize_extension(extension), Arc::clone(&descriptor));
        }
        self.history.push(descriptor);
    }

    /// Résout une extension (`"GeoJSON"`, `".geojson"` ...)
    pub fn resolve(&self, extension: &str) -> Result<Arc<FormatDescriptor>, FormatError> {
        let extension = normalize_extension(extension);

        if let Some(descriptor) = self.formats.get(&extension) {
            return Ok(Arc::clone(descriptor));
        }

        match GATED_EXTENSIONS.iter().find(|(ext, _)| *ext == extension) {
            Some(&(_, feature)) => Err(FormatError::CapabilityUnavailable { extension, feature }),
            // Une extension inconnue n'offre aucune opération
            None => Err(FormatError::unsupported(extension, Operation::Decode)),
        }
    }

    /// Résout le format d'un chemin d'après son extension
    pub fn resolve_path(&self, path: &Path) -> Result<Arc<FormatDescriptor>, FormatError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.resolve(extension)
    }

    /// Fonction de lecture pour une extension
    pub fn decoder(&self, extension: &str) -> Result<DecodeFn, FormatError> {
        self.resolve_for(extension, Operation::Decode)?
            .decode
            .ok_or_else(|| FormatError::unsupported(normalize_extension(extension), Operation::Decode))
    }

    /// Fonction d'écriture pour une extension
    pub fn encoder(&self, extension: &str) -> Result<EncodeFn, FormatError> {
        self.resolve_for(extension, Operation::Encode)?
            .encode
            .ok_or_else(|| FormatError::unsupported(normalize_extension(extension), Operation::Encode))
    }

    /// `resolve`, l'erreur d'extension inconnue portant l'opération demandée
    fn resolve_for(
        &self,
        extension: &str,
        operation: Operation,
    ) -> Result<Arc<FormatDescriptor>, FormatError> {
        self.resolve(extension).map_err(|e| match e {
            FormatError::Unsupported { extension, .. } => FormatError::unsupported(extension, operation),
            other => other,
        })
    }

    /// Descripteurs uniques (par nom), triés par nom
    ///
    /// À nom égal, le dernier enregistré encore résolu par une extension l'emporte.
    pub fn list(&self) -> Vec<Arc<FormatDescriptor>> {
        let mut descriptors: Vec<Arc<FormatDescriptor>> = Vec::new();
        for descriptor in self.history.iter().rev() {
            let resolved = self.formats.values().any(|d| Arc::ptr_eq(d, descriptor));
            let shadowed = descriptors.iter().any(|d| d.name == descriptor.name);
            if resolved && !shadowed {
                descriptors.push(Arc::clone(descriptor));
            }
        }

        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Extensions enregistrées, triées
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

static GLOBAL: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::with_builtins()));

/// Registre global (lecture)
pub fn global() -> RwLockReadGuard<'static, Registry> {
    GLOBAL.read().unwrap_or_else(PoisonError::into_inner)
}

/// Enregistre un format dans le registre global
///
/// À appeler au démarrage, avant toute conversion concurrente.
pub fn register_format(descriptor: FormatDescriptor) {
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(descriptor);
}

/// Liste les formats du registre global
pub fn list_formats() -> Vec<Arc<FormatDescriptor>> {
    global().list()
}

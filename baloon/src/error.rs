//! Types d'erreurs pour le crate baloon

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Capacité demandée à un format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Decode,
    Encode,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => f.write_str("read"),
            Self::Encode => f.write_str("write"),
        }
    }
}

/// Erreurs de résolution dans le registre des formats
#[derive(Debug, Error)]
pub enum FormatError {
    /// Extension inconnue, ou opération non proposée par le format
    #[error("Unsupported format '{extension}': no {operation} support")]
    Unsupported {
        extension: String,
        operation: Operation,
    },

    /// Format intégré dont la feature cargo n'est pas compilée
    #[error("Format '{extension}' is unavailable: rebuild with the '{feature}' feature")]
    CapabilityUnavailable {
        extension: String,
        feature: &'static str,
    },
}

impl FormatError {
    pub fn unsupported(extension: impl Into<String>, operation: Operation) -> Self {
        Self::Unsupported {
            extension: extension.into(),
            operation,
        }
    }
}

/// Erreurs des codecs (lecture et écriture)
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] bln::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Geometry encoding error: {0}")]
    Geozero(#[from] geozero::error::GeozeroError),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("XML error: {0}")]
    Xml(String),

    /// Type de géométrie que le format ne sait pas représenter
    #[error("Unsupported geometry type {kind} for {format}")]
    UnsupportedGeometry {
        kind: &'static str,
        format: &'static str,
    },

    /// Contenu non reconnu par le codec
    #[error("Unrecognized {format} content: {reason}")]
    Unrecognized {
        format: &'static str,
        reason: String,
    },

    /// Rien à écrire
    #[error("Nothing to write: {0}")]
    Empty(String),
}

impl CodecError {
    pub fn unrecognized(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Unrecognized {
            format,
            reason: reason.into(),
        }
    }
}

/// Erreur d'écriture
pub type EncodeError = CodecError;

/// Erreur de lecture
pub type DecodeError = CodecError;

/// Erreurs de conversion d'un fichier source
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] bln::ParseError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Codec(CodecError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<CodecError> for ConvertError {
    fn from(e: CodecError) -> Self {
        // Les erreurs BLN restent visibles comme erreurs de parsing
        match e {
            CodecError::Parse(parse) => Self::Parse(parse),
            other => Self::Codec(other),
        }
    }
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Erreurs d'une conversion par lot (avant toute conversion de fichier)
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message() {
        let e = FormatError::unsupported("badformat", Operation::Encode);
        assert_eq!(
            e.to_string(),
            "Unsupported format 'badformat': no write support"
        );
    }

    #[test]
    fn test_parse_error_is_lifted() {
        let codec = CodecError::Parse(bln::ParseError::InsufficientPoints { found: 2 });
        let convert: ConvertError = codec.into();
        assert!(matches!(
            convert,
            ConvertError::Parse(bln::ParseError::InsufficientPoints { found: 2 })
        ));
    }
}

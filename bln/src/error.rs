//! Types d'erreurs pour le crate bln

use thiserror::Error;

/// Erreurs pouvant survenir lors du parsing BLN
#[derive(Debug, Error)]
pub enum ParseError {
    /// Erreur d'I/O lors de la lecture du fichier source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Moins de 3 lignes de coordonnées exploitables
    #[error("Not enough coordinate lines (found {found}, need at least 3)")]
    InsufficientPoints { found: usize },
}

impl ParseError {
    /// Nombre de points trouvés, si l'erreur vient du contrôle du minimum
    pub fn found_points(&self) -> Option<usize> {
        match self {
            Self::InsufficientPoints { found } => Some(*found),
            Self::Io(_) => None,
        }
    }
}

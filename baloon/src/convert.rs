//! Orchestration d'une conversion: source -> registre -> codecs cibles
//!
//! La source est lue une seule fois; chaque cible est écrite
//! indépendamment et son résultat rapporté à part.

use std::path::{Path, PathBuf};
use std::time::Instant;

use bln::FeatureCollection;
use tracing::{info, warn};

use crate::error::ConvertError;
use crate::registry::{self, normalize_extension, Registry};

/// Résultat de l'écriture d'une cible
#[derive(Debug)]
pub struct TargetOutcome {
    /// Extension normalisée de la cible
    pub extension: String,

    /// Fichier de sortie (prévu, même en cas d'échec)
    pub output: PathBuf,

    pub result: Result<(), ConvertError>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Chemin de sortie `<dir>/<stem>.<ext>`, dossier de la source par défaut
pub fn output_path(source: &Path, extension: &str, output_dir: Option<&Path>) -> PathBuf {
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let stem = source.file_stem().unwrap_or(source.as_os_str());

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(extension);
    dir.join(file_name)
}

/// Convertisseur lié à un registre
#[derive(Debug, Clone, Copy)]
pub struct Converter<'r> {
    registry: &'r Registry,
}

impl<'r> Converter<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Lit une source avec le codec de son extension
    pub fn load(&self, source: &Path) -> Result<FeatureCollection, ConvertError> {
        if !source.exists() {
            return Err(ConvertError::io(
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source file not found"),
            ));
        }

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let decode = self.registry.decoder(extension)?;

        Ok(decode(source)?)
    }

    /// Écrit une collection vers une extension cible
    pub fn write(
        &self,
        fc: &FeatureCollection,
        extension: &str,
        output: &Path,
    ) -> Result<(), ConvertError> {
        let encode = self.registry.encoder(extension)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
        }

        Ok(encode(fc, output)?)
    }

    /// Convertit une source vers plusieurs formats
    ///
    /// Seul l'échec de lecture de la source est une erreur; les échecs par
    /// cible sont rapportés dans les `TargetOutcome`.
    pub fn convert<S: AsRef<str>>(
        &self,
        source: &Path,
        targets: &[S],
        output_dir: Option<&Path>,
    ) -> Result<Vec<TargetOutcome>, ConvertError> {
        let start = Instant::now();
        let fc = self.load(source)?;

        let outcomes: Vec<TargetOutcome> = targets
            .iter()
            .map(|target| {
                let extension = normalize_extension(target.as_ref());
                let output = output_path(source, &extension, output_dir);
                let result = self.write(&fc, &extension, &output);

                match &result {
                    Ok(()) => info!(
                        source = %source.display(),
                        output = %output.display(),
                        "Converted"
                    ),
                    Err(e) => warn!(
                        source = %source.display(),
                        target = %extension,
                        error = %e,
                        "Conversion failed"
                    ),
                }

                TargetOutcome {
                    extension,
                    output,
                    result,
                }
            })
            .collect();

        info!(
            source = %source.display(),
            targets = outcomes.len(),
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Source processed"
        );

        Ok(outcomes)
    }

    /// Convertit vers un fichier précis, format déduit de son extension
    pub fn convert_file(&self, source: &Path, output: &Path) -> Result<(), ConvertError> {
        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let fc = self.load(source)?;
        self.write(&fc, extension, output)
    }
}

/// `Converter::load` sur le registre global
pub fn load(source: &Path) -> Result<FeatureCollection, ConvertError> {
    Converter::new(&registry::global()).load(source)
}

/// `Converter::convert` sur le registre global
pub fn convert<S: AsRef<str>>(
    source: &Path,
    targets: &[S],
    output_dir: Option<&Path>,
) -> Result<Vec<TargetOutcome>, ConvertError> {
    Converter::new(&registry::global()).convert(source, targets, output_dir)
}

/// `Converter::convert_file` sur le registre global
pub fn convert_file(source: &Path, output: &Path) -> Result<(), ConvertError> {
    Converter::new(&registry::global()).convert_file(source, output)
}

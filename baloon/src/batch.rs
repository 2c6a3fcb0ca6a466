//! Conversion par lot d'une arborescence de fichiers BLN
//!
//! Un fichier par tâche rayon; l'échec d'un fichier n'interrompt pas le lot.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::convert::{Converter, TargetOutcome};
use crate::error::{BatchError, ConvertError};
use crate::registry;
use crate::report::ConversionReport;

/// Extension des sources cherchées
const SOURCE_EXTENSION: &str = "bln";

/// Collecte récursivement les fichiers `.bln` (extension insensible à la casse), triés
pub fn collect_sources(path: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut sources = Vec::new();
    let mut pending = vec![path.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|source| BatchError::Scan {
            path: dir.clone(),
            source,
        })?;

        for entry in entries {
            let scan_error = |source| BatchError::Scan {
                path: dir.clone(),
                source,
            };
            let entry = entry.map_err(scan_error)?;
            let entry_path = entry.path();

            // Les liens symboliques vers des dossiers ne sont pas suivis
            if entry.file_type().map_err(scan_error)?.is_dir() {
                pending.push(entry_path);
            } else if entry_path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
            {
                sources.push(entry_path);
            }
        }
    }

    sources.sort();
    Ok(sources)
}

/// Dossier de sortie d'une source: même chemin relatif sous `output_dir`
pub fn output_dir_for(root: &Path, source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let source_dir = source.parent().unwrap_or(root);
    match output_dir {
        Some(out) => {
            let relative = source_dir.strip_prefix(root).unwrap_or(Path::new(""));
            out.join(relative)
        }
        None => source_dir.to_path_buf(),
    }
}

/// Convertit toute l'arborescence avec le registre global
pub fn convert_tree<S: AsRef<str> + Sync>(
    dir: &Path,
    targets: &[S],
    output_dir: Option<&Path>,
    jobs: Option<usize>,
) -> Result<ConversionReport, BatchError> {
    let registry = registry::global();
    convert_tree_with(Converter::new(&registry), dir, targets, output_dir, jobs)
}

/// Convertit toute l'arborescence avec un convertisseur donné
///
/// `jobs` borne le nombre de threads; sinon le pool global rayon est utilisé.
pub fn convert_tree_with<S: AsRef<str> + Sync>(
    converter: Converter<'_>,
    dir: &Path,
    targets: &[S],
    output_dir: Option<&Path>,
    jobs: Option<usize>,
) -> Result<ConversionReport, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::NotADirectory(dir.to_path_buf()));
    }

    let start = Instant::now();
    let sources = collect_sources(dir)?;
    info!(dir = %dir.display(), files = sources.len(), jobs = ?jobs, "Starting batch conversion");

    let convert_one = |source: &PathBuf| -> (PathBuf, Result<Vec<TargetOutcome>, ConvertError>) {
        let out = output_dir_for(dir, source, output_dir);
        let result = converter.convert(source, targets, Some(&out));
        if let Err(ref e) = result {
            warn!(source = %source.display(), error = %e, "Failed to convert");
        }
        (source.clone(), result)
    };

    let results: Vec<_> = match jobs {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n.max(1))
            .build()?
            .install(|| sources.par_iter().map(convert_one).collect()),
        None => sources.par_iter().map(convert_one).collect(),
    };

    let mut report = ConversionReport::new(dir);
    for (source, result) in results {
        match result {
            Ok(outcomes) => report.record_targets(&source, &outcomes),
            Err(e) => report.record_failure(&source, &e.to_string()),
        }
    }
    report.set_duration(start.elapsed());
    report.finalize();

    info!(
        converted = report.files_converted,
        failed = report.files_failed,
        "Batch conversion complete"
    );

    Ok(report)
}

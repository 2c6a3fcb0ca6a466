//! Rapport de conversion par lot
//!
//! Collecte le résultat de chaque fichier et de chaque cible, sans jamais
//! interrompre le lot sur une erreur.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::convert::TargetOutcome;

/// Statut global du lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversionStatus {
    /// Tous les fichiers convertis
    Success,
    /// Une partie des fichiers en erreur
    PartialSuccess,
    /// Aucun fichier converti
    Failed,
}

/// Résultat d'une cible pour un fichier
#[derive(Debug, Clone, Serialize)]
pub struct TargetRecord {
    pub extension: String,
    pub output: PathBuf,
    /// Message d'erreur, absent si la cible a été écrite
    pub error: Option<String>,
}

impl From<&TargetOutcome> for TargetRecord {
    fn from(outcome: &TargetOutcome) -> Self {
        Self {
            extension: outcome.extension.clone(),
            output: outcome.output.clone(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Résultat d'un fichier source
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub source: PathBuf,
    /// Erreur de lecture de la source (aucune cible tentée)
    pub error: Option<String>,
    pub targets: Vec<TargetRecord>,
}

impl FileRecord {
    /// Source lue et toutes les cibles écrites
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.targets.iter().all(|t| t.error.is_none())
    }
}

/// Statistiques par format cible
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormatStats {
    pub written: usize,
    pub failed: usize,
}

/// Rapport complet de conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    /// Dossier source du lot
    pub root: PathBuf,
    /// Durée de la conversion
    pub duration_secs: f64,
    /// Statut global
    pub status: ConversionStatus,

    /// Nombre de fichiers BLN trouvés
    pub files_found: usize,
    /// Nombre de fichiers entièrement convertis
    pub files_converted: usize,
    /// Nombre de fichiers en erreur
    pub files_failed: usize,

    /// Statistiques par extension cible
    pub by_format: BTreeMap<String, FormatStats>,

    /// Détail par fichier, dans l'ordre des sources
    pub files: Vec<FileRecord>,
}

impl ConversionReport {
    /// Crée un rapport pour un dossier source
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            duration_secs: 0.0,
            status: ConversionStatus::Success,
            files_found: 0,
            files_converted: 0,
            files_failed: 0,
            by_format: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    /// Enregistre les cibles d'un fichier lu avec succès
    pub fn record_targets(&mut self, source: &Path, outcomes: &[TargetOutcome]) {
        let targets: Vec<TargetRecord> = outcomes.iter().map(TargetRecord::from).collect();
        for target in &targets {
            let stats = self.by_format.entry(target.extension.clone()).or_default();
            if target.error.is_some() {
                stats.failed += 1;
            } else {
                stats.written += 1;
            }
        }
        self.push(FileRecord {
            source: source.to_path_buf(),
            error: None,
            targets,
        });
    }

    /// Enregistre un fichier dont la lecture a échoué
    pub fn record_failure(&mut self, source: &Path, message: &str) {
        self.push(FileRecord {
            source: source.to_path_buf(),
            error: Some(message.to_string()),
            targets: Vec::new(),
        });
    }

    fn push(&mut self, record: FileRecord) {
        self.files_found += 1;
        if record.is_success() {
            self.files_converted += 1;
        } else {
            self.files_failed += 1;
        }
        self.files.push(record);
    }

    /// Définit la durée de la conversion
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final et trie les fichiers par chemin
    pub fn finalize(&mut self) {
        self.files.sort_by(|a, b| a.source.cmp(&b.source));

        self.status = if self.files_failed == 0 {
            ConversionStatus::Success
        } else if self.files_converted > 0 {
            ConversionStatus::PartialSuccess
        } else {
            ConversionStatus::Failed
        };
    }

    /// Fichiers en erreur (lecture ou au moins une cible)
    pub fn failures(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|f| !f.is_success())
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("CONVERSION REPORT - {}", self.root.display());
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Files: {} found, {} converted, {} failed",
            self.files_found, self.files_converted, self.files_failed
        );

        if !self.by_format.is_empty() {
            println!("\n--- BY FORMAT ---");
            for (extension, stats) in &self.by_format {
                println!(
                    "  {}: {} written, {} failed",
                    extension, stats.written, stats.failed
                );
            }
        }

        let failures: Vec<&FileRecord> = self.failures().collect();
        if !failures.is_empty() {
            println!("\n--- ERRORS ({}) ---", failures.len());
            for file in failures.iter().take(20) {
                if let Some(ref error) = file.error {
                    println!("  [{}] {}", file.source.display(), error);
                }
                for target in &file.targets {
                    if let Some(ref error) = target.error {
                        println!("  [{}:{}] {}", file.source.display(), target.extension, error);
                    }
                }
            }
            if failures.len() > 20 {
                println!("  ... and {} more", failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "Converted {}/{} files",
            self.files_converted, self.files_found
        )
    }
}

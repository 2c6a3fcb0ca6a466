//! # baloon
//!
//! Conversion de contours BLN vers les formats vectoriels courants.
//!
//! ## Features
//!
//! - Registre de formats extensible (extension -> lecture/écriture)
//! - GeoJSON, Shapefile, GeoPackage, SVG; KML avec la feature `kml`
//! - Conversion multi-cibles avec résultat par cible
//! - Conversion par lot parallèle (rayon) avec rapport JSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Un fichier vers GeoJSON et Shapefile
//! baloon convert contour.bln --to geojson --to shp
//!
//! # Toute une arborescence vers GeoPackage
//! baloon batch ./contours/ --to gpkg --out ./gpkg/ --report report.json
//! ```
//!
//! ## Usage bibliothèque
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let outcomes = baloon::convert(Path::new("contour.bln"), &["geojson", "svg"], None)?;
//! for outcome in &outcomes {
//!     println!("{}: {:?}", outcome.extension, outcome.result);
//! }
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod registry;
pub mod report;

pub use config::Config;
pub use convert::{convert, convert_file, load, Converter, TargetOutcome};
pub use error::{
    BatchError, CodecError, ConvertError, DecodeError, EncodeError, FormatError, Operation,
};
pub use registry::{register_format, FormatDescriptor, FormatKind, Registry};
pub use report::{ConversionReport, ConversionStatus};

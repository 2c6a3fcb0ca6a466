//! Parser pour les fichiers BLN (Golden Software / Surfer)
//!
//! Format: une paire `x,y` par ligne, séparée par virgule ou tabulation.
//! Les lignes d'en-tête non numériques sont ignorées.

use std::path::Path;

use tracing::debug;

use crate::reader;
use crate::types::Point;
use crate::ParseError;

/// Nombre minimal de sommets pour former un polygone
pub const MIN_POINTS: usize = 3;

/// Parse un fichier BLN depuis le disque
pub fn parse_path(path: &Path) -> Result<Vec<Point>, ParseError> {
    let data = std::fs::read(path)?;
    let points = parse_bytes(&data);
    if let Err(ParseError::InsufficientPoints { found }) = &points {
        debug!(path = %path.display(), found, "Not enough coordinate lines");
    }
    points
}

/// Parse un contenu BLN brut (encodage tolérant)
pub fn parse_bytes(data: &[u8]) -> Result<Vec<Point>, ParseError> {
    parse_str(&reader::decode(data))
}

/// Parse un contenu BLN déjà décodé
pub fn parse_str(content: &str) -> Result<Vec<Point>, ParseError> {
    let points: Vec<Point> = reader::lines(content)
        .filter_map(|line| {
            let point = parse_line(line);
            if point.is_none() {
                debug!(line, "Skipping non-numeric line");
            }
            point
        })
        .collect();

    if points.len() < MIN_POINTS {
        return Err(ParseError::InsufficientPoints {
            found: points.len(),
        });
    }

    Ok(points)
}

/// Parse une ligne `x,y[,...]`
///
/// Retourne `None` pour les lignes à moins de deux champs ou dont les deux
/// premiers champs ne sont pas des nombres.
pub fn parse_line(line: &str) -> Option<Point> {
    // La tabulation vaut une virgule, les champs vides sont ignorés
    let mut fields = line
        .split(|c| c == ',' || c == '\t')
        .filter(|field| !field.is_empty());

    let x = fields.next()?;
    let y = fields.next()?;

    Some(Point::new(parse_f64(x)?, parse_f64(y)?))
}

/// Parse f64 via fast-float, espaces autour du nombre tolérés
///
/// `nan` et `inf` ne sont pas des coordonnées: la ligne est ignorée.
#[inline]
fn parse_f64(s: &str) -> Option<f64> {
    fast_float::parse(s.trim()).ok().filter(|v: &f64| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let points = parse_str("-43.1,-22.9\n-43.2,-22.9\n-43.2,-22.8\n-43.1,-22.8\n").unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], Point::new(-43.1, -22.9));
    }

    #[test]
    fn test_parse_line_tab_separated() {
        assert_eq!(parse_line("1.5\t2.5"), Some(Point::new(1.5, 2.5)));
        assert_eq!(parse_line("1.5,\t2.5"), Some(Point::new(1.5, 2.5)));
    }

    #[test]
    fn test_parse_line_extra_columns_and_spaces() {
        assert_eq!(parse_line(" 10 , 20 ,0"), Some(Point::new(10.0, 20.0)));
        assert_eq!(parse_line("1e3,-2.5E-1"), Some(Point::new(1000.0, -0.25)));
    }

    #[test]
    fn test_parse_line_rejects_non_numeric() {
        assert_eq!(parse_line("\"Boundary\",1"), None);
        assert_eq!(parse_line("12"), None);
        assert_eq!(parse_line(",,,5"), None);
        assert_eq!(parse_line("1.0 2.0"), None);
    }

    #[test]
    fn test_header_lines_skipped() {
        let content = "\"name\"\n0,0\n1,0\nabc,def\n1,1\n";
        let points = parse_str(content).unwrap();
        assert_eq!(
            points,
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)]
        );
    }

    #[test]
    fn test_numeric_count_header_is_a_point() {
        // Comportement permissif: un en-tête "5,1" est numérique
        let points = parse_str("5,1\n0,0\n1,0\n1,1\n").unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], Point::new(5.0, 1.0));
    }

    #[test]
    fn test_duplicates_preserved() {
        let points = parse_str("0,0\n0,0\n1,0\n1,1\n").unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], points[1]);
    }

    #[test]
    fn test_two_points_fail() {
        match parse_str("10,10\n11,11\n") {
            Err(ParseError::InsufficientPoints { found }) => assert_eq!(found, 2),
            other => panic!("Expected InsufficientPoints, got {:?}", other),
        }
    }

    #[test]
    fn test_three_points_succeed() {
        assert_eq!(parse_str("0,0\n1,0\n1,1\n").unwrap().len(), 3);
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(
            parse_str(""),
            Err(ParseError::InsufficientPoints { found: 0 })
        ));
    }

    #[test]
    fn test_parse_bytes_with_invalid_utf8() {
        let points = parse_bytes(b"0,0\n1\xFF,0\n1,1\n").unwrap();
        assert_eq!(points[1], Point::new(1.0, 0.0));
    }

    #[test]
    fn test_non_finite_lines_skipped() {
        assert_eq!(parse_line("nan,0"), None);
        assert_eq!(parse_line("1,inf"), None);
        assert_eq!(parse_line("-infinity,2"), None);

        let points = parse_str("nan,0\n1,0\n1,1\n0,1\n").unwrap();
        assert_eq!(
            points,
            vec![Point::new(1.0, 0.0), Point::new(1.0, 1.0), Point::new(0.0, 1.0)]
        );

        assert!(matches!(
            parse_str("inf,0\n1,0\nNaN,1\n0,1\n"),
            Err(ParseError::InsufficientPoints { found: 2 })
        ));
    }

    #[test]
    fn test_extreme_magnitudes_kept() {
        let points = parse_str("1e300,-1e300\n-1e300,0\n0,1e-300\n").unwrap();
        assert_eq!(points[0], Point::new(1e300, -1e300));
        assert_eq!(points[2], Point::new(0.0, 1e-300));
    }
}

//! Lecture tolérante des lignes d'un fichier BLN
//!
//! Les exports BLN historiques sont souvent mal encodés: les octets invalides
//! sont ignorés plutôt que de faire échouer la lecture.

use std::borrow::Cow;

use memchr::memchr2_iter;

/// Décode les bytes en UTF-8 sans jamais échouer
///
/// Chemin rapide via `simdutf8`, sinon décodage avec pertes via `encoding_rs`
/// puis suppression des caractères de remplacement (les octets invalides
/// disparaissent au lieu de couper un nombre en deux).
pub fn decode(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    if let Ok(text) = simdutf8::basic::from_utf8(data) {
        return Cow::Borrowed(text);
    }

    let (decoded, _) = encoding_rs::UTF_8.decode_without_bom_handling(data);
    Cow::Owned(decoded.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect())
}

/// Itère sur les lignes non vides et nettoyées d'un texte
///
/// `\n`, `\r\n` et `\r` seul terminent une ligne.
pub fn lines(text: &str) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    let mut start = 0;

    memchr2_iter(b'\n', b'\r', bytes)
        .chain(std::iter::once(bytes.len()))
        .filter_map(move |end| {
            // Les séparateurs sont ASCII: les bornes tombent toujours sur un char
            let line = text[start..end].trim();
            start = end + 1;
            (!line.is_empty()).then_some(line)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_utf8_is_borrowed() {
        let decoded = decode(b"1.5,2.5\n");
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded, "1.5,2.5\n");
    }

    #[test]
    fn test_decode_drops_invalid_bytes() {
        let decoded = decode(b"1\xFF.5,2.5");
        assert_eq!(decoded, "1.5,2.5");
    }

    #[test]
    fn test_decode_strips_bom() {
        assert_eq!(decode(b"\xEF\xBB\xBF0,0"), "0,0");
    }

    #[test]
    fn test_lines_skips_blank_and_trims() {
        let collected: Vec<&str> = lines("  a  \n\n\t\nb\r\nc\rd").collect();
        assert_eq!(collected, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_lines_empty_input() {
        assert_eq!(lines("").count(), 0);
        assert_eq!(lines("\n\r\n").count(), 0);
    }
}

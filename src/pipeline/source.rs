use std::fs;
use std::path::Path;

use encoding_rs::Encoding;
use tracing::debug;

use crate::pipeline::errors::PipelineError;

pub fn read_input(path: &Path) -> Result<String, PipelineError> {
    let bytes = fs::read(path)?;
    decode_input(&bytes)
}

/// Decodes an export to UTF-8: byte order mark first, then strict UTF-8,
/// then a statistical guess.
pub fn decode_input(bytes: &[u8]) -> Result<String, PipelineError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        debug!(encoding = encoding.name(), "byte order mark found");
        return decode_with(encoding, &bytes[bom_len..]);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    debug!(encoding = encoding.name(), "guessed input encoding");

    decode_with(encoding, bytes)
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, PipelineError> {
    let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);

    if had_errors {
        return Err(PipelineError::Charset(format!(
            "Failed to decode input with encoding: {}",
            encoding.name()
        )));
    }

    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8() {
        let text = "ID,post_title\n1,最初の記事\n";
        assert_eq!(decode_input(text.as_bytes()).unwrap(), text);
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("ID,post_title".as_bytes());
        assert_eq!(decode_input(&bytes).unwrap(), "ID,post_title");
    }

    #[test]
    fn test_utf16_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "記事".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_input(&bytes).unwrap(), "記事");
    }

    #[test]
    fn test_shift_jis_guessed() {
        let text = "これは映画のレビュー記事です。とても面白い作品でした。\n".repeat(10);
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(&text);
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(decode_input(&bytes).unwrap(), text);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode_input(b"").unwrap(), "");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_input(Path::new("/nonexistent/postclean/input.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}

//! Small helpers shared by the disk modules.

use crate::disk::geometry::MAX_FILENAME_SIZE;

/// Copy `value` into `dst` and fill the remainder with the filler
/// byte. Values longer than the destination are truncated.
pub(crate) fn write_padded(dst: &mut [u8], value: &[u8], filler: u8) {
    for (i, slot) in dst.iter_mut().enumerate() {
        *slot = if i < value.len() { value[i] } else { filler };
    }
}

/// Trim and normalize a filename to fit the restrictions of a
/// directory entry: lowercase, strip characters outside the allowed
/// set, map `.` and `..` to `dot` so extracted files cannot collide
/// with directory names, and cap the result at 16 characters.
pub fn normalize_filename(filename: &str) -> String {
    fn allowed(c: char) -> bool {
        matches!(c, '0'..='9' | 'a'..='z' | ' ' | '.' | '_' | '+' | '-' | '/' | '[' | ']')
    }

    let lowered = filename.to_lowercase();
    let kept: String = lowered.chars().filter(|&c| allowed(c)).collect();
    let name = kept.trim();
    if name == "." || name == ".." {
        return "dot".to_string();
    }
    if name.chars().count() > MAX_FILENAME_SIZE {
        let cut: String = name.chars().take(MAX_FILENAME_SIZE).collect();
        return cut.trim().to_string();
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_padded() {
        let mut buffer = [0u8; 8];
        write_padded(&mut buffer, b"ABC", 0xA0);
        assert_eq!(&buffer, &[0x41, 0x42, 0x43, 0xA0, 0xA0, 0xA0, 0xA0, 0xA0]);

        write_padded(&mut buffer, b"0123456789", 0xA0);
        assert_eq!(&buffer, b"01234567");
    }

    #[test]
    fn test_normalize_filename() {
        let cases: &[(&str, &str)] = &[
            ("", ""),
            ("filename", "filename"),
            ("File.Name", "file.name"),
            (" filename ", "filename"),
            ("\tfilename\t", "filename"),
            ("1234567890123456", "1234567890123456"),
            ("123^4567-8901#23,456", "1234567-89012345"),
            ("12345678901234567", "1234567890123456"),
            ("enforcer+6hi/[_]", "enforcer+6hi/[_]"),
            (".", "dot"),
            ("..", "dot"),
        ];
        for &(input, want) in cases {
            assert_eq!(normalize_filename(input), want, "normalize({:?})", input);
        }
    }
}

pub mod url_validator;

/// Alphabet of generated short codes: upper + lower ASCII letters and digits
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Longest code accepted anywhere (matches the column width)
pub const MAX_CODE_LENGTH: usize = 64;

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    iter::repeat_with(|| CODE_ALPHABET[rand::random_range(0..CODE_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// Whether `code` could have been produced by [`generate_random_code`]
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LENGTH
        && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Human readable size, one decimal place: `0B`, `512.0B`, `1.5KB`, `4.0GB`
pub fn format_file_size(size_bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if size_bytes == 0 {
        return "0B".to_string();
    }

    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", size, UNITS[unit])
}

/// Make a user supplied file name safe to use as a single path component
///
/// Keeps alphanumerics, spaces, `-`, `_` and `.`; strips leading/trailing
/// dots and spaces; caps the length at 200 bytes (keeping the extension).
pub fn sanitize_filename(name: &str) -> String {
    const MAX_LEN: usize = 200;

    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == ' ' || c == '.');

    if cleaned.is_empty() {
        return "file".to_string();
    }
    if cleaned.len() <= MAX_LEN {
        return cleaned.to_string();
    }

    let (stem, ext) = match cleaned.rfind('.') {
        Some(idx) if cleaned.len() - idx <= 16 => cleaned.split_at(idx),
        _ => (cleaned, ""),
    };
    let mut cut = MAX_LEN.saturating_sub(ext.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &stem[..cut], ext)
}

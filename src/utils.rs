// Utility helpers

/// Lower-cased `0x` + 40 hex form, or `None` when the input is not an EVM address.
pub fn normalize_address(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", hex_part.to_ascii_lowercase()))
}

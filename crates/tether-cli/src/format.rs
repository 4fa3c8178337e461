//! Human-readable output helpers.

/// Format bytes in human-readable format
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit_idx])
    }
}

/// Render up to `limit` bytes as space-separated hex, marking truncation
#[must_use]
pub fn hex_preview(bytes: &[u8], limit: usize) -> String {
    let shown: Vec<String> = bytes
        .iter()
        .take(limit)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    let mut preview = shown.join(" ");
    if bytes.len() > limit {
        preview.push_str(" ...");
    }
    preview
}

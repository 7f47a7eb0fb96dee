use std::time::Duration;

use crate::types::StreamVariant;

/// Format a byte count for display (e.g. "3.4 MB", "1.2 GB")
pub fn format_bytes(bytes: u64) -> String {
    let mb = bytes as f64 / 1_048_576.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if mb >= 1.0 {
        format!("{:.1} MB", mb)
    } else {
        format!("{:.0} KB", bytes as f64 / 1024.0)
    }
}

/// Format media length as H:MM:SS or M:SS
pub fn format_length(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Format elapsed wall time
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// One row of the format listing
pub fn describe_variant(variant: &StreamVariant) -> String {
    let quality = match (variant.resolution, variant.bitrate) {
        (Some(res), _) => res.to_string(),
        (None, Some(kbps)) => format!("{:.0}k", kbps),
        (None, None) => "-".to_string(),
    };
    let size = variant
        .size
        .map(format_bytes)
        .unwrap_or_else(|| "?".to_string());

    format!(
        "{:<10} {:<5} {:<12} {:>7} {:>9}  {}",
        variant.id,
        variant.container,
        variant.kind.label(),
        quality,
        size,
        variant.codecs.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes_and_lengths() {
        assert_eq!(format_bytes(512 * 1024), "512 KB");
        assert_eq!(format_bytes(3 * 1_048_576 + 400_000), "3.4 MB");
        assert_eq!(format_bytes(2 * 1024 * 1_048_576), "2.0 GB");
        assert_eq!(format_length(212.0), "3:32");
        assert_eq!(format_length(3725.0), "1:02:05");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}

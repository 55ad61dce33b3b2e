/// Container/codec preference, most preferred first
pub const DEFAULT_MIME_PREFERENCES: [&str; 4] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm;codecs=h264",
    "video/mp4;codecs=h264",
];

/// Used when the platform supports none of the preferences
pub const FALLBACK_MIME: &str = "video/webm";

const FALLBACK_EXTENSION: &str = "webm";

/// Preferences the platform reports as supported, in preference order
pub fn supported_mime_types<F>(preferences: &[String], is_supported: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    preferences
        .iter()
        .filter(|mime| is_supported(mime.as_str()))
        .cloned()
        .collect()
}

/// First supported preference, or the fallback
pub fn select_mime_type<F>(preferences: &[String], is_supported: F, fallback: &str) -> String
where
    F: Fn(&str) -> bool,
{
    preferences
        .iter()
        .find(|mime| is_supported(mime.as_str()))
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

/// File extension from a mime type's subtype: `video/mp4;codecs=h264` → `mp4`
pub fn file_extension(mime: &str) -> String {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.split('/').nth(1).map(str::trim) {
        Some(subtype) if !subtype.is_empty() => subtype.to_string(),
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

/// `recording_<unix-epoch-ms>.<ext>`
pub fn recording_file_name(mime: &str, epoch_ms: i64) -> String {
    format!("recording_{}.{}", epoch_ms, file_extension(mime))
}

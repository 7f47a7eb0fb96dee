use std::path::{Path, PathBuf};

use crate::types::{MediaInfo, StreamVariant};

const MAX_STEM_CHARS: usize = 180;

/// Make `name` safe to use as a single file name component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_STEM_CHARS)
        .collect();

    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "media".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<title> [<id>].<container>`
pub fn file_name_for(info: &MediaInfo, variant: &StreamVariant) -> String {
    let title = sanitize_file_name(&info.title);
    let id = sanitize_file_name(&info.id);
    let ext = sanitize_file_name(&variant.container);
    format!("{title} [{id}].{ext}")
}

/// Get the destination path of `variant` inside `output_dir`
pub fn destination_path(output_dir: &Path, info: &MediaInfo, variant: &StreamVariant) -> PathBuf {
    output_dir.join(file_name_for(info, variant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaKind, SourceLocator};

    fn info(title: &str) -> MediaInfo {
        MediaInfo {
            id: "dQw4w9WgXcQ".to_string(),
            title: title.to_string(),
            author: String::new(),
            length_seconds: None,
        }
    }

    fn variant(container: &str) -> StreamVariant {
        StreamVariant {
            id: "140".to_string(),
            container: container.to_string(),
            codecs: Vec::new(),
            kind: MediaKind::AudioOnly,
            resolution: None,
            bitrate: None,
            size: None,
            locator: SourceLocator::file("/unused"),
        }
    }

    #[test]
    fn follows_title_id_ext_template() {
        assert_eq!(
            file_name_for(&info("Never Gonna Give You Up"), &variant("m4a")),
            "Never Gonna Give You Up [dQw4w9WgXcQ].m4a"
        );
    }

    #[test]
    fn replaces_path_separators_and_control_chars() {
        assert_eq!(sanitize_file_name("AC/DC: Live?\n"), "AC_DC_ Live__");
        assert_eq!(sanitize_file_name(" .. "), "media");
        assert_eq!(sanitize_file_name(&"x".repeat(500)).len(), MAX_STEM_CHARS);
    }

    #[test]
    fn destination_is_inside_output_dir() {
        let path = destination_path(Path::new("downloads"), &info("a/b"), &variant("mp4"));
        assert_eq!(path, Path::new("downloads").join("a_b [dQw4w9WgXcQ].mp4"));
    }
}

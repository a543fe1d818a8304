//! The `OUTPUT:` marker line protocol.
//!
//! A successful generator run prints exactly one line that starts with
//! [`MARKER_PREFIX`] followed immediately by the metadata path. Matching is on the
//! exact line prefix; a progress line that merely contains `OUTPUT:` is not a marker.

use std::path::PathBuf;

pub const MARKER_PREFIX: &str = "OUTPUT:";

/// Render the marker line for `path`, without a trailing newline.
pub fn marker_line(path: &std::path::Path) -> String {
    format!("{}{}", MARKER_PREFIX, path.display())
}

/// Scan captured stdout for marker lines. The last one wins when several are present.
pub fn find_marker(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .rev()
        .filter_map(|line| line.strip_prefix(MARKER_PREFIX))
        .map(str::trim_end)
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_found_among_progress_lines() {
        let out = "Using device: cpu\nExporting results...\nOUTPUT:models/a_chair_metadata.json\n";
        assert_eq!(
            find_marker(out),
            Some(PathBuf::from("models/a_chair_metadata.json"))
        );
    }

    #[test]
    fn test_substring_is_not_a_marker() {
        let out = "progress OUTPUT:nope\n  OUTPUT:indented\n";
        assert_eq!(find_marker(out), None);
    }

    #[test]
    fn test_marker_need_not_be_last_line() {
        let out = "OUTPUT:/tmp/x_metadata.json\r\nbye\n";
        assert_eq!(find_marker(out), Some(PathBuf::from("/tmp/x_metadata.json")));
    }

    #[test]
    fn test_empty_marker_value_is_ignored() {
        assert_eq!(find_marker("OUTPUT:\n"), None);
    }

    #[test]
    fn test_leading_space_in_path_is_kept() {
        let out = "OUTPUT: spaced/x_metadata.json \r\n";
        assert_eq!(find_marker(out), Some(PathBuf::from(" spaced/x_metadata.json")));
    }

    #[test]
    fn test_last_marker_wins() {
        let out = "OUTPUT:first.json\nOUTPUT:second.json\n";
        assert_eq!(find_marker(out), Some(PathBuf::from("second.json")));
    }

    #[cfg(unix)]
    #[test]
    fn test_marker_line_format() {
        let p = std::path::Path::new("dir").join("a_prompt_metadata.json");
        assert_eq!(marker_line(&p), "OUTPUT:dir/a_prompt_metadata.json");
    }
}

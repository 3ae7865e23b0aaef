use std::path::Path;

/// Read the feed list: one URL per line, trimmed, blank lines ignored.
///
/// A missing file is logged and treated as an empty list; the caller turns
/// that into a clean no-op run. Other I/O errors are returned.
pub fn read_feed_sources(path: &Path) -> std::io::Result<Vec<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!(path = %path.display(), "RSS feeds file not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

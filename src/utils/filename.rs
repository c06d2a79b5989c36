use std::path::{Path, PathBuf};

/// Default output path for an enriched table: `<stem>-enriched.csv` next to
/// the input file.
pub fn default_enriched_filename(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}-enriched.csv", stem))
}

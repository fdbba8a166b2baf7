//! Output file naming

use std::path::{Path, PathBuf};

/// Prefix of every generated file name
pub const FILE_PREFIX: &str = "certificate_";

/// Make a name usable as a file name component
///
/// Spaces become underscores; `.`, `/` and `\` are removed. Nothing else is
/// touched, so distinct names can still collide (`"A.B"` and `"AB"`).
pub fn safe_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '.' | '/' | '\\'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// `certificate_<safe_name>.pdf`
pub fn output_file_name(name: &str) -> String {
    format!("{FILE_PREFIX}{}.pdf", safe_name(name))
}

/// Full output path for a recipient
pub(crate) fn output_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(output_file_name(name))
}

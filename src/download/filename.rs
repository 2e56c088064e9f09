//! File name sanitization and target path resolution.
//!
//! Names come from remote senders, so they are treated as hostile: path
//! separators, reserved characters and control characters are replaced and
//! dot-only names are rejected before anything is joined to the download
//! root.

use std::path::{Component, Path, PathBuf};

use super::constants::{FALLBACK_FILE_NAME, LOG_FILE_NAME, MAX_FILE_NAME_BYTES};

/// Makes a remote file name safe to create inside the download root.
///
/// # Examples
///
/// ```
/// use tgmedia_core::download::sanitize_filename;
///
/// assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
/// assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
/// assert_eq!(sanitize_filename(".."), "download.bin");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = truncate_to_bytes(&sanitized, MAX_FILE_NAME_BYTES);
    if sanitized.is_empty() || !is_safe_filename_segment(&sanitized) {
        return FALLBACK_FILE_NAME.to_string();
    }
    sanitized
}

/// Joins the sanitized `name` onto `root`.
///
/// A name that would collide with the failure log (`log.txt`, any case) is
/// saved as `log_1.txt` instead.
#[must_use]
pub fn target_path(root: &Path, name: &str) -> PathBuf {
    let name = sanitize_filename(name);
    if name.eq_ignore_ascii_case(LOG_FILE_NAME) {
        return root.join(with_suffix(&name, "_1"));
    }
    root.join(name)
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}{suffix}.{ext}"),
        None => format!("{name}{suffix}"),
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Keeps the extension when cutting an over-long name.
fn truncate_to_bytes(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 && name.len() - pos <= 16 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };
    let budget = max_bytes.saturating_sub(ext.len());
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{ext}", &stem[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_are_kept() {
        assert_eq!(sanitize_filename("video.mp4"), "video.mp4");
        assert_eq!(sanitize_filename("My Holiday (2).mov"), "My Holiday (2).mov");
        assert_eq!(sanitize_filename("документ.pdf"), "документ.pdf");
    }

    #[test]
    fn test_separators_are_replaced() {
        assert_eq!(sanitize_filename("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize_filename("/etc/passwd"), "_etc_passwd");
    }

    #[test]
    fn test_reserved_and_control_characters_are_replaced() {
        assert_eq!(sanitize_filename("what?.txt"), "what_.txt");
        assert_eq!(sanitize_filename("a:b*c\"d<e>f|g"), "a_b_c_d_e_f_g");
        assert_eq!(sanitize_filename("bad\u{0}name"), "bad_name");
    }

    #[test]
    fn test_dot_names_fall_back() {
        assert_eq!(sanitize_filename("."), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_filename(".."), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_filename(""), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_filename("   "), FALLBACK_FILE_NAME);
    }

    #[test]
    fn test_hidden_files_are_allowed() {
        assert_eq!(sanitize_filename(".env"), ".env");
    }

    #[test]
    fn test_long_names_keep_extension() {
        let long = format!("{}.mp4", "a".repeat(400));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.len(), MAX_FILE_NAME_BYTES);
        assert!(sanitized.ends_with(".mp4"));
    }

    #[test]
    fn test_long_multibyte_names_cut_on_char_boundary() {
        let long = "é".repeat(200);
        let sanitized = sanitize_filename(&long);
        assert!(sanitized.len() <= MAX_FILE_NAME_BYTES);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_target_path_stays_inside_root() {
        let root = Path::new("/downloads");
        assert_eq!(target_path(root, "../x.bin"), Path::new("/downloads/.._x.bin"));
        assert_eq!(target_path(root, "ok.bin").parent(), Some(root));
    }

    #[test]
    fn test_target_path_never_hits_failure_log() {
        let root = Path::new("/downloads");
        assert_eq!(target_path(root, "log.txt"), Path::new("/downloads/log_1.txt"));
        assert_eq!(target_path(root, " LOG.TXT"), Path::new("/downloads/LOG_1.TXT"));
        assert_eq!(target_path(root, "log.txt.bak"), Path::new("/downloads/log.txt.bak"));
    }
}

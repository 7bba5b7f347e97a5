use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduce an uploaded filename to a safe basename: path components stripped,
/// anything outside `[A-Za-z0-9._-]` replaced, leading dots trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let basename = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// The previously stored filename that a successful re-upload leaves
/// orphaned, if any.
pub fn superseded_image(old: Option<String>, new: Option<&str>) -> Option<String> {
    match new {
        Some(new) => old.filter(|old| old != new),
        None => None,
    }
}

/// Store an uploaded ad image. A disallowed extension is absorbed: the
/// caller gets `None`, the same as no image having been provided.
pub async fn store_upload(
    state: &AppState,
    original_name: &str,
    body: Bytes,
) -> anyhow::Result<Option<String>> {
    if !allowed_file(original_name) {
        warn!(%original_name, "upload rejected, extension not allowed");
        return Ok(None);
    }
    // UUID prefix keeps concurrent uploads of the same filename apart
    let filename = format!("{}-{}", Uuid::new_v4(), sanitize_filename(original_name));
    state.images.save(&filename, body).await?;
    Ok(Some(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_extensions_are_case_insensitive() {
        assert!(allowed_file("pie.jpg"));
        assert!(allowed_file("pie.JPEG"));
        assert!(allowed_file("pie.PnG"));
        assert!(allowed_file("варенье.webp"));
    }

    #[test]
    fn disallowed_or_missing_extension_is_refused() {
        assert!(!allowed_file("script.exe"));
        assert!(!allowed_file("archive.tar.gz"));
        assert!(!allowed_file("noextension"));
        assert!(!allowed_file("document.pdf"));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\x\\pie.jpg"), "pie.jpg");
    }

    #[test]
    fn sanitize_replaces_odd_characters() {
        assert_eq!(sanitize_filename("мой пирог.jpg"), "_________.jpg");
        assert_eq!(sanitize_filename("a b?c.png"), "a_b_c.png");
    }

    #[test]
    fn sanitize_trims_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
    }

    #[test]
    fn replacing_an_image_orphans_the_old_file() {
        assert_eq!(
            superseded_image(Some("old.jpg".into()), Some("new.jpg")),
            Some("old.jpg".into())
        );
    }

    #[test]
    fn no_new_image_keeps_the_old_file() {
        assert_eq!(superseded_image(Some("old.jpg".into()), None), None);
        assert_eq!(superseded_image(None, Some("new.jpg")), None);
        assert_eq!(superseded_image(Some("same.jpg".into()), Some("same.jpg")), None);
    }

    #[tokio::test]
    async fn store_upload_absorbs_bad_extension() {
        let state = crate::state::AppState::fake();
        let stored = store_upload(&state, "malware.exe", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn store_upload_returns_uniquified_name() {
        let state = crate::state::AppState::fake();
        let stored = store_upload(&state, "pie.jpg", Bytes::from_static(b"x"))
            .await
            .unwrap()
            .expect("allowed upload should store");
        assert!(stored.ends_with("-pie.jpg"));
        assert_ne!(stored, "pie.jpg");
    }
}

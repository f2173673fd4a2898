use std::path::Path;

use uuid::Uuid;

/// Where a saved upload landed, as a URL path clients can fetch back.
pub(crate) async fn save_upload(
    uploads_dir: &str,
    filename: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) -> std::io::Result<Option<String>> {
    let subdir = match content_type {
        Some(ct) if ct.starts_with("image/") => "images",
        Some(ct) if ct.starts_with("video/") => "videos",
        // Unsupported file types are skipped, not rejected.
        _ => return Ok(None),
    };

    let extension = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let unique_filename = format!("{}{extension}", Uuid::now_v7());

    let dir = format!("{uploads_dir}/{subdir}");
    tokio::fs::create_dir_all(&dir).await?;

    let file_path = format!("{dir}/{unique_filename}");
    tokio::fs::write(&file_path, data).await?;

    Ok(Some(format!("/{file_path}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn image_uploads_land_under_images() {
        let dir = std::env::temp_dir().join(format!("bapi-uploads-{}", Uuid::now_v7()));
        let dir = dir.to_str().unwrap().to_owned();

        let url = save_upload(&dir, Some("cat.png"), Some("image/png"), b"png bytes")
            .await
            .unwrap()
            .expect("image should be saved");

        assert!(url.contains("/images/"));
        assert!(url.ends_with(".png"));
        let saved = tokio::fs::read(&url[1..]).await.unwrap();
        assert_eq!(saved, b"png bytes");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn unsupported_content_types_are_skipped() {
        let dir = std::env::temp_dir().join(format!("bapi-uploads-{}", Uuid::now_v7()));
        let dir = dir.to_str().unwrap().to_owned();

        let url = save_upload(&dir, Some("notes.txt"), Some("text/plain"), b"hello")
            .await
            .unwrap();
        assert!(url.is_none());

        let url = save_upload(&dir, Some("mystery"), None, b"hello").await.unwrap();
        assert!(url.is_none());
    }
}

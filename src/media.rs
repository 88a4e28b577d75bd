use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::Error;

/// Decoded image payload, ready to be persisted under a fresh file name.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decodes a `data:image/<type>;base64,<payload>` URI as submitted on recipe
/// create/update.
pub fn decode_image(data: &str) -> Result<ImageUpload, Error> {
    let data = data
        .strip_prefix("data:")
        .ok_or_else(|| Error::invalid_field("image", "expected a data URI"))?;

    let (mime, payload) = data
        .split_once(";base64,")
        .ok_or_else(|| Error::invalid_field("image", "expected a base64 data URI"))?;

    let extension = match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => return Err(Error::invalid_field("image", "unsupported image type")),
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| Error::invalid_field("image", format!("invalid base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(Error::invalid_field("image", "empty image payload"));
    }

    Ok(ImageUpload { extension, bytes })
}

impl ImageUpload {
    /// Writes the image under `media_root` with a random file name and
    /// returns the relative URL stored as the recipe's image reference.
    pub async fn store(&self, media_root: &Path) -> Result<String, Error> {
        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), self.extension);

        tokio::fs::create_dir_all(media_root).await?;
        tokio::fs::write(media_root.join(&file_name), &self.bytes).await?;

        Ok(format!("/media/{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_uri(mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn decodes_a_png_data_uri() {
        let upload = decode_image(&data_uri("image/png", b"\x89PNG fake")).unwrap();
        assert_eq!(upload.extension, "png");
        assert_eq!(upload.bytes, b"\x89PNG fake");
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(decode_image("not a data uri").is_err());
        assert!(decode_image("data:image/png,plain").is_err());
        assert!(decode_image("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_image("data:image/png;base64,@@@").is_err());
        assert!(decode_image("data:image/png;base64,").is_err());
    }

    #[tokio::test]
    async fn stores_under_a_fresh_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let upload = decode_image(&data_uri("image/jpeg", b"jpeg bytes")).unwrap();

        let url = upload.store(dir.path()).await.unwrap();
        assert!(url.starts_with("/media/"));
        assert!(url.ends_with(".jpg"));

        let file_name = url.strip_prefix("/media/").unwrap();
        let stored = tokio::fs::read(dir.path().join(file_name)).await.unwrap();
        assert_eq!(stored, b"jpeg bytes");
    }
}

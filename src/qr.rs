// QR codes for shortened links. The image is written as
// `<dir>/<short path>.png` so repeated runs for the same link overwrite
// instead of piling up files.

use anyhow::{Context, Result};
use image::Luma;
use qrcode::QrCode;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File the QR code for `shortened` goes to inside `dir`. Slashes in the
/// short path are flattened so the image always lands directly in `dir`.
pub fn qr_destination(dir: &Path, shortened: &str) -> PathBuf {
    let name = shortened.trim_matches('/').replace('/', "_");
    dir.join(format!("{name}.png"))
}

/// Encode `text` as a QR code and save it as a PNG at `destination`.
pub fn write_qr_code(text: &str, destination: &Path) -> Result<()> {
    let code = QrCode::new(text.as_bytes()).context("Failed to encode QR code")?;
    let image = code.render::<Luma<u8>>().build();
    image
        .save(destination)
        .with_context(|| format!("Failed to write QR code to {}", destination.display()))?;
    debug!(path = %destination.display(), "QR code written");
    Ok(())
}

/// Create `dir` if needed and write the QR code for `link` into it.
/// Returns the absolute path of the image.
pub fn save_link_qr_code(link: &str, shortened: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).context(
        "Unable to save the QR code image. Please check the specified path and ensure you have the necessary permissions.",
    )?;
    let destination = qr_destination(dir, shortened);
    write_qr_code(link, &destination)?;
    Ok(std::path::absolute(&destination).unwrap_or(destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn destination_is_flat_png() {
        let dir = Path::new("/tmp/qr");
        assert_eq!(qr_destination(dir, "sale"), dir.join("sale.png"));
        assert_eq!(qr_destination(dir, "/a/b"), dir.join("a_b.png"));
    }

    #[test]
    fn writes_png_into_new_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("codes").join("nested");

        let path = save_link_qr_code("https://api.example/sale", "sale", &dir).unwrap();

        assert!(path.is_absolute());
        assert!(path.ends_with("sale.png"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > PNG_MAGIC.len());
        assert_eq!(&bytes[..8], &PNG_MAGIC[..]);
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = save_link_qr_code("https://api.example/x", "x", &blocker.join("sub")).unwrap_err();
        assert!(err.to_string().contains("Unable to save the QR code image"));
    }
}

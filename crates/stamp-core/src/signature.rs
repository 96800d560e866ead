//! Signature image decoding
//!
//! Images are decoded once per signing call into Flate-compressed RGB and
//! alpha planes, ready to be embedded as an image XObject with a soft mask.

use flate2::{write::ZlibEncoder, Compression};
use sha2::{Digest, Sha256};
use std::io::Write;

use crate::error::ImageError;
use crate::source::Source;

/// A decoded signature image
pub struct SignatureImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
    digest: [u8; 32],
}

impl std::fmt::Debug for SignatureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_alpha", &self.alpha.is_some())
            .finish()
    }
}

impl SignatureImage {
    /// Read and decode an image from a path or byte buffer
    pub fn open(source: &Source) -> Result<Self, ImageError> {
        let bytes = source.read_all()?;
        Self::from_bytes(&bytes)
    }

    /// Decode PNG, JPEG, GIF or BMP bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ImageError::Decode(e.to_string()))?
            .to_rgba8();

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(ImageError::Empty);
        }

        let pixel_count = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for pixel in decoded.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        // Fully opaque images don't need a soft mask
        let alpha = if alpha.iter().all(|&a| a == u8::MAX) {
            None
        } else {
            Some(deflate(&alpha)?)
        };

        Ok(Self {
            width,
            height,
            rgb: deflate(&rgb)?,
            alpha,
            digest: Sha256::digest(bytes).into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// SHA-256 of the encoded source bytes
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub(crate) fn rgb_stream(&self) -> &[u8] {
        &self.rgb
    }

    pub(crate) fn alpha_stream(&self) -> Option<&[u8]> {
        self.alpha.as_deref()
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}


#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_decodes_opaque_png() {
        let png = fixtures::png(4, 2, [10, 20, 30, 255]);
        let img = SignatureImage::from_bytes(&png).unwrap();
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 2);
        assert!(!img.has_alpha());

        let rgb = inflate(img.rgb_stream());
        assert_eq!(rgb.len(), 4 * 2 * 3);
        assert_eq!(&rgb[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_translucent_png_keeps_mask() {
        let png = fixtures::png(3, 3, [0, 0, 0, 128]);
        let img = SignatureImage::from_bytes(&png).unwrap();
        assert!(img.has_alpha());
        let alpha = inflate(img.alpha_stream().unwrap());
        assert_eq!(alpha, vec![128u8; 9]);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let result = SignatureImage::from_bytes(b"definitely not an image");
        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = SignatureImage::open(&Source::path("/no/such/signature.png"));
        assert!(matches!(result, Err(ImageError::Read(_))));
    }

    #[test]
    fn test_digest_is_stable() {
        let png = fixtures::png(2, 2, [1, 2, 3, 255]);
        let a = SignatureImage::from_bytes(&png).unwrap();
        let b = SignatureImage::from_bytes(&png).unwrap();
        assert_eq!(a.digest(), b.digest());
    }
}

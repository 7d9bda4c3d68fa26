//! Raw key image buffers.
//!
//! The engine renders each key as a square RGB bitmap.  The virtual device
//! only ever stores and forwards these bytes; it never inspects the pixels.
//! The one thing it does enforce is the exact length: a buffer of any other
//! size is rejected before it can reach the cache or a client.

use std::sync::Arc;

use thiserror::Error;

/// Width and height of one key image in pixels.
pub const KEY_IMAGE_WIDTH: usize = 72;

/// Bytes per pixel (RGB, no alpha).
pub const KEY_IMAGE_BYTES_PER_PIXEL: usize = 3;

/// Exact byte length every key image must have.
pub const KEY_IMAGE_SIZE: usize = KEY_IMAGE_WIDTH * KEY_IMAGE_WIDTH * KEY_IMAGE_BYTES_PER_PIXEL;

/// Error returned when a buffer cannot become a [`KeyImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("expected image buffer of length {expected}, got length {actual}")]
    InvalidImageSize { expected: usize, actual: usize },
}

/// An immutable key image of exactly [`KEY_IMAGE_SIZE`] bytes.
///
/// The bytes sit behind an `Arc` so one image can be cached and broadcast to
/// every connected client without copying 15 KB per client.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyImage {
    bytes: Arc<[u8]>,
}

impl KeyImage {
    /// Wraps `bytes` after checking the length.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidImageSize`] if `bytes.len()` is not
    /// [`KEY_IMAGE_SIZE`].
    pub fn new(bytes: Vec<u8>) -> Result<Self, ImageError> {
        if bytes.len() != KEY_IMAGE_SIZE {
            return Err(ImageError::InvalidImageSize {
                expected: KEY_IMAGE_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.into(),
        })
    }

    /// An all-black image, used when a key is cleared.
    pub fn blank() -> Self {
        Self {
            bytes: vec![0u8; KEY_IMAGE_SIZE].into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl TryFrom<Vec<u8>> for KeyImage {
    type Error = ImageError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

// The pixel payload is noise in logs; print the length only.
impl std::fmt::Debug for KeyImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyImage")
            .field("len", &self.bytes.len())
            .field("blank", &self.is_blank())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_image_size_is_72_by_72_rgb() {
        assert_eq!(KEY_IMAGE_SIZE, 15552);
    }

    #[test]
    fn test_new_accepts_exact_length() {
        let image = KeyImage::new(vec![0xAB; KEY_IMAGE_SIZE]).expect("exact length");
        assert_eq!(image.as_bytes().len(), KEY_IMAGE_SIZE);
        assert_eq!(image.as_bytes()[0], 0xAB);
        assert!(!image.is_blank());
    }

    #[test]
    fn test_new_rejects_short_buffer() {
        let result = KeyImage::new(vec![0; KEY_IMAGE_SIZE - 1]);
        assert_eq!(
            result,
            Err(ImageError::InvalidImageSize {
                expected: KEY_IMAGE_SIZE,
                actual: KEY_IMAGE_SIZE - 1
            })
        );
    }

    #[test]
    fn test_new_rejects_long_and_empty_buffers() {
        assert!(KeyImage::new(vec![0; KEY_IMAGE_SIZE + 1]).is_err());
        assert!(KeyImage::new(Vec::new()).is_err());
    }

    #[test]
    fn test_blank_is_all_zero_and_full_length() {
        let blank = KeyImage::blank();
        assert_eq!(blank.as_bytes().len(), KEY_IMAGE_SIZE);
        assert!(blank.is_blank());
    }

    #[test]
    fn test_debug_does_not_dump_pixels() {
        let rendered = format!("{:?}", KeyImage::blank());
        assert!(rendered.contains("15552"));
        assert!(rendered.len() < 64);
    }
}

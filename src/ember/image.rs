use std::path::Path;
use std::sync::{Arc, RwLock};

use bytemuck::cast_slice;
use image::{ImageBuffer, Rgba};
use thiserror::Error;

use crate::util::filled;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("pixel count mismatch: image holds {expected} pixels, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("failed to allocate a {width}x{height} image")]
    Allocation { width: u32, height: u32 },

    #[error("image encoding error: {0}")]
    Encoding(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 렌더러와 화면 출력 쪽이 같이 들고 있는 최종 이미지
pub type SharedImage = Arc<RwLock<Image>>;

/// 픽셀 하나당 u32 하나. 하위 비트부터 R, G, B, A
#[derive(Debug, Clone, Default)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Image {
    pub fn new(width: u32, height: u32) -> Image {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn shared(self) -> SharedImage {
        Arc::new(RwLock::new(self))
    }

    // 렌더러가 프레임을 다 만든 뒤에만 호출함
    pub fn load_image(&mut self, rgba: &[u32]) -> Result<(), ImageError> {
        if rgba.len() != self.pixels.len() {
            return Err(ImageError::SizeMismatch {
                expected: self.pixels.len(),
                actual: rgba.len(),
            });
        }

        self.pixels.copy_from_slice(rgba);
        Ok(())
    }

    /// 크기가 바뀌면 내용은 버림. 할당에 실패하면 원래 크기와 내용을 그대로 둠
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ImageError> {
        if self.width == width && self.height == height {
            return Ok(());
        }

        let pixels = (width as usize)
            .checked_mul(height as usize)
            .and_then(|count| filled(count, 0))
            .ok_or(ImageError::Allocation { width, height })?;

        self.width = width;
        self.height = height;
        self.pixels = pixels;
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.pixels)
    }

    /// PNG로 저장. 광선 배열의 0번째 줄이 화면 아래쪽이라 위아래를 뒤집어서 씀
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        let row = self.width as usize;
        let flipped: Vec<u32> = if row == 0 {
            Vec::new()
        } else {
            self.pixels
                .chunks_exact(row)
                .rev()
                .flatten()
                .copied()
                .collect()
        };

        let bytes: Vec<u8> = flipped.iter().flat_map(|pixel| pixel.to_le_bytes()).collect();
        let buffer: ImageBuffer<Rgba<u8>, _> =
            ImageBuffer::from_raw(self.width, self.height, bytes).ok_or(
                ImageError::SizeMismatch {
                    expected: row * self.height as usize,
                    actual: flipped.len(),
                },
            )?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        buffer.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image_checks_length() {
        let mut image = Image::new(2, 2);

        assert!(image.load_image(&[1, 2, 3, 4]).is_ok());
        assert_eq!(image.pixels(), &[1, 2, 3, 4]);

        assert!(matches!(
            image.load_image(&[1, 2, 3]),
            Err(ImageError::SizeMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_resize_discards_content() {
        let mut image = Image::new(2, 1);
        image.load_image(&[7, 7]).unwrap();

        image.resize(2, 1).unwrap();
        assert_eq!(image.pixels(), &[7, 7]);

        image.resize(3, 2).unwrap();
        assert_eq!(image.size(), (3, 2));
        assert_eq!(image.pixels(), &[0; 6]);
    }

    #[test]
    fn test_failed_resize_keeps_image() {
        let mut image = Image::new(2, 1);
        image.load_image(&[7, 8]).unwrap();

        assert!(matches!(
            image.resize(u32::MAX, u32::MAX),
            Err(ImageError::Allocation { width: u32::MAX, height: u32::MAX })
        ));
        assert_eq!(image.size(), (2, 1));
        assert_eq!(image.pixels(), &[7, 8]);
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn test_bytes_are_rgba_order() {
        let mut image = Image::new(1, 1);
        image.load_image(&[0xFF33_2211]).unwrap();

        assert_eq!(image.as_bytes(), &[0x11, 0x22, 0x33, 0xFF]);
    }

    #[test]
    fn test_save_png_flips_rows() {
        let mut image = Image::new(1, 2);
        // 아래 줄: 빨강, 위 줄: 파랑
        image.load_image(&[0xFF00_00FF, 0xFFFF_0000]).unwrap();

        let path = std::env::temp_dir().join(format!("ember-flip-{}.png", std::process::id()));
        image.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().into_rgba8();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(loaded.get_pixel(0, 1).0, [255, 0, 0, 255]);
    }
}

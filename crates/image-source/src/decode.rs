use crate::AcquireError;
use image::{ImageFormat, RgbImage};

/// Decode PNG or JPEG bytes, sniffing the format from the content, and convert
/// the result to 8-bit RGB. Alpha is dropped.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, AcquireError> {
    let format = image::guess_format(bytes)?;

    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(AcquireError::UnsupportedFormat(format));
    }

    let image = image::load_from_memory_with_format(bytes, format)?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod test {
    use super::*;
    use image::{DynamicImage, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_decode_png_drops_alpha() {
        let mut source = RgbaImage::new(4, 3);
        source.put_pixel(0, 0, Rgba([200, 100, 50, 10]));
        source.put_pixel(3, 2, Rgba([1, 2, 3, 255]));

        let bytes = encode(DynamicImage::ImageRgba8(source), ImageFormat::Png);
        let image = decode_image(&bytes).unwrap();

        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(0, 0), &Rgb([200, 100, 50]));
        assert_eq!(image.get_pixel(3, 2), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_decode_grayscale_png() {
        let source = image::GrayImage::from_pixel(2, 2, image::Luma([77]));
        let bytes = encode(DynamicImage::ImageLuma8(source), ImageFormat::Png);

        let image = decode_image(&bytes).unwrap();
        assert_eq!(image.get_pixel(1, 1), &Rgb([77, 77, 77]));
    }

    #[test]
    fn test_decode_jpeg() {
        let source = RgbImage::from_pixel(16, 8, Rgb([120, 120, 120]));
        let bytes = encode(DynamicImage::ImageRgb8(source), ImageFormat::Jpeg);

        let image = decode_image(&bytes).unwrap();
        assert_eq!(image.dimensions(), (16, 8));
        let Rgb([r, g, b]) = *image.get_pixel(8, 4);
        for channel in [r, g, b] {
            assert!((channel as i32 - 120).abs() <= 3);
        }
    }

    #[test]
    fn test_decode_rejects_other_formats() {
        let source = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let bytes = encode(DynamicImage::ImageRgb8(source), ImageFormat::Bmp);

        assert!(matches!(
            decode_image(&bytes),
            Err(AcquireError::UnsupportedFormat(ImageFormat::Bmp))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(AcquireError::Decode(_))
        ));
        assert!(decode_image(&[]).is_err());

        // valid signature, truncated body
        let source = RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]));
        let bytes = encode(DynamicImage::ImageRgb8(source), ImageFormat::Png);
        assert!(matches!(
            decode_image(&bytes[..bytes.len() / 2]),
            Err(AcquireError::Decode(_))
        ));
    }
}

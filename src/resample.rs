use crate::config::{IconSize, ResampleFilter};
use crate::raster::Raster;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};
use std::io;

//===========================================================================//

type PremultipliedImage = ImageBuffer<Rgba<f32>, Vec<f32>>;

impl ResampleFilter {
    fn filter_type(&self) -> FilterType {
        match *self {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Produces a copy of `source` at exactly `size`, scaling each axis
/// independently.  Filtering happens on premultiplied alpha so that the
/// color of fully transparent pixels never leaks into visible ones.
pub fn resample(
    source: &Raster,
    size: IconSize,
    filter: ResampleFilter,
) -> io::Result<Raster> {
    if source.width() == size.width && source.height() == size.height {
        return Ok(source.clone());
    }
    let premultiplied: Vec<f32> = source
        .rgba_data()
        .chunks_exact(4)
        .flat_map(|pixel| {
            let alpha = pixel[3] as f32 / 255.0;
            [
                pixel[0] as f32 / 255.0 * alpha,
                pixel[1] as f32 / 255.0 * alpha,
                pixel[2] as f32 / 255.0 * alpha,
                alpha,
            ]
        })
        .collect();
    let image = match PremultipliedImage::from_raw(
        source.width(),
        source.height(),
        premultiplied,
    ) {
        Some(image) => image,
        None => invalid_input!(
            "Pixel buffer does not match {}x{}",
            source.width(),
            source.height()
        ),
    };
    let filter_type = filter.filter_type();
    let resized =
        imageops::resize(&image, size.width, size.height, filter_type);
    let mut rgba = Vec::with_capacity(resized.as_raw().len());
    for pixel in resized.pixels() {
        let [red, green, blue, alpha] = pixel.0;
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            rgba.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        rgba.extend_from_slice(&[
            to_channel(red / alpha),
            to_channel(green / alpha),
            to_channel(blue / alpha),
            to_channel(alpha),
        ]);
    }
    Raster::try_from_rgba_data(size.width, size.height, rgba)
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::resample;
    use crate::config::{IconSize, ResampleFilter};
    use crate::raster::Raster;

    const FILTERS: [ResampleFilter; 5] = [
        ResampleFilter::Nearest,
        ResampleFilter::Triangle,
        ResampleFilter::CatmullRom,
        ResampleFilter::Gaussian,
        ResampleFilter::Lanczos3,
    ];

    fn solid(width: u32, height: u32, color: [u8; 4]) -> Raster {
        let rgba = color.repeat((width * height) as usize);
        Raster::from_rgba_data(width, height, rgba)
    }

    #[test]
    fn output_has_requested_size() {
        let source = solid(37, 19, [10, 20, 30, 255]);
        for &filter in FILTERS.iter() {
            for &size in &[
                IconSize::square(256),
                IconSize::square(16),
                IconSize::new(5, 40),
                IconSize::square(1),
            ] {
                let output = resample(&source, size, filter).unwrap();
                assert_eq!(output.width(), size.width);
                assert_eq!(output.height(), size.height);
            }
        }
    }

    #[test]
    fn same_size_is_a_copy() {
        let mut rgba = Vec::new();
        for index in 0..(9 * 4) {
            rgba.extend_from_slice(&[index as u8, 0, 255, (index * 7) as u8]);
        }
        let source = Raster::from_rgba_data(9, 4, rgba);
        let size = IconSize::new(9, 4);
        let output =
            resample(&source, size, ResampleFilter::Lanczos3).unwrap();
        assert_eq!(output, source);
    }

    #[test]
    fn solid_color_stays_solid() {
        let source = solid(64, 64, [200, 100, 50, 255]);
        for &filter in FILTERS.iter() {
            for &side in &[16, 48, 256] {
                let output =
                    resample(&source, IconSize::square(side), filter).unwrap();
                for pixel in output.rgba_data().chunks_exact(4) {
                    let expected = [200u8, 100, 50, 255];
                    for (&got, &want) in pixel.iter().zip(expected.iter()) {
                        assert!(
                            (got as i32 - want as i32).abs() <= 1,
                            "{:?} at {} px gave {:?}",
                            filter,
                            side,
                            pixel
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn transparent_color_does_not_bleed() {
        // Left half opaque blue, right half fully transparent red.
        let mut rgba = Vec::new();
        for _row in 0..32 {
            for col in 0..32 {
                if col < 16 {
                    rgba.extend_from_slice(&[0, 0, 255, 255]);
                } else {
                    rgba.extend_from_slice(&[255, 0, 0, 0]);
                }
            }
        }
        let source = Raster::from_rgba_data(32, 32, rgba);
        let output =
            resample(&source, IconSize::square(12), ResampleFilter::Lanczos3)
                .unwrap();
        for pixel in output.rgba_data().chunks_exact(4) {
            assert!(pixel[0] <= 1, "red bled into {:?}", pixel);
        }
    }

    #[test]
    fn upsampling_a_tiny_source() {
        let source = solid(1, 1, [1, 2, 3, 255]);
        let output =
            resample(&source, IconSize::square(256), ResampleFilter::Lanczos3)
                .unwrap();
        assert_eq!(output.rgba_data().len(), 256 * 256 * 4);
    }
}

//===========================================================================//

//! Registration of per-sample core photographs into continuous,
//! depth-aligned rasters.
//!
//! Two modalities are registered side by side: daylight (`dl`) and
//! ultraviolet (`uv`). Both buffers always share one shape; row `r` of a
//! buffer covers depth `depth_from + r / pixels_per_cm`. Missing pixels hold
//! `NaN` in every channel.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use log::debug;

use crate::config::SegmentOptions;
use crate::data::model::Interval;
use crate::error::{Result, WellError};

pub const CHANNELS: usize = 3;

/// Value of every channel of a missing pixel.
pub const MISSING: f32 = f32::NAN;

// ---------------------------------------------------------------------------
// CoreImage – one RGB f32 raster
// ---------------------------------------------------------------------------

/// Row-major RGB raster with intensities in `[0, 1]` or [`MISSING`].
#[derive(Debug, Clone)]
pub struct CoreImage {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl PartialEq for CoreImage {
    /// Missing pixels compare equal to each other.
    fn eq(&self, other: &Self) -> bool {
        self.height == other.height
            && self.width == other.width
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

impl CoreImage {
    /// A raster where every pixel is missing.
    pub fn missing(height: usize, width: usize) -> Self {
        CoreImage {
            height,
            width,
            data: vec![MISSING; height * width * CHANNELS],
        }
    }

    /// Decode-side conversion: scale by the source's maximum channel value.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let data = match img {
            DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_) => img
                .to_rgb16()
                .into_raw()
                .into_iter()
                .map(|v| v as f32 / u16::MAX as f32)
                .collect(),
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                img.to_rgb32f().into_raw()
            }
            _ => img
                .to_rgb8()
                .into_raw()
                .into_iter()
                .map(|v| v as f32 / u8::MAX as f32)
                .collect(),
        };
        CoreImage {
            height,
            width,
            data,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Channels of pixel `(row, col)`, `None` when missing.
    pub fn pixel(&self, row: usize, col: usize) -> Option<[f32; CHANNELS]> {
        let start = (row * self.width + col) * CHANNELS;
        let px = &self.data[start..start + CHANNELS];
        if px.iter().any(|v| v.is_nan()) {
            None
        } else {
            Some([px[0], px[1], px[2]])
        }
    }

    /// True when every pixel of `row` is missing.
    pub fn row_is_missing(&self, row: usize) -> bool {
        self.row(row).iter().all(|v| v.is_nan())
    }

    pub fn row(&self, row: usize) -> &[f32] {
        let stride = self.width * CHANNELS;
        &self.data[row * stride..(row + 1) * stride]
    }

    /// Rows `[start, stop)`, clamped to the image.
    pub fn crop_rows(&self, start: usize, stop: usize) -> CoreImage {
        let stop = stop.min(self.height);
        let start = start.min(stop);
        let stride = self.width * CHANNELS;
        CoreImage {
            height: stop - start,
            width: self.width,
            data: self.data[start * stride..stop * stride].to_vec(),
        }
    }

    /// Copy `src` in starting at row `at`; rows past the bottom are dropped.
    fn paste_rows(&mut self, at: usize, src: &CoreImage) {
        debug_assert_eq!(self.width, src.width);
        let rows = src.height.min(self.height.saturating_sub(at));
        let stride = self.width * CHANNELS;
        self.data[at * stride..(at + rows) * stride].copy_from_slice(&src.data[..rows * stride]);
    }

    /// 8-bit RGBA rendering; missing pixels become transparent black.
    pub fn to_rgba8(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width as u32, self.height as u32);
        for row in 0..self.height {
            for col in 0..self.width {
                let px = match self.pixel(row, col) {
                    Some([r, g, b]) => Rgba([to_u8(r), to_u8(g), to_u8(b), u8::MAX]),
                    None => Rgba([0, 0, 0, 0]),
                };
                out.put_pixel(col as u32, row as u32, px);
            }
        }
        out
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.to_rgba8().save(path)?;
        Ok(())
    }
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

// ---------------------------------------------------------------------------
// CoreImagePair
// ---------------------------------------------------------------------------

/// Daylight and ultraviolet rasters of one depth range.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreImagePair {
    pub dl: CoreImage,
    pub uv: CoreImage,
    depth_from: i64,
    pixels_per_cm: u32,
}

impl CoreImagePair {
    pub fn depth_from(&self) -> i64 {
        self.depth_from
    }

    pub fn shape(&self) -> (usize, usize) {
        self.dl.shape()
    }

    /// Crop to `[depth_from, depth_to)` by pixel offset, without re-sampling.
    pub fn crop(&self, depth_from: i64, depth_to: i64) -> CoreImagePair {
        let ppc = self.pixels_per_cm as i64;
        let start = ((depth_from - self.depth_from) * ppc).max(0) as usize;
        let stop = ((depth_to - self.depth_from) * ppc).max(0) as usize;
        CoreImagePair {
            dl: self.dl.crop_rows(start, stop),
            uv: self.uv.crop_rows(start, stop),
            depth_from,
            pixels_per_cm: self.pixels_per_cm,
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// One recovered core piece with its decoded photographs.
#[derive(Debug, Clone)]
pub struct SampleImages {
    pub name: String,
    pub interval: Interval,
    pub dl: Option<DynamicImage>,
    pub uv: Option<DynamicImage>,
}

/// Fail if any two samples overlap in depth. Flush samples are fine.
pub fn check_no_overlap<'a, I>(samples: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, Interval)>,
{
    let mut samples: Vec<(&str, Interval)> = samples.into_iter().collect();
    samples.sort_by(|a, b| a.1.depth_from.total_cmp(&b.1.depth_from));

    let overlapping: Vec<String> = samples
        .windows(2)
        .filter(|w| w[1].1.depth_from < w[0].1.depth_to)
        .map(|w| format!("{} overlaps {}", w[1].0, w[0].0))
        .collect();
    if !overlapping.is_empty() {
        return Err(WellError::validation(format!(
            "core samples intersect: {}",
            overlapping.join(", ")
        )));
    }
    Ok(())
}

/// Whole centimetres → pixel rows.
fn cm_to_px(cm: f64, pixels_per_cm: u32) -> i64 {
    cm.round() as i64 * pixels_per_cm as i64
}

/// Resize a photograph to `(height, width)` with a Lanczos filter.
pub fn resample(img: &DynamicImage, height: u32, width: u32) -> CoreImage {
    CoreImage::from_dynamic(&img.resize_exact(width, height, FilterType::Lanczos3))
}

/// Build the image pair for `[depth_from, depth_to)` from `samples`.
///
/// Overlapping samples are rejected before any buffer is allocated. Gaps
/// between samples stay missing.
pub fn register(
    depth_from: i64,
    depth_to: i64,
    options: &SegmentOptions,
    samples: &[SampleImages],
) -> Result<CoreImagePair> {
    options.validate()?;
    check_no_overlap(samples.iter().map(|s| (s.name.as_str(), s.interval)))?;
    if let Some(s) = samples.iter().find(|s| s.dl.is_none() && s.uv.is_none()) {
        return Err(WellError::not_found(
            format!("images of sample {}", s.name),
            "samples_dl / samples_uv",
        ));
    }

    let ppc = options.pixels_per_cm;
    let height = cm_to_px((depth_to - depth_from) as f64, ppc).max(0) as usize;
    let width = options.width_px();
    let mut dl = CoreImage::missing(height, width as usize);
    let mut uv = CoreImage::missing(height, width as usize);

    let (seg_from, seg_to) = (depth_from as f64, depth_to as f64);
    for sample in samples {
        let iv = sample.interval;
        if !iv.overlaps(seg_from, seg_to) {
            continue;
        }
        let sample_height = cm_to_px(iv.len(), ppc);
        let top_crop = cm_to_px(seg_from - iv.depth_from, ppc).max(0);
        let bottom_crop = sample_height - cm_to_px(iv.depth_to - seg_to, ppc).max(0);
        if sample_height <= 0 || bottom_crop <= top_crop {
            debug!("sample {} has no rows inside the segment", sample.name);
            continue;
        }
        let insert_pos = cm_to_px(iv.depth_from - seg_from, ppc).max(0) as usize;

        let place = |img: &Option<DynamicImage>| match img {
            Some(img) => resample(img, sample_height as u32, width)
                .crop_rows(top_crop as usize, bottom_crop as usize),
            None => CoreImage::missing((bottom_crop - top_crop) as usize, width as usize),
        };
        dl.paste_rows(insert_pos, &place(&sample.dl));
        uv.paste_rows(insert_pos, &place(&sample.uv));
    }

    Ok(CoreImagePair {
        dl,
        uv,
        depth_from,
        pixels_per_cm: ppc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(y * 7 % 256) as u8, (x * 31 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn sample(name: &str, from: f64, to: f64, dl: Option<DynamicImage>, uv: Option<DynamicImage>) -> SampleImages {
        SampleImages {
            name: name.to_string(),
            interval: Interval::new(from, to),
            dl,
            uv,
        }
    }

    fn options() -> SegmentOptions {
        SegmentOptions {
            core_width: 2,
            pixels_per_cm: 2,
        }
    }

    #[test]
    fn composite_matches_manual_placement() {
        let a = gradient(13, 40);
        let b = gradient(9, 25);
        let samples = vec![
            sample("a", 102.0, 110.0, Some(a.clone()), Some(a.clone())),
            sample("b", 113.0, 118.0, Some(b.clone()), Some(b.clone())),
        ];
        let pair = register(100, 120, &options(), &samples).unwrap();
        assert_eq!(pair.dl.shape(), (40, 4));
        assert_eq!(pair.uv.shape(), pair.dl.shape());

        let mut expected = CoreImage::missing(40, 4);
        expected.paste_rows(4, &resample(&a, 16, 4));
        expected.paste_rows(26, &resample(&b, 10, 4));
        assert_eq!(pair.dl, expected);
        assert_eq!(pair.uv, expected);

        for row in (0..4).chain(20..26).chain(36..40) {
            assert!(pair.dl.row_is_missing(row), "row {row} should be missing");
        }
        for row in (4..20).chain(26..36) {
            for col in 0..4 {
                let px = pair.dl.pixel(row, col).unwrap();
                assert!(px.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn samples_crossing_the_bounds_are_cropped() {
        let samples = vec![
            sample("top", 95.0, 105.0, Some(solid(4, 10, [255, 0, 0])), None),
            sample("bottom", 115.0, 125.0, None, Some(solid(4, 10, [0, 0, 255]))),
        ];
        let pair = register(100, 120, &options(), &samples).unwrap();

        assert_eq!(pair.dl.pixel(0, 0), Some([1.0, 0.0, 0.0]));
        assert_eq!(pair.dl.pixel(9, 3), Some([1.0, 0.0, 0.0]));
        assert!(pair.dl.row_is_missing(10));
        assert!(pair.uv.row_is_missing(9));
        assert!(pair.uv.row_is_missing(29));
        assert_eq!(pair.uv.pixel(30, 0), Some([0.0, 0.0, 1.0]));
        assert_eq!(pair.uv.pixel(39, 0), Some([0.0, 0.0, 1.0]));
        // the missing modality keeps the same shape
        assert!(pair.dl.row_is_missing(35));
    }

    #[test]
    fn overlapping_samples_are_rejected() {
        let samples = vec![
            sample("a", 100.0, 110.0, Some(solid(2, 2, [1, 1, 1])), None),
            sample("b", 109.0, 115.0, Some(solid(2, 2, [1, 1, 1])), None),
        ];
        let err = register(100, 120, &options(), &samples).unwrap_err();
        assert!(matches!(err, WellError::Validation(ref m) if m.contains("b overlaps a")));
    }

    #[test]
    fn sample_without_images_is_not_found() {
        let samples = vec![sample("lost", 100.0, 110.0, None, None)];
        assert!(matches!(
            register(100, 120, &options(), &samples),
            Err(WellError::NotFound { .. })
        ));
    }

    #[test]
    fn crop_equals_direct_registration() {
        let samples = vec![
            sample("a", 95.0, 108.0, Some(gradient(6, 30)), Some(gradient(5, 20))),
            sample("b", 108.0, 121.0, Some(gradient(7, 31)), None),
        ];
        let full = register(100, 120, &options(), &samples).unwrap();
        let direct = register(104, 111, &options(), &samples).unwrap();
        assert_eq!(full.crop(104, 111), direct);
        assert_eq!(full.crop(104, 111).crop(106, 109), full.crop(106, 109));
    }

    #[test]
    fn sixteen_bit_sources_are_normalised() {
        let img = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(
            1,
            1,
            Rgb([u16::MAX, 0, u16::MAX / 2 + 1]),
        ));
        let px = CoreImage::from_dynamic(&img).pixel(0, 0).unwrap();
        assert_eq!(px[0], 1.0);
        assert_eq!(px[1], 0.0);
        assert!((px[2] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn png_export_marks_missing_as_transparent() {
        let pair = register(
            100,
            104,
            &options(),
            &[sample("a", 100.0, 102.0, Some(solid(3, 3, [255, 255, 255])), None)],
        )
        .unwrap();
        let rgba = pair.dl.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(rgba.get_pixel(0, 7), &Rgba([0, 0, 0, 0]));
    }
}

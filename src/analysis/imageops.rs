//! Pixel-level primitives shared by the signal extractors: HSV conversion,
//! binary masks, connected regions, edge detection and sharpness metrics.

use image::{GrayImage, Rgb, RgbImage};

/// Convert an RGB pixel to HSV: hue in degrees [0, 360), saturation and
/// value in [0, 1].
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> (f32, f32, f32) {
    let r = f32::from(pixel[0]) / 255.0;
    let g = f32::from(pixel[1]) / 255.0;
    let b = f32::from(pixel[2]) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    (hue, saturation, max)
}

/// Skin-tone band in HSV space (hue near red-orange, visibly saturated and
/// bright enough to be lit skin).
pub fn is_skin_tone(h: f32, s: f32, v: f32) -> bool {
    h <= 40.0 && s >= 20.0 / 255.0 && v >= 70.0 / 255.0
}

/// Binary pixel mask over one frame.
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Build a mask by evaluating an HSV predicate per pixel.
    pub fn from_hsv(image: &RgbImage, predicate: impl Fn(f32, f32, f32) -> bool) -> Mask {
        let (width, height) = image.dimensions();
        let mut bits = Vec::with_capacity((width * height) as usize);
        for pixel in image.pixels() {
            let (h, s, v) = rgb_to_hsv(*pixel);
            bits.push(predicate(h, s, v));
        }
        Mask { width, height, bits }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    /// Fraction of set pixels in [0, 1].
    pub fn coverage(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        let set = self.bits.iter().filter(|&&b| b).count();
        set as f64 / self.bits.len() as f64
    }
}

/// A 4-connected region of set pixels with its bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub area: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height() as f32
    }
}

/// Label 4-connected regions of set pixels in a mask.
pub fn connected_regions(mask: &Mask) -> Vec<Region> {
    let (width, height) = (mask.width, mask.height);
    let mut visited = vec![false; (width * height) as usize];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start_y in 0..height {
        for start_x in 0..width {
            let start = (start_y * width + start_x) as usize;
            if visited[start] || !mask.bits[start] {
                continue;
            }

            let mut region = Region {
                area: 0,
                min_x: start_x,
                min_y: start_y,
                max_x: start_x,
                max_y: start_y,
            };

            visited[start] = true;
            stack.push((start_x, start_y));

            while let Some((x, y)) = stack.pop() {
                region.area += 1;
                region.min_x = region.min_x.min(x);
                region.min_y = region.min_y.min(y);
                region.max_x = region.max_x.max(x);
                region.max_y = region.max_y.max(y);

                let mut visit = |nx: u32, ny: u32| {
                    let idx = (ny * width + nx) as usize;
                    if !visited[idx] && mask.bits[idx] {
                        visited[idx] = true;
                        stack.push((nx, ny));
                    }
                };

                if x > 0 {
                    visit(x - 1, y);
                }
                if x + 1 < width {
                    visit(x + 1, y);
                }
                if y > 0 {
                    visit(x, y - 1);
                }
                if y + 1 < height {
                    visit(x, y + 1);
                }
            }

            regions.push(region);
        }
    }

    regions
}

/// Edge mask from Sobel gradient magnitude thresholding.
pub fn edge_mask(luma: &GrayImage, threshold: f32) -> Mask {
    let (width, height) = luma.dimensions();
    let mut bits = vec![false; (width * height) as usize];

    if width >= 3 && height >= 3 {
        let at = |x: u32, y: u32| f32::from(luma.get_pixel(x, y)[0]);
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2.0 * at(x - 1, y)
                    - at(x - 1, y + 1);
                let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2.0 * at(x, y - 1)
                    - at(x + 1, y - 1);
                if (gx * gx + gy * gy).sqrt() >= threshold {
                    bits[(y * width + x) as usize] = true;
                }
            }
        }
    }

    Mask { width, height, bits }
}

/// Focus metric: variance of the Laplacian response over interior pixels.
/// Sharp frames produce high variance, defocused frames flatten it out.
pub fn laplacian_variance(luma: &GrayImage) -> f64 {
    let (width, height) = luma.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let at = |x: u32, y: u32| f64::from(luma.get_pixel(x, y)[0]);
    let mut responses = Vec::with_capacity(((width - 2) * (height - 2)) as usize);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let response = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            responses.push(response);
        }
    }

    let mean = responses.iter().sum::<f64>() / responses.len() as f64;
    responses.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / responses.len() as f64
}

/// Mean pixel intensity of a grayscale frame, in [0, 255].
pub fn mean_brightness(luma: &GrayImage) -> f64 {
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let sum: u64 = luma.pixels().map(|p| u64::from(p[0])).sum();
    sum as f64 / f64::from(width * height)
}

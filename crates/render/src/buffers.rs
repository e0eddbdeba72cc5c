/// Pixel extent of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportSize {
    pub width: usize,
    pub height: usize,
}

impl ViewportSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

/// Per-pixel depth, row 0 at the top, 0.0 at the near plane and 1.0 at the
/// far plane or where nothing was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    size: ViewportSize,
    values: Vec<f32>,
}

impl DepthBuffer {
    pub const BACKGROUND: f32 = 1.0;

    pub fn cleared(size: ViewportSize) -> Self {
        Self {
            size,
            values: vec![Self::BACKGROUND; size.pixel_count()],
        }
    }

    /// Wraps raw values; the length is not checked so callers can detect
    /// mismatches themselves.
    pub fn from_values(size: ViewportSize, values: Vec<f32>) -> Self {
        Self { size, values }
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.size.width && y < self.size.height {
            self.values.get(y * self.size.width + x).copied()
        } else {
            None
        }
    }

    /// Nearest-neighbour resample onto another extent.
    pub fn resample_nearest(&self, target: ViewportSize) -> DepthBuffer {
        if self.size == target {
            return self.clone();
        }
        if self.size.is_empty() {
            return DepthBuffer::cleared(target);
        }
        let mut values = Vec::with_capacity(target.pixel_count());
        for y in 0..target.height {
            let sy = ((y as f64 + 0.5) * self.size.height as f64 / target.height as f64) as usize;
            let sy = sy.min(self.size.height - 1);
            for x in 0..target.width {
                let sx = ((x as f64 + 0.5) * self.size.width as f64 / target.width as f64) as usize;
                let sx = sx.min(self.size.width - 1);
                values.push(self.values[sy * self.size.width + sx]);
            }
        }
        DepthBuffer {
            size: target,
            values,
        }
    }
}

/// Straight RGBA pixels in [0, 1], row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    size: ViewportSize,
    pixels: Vec<[f32; 4]>,
}

/// Which component of a pixel feeds the directional statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelChannel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
    Luminance,
}

impl ColorBuffer {
    pub fn filled(size: ViewportSize, color: [f32; 4]) -> Self {
        Self {
            size,
            pixels: vec![color; size.pixel_count()],
        }
    }

    pub fn from_pixels(size: ViewportSize, pixels: Vec<[f32; 4]>) -> Self {
        Self { size, pixels }
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    pub fn channel_values(&self, channel: PixelChannel) -> impl Iterator<Item = f64> + '_ {
        self.pixels.iter().map(move |p| {
            let p = p.map(|c| c.clamp(0.0, 1.0) as f64);
            match channel {
                PixelChannel::Red => p[0],
                PixelChannel::Green => p[1],
                PixelChannel::Blue => p[2],
                PixelChannel::Alpha => p[3],
                PixelChannel::Luminance => 0.2126 * p[0] + 0.7152 * p[1] + 0.0722 * p[2],
            }
        })
    }

    /// Mean and population standard deviation of one channel over the whole
    /// image, or `None` for an empty image.
    pub fn channel_stats(&self, channel: PixelChannel) -> Option<(f64, f64)> {
        if self.pixels.is_empty() {
            return None;
        }
        let n = self.pixels.len() as f64;
        let mean = self.channel_values(channel).sum::<f64>() / n;
        let variance = self
            .channel_values(channel)
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / n;
        Some((mean, variance.max(0.0).sqrt()))
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        let bytes: Vec<u8> = self
            .pixels
            .iter()
            .flat_map(|p| p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();
        egui::ColorImage::from_rgba_unmultiplied([self.size.width, self.size.height], &bytes)
    }
}

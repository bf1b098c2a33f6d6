use crate::transform::PixelPoint;

// ============================================================================
// Color
// ============================================================================

/// An opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Desaturated version, used for inactive regions
    pub fn greyed(self) -> Self {
        let lum = ((self.r as u16 * 3 + self.g as u16 * 6 + self.b as u16) / 10) as u8;
        Self::new(lum, lum, lum)
    }

    /// Move each channel halfway toward white
    pub fn lighten(self) -> Self {
        let up = |c: u8| c + (255 - c) / 2;
        Self::new(up(self.r), up(self.g), up(self.b))
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Write ABGR pixel to slice (RGBA8888 little-endian byte order)
#[inline]
fn write_pixel(dest: &mut [u8], color: Rgb) {
    dest[0] = 255; // A
    dest[1] = color.b;
    dest[2] = color.g;
    dest[3] = color.r;
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// RGBA8888 software canvas the map overlay is rasterized into
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; (width * height * 4) as usize],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    /// Clear to a solid color using u32 writes
    pub fn clear(&mut self, color: Rgb) {
        let pixel = u32::from_ne_bytes([255, color.b, color.g, color.r]);
        let ptr = self.pixels.as_mut_ptr() as *mut u32;
        let len = self.pixels.len() / 4;

        for i in 0..len {
            // Safety: pixels.len() is width * height * 4, so i < len stays in
            // bounds; write_unaligned makes no alignment assumption about Vec<u8>
            unsafe {
                ptr.add(i).write_unaligned(pixel);
            }
        }
    }

    /// Set a single pixel (bounds checked)
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            write_pixel(&mut self.pixels[idx..idx + 4], color);
        }
    }

    /// Unchecked pixel write for callers that already clipped
    #[inline]
    unsafe fn set_pixel_unchecked(&mut self, x: u32, y: u32, color: Rgb) {
        let idx = self.pixel_index(x, y);
        *self.pixels.get_unchecked_mut(idx) = 255;
        *self.pixels.get_unchecked_mut(idx + 1) = color.b;
        *self.pixels.get_unchecked_mut(idx + 2) = color.g;
        *self.pixels.get_unchecked_mut(idx + 3) = color.r;
    }

    /// Read a pixel; None outside the canvas
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            Some(Rgb::new(self.pixels[idx + 3], self.pixels[idx + 2], self.pixels[idx + 1]))
        } else {
            None
        }
    }

    /// Horizontal span, clipped to the canvas
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, color: Rgb) {
        let Some((start, end)) = self.clip_span(x1, x2, y) else {
            return;
        };
        let mut idx = self.pixel_index(start as u32, y as u32);
        for _ in start..=end {
            write_pixel(&mut self.pixels[idx..idx + 4], color);
            idx += 4;
        }
    }

    /// Horizontal span with alpha blending
    pub fn hline_blend(&mut self, x1: i32, x2: i32, y: i32, color: Rgb, alpha: u8) {
        let Some((start, end)) = self.clip_span(x1, x2, y) else {
            return;
        };
        let alpha = alpha as u16;
        let mut idx = self.pixel_index(start as u32, y as u32);
        for _ in start..=end {
            self.pixels[idx] = 255;
            self.pixels[idx + 1] = blend_channel(color.b, self.pixels[idx + 1], alpha);
            self.pixels[idx + 2] = blend_channel(color.g, self.pixels[idx + 2], alpha);
            self.pixels[idx + 3] = blend_channel(color.r, self.pixels[idx + 3], alpha);
            idx += 4;
        }
    }

    fn clip_span(&self, x1: i32, x2: i32, y: i32) -> Option<(i32, i32)> {
        if y < 0 || y >= self.height as i32 {
            return None;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width as i32 - 1);
        (start <= end).then_some((start, end))
    }

    /// Bresenham line with Cohen-Sutherland clipping
    pub fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        let Some((cx0, cy0, cx1, cy1)) = self.clip_line(x0, y0, x1, y1) else {
            return;
        };

        let dx = (cx1 - cx0).abs();
        let dy = -((cy1 - cy0).abs());
        let sx = if cx0 < cx1 { 1 } else { -1 };
        let sy = if cy0 < cy1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (cx0, cy0);

        loop {
            // Safety: endpoints were clipped to the canvas and Bresenham stays
            // between them
            unsafe {
                self.set_pixel_unchecked(x as u32, y as u32, color);
            }
            if x == cx1 && y == cy1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Line between two canvas positions
    pub fn line_between(&mut self, a: PixelPoint, b: PixelPoint, color: Rgb) {
        self.line(a.x as i32, a.y as i32, b.x as i32, b.y as i32, color);
    }

    /// Cohen-Sutherland clipping; None when the line misses the canvas
    fn clip_line(
        &self,
        mut x0: i32,
        mut y0: i32,
        mut x1: i32,
        mut y1: i32,
    ) -> Option<(i32, i32, i32, i32)> {
        const INSIDE: u8 = 0;
        const LEFT: u8 = 1;
        const RIGHT: u8 = 2;
        const BOTTOM: u8 = 4;
        const TOP: u8 = 8;
        // Converges in at most 4 rounds for valid input
        const MAX_ITERATIONS: u32 = 16;

        let w = self.width as i32;
        let h = self.height as i32;

        let outcode = |x: i32, y: i32| -> u8 {
            let mut code = INSIDE;
            if x < 0 {
                code |= LEFT;
            } else if x >= w {
                code |= RIGHT;
            }
            if y < 0 {
                code |= TOP;
            } else if y >= h {
                code |= BOTTOM;
            }
            code
        };

        let mut code0 = outcode(x0, y0);
        let mut code1 = outcode(x1, y1);

        for _ in 0..MAX_ITERATIONS {
            if (code0 | code1) == 0 {
                return Some((x0, y0, x1, y1));
            }
            if (code0 & code1) != 0 {
                return None;
            }

            let code_out = if code0 != 0 { code0 } else { code1 };
            let dy = y1 - y0;
            let dx = x1 - x0;

            let (x, y) = if (code_out & BOTTOM) != 0 {
                if dy == 0 {
                    return None;
                }
                (x0 + dx * (h - 1 - y0) / dy, h - 1)
            } else if (code_out & TOP) != 0 {
                if dy == 0 {
                    return None;
                }
                (x0 + dx * (0 - y0) / dy, 0)
            } else if (code_out & RIGHT) != 0 {
                if dx == 0 {
                    return None;
                }
                (w - 1, y0 + dy * (w - 1 - x0) / dx)
            } else {
                if dx == 0 {
                    return None;
                }
                (0, y0 + dy * (0 - x0) / dx)
            };

            if code_out == code0 {
                (x0, y0) = (x, y);
                code0 = outcode(x0, y0);
            } else {
                (x1, y1) = (x, y);
                code1 = outcode(x1, y1);
            }
        }

        None
    }

    /// Square handle of side `2 * half + 1` centered on a point
    pub fn fill_square(&mut self, center: PixelPoint, half: i32, color: Rgb) {
        let (cx, cy) = (center.x as i32, center.y as i32);
        for y in cy - half..=cy + half {
            self.hline(cx - half, cx + half, y, color);
        }
    }

    /// Scanline polygon fill with alpha blending
    pub fn fill_polygon_blend(&mut self, vertices: &[PixelPoint], color: Rgb, alpha: u8) {
        if vertices.len() < 3 {
            return;
        }

        let (min_y, max_y) = vertices
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v.y), hi.max(v.y)));
        let min_y = (min_y as i32).max(0);
        let max_y = (max_y as i32).min(self.height as i32 - 1);

        // Reused per scanline
        let mut intersections = Vec::with_capacity(vertices.len());
        let n = vertices.len();

        for y in min_y..=max_y {
            intersections.clear();
            let yf = y as f64 + 0.5;

            for i in 0..n {
                let a = vertices[i];
                let b = vertices[(i + 1) % n];
                if (a.y <= yf && b.y > yf) || (b.y <= yf && a.y > yf) {
                    let x = a.x + (yf - a.y) / (b.y - a.y) * (b.x - a.x);
                    intersections.push(x as i32);
                }
            }

            intersections.sort_unstable();
            for pair in intersections.chunks_exact(2) {
                self.hline_blend(pair[0], pair[1], y, color, alpha);
            }
        }
    }

    /// Raw bytes for SDL texture upload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}

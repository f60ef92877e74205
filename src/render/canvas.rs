use anyhow::{bail, Result};

/// 0RGB ピクセルバッファ
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: vec![0u32; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    /// サイズを変えて黒で埋める
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.buffer.clear();
        self.buffer.resize(width * height, 0);
    }

    pub fn fill(&mut self, color: u32) {
        self.buffer.fill(color);
    }

    /// 同じサイズのキャンバスを丸ごと写す
    pub fn copy_from(&mut self, other: &Canvas) {
        if self.width != other.width || self.height != other.height {
            self.resize(other.width, other.height);
        }
        self.buffer.copy_from_slice(&other.buffer);
    }

    /// 連続した BGR バイト列を写す。サイズが違えば重なる範囲だけ
    pub fn blit_bgr(&mut self, data: &[u8], width: usize, height: usize) -> Result<()> {
        if data.len() < width * height * 3 {
            bail!(
                "frame buffer too small: {} bytes for {}x{}",
                data.len(),
                width,
                height
            );
        }
        for y in 0..self.height.min(height) {
            for x in 0..self.width.min(width) {
                let i = (y * width + x) * 3;
                let b = data[i] as u32;
                let g = data[i + 1] as u32;
                let r = data[i + 2] as u32;
                self.buffer[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }
        Ok(())
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.buffer[y * self.width + x])
        } else {
            None
        }
    }

    /// Bresenhamのアルゴリズムで線を描画
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
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

    /// 円を描画（塗りつぶし）
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// ピクセルをセット（境界チェック付き）
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }
}

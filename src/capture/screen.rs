//! Desktop screenshot provider using GDI.

use anyhow::Result;

use super::{Frame, ScreenSource};
use crate::selection::Rect;

/// Grabs the primary screen (or a region of it).
#[derive(Debug, Default)]
pub struct DesktopSource;

impl DesktopSource {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl ScreenSource for DesktopSource {
    fn grab(&mut self, region: Option<Rect>) -> Result<Frame> {
        let (width, height) = self
            .screen_size()
            .ok_or_else(|| anyhow::anyhow!("Screen size unavailable"))?;
        // Never read (or allocate) beyond the screen
        let rect = region
            .unwrap_or(Rect::new(0, 0, width, height))
            .clip_to(width, height);
        if rect.is_empty() {
            return Err(anyhow::anyhow!("Region {:?} is outside the screen", region));
        }

        let to_i32 = |v: u32| {
            i32::try_from(v).map_err(|_| anyhow::anyhow!("Region {} is out of range", rect))
        };
        gdi::grab_screen_rect(
            to_i32(rect.x)?,
            to_i32(rect.y)?,
            to_i32(rect.width)?,
            to_i32(rect.height)?,
        )
    }

    fn screen_size(&self) -> Option<(u32, u32)> {
        use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

#[cfg(not(windows))]
impl ScreenSource for DesktopSource {
    fn grab(&mut self, _region: Option<Rect>) -> Result<Frame> {
        Err(anyhow::anyhow!("Desktop capture is only supported on Windows"))
    }
}

#[cfg(windows)]
mod gdi {
    use anyhow::{anyhow, Result};
    use image::RgbImage;

    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
        GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
        SRCCOPY,
    };

    use super::Frame;

    /// Copies a screen rectangle into an RGB frame.
    ///
    /// 1. Blits the desktop into a memory bitmap
    /// 2. Reads it back as top-down 32-bit BGRA
    /// 3. Drops alpha and swaps to RGB
    pub fn grab_screen_rect(x: i32, y: i32, width: i32, height: i32) -> Result<Frame> {
        if width <= 0 || height <= 0 {
            return Err(anyhow!("Invalid capture size {}x{}", width, height));
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| anyhow!("Capture size {}x{} is too large", width, height))?;
        let mut buffer = vec![0u8; len];

        unsafe {
            let screen_dc = GetDC(None);
            if screen_dc.is_invalid() {
                return Err(anyhow!("GetDC failed"));
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            if mem_dc.is_invalid() {
                ReleaseDC(None, screen_dc);
                return Err(anyhow!("CreateCompatibleDC failed"));
            }
            let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
            if bitmap.is_invalid() {
                let _ = DeleteDC(mem_dc);
                ReleaseDC(None, screen_dc);
                return Err(anyhow!("CreateCompatibleBitmap failed"));
            }
            let previous = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(mem_dc, 0, 0, width, height, screen_dc, x, y, SRCCOPY);

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height = top-down rows
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let lines = GetDIBits(
                mem_dc,
                bitmap,
                0,
                height as u32,
                Some(buffer.as_mut_ptr() as *mut _),
                &mut info,
                DIB_RGB_COLORS,
            );

            SelectObject(mem_dc, previous);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);

            blit.map_err(|e| anyhow!("BitBlt failed: {}", e))?;
            if lines != height {
                return Err(anyhow!("GetDIBits returned {} of {} rows", lines, height));
            }
        }

        Ok(bgra_to_rgb(&buffer, width as u32, height as u32))
    }

    fn bgra_to_rgb(bgra: &[u8], width: u32, height: u32) -> RgbImage {
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for px in bgra.chunks_exact(4) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        RgbImage::from_raw(width, height, rgb).unwrap_or_else(|| RgbImage::new(width, height))
    }
}

use crate::error::{OptimizerError, Result};
use crate::model::Rect;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// A tile image and the top-left position it is drawn at.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub image: &'a RgbaImage,
    pub x: u32,
    pub y: u32,
}

/// Raster primitives the optimizer needs. Swap the implementation to plug in
/// another image backend; [`RgbaOps`] is the `image`-crate default.
///
/// `Sync` because chunk extraction may fan out across threads.
pub trait ImageOps: Sync {
    /// Fully transparent raster.
    fn blank(&self, width: u32, height: u32) -> RgbaImage;
    /// Copy of `region` out of `src`. Fails if the region leaves the image.
    fn extract(&self, src: &RgbaImage, region: Rect) -> Result<RgbaImage>;
    /// Draws every placement onto `base`, in order.
    fn composite(&self, base: &mut RgbaImage, placements: &[Placement<'_>]) -> Result<()>;
    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage>;
}

impl<T: ImageOps + ?Sized> ImageOps for &T {
    fn blank(&self, width: u32, height: u32) -> RgbaImage {
        (**self).blank(width, height)
    }
    fn extract(&self, src: &RgbaImage, region: Rect) -> Result<RgbaImage> {
        (**self).extract(src, region)
    }
    fn composite(&self, base: &mut RgbaImage, placements: &[Placement<'_>]) -> Result<()> {
        (**self).composite(base, placements)
    }
    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        (**self).encode_png(image)
    }
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage> {
        (**self).decode(bytes)
    }
}

/// Default [`ImageOps`] on top of `image::RgbaImage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbaOps;

impl ImageOps for RgbaOps {
    fn blank(&self, width: u32, height: u32) -> RgbaImage {
        RgbaImage::new(width, height)
    }

    fn extract(&self, src: &RgbaImage, region: Rect) -> Result<RgbaImage> {
        let (width, height) = src.dimensions();
        if !region.fits_within(width, height) {
            return Err(OptimizerError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                w: region.w,
                h: region.h,
                width,
                height,
            });
        }
        Ok(image::imageops::crop_imm(src, region.x, region.y, region.w, region.h).to_image())
    }

    fn composite(&self, base: &mut RgbaImage, placements: &[Placement<'_>]) -> Result<()> {
        for p in placements {
            let (sw, sh) = p.image.dimensions();
            blit_rgba(p.image, base, p.x, p.y, Rect::new(0, 0, sw, sh));
        }
        Ok(())
    }

    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage> {
        Ok(image::load_from_memory(bytes)?.to_rgba8())
    }
}

/// Blit the `src_rect` part of `src` into `canvas` with its top-left at (dx, dy).
/// Pixels that would land outside the canvas are dropped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, src_rect: Rect) {
    let (cw, ch) = canvas.dimensions();
    let (iw, ih) = src.dimensions();
    for yy in 0..src_rect.h {
        for xx in 0..src_rect.w {
            let (ix, iy) = (src_rect.x + xx, src_rect.y + yy);
            if ix >= iw || iy >= ih {
                continue;
            }
            if dx + xx < cw && dy + yy < ch {
                let px = *src.get_pixel(ix, iy);
                canvas.put_pixel(dx + xx, dy + yy, px);
            }
        }
    }
}

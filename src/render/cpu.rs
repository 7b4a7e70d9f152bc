//! Row-parallel CPU render context.
//!
//! The animation contract is embarrassingly parallel, so the rasterizer
//! assigns whole scanlines to rayon workers: each row is owned by exactly
//! one thread and compositing is a saturating additive accumulation, which
//! keeps the image independent of instance order.

use rayon::prelude::*;

use crate::animate::contract::visible_quads;
use crate::compile::instances::StaticQuad;
use crate::foundation::core::{Canvas, FrameRgb};
use crate::foundation::error::{NotefallError, NotefallResult};
use crate::geom::coords::{corner_coverage, norm_to_pixel_x, norm_to_pixel_y};
use crate::render::{RenderContext, Scene};

/// One quad flattened to top-origin pixel space, ready to composite.
#[derive(Clone, Copy, Debug)]
struct RasterQuad {
    x0: f32,
    y0: f32,
    w: f32,
    h: f32,
    color: [f32; 3],
    alpha: f32,
    radius: f32,
}

impl RasterQuad {
    fn from_ndc(
        rect: [f32; 4],
        size_pixels: [f32; 2],
        color: [f32; 3],
        alpha: f32,
        radius: f32,
        canvas: Canvas,
    ) -> Self {
        let w_px = canvas.width as f32;
        let h_px = canvas.height as f32;
        // rect y is the bottom edge in NDC; the top edge is y + height.
        let top = norm_to_pixel_y(rect[1] + rect[3], h_px);
        Self {
            x0: norm_to_pixel_x(rect[0], w_px),
            y0: top,
            w: size_pixels[0],
            h: size_pixels[1],
            color,
            alpha,
            radius,
        }
    }

    fn overlaps_row(&self, py: f32) -> bool {
        py >= self.y0 - 0.5 && py <= self.y0 + self.h + 0.5
    }
}

/// CPU-resident render context. The compiled scene is "uploaded" once at
/// construction and the only per-frame mutable input is the time scalar.
pub struct CpuContext {
    scene: Scene,
    /// f32 RGB accumulation surface, bottom-left origin (row 0 = bottom
    /// scanline), flipped only at readback.
    surface: Vec<f32>,
    rendered: bool,
}

impl CpuContext {
    /// Allocate the surface and take ownership of the compiled scene.
    pub fn new(scene: Scene) -> NotefallResult<Self> {
        let canvas = scene.params.canvas();
        if canvas.width == 0 || canvas.height == 0 {
            return Err(NotefallError::resource_init("zero-sized surface"));
        }
        Ok(Self {
            surface: vec![0.0; canvas.rgb_len()],
            scene,
            rendered: false,
        })
    }

    fn composite(&mut self, quads: &[RasterQuad]) {
        let canvas = self.scene.params.canvas();
        let width = canvas.width as usize;
        let height = canvas.height;
        let row_len = width * 3;

        self.surface
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(row, out)| {
                // Surface rows are bottom-origin; pixel math is top-origin.
                let y = height - 1 - row as u32;
                let py = y as f32 + 0.5;
                for q in quads {
                    if !q.overlaps_row(py) {
                        continue;
                    }
                    let cx = q.x0 + q.w / 2.0;
                    let cy = q.y0 + q.h / 2.0;
                    let half = [q.w / 2.0, q.h / 2.0];
                    let x_start = q.x0.floor().max(0.0) as usize;
                    let x_end = ((q.x0 + q.w).ceil() as usize).min(width);
                    for x in x_start..x_end {
                        let px = x as f32 + 0.5;
                        let coverage =
                            corner_coverage([(px - cx).abs(), (py - cy).abs()], half, q.radius);
                        if coverage <= 0.0 {
                            continue;
                        }
                        let a = q.alpha * coverage;
                        let i = x * 3;
                        out[i] += q.color[0] * a;
                        out[i + 1] += q.color[1] * a;
                        out[i + 2] += q.color[2] * a;
                    }
                }
            });
    }
}

impl RenderContext for CpuContext {
    fn canvas(&self) -> Canvas {
        self.scene.params.canvas()
    }

    fn render_frame(&mut self, time: f64) -> NotefallResult<()> {
        let canvas = self.canvas();
        self.surface.fill(0.0);

        let mut quads: Vec<RasterQuad> = self
            .scene
            .statics
            .iter()
            .map(|s: &StaticQuad| RasterQuad::from_ndc(s.rect, s.size_pixels, s.color, 1.0, 0.0, canvas))
            .collect();
        quads.extend(
            visible_quads(&self.scene.instances, time as f32, &self.scene.params)
                .iter()
                .map(|q| {
                    RasterQuad::from_ndc(
                        q.rect,
                        q.size_pixels,
                        q.color,
                        q.alpha,
                        self.scene.params.corner_radius,
                        canvas,
                    )
                }),
        );

        self.composite(&quads);
        self.rendered = true;
        Ok(())
    }

    fn read_frame(&mut self) -> NotefallResult<FrameRgb> {
        if !self.rendered {
            return Err(NotefallError::resource_init(
                "read_frame called before render_frame",
            ));
        }
        let canvas = self.canvas();
        let row_len = canvas.width as usize * 3;
        let mut data = Vec::with_capacity(canvas.rgb_len());
        // Vertical flip: surface row 0 is the bottom scanline.
        for row in self.surface.chunks_exact(row_len).rev() {
            data.extend(row.iter().map(|&v| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8));
        }
        let frame = FrameRgb {
            width: canvas.width,
            height: canvas.height,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;

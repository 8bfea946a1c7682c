// Depth layering for camera-facing 2D planes.
//
// Planes are authored in viewport pixels at z = 0 (x right, y up, origin at the
// viewport center). `place_at_depth` pushes a plane away from the camera and
// scales it so that, under the fixed vertical FOV, it projects back onto exactly
// the same pixels. Layer indices only pick the depth, which fixes draw order.

use crate::config::RenderConfig;
use crate::error::LayerError;

/// A camera-facing rectangle: `width` x `height` geometry, then scaled and moved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub width: f32,
    pub height: f32,
    pub scale: [f32; 3],
    pub position: [f32; 3],
}

impl Plane {
    /// Full-viewport plane.
    pub fn viewport(width: usize, height: usize) -> Self {
        Self { width: width as f32, height: height as f32, scale: [1.0; 3], position: [0.0; 3] }
    }

    /// `size` x `size` square centered at (x, y).
    pub fn square(size: f32, x: f32, y: f32) -> Self {
        Self { width: 1.0, height: 1.0, scale: [size, size, 1.0], position: [x, y, 0.0] }
    }

    /// Camera-space depth (distance in front of the camera).
    pub fn depth(&self) -> f32 {
        -self.position[2]
    }
}

/// Pixel rectangle a plane covers, in fractional screen coordinates (y down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

#[derive(Clone, Debug)]
pub struct PerspectiveLayering {
    viewport_width: f32,
    viewport_height: f32,
    tan_half_fov: f32,
    near: f32,
    far: f32,
    num_layers_upper_bound: i32,
}

impl PerspectiveLayering {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            viewport_width: config.viewport_width as f32,
            viewport_height: config.viewport_height as f32,
            tan_half_fov: (config.vertical_fov.to_radians() / 2.0).tan(),
            near: config.near,
            far: config.far,
            num_layers_upper_bound: config.num_layers_upper_bound,
        }
    }

    /// Depth of layer `index`; negative indices count back from the far plane.
    /// Depths lie strictly inside (near, far) and grow with the normalized index.
    pub fn depth_for_layer(&self, index: i32) -> Result<f32, LayerError> {
        let bound = self.num_layers_upper_bound;
        if index >= bound || index < -bound {
            return Err(LayerError { index, bound });
        }
        let normalized = if index < 0 { index + bound } else { index };
        let segment = (self.far - self.near) / (bound + 1) as f32;
        Ok(self.near + segment * (normalized + 1) as f32)
    }

    /// Move a z = 0 plane to `depth`, scaled so it keeps its on-screen pixel size.
    pub fn place_at_depth(&self, plane: Plane, depth: f32) -> Plane {
        let s = 2.0 * depth * self.tan_half_fov / self.viewport_height;
        let [sx, sy, sz] = plane.scale;
        let [px, py, pz] = plane.position;
        Plane {
            scale: [sx * s, sy * s, sz * s],
            position: [px * s, py * s, pz * s - depth],
            ..plane
        }
    }

    /// Project a camera-space point to fractional screen pixels (y down).
    /// `None` for points at or behind the camera.
    pub fn project(&self, x: f32, y: f32, z: f32) -> Option<(f32, f32)> {
        let w = -z;
        if w <= 0.0 {
            return None;
        }
        let aspect = self.viewport_width / self.viewport_height;
        let ndc_x = x / (w * self.tan_half_fov * aspect);
        let ndc_y = y / (w * self.tan_half_fov);
        Some((
            (ndc_x + 1.0) * 0.5 * self.viewport_width,
            (1.0 - ndc_y) * 0.5 * self.viewport_height,
        ))
    }

    /// Screen rectangle covered by a placed plane. `None` when it lies outside
    /// the near/far range or behind the camera.
    pub fn screen_rect(&self, plane: &Plane) -> Option<ScreenRect> {
        let depth = plane.depth();
        if depth < self.near || depth > self.far {
            return None;
        }
        let hw = plane.width * plane.scale[0] * 0.5;
        let hh = plane.height * plane.scale[1] * 0.5;
        let [px, py, pz] = plane.position;
        let (x0, y0) = self.project(px - hw, py + hh, pz)?;
        let (x1, y1) = self.project(px + hw, py - hh, pz)?;
        Some(ScreenRect { x0, y0, x1, y1 })
    }
}

use crate::{
    raymarch::{march_ray, MarchSettings},
    spatial::{math::vector::V3c, raytracing::Ray, FLOAT_ERROR_TOLERANCE},
    transfer::{Albedo, TransferRange, TransferTable},
    volume::VolumeHierarchy,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// A pinhole camera in the index space of the volume
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Viewport {
    pub origin: V3c<f32>,
    pub direction: V3c<f32>,
    /// width, height of the image plane and its distance from the origin
    pub w_h_fov: V3c<f32>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            origin: V3c::unit(0.),
            direction: V3c::new(0., 0., -1.),
            w_h_fov: V3c::new(1.5, 1., 1.),
        }
    }
}

impl Viewport {
    /// Right and up vectors of the image plane, perpendicular to the view direction
    fn plane_axes(&self) -> (V3c<f32>, V3c<f32>) {
        let direction = self.direction.normalized();
        let mut up = V3c::new(0., 1., 0.);
        if direction.cross(up).length() < FLOAT_ERROR_TOLERANCE {
            // looking straight up or down
            up = V3c::new(0., 0., 1.);
        }
        let right = direction.cross(up).normalized();
        (right, right.cross(direction))
    }

    /// The ray going through the center of the given pixel, row 0 being the top of the image.
    /// The pixel must be inside the resolution.
    pub fn ray_for_pixel(&self, x: u32, y: u32, resolution: [u32; 2]) -> Ray {
        debug_assert!(x < resolution[0] && y < resolution[1]);
        let (right, up) = self.plane_axes();
        let pixel_width = self.w_h_fov.x / resolution[0] as f32;
        let pixel_height = self.w_h_fov.y / resolution[1] as f32;
        let bottom_left = self.origin + (self.direction.normalized() * self.w_h_fov.z)
            - (up * (self.w_h_fov.y / 2.))
            - (right * (self.w_h_fov.x / 2.));
        let glass_point = bottom_left
            + right * ((x as f32 + 0.5) * pixel_width)
            + up * (((resolution[1] - y - 1) as f32 + 0.5) * pixel_height);
        Ray {
            origin: self.origin,
            direction: (glass_point - self.origin).normalized(),
        }
    }
}

/// Renders the volume into a row-major image of the given resolution [width, height].
/// Every pixel is an independent march, executed in parallel with the `parallel` feature.
pub fn render<V: VolumeHierarchy + Sync>(
    volume: &V,
    viewport: &Viewport,
    resolution: [u32; 2],
    table: &TransferTable,
    range: &TransferRange,
    settings: &MarchSettings,
) -> Vec<Albedo> {
    let pixel_count = resolution[0] as usize * resolution[1] as usize;
    let render_pixel = |i: usize| {
        let x = (i % resolution[0] as usize) as u32;
        let y = (i / resolution[0] as usize) as u32;
        march_ray(
            volume,
            &viewport.ray_for_pixel(x, y, resolution),
            table,
            range,
            settings,
        )
        .color
    };

    #[cfg(feature = "parallel")]
    let image: Vec<Albedo> = (0..pixel_count).into_par_iter().map(render_pixel).collect();
    #[cfg(not(feature = "parallel"))]
    let image: Vec<Albedo> = (0..pixel_count).map(render_pixel).collect();

    log::debug!("Rendered {}x{} image", resolution[0], resolution[1]);
    image
}

use std::f64::consts::PI;

use crate::error::LayoutError;
use crate::state::VirtualNode;

/// Where one vnode lands on the ring, in the same coordinate space as the
/// center passed to [`layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct RingPoint {
    pub server_ref: String,
    pub x: f64,
    pub y: f64,
    pub angle_degrees: f64,
    /// `false` when the angle was spread evenly because the payload had none.
    pub explicit_angle: bool,
}

/// Places vnodes on a circle of `radius` around `(center_x, center_y)`.
///
/// Vnodes either all carry an angle or none do. Without angles, the `i`th
/// vnode of `n` sits at `i * 2π / n` in input order.
pub fn layout(
    vnodes: &[VirtualNode],
    radius: f64,
    center_x: f64,
    center_y: f64,
) -> Result<Vec<RingPoint>, LayoutError> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(LayoutError::InvalidRadius(radius));
    }

    let with_angle = vnodes.iter().filter(|v| v.angle_degrees.is_some()).count();
    let without_angle = vnodes.len() - with_angle;
    if with_angle > 0 && without_angle > 0 {
        return Err(LayoutError::MixedAngles {
            with_angle,
            without_angle,
        });
    }

    let step = if vnodes.is_empty() { 0.0 } else { 2.0 * PI / vnodes.len() as f64 };
    let points = vnodes
        .iter()
        .enumerate()
        .map(|(i, vnode)| {
            let theta = match vnode.angle_degrees {
                Some(deg) => deg.to_radians(),
                None => i as f64 * step,
            };
            RingPoint {
                server_ref: vnode.server_ref.clone(),
                x: center_x + radius * theta.cos(),
                y: center_y + radius * theta.sin(),
                angle_degrees: vnode.angle_degrees.unwrap_or_else(|| theta.to_degrees()),
                explicit_angle: vnode.angle_degrees.is_some(),
            }
        })
        .collect();
    Ok(points)
}

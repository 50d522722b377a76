/*!
Dual-camera position recovery.

Two cameras sit at the ends of a unit baseline, camera 1 at (0, 0) and camera 2
at (1, 0). Each reports the horizontal centroid of the lit spot it sees; the
models below turn the two centroids into a plane position. The numeric
constants are empirical calibration data and are kept as found.
*/

use std::f64::consts::{FRAC_PI_2, PI};

use serde::Serialize;

/// Side of the square used by the fixed-geometry models
const BASELINE: f64 = 452.548;

/// Centroid span of a camera frame
const FRAME_SPAN: f64 = 640.0;

/// Camera 1 linear angle calibration: (offset, span)
const CAMERA1_CALIBRATION: (f64, f64) = (67.0, 489.0);

/// Camera 2 linear angle calibration: (offset, span)
const CAMERA2_CALIBRATION: (f64, f64) = (85.0, 487.0);

/// Field of view covered by a calibrated span, in degrees
const CALIBRATED_FOV_DEG: f64 = 87.431;

/// Calibration points of the lookup model: 4 rows of 4 (c1, c2) pairs
const LOOKUP_GRID: [i32; 32] = [
    555, 568, 96, 552, 75, 541, 69, 82, //
    559, 496, 286, 456, 183, 350, 141, 80, //
    559, 428, 348, 367, 271, 253, 210, 80, //
    557, 371, 434, 304, 334, 205, 267, 82,
];

/// Geometric model used to turn a centroid pair into a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriangulationModel {
    /// Closed-form quadratic on the projected centroids
    Quadratic = 1,
    /// Angles from projections onto a fixed square, then law of sines
    ProjectedAngles = 2,
    /// Intersection of the two camera rays
    RayIntersection = 3,
    /// Nearest calibration point of a fixed grid
    NearestGridPoint = 4,
    /// Linear per-camera angle calibration, then law of sines
    CalibratedAngles = 5,
    /// Angles as fractions of a right angle, then law of sines
    RightAngleFraction = 6,
}

impl TriangulationModel {
    /// Model selected by a parameter value; unknown values select the default
    pub fn from_param(value: u32) -> Self {
        match value {
            1 => Self::Quadratic,
            2 => Self::ProjectedAngles,
            3 => Self::RayIntersection,
            4 => Self::NearestGridPoint,
            6 => Self::RightAngleFraction,
            _ => Self::CalibratedAngles,
        }
    }
}

impl Default for TriangulationModel {
    fn default() -> Self {
        Self::CalibratedAngles
    }
}

/// Result of a triangulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Triangulation {
    pub x: f64,
    pub y: f64,
    /// Camera angles in degrees, for the angle-based models
    pub angles: Option<(f64, f64)>,
}

impl Triangulation {
    fn position(x: f64, y: f64) -> Self {
        Self { x, y, angles: None }
    }
}

/// Triangulate a centroid pair. Both centroids must be positive; results
/// that are not finite (degenerate geometry) yield `None`.
pub fn triangulate(model: TriangulationModel, c1: u32, c2: u32) -> Option<Triangulation> {
    if c1 == 0 || c2 == 0 {
        return None;
    }
    let (c1, c2) = (f64::from(c1), f64::from(c2));

    let result = match model {
        TriangulationModel::Quadratic => quadratic(c1, c2),
        TriangulationModel::ProjectedAngles => projected_angles(c1, c2),
        TriangulationModel::RayIntersection => ray_intersection(c1, c2),
        TriangulationModel::NearestGridPoint => nearest_grid_point(c1, c2),
        TriangulationModel::CalibratedAngles => calibrated_angles(c1, c2),
        TriangulationModel::RightAngleFraction => right_angle_fraction(c1, c2),
    };

    if result.x.is_finite() && result.y.is_finite() {
        Some(result)
    } else {
        None
    }
}

/// Law of sines on the unit baseline: returns the position seen at angle
/// `alpha` from camera 1 when camera 2 sees it at `beta` (radians).
fn law_of_sines(alpha: f64, beta: f64) -> (f64, f64) {
    let gamma = PI - alpha - beta;
    let radius = beta.sin() / gamma.sin();
    (radius * alpha.cos(), radius * alpha.sin())
}

fn with_angles(alpha: f64, beta: f64) -> Triangulation {
    let (x, y) = law_of_sines(alpha, beta);
    Triangulation {
        x,
        y,
        angles: Some((alpha.to_degrees(), beta.to_degrees())),
    }
}

fn quadratic(c1: f64, c2: f64) -> Triangulation {
    let x1p = c1;
    let x2p = c2 - FRAME_SPAN / 2.0;

    let a = 1.0;
    let b = -x2p + FRAME_SPAN / 2.0;
    let c = -x1p * x2p;

    let x = (b - (b * b - 4.0 * a * c).sqrt()) / (2.0 * a);
    Triangulation::position(x, x / x2p)
}

/// Angle between the square's left edge and the projection of `centroid`
/// onto its diagonal
fn edge_angle(centroid: f64) -> f64 {
    let base = (0.0, BASELINE);
    let factor = centroid / FRAME_SPAN;
    let projected = (BASELINE * factor - base.0, BASELINE * factor - base.1);

    let dot = base.0 * projected.0 + base.1 * projected.1;
    let norms = (base.0.hypot(base.1)) * (projected.0.hypot(projected.1));
    (dot / norms).acos()
}

fn projected_angles(c1: f64, c2: f64) -> Triangulation {
    let alpha = PI - edge_angle(c1);
    let beta = edge_angle(c2) - FRAC_PI_2;
    with_angles(alpha, beta)
}

/// Unit direction from the origin to the point `factor` along `from -> to`
fn ray(from: (f64, f64), to: (f64, f64), factor: f64) -> (f64, f64) {
    let point = (
        from.0 + (to.0 - from.0) * factor,
        from.1 + (to.1 - from.1) * factor,
    );
    let norm = point.0.hypot(point.1);
    (point.0 / norm, point.1 / norm)
}

fn ray_intersection(c1: f64, c2: f64) -> Triangulation {
    let ray_a = ray((BASELINE, 0.0), (0.0, BASELINE), c1 / FRAME_SPAN);
    let ray_b = ray((0.0, BASELINE), (-BASELINE, 0.0), c2 / FRAME_SPAN);
    let slope_a = ray_a.1 / ray_a.0;
    let slope_b = ray_b.1 / ray_b.0;

    // Camera 1 at (0, 0), camera 2 at (1, 0)
    let x = -slope_b / (slope_a - slope_b);
    Triangulation::position(x, slope_a * x)
}

fn nearest_grid_point(c1: f64, c2: f64) -> Triangulation {
    let mut best = f64::MAX;
    let mut position = (0.0, 0.0);

    for i in 0..4 {
        for j in 0..4 {
            let index = i * 2 + j * 8;
            let dx = f64::from(LOOKUP_GRID[index]) - c1;
            let dy = f64::from(LOOKUP_GRID[index + 1]) - c2;
            let dist = dx.hypot(dy);
            if dist < best {
                best = dist;
                position = (i as f64 / 3.0, j as f64 / 3.0);
            }
        }
    }

    Triangulation::position(position.0, position.1)
}

fn calibrated_angles(c1: f64, c2: f64) -> Triangulation {
    let angle1 = (c1 - CAMERA1_CALIBRATION.0) * CALIBRATED_FOV_DEG / CAMERA1_CALIBRATION.1;
    let angle2 = (c2 - CAMERA2_CALIBRATION.0) * CALIBRATED_FOV_DEG / CAMERA2_CALIBRATION.1;

    let alpha = angle1.to_radians();
    let beta = (90.0 - angle2).to_radians();
    with_angles(alpha, beta)
}

fn right_angle_fraction(c1: f64, c2: f64) -> Triangulation {
    let alpha = FRAC_PI_2 * (c1 / FRAME_SPAN);
    let beta = FRAC_PI_2 - FRAC_PI_2 * (c2 / FRAME_SPAN);
    with_angles(alpha, beta)
}

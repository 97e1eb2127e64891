//! 3D gain surface, painted with egui primitives.
//!
//! The surface radius is the (normalized) total gain per direction, the
//! fill color follows the gain through a colorgrad preset. Rendering is a
//! simple painter's algorithm over the grid cells: project all vertices,
//! sort the cell quads far to near, fill them as convex polygons. For a
//! 19x37 grid that is well within an immediate-mode frame budget.

use colorgrad::Gradient;
use egui::{
    Color32,
    Pos2,
    Rect,
    Sense,
    Shape,
    Stroke,
};
use nalgebra::{
    Isometry3,
    Matrix4,
    Perspective3,
    Point3,
    Vector3,
};

use awb_engine::RadiationPattern;

use crate::config::PlotConfig;

const MIN_DISTANCE: f32 = 1.5;
const MAX_DISTANCE: f32 = 12.0;

pub struct PatternView {
    yaw: f32,
    pitch: f32,
    distance: f32,
    fovy_deg: f32,
    gradient: Box<dyn Gradient>,
}

impl std::fmt::Debug for PatternView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternView")
            .field("yaw", &self.yaw)
            .field("pitch", &self.pitch)
            .field("distance", &self.distance)
            .finish_non_exhaustive()
    }
}

impl PatternView {
    pub fn new(config: &PlotConfig) -> Self {
        Self {
            yaw: 0.6,
            pitch: 0.4,
            distance: 3.0,
            fovy_deg: config.fovy,
            gradient: gradient_by_name(&config.gradient),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, pattern: &RadiationPattern) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::drag());
        let rect = response.rect;

        if response.dragged() {
            let delta = response.drag_delta();
            self.yaw -= delta.x * 0.01;
            self.pitch = (self.pitch + delta.y * 0.01).clamp(-1.5, 1.5);
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.smooth_scroll_delta.y);
            if scroll != 0.0 {
                self.distance =
                    (self.distance * (1.0 - scroll * 0.002)).clamp(MIN_DISTANCE, MAX_DISTANCE);
            }
        }

        painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);

        let eye = Point3::new(
            self.distance * self.pitch.cos() * self.yaw.cos(),
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
        );
        let view = Isometry3::look_at_rh(&eye, &Point3::origin(), &Vector3::z());
        let projection = Perspective3::new(
            rect.width() / rect.height().max(1.0),
            self.fovy_deg.to_radians(),
            0.1,
            100.0,
        );
        let view_projection = projection.as_matrix() * view.to_homogeneous();

        let grid = &pattern.grid;
        let surface = &pattern.surface;

        let max_gain = grid.max_gain();
        let min_gain = grid.min_gain();
        let gain_span = (max_gain - min_gain).max(f64::EPSILON);
        // normalize so the surface fits in the unit sphere
        let scale = if max_gain > 0.0 {
            1.0 / max_gain as f32
        }
        else {
            1.0
        };

        let vertices: Vec<Option<(Pos2, f32)>> = surface
            .points()
            .iter()
            .map(|point| {
                let point = Point3::new(
                    point.x as f32 * scale,
                    point.y as f32 * scale,
                    point.z as f32 * scale,
                );
                project(&view_projection, &view, &point, rect)
            })
            .collect();

        let theta_len = surface.theta_len();
        let phi_len = surface.phi_len();
        let mut quads: Vec<(f32, [Pos2; 4], Color32)> =
            Vec::with_capacity(theta_len.saturating_sub(1) * phi_len.saturating_sub(1));

        for theta_index in 0..theta_len.saturating_sub(1) {
            for phi_index in 0..phi_len.saturating_sub(1) {
                let corner_indices = [
                    theta_index * phi_len + phi_index,
                    theta_index * phi_len + phi_index + 1,
                    (theta_index + 1) * phi_len + phi_index + 1,
                    (theta_index + 1) * phi_len + phi_index,
                ];

                let Some(corners) = corner_indices
                    .iter()
                    .map(|index| vertices[*index])
                    .collect::<Option<Vec<_>>>()
                else {
                    continue;
                };

                let depth = corners.iter().map(|(_, depth)| depth).sum::<f32>() / 4.0;

                let gain = (grid.gain(theta_index, phi_index)
                    + grid.gain(theta_index, phi_index + 1)
                    + grid.gain(theta_index + 1, phi_index + 1)
                    + grid.gain(theta_index + 1, phi_index))
                    / 4.0;
                let t = ((gain - min_gain) / gain_span) as f32;
                let [r, g, b, _] = self.gradient.at(t).to_rgba8();

                quads.push((
                    depth,
                    [corners[0].0, corners[1].0, corners[2].0, corners[3].0],
                    Color32::from_rgb(r, g, b),
                ));
            }
        }

        // painter's algorithm: far cells first
        quads.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, corners, color) in quads {
            painter.add(Shape::convex_polygon(
                corners.to_vec(),
                color,
                Stroke::NONE,
            ));
        }

        painter.text(
            rect.left_top() + egui::vec2(8.0, 8.0),
            egui::Align2::LEFT_TOP,
            format!(
                "{:.3} GHz, peak gain {:.2}",
                pattern.frequency_ghz, max_gain
            ),
            egui::FontId::monospace(12.0),
            ui.visuals().text_color(),
        );
    }
}

/// Projects a world-space point into screen coordinates. `None` if the
/// point lands behind the camera. The second value is the distance from
/// the eye, for depth sorting.
fn project(
    view_projection: &Matrix4<f32>,
    view: &Isometry3<f32>,
    point: &Point3<f32>,
    rect: Rect,
) -> Option<(Pos2, f32)> {
    let clip = view_projection * point.to_homogeneous();
    if clip.w <= 0.0 {
        return None;
    }

    let ndc = clip.xyz() / clip.w;
    let screen = Pos2::new(
        rect.center().x + ndc.x * rect.width() / 2.0,
        rect.center().y - ndc.y * rect.height() / 2.0,
    );

    Some((screen, -view.transform_point(point).z))
}

fn gradient_by_name(name: &str) -> Box<dyn Gradient> {
    match name {
        "turbo" => Box::new(colorgrad::preset::turbo()),
        "plasma" => Box::new(colorgrad::preset::plasma()),
        "inferno" => Box::new(colorgrad::preset::inferno()),
        "magma" => Box::new(colorgrad::preset::magma()),
        "rainbow" => Box::new(colorgrad::preset::rainbow()),
        "viridis" => Box::new(colorgrad::preset::viridis()),
        other => {
            tracing::warn!(gradient = other, "unknown gradient preset, using viridis");
            Box::new(colorgrad::preset::viridis())
        }
    }
}

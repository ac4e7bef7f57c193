use glam::Vec2;

#[derive(Debug, Clone)]
pub struct Camera2D {
    pub position: Vec2,
    zoom: f32,
    zoom_limits: (f32, f32),
}

impl Camera2D {
    pub fn new(zoom_min: f32, zoom_max: f32) -> Self {
        let mut camera = Self { position: Vec2::ZERO, zoom: 1.0, zoom_limits: (0.25, 5.0) };
        camera.set_zoom_limits(zoom_min, zoom_max);
        camera
    }

    pub fn set_zoom_limits(&mut self, min: f32, max: f32) {
        if min > 0.0 && max > min {
            self.zoom_limits = (min, max);
        }
        self.zoom = self.zoom.clamp(self.zoom_limits.0, self.zoom_limits.1);
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.zoom_limits.0, self.zoom_limits.1);
    }

    pub fn set_position(&mut self, x: Option<f32>, y: Option<f32>) {
        if let Some(x) = x {
            self.position.x = x;
        }
        if let Some(y) = y {
            self.position.y = y;
        }
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(0.25, 5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_components_are_preserved() {
        let mut camera = Camera2D::default();
        camera.set_position(Some(4.0), Some(8.0));
        camera.set_position(None, Some(-2.0));
        assert_eq!(camera.position, Vec2::new(4.0, -2.0));
    }

    #[test]
    fn zoom_is_clamped_to_limits() {
        let mut camera = Camera2D::new(0.5, 2.0);
        camera.set_zoom(10.0);
        assert_eq!(camera.zoom(), 2.0);
        camera.set_zoom(0.0);
        assert_eq!(camera.zoom(), 0.5);
    }
}

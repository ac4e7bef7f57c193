use glam::Vec2;
use rapier2d::prelude::{ColliderHandle, SharedShape};

const MIN_EXTENT: f32 = 1.0e-3;

pub const RECTANGLE_CODE: i64 = 1;
pub const CIRCLE_CODE: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Rectangle { width: f32, height: f32 },
    Circle { radius: f32 },
}

/// A named collision shape on a world object. Dimensions are unscaled; the owning object's
/// scale is mirrored into `scale` and applied when the collider is built.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingShape {
    kind: ShapeKind,
    offset: Vec2,
    scale: f32,
    collider: Option<ColliderHandle>,
}

impl BoundingShape {
    pub fn rectangle(width: f32, height: f32) -> Self {
        Self { kind: ShapeKind::Rectangle { width, height }, offset: Vec2::ZERO, scale: 1.0, collider: None }
    }

    pub fn circle(radius: f32) -> Self {
        Self { kind: ShapeKind::Circle { radius }, offset: Vec2::ZERO, scale: 1.0, collider: None }
    }

    /// Any code other than the rectangle code yields a circle.
    pub fn from_code(code: i64) -> Self {
        match code {
            RECTANGLE_CODE => Self::rectangle(1.0, 1.0),
            _ => Self::circle(0.5),
        }
    }

    pub fn type_code(&self) -> i64 {
        match self.kind {
            ShapeKind::Rectangle { .. } => RECTANGLE_CODE,
            ShapeKind::Circle { .. } => CIRCLE_CODE,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn dimensions(&self) -> Vec2 {
        match self.kind {
            ShapeKind::Rectangle { width, height } => Vec2::new(width, height),
            ShapeKind::Circle { radius } => Vec2::splat(radius * 2.0),
        }
    }

    /// Resizes a rectangle. Returns false for circles.
    pub fn set_dimensions(&mut self, width: f32, height: f32) -> bool {
        match &mut self.kind {
            ShapeKind::Rectangle { width: w, height: h } => {
                *w = width.max(0.0);
                *h = height.max(0.0);
                true
            }
            ShapeKind::Circle { .. } => false,
        }
    }

    pub fn radius(&self) -> Option<f32> {
        match self.kind {
            ShapeKind::Circle { radius } => Some(radius),
            ShapeKind::Rectangle { .. } => None,
        }
    }

    pub fn set_radius(&mut self, radius: f32) -> bool {
        match &mut self.kind {
            ShapeKind::Circle { radius: r } => {
                *r = radius.max(0.0);
                true
            }
            ShapeKind::Rectangle { .. } => false,
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.max(0.0);
    }

    pub fn collider(&self) -> Option<ColliderHandle> {
        self.collider
    }

    pub fn set_collider(&mut self, collider: Option<ColliderHandle>) {
        self.collider = collider;
    }

    pub fn scaled_kind(&self) -> ShapeKind {
        match self.kind {
            ShapeKind::Rectangle { width, height } => {
                ShapeKind::Rectangle { width: width * self.scale, height: height * self.scale }
            }
            ShapeKind::Circle { radius } => ShapeKind::Circle { radius: radius * self.scale },
        }
    }

    pub fn scaled_offset(&self) -> Vec2 {
        self.offset * self.scale
    }

    /// Collider geometry with scale applied. Degenerate sizes are clamped to a sliver so the
    /// physics backend always gets a valid shape.
    pub fn physics_shape(&self) -> SharedShape {
        match self.scaled_kind() {
            ShapeKind::Rectangle { width, height } => {
                SharedShape::cuboid((width * 0.5).max(MIN_EXTENT), (height * 0.5).max(MIN_EXTENT))
            }
            ShapeKind::Circle { radius } => SharedShape::ball(radius.max(MIN_EXTENT)),
        }
    }
}

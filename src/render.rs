use glam::Vec2;

use crate::animation::AnimationData;
use crate::overworld::bounds::ShapeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderLayer {
    Overworld,
    Ui,
}

/// Drawing backend for a frame. The engine only decides what is drawn and in which order.
pub trait RenderSink {
    fn begin_layer(&mut self, layer: RenderLayer, camera: Vec2, zoom: f32);

    fn draw_animation(&mut self, animation: &AnimationData, frame: u32, position: Vec2, scale: f32, rotation: f32);

    fn draw_hitbox(&mut self, _shape: ShapeKind, _position: Vec2, _rotation: f32) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Layer { layer: RenderLayer, camera: Vec2, zoom: f32 },
    Animation { set: String, name: String, frame: u32, position: Vec2, scale: f32, rotation: f32 },
    Hitbox { shape: ShapeKind, position: Vec2, rotation: f32 },
}

/// Recording sink used by the headless runner and tests.
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn animation_names(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Animation { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn hitbox_count(&self) -> usize {
        self.commands.iter().filter(|command| matches!(command, DrawCommand::Hitbox { .. })).count()
    }
}

impl RenderSink for DrawList {
    fn begin_layer(&mut self, layer: RenderLayer, camera: Vec2, zoom: f32) {
        self.commands.push(DrawCommand::Layer { layer, camera, zoom });
    }

    fn draw_animation(&mut self, animation: &AnimationData, frame: u32, position: Vec2, scale: f32, rotation: f32) {
        self.commands.push(DrawCommand::Animation {
            set: animation.set().to_string(),
            name: animation.name().to_string(),
            frame,
            position,
            scale,
            rotation,
        });
    }

    fn draw_hitbox(&mut self, shape: ShapeKind, position: Vec2, rotation: f32) {
        self.commands.push(DrawCommand::Hitbox { shape, position, rotation });
    }
}

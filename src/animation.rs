/// Opaque animation handle stored in world-object slots. Frame selection is driven by the
/// environment clock; drawing belongs to the render sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationData {
    set: String,
    name: String,
    frame_count: u32,
    frame_time: f32,
    looping: bool,
    started_at: f64,
}

impl AnimationData {
    pub fn new(set: impl Into<String>, name: impl Into<String>) -> Self {
        Self { set: set.into(), name: name.into(), frame_count: 1, frame_time: 0.1, looping: true, started_at: 0.0 }
    }

    pub fn with_frames(mut self, frame_count: u32, frame_time: f32) -> Self {
        self.frame_count = frame_count.max(1);
        self.frame_time = if frame_time > 0.0 { frame_time } else { 0.1 };
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn started_at(mut self, clock: f64) -> Self {
        self.started_at = clock;
        self
    }

    pub fn set(&self) -> &str {
        &self.set
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn frame_at(&self, clock: f64) -> u32 {
        let elapsed = (clock - self.started_at).max(0.0);
        let index = (elapsed / self.frame_time as f64).floor() as u64;
        if self.looping {
            (index % self.frame_count as u64) as u32
        } else {
            index.min(self.frame_count as u64 - 1) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looping_animation_wraps() {
        let anim = AnimationData::new("kris", "walk_down").with_frames(4, 0.25);
        assert_eq!(anim.frame_at(0.0), 0);
        assert_eq!(anim.frame_at(0.6), 2);
        assert_eq!(anim.frame_at(1.1), 0);
    }

    #[test]
    fn one_shot_animation_holds_last_frame() {
        let anim = AnimationData::new("fx", "burst").with_frames(3, 0.1).looping(false).started_at(2.0);
        assert_eq!(anim.frame_at(1.0), 0, "frames before the start clamp to zero");
        assert_eq!(anim.frame_at(10.0), 2);
    }
}

use mlua::Table;

use crate::camera::Camera2D;
use crate::error::EngineError;
use crate::scripting::bridge::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Stable,
    Exiting,
    Swapping,
    Entering,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSwap {
    pub target: Handle,
    pub exitpoint: Option<String>,
    pub entrypoint: Option<String>,
    pub transitions: bool,
}

#[derive(Debug)]
pub enum TransitionPlan {
    /// Queue the exit task; the swap happens when it finishes.
    Exit { task: Table, from: Handle },
    Swap(PendingSwap),
}

/// Camera, current room, and the room-transition state machine.
#[derive(Debug)]
pub struct OverworldController {
    current_room: Option<Handle>,
    pub camera: Camera2D,
    rendering: bool,
    processing: bool,
    rendering_hitboxes: bool,
    camera_fixing: bool,
    character: Option<Handle>,
    entry_transition: Option<Table>,
    exit_transition: Option<Table>,
    phase: TransitionPhase,
    pending: Option<PendingSwap>,
}

impl OverworldController {
    pub fn new(camera: Camera2D) -> Self {
        Self {
            current_room: None,
            camera,
            rendering: true,
            processing: true,
            rendering_hitboxes: false,
            camera_fixing: false,
            character: None,
            entry_transition: None,
            exit_transition: None,
            phase: TransitionPhase::Stable,
            pending: None,
        }
    }

    pub fn current_room(&self) -> Option<Handle> {
        self.current_room
    }

    pub(crate) fn set_current(&mut self, room: Handle) {
        self.current_room = Some(room);
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    pub fn set_rendering(&mut self, value: bool) {
        self.rendering = value;
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn set_processing(&mut self, value: bool) {
        self.processing = value;
    }

    pub fn is_rendering_hitboxes(&self) -> bool {
        self.rendering_hitboxes
    }

    pub fn set_rendering_hitboxes(&mut self, value: bool) {
        self.rendering_hitboxes = value;
    }

    pub fn is_camera_fixing(&self) -> bool {
        self.camera_fixing
    }

    pub fn set_camera_fixing(&mut self, value: bool) {
        self.camera_fixing = value;
    }

    pub fn character(&self) -> Option<Handle> {
        self.character
    }

    pub fn set_character(&mut self, character: Option<Handle>) {
        self.character = character;
    }

    pub fn set_entry_transition(&mut self, task: Option<Table>) {
        self.entry_transition = task;
    }

    pub fn set_exit_transition(&mut self, task: Option<Table>) {
        self.exit_transition = task;
    }

    /// Starts a room change. Fails with a state conflict while another change is in flight.
    pub fn begin(&mut self, swap: PendingSwap) -> Result<TransitionPlan, EngineError> {
        if self.phase != TransitionPhase::Stable {
            return Err(EngineError::StateConflict(format!(
                "cannot switch to room #{} while a room transition is in progress",
                swap.target
            )));
        }
        match (swap.transitions, self.current_room, self.exit_transition.clone()) {
            (true, Some(from), Some(task)) => {
                self.phase = TransitionPhase::Exiting;
                self.pending = Some(swap);
                Ok(TransitionPlan::Exit { task, from })
            }
            _ => {
                self.phase = TransitionPhase::Swapping;
                Ok(TransitionPlan::Swap(swap))
            }
        }
    }

    /// Called when the exit task finishes; hands back the swap it was guarding.
    pub fn finish_exit(&mut self) -> Option<PendingSwap> {
        if self.phase != TransitionPhase::Exiting {
            return None;
        }
        self.phase = TransitionPhase::Swapping;
        self.pending.take()
    }

    /// Settles the phase after a swap. Returns the entry task to queue, if any.
    pub fn after_swap(&mut self, transitions: bool) -> Option<Table> {
        match (transitions, self.entry_transition.clone()) {
            (true, Some(task)) => {
                self.phase = TransitionPhase::Entering;
                Some(task)
            }
            _ => {
                self.phase = TransitionPhase::Stable;
                None
            }
        }
    }

    /// Drops back to stable after a swap that could not complete.
    pub(crate) fn abort(&mut self) {
        self.phase = TransitionPhase::Stable;
        self.pending = None;
    }

    pub fn finish_entry(&mut self) -> bool {
        if self.phase != TransitionPhase::Entering {
            return false;
        }
        self.phase = TransitionPhase::Stable;
        true
    }
}

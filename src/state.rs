//! Centralized editor state with context passing pattern
//!
//! `SceneState` owns every loaded mesh, the playback clock, the current
//! selection and the editor config. Core logic takes it by reference and is
//! unit-testable; the wasm bindings reach the single live instance through
//! `with_scene` / `with_scene_mut` and nothing else.

use std::cell::RefCell;

use glam::{Quat, Vec3};

use crate::animation::{AnimationClock, Mode};
use crate::bone::SkeletonDef;
use crate::config::EditorConfig;
use crate::error::{Result, RigError};
use crate::math::normalized_rotation;
use crate::mesh::Mesh;
use crate::picking::{drag_rotation, pick, Ray, Selection};

#[derive(Debug, Clone, Default)]
pub struct SceneState {
    pub meshes: Vec<Mesh>,
    pub clock: AnimationClock,
    pub selection: Option<Selection>,
    pub config: EditorConfig,
}

impl SceneState {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace every mesh with freshly bound skeletons.
    ///
    /// All descriptions are validated first; on error the current scene is kept.
    pub fn load(&mut self, defs: &[SkeletonDef]) -> Result<()> {
        let meshes = defs.iter().map(Mesh::new).collect::<Result<Vec<_>>>()?;
        log::info!("Loaded scene with {} meshes", meshes.len());
        self.meshes = meshes;
        self.clock = AnimationClock::new();
        self.selection = None;
        Ok(())
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let defs = SkeletonDef::scene_from_json(json)?;
        self.load(&defs)
    }

    /// Keyframe slots are added and removed on every mesh together, so the
    /// first mesh speaks for the scene
    pub fn keyframe_count(&self) -> usize {
        self.meshes.first().map_or(0, Mesh::keyframe_count)
    }

    pub fn max_time(&self) -> f32 {
        AnimationClock::max_time(self.keyframe_count())
    }

    pub fn status_line(&self) -> String {
        self.clock.status_line(self.keyframe_count())
    }

    /// Pick the nearest bone under `ray`; a miss clears the selection
    pub fn pick(&mut self, ray: &Ray) -> Option<Selection> {
        self.selection = pick(&self.meshes, ray, self.config.pick_radius);
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn selected_mesh_mut(&mut self) -> Option<(&mut Mesh, usize)> {
        let selection = self.selection?;
        let mesh = self.meshes.get_mut(selection.mesh)?;
        Some((mesh, selection.bone))
    }

    /// Pre-multiply the selected bone's rotation by `delta`, normalized.
    ///
    /// Non-finite or zero quaternions are refused.
    pub fn rotate_selected(&mut self, delta: Quat) -> bool {
        let Some(delta) = normalized_rotation(delta) else {
            log::warn!("Ignoring invalid rotation {:?}", delta);
            return false;
        };
        match self.selected_mesh_mut() {
            Some((mesh, bone)) => {
                mesh.rotate_bone(bone, delta);
                true
            }
            None => false,
        }
    }

    /// Roll the selected bone by `direction` steps of the configured speed
    pub fn roll_selected(&mut self, direction: f32) -> bool {
        let theta = direction * self.config.roll_speed;
        match self.selected_mesh_mut() {
            Some((mesh, bone)) => {
                mesh.roll_bone(bone, theta);
                true
            }
            None => false,
        }
    }

    /// Swing the selected bone toward the cursor between two mouse events
    pub fn drag_selected(&mut self, ray: &Ray, prev_ray: &Ray, view_forward: Vec3) -> bool {
        let max_step = self.config.max_drag_step;
        let Some((mesh, bone)) = self.selected_mesh_mut() else {
            return false;
        };
        match drag_rotation(mesh.skeleton().bone(bone), ray, prev_ray, view_forward, max_step) {
            Some(delta) => {
                mesh.rotate_bone(bone, delta);
                true
            }
            None => false,
        }
    }

    /// Append the current pose as a new keyframe on every mesh
    pub fn add_keyframe(&mut self) {
        let index = self.keyframe_count();
        for mesh in &mut self.meshes {
            mesh.add_keyframe(index);
        }
    }

    /// Overwrite slot `index` with the current pose
    pub fn update_keyframe(&mut self, index: usize) -> bool {
        if index >= self.keyframe_count() {
            log::warn!("No keyframe {} to update", index);
            return false;
        }
        for mesh in &mut self.meshes {
            mesh.add_keyframe(index);
        }
        true
    }

    pub fn delete_keyframe(&mut self, index: usize) -> bool {
        if index >= self.keyframe_count() {
            log::warn!("No keyframe {} to delete", index);
            return false;
        }
        for mesh in &mut self.meshes {
            mesh.delete_keyframe(index);
        }
        true
    }

    /// Jump every mesh to keyframe `index`
    pub fn set_frame(&mut self, index: usize) -> bool {
        if index >= self.keyframe_count() {
            log::warn!("No keyframe {} to show", index);
            return false;
        }
        for mesh in &mut self.meshes {
            mesh.set_frame(index);
        }
        true
    }

    /// Replace the keyframes of mesh `mesh` with ones exported earlier.
    ///
    /// With several meshes loaded the slot count must match the rest of the
    /// scene, since slots are addressed scene-wide. Nothing changes on error.
    pub fn import_timeline(&mut self, mesh: usize, json: &str) -> Result<()> {
        let count = self.meshes.len();
        let target = self
            .meshes
            .get(mesh)
            .ok_or(RigError::MeshOutOfRange { mesh, count })?;
        let keyframes = target.parse_timeline(json)?;

        let expected = self
            .meshes
            .iter()
            .enumerate()
            .find(|(i, _)| *i != mesh)
            .map(|(_, other)| other.keyframe_count());
        if let Some(expected) = expected {
            if keyframes.len() != expected {
                return Err(RigError::KeyframeCountMismatch {
                    expected,
                    found: keyframes.len(),
                });
            }
        }

        self.meshes[mesh].replace_keyframes(keyframes);
        if self.clock.is_playing() && self.keyframe_count() < 2 {
            self.clock.exit_playback();
        }
        Ok(())
    }

    pub fn toggle_playback(&mut self) -> Mode {
        let count = self.keyframe_count();
        self.clock.toggle(count)
    }

    /// Per-frame entry: advance the clock, then pose every mesh at the new time
    pub fn tick(&mut self, delta_seconds: f32) {
        let count = self.keyframe_count();
        if let Some(t) = self.clock.tick(delta_seconds, count) {
            for mesh in &mut self.meshes {
                mesh.set_bone_pos(t);
            }
        }
    }
}

// Global state access, thin wrapper for WASM bindings only
thread_local! {
    static SCENE: RefCell<Option<SceneState>> = const { RefCell::new(None) };
}

/// Execute a closure with immutable access to the scene
///
/// Returns None if the editor is not initialized
pub fn with_scene<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&SceneState) -> R,
{
    SCENE.with(|state| {
        let borrowed = state.borrow();
        borrowed.as_ref().map(f)
    })
}

/// Execute a closure with mutable access to the scene
///
/// Returns None if the editor is not initialized
pub fn with_scene_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut SceneState) -> R,
{
    SCENE.with(|state| {
        let mut borrowed = state.borrow_mut();
        borrowed.as_mut().map(f)
    })
}

/// Install an empty scene with `config`, replacing any previous one
pub fn initialize_scene(config: EditorConfig) {
    SCENE.with(|state| {
        *state.borrow_mut() = Some(SceneState::new(config));
    });
}

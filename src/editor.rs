//! wasm-bindgen surface for the host page.
//!
//! Every export is a thin wrapper over `SceneState`. Calls made before
//! `init_editor` are ignored and return neutral values.

use crate::config::EditorConfig;
use crate::picking::Ray;
use crate::skeleton::BoneBuffers;
use crate::state::{initialize_scene, with_scene, with_scene_mut};
use glam::{Quat, Vec3};
use wasm_bindgen::prelude::*;

fn vec3_from_slice(values: &[f32]) -> Option<Vec3> {
    (values.len() >= 3).then(|| Vec3::from_slice(values))
}

fn ray_from_slices(origin: &[f32], dir: &[f32]) -> Option<Ray> {
    Some(Ray::new(vec3_from_slice(origin)?, vec3_from_slice(dir)?))
}

/// Set up logging and an empty scene; `config_json` may be empty
#[wasm_bindgen]
pub fn init_editor(config_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();

    let config = EditorConfig::from_json(config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid editor config: {}", e)))?;
    initialize_scene(config);
    log::info!("Editor initialized: {:?}", config);
    Ok(())
}

/// Replace the scene with the skeletons in `json` (an array, one per mesh)
#[wasm_bindgen]
pub fn load_scene(json: &str) -> Result<(), JsValue> {
    with_scene_mut(|scene| scene.load_json(json))
        .ok_or_else(|| JsValue::from_str("Editor not initialized"))?
        .map_err(|e| {
            log::warn!("Scene load failed: {}", e);
            JsValue::from_str(&format!("Failed to load scene: {}", e))
        })
}

/// Pick with a world-space ray; returns the flat bone index or -1 on a miss
#[wasm_bindgen]
pub fn pick_bone(origin: &[f32], dir: &[f32]) -> i32 {
    let Some(ray) = ray_from_slices(origin, dir) else {
        return -1;
    };
    with_scene_mut(|scene| scene.pick(&ray))
        .flatten()
        .map_or(-1, |hit| hit.flat as i32)
}

/// Flat index of the selected bone, -1 when nothing is selected
#[wasm_bindgen]
pub fn selected_bone() -> i32 {
    with_scene(|scene| scene.selection)
        .flatten()
        .map_or(-1, |hit| hit.flat as i32)
}

/// Full selection record (`mesh`, `bone`, `flat`, `t`), or null
#[wasm_bindgen]
pub fn get_selection() -> Result<JsValue, JsValue> {
    match with_scene(|scene| scene.selection).flatten() {
        Some(selection) => serde_wasm_bindgen::to_value(&selection)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize selection: {}", e))),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen]
pub fn clear_selection() {
    with_scene_mut(|scene| scene.clear_selection());
}

/// Rotate the selected bone by the quaternion (x, y, z, w)
#[wasm_bindgen]
pub fn rotate_selected(x: f32, y: f32, z: f32, w: f32) -> bool {
    let delta = Quat::from_xyzw(x, y, z, w);
    with_scene_mut(|scene| scene.rotate_selected(delta)).unwrap_or(false)
}

/// Roll the selected bone one step; `direction` is +1 or -1
#[wasm_bindgen]
pub fn roll_selected(direction: f32) -> bool {
    with_scene_mut(|scene| scene.roll_selected(direction)).unwrap_or(false)
}

/// Apply a mouse drag given the current and previous cursor rays
#[wasm_bindgen]
pub fn drag_selected(
    origin: &[f32],
    dir: &[f32],
    prev_origin: &[f32],
    prev_dir: &[f32],
    view_forward: &[f32],
) -> bool {
    let (Some(ray), Some(prev_ray), Some(forward)) = (
        ray_from_slices(origin, dir),
        ray_from_slices(prev_origin, prev_dir),
        vec3_from_slice(view_forward),
    ) else {
        return false;
    };
    with_scene_mut(|scene| scene.drag_selected(&ray, &prev_ray, forward)).unwrap_or(false)
}

/// Append the current pose as a keyframe
#[wasm_bindgen]
pub fn add_keyframe() {
    with_scene_mut(|scene| scene.add_keyframe());
}

/// Overwrite keyframe `index` with the current pose
#[wasm_bindgen]
pub fn update_keyframe(index: usize) -> bool {
    with_scene_mut(|scene| scene.update_keyframe(index)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn delete_keyframe(index: usize) -> bool {
    with_scene_mut(|scene| scene.delete_keyframe(index)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn set_frame(index: usize) -> bool {
    with_scene_mut(|scene| scene.set_frame(index)).unwrap_or(false)
}

/// Returns true when playback is running afterwards
#[wasm_bindgen]
pub fn toggle_playback() -> bool {
    with_scene_mut(|scene| scene.toggle_playback() == crate::animation::Mode::Playback)
        .unwrap_or(false)
}

/// Advance the scene by one frame
#[wasm_bindgen]
pub fn tick(delta_seconds: f32) {
    with_scene_mut(|scene| scene.tick(delta_seconds));
}

#[wasm_bindgen]
pub fn get_mode_string() -> String {
    with_scene(|scene| scene.status_line()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_time() -> f32 {
    with_scene(|scene| scene.clock.time).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_max_time() -> f32 {
    with_scene(|scene| scene.max_time()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn get_keyframe_count() -> usize {
    with_scene(|scene| scene.keyframe_count()).unwrap_or(0)
}

/// Read a per-mesh buffer, empty when the mesh does not exist
fn mesh_buffer<F>(mesh: usize, f: F) -> Vec<f32>
where
    F: FnOnce(&crate::mesh::Mesh) -> Vec<f32>,
{
    with_scene(|scene| scene.meshes.get(mesh).map(f))
        .flatten()
        .unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_bone_translations(mesh: usize) -> Vec<f32> {
    mesh_buffer(mesh, |m| m.bone_translations())
}

#[wasm_bindgen]
pub fn get_bone_rotations(mesh: usize) -> Vec<f32> {
    mesh_buffer(mesh, |m| m.bone_rotations())
}

#[wasm_bindgen]
pub fn get_d_matrices(mesh: usize) -> Vec<f32> {
    mesh_buffer(mesh, |m| m.d_matrices())
}

#[wasm_bindgen]
pub fn get_inv_u_matrices(mesh: usize) -> Vec<f32> {
    mesh_buffer(mesh, |m| m.inv_u_matrices())
}

#[wasm_bindgen]
pub fn get_keyframe_translations(mesh: usize, index: usize) -> Vec<f32> {
    mesh_buffer(mesh, |m| {
        if index < m.keyframe_count() {
            m.keyframe_translations(index).to_vec()
        } else {
            Vec::new()
        }
    })
}

#[wasm_bindgen]
pub fn get_keyframe_rotations(mesh: usize, index: usize) -> Vec<f32> {
    mesh_buffer(mesh, |m| {
        if index < m.keyframe_count() {
            m.keyframe_rotations(index).to_vec()
        } else {
            Vec::new()
        }
    })
}

/// Export a mesh's keyframes as JSON
#[wasm_bindgen]
pub fn export_timeline_json(mesh: usize) -> String {
    with_scene(|scene| {
        scene.meshes.get(mesh).map(|m| {
            m.export_timeline().unwrap_or_else(|e| {
                log::error!("Failed to export timeline: {}", e);
                String::from("{}")
            })
        })
    })
    .flatten()
    .unwrap_or_else(|| String::from("{}"))
}

/// Replace a mesh's keyframes with ones exported earlier; the keyframe count
/// must match the other meshes
#[wasm_bindgen]
pub fn import_timeline_json(mesh: usize, json: &str) -> Result<(), JsValue> {
    with_scene_mut(|scene| scene.import_timeline(mesh, json))
        .ok_or_else(|| JsValue::from_str("Editor not initialized"))?
        .map_err(|e| {
            log::warn!("Timeline import failed: {}", e);
            JsValue::from_str(&format!("Failed to import timeline: {}", e))
        })
}

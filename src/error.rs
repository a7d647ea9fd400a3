use thiserror::Error;

/// Errors for data handed to the rig from outside the crate.
///
/// Index misuse by callers inside the crate is not represented here; that
/// panics on the spot.
#[derive(Debug, Error)]
pub enum RigError {
    #[error("bone {bone} references parent {parent}, but only {count} bones exist")]
    ParentOutOfRange {
        bone: usize,
        parent: usize,
        count: usize,
    },

    #[error("bone {bone} lists child {child}, but only {count} bones exist")]
    ChildOutOfRange {
        bone: usize,
        child: usize,
        count: usize,
    },

    #[error("bone {bone} lists child {child} whose parent is {actual:?}")]
    ChildParentMismatch {
        bone: usize,
        child: usize,
        actual: Option<usize>,
    },

    #[error("bone {bone} lists child {child} more than once")]
    DuplicateChild { bone: usize, child: usize },

    #[error("bone {child} has parent {parent}, which does not list it as a child")]
    MissingChild { parent: usize, child: usize },

    #[error("bone hierarchy contains a cycle through bone {0}")]
    Cycle(usize),

    #[error("skeleton has bones but no root")]
    NoRoot,

    #[error("expected {expected} bones, found {found}")]
    BoneCountMismatch { expected: usize, found: usize },

    #[error("expected {expected} keyframes, found {found}")]
    KeyframeCountMismatch { expected: usize, found: usize },

    #[error("no mesh {mesh}, the scene has {count}")]
    MeshOutOfRange { mesh: usize, count: usize },

    #[error("keyframe {keyframe} has an invalid rotation for bone {bone}")]
    InvalidRotation { keyframe: usize, bone: usize },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RigError>;

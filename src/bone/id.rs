//! Skeleton description handed over by the scene loader.
//!
//! The loader is external; this is only the decoded bind-pose data it
//! produces, plus validation of the hierarchy before a `Skeleton` is built.

use crate::error::{Result, RigError};
use glam::{Quat, Vec3};
use serde::{Deserialize, Deserializer, Serialize};

/// Bind-pose description of a single bone
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BoneDef {
    /// Parent bone (None for root). Loaders write roots as -1 or null.
    #[serde(default, deserialize_with = "parent_index")]
    pub parent: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
    /// Joint position in world space
    pub position: Vec3,
    /// Tip position in world space
    pub endpoint: Vec3,
    /// World orientation of the joint at bind time
    #[serde(default = "identity_rotation")]
    pub rotation: Quat,
}

fn identity_rotation() -> Quat {
    Quat::IDENTITY
}

fn parent_index<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|p| usize::try_from(p).ok()))
}

impl BoneDef {
    pub fn new(parent: Option<usize>, position: Vec3, endpoint: Vec3) -> Self {
        Self {
            parent,
            children: Vec::new(),
            position,
            endpoint,
            rotation: Quat::IDENTITY,
        }
    }
}

/// All bones of one mesh, in loader order
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SkeletonDef {
    pub bones: Vec<BoneDef>,
}

impl SkeletonDef {
    /// Build a description from parent links alone, deriving the child lists
    pub fn from_parents(bones: Vec<BoneDef>) -> Self {
        let mut def = Self { bones };
        def.derive_children();
        def
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut def: SkeletonDef = serde_json::from_str(json)?;
        def.fill_children();
        Ok(def)
    }

    /// Parse a scene: a JSON array with one description per mesh
    pub fn scene_from_json(json: &str) -> Result<Vec<Self>> {
        let mut defs: Vec<SkeletonDef> = serde_json::from_str(json)?;
        for def in &mut defs {
            def.fill_children();
        }
        Ok(defs)
    }

    /// Loaders may send parent links only; children are derived then
    fn fill_children(&mut self) {
        let has_links = self.bones.iter().any(|b| b.parent.is_some());
        let has_children = self.bones.iter().any(|b| !b.children.is_empty());
        if has_links && !has_children {
            self.derive_children();
        }
    }

    fn derive_children(&mut self) {
        for bone in &mut self.bones {
            bone.children.clear();
        }
        for i in 0..self.bones.len() {
            if let Some(parent) = self.bones[i].parent {
                if let Some(p) = self.bones.get_mut(parent) {
                    p.children.push(i);
                }
            }
        }
    }

    /// Indices of bones without a parent, in loader order
    pub fn roots(&self) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Check that parent and child links describe a forest.
    pub fn validate(&self) -> Result<()> {
        let count = self.bones.len();

        for (i, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= count {
                    return Err(RigError::ParentOutOfRange {
                        bone: i,
                        parent,
                        count,
                    });
                }
                if !self.bones[parent].children.contains(&i) {
                    return Err(RigError::MissingChild { parent, child: i });
                }
            }
            for (k, &child) in bone.children.iter().enumerate() {
                if bone.children[..k].contains(&child) {
                    return Err(RigError::DuplicateChild { bone: i, child });
                }
                if child >= count {
                    return Err(RigError::ChildOutOfRange {
                        bone: i,
                        child,
                        count,
                    });
                }
                let actual = self.bones[child].parent;
                if actual != Some(i) {
                    return Err(RigError::ChildParentMismatch {
                        bone: i,
                        child,
                        actual,
                    });
                }
            }
        }

        if count > 0 && self.roots().is_empty() {
            return Err(RigError::NoRoot);
        }

        // Every chain must reach a root within `count` steps
        for start in 0..count {
            let mut current = start;
            let mut depth = 0;
            while let Some(parent) = self.bones[current].parent {
                depth += 1;
                if depth > count {
                    return Err(RigError::Cycle(start));
                }
                current = parent;
            }
        }

        Ok(())
    }
}

use std::cell::Cell;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::errors::StrataError;
use crate::math::normal_matrix;
use crate::scene::events::{ComponentEvent, Property};
use crate::scene::observer::Signals;
use crate::scene::{ComponentHandle, ComponentType, Scene, TransformKey};

/// How the local matrix is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformKind {
    /// Set directly.
    Matrix,
    /// Derived from a translation vector.
    Translate(Vec3),
}

/// Transform 组件
///
/// A local matrix, an optional non-owning parent and a lazily concatenated
/// leaf (world) matrix.
///
/// Invalidation is pushed, rebuilding is pulled: a change marks this node
/// and every descendant dirty through `UPDATED` signals, while the matrix
/// product only runs when [`Scene::leaf_matrix`] is read.
#[derive(Debug)]
pub struct Transform {
    pub(crate) matrix: Mat4,
    pub(crate) parent: Option<TransformKey>,
    pub(crate) kind: TransformKind,

    // === 矩阵缓存 ===
    leaf: Cell<Mat4>,
    leaf_normal: Cell<Mat4>,
    leaf_dirty: Cell<bool>,
}

impl Transform {
    fn new(matrix: Mat4, kind: TransformKind) -> Self {
        Self {
            matrix,
            parent: None,
            kind,
            leaf: Cell::new(Mat4::IDENTITY),
            leaf_normal: Cell::new(Mat4::IDENTITY),
            leaf_dirty: Cell::new(true),
        }
    }

    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<TransformKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn is_leaf_dirty(&self) -> bool {
        self.leaf_dirty.get()
    }

    /// Leaf matrix as of the last read. Stale while [`Transform::is_leaf_dirty`].
    #[inline]
    #[must_use]
    pub fn cached_leaf(&self) -> Mat4 {
        self.leaf.get()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDesc {
    pub id: Option<String>,
    pub matrix: Mat4,
    pub parent: Option<TransformKey>,
}

impl Default for TransformDesc {
    fn default() -> Self {
        Self {
            id: None,
            matrix: Mat4::IDENTITY,
            parent: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateDesc {
    pub id: Option<String>,
    pub xyz: Vec3,
    pub parent: Option<TransformKey>,
}

const PARENT_SIGNALS: Signals = Signals::UPDATED.union(Signals::DESTROYED);

impl Scene {
    pub fn create_transform(&mut self, desc: TransformDesc) -> crate::Result<TransformKey> {
        self.insert_transform(desc.id.as_deref(), desc.matrix, TransformKind::Matrix, desc.parent)
    }

    /// A transform whose local matrix is a translation by `xyz`.
    pub fn create_translate(&mut self, desc: TranslateDesc) -> crate::Result<TransformKey> {
        self.insert_transform(
            desc.id.as_deref(),
            Mat4::from_translation(desc.xyz),
            TransformKind::Translate(desc.xyz),
            desc.parent,
        )
    }

    fn insert_transform(
        &mut self,
        id: Option<&str>,
        matrix: Mat4,
        kind: TransformKind,
        parent: Option<TransformKey>,
    ) -> crate::Result<TransformKey> {
        self.ensure_alive()?;
        if let Some(p) = parent
            && !self.transforms.contains_key(p)
        {
            return Err(StrataError::StaleHandle("transform"));
        }
        let id = self.registry.reserve(id)?;
        let ty = match kind {
            TransformKind::Matrix => ComponentType::Transform,
            TransformKind::Translate(_) => ComponentType::Translate,
        };
        let key = self.transforms.insert(Transform::new(matrix, kind));
        self.register(id, ty, key.into());
        if let Some(p) = parent {
            self.transforms[key].parent = Some(p);
            self.observers.subscribe(p.into(), key.into(), PARENT_SIGNALS);
        }
        Ok(key)
    }

    #[must_use]
    pub fn transform(&self, key: TransformKey) -> Option<&Transform> {
        self.transforms.get(key)
    }

    // ========================================================================
    // Setters
    // ========================================================================

    /// Stores a new local matrix and invalidates this node and its descendants.
    pub fn set_transform_matrix(&mut self, key: TransformKey, matrix: Mat4) {
        let Some(transform) = self.transforms.get_mut(key) else {
            log::warn!("set_transform_matrix: stale transform handle");
            return;
        };
        transform.matrix = matrix;
        if let TransformKind::Translate(xyz) = &mut transform.kind {
            *xyz = matrix.w_axis.truncate();
        }
        self.emit(key.into(), ComponentEvent::Changed(Property::Matrix));
        self.transform_updated(key);
    }

    /// Sets the translation of a `Translate` transform. Unchanged values are ignored.
    pub fn set_translate_xyz(&mut self, key: TransformKey, xyz: Vec3) {
        let Some(transform) = self.transforms.get_mut(key) else {
            log::warn!("set_translate_xyz: stale transform handle");
            return;
        };
        match &mut transform.kind {
            TransformKind::Translate(current) if *current == xyz => return,
            TransformKind::Translate(current) => *current = xyz,
            TransformKind::Matrix => {
                log::warn!("set_translate_xyz called on a plain Transform; use set_transform_matrix");
                return;
            }
        }
        transform.matrix = Mat4::from_translation(xyz);
        self.emit(key.into(), ComponentEvent::Changed(Property::Xyz));
        self.emit(key.into(), ComponentEvent::Changed(Property::Matrix));
        self.transform_updated(key);
    }

    /// Re-parents a transform. Rejects stale parents and cycles, keeping the
    /// current parent.
    pub fn set_transform_parent(&mut self, key: TransformKey, parent: Option<TransformKey>) {
        let Some(current) = self.transforms.get(key).map(|t| t.parent) else {
            log::warn!("set_transform_parent: stale transform handle");
            return;
        };
        if let Some(p) = parent {
            if !self.transforms.contains_key(p) {
                log::error!("set_transform_parent: {}", StrataError::StaleHandle("transform"));
                return;
            }
            if self.is_ancestor_or_self(key, p) {
                let id = self.registry.id_of(key.into()).unwrap_or_default().to_string();
                log::error!("{}", StrataError::HierarchyCycle(id));
                return;
            }
        }

        if let Some(old) = current {
            self.observers.unsubscribe(old.into(), key.into(), PARENT_SIGNALS);
        }
        if let Some(new) = parent {
            self.observers.subscribe(new.into(), key.into(), PARENT_SIGNALS);
        }
        self.transforms[key].parent = parent;

        self.emit(key.into(), ComponentEvent::Changed(Property::Parent));
        self.transform_updated(key);
    }

    /// Id-based variant of [`Scene::set_transform_parent`].
    pub fn set_transform_parent_id(&mut self, key: TransformKey, parent_id: &str) {
        match self.registry.get(parent_id) {
            Some(ComponentHandle::Transform(p)) => self.set_transform_parent(key, Some(p)),
            Some(other) => log::error!(
                "{}",
                StrataError::TypeMismatch {
                    id: parent_id.to_string(),
                    expected: "Transform",
                    found: self.registry.type_of(other).map_or("unknown", |t| t.name()),
                }
            ),
            None => log::error!("{}", StrataError::ComponentNotFound(parent_id.to_string())),
        }
    }

    /// `true` when `candidate` is `key` or one of its descendants.
    fn is_ancestor_or_self(&self, key: TransformKey, candidate: TransformKey) -> bool {
        let mut cursor = Some(candidate);
        while let Some(k) = cursor {
            if k == key {
                return true;
            }
            cursor = self.transforms.get(k).and_then(|t| t.parent);
        }
        false
    }

    /// Marks the leaf dirty and cascades `UPDATED` depth-first.
    fn transform_updated(&mut self, key: TransformKey) {
        let Some(transform) = self.transforms.get(key) else {
            return;
        };
        transform.leaf_dirty.set(true);
        self.emit(key.into(), ComponentEvent::Updated);
        self.notify(key.into(), Signals::UPDATED);
    }

    pub(crate) fn transform_on_signal(&mut self, key: TransformKey, subject: ComponentHandle, signal: Signals) {
        if signal.contains(Signals::DESTROYED) {
            let Some(transform) = self.transforms.get_mut(key) else {
                return;
            };
            if transform.parent.map(ComponentHandle::from) == Some(subject) {
                transform.parent = None;
                self.emit(key.into(), ComponentEvent::Changed(Property::Parent));
            }
            self.transform_updated(key);
        } else if signal.contains(Signals::UPDATED) {
            self.transform_updated(key);
        }
    }

    // ========================================================================
    // Lazy leaf matrix
    // ========================================================================

    fn refresh_leaf(&self, key: TransformKey) -> Option<&Transform> {
        let transform = self.transforms.get(key)?;
        if transform.leaf_dirty.get() {
            let leaf = match transform.parent.and_then(|p| self.leaf_matrix(p)) {
                Some(parent_leaf) => parent_leaf * transform.matrix,
                None => transform.matrix,
            };
            transform.leaf.set(leaf);
            transform.leaf_normal.set(normal_matrix(&leaf));
            transform.leaf_dirty.set(false);
            self.backend.mark_image_dirty();
        }
        Some(transform)
    }

    /// World matrix: `parent.leaf × local`, recomputed only if dirty.
    #[must_use]
    pub fn leaf_matrix(&self, key: TransformKey) -> Option<Mat4> {
        self.refresh_leaf(key).map(|t| t.leaf.get())
    }

    /// Transpose of the inverse leaf matrix.
    #[must_use]
    pub fn leaf_normal_matrix(&self, key: TransformKey) -> Option<Mat4> {
        self.refresh_leaf(key).map(|t| t.leaf_normal.get())
    }

    #[must_use]
    pub fn is_leaf_matrix_dirty(&self, key: TransformKey) -> Option<bool> {
        self.transforms.get(key).map(Transform::is_leaf_dirty)
    }
}

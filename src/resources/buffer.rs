use serde::{Deserialize, Serialize};

/// Binding target of a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferKind {
    /// Vertex attribute data.
    Array,
    /// Index data.
    ElementArray,
}

/// Update-frequency hint passed to the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

impl BufferUsage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Stream => "stream",
        }
    }

    /// Parses `"static"`, `"dynamic"` or `"stream"`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "static" => Some(Self::Static),
            "dynamic" => Some(Self::Dynamic),
            "stream" => Some(Self::Stream),
            _ => None,
        }
    }
}

/// Borrowed contents of a buffer being allocated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferSource<'a> {
    F32(&'a [f32]),
    U32(&'a [u32]),
}

impl BufferSource<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(d) => d.len(),
            Self::U32(d) => d.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything an allocator needs to create one buffer.
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub kind: BufferKind,
    pub data: BufferSource<'a>,
    pub item_size: u32,
    pub usage: BufferUsage,
}

/// Lightweight handle to an allocated buffer.
///
/// Identity is the allocator-assigned `id`; the remaining fields describe
/// the layout at allocation time.
#[derive(Debug, Clone)]
pub struct BufferRef {
    id: u64,
    kind: BufferKind,
    item_size: u32,
    num_items: usize,
    usage: BufferUsage,
}

impl PartialEq for BufferRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BufferRef {}

impl std::hash::Hash for BufferRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl BufferRef {
    /// Called by allocators once they have stored the data under `id`.
    #[must_use]
    pub fn new(id: u64, desc: &BufferDescriptor<'_>) -> Self {
        let item_size = desc.item_size.max(1);
        Self {
            id,
            kind: desc.kind,
            item_size,
            num_items: desc.data.len() / item_size as usize,
            usage: desc.usage,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[must_use]
    pub fn item_size(&self) -> u32 {
        self.item_size
    }

    /// Number of items, i.e. element count divided by item size.
    #[must_use]
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

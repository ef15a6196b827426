use thiserror::Error;

/// Top-level error type for glyphforge.
#[derive(Debug, Error)]
pub enum GlyphforgeError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    #[error(transparent)]
    Font(#[from] FontError),
}

/// Errors raised by malformed polygon input.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("outline is not closed")]
    OpenOutline,

    #[error("zero-length edge between vertices {first} and {second}")]
    ZeroLengthEdge { first: u32, second: u32 },

    #[error("vertex index {0} is out of range")]
    VertexOutOfRange(u32),

    #[error("contour walk failed: {0}")]
    WalkFailed(String),
}

/// Errors raised by the allocation managers and the staging ring.
///
/// Running out of space is not an error: allocators report it by returning
/// `0` or `None`.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("allocation handle {handle} is not valid")]
    InvalidHandle { handle: String },

    #[error("allocation handle {handle} was already freed")]
    DoubleFree { handle: String },

    #[error("fence for frame {frame} did not signal within {timeout_ms} ms")]
    ResourceTimeout { frame: u64, timeout_ms: u128 },
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Errors reported by font backends.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("glyph {0} not found")]
    GlyphNotFound(u32),

    #[error("font backend error: {0}")]
    Backend(String),
}

/// Convenience type alias for results using [`GlyphforgeError`].
pub type Result<T> = std::result::Result<T, GlyphforgeError>;

//! Source generation for iconpack packages.
//!
//! This crate holds the pure, in-memory half of the pipeline: deriving
//! PascalCase component identifiers from asset file names (`derive`,
//! `IdentifierAllocator`), rewriting the root `<svg>` element into embeddable
//! markup (`normalize`), and producing the JSX/TSX/declaration sources and
//! barrel export lines for one icon (`generate`, `generate_all`).

pub mod generate;
pub mod ident;
pub mod normalize;
pub mod types;

pub use generate::{export_line, generate, generate_all, ComponentArtifactSet, RawAsset};
pub use ident::{derive, is_valid_identifier, strip_extension, CollisionPolicy, IdentifierAllocator};
pub use normalize::{normalize, CANONICAL_VIEW_BOX, FORCED_COLOR};
pub use types::{AssetName, Identifier};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("asset '{name}' does not derive a usable component identifier (got '{derived}')")]
    InvalidIdentifier { name: String, derived: String },
    #[error("identifier '{identifier}' derived from '{name}' collides with asset '{existing}'")]
    Collision {
        identifier: String,
        name: String,
        existing: String,
    },
}

pub mod aggregate;
pub mod artifacts;
pub mod error;
pub mod ignore;
pub mod ordering;
pub mod parser;
pub mod presets;
pub mod render;
pub mod selection;
pub mod traversal;
pub mod tree;
pub mod tree_builder;

pub use aggregate::annotate_aggregates;
pub use artifacts::{
    ArtifactMetadata, ArtifactStore, FileDetail, FileMetadata, FileSummary, PendingArtifact,
};
pub use error::{CoreError, CoreResult};
pub use ordering::sort_tree_recursive;
pub use parser::{ParseEngine, ParseProgress};
pub use presets::{PresetMap, PresetStore};
pub use render::TreeRenderer;
pub use selection::{collect_selected_paths, set_selected_all, set_selected_recursive};
pub use traversal::FsTraversal;
pub use tree::{Aggregates, NodeKind, TreeNode};
pub use tree_builder::{build_tree, PickedFile, RelativePath};

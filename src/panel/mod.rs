/// Panel Renderer: list shaping in `view`, the Yew component in `component`
pub use component::{ArchiveList, ArchiveListProps, ArchivePanel, ArchivePanelProps};

pub mod component;
pub mod view;

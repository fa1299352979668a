mod selector;

pub use selector::{select_scene, NoSceneReason, SelectionResult};

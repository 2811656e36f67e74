pub mod lighting;
pub mod scene;

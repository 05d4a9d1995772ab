pub mod filesystem;
pub mod layout;

pub use filesystem::{
    count_entries, ensure_directory, move_file, remove_dir_if_exists, remove_file_if_exists,
};
pub use layout::{JobArtifacts, Layout, MULTI_CROP_DIR};

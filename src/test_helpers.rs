//! Shared test utilities.
//!
//! Content fixtures are built on the fly in a [`TempDir`] so each test
//! states exactly the tree it needs:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = write_tree(&[("index.md", "# Home"), ("notes/a.md", "# A")]);
//! let tree = scan(tmp.path()).unwrap();
//! assert_eq!(child_names(&tree.root), vec!["notes", "index.md"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::types::ContentNode;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `(relative path, contents)` pairs into a fresh temp directory,
/// creating parent directories as needed.
pub fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = tmp.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, contents).unwrap();
    }
    tmp
}

/// Write a real PNG with a simple gradient, whatever the file extension says.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

// =========================================================================
// Tree lookups: panic with a clear message on miss
// =========================================================================

/// Find a node by content path. Panics if not found.
pub fn find_node<'a>(root: &'a ContentNode, path: &str) -> &'a ContentNode {
    root.find(path).unwrap_or_else(|| {
        let paths: Vec<&str> = root.walk().map(|n| n.path.as_str()).collect();
        panic!("node '{path}' not found. Available: {paths:?}")
    })
}

/// File names of a node's children in tree order.
pub fn child_names(node: &ContentNode) -> Vec<&str> {
    node.children.iter().map(|c| c.file_name()).collect()
}

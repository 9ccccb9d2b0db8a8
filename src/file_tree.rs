//! Site-wide navigation tree.
//!
//! The whole content tree serialized as nested lists. Rendered once per pass
//! and embedded unchanged in every view. Folders start collapsed; the theme's
//! script toggles `.folder-contents` open when a `.folder-label` is clicked.

use maud::{Markup, html};

use crate::assets::AssetPipeline;
use crate::paths;
use crate::types::ContentNode;

/// Render the tree below `root` (the root itself is not listed).
pub fn render(root: &ContentNode, assets: &AssetPipeline) -> String {
    html! {
        nav.file-tree {
            ul {
                @for child in &root.children {
                    (render_node(child, assets))
                }
            }
        }
    }
    .into_string()
}

fn render_node(node: &ContentNode, assets: &AssetPipeline) -> Markup {
    html! {
        @if node.is_dir() {
            li.directory {
                div.folder-label {
                    span.toggle-icon { "▸" }
                    a.folder-name href=(paths::dir_url(&node.path)) { (node.name) }
                }
                ul.folder-contents.hidden {
                    @for child in &node.children {
                        (render_node(child, assets))
                    }
                }
            }
        } @else {
            li.file {
                a.file-link href=(paths::node_url(node, assets)) { (node.name) }
            }
        }
    }
}

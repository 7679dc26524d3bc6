//! ASCII tree rendering for key hierarchies.

use crate::registry::KeyTree;

/// Render a key hierarchy as an ASCII tree.
///
/// Example output:
/// ```text
/// lights
/// ├── hallway
/// └── kitchen
///     └── dimmer
/// ```
pub fn render_tree(tree: &KeyTree) -> String {
    let mut output = String::new();
    let count = tree.0.len();
    for (i, (name, child)) in tree.0.iter().enumerate() {
        render_node(&mut output, name, child, "", i == count - 1, true);
    }
    output
}

/// Recursively render a key and its children.
fn render_node(
    output: &mut String,
    name: &str,
    node: &KeyTree,
    prefix: &str,
    is_last: bool,
    is_root: bool,
) {
    if is_root {
        // Top-level keys: no branch characters
        output.push_str(name);
        output.push('\n');
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push_str(name);
        output.push('\n');
    }

    // Calculate prefix for children
    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    let count = node.0.len();
    for (i, (child_name, child)) in node.0.iter().enumerate() {
        render_node(output, child_name, child, &child_prefix, i == count - 1, false);
    }
}

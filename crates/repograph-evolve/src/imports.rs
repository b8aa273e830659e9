//! Relative import resolution shared by the evolver and the encoder.

use repograph_core::{ids, EntityKind};

/// Extensions tried when a relative import omits one. The empty suffix comes
/// last so fully-written specifiers still match.
const IMPORT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".py", ""];

/// Resolve a relative module specifier against the importing file's
/// directory. Returns `None` when the specifier escapes the repository root
/// or is not relative at all.
pub fn resolve_relative(file_path: &str, module: &str) -> Option<String> {
    if !module.starts_with('.') {
        return None;
    }
    let dir = match file_path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    };
    let mut stack: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for component in module.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        return None;
    }
    Some(stack.join("/"))
}

/// Candidate file-node IDs for a resolved import path, in probe order.
pub fn candidate_file_ids(resolved: &str) -> Vec<String> {
    IMPORT_EXTENSIONS
        .iter()
        .map(|ext| {
            let path = format!("{resolved}{ext}");
            ids::entity_id(&path, EntityKind::File, &path)
        })
        .collect()
}

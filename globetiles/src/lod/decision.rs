use std::fmt;

/// Outcome of evaluating one node for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Outside the view; descendants are not visited.
    Cull,
    /// Leave the node as it is.
    Keep,
    /// Split the leaf into four children.
    Subdivide,
    /// Collapse the node's subtree.
    Merge,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::Cull => "cull",
            Decision::Keep => "keep",
            Decision::Subdivide => "subdivide",
            Decision::Merge => "merge",
        };
        f.write_str(name)
    }
}

//! Hierarchical trace IDs
//!
//! Every sub-request issued on behalf of a query carries a child trace ID:
//! the parent ID, the separator token, and a fresh random UUID. Stripping
//! everything from the last separator onward recovers the parent, which is
//! the correlation-store key — so any number of concurrent sub-requests
//! resolve back to their entry without a secondary index.

use uuid::Uuid;

/// Separator between a parent trace ID and the generated child segment.
pub const SEPARATOR: &str = "=>";

/// Generate a fresh root trace ID.
pub fn new_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Derive a child trace ID from a parent.
pub fn derive_child(parent: &str) -> String {
    format!("{parent}{SEPARATOR}{}", new_trace_id())
}

/// Correlation-store key for a trace ID: everything before the last
/// separator. A trace ID without a separator has no key.
pub fn correlation_key(trace_id: &str) -> Option<&str> {
    trace_id.rfind(SEPARATOR).map(|idx| &trace_id[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_then_key_recovers_parent() {
        let parent = new_trace_id();
        let child = derive_child(&parent);

        assert_ne!(child, parent);
        assert_eq!(correlation_key(&child), Some(parent.as_str()));
    }

    #[test]
    fn test_nested_children_strip_one_level() {
        let root = new_trace_id();
        let child = derive_child(&root);
        let grandchild = derive_child(&child);

        assert_eq!(correlation_key(&grandchild), Some(child.as_str()));
        assert_eq!(correlation_key(&child), Some(root.as_str()));
    }

    #[test]
    fn test_root_trace_has_no_key() {
        assert_eq!(correlation_key(&new_trace_id()), None);
        assert_eq!(correlation_key(""), None);
    }

    #[test]
    fn test_children_of_same_parent_are_distinct() {
        let parent = new_trace_id();
        assert_ne!(derive_child(&parent), derive_child(&parent));
    }

    proptest! {
        // The generated segment never contains the separator, so the last
        // separator in a child is always the one derive_child appended.
        #[test]
        fn prop_round_trip(parent in ".*") {
            let child = derive_child(&parent);
            prop_assert_eq!(correlation_key(&child), Some(parent.as_str()));
        }
    }
}

//! Canonical artifact addressing.
//!
//! Every artifact a pipeline produces or consumes is addressed by a
//! four-tuple: (origin, event, source, name). The origin is the pipeline
//! title (or an upstream identifier), the event is the time window, the
//! source is the stage that produced the artifact, and the name is the
//! artifact name within that stage.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A four-tuple artifact address. Frozen after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalPath {
    origin: String,
    event: String,
    source: String,
    name: String,
}

impl CanonicalPath {
    pub fn new(
        origin: impl Into<String>,
        event: impl Into<String>,
        source: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            event: event.into(),
            source: source.into(),
            name: name.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The four components in address order.
    pub fn unpack(&self) -> (&str, &str, &str, &str) {
        (&self.origin, &self.event, &self.source, &self.name)
    }

    /// The filesystem-relative rendering, one directory per component.
    pub fn to_relative_path(&self) -> PathBuf {
        [&self.origin, &self.event, &self.source, &self.name]
            .iter()
            .collect()
    }

    /// True when every component is usable as a single path segment. The
    /// filesystem backend refuses addresses that could escape its root.
    pub fn is_fs_safe(&self) -> bool {
        [&self.origin, &self.event, &self.source, &self.name]
            .iter()
            .all(|c| {
                !c.is_empty() && *c != "." && *c != ".." && !c.contains('/') && !c.contains('\\')
            })
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.origin, self.event, self.source, self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn renders_in_address_order() {
        let path = CanonicalPath::new("run1", "E1", "ingress", "PackCurrent");
        assert_eq!(path.to_string(), "run1/E1/ingress/PackCurrent");
        assert_eq!(
            path.to_relative_path(),
            PathBuf::from("run1/E1/ingress/PackCurrent")
        );
    }

    #[test]
    fn equal_tuples_are_equal_addresses() {
        let a = CanonicalPath::new("run1", "E1", "power", "pack_power");
        let b = CanonicalPath::new("run1", "E1", "power", "pack_power");
        assert_eq!(a, b);

        let c = CanonicalPath::new("run2", "E1", "power", "pack_power");
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_traversal_components() {
        assert!(!CanonicalPath::new("..", "E1", "s", "n").is_fs_safe());
        assert!(!CanonicalPath::new("run1", "a/b", "s", "n").is_fs_safe());
        assert!(!CanonicalPath::new("run1", "", "s", "n").is_fs_safe());
        assert!(CanonicalPath::new("run1", "E1", "s", "n").is_fs_safe());
    }

    proptest! {
        #[test]
        fn display_roundtrips_through_components(
            origin in "[a-zA-Z0-9_-]{1,12}",
            event in "[a-zA-Z0-9_-]{1,12}",
            source in "[a-zA-Z0-9_-]{1,12}",
            name in "[a-zA-Z0-9_-]{1,12}",
        ) {
            let path = CanonicalPath::new(&origin, &event, &source, &name);
            let rendered = path.to_string();
            let parts: Vec<&str> = rendered.split('/').collect();
            prop_assert_eq!(parts, vec![
                origin.as_str(), event.as_str(), source.as_str(), name.as_str()
            ]);
            prop_assert!(path.is_fs_safe());
        }
    }
}

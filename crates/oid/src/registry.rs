//! Resource types and the registry that resolves their tags.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How a resource type is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    /// Addressed by id alone; the optional fourth segment is a version
    Simple,
    /// Addressed by id plus a scope id (e.g. a folder's workspace)
    Composite,
}

/// Every kind of platform object a reference can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Dataset,
    Monitor,
    MonitorAction,
    Workspace,
    Folder,
    App,
    Worksheet,
    Dashboard,
    Board,
    Bookmark,
    BookmarkGroup,
    User,
    RbacGroup,
    RbacStatement,
    Datastream,
    DatastreamToken,
    Poller,
    FileDrop,
    Share,
    LayeredSetting,
}

impl ResourceType {
    /// All resource types, in tag order of the standard registry.
    pub const ALL: [ResourceType; 20] = [
        ResourceType::Dataset,
        ResourceType::Monitor,
        ResourceType::MonitorAction,
        ResourceType::Workspace,
        ResourceType::Folder,
        ResourceType::App,
        ResourceType::Worksheet,
        ResourceType::Dashboard,
        ResourceType::Board,
        ResourceType::Bookmark,
        ResourceType::BookmarkGroup,
        ResourceType::User,
        ResourceType::RbacGroup,
        ResourceType::RbacStatement,
        ResourceType::Datastream,
        ResourceType::DatastreamToken,
        ResourceType::Poller,
        ResourceType::FileDrop,
        ResourceType::Share,
        ResourceType::LayeredSetting,
    ];

    /// Canonical tag used in reference strings.
    pub fn tag(&self) -> &'static str {
        match self {
            ResourceType::Dataset => "dataset",
            ResourceType::Monitor => "monitor",
            ResourceType::MonitorAction => "monitoraction",
            ResourceType::Workspace => "workspace",
            ResourceType::Folder => "folder",
            ResourceType::App => "app",
            ResourceType::Worksheet => "worksheet",
            ResourceType::Dashboard => "dashboard",
            ResourceType::Board => "board",
            ResourceType::Bookmark => "bookmark",
            ResourceType::BookmarkGroup => "bookmarkgroup",
            ResourceType::User => "user",
            ResourceType::RbacGroup => "rbacgroup",
            ResourceType::RbacStatement => "rbacstatement",
            ResourceType::Datastream => "datastream",
            ResourceType::DatastreamToken => "datastreamtoken",
            ResourceType::Poller => "poller",
            ResourceType::FileDrop => "filedrop",
            ResourceType::Share => "share",
            ResourceType::LayeredSetting => "layeredsetting",
        }
    }

    /// Identity kind of this type.
    pub fn identity(&self) -> Identity {
        match self {
            ResourceType::Folder => Identity::Composite,
            _ => Identity::Simple,
        }
    }

    /// Whether references of this type carry a scope id instead of a version.
    pub fn is_composite(&self) -> bool {
        self.identity() == Identity::Composite
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The set of resource types a process accepts.
///
/// Built once at startup and shared by reference. It holds no interior
/// mutability, so concurrent readers need no synchronization.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_tag: HashMap<&'static str, ResourceType>,
}

impl TypeRegistry {
    /// Registry containing every resource type.
    pub fn standard() -> Self {
        Self::with_types(ResourceType::ALL)
    }

    /// Registry containing only the given types.
    pub fn with_types(types: impl IntoIterator<Item = ResourceType>) -> Self {
        let by_tag = types.into_iter().map(|t| (t.tag(), t)).collect();
        Self { by_tag }
    }

    /// Copy of this registry with the given types removed.
    pub fn without(&self, excluded: &[ResourceType]) -> Self {
        let mut by_tag = self.by_tag.clone();
        by_tag.retain(|_, t| !excluded.contains(t));
        Self { by_tag }
    }

    /// Resolve a tag to its resource type.
    pub fn type_of(&self, tag: &str) -> Option<ResourceType> {
        self.by_tag.get(tag).copied()
    }

    /// Whether `tag` names a registered type.
    pub fn is_valid(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Whether `kind` is registered.
    pub fn contains(&self, kind: ResourceType) -> bool {
        self.by_tag.contains_key(kind.tag())
    }

    /// Registered types, sorted.
    pub fn types(&self) -> Vec<ResourceType> {
        let mut types: Vec<_> = self.by_tag.values().copied().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_resolves_all_tags() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.len(), ResourceType::ALL.len());
        for kind in ResourceType::ALL {
            assert_eq!(registry.type_of(kind.tag()), Some(kind));
            assert!(registry.is_valid(kind.tag()));
        }
    }

    #[test]
    fn test_unknown_tag() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.type_of("spaceship"), None);
        assert!(!registry.is_valid("Dataset"));
        assert!(!registry.is_valid(""));
    }

    #[test]
    fn test_only_folder_is_composite() {
        let composite: Vec<_> = ResourceType::ALL
            .into_iter()
            .filter(ResourceType::is_composite)
            .collect();
        assert_eq!(composite, vec![ResourceType::Folder]);
    }

    #[test]
    fn test_without_removes_types() {
        let registry = TypeRegistry::standard().without(&[ResourceType::App]);
        assert!(!registry.is_valid("app"));
        assert!(registry.is_valid("dataset"));
        assert!(!registry.contains(ResourceType::App));
    }

    #[test]
    fn test_tags_match_serde_names() {
        for kind in ResourceType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.tag()));
        }
    }
}

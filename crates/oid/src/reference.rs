//! Object references and their string codec.
//!
//! A reference string has the form `o:<type>:<id>[:<version-or-scope>]`.
//! What the fourth segment means depends on the type: simple types carry an
//! optional version, composite types (see [`Identity`]) carry a required
//! scope id. The two shapes are separate variants of [`Oid`] so a caller can
//! never read a workspace id as if it were a version.

use crate::error::{Error, Result};
use crate::registry::{Identity, ResourceType, TypeRegistry};
use serde::{Serialize, Serializer};
use std::fmt;

/// Literal first segment of every reference string.
pub const PREFIX: &str = "o";

/// Segment separator.
pub const SEPARATOR: char = ':';

/// Reference to an object addressed by id, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimpleRef {
    kind: ResourceType,
    id: String,
    version: Option<String>,
}

impl SimpleRef {
    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Same object pinned to a different version.
    pub fn with_version(&self, version: &str) -> Result<Self> {
        check_token("version", version)?;
        Ok(Self {
            version: Some(version.to_string()),
            ..self.clone()
        })
    }
}

/// Reference to an object whose address needs a scope id as well as its own id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeRef {
    kind: ResourceType,
    id: String,
    scope: String,
}

impl CompositeRef {
    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the owning scope (for a folder, its workspace).
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// A typed, serializable address of a platform object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Oid {
    Simple(SimpleRef),
    Composite(CompositeRef),
}

impl Oid {
    /// Parse a reference string against `registry`.
    ///
    /// # Example
    ///
    /// ```
    /// use oid::{Oid, ResourceType, TypeRegistry};
    ///
    /// let registry = TypeRegistry::standard();
    /// let oid = Oid::parse(&registry, "o:dataset:42:7")?;
    /// assert_eq!(oid.kind(), ResourceType::Dataset);
    /// assert_eq!(oid.id(), "42");
    /// assert_eq!(oid.version(), Some("7"));
    /// assert_eq!(oid.to_string(), "o:dataset:42:7");
    /// # Ok::<(), oid::Error>(())
    /// ```
    pub fn parse(registry: &TypeRegistry, input: &str) -> Result<Self> {
        let segments: Vec<&str> = input.split(SEPARATOR).collect();
        if !(3..=4).contains(&segments.len()) {
            return Err(Error::malformed(
                input,
                format!("expected 3 or 4 segments, found {}", segments.len()),
            ));
        }
        if segments[0] != PREFIX {
            return Err(Error::malformed(
                input,
                format!("expected prefix {PREFIX:?}, found {:?}", segments[0]),
            ));
        }

        let tag = segments[1];
        if tag.is_empty() {
            return Err(Error::malformed(input, "empty type"));
        }
        let kind = registry.type_of(tag).ok_or_else(|| Error::UnknownType {
            tag: tag.to_string(),
            input: input.to_string(),
        })?;

        let id = segments[2];
        if id.is_empty() {
            return Err(Error::malformed(input, "empty id"));
        }

        let tail = segments.get(3).copied();
        if tail == Some("") {
            return Err(Error::malformed(input, "empty trailing segment"));
        }

        match (kind.identity(), tail) {
            (Identity::Simple, version) => Ok(Self::Simple(SimpleRef {
                kind,
                id: id.to_string(),
                version: version.map(str::to_string),
            })),
            (Identity::Composite, Some(scope)) => Ok(Self::Composite(CompositeRef {
                kind,
                id: id.to_string(),
                scope: scope.to_string(),
            })),
            (Identity::Composite, None) => Err(Error::malformed(
                input,
                format!("{kind} references require a scope segment"),
            )),
        }
    }

    /// Parse a reference held in a configuration field and check its type.
    ///
    /// Errors are annotated with `field`.
    pub fn parse_field(
        registry: &TypeRegistry,
        field: &str,
        input: &str,
        allowed: &[ResourceType],
    ) -> Result<Self> {
        let oid = Self::parse(registry, input).map_err(|e| e.in_field(field))?;
        oid.validate(allowed).map_err(|e| e.in_field(field))?;
        Ok(oid)
    }

    /// Reference to a simple-identity object.
    ///
    /// Fails if `kind` has composite identity or a token is empty or contains
    /// the separator.
    pub fn simple(kind: ResourceType, id: &str, version: Option<&str>) -> Result<Self> {
        if kind.is_composite() {
            return Err(Error::malformed(
                &format!("{PREFIX}{SEPARATOR}{kind}{SEPARATOR}{id}"),
                format!("{kind} references require a scope, not a version"),
            ));
        }
        check_token("id", id)?;
        if let Some(v) = version {
            check_token("version", v)?;
        }
        Ok(Self::Simple(SimpleRef {
            kind,
            id: id.to_string(),
            version: version.map(str::to_string),
        }))
    }

    /// Reference to a composite-identity object.
    pub fn composite(kind: ResourceType, id: &str, scope: &str) -> Result<Self> {
        if !kind.is_composite() {
            return Err(Error::malformed(
                &format!("{PREFIX}{SEPARATOR}{kind}{SEPARATOR}{id}"),
                format!("{kind} references do not take a scope"),
            ));
        }
        check_token("id", id)?;
        check_token("scope", scope)?;
        Ok(Self::Composite(CompositeRef {
            kind,
            id: id.to_string(),
            scope: scope.to_string(),
        }))
    }

    pub fn folder(id: &str, workspace_id: &str) -> Result<Self> {
        Self::composite(ResourceType::Folder, id, workspace_id)
    }

    pub fn kind(&self) -> ResourceType {
        match self {
            Self::Simple(r) => r.kind,
            Self::Composite(r) => r.kind,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Simple(r) => &r.id,
            Self::Composite(r) => &r.id,
        }
    }

    /// Version of a simple reference; always `None` for composite ones.
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Simple(r) => r.version(),
            Self::Composite(_) => None,
        }
    }

    /// Scope id of a composite reference; always `None` for simple ones.
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::Simple(_) => None,
            Self::Composite(r) => Some(&r.scope),
        }
    }

    /// The same object with any version dropped.
    pub fn without_version(&self) -> Self {
        match self {
            Self::Simple(r) => Self::Simple(SimpleRef {
                version: None,
                ..r.clone()
            }),
            Self::Composite(_) => self.clone(),
        }
    }

    /// Whether both references address the same object.
    ///
    /// Ids are unique within a type, so only type and id are compared; the
    /// version or scope segment is ignored.
    pub fn same_object(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id() == other.id()
    }

    /// Check that this reference is one of `allowed` (empty accepts anything).
    pub fn validate(&self, allowed: &[ResourceType]) -> Result<()> {
        if allowed.is_empty() || allowed.contains(&self.kind()) {
            return Ok(());
        }
        Err(Error::WrongType {
            reference: self.to_string(),
            found: self.kind(),
            allowed: allowed.to_vec(),
        })
    }
}

macro_rules! simple_constructors {
    (
        versioned { $($vname:ident => $vkind:ident),* $(,)? }
        unversioned { $($name:ident => $kind:ident),* $(,)? }
    ) => {
        impl Oid {
            $(
                #[doc = concat!("Versioned reference to a `", stringify!($vname), "` object.")]
                pub fn $vname(id: &str, version: Option<&str>) -> Result<Self> {
                    Self::simple(ResourceType::$vkind, id, version)
                }
            )*
            $(
                #[doc = concat!("Reference to a `", stringify!($name), "` object.")]
                pub fn $name(id: &str) -> Result<Self> {
                    Self::simple(ResourceType::$kind, id, None)
                }
            )*
        }
    };
}

simple_constructors! {
    versioned {
        dataset => Dataset,
        monitor => Monitor,
        app => App,
        worksheet => Worksheet,
        dashboard => Dashboard,
        board => Board,
    }
    unversioned {
        monitor_action => MonitorAction,
        workspace => Workspace,
        bookmark => Bookmark,
        bookmark_group => BookmarkGroup,
        user => User,
        rbac_group => RbacGroup,
        rbac_statement => RbacStatement,
        datastream => Datastream,
        datastream_token => DatastreamToken,
        poller => Poller,
        file_drop => FileDrop,
        share => Share,
        layered_setting => LayeredSetting,
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{SEPARATOR}{}{SEPARATOR}{}", self.kind(), self.id())?;
        match self {
            Self::Simple(SimpleRef {
                version: Some(v), ..
            }) => write!(f, "{SEPARATOR}{v}"),
            Self::Simple(_) => Ok(()),
            Self::Composite(r) => write!(f, "{SEPARATOR}{}", r.scope),
        }
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn check_token(what: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::malformed(token, format!("empty {what}")));
    }
    if token.contains(SEPARATOR) {
        return Err(Error::malformed(
            token,
            format!("{what} must not contain {SEPARATOR:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::standard()
    }

    #[test]
    fn test_parse_dataset_with_version() {
        let oid = Oid::parse(&registry(), "o:dataset:42:7").unwrap();
        assert_eq!(oid.kind(), ResourceType::Dataset);
        assert_eq!(oid.id(), "42");
        assert_eq!(oid.version(), Some("7"));
        assert_eq!(oid.scope(), None);
        assert_eq!(oid.to_string(), "o:dataset:42:7");
    }

    #[test]
    fn test_parse_without_version() {
        let oid = Oid::parse(&registry(), "o:monitor:9").unwrap();
        assert_eq!(oid, Oid::monitor("9", None).unwrap());
        assert_eq!(oid.version(), None);
    }

    #[test]
    fn test_versioned_constructors() {
        let worksheet = Oid::worksheet("1", Some("5")).unwrap();
        assert_eq!(worksheet.to_string(), "o:worksheet:1:5");
        assert_eq!(Oid::parse(&registry(), "o:worksheet:1:5").unwrap(), worksheet);
        assert_eq!(Oid::dashboard("3", None).unwrap().to_string(), "o:dashboard:3");
        assert!(Oid::monitor("9", Some("")).is_err());
    }

    #[test]
    fn test_parse_folder_scope() {
        let oid = Oid::parse(&registry(), "o:folder:12:41000001").unwrap();
        assert_eq!(oid.kind(), ResourceType::Folder);
        assert_eq!(oid.scope(), Some("41000001"));
        assert_eq!(oid.version(), None);
        assert_eq!(oid, Oid::folder("12", "41000001").unwrap());
    }

    #[test]
    fn test_folder_requires_scope() {
        let err = Oid::parse(&registry(), "o:folder:12").unwrap_err();
        assert!(matches!(err, Error::MalformedReference { .. }));
    }

    #[test]
    fn test_malformed_inputs() {
        for input in [
            "",
            "o",
            "o:dataset",
            "x:dataset:1",
            "o:dataset:1:2:3",
            "o::1",
            "o:dataset:",
            "o:dataset:1:",
            "dataset:1",
        ] {
            let err = Oid::parse(&registry(), input).unwrap_err();
            assert!(
                matches!(err, Error::MalformedReference { .. }),
                "{input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_unknown_type() {
        let err = Oid::parse(&registry(), "o:spaceship:1").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownType {
                tag: "spaceship".to_string(),
                input: "o:spaceship:1".to_string(),
            }
        );
    }

    #[test]
    fn test_disabled_type_is_unknown() {
        let registry = registry().without(&[ResourceType::Poller]);
        let err = Oid::parse(&registry, "o:poller:1").unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
    }

    #[test]
    fn test_round_trip_every_type() {
        let registry = registry();
        for kind in ResourceType::ALL {
            let oids = if kind.is_composite() {
                vec![Oid::composite(kind, "100", "200").unwrap()]
            } else {
                vec![
                    Oid::simple(kind, "100", None).unwrap(),
                    Oid::simple(kind, "100", Some("17")).unwrap(),
                ]
            };
            for oid in oids {
                let text = oid.to_string();
                let parsed = Oid::parse(&registry, &text).unwrap();
                assert_eq!(parsed, oid);
                assert_eq!(parsed.to_string(), text);
            }
        }
    }

    #[test]
    fn test_constructor_rejects_bad_tokens() {
        assert!(Oid::dataset("", None).is_err());
        assert!(Oid::dataset("a:b", None).is_err());
        assert!(Oid::dataset("1", Some("")).is_err());
        assert!(Oid::folder("1", "").is_err());
        assert!(Oid::simple(ResourceType::Folder, "1", None).is_err());
        assert!(Oid::composite(ResourceType::Dataset, "1", "2").is_err());
    }

    #[test]
    fn test_validate_allowed() {
        let oid = Oid::dataset("1", None).unwrap();
        assert!(oid.validate(&[]).is_ok());
        assert!(oid.validate(&[ResourceType::Dataset]).is_ok());
        assert!(oid
            .validate(&[ResourceType::Monitor, ResourceType::Dataset])
            .is_ok());

        let err = oid.validate(&[ResourceType::Monitor]).unwrap_err();
        match err {
            Error::WrongType { found, allowed, .. } => {
                assert_eq!(found, ResourceType::Dataset);
                assert_eq!(allowed, vec![ResourceType::Monitor]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_field_annotates() {
        let err = Oid::parse_field(
            &registry(),
            "inputs.main",
            "o:monitor:1",
            &[ResourceType::Dataset],
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("inputs.main: "));
        assert!(matches!(err.root(), Error::WrongType { .. }));
    }

    #[test]
    fn test_same_object_ignores_version() {
        let a = Oid::dataset("42", Some("7")).unwrap();
        let b = Oid::dataset("42", Some("9")).unwrap();
        let c = Oid::dataset("43", Some("7")).unwrap();
        assert!(a.same_object(&b));
        assert!(!a.same_object(&c));
        assert_eq!(a.without_version(), b.without_version());

        let moved = Oid::folder("12", "41").unwrap();
        assert!(moved.same_object(&Oid::folder("12", "42").unwrap()));
        assert!(!moved.same_object(&Oid::folder("13", "41").unwrap()));
    }

    #[test]
    fn test_with_version() {
        let Oid::Simple(r) = Oid::dataset("42", None).unwrap() else {
            panic!("dataset is simple");
        };
        let pinned = r.with_version("8").unwrap();
        assert_eq!(pinned.version(), Some("8"));
        assert_eq!(Oid::Simple(pinned).to_string(), "o:dataset:42:8");
    }

    #[test]
    fn test_serializes_as_string() {
        let oid = Oid::folder("3", "4").unwrap();
        assert_eq!(serde_json::to_string(&oid).unwrap(), "\"o:folder:3:4\"");
    }
}

//! Union definitions and caller permission scopes.
//!
//! A union carries a base tag table visible to every caller and any number
//! of permission-scoped tables (for example `internal` or `alpha` tags) that
//! are only encodable by callers holding the matching grant. Decoding
//! consults only the base table; constructing a value accepts a tag from any
//! table.

use std::fmt;
use std::sync::Arc;

use crate::validators::{Primitive, Validator};

/// A permission scope gating extra union tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Internal,
    Alpha,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Alpha => "alpha",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The permission scopes granted to the caller performing an encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerPermissions {
    granted: Vec<Permission>,
}

impl CallerPermissions {
    /// No grants: only base tags are visible.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        let mut out = Self::default();
        for p in granted {
            if !out.granted.contains(&p) {
                out.granted.push(p);
            }
        }
        out
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.granted.iter().copied()
    }
}

type TagTable = Vec<(String, Validator)>;

fn find<'a>(table: &'a TagTable, tag: &str) -> Option<&'a Validator> {
    table.iter().find(|(t, _)| t == tag).map(|(_, v)| v)
}

/// Runtime descriptor of a tagged union.
#[derive(Debug)]
pub struct UnionDef {
    name: String,
    tags: TagTable,
    catch_all: Option<String>,
    scoped: Vec<(Permission, TagTable)>,
}

impl UnionDef {
    pub fn builder(name: &str) -> UnionDefBuilder {
        UnionDefBuilder {
            name: name.to_string(),
            tags: Vec::new(),
            catch_all: None,
            scoped: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag used when an unknown tag is decoded leniently.
    pub fn catch_all(&self) -> Option<&str> {
        self.catch_all.as_deref()
    }

    /// Base tags in declaration order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &Validator)> {
        self.tags.iter().map(|(t, v)| (t.as_str(), v))
    }

    /// Base table only.
    pub fn lookup(&self, tag: &str) -> Option<&Validator> {
        find(&self.tags, tag)
    }

    /// A single permission-scoped table.
    pub fn lookup_scoped(&self, permission: Permission, tag: &str) -> Option<&Validator> {
        self.scoped
            .iter()
            .filter(|(p, _)| *p == permission)
            .find_map(|(_, table)| find(table, tag))
    }

    /// Base table, then every scoped table regardless of grants.
    pub fn lookup_any(&self, tag: &str) -> Option<&Validator> {
        self.lookup(tag)
            .or_else(|| self.scoped.iter().find_map(|(_, table)| find(table, tag)))
    }

    /// Resolve `tag` as the given caller sees it: granted scopes first,
    /// then the base table.
    pub fn resolve(&self, tag: &str, caller: &CallerPermissions) -> Option<&Validator> {
        caller
            .iter()
            .find_map(|p| self.lookup_scoped(p, tag))
            .or_else(|| self.lookup(tag))
    }

    pub fn is_tag_present(&self, tag: &str, caller: &CallerPermissions) -> bool {
        self.resolve(tag, caller).is_some()
    }
}

/// Builder for [`UnionDef`].
#[derive(Debug)]
pub struct UnionDefBuilder {
    name: String,
    tags: TagTable,
    catch_all: Option<String>,
    scoped: Vec<(Permission, TagTable)>,
}

impl UnionDefBuilder {
    /// A tag without a payload.
    pub fn void(self, tag: &str) -> Self {
        self.tag(tag, Primitive::Void)
    }

    pub fn tag(mut self, tag: &str, validator: impl Into<Validator>) -> Self {
        self.tags.push((tag.to_string(), validator.into()));
        self
    }

    /// Add a void tag and mark it as the catch-all.
    pub fn catch_all(mut self, tag: &str) -> Self {
        self = self.void(tag);
        self.catch_all = Some(tag.to_string());
        self
    }

    /// A tag only visible to callers granted `permission`.
    pub fn scoped(mut self, permission: Permission, tag: &str, validator: impl Into<Validator>) -> Self {
        let entry = (tag.to_string(), validator.into());
        match self.scoped.iter_mut().find(|(p, _)| *p == permission) {
            Some((_, table)) => table.push(entry),
            None => self.scoped.push((permission, vec![entry])),
        }
        self
    }

    pub fn build(self) -> Arc<UnionDef> {
        Arc::new(UnionDef {
            name: self.name,
            tags: self.tags,
            catch_all: self.catch_all,
            scoped: self.scoped,
        })
    }
}

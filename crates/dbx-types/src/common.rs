//! # Namespace `common`
//!
//! Aliases and types shared by every other namespace: string constraints for
//! names and identifiers, the `PathRoot` selector sent with requests, and the
//! `RootInfo` struct tree describing a user's or team's root namespace.

use std::sync::{Arc, OnceLock};

use chrono::NaiveDateTime;
use dbx_stone::validators::{StringValidator, StructDef, TimestampValidator, UnionDef, Validator};
use dbx_stone::{Object, StoneType, StructValue, UnionValue, ValidationError};

use crate::{expect_struct, expect_union, payload, payload_string};

// -- Aliases ------------------------------------------------------------------

pub type Date = NaiveDateTime;
pub type DisplayName = String;
pub type DisplayNameLegacy = String;
pub type DropboxTimestamp = NaiveDateTime;
pub type EmailAddress = String;
pub type LanguageCode = String;
pub type NamePart = String;
pub type NamespaceId = String;
pub type OptionalNamePart = String;
pub type SessionId = String;
pub type SharedFolderId = NamespaceId;

const NAME_PATTERN: &str = r#"[^/:?*<>"|]*"#;

pub fn date_validator() -> TimestampValidator {
    TimestampValidator::new("%Y-%m-%d").alias("common.Date")
}

pub fn display_name_validator() -> StringValidator {
    StringValidator::new()
        .pattern(NAME_PATTERN)
        .alias("common.DisplayName")
}

pub fn display_name_legacy_validator() -> StringValidator {
    StringValidator::new().alias("common.DisplayNameLegacy")
}

pub fn dropbox_timestamp_validator() -> TimestampValidator {
    TimestampValidator::new("%Y-%m-%dT%H:%M:%SZ")
        .alias("common.DropboxTimestamp")
}

pub fn email_address_validator() -> StringValidator {
    StringValidator::new()
        .max_length(255)
        .pattern(r"^['#&A-Za-z0-9._%+-]+@[A-Za-z0-9-][A-Za-z0-9.-]*\.[A-Za-z]{2,15}$")
        .alias("common.EmailAddress")
}

pub fn language_code_validator() -> StringValidator {
    StringValidator::new()
        .min_length(2)
        .alias("common.LanguageCode")
}

pub fn name_part_validator() -> StringValidator {
    StringValidator::new()
        .min_length(1)
        .max_length(100)
        .pattern(NAME_PATTERN)
        .alias("common.NamePart")
}

pub fn namespace_id_validator() -> StringValidator {
    StringValidator::new()
        .pattern("[-_0-9a-zA-Z:]+")
        .alias("common.NamespaceId")
}

pub fn optional_name_part_validator() -> StringValidator {
    StringValidator::new()
        .max_length(100)
        .pattern(NAME_PATTERN)
        .alias("common.OptionalNamePart")
}

pub fn session_id_validator() -> StringValidator {
    StringValidator::new().alias("common.SessionId")
}

pub fn shared_folder_id_validator() -> StringValidator {
    namespace_id_validator().alias("common.SharedFolderId")
}

// -- Registry -------------------------------------------------------------------

pub fn path_root_def() -> &'static Arc<UnionDef> {
    static DEF: OnceLock<Arc<UnionDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        UnionDef::builder("common.PathRoot")
            .void("home")
            .tag("root", namespace_id_validator())
            .tag("namespace_id", namespace_id_validator())
            .catch_all("other")
            .build()
    })
}

pub fn path_root_error_def() -> &'static Arc<UnionDef> {
    static DEF: OnceLock<Arc<UnionDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        UnionDef::builder("common.PathRootError")
            .tag("invalid_root", root_info_def())
            .void("no_permission")
            .catch_all("other")
            .build()
    })
}

/// `RootInfo` fields without its subtype table; the parent of both leaves.
fn root_info_fields_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("common.RootInfo")
            .field("root_namespace_id", namespace_id_validator())
            .field("home_namespace_id", namespace_id_validator())
            .build()
    })
}

pub fn team_root_info_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("common.TeamRootInfo")
            .extends(root_info_fields_def())
            .field("home_path", StringValidator::new())
            .build()
    })
}

pub fn user_root_info_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("common.UserRootInfo")
            .extends(root_info_fields_def())
            .build()
    })
}

pub fn root_info_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("common.RootInfo")
            .field("root_namespace_id", namespace_id_validator())
            .field("home_namespace_id", namespace_id_validator())
            .enumerated_subtypes(true)
            .subtype("team", team_root_info_def())
            .subtype("user", user_root_info_def())
            .build()
    })
}

pub(crate) fn struct_defs() -> Vec<&'static Arc<StructDef>> {
    vec![
        root_info_def(),
        team_root_info_def(),
        user_root_info_def(),
    ]
}

pub(crate) fn union_defs() -> Vec<&'static Arc<UnionDef>> {
    vec![path_root_def(), path_root_error_def()]
}

// -- PathRoot -------------------------------------------------------------------

/// Selects the namespace that paths in a request are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRoot {
    /// The user's home namespace.
    Home,
    /// The user's root namespace, checked against the given id.
    Root(NamespaceId),
    /// An explicit namespace the user has access to.
    NamespaceId(NamespaceId),
    Other,
}

impl StoneType for PathRoot {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::union(path_root_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let def = path_root_def();
        let value = match self {
            Self::Home => UnionValue::void(def, "home")?,
            Self::Root(id) => UnionValue::new(def, "root", Some(id.as_str().into()))?,
            Self::NamespaceId(id) => UnionValue::new(def, "namespace_id", Some(id.as_str().into()))?,
            Self::Other => UnionValue::void(def, "other")?,
        };
        Ok(value.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let u = expect_union(obj, "common.PathRoot")?;
        match u.tag() {
            "home" => Ok(Self::Home),
            "root" => Ok(Self::Root(payload_string(&u)?)),
            "namespace_id" => Ok(Self::NamespaceId(payload_string(&u)?)),
            _ => Ok(Self::Other),
        }
    }
}

// -- PathRootError ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRootError {
    /// The root namespace id in the request is not valid; carries the
    /// caller's actual root info.
    InvalidRoot(RootInfo),
    /// The caller may not access the requested namespace.
    NoPermission,
    Other,
}

impl StoneType for PathRootError {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::union(path_root_error_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let def = path_root_error_def();
        let value = match self {
            Self::InvalidRoot(info) => UnionValue::new(def, "invalid_root", Some(info.to_object()?))?,
            Self::NoPermission => UnionValue::void(def, "no_permission")?,
            Self::Other => UnionValue::void(def, "other")?,
        };
        Ok(value.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let u = expect_union(obj, "common.PathRootError")?;
        match u.tag() {
            "invalid_root" => Ok(Self::InvalidRoot(payload(&u)?)),
            "no_permission" => Ok(Self::NoPermission),
            _ => Ok(Self::Other),
        }
    }
}

// -- RootInfo -------------------------------------------------------------------

/// Fields common to every `RootInfo` subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootInfoBase {
    pub root_namespace_id: NamespaceId,
    pub home_namespace_id: NamespaceId,
}

impl RootInfoBase {
    fn from_struct(s: &StructValue) -> Result<Self, ValidationError> {
        Ok(Self {
            root_namespace_id: s.get_str("root_namespace_id")?.to_string(),
            home_namespace_id: s.get_str("home_namespace_id")?.to_string(),
        })
    }

    fn fill(&self, s: StructValue) -> Result<StructValue, ValidationError> {
        s.with("root_namespace_id", self.root_namespace_id.as_str())?
            .with("home_namespace_id", self.home_namespace_id.as_str())
    }
}

/// Root info when the user belongs to a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRootInfo {
    pub root_namespace_id: NamespaceId,
    pub home_namespace_id: NamespaceId,
    /// Path of the team member's home folder relative to the team root.
    pub home_path: String,
}

impl TeamRootInfo {
    fn from_struct(s: &StructValue) -> Result<Self, ValidationError> {
        let base = RootInfoBase::from_struct(s)?;
        Ok(Self {
            root_namespace_id: base.root_namespace_id,
            home_namespace_id: base.home_namespace_id,
            home_path: s.get_str("home_path")?.to_string(),
        })
    }
}

impl StoneType for TeamRootInfo {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(team_root_info_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let base = RootInfoBase {
            root_namespace_id: self.root_namespace_id.clone(),
            home_namespace_id: self.home_namespace_id.clone(),
        };
        let s = base.fill(StructValue::new(team_root_info_def()))?;
        Ok(s.with("home_path", self.home_path.as_str())?.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        Self::from_struct(&expect_struct(obj, "common.TeamRootInfo")?)
    }
}

/// Root info when the user is not on a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRootInfo {
    pub root_namespace_id: NamespaceId,
    pub home_namespace_id: NamespaceId,
}

impl StoneType for UserRootInfo {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(user_root_info_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let base = RootInfoBase {
            root_namespace_id: self.root_namespace_id.clone(),
            home_namespace_id: self.home_namespace_id.clone(),
        };
        Ok(base.fill(StructValue::new(user_root_info_def()))?.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let base = RootInfoBase::from_struct(&expect_struct(obj, "common.UserRootInfo")?)?;
        Ok(Self {
            root_namespace_id: base.root_namespace_id,
            home_namespace_id: base.home_namespace_id,
        })
    }
}

/// Information about the root namespace of the current user or team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootInfo {
    Team(TeamRootInfo),
    User(UserRootInfo),
    /// A subtype this client does not know, decoded as the base type.
    /// Only produced by lenient decoding; it cannot be encoded.
    Unknown(RootInfoBase),
}

impl RootInfo {
    pub fn root_namespace_id(&self) -> &str {
        match self {
            Self::Team(t) => &t.root_namespace_id,
            Self::User(u) => &u.root_namespace_id,
            Self::Unknown(b) => &b.root_namespace_id,
        }
    }

    pub fn home_namespace_id(&self) -> &str {
        match self {
            Self::Team(t) => &t.home_namespace_id,
            Self::User(u) => &u.home_namespace_id,
            Self::Unknown(b) => &b.home_namespace_id,
        }
    }
}

impl StoneType for RootInfo {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(root_info_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        match self {
            Self::Team(t) => t.to_object(),
            Self::User(u) => u.to_object(),
            Self::Unknown(b) => Ok(b.fill(StructValue::new(root_info_def()))?.into()),
        }
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "common.RootInfo")?;
        match s.type_name() {
            "common.TeamRootInfo" => Ok(Self::Team(TeamRootInfo::from_struct(&s)?)),
            "common.UserRootInfo" => Ok(Self::User(UserRootInfo::from_object(s.into())?)),
            _ => Ok(Self::Unknown(RootInfoBase::from_struct(&s)?)),
        }
    }
}

//! # Namespace `users`
//!
//! Account information for the current user and for other accounts the
//! current user can see, plus storage usage.
//!
//! `BasicAccount` and `FullAccount` both extend `Account`; the amount of
//! detail revealed depends on who is asking about whom.

use std::sync::{Arc, OnceLock};

use dbx_stone::validators::{IntegerValidator, StringValidator, StructDef, UnionDef, Validator};
use dbx_stone::{Object, Route, RouteAttrs, StoneType, StructValue, UnionValue, ValidationError};

use crate::users_common::{account_id_validator, account_type_def, AccountId, AccountType};
use crate::{expect_struct, expect_union, nested, nested_opt, opt_string, payload};

// -- Registry -------------------------------------------------------------------

pub fn get_account_arg_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.GetAccountArg")
            .field("account_id", account_id_validator())
            .build()
    })
}

pub fn get_account_error_def() -> &'static Arc<UnionDef> {
    static DEF: OnceLock<Arc<UnionDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        UnionDef::builder("users.GetAccountError")
            .void("no_account")
            .catch_all("unknown")
            .build()
    })
}

pub fn name_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.Name")
            .field("given_name", StringValidator::new())
            .field("surname", StringValidator::new())
            .field("familiar_name", StringValidator::new())
            .field("display_name", StringValidator::new())
            .build()
    })
}

pub fn team_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.Team")
            .field("id", StringValidator::new())
            .field("name", StringValidator::new())
            .build()
    })
}

pub fn account_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.Account")
            .field("account_id", account_id_validator())
            .field("name", name_def())
            .build()
    })
}

pub fn basic_account_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.BasicAccount")
            .extends(account_def())
            .field("is_teammate", Validator::boolean())
            .build()
    })
}

pub fn full_account_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.FullAccount")
            .extends(account_def())
            .field("email", StringValidator::new())
            .field(
                "country",
                Validator::nullable(StringValidator::new().min_length(2).max_length(2)),
            )
            .field("locale", StringValidator::new().min_length(2).max_length(5))
            .field("referral_link", StringValidator::new())
            .field("team", Validator::nullable(team_def()))
            .field("is_paired", Validator::boolean())
            .field("account_type", account_type_def())
            .build()
    })
}

pub fn space_usage_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.SpaceUsage")
            .field("used", IntegerValidator::uint64())
            .field("allocation", space_allocation_def())
            .build()
    })
}

pub fn space_allocation_def() -> &'static Arc<UnionDef> {
    static DEF: OnceLock<Arc<UnionDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        UnionDef::builder("users.SpaceAllocation")
            .tag("individual", individual_space_allocation_def())
            .tag("team", team_space_allocation_def())
            .catch_all("other")
            .build()
    })
}

pub fn individual_space_allocation_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.IndividualSpaceAllocation")
            .field("allocated", IntegerValidator::uint64())
            .build()
    })
}

pub fn team_space_allocation_def() -> &'static Arc<StructDef> {
    static DEF: OnceLock<Arc<StructDef>> = OnceLock::new();
    DEF.get_or_init(|| {
        StructDef::builder("users.TeamSpaceAllocation")
            .field("used", IntegerValidator::uint64())
            .field("allocated", IntegerValidator::uint64())
            .build()
    })
}

pub(crate) fn struct_defs() -> Vec<&'static Arc<StructDef>> {
    vec![
        get_account_arg_def(),
        name_def(),
        team_def(),
        account_def(),
        basic_account_def(),
        full_account_def(),
        space_usage_def(),
        individual_space_allocation_def(),
        team_space_allocation_def(),
    ]
}

pub(crate) fn union_defs() -> Vec<&'static Arc<UnionDef>> {
    vec![get_account_error_def(), space_allocation_def()]
}

// -- GetAccountArg ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAccountArg {
    /// A user's account identifier.
    pub account_id: AccountId,
}

impl StoneType for GetAccountArg {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(get_account_arg_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(get_account_arg_def())
            .with("account_id", self.account_id.as_str())?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.GetAccountArg")?;
        Ok(Self {
            account_id: s.get_str("account_id")?.to_string(),
        })
    }
}

// -- GetAccountError --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetAccountError {
    /// No account exists with the given id, or the caller may not see it.
    NoAccount,
    Unknown,
}

impl StoneType for GetAccountError {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::union(get_account_error_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let tag = match self {
            Self::NoAccount => "no_account",
            Self::Unknown => "unknown",
        };
        Ok(UnionValue::void(get_account_error_def(), tag)?.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let u = expect_union(obj, "users.GetAccountError")?;
        Ok(match u.tag() {
            "no_account" => Self::NoAccount,
            _ => Self::Unknown,
        })
    }
}

// -- Name / Team --------------------------------------------------------------------

/// Representations for a person's name to assist with internationalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub given_name: String,
    pub surname: String,
    /// Locale-dependent name, e.g. a first name in the US or a surname in
    /// Japan.
    pub familiar_name: String,
    pub display_name: String,
}

impl StoneType for Name {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(name_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(name_def())
            .with("given_name", self.given_name.as_str())?
            .with("surname", self.surname.as_str())?
            .with("familiar_name", self.familiar_name.as_str())?
            .with("display_name", self.display_name.as_str())?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.Name")?;
        Ok(Self {
            given_name: s.get_str("given_name")?.to_string(),
            surname: s.get_str("surname")?.to_string(),
            familiar_name: s.get_str("familiar_name")?.to_string(),
            display_name: s.get_str("display_name")?.to_string(),
        })
    }
}

/// The team a user belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
}

impl StoneType for Team {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(team_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(team_def())
            .with("id", self.id.as_str())?
            .with("name", self.name.as_str())?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.Team")?;
        Ok(Self {
            id: s.get_str("id")?.to_string(),
            name: s.get_str("name")?.to_string(),
        })
    }
}

// -- Accounts -------------------------------------------------------------------

/// Fields shared by every account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: AccountId,
    pub name: Name,
}

impl Account {
    fn from_struct(s: &StructValue) -> Result<Self, ValidationError> {
        Ok(Self {
            account_id: s.get_str("account_id")?.to_string(),
            name: nested(s, "name")?,
        })
    }

    fn fill(&self, s: StructValue) -> Result<StructValue, ValidationError> {
        s.with("account_id", self.account_id.as_str())?
            .with("name", self.name.to_object()?)
    }
}

impl StoneType for Account {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(account_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(self.fill(StructValue::new(account_def()))?.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        Self::from_struct(&expect_struct(obj, "users.Account")?)
    }
}

/// Basic information about any account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAccount {
    pub account: Account,
    /// Whether this user is a teammate of the current user. True when the
    /// account is the current user's own.
    pub is_teammate: bool,
}

impl StoneType for BasicAccount {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(basic_account_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(self
            .account
            .fill(StructValue::new(basic_account_def()))?
            .with("is_teammate", self.is_teammate)?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.BasicAccount")?;
        Ok(Self {
            account: Account::from_struct(&s)?,
            is_teammate: s.get_bool("is_teammate")?,
        })
    }
}

/// Detailed information about the current user's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullAccount {
    pub account: Account,
    pub email: String,
    /// ISO 3166-1 country code, when known.
    pub country: Option<String>,
    /// IETF language tag of the user's locale.
    pub locale: String,
    pub referral_link: String,
    /// Present only when the user belongs to a team.
    pub team: Option<Team>,
    /// Whether the user has a personal and a work account linked.
    pub is_paired: bool,
    pub account_type: AccountType,
}

impl StoneType for FullAccount {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(full_account_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let mut s = self
            .account
            .fill(StructValue::new(full_account_def()))?
            .with("email", self.email.as_str())?
            .with("locale", self.locale.as_str())?
            .with("referral_link", self.referral_link.as_str())?
            .with("is_paired", self.is_paired)?
            .with("account_type", self.account_type.to_object()?)?;
        if let Some(country) = &self.country {
            s.set("country", country.as_str())?;
        }
        if let Some(team) = &self.team {
            s.set("team", team.to_object()?)?;
        }
        Ok(s.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.FullAccount")?;
        Ok(Self {
            account: Account::from_struct(&s)?,
            email: s.get_str("email")?.to_string(),
            country: opt_string(&s, "country")?,
            locale: s.get_str("locale")?.to_string(),
            referral_link: s.get_str("referral_link")?.to_string(),
            team: nested_opt(&s, "team")?,
            is_paired: s.get_bool("is_paired")?,
            account_type: nested(&s, "account_type")?,
        })
    }
}

// -- Space usage ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndividualSpaceAllocation {
    /// Total space allocated to the user's account, in bytes.
    pub allocated: u64,
}

impl StoneType for IndividualSpaceAllocation {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(individual_space_allocation_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(individual_space_allocation_def())
            .with("allocated", self.allocated)?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.IndividualSpaceAllocation")?;
        Ok(Self {
            allocated: s.get_u64("allocated")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamSpaceAllocation {
    /// Total space used by the team, in bytes.
    pub used: u64,
    /// Total space allocated to the team, in bytes.
    pub allocated: u64,
}

impl StoneType for TeamSpaceAllocation {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(team_space_allocation_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(team_space_allocation_def())
            .with("used", self.used)?
            .with("allocated", self.allocated)?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.TeamSpaceAllocation")?;
        Ok(Self {
            used: s.get_u64("used")?,
            allocated: s.get_u64("allocated")?,
        })
    }
}

/// Space is allocated differently depending on the account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceAllocation {
    Individual(IndividualSpaceAllocation),
    Team(TeamSpaceAllocation),
    Other,
}

impl StoneType for SpaceAllocation {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::union(space_allocation_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        let def = space_allocation_def();
        let value = match self {
            Self::Individual(a) => UnionValue::new(def, "individual", Some(a.to_object()?))?,
            Self::Team(a) => UnionValue::new(def, "team", Some(a.to_object()?))?,
            Self::Other => UnionValue::void(def, "other")?,
        };
        Ok(value.into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let u = expect_union(obj, "users.SpaceAllocation")?;
        match u.tag() {
            "individual" => Ok(Self::Individual(payload(&u)?)),
            "team" => Ok(Self::Team(payload(&u)?)),
            _ => Ok(Self::Other),
        }
    }
}

/// Information about a user's space usage and quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceUsage {
    /// Total space used by the user, in bytes.
    pub used: u64,
    pub allocation: SpaceAllocation,
}

impl StoneType for SpaceUsage {
    fn validator() -> &'static Validator {
        static V: OnceLock<Validator> = OnceLock::new();
        V.get_or_init(|| Validator::structure(space_usage_def()))
    }

    fn to_object(&self) -> Result<Object, ValidationError> {
        Ok(StructValue::new(space_usage_def())
            .with("used", self.used)?
            .with("allocation", self.allocation.to_object()?)?
            .into())
    }

    fn from_object(obj: Object) -> Result<Self, ValidationError> {
        let s = expect_struct(obj, "users.SpaceUsage")?;
        Ok(Self {
            used: s.get_u64("used")?,
            allocation: nested(&s, "allocation")?,
        })
    }
}

// -- Routes -----------------------------------------------------------------------

fn users_route(name: &'static str, arg: &Validator, result: &Validator, error: &Validator) -> Route {
    Route {
        namespace: "users",
        name,
        version: 1,
        deprecated: false,
        arg: arg.clone(),
        result: result.clone(),
        error: error.clone(),
        attrs: RouteAttrs::default(),
    }
}

/// `users/get_account`: information about a user's account.
pub fn get_account() -> &'static Route {
    static ROUTE: OnceLock<Route> = OnceLock::new();
    ROUTE.get_or_init(|| {
        users_route(
            "get_account",
            GetAccountArg::validator(),
            BasicAccount::validator(),
            GetAccountError::validator(),
        )
    })
}

/// `users/get_current_account`: information about the current user's account.
pub fn get_current_account() -> &'static Route {
    static ROUTE: OnceLock<Route> = OnceLock::new();
    ROUTE.get_or_init(|| {
        users_route(
            "get_current_account",
            <()>::validator(),
            FullAccount::validator(),
            <()>::validator(),
        )
    })
}

/// `users/get_space_usage`: the space usage information for the current user.
pub fn get_space_usage() -> &'static Route {
    static ROUTE: OnceLock<Route> = OnceLock::new();
    ROUTE.get_or_init(|| {
        users_route(
            "get_space_usage",
            <()>::validator(),
            SpaceUsage::validator(),
            <()>::validator(),
        )
    })
}

pub(crate) fn routes() -> Vec<&'static Route> {
    vec![get_account(), get_current_account(), get_space_usage()]
}

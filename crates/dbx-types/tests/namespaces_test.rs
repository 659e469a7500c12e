//! Decoding server responses into the generated types, the way the request
//! layer does it: results and errors leniently, arguments strictly.

use std::sync::OnceLock;

use dbx_stone::{
    from_json, json_decode, to_json, AliasValidators, DecodeOptions, EncodeOptions, Object,
    StoneType, ValidationError,
};
use dbx_types::auth::{RateLimitError, RateLimitReason};
use dbx_types::check::EchoArg;
use dbx_types::common::{PathRoot, PathRootError, RootInfo, UserRootInfo};
use dbx_types::users::{FullAccount, GetAccountArg, SpaceAllocation, SpaceUsage};
use dbx_types::users_common::AccountType;

const FULL_ACCOUNT: &str = r#"{
    "account_id": "dbid:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc",
    "name": {
        "given_name": "Franz",
        "surname": "Ferdinand",
        "familiar_name": "Franz",
        "display_name": "Franz Ferdinand (Personal)",
        "abbreviated_name": "FF"
    },
    "email": "franz@dropbox.com",
    "email_verified": true,
    "disabled": false,
    "locale": "en",
    "referral_link": "https://db.tt/ZITNuhtI",
    "is_paired": true,
    "account_type": {".tag": "business"},
    "root_info": {".tag": "user", "root_namespace_id": "3235641", "home_namespace_id": "3235641"},
    "country": "US",
    "team": {"id": "dbtid:AAFdgehTzw7WlXhZJsbGCLePe8RvQGYDr-I", "name": "Acme, Inc."}
}"#;

#[test]
fn full_account_tolerates_newer_fields_when_lenient() {
    let account: FullAccount = from_json(FULL_ACCOUNT, &DecodeOptions::lenient()).unwrap();
    assert_eq!(account.account.name.surname, "Ferdinand");
    assert_eq!(account.country.as_deref(), Some("US"));
    assert_eq!(account.account_type, AccountType::Business);
    assert_eq!(account.team.map(|t| t.name).as_deref(), Some("Acme, Inc."));
}

#[test]
fn full_account_rejects_newer_fields_when_strict() {
    let err = from_json::<FullAccount>(FULL_ACCOUNT, &DecodeOptions::strict()).unwrap_err();
    assert!(err.message().contains("unknown field"), "{err}");
}

#[test]
fn full_account_without_team_or_country() {
    let text = r#"{
        "account_id": "dbid:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc",
        "name": {"given_name": "A", "surname": "B", "familiar_name": "A", "display_name": "A B"},
        "email": "a@b.com",
        "locale": "en-GB",
        "referral_link": "https://db.tt/x",
        "is_paired": false,
        "account_type": "basic",
        "team": null
    }"#;
    let account: FullAccount = from_json(text, &DecodeOptions::strict()).unwrap();
    assert_eq!(account.team, None);
    assert_eq!(account.country, None);

    let back = to_json(&account, &EncodeOptions::default()).unwrap();
    let again: FullAccount = from_json(&back, &DecodeOptions::strict()).unwrap();
    assert_eq!(again, account);
}

#[test]
fn root_info_dispatches_on_subtype_tag() {
    let text = r#"{".tag": "user", "root_namespace_id": "7", "home_namespace_id": "7"}"#;
    let info: RootInfo = from_json(text, &DecodeOptions::strict()).unwrap();
    assert_eq!(
        info,
        RootInfo::User(UserRootInfo {
            root_namespace_id: "7".into(),
            home_namespace_id: "7".into(),
        })
    );

    let text = r#"{".tag": "team", "root_namespace_id": "7", "home_namespace_id": "8", "home_path": "/Franz"}"#;
    let info: RootInfo = from_json(text, &DecodeOptions::strict()).unwrap();
    assert!(matches!(info, RootInfo::Team(ref t) if t.home_path == "/Franz"));
}

#[test]
fn path_root_error_carries_actual_root() {
    let text = r#"{
        ".tag": "invalid_root",
        "invalid_root": {".tag": "team", "root_namespace_id": "1", "home_namespace_id": "2", "home_path": "/x"}
    }"#;
    let err: PathRootError = from_json(text, &DecodeOptions::lenient()).unwrap();
    match err {
        PathRootError::InvalidRoot(info) => assert_eq!(info.root_namespace_id(), "1"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn path_root_unknown_tag_is_other_only_when_lenient() {
    let text = r#"{".tag": "shared_space"}"#;
    let root: PathRoot = from_json(text, &DecodeOptions::lenient()).unwrap();
    assert_eq!(root, PathRoot::Other);
    assert!(json_decode(PathRoot::validator(), text, &DecodeOptions::strict()).is_err());
}

#[test]
fn echo_arg_default_is_not_sent() {
    assert_eq!(to_json(&EchoArg::default(), &EncodeOptions::default()).unwrap(), "{}");
    let arg: EchoArg = from_json("{}", &DecodeOptions::strict()).unwrap();
    assert_eq!(arg.query, None);
    let arg: EchoArg = from_json(r#"{"query": "ping"}"#, &DecodeOptions::strict()).unwrap();
    assert_eq!(arg.query.as_deref(), Some("ping"));
}

#[test]
fn rate_limit_error_defaults() {
    let err: RateLimitError =
        from_json(r#"{"reason": "too_many_write_operations"}"#, &DecodeOptions::lenient()).unwrap();
    assert_eq!(err.reason, RateLimitReason::TooManyWriteOperations);
    assert_eq!(err.retry_after_secs(), 1);

    let err: RateLimitError = from_json(
        r#"{"reason": {".tag": "too_many_requests"}, "retry_after": 30}"#,
        &DecodeOptions::lenient(),
    )
    .unwrap();
    assert_eq!(err.retry_after_secs(), 30);
}

#[test]
fn space_usage_individual() {
    let usage: SpaceUsage = from_json(
        r#"{"used": 314159, "allocation": {".tag": "individual", "allocated": 2147483648}}"#,
        &DecodeOptions::strict(),
    )
    .unwrap();
    assert_eq!(usage.used, 314159);
    assert!(matches!(
        usage.allocation,
        SpaceAllocation::Individual(a) if a.allocated == 2_147_483_648
    ));
}

#[test]
fn registries_check_clean() {
    dbx_types::check_registries().unwrap();
    assert_eq!(dbx_types::all_routes().len(), 5);
}

fn dbid_only() -> &'static AliasValidators {
    static CHECKS: OnceLock<AliasValidators> = OnceLock::new();
    CHECKS.get_or_init(|| {
        AliasValidators::new().with("users_common.AccountId", |obj: &Object| match obj {
            Object::String(id) if !id.starts_with("dbid:") => {
                Err(ValidationError::new(format!("'{id}' is not a dbid")))
            }
            _ => Ok(()),
        })
    })
}

#[test]
fn alias_checks_apply_to_account_ids() {
    let options = DecodeOptions::lenient().with_aliases(dbid_only());
    let account: FullAccount = from_json(FULL_ACCOUNT, &options).unwrap();
    assert!(account.account.account_id.starts_with("dbid:"));

    let foreign = FULL_ACCOUNT.replace("dbid:AAH4f99T0taONIb", "xxxx:AAH4f99T0taONIb");
    let err = from_json::<FullAccount>(&foreign, &options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "account_id: 'xxxx:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc' is not a dbid"
    );
    // Without the registry only the schema's own constraints apply.
    assert!(from_json::<FullAccount>(&foreign, &DecodeOptions::lenient()).is_ok());

    let arg = GetAccountArg {
        account_id: "xxxx:AAH4f99T0taONIb-OurWxbNQ6ywGRopQngc".into(),
    };
    assert!(to_json(&arg, &EncodeOptions::default()).is_ok());
    let err = to_json(&arg, &EncodeOptions::default().with_aliases(dbid_only())).unwrap_err();
    assert!(err.to_string().ends_with("is not a dbid"), "{err}");
}

//! # Wire Behaviour Tests
//!
//! End-to-end checks of the encode/decode engine against a small schema:
//! a struct tree (`Animal` with `Dog` and `Cat` leaves), a union with a
//! catch-all, and plain structs with required, defaulted and nullable
//! fields. Each test pins one observable rule of the JSON wire format.

use std::sync::Arc;

use dbx_stone::validators::{IntegerValidator, StringValidator, TimestampValidator};
use dbx_stone::{
    json_compat_decode, json_compat_encode, CallerPermissions, DecodeOptions, EncodeOptions,
    Object, Permission, StructDef, StructValue, UnionDef, UnionValue, ValidationError, Validator,
};
use serde_json::{json, Value};

// -- Schema -------------------------------------------------------------------

struct Zoo {
    animal: Arc<StructDef>,
    animal_fields: Arc<StructDef>,
    dog: Arc<StructDef>,
    cat: Arc<StructDef>,
}

fn zoo(catch_all: bool) -> Zoo {
    let animal_fields = StructDef::builder("zoo.Animal")
        .field("name", StringValidator::new())
        .build();
    let dog = StructDef::builder("zoo.Dog")
        .extends(&animal_fields)
        .field("good_boy", Validator::nullable(Validator::boolean()))
        .build();
    let cat = StructDef::builder("zoo.Cat")
        .extends(&animal_fields)
        .field_with_default("lives", IntegerValidator::uint32().max_value(9), 9u32)
        .build();
    let animal = StructDef::builder("zoo.Animal")
        .field("name", StringValidator::new())
        .enumerated_subtypes(catch_all)
        .subtype("dog", &dog)
        .subtype("cat", &cat)
        .build();
    Zoo {
        animal,
        animal_fields,
        dog,
        cat,
    }
}

fn feeding() -> Arc<UnionDef> {
    let meal = StructDef::builder("zoo.Meal")
        .field("food", StringValidator::new())
        .field("grams", Validator::nullable(IntegerValidator::uint32()))
        .build();
    UnionDef::builder("zoo.Feeding")
        .void("fasting")
        .tag("snack", StringValidator::new())
        .tag("meal", &meal)
        .tag("maybe_meal", Validator::nullable(&meal))
        .tag("maybe_snack", Validator::nullable(StringValidator::new()))
        .scoped(Permission::Internal, "vet_override", StringValidator::new())
        .catch_all("other")
        .build()
}

fn strict() -> DecodeOptions {
    DecodeOptions::strict()
}

fn lenient() -> DecodeOptions {
    DecodeOptions::lenient()
}

fn enc(v: &Validator, obj: &Object) -> Value {
    json_compat_encode(v, obj, &EncodeOptions::default()).unwrap()
}

fn dec(v: &Validator, doc: Value, options: DecodeOptions) -> Result<Object, ValidationError> {
    json_compat_decode(v, &doc, &options)
}

// -- Structs ------------------------------------------------------------------

#[test]
fn unknown_field_rejected_only_when_strict() {
    let z = zoo(false);
    let v = Validator::Struct(Arc::clone(&z.dog));
    let doc = json!({"name": "Rex", "tail": "wagging"});

    let err = dec(&v, doc.clone(), strict()).unwrap_err();
    assert_eq!(err.message(), "unknown field 'tail'");

    let obj = dec(&v, doc, lenient()).unwrap();
    assert_eq!(obj.as_struct().unwrap().get_str("name").unwrap(), "Rex");
}

#[test]
fn tag_prefixed_keys_are_tolerated_in_structs() {
    let z = zoo(false);
    let v = Validator::Struct(Arc::clone(&z.dog));
    assert!(dec(&v, json!({".tag": "dog", "name": "Rex"}), strict()).is_ok());
}

#[test]
fn missing_required_field_names_the_field() {
    let z = zoo(false);
    let v = Validator::Struct(Arc::clone(&z.dog));
    let err = dec(&v, json!({}), strict()).unwrap_err();
    assert_eq!(err.path(), "name");
    assert_eq!(err.to_string(), "name: missing required field");
}

#[test]
fn nested_errors_carry_full_path() {
    let z = zoo(false);
    let pen = StructDef::builder("zoo.Pen")
        .field("cats", Validator::list(&z.cat))
        .build();
    let v = Validator::structure(&pen);
    let doc = json!({"cats": [{"name": "Tom"}, {"name": "Kit", "lives": 12}]});
    let err = dec(&v, doc, strict()).unwrap_err();
    assert_eq!(err.path(), "cats[1].lives");
}

#[test]
fn unset_nullable_field_is_omitted() {
    let z = zoo(false);
    let v = Validator::Struct(Arc::clone(&z.dog));
    let dog = StructValue::new(&z.dog).with("name", "Rex").unwrap();
    assert_eq!(enc(&v, &Object::Struct(dog.clone())), json!({"name": "Rex"}));

    let explicit_null = dog.with("good_boy", Object::Null).unwrap();
    assert_eq!(enc(&v, &Object::Struct(explicit_null)), json!({"name": "Rex"}));
}

#[test]
fn declared_default_is_not_serialized_unless_set() {
    let z = zoo(false);
    let v = Validator::Struct(Arc::clone(&z.cat));
    let cat = StructValue::new(&z.cat).with("name", "Tom").unwrap();
    assert_eq!(cat.get_u32("lives").unwrap(), 9);
    assert_eq!(enc(&v, &Object::Struct(cat.clone())), json!({"name": "Tom"}));

    let cat = cat.with("lives", 3u32).unwrap();
    assert_eq!(enc(&v, &Object::Struct(cat)), json!({"name": "Tom", "lives": 3}));
}

#[test]
fn encode_requires_required_fields() {
    let z = zoo(false);
    let v = Validator::Struct(Arc::clone(&z.dog));
    let err = json_compat_encode(&v, &Object::Struct(StructValue::new(&z.dog)), &EncodeOptions::default())
        .unwrap_err();
    assert_eq!(err.as_validation().unwrap().path(), "name");
}

// -- Integers and booleans ------------------------------------------------------

#[test]
fn bool_encodes_as_integer_and_decodes_as_integer() {
    let v = Validator::from(IntegerValidator::int64());
    assert_eq!(enc(&v, &Object::Bool(true)), json!(1));
    assert_eq!(dec(&v, json!(1), strict()).unwrap(), Object::Integer(1));
    assert!(dec(&v, json!(true), strict()).is_err());
}

// -- Timestamps -----------------------------------------------------------------

#[test]
fn timestamp_uses_validator_format() {
    let v = Validator::from(TimestampValidator::new("%Y-%m-%dT%H:%M:%SZ"));
    let obj = dec(&v, json!("2016-04-01T09:30:00Z"), strict()).unwrap();
    assert_eq!(enc(&v, &obj), json!("2016-04-01T09:30:00Z"));
    let err = dec(&v, json!("April 1st"), strict()).unwrap_err();
    assert!(err.message().contains("does not match format"));
}

// -- Unions ---------------------------------------------------------------------

#[test]
fn union_new_style_shapes() {
    let def = feeding();
    let v = Validator::union(&def);

    let fasting = Object::Union(UnionValue::void(&def, "fasting").unwrap());
    assert_eq!(enc(&v, &fasting), json!({".tag": "fasting"}));

    let snack = Object::Union(UnionValue::new(&def, "snack", Some("carrot".into())).unwrap());
    assert_eq!(enc(&v, &snack), json!({".tag": "snack", "snack": "carrot"}));

    let Some(Validator::Struct(meal_def)) = def.lookup("meal").cloned() else {
        panic!("meal is a struct member");
    };
    let meal = StructValue::new(&meal_def).with("food", "hay").unwrap();
    let meal = Object::Union(UnionValue::new(&def, "meal", Some(meal.into())).unwrap());
    assert_eq!(enc(&v, &meal), json!({".tag": "meal", "food": "hay"}));

    let absent = Object::Union(UnionValue::new(&def, "maybe_snack", None).unwrap());
    assert_eq!(enc(&v, &absent), json!({".tag": "maybe_snack"}));
}

#[test]
fn union_decodes_flattened_struct_member() {
    let def = feeding();
    let v = Validator::union(&def);
    let obj = dec(&v, json!({".tag": "meal", "food": "hay", "grams": 500}), strict()).unwrap();
    let u = obj.as_union().unwrap();
    assert!(u.is("meal"));
    let meal = u.value().unwrap().as_struct().unwrap();
    assert_eq!(meal.get_u32("grams").unwrap(), 500);
}

#[test]
fn union_string_form_for_void_tag() {
    let def = feeding();
    let v = Validator::union(&def);
    let obj = dec(&v, json!("fasting"), strict()).unwrap();
    assert!(obj.as_union().unwrap().is("fasting"));
    let err = dec(&v, json!("snack"), strict()).unwrap_err();
    assert_eq!(err.message(), "expected object for 'snack', got symbol");
}

#[test]
fn unknown_tag_maps_to_catch_all_when_lenient() {
    let def = feeding();
    let v = Validator::union(&def);
    let doc = json!({".tag": "totally_unknown_tag"});

    let obj = dec(&v, doc.clone(), lenient()).unwrap();
    let u = obj.as_union().unwrap();
    assert_eq!(u.tag(), "other");
    assert!(u.value().is_none());

    let err = dec(&v, doc, strict()).unwrap_err();
    assert_eq!(err.message(), "unknown tag 'totally_unknown_tag'");
}

#[test]
fn explicit_catch_all_tag_is_always_rejected() {
    let def = feeding();
    let v = Validator::union(&def);
    for options in [strict(), lenient()] {
        let err = dec(&v, json!({".tag": "other"}), options).unwrap_err();
        assert_eq!(err.message(), "unexpected use of the catch-all tag 'other'");
        assert!(dec(&v, json!("other"), options).is_err());
    }
}

#[test]
fn void_member_extra_keys_checked_only_when_strict() {
    let def = feeding();
    let v = Validator::union(&def);
    let doc = json!({".tag": "fasting", "fasting": "since noon"});
    assert!(dec(&v, doc.clone(), strict()).is_err());
    assert!(dec(&v, doc, lenient()).is_ok());
}

#[test]
fn primitive_member_rejects_extra_keys_in_both_modes() {
    let def = feeding();
    let v = Validator::union(&def);
    let doc = json!({".tag": "snack", "snack": "carrot", "extra": 1});
    for options in [strict(), lenient()] {
        assert_eq!(
            dec(&v, doc.clone(), options).unwrap_err().message(),
            "unexpected key 'extra'"
        );
    }
    let missing = dec(&v, json!({".tag": "snack"}), strict()).unwrap_err();
    assert_eq!(missing.message(), "missing 'snack' key");
}

#[test]
fn nullable_member_may_omit_payload() {
    let def = feeding();
    let v = Validator::union(&def);
    let obj = dec(&v, json!({".tag": "maybe_snack"}), strict()).unwrap();
    assert!(obj.as_union().unwrap().value().is_none());
    let obj = dec(&v, json!({".tag": "maybe_snack", "maybe_snack": null}), strict()).unwrap();
    assert!(obj.as_union().unwrap().value().is_none());
}

#[test]
fn nullable_struct_member_with_only_tag_has_no_payload() {
    let def = feeding();
    let v = Validator::union(&def);
    for options in [strict(), lenient()] {
        let obj = dec(&v, json!({".tag": "maybe_meal"}), options).unwrap();
        let u = obj.as_union().unwrap();
        assert!(u.is("maybe_meal"));
        assert!(u.value().is_none());
    }

    let obj = dec(&v, json!({".tag": "maybe_meal", "food": "oats", "grams": 80}), strict()).unwrap();
    let meal = obj.as_union().unwrap().value().unwrap().as_struct().unwrap();
    assert_eq!(meal.get_str("food").unwrap(), "oats");
    assert_eq!(meal.get_u32("grams").unwrap(), 80);
    assert_eq!(enc(&v, &obj), json!({".tag": "maybe_meal", "food": "oats", "grams": 80}));

    let err = dec(&v, json!({".tag": "maybe_meal", "grams": 80}), strict()).unwrap_err();
    assert_eq!(err.to_string(), "maybe_meal.food: missing required field");
}

#[test]
fn empty_optional_struct_payload_decodes_as_absent() {
    let leftovers = StructDef::builder("zoo.Leftovers")
        .field("grams", Validator::nullable(IntegerValidator::uint32()))
        .build();
    let def = UnionDef::builder("zoo.Bowl")
        .void("empty")
        .tag("leftovers", Validator::nullable(&leftovers))
        .build();
    let v = Validator::union(&def);

    // An instance with no fields set encodes to the bare tag, which reads
    // back as "no payload" rather than as an empty instance.
    let empty = StructValue::new(&leftovers);
    let obj = Object::Union(UnionValue::new(&def, "leftovers", Some(empty.into())).unwrap());
    let doc = enc(&v, &obj);
    assert_eq!(doc, json!({".tag": "leftovers"}));
    let back = dec(&v, doc, strict()).unwrap();
    assert!(back.as_union().unwrap().value().is_none());
    assert_ne!(back, obj);

    let some = StructValue::new(&leftovers).with("grams", 12u32).unwrap();
    let obj = Object::Union(UnionValue::new(&def, "leftovers", Some(some.into())).unwrap());
    assert_eq!(dec(&v, enc(&v, &obj), strict()).unwrap(), obj);
}

#[test]
fn union_member_errors_carry_tag() {
    let def = feeding();
    let v = Validator::union(&def);
    let err = dec(&v, json!({".tag": "snack", "snack": 5}), strict()).unwrap_err();
    assert_eq!(err.to_string(), "snack: expected string, got integer");
}

#[test]
fn union_tag_must_be_string() {
    let def = feeding();
    let v = Validator::union(&def);
    let err = dec(&v, json!({".tag": 3}), strict()).unwrap_err();
    assert_eq!(err.message(), "tag must be string, got integer");
    let err = dec(&v, json!({"snack": "x"}), strict()).unwrap_err();
    assert_eq!(err.message(), "missing '.tag' key");
}

#[test]
fn scoped_tag_needs_grant_to_encode() {
    let def = feeding();
    let v = Validator::union(&def);
    let obj = Object::Union(UnionValue::new(&def, "vet_override", Some("sedate".into())).unwrap());

    assert!(json_compat_encode(&v, &obj, &EncodeOptions::default()).is_err());

    let granted = EncodeOptions::default()
        .with_permissions(CallerPermissions::new([Permission::Internal]));
    let doc = json_compat_encode(&v, &obj, &granted).unwrap();
    assert_eq!(doc, json!({".tag": "vet_override", "vet_override": "sedate"}));

    // Scoped tags are not decodable from the base table.
    assert!(dec(&v, doc, strict()).is_err());
}

// -- Old-style unions -----------------------------------------------------------

#[test]
fn old_style_union_round_trip() {
    let def = feeding();
    let v = Validator::union(&def);
    let old = EncodeOptions::old_style();
    let old_decode = DecodeOptions::strict().with_old_style(true);

    let fasting = Object::Union(UnionValue::void(&def, "fasting").unwrap());
    let doc = json_compat_encode(&v, &fasting, &old).unwrap();
    assert_eq!(doc, json!("fasting"));
    assert_eq!(json_compat_decode(&v, &doc, &old_decode).unwrap(), fasting);

    let snack = Object::Union(UnionValue::new(&def, "snack", Some("apple".into())).unwrap());
    let doc = json_compat_encode(&v, &snack, &old).unwrap();
    assert_eq!(doc, json!({"snack": "apple"}));
    assert_eq!(json_compat_decode(&v, &doc, &old_decode).unwrap(), snack);
}

#[test]
fn old_style_void_with_value_tolerated_only_when_lenient() {
    let def = feeding();
    let v = Validator::union(&def);
    let doc = json!({"fasting": true});
    assert!(json_compat_decode(&v, &doc, &DecodeOptions::strict().with_old_style(true)).is_err());
    assert!(json_compat_decode(&v, &doc, &DecodeOptions::lenient().with_old_style(true)).is_ok());
    let two = json!({"fasting": null, "snack": "x"});
    let err = json_compat_decode(&v, &two, &DecodeOptions::strict().with_old_style(true)).unwrap_err();
    assert_eq!(err.message(), "expected 1 key, got 2");
}

#[test]
fn old_style_explicit_catch_all_is_rejected() {
    let def = feeding();
    let v = Validator::union(&def);
    for options in [strict(), lenient()] {
        let options = options.with_old_style(true);
        let err = json_compat_decode(&v, &json!({"other": null}), &options).unwrap_err();
        assert_eq!(err.message(), "unexpected use of the catch-all tag 'other'");
        assert!(json_compat_decode(&v, &json!("other"), &options).is_err());
    }
    let obj = json_compat_decode(
        &v,
        &json!({"brand_new": 1}),
        &DecodeOptions::lenient().with_old_style(true),
    )
    .unwrap();
    assert_eq!(obj.as_union().unwrap().tag(), "other");
}

// -- Struct trees ---------------------------------------------------------------

#[test]
fn struct_tree_dispatches_on_tag() {
    let z = zoo(false);
    let v = Validator::StructTree(Arc::clone(&z.animal));
    let obj = dec(&v, json!({".tag": "dog", "name": "Rex"}), strict()).unwrap();
    let dog = obj.as_struct().unwrap();
    assert_eq!(dog.type_name(), "zoo.Dog");
    assert_eq!(dog.get_str("name").unwrap(), "Rex");
}

#[test]
fn struct_tree_encodes_leaf_with_tag() {
    let z = zoo(false);
    let v = Validator::StructTree(Arc::clone(&z.animal));
    let cat = StructValue::new(&z.cat)
        .with("name", "Tom")
        .unwrap()
        .with("lives", 7u32)
        .unwrap();
    let obj = Object::Struct(cat);
    let doc = enc(&v, &obj);
    assert_eq!(doc, json!({".tag": "cat", "name": "Tom", "lives": 7}));
    assert_eq!(dec(&v, doc, strict()).unwrap(), obj);

    let old = json_compat_encode(&v, &obj, &EncodeOptions::old_style()).unwrap();
    assert_eq!(old, json!({"cat": {"name": "Tom", "lives": 7}}));
}

#[test]
fn unknown_subtype_strict_and_lenient() {
    let doc = json!({".tag": "fish", "name": "Nemo"});

    let closed = zoo(false);
    let v = Validator::StructTree(Arc::clone(&closed.animal));
    assert_eq!(
        dec(&v, doc.clone(), strict()).unwrap_err().message(),
        "unknown subtype 'fish'"
    );
    assert_eq!(
        dec(&v, doc.clone(), lenient()).unwrap_err().message(),
        "unknown subtype 'fish' and 'zoo.Animal' is not a catch-all"
    );

    let open = zoo(true);
    let v = Validator::StructTree(Arc::clone(&open.animal));
    let obj = dec(&v, doc, lenient()).unwrap();
    let base = obj.as_struct().unwrap();
    assert_eq!(base.type_name(), "zoo.Animal");
    assert_eq!(base.get_str("name").unwrap(), "Nemo");
}

#[test]
fn unregistered_subtype_is_a_consistency_error() {
    let z = zoo(false);
    let v = Validator::StructTree(Arc::clone(&z.animal));
    let bird = StructDef::builder("zoo.Bird").extends(&z.animal_fields).build();
    let obj = Object::Struct(StructValue::new(&bird).with("name", "Tweety").unwrap());
    let err = json_compat_encode(&v, &obj, &EncodeOptions::default()).unwrap_err();
    assert!(err.is_consistency());
}

#[test]
fn non_leaf_tag_is_rejected() {
    let z = zoo(false);
    let canine = StructDef::builder("zoo.Canine")
        .extends(&z.animal_fields)
        .enumerated_subtypes(false)
        .subtype("dog", &z.dog)
        .build();
    let animal = StructDef::builder("zoo.Animal")
        .field("name", StringValidator::new())
        .enumerated_subtypes(false)
        .subtype("canine", &canine)
        .subtype_path(&["canine", "dog"], &z.dog)
        .build();
    assert!(animal.check_consistency().is_ok());
    let v = Validator::StructTree(animal);
    let err = dec(&v, json!({".tag": "canine", "name": "Rex"}), strict()).unwrap_err();
    assert_eq!(err.message(), "tag 'canine' refers to non-leaf subtype");

    // Only the single `.tag` value is looked up, so a leaf registered under
    // a longer path is not reachable from the wire.
    let err = dec(&v, json!({".tag": "dog", "name": "Rex"}), strict()).unwrap_err();
    assert_eq!(err.message(), "unknown subtype 'dog'");
}

#[test]
fn struct_tree_tag_must_be_string() {
    let z = zoo(false);
    let v = Validator::StructTree(Arc::clone(&z.animal));
    let err = dec(&v, json!({".tag": ["dog"], "name": "Rex"}), strict()).unwrap_err();
    assert_eq!(err.to_string(), ".tag: expected string, got list");
}

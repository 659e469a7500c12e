//! # dbx-stone -- Validator Runtime and Serialization Engine
//!
//! This crate is the runtime every generated API type relies on. It defines
//! the composable validator system, the dynamic object model that validators
//! check, and the recursive engine that turns objects into wire documents and
//! back. Every other crate in the workspace depends on `dbx-stone`; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One closed `Validator` enum.** Primitive, list, nullable, struct,
//!    struct tree and union. Encode, decode and validation all `match`
//!    exhaustively, so adding a kind forces every consumer to handle it.
//!
//! 2. **Definitions are shared, instances are cheap.** `StructDef` and
//!    `UnionDef` are built once behind `Arc`; `StructValue` and `UnionValue`
//!    point at them and validate on every assignment.
//!
//! 3. **One traversal, two formats.** The engine is generic over the `Wire`
//!    trait; JSON and MessagePack differ only in how bytes travel.
//!
//! 4. **Forward compatibility is opt-in.** Strict decoding rejects anything
//!    unknown. Lenient decoding maps unknown union tags to the catch-all and
//!    unknown subtypes to their base, and logs each fallback at `debug`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dbx-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Schema registration defects surface as `StoneError::Consistency`, never
//!   as a panic.

pub mod alias;
pub mod decode;
pub mod encode;
pub mod error;
pub mod json;
pub mod object;
pub mod route;
pub mod typed;
pub mod validators;
pub mod wire;

#[cfg(feature = "binary")]
pub mod binary;

// Re-export primary types for ergonomic imports.
pub use alias::AliasValidators;
pub use decode::{decode, DecodeOptions};
pub use encode::{encode, EncodeOptions};
pub use error::{PathSegment, StoneError, ValidationError};
pub use json::{from_json, json_compat_decode, json_compat_encode, json_decode, json_encode, to_json};
pub use object::{Object, StructValue, UnionValue};
pub use route::{Route, RouteAttrs, RouteAuth, RouteHost, RouteStyle};
pub use typed::StoneType;
pub use validators::{
    BytesValidator, CallerPermissions, FloatValidator, IntegerValidator, ListValidator,
    Permission, Primitive, StringValidator, StructDef, TimestampValidator, UnionDef, Validator,
};
pub use wire::{Wire, WireView, TAG_KEY};

#[cfg(feature = "binary")]
pub use binary::{binary_compat_decode, binary_compat_encode, binary_decode, binary_encode};

//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! The backend is inconsistent about identifier types: some records carry
//! numeric ids, others string ids (e.g. document-store `_id` values). All
//! ids are therefore held as strings and accept either form on input.

use serde::{Deserialize, Deserializer, Serialize};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` with `#[serde(transparent)]`
/// - `Deserialize` accepting both JSON strings and JSON integers
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, `From<i64>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use orebi_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("1");
/// let order_id = OrderId::new("1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::deserialize_id(deserializer).map(Self)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Wire representation of an identifier: either a JSON string or integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Int(i64),
    UInt(u64),
}

/// Deserialize an identifier that may be encoded as a string or an integer.
///
/// Used by [`define_id!`]; not intended to be called directly.
///
/// # Errors
///
/// Returns an error if the value is neither a string nor an integer.
#[doc(hidden)]
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Str(s) => s,
        RawId::Int(i) => i.to_string(),
        RawId::UInt(u) => u.to_string(),
    })
}

// Server-owned entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(CategoryId);
define_id!(TagId);

/// Identifier of a user-defined price range.
///
/// Price ranges are client-local, so their ids are assigned sequentially by
/// the filter store rather than by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceRangeId(u32);

impl PriceRangeId {
    /// Create a new price range ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PriceRangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

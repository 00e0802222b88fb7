//! Newtype IDs for type-safe entity references.
//!
//! Every table in the pizza database uses a serial `INTEGER` key. The
//! `define_id!` macro wraps those keys so a `StoreId` can never be passed
//! where a `FranchiseId` is expected.

/// Macro to define a type-safe ID wrapper around `i32`.
///
/// The generated type is `Copy`, orders like its inner value, serializes
/// transparently as a JSON number and parses from path segments such as
/// `/api/user/7`.
///
/// # Example
///
/// ```rust
/// # use jwt_pizza_core::define_id;
/// define_id!(ToppingId);
///
/// let id = ToppingId::new(4);
/// assert_eq!(id.as_i32(), 4);
/// assert_eq!("4".parse::<ToppingId>().unwrap(), id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(FranchiseId);
define_id!(StoreId);
define_id!(MenuItemId);
define_id!(OrderId);

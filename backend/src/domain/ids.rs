//! Opaque identifiers for catalogue, directory and circulation records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

define_id! {
    /// Identifier of a [`Book`](super::Book).
    BookId
}

define_id! {
    /// Identifier of a directory [`User`](super::User).
    UserId
}

define_id! {
    /// Identifier of a circulation [`Transaction`](super::Transaction).
    TransactionId
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    #[case("  3fa85f64-5717-4562-b3fc-2c963f66afa6 ")]
    fn parses_padded_uuids(#[case] raw: &str) {
        let id: BookId = raw.parse().expect("valid uuid");
        assert_eq!(id.to_string(), raw.trim());
    }

    #[rstest]
    fn rejects_garbage() {
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[rstest]
    fn serialises_as_bare_string() {
        let id = TransactionId::from_uuid(Uuid::nil());
        let value = serde_json::to_value(id).expect("id serialises");
        assert_eq!(value, serde_json::json!(Uuid::nil().to_string()));
    }
}

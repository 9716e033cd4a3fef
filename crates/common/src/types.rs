use serde::{Deserialize, Serialize};

/// Declares a typed wrapper around a `SERIAL` primary key.
///
/// Each table gets its own identifier type so an item id can never be
/// passed where an order id is expected.
macro_rules! serial_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wraps a raw database key.
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Returns the raw database key.
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
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

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

serial_id!(
    /// Primary key of a row in `items`.
    ItemId
);

serial_id!(
    /// Primary key of a row in `users`.
    UserId
);

serial_id!(
    /// Primary key of a row in `orders`.
    OrderId
);

serial_id!(
    /// Primary key of a row in `line_items`.
    LineItemId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_preserves_raw_value() {
        let id = OrderId::new(42);
        assert_eq!(id.as_i32(), 42);
        assert_eq!(i32::from(id), 42);
        assert_eq!(OrderId::from(42), id);
    }

    #[test]
    fn id_parses_from_path_segment() {
        let id: ItemId = "7".parse().unwrap();
        assert_eq!(id, ItemId::new(7));
        assert!("seven".parse::<ItemId>().is_err());
    }

    #[test]
    fn id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&UserId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserId::new(3));
    }

    #[test]
    fn ids_order_by_raw_value() {
        let mut ids = vec![ItemId::new(3), ItemId::new(1), ItemId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ItemId::new(1), ItemId::new(2), ItemId::new(3)]);
    }
}

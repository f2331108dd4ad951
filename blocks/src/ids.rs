use std::fmt;

use serde::Deserialize;
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Mint a fresh identifier. ULIDs are never handed out twice.
            pub fn generate() -> Self {
                $name(Ulid::new().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }
    };
}

string_id!(
    /// Stable identity of a block node, assigned by the editor.
    BlockId
);
string_id!(VariableId);
string_id!(FunctionId);
string_id!(WorkspaceId);
string_id!(InstanceId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = VariableId::generate();
        let b = VariableId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 26);
    }

    #[test]
    fn ids_deserialize_from_plain_strings() {
        let id: BlockId = serde_json::from_str("\"b-1\"").unwrap();
        assert_eq!(id, BlockId::from("b-1"));
        assert_eq!(id.to_string(), "b-1");
    }
}

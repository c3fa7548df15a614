//! String newtypes that keep asset names and generated identifiers apart.
//!
//! Both serialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// PascalCase component name; also the base name of every generated file.
    Identifier
);

string_newtype!(
    /// File name of an icon image as reported by the icon service, e.g. `arrow-left.svg`.
    AssetName
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_display_and_as_ref() {
        let id = Identifier::new("ArrowLeft");
        assert_eq!(id.to_string(), "ArrowLeft");
        assert_eq!(id.as_str(), "ArrowLeft");
        assert_eq!(AsRef::<str>::as_ref(&id), "ArrowLeft");
    }

    #[test]
    fn identifier_serializes_as_plain_string() {
        let id = Identifier::new("Home");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Home\"");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn asset_name_compares_with_str() {
        let name = AssetName::from("arrow-left.svg");
        assert_eq!(name, "arrow-left.svg");
        assert_eq!(name.into_inner(), "arrow-left.svg");
    }
}

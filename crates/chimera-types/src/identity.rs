//! Identity types for Chimera
//!
//! Skills, queues and accounts are all named by strings. Each gets its own
//! wrapper so a queue name can never be passed where a skill is expected.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Macro to generate string-backed name types with common implementations
macro_rules! define_name_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create from anything string-like
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Borrow the underlying name
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the name is empty or whitespace only
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(name)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_name_type!(SkillId, "Identifier of a capability an agent can be asked to perform");
define_name_type!(QueueId, "Identifier of the dispatch queue a capability is served from");
define_name_type!(AccountId, "Identifier of a ledger account (wallet)");

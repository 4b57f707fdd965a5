//! Newtype wrappers for type safety
//!
//! This module contains newtype wrappers that provide type safety by wrapping
//! primitive types (like String) into distinct types, plus the ascending id
//! generator used for tasks, permission requests, sessions and messages.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// Newtype Wrappers for Type Safety
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Session ID of an externally owned session
    SessionId
);

string_id!(
    /// Background agent task ID
    TaskId
);

string_id!(
    /// Permission request ID
    RequestId
);

string_id!(
    /// Tool name
    ToolName
);

string_id!(
    /// Message ID within a session
    MessageId
);

// ============================================================================
// Ascending ID Generation
// ============================================================================

/// Kind of identifier requested from an [`IdGenerator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Background agent task
    Task,
    /// Permission request
    Permission,
    /// Session
    Session,
    /// Message
    Message,
}

impl IdKind {
    /// Short prefix put in front of generated ids
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Task => "bga",
            Self::Permission => "per",
            Self::Session => "ses",
            Self::Message => "msg",
        }
    }
}

/// Monotonic id generator collaborator
pub trait IdGenerator: Send + Sync {
    /// Produce an id that sorts after every id previously produced
    fn ascending(&self, kind: IdKind) -> String;
}

/// Default [`IdGenerator`]: millisecond timestamp plus a sequence in the low bits
///
/// Ids are fixed-width lowercase hex, so lexicographic order equals
/// generation order within a process.
#[derive(Debug, Default)]
pub struct AscendingIds {
    last: AtomicU64,
}

impl AscendingIds {
    /// Create a new generator
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    fn next_value(&self) -> u64 {
        let now = (Utc::now().timestamp_millis().max(0) as u64) << 16;
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(current + 1);
            match self
                .last
                .compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

impl IdGenerator for AscendingIds {
    fn ascending(&self, kind: IdKind) -> String {
        format!("{}_{:016x}", kind.prefix(), self.next_value())
    }
}

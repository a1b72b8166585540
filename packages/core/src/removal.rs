//! Rules selecting pending jobs for removal.

use crate::{Args, JobId, Payload};

/// One match rule for removing pending jobs from a queue.
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalRule {
    /// Any job of this class.
    Class(String),
    /// Jobs of this class whose non-empty argument bundle only holds values
    /// that also appear in the given map.
    ClassWithArgs(String, Args),
    /// The job of this class with this id.
    ClassWithId(String, JobId),
}

impl RemovalRule {
    /// Match every job of class `name`.
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    /// Match jobs of class `name` whose non-empty bundle only holds values found in `args`.
    pub fn class_with_args(name: impl Into<String>, args: Args) -> Self {
        Self::ClassWithArgs(name.into(), args)
    }

    /// Match the single job of class `name` with this id.
    pub fn class_with_id(name: impl Into<String>, id: impl Into<JobId>) -> Self {
        Self::ClassWithId(name.into(), id.into())
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        match self {
            RemovalRule::Class(class) => payload.class == *class,
            RemovalRule::ClassWithArgs(class, wanted) => {
                payload.class == *class
                    && payload.args.as_ref().is_some_and(|args| {
                        !args.is_empty()
                            && args
                                .values()
                                .all(|value| wanted.values().any(|w| w == value))
                    })
            }
            RemovalRule::ClassWithId(class, id) => payload.class == *class && payload.id == *id,
        }
    }
}

/// True when any rule matches.
pub fn matches_any(rules: &[RemovalRule], payload: &Payload) -> bool {
    rules.iter().any(|rule| rule.matches(payload))
}

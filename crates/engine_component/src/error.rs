//! Component-layer error types.

/// Which clause of an [`Aspect`](crate::Aspect) a component was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClause {
    /// Components that must all be present.
    Required,
    /// Components that must all be absent.
    Excluded,
    /// Components a system may read without filtering on them.
    Optional,
    /// Exclusive group: exactly one must be present.
    OneOf,
}

impl std::fmt::Display for AspectClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Required => "required",
            Self::Excluded => "excluded",
            Self::Optional => "optional",
            Self::OneOf => "one_of",
        };
        f.write_str(name)
    }
}

/// Errors raised while registering components, allocating ids, or building
/// aspects.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// A component kind with this name is already registered.
    #[error("component '{0}' already registered")]
    DuplicateName(String),

    /// No component kind with this name is registered.
    #[error("component '{0}' is not registered")]
    UnknownName(String),

    /// The id pool has no freed ids and no fresh ids left.
    #[error("id limit reached (capacity: {capacity})")]
    CapacityExceeded {
        /// The configured pool capacity.
        capacity: u64,
    },

    /// The same component appears in two clauses of one aspect.
    #[error("component '{component}' is both {first} and {second} in aspect")]
    InvalidAspect {
        /// Name of the offending component.
        component: String,
        /// The first clause it appears in.
        first: AspectClause,
        /// The second clause it appears in.
        second: AspectClause,
    },
}

//! Property-based tests for cause chain flattening.
//!
//! Random cause trees are built bottom-up from a small DSL. Each tree predicts
//! the kind chain its outcome must report: the node itself, followed by each
//! cause's own prediction in citation order (pre-order traversal).


use keel_outcome::{Cause, ChainLink, ErrorKind, Failure, Outcome};
use proptest::prelude::*;
use test_utils::{SocketClosed, StoreError};

// ═══════════════════════════════════════════════════════════════════════════════
// TREE DSL
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Tree {
    /// A native error leaf.
    Error,
    /// A failure citing the given causes.
    Failure(StoreError, Vec<Tree>),
}

impl Tree {
    fn build(&self) -> Cause {
        match self {
            Self::Error => Cause::error(SocketClosed),
            Self::Failure(kind, causes) => Failure::build("store operation failed", *kind)
                .causes(causes.iter().map(Tree::build))
                .finish()
                .into(),
        }
    }

    fn predicted_kinds(&self) -> Vec<String> {
        match self {
            Self::Error => vec!["SocketClosed".to_owned()],
            Self::Failure(kind, causes) => core::iter::once(kind.name().to_owned())
                .chain(causes.iter().flat_map(Tree::predicted_kinds))
                .collect(),
        }
    }
}

fn kind_strategy() -> impl Strategy<Value = StoreError> {
    prop_oneof![
        Just(StoreError::Read),
        Just(StoreError::Write),
        Just(StoreError::Locked),
    ]
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        Just(Tree::Error),
        kind_strategy().prop_map(|kind| Tree::Failure(kind, Vec::new())),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        (kind_strategy(), prop::collection::vec(inner, 0..3))
            .prop_map(|(kind, causes)| Tree::Failure(kind, causes))
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn chain_matches_pre_order_prediction(
        kind in kind_strategy(),
        causes in prop::collection::vec(tree_strategy(), 0..4),
    ) {
        let outcome: Outcome<(), StoreError> = Failure::build("store operation failed", kind)
            .causes(causes.iter().map(Tree::build))
            .into_outcome();

        let expected = Tree::Failure(kind, causes).predicted_kinds();
        prop_assert_eq!(outcome.cause_kind_chain(), expected);
    }

    #[test]
    fn chain_starts_with_self(
        kind in kind_strategy(),
        causes in prop::collection::vec(tree_strategy(), 0..3),
    ) {
        let outcome: Outcome<(), StoreError> = Failure::build("store operation failed", kind)
            .causes(causes.iter().map(Tree::build))
            .into_outcome();

        let chain = outcome.cause_chain();
        let is_current = matches!(chain[0], ChainLink::Current { .. });
        prop_assert!(is_current);
        prop_assert_eq!(chain[0].name(), kind.name());
        prop_assert!(chain[1..].iter().all(|link| matches!(link, ChainLink::Cause(_))));
    }

    #[test]
    fn normalized_kinds_agree_with_live_chain(
        kind in kind_strategy(),
        causes in prop::collection::vec(tree_strategy(), 0..3),
    ) {
        let failure = Failure::build("store operation failed", kind)
            .causes(causes.iter().map(Tree::build))
            .finish();

        let normalized = failure.normalize();
        prop_assert_eq!(normalized.cause_chain.len(), normalized.cause_kind_chain.len());
        prop_assert_eq!(normalized.cause_kind_chain, failure.cause_kind_chain());
    }
}

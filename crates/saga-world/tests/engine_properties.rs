use saga_world::prelude::*;
use proptest::prelude::*;

fn kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::Item),
        Just(EntityKind::Character),
        Just(EntityKind::Place),
    ]
}

fn id_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("a"), Just("b"), Just("c")]
}

fn op_strategy() -> impl Strategy<Value = AtomicOperation> {
    let key = prop_oneof![Just("hp"), Just("name"), Just("")];
    let operator = prop_oneof![
        Just(Operator::Equal),
        Just(Operator::Add),
        Just(Operator::Subtract)
    ];
    let value = prop_oneof![
        (-100i64..100).prop_map(Value::Int),
        "[a-z]{0,4}".prop_map(Value::Text),
        Just(Value::Null),
    ];

    prop_oneof![
        (kind_strategy(), id_strategy()).prop_map(|(k, id)| AtomicOperation::create(k, id)),
        (kind_strategy(), id_strategy(), key, operator, value)
            .prop_map(|(k, id, key, op, v)| AtomicOperation::modify(k, id, key, op, v)),
        (kind_strategy(), id_strategy()).prop_map(|(k, id)| AtomicOperation::delete(k, id)),
    ]
}

#[test]
fn test_empty_batch_yields_no_results() {
    let mut world = WorldState::new();
    assert!(apply_operations(&mut world, &[]).is_empty());
    assert!(world.is_empty());
}

proptest! {
    #[test]
    fn prop_one_result_per_operation_in_order(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut world = WorldState::new();
        let results = apply_operations(&mut world, &ops);

        prop_assert_eq!(results.len(), ops.len());
        for (result, op) in results.iter().zip(&ops) {
            prop_assert_eq!(&result.operation, op);
        }
    }

    #[test]
    fn prop_clone_is_independent(
        setup in prop::collection::vec(op_strategy(), 0..20),
        edits in prop::collection::vec(op_strategy(), 1..20),
    ) {
        let mut world = WorldState::new();
        apply_operations(&mut world, &setup);

        let frozen = world.clone();
        let mut copy = world.clone();
        apply_operations(&mut copy, &edits);

        prop_assert_eq!(&world, &frozen);
    }

    #[test]
    fn prop_delete_is_idempotent(
        setup in prop::collection::vec(op_strategy(), 0..20),
        kind in kind_strategy(),
        id in id_strategy(),
    ) {
        let mut world = WorldState::new();
        apply_operations(&mut world, &setup);

        let delete = AtomicOperation::delete(kind, id);
        let first = apply_operations(&mut world, &[delete.clone()]);
        let after_first = world.clone();
        let second = apply_operations(&mut world, &[delete]);

        prop_assert!(first.all_succeeded());
        prop_assert!(second.all_succeeded());
        prop_assert_eq!(&world, &after_first);
        prop_assert!(!world.contains(&TypedId::new(kind, id)));
    }
}

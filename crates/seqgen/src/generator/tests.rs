use std::collections::{BTreeMap, HashSet};

use crate::{
    Capabilities, ConfigError, Database, DatabaseStructure, Error, IdentifierGenerator,
    IdentifierType, IdentifierValue, LockedOptimizer, MemoryDatabase, OptimizerDescriptor, Params,
    SchemaObject, SequenceStyleConfig, SequenceStyleGenerator, Session, TableGenerator,
    TableGeneratorConfig,
    test_support::FaultyDatabase,
};

const INCREMENT: i64 = 10;

fn hilo_params() -> Params {
    Params::new()
        .with("increment_size", INCREMENT)
        .with("optimizer", "hilo")
}

fn sequence_generator(params: &Params) -> SequenceStyleGenerator {
    SequenceStyleGenerator::configure(IdentifierType::Long, params, &Capabilities::default()).unwrap()
}

fn table_generator(params: &Params) -> TableGenerator {
    TableGenerator::configure(IdentifierType::Long, params, &Capabilities::default()).unwrap()
}

fn install<G: IdentifierGenerator>(generator: &G) -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_all(&generator.schema_objects()).unwrap();
    db
}

fn long(value: IdentifierValue) -> i64 {
    value.as_i64()
}

/// Hi/lo with increment N: the first N values come from a single access, the
/// next one clocks over to a second block.
fn run_hilo_clocks_over<G, A>(generator: &G, optimizer: &LockedOptimizer, accesses: A)
where
    G: IdentifierGenerator,
    A: Fn(&G) -> u64,
{
    let db = install(generator);
    let session = Session::new(&db);

    assert_eq!(accesses(generator), 0);
    assert_eq!(optimizer.state().unwrap().last_source_value, None);

    for expected in 1..=INCREMENT {
        let value = long(generator.generate(&session).unwrap());
        assert_eq!(value, expected);
        assert_eq!(accesses(generator), 1);

        let state = optimizer.state().unwrap();
        assert_eq!(state.last_source_value, Some(1));
        assert_eq!(state.last_value, Some(expected));
        assert_eq!(state.hi_value, Some(INCREMENT + 1));
    }

    let value = long(generator.generate(&session).unwrap());
    assert_eq!(value, INCREMENT + 1);
    assert_eq!(accesses(generator), 2);

    let state = optimizer.state().unwrap();
    assert_eq!(state.last_source_value, Some(2));
    assert_eq!(state.last_value, Some(INCREMENT + 1));
    assert_eq!(state.hi_value, Some(INCREMENT * 2 + 1));
}

#[test]
fn sequence_hilo_clocks_over() {
    let generator = sequence_generator(&hilo_params());
    assert!(generator.database_structure().is_physical_sequence());
    run_hilo_clocks_over(&generator, generator.optimizer(), |g| g.times_accessed());
}

#[test]
fn table_hilo_clocks_over() {
    let generator = table_generator(&hilo_params());
    run_hilo_clocks_over(&generator, generator.optimizer(), |g| g.table_access_count());
}

#[test]
fn forced_table_hilo_clocks_over() {
    let generator = sequence_generator(&hilo_params().with("force_table_use", true));
    assert!(!generator.database_structure().is_physical_sequence());
    run_hilo_clocks_over(&generator, generator.optimizer(), |g| g.times_accessed());
}

fn run_unique_and_increasing<G: IdentifierGenerator>(generator: &G, count: usize) {
    let db = install(generator);
    let session = Session::new(&db);
    let mut seen = HashSet::new();
    let mut last = 0;
    for _ in 0..count {
        let value = long(generator.generate(&session).unwrap());
        assert!(value > last, "{value} after {last}");
        assert!(seen.insert(value));
        last = value;
    }
}

#[test]
fn every_strategy_is_unique_and_increasing() {
    for optimizer in OptimizerDescriptor::ALL {
        let params = Params::new()
            .with("increment_size", if optimizer == OptimizerDescriptor::None { 1 } else { 7 })
            .with("optimizer", optimizer);
        run_unique_and_increasing(&sequence_generator(&params), 200);
        run_unique_and_increasing(&table_generator(&params), 200);
    }
}

#[test]
fn pooled_sequence_advances_by_increment() {
    let generator = sequence_generator(&Params::new().with("increment_size", 20));
    assert_eq!(generator.optimizer().descriptor(), OptimizerDescriptor::Pooled);
    assert_eq!(
        generator.schema_objects(),
        [SchemaObject::Sequence {
            name: "id_sequence".into(),
            initial_value: 1,
            increment: 20,
        }]
    );

    let db = install(&generator);
    let session = Session::new(&db);
    for expected in 1..=21 {
        assert_eq!(long(generator.generate(&session).unwrap()), expected);
    }
    assert_eq!(generator.times_accessed(), 2);
    assert_eq!(long(generator.generate(&session).unwrap()), 22);
    assert_eq!(generator.times_accessed(), 3);
    assert_eq!(db.peek_sequence("id_sequence"), Some(61));
}

#[test]
fn pooled_lo_is_preferred_on_request() {
    let generator = table_generator(
        &Params::new()
            .with("increment_size", 5)
            .with("prefer_pooled_values_lo", true),
    );
    assert_eq!(generator.optimizer().descriptor(), OptimizerDescriptor::PooledLo);

    let db = install(&generator);
    let session = Session::new(&db);
    let values: Vec<i64> = (0..6)
        .map(|_| long(generator.generate(&session).unwrap()))
        .collect();
    assert_eq!(values, [1, 2, 3, 4, 5, 6]);
    assert_eq!(generator.table_access_count(), 2);
    assert_eq!(db.counter_value("id_generators", Some("default")), Some(11));
}

#[test]
fn none_optimizer_resets_increment() {
    let params = Params::new()
        .with("increment_size", 50)
        .with("optimizer", "none");
    let config = SequenceStyleConfig::try_from(&params).unwrap();
    assert_eq!(config.optimizer.increment_size, 1);

    let generator = sequence_generator(&params);
    assert_eq!(generator.optimizer().increment_size(), 1);
    assert_eq!(generator.database_structure().increment_size(), 1);
}

#[test]
fn sequence_falls_back_to_table_without_sequence_support() {
    let capabilities = Capabilities {
        supports_sequences: false,
    };
    let generator =
        SequenceStyleGenerator::configure(IdentifierType::Long, &hilo_params(), &capabilities)
            .unwrap();

    let DatabaseStructure::Table(table) = generator.database_structure() else {
        panic!("expected a table structure");
    };
    assert_eq!(table.table_name(), "id_sequence");
    assert_eq!(table.value_column(), "next_val");
    assert!(table.segment().is_none());
    assert_eq!(table.step(), 1);
    assert_eq!(table.retry_limit(), crate::config::DEFAULT_RETRY_LIMIT);
    assert_eq!(
        generator.schema_objects()[0].create_sql(),
        [
            "create table id_sequence ( next_val bigint )",
            "insert into id_sequence values ( 1 )"
        ]
    );

    let db = MemoryDatabase::with_capabilities(capabilities);
    db.create_all(&generator.schema_objects()).unwrap();
    assert_eq!(long(generator.generate(&Session::new(&db)).unwrap()), 1);
}

#[test]
fn table_generator_defaults() {
    let config = TableGeneratorConfig::try_from(&Params::new()).unwrap();
    assert_eq!(config.table_name, "id_generators");
    assert_eq!(config.segment_column, "sequence_name");
    assert_eq!(config.segment_value, "default");
    assert_eq!(config.segment_length, 255);
    assert_eq!(config.value_column, "next_val");
    assert_eq!(config.optimizer.descriptor, OptimizerDescriptor::None);
    assert_eq!(config.optimizer.initial_value, 1);
    assert_eq!(config.optimizer.explicit_initial_value, None);
    assert_eq!(config.optimizer.retry_limit, 64);
}

#[test]
fn table_generator_segment_options() {
    let params = Params::new()
        .with("pk_column_name", "gen_name")
        .with("prefer_entity_table_as_segment_value", true)
        .with("target_table", "orders")
        .with("schema", "app");
    let config = TableGeneratorConfig::try_from(&params).unwrap();
    assert_eq!(config.table_name, "app.id_generators");
    assert_eq!(config.segment_column, "gen_name");
    assert_eq!(config.segment_value, "orders");

    let explicit = TableGeneratorConfig::try_from(&params.clone().with("segment_value", "invoices")).unwrap();
    assert_eq!(explicit.segment_value, "invoices");

    let missing_target = Params::new().with("prefer_entity_table_as_segment_value", true);
    assert_eq!(
        TableGeneratorConfig::try_from(&missing_target).unwrap_err(),
        ConfigError::MissingParameter("target_table".into())
    );

    let too_long = Params::new()
        .with("segment_value", "a_rather_long_segment")
        .with("segment_value_length", 4);
    assert!(matches!(
        TableGeneratorConfig::try_from(&too_long),
        Err(ConfigError::InvalidParameter { .. })
    ));
}

#[test]
fn segments_share_one_table() {
    let orders = table_generator(&Params::new().with("segment_value", "orders"));
    let invoices = table_generator(&Params::new().with("segment_value", "invoices"));
    assert_eq!(orders.generator_key(), invoices.generator_key());

    let db = install(&orders);
    let session = Session::new(&db);
    assert_eq!(long(orders.generate(&session).unwrap()), 1);
    assert_eq!(long(orders.generate(&session).unwrap()), 2);
    assert_eq!(long(invoices.generate(&session).unwrap()), 1);
    assert_eq!(db.counter_value("id_generators", Some("orders")), Some(3));
    assert_eq!(db.counter_value("id_generators", Some("invoices")), Some(2));
}

#[test]
fn unknown_optimizer_fails_at_configure() {
    let params = Params::new().with("optimizer", "hilow");
    assert_eq!(
        SequenceStyleGenerator::configure(IdentifierType::Long, &params, &Capabilities::default())
            .unwrap_err(),
        ConfigError::UnknownStrategy("hilow".into())
    );
    assert_eq!(
        TableGenerator::configure(IdentifierType::Long, &params, &Capabilities::default())
            .unwrap_err(),
        ConfigError::UnknownStrategy("hilow".into())
    );
}

#[test]
fn malformed_parameters_fail_at_configure() {
    for params in [
        Params::new().with("increment_size", "ten"),
        Params::new().with("initial_value", "1.5"),
        Params::new().with("force_table_use", "yes"),
        Params::new().with("optimistic_retry_limit", 0),
        Params::new().with("optimizer", "pooled").with("increment_size", 0),
    ] {
        let result =
            SequenceStyleGenerator::configure(IdentifierType::Long, &params, &Capabilities::default());
        assert!(
            matches!(result, Err(ConfigError::InvalidParameter { .. })),
            "{params:?}"
        );
    }
}

#[test]
fn missing_structure_is_a_configuration_error() {
    let generator = sequence_generator(&hilo_params());
    let db = MemoryDatabase::new();
    let err = generator.generate(&Session::new(&db)).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::StructureUnreachable { ref name, .. }) if name == "id_sequence"
    ));
}

#[test]
fn transient_errors_propagate() {
    let generator = sequence_generator(&Params::new());
    let db = FaultyDatabase::new(MemoryDatabase::new());
    for object in generator.schema_objects() {
        db.create_object(&object).unwrap();
    }
    let session = Session::new(&db);

    db.fail_next(1);
    assert!(matches!(generator.generate(&session), Err(Error::Store(_))));
    assert_eq!(generator.times_accessed(), 0);
    assert_eq!(long(generator.generate(&session).unwrap()), 1);
}

#[test]
fn identifiers_are_coerced_to_their_type() {
    let params = Params::new()
        .with("initial_value", i64::from(i16::MAX) - 1)
        .with("sequence_name", "small_seq");
    let generator =
        SequenceStyleGenerator::configure(IdentifierType::Short, &params, &Capabilities::default())
            .unwrap();
    let db = install(&generator);
    let session = Session::new(&db);

    assert_eq!(generator.generate(&session).unwrap(), IdentifierValue::Short(i16::MAX - 1));
    assert_eq!(generator.generate(&session).unwrap(), IdentifierValue::Short(i16::MAX));
    assert_eq!(
        generator.generate(&session).unwrap_err(),
        Error::IdentifierOverflow {
            value: i64::from(i16::MAX) + 1,
            target: IdentifierType::Short,
        }
    );
}

fn run_round_trip<G: IdentifierGenerator>(generator: &G) {
    let db = install(generator);
    let session = Session::new(&db);
    let mut rows = BTreeMap::new();

    let names: Vec<String> = (0..25).map(|n| format!("entity-{n}")).collect();
    let ids: Vec<IdentifierValue> = names
        .iter()
        .map(|name| {
            let id = generator.generate(&session).unwrap();
            assert!(rows.insert(id, name.clone()).is_none(), "{id} reused");
            id
        })
        .collect();

    for (id, name) in ids.iter().zip(&names) {
        assert_eq!(rows.get(id), Some(name));
    }
}

#[test]
fn saved_rows_reload_by_generated_identifier() {
    run_round_trip(&sequence_generator(&hilo_params()));
    run_round_trip(&table_generator(&hilo_params()));
    run_round_trip(&table_generator(&Params::new().with("increment_size", 4)));
}

fn run_threads_share_generator<G: IdentifierGenerator>(generator: &G, db: &dyn Database) {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let values: Vec<i64> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    let session = Session::new(db);
                    (0..PER_THREAD)
                        .map(|_| long(generator.generate(&session).unwrap()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = values.iter().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
}

#[test]
fn threads_share_one_generator() {
    for optimizer in ["hilo", "pooled", "pooled-lo"] {
        let params = hilo_params().with("optimizer", optimizer);

        let sequence = sequence_generator(&params);
        let db = install(&sequence);
        run_threads_share_generator(&sequence, &db);
        // One access per block, plus the extra read pooled makes up front.
        assert!(sequence.times_accessed() <= 8 * 500 / INCREMENT as u64 + 1);

        let table = table_generator(&params);
        let db = install(&table);
        run_threads_share_generator(&table, &db);
    }
}

/// Two independently configured generators drawing from one structure, as two
/// processes would. Neither may hand out a value the other already has.
fn run_generators_share_structure<G: IdentifierGenerator>(first: &G, second: &G) {
    let db = install(first);
    let session = Session::new(&db);
    let mut seen = HashSet::new();
    let mut last = [0, 0];

    for round in 0..300 {
        // Irregular interleaving so each side rolls over while the other is
        // midway through a block.
        let side = usize::from(round % 3 == 1 || round % 7 == 0);
        let generator = if side == 0 { first } else { second };
        let value = long(generator.generate(&session).unwrap());
        assert!(seen.insert(value), "{value} handed out twice");
        assert!(value > last[side], "{value} after {}", last[side]);
        last[side] = value;
    }
}

#[test]
fn generators_sharing_a_structure_never_collide() {
    for optimizer in OptimizerDescriptor::ALL {
        let params = Params::new()
            .with("increment_size", INCREMENT)
            .with("optimizer", optimizer);
        run_generators_share_structure(&sequence_generator(&params), &sequence_generator(&params));
        run_generators_share_structure(&table_generator(&params), &table_generator(&params));
        let forced = params.with("force_table_use", true);
        run_generators_share_structure(&sequence_generator(&forced), &sequence_generator(&forced));
    }
}

#[test]
fn hilo_rollover_starts_at_the_fetched_block() {
    let first = table_generator(&hilo_params());
    let second = table_generator(&hilo_params());
    let db = install(&first);
    let session = Session::new(&db);

    assert_eq!(long(first.generate(&session).unwrap()), 1);
    assert_eq!(long(second.generate(&session).unwrap()), INCREMENT + 1);

    let values: Vec<i64> = (0..INCREMENT)
        .map(|_| long(first.generate(&session).unwrap()))
        .collect();
    let expected: Vec<i64> = (2..=INCREMENT).chain([2 * INCREMENT + 1]).collect();
    assert_eq!(values, expected);

    let state = first.optimizer().state().unwrap();
    assert_eq!(state.last_source_value, Some(3));
    assert_eq!(state.last_value, Some(2 * INCREMENT + 1));
    assert_eq!(state.hi_value, Some(3 * INCREMENT + 1));
}

#[test]
fn tenants_draw_independent_blocks() {
    let generator = sequence_generator(&hilo_params());
    let first = install(&generator);
    let second = install(&generator);

    let a = Session::with_tenant(&first, "a");
    let b = Session::with_tenant(&second, "b");
    assert_eq!(long(generator.generate(&a).unwrap()), 1);
    assert_eq!(long(generator.generate(&a).unwrap()), 2);
    assert_eq!(long(generator.generate(&b).unwrap()), 1);

    let optimizer = generator.optimizer();
    assert_eq!(optimizer.state_for(Some("a")).unwrap().unwrap().last_value, Some(2));
    assert_eq!(optimizer.state_for(Some("b")).unwrap().unwrap().last_value, Some(1));
    assert_eq!(optimizer.state_for(None).unwrap().unwrap().last_value, None);
}

#[test]
fn ddl_for_segmented_table() {
    let generator = table_generator(&Params::new().with("table_name", "hi_values"));
    let objects = generator.schema_objects();
    assert_eq!(
        objects[0].create_sql(),
        ["create table hi_values ( sequence_name varchar(255) not null, next_val bigint, primary key ( sequence_name ) )"]
    );
    assert_eq!(objects[0].drop_sql(), ["drop table if exists hi_values"]);

    let db = install(&generator);
    assert!(db.contains("hi_values"));
}

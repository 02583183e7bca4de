//! Lineage-recording tests against the mock sink.

use fluent::fluent;
use fluent::lineage::{DerivedEvent, MockSink};
use fluent::ra::{collection, Pipeline};
use fluent::row::SqlValue;
use fluent::{FluentBuilder, Hashable};
use itertools::Itertools;
use ordered_float::OrderedFloat;

fn mockfluent(name: &str, address: &str, context: &zmq::Context) -> (FluentBuilder, MockSink) {
    let sink = MockSink::new();
    let builder = fluent(name, 0, address, context, Box::new(sink.clone())).unwrap();
    (builder, sink)
}

fn unsigned(n: u64) -> Vec<SqlValue> {
    vec![SqlValue::Unsigned(n)]
}

#[test]
fn simple_program_with_lineage() {
    let context = zmq::Context::new();
    let (mut builder, sink) = mockfluent("name", "inproc://yolo", &context);
    let t = builder.table::<(u64,)>("t", &["x"]).unwrap();
    let s = builder.scratch::<(u64,)>("s", &["x"]).unwrap();
    let c = builder
        .channel::<(String, OrderedFloat<f64>, char)>("c", &["addr", "x", "y"])
        .unwrap();
    builder.register_rules(vec![
        t.merge_rule(collection(&t).count()),
        t.merge_rule(collection(&s).count()),
        s.merge_rule(collection(&c).count()),
    ]);
    let mut f = builder.build().unwrap();

    let hash = |n: u64| (n,).hashed();

    // Startup announcements.
    assert_eq!(sink.init_count(), 1);
    let collections = sink.collections();
    assert_eq!(collections.len(), 3);
    assert_eq!(collections[0].name, "t");
    assert_eq!(collections[0].kind.as_str(), "Table");
    assert_eq!(collections[0].column_names, vec!["x"]);
    assert_eq!(collections[0].column_types, vec!["numeric(20)"]);
    assert_eq!(collections[1].name, "s");
    assert_eq!(collections[1].kind.as_str(), "Scratch");
    assert_eq!(collections[2].name, "c");
    assert_eq!(collections[2].kind.as_str(), "Channel");
    assert_eq!(collections[2].column_names, vec!["addr", "x", "y"]);
    assert_eq!(
        collections[2].column_types,
        vec!["text", "double precision", "char(1)"]
    );
    assert_eq!(
        sink.rules(),
        vec![
            (0, false, "t <= Count(t)".to_string()),
            (1, false, "t <= Count(s)".to_string()),
            (2, false, "s <= Count(c)".to_string()),
        ]
    );

    // Tick 1: every count runs over empty inputs, so no derivations.
    f.tick().unwrap();
    assert_eq!(t.rows(), vec![(0,)]);
    assert_eq!(s.rows(), vec![]);

    let inserts = sink.inserts();
    assert_eq!(inserts.len(), 3);
    assert_eq!(
        (inserts[0].collection.as_str(), inserts[0].time, &inserts[0].values),
        ("t", 1, &unsigned(0))
    );
    assert_eq!(
        (inserts[1].collection.as_str(), inserts[1].time, &inserts[1].values),
        ("t", 2, &unsigned(0))
    );
    assert_eq!(
        (inserts[2].collection.as_str(), inserts[2].time, &inserts[2].values),
        ("s", 3, &unsigned(0))
    );
    let deletes = sink.deletes();
    assert_eq!(deletes.len(), 1);
    assert_eq!(
        (deletes[0].collection.as_str(), deletes[0].time, &deletes[0].values),
        ("s", 4, &unsigned(0))
    );
    assert_eq!(sink.derived(), vec![]);
    assert_eq!(sink.networked(), vec![]);

    // Tick 2: count(t) now has a source.
    f.tick().unwrap();
    assert_eq!(t.rows(), vec![(0,), (1,)]);

    let inserts = sink.inserts();
    assert_eq!(inserts.len(), 6);
    assert_eq!(
        (inserts[3].collection.as_str(), inserts[3].time, &inserts[3].values),
        ("t", 5, &unsigned(1))
    );
    assert_eq!(
        (inserts[4].collection.as_str(), inserts[4].time, &inserts[4].values),
        ("t", 6, &unsigned(0))
    );
    assert_eq!(
        (inserts[5].collection.as_str(), inserts[5].time, &inserts[5].values),
        ("s", 7, &unsigned(0))
    );
    assert_eq!(sink.deletes().len(), 2);
    assert_eq!(sink.deletes()[1].time, 8);
    assert_eq!(
        sink.derived(),
        vec![DerivedEvent {
            source: "t".to_string(),
            source_hash: hash(0),
            rule_id: 0,
            inserted: true,
            target: "t".to_string(),
            target_hash: hash(1),
            time: 5,
        }]
    );

    // Tick 3: two sources contribute to the new count.
    f.tick().unwrap();
    assert_eq!(t.rows(), vec![(0,), (1,), (2,)]);
    assert_eq!(sink.inserts().len(), 9);
    assert_eq!(sink.inserts()[6].time, 9);
    assert_eq!(sink.inserts()[6].values, unsigned(2));
    assert_eq!(sink.deletes().len(), 3);
    assert_eq!(sink.deletes()[2].time, 12);

    let tick3_edges: Vec<DerivedEvent> = sink.derived()[1 ..]
        .iter()
        .cloned()
        .sorted_by_key(|edge| edge.source_hash)
        .collect();
    let mut expected = vec![
        DerivedEvent {
            source: "t".to_string(),
            source_hash: hash(0),
            rule_id: 0,
            inserted: true,
            target: "t".to_string(),
            target_hash: hash(2),
            time: 9,
        },
        DerivedEvent {
            source: "t".to_string(),
            source_hash: hash(1),
            rule_id: 0,
            inserted: true,
            target: "t".to_string(),
            target_hash: hash(2),
            time: 9,
        },
    ];
    expected.sort_by_key(|edge| edge.source_hash);
    assert_eq!(tick3_edges, expected);

    let _ = c;
}

#[test]
fn channel_and_stdout_writes_record_a_pseudo_delete() {
    let context = zmq::Context::new();
    let (mut builder, sink) = mockfluent("name", "inproc://pseudo", &context);
    let out = builder.stdout().unwrap();
    let c = builder.channel::<(String, i64)>("c", &["addr", "x"]).unwrap();
    let seed = builder.table::<(i64,)>("seed", &["x"]).unwrap();
    builder.register_rules(vec![
        c.merge_rule(
            collection(&seed).map(|(x,): (i64,)| ("inproc://pseudo".to_string(), x)),
        ),
        out.defer_merge_rule(collection(&seed).map(|(x,): (i64,)| (x.to_string(),))),
    ]);
    let mut f = builder.build().unwrap();

    seed.merge((1,), (1i64,).hashed(), 0);
    f.tick().unwrap();

    // Both writes insert and immediately delete at the same logical time.
    let inserts = sink.inserts();
    let deletes = sink.deletes();
    assert_eq!(inserts.len(), 2);
    assert_eq!(deletes.len(), 2);
    assert_eq!(inserts[0].collection, "c");
    assert_eq!(deletes[0].collection, "c");
    assert_eq!(inserts[0].time, deletes[0].time);
    assert_eq!(inserts[0].hash, deletes[0].hash);
    assert_eq!(inserts[1].collection, "stdout");
    assert_eq!(deletes[1].collection, "stdout");
    assert_eq!(inserts[1].time, deletes[1].time);
}

#[test]
fn deferred_deletes_record_a_delete_event_at_rule_time() {
    let context = zmq::Context::new();
    let (mut builder, sink) = mockfluent("name", "inproc://defer", &context);
    let t = builder.table::<(i64,)>("t", &["x"]).unwrap();
    let s = builder.scratch::<(i64,)>("s", &["x"]).unwrap();
    builder.register_rules(vec![
        s.merge_rule(collection(&t)),
        t.defer_delete_rule(collection(&s)),
    ]);
    let mut f = builder.build().unwrap();

    seed_table(&t, 1);
    f.tick().unwrap();

    assert_eq!(t.rows(), vec![]);
    // Rule 1 fired at time 2 and recorded the delete with inserted = false.
    let derived = sink.derived();
    assert_eq!(derived.len(), 2);
    assert!(derived[0].inserted);
    assert!(!derived[1].inserted);
    assert_eq!(derived[1].source, "s");
    assert_eq!(derived[1].target, "t");
    let deletes = sink.deletes();
    assert_eq!(deletes[0].collection, "t");
    assert_eq!(deletes[0].time, 2);
}

fn seed_table(t: &fluent::collections::Table<(i64,)>, x: i64) {
    t.merge((x,), (x,).hashed(), 0);
}

#[test]
fn black_box_lineage_installs_two_functions() {
    let context = zmq::Context::new();
    let (mut builder, sink) = mockfluent("name", "inproc://bb", &context);
    builder
        .channel::<(String, String, i64, i32)>("f_request", &["dst_addr", "src_addr", "id", "x"])
        .unwrap();
    builder
        .channel::<(String, i64, i32)>("f_response", &["addr", "id", "y"])
        .unwrap();
    let mut f = builder.build().unwrap();

    f.register_black_box_lineage(0, 1, |_| "hello world".to_string())
        .unwrap();

    let execs = sink.execs();
    assert_eq!(execs.len(), 2);
    assert_eq!(
        crunch_whitespace(&execs[0]),
        crunch_whitespace(
            r#"
      CREATE FUNCTION name_f_response_lineage_impl(bigint, integer, integer)
      RETURNS TABLE(collection_name text, hash bigint, time_inserted bigint)
      AS $$hello world$$ LANGUAGE SQL;
    "#
        )
    );
    assert_eq!(
        crunch_whitespace(&execs[1]),
        crunch_whitespace(
            r#"
      CREATE FUNCTION name_f_response_lineage(bigint)
      RETURNS TABLE(collection_name text, hash bigint, time_inserted bigint)
      AS $$
        SELECT name_f_response_lineage_impl(Req.time_inserted, Req.x, Resp.y)
        FROM name_f_request Req, name_f_response Resp
        WHERE Req.id = $1 AND Resp.id = $1
      $$ LANGUAGE SQL;
    "#
        )
    );
}

#[test]
fn black_box_lineage_passes_placeholder_names() {
    let context = zmq::Context::new();
    let (mut builder, sink) = mockfluent("name", "inproc://bb2", &context);
    builder
        .channel::<(String, String, i64, String, String)>(
            "set_request",
            &["dst_addr", "src_addr", "id", "key", "value"],
        )
        .unwrap();
    builder
        .channel::<(String, i64)>("set_response", &["addr", "id"])
        .unwrap();
    let mut f = builder.build().unwrap();

    f.register_black_box_lineage(0, 1, |args| {
        assert_eq!(args, &["$1", "$2", "$3"][..]);
        format!("SELECT {} WHERE key = {}", args[0], args[1])
    })
    .unwrap();
    assert!(sink.execs()[0].contains("SELECT $1 WHERE key = $2"));
}

#[test]
fn black_box_lineage_validates_the_channel_contracts() {
    let context = zmq::Context::new();
    let (mut builder, _sink) = mockfluent("name", "inproc://bb3", &context);
    builder
        .channel::<(String, String, i64, i32)>("good_request", &["dst_addr", "src_addr", "id", "x"])
        .unwrap();
    builder
        .channel::<(String, i64)>("misnamed", &["address", "id"])
        .unwrap();
    let t = builder.table::<(i64,)>("t", &["x"]).unwrap();
    let mut f = builder.build().unwrap();

    // Response columns must be named addr, id.
    let wrong_names = f.register_black_box_lineage(0, 1, |_| String::new());
    assert!(matches!(wrong_names, Err(fluent::Error::Config(_))));

    // Tables are not channels.
    let not_a_channel = f.register_black_box_lineage(0, 2, |_| String::new());
    assert!(matches!(not_a_channel, Err(fluent::Error::Config(_))));

    // A channel cannot answer itself.
    let same = f.register_black_box_lineage(0, 0, |_| String::new());
    assert!(matches!(same, Err(fluent::Error::Config(_))));

    let _ = t;
}

fn crunch_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

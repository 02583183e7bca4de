//! Two-node tests over inproc ZeroMQ endpoints.

use fluent::fluent;
use fluent::lineage::{MockSink, NoopSink};
use fluent::project;
use fluent::ra::{collection, Pipeline};
use fluent::Hashable;

#[test]
fn ping_pong_reroutes_forever() {
    let context = zmq::Context::new();

    let mut builder = fluent("ping", 0, "inproc://ping", &context, Box::new(NoopSink)).unwrap();
    let ping_c = builder.channel::<(String, i64)>("c", &["addr", "x"]).unwrap();
    builder.register_rules(vec![ping_c.merge_rule(
        collection(&ping_c).map(|t: (String, i64)| ("inproc://pong".to_string(), t.1)),
    )]);
    let mut ping = builder.build().unwrap();

    let mut builder = fluent("pong", 1, "inproc://pong", &context, Box::new(NoopSink)).unwrap();
    let pong_c = builder.channel::<(String, i64)>("c", &["addr", "x"]).unwrap();
    builder.register_rules(vec![pong_c.merge_rule(
        collection(&pong_c).map(|t: (String, i64)| ("inproc://ping".to_string(), t.1)),
    )]);
    let mut pong = builder.build().unwrap();

    let catalyst = ("inproc://pong".to_string(), 42i64);
    ping_c.merge(catalyst.clone(), catalyst.hashed(), 9001).unwrap();

    for _ in 0 .. 3 {
        pong.receive().unwrap();
        assert_eq!(pong_c.rows(), vec![("inproc://pong".to_string(), 42)]);
        pong.tick().unwrap();
        assert_eq!(pong_c.rows(), vec![]);

        ping.receive().unwrap();
        assert_eq!(ping_c.rows(), vec![("inproc://ping".to_string(), 42)]);
        ping.tick().unwrap();
        assert_eq!(ping_c.rows(), vec![]);
    }
}

#[test]
fn received_tuples_keep_the_senders_hash_and_record_a_networked_edge() {
    let context = zmq::Context::new();

    let mut builder = fluent("sender", 7, "inproc://sender", &context, Box::new(NoopSink)).unwrap();
    let out = builder.channel::<(String, i64, String)>("c", &["addr", "x", "y"]).unwrap();
    let sender = builder.build().unwrap();

    let sink = MockSink::new();
    let mut builder = fluent(
        "receiver",
        8,
        "inproc://receiver",
        &context,
        Box::new(sink.clone()),
    )
    .unwrap();
    let input = builder.channel::<(String, i64, String)>("c", &["addr", "x", "y"]).unwrap();
    let mut receiver = builder.build().unwrap();

    let tuple = ("inproc://receiver".to_string(), 42i64, "payload".to_string());
    out.merge(tuple.clone(), tuple.hashed(), 5).unwrap();
    receiver.receive().unwrap();

    assert_eq!(input.rows(), vec![tuple.clone()]);
    assert_eq!(input.get()[&tuple].hash, tuple.hashed());

    let networked = sink.networked();
    assert_eq!(networked.len(), 1);
    assert_eq!(networked[0].source_node, 7);
    assert_eq!(networked[0].source_time, 5);
    assert_eq!(networked[0].target, "c");
    assert_eq!(networked[0].target_hash, tuple.hashed());
    assert_eq!(networked[0].time, 1);

    let inserts = sink.inserts();
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].collection, "c");
    assert_eq!(inserts[0].hash, tuple.hashed());

    let _ = sender;
}

#[test]
fn messages_for_unknown_channels_are_dropped() {
    let context = zmq::Context::new();

    let mut builder = fluent("a", 0, "inproc://a", &context, Box::new(NoopSink)).unwrap();
    let out = builder.channel::<(String, i64)>("mystery", &["addr", "x"]).unwrap();
    let sender = builder.build().unwrap();

    let mut builder = fluent("b", 1, "inproc://b", &context, Box::new(NoopSink)).unwrap();
    let known = builder.channel::<(String, i64)>("known", &["addr", "x"]).unwrap();
    let mut receiver = builder.build().unwrap();

    let tuple = ("inproc://b".to_string(), 1i64);
    out.merge(tuple.clone(), tuple.hashed(), 1).unwrap();
    receiver.receive().unwrap();

    assert_eq!(known.rows(), vec![]);
    let _ = sender;
}

#[test]
fn key_value_server_round_trip() {
    let context = zmq::Context::new();
    let server_addr = "inproc://kvs-server".to_string();
    let client_addr = "inproc://kvs-client".to_string();

    // The server.
    let mut builder = fluent("kvs", 1, &server_addr, &context, Box::new(NoopSink)).unwrap();
    let set_request = builder
        .channel::<(String, String, i64, String, String)>(
            "set_request",
            &["dst_addr", "src_addr", "id", "key", "value"],
        )
        .unwrap();
    let set_response = builder
        .channel::<(String, i64)>("set_response", &["addr", "id"])
        .unwrap();
    let get_request = builder
        .channel::<(String, String, i64, String)>(
            "get_request",
            &["dst_addr", "src_addr", "id", "key"],
        )
        .unwrap();
    let get_response = builder
        .channel::<(String, i64, String)>("get_response", &["addr", "id", "value"])
        .unwrap();
    let kvs = builder.table::<(String, String)>("kvs", &["key", "value"]).unwrap();

    builder.register_rules(vec![
        // Delete-then-add keeps one value per key.
        kvs.defer_delete_rule(project!(
            collection(&kvs).hash_join(
                collection(&set_request),
                |kv: &(String, String)| kv.0.clone(),
                |req: &(String, String, i64, String, String)| req.3.clone(),
            ),
            0,
            1
        )),
        kvs.defer_merge_rule(project!(collection(&set_request), 3, 4)),
        set_response.merge_rule(project!(collection(&set_request), 1, 2)),
        get_response.merge_rule(project!(
            collection(&get_request).hash_join(
                collection(&kvs),
                |req: &(String, String, i64, String)| req.3.clone(),
                |kv: &(String, String)| kv.0.clone(),
            ),
            1,
            2,
            5
        )),
    ]);
    let mut server = builder.build().unwrap();

    // The client: the same channel declarations, driven by hand.
    let mut builder = fluent("kvs_client", 2, &client_addr, &context, Box::new(NoopSink)).unwrap();
    let client_set = builder
        .channel::<(String, String, i64, String, String)>(
            "set_request",
            &["dst_addr", "src_addr", "id", "key", "value"],
        )
        .unwrap();
    let client_set_response = builder
        .channel::<(String, i64)>("set_response", &["addr", "id"])
        .unwrap();
    let client_get = builder
        .channel::<(String, String, i64, String)>(
            "get_request",
            &["dst_addr", "src_addr", "id", "key"],
        )
        .unwrap();
    let client_get_response = builder
        .channel::<(String, i64, String)>("get_response", &["addr", "id", "value"])
        .unwrap();
    let mut client = builder.build().unwrap();

    // set(a, c, 7, "k", "v")
    let set = (
        server_addr.clone(),
        client_addr.clone(),
        7i64,
        "k".to_string(),
        "v".to_string(),
    );
    client_set.merge(set.clone(), set.hashed(), 1).unwrap();
    server.receive().unwrap();
    server.tick().unwrap();
    assert_eq!(kvs.rows(), vec![("k".to_string(), "v".to_string())]);

    client.receive().unwrap();
    assert_eq!(client_set_response.rows(), vec![(client_addr.clone(), 7)]);
    client.tick().unwrap();

    // get(a, c, 8, "k")
    let get = (server_addr.clone(), client_addr.clone(), 8i64, "k".to_string());
    client_get.merge(get.clone(), get.hashed(), 2).unwrap();
    server.receive().unwrap();
    server.tick().unwrap();

    client.receive().unwrap();
    assert_eq!(
        client_get_response.rows(),
        vec![(client_addr.clone(), 8, "v".to_string())]
    );
    client.tick().unwrap();

    // Overwriting the key keeps a single value.
    let overwrite = (
        server_addr.clone(),
        client_addr.clone(),
        9i64,
        "k".to_string(),
        "w".to_string(),
    );
    client_set.merge(overwrite.clone(), overwrite.hashed(), 3).unwrap();
    server.receive().unwrap();
    server.tick().unwrap();
    assert_eq!(kvs.rows(), vec![("k".to_string(), "w".to_string())]);
}

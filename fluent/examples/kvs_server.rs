//! A key-value store served over fluent channels, with black-box lineage.
//!
//! The server answers `set(key, value)` and `get(key)` requests. The `kvs`
//! table holds one value per key, maintained with a delete-then-add pair of
//! deferred rules. The registered black-box fragment declares that a get
//! response derives from the most recent set of the same key at or before
//! the response's insertion time, so that
//! `SELECT kvs_get_response_lineage(id)` finds the set that produced any
//! answer.
//!
//! ```text
//! cargo run --example kvs_server -- --address tcp://*:8000 --db-host localhost
//! ```

use clap::Parser;
use fluent::lineage::{ConnectionConfig, LineageSink, NoopSink, PostgresSink};
use fluent::project;
use fluent::ra::{collection, Pipeline};

#[derive(Parser)]
#[command(about = "A fluent key-value server")]
struct Args {
    /// The ZeroMQ address this server listens on, e.g. tcp://*:8000.
    #[arg(long)]
    address: String,

    /// Lineage store host. Omit to run without recording lineage.
    #[arg(long)]
    db_host: Option<String>,
    #[arg(long, default_value_t = 5432)]
    db_port: u16,
    #[arg(long, default_value = "postgres")]
    db_user: String,
    #[arg(long, default_value = "")]
    db_password: String,
    #[arg(long, default_value = "postgres")]
    db_name: String,
}

fn sink(args: &Args) -> anyhow::Result<Box<dyn LineageSink>> {
    match &args.db_host {
        None => Ok(Box::new(NoopSink)),
        Some(host) => {
            let config = ConnectionConfig {
                host: host.clone(),
                port: args.db_port,
                user: args.db_user.clone(),
                password: args.db_password.clone(),
                dbname: args.db_name.clone(),
            };
            Ok(Box::new(PostgresSink::connect(
                "kvs",
                0,
                &args.address,
                &config,
            )?))
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let context = zmq::Context::new();
    let sink = sink(&args)?;
    let mut builder = fluent::fluent("kvs", 0, &args.address, &context, sink)?;

    let set_request = builder.channel::<(String, String, i64, String, String)>(
        "set_request",
        &["dst_addr", "src_addr", "id", "key", "value"],
    )?;
    let set_response = builder.channel::<(String, i64)>("set_response", &["addr", "id"])?;
    let get_request = builder.channel::<(String, String, i64, String)>(
        "get_request",
        &["dst_addr", "src_addr", "id", "key"],
    )?;
    let get_response =
        builder.channel::<(String, i64, String)>("get_response", &["addr", "id", "value"])?;
    let kvs = builder.table::<(String, String)>("kvs", &["key", "value"])?;

    builder.register_rules(vec![
        // Delete-then-add keeps exactly one value per key.
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

    let mut node = builder.build()?;

    // get_request is collection 2, get_response is collection 3.
    node.register_black_box_lineage(2, 3, |args| {
        let time_inserted = &args[0];
        let key = &args[1];
        format!(
            r#"
          SELECT CAST('kvs_set_request' AS text), hash, time_inserted
          FROM kvs_set_request
          WHERE key = {} AND time_inserted <= {}
          ORDER BY time_inserted DESC
          LIMIT 1
        "#,
            key, time_inserted
        )
    })?;

    node.run()?;
    Ok(())
}

//! A terminal client for the key-value server.
//!
//! Type `set <key> <value>` or `get <key>`; responses print to stdout.
//!
//! ```text
//! cargo run --example kvs_client -- \
//!     --server tcp://localhost:8000 --address tcp://localhost:8001
//! ```

use clap::Parser;
use fluent::lineage::{ConnectionConfig, LineageSink, NoopSink, PostgresSink};
use fluent::ra::{collection, Pipeline};

#[derive(Parser)]
#[command(about = "A terminal client for the fluent key-value server")]
struct Args {
    /// The server's connect address, e.g. tcp://localhost:8000.
    #[arg(long)]
    server: String,

    /// This client's address, used both to listen and to be reached.
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
                "kvs_client",
                1,
                &args.address,
                &config,
            )?))
        }
    }
}

fn words(line: &str) -> Vec<String> {
    line.split_whitespace().map(|word| word.to_string()).collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let context = zmq::Context::new();
    let sink = sink(&args)?;
    let mut builder = fluent::fluent("kvs_client", 1, &args.address, &context, sink)?;

    let input = builder.stdin()?;
    let output = builder.stdout()?;
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

    let server = args.server.clone();
    let this = args.address.clone();
    let sets = collection(&input)
        .filter(|(line,): &(String,)| {
            let parts = words(line);
            parts.len() == 3 && parts[0] == "set"
        })
        .map(move |(line,): (String,)| {
            let parts = words(&line);
            (
                server.clone(),
                this.clone(),
                i64::from(rand::random::<u32>()),
                parts[1].clone(),
                parts[2].clone(),
            )
        });

    let server = args.server.clone();
    let this = args.address.clone();
    let gets = collection(&input)
        .filter(|(line,): &(String,)| {
            let parts = words(line);
            parts.len() == 2 && parts[0] == "get"
        })
        .map(move |(line,): (String,)| {
            let parts = words(&line);
            (
                server.clone(),
                this.clone(),
                i64::from(rand::random::<u32>()),
                parts[1].clone(),
            )
        });

    builder.register_rules(vec![
        set_request.merge_rule(sets),
        get_request.merge_rule(gets),
        output.merge_rule(
            collection(&set_response).map(|t: (String, i64)| (format!("set {} done", t.1),)),
        ),
        output.merge_rule(
            collection(&get_response).map(|t: (String, i64, String)| (format!("got {}", t.2),)),
        ),
    ]);

    builder.build()?.run()?;
    Ok(())
}

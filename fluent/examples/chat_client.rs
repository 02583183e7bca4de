//! The chat client: stdin lines go to the server, multicasts go to stdout.
//!
//! ```text
//! cargo run --example chat_client -- \
//!     --server tcp://localhost:8000 \
//!     --address tcp://localhost:8001 \
//!     --nickname zardoz
//! ```

use clap::Parser;
use fluent::lineage::{ConnectionConfig, LineageSink, NoopSink, PostgresSink};
use fluent::project;
use fluent::ra::{collection, iterable, Pipeline};

#[derive(Parser)]
#[command(about = "A fluent chat client")]
struct Args {
    /// The server's connect address, e.g. tcp://localhost:8000.
    #[arg(long)]
    server: String,

    /// This client's address, used both to listen and to be reached.
    #[arg(long)]
    address: String,

    /// The nickname announced to the server.
    #[arg(long)]
    nickname: String,

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

fn sink(args: &Args, node: &str) -> anyhow::Result<Box<dyn LineageSink>> {
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
                node,
                1,
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

    let name = format!("chat_client_{}", args.nickname);
    let context = zmq::Context::new();
    let sink = sink(&args, &name)?;
    let mut builder = fluent::fluent(&name, 1, &args.address, &context, sink)?;

    let input = builder.stdin()?;
    let output = builder.stdout()?;
    let connect = builder.channel::<(String, String, String)>(
        "connect",
        &["server_addr", "client_addr", "nickname"],
    )?;
    let mcast = builder.channel::<(String, String)>("mcast", &["addr", "msg"])?;

    builder.register_bootstrap_rules(vec![connect.merge_rule(iterable(
        "connect_tuple",
        vec![(args.server.clone(), args.address.clone(), args.nickname.clone())],
    ))]);

    let server = args.server.clone();
    builder.register_rules(vec![
        mcast.merge_rule(
            collection(&input).map(move |(line,): (String,)| (server.clone(), line)),
        ),
        output.merge_rule(project!(collection(&mcast), 1)),
    ]);

    builder.build()?.run()?;
    Ok(())
}

//! Two nodes bouncing a tuple back and forth over one channel.
//!
//! Start the passive side first, then the seeder:
//!
//! ```text
//! cargo run --example ping -- --id 0 --address tcp://*:8000 --peer tcp://localhost:8001
//! cargo run --example ping -- --id 1 --address tcp://*:8001 --peer tcp://localhost:8000 --seed
//! ```

use clap::Parser;
use fluent::lineage::{ConnectionConfig, LineageSink, NoopSink, PostgresSink};
use fluent::ra::{collection, iterable, Pipeline};

#[derive(Parser)]
#[command(about = "A fluent node that returns every tuple to its peer")]
struct Args {
    /// This node's id, stamped on outbound messages.
    #[arg(long)]
    id: u64,

    /// The ZeroMQ address this node listens on, e.g. tcp://*:8000.
    #[arg(long)]
    address: String,

    /// The peer's connect address, e.g. tcp://localhost:8001.
    #[arg(long)]
    peer: String,

    /// Send the first tuple.
    #[arg(long)]
    seed: bool,

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
                args.id,
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

    let name = format!("ping_{}", args.id);
    let context = zmq::Context::new();
    let sink = sink(&args, &name)?;

    let mut builder = fluent::fluent(&name, args.id, &args.address, &context, sink)?;
    let c = builder.channel::<(String, i64)>("c", &["addr", "x"])?;

    let peer = args.peer.clone();
    builder.register_rules(vec![c.merge_rule(
        collection(&c).map(move |t: (String, i64)| (peer.clone(), t.1)),
    )]);

    if args.seed {
        builder.register_bootstrap_rules(vec![
            c.merge_rule(iterable("seed", vec![(args.peer.clone(), 42i64)]))
        ]);
    }

    builder.build()?.run()?;
    Ok(())
}

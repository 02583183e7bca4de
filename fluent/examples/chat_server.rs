//! The chat server: remembers who connected and multicasts every message.
//!
//! ```text
//! cargo run --example chat_server -- --address tcp://*:8000
//! ```

use clap::Parser;
use fluent::lineage::{ConnectionConfig, LineageSink, NoopSink, PostgresSink};
use fluent::project;
use fluent::ra::{collection, Pipeline};

#[derive(Parser)]
#[command(about = "A fluent chat server")]
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
                "chat_server",
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
    let mut builder = fluent::fluent("chat_server", 0, &args.address, &context, sink)?;

    let connect = builder.channel::<(String, String, String)>(
        "connect",
        &["server_addr", "client_addr", "nickname"],
    )?;
    let mcast = builder.channel::<(String, String)>("mcast", &["addr", "msg"])?;
    let nodelist = builder.table::<(String, String)>("nodelist", &["client_addr", "nickname"])?;

    builder.register_rules(vec![
        nodelist.merge_rule(project!(collection(&connect), 1, 2)),
        // Every message fans out to every connected client.
        mcast.merge_rule(project!(
            collection(&mcast).cross(collection(&nodelist)),
            2,
            1
        )),
    ]);

    builder.build()?.run()?;
    Ok(())
}

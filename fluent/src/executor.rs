//! The per-node scheduler: bootstrap, receive, tick.
//!
//! A node is a single-threaded cooperative loop. Logical time is bumped on
//! every rule firing and on every receive cycle; the only blocking call is
//! the poll inside the receive phase, whose timeout is set so the loop wakes
//! exactly when the earliest pending periodic is due. `run` executes the
//! bootstrap tick once (skipped entirely when no bootstrap rules are
//! registered) and then alternates receive and tick until the process exits.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::clock::Clock;
use crate::collections::{CollectionInfo, CollectionKind, Periodic, Stdin};
use crate::error::{Error, Result};
use crate::hashable::Hashable;
use crate::lineage::LineageSink;
use crate::net::NetworkState;
use crate::row::{Row, TimePoint};
use crate::rule::Rule;

/// Decodes an inbound channel message body into a typed tuple, retains it in
/// the channel, and records the insertion plus its networked-lineage edge.
pub(crate) type Parser =
    Box<dyn FnMut(&mut dyn LineageSink, u64, u64, &[String], u64) -> Result<()>>;

/// A pending periodic firing.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Deadline {
    at: TimePoint,
    periodic: usize,
}

/// A runnable Fluent node, produced by [`FluentBuilder::build`].
///
/// [`FluentBuilder::build`]: crate::builder::FluentBuilder::build
pub struct FluentExecutor {
    pub(crate) name: String,
    pub(crate) id: u64,
    pub(crate) time: u64,
    pub(crate) collections: Vec<Box<dyn CollectionInfo>>,
    pub(crate) bootstrap_rules: Vec<Rule>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) parsers: HashMap<String, Parser>,
    pub(crate) network: NetworkState,
    pub(crate) stdin: Option<Stdin>,
    pub(crate) periodics: Vec<Periodic>,
    pub(crate) deadlines: BinaryHeap<Reverse<Deadline>>,
    pub(crate) sink: Box<dyn LineageSink>,
    pub(crate) clock: Box<dyn Clock>,
}

impl FluentExecutor {
    pub(crate) fn schedule_periodics(&mut self) {
        let now = self.clock.now();
        for (index, periodic) in self.periodics.iter().enumerate() {
            self.deadlines.push(Reverse(Deadline {
                at: now.advanced(periodic.period()),
                periodic: index,
            }));
        }
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's id, as stamped on outbound channel messages.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The node's logical time.
    pub fn logical_time(&self) -> u64 {
        self.time
    }

    /// Executes every bootstrap rule in registration order, then ticks every
    /// collection. Does nothing when no bootstrap rules are registered.
    pub fn bootstrap_tick(&mut self) -> Result<()> {
        if self.bootstrap_rules.is_empty() {
            return Ok(());
        }
        for index in 0 .. self.bootstrap_rules.len() {
            self.time += 1;
            let time = self.time;
            let FluentExecutor {
                bootstrap_rules,
                sink,
                ..
            } = self;
            (bootstrap_rules[index].eval)(sink.as_mut(), index, time)?;
        }
        self.tick_collections()
    }

    /// Executes every steady rule in registration order, then ticks every
    /// collection, routing removed tuples to the lineage sink as deletions.
    pub fn tick(&mut self) -> Result<()> {
        for index in 0 .. self.rules.len() {
            self.time += 1;
            let time = self.time;
            let FluentExecutor { rules, sink, .. } = self;
            (rules[index].eval)(sink.as_mut(), index, time)?;
        }
        self.tick_collections()
    }

    fn tick_collections(&mut self) -> Result<()> {
        self.time += 1;
        let time = self.time;
        let FluentExecutor {
            collections, sink, ..
        } = self;
        for collection in collections.iter() {
            collection.tick_collection(sink.as_mut(), time)?;
        }
        Ok(())
    }

    /// Blocks until a channel message, a terminal line, or a periodic
    /// deadline arrives, and applies it.
    ///
    /// The poll timeout is the distance to the earliest pending periodic
    /// deadline; with no periodics registered the poll waits indefinitely.
    /// Inbound messages for channels this node never declared are logged and
    /// dropped, as are messages whose columns fail to decode.
    pub fn receive(&mut self) -> Result<()> {
        self.time += 1;

        let timeout = self.poll_timeout();
        let (net_ready, stdin_ready) = {
            let mut items = vec![self.network.socket.as_poll_item(zmq::POLLIN)];
            if self.stdin.is_some() {
                items.push(zmq::PollItem::from_fd(0, zmq::POLLIN));
            }
            zmq::poll(&mut items, timeout)?;
            (
                items[0].is_readable(),
                items.len() > 1 && items[1].is_readable(),
            )
        };

        if net_ready {
            let frames = self.network.socket.recv_multipart(0)?;
            self.dispatch(frames)?;
        }

        if stdin_ready {
            if let Some(stdin) = self.stdin.clone() {
                let line = Stdin::read_line()?;
                let hash = line.hashed();
                stdin.merge(line.clone(), hash, self.time);
                self.sink
                    .insert_tuple(&stdin.name(), hash, self.time, &line.sql_values())?;
            }
        }

        self.fire_periodics()
    }

    /// Runs the node: one bootstrap tick, then receive and tick forever.
    /// An error during bootstrap prevents the main loop from starting.
    pub fn run(&mut self) -> Result<()> {
        self.bootstrap_tick()?;
        loop {
            self.receive()?;
            self.tick()?;
        }
    }

    fn poll_timeout(&self) -> i64 {
        match self.deadlines.peek() {
            None => -1,
            Some(Reverse(deadline)) => deadline
                .at
                .since(self.clock.now())
                .map(|until| until.as_millis() as i64)
                .unwrap_or(0),
        }
    }

    fn dispatch(&mut self, frames: Vec<Vec<u8>>) -> Result<()> {
        if frames.len() < 3 {
            tracing::warn!(
                frames = frames.len(),
                "dropping channel message with too few frames"
            );
            return Ok(());
        }
        let mut text = Vec::with_capacity(frames.len());
        for frame in frames {
            match String::from_utf8(frame) {
                Ok(s) => text.push(s),
                Err(_) => {
                    tracing::warn!("dropping channel message with a non-utf8 frame");
                    return Ok(());
                }
            }
        }
        let channel = text[1].clone();
        let (source_node, source_time) = match (text[0].parse::<u64>(), text[2].parse::<u64>()) {
            (Ok(node), Ok(time)) => (node, time),
            _ => {
                tracing::warn!(channel = %channel, "dropping channel message with a malformed header");
                return Ok(());
            }
        };

        let time = self.time;
        let FluentExecutor { parsers, sink, .. } = self;
        match parsers.get_mut(&channel) {
            Some(parse) => parse(sink.as_mut(), source_node, source_time, &text[3 ..], time),
            None => {
                tracing::warn!(
                    channel = %channel,
                    "a message was received for a channel whose parser was never registered"
                );
                Ok(())
            }
        }
    }

    /// Fires every periodic whose deadline has passed: inserts a fresh
    /// `(id, now)` tuple and reschedules the deadline one period from now.
    fn fire_periodics(&mut self) -> Result<()> {
        let now = self.clock.now();
        while let Some(&Reverse(deadline)) = self.deadlines.peek() {
            if deadline.at > now {
                break;
            }
            self.deadlines.pop();

            let periodic = self.periodics[deadline.periodic].clone();
            let row = (periodic.get_and_increment_id(), now);
            let hash = row.hashed();
            periodic.merge(row, hash, self.time);
            self.sink
                .insert_tuple(&periodic.name(), hash, self.time, &row.sql_values())?;

            self.deadlines.push(Reverse(Deadline {
                at: now.advanced(periodic.period()),
                periodic: deadline.periodic,
            }));
        }
        Ok(())
    }

    /// Declares the provenance of a black-box request/response channel pair.
    ///
    /// `request_index` and `response_index` are collection indices in
    /// declaration order. The request channel's first three columns must be
    /// exactly `dst_addr, src_addr, id` typed `(text, text, bigint)`; the
    /// response's first two must be `addr, id` typed `(text, bigint)`. The
    /// remaining request columns are the call's arguments, the remaining
    /// response columns its results.
    ///
    /// `fragment` receives one SQL placeholder name per parameter of the
    /// generated lineage function (the response tuple's insertion time
    /// followed by the arguments and results) and returns the SQL body that
    /// locates the tuples the call derived from. Two functions are installed
    /// in the store: `{node}_{response}_lineage_impl` wrapping the fragment,
    /// and `{node}_{response}_lineage(id)` joining request to response on
    /// `id` and delegating to it.
    pub fn register_black_box_lineage<F>(
        &mut self,
        request_index: usize,
        response_index: usize,
        fragment: F,
    ) -> Result<()>
    where
        F: Fn(&[String]) -> String,
    {
        if request_index >= self.collections.len() || response_index >= self.collections.len() {
            return Err(Error::Config(
                "black-box lineage indices are out of bounds".to_string(),
            ));
        }
        if request_index == response_index {
            return Err(Error::Config(
                "the same channel cannot be simultaneously a request and a response channel"
                    .to_string(),
            ));
        }
        let request = self.collections[request_index].spec();
        let response = self.collections[response_index].spec();
        for spec in [&request, &response] {
            if spec.kind != CollectionKind::Channel {
                return Err(Error::Config(format!(
                    "black-box lineage requires channels, but {} is a {}",
                    spec.name,
                    spec.kind.as_str()
                )));
            }
        }

        let request_contract = "the first three columns of a request channel must be \
                                dst_addr, src_addr, and id columns typed (text, text, bigint)";
        let expected_names = ["dst_addr", "src_addr", "id"];
        let expected_types = ["text", "text", "bigint"];
        if request.column_names.len() < 3
            || request.column_names[.. 3] != expected_names
            || request.column_types[.. 3] != expected_types
        {
            return Err(Error::Config(format!(
                "{}: {} declares ({})",
                request_contract,
                request.name,
                request.column_names.join(", ")
            )));
        }

        let response_contract = "the first two columns of a response channel must be \
                                 addr and id columns typed (text, bigint)";
        let expected_names = ["addr", "id"];
        let expected_types = ["text", "bigint"];
        if response.column_names.len() < 2
            || response.column_names[.. 2] != expected_names
            || response.column_types[.. 2] != expected_types
        {
            return Err(Error::Config(format!(
                "{}: {} declares ({})",
                response_contract,
                response.name,
                response.column_names.join(", ")
            )));
        }

        let mut types: Vec<String> = request.column_types[3 ..].to_vec();
        types.extend(response.column_types[2 ..].iter().cloned());

        let mut columns: Vec<String> = request.column_names[3 ..]
            .iter()
            .map(|name| format!("Req.{}", name))
            .collect();
        columns.extend(
            response.column_names[2 ..]
                .iter()
                .map(|name| format!("Resp.{}", name)),
        );

        let placeholders: Vec<String> = (1 ..= 1 + types.len()).map(|i| format!("${}", i)).collect();
        let body = fragment(&placeholders);

        self.sink.exec(&format!(
            r#"
      CREATE FUNCTION {}_{}_lineage_impl(bigint, {})
      RETURNS TABLE(collection_name text, hash bigint, time_inserted bigint)
      AS $${}$$ LANGUAGE SQL;
    "#,
            self.name,
            response.name,
            types.join(", "),
            body
        ))?;

        self.sink.exec(&format!(
            r#"
      CREATE FUNCTION {}_{}_lineage(bigint)
      RETURNS TABLE(collection_name text, hash bigint, time_inserted bigint)
      AS $$
        SELECT {}_{}_lineage_impl(Req.time_inserted, {})
        FROM {}_{} Req, {}_{} Resp
        WHERE Req.id = $1 AND Resp.id = $1
      $$ LANGUAGE SQL;
    "#,
            self.name,
            response.name,
            self.name,
            response.name,
            columns.join(", "),
            self.name,
            request.name,
            self.name,
            response.name
        ))?;

        Ok(())
    }
}

//! The relational-store sink, over a blocking Postgres connection.
//!
//! One set of tables per node, namespace-prefixed by the node's name:
//!
//! - `{node}_{collection}` per collection, with `hash`, `time_inserted`,
//!   `time_deleted`, `physical_time_inserted`, and one column per declared
//!   column; deletion is an update of `time_deleted`.
//! - `{node}_rules` recording `(rule_id, is_bootstrap, text)`.
//! - `{node}_derived_lineage` and `{node}_networked_lineage` recording the
//!   two kinds of lineage edges.
//! - a shared `nodes` registry mapping node ids to names and addresses.
//!
//! Tuple hashes are 64-bit and stored as `bigint` by reinterpreting the bits
//! as signed; queries that join on `hash` never interpret the sign.

use postgres::{Client, NoTls};

use crate::error::Result;
use crate::lineage::{CollectionSpec, ConnectionConfig, LineageSink};
use crate::row::SqlValue;

/// A [`LineageSink`] writing to Postgres.
pub struct PostgresSink {
    client: Client,
    node: String,
    node_id: u64,
    address: String,
}

impl PostgresSink {
    /// Connects to the store described by `config`.
    pub fn connect(
        node: &str,
        node_id: u64,
        address: &str,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        let client = Client::connect(&config.connection_string(), NoTls)?;
        tracing::info!(node, host = %config.host, dbname = %config.dbname, "connected to lineage store");
        Ok(PostgresSink {
            client,
            node: node.to_string(),
            node_id,
            address: address.to_string(),
        })
    }

    fn signed(hash: u64) -> i64 {
        hash as i64
    }
}

impl LineageSink for PostgresSink {
    fn init(&mut self) -> Result<()> {
        self.client.batch_execute(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id      numeric(20) NOT NULL,
                name    text        NOT NULL,
                address text        NOT NULL
            );
            INSERT INTO nodes VALUES ({}, '{}', '{}');
            CREATE TABLE {}_rules (
                rule_id      bigint  NOT NULL,
                is_bootstrap boolean NOT NULL,
                text         text    NOT NULL
            );
            CREATE TABLE {}_derived_lineage (
                target_collection text    NOT NULL,
                target_hash       bigint  NOT NULL,
                source_collection text    NOT NULL,
                source_hash       bigint  NOT NULL,
                rule_id           bigint  NOT NULL,
                inserted          boolean NOT NULL,
                logical_time      bigint  NOT NULL
            );
            CREATE TABLE {}_networked_lineage (
                remote_node_id   numeric(20) NOT NULL,
                remote_time      bigint      NOT NULL,
                local_collection text        NOT NULL,
                local_hash       bigint      NOT NULL,
                local_time       bigint      NOT NULL
            );
            "#,
            self.node_id, self.node, self.address, self.node, self.node, self.node
        ))?;
        Ok(())
    }

    fn add_collection(&mut self, spec: &CollectionSpec) -> Result<()> {
        let mut columns = String::new();
        for (name, sql_type) in spec.column_names.iter().zip(spec.column_types.iter()) {
            columns.push_str(&format!("{} {} NOT NULL,\n                ", name, sql_type));
        }
        self.client.batch_execute(&format!(
            r#"
            CREATE TABLE {}_{} (
                hash                    bigint NOT NULL,
                time_inserted           bigint NOT NULL,
                time_deleted            bigint,
                physical_time_inserted  timestamp with time zone NOT NULL,
                {}PRIMARY KEY (hash, time_inserted)
            );
            "#,
            self.node, spec.name, columns
        ))?;
        Ok(())
    }

    fn add_rule(&mut self, rule_id: usize, is_bootstrap: bool, text: &str) -> Result<()> {
        self.client.batch_execute(&format!(
            "INSERT INTO {}_rules VALUES ({}, {}, {});",
            self.node,
            rule_id,
            is_bootstrap,
            SqlValue::Text(text.to_string()).literal()
        ))?;
        Ok(())
    }

    fn insert_tuple(
        &mut self,
        collection: &str,
        hash: u64,
        time: u64,
        values: &[SqlValue],
    ) -> Result<()> {
        let rendered: Vec<String> = values.iter().map(SqlValue::literal).collect();
        self.client.batch_execute(&format!(
            "INSERT INTO {}_{} VALUES ({}, {}, NULL, now(), {});",
            self.node,
            collection,
            Self::signed(hash),
            time,
            rendered.join(", ")
        ))?;
        Ok(())
    }

    fn delete_tuple(
        &mut self,
        collection: &str,
        hash: u64,
        time: u64,
        _values: &[SqlValue],
    ) -> Result<()> {
        self.client.batch_execute(&format!(
            "UPDATE {}_{} SET time_deleted = {} WHERE hash = {} AND time_deleted IS NULL;",
            self.node,
            collection,
            time,
            Self::signed(hash)
        ))?;
        Ok(())
    }

    fn add_derived_lineage(
        &mut self,
        source: &str,
        source_hash: u64,
        rule_id: usize,
        inserted: bool,
        target: &str,
        target_hash: u64,
        time: u64,
    ) -> Result<()> {
        self.client.batch_execute(&format!(
            "INSERT INTO {}_derived_lineage VALUES ('{}', {}, '{}', {}, {}, {}, {});",
            self.node,
            target,
            Self::signed(target_hash),
            source,
            Self::signed(source_hash),
            rule_id,
            inserted,
            time
        ))?;
        Ok(())
    }

    fn add_networked_lineage(
        &mut self,
        source_node: u64,
        source_time: u64,
        target: &str,
        target_hash: u64,
        time: u64,
    ) -> Result<()> {
        self.client.batch_execute(&format!(
            "INSERT INTO {}_networked_lineage VALUES ({}, {}, '{}', {}, {});",
            self.node,
            source_node,
            source_time,
            target,
            Self::signed(target_hash),
            time
        ))?;
        Ok(())
    }

    fn exec(&mut self, sql: &str) -> Result<()> {
        self.client.batch_execute(sql)?;
        Ok(())
    }
}

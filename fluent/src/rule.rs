//! Rules: a target collection, a write mode, and a pipeline.
//!
//! Executing a rule drives its pipeline once and routes every produced tuple
//! through the write discipline: a derived-lineage event per provenance edge,
//! an insert or delete event for the tuple itself, and the write into the
//! target through the mode's primitive. Which modes exist is decided per
//! collection kind at compile time: tables offer all three constructors,
//! scratches and channels only `merge_rule`, stdout `merge_rule` and
//! `defer_merge_rule`. There is no way to write a deferred rule against a
//! channel, because the method does not exist.
//!
//! Tuples merged into a channel or into stdout are not retained, so those
//! writes record an insertion immediately followed by a deletion.

use crate::collections::{Channel, Scratch, Stdout, Table};
use crate::error::Result;
use crate::hashable::Hashable;
use crate::lineage::LineageSink;
use crate::ra::Pipeline;
use crate::row::{AddressedRow, Row};

/// The three write modes, in Bloom's notation: `<=` fires now, `<+` inserts
/// at the end of the tick, `<-` deletes at the end of the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleTag {
    /// Write into the live collection immediately.
    Merge,
    /// Queue an insertion, visible after the tick.
    DeferredMerge,
    /// Queue a deletion, applied at the tick.
    DeferredDelete,
}

impl RuleTag {
    /// The infix notation used in rule texts.
    pub fn infix(&self) -> &'static str {
        match self {
            RuleTag::Merge => "<=",
            RuleTag::DeferredMerge => "<+",
            RuleTag::DeferredDelete => "<-",
        }
    }
}

pub(crate) type RuleFn = Box<dyn FnMut(&mut dyn LineageSink, usize, u64) -> Result<()>>;

/// One registered rule. Built from a collection handle's rule constructor;
/// executed by the scheduler once per tick in registration order.
pub struct Rule {
    target: String,
    tag: RuleTag,
    text: String,
    pub(crate) eval: RuleFn,
}

impl Rule {
    /// The target collection's name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The write mode.
    pub fn tag(&self) -> RuleTag {
        self.tag
    }

    /// The human-readable rendering recorded in the lineage store.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Drives `pipeline` once, emitting lineage events and handing each tuple to
/// `write`. The first sink or write error stops further effects and becomes
/// the rule's status.
fn evaluate<P, W>(
    pipeline: &P,
    sink: &mut dyn LineageSink,
    rule_id: usize,
    time: u64,
    target: &str,
    inserted: bool,
    pseudo_delete: bool,
    mut write: W,
) -> Result<()>
where
    P: Pipeline,
    W: FnMut(P::Item, u64, u64) -> Result<()>,
{
    let mut status: Result<()> = Ok(());
    pipeline.clone().for_each(|tuple| {
        if status.is_err() {
            return;
        }
        let hash = tuple.row.hashed();
        for source in tuple.lineage.iter() {
            if let Err(error) = sink.add_derived_lineage(
                &source.collection,
                source.hash,
                rule_id,
                inserted,
                target,
                hash,
                time,
            ) {
                status = Err(error);
                return;
            }
        }
        let values = tuple.row.sql_values();
        let recorded = if inserted {
            sink.insert_tuple(target, hash, time, &values)
        } else {
            sink.delete_tuple(target, hash, time, &values)
        };
        if let Err(error) = recorded {
            status = Err(error);
            return;
        }
        if pseudo_delete {
            if let Err(error) = sink.delete_tuple(target, hash, time, &values) {
                status = Err(error);
                return;
            }
        }
        if let Err(error) = write(tuple.row, hash, time) {
            status = Err(error);
        }
    });
    status
}

fn rule_text<P: Pipeline>(target: &str, tag: RuleTag, pipeline: &P) -> String {
    format!("{} {} {}", target, tag.infix(), pipeline.describe())
}

impl<R: Row> Table<R> {
    /// The rule `self <= pipeline`: merge every produced tuple immediately.
    pub fn merge_rule<P: Pipeline<Item = R>>(&self, pipeline: P) -> Rule {
        let target = self.clone();
        let name = self.name();
        Rule {
            target: name.clone(),
            tag: RuleTag::Merge,
            text: rule_text(&name, RuleTag::Merge, &pipeline),
            eval: Box::new(move |sink: &mut dyn LineageSink, rule_id: usize, time: u64| {
                let table = target.clone();
                evaluate(
                    &pipeline,
                    sink,
                    rule_id,
                    time,
                    &name,
                    true,
                    false,
                    move |row, hash, time| {
                        table.merge(row, hash, time);
                        Ok(())
                    },
                )
            }),
        }
    }

    /// The rule `self <+ pipeline`: insertions become visible at the tick.
    pub fn defer_merge_rule<P: Pipeline<Item = R>>(&self, pipeline: P) -> Rule {
        let target = self.clone();
        let name = self.name();
        Rule {
            target: name.clone(),
            tag: RuleTag::DeferredMerge,
            text: rule_text(&name, RuleTag::DeferredMerge, &pipeline),
            eval: Box::new(move |sink: &mut dyn LineageSink, rule_id: usize, time: u64| {
                let table = target.clone();
                evaluate(
                    &pipeline,
                    sink,
                    rule_id,
                    time,
                    &name,
                    true,
                    false,
                    move |row, hash, time| {
                        table.deferred_merge(row, hash, time);
                        Ok(())
                    },
                )
            }),
        }
    }

    /// The rule `self <- pipeline`: deletions applied at the tick.
    pub fn defer_delete_rule<P: Pipeline<Item = R>>(&self, pipeline: P) -> Rule {
        let target = self.clone();
        let name = self.name();
        Rule {
            target: name.clone(),
            tag: RuleTag::DeferredDelete,
            text: rule_text(&name, RuleTag::DeferredDelete, &pipeline),
            eval: Box::new(move |sink: &mut dyn LineageSink, rule_id: usize, time: u64| {
                let table = target.clone();
                evaluate(
                    &pipeline,
                    sink,
                    rule_id,
                    time,
                    &name,
                    false,
                    false,
                    move |row, hash, time| {
                        table.deferred_delete(row, hash, time);
                        Ok(())
                    },
                )
            }),
        }
    }
}

impl<R: Row> Scratch<R> {
    /// The rule `self <= pipeline`. Scratches accept no deferred modes; the
    /// collection is cleared at the tick anyway.
    pub fn merge_rule<P: Pipeline<Item = R>>(&self, pipeline: P) -> Rule {
        let target = self.clone();
        let name = self.name();
        Rule {
            target: name.clone(),
            tag: RuleTag::Merge,
            text: rule_text(&name, RuleTag::Merge, &pipeline),
            eval: Box::new(move |sink: &mut dyn LineageSink, rule_id: usize, time: u64| {
                let scratch = target.clone();
                evaluate(
                    &pipeline,
                    sink,
                    rule_id,
                    time,
                    &name,
                    true,
                    false,
                    move |row, hash, time| {
                        scratch.merge(row, hash, time);
                        Ok(())
                    },
                )
            }),
        }
    }
}

impl<R: AddressedRow> Channel<R> {
    /// The rule `self <= pipeline`: send every produced tuple to the address
    /// in its first column. Channels accept no deferred modes.
    pub fn merge_rule<P: Pipeline<Item = R>>(&self, pipeline: P) -> Rule {
        let target = self.clone();
        let name = self.name();
        Rule {
            target: name.clone(),
            tag: RuleTag::Merge,
            text: rule_text(&name, RuleTag::Merge, &pipeline),
            eval: Box::new(move |sink: &mut dyn LineageSink, rule_id: usize, time: u64| {
                let channel = target.clone();
                evaluate(
                    &pipeline,
                    sink,
                    rule_id,
                    time,
                    &name,
                    true,
                    true,
                    move |row, hash, time| channel.merge(row, hash, time),
                )
            }),
        }
    }
}

impl Stdout {
    /// The rule `self <= pipeline`: print each produced line immediately.
    pub fn merge_rule<P: Pipeline<Item = (String,)>>(&self, pipeline: P) -> Rule {
        let target = self.clone();
        let name = self.name();
        Rule {
            target: name.clone(),
            tag: RuleTag::Merge,
            text: rule_text(&name, RuleTag::Merge, &pipeline),
            eval: Box::new(move |sink: &mut dyn LineageSink, rule_id: usize, time: u64| {
                let stdout = target.clone();
                evaluate(
                    &pipeline,
                    sink,
                    rule_id,
                    time,
                    &name,
                    true,
                    true,
                    move |row, hash, time| {
                        stdout.merge(row, hash, time);
                        Ok(())
                    },
                )
            }),
        }
    }

    /// The rule `self <+ pipeline`: buffer each produced line and print it
    /// when the collection ticks.
    pub fn defer_merge_rule<P: Pipeline<Item = (String,)>>(&self, pipeline: P) -> Rule {
        let target = self.clone();
        let name = self.name();
        Rule {
            target: name.clone(),
            tag: RuleTag::DeferredMerge,
            text: rule_text(&name, RuleTag::DeferredMerge, &pipeline),
            eval: Box::new(move |sink: &mut dyn LineageSink, rule_id: usize, time: u64| {
                let stdout = target.clone();
                evaluate(
                    &pipeline,
                    sink,
                    rule_id,
                    time,
                    &name,
                    true,
                    true,
                    move |row, hash, time| {
                        stdout.deferred_merge(row, hash, time);
                        Ok(())
                    },
                )
            }),
        }
    }
}

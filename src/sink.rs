//! Destinations for decoded records.

use tokio::sync::mpsc::UnboundedSender;

use crate::{dissect::SniffedRecord, record::DecodedRecord};

/// Receives records from the capture pump, in per-connection order.
///
/// Delivery runs on the pump's worker and must not block.
pub trait RecordSink: Send + 'static {
    fn deliver(&mut self, record: SniffedRecord);
}

/// Forwards records to a channel. Records are dropped once the receiver
/// has gone away.
impl RecordSink for UnboundedSender<SniffedRecord> {
    fn deliver(&mut self, record: SniffedRecord) {
        if self.send(record).is_err() {
            log::debug!("record receiver closed, dropping record");
        }
    }
}

impl RecordSink for Vec<SniffedRecord> {
    fn deliver(&mut self, record: SniffedRecord) { self.push(record); }
}

/// Writes each record to the `tracing` subscriber at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn deliver(&mut self, record: SniffedRecord) {
        let SniffedRecord { flow, record, .. } = record;
        match record {
            DecodedRecord::Attack(attack) => tracing::info!(
                %flow,
                user_id = attack.user_id,
                target_id = attack.target_id,
                key1 = attack.key1,
                key2 = attack.key2,
                flags = ?attack.flags.set_names(),
                "attack"
            ),
            DecodedRecord::Action(action) => tracing::info!(
                %flow,
                user_id = action.user_id,
                skill_name = %action.skill_name,
                key1 = action.key1,
                "action"
            ),
            DecodedRecord::Hp(hp) => tracing::info!(
                %flow,
                target_id = hp.target_id,
                prev = hp.prev,
                current = hp.current,
                damage = hp.damage,
                "hp"
            ),
            DecodedRecord::SelfDamage(data) | DecodedRecord::Item(data) => tracing::info!(
                %flow,
                type_id = data.type_id,
                len = data.len(),
                "opaque record"
            ),
        }
    }
}

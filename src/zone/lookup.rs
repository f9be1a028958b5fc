use super::record::{Record, RecordKind, RecordList};
use crate::query::QueryContext;
use crate::store::ZoneData;
use tracing::{debug, warn};

/// Reads the stored records of one owner name
pub struct RecordLookup {
    data: ZoneData,
}

impl RecordLookup {
    pub fn new(data: ZoneData) -> Self {
        Self { data }
    }

    /// Records of `kind` stored under `owner` in `zone`, in stored order
    ///
    /// A missing owner, a failed read or an undecodable list all give an empty
    /// result.
    pub async fn lookup(
        &self,
        ctx: &QueryContext,
        zone: &str,
        owner: &str,
        kind: RecordKind,
    ) -> Vec<Record> {
        let json = match self.data.owner_records(zone, owner).await {
            Ok(Some(json)) => json,
            Ok(None) => {
                debug!(parent: ctx.span(), zone, owner, "no records stored for owner");
                return Vec::new();
            }
            Err(e) => {
                warn!(parent: ctx.span(), zone, owner, error = %e, "failed to read owner records");
                return Vec::new();
            }
        };

        decode_records(ctx, zone, owner, &json, Some(kind))
    }
}

/// Decode a stored record list, keeping only `kind` when given
///
/// Entries that fail to decode are logged and skipped.
pub(crate) fn decode_records(
    ctx: &QueryContext,
    zone: &str,
    owner: &str,
    json: &str,
    kind: Option<RecordKind>,
) -> Vec<Record> {
    let list = match RecordList::parse(json) {
        Ok(list) => list,
        Err(e) => {
            warn!(parent: ctx.span(), zone, owner, error = %e, "malformed record list");
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(list.len());
    for (idx, descriptor) in list.descriptors().enumerate() {
        let descriptor = match descriptor {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(parent: ctx.span(), zone, owner, idx, error = %e, "skipping malformed record");
                continue;
            }
        };
        if kind.is_some_and(|kind| !descriptor.is_kind(kind)) {
            continue;
        }
        match descriptor.build() {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(parent: ctx.span(), zone, owner, idx, error = %e, "skipping malformed record")
            }
        }
    }
    records
}

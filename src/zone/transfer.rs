//! Zone transfer (AXFR/IXFR)
//!
//! Full transfers dump the stored zone between two copies of its SOA
//! (RFC 5936). Incremental transfers walk the serial history from the client's
//! serial to the current one and emit each stored diff step in the RFC 1995
//! layout: old SOA, removals, new SOA, additions. Output is streamed through
//! [`Response::stream_answer`], so large zones go out in several messages.

use super::constants::{NS_TTL, RECORD_TTL, SOA_TTL};
use super::lookup::decode_records;
use super::ns::NsSetBuilder;
use super::record::{DiffEntry, Record, SoaRecord};
use super::soa::SoaGenerator;
use super::qualify;
use crate::dns::common::check_name;
use crate::error::Result;
use crate::query::QueryContext;
use crate::response::{ErrorCode, Response};
use crate::store::{DiffSide, ZoneData};
use tracing::{debug, info, warn};

/// Serves AXFR and IXFR for zones held in the record store
pub struct ZoneTransferEngine {
    soa: SoaGenerator,
    ns: NsSetBuilder,
    data: ZoneData,
}

impl ZoneTransferEngine {
    pub fn new(soa: SoaGenerator, ns: NsSetBuilder, data: ZoneData) -> Self {
        Self { soa, ns, data }
    }

    /// Full zone transfer
    ///
    /// Only the SOA read is fatal. If the zone cannot be enumerated the
    /// transfer is finished with what was already queued.
    pub async fn axfr(&self, ctx: &QueryContext, zone: &str, mut response: Response<'_>) -> Result<()> {
        let soa = match self.soa.generate(ctx, zone).await {
            Ok(soa) => soa,
            Err(e) => {
                warn!(parent: ctx.span(), zone, error = %e, "axfr failed to generate soa");
                return response.fail(ErrorCode::ServerFailure).await;
            }
        };

        response
            .stream_answer(zone, Record::SOA(soa.clone()), SOA_TTL)
            .await?;
        for ns in self.ns.build(zone) {
            response.stream_answer(zone, ns, NS_TTL).await?;
        }

        match self.data.all_owners(zone).await {
            Ok(owners) => {
                for (owner, json) in owners {
                    let Some(name) = owner_name(ctx, zone, &owner) else {
                        continue;
                    };
                    for record in decode_records(ctx, zone, &owner, &json, None) {
                        response.stream_answer(name.as_str(), record, RECORD_TTL).await?;
                    }
                }
            }
            Err(e) => {
                warn!(parent: ctx.span(), zone, error = %e, "failed to enumerate zone, sending partial axfr");
            }
        }

        response.stream_answer(zone, Record::SOA(soa), SOA_TTL).await?;
        info!(
            parent: ctx.span(),
            zone,
            messages = response.flushed() + 1,
            "axfr complete"
        );
        response.send().await
    }

    /// Incremental zone transfer from `base` to the current serial
    ///
    /// A base serial that is absent from the history (or not supplied at all)
    /// yields an empty diff: just the current SOA, twice.
    pub async fn ixfr(
        &self,
        ctx: &QueryContext,
        zone: &str,
        base: Option<u32>,
        mut response: Response<'_>,
    ) -> Result<()> {
        let current = match self.soa.generate(ctx, zone).await {
            Ok(soa) => soa,
            Err(e) => {
                warn!(parent: ctx.span(), zone, error = %e, "ixfr failed to generate soa");
                return response.fail(ErrorCode::ServerFailure).await;
            }
        };
        response
            .stream_answer(zone, Record::SOA(current.clone()), SOA_TTL)
            .await?;

        let history = match self.data.serial_history(zone).await {
            Ok(history) => history,
            Err(e) => {
                warn!(parent: ctx.span(), zone, error = %e, "failed to read serial history");
                return response.fail(ErrorCode::ServerFailure).await;
            }
        };

        let start = base.and_then(|base| history.iter().position(|serial| *serial == base));
        match start {
            Some(start) => {
                let steps = &history[start..];
                debug!(
                    parent: ctx.span(),
                    zone,
                    base = ?base,
                    steps = steps.len().saturating_sub(1),
                    "walking serial history"
                );
                for pair in steps.windows(2) {
                    self.stream_step(ctx, zone, &current, pair[0], pair[1], &mut response)
                        .await?;
                }
            }
            None => {
                debug!(parent: ctx.span(), zone, base = ?base, "base serial not in history");
            }
        }

        response
            .stream_answer(zone, Record::SOA(current.clone()), SOA_TTL)
            .await?;
        info!(
            parent: ctx.span(),
            zone,
            serial = current.serial,
            messages = response.flushed() + 1,
            "ixfr complete"
        );
        response.send().await
    }

    async fn stream_step(
        &self,
        ctx: &QueryContext,
        zone: &str,
        current: &SoaRecord,
        from: u32,
        to: u32,
        response: &mut Response<'_>,
    ) -> Result<()> {
        response
            .stream_answer(zone, Record::SOA(current.with_serial(from)), SOA_TTL)
            .await?;
        self.stream_diff(ctx, zone, from, to, DiffSide::Remove, response)
            .await?;
        response
            .stream_answer(zone, Record::SOA(current.with_serial(to)), SOA_TTL)
            .await?;
        self.stream_diff(ctx, zone, from, to, DiffSide::Add, response)
            .await
    }

    /// Stream one half of a diff step; unreadable entries are skipped
    async fn stream_diff(
        &self,
        ctx: &QueryContext,
        zone: &str,
        from: u32,
        to: u32,
        side: DiffSide,
        response: &mut Response<'_>,
    ) -> Result<()> {
        let entries = match self.data.diff_entries(zone, from, to, side).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(parent: ctx.span(), zone, from, to, %side, error = %e, "failed to read diff");
                return Ok(());
            }
        };

        for json in entries {
            let entry = match DiffEntry::parse(&json) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(parent: ctx.span(), zone, from, to, %side, error = %e, "skipping malformed diff entry");
                    continue;
                }
            };
            let Some(name) = owner_name(ctx, zone, &entry.name) else {
                continue;
            };
            match entry.record.build() {
                Ok(record) => response.stream_answer(name, record, RECORD_TTL).await?,
                Err(e) => {
                    warn!(parent: ctx.span(), zone, owner = %entry.name, error = %e, "skipping malformed diff record")
                }
            }
        }
        Ok(())
    }
}

/// Fully-qualified owner of a stored entry, unless it is too long to encode
fn owner_name(ctx: &QueryContext, zone: &str, owner: &str) -> Option<String> {
    let name = qualify(owner, zone);
    match check_name(&name) {
        Ok(()) => Some(name),
        Err(e) => {
            warn!(parent: ctx.span(), zone, owner, error = %e, "skipping records with unencodable owner");
            None
        }
    }
}

//! Per-query state machine
//!
//! A query is resolved to its zone, then handled by type: SOA or NS at the
//! apex, a zone transfer, or a lookup of the stored records of its owner
//! name. Every path ends in exactly one final message on the sink.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::query::{Query, QueryContext, QueryType};
use crate::response::{ErrorCode, Response, ResponseSink};
use crate::store::{RecordStore, ZoneData};
use crate::zone::constants::{NS_TTL, RECORD_TTL, SOA_TTL};
use crate::zone::{
    NsSetBuilder, Record, RecordKind, RecordLookup, SoaGenerator, ZoneResolver,
    ZoneTransferEngine, owner_label,
};
use std::sync::Arc;
use tracing::{Instrument, debug, warn};

pub struct QueryDispatcher {
    resolver: ZoneResolver,
    soa: SoaGenerator,
    ns: NsSetBuilder,
    lookup: RecordLookup,
    transfer: ZoneTransferEngine,
}

impl QueryDispatcher {
    pub fn new(config: Arc<ServerConfig>, store: Arc<dyn RecordStore>) -> Self {
        let data = ZoneData::new(store);
        let soa = SoaGenerator::new(&config, data.clone());
        let ns = NsSetBuilder::new(config.clone());

        Self {
            resolver: ZoneResolver::new(config, data.clone()),
            lookup: RecordLookup::new(data.clone()),
            transfer: ZoneTransferEngine::new(soa.clone(), ns.clone(), data),
            soa,
            ns,
        }
    }

    /// Answer `query`, writing every response message to `sink`
    ///
    /// Errors are transport failures only; DNS-level failures are answered
    /// with the matching response code.
    pub async fn handle(&self, query: &Query, sink: &mut dyn ResponseSink) -> Result<()> {
        let ctx = QueryContext::new(query);
        let span = ctx.span().clone();

        let result = self
            .dispatch(&ctx, query, Response::new(sink))
            .instrument(span)
            .await;
        match &result {
            Ok(()) => debug!(parent: ctx.span(), "responded ok"),
            Err(e) => warn!(parent: ctx.span(), error = %e, "failed to send response"),
        }
        result
    }

    async fn dispatch(
        &self,
        ctx: &QueryContext,
        query: &Query,
        response: Response<'_>,
    ) -> Result<()> {
        let Some(zone) = self.resolver.resolve(ctx, &query.name).await else {
            warn!(parent: ctx.span(), "no zone found for query");
            return response.fail(ErrorCode::ServerFailure).await;
        };
        ctx.record_zone(&zone);
        let apex = query.name == zone;

        match query.qtype {
            QueryType::Record(RecordKind::SOA) if apex => {
                self.soa_apex(ctx, &zone, response).await
            }
            QueryType::Record(RecordKind::NS) if apex => self.ns_apex(&zone, response).await,
            QueryType::AXFR => self.transfer.axfr(ctx, &zone, response).await,
            QueryType::IXFR => {
                self.transfer
                    .ixfr(ctx, &zone, query.ixfr_base, response)
                    .await
            }
            qtype => {
                self.generic_lookup(ctx, query, &zone, qtype.record_kind(), response)
                    .await
            }
        }
    }

    async fn soa_apex(
        &self,
        ctx: &QueryContext,
        zone: &str,
        mut response: Response<'_>,
    ) -> Result<()> {
        let soa = match self.soa.generate(ctx, zone).await {
            Ok(soa) => soa,
            Err(e) => {
                warn!(parent: ctx.span(), error = %e, "failed to generate soa");
                return response.fail(ErrorCode::ServerFailure).await;
            }
        };

        response.add_answer(zone, Record::SOA(soa), SOA_TTL);
        self.add_ns_authority(zone, &mut response);
        response.send().await
    }

    async fn ns_apex(&self, zone: &str, mut response: Response<'_>) -> Result<()> {
        for ns in self.ns.build(zone) {
            response.add_answer(zone, ns, NS_TTL);
        }
        response.send().await
    }

    async fn generic_lookup(
        &self,
        ctx: &QueryContext,
        query: &Query,
        zone: &str,
        kind: Option<RecordKind>,
        mut response: Response<'_>,
    ) -> Result<()> {
        let owner = owner_label(&query.name, zone);
        let records = match kind {
            Some(kind) => self.lookup.lookup(ctx, zone, owner, kind).await,
            None => Vec::new(),
        };

        if !records.is_empty() {
            debug!(parent: ctx.span(), owner, count = records.len(), "found records");
            for record in records {
                response.add_answer(query.name.as_str(), record, RECORD_TTL);
            }
            self.add_ns_authority(zone, &mut response);
            return response.send().await;
        }

        let soa = match self.soa.generate(ctx, zone).await {
            Ok(soa) => soa,
            Err(e) => {
                warn!(parent: ctx.span(), error = %e, "failed to generate soa for negative answer");
                return response.fail(ErrorCode::ServerFailure).await;
            }
        };
        debug!(parent: ctx.span(), owner, "no matching records");
        response.set_error(ErrorCode::NameError);
        response.add_authority(zone, Record::SOA(soa), SOA_TTL);
        response.send().await
    }

    fn add_ns_authority(&self, zone: &str, response: &mut Response<'_>) {
        for ns in self.ns.build(zone) {
            response.add_authority(zone, ns, NS_TTL);
        }
    }
}

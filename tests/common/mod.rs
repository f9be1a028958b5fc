//! Shared helpers for the integration tests

#![allow(dead_code)]

use redzone::{
    QueryDispatcher,
    config::{ServerConfig, ZoneSettings},
    query::{Query, QueryType},
    response::{CollectingSink, ResourceEntry},
    store::{MemoryStore, RecordStore},
    zone::{Record, RecordDescriptor, RecordKind},
};
use serde_json::json;
use std::sync::Arc;

pub const ZONE: &str = "example.com";
pub const REVERSE_ZONE: &str = "2.0.192.in-addr.arpa";

/// Primary `ns0.example.com`; `example.com` has one slave, `hidden.example.org`
/// a hidden master, reverse zones a single slave
pub fn test_config() -> ServerConfig {
    ServerConfig::new("ns0.example.com", "hostmaster@example.com")
        .with_forward_zone(
            ZONE,
            ZoneSettings {
                hidden_master: false,
                slaves: vec!["ns1.example.net".to_string()],
            },
        )
        .with_forward_zone(
            "hidden.example.org",
            ZoneSettings {
                hidden_master: true,
                slaves: vec!["ns1.example.net".to_string(), "ns2.example.net".to_string()],
            },
        )
        .with_reverse_zones(ZoneSettings {
            hidden_master: false,
            slaves: vec!["rev.example.net".to_string()],
        })
}

pub fn create_dispatcher(store: &Arc<MemoryStore>) -> QueryDispatcher {
    let store: Arc<dyn RecordStore> = store.clone();
    QueryDispatcher::new(Arc::new(test_config()), store)
}

pub fn create_query(name: &str, qtype: QueryType) -> Query {
    Query::new(name, qtype, "198.51.100.7:40000".parse().unwrap(), 4242)
}

pub fn record_query(name: &str, kind: RecordKind) -> Query {
    create_query(name, QueryType::Record(kind))
}

pub async fn run_query(dispatcher: &QueryDispatcher, query: &Query) -> CollectingSink {
    let mut sink = CollectingSink::new();
    dispatcher
        .handle(query, &mut sink)
        .await
        .expect("collecting sink never fails");
    sink
}

/// Stored JSON list for the given records
pub fn record_list(records: &[Record]) -> String {
    let descriptors: Vec<RecordDescriptor> = records.iter().map(RecordDescriptor::from).collect();
    serde_json::to_string(&descriptors).unwrap()
}

/// Stored `{name, record}` diff entry
pub fn diff_entry(owner: &str, record: &Record) -> String {
    json!({ "name": owner, "record": RecordDescriptor::from(record) }).to_string()
}

pub fn a(addr: &str) -> Record {
    Record::A(addr.parse().unwrap())
}

/// Store `count` owners `host<i>`, one A record each
pub fn populate_hosts(store: &MemoryStore, zone: &str, count: usize) {
    for i in 0..count {
        let addr = format!("10.{}.{}.{}", i / 65536, (i / 256) % 256, i % 256);
        store.hset(
            format!("zone:{}", zone),
            format!("host{}", i),
            record_list(&[a(&addr)]),
        );
    }
}

/// Compact form of a section: `SOA <serial>` or `<owner> <record>`
pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a ResourceEntry>) -> Vec<String> {
    entries
        .into_iter()
        .map(|entry| match &entry.record {
            Record::SOA(soa) => format!("SOA {}", soa.serial),
            record => format!("{} {}", entry.owner, record),
        })
        .collect()
}

mod common;

use common::*;
use redzone::{
    query::QueryType,
    response::ErrorCode,
    store::MemoryStore,
    zone::{Record, RecordKind},
};
use std::sync::Arc;

#[tokio::test]
async fn test_soa_apex_with_stored_serial() {
    let store = Arc::new(MemoryStore::new());
    store.set("zone:example.com:latest", "42");

    let sink = run_query(&create_dispatcher(&store), &record_query(ZONE, RecordKind::SOA)).await;

    let message = sink.last().unwrap();
    assert_eq!(sink.messages.len(), 1);
    assert_eq!(message.error, ErrorCode::None);
    assert_eq!(message.answers.len(), 1);

    let Record::SOA(soa) = &message.answers[0].record else {
        panic!("expected an SOA answer");
    };
    assert_eq!(soa.serial, 42);
    assert_eq!(soa.primary_host, "ns0.example.com");
    assert_eq!(soa.admin, "hostmaster.example.com");
    assert_eq!(message.answers[0].ttl, 60);

    assert_eq!(
        summarize(&message.authority),
        vec![
            "example.com NS ns0.example.com",
            "example.com NS ns1.example.net"
        ]
    );
    assert!(message.authority.iter().all(|entry| entry.ttl == 3600));
}

#[tokio::test]
async fn test_soa_apex_survives_unreachable_store() {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);

    let sink = run_query(&create_dispatcher(&store), &record_query(ZONE, RecordKind::SOA)).await;

    let message = sink.last().unwrap();
    assert_eq!(message.error, ErrorCode::None);
    assert!(message.answers[0].record.serial().unwrap() > 1_600_000_000);
}

#[tokio::test]
async fn test_soa_below_apex_is_a_lookup() {
    let store = Arc::new(MemoryStore::new());
    store.set("zone:example.com:latest", "5");

    let sink = run_query(
        &create_dispatcher(&store),
        &record_query("www.example.com", RecordKind::SOA),
    )
    .await;

    let message = sink.last().unwrap();
    assert_eq!(message.error, ErrorCode::NameError);
    assert_eq!(summarize(&message.authority), vec!["SOA 5"]);
}

#[tokio::test]
async fn test_ns_apex_for_hidden_master() {
    let store = Arc::new(MemoryStore::new());

    let sink = run_query(
        &create_dispatcher(&store),
        &record_query("hidden.example.org", RecordKind::NS),
    )
    .await;

    let message = sink.last().unwrap();
    assert_eq!(
        summarize(&message.answers),
        vec![
            "hidden.example.org NS ns1.example.net",
            "hidden.example.org NS ns2.example.net"
        ]
    );
    assert!(message.answers.iter().all(|entry| entry.ttl == 3600));
}

#[tokio::test]
async fn test_lookup_filters_by_type_in_stored_order() {
    let store = Arc::new(MemoryStore::new());
    store.hset(
        "zone:example.com",
        "www",
        record_list(&[
            a("10.0.0.1"),
            Record::TXT("hello".to_string()),
            a("10.0.0.2"),
        ]),
    );
    let dispatcher = create_dispatcher(&store);

    let sink = run_query(&dispatcher, &record_query("www.example.com", RecordKind::A)).await;
    let message = sink.last().unwrap();
    assert_eq!(
        summarize(&message.answers),
        vec!["www.example.com A 10.0.0.1", "www.example.com A 10.0.0.2"]
    );
    assert_eq!(message.authority.len(), 2);

    let sink = run_query(&dispatcher, &record_query("www.example.com", RecordKind::TXT)).await;
    assert_eq!(
        summarize(&sink.last().unwrap().answers),
        vec!["www.example.com TXT \"hello\""]
    );
}

#[tokio::test]
async fn test_apex_records() {
    let store = Arc::new(MemoryStore::new());
    store.hset(
        "zone:example.com",
        "",
        record_list(&[Record::MX {
            priority: 10,
            exchange: "mail.example.com".to_string(),
        }]),
    );

    let sink = run_query(&create_dispatcher(&store), &record_query(ZONE, RecordKind::MX)).await;

    assert_eq!(
        summarize(&sink.last().unwrap().answers),
        vec!["example.com MX 10 mail.example.com"]
    );
}

#[tokio::test]
async fn test_missing_record_is_name_error() {
    let store = Arc::new(MemoryStore::new());
    store.set("zone:example.com:latest", "11");
    store.hset("zone:example.com", "www", record_list(&[a("10.0.0.1")]));
    let dispatcher = create_dispatcher(&store);

    for query in [
        record_query("nothing.example.com", RecordKind::A),
        record_query("www.example.com", RecordKind::AAAA),
        create_query("www.example.com", QueryType::Other(13)),
    ] {
        let sink = run_query(&dispatcher, &query).await;
        let message = sink.last().unwrap();
        assert_eq!(message.error, ErrorCode::NameError);
        assert!(message.answers.is_empty());
        assert_eq!(summarize(&message.authority), vec!["SOA 11"]);
        assert_eq!(message.authority[0].owner, "example.com");
        assert_eq!(message.authority[0].ttl, 60);
    }
}

#[tokio::test]
async fn test_unreachable_store_degrades_to_name_error() {
    let store = Arc::new(MemoryStore::new());
    store.hset("zone:example.com", "www", record_list(&[a("10.0.0.1")]));
    store.set_unavailable(true);

    let sink = run_query(
        &create_dispatcher(&store),
        &record_query("www.example.com", RecordKind::A),
    )
    .await;

    let message = sink.last().unwrap();
    assert_eq!(message.error, ErrorCode::NameError);
    assert_eq!(message.authority.len(), 1);
}

#[tokio::test]
async fn test_unknown_zone_is_server_failure() {
    let store = Arc::new(MemoryStore::new());

    for query in [
        record_query("www.example.net", RecordKind::A),
        create_query("example.net", QueryType::AXFR),
        record_query("9.9.9.9.in-addr.arpa", RecordKind::PTR),
    ] {
        let sink = run_query(&create_dispatcher(&store), &query).await;
        assert_eq!(sink.messages.len(), 1);
        assert_eq!(sink.messages[0].error, ErrorCode::ServerFailure);
        assert_eq!(sink.messages[0].record_count(), 0);
    }
}

#[tokio::test]
async fn test_reverse_zone_lookup() {
    let store = Arc::new(MemoryStore::new());
    store.hset(
        format!("zone:{}", REVERSE_ZONE),
        "5",
        record_list(&[Record::PTR("host5.example.com".to_string())]),
    );

    let sink = run_query(
        &create_dispatcher(&store),
        &record_query("5.2.0.192.IN-ADDR.ARPA.", RecordKind::PTR),
    )
    .await;

    let message = sink.last().unwrap();
    assert_eq!(
        summarize(&message.answers),
        vec!["5.2.0.192.in-addr.arpa PTR host5.example.com"]
    );
    assert_eq!(
        summarize(&message.authority),
        vec![
            "2.0.192.in-addr.arpa NS ns0.example.com",
            "2.0.192.in-addr.arpa NS rev.example.net"
        ]
    );
}

#[tokio::test]
async fn test_zone_match_ignores_label_boundaries() {
    let store = Arc::new(MemoryStore::new());
    store.set("zone:example.com:latest", "1");
    // "badexample.com" ends with "example.com"; the owner label is what is
    // left after dropping the zone and one separator character
    store.hset("zone:example.com", "ba", record_list(&[a("10.9.9.9")]));

    let sink = run_query(
        &create_dispatcher(&store),
        &record_query("badexample.com", RecordKind::A),
    )
    .await;

    assert_eq!(
        summarize(&sink.last().unwrap().answers),
        vec!["badexample.com A 10.9.9.9"]
    );
}

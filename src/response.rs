//! Response building and the seam to the transport
//!
//! The dispatcher writes records into a [`Response`]; every time a message is
//! complete it is handed to a [`ResponseSink`], which the transport implements.
//! Zone transfers produce several messages, everything else exactly one.

use crate::dns::enums::ResponseCode;
use crate::error::Result;
use crate::zone::Record;
use async_trait::async_trait;

/// Upper bound on answer + authority records per transport message
pub const MAX_RECORDS_PER_MESSAGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCode {
    #[default]
    None,
    ServerFailure,
    NameError,
}

impl ErrorCode {
    pub fn rcode(self) -> ResponseCode {
        match self {
            ErrorCode::None => ResponseCode::NoError,
            ErrorCode::ServerFailure => ResponseCode::ServerFailure,
            ErrorCode::NameError => ResponseCode::NameError,
        }
    }
}

/// A record placed in a response section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub owner: String,
    pub record: Record,
    pub ttl: u32,
}

/// One transport message worth of response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMessage {
    pub answers: Vec<ResourceEntry>,
    pub authority: Vec<ResourceEntry>,
    pub error: ErrorCode,
}

impl ResponseMessage {
    pub fn record_count(&self) -> usize {
        self.answers.len() + self.authority.len()
    }
}

/// Destination of finished response messages
#[async_trait]
pub trait ResponseSink: Send {
    async fn send(&mut self, message: ResponseMessage) -> Result<()>;
}

/// Sink that keeps every message in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub messages: Vec<ResponseMessage>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers of all messages, in send order
    pub fn answers(&self) -> Vec<&ResourceEntry> {
        self.messages.iter().flat_map(|m| m.answers.iter()).collect()
    }

    pub fn last(&self) -> Option<&ResponseMessage> {
        self.messages.last()
    }
}

#[async_trait]
impl ResponseSink for CollectingSink {
    async fn send(&mut self, message: ResponseMessage) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}

/// Response under construction for a single query
///
/// `send` and `fail` consume the response, so the final message of a query
/// goes out exactly once.
pub struct Response<'a> {
    sink: &'a mut dyn ResponseSink,
    pending: ResponseMessage,
    flushed: usize,
}

impl<'a> Response<'a> {
    pub fn new(sink: &'a mut dyn ResponseSink) -> Self {
        Self {
            sink,
            pending: ResponseMessage::default(),
            flushed: 0,
        }
    }

    pub fn add_answer(&mut self, owner: impl Into<String>, record: Record, ttl: u32) {
        self.pending.answers.push(ResourceEntry {
            owner: owner.into(),
            record,
            ttl,
        });
    }

    pub fn add_authority(&mut self, owner: impl Into<String>, record: Record, ttl: u32) {
        self.pending.authority.push(ResourceEntry {
            owner: owner.into(),
            record,
            ttl,
        });
    }

    pub fn set_error(&mut self, error: ErrorCode) {
        self.pending.error = error;
    }

    /// Records queued since the last flush
    pub fn pending(&self) -> usize {
        self.pending.record_count()
    }

    /// Messages already handed to the sink
    pub fn flushed(&self) -> usize {
        self.flushed
    }

    /// Queue an answer, flushing first if the current message is full
    pub async fn stream_answer(
        &mut self,
        owner: impl Into<String>,
        record: Record,
        ttl: u32,
    ) -> Result<()> {
        if self.pending() >= MAX_RECORDS_PER_MESSAGE {
            self.flush().await?;
        }
        self.add_answer(owner, record, ttl);
        Ok(())
    }

    /// Send the queued records as one message and start a new one
    pub async fn flush(&mut self) -> Result<()> {
        let error = self.pending.error;
        let message = std::mem::take(&mut self.pending);
        self.pending.error = error;
        self.sink.send(message).await?;
        self.flushed += 1;
        Ok(())
    }

    /// Send the final message
    pub async fn send(mut self) -> Result<()> {
        let message = std::mem::take(&mut self.pending);
        self.sink.send(message).await
    }

    /// Drop anything queued and send a bare error message
    pub async fn fail(mut self, error: ErrorCode) -> Result<()> {
        self.pending = ResponseMessage {
            error,
            ..Default::default()
        };
        self.send().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn a(n: u8) -> Record {
        Record::A(Ipv4Addr::new(10, 0, 0, n))
    }

    #[tokio::test]
    async fn test_single_message() {
        let mut sink = CollectingSink::new();
        let mut response = Response::new(&mut sink);
        response.add_answer("www.example.com", a(1), 60);
        response.add_authority("example.com", Record::NS("ns1.example.com".into()), 3600);
        response.send().await.unwrap();

        assert_eq!(sink.messages.len(), 1);
        assert_eq!(sink.messages[0].answers.len(), 1);
        assert_eq!(sink.messages[0].authority.len(), 1);
        assert_eq!(sink.messages[0].error, ErrorCode::None);
    }

    #[tokio::test]
    async fn test_stream_answer_batches() {
        let mut sink = CollectingSink::new();
        let mut response = Response::new(&mut sink);
        for i in 0..250 {
            response.stream_answer("example.com", a((i % 250) as u8), 60).await.unwrap();
        }
        assert_eq!(response.flushed(), 2);
        assert_eq!(response.pending(), 50);
        response.send().await.unwrap();

        let sizes: Vec<usize> = sink.messages.iter().map(|m| m.record_count()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_exact_multiple_leaves_no_empty_message() {
        let mut sink = CollectingSink::new();
        let mut response = Response::new(&mut sink);
        for i in 0..200 {
            response.stream_answer("example.com", a(i as u8), 60).await.unwrap();
        }
        response.send().await.unwrap();

        let sizes: Vec<usize> = sink.messages.iter().map(|m| m.record_count()).collect();
        assert_eq!(sizes, vec![100, 100]);
    }

    #[tokio::test]
    async fn test_fail_discards_queued_records() {
        let mut sink = CollectingSink::new();
        let mut response = Response::new(&mut sink);
        response.add_answer("example.com", a(1), 60);
        response.fail(ErrorCode::ServerFailure).await.unwrap();

        assert_eq!(sink.messages.len(), 1);
        assert_eq!(sink.messages[0].error, ErrorCode::ServerFailure);
        assert_eq!(sink.messages[0].record_count(), 0);
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(ErrorCode::None.rcode(), ResponseCode::NoError);
        assert_eq!(ErrorCode::ServerFailure.rcode(), ResponseCode::ServerFailure);
        assert_eq!(ErrorCode::NameError.rcode(), ResponseCode::NameError);
    }
}

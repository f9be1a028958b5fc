use crate::{
    dispatcher::QueryDispatcher,
    dns::{
        DNSPacket,
        constants::{MAX_TCP_MESSAGE, MAX_UDP_MESSAGE, MAX_UDP_PAYLOAD},
        enums::ResponseCode,
        header::DNSHeader,
    },
    error::{DnsError, Result},
    query::Query,
    response::{ErrorCode, ResponseMessage, ResponseSink},
};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Run the UDP listener until shutdown
///
/// Each datagram is handled in its own task; every message the dispatcher
/// emits goes back to the source as a separate datagram.
pub async fn run_udp_server(
    sock: Arc<UdpSocket>,
    dispatcher: Arc<QueryDispatcher>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    info!("UDP DNS server listening on {}", sock.local_addr()?);
    let mut buf = vec![0_u8; MAX_UDP_MESSAGE];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("UDP server received shutdown signal");
                break;
            }

            result = sock.recv_from(&mut buf) => {
                let (read_bytes, src_addr) = match result {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("Failed to receive UDP datagram: {}", e);
                        continue;
                    }
                };

                let data = buf[..read_bytes].to_vec();
                let sock = sock.clone();
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    handle_udp_datagram(sock, &dispatcher, &data, src_addr).await;
                });
            }
        }
    }

    Ok(())
}

/// Run the TCP listener until shutdown
pub async fn run_tcp_server(
    listener: TcpListener,
    dispatcher: Arc<QueryDispatcher>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    info!("TCP DNS server listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("TCP server received shutdown signal");
                break;
            }

            result = listener.accept() => {
                let (stream, src_addr) = match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept TCP connection: {}", e);
                        continue;
                    }
                };

                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_tcp_connection(stream, src_addr, &dispatcher).await {
                        warn!("TCP connection error from {}: {}", src_addr, e);
                    }
                });
            }
        }
    }

    Ok(())
}

/// Outcome of decoding a request
enum Request {
    Query(DNSPacket, Query),
    /// Not answerable; send this reply instead
    Reject(Vec<u8>),
    Ignore,
}

fn decode_request(data: &[u8], src_addr: SocketAddr) -> Request {
    let packet = match DNSPacket::parse(data) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("Malformed packet from {}: {}", src_addr, e);
            return match DNSHeader::parse(data) {
                Ok(header) if !header.qr => {
                    let request = DNSPacket {
                        header,
                        ..Default::default()
                    };
                    encode_reject(&request, ResponseCode::FormatError)
                }
                _ => Request::Ignore,
            };
        }
    };

    if packet.header.qr {
        trace!("Ignoring response packet from {}", src_addr);
        return Request::Ignore;
    }

    match Query::from_packet(&packet, src_addr) {
        Ok(query) => Request::Query(packet, query),
        Err(rcode) => {
            debug!("Rejecting packet from {} with {:?}", src_addr, rcode);
            encode_reject(&packet, rcode)
        }
    }
}

fn encode_reject(request: &DNSPacket, rcode: ResponseCode) -> Request {
    match request.error_response(rcode).serialize() {
        Ok(bytes) => Request::Reject(bytes),
        Err(e) => {
            warn!("Failed to serialize {:?} reply: {}", rcode, e);
            Request::Ignore
        }
    }
}

async fn handle_udp_datagram(
    sock: Arc<UdpSocket>,
    dispatcher: &QueryDispatcher,
    data: &[u8],
    src_addr: SocketAddr,
) {
    match decode_request(data, src_addr) {
        Request::Query(request, query) => {
            let mut sink = UdpSink {
                sock,
                peer: src_addr,
                request,
            };
            // Send failures are logged by the dispatcher
            let _ = dispatcher.handle(&query, &mut sink).await;
        }
        Request::Reject(bytes) => {
            if let Err(e) = sock.send_to(&bytes, src_addr).await {
                warn!("Failed to send UDP reply to {}: {}", src_addr, e);
            }
        }
        Request::Ignore => {}
    }
}

async fn handle_tcp_connection(
    mut stream: TcpStream,
    src_addr: SocketAddr,
    dispatcher: &QueryDispatcher,
) -> Result<()> {
    let mut length_buf = [0u8; 2];

    loop {
        match stream.read_exact(&mut length_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("TCP connection closed by client {}", src_addr);
                break;
            }
            Err(e) => return Err(e.into()),
        }

        let message_length = u16::from_be_bytes(length_buf) as usize;
        let mut message_buf = vec![0_u8; message_length];
        stream.read_exact(&mut message_buf).await?;

        match decode_request(&message_buf, src_addr) {
            Request::Query(request, query) => {
                let mut sink = TcpSink {
                    stream: &mut stream,
                    request,
                };
                dispatcher.handle(&query, &mut sink).await?;
            }
            Request::Reject(bytes) => write_frame(&mut stream, &bytes).await?,
            Request::Ignore => {}
        }
    }

    Ok(())
}

/// Wire form of `message` in reply to `request`
///
/// A message that cannot be encoded, or would exceed `max_len`, is replaced
/// by a bare SERVFAIL so the client still gets an answer.
fn encode_message(request: &DNSPacket, message: &ResponseMessage, max_len: usize) -> Result<Vec<u8>> {
    match request.response(message).and_then(|packet| packet.serialize()) {
        Ok(bytes) if bytes.len() <= max_len => return Ok(bytes),
        Ok(bytes) => warn!(
            len = bytes.len(),
            max_len,
            "response too large to send, answering SERVFAIL"
        ),
        Err(e) => warn!(error = %e, "failed to encode response, answering SERVFAIL"),
    }

    let failure = ResponseMessage {
        error: ErrorCode::ServerFailure,
        ..Default::default()
    };
    Ok(request.response(&failure)?.serialize()?)
}

async fn write_frame(stream: &mut TcpStream, data: &[u8]) -> Result<()> {
    let length = u16::try_from(data.len()).map_err(|_| DnsError::MessageTooLarge(data.len()))?;
    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(data).await?;
    stream.flush().await?;
    Ok(())
}

/// Sends each response message as a datagram
struct UdpSink {
    sock: Arc<UdpSocket>,
    peer: SocketAddr,
    request: DNSPacket,
}

#[async_trait]
impl ResponseSink for UdpSink {
    async fn send(&mut self, message: ResponseMessage) -> Result<()> {
        let bytes = encode_message(&self.request, &message, MAX_UDP_PAYLOAD)?;
        self.sock.send_to(&bytes, self.peer).await?;
        Ok(())
    }
}

/// Writes each response message as a length-prefixed frame
struct TcpSink<'a> {
    stream: &'a mut TcpStream,
    request: DNSPacket,
}

#[async_trait]
impl<'a> ResponseSink for TcpSink<'a> {
    async fn send(&mut self, message: ResponseMessage) -> Result<()> {
        let bytes = encode_message(&self.request, &message, MAX_TCP_MESSAGE)?;
        write_frame(self.stream, &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::enums::DNSResourceType;
    use crate::response::ResourceEntry;
    use crate::zone::Record;

    fn request() -> DNSPacket {
        DNSPacket::query(9, "www.example.com", DNSResourceType::A)
    }

    fn message(records: Vec<Record>) -> ResponseMessage {
        ResponseMessage {
            answers: records
                .into_iter()
                .map(|record| ResourceEntry {
                    owner: "www.example.com".to_string(),
                    record,
                    ttl: 60,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_message() {
        let bytes = encode_message(
            &request(),
            &message(vec![Record::A("10.0.0.1".parse().unwrap())]),
            MAX_UDP_PAYLOAD,
        )
        .unwrap();
        let reply = DNSPacket::parse(&bytes).unwrap();
        assert_eq!(reply.header.rcode, 0);
        assert_eq!(reply.answers.len(), 1);
    }

    #[test]
    fn test_unencodable_message_becomes_server_failure() {
        let bad = Record::CNAME(format!("{}.example.net", "a".repeat(64)));
        let bytes = encode_message(
            &request(),
            &message(vec![bad, Record::A("10.0.0.1".parse().unwrap())]),
            MAX_UDP_PAYLOAD,
        )
        .unwrap();
        let reply = DNSPacket::parse(&bytes).unwrap();
        assert_eq!(reply.header.id, 9);
        assert_eq!(reply.header.rcode, 2);
        assert!(reply.answers.is_empty());
        assert_eq!(reply.questions.len(), 1);
    }

    #[test]
    fn test_oversized_message_becomes_server_failure() {
        let records = vec![Record::TXT("t".repeat(60_000)); 2];
        let bytes = encode_message(&request(), &message(records), MAX_TCP_MESSAGE).unwrap();
        let reply = DNSPacket::parse(&bytes).unwrap();
        assert_eq!(reply.header.rcode, 2);
        assert!(reply.answers.is_empty());
    }
}

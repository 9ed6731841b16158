//! UDP implementation of the registry channel

use crate::config::ServerConfig;
use crate::protocol::MAX_PACKET_SIZE;
use crate::protocol::messages::Reply;
use crate::protocol::messages::command::with_session;
use crate::protocol::transport::{RegistryChannel, TransportError, mask_secrets};
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};

/// One authenticated session over a connected UDP socket
///
/// Every command carries a `tag=` parameter that the registry echoes in front
/// of the reply code. A reply that arrives after its command timed out still
/// sits in the socket queue; its tag no longer matches and it is discarded.
pub struct UdpChannel {
    socket: UdpSocket,
    session: String,
    reply_timeout: Duration,
    next_tag: AtomicU32,
}

impl fmt::Debug for UdpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpChannel")
            .field("peer", &self.socket.peer_addr().ok())
            .field("session", &"****")
            .field("reply_timeout", &self.reply_timeout)
            .finish()
    }
}

impl UdpChannel {
    /// Bind locally and connect to the configured server
    pub async fn connect(
        config: &ServerConfig,
        session: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let server = tokio::net::lookup_host((config.host.as_str(), config.port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no address for {}", config.host),
                )
            })?;
        Self::connect_addr(server, config.local_port, config.request_timeout(), session).await
    }

    /// Connect to an already resolved server address
    pub async fn connect_addr(
        server: SocketAddr,
        local_port: u16,
        reply_timeout: Duration,
        session: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let bind: SocketAddr = if server.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, local_port).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, local_port).into()
        };

        let socket = UdpSocket::bind(bind).await?;
        socket.connect(server).await?;
        debug!(
            "Registry channel bound to {} and connected to {server}",
            socket.local_addr()?
        );

        Ok(Self {
            socket,
            session: session.into(),
            reply_timeout,
            next_tag: AtomicU32::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl RegistryChannel for UdpChannel {
    async fn send(&self, wire: &str) -> Result<Reply, TransportError> {
        let tag = format!("T{}", self.next_tag.fetch_add(1, Ordering::Relaxed));
        let packet = format!("{}&tag={tag}", with_session(wire, &self.session));
        if packet.len() > MAX_PACKET_SIZE {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("command is {} bytes, limit is {MAX_PACKET_SIZE}", packet.len()),
            )));
        }

        trace!("-> {}", mask_secrets(&packet));
        self.socket.send(packet.as_bytes()).await?;

        let deadline = Instant::now() + self.reply_timeout;
        let mut buffer = vec![0u8; MAX_PACKET_SIZE];
        loop {
            let size = timeout_at(deadline, self.socket.recv(&mut buffer))
                .await
                .map_err(|_| TransportError::Timeout(self.reply_timeout))??;
            let data = &buffer[..size];

            if data.iter().all(|byte| *byte == 0) {
                warn!("Registry replied with {size} zero bytes");
                return Err(TransportError::SilentDrop);
            }

            let text = std::str::from_utf8(data).map_err(invalid_data)?;
            trace!("<- {}", text.trim_end());

            match strip_tag(text, &tag) {
                Tagged::Matching(reply) | Tagged::Untagged(reply) => {
                    return Reply::parse(reply).map_err(invalid_data);
                }
                Tagged::Stale(other) => {
                    debug!("Discarding late reply tagged {other} while waiting for {tag}");
                }
            }
        }
    }
}

enum Tagged<'a> {
    Matching(&'a str),
    Untagged(&'a str),
    Stale(&'a str),
}

/// Split the echoed tag off a reply
///
/// Server-level errors may come back without a tag; a reply code is always
/// numeric, so a numeric first token means no tag.
fn strip_tag<'a>(text: &'a str, tag: &str) -> Tagged<'a> {
    let first = text
        .split(['\n', ' '])
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r');
    if first.is_empty() || first.bytes().all(|byte| byte.is_ascii_digit()) {
        Tagged::Untagged(text)
    } else if first == tag {
        Tagged::Matching(text[tag.len()..].trim_start_matches(' '))
    } else {
        Tagged::Stale(first)
    }
}

fn invalid_data<E>(err: E) -> TransportError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error::ReplyCode;
    use std::net::Ipv4Addr;

    async fn fake_server() -> Option<UdpSocket> {
        UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.ok()
    }

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        let Some(server) = fake_server().await else {
            eprintln!("Skipping test_round_trip_over_loopback: cannot bind in sandbox");
            return;
        };
        let server_addr = server.local_addr().unwrap();

        let channel = match UdpChannel::connect_addr(
            server_addr,
            0,
            Duration::from_secs(5),
            "abc12",
        )
        .await
        {
            Ok(channel) => channel,
            Err(e) => {
                eprintln!("Skipping test_round_trip_over_loopback: {e}");
                return;
            }
        };

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 1400];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            let received = String::from_utf8_lossy(&buf[..n]).to_string();
            server
                .send_to(b"345 NO SUCH CREATOR\n", peer)
                .await
                .unwrap();
            received
        });

        let reply = channel.send("CREATOR creatorid=1").await.unwrap();
        assert_eq!(reply.code, ReplyCode::NO_SUCH_CREATOR);
        assert_eq!(responder.await.unwrap(), "CREATOR creatorid=1&s=abc12&tag=T1");
    }

    #[tokio::test]
    async fn test_zero_reply_is_silent_drop() {
        let Some(server) = fake_server().await else {
            return;
        };
        let server_addr = server.local_addr().unwrap();
        let Ok(channel) =
            UdpChannel::connect_addr(server_addr, 0, Duration::from_secs(5), "abc12").await
        else {
            return;
        };

        tokio::spawn(async move {
            let mut buf = [0u8; 1400];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&[0u8; 4], peer).await.unwrap();
        });

        let result = channel.send("CALENDAR").await;
        assert!(matches!(result, Err(TransportError::SilentDrop)));
    }

    #[tokio::test]
    async fn test_no_reply_times_out() {
        let Some(server) = fake_server().await else {
            return;
        };
        let server_addr = server.local_addr().unwrap();
        let Ok(channel) =
            UdpChannel::connect_addr(server_addr, 0, Duration::from_millis(50), "abc12").await
        else {
            return;
        };

        let result = channel.send("CALENDAR").await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
        drop(server);
    }

    #[tokio::test]
    async fn test_late_reply_is_not_taken_for_the_next_one() {
        let Some(server) = fake_server().await else {
            return;
        };
        let server_addr = server.local_addr().unwrap();
        let Ok(channel) =
            UdpChannel::connect_addr(server_addr, 0, Duration::from_millis(100), "abc12").await
        else {
            return;
        };

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 1400];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            let first = String::from_utf8_lossy(&buf[..n]).to_string();
            let (_, tag) = first.rsplit_once("tag=").unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            let late = format!("{tag} 245 CREATOR\n718|Kamiya Hiroshi|1|x|y|z|w\n");
            server.send_to(late.as_bytes(), peer).await.unwrap();

            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            let second = String::from_utf8_lossy(&buf[..n]).to_string();
            let (_, tag) = second.rsplit_once("tag=").unwrap();
            let reply = format!("{tag} 297 CALENDAR\n6622|1251417600|0\n");
            server.send_to(reply.as_bytes(), peer).await.unwrap();
        });

        let first = channel.send("CREATOR creatorid=718").await;
        assert!(matches!(first, Err(TransportError::Timeout(_))));

        let second = channel.send("CALENDAR").await.unwrap();
        assert_eq!(second.code, ReplyCode::CALENDAR);
        assert_eq!(second.body, "6622|1251417600|0");
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_utf8_reply_is_rejected() {
        let Some(server) = fake_server().await else {
            return;
        };
        let server_addr = server.local_addr().unwrap();
        let Ok(channel) =
            UdpChannel::connect_addr(server_addr, 0, Duration::from_secs(5), "abc12").await
        else {
            return;
        };

        tokio::spawn(async move {
            let mut buf = [0u8; 1400];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(b"T1 245 CREATOR\n718|\xff\xfe\n", peer).await.unwrap();
        });

        let result = channel.send("CREATOR creatorid=718").await;
        let err = match result {
            Err(TransportError::Io(err)) => err,
            other => panic!("expected an I/O error, got {other:?}"),
        };
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_strip_tag() {
        assert!(matches!(
            strip_tag("T4 345 NO SUCH CREATOR", "T4"),
            Tagged::Matching("345 NO SUCH CREATOR")
        ));
        assert!(matches!(
            strip_tag("555 BANNED\nleech", "T4"),
            Tagged::Untagged(_)
        ));
        assert!(matches!(
            strip_tag("T3 245 CREATOR\n1", "T4"),
            Tagged::Stale("T3")
        ));
        assert!(matches!(strip_tag("598\nUNKNOWN COMMAND", "T4"), Tagged::Untagged(_)));
    }
}

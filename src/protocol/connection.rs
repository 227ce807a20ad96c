//! TCP peer connection with handshake gating and message framing
//!
//! Owns the framing layer the codec deliberately excludes: every
//! non-handshake message travels behind a 4-byte big-endian length prefix,
//! and the codec only ever sees the delimited region behind it.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::ProtocolError;
use super::handshake::{BASE_HANDSHAKE_LENGTH, HandshakeCodec, PROTOCOL_IDENTIFIER};
use super::messages::MessageCodec;
use super::types::{PeerHandshake, PeerMessage, PeerProtocol, PeerState};

/// Largest message frame accepted from a peer. Bounds allocation against a
/// malicious length prefix; the largest legitimate message is a piece block
/// plus its header.
const MAX_FRAME_LENGTH: u32 = 2 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// TCP implementation of the BitTorrent wire protocol.
///
/// The handshake exchange gates all further traffic: a handshake that fails
/// to decode, or that names a different torrent, drops this connection
/// without affecting any other peer.
#[derive(Default)]
pub struct TcpPeerConnection {
    state: PeerState,
    peer_address: Option<SocketAddr>,
    stream: Option<TcpStream>,
}

impl TcpPeerConnection {
    /// Creates new connection in disconnected state.
    pub fn new() -> Self {
        Self {
            state: PeerState::Disconnected,
            peer_address: None,
            stream: None,
        }
    }

    fn drop_connection(&mut self) {
        self.stream = None;
        self.state = PeerState::Disconnected;
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, ProtocolError> {
        self.stream.as_mut().ok_or(ProtocolError::Connection {
            reason: "not connected to peer".to_string(),
        })
    }
}

#[async_trait]
impl PeerProtocol for TcpPeerConnection {
    async fn connect(
        &mut self,
        address: SocketAddr,
        handshake: PeerHandshake,
    ) -> Result<(), ProtocolError> {
        self.state = PeerState::Connecting;
        self.peer_address = Some(address);

        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(_)) | Err(_) => {
                self.drop_connection();
                self.peer_address = None;
                return Err(ProtocolError::Connection {
                    reason: format!("failed to connect to {address}"),
                });
            }
        };

        self.stream = Some(stream);
        self.state = PeerState::Handshaking;

        let handshake_data = HandshakeCodec::serialize_handshake(&handshake);
        if let Some(ref mut stream) = self.stream
            && stream.write_all(&handshake_data).await.is_err()
        {
            self.drop_connection();
            return Err(ProtocolError::Connection {
                reason: "failed to send handshake".to_string(),
            });
        }

        // Canonical identifier length is assumed for the inbound side too.
        let mut handshake_buffer = vec![0u8; BASE_HANDSHAKE_LENGTH + PROTOCOL_IDENTIFIER.len()];
        if let Some(ref mut stream) = self.stream
            && stream.read_exact(&mut handshake_buffer).await.is_err()
        {
            self.drop_connection();
            return Err(ProtocolError::Connection {
                reason: "failed to read handshake response".to_string(),
            });
        }

        let peer_handshake = match HandshakeCodec::deserialize_handshake(&handshake_buffer) {
            Ok(peer_handshake) => peer_handshake,
            Err(e) => {
                // A corrupted handshake makes the connection unusable.
                self.drop_connection();
                return Err(e);
            }
        };

        if peer_handshake.info_hash != handshake.info_hash {
            self.drop_connection();
            return Err(ProtocolError::InfoHashMismatch);
        }

        tracing::debug!(
            "Handshake complete with {} (peer id {})",
            address,
            hex::encode(peer_handshake.peer_id.as_bytes())
        );
        self.state = PeerState::Connected;
        Ok(())
    }

    async fn send_message(&mut self, message: PeerMessage) -> Result<(), ProtocolError> {
        if self.state != PeerState::Connected {
            return Err(ProtocolError::Connection {
                reason: "not connected to peer".to_string(),
            });
        }

        let region = MessageCodec::serialize_message(&message);
        let mut frame = Vec::with_capacity(4 + region.len());
        frame.extend_from_slice(&(region.len() as u32).to_be_bytes());
        frame.extend_from_slice(&region);

        let stream = self.stream_mut()?;
        if stream.write_all(&frame).await.is_err() {
            self.drop_connection();
            return Err(ProtocolError::Connection {
                reason: "failed to send message".to_string(),
            });
        }

        Ok(())
    }

    async fn receive_message(&mut self) -> Result<PeerMessage, ProtocolError> {
        if self.state != PeerState::Connected {
            return Err(ProtocolError::Connection {
                reason: "not connected to peer".to_string(),
            });
        }

        let mut length_buf = [0u8; 4];
        let stream = self.stream_mut()?;
        if stream.read_exact(&mut length_buf).await.is_err() {
            self.drop_connection();
            return Err(ProtocolError::Connection {
                reason: "failed to read message length".to_string(),
            });
        }

        let length = u32::from_be_bytes(length_buf);
        if length > MAX_FRAME_LENGTH {
            self.drop_connection();
            return Err(ProtocolError::FrameTooLarge {
                length,
                max: MAX_FRAME_LENGTH,
            });
        }

        let mut region = vec![0u8; length as usize];
        let stream = self.stream_mut()?;
        if stream.read_exact(&mut region).await.is_err() {
            self.drop_connection();
            return Err(ProtocolError::Connection {
                reason: "failed to read message payload".to_string(),
            });
        }

        MessageCodec::deserialize_message(&region)
    }

    fn peer_state(&self) -> PeerState {
        self.state
    }

    fn peer_address(&self) -> Option<SocketAddr> {
        self.peer_address
    }

    async fn disconnect(&mut self) -> Result<(), ProtocolError> {
        if let Some(stream) = self.stream.take() {
            drop(stream); // Close the TCP connection
        }
        self.state = PeerState::Disconnected;
        self.peer_address = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;

    use super::*;
    use crate::InfoHash;
    use crate::protocol::types::PeerId;

    async fn spawn_peer(
        info_hash: InfoHash,
        respond_with: Option<Vec<u8>>,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut inbound = vec![0u8; 68];
            socket.read_exact(&mut inbound).await.unwrap();

            let response = respond_with.unwrap_or_else(|| {
                let handshake = PeerHandshake::new(info_hash, PeerId::new([9u8; 20]));
                HandshakeCodec::serialize_handshake(&handshake)
            });
            socket.write_all(&response).await.unwrap();

            // Keep the socket open long enough for the client to finish.
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        (address, handle)
    }

    #[tokio::test]
    async fn test_connect_performs_handshake_exchange() {
        let info_hash = InfoHash::new([1u8; 20]);
        let (address, server) = spawn_peer(info_hash, None).await;

        let mut connection = TcpPeerConnection::new();
        let handshake = PeerHandshake::new(info_hash, PeerId::generate());
        tokio_test::assert_ok!(connection.connect(address, handshake).await);

        assert_eq!(connection.peer_state(), PeerState::Connected);
        assert_eq!(connection.peer_address(), Some(address));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_info_hash_mismatch_terminates_connection() {
        let ours = InfoHash::new([1u8; 20]);
        let theirs = InfoHash::new([2u8; 20]);
        let (address, _server) = spawn_peer(theirs, None).await;

        let mut connection = TcpPeerConnection::new();
        let handshake = PeerHandshake::new(ours, PeerId::generate());
        let result = connection.connect(address, handshake).await;

        assert!(matches!(result, Err(ProtocolError::InfoHashMismatch)));
        assert_eq!(connection.peer_state(), PeerState::Disconnected);
    }

    #[tokio::test]
    async fn test_corrupted_handshake_terminates_connection() {
        let info_hash = InfoHash::new([1u8; 20]);
        let (address, _server) = spawn_peer(info_hash, Some(vec![0xFF; 68])).await;

        let mut connection = TcpPeerConnection::new();
        let handshake = PeerHandshake::new(info_hash, PeerId::generate());
        let result = connection.connect(address, handshake).await;

        assert!(result.is_err());
        assert_eq!(connection.peer_state(), PeerState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected() {
        let mut connection = TcpPeerConnection::new();
        assert!(connection.disconnect().await.is_ok());
        assert_eq!(connection.peer_state(), PeerState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let mut connection = TcpPeerConnection::new();
        let result = connection.send_message(PeerMessage::Interested).await;
        assert!(matches!(result, Err(ProtocolError::Connection { .. })));
    }
}

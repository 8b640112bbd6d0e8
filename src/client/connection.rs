// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transport multiplexer: one TCP stream carrying RTSP text and
//! `$`-framed binary RTP/RTCP ([RFC 2326 section
//! 10.12](https://datatracker.ietf.org/doc/html/rfc2326#section-10.12)),
//! plus UDP socket pairs for sessions negotiated onto UDP.

use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use super::message::Response;
use crate::Error;

/// Default deadline applied to connect and write operations.
pub(crate) const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// One binary frame: an interleaved channel (or UDP sink index) and its
/// packet bytes. Even channels carry RTP data, odd ones RTCP control.
#[derive(Clone, Debug)]
pub struct ChannelData {
    pub channel: u8,
    pub payload: Bytes,
}

/// What the demultiplexer hands the session driver.
#[derive(Debug)]
pub(crate) enum ReceivedMessage {
    Response(Response),
    Data(ChannelData),
}

/// An RTSP connection which implements `Stream` of [`ReceivedMessage`]s
/// via [`Framed`].
pub(crate) struct Connection(Framed<TcpStream, Codec>);

impl Connection {
    pub(crate) async fn connect(host: &str, port: u16) -> Result<Self, Error> {
        let stream = tokio::time::timeout(IO_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Error::Connect)?;
        Ok(Connection(Framed::new(stream, Codec)))
    }

    /// Writes one packed request, bounded by the I/O deadline.
    pub(crate) async fn send(&mut self, buf: Bytes) -> Result<(), Error> {
        tokio::time::timeout(IO_TIMEOUT, self.0.send(buf))
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Reads the next response or interleaved frame. `None` means the
    /// server closed the connection.
    pub(crate) async fn next(&mut self) -> Option<Result<ReceivedMessage, Error>> {
        self.0.next().await
    }
}

/// Decodes the two interleaved wire shapes and encodes packed requests.
///
/// The first byte decides: `$` starts a `{channel, u16 length, payload}`
/// binary frame, anything else an RTSP response parsed line-based.
pub(crate) struct Codec;

impl tokio_util::codec::Decoder for Codec {
    type Item = ReceivedMessage;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Tolerate stray blank lines between messages.
        while src.starts_with(b"\r\n") {
            src.advance(2);
        }
        if src.is_empty() {
            return Ok(None);
        }
        if src[0] == b'$' {
            if src.len() < 4 {
                return Ok(None);
            }
            let channel = src[1];
            let len = 4 + usize::from(u16::from_be_bytes([src[2], src[3]]));
            if src.len() < len {
                src.reserve(len - src.len());
                return Ok(None);
            }
            let mut frame = src.split_to(len);
            frame.advance(4);
            return Ok(Some(ReceivedMessage::Data(ChannelData {
                channel,
                payload: frame.freeze(),
            })));
        }
        match Response::parse(src) {
            Ok(Some(rsp)) => Ok(Some(ReceivedMessage::Response(rsp))),
            Ok(None) => Ok(None),
            Err(e) => {
                debug!(
                    "RTSP framing error; buffered:\n{:?}",
                    crate::hex::LimitedHex::new(&src[..], 128)
                );
                Err(e)
            }
        }
    }
}

impl tokio_util::codec::Encoder<Bytes> for Codec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}

/// UDP listeners for sessions negotiated onto UDP: one socket pair per
/// feed, two per [`SinkSet::bind_pair`] call. Sockets are bound at SETUP
/// time and start forwarding once the whole session is ready.
#[derive(Default)]
pub(crate) struct SinkSet {
    sinks: Vec<(u8, UdpSocket)>,
    tasks: Vec<JoinHandle<()>>,
}

impl SinkSet {
    /// Binds the data/control sockets for one feed at the given ports,
    /// indexed by the feed's channel pair.
    pub(crate) fn bind_pair(&mut self, channel: u8, ports: (u16, u16)) -> Result<(), Error> {
        for (ch, port) in [(channel, ports.0), (channel + 1, ports.1)] {
            let socket = std::net::UdpSocket::bind(("0.0.0.0", port))?;
            socket.set_nonblocking(true)?;
            self.sinks.push((ch, UdpSocket::from_std(socket)?));
        }
        Ok(())
    }

    /// Starts one forwarding task per bound socket; packets flow onto the
    /// data or control queue by channel parity.
    pub(crate) fn start(
        &mut self,
        data: mpsc::Sender<ChannelData>,
        control: mpsc::Sender<ChannelData>,
    ) {
        for (channel, socket) in self.sinks.drain(..) {
            let tx = if channel % 2 == 0 {
                data.clone()
            } else {
                control.clone()
            };
            self.tasks.push(tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                loop {
                    let n = match socket.recv(&mut buf).await {
                        Ok(n) => n,
                        Err(e) => {
                            warn!("UDP sink {} closed: {}", channel, e);
                            return;
                        }
                    };
                    let frame = ChannelData {
                        channel,
                        payload: Bytes::copy_from_slice(&buf[..n]),
                    };
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
            }));
        }
    }

    /// Stops the forwarding tasks and drops any still-unstarted sockets.
    pub(crate) fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.sinks.clear();
    }

    /// Actual ports of the bound-but-unstarted sockets.
    #[cfg(test)]
    fn local_ports(&self) -> Vec<u16> {
        self.sinks
            .iter()
            .map(|(_, socket)| socket.local_addr().expect("socket is bound").port())
            .collect()
    }
}

impl Drop for SinkSet {
    fn drop(&mut self) {
        self.stop();
    }
}

// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// All failure modes surfaced by this crate.
///
/// Packet-level kinds (`PacketTooShort`, `InvalidVersion`, `EndOfStream`,
/// `MissingTrailingBits`) are reported to the consumer and the offending
/// packet is dropped; they never tear the session down. Kinds produced by
/// RTSP framing, response handling, or authentication are fatal: the session
/// transitions to [`crate::client::Stage::Done`] and its workers exit.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("missing or malformed status code")]
    InvalidStatus,

    #[error("unsupported protocol version")]
    UnsupportedProtocol,

    #[error("resource URL has no credentials to answer an authentication challenge")]
    NoCredentials,

    #[error("unexpected response with CSeq {0}")]
    UnexpectedResponse(u32),

    #[error("network timeout")]
    Timeout,

    #[error("connection to RTSP source is required")]
    ConnectionRequired,

    #[error("packet is too short")]
    PacketTooShort,

    #[error("invalid packet version")]
    InvalidVersion,

    #[error("RBSP is missing trailing stop and alignment bits")]
    MissingTrailingBits,

    #[error("read past the end of the bit stream")]
    EndOfStream,

    #[error("malformed authentication challenge")]
    MalformedChallenge,

    #[error("authentication method not implemented: {0}")]
    AuthNotImplemented(String),

    #[error("malformed Transport header")]
    MalformedTransport,

    #[error("unable to connect to RTSP server: {0}")]
    Connect(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

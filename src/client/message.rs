// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTSP 1.0 message framing: request formatting and response parsing, per
//! [RFC 2326](https://datatracker.ietf.org/doc/html/rfc2326) as interpreted
//! by the cameras this crate talks to.

use std::collections::HashMap;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, USER_AGENT};

/// RTSP request methods (RFC 2326 section 10).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Describe,
    Announce,
    GetParameter,
    Options,
    Pause,
    Play,
    Record,
    Redirect,
    Setup,
    SetParameter,
    Teardown,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Describe => "DESCRIBE",
            Verb::Announce => "ANNOUNCE",
            Verb::GetParameter => "GET_PARAMETER",
            Verb::Options => "OPTIONS",
            Verb::Pause => "PAUSE",
            Verb::Play => "PLAY",
            Verb::Record => "RECORD",
            Verb::Redirect => "REDIRECT",
            Verb::Setup => "SETUP",
            Verb::SetParameter => "SET_PARAMETER",
            Verb::Teardown => "TEARDOWN",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Well-known status codes the state machine dispatches on.
pub const STATUS_OK: u16 = 200;
pub const STATUS_UNAUTHORIZED: u16 = 401;

/// A header map with canonical MIME casing on insert and lookup, so
/// `cseq`, `CSeq`, and `CSEQ` all land on the same entry.
#[derive(Clone, Debug, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Headers::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(canonical_key(key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&canonical_key(key)).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Uppercases the first letter of each dash-separated token and lowercases
/// the rest, matching the usual MIME header convention.
fn canonical_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = true;
    for c in key.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// An outgoing RTSP request. Held in the pending queue under its CSeq
/// until the matching response arrives (or re-sent verbatim on a 401).
#[derive(Clone, Debug)]
pub struct Request {
    pub verb: Verb,
    pub uri: String,
    pub cseq: u32,
    /// Session cookie; empty until the server hands one out.
    pub session: String,
    /// Computed `Authorization` value, if authentication is active.
    pub auth: Option<String>,
    pub headers: Headers,
}

impl Request {
    pub fn new(verb: Verb, uri: impl Into<String>) -> Request {
        Request {
            verb,
            uri: uri.into(),
            cseq: 0,
            session: String::new(),
            auth: None,
            headers: Headers::new(),
        }
    }

    /// Formats the request for the wire.
    ///
    /// The `Session` header is attached for every verb except `OPTIONS` and
    /// `SETUP` (callers that want it on a keep-alive `OPTIONS` pass it as an
    /// explicit header). Client requests never carry a body, so
    /// `Content-Length` is always zero.
    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);
        buf.put_slice(self.verb.as_str().as_bytes());
        buf.put_u8(b' ');
        buf.put_slice(self.uri.as_bytes());
        buf.put_slice(b" RTSP/1.0\r\n");
        buf.put_slice(format!("CSeq: {}\r\n", self.cseq).as_bytes());
        for (key, value) in self.headers.iter() {
            buf.put_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }
        if !self.session.is_empty() && self.verb != Verb::Options && self.verb != Verb::Setup {
            buf.put_slice(format!("Session: {}\r\n", self.session).as_bytes());
        }
        if let Some(auth) = &self.auth {
            buf.put_slice(format!("Authorization: {}\r\n", auth).as_bytes());
        }
        buf.put_slice(format!("User-Agent: {}\r\n", USER_AGENT).as_bytes());
        buf.put_slice(b"Content-Length: 0\r\n\r\n");
        buf.freeze()
    }
}

/// A parsed RTSP response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub cseq: Option<u32>,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    /// Parses one response from the front of `src`, consuming it.
    ///
    /// Returns `Ok(None)` when `src` does not yet hold a complete message
    /// (headers plus `Content-Length` bytes of body); the caller reads more
    /// and retries.
    pub fn parse(src: &mut BytesMut) -> Result<Option<Response>, Error> {
        let Some(header_len) = find_header_end(src) else {
            return Ok(None);
        };
        // The header block is parsed in place so an incomplete body leaves
        // `src` untouched.
        let text = std::str::from_utf8(&src[..header_len])
            .map_err(|_| Error::MalformedResponse("header block is not UTF-8".into()))?;
        let mut lines = text.split("\r\n");
        let status_line = lines.next().unwrap_or("");
        let (proto, rest) = status_line
            .split_once(' ')
            .ok_or_else(|| Error::MalformedResponse(format!("bad status line {:?}", status_line)))?;
        if proto != "RTSP/1.0" {
            return Err(Error::UnsupportedProtocol);
        }
        let reason = rest.trim();
        let code = reason.split(' ').next().unwrap_or("");
        if code.len() != 3 {
            return Err(Error::InvalidStatus);
        }
        let status: u16 = code.parse().map_err(|_| Error::InvalidStatus)?;

        let mut headers = Headers::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| Error::MalformedResponse(format!("bad header line {:?}", line)))?;
            headers.set(key.trim(), value.trim());
        }

        let content_length = headers
            .get("Content-Length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        if src.len() < header_len + 4 + content_length {
            return Ok(None);
        }
        let reason = reason.to_owned();
        let cseq = headers.get("CSeq").and_then(|v| v.trim().parse().ok());
        let _ = src.split_to(header_len + 4);
        let body = src.split_to(content_length).freeze();
        Ok(Some(Response {
            status,
            reason,
            cseq,
            headers,
            body,
        }))
    }
}

/// Index of the `\r\n\r\n` header terminator, if present.
fn find_header_end(src: &[u8]) -> Option<usize> {
    src.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_options() {
        let mut req = Request::new(Verb::Options, "rtsp://cam.example/stream");
        req.cseq = 3;
        req.session = "12345".into();
        let packed = req.pack();
        let text = std::str::from_utf8(&packed).unwrap();
        assert!(text.starts_with("OPTIONS rtsp://cam.example/stream RTSP/1.0\r\n"));
        assert!(text.contains("CSeq: 3\r\n"));
        // OPTIONS never carries the session field implicitly.
        assert!(!text.contains("Session:"));
        assert!(text.contains("User-Agent: Vigil/1.0\r\n"));
        assert!(text.ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[test]
    fn pack_play_with_session_and_auth() {
        let mut req = Request::new(Verb::Play, "rtsp://cam.example/stream");
        req.cseq = 7;
        req.session = "ABCDEF".into();
        req.auth = Some("Basic dXNlcjpwdw==".into());
        let text = String::from_utf8(req.pack().to_vec()).unwrap();
        assert!(text.contains("Session: ABCDEF\r\n"));
        assert!(text.contains("Authorization: Basic dXNlcjpwdw==\r\n"));
    }

    #[test]
    fn pack_extra_headers() {
        let mut req = Request::new(Verb::Describe, "rtsp://cam.example/stream");
        req.headers.set("accept", "application/sdp");
        let text = String::from_utf8(req.pack().to_vec()).unwrap();
        assert!(text.contains("Accept: application/sdp\r\n"));
    }

    #[test]
    fn canonical_casing() {
        let mut h = Headers::new();
        h.set("content-length", "42");
        assert_eq!(h.get("CONTENT-LENGTH"), Some("42"));
        assert_eq!(canonical_key("www-authenticate"), "Www-Authenticate");
    }

    #[test]
    fn parse_incrementally() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"RTSP/1.0 200 OK\r\nCSeq: 2\r\n");
        assert!(Response::parse(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"Content-Length: 4\r\n\r\n");
        // Headers complete, body still missing.
        assert!(Response::parse(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"abcdREST");
        let rsp = Response::parse(&mut buf).unwrap().unwrap();
        assert_eq!(rsp.status, 200);
        assert_eq!(rsp.reason, "200 OK");
        assert_eq!(rsp.cseq, Some(2));
        assert_eq!(&rsp.body[..], b"abcd");
        assert_eq!(&buf[..], b"REST");
    }

    #[test]
    fn parse_without_body() {
        let mut buf = BytesMut::from(
            &b"RTSP/1.0 454 Session Not Found\r\nCSeq: 5\r\nServer: test\r\n\r\n"[..],
        );
        let rsp = Response::parse(&mut buf).unwrap().unwrap();
        assert_eq!(rsp.status, 454);
        assert_eq!(rsp.headers.get("Server"), Some("test"));
        assert!(rsp.body.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_http() {
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\n\r\n"[..]);
        assert!(matches!(
            Response::parse(&mut buf),
            Err(Error::UnsupportedProtocol)
        ));
    }

    #[test]
    fn rejects_bad_status() {
        let mut buf = BytesMut::from(&b"RTSP/1.0 2x0 OK\r\n\r\n"[..]);
        assert!(matches!(Response::parse(&mut buf), Err(Error::InvalidStatus)));
        let mut buf = BytesMut::from(&b"RTSP/1.0 20 OK\r\n\r\n"[..]);
        assert!(matches!(Response::parse(&mut buf), Err(Error::InvalidStatus)));
    }
}

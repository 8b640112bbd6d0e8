// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTSP `Transport` header parsing and formatting
//! ([RFC 2326 section 12.39](https://datatracker.ietf.org/doc/html/rfc2326#section-12.39)).
//!
//! Three lower transports are negotiated:
//! * TCP: RTP/RTCP interleaved into the RTSP stream on channel pair
//!   `(2i, 2i+1)` for feed index `i`;
//! * unicast UDP: one socket pair per feed, advertised via `client_port`;
//! * multicast UDP: the server picks the group, `port` carries the pair.

use std::fmt;

use crate::Error;

/// Requested lower transport for a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Unicast,
    Multicast,
}

/// A channel or port pair; data on the even one, control on the odd.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Pair {
    pub one: u16,
    pub two: u16,
}

impl Pair {
    /// Parses `n` or `n-m`; a missing or malformed second number defaults
    /// to `n + 1`.
    fn parse(value: &str) -> Result<Pair, Error> {
        let (first, second) = match value.split_once('-') {
            Some((first, second)) => (first, Some(second)),
            None => (value, None),
        };
        let one: u16 = first.trim().parse().map_err(|_| Error::MalformedTransport)?;
        let two = second
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(one + 1);
        Ok(Pair { one, two })
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.one, self.two)
    }
}

/// Parsed or to-be-formatted contents of a `Transport` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transport {
    pub is_tcp: bool,
    pub is_multicast: bool,
    pub is_interleaved: bool,
    pub is_append: bool,
    pub interleave: Pair,
    pub port: Pair,
    pub client_port: Pair,
    pub server_port: Pair,
    pub layers: u32,
    pub ttl: u32,
    pub destination: String,
    pub source: String,
    pub ssrc: String,
    pub mode: String,
}

impl Transport {
    /// The client-desired transport for feed index `i`, whose channel or
    /// port pair is `(2i, 2i+1)`.
    pub fn new(proto: Proto, channel: u16) -> Transport {
        let pair = Pair {
            one: channel,
            two: channel + 1,
        };
        let mut t = Transport {
            mode: "PLAY".to_owned(),
            ..Transport::default()
        };
        match proto {
            Proto::Tcp => {
                t.is_tcp = true;
                t.is_interleaved = true;
                t.interleave = pair;
            }
            Proto::Unicast => t.client_port = pair,
            Proto::Multicast => {
                t.is_multicast = true;
                t.port = pair;
            }
        }
        t
    }

    /// Merges a semicolon-delimited header value into `self` (the fields a
    /// server echoes back refine the client's request).
    pub fn parse(&mut self, value: &str) -> Result<(), Error> {
        for field in value.split(';') {
            let field = field.trim();
            // The transport-spec token is RTP/AVP, RTP/AVP/TCP, or
            // RTP/AVP/UDP; only a third part names the lower transport.
            let slashed: Vec<&str> = field.split('/').collect();
            if slashed.len() == 3 {
                self.is_tcp = slashed[2].eq_ignore_ascii_case("tcp");
            }
            let (key, val) = match field.split_once('=') {
                Some((key, val)) => (key, Some(val)),
                None => (field, None),
            };
            let require = || val.ok_or(Error::MalformedTransport);
            match key.to_ascii_lowercase().as_str() {
                "unicast" => self.is_multicast = false,
                "multicast" => self.is_multicast = true,
                "append" => self.is_append = true,
                "destination" => self.destination = require()?.to_owned(),
                "source" => self.source = require()?.to_owned(),
                "ssrc" => self.ssrc = require()?.to_owned(),
                "mode" => self.mode = require()?.trim_matches('"').to_owned(),
                "interleaved" => {
                    self.is_multicast = false;
                    self.is_interleaved = true;
                    self.interleave = Pair::parse(require()?)?;
                }
                "port" => self.port = Pair::parse(require()?)?,
                "client_port" => self.client_port = Pair::parse(require()?)?,
                "server_port" => self.server_port = Pair::parse(require()?)?,
                "ttl" => self.ttl = require()?.parse().map_err(|_| Error::MalformedTransport)?,
                "layers" => {
                    self.layers = require()?.parse().map_err(|_| Error::MalformedTransport)?
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for Transport {
    /// Formats the header value, emitting only fields that are set.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RTP/AVP")?;
        if self.is_tcp {
            f.write_str("/TCP")?;
        } else if self.is_multicast {
            f.write_str(";multicast")?;
        } else {
            f.write_str(";unicast")?;
        }
        if !self.destination.is_empty() {
            write!(f, ";destination={}", self.destination)?;
        }
        if !self.source.is_empty() {
            write!(f, ";source={}", self.source)?;
        }
        if self.is_interleaved {
            write!(f, ";interleaved={}", self.interleave)?;
        }
        if self.is_append {
            f.write_str(";append")?;
        }
        if self.port.one > 0 {
            write!(f, ";port={}", self.port)?;
        }
        if self.client_port.one > 0 {
            write!(f, ";client_port={}", self.client_port)?;
        }
        if self.server_port.one > 0 {
            write!(f, ";server_port={}", self.server_port)?;
        }
        if self.is_multicast && self.ttl > 0 {
            write!(f, ";ttl={}", self.ttl)?;
        }
        if self.layers > 0 {
            write!(f, ";layers={}", self.layers)?;
        }
        if !self.ssrc.is_empty() {
            write!(f, ";ssrc={}", self.ssrc)?;
        }
        if !self.mode.is_empty() && self.mode != "PLAY" {
            write!(f, ";mode={}", self.mode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_proto() {
        let t = Transport::new(Proto::Tcp, 2);
        assert!(t.is_tcp && t.is_interleaved);
        assert_eq!(t.interleave, Pair { one: 2, two: 3 });
        assert_eq!(t.to_string(), "RTP/AVP/TCP;interleaved=2-3");

        let t = Transport::new(Proto::Unicast, 2);
        assert!(!t.is_tcp && !t.is_multicast);
        assert_eq!(t.to_string(), "RTP/AVP;unicast;client_port=2-3");

        let t = Transport::new(Proto::Multicast, 4);
        assert!(t.is_multicast);
        assert_eq!(t.to_string(), "RTP/AVP;multicast;port=4-5");
    }

    #[test]
    fn parse_interleaved_reply() {
        let mut t = Transport::new(Proto::Tcp, 0);
        t.parse("RTP/AVP/TCP;unicast;interleaved=0-1;ssrc=4F2B3D11;mode=\"PLAY\"")
            .unwrap();
        assert!(t.is_tcp);
        assert!(t.is_interleaved);
        assert_eq!(t.interleave, Pair { one: 0, two: 1 });
        assert_eq!(t.ssrc, "4F2B3D11");
        assert_eq!(t.mode, "PLAY");
        // mode=PLAY is the default and is not echoed.
        assert!(!t.to_string().contains("mode="));
    }

    #[test]
    fn parse_udp_reply() {
        let mut t = Transport::new(Proto::Unicast, 0);
        t.parse("RTP/AVP;unicast;client_port=8000-8001;server_port=9000-9001;source=10.0.0.5")
            .unwrap();
        assert!(!t.is_tcp);
        assert_eq!(t.client_port, Pair { one: 8000, two: 8001 });
        assert_eq!(t.server_port, Pair { one: 9000, two: 9001 });
        assert_eq!(t.source, "10.0.0.5");
    }

    #[test]
    fn pair_second_defaults_to_successor() {
        let mut t = Transport::default();
        t.parse("RTP/AVP;unicast;client_port=8000").unwrap();
        assert_eq!(t.client_port, Pair { one: 8000, two: 8001 });
    }

    #[test]
    fn multicast_ttl() {
        let mut t = Transport::new(Proto::Multicast, 0);
        t.parse("RTP/AVP;multicast;destination=224.1.2.3;port=5000-5001;ttl=16")
            .unwrap();
        assert_eq!(
            t.to_string(),
            "RTP/AVP;multicast;destination=224.1.2.3;port=5000-5001;ttl=16"
        );
    }

    #[test]
    fn malformed_fields() {
        let mut t = Transport::default();
        assert!(matches!(
            t.parse("RTP/AVP;destination"),
            Err(Error::MalformedTransport)
        ));
        let mut t = Transport::default();
        assert!(matches!(
            t.parse("RTP/AVP;client_port=eight"),
            Err(Error::MalformedTransport)
        ));
        let mut t = Transport::default();
        assert!(matches!(
            t.parse("RTP/AVP;ttl=abc"),
            Err(Error::MalformedTransport)
        ));
    }
}

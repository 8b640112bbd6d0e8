// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A narrow SDP ([RFC 4566](https://datatracker.ietf.org/doc/html/rfc4566))
//! parser covering what an RTSP `DESCRIBE` body needs: media sections and
//! the handful of attributes that drive `SETUP` and depacketization.
//! Unknown lines, attributes, and `fmtp` keys are ignored.

use log::debug;

/// Codec recognized from the `rtpmap` encoding name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Codec {
    /// `H264`.
    H264,
    /// `MPEG4-GENERIC`, AAC in RTP per RFC 3640.
    Aac,
}

/// One `m=` section of a DESCRIBE body, in SDP order.
#[derive(Clone, Debug, Default)]
pub struct Media {
    /// True for `m=audio`, false for `m=video`.
    pub audio: bool,
    pub codec: Option<Codec>,
    /// RTP clock rate from `rtpmap`.
    pub clock_rate: u32,
    /// `control` attribute, either absolute or relative to the session URI.
    pub control: String,
    /// Payload type from the `rtpmap` attribute.
    pub rtpmap: u32,
    /// Payload type from the `m=` line format list.
    pub payload_type: u32,
    /// AAC `config` fmtp value (hex decoded AudioSpecificConfig).
    pub config: Vec<u8>,
    /// H.264 `sprop-parameter-sets` fmtp value (base64 decoded NALs).
    pub sprop_parameter_sets: Vec<Vec<u8>>,
    /// AAC `sizelength` fmtp value.
    pub size_length: u32,
    /// AAC `indexlength` fmtp value.
    pub index_length: u32,
}

/// Parses a DESCRIBE body into its recognized media descriptors,
/// preserving SDP order. Audio and video sections are surfaced; anything
/// else (`m=application` and friends) is skipped along with its attributes.
pub fn parse(body: &[u8]) -> Vec<Media> {
    let mut media: Vec<Media> = Vec::new();
    let mut in_section = false;
    for raw in String::from_utf8_lossy(body).lines() {
        let line = raw.trim();
        let Some((kind, value)) = line.split_once('=') else {
            continue;
        };
        match kind {
            "m" => {
                // m=<media> <port> <proto> <fmt> ...
                let mut fields = value.split_whitespace();
                let name = fields.next().unwrap_or("");
                in_section = name == "audio" || name == "video";
                if !in_section {
                    continue;
                }
                let mut m = Media {
                    audio: name == "audio",
                    ..Media::default()
                };
                if let Some(fmt) = fields.nth(2) {
                    m.payload_type = fmt.parse().unwrap_or(0);
                }
                media.push(m);
            }
            "a" => {
                let m = match media.last_mut() {
                    Some(m) if in_section => m,
                    _ => continue,
                };
                let Some((name, value)) = value.split_once(':') else {
                    continue;
                };
                match name {
                    "control" => m.control = value.to_owned(),
                    "rtpmap" => parse_rtpmap(m, value),
                    "fmtp" => parse_fmtp(m, value),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    media
}

/// `<pt> <encoding>/<clock>[/<channels>]`
fn parse_rtpmap(m: &mut Media, value: &str) {
    let mut fields = value.split(' ');
    if let Some(pt) = fields.next().and_then(|f| f.parse().ok()) {
        m.rtpmap = pt;
    }
    let Some(encoding) = fields.next() else {
        return;
    };
    let mut parts = encoding.split('/');
    match parts.next().unwrap_or("").to_ascii_uppercase().as_str() {
        "H264" => m.codec = Some(Codec::H264),
        "MPEG4-GENERIC" => m.codec = Some(Codec::Aac),
        other => debug!("ignoring unrecognized encoding {:?}", other),
    }
    if let Some(clock) = parts.next().and_then(|f| f.parse().ok()) {
        m.clock_rate = clock;
    }
}

/// `<pt> key=value;key=value;...`
fn parse_fmtp(m: &mut Media, value: &str) {
    let params = match value.split_once(' ') {
        Some((_, params)) => params,
        None => return,
    };
    for param in params.split(';') {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        match key {
            "config" => m.config = decode_hex(value),
            "sizelength" => m.size_length = value.parse().unwrap_or(0),
            "indexlength" => m.index_length = value.parse().unwrap_or(0),
            "sprop-parameter-sets" => {
                for nal in value.split(',') {
                    match base64::decode(nal) {
                        Ok(decoded) => m.sprop_parameter_sets.push(decoded),
                        Err(e) => debug!("bad sprop base64 {:?}: {}", nal, e),
                    }
                }
            }
            _ => {}
        }
    }
}

fn decode_hex(value: &str) -> Vec<u8> {
    if value.len() % 2 != 0 {
        return Vec::new();
    }
    value
        .as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap_or(""), 16))
        .collect::<Result<Vec<u8>, _>>()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = b"v=0\r
o=- 1 1 IN IP4\r
s=hysxrtpsion\r
c=IN IP4 0.0.0.0\r
t=0 0\r
a=control:*\r
a=range:npt=0-\r
m=video 0 RTP/AVP 96\r
a=rtpmap:96 H264/90000\r
a=control:trackID=0\r
a=fmtp:96 packetization-mode=1; sprop-parameter-sets=Z2QAKKzoBQBbkA==,aO48sA==; profile-level-id=640028\r
m=audio 0 RTP/AVP 97\r
b=AS:16\r
a=control:trackID=1\r
a=rtpmap:97 MPEG4-GENERIC/16000/1\r
a=fmtp:97 profile-level-id=1;mode=AAC-hbr;sizelength=13;indexlength=3;indexdeltalength=3;config=1408\r
m=application 0 RTP/AVP 111\r
a=control:trackID=2\r
a=rtpmap:111 X-KATA/1000\r
a=fmtp:111 octet-align=1\r
b=AS:2\r
";

    #[test]
    fn parses_media_in_order() {
        let media = parse(BODY);
        assert_eq!(media.len(), 2);

        let video = &media[0];
        assert!(!video.audio);
        assert_eq!(video.codec, Some(Codec::H264));
        assert_eq!(video.clock_rate, 90_000);
        assert_eq!(video.control, "trackID=0");
        assert_eq!(video.rtpmap, 96);
        assert_eq!(video.payload_type, 96);
        assert_eq!(video.sprop_parameter_sets.len(), 2);
        assert_eq!(video.sprop_parameter_sets[0][0] & 0x1f, 7);
        assert_eq!(video.sprop_parameter_sets[1][0] & 0x1f, 8);

        let audio = &media[1];
        assert!(audio.audio);
        assert_eq!(audio.codec, Some(Codec::Aac));
        assert_eq!(audio.clock_rate, 16_000);
        assert_eq!(audio.control, "trackID=1");
        assert_eq!(audio.size_length, 13);
        assert_eq!(audio.index_length, 3);
        assert_eq!(audio.config, vec![0x14, 0x08]);
    }

    #[test]
    fn attributes_outside_media_are_ignored() {
        let media = parse(b"a=control:*\nv=0\n");
        assert!(media.is_empty());
    }

    #[test]
    fn media_without_attributes() {
        let media = parse(b"m=video 0 RTP/AVP 33\n");
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].payload_type, 33);
        assert!(media[0].codec.is_none());
        assert_eq!(media[0].control, "");
    }

    #[test]
    fn bad_sprop_entry_is_skipped() {
        let media = parse(
            b"m=video 0 RTP/AVP 96\na=fmtp:96 sprop-parameter-sets=!!!not-base64,aO48sA==\n",
        );
        assert_eq!(media[0].sprop_parameter_sets.len(), 1);
    }
}

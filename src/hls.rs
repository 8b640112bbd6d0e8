// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HLS playlist generation over a single byte-range media file.
//!
//! The downstream muxer appends segments to one media file; the playlist
//! keeps a fixed-size ring of the most recent segments and renders M3U8
//! with `EXT-X-BYTERANGE` entries (protocol version 4).

use std::fmt;

/// One media segment: a byte range of the backing file.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Segment {
    /// Playback duration in seconds.
    pub duration: f64,
    /// Byte offset within the media file.
    pub position: u64,
    /// Byte length.
    pub length: u64,
}

/// A ring of segments over one media URI.
#[derive(Clone, Debug)]
pub struct Playlist {
    /// Protocol version; `EXT-X-BYTERANGE` needs at least 4.
    version: u32,
    /// URI at which the media file is served.
    uri: String,
    segments: Vec<Segment>,
    first: Option<usize>,
    last: Option<usize>,
}

impl Playlist {
    /// Creates a playlist of at most `capacity` live segments served at
    /// `uri`.
    pub fn new(uri: impl Into<String>, capacity: usize) -> Playlist {
        assert!(capacity > 0, "playlist needs at least one segment slot");
        Playlist {
            version: 4,
            uri: uri.into(),
            segments: vec![Segment::default(); capacity],
            first: None,
            last: None,
        }
    }

    /// Appends a segment, evicting the oldest when the ring is full. The
    /// first segment starts at offset 0; every later one starts where its
    /// predecessor ended.
    pub fn add_segment(&mut self, duration: f64, length: u64) {
        let n = self.segments.len();
        let position = self
            .last
            .map(|last| self.segments[last].position + self.segments[last].length)
            .unwrap_or(0);
        let slot = self.last.map(|last| (last + 1) % n).unwrap_or(0);
        self.segments[slot] = Segment {
            duration,
            position,
            length,
        };
        self.last = Some(slot);
        match self.first {
            None => self.first = Some(slot),
            Some(first) if first == slot => self.first = Some((first + 1) % n),
            Some(_) => {}
        }
    }

    /// Live segments, oldest first.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        let n = self.segments.len();
        let (first, count) = match (self.first, self.last) {
            (Some(first), Some(last)) => (first, (last + n - first) % n + 1),
            _ => (0, 0),
        };
        (0..count).map(move |i| &self.segments[(first + i) % n])
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:{}", self.version)?;
        for seg in self.segments() {
            writeln!(f, "#EXTINF:{}", seg.duration)?;
            writeln!(f, "#EXT-X-BYTERANGE:{}@{}", seg.length, seg.position)?;
            writeln!(f, "{}", self.uri)?;
        }
        writeln!(f, "#EXT-X-ENDLIST")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_of_five() {
        let expected = "#EXTM3U\n\
                        #EXT-X-VERSION:4\n\
                        #EXTINF:3.014\n\
                        #EXT-X-BYTERANGE:96448@82560\n\
                        https://example.com/media/video.ts\n\
                        #EXTINF:3.24\n\
                        #EXT-X-BYTERANGE:103680@179008\n\
                        https://example.com/media/video.ts\n\
                        #EXTINF:2.9777\n\
                        #EXT-X-BYTERANGE:95286@282688\n\
                        https://example.com/media/video.ts\n\
                        #EXTINF:3.4333\n\
                        #EXT-X-BYTERANGE:109866@377974\n\
                        https://example.com/media/video.ts\n\
                        #EXTINF:3.41\n\
                        #EXT-X-BYTERANGE:109120@487840\n\
                        https://example.com/media/video.ts\n\
                        #EXT-X-ENDLIST\n";
        let segments: &[(f64, u64)] = &[
            (2.58, 82560),
            (3.014, 96448),
            (3.24, 103680),
            (2.9777, 95286),
            (3.4333, 109866),
            (3.41, 109120),
        ];
        let mut pl = Playlist::new("https://example.com/media/video.ts", 5);
        for (duration, length) in segments {
            pl.add_segment(*duration, *length);
        }
        assert_eq!(pl.to_string(), expected);
    }

    #[test]
    fn empty_playlist() {
        let pl = Playlist::new("video.ts", 3);
        assert_eq!(pl.to_string(), "#EXTM3U\n#EXT-X-VERSION:4\n#EXT-X-ENDLIST\n");
    }

    #[test]
    fn offsets_accumulate_from_zero() {
        let mut pl = Playlist::new("video.ts", 3);
        pl.add_segment(2.0, 100);
        pl.add_segment(2.0, 50);
        let positions: Vec<u64> = pl.segments().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 100]);
    }

    #[test]
    fn first_keeps_wrapping() {
        // Two full laps around the ring; the window stays the newest three.
        let mut pl = Playlist::new("video.ts", 3);
        for i in 0..8 {
            pl.add_segment(1.0, 10 + i);
        }
        let lengths: Vec<u64> = pl.segments().map(|s| s.length).collect();
        assert_eq!(lengths, vec![15, 16, 17]);
    }
}

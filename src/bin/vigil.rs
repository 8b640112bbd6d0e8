// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line probe: opens an RTSP session, plays for a few seconds,
//! pauses, tears down, and logs every stage change, packet header, and
//! reassembled NAL unit along the way.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};
use serde::Deserialize;
use tokio::time::{sleep_until, Instant};

use vigil::client::{ChannelData, Session, Stage};
use vigil::h264::{NalSink, ParameterSets, NAL_IDR, NAL_PPS, NAL_SPS};
use vigil::{rtcp, rtp};

/// How long to stay in each of Playing and Paused before moving on.
const DWELL: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "vigil", about = "RTSP/H.264 stream probe")]
struct Args {
    /// `rtsp://[user[:pass]@]host[:port]/path` to connect to.
    url: Option<String>,

    /// TOML file with a `url` key, as an alternative to the positional URL.
    #[arg(long, conflicts_with = "url")]
    config: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Config {
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let url = match (args.url, args.config) {
        (Some(url), None) => url,
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Config = toml::from_str(&raw).context("invalid configuration")?;
            config.url
        }
        _ => bail!("pass an rtsp:// URL or --config <file.toml>"),
    };

    let mut session = Session::open(&url).await?;
    let mut sink = NalSink::new();
    // In-band SPS/PPS land here so a muxer could emit segment headers.
    let mut params = ParameterSets::new();
    let mut stage = Stage::Init;
    // Armed on Playing/Paused to drive the pause/teardown sequence.
    let mut dwell_until = None::<Instant>;

    loop {
        let deadline = dwell_until;
        let dwell = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            next = session.stage.recv() => {
                let Some(next) = next else { break };
                stage = next;
                info!("stage: {:?}", stage);
                match stage {
                    Stage::Ready => session.play()?,
                    Stage::Playing | Stage::Paused => {
                        dwell_until = Some(Instant::now() + DWELL);
                    }
                    Stage::Done => break,
                    Stage::Init => {}
                }
            }
            _ = dwell => {
                dwell_until = None;
                match stage {
                    Stage::Playing => session.pause()?,
                    Stage::Paused => session.teardown()?,
                    _ => {}
                }
            }
            frame = session.data.recv() => {
                let Some(frame) = frame else { break };
                handle_data(frame, &mut sink, &mut params);
            }
            frame = session.control.recv() => {
                let Some(frame) = frame else { break };
                handle_control(frame);
            }
        }
    }

    if stage != Stage::Done {
        bail!("session ended unexpectedly in stage {:?}", stage);
    }
    info!("done");
    Ok(())
}

fn handle_data(frame: ChannelData, sink: &mut NalSink, params: &mut ParameterSets) {
    let pkt = match rtp::Packet::unpack(frame.payload) {
        Ok(pkt) => pkt,
        Err(e) => {
            warn!("dropping RTP packet on channel {}: {}", frame.channel, e);
            return;
        }
    };
    info!(
        "RTP [{}] PT={} M={} SN={} TS={}",
        frame.channel,
        pkt.payload_type(),
        pkt.mark(),
        pkt.sequence_number,
        pkt.timestamp,
    );
    if let Err(e) = sink.push(&pkt.payload, pkt.timestamp) {
        warn!("dropping malformed H.264 payload: {}", e);
        return;
    }
    for nal in &sink.units {
        info!(
            "NAL type={} ref_idc={} don={} size={}{}",
            nal.unit_type(),
            nal.ref_idc(),
            nal.don,
            nal.data.len(),
            if nal.unit_type() == NAL_IDR { " (IDR)" } else { "" },
        );
        // In-band parameter sets refresh the store; the sink already
        // delivers RBSP bytes.
        let stored = match nal.unit_type() {
            NAL_SPS => params.parse_sps(&nal.data),
            NAL_PPS => params.parse_pps(&nal.data),
            _ => continue,
        };
        match stored {
            Ok(()) => {
                if let Some(sps) = params.sps(0) {
                    info!("stream is {}x{}", sps.width, sps.height);
                }
            }
            Err(e) => warn!("bad in-band parameter set: {}", e),
        }
    }
}

fn handle_control(frame: ChannelData) {
    match rtcp::Packet::unpack(&frame.payload) {
        Ok(pkt) => {
            info!("RTCP [{}] PT={} count={}", frame.channel, pkt.pt, pkt.count());
            if let Some(sr) = pkt.sender_report {
                info!(
                    "  sender report: ssrc={:08x} rtp_ts={} packets={} octets={}",
                    sr.ssrc, sr.rtp_timestamp, sr.packet_count, sr.octet_count,
                );
            }
        }
        Err(e) => warn!("dropping RTCP packet on channel {}: {}", frame.channel, e),
    }
}

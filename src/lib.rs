//! A transparent ethernet bridge which damages the traffic passing through it. *Linux-only*.
//!
//! `brokenhub` sits between two network interfaces, captures every frame arriving on one of them
//! and retransmits it on the other. On the way through each frame may be dropped, have some of
//! its bytes overwritten, or be cut short, and each direction can be throttled to a fixed
//! bandwidth. This makes it easy to see how a system behaves over a bad link without needing a
//! bad link.
//!
//! # Impairments
//!
//! Frames are put through three stages, always in this order:
//!
//! 1. *drop*: the frame is discarded with probability `drop_percent / 100`.
//! 2. *corrupt*: with probability `corrupt_packet_percent / 100`, up to `corrupt_packet_bytes - 1`
//!    random bytes are overwritten with random values.
//! 3. *truncate*: frames longer than `truncate_len` are shortened to that length.
//!
//! Frames then wait in a per-interface queue and are released no faster than `bandwidth`
//! kilobytes per second. Frames are never reordered within a direction.
//!
//! Every random decision comes from a seeded [`RandomSource`], so a run with the same seed and the
//! same input makes the same decisions.
//!
//! # Reloading
//!
//! Sending the process `SIGHUP` re-reads the configuration file. New settings apply to frames
//! captured after the reload, and any backlog in the queues becomes eligible to send immediately.
//!
//! # Example
//!
//! ```no_run
//! use brokenhub::{BridgeEngine, ConfigManager, LinkEndpoint, RandomSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load("/etc/brokenhub.conf")?;
//! let a = LinkEndpoint::open("eth1")?;
//! let b = LinkEndpoint::open("eth2")?;
//! let mut engine = BridgeEngine::new(a, b, config, RandomSource::default());
//! engine.listen_for_hangup()?;
//! engine.run().await?;
//! # Ok(())
//! # }
//! ```

mod priv_prelude;
mod sys;
mod ioctl;
mod mac;
mod random;
pub mod config;
mod impair;
pub mod pacer;
mod iface;
mod endpoint;
mod forward;
mod stats;
mod engine;

#[cfg(test)]
mod tests;

pub use crate::{
    config::{
        Config, ConfigError, ConfigManager, FieldError, FieldErrors, ReloadFlag, Threshold,
        DEFAULT_CONFIG_PATH,
    },
    endpoint::{LinkEndpoint, OutboundQueue, Side, MAX_FRAME_LEN},
    engine::{BridgeEngine, BridgeError, StartError},
    forward::{admit_frame, Admission},
    iface::{open_raw, BindError},
    impair::{ImpairmentPipeline, Verdict},
    mac::MacAddr,
    pacer::BandwidthPacer,
    random::{RandomSource, DEFAULT_SEED},
    stats::{DirectionStats, Stats},
};

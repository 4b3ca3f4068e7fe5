pub use std::{cmp, fmt, fs, io, mem, ptr};
pub use std::collections::VecDeque;
pub use std::convert::Infallible;
pub use std::ffi::CString;
pub use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
pub use std::sync::atomic::{AtomicBool, Ordering};
pub use std::time::{Duration, Instant};
pub use bytes::{Bytes, BytesMut};
pub use log::{debug, error, info, trace, warn};
pub use rand::{RngCore, SeedableRng};
pub use thiserror::Error;
pub use tokio::io::unix::AsyncFd;

pub use crate::{
    config::{Config, ConfigError, ConfigManager, FieldError, ReloadFlag, Threshold},
    endpoint::{LinkEndpoint, OutboundQueue, Side, MAX_FRAME_LEN},
    engine::{BridgeEngine, BridgeError, StartError},
    forward::{admit_frame, Admission},
    iface::BindError,
    impair::{ImpairmentPipeline, Verdict},
    mac::MacAddr,
    pacer::BandwidthPacer,
    random::RandomSource,
    stats::{DirectionStats, Stats},
};
pub(crate) use crate::{iface, ioctl, sys};

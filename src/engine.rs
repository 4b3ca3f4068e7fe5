//! The bridge's event loop.
//!
//! Everything runs on a single task. Each turn of the loop first applies any pending config
//! reload, then waits until one of the following happens:
//!
//! * an endpoint with queued, eligible frames becomes writable,
//! * an endpoint has a frame to read,
//! * the nearest pacing deadline of a non-empty queue passes,
//! * a `SIGHUP` arrives (this only wakes the loop, the reload itself happens next turn).
//!
//! It then services every endpoint which is ready, at most one read and one write each. The
//! endpoint served first alternates between turns so neither direction can starve the other.

use crate::priv_prelude::*;
use crate::endpoint::Flush;
use std::future::Future;
use tokio::signal::unix::{signal, Signal, SignalKind};

/// A fatal error inside the event loop. None of these are retried.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("read failed on {iface}: {source}")]
    Read { iface: String, source: io::Error },
    #[error("write failed on {iface}: {source}")]
    Write { iface: String, source: io::Error },
    #[error("failed to reload config: {0}")]
    Reload(#[from] ConfigError),
    #[error("failed to listen for SIGHUP: {0}")]
    Hangup(io::Error),
}

/// Failure to bring a bridge up.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StartError {
    pub fn is_permission_denied(&self) -> bool {
        match self {
            StartError::Bind(bind_err) => bind_err.is_permission_denied(),
            StartError::Config(_) => false,
        }
    }
}

enum Wake {
    Hangup,
    Ready,
}

/// Forwards frames between two [`LinkEndpoint`]s, impairing them on the way.
pub struct BridgeEngine {
    a: LinkEndpoint,
    b: LinkEndpoint,
    config: ConfigManager,
    snapshot: Arc<Config>,
    pipeline: ImpairmentPipeline,
    stats: Stats,
    hangup_opt: Option<Signal>,
    buffer: Box<[u8]>,
    a_first: bool,
}

impl BridgeEngine {
    pub fn new(
        a: LinkEndpoint,
        b: LinkEndpoint,
        config: ConfigManager,
        rng: RandomSource,
    ) -> BridgeEngine {
        let snapshot = config.current();
        BridgeEngine {
            a,
            b,
            config,
            snapshot,
            pipeline: ImpairmentPipeline::new(rng),
            stats: Stats::default(),
            hangup_opt: None,
            buffer: vec![0u8; MAX_FRAME_LEN].into_boxed_slice(),
            a_first: true,
        }
    }

    /// Open both interfaces, then load the config at `config_path`.
    ///
    /// The interfaces come first so that a caller without the privilege to open raw sockets
    /// learns that before anything about the config file. Must be called from within a tokio
    /// runtime.
    pub fn open(
        interface_a: &str,
        interface_b: &str,
        config_path: impl Into<PathBuf>,
        rng: RandomSource,
    ) -> Result<BridgeEngine, StartError> {
        let a = LinkEndpoint::open(interface_a)?;
        let b = LinkEndpoint::open(interface_b)?;
        let config = ConfigManager::load(config_path)?;
        Ok(BridgeEngine::new(a, b, config, rng))
    }

    /// Reload the config whenever the process receives `SIGHUP`.
    ///
    /// The signal handler only sets the config manager's [`ReloadFlag`]. Must be called from
    /// within a tokio runtime.
    pub fn listen_for_hangup(&mut self) -> Result<(), BridgeError> {
        self.config.reload_flag().register_hangup().map_err(BridgeError::Hangup)?;
        let hangup = signal(SignalKind::hangup()).map_err(BridgeError::Hangup)?;
        self.hangup_opt = Some(hangup);
        Ok(())
    }

    pub fn endpoint(&self, side: Side) -> &LinkEndpoint {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    /// The config snapshot currently applied to new frames.
    pub fn config(&self) -> &Arc<Config> {
        &self.snapshot
    }

    pub fn reload_flag(&self) -> ReloadFlag {
        self.config.reload_flag()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Run until a fatal error occurs.
    pub async fn run(&mut self) -> Result<Infallible, BridgeError> {
        info!(
            "bridging {} ({}) <-> {} ({})",
            self.a.name(),
            self.a.mac_addr(),
            self.b.name(),
            self.b.mac_addr(),
        );
        loop {
            self.turn().await?;
        }
    }

    /// Run a single iteration of the loop. Waits indefinitely if there is nothing to do.
    pub async fn turn(&mut self) -> Result<(), BridgeError> {
        if self.config.take_reload_request() {
            self.reload()?;
        }

        let now = Instant::now();
        let a_wants_write = self.a.wants_write(now);
        let b_wants_write = self.b.wants_write(now);
        let deadline_opt = match (self.a.pending_deadline(now), self.b.pending_deadline(now)) {
            (Some(a), Some(b)) => Some(cmp::min(a, b)),
            (a_opt, b_opt) => a_opt.or(b_opt),
        };
        let deadline = deadline_opt.unwrap_or(now);

        let wake = tokio::select! {
            biased;
            () = wait_for_hangup(&mut self.hangup_opt) => Wake::Hangup,
            res = self.a.writable(), if a_wants_write => {
                res.map_err(|source| write_error(&self.a, source))?;
                Wake::Ready
            },
            res = self.b.writable(), if b_wants_write => {
                res.map_err(|source| write_error(&self.b, source))?;
                Wake::Ready
            },
            res = self.a.readable() => {
                res.map_err(|source| read_error(&self.a, source))?;
                Wake::Ready
            },
            res = self.b.readable() => {
                res.map_err(|source| read_error(&self.b, source))?;
                Wake::Ready
            },
            () = tokio::time::sleep_until(deadline.into()), if deadline_opt.is_some() => {
                Wake::Ready
            },
        };
        if let Wake::Hangup = wake {
            debug!("received SIGHUP, reloading {}", self.config.path().display());
            return Ok(());
        }

        let order = if self.a_first { [Side::A, Side::B] } else { [Side::B, Side::A] };
        self.a_first = !self.a_first;
        for side in order {
            if self.endpoint(side).wants_write(Instant::now()) {
                self.service_write(side).await?;
            }
            self.service_read(side).await?;
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<(), BridgeError> {
        let snapshot = self.config.reload()?;
        info!("reloaded config from {}: {:?}", self.config.path().display(), snapshot);
        info!("{} -> {}: {}", self.a.name(), self.b.name(), self.stats.a_to_b);
        info!("{} -> {}: {}", self.b.name(), self.a.name(), self.stats.b_to_a);
        self.snapshot = snapshot;
        let now = Instant::now();
        self.a.reset_pacing(now);
        self.b.reset_pacing(now);
        Ok(())
    }

    async fn service_read(&mut self, side: Side) -> Result<(), BridgeError> {
        let (capture, peer) = match side {
            Side::A => (&mut self.a, &mut self.b),
            Side::B => (&mut self.b, &mut self.a),
        };
        let len = match ready_now(capture.recv_frame(&mut self.buffer)).await {
            Some(Ok(Some(len))) => len,
            None | Some(Ok(None)) => return Ok(()),
            Some(Err(source)) => return Err(read_error(capture, source)),
        };
        let admission = admit_frame(
            capture.mac_addr(),
            &self.buffer[..len],
            &mut self.pipeline,
            &self.snapshot,
        );
        self.stats.from_side_mut(side).record(&admission);
        if let Admission::Forward { frame, .. } = admission {
            trace!("queueing {} byte frame from {} on {}", frame.len(), capture.name(), peer.name());
            peer.enqueue(frame);
        }
        Ok(())
    }

    async fn service_write(&mut self, side: Side) -> Result<(), BridgeError> {
        let endpoint = match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        };
        let flushed = ready_now(endpoint.flush_one(self.snapshot.ns_per_byte)).await;
        let (written, len) = match flushed {
            Some(Ok(Flush::Sent { written, len })) => (written, len),
            None | Some(Ok(Flush::Idle)) => return Ok(()),
            Some(Err(source)) => return Err(write_error(endpoint, source)),
        };
        self.record_write(side, written, len);
        Ok(())
    }

    /// Account for a frame written out of `side`. The frame has already left the queue, so on a
    /// short write the remainder is lost.
    pub(crate) fn record_write(&mut self, side: Side, written: usize, len: usize) {
        let short = self.stats.from_side_mut(side.peer()).record_write(written, len);
        if short {
            let name = self.endpoint(side).name();
            warn!("not all bytes written on {}: {} of {}", name, written, len);
        }
    }
}

/// Poll `future` once. Yields its output only if it completes without waiting.
async fn ready_now<F: Future>(future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        output = future => Some(output),
        () = std::future::ready(()) => None,
    }
}

async fn wait_for_hangup(hangup_opt: &mut Option<Signal>) {
    if let Some(hangup) = hangup_opt {
        if hangup.recv().await.is_some() {
            return;
        }
    }
    std::future::pending().await
}

fn read_error(endpoint: &LinkEndpoint, source: io::Error) -> BridgeError {
    BridgeError::Read { iface: endpoint.name().to_owned(), source }
}

fn write_error(endpoint: &LinkEndpoint, source: io::Error) -> BridgeError {
    BridgeError::Write { iface: endpoint.name().to_owned(), source }
}

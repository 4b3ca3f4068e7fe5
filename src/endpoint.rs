use crate::priv_prelude::*;

/// Size of the buffer a single frame is read into. Anything longer is cut short by the kernel.
pub const MAX_FRAME_LEN: usize = 1600;

/// Which of the two bridged interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn peer(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::A => write!(f, "a"),
            Side::B => write!(f, "b"),
        }
    }
}

/// Frames waiting to go out of an endpoint, oldest first.
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    frames: VecDeque<Bytes>,
    queued_bytes: usize,
}

impl OutboundQueue {
    pub fn new() -> OutboundQueue {
        OutboundQueue::default()
    }

    pub fn push_back(&mut self, frame: Bytes) {
        self.queued_bytes += frame.len();
        self.frames.push_back(frame);
    }

    pub fn front(&self) -> Option<&Bytes> {
        self.frames.front()
    }

    pub fn pop_front(&mut self) -> Option<Bytes> {
        let frame = self.frames.pop_front()?;
        self.queued_bytes -= frame.len();
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total size of every queued frame.
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> + '_ {
        self.frames.iter()
    }
}

/// Result of trying to send the frame at the head of an endpoint's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flush {
    /// Nothing queued, or the socket wasn't actually writable. The head frame is still queued.
    Idle,
    /// The head frame was written and removed from the queue.
    Sent { written: usize, len: usize },
}

/// One side of the bridge: a non-blocking socket attached to an interface, that interface's
/// hardware address, and the frames waiting to be sent out of it.
pub struct LinkEndpoint {
    name: String,
    fd: AsyncFd<OwnedFd>,
    mac_addr: MacAddr,
    queue: OutboundQueue,
    pacer: BandwidthPacer,
}

impl fmt::Debug for LinkEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LinkEndpoint")
            .field("name", &self.name)
            .field("fd", &self.fd.get_ref().as_raw_fd())
            .field("mac_addr", &self.mac_addr)
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl LinkEndpoint {
    /// Open the interface called `name` for raw, promiscuous capture. Must be called from within
    /// a tokio runtime.
    pub fn open(name: &str) -> Result<LinkEndpoint, BindError> {
        let (fd, mac_addr) = iface::open_raw(name)?;
        match LinkEndpoint::from_fd(name, fd, mac_addr) {
            Ok(endpoint) => Ok(endpoint),
            Err(source) => Err(BindError::Os {
                name: name.to_owned(),
                op: "registering with reactor",
                source,
            }),
        }
    }

    /// Wrap an already open, message-oriented descriptor. Every `read(2)` on `fd` must yield one
    /// frame and every `write(2)` must send one, as with a packet socket or a `SOCK_DGRAM`
    /// socketpair. Must be called from within a tokio runtime.
    pub fn from_fd(
        name: impl Into<String>,
        fd: OwnedFd,
        mac_addr: MacAddr,
    ) -> io::Result<LinkEndpoint> {
        iface::set_nonblocking(&fd)?;
        let fd = AsyncFd::new(fd)?;
        Ok(LinkEndpoint {
            name: name.into(),
            fd,
            mac_addr,
            queue: OutboundQueue::new(),
            pacer: BandwidthPacer::new(Instant::now()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac_addr(&self) -> MacAddr {
        self.mac_addr
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    pub fn pacer(&self) -> &BandwidthPacer {
        &self.pacer
    }

    pub(crate) fn enqueue(&mut self, frame: Bytes) {
        self.queue.push_back(frame);
    }

    /// Whether the endpoint has a frame to send and its pacing deadline has passed.
    pub fn wants_write(&self, now: Instant) -> bool {
        !self.queue.is_empty() && self.pacer.is_eligible(now)
    }

    /// The pacing deadline, if frames are queued behind it.
    pub fn pending_deadline(&self, now: Instant) -> Option<Instant> {
        if self.queue.is_empty() || self.pacer.is_eligible(now) {
            return None;
        }
        Some(self.pacer.deadline())
    }

    pub(crate) fn reset_pacing(&mut self, now: Instant) {
        self.pacer.reset(now);
    }

    pub(crate) async fn readable(&self) -> io::Result<()> {
        let _guard = self.fd.readable().await?;
        Ok(())
    }

    pub(crate) async fn writable(&self) -> io::Result<()> {
        let _guard = self.fd.writable().await?;
        Ok(())
    }

    /// Read one frame into `buffer`. Returns `None` if there was nothing to read after all.
    pub(crate) async fn recv_frame(&self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        let mut guard = self.fd.readable().await?;
        match guard.try_io(|fd| {
            let res = unsafe {
                libc::read(
                    fd.as_raw_fd(),
                    buffer.as_mut_ptr() as *mut libc::c_void,
                    buffer.len(),
                )
            };
            if res < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(res as usize)
        }) {
            Ok(Ok(n)) => Ok(Some(n)),
            Ok(Err(err)) => Err(err),
            Err(_would_block) => Ok(None),
        }
    }

    /// Try to write the frame at the head of the queue.
    ///
    /// The frame leaves the queue once `write(2)` accepts any of it. A short write is reported
    /// back but the rest of the frame is not retried.
    pub(crate) async fn flush_one(&mut self, ns_per_byte: u64) -> io::Result<Flush> {
        let frame = match self.queue.front() {
            Some(frame) => frame.clone(),
            None => return Ok(Flush::Idle),
        };
        let mut guard = self.fd.writable().await?;
        let written = match guard.try_io(|fd| {
            let res = unsafe {
                libc::write(
                    fd.as_raw_fd(),
                    frame.as_ptr() as *const libc::c_void,
                    frame.len(),
                )
            };
            if res < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(res as usize)
        }) {
            Ok(Ok(n)) => n,
            Ok(Err(err)) => return Err(err),
            Err(_would_block) => return Ok(Flush::Idle),
        };
        drop(guard);
        let _frame = self.queue.pop_front();
        self.pacer.record_send(Instant::now(), written, ns_per_byte);
        Ok(Flush::Sent { written, len: frame.len() })
    }
}

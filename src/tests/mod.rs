use crate::priv_prelude::*;
use std::os::unix::net::UnixDatagram;

mod impair;

pub const MAC_A: MacAddr = MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x0a]);
pub const MAC_B: MacAddr = MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x0b]);
pub const HOST_1: MacAddr = MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x01, 0x01]);
pub const HOST_2: MacAddr = MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x02, 0x02]);

/// How long the engine must sit idle before `Harness::settle` gives up waiting on it.
const SETTLE_IDLE: Duration = Duration::from_millis(50);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An ethernet frame of `len` bytes whose payload is derived from `tag`.
pub fn frame(dest: MacAddr, source: MacAddr, len: usize, tag: u8) -> Vec<u8> {
    assert!(len >= 12);
    let mut frame = Vec::with_capacity(len);
    frame.extend_from_slice(dest.as_bytes());
    frame.extend_from_slice(source.as_bytes());
    frame.extend((0..len - 12).map(|i| tag.wrapping_add(i as u8)));
    frame
}

pub fn config_json(
    drop_percent: f64,
    corrupt_packet_percent: f64,
    corrupt_packet_bytes: u32,
    truncate_len: u32,
    bandwidth: f64,
) -> String {
    serde_json::json!({
        "drop_percent": drop_percent,
        "corrupt_packet_percent": corrupt_packet_percent,
        "corrupt_packet_bytes": corrupt_packet_bytes,
        "truncate_len": truncate_len,
        "bandwidth": bandwidth,
    })
    .to_string()
}

pub fn passthrough_json() -> String {
    config_json(0.0, 0.0, 0, 0, 0.0)
}

pub fn config_file(json: &str) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    fs::write(file.path(), json).unwrap();
    file
}

/// A bridge whose two endpoints are socketpairs. `wire_a` and `wire_b` play the part of the
/// networks attached to endpoints A and B.
pub struct Harness {
    pub engine: BridgeEngine,
    pub wire_a: UnixDatagram,
    pub wire_b: UnixDatagram,
    pub config_file: tempfile::NamedTempFile,
}

impl Harness {
    pub fn new(json: &str) -> Harness {
        Harness::with_rng(json, RandomSource::default())
    }

    pub fn with_rng(json: &str, rng: RandomSource) -> Harness {
        init_logging();
        let config_file = config_file(json);
        let config = ConfigManager::load(config_file.path()).unwrap();
        let (bridge_a, wire_a) = UnixDatagram::pair().unwrap();
        let (bridge_b, wire_b) = UnixDatagram::pair().unwrap();
        wire_a.set_nonblocking(true).unwrap();
        wire_b.set_nonblocking(true).unwrap();
        let a = LinkEndpoint::from_fd("bridge-a", OwnedFd::from(bridge_a), MAC_A).unwrap();
        let b = LinkEndpoint::from_fd("bridge-b", OwnedFd::from(bridge_b), MAC_B).unwrap();
        let engine = BridgeEngine::new(a, b, config, rng);
        Harness { engine, wire_a, wire_b, config_file }
    }

    pub fn wire(&self, side: Side) -> &UnixDatagram {
        match side {
            Side::A => &self.wire_a,
            Side::B => &self.wire_b,
        }
    }

    /// Put a frame on the network attached to `side`, for that endpoint to capture.
    pub fn inject(&self, side: Side, frame: &[u8]) {
        let n = self.wire(side).send(frame).unwrap();
        assert_eq!(n, frame.len());
    }

    /// Everything the bridge has transmitted onto the network attached to `side` so far.
    pub fn collect(&self, side: Side) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut buffer = [0u8; MAX_FRAME_LEN];
        loop {
            match self.wire(side).recv(&mut buffer) {
                Ok(n) => frames.push(buffer[..n].to_vec()),
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => panic!("unexpected error reading wire: {}", err),
            }
        }
        frames
    }

    pub fn rewrite_config(&self, json: &str) {
        fs::write(self.config_file.path(), json).unwrap();
    }

    /// Run the engine until it has had nothing to do for a while.
    pub async fn settle(&mut self) {
        loop {
            match tokio::time::timeout(SETTLE_IDLE, self.engine.turn()).await {
                Ok(res) => res.unwrap(),
                Err(_elapsed) => break,
            }
        }
    }
}

use crate::priv_prelude::*;

/// The fate of one captured frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Too short to carry a destination and source address.
    Runt,
    /// Addressed to or from the capturing interface. These are frames the host sent or received
    /// itself and show up again because of promiscuous capture.
    Looped,
    /// Dropped by the impairment pipeline.
    Dropped,
    /// To be queued on the peer endpoint.
    Forward {
        frame: Bytes,
        corrupt_writes: u32,
        truncated: bool,
    },
}

/// Decide what to do with `captured`, a frame read from the endpoint whose hardware address is
/// `own_mac`. Frames which survive come back impaired and ready for the peer's queue.
pub fn admit_frame(
    own_mac: MacAddr,
    captured: &[u8],
    pipeline: &mut ImpairmentPipeline,
    config: &Config,
) -> Admission {
    let (dest_mac, source_mac) = match (MacAddr::dest_of(captured), MacAddr::source_of(captured)) {
        (Some(dest_mac), Some(source_mac)) => (dest_mac, source_mac),
        _ => {
            trace!("ignoring {} byte runt frame", captured.len());
            return Admission::Runt;
        },
    };
    if dest_mac == own_mac || source_mac == own_mac {
        return Admission::Looped;
    }

    let mut frame = BytesMut::from(captured);
    match pipeline.apply(config, &mut frame) {
        Verdict::Drop => {
            trace!("dropping frame {} -> {} ({} bytes)", source_mac, dest_mac, captured.len());
            Admission::Dropped
        },
        Verdict::Keep { corrupt_writes, truncated } => Admission::Forward {
            frame: frame.freeze(),
            corrupt_writes,
            truncated,
        },
    }
}

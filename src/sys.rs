#![allow(non_camel_case_types)]

// NOTE: these mirror <linux/if_packet.h> and can go once every libc we build against exports them.

use libc::{c_int, c_uchar, c_ushort};

pub const SOL_PACKET: c_int = 263;
pub const PACKET_ADD_MEMBERSHIP: c_int = 1;
pub const PACKET_MR_PROMISC: c_ushort = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct packet_mreq {
    pub mr_ifindex: c_int,
    pub mr_type: c_ushort,
    pub mr_alen: c_ushort,
    pub mr_address: [c_uchar; 8],
}

/// `ETH_P_ALL` in network byte order, as `socket(2)` and `sockaddr_ll` want it.
pub fn eth_p_all_be() -> u16 {
    (libc::ETH_P_ALL as u16).to_be()
}

//! Binding raw packet sockets to existing network interfaces.

use crate::priv_prelude::*;

/// Error raised when an interface can't be opened for bridging.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("interface name {name:?} is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },
    #[error("interface name {name:?} contains a NUL byte")]
    NameContainsNul { name: String },
    #[error("permission denied opening a raw socket for {name} ({source})")]
    PermissionDenied { name: String, source: io::Error },
    #[error("{op} failed for interface {name}: {source}")]
    Os { name: String, op: &'static str, source: io::Error },
}

impl BindError {
    /// Whether the process simply lacks the privilege to open raw sockets.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, BindError::PermissionDenied { .. })
    }

    fn os(name: &str, op: &'static str) -> BindError {
        BindError::Os {
            name: name.to_owned(),
            op,
            source: io::Error::last_os_error(),
        }
    }
}

/// Open a raw link-layer socket on `iface_name`, put the interface in promiscuous mode and fetch
/// its hardware address. The returned descriptor is bound to that interface only and receives
/// every protocol.
pub fn open_raw(iface_name: &str) -> Result<(OwnedFd, MacAddr), BindError> {
    let req = new_req(iface_name)?;

    let fd = {
        let raw_fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                c_int_from(sys::eth_p_all_be()),
            )
        };
        if raw_fd < 0 {
            let source = io::Error::last_os_error();
            return match source.raw_os_error() {
                Some(libc::EPERM) | Some(libc::EACCES) => Err(BindError::PermissionDenied {
                    name: iface_name.to_owned(),
                    source,
                }),
                _ => Err(BindError::Os { name: iface_name.to_owned(), op: "socket(AF_PACKET)", source }),
            };
        }
        unsafe {
            OwnedFd::from_raw_fd(raw_fd)
        }
    };

    let ifindex = interface_index(&fd, iface_name, req)?;
    bind_to_interface(&fd, iface_name, ifindex)?;
    enable_promiscuous(&fd, iface_name, ifindex)?;
    let mac_addr = hardware_addr(&fd, iface_name, req)?;
    debug!("opened raw socket on {} (index {}, hwaddr {})", iface_name, ifindex, mac_addr);
    Ok((fd, mac_addr))
}

fn c_int_from(protocol: u16) -> libc::c_int {
    libc::c_int::from(protocol)
}

fn new_req(iface_name: &str) -> Result<libc::ifreq, BindError> {
    let name_cstr = match CString::new(iface_name) {
        Ok(name_cstr) => name_cstr,
        Err(_) => {
            return Err(BindError::NameContainsNul { name: iface_name.to_owned() });
        },
    };
    if name_cstr.as_bytes_with_nul().len() > libc::IFNAMSIZ {
        return Err(BindError::NameTooLong {
            name: iface_name.to_owned(),
            max: libc::IFNAMSIZ - 1,
        });
    }
    let req = unsafe {
        let mut req: libc::ifreq = mem::zeroed();
        ptr::copy_nonoverlapping(
            name_cstr.as_ptr(),
            req.ifr_name.as_mut_ptr(),
            name_cstr.as_bytes().len(),
        );
        req
    };
    Ok(req)
}

fn interface_index(fd: &OwnedFd, iface_name: &str, mut req: libc::ifreq) -> Result<libc::c_int, BindError> {
    let res = unsafe {
        ioctl::siocgifindex(fd.as_raw_fd(), &mut req)
    };
    if res < 0 {
        return Err(BindError::os(iface_name, "ioctl(SIOCGIFINDEX)"));
    }
    Ok(unsafe { req.ifr_ifru.ifru_ifindex })
}

fn hardware_addr(fd: &OwnedFd, iface_name: &str, mut req: libc::ifreq) -> Result<MacAddr, BindError> {
    let res = unsafe {
        ioctl::siocgifhwaddr(fd.as_raw_fd(), &mut req)
    };
    if res < 0 {
        return Err(BindError::os(iface_name, "ioctl(SIOCGIFHWADDR)"));
    }
    let sa_data = unsafe { req.ifr_ifru.ifru_hwaddr.sa_data };
    let mut bytes = [0u8; 6];
    for (byte, c) in bytes.iter_mut().zip(sa_data.iter()) {
        *byte = *c as u8;
    }
    Ok(MacAddr::new(bytes))
}

fn bind_to_interface(fd: &OwnedFd, iface_name: &str, ifindex: libc::c_int) -> Result<(), BindError> {
    let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::c_ushort;
    addr.sll_protocol = sys::eth_p_all_be();
    addr.sll_ifindex = ifindex;
    let res = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };
    if res < 0 {
        return Err(BindError::os(iface_name, "bind(sockaddr_ll)"));
    }
    Ok(())
}

fn enable_promiscuous(fd: &OwnedFd, iface_name: &str, ifindex: libc::c_int) -> Result<(), BindError> {
    let mreq = sys::packet_mreq {
        mr_ifindex: ifindex,
        mr_type: sys::PACKET_MR_PROMISC,
        mr_alen: 0,
        mr_address: [0; 8],
    };
    let res = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            sys::SOL_PACKET,
            sys::PACKET_ADD_MEMBERSHIP,
            &mreq as *const sys::packet_mreq as *const libc::c_void,
            mem::size_of::<sys::packet_mreq>() as libc::socklen_t,
        )
    };
    if res < 0 {
        return Err(BindError::os(iface_name, "setsockopt(PACKET_ADD_MEMBERSHIP)"));
    }
    Ok(())
}

/// Put `fd` into non-blocking mode so it can be driven by the reactor.
pub(crate) fn set_nonblocking(fd: &OwnedFd) -> io::Result<()> {
    let flags = unsafe {
        libc::fcntl(fd.as_raw_fd(), libc::F_GETFL, 0)
    };
    if flags < 0 {
        let err = io::Error::last_os_error();
        return Err(io::Error::new(err.kind(), "calling fcntl(F_GETFL)"));
    }
    let res = unsafe {
        libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK)
    };
    if res < 0 {
        let err = io::Error::last_os_error();
        return Err(io::Error::new(err.kind(), "calling fcntl(F_SETFL)"));
    }
    Ok(())
}

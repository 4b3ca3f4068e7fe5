use ioctl_sys::ioctl;

ioctl!(bad read siocgifhwaddr with 0x8927; libc::ifreq);
ioctl!(bad read siocgifindex with 0x8933; libc::ifreq);

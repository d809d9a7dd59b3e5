use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use mac_address::MacAddress;

/// Discard-protocol port, the conventional magic packet destination.
const WOL_PORT: u16 = 9;

/// Six 0xFF bytes followed by the target MAC repeated sixteen times.
pub fn magic_packet(mac: &MacAddress) -> [u8; 102] {
    let mut packet = [0xFFu8; 102];
    let bytes = mac.bytes();
    for rep in 0..16 {
        packet[6 + rep * 6..12 + rep * 6].copy_from_slice(&bytes);
    }
    packet
}

pub fn target_addr(broadcast: Option<Ipv4Addr>) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(
        broadcast.unwrap_or(Ipv4Addr::BROADCAST),
        WOL_PORT,
    ))
}

/// Transmits magic packets on behalf of a switch.
pub trait WakeSender: Send + Sync {
    fn send(&self, mac: &MacAddress, broadcast: Option<Ipv4Addr>) -> io::Result<()>;
}

/// Sends the packet as a single UDP broadcast datagram.
pub struct UdpWakeSender;

impl WakeSender for UdpWakeSender {
    fn send(&self, mac: &MacAddress, broadcast: Option<Ipv4Addr>) -> io::Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;
        socket.send_to(&magic_packet(mac), target_addr(broadcast))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac() -> MacAddress {
        "AA:BB:CC:DD:EE:FF".parse().unwrap()
    }

    #[test]
    fn test_magic_packet_layout() {
        let packet = magic_packet(&mac());
        assert_eq!(packet.len(), 102);
        assert_eq!(&packet[..6], &[0xFF; 6]);
        for rep in 0..16 {
            assert_eq!(
                &packet[6 + rep * 6..12 + rep * 6],
                &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]
            );
        }
    }

    #[test]
    fn test_target_addr_defaults_to_limited_broadcast() {
        assert_eq!(target_addr(None), "255.255.255.255:9".parse().unwrap());
    }

    #[test]
    fn test_target_addr_uses_configured_broadcast() {
        let broadcast = Some("192.0.2.255".parse().unwrap());
        assert_eq!(target_addr(broadcast), "192.0.2.255:9".parse().unwrap());
    }
}

//! Minimal Ethernet/IPv4/IPv6/UDP de-encapsulation.
//!
//! The actual capture source (offline pcap file or a live interface) and its
//! BPF filter are external collaborators (§1, §6). This module only walks a
//! single captured frame far enough to reach the UDP layer, the one piece of
//! "capture plumbing" the classifier (§4.1) needs in-core. It is a small,
//! dependency-free byte-offset parser in the same style as the rest of the
//! pipeline's wire-format code, not a general packet dissector.

use crate::error::{ReliquaryError, Result};

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;
const ETHERTYPE_VLAN: u16 = 0x8100;
const IPV6_HEADER_LEN: usize = 40;
const UDP_HEADER_LEN: usize = 8;
const PROTO_UDP: u8 = 17;

/// A single captured link-layer frame, as handed off by an external capture
/// source (e.g. a pcap reader). Bytes are assumed to start at the Ethernet
/// header.
#[derive(Debug, Clone)]
pub struct CapturedPacket {
    pub data: Vec<u8>,
}

impl CapturedPacket {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

/// The UDP layer extracted from a captured frame.
pub struct UdpLayer<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

/// Walk Ethernet (with at most one 802.1Q tag) → IPv4/IPv6 → UDP and return
/// the UDP layer, or [`ReliquaryError::NoUdpLayer`] if any stage fails.
pub fn extract_udp_layer(packet: &CapturedPacket) -> Result<UdpLayer<'_>> {
    let data = packet.data.as_slice();
    if data.len() < ETHERNET_HEADER_LEN {
        return Err(ReliquaryError::NoUdpLayer);
    }

    let mut offset = 12; // start of ethertype
    let mut ethertype = read_u16_be(data, offset).ok_or(ReliquaryError::NoUdpLayer)?;
    offset += 2;

    if ethertype == ETHERTYPE_VLAN {
        offset += 2; // skip tag control information
        ethertype = read_u16_be(data, offset).ok_or(ReliquaryError::NoUdpLayer)?;
        offset += 2;
        debug_assert_eq!(offset, ETHERNET_HEADER_LEN + VLAN_TAG_LEN);
    }

    let (proto, ip_payload) = match ethertype {
        ETHERTYPE_IPV4 => parse_ipv4(&data[offset..])?,
        ETHERTYPE_IPV6 => parse_ipv6(&data[offset..])?,
        _ => return Err(ReliquaryError::NoUdpLayer),
    };

    if proto != PROTO_UDP {
        return Err(ReliquaryError::NoUdpLayer);
    }

    parse_udp(ip_payload)
}

fn parse_ipv4(data: &[u8]) -> Result<(u8, &[u8])> {
    if data.len() < 20 {
        return Err(ReliquaryError::NoUdpLayer);
    }
    let ihl = (data[0] & 0x0F) as usize * 4;
    if ihl < 20 || data.len() < ihl {
        return Err(ReliquaryError::NoUdpLayer);
    }
    let proto = data[9];
    Ok((proto, &data[ihl..]))
}

fn parse_ipv6(data: &[u8]) -> Result<(u8, &[u8])> {
    if data.len() < IPV6_HEADER_LEN {
        return Err(ReliquaryError::NoUdpLayer);
    }
    // Extension header chains are out of scope; next-header is assumed to
    // name the upper-layer protocol directly.
    let next_header = data[6];
    Ok((next_header, &data[IPV6_HEADER_LEN..]))
}

fn parse_udp(data: &[u8]) -> Result<UdpLayer<'_>> {
    if data.len() < UDP_HEADER_LEN {
        return Err(ReliquaryError::NoUdpLayer);
    }
    let src_port = read_u16_be(data, 0).ok_or(ReliquaryError::NoUdpLayer)?;
    let dst_port = read_u16_be(data, 2).ok_or(ReliquaryError::NoUdpLayer)?;
    Ok(UdpLayer {
        src_port,
        dst_port,
        payload: &data[UDP_HEADER_LEN..],
    })
}

fn read_u16_be(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

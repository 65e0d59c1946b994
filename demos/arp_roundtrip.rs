//! Build an ARP request, serialize it, and parse it back.

fn main() {
    use embernet::arp::{ArpOperation, ArpPacket};
    use embernet::{IpV4Addr, MacAddr};

    let msg = ArpPacket::request(
        MacAddr::new([1, 2, 3, 4, 5, 6]),
        IpV4Addr::new([7, 8, 9, 10]),
        MacAddr::BROADCAST,
        IpV4Addr::new([17, 18, 19, 20]),
    );

    // Serialize
    let bytes: [u8; ArpPacket::BYTE_LEN] = msg.to_be_bytes();
    assert_eq!(bytes.len(), 28);

    // Deserialize
    use embernet::ByteStruct;
    let msg_parsed = ArpPacket::read_bytes(&bytes);

    assert_eq!(msg, msg_parsed);
    assert_eq!(msg_parsed.operation, ArpOperation::Request);
}

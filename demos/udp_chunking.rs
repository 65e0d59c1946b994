//! Send a UDP payload too large for one frame and confirm it goes out as
//! several independent IPv4/UDP datagrams sharing one 5-tuple.

use embernet::engine::{Core, Engine, Interface, MAX_UDP_CHUNK};
use embernet::error::Status;
use embernet::external::ExternalInterface;
use embernet::metadata::{Metadata, PrintLayer, PrintLevel};
use embernet::{IpV4Addr, MacAddr};

struct LoggingDriver {
    transmitted: Vec<Vec<u8>>,
}

impl ExternalInterface for LoggingDriver {
    fn acquire(&mut self) -> Status {
        Status::Ok
    }

    fn release(&mut self) {}

    fn receive(&mut self, _buffer: &mut [u8]) -> Result<usize, Status> {
        Ok(0)
    }

    fn transmit(&mut self, frame: &[u8]) -> Status {
        self.transmitted.push(frame.to_vec());
        Status::Ok
    }

    fn get_monotonic_timestamp(&mut self) -> i64 {
        0
    }

    fn print(&mut self, _level: PrintLevel, _layer: PrintLayer, _message: &str) {}

    fn report(&mut self, _layer: PrintLayer, _status: Status) {}

    fn receive_udp(&mut self, _core: &mut Core, _metadata: &Metadata, _payload: &[u8]) -> Status {
        Status::Ok
    }
}

fn main() {
    let interface = Interface {
        mac: MacAddr::new([0x02, 0xAF, 0xFF, 0x1A, 0xE5, 0x3C]),
        ip: IpV4Addr::new([10, 0, 0, 120]),
        netmask: IpV4Addr::new([255, 255, 255, 0]),
        gateway: IpV4Addr::new([10, 0, 0, 1]),
    };
    let driver = LoggingDriver {
        transmitted: Vec::new(),
    };
    let mut engine = Engine::new(interface, driver).unwrap();

    // Transmit only accepts multicast/broadcast/localhost/our-own
    // destinations; a multicast group needs no ARP resolution at all.
    let peer_ip = IpV4Addr::new([239, 1, 2, 3]);

    let metadata = Metadata {
        peer_address: peer_ip,
        peer_port: 9382,
        local_port: 1025,
        destination_address: peer_ip,
        timestamp: 0,
    };

    let payload_len = MAX_UDP_CHUNK * 3 + 17;
    let payload = vec![0xABu8; payload_len];
    assert_eq!(engine.transmit_udp_datagram(&metadata, &payload), Status::Ok);

    let expected_chunks = (payload_len + MAX_UDP_CHUNK - 1) / MAX_UDP_CHUNK;
    assert_eq!(engine.statistics().udp.tx.count as usize, expected_chunks);
}

use crate::logging;
use chrono::prelude::*;

use slog::Logger;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/***********************************************/
/****************** Fixtures *******************/
/***********************************************/
/// AODV dump of three nodes at 1s and 2s. At 2s node 2 is still searching for node 0.
pub const AODV_TABLES: &str = "Node: 0; Time: +1s, Local time: +1s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.2\t10.1.1.2\t10.1.1.1\tUP\t+2.99s\t1
10.1.1.255\t10.1.1.255\t10.1.1.1\tUP\t+Inf\t1
127.0.0.1\t127.0.0.1\t127.0.0.1\tUP\t+Inf\t1

Node: 1; Time: +1s, Local time: +1s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.1\t10.1.1.1\t10.1.1.2\tUP\t+2.99s\t1
10.1.1.3\t10.1.1.3\t10.1.1.2\tUP\t+2.99s\t1

Node: 2; Time: +1s, Local time: +1s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.2\t10.1.1.2\t10.1.1.3\tUP\t+2.99s\t1

Node: 0; Time: +2s, Local time: +2s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.2\t10.1.1.2\t10.1.1.1\tUP\t+2.99s\t1
10.1.1.3\t10.1.1.2\t10.1.1.1\tUP\t+2.5s\t2
127.0.0.1\t127.0.0.1\t127.0.0.1\tUP\t+Inf\t1

Node: 1; Time: +2s, Local time: +2s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.1\t10.1.1.1\t10.1.1.2\tUP\t+2.99s\t1
10.1.1.3\t10.1.1.3\t10.1.1.2\tUP\t+2.99s\t1

Node: 2; Time: +2s, Local time: +2s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.1\t10.1.1.2\t10.1.1.3\tIN_SEARCH\t+0.5s\t2
10.1.1.2\t10.1.1.2\t10.1.1.3\tUP\t+2.99s\t1
10.1.1.7\t10.1.1.7\t10.1.1.3\tDOWN\t+0s\t1

";

/// AODV dump of a three node chain at 1s and 2s, written through list routing. Every node
/// block starts with a list routing header, then the header of the AODV table itself.
pub const LIST_ROUTING_TABLES: &str = "Node: 0, Time: +1s, Local time: +1s, Ipv4ListRouting table
  Priority: 100 Protocol: ns3::aodv::RoutingProtocol
Node: 0; Time: +1s, Local time: +1s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.2\t10.1.1.2\t10.1.1.1\tUP\t+2.99s\t1
10.1.1.3\t10.1.1.2\t10.1.1.1\tUP\t+2.5s\t2

Node: 1, Time: +1s, Local time: +1s, Ipv4ListRouting table
  Priority: 100 Protocol: ns3::aodv::RoutingProtocol
Node: 1; Time: +1s, Local time: +1s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.1\t10.1.1.1\t10.1.1.2\tUP\t+2.99s\t1
10.1.1.3\t10.1.1.3\t10.1.1.2\tUP\t+2.99s\t1

Node: 2, Time: +1s, Local time: +1s, Ipv4ListRouting table
  Priority: 100 Protocol: ns3::aodv::RoutingProtocol
Node: 2; Time: +1s, Local time: +1s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.1\t10.1.1.2\t10.1.1.3\tUP\t+2.5s\t2
10.1.1.2\t10.1.1.2\t10.1.1.3\tUP\t+2.99s\t1

Node: 0, Time: +2s, Local time: +2s, Ipv4ListRouting table
  Priority: 100 Protocol: ns3::aodv::RoutingProtocol
Node: 0; Time: +2s, Local time: +2s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.2\t10.1.1.2\t10.1.1.1\tUP\t+2.99s\t1

Node: 1, Time: +2s, Local time: +2s, Ipv4ListRouting table
  Priority: 100 Protocol: ns3::aodv::RoutingProtocol
Node: 1; Time: +2s, Local time: +2s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.1\t10.1.1.1\t10.1.1.2\tUP\t+2.99s\t1
10.1.1.3\t10.1.1.3\t10.1.1.2\tUP\t+2.99s\t1

Node: 2, Time: +2s, Local time: +2s, Ipv4ListRouting table
  Priority: 100 Protocol: ns3::aodv::RoutingProtocol
Node: 2; Time: +2s, Local time: +2s, AODV Routing table

AODV Routing table
Destination\tGateway\tInterface\tFlag\tExpire\tHops
10.1.1.2\t10.1.1.2\t10.1.1.3\tUP\t+2.99s\t1

";

/// OLSR dump of a three node chain at 1s.
pub const OLSR_TABLES: &str = "Node: 0, Time: +1s, Local time: +1s, OLSR Routing table
Destination\t\tNextHop\t\tInterface\tDistance
10.1.1.2\t\t10.1.1.2\t\t1\t\t1
10.1.1.3\t\t10.1.1.2\t\t1\t\t2

Node: 1, Time: +1s, Local time: +1s, OLSR Routing table
Destination\t\tNextHop\t\tInterface\tDistance
10.1.1.1\t\t10.1.1.1\t\t1\t\t1
10.1.1.3\t\t10.1.1.3\t\t1\t\t1

Node: 2, Time: +1s, Local time: +1s, OLSR Routing table
Destination\t\tNextHop\t\tInterface\tDistance
10.1.1.2\t\t10.1.1.2\t\t1\t\t1
10.1.1.1\t\t10.1.1.2\t\t1\t\t2

";

/// DSDV dump of a three node chain at 1s.
pub const DSDV_TABLES: &str = "Node: 0, Time: +1s, Local time: +1s, DSDV Routing table
DSDV Routing table
Destination         Gateway        Interface      HopCount  SeqNum    LifeTime       SettlingTime
127.0.0.1           127.0.0.1      127.0.0.1      0         0         +1s            +0s
10.1.1.2            10.1.1.2       10.1.1.1       1         4         +1s            +0s
10.1.1.3            10.1.1.2       10.1.1.1       2         4         +1s            +0s

Node: 1, Time: +1s, Local time: +1s, DSDV Routing table
DSDV Routing table
Destination         Gateway        Interface      HopCount  SeqNum    LifeTime       SettlingTime
10.1.1.1            10.1.1.1       10.1.1.2       1         2         +1s            +0s
10.1.1.3            10.1.1.3       10.1.1.2       1         6         +1s            +0s

Node: 2, Time: +1s, Local time: +1s, DSDV Routing table
DSDV Routing table
Destination         Gateway        Interface      HopCount  SeqNum    LifeTime       SettlingTime
10.1.1.1            10.1.1.2       10.1.1.3       2         2         +1s            +0s
10.1.1.2            10.1.1.2       10.1.1.3       1         4         +1s            +0s

";

/// Network state log of four nodes (one sink, one source) at 1s and 2s.
pub const STATE_LOG: &str = "TIME 1
NUM_NODES 4
NUM_SINKS 1
THROUGHPUT 0
POSITIONS
0 10 20 0
1 110 20 0
2 210 20 0
3 310 20 0
TIME 2
NUM_NODES 4
NUM_SINKS 1
THROUGHPUT 12.5
POSITIONS
0 10 25.5 0
1 110 20 0
2 210 20 0
3 310 20 0
";

/// Flow monitor output with two data flows and two control flows.
pub const FLOWMON_XML: &str = r#"<?xml version="1.0" ?>
<FlowMonitor>
  <FlowStats>
    <Flow flowId="1" timeFirstTxPacket="+1e+09ns" timeFirstRxPacket="+1.01e+09ns" timeLastTxPacket="+1.1e+10ns" timeLastRxPacket="+1.1e+10ns" delaySum="+4e+08ns" jitterSum="+0ns" lastDelay="+1e+06ns" txBytes="40000" rxBytes="36000" txPackets="400" rxPackets="360" lostPackets="40" timesForwarded="720">
      <delayHistogram nBins="0" >
      </delayHistogram>
    </Flow>
    <Flow flowId="2" timeFirstTxPacket="+2e+09ns" timeFirstRxPacket="+2.01e+09ns" timeLastTxPacket="+1.2e+10ns" timeLastRxPacket="+1.2e+10ns" delaySum="+1e+08ns" jitterSum="+0ns" lastDelay="+1e+06ns" txBytes="50000" rxBytes="50000" txPackets="500" rxPackets="500" lostPackets="0" timesForwarded="500">
    </Flow>
    <Flow flowId="3" timeFirstTxPacket="+5e+08ns" timeFirstRxPacket="+5.1e+08ns" timeLastTxPacket="+1.2e+10ns" timeLastRxPacket="+1.2e+10ns" delaySum="+1e+06ns" jitterSum="+0ns" lastDelay="+1e+04ns" txBytes="4000" rxBytes="3200" txPackets="50" rxPackets="40" lostPackets="10" timesForwarded="0">
    </Flow>
    <Flow flowId="4" timeFirstTxPacket="+5e+08ns" timeFirstRxPacket="+5.1e+08ns" timeLastTxPacket="+1.2e+10ns" timeLastRxPacket="+1.2e+10ns" delaySum="+1e+06ns" jitterSum="+0ns" lastDelay="+1e+04ns" txBytes="8000" rxBytes="8000" txPackets="100" rxPackets="100" lostPackets="0" timesForwarded="0">
    </Flow>
  </FlowStats>
  <Ipv4FlowClassifier>
    <Flow flowId="1" sourceAddress="10.1.1.3" destinationAddress="10.1.1.1" protocol="17" sourcePort="49153" destinationPort="9" />
    <Flow flowId="2" sourceAddress="10.1.1.4" destinationAddress="10.1.1.2" protocol="17" sourcePort="49153" destinationPort="9" />
    <Flow flowId="3" sourceAddress="10.1.1.1" destinationAddress="10.1.1.255" protocol="17" sourcePort="654" destinationPort="654" />
    <Flow flowId="4" sourceAddress="10.1.1.2" destinationAddress="10.1.1.255" protocol="17" sourcePort="698" destinationPort="698" />
  </Ipv4FlowClassifier>
</FlowMonitor>
"#;

/// Packet trace with OLSR control traffic and two payload transmissions from node 2.
pub const OLSR_TRACE: &str = "t 0.5 /NodeList/0/DeviceList/0/$ns3::WifiNetDevice/Phy/State/Tx DsssRate1Mbps ns3::Ipv4Header (tos 0x0 ttl 1 id 0 protocol 17 offset (bytes) 0 flags [none] length: 76 10.1.1.1 > 10.1.1.255) ns3::UdpHeader (length: 56 698 > 698) ns3::olsr::PacketHeader (len 48 seqNumber 0)
r 0.5 /NodeList/1/DeviceList/0/$ns3::WifiNetDevice/Phy/State/RxOk DsssRate1Mbps ns3::Ipv4Header (tos 0x0 ttl 1 id 0 protocol 17 offset (bytes) 0 flags [none] length: 76 10.1.1.1 > 10.1.1.255) ns3::UdpHeader (length: 56 698 > 698) ns3::olsr::PacketHeader (len 48 seqNumber 0)
t 1.0 /NodeList/2/DeviceList/0/$ns3::WifiNetDevice/Phy/State/Tx DsssRate11Mbps ns3::Ipv4Header (tos 0x0 ttl 64 id 0 protocol 17 offset (bytes) 0 flags [none] length: 92 10.1.1.3 > 10.1.1.1) ns3::UdpHeader (length: 72 49153 > 9) Payload (size=64)
t 1.2 /NodeList/1/DeviceList/0/$ns3::WifiNetDevice/Phy/State/Tx DsssRate11Mbps ns3::Ipv4Header (tos 0x0 ttl 63 id 0 protocol 17 offset (bytes) 0 flags [none] length: 92 10.1.1.3 > 10.1.1.1) ns3::UdpHeader (length: 72 49153 > 9) Payload (size=64)
t 1.5 /NodeList/1/DeviceList/0/$ns3::WifiNetDevice/Phy/State/Tx DsssRate1Mbps ns3::Ipv4Header (tos 0x0 ttl 1 id 1 protocol 17 offset (bytes) 0 flags [none] length: 100 10.1.1.2 > 10.1.1.255) ns3::UdpHeader (length: 80 698 > 698) ns3::olsr::PacketHeader (len 72 seqNumber 1)
t 2.0 /NodeList/2/DeviceList/0/$ns3::WifiNetDevice/Phy/State/Tx DsssRate11Mbps ns3::Ipv4Header (tos 0x0 ttl 64 id 1 protocol 17 offset (bytes) 0 flags [none] length: 108 10.1.1.3 > 10.1.1.1) ns3::UdpHeader (length: 88 49153 > 9) Payload (size=80)
t 2.5 /NodeList/0/DeviceList/0/$ns3::WifiNetDevice/Phy/State/Tx DsssRate1Mbps ns3::Ipv4Header (tos 0x0 ttl 1 id 2 protocol 17 offset (bytes) 0 flags [none] length: 100 10.1.1.1 > 10.1.1.255) ns3::UdpHeader (length: 80 698 > 698) ns3::olsr::PacketHeader (len 72 seqNumber 2)
";

/***********************************************/
/***************  Test Data Types  *************/
/***********************************************/
pub struct TestSetup {
    pub test_name: String,
    pub work_dir: String,
    pub log_file: String,
    pub logger: Logger,
}

/*******************************************
*********** Utility functions *************
********************************************/
pub fn get_tests_root() -> String {
    env::var("MANET_TEST_DIR").unwrap_or_else(|_| {
        format!("{}{}", env::temp_dir().display(), std::path::MAIN_SEPARATOR)
    })
}

pub fn create_test_dir(test_name: &str) -> String {
    let test_dir_path = format!("{}{}", &get_tests_root(), test_name);
    let test_dir = Path::new(&test_dir_path);

    if !test_dir.exists() {
        fs::create_dir_all(&test_dir_path).unwrap_or_else(|_| {
            panic!("Unable to create test results directory {}", test_dir_path)
        });
    }

    test_dir_path
}

/// Writes a fixture into the work directory and returns its path.
pub fn write_test_file(work_dir: &str, file_name: &str, content: &str) -> String {
    let file_pb = PathBuf::from(work_dir).join(file_name);
    fs::write(&file_pb, content).expect("Could not write test file");
    format!("{}", file_pb.display())
}

pub fn setup(base_name: &str, log_to_term: bool) -> TestSetup {
    let dir_name = format!(
        "{}_{}",
        base_name.to_lowercase(),
        Utc::now().timestamp_nanos()
    );
    let work_dir = create_test_dir(&dir_name);
    let log_file = format!("{}{}{}.log", work_dir, std::path::MAIN_SEPARATOR, base_name);
    let logger = logging::create_logger(&log_file, log_to_term).expect("Failed to create logger");

    TestSetup {
        test_name: base_name.into(),
        work_dir,
        log_file,
        logger,
    }
}

pub fn teardown(data: TestSetup) {
    //Remove the leftover logs and files in the work directory
    drop(data.logger);
    fs::remove_dir_all(&data.work_dir).expect("Failed to remove results directory");
}

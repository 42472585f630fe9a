// LAN-backed radio for TastySnake
// Discovery via UDP broadcast beacons, links via TCP
//
// "Enabled" means switched on with a usable IPv4 interface, "discoverable"
// means broadcasting beacons for a bounded time.

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::channel::{DataChannel, LinkRole};
use super::listener::{ChannelErrorCode, DiscoverySink, LinkListener};
use super::peer::Peer;
use super::protocol::Beacon;
use super::{DiscoverableOutcome, EnableOutcome, RadioAdapter, RadioError};
use crate::config::NetworkConfig;

/// Identity this device announces to others
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDevice {
    pub id: String,
    pub name: String,
}

impl LocalDevice {
    /// Random id; `name` falls back to "snake-<id>" when empty
    pub fn generate(name: &str) -> Self {
        let id = generate_short_device_id();
        let name = if name.trim().is_empty() {
            format!("snake-{}", id)
        } else {
            name.trim().to_string()
        };
        Self { id, name }
    }
}

/// Generate a short, human-friendly device id (4 uppercase letters)
fn generate_short_device_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| {
            let idx = rng.gen_range(0..26);
            (b'A' + idx) as char
        })
        .collect()
}

/// Preference order for interfaces: home network, corporate, VPN, anything else
fn rank_ipv4(ip: &Ipv4Addr) -> u8 {
    let octets = ip.octets();
    if octets[0] == 192 && octets[1] == 168 {
        0
    } else if octets[0] == 172 && (16..=31).contains(&octets[1]) {
        1
    } else if octets[0] == 10 {
        2
    } else {
        3
    }
}

/// Best non-loopback IPv4 address of this host, if any
pub fn lan_ipv4() -> Option<Ipv4Addr> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            warn!("Failed to get network interfaces: {}", e);
            return None;
        }
    };

    interfaces
        .into_iter()
        .filter_map(|iface| match iface.addr.ip() {
            std::net::IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
            _ => None,
        })
        .min_by_key(rank_ipv4)
}

/// Decode a datagram from the discovery port into the peer it announces.
///
/// Returns `None` for garbage and for our own beacons.
fn peer_from_beacon(own_id: &str, bytes: &[u8], from: SocketAddr) -> Option<(String, Peer)> {
    let beacon = Beacon::from_bytes(bytes).ok()?;
    if beacon.device_id == own_id {
        return None;
    }
    let address = SocketAddr::new(from.ip(), beacon.port);
    Some((beacon.device_id, Peer::new(address.to_string(), beacon.name)))
}

#[derive(Default)]
struct Shared {
    sink: Option<DiscoverySink>,
    scan: Option<JoinHandle<()>>,
    // Kept across scans: an aborted scan task may still hold the port
    scan_socket: Option<Arc<UdpSocket>>,
    beacon: Option<JoinHandle<()>>,
    server: Option<JoinHandle<()>>,
    listener: Option<Arc<TcpListener>>,
    server_port: Option<u16>,
    /// Bumped per accept task so a retired one cannot clear its successor
    server_generation: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Forget a listener whose accept task gave up, so the next `run_server` binds afresh
fn retire_server(shared: &Mutex<Shared>, generation: u64) {
    let mut shared = lock(shared);
    if shared.server_generation == generation {
        shared.server = None;
        shared.listener = None;
        shared.server_port = None;
    }
}

/// Accept one inbound connection and run the handshake on it
async fn accept_link(
    server: &TcpListener,
    listener: &LinkListener,
    device: &LocalDevice,
) -> Result<DataChannel, (ChannelErrorCode, String)> {
    let (stream, remote) = server
        .accept()
        .await
        .map_err(|e| (ChannelErrorCode::ServerAccept, e.to_string()))?;
    listener.server_link_ready(remote.to_string());

    stream
        .set_nodelay(true)
        .map_err(|e| (ChannelErrorCode::StreamCreate, e.to_string()))?;

    DataChannel::handshake(
        stream,
        LinkRole::Server,
        remote.to_string(),
        &device.id,
        &device.name,
    )
    .await
    .map_err(|failure| (failure.code, failure.source.to_string()))
}

/// Radio adapter over the local network.
///
/// Socket setup happens on the caller's thread; the caller must be inside
/// a tokio runtime.
pub struct LanRadio {
    device: LocalDevice,
    config: NetworkConfig,
    powered: AtomicBool,
    shared: Arc<Mutex<Shared>>,
}

impl LanRadio {
    pub fn new(device: LocalDevice, config: NetworkConfig) -> Self {
        let powered = AtomicBool::new(config.powered_on_start);
        Self {
            device,
            config,
            powered,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    pub fn device(&self) -> &LocalDevice {
        &self.device
    }

    /// Port the game server is accepting on, while it runs
    pub fn server_port(&self) -> Option<u16> {
        lock(&self.shared).server_port
    }

    fn scan_socket(&self) -> io::Result<Arc<UdpSocket>> {
        if let Some(socket) = lock(&self.shared).scan_socket.clone() {
            return Ok(socket);
        }
        let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.config.discovery_port))?;
        socket.set_nonblocking(true)?;
        let socket = Arc::new(UdpSocket::from_std(socket)?);
        lock(&self.shared).scan_socket = Some(socket.clone());
        Ok(socket)
    }

    fn server_socket(&self) -> io::Result<Arc<TcpListener>> {
        if let Some(server) = lock(&self.shared).listener.clone() {
            return Ok(server);
        }
        let server = std::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.config.listen_port))?;
        server.set_nonblocking(true)?;
        let server = Arc::new(TcpListener::from_std(server)?);
        lock(&self.shared).listener = Some(server.clone());
        Ok(server)
    }

    fn spawn_beacon(&self, duration: Duration) -> Result<(), RadioError> {
        let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket)?;

        let shared = self.shared.clone();
        let device = self.device.clone();
        let target = SocketAddr::from((Ipv4Addr::BROADCAST, self.config.discovery_port));
        let interval = Duration::from_millis(self.config.beacon_interval_ms.max(1));

        let task = tokio::spawn(async move {
            let deadline = Instant::now() + duration;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if Instant::now() >= deadline {
                    debug!("Discoverable window closed");
                    break;
                }
                // Nothing to announce until the server is bound
                let port = lock(&shared).server_port;
                let Some(port) = port else {
                    continue;
                };
                let beacon = Beacon {
                    device_id: device.id.clone(),
                    name: device.name.clone(),
                    port,
                };
                match beacon.to_bytes() {
                    Ok(bytes) => {
                        if let Err(e) = socket.send_to(&bytes, target).await {
                            warn!("Failed to send beacon: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to encode beacon: {}", e),
                }
            }
        });

        if let Some(old) = lock(&self.shared).beacon.replace(task) {
            old.abort();
        }
        Ok(())
    }
}

impl RadioAdapter for LanRadio {
    fn is_enabled(&self) -> bool {
        self.powered.load(Ordering::Relaxed)
    }

    fn request_enable(&self) -> impl Future<Output = EnableOutcome> + Send {
        async move {
            match lan_ipv4() {
                Some(ip) => {
                    info!("Radio on, visible as {}", ip);
                    self.powered.store(true, Ordering::Relaxed);
                    EnableOutcome::Approved
                }
                None => {
                    warn!("No usable network interface, radio stays off");
                    EnableOutcome::Declined
                }
            }
        }
    }

    fn request_discoverable(
        &self,
        duration: Duration,
    ) -> impl Future<Output = DiscoverableOutcome> + Send {
        async move {
            if !self.config.allow_discoverable || !self.is_enabled() {
                return DiscoverableOutcome::Declined;
            }
            match self.spawn_beacon(duration) {
                Ok(()) => DiscoverableOutcome::Approved(duration),
                Err(e) => {
                    warn!("Failed to start beacon: {}", e);
                    DiscoverableOutcome::Declined
                }
            }
        }
    }

    fn start_discovery(&self) -> Result<(), RadioError> {
        if !self.is_enabled() {
            return Err(RadioError::Disabled);
        }

        let socket = self.scan_socket()?;

        let shared = self.shared.clone();
        let own_id = self.device.id.clone();

        let task = tokio::spawn(async move {
            // Each device is reported once per scan, like a radio inquiry
            let mut seen = HashSet::new();
            let mut buf = [0u8; 512];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("Discovery socket error: {}", e);
                        break;
                    }
                };
                let Some((device_id, peer)) = peer_from_beacon(&own_id, &buf[..len], from) else {
                    continue;
                };
                if !seen.insert(device_id) {
                    continue;
                }
                let sink = lock(&shared).sink.clone();
                if let Some(sink) = sink {
                    debug!("Beacon from {}", peer);
                    sink.deliver(peer);
                }
            }
        });

        if let Some(old) = lock(&self.shared).scan.replace(task) {
            old.abort();
        }
        Ok(())
    }

    fn cancel_discovery(&self) {
        if let Some(scan) = lock(&self.shared).scan.take() {
            scan.abort();
        }
    }

    fn register_discovery(&self, sink: DiscoverySink) {
        lock(&self.shared).sink = Some(sink);
    }

    fn unregister_discovery(&self) {
        lock(&self.shared).sink = None;
    }

    fn connect(&self, peer: &Peer, listener: LinkListener) {
        let peer = peer.clone();
        let device = self.device.clone();

        tokio::spawn(async move {
            let addr: SocketAddr = match peer.address.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    listener.error(
                        ChannelErrorCode::ClientConnect,
                        format!("bad address {}: {}", peer.address, e),
                    );
                    return;
                }
            };

            let stream = match TcpStream::connect(addr).await {
                Ok(stream) => stream,
                Err(e) => {
                    listener.error(ChannelErrorCode::ClientConnect, e.to_string());
                    return;
                }
            };
            listener.client_link_established(peer.clone());

            if let Err(e) = stream.set_nodelay(true) {
                listener.error(ChannelErrorCode::StreamCreate, e.to_string());
                return;
            }

            match DataChannel::handshake(stream, LinkRole::Client, peer.address, &device.id, &device.name)
                .await
            {
                Ok(channel) => listener.data_channel_ready(channel),
                Err(failure) => listener.error(failure.code, failure.source.to_string()),
            }
        });
    }

    /// (Re)arm the server. The bound socket is reused while it is alive so
    /// a restart never races the aborted accept task for the port.
    fn run_server(&self, listener: LinkListener) {
        let server = match self.server_socket() {
            Ok(server) => server,
            Err(e) => {
                listener.error(ChannelErrorCode::SocketCreate, e.to_string());
                return;
            }
        };
        let port = match server.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => {
                listener.error(ChannelErrorCode::SocketCreate, e.to_string());
                return;
            }
        };
        info!("Game server listening on port {}", port);

        let device = self.device.clone();
        let handle = self.shared.clone();
        let mut shared = lock(&self.shared);
        if let Some(old) = shared.server.take() {
            old.abort();
        }
        shared.server_generation += 1;
        let generation = shared.server_generation;
        shared.server_port = Some(port);

        shared.server = Some(tokio::spawn(async move {
            match accept_link(&server, &listener, &device).await {
                Ok(channel) => listener.data_channel_ready(channel),
                Err((code, detail)) => {
                    retire_server(&handle, generation);
                    listener.error(code, detail);
                }
            }
        }));
    }

    fn stop_server(&self) {
        let mut shared = lock(&self.shared);
        shared.server_generation += 1;
        shared.server_port = None;
        shared.listener = None;
        if let Some(server) = shared.server.take() {
            server.abort();
        }
    }
}

impl Drop for LanRadio {
    fn drop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.sink = None;
        shared.scan_socket = None;
        shared.listener = None;
        for task in [shared.scan.take(), shared.beacon.take(), shared.server.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::{LinkEvent, RadioEvent};
    use tokio::sync::mpsc;

    fn powered_radio(name: &str) -> LanRadio {
        let config = NetworkConfig {
            powered_on_start: true,
            listen_port: 0,
            ..NetworkConfig::default()
        };
        LanRadio::new(LocalDevice::generate(name), config)
    }

    #[test]
    fn test_generated_name_uses_device_id() {
        let device = LocalDevice::generate("  ");
        assert_eq!(device.id.len(), 4);
        assert!(device.id.chars().all(|c| c.is_ascii_uppercase()));
        assert_eq!(device.name, format!("snake-{}", device.id));

        assert_eq!(LocalDevice::generate("Steven").name, "Steven");
    }

    #[test]
    fn test_interface_ranking_prefers_home_network() {
        let mut ips = vec![
            Ipv4Addr::new(10, 8, 0, 2),
            Ipv4Addr::new(100, 64, 1, 1),
            Ipv4Addr::new(192, 168, 1, 20),
            Ipv4Addr::new(172, 20, 0, 5),
        ];
        ips.sort_by_key(rank_ipv4);
        assert_eq!(ips[0], Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(ips[1], Ipv4Addr::new(172, 20, 0, 5));
        assert_eq!(ips[3], Ipv4Addr::new(100, 64, 1, 1));
    }

    #[test]
    fn test_beacon_decoding_skips_own_and_garbage() {
        let beacon = Beacon {
            device_id: "WXYZ".to_string(),
            name: "snake-WXYZ".to_string(),
            port: 5000,
        };
        let bytes = beacon.to_bytes().unwrap();
        let from: SocketAddr = "192.168.1.7:61000".parse().unwrap();

        let (id, peer) = peer_from_beacon("ABCD", &bytes, from).unwrap();
        assert_eq!(id, "WXYZ");
        assert_eq!(peer, Peer::new("192.168.1.7:5000", "snake-WXYZ"));

        assert!(peer_from_beacon("WXYZ", &bytes, from).is_none());
        assert!(peer_from_beacon("ABCD", b"hi", from).is_none());
    }

    #[tokio::test]
    async fn test_discovery_requires_power() {
        let radio = LanRadio::new(LocalDevice::generate(""), NetworkConfig::default());
        assert!(!radio.is_enabled());
        assert!(matches!(radio.start_discovery(), Err(RadioError::Disabled)));
    }

    #[tokio::test]
    async fn test_discoverable_declined_when_disallowed() {
        let config = NetworkConfig {
            powered_on_start: true,
            allow_discoverable: false,
            ..NetworkConfig::default()
        };
        let radio = LanRadio::new(LocalDevice::generate(""), config);
        let outcome = radio.request_discoverable(Duration::from_secs(120)).await;
        assert_eq!(outcome, DiscoverableOutcome::Declined);
    }

    #[tokio::test]
    async fn test_connect_and_accept_over_loopback() {
        let host = powered_radio("host");
        let guest = powered_radio("guest");

        let (host_tx, mut host_rx) = mpsc::unbounded_channel::<RadioEvent>();
        let (guest_tx, mut guest_rx) = mpsc::unbounded_channel::<RadioEvent>();

        host.run_server(LinkListener::new(host_tx.downgrade()));
        let port = host.server_port().unwrap();

        guest.connect(
            &Peer::new(format!("127.0.0.1:{}", port), "host"),
            LinkListener::new(guest_tx.downgrade()),
        );

        match guest_rx.recv().await {
            Some(RadioEvent::Link(LinkEvent::ClientLinkEstablished { peer })) => {
                assert_eq!(peer.name, "host");
            }
            other => panic!("unexpected guest event: {:?}", other),
        }
        match guest_rx.recv().await {
            Some(RadioEvent::Link(LinkEvent::DataChannelReady(channel))) => {
                assert_eq!(channel.role(), LinkRole::Client);
                assert_eq!(channel.peer().name, "host");
            }
            other => panic!("unexpected guest event: {:?}", other),
        }

        assert!(matches!(
            host_rx.recv().await,
            Some(RadioEvent::Link(LinkEvent::ServerLinkReady { .. }))
        ));
        match host_rx.recv().await {
            Some(RadioEvent::Link(LinkEvent::DataChannelReady(channel))) => {
                assert_eq!(channel.role(), LinkRole::Server);
                assert_eq!(channel.peer().name, "guest");
            }
            other => panic!("unexpected host event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_to_bad_address_reports_client_connect() {
        let guest = powered_radio("guest");
        let (tx, mut rx) = mpsc::unbounded_channel::<RadioEvent>();

        guest.connect(&Peer::new("not-an-address", "ghost"), LinkListener::new(tx.downgrade()));

        match rx.recv().await {
            Some(RadioEvent::Link(LinkEvent::Error { code, .. })) => {
                assert_eq!(code, ChannelErrorCode::ClientConnect);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_server_is_idempotent() {
        let host = powered_radio("host");
        let (tx, _rx) = mpsc::unbounded_channel::<RadioEvent>();

        host.run_server(LinkListener::new(tx.downgrade()));
        assert!(host.server_port().is_some());

        host.stop_server();
        host.stop_server();
        assert!(host.server_port().is_none());
    }

    #[tokio::test]
    async fn test_scan_restarts_in_same_turn() {
        let port = std::net::UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = NetworkConfig {
            powered_on_start: true,
            discovery_port: port,
            ..NetworkConfig::default()
        };
        let radio = LanRadio::new(LocalDevice::generate("scanner"), config);
        let (tx, mut rx) = mpsc::unbounded_channel::<RadioEvent>();
        radio.register_discovery(DiscoverySink::new(tx.downgrade()));

        // A refresh: cancel and restart without yielding in between
        radio.start_discovery().unwrap();
        radio.cancel_discovery();
        radio.start_discovery().unwrap();
        radio.start_discovery().unwrap();

        let beacon = Beacon {
            device_id: "WXYZ".to_string(),
            name: "snake-WXYZ".to_string(),
            port: 5000,
        };
        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        sender
            .send_to(&beacon.to_bytes().unwrap(), (Ipv4Addr::LOCALHOST, port))
            .await
            .unwrap();

        match rx.recv().await {
            Some(RadioEvent::PeerDiscovered(peer)) => {
                assert_eq!(peer, Peer::new("127.0.0.1:5000", "snake-WXYZ"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rearming_server_keeps_its_port() {
        let host = powered_radio("host");
        let (tx, _rx) = mpsc::unbounded_channel::<RadioEvent>();

        host.run_server(LinkListener::new(tx.downgrade()));
        let first = host.server_port().unwrap();
        host.run_server(LinkListener::new(tx.downgrade()));

        assert_eq!(host.server_port(), Some(first));
    }

    #[tokio::test]
    async fn test_server_rearms_after_failed_inbound() {
        let host = powered_radio("host");
        let (tx, mut rx) = mpsc::unbounded_channel::<RadioEvent>();
        host.run_server(LinkListener::new(tx.downgrade()));
        let port = host.server_port().unwrap();

        // Connects and hangs up before the handshake
        drop(TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap());

        assert!(matches!(
            rx.recv().await,
            Some(RadioEvent::Link(LinkEvent::ServerLinkReady { .. }))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(RadioEvent::Link(LinkEvent::Error { .. }))
        ));
        // No longer advertised once the accept task gave up
        assert!(host.server_port().is_none());

        host.run_server(LinkListener::new(tx.downgrade()));
        let port = host.server_port().unwrap();

        let guest = powered_radio("guest");
        let (guest_tx, _guest_rx) = mpsc::unbounded_channel::<RadioEvent>();
        guest.connect(
            &Peer::new(format!("127.0.0.1:{}", port), "host"),
            LinkListener::new(guest_tx.downgrade()),
        );

        assert!(matches!(
            rx.recv().await,
            Some(RadioEvent::Link(LinkEvent::ServerLinkReady { .. }))
        ));
        match rx.recv().await {
            Some(RadioEvent::Link(LinkEvent::DataChannelReady(channel))) => {
                assert_eq!(channel.peer().name, "guest");
            }
            other => panic!("unexpected host event: {:?}", other),
        }
    }
}

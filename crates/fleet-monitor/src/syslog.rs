use std::{io, net::SocketAddr, sync::Arc};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::alert::AlertSender;

const MAX_DATAGRAM: usize = 64 * 1024;

/// UDP syslog sink feeding every line to the SSH alert path.
pub struct SyslogListener {
    socket: UdpSocket,
}

impl SyslogListener {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!(addr = %socket.local_addr()?, "syslog listener bound");
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(self, alerts: Arc<AlertSender>, shutdown: CancellationToken) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                res = self.socket.recv_from(&mut buf) => match res {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "syslog receive failed");
                        continue;
                    }
                },
            };

            let raw = String::from_utf8_lossy(&buf[..len]);
            for line in raw.lines().map(strip_priority).filter(|l| !l.trim().is_empty()) {
                trace!(%peer, line, "syslog line");
                if let Err(e) = alerts.send_ssh_alert(line).await {
                    warn!(error = %e, "failed to send ssh alert");
                }
            }
        }
        info!("syslog listener stopped");
    }
}

/// Drop a leading `<PRI>` field, if any.
fn strip_priority(line: &str) -> &str {
    let Some(rest) = line.strip_prefix('<') else {
        return line;
    };
    match rest.split_once('>') {
        Some((pri, msg)) if !pri.is_empty() && pri.bytes().all(|b| b.is_ascii_digit()) => msg,
        _ => line,
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport protocol of a socket table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Tcp6,
    Udp6,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [Protocol::Tcp, Protocol::Tcp6, Protocol::Udp, Protocol::Udp6];

    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Tcp6 => "tcp6",
            Protocol::Udp6 => "udp6",
        }
    }

    /// Protocol name as used by the services database (no IPv6 suffix)
    pub fn service_protocol(&self) -> &'static str {
        match self {
            Protocol::Tcp | Protocol::Tcp6 => "tcp",
            Protocol::Udp | Protocol::Udp6 => "udp",
        }
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Tcp6)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Socket state. UDP sockets reuse the TCP names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TcpState {
    #[default]
    Empty,
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    Closed,
}

impl TcpState {
    /// Map the numeric state column of a kernel socket table.
    ///
    /// Values outside the kernel's range become [`TcpState::Empty`].
    pub fn from_kernel(value: u8) -> Self {
        match value {
            1 => TcpState::Established,
            2 => TcpState::SynSent,
            3 => TcpState::SynRecv,
            4 => TcpState::FinWait1,
            5 => TcpState::FinWait2,
            6 => TcpState::TimeWait,
            7 => TcpState::Close,
            8 => TcpState::CloseWait,
            9 => TcpState::LastAck,
            10 => TcpState::Listen,
            11 => TcpState::Closing,
            _ => TcpState::Empty,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TcpState::Empty => "",
            TcpState::Established => "ESTABLISHED",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynRecv => "SYN_RECV",
            TcpState::FinWait1 => "FIN_WAIT1",
            TcpState::FinWait2 => "FIN_WAIT2",
            TcpState::TimeWait => "TIME_WAIT",
            TcpState::Close => "CLOSE",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::LastAck => "LAST_ACK",
            TcpState::Listen => "LISTEN",
            TcpState::Closing => "CLOSING",
            TcpState::Closed => "CLOSED",
        }
    }
}

/// Lifecycle tag assigned to a tracked record by one reconcile cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    None,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::None => write!(f, "none"),
            Operation::Insert => write!(f, "insert"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// One observed socket, as produced by a poll or kept in the tracked set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionRecord {
    pub protocol: Protocol,
    /// Textual IP, or `*` for the unspecified address
    pub local_address: String,
    /// 0 means unset
    pub local_port: u16,
    pub remote_address: String,
    pub remote_port: u16,
    pub state: TcpState,
    /// Pid observed in the latest poll, 0 when unknown
    pub pid: u32,
    /// Last non-zero pid ever observed for this socket
    pub program_pid: u32,
    pub program_name: Option<String>,
    pub program_command: Option<String>,
    /// Resolved host names, filled out of band
    pub local_host: Option<String>,
    pub remote_host: Option<String>,
    /// Service names of the ports, from the services database
    pub local_service: Option<String>,
    pub remote_service: Option<String>,
    /// Socket inode, 0 when unavailable (e.g. TIME_WAIT)
    pub inode: u64,
    #[serde(skip)]
    pub operation: Operation,
}

impl ConnectionRecord {
    pub fn new(
        protocol: Protocol,
        local_address: impl Into<String>,
        local_port: u16,
        remote_address: impl Into<String>,
        remote_port: u16,
    ) -> Self {
        Self {
            protocol,
            local_address: local_address.into(),
            local_port,
            remote_address: remote_address.into(),
            remote_port,
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: TcpState) -> Self {
        self.state = state;
        self
    }

    pub fn with_inode(mut self, inode: u64) -> Self {
        self.inode = inode;
        self
    }

    /// Attach the owning process; sets both the current and the sticky pid
    pub fn with_process(mut self, pid: u32, name: Option<&str>, command: Option<&str>) -> Self {
        self.pid = pid;
        self.program_pid = pid;
        self.program_name = name.map(str::to_string);
        self.program_command = command.map(str::to_string);
        self
    }

    /// Same socket: inode, ports, protocol and both addresses are equal.
    pub fn equals_exact(&self, other: &ConnectionRecord) -> bool {
        self.inode == other.inode && self.same_endpoints(other)
    }

    /// Same socket when an unknown (0) inode on either side is tolerated.
    pub fn equals_fuzzy(&self, other: &ConnectionRecord) -> bool {
        (self.inode == other.inode || self.inode == 0 || other.inode == 0)
            && self.same_endpoints(other)
    }

    fn same_endpoints(&self, other: &ConnectionRecord) -> bool {
        self.local_port == other.local_port
            && self.remote_port == other.remote_port
            && self.protocol == other.protocol
            && self.remote_address == other.remote_address
            && self.local_address == other.local_address
    }

    /// The fields whose change turns a match into an update.
    ///
    /// Program name and command are assumed to change together with the pid.
    pub fn info_equals(&self, other: &ConnectionRecord) -> bool {
        self.state == other.state && self.pid == other.pid
    }

    /// Fold a newer observation of the same socket into this record.
    pub fn merge_from(&mut self, newer: &ConnectionRecord) {
        self.state = newer.state;
        if self.local_host.is_none() {
            self.local_host = newer.local_host.clone();
        }
        if self.remote_host.is_none() {
            self.remote_host = newer.remote_host.clone();
        }
        self.pid = newer.pid;
        if newer.program_pid != 0 {
            self.program_pid = newer.program_pid;
        }
        if newer.program_name.is_some() {
            self.program_name = newer.program_name.clone();
        }
        if newer.program_command.is_some() {
            self.program_command = newer.program_command.clone();
        }
        self.inode = newer.inode;
    }

    /// State as displayed: UDP sockets only show ESTABLISHED and CLOSED.
    pub fn state_name(&self) -> &'static str {
        if self.protocol.is_tcp() {
            return self.state.name();
        }
        match self.state {
            TcpState::Established | TcpState::Closed => self.state.name(),
            // 7 (CLOSE) is how the kernel reports a bound UDP socket
            _ => "",
        }
    }

    pub fn is_established(&self) -> bool {
        self.state == TcpState::Established
    }

    /// Text of a single display column
    pub fn column_text(&self, column: Column) -> String {
        match column {
            Column::Protocol => self.protocol.name().to_string(),
            Column::LocalHost => self.local_host.clone().unwrap_or_default(),
            Column::LocalAddress => self.local_address.clone(),
            Column::LocalPort => full_port_text(self.local_port, self.local_service.as_deref()),
            Column::State => self.state_name().to_string(),
            Column::RemoteAddress => self.remote_address.clone(),
            Column::RemotePort => full_port_text(self.remote_port, self.remote_service.as_deref()),
            Column::RemoteHost => self.remote_host.clone().unwrap_or_default(),
            Column::Pid => {
                if self.program_pid > 0 {
                    self.program_pid.to_string()
                } else {
                    String::new()
                }
            }
            Column::ProgramName => self.program_name.clone().unwrap_or_default(),
            Column::ProgramCommand => self.program_command.clone().unwrap_or_default(),
        }
    }

    /// Candidate text the filter is evaluated against.
    ///
    /// Every column is padded by three spaces on both sides so that a quoted
    /// filter value such as `" 80 "` can anchor on a whole column.
    pub fn filter_text(&self, columns: &[Column]) -> String {
        let mut text = String::from("   ");
        for column in columns {
            text.push_str(&self.column_text(*column));
            text.push_str("   ");
        }
        text
    }
}

/// Display columns, in their default order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Protocol,
    LocalHost,
    LocalAddress,
    LocalPort,
    State,
    RemoteAddress,
    RemotePort,
    RemoteHost,
    Pid,
    ProgramName,
    ProgramCommand,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Protocol,
        Column::LocalHost,
        Column::LocalAddress,
        Column::LocalPort,
        Column::State,
        Column::RemoteAddress,
        Column::RemotePort,
        Column::RemoteHost,
        Column::Pid,
        Column::ProgramName,
        Column::ProgramCommand,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Column::Protocol => "Protocol",
            Column::LocalHost => "Local Host",
            Column::LocalAddress => "Local Address",
            Column::LocalPort => "Local Port",
            Column::State => "State",
            Column::RemoteAddress => "Remote Address",
            Column::RemotePort => "Remote Port",
            Column::RemoteHost => "Remote Host",
            Column::Pid => "Pid",
            Column::ProgramName => "Program",
            Column::ProgramCommand => "Command",
        }
    }
}

/// `*` for the wildcard port, the decimal value otherwise
pub fn port_text(port: u16) -> String {
    if port > 0 {
        port.to_string()
    } else {
        "*".to_string()
    }
}

/// Port followed by its service name, e.g. `443 https`
pub fn full_port_text(port: u16, service: Option<&str>) -> String {
    match service {
        Some(name) if port > 0 => format!("{port} {name}"),
        _ => port_text(port),
    }
}

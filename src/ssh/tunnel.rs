use crate::error::TunnelError;

pub const DEFAULT_LOCAL_IP: &str = "localhost";

/// Port the relaying ssh server is reached on.
pub const SSH_PORT: u16 = 22;

/// Raw create parameters as they arrive from the command line.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub name: Option<String>,
    pub local_ip: String,
    pub local_port: Option<String>,
    pub remote_host: Option<String>,
    pub remote_port: Option<String>,
    pub proxy: String,
    pub persistent: bool,
}

impl Default for CreateRequest {
    fn default() -> Self {
        Self {
            name: None,
            local_ip: DEFAULT_LOCAL_IP.to_string(),
            local_port: None,
            remote_host: None,
            remote_port: None,
            proxy: String::new(),
            persistent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunnel {
    pub name: String,
    pub local_ip: String,
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
    pub jump_proxy: Option<String>,
    pub persistent: bool,
}

impl Tunnel {
    /// Validate a request under the given name. Nothing is touched on failure.
    pub fn from_request(request: &CreateRequest, name: String) -> Result<Self, TunnelError> {
        let (Some(remote_host), Some(remote_port), Some(local_port)) = (
            present(&request.remote_host),
            present(&request.remote_port),
            present(&request.local_port),
        ) else {
            return Err(TunnelError::Validation(
                "Missing options. --ext_ip, --ext_port and --local_port are required to create a tunnel."
                    .to_string(),
            ));
        };

        validate_name(&name)?;
        validate_host("--local_ip", &request.local_ip)?;
        validate_host("--ext_ip", remote_host)?;

        let jump_proxy = match request.proxy.trim() {
            "" => None,
            proxy => {
                validate_host("--proxy", proxy)?;
                Some(proxy.to_string())
            }
        };

        Ok(Self {
            name,
            local_ip: request.local_ip.clone(),
            local_port: parse_port("--local_port", local_port)?,
            remote_host: remote_host.to_string(),
            remote_port: parse_port("--ext_port", remote_port)?,
            jump_proxy,
            persistent: request.persistent,
        })
    }

    /// Returns the forward spec string for SSH -L option.
    pub fn forward_spec(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.local_ip, self.local_port, self.remote_host, self.remote_port
        )
    }

    /// Arguments passed to ssh, one element per argv entry.
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-N", // No remote command
            "-L",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push(self.forward_spec());
        args.extend(
            [
                "-o",
                "ExitOnForwardFailure=yes",
                "-o",
                "ServerAliveInterval=15", // Keepalive
                "-o",
                "ServerAliveCountMax=3", // Max missed keepalives
                "-p",
            ]
            .into_iter()
            .map(String::from),
        );
        args.push(SSH_PORT.to_string());

        if let Some(ref proxy) = self.jump_proxy {
            args.push(proxy.clone());
        }
        args
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_port(flag: &str, value: &str) -> Result<u16, TunnelError> {
    match value.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(TunnelError::Validation(format!(
            "Invalid {flag} '{value}': expected a port between 1 and 65535"
        ))),
    }
}

/// Names end up inside a unit file name, so only a conservative charset is allowed.
pub fn validate_name(name: &str) -> Result<(), TunnelError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(TunnelError::Validation(format!(
            "Invalid tunnel name '{name}': use letters, digits, '-', '_', '.' or ':'"
        )))
    }
}

fn validate_host(flag: &str, host: &str) -> Result<(), TunnelError> {
    if host.is_empty() {
        return Err(TunnelError::Validation(format!("{flag} cannot be empty")));
    }
    if host.starts_with('-') {
        return Err(TunnelError::Validation(format!(
            "Invalid {flag} '{host}': must not start with '-'"
        )));
    }
    if host.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TunnelError::Validation(format!(
            "Invalid {flag} '{host}': must not contain whitespace"
        )));
    }
    Ok(())
}

/// Check if a local port is available.
pub fn is_port_available(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

use std::fmt::Write as _;
use std::path::Path;

use crate::ssh::tunnel::{self, Tunnel};

pub const UNIT_PREFIX: &str = "simple-tunnel-";
pub const UNIT_SUFFIX: &str = ".service";

/// Seconds systemd waits before restarting a dead tunnel.
const RESTART_SEC: u32 = 5;

/// Full unit name for a tunnel, e.g. `simple-tunnel-db.service`. Used both as
/// the file name and in every systemctl call; the suffix is never left off.
pub fn unit_name(name: &str) -> String {
    format!("{UNIT_PREFIX}{name}{UNIT_SUFFIX}")
}

/// Inverse of [`unit_name`]. Returns `None` for files outside the naming
/// convention, including names no tunnel could have been created with.
pub fn tunnel_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(UNIT_PREFIX)?
        .strip_suffix(UNIT_SUFFIX)
        .filter(|name| tunnel::validate_name(name).is_ok())
}

/// Render the unit file for a tunnel. Same inputs always give the same bytes.
pub fn render(tunnel: &Tunnel, ssh_path: &Path) -> String {
    let mut exec_start = quote_exec_arg(&ssh_path.to_string_lossy());
    for arg in tunnel.ssh_args() {
        exec_start.push(' ');
        exec_start.push_str(&quote_exec_arg(&arg));
    }

    let mut unit = String::new();
    let _ = writeln!(unit, "[Unit]");
    let _ = writeln!(unit, "Description=SSH tunnel for {}", tunnel.name);
    let _ = writeln!(unit);
    let _ = writeln!(unit, "[Service]");
    let _ = writeln!(unit, "ExecStart={exec_start}");
    let _ = writeln!(unit, "RestartSec={RESTART_SEC}");
    let _ = writeln!(unit, "Restart=always");
    let _ = writeln!(unit);
    let _ = writeln!(unit, "[Install]");
    let _ = writeln!(unit, "WantedBy=default.target");
    unit
}

/// Quote one argument for an `ExecStart=` line.
///
/// systemd splits on whitespace, honours double quotes with C-style escapes,
/// and expands `%` specifiers and `$` variables everywhere, so those two are
/// always doubled.
fn quote_exec_arg(arg: &str) -> String {
    let escaped = arg.replace('%', "%%").replace('$', "$$");
    let plain = !escaped.is_empty()
        && escaped
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:=@/+%$".contains(c));
    if plain {
        return escaped;
    }

    let mut quoted = String::with_capacity(escaped.len() + 2);
    quoted.push('"');
    for c in escaped.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

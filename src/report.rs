use serde::Serialize;

use crate::manager::TunnelEntry;

#[derive(Serialize)]
struct Row<'a> {
    name: &'a str,
    status: &'static str,
}

/// Two aligned columns, or a hint when there is nothing to show.
pub fn table(entries: &[TunnelEntry]) -> String {
    if entries.is_empty() {
        return "No tunnels. Create one with --ext_ip, --ext_port and --local_port.\n"
            .to_string();
    }

    let width = entries
        .iter()
        .map(|e| e.name.len())
        .chain(std::iter::once("NAME".len()))
        .max()
        .unwrap_or_default();

    let mut out = format!("{:<width$}  STATUS\n", "NAME");
    for entry in entries {
        out.push_str(&format!(
            "{:<width$}  {}\n",
            entry.name,
            entry.status.label()
        ));
    }
    out
}

pub fn json(entries: &[TunnelEntry]) -> serde_json::Result<String> {
    let rows: Vec<Row> = entries
        .iter()
        .map(|e| Row {
            name: &e.name,
            status: e.status.label(),
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

//! Formatted output helpers for CLI commands.
//!
//! Provides table rendering, size and age formatting, and the compact
//! port notation used in container listings.

use std::io::Write;

use chrono::{DateTime, Utc};
use dockyard_common::constants::SHORT_ID_LENGTH;
use dockyard_model::api::APIPort;
use dockyard_model::state::human_duration;
use serde::Serialize;

/// Formats a byte count with decimal units and four significant digits
/// (e.g. "12.29 kB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value.abs() >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{} {}", significant(value, 4), UNITS[unit])
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn significant(value: f64, digits: usize) -> String {
    let integer_digits = if value.abs() < 1.0 {
        1
    } else {
        value.abs().log10().floor() as usize + 1
    };
    let decimals = digits.saturating_sub(integer_digits);
    let rendered = format!("{value:.decimals$}");
    if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        rendered
    }
}

/// Renders the age of a timestamp, e.g. "3 hours ago".
#[must_use]
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format!("{} ago", human_duration(now - created))
}

/// Shortens an identity for display unless `full` is set.
#[must_use]
pub fn display_id(id: &str, full: bool) -> &str {
    if full {
        id
    } else {
        id.get(..SHORT_ID_LENGTH).unwrap_or(id)
    }
}

/// Renders published ports as `ip:public->private/proto`, or
/// `private/proto` when unpublished.
#[must_use]
pub fn format_ports(ports: &[APIPort]) -> String {
    ports
        .iter()
        .map(|p| {
            if p.public_port == 0 {
                format!("{}/{}", p.private_port, p.port_type)
            } else if p.ip.is_empty() {
                format!("{}->{}/{}", p.public_port, p.private_port, p.port_type)
            } else {
                format!("{}:{}->{}/{}", p.ip, p.public_port, p.private_port, p.port_type)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Writes rows as left-aligned columns separated by three spaces.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_table<W: Write + ?Sized>(
    out: &mut W,
    header: &[&str],
    rows: &[Vec<String>],
) -> std::io::Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let header: Vec<String> = header.iter().map(ToString::to_string).collect();
    for row in std::iter::once(&header).chain(rows) {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i + 1 == row.len() {
                line.push_str(cell);
            } else {
                let width = widths.get(i).copied().unwrap_or_default();
                line.push_str(&format!("{cell:<width$}   "));
            }
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

/// Writes a value as indented JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write + ?Sized, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn format_size_displays_bytes() {
        assert_eq!(format_size(512), "512 B");
    }

    #[test]
    fn format_size_displays_kb() {
        assert_eq!(format_size(12_288), "12.29 kB");
        assert_eq!(format_size(1_000), "1 kB");
    }

    #[test]
    fn format_size_displays_mb() {
        assert_eq!(format_size(131_000_000), "131 MB");
    }

    #[test]
    fn format_size_displays_gb() {
        assert_eq!(format_size(2_147_483_648), "2.147 GB");
    }

    #[test]
    fn format_age_uses_human_duration() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("time");
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).single().expect("time");
        assert_eq!(format_age(created, now), "3 hours ago");
    }

    #[test]
    fn display_id_truncates_unless_full() {
        let id = "4fa6e0f0c6786287e131c3852c58a2e01cc697a68231826813597e4994f1d6e2";
        assert_eq!(display_id(id, false), "4fa6e0f0c678");
        assert_eq!(display_id(id, true), id);
        assert_eq!(display_id("abc", false), "abc");
    }

    #[test]
    fn format_ports_covers_published_and_exposed() {
        let ports = vec![
            APIPort {
                private_port: 80,
                public_port: 49153,
                port_type: "tcp".into(),
                ip: "0.0.0.0".into(),
            },
            APIPort {
                private_port: 53,
                port_type: "udp".into(),
                ..APIPort::default()
            },
        ];
        assert_eq!(format_ports(&ports), "0.0.0.0:49153->80/tcp, 53/udp");
    }

    #[test]
    fn write_table_aligns_columns() {
        let mut out = Vec::new();
        write_table(
            &mut out,
            &["ID", "NAME"],
            &[vec!["abc".into(), "/web".into()], vec!["a".into(), "/db".into()]],
        )
        .expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "ID    NAME\nabc   /web\na     /db\n");
    }
}

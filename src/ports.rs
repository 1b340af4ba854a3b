use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

static OPEN_PORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)/tcp\s+open\b").expect("static regex"));

/// Parse a port range such as `1-6000` (or a single port `443`) into an inclusive range.
pub fn parse_port_range(s: &str) -> Result<RangeInclusive<u16>> {
    let s = s.trim();
    if let Some((a, b)) = s.split_once('-') {
        let start = parse_port_str(a.trim())
            .with_context(|| format!("invalid start in range: {a}"))?;
        let end =
            parse_port_str(b.trim()).with_context(|| format!("invalid end in range: {b}"))?;
        if start > end {
            bail!("invalid range {start}-{end} (start > end)");
        }
        return Ok(start..=end);
    }
    let p = parse_port_str(s).with_context(|| format!("invalid port value: {s}"))?;
    Ok(p..=p)
}

/// Extract open TCP ports from port-scanner output (`<port>/tcp open <service>` lines).
///
/// Lines that don't match are ignored, as are ports outside `range`.
/// The result is deduplicated and ascending.
pub fn parse_open_ports(stdout: &str, range: &RangeInclusive<u16>) -> Vec<u16> {
    stdout
        .lines()
        .filter_map(|line| OPEN_PORT_LINE.captures(line))
        .filter_map(|caps| caps[1].parse::<u16>().ok())
        .filter(|p| range.contains(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}

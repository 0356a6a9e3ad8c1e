use super::types::Section;

/// Counters for one interface line of `/proc/net/dev`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

/// Parses the device table. The two header lines carry no colon and are
/// skipped, as are lines with fewer than 16 counters or non-numeric fields.
pub fn parse_net_dev(text: &str) -> Vec<InterfaceCounters> {
    text.lines()
        .filter_map(|line| {
            let (name, data) = line.split_once(':')?;
            let fields: Vec<u64> = data
                .split_whitespace()
                .map(|raw| raw.parse::<u64>())
                .collect::<Result<_, _>>()
                .ok()?;
            if fields.len() < 16 {
                return None;
            }
            Some(InterfaceCounters {
                name: name.trim().to_string(),
                rx_bytes: fields[0],
                rx_packets: fields[1],
                tx_bytes: fields[8],
                tx_packets: fields[9],
            })
        })
        .collect()
}

/// The `network` section. Totals are `None` when the table was unreadable.
pub fn network_section(interfaces: Option<&[InterfaceCounters]>) -> Section {
    let totals = interfaces.map(|list| {
        list.iter().fold((0u64, 0u64), |(rx, tx), iface| {
            (
                rx.saturating_add(iface.rx_bytes),
                tx.saturating_add(iface.tx_bytes),
            )
        })
    });

    let mut per_interface = Section::new();
    for iface in interfaces.unwrap_or_default() {
        per_interface.set(
            &iface.name,
            Section::new()
                .with("rx_bytes", iface.rx_bytes)
                .with("rx_packets", iface.rx_packets)
                .with("tx_bytes", iface.tx_bytes)
                .with("tx_packets", iface.tx_packets),
        );
    }

    Section::new()
        .with("rx_bytes_total", totals.map(|(rx, _)| rx))
        .with("tx_bytes_total", totals.map(|(_, tx)| tx))
        .with("interfaces", per_interface)
}

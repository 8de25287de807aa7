//! Human-readable formatting for rates shown next to the link stats.

/// Packets per second, e.g. "34 pps".
pub fn pps_to_string(pps: u32) -> String {
    format!("{} pps", pps)
}

/// Bits per second with a unit that keeps the number short.
pub fn bitrate_to_string(bps: u64) -> String {
    if bps >= 1_000_000 {
        format!("{:.1} MBit/s", bps as f64 / 1_000_000.0)
    } else if bps >= 1_000 {
        format!("{:.1} kBit/s", bps as f64 / 1_000.0)
    } else {
        format!("{} Bit/s", bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_units() {
        assert_eq!(bitrate_to_string(500), "500 Bit/s");
        assert_eq!(bitrate_to_string(2_500), "2.5 kBit/s");
        assert_eq!(bitrate_to_string(5_200_000), "5.2 MBit/s");
    }

    #[test]
    fn pps_formatting() {
        assert_eq!(pps_to_string(0), "0 pps");
        assert_eq!(pps_to_string(34), "34 pps");
    }
}

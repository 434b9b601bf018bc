//! Card colors are persisted as hex strings and edited as float RGB.

/// RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl CardColor {
    /// Parse `#RRGGBB` or `RRGGBB`. Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Self {
            red: f64::from((value >> 16) & 0xFF) / 255.0,
            green: f64::from((value >> 8) & 0xFF) / 255.0,
            blue: f64::from(value & 0xFF) / 255.0,
        })
    }

    /// Format as uppercase `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}",
            channel(self.red),
            channel(self.green),
            channel(self.blue)
        )
    }
}

fn channel(component: f64) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Canonicalize a stored hex color, dropping values that do not parse.
pub fn normalize_hex(hex: &str) -> Option<String> {
    CardColor::from_hex(hex).map(|c| c.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_channel_value_round_trips() {
        for v in 0..=255u32 {
            let hex = format!("#{v:02X}{:02X}{:02X}", 255 - v, (v * 7) % 256);
            let color = CardColor::from_hex(&hex).unwrap();
            assert_eq!(color.to_hex(), hex);
        }
    }

    #[test]
    fn accepts_missing_hash_and_lowercase() {
        assert_eq!(normalize_hex("ff7a59").as_deref(), Some("#FF7A59"));
    }

    #[test]
    fn rejects_short_or_non_hex() {
        assert!(CardColor::from_hex("#FFF").is_none());
        assert!(CardColor::from_hex("#GG0000").is_none());
        assert!(CardColor::from_hex("").is_none());
    }
}

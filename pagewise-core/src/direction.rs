use serde::{Deserialize, Serialize};

const RTL_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionMode {
    #[default]
    Auto,
    Ltr,
    Rtl,
}

impl DirectionMode {
    pub fn resolve(self, content: &str) -> Direction {
        match self {
            DirectionMode::Auto => detect_direction(content),
            DirectionMode::Ltr => Direction::Ltr,
            DirectionMode::Rtl => Direction::Rtl,
        }
    }
}

impl std::str::FromStr for DirectionMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(DirectionMode::Auto),
            "ltr" => Ok(DirectionMode::Ltr),
            "rtl" => Ok(DirectionMode::Rtl),
            other => Err(anyhow::anyhow!("unknown direction mode {other:?}")),
        }
    }
}

fn is_hebrew(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c)
}

/// Right-to-left when more than 30% of the characters are Hebrew.
pub fn detect_direction(text: &str) -> Direction {
    let total = text.chars().count();
    if total == 0 {
        return Direction::Ltr;
    }
    let hebrew = text.chars().filter(|&c| is_hebrew(c)).count();
    if hebrew as f64 / total as f64 > RTL_RATIO {
        Direction::Rtl
    } else {
        Direction::Ltr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hebrew_text_reads_right_to_left() {
        assert_eq!(detect_direction("שלום עולם"), Direction::Rtl);
        assert_eq!(detect_direction("hello world"), Direction::Ltr);
        assert_eq!(detect_direction(""), Direction::Ltr);
    }

    #[test]
    fn sparse_hebrew_stays_left_to_right() {
        assert_eq!(detect_direction("a quote: שלום in english prose"), Direction::Ltr);
    }

    #[test]
    fn explicit_modes_override_detection() {
        assert_eq!(DirectionMode::Ltr.resolve("שלום"), Direction::Ltr);
        assert_eq!(DirectionMode::Rtl.resolve("hello"), Direction::Rtl);
        assert_eq!(DirectionMode::Auto.resolve("שלום"), Direction::Rtl);
        assert_eq!("RTL".parse::<DirectionMode>().unwrap(), DirectionMode::Rtl);
        assert!("sideways".parse::<DirectionMode>().is_err());
    }
}

use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Which side of an integer a double bound must lie on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoundDirection {
    Up,   // next_larger_double
    Down, // next_smaller_double
    Both,
}

impl BoundDirection {
    pub const fn includes_up(&self) -> bool {
        matches!(self, Self::Up | Self::Both)
    }

    pub const fn includes_down(&self) -> bool {
        matches!(self, Self::Down | Self::Both)
    }
}

impl FromStr for BoundDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "both" => Ok(Self::Both),
            _ => Err(format!("Invalid direction: {s}")),
        }
    }
}

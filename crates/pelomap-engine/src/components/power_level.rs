/// Power band of an athlete, used to style their marker.
///
/// Bands are absolute watts, lowest first. Recomputed on every update; there
/// is no hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum PowerLevel {
    #[default]
    Z1 = 1,
    Z2 = 2,
    Z3 = 3,
    Z4 = 4,
    Z5 = 5,
    Z6 = 6,
}

impl PowerLevel {
    /// Band for a power reading in watts.
    pub fn from_watts(watts: f32) -> Self {
        if watts < 200.0 {
            Self::Z1
        } else if watts < 250.0 {
            Self::Z2
        } else if watts < 300.0 {
            Self::Z3
        } else if watts < 450.0 {
            Self::Z4
        } else if watts < 600.0 {
            Self::Z5
        } else {
            Self::Z6
        }
    }

    /// Style class suffix (`z1`..`z6`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Z1 => "z1",
            Self::Z2 => "z2",
            Self::Z3 => "z3",
            Self::Z4 => "z4",
            Self::Z5 => "z5",
            Self::Z6 => "z6",
        }
    }

    /// Convert to u8 for protocol serialization.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(PowerLevel::from_watts(0.0), PowerLevel::Z1);
        assert_eq!(PowerLevel::from_watts(199.9), PowerLevel::Z1);
        assert_eq!(PowerLevel::from_watts(200.0), PowerLevel::Z2);
        assert_eq!(PowerLevel::from_watts(250.0), PowerLevel::Z3);
        assert_eq!(PowerLevel::from_watts(300.0), PowerLevel::Z4);
        assert_eq!(PowerLevel::from_watts(450.0), PowerLevel::Z5);
        assert_eq!(PowerLevel::from_watts(599.0), PowerLevel::Z5);
        assert_eq!(PowerLevel::from_watts(600.0), PowerLevel::Z6);
    }

    #[test]
    fn ordering_is_low_to_high() {
        assert!(PowerLevel::Z1 < PowerLevel::Z2);
        assert!(PowerLevel::Z5 < PowerLevel::Z6);
    }

    #[test]
    fn class_names() {
        assert_eq!(PowerLevel::from_watts(320.0).as_str(), "z4");
        assert_eq!(PowerLevel::Z6.as_u8(), 6);
    }
}

use crate::error::DecodeError;

use super::check_len;

/// `53 U0 VW`: course over ground in 0.5 degree steps:
/// `(U & 0x3) * 90 + (VW & 0x3F) * 2 + (U & 0xC) / 8`.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseOverGround {
    pub degrees: f32,
}

impl CourseOverGround {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let u = check_len("CourseOverGround", attr, 0)?;
        let degrees = f32::from(u & 0x03) * 90.0
            + f32::from(data[0] & 0x3F) * 2.0
            + f32::from(u & 0x0C) / 8.0;
        Ok(Self { degrees })
    }

    pub fn encode(&self) -> Vec<u8> {
        let quadrant = ((self.degrees / 90.0).trunc() as u8) & 0x03;
        let remainder = self.degrees - f32::from(quadrant) * 90.0;
        let vw = ((remainder / 2.0).trunc() as u8) & 0x3F;
        let half_steps = (((remainder - f32::from(vw) * 2.0) * 2.0).round() as u8).min(3);
        let u = quadrant | half_steps << 2;
        vec![0x53, u << 4, vw]
    }
}

/// `99 00 XX`: compass variation in whole degrees, as a signed byte.
#[derive(Debug, Clone, PartialEq)]
pub struct CompassVariation {
    pub degrees: i8,
}

impl CompassVariation {
    pub fn decode(attr: u8, data: &[u8]) -> Result<Self, DecodeError> {
        check_len("CompassVariation", attr, 0)?;
        Ok(Self { degrees: data[0] as i8 })
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![0x99, 0x00, self.degrees as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cog_decomposition() {
        // 270 + 42*2 + 4/8 = 354.5 degrees.
        let cog = CourseOverGround::decode(0x70, &[0x2A]).unwrap();
        assert!((cog.degrees - 354.5).abs() < 1e-4);
        assert_eq!(cog.encode(), vec![0x53, 0x70, 0x2A]);
    }

    #[test]
    fn test_cog_quantizes_to_half_degree() {
        let cog = CourseOverGround { degrees: 84.4 };
        let decoded = CourseOverGround::decode(cog.encode()[1] >> 4 << 4, &cog.encode()[2..]).unwrap();
        assert!((decoded.degrees - 84.5).abs() < 1e-4);
    }

    #[test]
    fn test_cog_zero() {
        let cog = CourseOverGround { degrees: 0.0 };
        assert_eq!(cog.encode(), vec![0x53, 0x00, 0x00]);
    }

    #[test]
    fn test_variation_signed() {
        let west = CompassVariation::decode(0x00, &[0xFD]).unwrap();
        assert_eq!(west.degrees, -3);
        assert_eq!(west.encode(), vec![0x99, 0x00, 0xFD]);
        let east = CompassVariation::decode(0x00, &[0x07]).unwrap();
        assert_eq!(east.degrees, 7);
    }
}

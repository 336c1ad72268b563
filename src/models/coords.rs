//! Sky coordinate parsing and spherical geometry.
//!
//! User-supplied coordinates arrive in one of three textual forms, detected
//! from separators and unit markers:
//!
//! - decimal degrees: `193.822`, `+2.894`
//! - sexagesimal: `12:55:17.2 +02:53:39` (RA in hours)
//! - hour-angle markers: `12h55m17.2s +02d53m39s`

use serde::{Deserialize, Serialize};

/// An ICRS sky position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyCoord {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Parse a coordinate pair, auto-detecting the input form.
    pub fn parse(ra: &str, dec: &str) -> Result<Self, String> {
        let ra = ra.trim();
        let dec = dec.trim();

        let ra_deg = if ra.contains('h') {
            parse_hms(ra)? * 15.0
        } else if ra.contains(':') || ra.trim().contains(' ') {
            // sexagesimal RA is in hours
            parse_sexagesimal(ra)? * 15.0
        } else {
            ra.parse::<f64>()
                .map_err(|_| format!("invalid right ascension: `{}`", ra))?
        };

        let dec_deg = if dec.contains('d') {
            parse_dms(dec)?
        } else if dec.contains(':') || dec.trim().contains(' ') {
            parse_sexagesimal(dec)?
        } else {
            dec.parse::<f64>()
                .map_err(|_| format!("invalid declination: `{}`", dec))?
        };

        if !(0.0..360.0).contains(&(ra_deg.rem_euclid(360.0))) && ra_deg.is_nan() {
            return Err(format!("right ascension out of range: {}", ra_deg));
        }
        if !(-90.0..=90.0).contains(&dec_deg) {
            return Err(format!("declination out of range: {}", dec_deg));
        }

        Ok(Self::new(ra_deg.rem_euclid(360.0), dec_deg))
    }

    /// Unit vector on the sphere.
    pub fn unit_vector(&self) -> [f64; 3] {
        let ra = self.ra_deg.to_radians();
        let dec = self.dec_deg.to_radians();
        [dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin()]
    }

    /// Angular separation to another position, in degrees.
    ///
    /// Vincenty formula, accurate at all separations.
    pub fn separation_deg(&self, other: &SkyCoord) -> f64 {
        angular_separation_deg(self.ra_deg, self.dec_deg, other.ra_deg, other.dec_deg)
    }
}

/// Angular distance between two points on the sphere, in degrees.
pub fn angular_separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let d1 = dec1_deg.to_radians();
    let d2 = dec2_deg.to_radians();
    let dl = (ra2_deg - ra1_deg).to_radians();

    let (s1, c1) = d1.sin_cos();
    let (s2, c2) = d2.sin_cos();
    let (sl, cl) = dl.sin_cos();

    let num = ((c2 * sl).powi(2) + (c1 * s2 - s1 * c2 * cl).powi(2)).sqrt();
    let den = s1 * s2 + c1 * c2 * cl;
    num.atan2(den).to_degrees()
}

/// Parse `HHhMMmSS.Ss` into decimal hours.
fn parse_hms(s: &str) -> Result<f64, String> {
    let cleaned = s.replace(['h', 'm'], " ").replace('s', "");
    parse_sexagesimal(&cleaned)
}

/// Parse `+DDdMMmSS.Ss` into decimal degrees.
fn parse_dms(s: &str) -> Result<f64, String> {
    let cleaned = s.replace(['d', 'm'], " ").replace('s', "");
    parse_sexagesimal(&cleaned)
}

/// Parse `A:B:C` or `A B C` (B and C optional) into a decimal value,
/// preserving the sign of the leading component.
fn parse_sexagesimal(s: &str) -> Result<f64, String> {
    let parts: Vec<&str> = s
        .split([':', ' '])
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(format!("invalid sexagesimal value: `{}`", s));
    }

    let first: f64 = parts[0]
        .parse()
        .map_err(|_| format!("invalid sexagesimal value: `{}`", s))?;
    let sign = if parts[0].trim_start().starts_with('-') {
        -1.0
    } else {
        1.0
    };

    let mut value = first.abs();
    let mut scale = 60.0;
    for part in &parts[1..] {
        let v: f64 = part
            .parse()
            .map_err(|_| format!("invalid sexagesimal value: `{}`", s))?;
        value += v / scale;
        scale *= 60.0;
    }
    Ok(sign * value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_degrees() {
        let c = SkyCoord::parse("193.822", "2.89732").unwrap();
        assert!((c.ra_deg - 193.822).abs() < 1e-9);
        assert!((c.dec_deg - 2.89732).abs() < 1e-9);
    }

    #[test]
    fn test_parse_sexagesimal() {
        let c = SkyCoord::parse("12:55:17.3", "+02:53:50.3").unwrap();
        assert!((c.ra_deg - 193.822083).abs() < 1e-3);
        assert!((c.dec_deg - 2.897305).abs() < 1e-3);
    }

    #[test]
    fn test_parse_hour_angle() {
        let c = SkyCoord::parse("12h55m17.3s", "+02d53m50.3s").unwrap();
        assert!((c.ra_deg - 193.822083).abs() < 1e-3);
        assert!((c.dec_deg - 2.897305).abs() < 1e-3);
    }

    #[test]
    fn test_parse_negative_dec() {
        let c = SkyCoord::parse("10:00:00", "-05:30:00").unwrap();
        assert!((c.ra_deg - 150.0).abs() < 1e-9);
        assert!((c.dec_deg + 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(SkyCoord::parse("abc", "10.0").is_err());
        assert!(SkyCoord::parse("10.0", "95.0").is_err());
    }

    #[test]
    fn test_separation_same_point() {
        let c = SkyCoord::new(10.0, 10.0);
        assert!(c.separation_deg(&c) < 1e-12);
    }

    #[test]
    fn test_separation_quadrature() {
        let a = SkyCoord::new(0.0, 0.0);
        let b = SkyCoord::new(90.0, 0.0);
        assert!((a.separation_deg(&b) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_separation_poles() {
        let a = SkyCoord::new(0.0, 90.0);
        let b = SkyCoord::new(0.0, -90.0);
        assert!((a.separation_deg(&b) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_vector_north_pole() {
        let v = SkyCoord::new(0.0, 90.0).unit_vector();
        assert!(v[2] > 0.999999);
    }
}

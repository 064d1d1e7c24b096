//! Warning gradient shared by both axes.

use crate::config::Color;

/// Edge of the green band, degrees.
const GREEN_LIMIT: f64 = 30.0;
/// Edge of the attitude envelope, degrees.
const ENVELOPE_LIMIT: f64 = 90.0;

/// Maps an attitude angle (degrees) onto the instrument's warning gradient.
///
/// Within ±30° the color runs from pure green at level towards yellow, from
/// ±30° to ±90° it runs from yellow to red, and anything outside the envelope
/// is the alarm red. The mapping only looks at `|angle|`, so `+a` and `-a`
/// always share a color.
pub fn color_for(angle: f64) -> Color {
    let magnitude = angle.abs();
    if magnitude <= GREEN_LIMIT {
        let r = (255.0 * magnitude / GREEN_LIMIT) as u8;
        Color::new(r, 0xff, 0x00)
    } else if magnitude <= ENVELOPE_LIMIT {
        let normalized = (magnitude - GREEN_LIMIT) / (ENVELOPE_LIMIT - GREEN_LIMIT);
        let g = (255.0 * (1.0 - normalized)) as u8;
        Color::new(0xff, g, 0x00)
    } else {
        // Also catches NaN, which fails both comparisons.
        Color::RED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn level_is_pure_green() {
        assert_eq!(color_for(0.0), Color::new(0, 255, 0));
    }

    #[test]
    fn green_band_is_even() {
        let mut x = -30.0;
        while x <= 30.0 {
            assert_eq!(color_for(x), color_for(-x), "asymmetric at {x}");
            x += 0.25;
        }
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let x = rng.random_range(-30.0..=30.0);
            assert_eq!(color_for(x), color_for(-x));
        }
    }

    #[test]
    fn green_band_red_channel_is_linear() {
        assert_eq!(color_for(15.0), Color::new(127, 255, 0));
        assert_eq!(color_for(-15.0), Color::new(127, 255, 0));
        assert_eq!(color_for(30.0), Color::new(255, 255, 0));
        assert_eq!(color_for(-30.0), Color::new(255, 255, 0));
    }

    #[test]
    fn amber_band_boundary_is_nearly_continuous() {
        let at_boundary = color_for(30.0);
        let just_past = color_for(31.999);
        assert_eq!(at_boundary.r, just_past.r);
        assert!(at_boundary.g - just_past.g <= 9);
        assert_eq!(just_past.b, 0);
    }

    #[test]
    fn green_falls_monotonically_towards_the_envelope_edge() {
        let mut previous = color_for(30.0).g;
        let mut angle = 30.0;
        while angle <= 90.0 {
            let color = color_for(angle);
            assert_eq!(color.r, 255);
            assert!(color.g <= previous, "green rose at {angle}");
            previous = color.g;
            angle += 0.1;
        }
        assert_eq!(color_for(90.0), Color::new(255, 0, 0));
        assert_eq!(color_for(60.0), Color::new(255, 127, 0));
    }

    #[test]
    fn outside_envelope_is_alarm_red() {
        assert_eq!(color_for(91.0), Color::RED);
        assert_eq!(color_for(-91.0), Color::RED);
        assert_eq!(color_for(91.0), color_for(-91.0));
        assert_eq!(color_for(180.0), Color::RED);
        assert_eq!(color_for(f64::NAN), Color::RED);
    }
}

/// A positive frame rate as a reduced fraction.
///
/// Retimed rates are rarely whole numbers (90 frames over 3.2s is 28.125
/// fps), so encoders get `num/den` instead of a rounded integer. Rates are
/// kept to millihertz precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRate {
    num: i32,
    den: i32,
}

const PRECISION: i32 = 1000;

impl FrameRate {
    /// Returns `None` for non-finite, non-positive or out-of-range rates.
    pub fn from_fps(fps: f64) -> Option<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        let scaled = (fps * PRECISION as f64).round();
        if scaled < 1.0 || scaled > i32::MAX as f64 {
            return None;
        }
        let num = scaled as i32;
        let divisor = gcd(num, PRECISION);
        Some(Self {
            num: num / divisor,
            den: PRECISION / divisor,
        })
    }

    pub fn numerator(&self) -> i32 {
        self.num
    }

    pub fn denominator(&self) -> i32 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn gcd(mut a: i32, mut b: i32) -> i32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

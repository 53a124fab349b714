//! Running estimate of the ultrablack and black levels of analog ROCs

use crate::words::pixel::expand_sign;

/// Ultrablack/black level estimate used to find ROC headers in analog data.
///
/// The first [AnalogLevels::BOOTSTRAP_SAMPLES] header samples are averaged with a plain mean, after
/// that every sample moves the estimate by 1/1000.
///
/// Levels are kept as integers, every mean or moving average step is computed in `f32` and truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AnalogLevels {
    ultrablack: i32,
    black: i32,
    level_s: i16,
    sum_ultrablack: i64,
    sum_black: i64,
    samples: u32,
}

impl Default for AnalogLevels {
    fn default() -> Self {
        Self {
            ultrablack: 0x0fff,
            black: 0x0fff,
            level_s: 0,
            sum_ultrablack: 0,
            sum_black: 0,
            samples: 0,
        }
    }
}

impl AnalogLevels {
    const BOOTSTRAP_SAMPLES: u32 = 1000;

    /// Returns true if the two samples lie within the slicer band around the current levels.
    pub(crate) fn is_roc_header(&self, ultrablack: u16, black: u16) -> bool {
        let ub = i32::from(expand_sign(ultrablack & 0x0fff));
        let b = i32::from(expand_sign(black & 0x0fff));
        let level_s = i32::from(self.level_s);
        (self.ultrablack - level_s < ub && self.ultrablack + level_s > ub)
            && (self.black - level_s < b && self.black + level_s > b)
    }

    /// Feed the ultrablack and black samples of one ROC header.
    pub(crate) fn average(&mut self, ultrablack: u16, black: u16) {
        let ub = expand_sign(ultrablack & 0x0fff);
        let b = expand_sign(black & 0x0fff);

        if self.samples < Self::BOOTSTRAP_SAMPLES {
            self.samples += 1;
            self.sum_ultrablack += i64::from(ub);
            self.ultrablack = (self.sum_ultrablack as f32 / self.samples as f32) as i32;
            self.sum_black += i64::from(b);
            self.black = (self.sum_black as f32 / self.samples as f32) as i32;
        } else {
            self.ultrablack = moving_average(self.ultrablack, ub);
            self.black = moving_average(self.black, b);
        }
        self.level_s = ((self.black - self.ultrablack) / 8) as i16;
    }

    /// Current ultrablack level for the pixel codec
    pub(crate) fn ultrablack(&self) -> i16 {
        self.ultrablack as i16
    }

    /// Current black level for the pixel codec
    pub(crate) fn black(&self) -> i16 {
        self.black as i16
    }

    #[cfg(test)]
    pub(crate) fn level_s(&self) -> i16 {
        self.level_s
    }
}

// One 999/1000 step of the exponential average, truncated toward zero
fn moving_average(level: i32, sample: i16) -> i32 {
    (999.0_f32 / 1000.0 * level as f32 + 1.0_f32 / 1000.0 * f32::from(sample)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // 12 bit two's complement of a negative sample
    fn neg(v: i16) -> u16 {
        (v as u16) & 0x0fff
    }

    #[test]
    fn bootstrap_mean() {
        let mut levels = AnalogLevels::default();
        levels.average(neg(-400), 100);
        assert_eq!(levels.ultrablack(), -400);
        assert_eq!(levels.black(), 100);
        // (100 - -400) / 8 truncates to 62
        assert_eq!(levels.level_s(), 62);

        levels.average(neg(-420), 80);
        assert_eq!(levels.ultrablack(), -410);
        assert_eq!(levels.black(), 90);

        levels.average(neg(-401), 81);
        // -1221 / 3 = -407, 261 / 3 = 87
        assert_eq!(levels.ultrablack(), -407);
        assert_eq!(levels.black(), 87);
    }

    #[test]
    fn moving_average_after_bootstrap() {
        let mut levels = AnalogLevels::default();
        for _ in 0..1000 {
            levels.average(neg(-400), 100);
        }
        assert_eq!(levels.ultrablack(), -400);
        // -399.6 - 1.9 and 99.9 + 1.6
        levels.average(neg(-1900), 1600);
        assert_eq!(levels.ultrablack(), -401);
        assert_eq!(levels.black(), 101);
        // -400.999 truncates toward zero, 101.001 stays
        levels.average(neg(-400), 102);
        assert_eq!(levels.ultrablack(), -400);
        assert_eq!(levels.black(), 101);
    }

    #[test]
    fn header_detection_band() {
        let mut levels = AnalogLevels::default();
        levels.average(neg(-400), 100);
        // Band is +- 62 around (-400, 100), bounds are exclusive
        assert!(levels.is_roc_header(neg(-400), 100));
        assert!(levels.is_roc_header(neg(-339), 161));
        assert!(!levels.is_roc_header(neg(-338), 100));
        assert!(!levels.is_roc_header(neg(-462), 100));
        assert!(!levels.is_roc_header(neg(-400), 162));
    }

    #[test]
    fn initial_band_is_empty() {
        let levels = AnalogLevels::default();
        assert!(!levels.is_roc_header(0x0fff, 0x0fff));
    }
}

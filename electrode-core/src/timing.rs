//! Time-to-step conversions. One simulation step is one nanosecond.

pub const NS: u64 = 1;
pub const MS: u64 = 1000 * NS;
pub const S: u64 = 1000 * MS;

/// `num` seconds, in steps (truncated).
#[inline]
pub fn s(num: f64) -> u64 {
    (S as f64 * num) as u64
}

/// `num` milliseconds, in steps (truncated).
#[inline]
pub fn ms(num: f64) -> u64 {
    (MS as f64 * num) as u64
}

/// `num` nanoseconds, in steps (truncated).
#[inline]
pub fn ns(num: f64) -> u64 {
    (NS as f64 * num) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(ms(0.5), 500);
        assert_eq!(s(1.0), 1_000_000);
        assert_eq!(ns(12.9), 12);
        assert_eq!(s(0.001), ms(1.0));
    }
}

/// Check whether two floats have a relative difference of at most `$tolerance` times the smaller value.
#[macro_export]
macro_rules! assert_floats_near_equal {
    ($val1:expr, $val2:expr, $msg:expr) => {
        assert_floats_near_equal!($val1, $val2, 0.00005, $msg)
    };
    ($val1:expr, $val2:expr, $tolerance:expr, $msg:expr) => {{
        let a: f64 = $val1;
        let b: f64 = $val2;
        let diff = (a - b).abs();
        let relative_diff = diff / a.abs().min(b.abs());
        assert!(relative_diff <= $tolerance, "{}: {} vs {}", $msg, a, b);
    }};
}

use proptest::prelude::*;
use solaredge_exporter::sunspec::scale::SF_NOT_IMPLEMENTED;
use solaredge_exporter::sunspec::{resolve, AbsentPolicy, Reading};

fn power_of_ten(s: i16) -> f64 {
    10f64.powi(i32::from(s))
}

proptest! {
    #[test]
    fn scales_signed(v in any::<i16>().prop_filter("sentinel", |v| *v != i16::MIN), s in -5i16..=5) {
        prop_assert_eq!(resolve(v, s), Reading::Value(f64::from(v) * power_of_ten(s)));
    }

    #[test]
    fn scales_unsigned(v in any::<u16>().prop_filter("sentinel", |v| *v != u16::MAX), s in -5i16..=5) {
        prop_assert_eq!(resolve(v, s), Reading::Value(f64::from(v) * power_of_ten(s)));
    }

    #[test]
    fn scales_accumulators(v in any::<u32>().prop_filter("sentinel", |v| *v != u32::MAX), s in -5i16..=5) {
        prop_assert_eq!(resolve(v, s), Reading::Value(f64::from(v) * power_of_ten(s)));
    }

    #[test]
    fn sentinels_are_absent_at_any_scale(s in any::<i16>()) {
        prop_assert!(resolve(i16::MIN, s).is_absent());
        prop_assert!(resolve(u16::MAX, s).is_absent());
        prop_assert!(resolve(u32::MAX, s).is_absent());
    }

    #[test]
    fn unimplemented_scale_factor_is_absent(v in any::<u16>()) {
        prop_assert!(resolve(v, SF_NOT_IMPLEMENTED).is_absent());
    }

    #[test]
    fn present_values_ignore_policy(v in 0u16..1000, s in -3i16..=3) {
        let reading = resolve(v, s);
        prop_assert_eq!(reading.or_policy(AbsentPolicy::Omit), reading.or_policy(AbsentPolicy::Zero));
    }
}

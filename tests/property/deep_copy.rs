use proptest::prelude::*;
use simjob::params::{ParamValue, ParameterSet};

proptest! {
    #[test]
    fn deep_copy_equals_and_stays_isolated(
        charge in -4i64..5,
        memory in 1i64..4000,
        iterations in 1i64..500,
        damp in any::<bool>(),
        comment in "[A-Za-z0-9 ]{0,24}",
    ) {
        let mut original = ParameterSet::new("prop");
        original.set_ui("icharg", ParamValue::Int(charge)).unwrap();
        original.set_ui("memory", ParamValue::Int(memory)).unwrap();
        original.set_ui("iterations", ParamValue::Int(iterations)).unwrap();
        original.set_ui("damp", ParamValue::Bool(damp)).unwrap();
        original
            .set_ui("comment", ParamValue::Text(comment.trim().to_string()))
            .unwrap();
        let snapshot = original.clone();

        let mut copy = original.deep_copy(false).unwrap();
        prop_assert_eq!(&copy, &original);

        copy.set_ui("icharg", ParamValue::Int(charge + 1)).unwrap();
        copy.set_ui("damp", ParamValue::Bool(!damp)).unwrap();
        prop_assert_eq!(&original, &snapshot);
        prop_assert_ne!(copy.ui(), original.ui());
    }
}

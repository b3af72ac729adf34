#![no_main]

use cordyceps_avl::model::ShapeRestoreInput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: ShapeRestoreInput| {
    cordyceps_avl::model::run_shape_restore(input.values, input.probe);
});

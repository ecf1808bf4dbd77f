use mockall::mock;

use crate::StatsdDataFactory;

#[path = "../tests/common/mod.rs"]
mod common;
pub use self::common::count_warnings;

mock! {
    pub Sink {}

    impl StatsdDataFactory for Sink {
        fn update_count(&self, namespace: &str, delta: f64);
        fn timing(&self, namespace: &str, milliseconds: f64);
        fn gauge(&self, namespace: &str, value: f64);
    }
}

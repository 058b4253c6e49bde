mod reconciler_tests;
mod support;

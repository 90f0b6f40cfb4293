mod common;

mod pipeline_tests;

//! tests/mod.rs
//! Pruebas del núcleo de campañas y de los endpoints.

mod support;

mod worker_tests;
